/// Metadata-driven webhook event activity provider
///
/// Turns a static table of webhook payload types into one `Job` descriptor per
/// payload. Every enrolled payload must carry [`WebhookMetadata`]; a payload
/// without it is a configuration error that fails the whole build, so a
/// misconfigured table is caught before any descriptor is handed out.

use crate::activity::descriptor::{ActivityConstructor, ActivityDescriptor, ActivityKind, EVENT_TYPE_INPUT};
use crate::activity::provider::ActivityProvider;
use crate::config::DescriptorConfig;
use crate::error::{Error, Result};
use crate::types::TypeInfo;
use async_trait::async_trait;
use std::collections::HashSet;
use tokio_util::sync::CancellationToken;

/// Implementation every webhook event descriptor constructs
pub const WEBHOOK_EVENT_ACTIVITY: &str = "Mechaflow.WebhookEvent";

/// Required metadata of an enrolled payload type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookMetadata {
    /// Short activity type name, prefixed with the provider namespace
    pub activity_type: String,
    /// Event selector the constructed activity listens for (e.g. "call.answered")
    pub event_type: String,
    pub display_name: String,
    pub description: Option<String>,
}

impl WebhookMetadata {
    pub fn new(
        activity_type: impl Into<String>,
        event_type: impl Into<String>,
        display_name: impl Into<String>,
    ) -> Self {
        Self {
            activity_type: activity_type.into(),
            event_type: event_type.into(),
            display_name: display_name.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// One row of the provider's payload table
///
/// The optional fields override what the webhook metadata or the provider
/// policy would otherwise supply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadType {
    pub type_info: TypeInfo,
    pub webhook: Option<WebhookMetadata>,
    pub display_name: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
}

impl PayloadType {
    pub fn new(type_info: TypeInfo) -> Self {
        Self {
            type_info,
            webhook: None,
            display_name: None,
            category: None,
            description: None,
        }
    }

    pub fn webhook(mut self, metadata: WebhookMetadata) -> Self {
        self.webhook = Some(metadata);
        self
    }

    pub fn display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Provider producing webhook event descriptors from a payload table
#[derive(Debug, Clone)]
pub struct WebhookEventActivityProvider {
    namespace: String,
    default_category: String,
    payload_types: Vec<PayloadType>,
}

impl WebhookEventActivityProvider {
    pub fn new(
        namespace: impl Into<String>,
        default_category: impl Into<String>,
        payload_types: Vec<PayloadType>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            default_category: default_category.into(),
            payload_types,
        }
    }

    /// Provider over the default call-control catalog
    pub fn from_config(config: &DescriptorConfig) -> Self {
        Self::new(
            config.webhook_namespace.clone(),
            config.webhook_category.clone(),
            default_payload_types(),
        )
    }

    /// Check the whole table without building anything
    ///
    /// Called at startup so a bad table stops the process before it serves.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();

        for payload in &self.payload_types {
            let metadata = required_metadata(payload)?;
            if !seen.insert(metadata.activity_type.as_str()) {
                return Err(Error::DuplicateDescriptor {
                    type_name: self.full_type_name(metadata),
                    version: 1,
                });
            }
        }

        Ok(())
    }

    /// Build every descriptor, or fail without returning any
    pub fn build_descriptors(&self) -> Result<Vec<ActivityDescriptor>> {
        self.validate()?;
        self.payload_types
            .iter()
            .map(|payload| self.create_descriptor(payload))
            .collect()
    }

    fn full_type_name(&self, metadata: &WebhookMetadata) -> String {
        format!("{}.{}", self.namespace, metadata.activity_type)
    }

    fn create_descriptor(&self, payload: &PayloadType) -> Result<ActivityDescriptor> {
        let metadata = required_metadata(payload)?;
        let type_name = self.full_type_name(metadata);

        let display_name = payload
            .display_name
            .clone()
            .unwrap_or_else(|| metadata.display_name.clone());
        let category = payload
            .category
            .clone()
            .unwrap_or_else(|| self.default_category.clone());
        let description = payload
            .description
            .clone()
            .or_else(|| metadata.description.clone());

        Ok(ActivityDescriptor {
            type_name: type_name.clone(),
            version: 1,
            display_name,
            category,
            description,
            kind: ActivityKind::Job,
            is_browsable: true,
            activity_type: WEBHOOK_EVENT_ACTIVITY.to_string(),
            inputs: vec![EVENT_TYPE_INPUT.to_string()],
            // Captured now; later edits to the table do not reach this constructor
            constructor: ActivityConstructor::WebhookEvent {
                type_name,
                event_type: metadata.event_type.clone(),
            },
        })
    }
}

fn required_metadata(payload: &PayloadType) -> Result<&WebhookMetadata> {
    payload.webhook.as_ref().ok_or_else(|| {
        Error::Configuration(format!(
            "no webhook metadata found on payload type {}",
            payload.type_info.qualified_name
        ))
    })
}

#[async_trait]
impl ActivityProvider for WebhookEventActivityProvider {
    fn name(&self) -> &str {
        "webhook-events"
    }

    async fn get_descriptors(&self, cancel: &CancellationToken) -> Result<Vec<ActivityDescriptor>> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        self.build_descriptors()
    }
}

fn payload(qualified_name: &str, activity_type: &str, event_type: &str, display_name: &str, description: &str) -> PayloadType {
    PayloadType::new(TypeInfo::from_qualified(qualified_name))
        .webhook(WebhookMetadata::new(activity_type, event_type, display_name).with_description(description))
}

/// Call-control and messaging events enrolled by default
pub fn default_payload_types() -> Vec<PayloadType> {
    vec![
        payload(
            "mechaflow::webhooks::payloads::CallInitiated",
            "CallInitiated",
            "call.initiated",
            "Call Initiated",
            "Triggered when an incoming call is received.",
        ),
        payload(
            "mechaflow::webhooks::payloads::CallAnswered",
            "CallAnswered",
            "call.answered",
            "Call Answered",
            "Triggered when an incoming call was answered.",
        ),
        payload(
            "mechaflow::webhooks::payloads::CallHangup",
            "CallHangup",
            "call.hangup",
            "Call Hangup",
            "Triggered when a call is hung up.",
        ),
        payload(
            "mechaflow::webhooks::payloads::CallDtmfReceived",
            "CallDtmfReceived",
            "call.dtmf.received",
            "Call DTMF Received",
            "Triggered when a DTMF digit is pressed during a call.",
        ),
        payload(
            "mechaflow::webhooks::payloads::CallPlaybackEnded",
            "CallPlaybackEnded",
            "call.playback.ended",
            "Call Playback Ended",
            "Triggered when audio playback on a call stops.",
        ),
        payload(
            "mechaflow::webhooks::payloads::CallGatherEnded",
            "CallGatherEnded",
            "call.gather.ended",
            "Call Gather Ended",
            "Triggered when digit gathering on a call completes.",
        ),
        payload(
            "mechaflow::webhooks::payloads::CallRecordingSaved",
            "CallRecordingSaved",
            "call.recording.saved",
            "Call Recording Saved",
            "Triggered when a call recording is available.",
        ),
        payload(
            "mechaflow::webhooks::payloads::MessageReceived",
            "MessageReceived",
            "message.received",
            "Message Received",
            "Triggered when an inbound message arrives.",
        )
        .category("Messaging"),
    ]
}
