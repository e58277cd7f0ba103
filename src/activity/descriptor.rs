/// Activity descriptor types
///
/// A descriptor is an immutable value describing one invocable activity type,
/// including how to construct an instance of it. Constructors are tagged
/// variants carrying their bound parameters, so what a descriptor will build
/// can be inspected and compared without invoking anything.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Input name a webhook event activity filters incoming events on
pub const EVENT_TYPE_INPUT: &str = "eventType";

/// Input names carried by activities that invoke a published definition
pub const DEFINITION_ID_INPUT: &str = "definitionId";
pub const DEFINITION_VERSION_INPUT: &str = "definitionVersion";

/// How an activity participates in a workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActivityKind {
    /// Runs inline when reached
    Action,
    /// Starts or resumes a workflow on an external event
    Trigger,
    /// Runs in the background, resumed when the awaited event arrives
    Job,
}

/// Immutable description of one invocable activity type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityDescriptor {
    /// Unique together with `version` within a registry snapshot
    pub type_name: String,
    pub version: u32,
    pub display_name: String,
    pub category: String,
    pub description: Option<String>,
    pub kind: ActivityKind,
    /// Whether the designer lists this descriptor in its toolbox
    pub is_browsable: bool,
    /// Identity of the implementation that executes the activity
    pub activity_type: String,
    /// Input names exposed to the designer
    pub inputs: Vec<String>,
    pub constructor: ActivityConstructor,
}

/// Everything a constructor needs to materialize an activity from a designer node
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivationContext {
    /// Node id chosen by the designer; a fresh id is generated when absent
    pub id: Option<String>,
    /// Raw node properties as authored in the designer
    pub properties: Map<String, Value>,
}

impl ActivationContext {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            properties: Map::new(),
        }
    }

    pub fn with_property(mut self, name: impl Into<String>, value: Value) -> Self {
        self.properties.insert(name.into(), value);
        self
    }
}

/// An activity instance produced by a descriptor's constructor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: String,
    /// Discriminator bound to the descriptor's fully-qualified type name
    #[serde(rename = "type")]
    pub type_name: String,
    pub version: u32,
    /// Implementation the runtime dispatches to
    pub activity_type: String,
    pub inputs: BTreeMap<String, Value>,
}

/// Tagged constructor with its bound parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ActivityConstructor {
    /// Explicitly coded activity; inputs come from the node as authored
    Builtin { type_name: String, version: u32 },

    /// Webhook event listener; `event_type` is the literal captured when the
    /// descriptor was built and always wins over node properties
    WebhookEvent { type_name: String, event_type: String },

    /// Invocation of a published definition at a fixed version
    Definition {
        type_name: String,
        definition_id: String,
        version: u32,
    },
}

impl ActivityConstructor {
    /// Type name the constructed activity's discriminator is bound to
    pub fn type_name(&self) -> &str {
        match self {
            ActivityConstructor::Builtin { type_name, .. }
            | ActivityConstructor::WebhookEvent { type_name, .. }
            | ActivityConstructor::Definition { type_name, .. } => type_name,
        }
    }

    /// Definition id this constructor invokes, if it invokes one
    pub fn definition_id(&self) -> Option<&str> {
        match self {
            ActivityConstructor::Definition { definition_id, .. } => Some(definition_id),
            _ => None,
        }
    }
}

impl ActivityDescriptor {
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Materialize an activity for the given designer node
    pub fn construct(&self, context: &ActivationContext) -> Activity {
        let id = context
            .id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        let mut inputs: BTreeMap<String, Value> = context
            .properties
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();

        let version = match &self.constructor {
            ActivityConstructor::Builtin { version, .. } => *version,
            ActivityConstructor::WebhookEvent { event_type, .. } => {
                inputs.insert(EVENT_TYPE_INPUT.to_string(), Value::String(event_type.clone()));
                self.version
            }
            ActivityConstructor::Definition {
                definition_id,
                version,
                ..
            } => {
                inputs.insert(DEFINITION_ID_INPUT.to_string(), Value::String(definition_id.clone()));
                inputs.insert(DEFINITION_VERSION_INPUT.to_string(), Value::from(*version));
                *version
            }
        };

        Activity {
            id,
            type_name: self.constructor.type_name().to_string(),
            version,
            activity_type: self.activity_type.clone(),
            inputs,
        }
    }

    /// Serializable projection without the constructor
    pub fn to_model(&self) -> ActivityDescriptorModel {
        ActivityDescriptorModel {
            type_name: self.type_name.clone(),
            version: self.version,
            display_name: self.display_name.clone(),
            category: self.category.clone(),
            description: self.description.clone(),
            kind: self.kind,
            is_browsable: self.is_browsable,
            inputs: self.inputs.clone(),
        }
    }
}

/// Listing entry for one activity descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityDescriptorModel {
    pub type_name: String,
    pub version: u32,
    pub display_name: String,
    pub category: String,
    pub description: Option<String>,
    pub kind: ActivityKind,
    pub is_browsable: bool,
    pub inputs: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn webhook_descriptor() -> ActivityDescriptor {
        ActivityDescriptor {
            type_name: "Mechaflow.Webhooks.CallAnswered".to_string(),
            version: 1,
            display_name: "Call Answered".to_string(),
            category: "Webhooks".to_string(),
            description: None,
            kind: ActivityKind::Job,
            is_browsable: true,
            activity_type: "WebhookEvent".to_string(),
            inputs: vec![EVENT_TYPE_INPUT.to_string()],
            constructor: ActivityConstructor::WebhookEvent {
                type_name: "Mechaflow.Webhooks.CallAnswered".to_string(),
                event_type: "call.answered".to_string(),
            },
        }
    }

    #[test]
    fn test_webhook_constructor_binds_captured_event_type() {
        let descriptor = webhook_descriptor();
        // A node property cannot change the advertised event filter
        let context = ActivationContext::new("node-1")
            .with_property(EVENT_TYPE_INPUT, json!("call.hangup"))
            .with_property("note", json!("kept"));

        let activity = descriptor.construct(&context);

        assert_eq!(activity.id, "node-1");
        assert_eq!(activity.type_name, "Mechaflow.Webhooks.CallAnswered");
        assert_eq!(activity.activity_type, "WebhookEvent");
        assert_eq!(activity.inputs[EVENT_TYPE_INPUT], json!("call.answered"));
        assert_eq!(activity.inputs["note"], json!("kept"));
    }

    #[test]
    fn test_definition_constructor_pins_version() {
        let mut descriptor = webhook_descriptor();
        descriptor.type_name = "Activity1".to_string();
        descriptor.version = 3;
        descriptor.constructor = ActivityConstructor::Definition {
            type_name: "Activity1".to_string(),
            definition_id: "def-1".to_string(),
            version: 3,
        };

        let activity = descriptor.construct(&ActivationContext::default());

        assert!(!activity.id.is_empty());
        assert_eq!(activity.version, 3);
        assert_eq!(activity.inputs[DEFINITION_ID_INPUT], json!("def-1"));
        assert_eq!(activity.inputs[DEFINITION_VERSION_INPUT], json!(3));
        assert_eq!(descriptor.constructor.definition_id(), Some("def-1"));
    }

    #[test]
    fn test_model_serializes_camel_case() {
        let model = webhook_descriptor().to_model();
        let json = serde_json::to_value(&model).unwrap();

        assert_eq!(json["typeName"], "Mechaflow.Webhooks.CallAnswered");
        assert_eq!(json["isBrowsable"], true);
        assert_eq!(json["kind"], "Job");
    }
}
