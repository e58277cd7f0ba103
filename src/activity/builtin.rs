/// Explicitly coded activity provider
///
/// Supplies the descriptors of activities implemented by the engine itself,
/// including the flowchart container every definition's root is built from.

use crate::activity::descriptor::{ActivityConstructor, ActivityDescriptor, ActivityKind};
use crate::activity::provider::ActivityProvider;
use crate::error::{Error, Result};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Type name of the flowchart container activity
pub const FLOWCHART_TYPE_NAME: &str = "Mechaflow.Flowchart";

/// Provider over a fixed descriptor list
#[derive(Debug, Clone)]
pub struct BuiltinActivityProvider {
    descriptors: Vec<ActivityDescriptor>,
}

impl BuiltinActivityProvider {
    pub fn new(descriptors: Vec<ActivityDescriptor>) -> Self {
        Self { descriptors }
    }
}

impl Default for BuiltinActivityProvider {
    fn default() -> Self {
        Self::new(vec![
            builtin(FLOWCHART_TYPE_NAME, "Flowchart", "Flow", ActivityKind::Action, &["activities", "connections"])
                .with_description("A graph of activities connected by outcomes."),
            builtin("Mechaflow.Sequence", "Sequence", "Flow", ActivityKind::Action, &["activities"])
                .with_description("Runs its activities one after another."),
            builtin("Mechaflow.WriteLine", "Write Line", "Console", ActivityKind::Action, &["text"]),
            builtin("Mechaflow.SetVariable", "Set Variable", "Primitives", ActivityKind::Action, &["variable", "value"])
                .with_description("Assigns a value to a workflow variable."),
            builtin("Mechaflow.HttpEndpoint", "HTTP Endpoint", "HTTP", ActivityKind::Trigger, &["path", "methods"])
                .with_description("Starts the workflow when the endpoint receives a request."),
        ])
    }
}

fn builtin(type_name: &str, display_name: &str, category: &str, kind: ActivityKind, inputs: &[&str]) -> ActivityDescriptor {
    ActivityDescriptor {
        type_name: type_name.to_string(),
        version: 1,
        display_name: display_name.to_string(),
        category: category.to_string(),
        description: None,
        kind,
        is_browsable: true,
        activity_type: type_name.to_string(),
        inputs: inputs.iter().map(|s| s.to_string()).collect(),
        constructor: ActivityConstructor::Builtin {
            type_name: type_name.to_string(),
            version: 1,
        },
    }
}

#[async_trait]
impl ActivityProvider for BuiltinActivityProvider {
    fn name(&self) -> &str {
        "builtin"
    }

    async fn get_descriptors(&self, cancel: &CancellationToken) -> Result<Vec<ActivityDescriptor>> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        Ok(self.descriptors.clone())
    }
}
