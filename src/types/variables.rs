/// Variable type descriptors
///
/// The catalog of types a definition's variables may be declared with, and the
/// read-only listing projection served to the designer.

use crate::types::alias::{TypeAliasRegistry, TypeInfo};
use serde::{Deserialize, Serialize};

/// A type that variables may be declared with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableDescriptor {
    pub type_info: TypeInfo,
    /// Grouping shown in the designer's type picker
    pub category: String,
    /// Overrides the type's own description when set
    pub description: Option<String>,
}

impl VariableDescriptor {
    pub fn new(type_info: TypeInfo, category: impl Into<String>) -> Self {
        Self {
            type_info,
            category: category.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Listing entry for one variable type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableDescriptorModel {
    /// Alias when registered, otherwise the qualified name
    pub type_name: String,
    pub display_name: String,
    pub category: String,
    pub description: Option<String>,
}

/// Default variable type catalog
pub fn default_variable_descriptors() -> Vec<VariableDescriptor> {
    vec![
        VariableDescriptor::new(TypeInfo::of::<String>(), "Primitives"),
        VariableDescriptor::new(TypeInfo::of::<bool>(), "Primitives"),
        VariableDescriptor::new(TypeInfo::of::<i32>(), "Primitives"),
        VariableDescriptor::new(TypeInfo::of::<i64>(), "Primitives"),
        VariableDescriptor::new(TypeInfo::of::<f32>(), "Primitives"),
        VariableDescriptor::new(TypeInfo::of::<f64>(), "Primitives"),
        VariableDescriptor::new(TypeInfo::of::<chrono::DateTime<chrono::Utc>>(), "Primitives"),
        VariableDescriptor::new(TypeInfo::of::<uuid::Uuid>(), "Primitives"),
        VariableDescriptor::new(TypeInfo::of::<serde_json::Value>(), "Data")
            .with_description("An arbitrary JSON value."),
        VariableDescriptor::new(TypeInfo::of::<Vec<serde_json::Value>>(), "Data")
            .with_description("A list of JSON values."),
    ]
}

/// Project one descriptor for listing
///
/// An aliased type is shown by its alias; otherwise by its qualified name,
/// with the display name taken from the type (or its simple name).
pub fn describe_variable(aliases: &TypeAliasRegistry, descriptor: &VariableDescriptor) -> VariableDescriptorModel {
    let type_info = &descriptor.type_info;

    let (type_name, display_name) = match aliases.try_get_alias(type_info) {
        Some(alias) => (alias.to_string(), alias.to_string()),
        None => (
            type_info.qualified_name.clone(),
            type_info.display_name.clone().unwrap_or_else(|| type_info.name.clone()),
        ),
    };

    VariableDescriptorModel {
        type_name,
        display_name,
        category: descriptor.category.clone(),
        description: descriptor
            .description
            .clone()
            .or_else(|| type_info.description.clone()),
    }
}

/// Project the whole catalog, preserving its order
pub fn list_variable_descriptors(
    aliases: &TypeAliasRegistry,
    descriptors: &[VariableDescriptor],
) -> Vec<VariableDescriptorModel> {
    descriptors
        .iter()
        .map(|descriptor| describe_variable(aliases, descriptor))
        .collect()
}
