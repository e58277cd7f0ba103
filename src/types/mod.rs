/// Type identity layer
///
/// Provides the alias registry used to name types in descriptors and payloads,
/// and the variable type catalog exposed to the designer.

// Bidirectional alias <-> qualified type name mapping
pub mod alias;

// Variable type descriptors and their listing projection
pub mod variables;

pub use alias::{TypeAliasRegistry, TypeInfo};
pub use variables::{VariableDescriptor, VariableDescriptorModel};
