/// Activity Descriptor Layer
///
/// This module discovers the activity types a definition may reference:
/// - Descriptor types with tagged constructors
/// - The provider contract and its implementations (built-in, webhook, definitions)
/// - Lock-free descriptor registry using ArcSwap

// Descriptor, constructor, and activation types
pub mod descriptor;

// Provider contract shared by every descriptor source
pub mod provider;

// Explicitly coded engine activities
pub mod builtin;

// Metadata-table driven webhook event activities
pub mod webhook;

// Published definitions exposed as activities
pub mod definitions;

// Snapshot-swap registry aggregating all providers
pub mod registry;

pub use descriptor::{ActivationContext, Activity, ActivityConstructor, ActivityDescriptor, ActivityDescriptorModel, ActivityKind};
pub use provider::ActivityProvider;
pub use registry::{DescriptorRegistry, DescriptorSnapshot};
