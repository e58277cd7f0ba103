/// Activity provider contract
///
/// Any component may contribute descriptors to the registry by implementing
/// [`ActivityProvider`]. The registry treats all providers uniformly.

use crate::activity::descriptor::ActivityDescriptor;
use crate::error::Result;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// A source of activity descriptors
///
/// Implementations must be idempotent: two calls without an external state
/// change yield equivalent descriptor sets. Long-running implementations
/// should observe `cancel` and return [`crate::Error::Cancelled`] promptly.
#[async_trait]
pub trait ActivityProvider: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Produce this provider's descriptors
    async fn get_descriptors(&self, cancel: &CancellationToken) -> Result<Vec<ActivityDescriptor>>;
}
