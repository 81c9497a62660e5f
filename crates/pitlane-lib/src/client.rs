//! Data access seam.
//!
//! The [`DataClient`] trait is the only way the rest of the workspace reaches
//! stored rows. One client is built at start-up and shared by every request.

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::descriptor::Descriptor;
use crate::error::Result;

/// Executes descriptors against a data service.
///
/// Implementations must be safe to call concurrently; no per-call state is
/// kept between invocations.
#[async_trait]
pub trait DataClient: Send + Sync {
    /// Run `descriptor` and return the matching rows, already projected and
    /// ordered as the descriptor requests.
    async fn fetch(&self, descriptor: &Descriptor) -> Result<Vec<Value>>;
}

/// Execute a descriptor, answering unsatisfiable descriptors locally.
pub async fn execute(client: &dyn DataClient, descriptor: &Descriptor) -> Result<Vec<Value>> {
    if descriptor.is_unsatisfiable() {
        debug!(table = %descriptor.entity, "descriptor matches nothing, skipping data service");
        return Ok(Vec::new());
    }
    client.fetch(descriptor).await
}
