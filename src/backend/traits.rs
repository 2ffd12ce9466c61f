use std::sync::Arc;

use crate::model::{BackendError, CapabilitySet, ManagedObjects, SubtreeEntry};

/// Primitives the expansion engine consumes from the backend object graph.
///
/// Every call is a single round trip to some backend agent; the engine never
/// assumes two calls observe the same graph state.
#[async_trait::async_trait]
pub trait BackendGraphClient: Send + Sync {
    /// List objects at or below `root_path` that carry at least one of the
    /// filter's capabilities (an empty filter admits all). `max_depth == 0`
    /// means unbounded.
    async fn list_subtree(
        &self,
        root_path: &str,
        capability_filter: &CapabilitySet,
        max_depth: u32,
    ) -> Result<Vec<SubtreeEntry>, BackendError>;

    /// Endpoint paths of the association published at `edge_path`.
    async fn get_association_endpoints(&self, edge_path: &str) -> Result<Vec<String>, BackendError>;

    /// Bulk retrieval: every object managed by `agent`, with all interfaces
    /// and properties.
    async fn get_all_managed_objects(&self, agent: &str) -> Result<ManagedObjects, BackendError>;
}

#[async_trait::async_trait]
impl<T: BackendGraphClient + ?Sized> BackendGraphClient for Arc<T> {
    async fn list_subtree(
        &self,
        root_path: &str,
        capability_filter: &CapabilitySet,
        max_depth: u32,
    ) -> Result<Vec<SubtreeEntry>, BackendError> {
        (**self).list_subtree(root_path, capability_filter, max_depth).await
    }

    async fn get_association_endpoints(&self, edge_path: &str) -> Result<Vec<String>, BackendError> {
        (**self).get_association_endpoints(edge_path).await
    }

    async fn get_all_managed_objects(&self, agent: &str) -> Result<ManagedObjects, BackendError> {
        (**self).get_all_managed_objects(agent).await
    }
}
