use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::time::Instant;

use crate::backend::traits::BackendGraphClient;
use crate::model::{BackendError, CapabilitySet, ManagedObjects, SubtreeEntry};

/// Per-operation call counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub list_subtree: usize,
    pub association_endpoints: usize,
    pub managed_objects: usize,
    pub managed_objects_by_agent: BTreeMap<String, usize>,
}

impl CallCounts {
    pub fn total(&self) -> usize {
        self.list_subtree + self.association_endpoints + self.managed_objects
    }
}

/// Wraps a backend, counting every call and optionally logging its latency.
#[derive(Debug)]
pub struct RecordingBackend<B> {
    inner: B,
    counts: Mutex<CallCounts>,
    log_calls: bool,
}

impl<B: BackendGraphClient> RecordingBackend<B> {
    pub fn new(inner: B) -> Self {
        Self {
            inner,
            counts: Mutex::new(CallCounts::default()),
            log_calls: false,
        }
    }

    pub fn with_logging(mut self, log_calls: bool) -> Self {
        self.log_calls = log_calls;
        self
    }

    pub fn inner(&self) -> &B {
        &self.inner
    }

    /// Snapshot of the counters.
    pub fn counts(&self) -> CallCounts {
        self.counts.lock().clone()
    }

    pub fn reset(&self) {
        *self.counts.lock() = CallCounts::default();
    }

    fn trace<T>(&self, operation: &str, target: &str, started: Instant, result: &Result<T, BackendError>) {
        if !self.log_calls {
            return;
        }
        match result {
            Ok(_) => log::debug!("{} {} ok in {:?}", operation, target, started.elapsed()),
            Err(e) => log::debug!("{} {} failed in {:?}: {}", operation, target, started.elapsed(), e),
        }
    }
}

#[async_trait::async_trait]
impl<B: BackendGraphClient> BackendGraphClient for RecordingBackend<B> {
    async fn list_subtree(
        &self,
        root_path: &str,
        capability_filter: &CapabilitySet,
        max_depth: u32,
    ) -> Result<Vec<SubtreeEntry>, BackendError> {
        self.counts.lock().list_subtree += 1;
        let started = Instant::now();
        let result = self
            .inner
            .list_subtree(root_path, capability_filter, max_depth)
            .await;
        self.trace("list_subtree", root_path, started, &result);
        result
    }

    async fn get_association_endpoints(&self, edge_path: &str) -> Result<Vec<String>, BackendError> {
        self.counts.lock().association_endpoints += 1;
        let started = Instant::now();
        let result = self.inner.get_association_endpoints(edge_path).await;
        self.trace("get_association_endpoints", edge_path, started, &result);
        result
    }

    async fn get_all_managed_objects(&self, agent: &str) -> Result<ManagedObjects, BackendError> {
        {
            let mut counts = self.counts.lock();
            counts.managed_objects += 1;
            *counts
                .managed_objects_by_agent
                .entry(agent.to_string())
                .or_default() += 1;
        }
        let started = Instant::now();
        let result = self.inner.get_all_managed_objects(agent).await;
        self.trace("get_all_managed_objects", agent, started, &result);
        result
    }
}
