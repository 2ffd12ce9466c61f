use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::logic::accumulator::ResponseAccumulator;

/// Join group for one expansion call.
///
/// The group holds one counted reference on the accumulator for as long as it
/// lives, plus one branch count per outstanding async branch. The subtree is
/// complete exactly when the branch count is back at zero; dropping the group
/// then releases its accumulator reference.
#[derive(Debug)]
pub struct PendingGroup {
    label: String,
    outstanding: Arc<AtomicUsize>,
    accumulator: ResponseAccumulator,
}

/// One counted branch. Releases its count when dropped, whether the branch
/// finished or was abandoned.
#[derive(Debug)]
pub struct BranchGuard {
    outstanding: Arc<AtomicUsize>,
}

impl Drop for BranchGuard {
    fn drop(&mut self) {
        self.outstanding.fetch_sub(1, Ordering::AcqRel);
    }
}

impl PendingGroup {
    pub fn new(label: impl Into<String>, accumulator: &ResponseAccumulator) -> Self {
        Self {
            label: label.into(),
            outstanding: Arc::new(AtomicUsize::new(0)),
            accumulator: accumulator.clone(),
        }
    }

    /// Branches issued but not yet finished.
    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::Acquire)
    }

    pub fn is_complete(&self) -> bool {
        self.outstanding() == 0
    }

    /// Count a new branch now, before it is first polled.
    pub fn acquire(&self) -> BranchGuard {
        self.outstanding.fetch_add(1, Ordering::AcqRel);
        BranchGuard {
            outstanding: Arc::clone(&self.outstanding),
        }
    }

    /// Wraps `branch` so it holds a branch count until it completes.
    pub fn track<F>(&self, branch: F) -> impl Future<Output = F::Output>
    where
        F: Future,
    {
        let guard = self.acquire();
        async move {
            let output = branch.await;
            drop(guard);
            output
        }
    }

    /// Scatter-gather: counts every branch up front, then drives them all
    /// concurrently on the current task until each has reported in. Outputs
    /// come back in input order regardless of completion order.
    pub async fn join_all<I, F>(&self, branches: I) -> Vec<F::Output>
    where
        I: IntoIterator<Item = F>,
        F: Future,
    {
        let tracked: Vec<_> = branches.into_iter().map(|branch| self.track(branch)).collect();
        futures::future::join_all(tracked).await
    }
}

impl Drop for PendingGroup {
    fn drop(&mut self) {
        let outstanding = self.outstanding();
        let request_id = self.accumulator.request_id();
        if outstanding == 0 {
            log::debug!(
                "[{}] {}: group drained, releasing accumulator reference",
                request_id,
                self.label
            );
        } else {
            log::warn!(
                "[{}] {}: group released with {} branch(es) still outstanding",
                request_id,
                self.label,
                outstanding
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    #[tokio::test]
    async fn test_branches_are_counted_before_they_run() {
        let (accumulator, _receiver) = ResponseAccumulator::new(json!({}));
        let group = PendingGroup::new("test", &accumulator);

        let first = group.track(async { 1 });
        let second = group.track(async { 2 });
        assert_eq!(group.outstanding(), 2);

        assert_eq!(first.await, 1);
        assert_eq!(group.outstanding(), 1);
        drop(second);
        assert!(group.is_complete());
    }

    #[tokio::test]
    async fn test_join_all_preserves_input_order() {
        let (accumulator, _receiver) = ResponseAccumulator::new(json!({}));
        let group = PendingGroup::new("ordered", &accumulator);

        let branches = [30u64, 0, 10].into_iter().map(|delay| async move {
            tokio::time::sleep(Duration::from_millis(delay)).await;
            delay
        });
        let outputs = group.join_all(branches).await;
        assert_eq!(outputs, vec![30, 0, 10]);
        assert!(group.is_complete());
    }

    #[tokio::test]
    async fn test_group_holds_accumulator_until_dropped() {
        let (accumulator, mut receiver) = ResponseAccumulator::new(json!({}));
        let group = PendingGroup::new("holder", &accumulator);
        drop(accumulator);

        group.join_all((0..2).map(|_| async {})).await;
        assert!(receiver.try_recv().is_err());

        drop(group);
        assert!(receiver.await.is_ok());
    }
}
