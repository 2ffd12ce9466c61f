use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::oneshot;

use crate::model::{generate_request_id, ExpansionError, Id};

/// The finished output of one top-level request.
#[derive(Debug)]
pub struct CompletedResponse {
    pub request_id: Id,
    pub document: Value,
    /// Every error recorded by any branch, in recording order.
    pub errors: Vec<ExpansionError>,
}

#[derive(Debug)]
struct AccumulatorInner {
    request_id: Id,
    document: Mutex<Value>,
    errors: Mutex<Vec<ExpansionError>>,
    on_complete: Mutex<Option<oneshot::Sender<CompletedResponse>>>,
}

impl Drop for AccumulatorInner {
    fn drop(&mut self) {
        let response = CompletedResponse {
            request_id: self.request_id.clone(),
            document: std::mem::take(self.document.get_mut()),
            errors: std::mem::take(self.errors.get_mut()),
        };
        log::debug!(
            "request {} drained with {} recorded error(s)",
            response.request_id,
            response.errors.len()
        );
        if let Some(sender) = self.on_complete.get_mut().take() {
            // The receiver may already be gone if the request was abandoned.
            let _ = sender.send(response);
        }
    }
}

/// Shared, reference-counted output document for one top-level request.
///
/// Every clone is one counted reference. When the last clone is dropped the
/// document is flushed to the receiver returned by [`ResponseAccumulator::new`].
#[derive(Debug, Clone)]
pub struct ResponseAccumulator {
    inner: Arc<AccumulatorInner>,
}

impl ResponseAccumulator {
    pub fn new(document: Value) -> (Self, oneshot::Receiver<CompletedResponse>) {
        let (sender, receiver) = oneshot::channel();
        let accumulator = Self {
            inner: Arc::new(AccumulatorInner {
                request_id: generate_request_id(),
                document: Mutex::new(document),
                errors: Mutex::new(Vec::new()),
                on_complete: Mutex::new(Some(sender)),
            }),
        };
        (accumulator, receiver)
    }

    pub fn request_id(&self) -> &str {
        &self.inner.request_id
    }

    /// Number of outstanding references, including this one.
    pub fn reference_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }

    /// Runs `f` with exclusive access to the document. Never hold this across
    /// a suspension point.
    pub fn with_document<R>(&self, f: impl FnOnce(&mut Value) -> R) -> R {
        f(&mut self.inner.document.lock())
    }

    pub fn record_error(&self, err: ExpansionError) {
        self.inner.errors.lock().push(err);
    }

    pub fn error_count(&self) -> usize {
        self.inner.errors.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_flushes_when_last_reference_is_released() {
        let (accumulator, mut receiver) = ResponseAccumulator::new(json!({}));
        let branch = accumulator.clone();
        assert_eq!(accumulator.reference_count(), 2);

        drop(accumulator);
        assert!(receiver.try_recv().is_err());

        branch.with_document(|doc| doc["Name"] = json!("Processor Collection"));
        branch.record_error(ExpansionError::BackendUnavailable("offline".to_string()));
        drop(branch);

        let completed = receiver.await.unwrap();
        assert_eq!(completed.document, json!({ "Name": "Processor Collection" }));
        assert_eq!(completed.errors.len(), 1);
    }

    #[test]
    fn test_dropping_without_receiver_is_harmless() {
        let (accumulator, receiver) = ResponseAccumulator::new(json!({}));
        drop(receiver);
        drop(accumulator);
    }
}
