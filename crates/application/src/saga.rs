//! Compensation stack: the saga runner.
//!
//! Forward code pushes one compensating action after each step that
//! succeeded; on a later failure the orchestrator unwinds the stack, which
//! executes the compensations strictly in reverse completion order (LIFO).
//! An individual compensation failure is logged and never re-thrown, so
//! sibling compensations always run and the saga's already-determined
//! terminal outcome stands.

use futures::future::BoxFuture;
use std::future::Future;
use tracing::warn;

use counsel_domain::error::DomainError;
use counsel_domain::ports::{ChatClientError, IdentityError, MonitoringError};

/// Any failure a saga step or compensation can produce.
#[derive(thiserror::Error, Debug)]
pub enum SagaError {
    #[error(transparent)]
    Chat(#[from] ChatClientError),

    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Monitoring(#[from] MonitoringError),
}

struct Compensation {
    label: &'static str,
    run: BoxFuture<'static, Result<(), SagaError>>,
}

/// Ordered record of the compensating actions for every forward step that
/// has succeeded so far in one saga instance.
#[derive(Default)]
pub struct CompensationStack {
    entries: Vec<Compensation>,
}

impl CompensationStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the compensation for a step that just succeeded. The future
    /// must capture everything it needs; it is polled only during
    /// [`unwind`](Self::unwind).
    pub fn push<F>(&mut self, label: &'static str, compensation: F)
    where
        F: Future<Output = Result<(), SagaError>> + Send + 'static,
    {
        self.entries.push(Compensation {
            label,
            run: Box::pin(compensation),
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop all recorded compensations without running them (success path).
    pub fn discharge(mut self) {
        self.entries.clear();
    }

    /// Execute every recorded compensation in reverse completion order.
    /// Returns how many ran clean; failures are logged and skipped so the
    /// remaining compensations still execute.
    pub async fn unwind(self) -> usize {
        let total = self.entries.len();
        let mut clean = 0;
        for compensation in self.entries.into_iter().rev() {
            match compensation.run.await {
                Ok(()) => clean += 1,
                Err(err) => {
                    warn!(
                        step = compensation.label,
                        error = %err,
                        "compensation failed, continuing with remaining compensations"
                    );
                }
            }
        }
        if clean < total {
            warn!(
                clean,
                total, "partial cleanup after compensation, operator follow-up needed"
            );
        }
        clean
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn recording(
        log: &Arc<Mutex<Vec<&'static str>>>,
        label: &'static str,
        fail: bool,
    ) -> impl Future<Output = Result<(), SagaError>> + Send + 'static {
        let log = Arc::clone(log);
        async move {
            log.lock().unwrap().push(label);
            if fail {
                Err(SagaError::Domain(DomainError::Storage(
                    "injected failure".to_string(),
                )))
            } else {
                Ok(())
            }
        }
    }

    #[tokio::test]
    async fn unwinds_in_reverse_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut stack = CompensationStack::new();
        stack.push("first", recording(&log, "first", false));
        stack.push("second", recording(&log, "second", false));
        stack.push("third", recording(&log, "third", false));

        let clean = stack.unwind().await;
        assert_eq!(clean, 3);
        assert_eq!(*log.lock().unwrap(), vec!["third", "second", "first"]);
    }

    #[tokio::test]
    async fn failed_compensation_does_not_stop_siblings() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut stack = CompensationStack::new();
        stack.push("first", recording(&log, "first", false));
        stack.push("second", recording(&log, "second", true));
        stack.push("third", recording(&log, "third", false));

        let clean = stack.unwind().await;
        assert_eq!(clean, 2);
        assert_eq!(*log.lock().unwrap(), vec!["third", "second", "first"]);
    }

    #[tokio::test]
    async fn discharge_runs_nothing() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut stack = CompensationStack::new();
        stack.push("only", recording(&log, "only", false));
        assert_eq!(stack.len(), 1);

        stack.discharge();
        assert!(log.lock().unwrap().is_empty());
    }
}
