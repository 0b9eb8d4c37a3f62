// Mon Oct 19 2026 - Alex

use crate::rtti::RttiError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Cooperative cancellation flag shared between a task and its handle.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Returns `Err(Cancelled)` once cancellation was requested.
    pub fn check(&self) -> Result<(), RttiError> {
        if self.is_cancelled() {
            Err(RttiError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// A background session operation that can be cancelled or awaited.
pub struct TaskHandle<T> {
    name: String,
    token: CancellationToken,
    handle: JoinHandle<Result<T, RttiError>>,
}

impl<T: Send + 'static> TaskHandle<T> {
    pub(crate) fn spawn<F>(name: &str, token: CancellationToken, work: F) -> Result<Self, RttiError>
    where
        F: FnOnce() -> Result<T, RttiError> + Send + 'static,
    {
        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(work)
            .map_err(|e| RttiError::TaskPanicked(format!("failed to spawn {}: {}", name, e)))?;

        Ok(Self { name: name.to_string(), token, handle })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub fn join(self) -> Result<T, RttiError> {
        self.handle.join().map_err(|payload| {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            RttiError::TaskPanicked(format!("{}: {}", self.name, message))
        })?
    }
}
