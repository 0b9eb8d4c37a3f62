// Mon Oct 19 2026 - Alex

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub const FINDING_SECTIONS: &str = "Finding valid sections";
pub const SCANNING_CANDIDATES: &str = "Scanning for potential classes";
pub const VALIDATING: &str = "Validating potential classes";
pub const PROCESSING_CLASSES: &str = "Processing class data";
pub const PROCESSING_PARENTS: &str = "Processing parent class data";
pub const DONE: &str = "Done";
pub const CANCELLED: &str = "Cancelled";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageState {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

#[derive(Debug)]
struct StageInner {
    message: String,
    state: StageState,
    start_time: Option<Instant>,
    end_time: Option<Instant>,
}

/// The coarse progress of a rebuild, shared with whoever polls it.
#[derive(Debug, Clone)]
pub struct StageTracker {
    inner: Arc<Mutex<StageInner>>,
}

impl Default for StageTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl StageTracker {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(StageInner {
                message: String::new(),
                state: StageState::Pending,
                start_time: None,
                end_time: None,
            })),
        }
    }

    pub fn start(&self) {
        let mut inner = self.inner.lock();
        inner.state = StageState::Running;
        inner.start_time = Some(Instant::now());
        inner.end_time = None;
    }

    pub fn set(&self, message: &str) {
        log::debug!("Stage: {}", message);
        self.inner.lock().message = message.to_string();
    }

    pub fn complete(&self) {
        self.finish(StageState::Completed, DONE.to_string());
    }

    pub fn fail(&self, reason: &str) {
        self.finish(StageState::Failed, format!("Error: {}", reason));
    }

    pub fn cancel(&self) {
        self.finish(StageState::Cancelled, CANCELLED.to_string());
    }

    fn finish(&self, state: StageState, message: String) {
        let mut inner = self.inner.lock();
        inner.state = state;
        inner.message = message;
        inner.end_time = Some(Instant::now());
    }

    pub fn message(&self) -> String {
        self.inner.lock().message.clone()
    }

    pub fn state(&self) -> StageState {
        self.inner.lock().state
    }

    pub fn duration(&self) -> Option<Duration> {
        let inner = self.inner.lock();
        match (inner.start_time, inner.end_time) {
            (Some(start), Some(end)) => Some(end.duration_since(start)),
            (Some(start), None) => Some(start.elapsed()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_lifecycle() {
        let stage = StageTracker::new();
        assert_eq!(stage.state(), StageState::Pending);

        stage.start();
        stage.set(SCANNING_CANDIDATES);
        assert_eq!(stage.message(), "Scanning for potential classes");
        assert_eq!(stage.state(), StageState::Running);

        stage.complete();
        assert_eq!(stage.message(), DONE);
        assert_eq!(stage.state(), StageState::Completed);
        assert!(stage.duration().is_some());
    }

    #[test]
    fn test_failure_message() {
        let stage = StageTracker::new();
        stage.start();
        stage.fail("no sections");
        assert_eq!(stage.message(), "Error: no sections");
        assert_eq!(stage.state(), StageState::Failed);
    }
}
