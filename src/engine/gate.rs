// Mon Oct 19 2026 - Alex

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Single-flight flag: at most one holder at a time.
#[derive(Debug, Clone, Default)]
pub struct Gate {
    active: Arc<AtomicBool>,
}

impl Gate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes the gate, or `None` when someone already holds it.
    pub fn try_acquire(&self) -> Option<GateGuard> {
        self.active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| GateGuard { active: Arc::clone(&self.active) })
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}

/// Releases its gate when dropped, unwinding included.
#[derive(Debug)]
pub struct GateGuard {
    active: Arc<AtomicBool>,
}

impl Drop for GateGuard {
    fn drop(&mut self) {
        self.active.store(false, Ordering::Release);
    }
}
