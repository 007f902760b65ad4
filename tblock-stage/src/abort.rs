//! Cooperative cancellation checkpoints.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use crate::error::{StageError, StageResult};

/// Shared interrupt flag checked at every staging checkpoint.
///
/// Cloning shares the flag, so a signal listener can hold one handle while
/// the staging code polls another.
#[derive(Debug, Clone, Default)]
pub struct AbortSignal {
    aborted: Arc<AtomicBool>,
    fuse: Option<Arc<AtomicUsize>>,
}

impl AbortSignal {
    /// Creates an untriggered signal.
    pub fn new() -> Self {
        Self::default()
    }

    /// A signal that trips by itself after `checks` successful checkpoints.
    ///
    /// Used for fault injection: sweeping `checks` from zero upwards aborts a
    /// run at every checkpoint in turn.
    pub fn with_fuse(checks: usize) -> Self {
        Self {
            aborted: Arc::new(AtomicBool::new(false)),
            fuse: Some(Arc::new(AtomicUsize::new(checks))),
        }
    }

    /// Requests an abort.
    pub fn trigger(&self) {
        self.aborted.store(true, Ordering::SeqCst);
    }

    /// Returns true once an abort was requested.
    pub fn is_triggered(&self) -> bool {
        self.aborted.load(Ordering::SeqCst)
    }

    /// Checkpoint: fails with [`StageError::Interrupted`] once triggered.
    pub fn check(&self) -> StageResult<()> {
        if let Some(fuse) = &self.fuse {
            let burnt = fuse
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_err();
            if burnt {
                self.trigger();
            }
        }

        if self.is_triggered() {
            Err(StageError::Interrupted)
        } else {
            Ok(())
        }
    }
}
