//! Upload guard
//!
//! A single flag shared by pushes and pulls so at most one of them talks to
//! the server at a time. Acquiring is a compare-and-swap; the returned
//! permit resets the flag when dropped, whatever happened in between.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::watch;

/// Guard state as seen from outside
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    /// Nothing in flight
    Idle,
    /// A push or pull holds the guard
    Uploading,
}

/// Process-wide "upload in progress" flag
#[derive(Debug, Clone)]
pub struct SyncGuard {
    uploading: Arc<AtomicBool>,
    phase: Arc<watch::Sender<SyncPhase>>,
}

impl SyncGuard {
    pub fn new() -> Self {
        let (phase, _) = watch::channel(SyncPhase::Idle);
        Self {
            uploading: Arc::new(AtomicBool::new(false)),
            phase: Arc::new(phase),
        }
    }

    /// Take the guard if it is free (`Idle -> Uploading`)
    pub fn try_acquire(&self) -> Option<UploadPermit> {
        self.uploading
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        self.phase.send_modify(|phase| *phase = SyncPhase::Uploading);

        Some(UploadPermit {
            guard: self.clone(),
        })
    }

    pub fn is_uploading(&self) -> bool {
        self.uploading.load(Ordering::Acquire)
    }

    pub fn phase(&self) -> SyncPhase {
        *self.phase.borrow()
    }

    /// Watch guard transitions
    pub fn subscribe(&self) -> watch::Receiver<SyncPhase> {
        self.phase.subscribe()
    }

    fn release(&self) {
        // Flip the flag under the watch lock so a racing acquire can't have
        // its `Uploading` overwritten by this `Idle`
        self.phase.send_modify(|phase| {
            *phase = SyncPhase::Idle;
            self.uploading.store(false, Ordering::Release);
        });
    }
}

impl Default for SyncGuard {
    fn default() -> Self {
        Self::new()
    }
}

/// Proof of holding the guard; releases it on drop
#[derive(Debug)]
pub struct UploadPermit {
    guard: SyncGuard,
}

impl Drop for UploadPermit {
    fn drop(&mut self) {
        self.guard.release();
    }
}
