//! Settings sync with the KonomiTV server
//!
//! Keeps the in-memory settings, the local cache and the server copy in step.
//!
//! ## Flow
//!
//! 1. A local change is written to the cache and, when `sync_settings` is on
//!    and the user is logged in, pushed to the server
//! 2. Every 3 seconds the server copy is pulled into the store and cached
//! 3. Pushes and pulls share one guard, so a pulled change is never pushed
//!    straight back
//!
//! ## Usage
//!
//! ```ignore
//! let coordinator = SyncCoordinator::new(store, cache, remote, credentials);
//! let handle = coordinator.start()?;
//! // ...
//! handle.shutdown().await;
//! ```

mod coordinator;
mod guard;

pub use coordinator::{
    CoordinatorHandle, PollOutcome, SyncCommand, SyncCoordinator, SyncStats, POLL_INTERVAL,
};
pub use guard::{SyncGuard, SyncPhase, UploadPermit};
