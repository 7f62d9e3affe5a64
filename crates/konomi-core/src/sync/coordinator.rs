//! Sync coordinator
//!
//! Keeps the settings store, the local cache and the server copy
//! eventually consistent.
//!
//! - Local change: write the cache, then push to the server when sync is
//!   enabled and a token is present.
//! - Every [`POLL_INTERVAL`]: pull from the server into the store, then
//!   write the cache.
//!
//! Both paths share one [`SyncGuard`]. Applying a pulled document fires the
//! store's observers; the guard is held at that point, so the change is
//! dropped instead of being pushed straight back.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::guard::{SyncGuard, SyncPhase, UploadPermit};
use crate::cache::SettingsCache;
use crate::credentials::CredentialSource;
use crate::error::{SyncError, SyncResult};
use crate::remote::RemoteSettings;
use crate::settings::{ClientSettings, SettingsDocument};
use crate::store::{SettingsStore, SubscriptionId};

/// Period of the server poll
pub const POLL_INTERVAL: Duration = Duration::from_millis(3000);

/// Commands sent to the poll task
#[derive(Debug)]
pub enum SyncCommand {
    /// Stop polling
    Shutdown,
}

/// What a single poll did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// No access token
    NotAuthenticated,
    /// `sync_settings` is off
    Disabled,
    /// A push held the guard; try again next tick
    Busy,
    /// Server settings were applied and cached
    Updated,
    /// The fetch failed
    Failed,
}

/// Counters since the coordinator was created
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// Pushes started
    pub pushes: u64,
    /// Pulls started
    pub pulls: u64,
    /// Pushes or pulls that failed
    pub failures: u64,
    /// Change notifications ignored because the guard was held
    pub dropped_notifications: u64,
    /// Poll ticks skipped because a push was in flight
    pub skipped_polls: u64,
}

#[derive(Debug, Default)]
struct Counters {
    pushes: AtomicU64,
    pulls: AtomicU64,
    failures: AtomicU64,
    dropped_notifications: AtomicU64,
    skipped_polls: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> SyncStats {
        SyncStats {
            pushes: self.pushes.load(Ordering::Relaxed),
            pulls: self.pulls.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            dropped_notifications: self.dropped_notifications.load(Ordering::Relaxed),
            skipped_polls: self.skipped_polls.load(Ordering::Relaxed),
        }
    }
}

struct Inner {
    store: Arc<SettingsStore>,
    cache: SettingsCache,
    remote: Arc<dyn RemoteSettings>,
    credentials: Arc<dyn CredentialSource>,
    guard: SyncGuard,
    counters: Counters,
}

/// Orchestrates store, cache and server
///
/// Cheap to clone; clones share the same guard and counters.
#[derive(Clone)]
pub struct SyncCoordinator {
    inner: Arc<Inner>,
}

impl SyncCoordinator {
    /// Create a coordinator; nothing happens until [`start`](Self::start)
    pub fn new(
        store: Arc<SettingsStore>,
        cache: SettingsCache,
        remote: Arc<dyn RemoteSettings>,
        credentials: Arc<dyn CredentialSource>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                cache,
                remote,
                credentials,
                guard: SyncGuard::new(),
                counters: Counters::default(),
            }),
        }
    }

    /// Subscribe to store changes and start the poll loop
    ///
    /// Must be called from within a Tokio runtime. Polling runs until the
    /// returned handle is shut down or dropped.
    pub fn start(&self) -> SyncResult<CoordinatorHandle> {
        let runtime = Handle::try_current().map_err(|_| SyncError::NoRuntime)?;

        // Weak so the store's observer list doesn't keep the coordinator alive
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        let observer_runtime = runtime.clone();
        let subscription = self.inner.store.subscribe(move |doc| {
            if let Some(inner) = weak.upgrade() {
                SyncCoordinator { inner }.on_local_change(doc, &observer_runtime);
            }
        });

        let (command_tx, command_rx) = mpsc::channel(4);
        let poller = runtime.spawn(poll_loop(self.clone(), POLL_INTERVAL, command_rx));

        info!(
            "Settings sync started (poll every {} ms)",
            POLL_INTERVAL.as_millis()
        );

        Ok(CoordinatorHandle {
            coordinator: self.clone(),
            subscription,
            command_tx,
            poller,
        })
    }

    /// The store this coordinator keeps in sync
    pub fn store(&self) -> &Arc<SettingsStore> {
        &self.inner.store
    }

    pub fn phase(&self) -> SyncPhase {
        self.inner.guard.phase()
    }

    /// Watch guard transitions
    pub fn subscribe_phase(&self) -> watch::Receiver<SyncPhase> {
        self.inner.guard.subscribe()
    }

    pub fn stats(&self) -> SyncStats {
        self.inner.counters.snapshot()
    }

    /// Wait until no push or pull holds the guard
    pub async fn wait_idle(&self) {
        let mut rx = self.inner.guard.subscribe();
        // Only fails if the sender is gone, and the guard owns the sender
        let _ = rx.wait_for(|phase| *phase == SyncPhase::Idle).await;
    }

    /// Handle a store change notification
    fn on_local_change(&self, doc: &SettingsDocument, runtime: &Handle) {
        let inner = &self.inner;

        if inner.guard.is_uploading() {
            Counters::bump(&inner.counters.dropped_notifications);
            debug!("Settings changed while syncing, notification dropped");
            return;
        }

        // Observers can finish out of order across threads; cache the live
        // document rather than this notification's copy
        if let Err(e) = inner.cache.write_current(|| inner.store.snapshot()) {
            warn!("Failed to cache settings: {}", e);
        }

        if !doc.sync_enabled() {
            return;
        }
        let Some(token) = inner.credentials.access_token() else {
            return;
        };
        let Some(permit) = inner.guard.try_acquire() else {
            // Another thread got there between the check and the swap
            Counters::bump(&inner.counters.dropped_notifications);
            return;
        };

        let settings = doc.to_client_settings();
        let coordinator = self.clone();
        runtime.spawn(async move {
            coordinator.push(token, settings, permit).await;
        });
    }

    async fn push(&self, token: String, settings: ClientSettings, permit: UploadPermit) {
        Counters::bump(&self.inner.counters.pushes);

        match self.inner.remote.push(&token, &settings).await {
            Ok(()) => debug!("Settings uploaded to server"),
            Err(e) => self.record_failure("upload", &e),
        }

        drop(permit);
    }

    /// Pull once from the server
    ///
    /// This is what each poll tick runs. Failures are logged and reported
    /// through the outcome only.
    pub async fn poll_once(&self) -> PollOutcome {
        let inner = &self.inner;

        let Some(token) = inner.credentials.access_token() else {
            return PollOutcome::NotAuthenticated;
        };
        if !inner.store.sync_enabled() {
            return PollOutcome::Disabled;
        }
        let Some(_permit) = inner.guard.try_acquire() else {
            Counters::bump(&inner.counters.skipped_polls);
            debug!("Upload in progress, skipping poll");
            return PollOutcome::Busy;
        };

        Counters::bump(&inner.counters.pulls);
        match inner.remote.fetch(&token).await {
            Ok(remote) => {
                // Observers fire here and see the guard held
                inner.store.apply_remote(remote);
                if let Err(e) = inner.cache.write_current(|| inner.store.snapshot()) {
                    warn!("Failed to cache settings: {}", e);
                }
                debug!("Settings pulled from server");
                PollOutcome::Updated
            }
            Err(e) => {
                self.record_failure("download", &e);
                PollOutcome::Failed
            }
        }
    }

    fn record_failure(&self, what: &str, error: &SyncError) {
        Counters::bump(&self.inner.counters.failures);
        match error {
            SyncError::NotAuthenticated => {
                warn!("Settings {} rejected: access token is not valid", what)
            }
            e if e.is_transient() => debug!("Settings {} failed: {}", what, e),
            e => warn!("Settings {} failed: {}", what, e),
        }
    }
}

/// Background task that pulls on a fixed period
async fn poll_loop(
    coordinator: SyncCoordinator,
    period: Duration,
    mut command_rx: mpsc::Receiver<SyncCommand>,
) {
    // First pull one period after start; nothing is fetched at startup
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                coordinator.poll_once().await;
            }
            cmd = command_rx.recv() => {
                if matches!(cmd, Some(SyncCommand::Shutdown) | None) {
                    break;
                }
            }
        }
    }

    debug!("Settings poll loop stopped");
}

/// Running coordinator
///
/// Dropping it stops the poll loop and change handling without waiting for
/// an in-flight push; [`shutdown`](Self::shutdown) also waits for it.
pub struct CoordinatorHandle {
    coordinator: SyncCoordinator,
    subscription: SubscriptionId,
    command_tx: mpsc::Sender<SyncCommand>,
    poller: JoinHandle<()>,
}

impl CoordinatorHandle {
    pub fn coordinator(&self) -> &SyncCoordinator {
        &self.coordinator
    }

    /// Stop polling, stop reacting to changes, and let an in-flight push finish
    pub async fn shutdown(mut self) {
        let _ = self.command_tx.send(SyncCommand::Shutdown).await;
        let _ = (&mut self.poller).await;
        self.coordinator.store().unsubscribe(self.subscription);
        self.coordinator.wait_idle().await;
        info!("Settings sync stopped");
    }
}

impl Drop for CoordinatorHandle {
    fn drop(&mut self) {
        // The poll loop ends on its own once `command_tx` is gone
        self.coordinator.store().unsubscribe(self.subscription);
    }
}
