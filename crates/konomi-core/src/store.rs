//! Settings store
//!
//! The `SettingsStore` holds the one in-memory settings document and tells
//! observers about every successful change.
//!
//! ## Notifications
//!
//! Observers are plain callbacks run on the mutating thread, after the
//! mutation is complete and with no store lock held, so an observer may read
//! the store again. Changes are never coalesced: each successful mutation
//! invokes every observer once, even if an earlier invocation is still
//! running elsewhere.
//!
//! ## Usage
//!
//! ```ignore
//! let store = Arc::new(SettingsStore::from_cache(&cache));
//! let id = store.subscribe(|doc| println!("sync: {}", doc.sync_settings));
//! store.update(|doc| doc.sync_settings = true);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde_json::{Map, Value};

use crate::cache::SettingsCache;
use crate::error::{SyncError, SyncResult};
use crate::settings::{ClientSettings, SettingsDocument};

/// Callback invoked after each change
pub type Observer = Arc<dyn Fn(&SettingsDocument) + Send + Sync>;

/// Handle returned by [`SettingsStore::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// In-memory source of truth for the settings document
pub struct SettingsStore {
    doc: RwLock<SettingsDocument>,
    observers: RwLock<Vec<(SubscriptionId, Observer)>>,
    next_id: AtomicU64,
}

impl SettingsStore {
    /// Create a store holding `doc`
    pub fn new(doc: SettingsDocument) -> Self {
        Self {
            doc: RwLock::new(doc),
            observers: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Seed a store from the last cached snapshot
    pub fn from_cache(cache: &SettingsCache) -> Self {
        Self::new(cache.read())
    }

    /// Clone of the current document
    pub fn snapshot(&self) -> SettingsDocument {
        self.read_doc().clone()
    }

    /// Whether server sync is switched on in the current document
    pub fn sync_enabled(&self) -> bool {
        self.read_doc().sync_enabled()
    }

    // ==================== Mutations ====================

    /// Mutate the document through a closure
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut SettingsDocument),
    {
        let snapshot = {
            let mut doc = self.write_doc();
            f(&mut *doc);
            doc.clone()
        };
        self.notify(&snapshot);
    }

    /// Apply a partial or full set of key/value pairs
    ///
    /// Invalid input leaves the document untouched and notifies no one.
    pub fn apply(&self, patch: &Map<String, Value>) -> SyncResult<()> {
        let snapshot = {
            let mut doc = self.write_doc();
            doc.apply_patch(patch)?;
            doc.clone()
        };
        self.notify(&snapshot);
        Ok(())
    }

    /// Apply a JSON object given as a `Value`
    pub fn apply_value(&self, patch: Value) -> SyncResult<()> {
        match patch {
            Value::Object(map) => self.apply(&map),
            other => Err(SyncError::InvalidSetting {
                key: "<document>".to_string(),
                details: format!("expected a JSON object, got {}", other),
            }),
        }
    }

    /// Take the sync-eligible fields from the server
    pub fn apply_remote(&self, remote: ClientSettings) {
        self.update(|doc| doc.merge_client_settings(remote));
    }

    /// Replace the whole document
    pub fn replace(&self, doc: SettingsDocument) {
        self.update(|current| *current = doc);
    }

    // ==================== Observers ====================

    /// Register a callback for every future change
    pub fn subscribe<F>(&self, observer: F) -> SubscriptionId
    where
        F: Fn(&SettingsDocument) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.observers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push((id, Arc::new(observer)));
        id
    }

    /// Remove a callback; returns false if it was not registered
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut observers = self.observers.write().unwrap_or_else(|e| e.into_inner());
        let before = observers.len();
        observers.retain(|(existing, _)| *existing != id);
        observers.len() != before
    }

    /// Number of registered callbacks
    pub fn observer_count(&self) -> usize {
        self.observers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    fn notify(&self, doc: &SettingsDocument) {
        // Copy the list so observers can subscribe or unsubscribe re-entrantly
        let observers: Vec<Observer> = self
            .observers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|(_, observer)| Arc::clone(observer))
            .collect();

        for observer in observers {
            observer(doc);
        }
    }

    fn read_doc(&self) -> RwLockReadGuard<'_, SettingsDocument> {
        self.doc.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_doc(&self) -> RwLockWriteGuard<'_, SettingsDocument> {
        self.doc.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for SettingsStore {
    fn default() -> Self {
        Self::new(SettingsDocument::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{PanelDisplayState, TvPanelTab};
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;
    use tempfile::TempDir;

    fn counting_observer(store: &SettingsStore) -> Arc<AtomicUsize> {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        store.subscribe(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        count
    }

    #[test]
    fn test_from_cache() {
        let temp_dir = TempDir::new().unwrap();
        let cache = SettingsCache::new(temp_dir.path().join("settings.json"));

        let mut doc = SettingsDocument::default();
        doc.caption_font = "Rounded M+ 1m".to_string();
        cache.write(&doc).unwrap();

        let store = SettingsStore::from_cache(&cache);
        assert_eq!(store.snapshot(), doc);
    }

    #[test]
    fn test_update_notifies_once_per_change() {
        let store = SettingsStore::default();
        let count = counting_observer(&store);

        store.update(|doc| doc.mute_fixed_comments = true);
        store.update(|doc| doc.mute_colored_comments = true);
        store.update(|doc| doc.mute_colored_comments = true);

        assert_eq!(count.load(Ordering::SeqCst), 3);
        assert!(store.snapshot().mute_colored_comments);
    }

    #[test]
    fn test_observer_sees_applied_document() {
        let store = Arc::new(SettingsStore::default());
        let seen = Arc::new(Mutex::new(Vec::new()));

        let reader = Arc::clone(&store);
        let log = Arc::clone(&seen);
        store.subscribe(move |doc| {
            // Re-reading the store from inside an observer must not deadlock
            assert_eq!(reader.snapshot(), *doc);
            log.lock().unwrap().push(doc.tv_panel_active_tab);
        });

        store.update(|doc| doc.tv_panel_active_tab = TvPanelTab::Comment);
        store.update(|doc| doc.tv_panel_active_tab = TvPanelTab::Twitter);

        assert_eq!(
            *seen.lock().unwrap(),
            vec![TvPanelTab::Comment, TvPanelTab::Twitter]
        );
    }

    #[test]
    fn test_apply_patch() {
        let store = SettingsStore::default();
        let count = counting_observer(&store);

        store
            .apply_value(json!({"panel_display_state": "AlwaysFold", "sync_settings": true}))
            .unwrap();

        let doc = store.snapshot();
        assert_eq!(doc.panel_display_state, PanelDisplayState::AlwaysFold);
        assert!(store.sync_enabled());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failed_apply_does_not_notify() {
        let store = SettingsStore::default();
        let count = counting_observer(&store);

        assert!(store
            .apply_value(json!({"panel_display_state": "Sometimes"}))
            .is_err());
        assert!(store.apply_value(json!(["not", "an", "object"])).is_err());

        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(store.snapshot(), SettingsDocument::default());
    }

    #[test]
    fn test_apply_remote_keeps_local_fields() {
        let store = SettingsStore::new(SettingsDocument {
            sync_settings: true,
            comment_delay_time: 3.0,
            ..Default::default()
        });

        let mut remote = ClientSettings::default();
        remote.saved_twitter_hashtags = vec!["#anime".to_string()];
        store.apply_remote(remote.clone());

        let doc = store.snapshot();
        assert_eq!(doc.to_client_settings(), remote);
        assert!(doc.sync_settings);
        assert_eq!(doc.comment_delay_time, 3.0);
    }

    #[test]
    fn test_unsubscribe() {
        let store = SettingsStore::default();
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        let id = store.subscribe(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(store.observer_count(), 1);

        store.replace(SettingsDocument::default());
        assert!(store.unsubscribe(id));
        assert!(!store.unsubscribe(id));
        store.replace(SettingsDocument::default());

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(store.observer_count(), 0);
    }
}
