//! KonomiTV Client Settings Core
//!
//! This crate keeps a KonomiTV client's settings consistent across three
//! places: the in-memory store, a durable local cache, and the copy the
//! server keeps per user.
//!
//! # Architecture
//!
//! - **Store**: single source of truth, notifies observers on change
//! - **Cache**: JSON snapshot on disk, read once at startup
//! - **Remote**: `/api/settings/client` on the KonomiTV server
//! - **Coordinator**: pushes local changes, polls the server, and keeps the
//!   two from feeding each other
//!
//! # Quick Start
//!
//! ```text
//! let config = Config::load()?;
//! let cache = SettingsCache::from_config(&config);
//! let store = Arc::new(SettingsStore::from_cache(&cache));
//!
//! let remote = Arc::new(HttpRemote::new("http://localhost:7000")?);
//! let credentials = Arc::new(TokenFile::from_config(&config));
//! let handle = SyncCoordinator::new(store.clone(), cache, remote, credentials).start()?;
//!
//! store.update(|doc| doc.tv_show_superimpose = false);
//! ```
//!
//! # Modules
//!
//! - `settings`: the settings document and its synced projection
//! - `store`: in-memory store with change observers
//! - `cache`: local persistence
//! - `remote`: server client
//! - `credentials`: access token lookup
//! - `sync`: the coordinator
//! - `config`: application configuration

pub mod cache;
pub mod config;
pub mod credentials;
pub mod error;
pub mod remote;
pub mod settings;
pub mod store;
pub mod sync;

pub use cache::SettingsCache;
pub use config::Config;
pub use credentials::{CredentialSource, StaticCredentials, TokenFile};
pub use error::{SyncError, SyncResult};
pub use remote::{HttpRemote, RemoteSettings};
pub use settings::{ClientSettings, SettingsDocument, SYNC_EXCLUDED_KEYS};
pub use store::{SettingsStore, SubscriptionId};
pub use sync::{CoordinatorHandle, PollOutcome, SyncCoordinator, SyncPhase, SyncStats};
