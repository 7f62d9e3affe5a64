//! Command handlers
//!
//! Every command works from the same pieces: configuration, the settings
//! cache, and the stored access token. `App` bundles them.

pub mod auth;
pub mod config;
pub mod run;
pub mod settings;
pub mod status;
pub mod sync;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};

use konomi_core::{Config, HttpRemote, SettingsCache, SettingsStore, SyncCoordinator, TokenFile};

/// Shared state for command handlers
pub struct App {
    pub config: Config,
    pub cache: SettingsCache,
    pub tokens: TokenFile,
}

impl App {
    /// Load configuration and locate the cache and token
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        let config =
            Config::load_with_cli_override(config_path).context("Failed to load configuration")?;
        Ok(Self::with_config(config))
    }

    pub fn with_config(config: Config) -> Self {
        let cache = SettingsCache::from_config(&config);
        let tokens = TokenFile::from_config(&config);
        Self {
            config,
            cache,
            tokens,
        }
    }

    /// Seed a store from the cache (startup read)
    pub fn open_store(&self) -> Arc<SettingsStore> {
        Arc::new(SettingsStore::from_cache(&self.cache))
    }

    /// Configured server URL, or an error telling the user how to set it
    pub fn server_url(&self) -> Result<&str> {
        let Some(ref url) = self.config.server_url else {
            bail!(
                "Server URL not configured. Set it with:\n  \
                 konomi config set server_url http://your-server:7000"
            );
        };
        Ok(url)
    }

    /// Build a coordinator for `store` against the configured server
    pub fn coordinator(&self, store: Arc<SettingsStore>) -> Result<SyncCoordinator> {
        let remote = HttpRemote::new(self.server_url()?).context("Failed to create HTTP client")?;
        Ok(SyncCoordinator::new(
            store,
            self.cache.clone(),
            Arc::new(remote),
            Arc::new(self.tokens.clone()),
        ))
    }
}
