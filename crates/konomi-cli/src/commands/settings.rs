//! Settings command handlers

use anyhow::{bail, Context, Result};
use serde_json::{Map, Value};

use konomi_core::{CredentialSource, SettingsDocument, SyncPhase, SYNC_EXCLUDED_KEYS};

use super::App;
use crate::output::Output;

/// Show all settings, or one
pub fn show(app: &App, key: Option<String>, output: &Output) -> Result<()> {
    let doc = app.cache.read();

    match key {
        Some(key) => {
            let Some(value) = doc.get(&key) else {
                bail!(
                    "Unknown setting: '{}'\nValid keys: {}",
                    key,
                    SettingsDocument::keys().join(", ")
                );
            };
            output.print_value(&key, &value);
        }
        None => {
            let Value::Object(fields) =
                serde_json::to_value(&doc).context("Failed to serialize settings")?
            else {
                bail!("Settings did not serialize to an object");
            };
            output.print_settings(&fields, SYNC_EXCLUDED_KEYS);
        }
    }

    Ok(())
}

/// Change one setting
///
/// Goes through the store like any other local change, so it is cached and,
/// when sync is on, pushed before the command exits.
pub async fn set(app: &App, key: String, value: String, output: &Output) -> Result<()> {
    let mut patch = Map::new();
    patch.insert(key.clone(), parse_value(&value));

    let store = app.open_store();

    if app.config.server_url.is_some() {
        let coordinator = app.coordinator(store.clone())?;
        let handle = coordinator.start()?;

        store.apply(&patch)?;
        let pushing = coordinator.phase() == SyncPhase::Uploading;
        handle.shutdown().await;

        let stats = coordinator.stats();
        if pushing && stats.failures == 0 {
            output.success(&format!("Set {} = {} (synced)", key, value));
        } else if pushing {
            output.success(&format!("Set {} = {} (sync failed, cached locally)", key, value));
        } else {
            output.success(&format!("Set {} = {}", key, value));
        }
    } else {
        store.apply(&patch)?;
        app.cache
            .write(&store.snapshot())
            .context("Failed to save settings")?;
        output.success(&format!("Set {} = {}", key, value));
    }

    if key == "sync_settings" && store.sync_enabled() && !app.tokens.is_authenticated() {
        output.message("Note: sync needs a login. Run `konomi login <token>`.");
    }

    Ok(())
}

/// Forget cached settings and go back to defaults
pub fn reset(app: &App, output: &Output) -> Result<()> {
    app.cache.clear().context("Failed to clear settings cache")?;
    output.success("Settings reset to defaults");
    Ok(())
}

/// Parse a command-line value as JSON, treating anything else as a string
///
/// `true`, `34` and `["gr011"]` become JSON values; `AlwaysFold` or
/// `1080p` become strings.
fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}
