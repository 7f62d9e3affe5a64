//! Run command handler
//!
//! Keeps the coordinator alive until Ctrl-C.

use anyhow::{Context, Result};
use tracing::info;

use konomi_core::CredentialSource;

use super::App;
use crate::output::Output;

/// Run settings sync in the foreground
pub async fn run(app: &App, output: &Output) -> Result<()> {
    let server_url = app.server_url()?.to_string();
    let store = app.open_store();
    let coordinator = app.coordinator(store.clone())?;

    let handle = coordinator.start()?;

    output.message(&format!("Syncing settings with {}", server_url));
    if !app.tokens.is_authenticated() {
        output.message("Not logged in - changes are cached locally until `konomi login`.");
    } else if !store.sync_enabled() {
        output.message(
            "Sync is disabled - enable it with `konomi settings set sync_settings true`.",
        );
    }
    output.message("Press Ctrl-C to stop.");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;

    info!("Shutting down settings sync");
    handle.shutdown().await;

    let stats = coordinator.stats();
    output.message(&format!(
        "Stopped. pulls: {}, pushes: {}, failures: {}",
        stats.pulls, stats.pushes, stats.failures
    ));

    Ok(())
}
