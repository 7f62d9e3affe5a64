//! Sync command handler

use anyhow::{bail, Result};

use konomi_core::PollOutcome;

use super::App;
use crate::output::Output;

/// Pull settings from the server once
pub async fn sync(app: &App, output: &Output) -> Result<()> {
    let server_url = app.server_url()?.to_string();
    let store = app.open_store();
    let coordinator = app.coordinator(store)?;

    output.message(&format!("Pulling settings from {}...", server_url));

    match coordinator.poll_once().await {
        PollOutcome::Updated => {
            output.success("Sync complete - settings updated from server");
            Ok(())
        }
        PollOutcome::NotAuthenticated => bail!(
            "Not logged in. Store an access token with:\n  \
             konomi login <token>"
        ),
        PollOutcome::Disabled => bail!(
            "Settings sync is disabled. Enable it with:\n  \
             konomi settings set sync_settings true"
        ),
        PollOutcome::Busy => bail!("Another sync is in progress, try again"),
        PollOutcome::Failed => bail!("Sync failed. Run with --verbose for details."),
    }
}
