//! Login and logout handlers

use anyhow::{bail, Result};

use super::App;
use crate::output::Output;

/// Save an access token for the server
pub fn login(app: &App, token: String, output: &Output) -> Result<()> {
    let token = token.trim();
    if token.is_empty() {
        bail!("Access token is empty");
    }

    app.tokens.store(token)?;
    output.success(&format!(
        "Access token saved to {}",
        app.tokens.path().display()
    ));

    Ok(())
}

/// Forget the stored access token
///
/// Sync stops on the next poll; cached settings stay as they are.
pub fn logout(app: &App, output: &Output) -> Result<()> {
    app.tokens.remove()?;
    output.success("Logged out");
    Ok(())
}
