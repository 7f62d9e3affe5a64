//! Status command handler

use anyhow::Result;

use konomi_core::CredentialSource;

use super::App;
use crate::output::{Output, OutputFormat};

/// Show server, login and cache state
pub fn show(app: &App, output: &Output) -> Result<()> {
    let doc = app.cache.read();
    let logged_in = app.tokens.is_authenticated();
    let cache_path = app.cache.path();

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "server_url": app.config.server_url,
                    "logged_in": logged_in,
                    "sync_settings": doc.sync_settings,
                    "cache": {
                        "path": cache_path,
                        "exists": app.cache.exists()
                    }
                })
            );
        }
        OutputFormat::Quiet => {
            let active = app.config.server_url.is_some() && logged_in && doc.sync_settings;
            println!("{}", if active { "active" } else { "inactive" });
        }
        OutputFormat::Human => {
            println!("KonomiTV Settings Status");
            println!("========================");
            println!();
            println!("Server:");
            println!(
                "  URL:       {}",
                app.config.server_url.as_deref().unwrap_or("(not set)")
            );
            println!("  Logged in: {}", if logged_in { "yes" } else { "no" });
            println!();
            println!("Sync:");
            println!(
                "  Status: {}",
                if doc.sync_settings {
                    "enabled"
                } else {
                    "disabled"
                }
            );
            println!();
            println!("Cache:");
            println!("  Location: {}", cache_path.display());
            if !app.cache.exists() {
                println!("  (not written yet, using defaults)");
            }
        }
    }

    Ok(())
}
