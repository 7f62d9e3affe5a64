//! Access token lookup
//!
//! Sync only needs to know whether the user is logged in and, if so, which
//! bearer token to send. Obtaining the token is someone else's job.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::config::Config;

/// Environment variable that overrides the stored token
const TOKEN_ENV: &str = "KONOMI_ACCESS_TOKEN";

/// Source of the current access token
pub trait CredentialSource: Send + Sync {
    /// The token if the user is logged in
    fn access_token(&self) -> Option<String>;

    fn is_authenticated(&self) -> bool {
        self.access_token().is_some()
    }
}

/// Fixed token, mostly for tests and embedding
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials {
    token: Option<String>,
}

impl StaticCredentials {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
        }
    }

    pub fn anonymous() -> Self {
        Self { token: None }
    }
}

impl CredentialSource for StaticCredentials {
    fn access_token(&self) -> Option<String> {
        self.token.clone()
    }
}

/// Token stored in `<data_dir>/access_token`
///
/// Read on every call, so `konomi login` / `konomi logout` take effect on a
/// running daemon at its next sync.
#[derive(Debug, Clone)]
pub struct TokenFile {
    path: PathBuf,
}

impl TokenFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.access_token_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Store a token (login)
    pub fn store(&self, token: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {:?}", parent))?;
        }
        fs::write(&self.path, token.trim())
            .with_context(|| format!("Failed to write access token to {:?}", self.path))
    }

    /// Remove the token (logout)
    pub fn remove(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => {
                Err(e).with_context(|| format!("Failed to remove access token {:?}", self.path))
            }
        }
    }
}

impl CredentialSource for TokenFile {
    fn access_token(&self) -> Option<String> {
        if let Ok(token) = std::env::var(TOKEN_ENV) {
            return non_empty(token);
        }

        fs::read_to_string(&self.path).ok().and_then(non_empty)
    }
}

fn non_empty(token: String) -> Option<String> {
    let token = token.trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}
