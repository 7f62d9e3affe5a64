//! Remote settings client
//!
//! Thin wrapper over the server's client settings resource:
//!
//! - `GET /api/settings/client` returns the stored settings
//! - `PUT /api/settings/client` replaces them and answers 204 No Content
//!
//! Both need a bearer token. Neither call retries; callers decide what a
//! failure means.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::debug;

use crate::error::{SyncError, SyncResult};
use crate::settings::ClientSettings;

/// Path of the client settings resource
pub const SETTINGS_PATH: &str = "/api/settings/client";

/// Request timeout in seconds
const REQUEST_TIMEOUT: u64 = 10;

/// Server-side copy of the user's settings
#[async_trait]
pub trait RemoteSettings: Send + Sync {
    /// Fetch the settings stored on the server
    async fn fetch(&self, token: &str) -> SyncResult<ClientSettings>;

    /// Replace the settings stored on the server
    async fn push(&self, token: &str, settings: &ClientSettings) -> SyncResult<()>;
}

/// HTTP implementation against a KonomiTV server
#[derive(Debug, Clone)]
pub struct HttpRemote {
    http: reqwest::Client,
    endpoint: String,
}

impl HttpRemote {
    /// Create a client for the server at `base_url`
    pub fn new(base_url: &str) -> SyncResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT))
            .user_agent(concat!("konomi/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            endpoint: format!("{}{}", base_url.trim_end_matches('/'), SETTINGS_PATH),
        })
    }

    /// Full URL of the settings resource
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl RemoteSettings for HttpRemote {
    async fn fetch(&self, token: &str) -> SyncResult<ClientSettings> {
        debug!("GET {}", self.endpoint);
        let response = self
            .http
            .get(&self.endpoint)
            .bearer_auth(token)
            .send()
            .await?;

        check_status(response.status())?;
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    async fn push(&self, token: &str, settings: &ClientSettings) -> SyncResult<()> {
        debug!("PUT {}", self.endpoint);
        let response = self
            .http
            .put(&self.endpoint)
            .bearer_auth(token)
            .json(settings)
            .send()
            .await?;

        check_status(response.status())
    }
}

fn check_status(status: StatusCode) -> SyncResult<()> {
    if status == StatusCode::UNAUTHORIZED {
        return Err(SyncError::NotAuthenticated);
    }
    if !status.is_success() {
        return Err(SyncError::Status {
            status: status.as_u16(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{SettingsDocument, TwitterTab};
    use httpmock::prelude::*;
    use serde_json::json;

    #[test]
    fn test_endpoint_joins_base_url() {
        let remote = HttpRemote::new("http://localhost:7000/").unwrap();
        assert_eq!(remote.endpoint(), "http://localhost:7000/api/settings/client");
    }

    #[tokio::test]
    async fn test_fetch_decodes_settings() {
        let server = MockServer::start_async().await;
        let mut expected = ClientSettings::default();
        expected.pinned_channel_ids = vec!["gr011".to_string()];
        expected.twitter_active_tab = TwitterTab::Search;
        let body = serde_json::to_value(&expected).unwrap();

        let mock = server.mock(move |when, then| {
            when.method(GET)
                .path(SETTINGS_PATH)
                .header("authorization", "Bearer secret");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(body);
        });

        let remote = HttpRemote::new(&server.base_url()).unwrap();
        let fetched = remote.fetch("secret").await.unwrap();

        mock.assert();
        assert_eq!(fetched, expected);
    }

    #[tokio::test]
    async fn test_fetch_rejects_partial_body() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path(SETTINGS_PATH);
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({"pinned_channel_ids": ["gr011"]}));
        });

        let remote = HttpRemote::new(&server.base_url()).unwrap();
        let err = remote.fetch("secret").await.unwrap_err();
        assert!(matches!(err, SyncError::Decode(_)));
    }

    #[tokio::test]
    async fn test_push_sends_only_synced_fields() {
        let mut doc = SettingsDocument::default();
        doc.tv_show_superimpose = false;
        doc.sync_settings = true;
        let settings = doc.to_client_settings();
        let wire = serde_json::to_value(&settings).unwrap();
        assert!(wire.get("sync_settings").is_none());
        assert_eq!(wire["tv_show_superimpose"], json!(false));

        let server = MockServer::start_async().await;
        let mock = server.mock(move |when, then| {
            when.method(PUT)
                .path(SETTINGS_PATH)
                .header("authorization", "Bearer secret")
                .json_body(wire);
            then.status(204);
        });

        let remote = HttpRemote::new(&server.base_url()).unwrap();
        remote.push("secret", &settings).await.unwrap();
        mock.assert();
    }

    #[tokio::test]
    async fn test_unauthorized_is_classified() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path(SETTINGS_PATH);
            then.status(401)
                .json_body(json!({"detail": "Not authenticated"}));
        });

        let remote = HttpRemote::new(&server.base_url()).unwrap();
        let err = remote.fetch("expired").await.unwrap_err();
        assert!(matches!(err, SyncError::NotAuthenticated));
    }

    #[tokio::test]
    async fn test_server_error_is_classified() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(PUT).path(SETTINGS_PATH);
            then.status(500);
        });

        let remote = HttpRemote::new(&server.base_url()).unwrap();
        let err = remote
            .push("secret", &ClientSettings::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Status { status: 500 }));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_unreachable_server_is_transport_failure() {
        // Nothing listens on port 9 locally
        let remote = HttpRemote::new("http://127.0.0.1:9").unwrap();
        let err = remote.fetch("secret").await.unwrap_err();
        assert!(matches!(err, SyncError::Transport(_)));
    }
}
