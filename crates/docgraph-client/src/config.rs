use std::env;
use std::time::Duration;

use anyhow::Context;
use uuid::Uuid;

pub const DEFAULT_SERVER_URL: &str = "http://localhost:3000";
pub const DEFAULT_SYNC_TIMEOUT_MS: u64 = 10_000;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub server_url: String,
    pub api_token: Option<String>,
    /// Overrides the workspace remembered in the session file.
    pub workspace_id: Option<Uuid>,
    /// How long a mutation may wait for the backend before it is rolled back.
    pub sync_timeout: Duration,
}

impl ClientConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let workspace_id = match env::var("DOCGRAPH_WORKSPACE_ID") {
            Ok(raw) if !raw.trim().is_empty() => Some(
                raw.trim()
                    .parse()
                    .context("DOCGRAPH_WORKSPACE_ID is not a valid UUID")?,
            ),
            _ => None,
        };

        let sync_timeout_ms = match env::var("DOCGRAPH_SYNC_TIMEOUT_MS") {
            Ok(raw) => raw
                .trim()
                .parse()
                .context("DOCGRAPH_SYNC_TIMEOUT_MS must be a number of milliseconds")?,
            Err(_) => DEFAULT_SYNC_TIMEOUT_MS,
        };

        Ok(Self {
            server_url: env::var("DOCGRAPH_SERVER_URL")
                .unwrap_or_else(|_| DEFAULT_SERVER_URL.to_string()),
            api_token: env::var("DOCGRAPH_API_TOKEN")
                .ok()
                .filter(|t| !t.trim().is_empty()),
            workspace_id,
            sync_timeout: Duration::from_millis(sync_timeout_ms),
        })
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            api_token: None,
            workspace_id: None,
            sync_timeout: Duration::from_millis(DEFAULT_SYNC_TIMEOUT_MS),
        }
    }
}
