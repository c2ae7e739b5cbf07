//! HTTP client for the Watson Conversation message endpoint.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::types::{Context, MessageRequest, MessageResponse};

const DEFAULT_BASE_URL: &str = "https://gateway.watsonplatform.net/conversation/api";
const DEFAULT_VERSION: &str = "v1";
const DEFAULT_VERSION_DATE: &str = "2017-02-03";

#[derive(Debug, thiserror::Error)]
pub enum WatsonError {
    /// Transport or decode failure, displayed as reqwest reports it.
    #[error(transparent)]
    Request(#[from] reqwest::Error),
    /// Non-2xx reply. Displays the service's own message so callers see it unmodified.
    #[error("{message}")]
    Api { status: u16, message: String },
}

impl WatsonError {
    /// HTTP status of an API error; `None` for transport failures.
    pub fn status(&self) -> Option<u16> {
        match self {
            WatsonError::Request(e) => e.status().map(|s| s.as_u16()),
            WatsonError::Api { status, .. } => Some(*status),
        }
    }
}

/// Credentials and endpoint for the service. Passed through verbatim to the client.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionSettings {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// API version path segment (e.g. "v1").
    #[serde(default = "default_version")]
    pub version: String,
    /// Dated API version sent as the `version` query parameter.
    #[serde(default = "default_version_date", alias = "version_date")]
    pub version_date: String,
    #[serde(default = "default_base_url")]
    pub url: String,
    /// Per-request timeout. Unset means the transport default.
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "timeout_secs")]
    pub timeout_secs: Option<u64>,
}

fn default_version() -> String {
    DEFAULT_VERSION.to_string()
}

fn default_version_date() -> String {
    DEFAULT_VERSION_DATE.to_string()
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            username: String::new(),
            password: String::new(),
            version: default_version(),
            version_date: default_version_date(),
            url: default_base_url(),
            timeout_secs: None,
        }
    }
}

impl ConnectionSettings {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            ..Self::default()
        }
    }
}

impl fmt::Debug for ConnectionSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionSettings")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("version", &self.version)
            .field("version_date", &self.version_date)
            .field("url", &self.url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Anything that can answer a message call. Implemented by [`ConversationClient`]; test doubles
/// and alternate transports implement it too.
#[async_trait]
pub trait ConversationService: fmt::Debug + Send + Sync {
    /// Send `text` to the workspace with the prior `context` (absent on the first turn).
    async fn message(
        &self,
        workspace_id: &str,
        context: Option<&Context>,
        text: &str,
    ) -> Result<MessageResponse, WatsonError>;
}

/// Client for the Watson Conversation HTTP API. Cheap to clone; the connection pool is shared.
#[derive(Debug, Clone)]
pub struct ConversationClient {
    settings: ConnectionSettings,
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: String,
}

impl ConversationClient {
    pub fn new(settings: ConnectionSettings) -> Self {
        let base_url = settings.url.trim_end_matches('/').to_string();
        Self {
            settings,
            base_url,
            client: reqwest::Client::new(),
        }
    }

    fn message_url(&self, workspace_id: &str) -> String {
        format!(
            "{}/{}/workspaces/{}/message",
            self.base_url, self.settings.version, workspace_id
        )
    }

    /// POST /{version}/workspaces/{workspace_id}/message?version={version_date}
    pub async fn send(
        &self,
        workspace_id: &str,
        body: &MessageRequest,
    ) -> Result<MessageResponse, WatsonError> {
        let url = self.message_url(workspace_id);
        let mut req = self
            .client
            .post(&url)
            .query(&[("version", self.settings.version_date.as_str())])
            .basic_auth(&self.settings.username, Some(&self.settings.password))
            .json(body);
        if let Some(secs) = self.settings.timeout_secs {
            req = req.timeout(Duration::from_secs(secs));
        }
        let res = req.send().await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(api_error(status, &body));
        }
        let data: MessageResponse = res.json().await?;
        Ok(data)
    }
}

/// Prefer the service's `error` field; fall back to status line plus raw body.
fn api_error(status: reqwest::StatusCode, body: &str) -> WatsonError {
    let message = serde_json::from_str::<ApiErrorBody>(body)
        .map(|b| b.error)
        .unwrap_or_else(|_| format!("{} {}", status, body).trim_end().to_string());
    WatsonError::Api {
        status: status.as_u16(),
        message,
    }
}

#[async_trait]
impl ConversationService for ConversationClient {
    async fn message(
        &self,
        workspace_id: &str,
        context: Option<&Context>,
        text: &str,
    ) -> Result<MessageResponse, WatsonError> {
        let body = MessageRequest::new(text, context.cloned());
        self.send(workspace_id, &body).await
    }
}
