//! Watson Conversation incoming middleware.
//!
//! For each text update: send the text and the session's stored context to the workspace, then
//! store the returned context on the session and attach the full reply to the update. Updates
//! without text pass through untouched.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::middleware::{BotInfo, IncomingController, Middleware};
use crate::update::Update;
use crate::watson::{ConnectionSettings, ConversationClient, ConversationService, WatsonError};

/// Name the ware registers under.
pub const WARE_NAME: &str = "watson-conversation-middleware";

/// Default log target; override per instance with [`WatsonConversationWare::with_log_target`].
pub const DEFAULT_LOG_TARGET: &str = "botmaster::watson_conversation_ware";

/// Which required option was absent at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingOption {
    Settings,
    WorkspaceId,
}

#[derive(Debug, thiserror::Error)]
pub enum WareError {
    /// Missing settings or workspace id. Fatal; no ware is built.
    #[error(
        "In order to create a watson conversation middleware, you need to pass in options that contain settings and workspaceId keys"
    )]
    Configuration(MissingOption),
    /// No session on the update: the session middleware is not installed, or runs after this one.
    #[error("Watson conversation ware needs to be used with SessionWare.")]
    MissingSession,
    /// The service call failed. Carries the service error as-is.
    #[error(transparent)]
    Upstream(#[from] WatsonError),
}

/// Construction options. Both fields are required.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WareOptions {
    #[serde(default)]
    pub settings: Option<ConnectionSettings>,
    #[serde(default)]
    pub workspace_id: Option<String>,
}

impl WareOptions {
    pub fn new(settings: ConnectionSettings, workspace_id: impl Into<String>) -> Self {
        Self {
            settings: Some(settings),
            workspace_id: Some(workspace_id.into()),
        }
    }

    /// Check both options are present; returns them by reference. The workspace id is passed
    /// through as given; whitespace-only counts as missing.
    fn require(&self) -> Result<(&ConnectionSettings, &str), WareError> {
        let settings = self
            .settings
            .as_ref()
            .ok_or(WareError::Configuration(MissingOption::Settings))?;
        let workspace_id = self
            .workspace_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
            .ok_or(WareError::Configuration(MissingOption::WorkspaceId))?;
        Ok((settings, workspace_id))
    }
}

/// The ware's controller. Holds only immutable state, so one instance serves concurrent turns.
#[derive(Debug)]
pub struct WatsonConversationWare {
    workspace_id: String,
    service: Arc<dyn ConversationService>,
    log_target: String,
}

impl WatsonConversationWare {
    /// Build the ware over an HTTP client made from `options.settings`.
    pub fn new(options: &WareOptions) -> Result<Middleware, WareError> {
        Ok(Self::controller(options)?.into_middleware())
    }

    /// Build the ware over any service implementation. Options are validated the same way.
    pub fn with_service(
        options: &WareOptions,
        service: Arc<dyn ConversationService>,
    ) -> Result<Self, WareError> {
        let (_, workspace_id) = options.require()?;
        Ok(Self {
            workspace_id: workspace_id.to_string(),
            service,
            log_target: DEFAULT_LOG_TARGET.to_string(),
        })
    }

    /// Build the bare controller with its own HTTP client (use [`Self::into_middleware`] to register it).
    pub fn controller(options: &WareOptions) -> Result<Self, WareError> {
        let (settings, _) = options.require()?;
        let client = ConversationClient::new(settings.clone());
        Self::with_service(options, Arc::new(client))
    }

    pub fn with_log_target(mut self, target: impl Into<String>) -> Self {
        self.log_target = target.into();
        self
    }

    pub fn workspace_id(&self) -> &str {
        &self.workspace_id
    }

    pub fn into_middleware(self) -> Middleware {
        Middleware::incoming(WARE_NAME, Arc::new(self))
    }
}

#[async_trait]
impl IncomingController for WatsonConversationWare {
    async fn handle(&self, bot: &BotInfo, update: &mut Update) -> Result<(), WareError> {
        let target = self.log_target.as_str();
        if update.session.is_none() {
            return Err(WareError::MissingSession);
        }
        let Some(text) = update.text_content().map(str::to_owned) else {
            log::debug!(target: target, "Got an update with no text, not sending it to Watson");
            return Ok(());
        };

        let prior = update
            .session
            .as_ref()
            .and_then(|s| s.watson_context.as_ref());
        log::debug!(
            target: target,
            "sending message from {} on {}/{} to workspace {} (context: {})",
            update.sender.id,
            bot.kind,
            bot.id.as_deref().unwrap_or("-"),
            self.workspace_id,
            if prior.is_some() { "carried" } else { "new" }
        );
        let response = match self.service.message(&self.workspace_id, prior, &text).await {
            Ok(r) => r,
            Err(e) => {
                log::debug!(
                    target: target,
                    "watson message failed (status {:?}): {}",
                    e.status(),
                    e
                );
                return Err(WareError::Upstream(e));
            }
        };

        if let Some(session) = update.session.as_mut() {
            session.watson_context = response.context().cloned();
        }
        update.watson_update = Some(response);
        update.watson_conversation = Some(Arc::clone(&self.service));
        Ok(())
    }
}
