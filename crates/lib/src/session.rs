//! Per-user session carried on each update.
//!
//! The session collaborator upstream owns loading and persisting it; the ware only reads and
//! replaces the Watson context stored here.

use serde::{Deserialize, Serialize};

use crate::watson::Context;

/// Unique session identifier (opaque string).
pub type SessionId = String;

/// A session: id plus the conversation context to send on the next turn.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: SessionId,
    /// Absent until the first successful turn.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub watson_context: Option<Context>,
}

impl Session {
    pub fn new(id: impl Into<SessionId>) -> Self {
        Self {
            id: id.into(),
            watson_context: None,
        }
    }

    /// Session with a generated id.
    pub fn generate() -> Self {
        Self::new(format!("sess-{}", uuid::Uuid::new_v4()))
    }

    /// Drop the stored context so the next turn starts a new conversation.
    pub fn reset(&mut self) {
        self.watson_context = None;
    }
}
