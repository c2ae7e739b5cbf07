//! Incoming update as it flows through the middleware pipeline.
//!
//! The wire part (sender, recipient, timestamp, message) comes from the bot's webhook. The rest is
//! a fixed set of typed slots that middleware may fill: `session` by the session collaborator,
//! `watson_update` and `watson_conversation` by the Watson ware.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::session::Session;
use crate::watson::{ConversationService, MessageResponse};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: String,
}

/// Non-text payload (audio, image, file, location...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateMessage {
    #[serde(default)]
    pub mid: String,
    #[serde(default)]
    pub seq: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Update {
    pub sender: Participant,
    pub recipient: Participant,
    /// Milliseconds since the Unix epoch.
    #[serde(default)]
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<UpdateMessage>,

    #[serde(skip)]
    pub session: Option<Session>,
    /// Full reply of the last successful Watson call for this update.
    #[serde(skip)]
    pub watson_update: Option<MessageResponse>,
    /// Client the ware used, for downstream middleware that needs to call Watson again.
    #[serde(skip)]
    pub watson_conversation: Option<Arc<dyn ConversationService>>,
}

impl Update {
    /// Update without a message body.
    pub fn new(sender_id: impl Into<String>, recipient_id: impl Into<String>) -> Self {
        Self {
            sender: Participant {
                id: sender_id.into(),
            },
            recipient: Participant {
                id: recipient_id.into(),
            },
            timestamp: now_millis(),
            message: None,
            session: None,
            watson_update: None,
            watson_conversation: None,
        }
    }

    /// Text update from `sender_id`.
    pub fn text(
        sender_id: impl Into<String>,
        recipient_id: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        let mut update = Self::new(sender_id, recipient_id);
        update.message = Some(UpdateMessage {
            mid: new_mid(),
            seq: 1,
            text: Some(text.into()),
            attachments: Vec::new(),
        });
        update
    }

    /// Update carrying a single attachment and no text.
    pub fn attachment(
        sender_id: impl Into<String>,
        recipient_id: impl Into<String>,
        attachment: Attachment,
    ) -> Self {
        let mut update = Self::new(sender_id, recipient_id);
        update.message = Some(UpdateMessage {
            mid: new_mid(),
            seq: 1,
            text: None,
            attachments: vec![attachment],
        });
        update
    }

    pub fn with_session(mut self, session: Session) -> Self {
        self.session = Some(session);
        self
    }

    /// Message text when present and non-empty.
    pub fn text_content(&self) -> Option<&str> {
        self.message
            .as_ref()
            .and_then(|m| m.text.as_deref())
            .filter(|t| !t.is_empty())
    }
}

fn new_mid() -> String {
    format!("mid.{}", uuid::Uuid::new_v4())
}

fn now_millis() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
