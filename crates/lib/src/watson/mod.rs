//! Watson Conversation API client.
//!
//! Sends one user utterance plus the prior conversation context to a workspace and returns the
//! service's reply (new context, output text, intents, entities).

mod client;
mod types;

pub use client::{ConnectionSettings, ConversationClient, ConversationService, WatsonError};
pub use types::{Context, Entity, Intent, MessageInput, MessageRequest, MessageResponse, Output};
