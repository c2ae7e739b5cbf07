//! Middleware contract consumed by the host pipeline.
//!
//! A pipeline registers [`Middleware`] descriptors and, for each incoming update, calls the
//! controller of every `incoming` entry in order. An `Err` stops the chain for that update and is
//! reported through the pipeline's own error channel.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::update::Update;
use crate::ware::WareError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MiddlewareType {
    Incoming,
}

/// The bot an update arrived on (e.g. kind "messenger", "telegram").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotInfo {
    pub kind: String,
    pub id: Option<String>,
}

impl BotInfo {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// Per-update handler of an incoming middleware.
#[async_trait]
pub trait IncomingController: Send + Sync {
    async fn handle(&self, bot: &BotInfo, update: &mut Update) -> Result<(), WareError>;
}

/// Descriptor handed to the pipeline: a type tag and name for introspection plus the controller.
#[derive(Clone)]
pub struct Middleware {
    kind: MiddlewareType,
    name: String,
    controller: Arc<dyn IncomingController>,
}

impl Middleware {
    pub fn incoming(name: impl Into<String>, controller: Arc<dyn IncomingController>) -> Self {
        Self {
            kind: MiddlewareType::Incoming,
            name: name.into(),
            controller,
        }
    }

    pub fn kind(&self) -> MiddlewareType {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run the controller on one update.
    pub async fn handle(&self, bot: &BotInfo, update: &mut Update) -> Result<(), WareError> {
        self.controller.handle(bot, update).await
    }
}

impl fmt::Debug for Middleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Middleware")
            .field("kind", &self.kind)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
