//! Watson Conversation ware: incoming middleware that runs each text update through a Watson
//! Conversation workspace and keeps the conversation context on the user's session.

pub mod config;
pub mod middleware;
pub mod session;
pub mod update;
pub mod ware;
pub mod watson;

pub use middleware::{BotInfo, IncomingController, Middleware, MiddlewareType};
pub use session::Session;
pub use update::Update;
pub use ware::{MissingOption, WareError, WareOptions, WatsonConversationWare};
