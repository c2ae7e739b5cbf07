//! Request and response bodies for `POST /{version}/workspaces/{id}/message`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Opaque conversation state owned by the service. Sent back unchanged on the next turn.
pub type Context = Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageInput {
    pub text: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Body of a message call. The workspace id travels in the URL, not here.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageRequest {
    pub input: MessageInput,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Context>,
}

impl MessageRequest {
    pub fn new(text: impl Into<String>, context: Option<Context>) -> Self {
        Self {
            input: MessageInput {
                text: text.into(),
                extra: Map::new(),
            },
            context,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intent {
    pub intent: String,
    pub confidence: f64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub entity: String,
    #[serde(default)]
    pub location: Vec<u32>,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    /// System entities carry e.g. `{"numeric_value": 5}` here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Dialog output: reply segments plus whatever else the dialog nodes attached.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Output {
    #[serde(default)]
    pub text: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub log_messages: Vec<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nodes_visited: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Full reply of a message call, kept exactly as the service sent it.
///
/// Typed views (`context`, `intents`, `entities`, `output`) are read from the raw object on
/// demand; an element that does not fit its typed shape is skipped by the view but stays in the
/// payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageResponse(Map<String, Value>);

impl MessageResponse {
    /// Context to store for the next turn. `None` when absent or not an object.
    pub fn context(&self) -> Option<&Context> {
        self.0.get("context").and_then(Value::as_object)
    }

    pub fn input(&self) -> Option<MessageInput> {
        self.typed("input")
    }

    pub fn output(&self) -> Option<Output> {
        self.typed("output")
    }

    pub fn intents(&self) -> Vec<Intent> {
        self.typed_list("intents")
    }

    pub fn entities(&self) -> Vec<Entity> {
        self.typed_list("entities")
    }

    /// Raw field by name.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Reply segments joined with newlines; empty when the dialog produced no text.
    pub fn output_text(&self) -> String {
        self.output().map(|o| o.text.join("\n")).unwrap_or_default()
    }

    /// Highest-confidence intent, if the service detected any.
    pub fn top_intent(&self) -> Option<Intent> {
        self.intents()
            .into_iter()
            .max_by(|a, b| a.confidence.total_cmp(&b.confidence))
    }

    fn typed<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.0
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    fn typed_list<T: serde::de::DeserializeOwned>(&self, key: &str) -> Vec<T> {
        self.0
            .get(key)
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| serde_json::from_value(v.clone()).ok())
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl From<Map<String, Value>> for MessageResponse {
    fn from(raw: Map<String, Value>) -> Self {
        Self(raw)
    }
}

impl From<MessageResponse> for Value {
    fn from(res: MessageResponse) -> Self {
        Value::Object(res.0)
    }
}
