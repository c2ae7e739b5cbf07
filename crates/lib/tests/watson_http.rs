//! Integration test: run the ware against a fake Watson Conversation endpoint served by axum on a
//! free port. Checks the request the client sends and how replies and errors land on the update.

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use lib::watson::ConnectionSettings;
use lib::{BotInfo, Session, Update, WareError, WareOptions, WatsonConversationWare};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

const WORKSPACE_ID: &str = "someId";
/// base64("some_username:some_password")
const EXPECTED_AUTH: &str = "Basic c29tZV91c2VybmFtZTpzb21lX3Bhc3N3b3Jk";

#[derive(Clone, Default)]
struct FakeWatson {
    received: Arc<Mutex<Vec<Value>>>,
}

fn reply(body: &Value) -> Value {
    let turn = body
        .pointer("/context/system/dialog_turn_counter")
        .and_then(|v| v.as_u64())
        .unwrap_or(0)
        + 1;
    let text = body
        .pointer("/input/text")
        .and_then(|v| v.as_str())
        .unwrap_or_default();
    json!({
        "input": { "text": text, "spelling_corrected": false },
        "intents": [{ "intent": "greeting", "confidence": 0.98, "source": "classifier" }],
        "entities": [{
            "entity": "sys-number",
            "location": [0, 1],
            "value": "5",
            "confidence": 1.0,
            "metadata": { "numeric_value": 5 }
        }],
        "context": {
            "conversation_id": "conv-1",
            "system": { "dialog_turn_counter": turn }
        },
        "output": { "text": [format!("Hello! ({})", turn)], "nodes_visited": ["welcome"] },
        "alternate_intents": false
    })
}

async fn message(
    State(state): State<FakeWatson>,
    Path(workspace_id): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let authorized = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(|v| v == EXPECTED_AUTH)
        .unwrap_or(false);
    if !authorized || workspace_id != WORKSPACE_ID {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "Not Authorized", "code": 401 })),
        );
    }
    if query.get("version").map(String::as_str) != Some("2017-02-03") {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Missing version query parameter", "code": 400 })),
        );
    }
    state.received.lock().unwrap().push(body.clone());
    (StatusCode::OK, Json(reply(&body)))
}

/// Start the fake service; returns its base URL and the shared request log.
async fn start_fake_watson() -> (String, FakeWatson) {
    let state = FakeWatson::default();
    let app = Router::new()
        .route("/api/v1/workspaces/:workspace_id/message", post(message))
        .with_state(state.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind free port");
    let port = listener.local_addr().expect("local_addr").port();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (format!("http://127.0.0.1:{}/api", port), state)
}

fn options(url: &str, workspace_id: &str) -> WareOptions {
    let mut settings = ConnectionSettings::new("some_username", "some_password");
    settings.url = url.to_string();
    settings.timeout_secs = Some(5);
    WareOptions::new(settings, workspace_id)
}

fn bot() -> BotInfo {
    BotInfo::new("mock")
}

#[tokio::test]
async fn text_update_round_trips_context_and_reply() {
    let (url, fake) = start_fake_watson().await;
    let ware = WatsonConversationWare::new(&options(&url, WORKSPACE_ID)).unwrap();
    let mut update = Update::text("user_id", "bot_id", "hi there").with_session(Session::new("user_id"));

    ware.handle(&bot(), &mut update).await.unwrap();

    let sent = reply(&json!({ "input": { "text": "hi there" } }));
    assert_eq!(
        update.session.as_ref().unwrap().watson_context.as_ref(),
        sent["context"].as_object()
    );
    assert_eq!(serde_json::to_value(&update.watson_update).unwrap(), sent);
    assert_eq!(
        update.watson_update.as_ref().and_then(|r| r.top_intent()).map(|i| i.intent),
        Some("greeting".to_string())
    );
    assert!(update.watson_conversation.is_some());

    let received = fake.received.lock().unwrap().clone();
    assert_eq!(received, vec![json!({ "input": { "text": "hi there" } })]);
}

#[tokio::test]
async fn second_turn_sends_stored_context() {
    let (url, fake) = start_fake_watson().await;
    let ware = WatsonConversationWare::new(&options(&url, WORKSPACE_ID)).unwrap();

    let mut first = Update::text("user_id", "bot_id", "one").with_session(Session::new("user_id"));
    ware.handle(&bot(), &mut first).await.unwrap();
    let stored = first.session.clone().unwrap().watson_context;

    let mut second = Update::text("user_id", "bot_id", "two").with_session(first.session.unwrap());
    ware.handle(&bot(), &mut second).await.unwrap();

    let received = fake.received.lock().unwrap().clone();
    assert_eq!(received.len(), 2);
    assert_eq!(received[1]["context"], serde_json::to_value(&stored).unwrap());
    assert_eq!(second.watson_update.unwrap().output_text(), "Hello! (2)");
}

#[tokio::test]
async fn unauthorized_workspace_error_is_propagated_unmodified() {
    let (url, fake) = start_fake_watson().await;
    let ware = WatsonConversationWare::new(&options(&url, "somethingElse")).unwrap();
    let mut update = Update::text("user_id", "bot_id", "hello").with_session(Session::new("user_id"));

    let err = ware.handle(&bot(), &mut update).await.unwrap_err();

    assert_eq!(err.to_string(), "Not Authorized");
    match err {
        WareError::Upstream(e) => assert_eq!(e.status(), Some(401)),
        other => panic!("expected upstream error, got {:?}", other),
    }
    assert!(update.session.unwrap().watson_context.is_none());
    assert!(update.watson_update.is_none());
    assert!(fake.received.lock().unwrap().is_empty());
}

#[tokio::test]
async fn concurrent_sessions_stay_independent() {
    let (url, _fake) = start_fake_watson().await;
    let ware = WatsonConversationWare::new(&options(&url, WORKSPACE_ID)).unwrap();

    let mut warm = Update::text("alice", "bot_id", "warm up").with_session(Session::new("alice"));
    ware.handle(&bot(), &mut warm).await.unwrap();

    let bot = bot();
    let mut a = Update::text("alice", "bot_id", "again").with_session(warm.session.unwrap());
    let mut b = Update::text("bob", "bot_id", "first").with_session(Session::new("bob"));
    let results = futures_util::future::join_all(vec![
        ware.handle(&bot, &mut a),
        ware.handle(&bot, &mut b),
    ])
    .await;
    assert!(results.iter().all(|r| r.is_ok()));

    let turn = |u: &Update| {
        u.session
            .as_ref()
            .and_then(|s| s.watson_context.as_ref())
            .and_then(|c| c.get("system"))
            .and_then(|s| s.get("dialog_turn_counter"))
            .and_then(|t| t.as_u64())
    };
    assert_eq!(turn(&a), Some(2));
    assert_eq!(turn(&b), Some(1));
}

#[tokio::test]
async fn unreachable_service_is_a_request_error() {
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .expect("bind free port")
        .local_addr()
        .expect("local_addr")
        .port();
    let url = format!("http://127.0.0.1:{}/api", port);
    let ware = WatsonConversationWare::new(&options(&url, WORKSPACE_ID)).unwrap();
    let mut update = Update::text("user_id", "bot_id", "hello").with_session(Session::new("user_id"));

    let err = ware.handle(&bot(), &mut update).await.unwrap_err();

    match err {
        WareError::Upstream(lib::watson::WatsonError::Request(ref e)) => {
            assert_eq!(err.to_string(), e.to_string());
        }
        other => panic!("expected request error, got {:?}", other),
    }
}
