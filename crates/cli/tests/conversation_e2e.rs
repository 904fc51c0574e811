//! End-to-end tests for a PathCoach conversation.
//!
//! These run the whole pipeline: configuration, the HTTP completion client
//! against a scripted local server, the conversation loop, tool dispatch, and
//! the file store.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use pathcoach_agent::{ConversationLoop, ConversationRequest, ReplySource, Turn};
use pathcoach_config::AppConfig;
use pathcoach_core::error::{FailureKind, OrchestrationError};
use pathcoach_core::progress::ProgressStore;
use pathcoach_store::FileStore;
use serde_json::{Value, json};

// ── Scripted completion server ───────────────────────────────────────────

enum Reply {
    Ok(Value),
    RateLimited,
    Status(u16),
}

#[derive(Clone, Default)]
struct Server {
    replies: Arc<Mutex<VecDeque<Reply>>>,
    bodies: Arc<Mutex<Vec<Value>>>,
}

impl Server {
    fn bodies(&self) -> Vec<Value> {
        self.bodies.lock().unwrap().clone()
    }
}

async fn completions(State(server): State<Server>, Json(body): Json<Value>) -> Response {
    server.bodies.lock().unwrap().push(body);
    let reply = server
        .replies
        .lock()
        .unwrap()
        .pop_front()
        .expect("more requests than scripted replies");
    match reply {
        Reply::Ok(body) => Json(body).into_response(),
        Reply::RateLimited => {
            let mut response = (StatusCode::TOO_MANY_REQUESTS, "slow down").into_response();
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from_static("0"));
            response
        }
        Reply::Status(code) => (
            StatusCode::from_u16(code).unwrap(),
            r#"{"error":{"message":"internal details"}}"#,
        )
            .into_response(),
    }
}

async fn serve(replies: Vec<Reply>) -> (String, Server) {
    let server = Server {
        replies: Arc::new(Mutex::new(replies.into())),
        ..Server::default()
    };
    let app = Router::new()
        .route("/v1/chat/completions", post(completions))
        .with_state(server.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}/v1"), server)
}

fn text(content: &str) -> Reply {
    Reply::Ok(json!({
        "model": "gpt-5-mini",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }],
        "usage": { "prompt_tokens": 40, "completion_tokens": 12, "total_tokens": 52 }
    }))
}

fn tool_calls(calls: &[(&str, Value)]) -> Reply {
    let calls: Vec<Value> = calls
        .iter()
        .enumerate()
        .map(|(i, (name, args))| {
            json!({
                "id": format!("call_{i}"),
                "type": "function",
                "function": { "name": name, "arguments": args.to_string() }
            })
        })
        .collect();
    Reply::Ok(json!({
        "model": "gpt-5-mini",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": null, "tool_calls": calls },
            "finish_reason": "tool_calls"
        }]
    }))
}

// ── Fixtures ─────────────────────────────────────────────────────────────

const CATALOG: &str = r#"{"pathways":[
    {"pathwayId":"stress-checkin","title":"Chequeo de estrés","steps":[{"id":"s1","question":"¿Cómo te sientes hoy?"}]},
    {"pathwayId":"sleep","title":"Mejor sueño","steps":[{"id":"h1","question":"¿Cuántas horas duermes?"}]}
]}"#;

fn config(base_url: &str) -> AppConfig {
    let mut config = AppConfig::default();
    config.provider.api_key = Some("sk-e2e".into());
    config.provider.base_url = base_url.into();
    config.retry.base_delay_ms = 1;
    config.retry.unparseable_retry_after_ms = 1;
    config
}

fn conversation(config: &AppConfig, store: &FileStore) -> ConversationLoop {
    let store = Arc::new(store.clone());
    ConversationLoop::from_config(config, store.clone(), store).unwrap()
}

fn request(message: &str) -> ConversationRequest {
    ConversationRequest {
        user_id: "ana".into(),
        transcript: vec![Turn::user(message)],
        pathways_json: Some(CATALOG.into()),
    }
}

// ── Scenarios ────────────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_start_pathway_in_one_tool_round() {
    let (base_url, server) = serve(vec![
        tool_calls(&[
            ("start_progress", json!({ "userId": "ana", "pathwayId": "stress-checkin" })),
            (
                "upsert_progress",
                json!({
                    "userId": "ana",
                    "pathwayId": "stress-checkin",
                    "stepId": "s1",
                    "answer": "empezar stress-checkin",
                    "nextStepIndex": 0,
                    "completed": false
                }),
            ),
        ]),
        text("¡Empecemos! ¿Cómo te sientes hoy?"),
    ])
    .await;

    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::in_dir(dir.path());
    let reply = conversation(&config(&base_url), &store)
        .run(request("empezar stress-checkin"))
        .await
        .unwrap();

    assert_eq!(reply.content, "¡Empecemos! ¿Cómo te sientes hoy?");
    assert_eq!(reply.source, ReplySource::Model);
    assert_eq!(reply.rounds, 2);
    // user + tool request + 2 results + reply
    assert_eq!(reply.transcript.len(), 5);

    let bodies = server.bodies();
    assert_eq!(bodies.len(), 2);
    assert_eq!(bodies[0]["model"], "gpt-5-mini");
    assert_eq!(bodies[0]["tool_choice"], "auto");
    assert_eq!(bodies[0]["response_format"]["type"], "text");
    assert_eq!(bodies[0]["max_completion_tokens"], 768);
    assert_eq!(bodies[0]["tools"].as_array().unwrap().len(), 6);

    let second = bodies[1]["messages"].as_array().unwrap();
    assert_eq!(second.len(), 4);
    assert_eq!(second[2]["role"], "tool");
    assert_eq!(second[2]["tool_call_id"], "call_0");
    assert_eq!(second[3]["tool_call_id"], "call_1");

    // State survives a reopen of the store file
    let reopened = FileStore::in_dir(dir.path());
    let progress = reopened.get("ana", "stress-checkin").await.unwrap().unwrap();
    assert_eq!(progress.responses.len(), 1);
    assert_eq!(progress.responses[0].answer, "empezar stress-checkin");
}

#[tokio::test]
async fn e2e_catalog_only_round_answers_with_pathway_list() {
    let (base_url, server) = serve(vec![tool_calls(&[("list_pathways", json!({}))])]).await;

    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::in_dir(dir.path());
    let reply = conversation(&config(&base_url), &store)
        .run(request("¿qué rutas hay?"))
        .await
        .unwrap();

    assert_eq!(reply.source, ReplySource::Fallback);
    assert_eq!(server.bodies().len(), 1);
    assert!(reply.content.contains("- Chequeo de estrés (id: stress-checkin)"));
    assert!(reply.content.contains("- Mejor sueño (id: sleep)"));
    assert!(reply.content.contains("\"ana\""));
}

#[tokio::test]
async fn e2e_rate_limit_then_success_is_one_round() {
    let (base_url, server) = serve(vec![Reply::RateLimited, text("Hola, soy tu coach.")]).await;

    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::in_dir(dir.path());
    let reply = conversation(&config(&base_url), &store)
        .run(request("hola"))
        .await
        .unwrap();

    assert_eq!(reply.content, "Hola, soy tu coach.");
    assert_eq!(reply.rounds, 1);
    assert_eq!(server.bodies().len(), 2);
}

#[tokio::test]
async fn e2e_rate_limit_exhaustion_fails_the_conversation() {
    let (base_url, server) = serve(vec![
        Reply::RateLimited,
        Reply::RateLimited,
        Reply::RateLimited,
    ])
    .await;

    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::in_dir(dir.path());
    let err = conversation(&config(&base_url), &store)
        .run(request("hola"))
        .await
        .unwrap_err();

    assert!(matches!(err, OrchestrationError::RateLimitExhausted { attempts: 3 }));
    assert_eq!(err.kind(), FailureKind::RateLimitExhausted);
    assert_eq!(server.bodies().len(), 3);
}

#[tokio::test]
async fn e2e_server_error_is_transport_failure_without_body() {
    let (base_url, server) = serve(vec![Reply::Status(500)]).await;

    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::in_dir(dir.path());
    let err = conversation(&config(&base_url), &store)
        .run(request("hola"))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), FailureKind::Transport);
    assert!(!err.to_string().contains("internal details"));
    assert_eq!(server.bodies().len(), 1);
}

#[test]
fn e2e_missing_api_key_fails_before_any_round() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FileStore::in_dir(dir.path()));
    let result = ConversationLoop::from_config(&AppConfig::default(), store.clone(), store);

    match result {
        Err(err) => assert_eq!(err.kind(), FailureKind::Configuration),
        Ok(_) => panic!("expected a configuration failure"),
    }
}
