//! Fake A2A agents and a scripted reasoning service shared by the integration tests

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{extract::State, routing::post, Json, Router};
use serde_json::{json, Value};

use switchboard_core::llm::{CompletionService, LlmResponse, Message, ToolDefinition};
use switchboard_core::Result;

/// How a fake agent answers
#[derive(Debug, Clone)]
pub enum Behaviour {
    /// Accept the task, then report it completed on the given poll
    CompleteAfter { polls: u32, parts: Vec<&'static str> },
    /// Accept the task and never finish it
    Stuck,
    /// Accept the task, then report it failed with a status message
    FailAfter { polls: u32, reason: &'static str },
    /// Answer `message/send` directly with a message instead of a task
    Direct(&'static str),
    /// Reply with a JSON-RPC error object
    RpcError,
}

#[derive(Clone)]
pub struct FakeAgent {
    behaviour: Behaviour,
    get_calls: Arc<AtomicU32>,
    sent: Arc<Mutex<Vec<Value>>>,
}

impl FakeAgent {
    pub fn get_calls(&self) -> u32 {
        self.get_calls.load(Ordering::SeqCst)
    }

    /// `params` of every `message/send` received
    pub fn sent(&self) -> Vec<Value> {
        self.sent.lock().unwrap().clone()
    }
}

fn task(state: &str) -> Value {
    json!({"id": "remote-task", "contextId": "ctx-1", "kind": "task", "status": {"state": state}})
}

async fn handle(State(agent): State<FakeAgent>, Json(request): Json<Value>) -> Json<Value> {
    let id = request["id"].clone();
    let method = request["method"].as_str().unwrap_or_default();

    if let Behaviour::RpcError = agent.behaviour {
        return Json(json!({
            "jsonrpc": "2.0",
            "id": id,
            "error": {"code": -32603, "message": "agent exploded"}
        }));
    }

    let result = match method {
        "message/send" => {
            agent.sent.lock().unwrap().push(request["params"].clone());
            match &agent.behaviour {
                Behaviour::Direct(text) => json!({
                    "role": "agent",
                    "kind": "message",
                    "messageId": "reply-1",
                    "parts": [{"kind": "text", "text": text}]
                }),
                _ => task("submitted"),
            }
        }
        "tasks/get" => {
            let n = agent.get_calls.fetch_add(1, Ordering::SeqCst) + 1;
            match &agent.behaviour {
                Behaviour::CompleteAfter { polls, parts } if n >= *polls => {
                    let parts: Vec<Value> = parts
                        .iter()
                        .map(|p| json!({"kind": "text", "text": p}))
                        .collect();
                    let mut done = task("completed");
                    done["artifacts"] = json!([
                        {"artifactId": "a-1", "parts": parts},
                        {"artifactId": "a-2", "parts": [{"kind": "data", "data": {"ignored": true}}]}
                    ]);
                    done
                }
                Behaviour::FailAfter { polls, reason } if n >= *polls => {
                    let mut failed = task("failed");
                    failed["status"]["message"] = json!({
                        "role": "agent",
                        "kind": "message",
                        "messageId": "status-1",
                        "parts": [{"kind": "text", "text": reason}]
                    });
                    failed
                }
                _ => task("working"),
            }
        }
        other => {
            return Json(json!({
                "jsonrpc": "2.0",
                "id": id,
                "error": {"code": -32601, "message": format!("Method not found: {}", other)}
            }));
        }
    };

    Json(json!({"jsonrpc": "2.0", "id": id, "result": result}))
}

/// Start a fake agent on a random local port, returning its endpoint URL
pub async fn spawn_agent(behaviour: Behaviour) -> (String, FakeAgent) {
    let agent = FakeAgent {
        behaviour,
        get_calls: Arc::new(AtomicU32::new(0)),
        sent: Arc::new(Mutex::new(Vec::new())),
    };
    let router = Router::new().route("/", post(handle)).with_state(agent.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    (format!("http://{}", addr), agent)
}

/// Address nothing listens on
pub async fn closed_endpoint() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

/// Replays scripted completions in order
pub struct ScriptedReasoner {
    replies: Mutex<VecDeque<Result<LlmResponse>>>,
    calls: AtomicU32,
}

impl ScriptedReasoner {
    pub fn new(replies: Vec<Result<LlmResponse>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            calls: AtomicU32::new(0),
        })
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionService for ScriptedReasoner {
    async fn chat(&self, _messages: Vec<Message>, _tools: &[ToolDefinition]) -> Result<LlmResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(LlmResponse::text("no more replies")))
    }
}
