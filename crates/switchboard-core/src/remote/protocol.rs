//! A2A wire types (JSON-RPC 2.0, camelCase fields)

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

pub const JSONRPC_VERSION: &str = "2.0";
pub const METHOD_SEND_MESSAGE: &str = "message/send";
pub const METHOD_GET_TASK: &str = "tasks/get";

/// Output modes advertised with every outbound message
pub const ACCEPTED_OUTPUT_MODES: [&str; 2] = ["text/plain", "application/json"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest<P> {
    pub jsonrpc: String,
    pub id: String,
    pub method: String,
    pub params: P,
}

impl<P> JsonRpcRequest<P> {
    pub fn new(method: impl Into<String>, params: P) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: Uuid::new_v4().to_string(),
            method: method.into(),
            params,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse<R> {
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<R>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl<R> JsonRpcResponse<R> {
    pub fn success(id: Option<Value>, result: R) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: Option<Value>, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl std::fmt::Display for JsonRpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "JSON-RPC error {}: {}", self.code, self.message)
    }
}

/// A content part; only `text` parts are interpreted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part {
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Payload of non-text parts (`data`, `file`, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            kind: "text".to_string(),
            text: Some(text.into()),
            extra: Map::new(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        if self.kind == "text" {
            self.text.as_deref()
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentMessage {
    pub role: String,
    pub kind: String,
    pub message_id: String,
    pub parts: Vec<Part>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
}

impl AgentMessage {
    pub fn user_text(message_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            kind: "message".to_string(),
            message_id: message_id.into(),
            parts: vec![Part::text(text)],
            context_id: None,
            task_id: None,
        }
    }

    pub fn agent_text(message_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            role: "agent".to_string(),
            ..Self::user_text(message_id, text)
        }
    }

    /// Text parts joined by newlines
    pub fn text(&self) -> String {
        merge_parts_text(&self.parts)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageSendConfiguration {
    pub accepted_output_modes: Vec<String>,
    pub blocking: bool,
}

impl Default for MessageSendConfiguration {
    fn default() -> Self {
        Self {
            accepted_output_modes: ACCEPTED_OUTPUT_MODES.iter().map(|m| m.to_string()).collect(),
            blocking: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageSendParams {
    pub message: AgentMessage,
    #[serde(default)]
    pub configuration: MessageSendConfiguration,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskQueryParams {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history_length: Option<u32>,
}

/// Task state as reported by the remote agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RemoteTaskState {
    Submitted,
    Working,
    InputRequired,
    AuthRequired,
    Completed,
    Failed,
    Canceled,
    Rejected,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteTaskStatus {
    pub state: RemoteTaskState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<AgentMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl RemoteTaskStatus {
    pub fn new(state: RemoteTaskState) -> Self {
        Self {
            state,
            message: None,
            timestamp: Some(chrono::Utc::now().to_rfc3339()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Artifact {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            artifact_id: Some(Uuid::new_v4().to_string()),
            name: None,
            parts: vec![Part::text(text)],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteTask {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_id: Option<String>,
    #[serde(default = "task_kind")]
    pub kind: String,
    pub status: RemoteTaskStatus,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub artifacts: Vec<Artifact>,
}

fn task_kind() -> String {
    "task".to_string()
}

impl RemoteTask {
    pub fn new(id: impl Into<String>, state: RemoteTaskState) -> Self {
        Self {
            id: id.into(),
            context_id: None,
            kind: task_kind(),
            status: RemoteTaskStatus::new(state),
            artifacts: Vec::new(),
        }
    }

    pub fn with_artifact(mut self, artifact: Artifact) -> Self {
        self.artifacts.push(artifact);
        self
    }

    pub fn state(&self) -> RemoteTaskState {
        self.status.state
    }

    /// Text of every artifact, see [`merge_artifact_text`]
    pub fn artifact_text(&self) -> String {
        merge_artifact_text(&self.artifacts)
    }

    /// Text of the status message, if the agent attached one
    pub fn status_text(&self) -> Option<String> {
        self.status
            .message
            .as_ref()
            .map(AgentMessage::text)
            .filter(|text| !text.is_empty())
    }
}

/// `message/send` answers with either a task or a direct message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SendMessageResult {
    Task(RemoteTask),
    Message(AgentMessage),
}

/// Every text part in artifact order then part order, newline-joined,
/// trailing whitespace trimmed
pub fn merge_artifact_text(artifacts: &[Artifact]) -> String {
    let parts: Vec<Part> = artifacts.iter().flat_map(|a| a.parts.iter().cloned()).collect();
    merge_parts_text(&parts)
}

fn merge_parts_text(parts: &[Part]) -> String {
    let texts: Vec<&str> = parts.iter().filter_map(Part::as_text).collect();
    texts.join("\n").trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_send_request_wire_format() {
        let params = MessageSendParams {
            message: AgentMessage::user_text("msg_order_query_agent_1a2b3c4d", "查詢訂單"),
            configuration: MessageSendConfiguration::default(),
        };
        let request = JsonRpcRequest::new(METHOD_SEND_MESSAGE, params);
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["jsonrpc"], "2.0");
        assert_eq!(json["method"], "message/send");
        assert_eq!(json["params"]["message"]["messageId"], "msg_order_query_agent_1a2b3c4d");
        assert_eq!(json["params"]["message"]["kind"], "message");
        assert_eq!(json["params"]["message"]["parts"][0], json!({"kind": "text", "text": "查詢訂單"}));
        assert_eq!(
            json["params"]["configuration"],
            json!({"acceptedOutputModes": ["text/plain", "application/json"], "blocking": false})
        );
    }

    #[test]
    fn test_task_response_parsing() {
        let body = json!({
            "jsonrpc": "2.0",
            "id": "1",
            "result": {
                "id": "task-1",
                "contextId": "ctx-1",
                "kind": "task",
                "status": {"state": "completed"},
                "artifacts": [
                    {"artifactId": "a1", "parts": [{"kind": "text", "text": "訂單已出貨"}]},
                    {"artifactId": "a2", "parts": [
                        {"kind": "data", "data": {"order": 1}},
                        {"kind": "text", "text": "預計明天送達\n"}
                    ]}
                ]
            }
        });

        let response: JsonRpcResponse<RemoteTask> = serde_json::from_value(body).unwrap();
        let task = response.result.unwrap();
        assert_eq!(task.state(), RemoteTaskState::Completed);
        assert_eq!(task.context_id.as_deref(), Some("ctx-1"));
        assert_eq!(task.artifact_text(), "訂單已出貨\n預計明天送達");
        assert_eq!(task.artifacts[1].parts[0].extra["data"], json!({"order": 1}));
    }

    #[test]
    fn test_remote_states() {
        let parse = |s: &str| serde_json::from_value::<RemoteTaskState>(json!(s)).unwrap();
        assert_eq!(parse("input-required"), RemoteTaskState::InputRequired);
        assert_eq!(parse("auth-required"), RemoteTaskState::AuthRequired);
        assert_eq!(parse("canceled"), RemoteTaskState::Canceled);
        assert_eq!(parse("rejected"), RemoteTaskState::Rejected);
        assert_eq!(parse("paused-by-operator"), RemoteTaskState::Unknown);
    }

    #[test]
    fn test_error_response_parsing() {
        let body = json!({
            "jsonrpc": "2.0",
            "id": "1",
            "error": {"code": -32001, "message": "Task not found"}
        });
        let response: JsonRpcResponse<RemoteTask> = serde_json::from_value(body).unwrap();
        assert!(response.result.is_none());
        assert_eq!(
            response.error.unwrap().to_string(),
            "JSON-RPC error -32001: Task not found"
        );
    }

    #[test]
    fn test_send_result_accepts_task_or_message() {
        let task: SendMessageResult = serde_json::from_value(json!({
            "id": "t1", "kind": "task", "status": {"state": "submitted"}
        }))
        .unwrap();
        assert!(matches!(task, SendMessageResult::Task(t) if t.id == "t1"));

        let message: SendMessageResult = serde_json::from_value(json!({
            "role": "agent", "kind": "message", "messageId": "m1",
            "parts": [{"kind": "text", "text": "有庫存"}]
        }))
        .unwrap();
        assert!(matches!(message, SendMessageResult::Message(m) if m.text() == "有庫存"));
    }

    #[test]
    fn test_merge_skips_non_text_and_empty() {
        assert_eq!(merge_artifact_text(&[]), "");
        let artifacts = vec![Artifact {
            artifact_id: None,
            name: None,
            parts: vec![Part {
                kind: "file".to_string(),
                text: Some("ignored".to_string()),
                extra: Map::new(),
            }],
        }];
        assert_eq!(merge_artifact_text(&artifacts), "");
    }
}
