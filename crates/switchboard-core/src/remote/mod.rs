//! Remote agents - A2A task dispatch over JSON-RPC
//!
//! This module provides:
//! - Wire types for `message/send` and `tasks/get`
//! - The local task lifecycle and its transition rules
//! - A client that sends a task and polls it on a fixed interval
//! - The agent name to endpoint registry

mod client;
mod protocol;
mod registry;
mod task;

pub use client::{AgentTransport, JsonRpcTransport, PollPolicy, RemoteAgentClient, TaskOutcome};
pub use protocol::{
    merge_artifact_text, AgentMessage, Artifact, JsonRpcError, JsonRpcRequest, JsonRpcResponse,
    MessageSendConfiguration, MessageSendParams, Part, RemoteTask, RemoteTaskState,
    RemoteTaskStatus, SendMessageResult, TaskQueryParams, METHOD_GET_TASK, METHOD_SEND_MESSAGE,
};
pub use registry::EndpointRegistry;
pub use task::{ServiceTask, TaskState};
