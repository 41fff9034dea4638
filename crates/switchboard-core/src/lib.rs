//! Switchboard Core Library
//!
//! This crate provides the core functionality for Switchboard, including:
//! - Intent routing (similarity classifier, context boosts, reasoning escalation)
//! - Remote agent dispatch over A2A JSON-RPC with bounded polling
//! - Orchestration of the reasoning service and its `call_services` tool
//! - LLM integration (OpenAI-compatible chat completions and embeddings)
//! - The chat HTTP API
//! - Configuration

pub mod api;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod intent;
pub mod llm;
pub mod remote;

#[cfg(test)]
mod testing;

pub use error::{Error, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::dispatch::{ChatRequest, Orchestrator, ServiceContext};
    pub use crate::error::{Error, Result};
    pub use crate::intent::{Category, RequestContext, RoutingDecision};
}
