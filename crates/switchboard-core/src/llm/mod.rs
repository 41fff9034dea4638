//! LLM integration - OpenAI-compatible API
//!
//! This module provides:
//! - HTTP client for chat completions with function calling
//! - Request/response types matching the OpenAI-compatible API
//! - Model fallback with automatic retry
//! - Batch embeddings for the intent index
//! - The [`CompletionService`] trait the rest of the crate reasons through

mod client;
mod types;

pub use client::{CompletionService, LlmClient, LlmClientBuilder};
pub use types::{
    ChatRequest, ChatResponse, Choice, Embedding, FinishReason, FunctionCall, FunctionDefinition,
    LlmResponse, Message, MessageRole, ToolCall, ToolDefinition, Usage,
};
