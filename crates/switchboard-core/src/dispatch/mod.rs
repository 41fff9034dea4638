//! Dispatch - turns a routed request into remote agent calls
//!
//! This module provides:
//! - The `call_services` tool schema and argument decoding
//! - Prompts for orchestration and answer formatting
//! - The orchestrator that ties routing, reasoning and remote agents together

mod orchestrator;
mod prompts;
mod tools;

pub use orchestrator::{ChatRequest, Orchestrator};
pub use prompts::{answer_prompt, orchestration_prompt, ASSISTANT_SYSTEM_PROMPT, ORCHESTRATOR_SYSTEM_PROMPT};
pub use tools::{call_services_tool, parse_call_services, CallServicesArgs, ServiceContext, CALL_SERVICES};
