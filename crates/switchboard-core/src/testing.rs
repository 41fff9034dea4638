//! Test doubles shared by the unit tests

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::Result;
use crate::llm::{CompletionService, LlmResponse, Message, ToolDefinition};

/// Replays scripted completions in order and records the conversations it saw
pub struct ScriptedReasoner {
    replies: Mutex<VecDeque<Result<LlmResponse>>>,
    seen: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedReasoner {
    pub fn new(replies: Vec<Result<LlmResponse>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            seen: Mutex::new(Vec::new()),
        })
    }

    /// One plain text reply
    pub fn replying(text: &str) -> Arc<Self> {
        Self::new(vec![Ok(LlmResponse::text(text))])
    }

    pub fn seen(&self) -> Vec<Vec<Message>> {
        self.seen.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
}

#[async_trait]
impl CompletionService for ScriptedReasoner {
    async fn chat(&self, messages: Vec<Message>, _tools: &[ToolDefinition]) -> Result<LlmResponse> {
        self.seen.lock().unwrap().push(messages);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(LlmResponse::text("no more replies")))
    }
}
