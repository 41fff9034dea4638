//! Local lifecycle of one dispatched sub-task

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::protocol::{AgentMessage, RemoteTaskState};
use crate::error::{Error, Result};

/// Lifecycle state of a [`ServiceTask`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskState {
    /// Created locally, no reply from the agent yet
    Submitted,
    /// Accepted by the agent and not finished
    Working,
    Completed,
    Failed,
    /// The local polling budget ran out
    TimedOut,
}

impl TaskState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::TimedOut)
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Submitted => 0,
            Self::Working => 1,
            Self::Completed | Self::Failed | Self::TimedOut => 2,
        }
    }

    /// Whether `self -> to` is a legal move
    pub fn can_transition_to(&self, to: TaskState) -> bool {
        !self.is_terminal() && to.rank() >= self.rank()
    }

    /// Local view of a remote state; anything unfinished counts as working
    pub fn from_remote(state: RemoteTaskState) -> Self {
        match state {
            RemoteTaskState::Completed => Self::Completed,
            RemoteTaskState::Failed | RemoteTaskState::Canceled | RemoteTaskState::Rejected => {
                Self::Failed
            }
            RemoteTaskState::Submitted
            | RemoteTaskState::Working
            | RemoteTaskState::InputRequired
            | RemoteTaskState::AuthRequired
            | RemoteTaskState::Unknown => Self::Working,
        }
    }
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Submitted => write!(f, "submitted"),
            Self::Working => write!(f, "working"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
            Self::TimedOut => write!(f, "timed-out"),
        }
    }
}

/// One message sent to one remote agent, tracked until it finishes
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceTask {
    id: String,
    service: String,
    message: String,
    remote_id: Option<String>,
    state: TaskState,
    polls: u32,
}

impl ServiceTask {
    pub fn new(service: impl Into<String>, message: impl Into<String>) -> Self {
        let service = service.into();
        Self {
            id: generate_task_id(&service),
            service,
            message: message.into(),
            remote_id: None,
            state: TaskState::Submitted,
            polls: 0,
        }
    }

    /// Local identifier, `msg_<service>_<8 hex>`
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn remote_id(&self) -> Option<&str> {
        self.remote_id.as_deref()
    }

    pub fn set_remote_id(&mut self, remote_id: impl Into<String>) {
        self.remote_id = Some(remote_id.into());
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    pub fn polls(&self) -> u32 {
        self.polls
    }

    pub fn record_poll(&mut self) {
        self.polls += 1;
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Move to `to`, rejecting moves out of a terminal state or backwards
    pub fn transition(&mut self, to: TaskState) -> Result<()> {
        if !self.state.can_transition_to(to) {
            return Err(Error::InvalidTaskTransition {
                task_id: self.id.clone(),
                from: self.state,
                to,
            });
        }
        self.state = to;
        Ok(())
    }

    /// Outbound `message/send` payload for this task
    pub fn to_message(&self) -> AgentMessage {
        AgentMessage::user_text(&self.id, &self.message)
    }
}

fn generate_task_id(service: &str) -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("msg_{}_{}", service, &hex[..8])
}
