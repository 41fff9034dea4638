//! Remote agent client: send a task, then poll it to a terminal state
//!
//! Transport is behind [`AgentTransport`] so the polling logic can be driven
//! by scripted replies in tests; [`JsonRpcTransport`] is the HTTP
//! implementation used in production.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::protocol::{
    AgentMessage, JsonRpcRequest, JsonRpcResponse, MessageSendConfiguration, MessageSendParams,
    RemoteTask, SendMessageResult, TaskQueryParams, METHOD_GET_TASK, METHOD_SEND_MESSAGE,
};
use super::task::{ServiceTask, TaskState};
use crate::config::DispatchConfig;
use crate::error::{Error, Result};

/// The two A2A calls the client needs
#[async_trait]
pub trait AgentTransport: Send + Sync {
    async fn send_message(&self, endpoint: &str, message: AgentMessage) -> Result<SendMessageResult>;

    async fn get_task(&self, endpoint: &str, task_id: &str) -> Result<RemoteTask>;
}

/// JSON-RPC 2.0 over HTTP POST to the endpoint root
#[derive(Debug, Clone)]
pub struct JsonRpcTransport {
    http_client: HttpClient,
}

impl JsonRpcTransport {
    pub fn new(connect_timeout: Duration, request_timeout: Duration) -> Result<Self> {
        let http_client = HttpClient::builder()
            .connect_timeout(connect_timeout)
            .timeout(request_timeout)
            .build()
            .map_err(Error::NetworkError)?;
        Ok(Self { http_client })
    }

    pub fn from_config(config: &DispatchConfig) -> Result<Self> {
        Self::new(
            Duration::from_secs(config.connect_timeout_secs),
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    async fn call<P, R>(&self, endpoint: &str, method: &str, params: P) -> Result<R>
    where
        P: Serialize + Send,
        R: DeserializeOwned,
    {
        let request = JsonRpcRequest::new(method, params);
        debug!(endpoint = %endpoint, method = %method, id = %request.id, "Sending JSON-RPC request");

        let response = self
            .http_client
            .post(endpoint)
            .json(&request)
            .send()
            .await
            .map_err(Error::NetworkError)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::AgentProtocol(format!(
                "{} returned HTTP {}: {}",
                method, status, body
            )));
        }

        let body: JsonRpcResponse<R> = response
            .json()
            .await
            .map_err(|e| Error::AgentProtocol(format!("Malformed {} response: {}", method, e)))?;

        if let Some(error) = body.error {
            return Err(Error::AgentProtocol(error.to_string()));
        }
        body.result
            .ok_or_else(|| Error::AgentProtocol(format!("{} response has no result", method)))
    }
}

#[async_trait]
impl AgentTransport for JsonRpcTransport {
    async fn send_message(&self, endpoint: &str, message: AgentMessage) -> Result<SendMessageResult> {
        let params = MessageSendParams {
            message,
            configuration: MessageSendConfiguration::default(),
        };
        self.call(endpoint, METHOD_SEND_MESSAGE, params).await
    }

    async fn get_task(&self, endpoint: &str, task_id: &str) -> Result<RemoteTask> {
        let params = TaskQueryParams {
            id: task_id.to_string(),
            history_length: None,
        };
        self.call(endpoint, METHOD_GET_TASK, params).await
    }
}

/// How long to wait for a task to finish
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    /// Upper bound on `tasks/get` calls per task
    pub max_polls: u32,
}

impl PollPolicy {
    pub fn new(interval: Duration, max_polls: u32) -> Self {
        Self {
            interval,
            max_polls,
        }
    }

    pub fn from_config(config: &DispatchConfig) -> Self {
        Self::new(config.poll_interval(), config.max_polls)
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::from_config(&DispatchConfig::default())
    }
}

/// How a dispatched task ended
#[derive(Debug)]
pub enum TaskOutcome {
    /// Merged artifact text, possibly empty
    Completed(String),
    /// The agent reported failure
    Failed(String),
    /// The polling budget ran out before a terminal state
    TimedOut { polls: u32 },
    /// The agent could not be reached or answered off-protocol
    Transport(Error),
}

impl TaskOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }

    /// Text handed back to the reasoning service for `service`
    pub fn render(&self, service: &str) -> String {
        match self {
            Self::Completed(text) => text.clone(),
            Self::Failed(detail) => format!("Service {} reported a failure: {}", service, detail),
            Self::TimedOut { polls } => format!(
                "Service {} is unavailable: timed out after {} polls",
                service, polls
            ),
            Self::Transport(error) => format!("Service {} is unavailable: {}", service, error),
        }
    }
}

/// Sends tasks to remote agents and waits for their results
#[derive(Clone)]
pub struct RemoteAgentClient {
    transport: Arc<dyn AgentTransport>,
    policy: PollPolicy,
}

impl std::fmt::Debug for RemoteAgentClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteAgentClient")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl RemoteAgentClient {
    pub fn new(transport: Arc<dyn AgentTransport>, policy: PollPolicy) -> Self {
        Self { transport, policy }
    }

    /// HTTP client with timeouts and polling budget from configuration
    pub fn from_config(config: &DispatchConfig) -> Result<Self> {
        let transport = JsonRpcTransport::from_config(config)?;
        Ok(Self::new(Arc::new(transport), PollPolicy::from_config(config)))
    }

    pub fn policy(&self) -> PollPolicy {
        self.policy
    }

    /// Send `text` to the agent at `endpoint` and wait for the outcome
    pub async fn send_and_wait(&self, endpoint: &str, service: &str, text: &str) -> TaskOutcome {
        let mut task = ServiceTask::new(service, text);
        self.run(endpoint, &mut task).await
    }

    /// Drive `task` to a terminal state; never fails, errors become outcomes
    pub async fn run(&self, endpoint: &str, task: &mut ServiceTask) -> TaskOutcome {
        match self.drive(endpoint, task).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(
                    service = %task.service(),
                    task_id = %task.id(),
                    endpoint = %endpoint,
                    polls = task.polls(),
                    error = %e,
                    code = e.code(),
                    network = e.is_transport(),
                    "Remote agent transport failure"
                );
                TaskOutcome::Transport(e)
            }
        }
    }

    async fn drive(&self, endpoint: &str, task: &mut ServiceTask) -> Result<TaskOutcome> {
        debug!(service = %task.service(), task_id = %task.id(), endpoint = %endpoint, "Dispatching task");

        let remote = match self.transport.send_message(endpoint, task.to_message()).await? {
            SendMessageResult::Task(remote) => remote,
            SendMessageResult::Message(reply) => {
                task.transition(TaskState::Completed)?;
                return Ok(TaskOutcome::Completed(reply.text()));
            }
        };
        task.set_remote_id(remote.id.clone());

        if let Some(outcome) = observe(task, &remote)? {
            return Ok(outcome);
        }

        // tokio rejects a zero period
        let mut ticker = interval(self.policy.interval.max(Duration::from_millis(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        while task.polls() < self.policy.max_polls {
            ticker.tick().await;
            let polled = self.transport.get_task(endpoint, &remote.id).await?;
            task.record_poll();
            debug!(
                task_id = %task.id(),
                remote_id = %remote.id,
                poll = task.polls(),
                state = ?polled.state(),
                "Polled task"
            );

            if let Some(outcome) = observe(task, &polled)? {
                return Ok(outcome);
            }
        }

        task.transition(TaskState::TimedOut)?;
        warn!(
            service = %task.service(),
            task_id = %task.id(),
            remote_id = %remote.id,
            polls = task.polls(),
            interval_ms = self.policy.interval.as_millis() as u64,
            "Polling budget exhausted before the task finished"
        );
        Ok(TaskOutcome::TimedOut {
            polls: task.polls(),
        })
    }
}

/// Apply a remote snapshot; `Some` once the task is finished
fn observe(task: &mut ServiceTask, remote: &RemoteTask) -> Result<Option<TaskOutcome>> {
    let state = TaskState::from_remote(remote.state());
    task.transition(state)?;

    match state {
        TaskState::Completed => {
            info!(service = %task.service(), task_id = %task.id(), polls = task.polls(), "Task completed");
            Ok(Some(TaskOutcome::Completed(remote.artifact_text())))
        }
        TaskState::Failed => {
            let detail = remote.status_text().unwrap_or_else(|| {
                format!("task {} ended in state {:?}", remote.id, remote.state())
            });
            warn!(service = %task.service(), task_id = %task.id(), detail = %detail, "Task failed");
            Ok(Some(TaskOutcome::Failed(detail)))
        }
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::protocol::{AgentMessage, Artifact, RemoteTaskState, RemoteTaskStatus};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays a fixed `message/send` reply followed by scripted `tasks/get` states
    struct ScriptedTransport {
        send_reply: Mutex<Option<Result<SendMessageResult>>>,
        polls: Mutex<VecDeque<RemoteTask>>,
        /// Returned once the script runs out
        idle: RemoteTaskState,
        get_calls: Mutex<u32>,
    }

    impl ScriptedTransport {
        fn new(initial: RemoteTaskState, polls: Vec<RemoteTask>) -> Arc<Self> {
            Arc::new(Self {
                send_reply: Mutex::new(Some(Ok(SendMessageResult::Task(RemoteTask::new(
                    "remote-1", initial,
                ))))),
                polls: Mutex::new(polls.into()),
                idle: RemoteTaskState::Working,
                get_calls: Mutex::new(0),
            })
        }

        fn failing_send(error: Error) -> Arc<Self> {
            Arc::new(Self {
                send_reply: Mutex::new(Some(Err(error))),
                polls: Mutex::new(VecDeque::new()),
                idle: RemoteTaskState::Working,
                get_calls: Mutex::new(0),
            })
        }

        fn replying_with(result: SendMessageResult) -> Arc<Self> {
            Arc::new(Self {
                send_reply: Mutex::new(Some(Ok(result))),
                polls: Mutex::new(VecDeque::new()),
                idle: RemoteTaskState::Working,
                get_calls: Mutex::new(0),
            })
        }

        fn get_calls(&self) -> u32 {
            *self.get_calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl AgentTransport for ScriptedTransport {
        async fn send_message(&self, _endpoint: &str, _message: AgentMessage) -> Result<SendMessageResult> {
            self.send_reply
                .lock()
                .unwrap()
                .take()
                .unwrap_or_else(|| Err(Error::AgentProtocol("sent twice".to_string())))
        }

        async fn get_task(&self, _endpoint: &str, task_id: &str) -> Result<RemoteTask> {
            *self.get_calls.lock().unwrap() += 1;
            let next = self.polls.lock().unwrap().pop_front();
            Ok(next.unwrap_or_else(|| RemoteTask::new(task_id, self.idle)))
        }
    }

    fn client(transport: Arc<ScriptedTransport>, max_polls: u32) -> RemoteAgentClient {
        RemoteAgentClient::new(transport, PollPolicy::new(Duration::from_secs(1), max_polls))
    }

    fn done(text: &str) -> RemoteTask {
        RemoteTask::new("remote-1", RemoteTaskState::Completed).with_artifact(Artifact::text(text))
    }

    #[tokio::test(start_paused = true)]
    async fn test_polls_until_completed() {
        let transport = ScriptedTransport::new(
            RemoteTaskState::Submitted,
            vec![
                RemoteTask::new("remote-1", RemoteTaskState::Working),
                RemoteTask::new("remote-1", RemoteTaskState::InputRequired),
                done("訂單已出貨"),
            ],
        );
        let client = client(transport.clone(), 30);

        let mut task = ServiceTask::new("order_query_agent", "查詢訂單");
        let outcome = client.run("http://agent", &mut task).await;

        assert!(matches!(outcome, TaskOutcome::Completed(ref text) if text == "訂單已出貨"));
        assert_eq!(transport.get_calls(), 3);
        assert_eq!(task.polls(), 3);
        assert_eq!(task.state(), TaskState::Completed);
        assert_eq!(task.remote_id(), Some("remote-1"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_terminal_send_reply_skips_polling() {
        let transport = ScriptedTransport::replying_with(SendMessageResult::Task(done("已完成")));
        let client = client(transport.clone(), 30);

        let outcome = client.send_and_wait("http://agent", "order_query_agent", "x").await;
        assert!(matches!(outcome, TaskOutcome::Completed(ref text) if text == "已完成"));
        assert_eq!(transport.get_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_direct_message_reply_completes() {
        let reply = AgentMessage::agent_text("m-1", "目前有庫存");
        let transport = ScriptedTransport::replying_with(SendMessageResult::Message(reply));
        let outcome = client(transport.clone(), 30)
            .send_and_wait("http://agent", "inventory_management_agent", "庫存")
            .await;
        assert!(matches!(outcome, TaskOutcome::Completed(ref text) if text == "目前有庫存"));
        assert_eq!(transport.get_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stuck_task_times_out_within_budget() {
        let transport = ScriptedTransport::new(RemoteTaskState::Working, Vec::new());
        let client = client(transport.clone(), 5);

        let start = tokio::time::Instant::now();
        let mut task = ServiceTask::new("technical_support_agent", "安裝");
        let outcome = client.run("http://agent", &mut task).await;

        assert!(matches!(outcome, TaskOutcome::TimedOut { polls: 5 }));
        assert_eq!(transport.get_calls(), 5);
        assert_eq!(task.state(), TaskState::TimedOut);
        // first poll is immediate, then one interval between each
        assert_eq!(start.elapsed(), Duration::from_secs(4));
        assert_eq!(
            outcome.render("technical_support_agent"),
            "Service technical_support_agent is unavailable: timed out after 5 polls"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_remote_failure_states() {
        for state in [RemoteTaskState::Failed, RemoteTaskState::Canceled, RemoteTaskState::Rejected] {
            let transport = ScriptedTransport::new(
                RemoteTaskState::Submitted,
                vec![RemoteTask::new("remote-1", state)],
            );
            let outcome = client(transport, 30)
                .send_and_wait("http://agent", "payment_shipping_agent", "付款")
                .await;
            assert!(matches!(outcome, TaskOutcome::Failed(_)), "{:?}", state);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_detail_from_status_message() {
        let mut failed = RemoteTask::new("remote-1", RemoteTaskState::Failed);
        failed.status = RemoteTaskStatus {
            state: RemoteTaskState::Failed,
            message: Some(AgentMessage::agent_text("m", "order not found")),
            timestamp: None,
        };
        let transport = ScriptedTransport::new(RemoteTaskState::Working, vec![failed]);

        let outcome = client(transport, 30)
            .send_and_wait("http://agent", "order_query_agent", "x")
            .await;
        assert_eq!(
            outcome.render("order_query_agent"),
            "Service order_query_agent reported a failure: order not found"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_error_becomes_outcome() {
        let transport =
            ScriptedTransport::failing_send(Error::AgentProtocol("HTTP 502".to_string()));
        let outcome = client(transport, 30)
            .send_and_wait("http://agent", "order_query_agent", "x")
            .await;

        assert!(matches!(outcome, TaskOutcome::Transport(Error::AgentProtocol(_))));
        let text = outcome.render("order_query_agent");
        assert!(text.starts_with("Service order_query_agent is unavailable: "));
        assert!(text.contains("HTTP 502"));
    }

    #[test]
    fn test_render_completed_is_raw_text() {
        assert_eq!(TaskOutcome::Completed(String::new()).render("x"), "");
        assert_eq!(TaskOutcome::Completed("A".to_string()).render("x"), "A");
    }

    #[test]
    fn test_poll_policy_from_config() {
        let policy = PollPolicy::default();
        assert_eq!(policy.interval, Duration::from_secs(1));
        assert_eq!(policy.max_polls, 30);
    }
}
