//! Remote agent client against fake A2A agents over real HTTP

mod common;

use common::{closed_endpoint, spawn_agent, Behaviour};
use switchboard_core::config::DispatchConfig;
use switchboard_core::remote::{RemoteAgentClient, TaskOutcome};
use switchboard_core::Error;

fn client(max_polls: u32) -> RemoteAgentClient {
    let config = DispatchConfig {
        poll_interval_ms: 10,
        max_polls,
        connect_timeout_secs: 2,
        request_timeout_secs: 5,
        ..DispatchConfig::default()
    };
    RemoteAgentClient::from_config(&config).unwrap()
}

#[tokio::test]
async fn test_task_completes_after_polling() {
    let (url, agent) = spawn_agent(Behaviour::CompleteAfter {
        polls: 2,
        parts: vec!["訂單 JTCG-001 已出貨", "預計明天送達  "],
    })
    .await;

    let outcome = client(30)
        .send_and_wait(&url, "order_query_agent", "查詢訂單 JTCG-001")
        .await;

    match outcome {
        TaskOutcome::Completed(text) => {
            assert_eq!(text, "訂單 JTCG-001 已出貨\n預計明天送達");
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert_eq!(agent.get_calls(), 2);
}

#[tokio::test]
async fn test_message_send_wire_shape() {
    let (url, agent) = spawn_agent(Behaviour::CompleteAfter { polls: 1, parts: vec!["ok"] }).await;
    client(30).send_and_wait(&url, "order_query_agent", "查詢訂單").await;

    let sent = agent.sent();
    assert_eq!(sent.len(), 1);
    let params = &sent[0];
    assert_eq!(params["message"]["role"], "user");
    assert_eq!(params["message"]["kind"], "message");
    assert!(params["message"]["messageId"]
        .as_str()
        .unwrap()
        .starts_with("msg_order_query_agent_"));
    assert_eq!(params["message"]["parts"][0]["kind"], "text");
    assert_eq!(params["message"]["parts"][0]["text"], "查詢訂單");
    assert_eq!(
        params["configuration"]["acceptedOutputModes"],
        serde_json::json!(["text/plain", "application/json"])
    );
    assert_eq!(params["configuration"]["blocking"], false);
}

#[tokio::test]
async fn test_stuck_task_times_out() {
    let (url, agent) = spawn_agent(Behaviour::Stuck).await;
    let outcome = client(3).send_and_wait(&url, "technical_support_agent", "安裝").await;

    assert!(matches!(outcome, TaskOutcome::TimedOut { polls: 3 }));
    assert_eq!(agent.get_calls(), 3);
}

#[tokio::test]
async fn test_failed_task_reports_status_message() {
    let (url, _agent) = spawn_agent(Behaviour::FailAfter {
        polls: 1,
        reason: "order not found",
    })
    .await;
    let outcome = client(30).send_and_wait(&url, "order_query_agent", "x").await;
    assert_eq!(
        outcome.render("order_query_agent"),
        "Service order_query_agent reported a failure: order not found"
    );
}

#[tokio::test]
async fn test_direct_message_reply() {
    let (url, agent) = spawn_agent(Behaviour::Direct("目前有庫存")).await;
    let outcome = client(30)
        .send_and_wait(&url, "inventory_management_agent", "庫存")
        .await;
    assert!(matches!(outcome, TaskOutcome::Completed(ref text) if text == "目前有庫存"));
    assert_eq!(agent.get_calls(), 0);
}

#[tokio::test]
async fn test_json_rpc_error_is_transport_outcome() {
    let (url, _agent) = spawn_agent(Behaviour::RpcError).await;
    let outcome = client(30).send_and_wait(&url, "order_query_agent", "x").await;

    assert!(matches!(outcome, TaskOutcome::Transport(Error::AgentProtocol(_))));
    let text = outcome.render("order_query_agent");
    assert!(text.contains("agent exploded"), "{}", text);
}

#[tokio::test]
async fn test_http_error_status_is_transport_outcome() {
    let (url, _agent) = spawn_agent(Behaviour::Stuck).await;
    let outcome = client(30)
        .send_and_wait(&format!("{}/missing", url), "order_query_agent", "x")
        .await;
    assert!(matches!(outcome, TaskOutcome::Transport(Error::AgentProtocol(ref m)) if m.contains("404")));
}

#[tokio::test]
async fn test_unreachable_agent_is_transport_outcome() {
    let url = closed_endpoint().await;
    let outcome = client(30).send_and_wait(&url, "order_query_agent", "x").await;

    assert!(matches!(outcome, TaskOutcome::Transport(Error::NetworkError(_))));
    assert!(outcome
        .render("order_query_agent")
        .starts_with("Service order_query_agent is unavailable: "));
}
