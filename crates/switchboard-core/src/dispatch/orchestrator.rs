//! Dispatch orchestrator - top-level request coordinator
//!
//! The orchestrator:
//! - Classifies the request with the intent classifier
//! - Lets the reasoning service pick services through the `call_services` tool
//! - Fans the calls out to remote agents concurrently and merges their text
//! - Reformats the merged result for the user

use std::sync::Arc;

use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::prompts::{
    answer_prompt, orchestration_prompt, ASSISTANT_SYSTEM_PROMPT, ORCHESTRATOR_SYSTEM_PROMPT,
};
use super::tools::{call_services_tool, parse_call_services, ServiceContext, CALL_SERVICES};
use crate::config::{Config, EmbedderKind};
use crate::error::Result;
use crate::intent::{
    Embedder, HashingEmbedder, IntentCatalog, IntentClassifier, IntentRouter, RequestContext,
    SimilarityClassifier,
};
use crate::llm::{CompletionService, Message, ToolCall};
use crate::remote::{EndpointRegistry, RemoteAgentClient};

/// One chat turn as received from a caller
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_info: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<String>,
}

impl ChatRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    /// Routing context carried by this request
    pub fn context(&self) -> RequestContext {
        RequestContext {
            user_info: self.user_info.clone(),
            session_id: self.session_id.clone(),
            previous_queries: self.history.clone(),
            extra: Default::default(),
        }
    }
}

/// Routes requests, dispatches them to remote agents and formats the answer
pub struct Orchestrator {
    intent: IntentClassifier,
    reasoner: Arc<dyn CompletionService>,
    agents: RemoteAgentClient,
    registry: EndpointRegistry,
    max_tool_rounds: usize,
}

impl Orchestrator {
    pub fn new(
        intent: IntentClassifier,
        reasoner: Arc<dyn CompletionService>,
        agents: RemoteAgentClient,
        registry: EndpointRegistry,
    ) -> Self {
        Self {
            intent,
            reasoner,
            agents,
            registry,
            max_tool_rounds: crate::config::DispatchConfig::default().max_tool_rounds,
        }
    }

    pub fn with_max_tool_rounds(mut self, rounds: usize) -> Self {
        self.max_tool_rounds = rounds;
        self
    }

    /// Assemble every service from configuration
    ///
    /// `embedder` is only used when the configuration selects the remote
    /// embedder; the hashing embedder needs no network.
    pub async fn from_config(
        config: &Config,
        reasoner: Arc<dyn CompletionService>,
        remote_embedder: Arc<dyn Embedder>,
    ) -> Result<Self> {
        let catalog = match &config.router.intentions_path {
            Some(path) => IntentCatalog::load(path)?,
            None => IntentCatalog::builtin(),
        };
        let embedder: Arc<dyn Embedder> = match config.router.embedder {
            EmbedderKind::Remote => remote_embedder,
            EmbedderKind::Hashing => Arc::new(HashingEmbedder::default()),
        };

        let classifier = SimilarityClassifier::build(embedder, catalog).await?;
        let router = IntentRouter::from_config(Arc::new(classifier), &config.router);
        let intent = IntentClassifier::new(Arc::new(router), Arc::clone(&reasoner))
            .with_escalation_confidence(config.router.escalation_confidence);

        let agents = RemoteAgentClient::from_config(&config.dispatch)?;
        let registry = EndpointRegistry::from_config(&config.agents);

        Ok(Self::new(intent, reasoner, agents, registry)
            .with_max_tool_rounds(config.dispatch.max_tool_rounds))
    }

    pub fn intent(&self) -> &IntentClassifier {
        &self.intent
    }

    pub fn registry(&self) -> &EndpointRegistry {
        &self.registry
    }

    /// Classify the query, then let the reasoning service call services
    ///
    /// Returns the model's final free text.
    pub async fn route_task(&self, query: &str, context: Option<&RequestContext>) -> Result<String> {
        let decision = self.intent.classify_intent(query, context).await?;
        let categories = self.intent.router().build_categories_description();
        let prompt = orchestration_prompt(&decision, query, &categories);
        debug!(prompt = %prompt, "Built orchestration prompt");

        let tools = [call_services_tool()];
        let mut messages = vec![
            Message::system(ORCHESTRATOR_SYSTEM_PROMPT),
            Message::user(prompt),
        ];
        let mut rounds = 0;

        loop {
            let response = self.reasoner.chat(messages.clone(), &tools).await?;
            if !response.has_tool_calls() {
                info!(rounds, "Orchestration finished");
                return Ok(response.content);
            }
            if rounds >= self.max_tool_rounds {
                warn!(
                    rounds,
                    pending_calls = response.tool_calls.len(),
                    "Tool round limit reached, returning last reply"
                );
                return Ok(response.content);
            }
            rounds += 1;

            messages.push(response.to_message());
            for call in &response.tool_calls {
                let output = self.run_tool(call).await;
                messages.push(Message::tool(&call.id, output));
            }
        }
    }

    async fn run_tool(&self, call: &ToolCall) -> String {
        if call.function.name != CALL_SERVICES {
            warn!(tool = %call.function.name, "Model requested an unknown tool");
            return format!("Unknown tool: {}", call.function.name);
        }

        match parse_call_services(&call.function.arguments) {
            Ok(contexts) => self.call_services(&contexts).await,
            Err(e) => {
                warn!(error = %e, arguments = %call.function.arguments, "Rejected tool arguments");
                e.to_string()
            }
        }
    }

    /// Call every requested service concurrently
    ///
    /// Results are joined with newlines in input order. Failures of any kind
    /// become inline text; this never fails.
    pub async fn call_services(&self, contexts: &[ServiceContext]) -> String {
        info!(
            services = ?contexts.iter().map(|c| c.service.as_str()).collect::<Vec<_>>(),
            "Calling services"
        );

        let calls = contexts.iter().map(|ctx| async move {
            match self.registry.resolve(&ctx.service) {
                Ok((_, endpoint)) => self
                    .agents
                    .send_and_wait(endpoint, &ctx.service, &ctx.msg)
                    .await
                    .render(&ctx.service),
                Err(e) => {
                    warn!(service = %ctx.service, error = %e, "Skipping unknown service");
                    format!("Unknown service: {}: {}", ctx.service, ctx.msg)
                }
            }
        });

        join_all(calls).await.join("\n")
    }

    /// Final formatting pass over the merged service output
    pub async fn preprocess_answer(&self, query: &str, raw_result: &str) -> Result<String> {
        let messages = vec![
            Message::system(ASSISTANT_SYSTEM_PROMPT),
            Message::user(answer_prompt(query, raw_result)),
        ];
        let response = self.reasoner.chat(messages, &[]).await?;
        Ok(response.content)
    }

    /// Route, dispatch and format one chat turn
    pub async fn handle_chat(&self, request: &ChatRequest) -> Result<String> {
        let context = request.context();
        let raw = self.route_task(&request.message, Some(&context)).await?;
        self.preprocess_answer(&request.message, &raw).await
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("intent", &self.intent)
            .field("agents", &self.agents)
            .field("services", &self.registry.len())
            .field("max_tool_rounds", &self.max_tool_rounds)
            .finish_non_exhaustive()
    }
}
