//! Low-confidence escalation to the reasoning service
//!
//! Similarity routing is fast but shallow. When its confidence falls below
//! the escalation cutoff, the query, the preliminary decision and all
//! candidate scores are handed to the reasoning service, which answers with
//! a structured `{selected_agent, confidence, reasoning}` object.

use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, info, warn};

use super::router::IntentRouter;
use super::types::{RequestContext, RoutingDecision, RoutingSource, ScoreMap};
use super::Category;
use crate::config::RouterConfig;
use crate::error::{Error, Result};
use crate::llm::{CompletionService, Message};

/// Router plus the reasoning fallback for uncertain matches
pub struct IntentClassifier {
    router: Arc<IntentRouter>,
    reasoner: Arc<dyn CompletionService>,
    escalation_confidence: f64,
}

impl IntentClassifier {
    pub fn new(router: Arc<IntentRouter>, reasoner: Arc<dyn CompletionService>) -> Self {
        Self {
            router,
            reasoner,
            escalation_confidence: RouterConfig::default().escalation_confidence,
        }
    }

    /// Decisions strictly below `cutoff` are escalated
    pub fn with_escalation_confidence(mut self, cutoff: f64) -> Self {
        self.escalation_confidence = cutoff;
        self
    }

    pub fn router(&self) -> &IntentRouter {
        &self.router
    }

    pub fn escalation_confidence(&self) -> f64 {
        self.escalation_confidence
    }

    /// Route `query`, escalating low-confidence decisions
    ///
    /// Reasoning transport errors and unusable reasoning output are returned
    /// as errors.
    pub async fn classify_intent(
        &self,
        query: &str,
        context: Option<&RequestContext>,
    ) -> Result<RoutingDecision> {
        let preliminary = self.router.route_with_context(query, context).await;
        if preliminary.confidence >= self.escalation_confidence {
            return Ok(preliminary);
        }

        info!(
            agent = %preliminary.selected_agent,
            confidence = preliminary.confidence,
            cutoff = self.escalation_confidence,
            "Low routing confidence, escalating to reasoning"
        );

        let messages = vec![
            Message::system(system_prompt(&self.router.build_categories_description())),
            Message::user(escalation_prompt(query, &preliminary)),
        ];
        let response = self.reasoner.chat(messages, &[]).await?;
        let decision = parse_reasoning_output(&response.content)?;

        info!(
            agent = %decision.selected_agent,
            confidence = decision.confidence,
            "Reasoning selected agent"
        );
        Ok(decision)
    }
}

impl std::fmt::Debug for IntentClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntentClassifier")
            .field("router", &self.router)
            .field("escalation_confidence", &self.escalation_confidence)
            .finish_non_exhaustive()
    }
}

fn system_prompt(categories: &str) -> String {
    format!(
        "You are a customer-service router. Assign the user's query to the single most \
         suitable specialist agent.\n\n\
         Available agents:\n{categories}\n\n\
         Answer with one JSON object only: \
         {{\"selected_agent\": \"<agent name>\", \"confidence\": <0.0-1.0>, \"reasoning\": \"<short explanation>\"}}"
    )
}

fn escalation_prompt(query: &str, preliminary: &RoutingDecision) -> String {
    format!(
        "User query: \"{query}\"\n\n\
         Preliminary match:\n\
         - Suggested agent: {agent}\n\
         - Confidence: {confidence:.2}\n\
         - Other candidates: {candidates}\n\n\
         Re-evaluate and choose the most suitable agent.",
        agent = preliminary.selected_agent,
        confidence = preliminary.confidence,
        candidates = format_scores(preliminary.all_scores.as_ref()),
    )
}

fn format_scores(scores: Option<&ScoreMap>) -> String {
    let entries: Vec<String> = scores
        .into_iter()
        .flatten()
        .map(|(category, score)| format!("{}: {:.2}", category, score))
        .collect();
    format!("{{{}}}", entries.join(", "))
}

#[derive(Debug, Deserialize)]
struct ReasoningVerdict {
    selected_agent: String,
    confidence: f64,
    #[serde(default)]
    reasoning: String,
}

/// Decode the reasoning service's structured answer
///
/// Accepts bare JSON, fenced code blocks, or JSON embedded in prose. An agent
/// name that is not a known category resolves to the escalation category.
pub fn parse_reasoning_output(text: &str) -> Result<RoutingDecision> {
    let json = extract_json(text).ok_or_else(|| {
        Error::ReasoningOutput(format!("No JSON object in reasoning output: {}", text.trim()))
    })?;

    let verdict: ReasoningVerdict = serde_json::from_str(json)
        .map_err(|e| Error::ReasoningOutput(format!("Malformed routing decision: {}", e)))?;

    let selected_agent = match verdict.selected_agent.parse::<Category>() {
        Ok(category) => category,
        Err(_) => {
            warn!(agent = %verdict.selected_agent, "Reasoning chose an unknown agent, escalating");
            Category::ESCALATION
        }
    };
    debug!(agent = %selected_agent, "Parsed reasoning verdict");

    Ok(RoutingDecision {
        selected_agent,
        confidence: verdict.confidence,
        reasoning: verdict.reasoning,
        all_scores: None,
        source: RoutingSource::Reasoning,
    })
}

/// Locate the JSON object in a model reply
fn extract_json(text: &str) -> Option<&str> {
    if let Some(start) = text.find("```json") {
        let body = &text[start + 7..];
        if let Some(end) = body.find("```") {
            return Some(body[..end].trim());
        }
    }

    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}
