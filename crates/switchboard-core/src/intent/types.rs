//! Types produced and consumed by the intent router

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::Category;

/// Category to similarity score, iterated in category priority order
pub type ScoreMap = BTreeMap<Category, f64>;

/// Highest-scoring category; on equal scores the higher-priority category wins
pub fn best_category(scores: &ScoreMap) -> Option<(Category, f64)> {
    scores.iter().fold(None, |best, (category, score)| match best {
        Some((_, best_score)) if *score <= best_score => best,
        _ => Some((*category, *score)),
    })
}

/// Caller-supplied context that can bias routing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_info: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub previous_queries: Vec<String>,
    /// Any other fields, matched like the named ones
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user_info(mut self, user_info: Value) -> Self {
        self.user_info = Some(user_info);
        self
    }

    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_previous_queries(mut self, queries: Vec<String>) -> Self {
        self.previous_queries = queries;
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Lower-cased JSON rendering used for keyword matching
    pub fn search_text(&self) -> String {
        serde_json::to_string(self)
            .unwrap_or_default()
            .to_lowercase()
    }

    /// Whether any of `tokens` occurs in the lower-cased rendering
    pub fn mentions_any(&self, tokens: &[&str]) -> bool {
        let text = self.search_text();
        tokens.iter().any(|token| text.contains(&token.to_lowercase()))
    }
}

/// How a routing decision was reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingSource {
    /// Best semantic-similarity match above the threshold
    Similarity,
    /// Nothing cleared the threshold
    Fallback,
    /// Re-evaluated by the reasoning service after a low-confidence match
    Reasoning,
}

/// Result of routing one query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingDecision {
    pub selected_agent: Category,
    pub confidence: f64,
    pub reasoning: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub all_scores: Option<ScoreMap>,
    pub source: RoutingSource,
}

impl RoutingDecision {
    /// Decision taken from the top similarity score
    pub fn matched(selected_agent: Category, confidence: f64, scores: ScoreMap) -> Self {
        Self {
            selected_agent,
            confidence,
            reasoning: format!("Semantic similarity match, confidence: {:.2}", confidence),
            all_scores: Some(scores),
            source: RoutingSource::Similarity,
        }
    }

    /// Fixed decision when no category matched
    pub fn fallback() -> Self {
        Self {
            selected_agent: Category::ESCALATION,
            confidence: FALLBACK_CONFIDENCE,
            reasoning: FALLBACK_REASONING.to_string(),
            all_scores: None,
            source: RoutingSource::Fallback,
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.source == RoutingSource::Fallback
    }
}

/// Confidence reported by the fallback decision
pub const FALLBACK_CONFIDENCE: f64 = 0.3;

const FALLBACK_REASONING: &str =
    "Could not identify the user's intent; handing off to a human agent";
