//! Intent Router - semantic routing of queries to agent categories
//!
//! The router combines:
//! - Max-over-examples similarity scoring from [`SimilarityClassifier`]
//! - A confidence threshold below which categories are discarded
//! - Keyword boosts derived from the request context
//! - A fixed hand-off to the escalation category when nothing matches

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::classifier::SimilarityClassifier;
use super::types::{best_category, RequestContext, RoutingDecision, ScoreMap};
use super::Category;
use crate::config::RouterConfig;

/// Context tokens that hint at an order lookup
pub const ORDER_TOKENS: [&str; 3] = ["user_id", "order", "jtcg-"];

/// Context tokens that hint at product specifications
pub const SPEC_TOKENS: [&str; 4] = ["吋", "vesa", "支架", "mm"];

/// Multiplier applied to the order category when an order token is present
pub const ORDER_BOOST: f64 = 1.2;

/// Multiplier applied to product and technical categories when a spec token is present
pub const SPEC_BOOST: f64 = 1.1;

/// Semantic intent router
pub struct IntentRouter {
    classifier: Arc<SimilarityClassifier>,
    threshold: f64,
}

impl IntentRouter {
    pub fn new(classifier: Arc<SimilarityClassifier>) -> Self {
        Self::with_threshold(classifier, RouterConfig::default().threshold)
    }

    pub fn with_threshold(classifier: Arc<SimilarityClassifier>, threshold: f64) -> Self {
        Self {
            classifier,
            threshold,
        }
    }

    pub fn from_config(classifier: Arc<SimilarityClassifier>, config: &RouterConfig) -> Self {
        Self::with_threshold(classifier, config.threshold)
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn classifier(&self) -> &SimilarityClassifier {
        &self.classifier
    }

    /// Categories whose best similarity is strictly above `threshold`
    ///
    /// Embedding failures are logged and produce an empty map.
    pub async fn find_best_agent(&self, query: &str, threshold: f64) -> ScoreMap {
        match self.classifier.similarities(query).await {
            Ok(mut scores) => {
                scores.retain(|_, score| *score > threshold);
                scores
            }
            Err(e) => {
                warn!(error = %e, code = e.code(), "Failed to embed query; no category matched");
                ScoreMap::new()
            }
        }
    }

    /// Route a query, biased by the optional request context
    ///
    /// Always returns a decision; unmatched queries go to the escalation category.
    pub async fn route_with_context(
        &self,
        query: &str,
        context: Option<&RequestContext>,
    ) -> RoutingDecision {
        let mut scores = self.find_best_agent(query, self.threshold).await;
        if let Some(context) = context {
            scores = adjust_scores_with_context(scores, context);
        }

        let decision = decide(scores);
        info!(
            agent = %decision.selected_agent,
            confidence = decision.confidence,
            source = ?decision.source,
            "Routed query"
        );
        decision
    }

    /// Route a query with no context
    pub async fn route(&self, query: &str) -> RoutingDecision {
        self.route_with_context(query, None).await
    }

    /// `- <agent>: <example>,<example>` lines for reasoning prompts
    pub fn build_categories_description(&self) -> String {
        self.classifier.catalog().describe()
    }
}

impl std::fmt::Debug for IntentRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntentRouter")
            .field("threshold", &self.threshold)
            .field("classifier", &self.classifier)
            .finish()
    }
}

/// Apply the context keyword boosts to categories already in `scores`
pub fn adjust_scores_with_context(mut scores: ScoreMap, context: &RequestContext) -> ScoreMap {
    if context.mentions_any(&ORDER_TOKENS) {
        boost(&mut scores, Category::OrderQuery, ORDER_BOOST);
    }
    if context.mentions_any(&SPEC_TOKENS) {
        boost(&mut scores, Category::ProductRecommendation, SPEC_BOOST);
        boost(&mut scores, Category::TechnicalSupport, SPEC_BOOST);
    }

    scores
}

fn boost(scores: &mut ScoreMap, category: Category, factor: f64) {
    if let Some(score) = scores.get_mut(&category) {
        debug!(agent = %category, from = *score, factor, "Boosting score from context");
        *score *= factor;
    }
}

/// Pick the top category, or the fallback when nothing matched
pub fn decide(scores: ScoreMap) -> RoutingDecision {
    match best_category(&scores) {
        Some((category, confidence)) => RoutingDecision::matched(category, confidence, scores),
        None => RoutingDecision::fallback(),
    }
}
