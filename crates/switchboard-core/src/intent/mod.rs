//! Intent routing - semantic classification of queries into agent categories
//!
//! This module provides:
//! - The closed set of agent categories and their example phrases
//! - Embedding providers (remote API or local feature hashing)
//! - A max-over-examples similarity classifier over a precomputed index
//! - The router: threshold, context boosts and escalation fallback
//! - Reasoning escalation for low-confidence decisions

mod catalog;
mod category;
mod classifier;
mod embedding;
mod escalation;
mod router;
mod types;

pub use catalog::IntentCatalog;
pub use category::Category;
pub use classifier::{IntentIndex, SimilarityClassifier};
pub use embedding::{
    cosine_similarity, normalize, Embedder, HashingEmbedder, DEFAULT_HASHING_DIMENSIONS,
};
pub use escalation::{parse_reasoning_output, IntentClassifier};
pub use router::{
    adjust_scores_with_context, decide, IntentRouter, ORDER_BOOST, ORDER_TOKENS, SPEC_BOOST,
    SPEC_TOKENS,
};
pub use types::{
    best_category, RequestContext, RoutingDecision, RoutingSource, ScoreMap, FALLBACK_CONFIDENCE,
};
