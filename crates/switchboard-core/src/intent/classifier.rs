//! Max-over-examples cosine classifier

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info};

use super::embedding::{cosine_similarity, normalize, Embedder};
use super::{Category, IntentCatalog, ScoreMap};
use crate::error::Result;

/// Precomputed, normalized example embeddings per category
///
/// Built once and never mutated; categories without examples have no entry.
#[derive(Debug, Clone, Default)]
pub struct IntentIndex {
    entries: BTreeMap<Category, Vec<Vec<f32>>>,
}

impl IntentIndex {
    /// Embed every example phrase of the catalog in one batch
    pub async fn build(embedder: &dyn Embedder, catalog: &IntentCatalog) -> Result<Self> {
        let mut owners = Vec::new();
        let mut phrases = Vec::new();
        for (category, examples) in catalog.iter() {
            for phrase in examples {
                owners.push(category);
                phrases.push(phrase.clone());
            }
        }

        let mut entries: BTreeMap<Category, Vec<Vec<f32>>> = BTreeMap::new();
        if phrases.is_empty() {
            return Ok(Self { entries });
        }

        let vectors = embedder.embed_batch(&phrases).await?;
        for (category, mut vector) in owners.into_iter().zip(vectors) {
            normalize(&mut vector);
            entries.entry(category).or_default().push(vector);
        }

        Ok(Self { entries })
    }

    /// Categories present in the index, in priority order
    pub fn categories(&self) -> impl Iterator<Item = Category> + '_ {
        self.entries.keys().copied()
    }

    pub fn example_count(&self, category: Category) -> usize {
        self.entries.get(&category).map_or(0, Vec::len)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Best similarity per category for an already-normalized query vector
    pub fn score(&self, query: &[f32]) -> ScoreMap {
        self.entries
            .iter()
            .filter_map(|(category, examples)| {
                examples
                    .iter()
                    .map(|example| f64::from(cosine_similarity(query, example)))
                    .reduce(f64::max)
                    .map(|best| (*category, best))
            })
            .collect()
    }
}

/// Embeds queries and scores them against an [`IntentIndex`]
pub struct SimilarityClassifier {
    embedder: Arc<dyn Embedder>,
    index: Arc<IntentIndex>,
    catalog: IntentCatalog,
}

impl SimilarityClassifier {
    /// Embed the catalog and build the classifier
    pub async fn build(embedder: Arc<dyn Embedder>, catalog: IntentCatalog) -> Result<Self> {
        let index = IntentIndex::build(embedder.as_ref(), &catalog).await?;
        info!(
            categories = index.len(),
            examples = catalog.iter().map(|(_, p)| p.len()).sum::<usize>(),
            "Built intent index"
        );
        Ok(Self {
            embedder,
            index: Arc::new(index),
            catalog,
        })
    }

    pub fn index(&self) -> Arc<IntentIndex> {
        Arc::clone(&self.index)
    }

    pub fn catalog(&self) -> &IntentCatalog {
        &self.catalog
    }

    /// Unfiltered best similarity per indexed category
    pub async fn similarities(&self, query: &str) -> Result<ScoreMap> {
        let mut vector = self.embedder.embed(query).await?;
        normalize(&mut vector);
        let scores = self.index.score(&vector);
        debug!(query = %query, scores = ?scores, "Computed similarities");
        Ok(scores)
    }
}

impl std::fmt::Debug for SimilarityClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimilarityClassifier")
            .field("categories", &self.index.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::HashingEmbedder;

    async fn classifier(catalog: IntentCatalog) -> SimilarityClassifier {
        SimilarityClassifier::build(Arc::new(HashingEmbedder::default()), catalog)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_exact_example_scores_one() {
        let classifier = classifier(IntentCatalog::builtin()).await;
        let scores = classifier.similarities("運費怎麼計算").await.unwrap();
        let payment = scores[&Category::PaymentShipping];
        assert!((payment - 1.0).abs() < 1e-5, "payment score {}", payment);
    }

    #[tokio::test]
    async fn test_max_over_examples() {
        let catalog = IntentCatalog::new().with_examples(
            Category::OrderQuery,
            ["運費怎麼計算", "我想查詢訂單狀態"],
        );
        let classifier = classifier(catalog).await;

        let scores = classifier.similarities("我想查詢訂單").await.unwrap();
        // the unrelated first example must not drag the score down
        assert!(scores[&Category::OrderQuery] > 0.8);
    }

    #[tokio::test]
    async fn test_categories_without_examples_are_absent() {
        let catalog = IntentCatalog::new()
            .with_examples(Category::PolicyInformation, ["我想要退貨"])
            .with_examples(Category::InventoryManagement, Vec::<String>::new());
        let classifier = classifier(catalog).await;

        assert_eq!(classifier.index().len(), 1);
        let scores = classifier.similarities("我想要退貨").await.unwrap();
        assert_eq!(scores.keys().copied().collect::<Vec<_>>(), [Category::PolicyInformation]);
    }

    #[tokio::test]
    async fn test_empty_catalog_scores_nothing() {
        let classifier = classifier(IntentCatalog::new()).await;
        assert!(classifier.index().is_empty());
        assert!(classifier.similarities("任何問題").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_index_counts_examples() {
        let catalog = IntentCatalog::builtin();
        let index = IntentIndex::build(&HashingEmbedder::default(), &catalog)
            .await
            .unwrap();
        assert_eq!(index.len(), Category::ALL.len());
        assert_eq!(index.example_count(Category::OrderQuery), 5);
        assert_eq!(index.example_count(Category::HumanEscalation), 3);
    }
}
