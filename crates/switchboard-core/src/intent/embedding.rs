//! Embedding providers used by the similarity classifier

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::llm::LlmClient;

/// Trait for embedding providers
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed every text, returning one vector per input in input order
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::EmbeddingFailed("Empty embedding response".to_string()))
    }
}

#[async_trait]
impl Embedder for LlmClient {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let embeddings = LlmClient::embed_batch(self, texts.to_vec(), None).await?;
        if embeddings.len() != texts.len() {
            return Err(Error::EmbeddingFailed(format!(
                "Expected {} embeddings, got {}",
                texts.len(),
                embeddings.len()
            )));
        }
        Ok(embeddings.into_iter().map(|e| e.vector).collect())
    }
}

/// Default dimensionality of [`HashingEmbedder`] vectors
pub const DEFAULT_HASHING_DIMENSIONS: usize = 1024;

/// Local embedder based on feature hashing
///
/// Each character and each pair of adjacent characters is hashed into a
/// fixed-size bucket vector, which is then L2-normalized. Texts that share
/// wording score high, which is enough for short CJK customer-service
/// phrases and makes routing reproducible without a network.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimensions: usize,
}

impl HashingEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Embed synchronously
    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        let chars: Vec<char> = text
            .chars()
            .filter(|c| c.is_alphanumeric())
            .flat_map(char::to_lowercase)
            .collect();

        let mut buf = [0u8; 8];
        for c in &chars {
            let bucket = self.bucket(1, c.encode_utf8(&mut buf).as_bytes());
            vector[bucket] += 1.0;
        }
        for pair in chars.windows(2) {
            let mut bytes = Vec::with_capacity(8);
            bytes.extend_from_slice(pair[0].encode_utf8(&mut buf).as_bytes());
            bytes.extend_from_slice(pair[1].encode_utf8(&mut buf).as_bytes());
            let bucket = self.bucket(2, &bytes);
            vector[bucket] += 1.0;
        }

        normalize(&mut vector);
        vector
    }

    fn bucket(&self, tag: u8, bytes: &[u8]) -> usize {
        (fnv1a(tag, bytes) % self.dimensions as u64) as usize
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_HASHING_DIMENSIONS)
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }
}

fn fnv1a(tag: u8, bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;

    let mut hash = OFFSET;
    for byte in std::iter::once(&tag).chain(bytes) {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(PRIME);
    }
    hash
}

/// Scale a vector to unit length in place (zero vectors are left alone)
pub fn normalize(vector: &mut [f32]) {
    let magnitude: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if magnitude > 0.0 {
        for x in vector.iter_mut() {
            *x /= magnitude;
        }
    }
}

/// Compute cosine similarity between two vectors
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let magnitude_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let magnitude_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if magnitude_a == 0.0 || magnitude_b == 0.0 {
        return 0.0;
    }

    dot_product / (magnitude_a * magnitude_b)
}
