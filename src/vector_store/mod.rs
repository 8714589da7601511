//! Vector store abstraction for STUD.
//!
//! Embedded chunks are grouped per video. Search is a linear cosine scan.

mod json;
mod memory;

pub use json::JsonVectorStore;
pub use memory::MemoryVectorStore;

use crate::chunking::TextChunk;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A chunk together with its embedding, as stored in `embeddings/<video_id>.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddedChunk {
    #[serde(flatten)]
    pub chunk: TextChunk,
    #[serde(default)]
    pub embedding: Vec<f32>,
}

impl EmbeddedChunk {
    pub fn new(chunk: TextChunk, embedding: Vec<f32>) -> Self {
        Self { chunk, embedding }
    }
}

/// A chunk ranked against a query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMatch {
    pub video_id: String,
    pub chunk_index: usize,
    pub text: String,
    pub start: f64,
    pub end: f64,
    pub similarity: f32,
}

/// Ranked matches plus the number of chunks that were scanned.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchOutcome {
    pub matches: Vec<ChunkMatch>,
    pub total_searched: usize,
}

/// Trait for vector store implementations.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Replace all chunks stored for a video.
    async fn save_video(&self, video_id: &str, chunks: &[EmbeddedChunk]) -> Result<()>;

    /// All chunks of a video in chunk order, `None` if the video has no embeddings.
    async fn chunks_for(&self, video_id: &str) -> Result<Option<Vec<EmbeddedChunk>>>;

    /// Whether embeddings exist for a video.
    async fn has_video(&self, video_id: &str) -> Result<bool>;

    /// Whether any video has been embedded at all.
    async fn has_any(&self) -> Result<bool>;

    /// Rank chunks by cosine similarity, optionally restricted to one video.
    async fn search(
        &self,
        query_embedding: &[f32],
        video_id: Option<&str>,
        top_k: usize,
    ) -> Result<SearchOutcome>;
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Score `chunks` against a query and keep the best `top_k`.
///
/// Chunks without an embedding are counted as scanned but never returned.
pub fn rank_chunks<'a, I>(query_embedding: &[f32], chunks: I, top_k: usize) -> SearchOutcome
where
    I: IntoIterator<Item = &'a EmbeddedChunk>,
{
    let mut total_searched = 0;
    let mut matches: Vec<ChunkMatch> = chunks
        .into_iter()
        .inspect(|_| total_searched += 1)
        .filter(|c| !c.embedding.is_empty())
        .map(|c| ChunkMatch {
            video_id: c.chunk.video_id.clone(),
            chunk_index: c.chunk.chunk_index,
            text: c.chunk.text.clone(),
            start: c.chunk.start,
            end: c.chunk.end,
            similarity: cosine_similarity(query_embedding, &c.embedding),
        })
        .collect();

    matches.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    matches.truncate(top_k);

    SearchOutcome {
        matches,
        total_searched,
    }
}

#[cfg(test)]
pub(crate) fn embedded(video_id: &str, chunk_index: usize, text: &str, embedding: Vec<f32>) -> EmbeddedChunk {
    EmbeddedChunk::new(
        TextChunk {
            video_id: video_id.to_string(),
            chunk_index,
            start: chunk_index as f64 * 10.0,
            end: (chunk_index + 1) as f64 * 10.0,
            text: text.to_string(),
            tokens: text.split_whitespace().count(),
        },
        embedding,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 0.001);

        let c = vec![0.0, 1.0, 0.0];
        assert!((cosine_similarity(&a, &c)).abs() < 0.001);

        let d = vec![-1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &d) + 1.0).abs() < 0.001);
    }

    #[test]
    fn test_cosine_similarity_degenerate() {
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn test_rank_chunks_orders_and_truncates() {
        let chunks = vec![
            embedded("v", 0, "far", vec![0.0, 1.0]),
            embedded("v", 1, "near", vec![1.0, 0.1]),
            embedded("v", 2, "unembedded", vec![]),
            embedded("v", 3, "middle", vec![1.0, 1.0]),
        ];

        let outcome = rank_chunks(&[1.0, 0.0], &chunks, 2);
        assert_eq!(outcome.total_searched, 4);
        let texts: Vec<&str> = outcome.matches.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["near", "middle"]);
    }

    #[test]
    fn test_embedded_chunk_is_flat_json() {
        let chunk = embedded("vid", 0, "hello", vec![0.5]);
        let json = serde_json::to_value(&chunk).unwrap();
        assert_eq!(json["video_id"], "vid");
        assert_eq!(json["chunk_index"], 0);
        assert_eq!(json["embedding"][0], 0.5);

        let back: EmbeddedChunk = serde_json::from_value(json).unwrap();
        assert_eq!(back, chunk);
    }
}
