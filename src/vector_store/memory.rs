//! In-memory vector store implementation.
//!
//! Useful for testing and small datasets.

use super::{rank_chunks, EmbeddedChunk, SearchOutcome, VectorStore};
use crate::error::{Result, StudError};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::RwLock;

/// In-memory vector store keyed by video id.
pub struct MemoryVectorStore {
    videos: RwLock<BTreeMap<String, Vec<EmbeddedChunk>>>,
}

impl MemoryVectorStore {
    pub fn new() -> Self {
        Self {
            videos: RwLock::new(BTreeMap::new()),
        }
    }
}

impl Default for MemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned() -> StudError {
    StudError::Storage("vector store lock poisoned".to_string())
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn save_video(&self, video_id: &str, chunks: &[EmbeddedChunk]) -> Result<()> {
        let mut videos = self.videos.write().map_err(|_| poisoned())?;
        videos.insert(video_id.to_string(), chunks.to_vec());
        Ok(())
    }

    async fn chunks_for(&self, video_id: &str) -> Result<Option<Vec<EmbeddedChunk>>> {
        let videos = self.videos.read().map_err(|_| poisoned())?;
        Ok(videos.get(video_id).map(|chunks| {
            let mut chunks = chunks.clone();
            chunks.sort_by_key(|c| c.chunk.chunk_index);
            chunks
        }))
    }

    async fn has_video(&self, video_id: &str) -> Result<bool> {
        let videos = self.videos.read().map_err(|_| poisoned())?;
        Ok(videos.contains_key(video_id))
    }

    async fn has_any(&self) -> Result<bool> {
        let videos = self.videos.read().map_err(|_| poisoned())?;
        Ok(!videos.is_empty())
    }

    async fn search(
        &self,
        query_embedding: &[f32],
        video_id: Option<&str>,
        top_k: usize,
    ) -> Result<SearchOutcome> {
        let videos = self.videos.read().map_err(|_| poisoned())?;
        let outcome = match video_id {
            Some(id) => rank_chunks(query_embedding, videos.get(id).into_iter().flatten(), top_k),
            None => rank_chunks(query_embedding, videos.values().flatten(), top_k),
        };
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector_store::embedded;

    #[tokio::test]
    async fn test_memory_vector_store() {
        let store = MemoryVectorStore::new();
        assert!(!store.has_any().await.unwrap());

        store
            .save_video(
                "video1",
                &[
                    embedded("video1", 0, "Hello world", vec![1.0, 0.0, 0.0]),
                    embedded("video1", 1, "Goodbye world", vec![0.0, 1.0, 0.0]),
                ],
            )
            .await
            .unwrap();

        let results = store.search(&[1.0, 0.0, 0.0], None, 10).await.unwrap();
        assert_eq!(results.matches.len(), 2);
        assert!(results.matches[0].similarity > results.matches[1].similarity);

        let scoped = store.search(&[1.0, 0.0, 0.0], Some("other"), 10).await.unwrap();
        assert_eq!(scoped.total_searched, 0);

        // Saving again replaces the previous chunks
        store
            .save_video("video1", &[embedded("video1", 0, "Only", vec![1.0, 0.0, 0.0])])
            .await
            .unwrap();
        assert_eq!(store.chunks_for("video1").await.unwrap().unwrap().len(), 1);
    }
}
