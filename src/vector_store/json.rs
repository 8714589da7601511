//! Vector store over `embeddings/<video_id>.json` files.
//!
//! Nothing is cached: every call reads the files it needs from disk, so
//! writes from background jobs are visible immediately.

use super::{rank_chunks, EmbeddedChunk, SearchOutcome, VectorStore};
use crate::error::Result;
use crate::storage::{Collection, JsonStore};
use async_trait::async_trait;
use tracing::{debug, instrument};

pub struct JsonVectorStore {
    store: JsonStore,
}

impl JsonVectorStore {
    pub fn new(store: JsonStore) -> Self {
        Self { store }
    }

    fn load(&self, video_id: &str) -> Result<Option<Vec<EmbeddedChunk>>> {
        self.store.read(Collection::Embeddings, video_id)
    }
}

#[async_trait]
impl VectorStore for JsonVectorStore {
    async fn save_video(&self, video_id: &str, chunks: &[EmbeddedChunk]) -> Result<()> {
        self.store.write(Collection::Embeddings, video_id, &chunks)?;
        Ok(())
    }

    async fn chunks_for(&self, video_id: &str) -> Result<Option<Vec<EmbeddedChunk>>> {
        Ok(self.load(video_id)?.map(|mut chunks| {
            chunks.sort_by_key(|c| c.chunk.chunk_index);
            chunks
        }))
    }

    async fn has_video(&self, video_id: &str) -> Result<bool> {
        self.store.exists(Collection::Embeddings, video_id)
    }

    async fn has_any(&self) -> Result<bool> {
        Ok(!self.store.list_ids(Collection::Embeddings)?.is_empty())
    }

    #[instrument(skip(self, query_embedding))]
    async fn search(
        &self,
        query_embedding: &[f32],
        video_id: Option<&str>,
        top_k: usize,
    ) -> Result<SearchOutcome> {
        let chunks: Vec<EmbeddedChunk> = match video_id {
            Some(id) => self.load(id)?.unwrap_or_default(),
            None => self
                .store
                .read_all::<Vec<EmbeddedChunk>>(Collection::Embeddings)?
                .into_iter()
                .flat_map(|(_, chunks)| chunks)
                .collect(),
        };

        let outcome = rank_chunks(query_embedding, &chunks, top_k);
        debug!(
            "Scanned {} chunks, returning {}",
            outcome.total_searched,
            outcome.matches.len()
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector_store::embedded;

    #[tokio::test]
    async fn test_save_and_search_across_videos() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonVectorStore::new(JsonStore::new(dir.path()));

        assert!(!store.has_any().await.unwrap());
        let empty = store.search(&[1.0, 0.0], None, 5).await.unwrap();
        assert_eq!(empty.total_searched, 0);

        store
            .save_video(
                "a",
                &[
                    embedded("a", 0, "alpha", vec![1.0, 0.0]),
                    embedded("a", 1, "beta", vec![0.0, 1.0]),
                ],
            )
            .await
            .unwrap();
        store
            .save_video("b", &[embedded("b", 0, "gamma", vec![0.9, 0.1])])
            .await
            .unwrap();

        assert!(store.has_any().await.unwrap());
        assert!(store.has_video("a").await.unwrap());
        assert!(!store.has_video("c").await.unwrap());

        let all = store.search(&[1.0, 0.0], None, 2).await.unwrap();
        assert_eq!(all.total_searched, 3);
        assert_eq!(all.matches[0].text, "alpha");
        assert_eq!(all.matches[1].video_id, "b");

        let only_a = store.search(&[1.0, 0.0], Some("a"), 5).await.unwrap();
        assert_eq!(only_a.total_searched, 2);
        assert!(only_a.matches.iter().all(|m| m.video_id == "a"));

        let missing = store.search(&[1.0, 0.0], Some("zzz"), 5).await.unwrap();
        assert!(missing.matches.is_empty());
    }

    #[tokio::test]
    async fn test_chunks_for_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonVectorStore::new(JsonStore::new(dir.path()));
        store
            .save_video(
                "v",
                &[embedded("v", 1, "second", vec![1.0]), embedded("v", 0, "first", vec![1.0])],
            )
            .await
            .unwrap();

        let chunks = store.chunks_for("v").await.unwrap().unwrap();
        assert_eq!(chunks[0].chunk.text, "first");
        assert!(store.chunks_for("none").await.unwrap().is_none());
    }
}
