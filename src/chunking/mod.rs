//! Token-budgeted chunking of transcripts.
//!
//! Whisper segments are short (a sentence or two). Before embedding, adjacent
//! segments are merged greedily into chunks of at most `max_tokens` tokens
//! as counted by the `cl100k_base` encoding.

use crate::error::{Result, StudError};
use crate::transcription::{TranscriptChunk, TranscriptData};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tiktoken_rs::CoreBPE;
use tracing::debug;

/// A merged, embeddable piece of a transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextChunk {
    pub video_id: String,
    pub chunk_index: usize,
    pub start: f64,
    pub end: f64,
    pub text: String,
    pub tokens: usize,
}

/// A merged span before it is tagged with its video and position.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedSpan {
    pub start: f64,
    pub end: f64,
    pub text: String,
    pub tokens: usize,
}

/// Merges transcript segments under a token budget.
#[derive(Clone)]
pub struct ChunkingService {
    bpe: Arc<CoreBPE>,
    max_tokens: usize,
}

impl ChunkingService {
    /// Create a chunker using the `cl100k_base` tokenizer.
    pub fn new(max_tokens: usize) -> Result<Self> {
        let bpe = tiktoken_rs::cl100k_base()
            .map_err(|e| StudError::Chunking(format!("Failed to load cl100k_base: {}", e)))?;

        Ok(Self {
            bpe: Arc::new(bpe),
            max_tokens,
        })
    }

    pub fn max_tokens(&self) -> usize {
        self.max_tokens
    }

    /// Number of tokens in `text`.
    pub fn count_tokens(&self, text: &str) -> usize {
        self.bpe.encode_ordinary(text).len()
    }

    /// Greedily merge consecutive segments while the joined text fits the budget.
    ///
    /// A segment that alone exceeds the budget becomes its own chunk.
    pub fn merge_small_chunks(&self, segments: &[TranscriptChunk]) -> Vec<MergedSpan> {
        let mut iter = segments.iter();
        let Some(first) = iter.next() else {
            return Vec::new();
        };

        let mut merged = Vec::new();
        let mut current = MergedSpan {
            start: first.start,
            end: first.end,
            text: first.text.clone(),
            tokens: self.count_tokens(&first.text),
        };

        for next in iter {
            let candidate = format!("{} {}", current.text, next.text);
            let candidate_tokens = self.count_tokens(&candidate);

            if candidate_tokens <= self.max_tokens {
                current.text = candidate;
                current.end = next.end;
                current.tokens = candidate_tokens;
            } else {
                let closed = std::mem::replace(
                    &mut current,
                    MergedSpan {
                        start: next.start,
                        end: next.end,
                        text: next.text.clone(),
                        tokens: self.count_tokens(&next.text),
                    },
                );
                merged.push(closed);
            }
        }

        merged.push(current);
        merged
    }

    /// Chunk a stored transcript into indexed [`TextChunk`]s.
    pub fn chunk_transcript(&self, transcript: &TranscriptData) -> Vec<TextChunk> {
        let chunks: Vec<TextChunk> = self
            .merge_small_chunks(&transcript.transcript)
            .into_iter()
            .enumerate()
            .map(|(chunk_index, span)| TextChunk {
                video_id: transcript.video_id.clone(),
                chunk_index,
                start: span.start,
                end: span.end,
                text: span.text,
                tokens: span.tokens,
            })
            .collect();

        debug!(
            "Chunked {} segments of {} into {} chunks",
            transcript.transcript.len(),
            transcript.video_id,
            chunks.len()
        );
        chunks
    }
}

/// Mean token count of a set of chunks, 0 for none.
pub fn average_tokens(chunks: &[TextChunk]) -> f64 {
    if chunks.is_empty() {
        return 0.0;
    }
    chunks.iter().map(|c| c.tokens).sum::<usize>() as f64 / chunks.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segments(texts: &[&str]) -> Vec<TranscriptChunk> {
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| TranscriptChunk::new(i as f64 * 2.0, (i + 1) as f64 * 2.0, *t))
            .collect()
    }

    #[test]
    fn test_count_tokens() {
        let chunker = ChunkingService::new(800).unwrap();
        assert_eq!(chunker.count_tokens(""), 0);
        assert!(chunker.count_tokens("hello world") >= 2);
    }

    #[test]
    fn test_merge_all_under_budget() {
        let chunker = ChunkingService::new(800).unwrap();
        let merged = chunker.merge_small_chunks(&segments(&["A", "B", "C"]));

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].text, "A B C");
        assert_eq!(merged[0].start, 0.0);
        assert_eq!(merged[0].end, 6.0);
        assert_eq!(merged[0].tokens, chunker.count_tokens("A B C"));
    }

    #[test]
    fn test_merge_respects_budget() {
        let chunker = ChunkingService::new(2).unwrap();
        let merged = chunker.merge_small_chunks(&segments(&["A", "B", "C"]));

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].text, "A B");
        assert_eq!(merged[0].end, 4.0);
        assert_eq!(merged[1].text, "C");
        assert_eq!(merged[1].start, 4.0);
        assert!(merged.iter().all(|m| m.tokens <= 2));
    }

    #[test]
    fn test_oversized_segment_stays_alone() {
        let chunker = ChunkingService::new(3).unwrap();
        let long = "this sentence has far more than three tokens in it";
        let merged = chunker.merge_small_chunks(&segments(&["Hi", long, "Bye"]));

        assert_eq!(merged.len(), 3);
        assert_eq!(merged[1].text, long);
        assert!(merged[1].tokens > 3);
    }

    #[test]
    fn test_chunk_transcript_indexes() {
        let chunker = ChunkingService::new(2).unwrap();
        let transcript = TranscriptData {
            video_id: "vid".to_string(),
            transcript: segments(&["A", "B", "C", "D"]),
        };

        let chunks = chunker.chunk_transcript(&transcript);
        assert_eq!(chunks.len(), 2);
        assert!(chunks.iter().all(|c| c.video_id == "vid"));
        assert_eq!(chunks.iter().map(|c| c.chunk_index).collect::<Vec<_>>(), vec![0, 1]);
        assert_eq!(average_tokens(&chunks), 2.0);
    }

    #[test]
    fn test_empty_transcript() {
        let chunker = ChunkingService::new(800).unwrap();
        let transcript = TranscriptData {
            video_id: "vid".to_string(),
            transcript: Vec::new(),
        };
        assert!(chunker.chunk_transcript(&transcript).is_empty());
        assert_eq!(average_tokens(&[]), 0.0);
    }
}
