//! Transcript data models.

use serde::{Deserialize, Serialize};

/// One timed segment of speech.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptChunk {
    /// Start time in seconds.
    pub start: f64,
    /// End time in seconds.
    pub end: f64,
    pub text: String,
}

impl TranscriptChunk {
    pub fn new(start: f64, end: f64, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
        }
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Stored transcript of a video, as written to `transcripts/<video_id>.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptData {
    pub video_id: String,
    pub transcript: Vec<TranscriptChunk>,
}

impl TranscriptData {
    /// Build a transcript from raw segments, trimming text and dropping empty ones.
    pub fn from_segments(video_id: impl Into<String>, segments: Vec<TranscriptChunk>) -> Self {
        let transcript = segments
            .into_iter()
            .filter_map(|mut s| {
                let trimmed = s.text.trim();
                if trimmed.is_empty() {
                    return None;
                }
                if trimmed.len() != s.text.len() {
                    s.text = trimmed.to_string();
                }
                Some(s)
            })
            .collect();

        Self {
            video_id: video_id.into(),
            transcript,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.transcript.is_empty()
    }

    /// End time of the last segment.
    pub fn duration_seconds(&self) -> f64 {
        self.transcript.last().map(|c| c.end).unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_segments_trims_and_drops_empty() {
        let data = TranscriptData::from_segments(
            "vid",
            vec![
                TranscriptChunk::new(0.0, 2.0, "  Hello there. "),
                TranscriptChunk::new(2.0, 3.0, "   "),
                TranscriptChunk::new(3.0, 5.5, "General Kenobi."),
            ],
        );

        assert_eq!(data.transcript.len(), 2);
        assert_eq!(data.transcript[0].text, "Hello there.");
        assert_eq!(data.transcript[1].text, "General Kenobi.");
        assert_eq!(data.duration_seconds(), 5.5);
    }

    #[test]
    fn test_serialized_shape() {
        let data = TranscriptData::from_segments("abc", vec![TranscriptChunk::new(0.0, 1.5, "Hi")]);
        let json = serde_json::to_value(&data).unwrap();
        assert_eq!(json["video_id"], "abc");
        assert_eq!(json["transcript"][0]["end"], 1.5);
        assert_eq!(json["transcript"][0]["text"], "Hi");
    }
}
