//! YouTube playlist ingestion.
//!
//! Turns a playlist URL into a stored [`PlaylistData`] record listing the
//! videos of a course.

mod youtube;

pub use youtube::{PlaylistMetadata, PlaylistItem, VideoDetails, YoutubeClient};

use crate::error::{Result, StudError};
use crate::storage::{Collection, JsonStore};
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::OnceLock;
use tracing::{info, instrument, warn};

/// Titles YouTube uses for items that can no longer be played.
const UNAVAILABLE_TITLES: [&str; 2] = ["Private video", "Deleted video"];

/// A single video of an ingested playlist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoMetadata {
    pub video_id: String,
    pub title: String,
    pub duration_seconds: u64,
    pub youtube_url: String,
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
}

/// An ingested playlist (a course).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaylistData {
    pub playlist_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_title: Option<String>,
    pub videos: Vec<VideoMetadata>,
    #[serde(default = "Utc::now")]
    pub ingested_at: DateTime<Utc>,
}

impl PlaylistData {
    /// Total duration of all videos, in seconds.
    pub fn total_duration_seconds(&self) -> u64 {
        self.videos.iter().map(|v| v.duration_seconds).sum()
    }
}

/// Short listing entry for an ingested playlist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistSummary {
    pub playlist_id: String,
    pub title: String,
    pub video_count: usize,
    pub total_duration_seconds: u64,
    pub ingested_at: DateTime<Utc>,
}

impl From<&PlaylistData> for PlaylistSummary {
    fn from(playlist: &PlaylistData) -> Self {
        Self {
            playlist_id: playlist.playlist_id.clone(),
            title: playlist.title.clone(),
            video_count: playlist.videos.len(),
            total_duration_seconds: playlist.total_duration_seconds(),
            ingested_at: playlist.ingested_at,
        }
    }
}

fn list_param_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[?&]list=([A-Za-z0-9_-]+)").expect("valid playlist regex"))
}

fn duration_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^PT(?:(\d+)H)?(?:(\d+)M)?(?:(\d+)S)?").expect("valid duration regex")
    })
}

/// Extract the playlist ID from a YouTube playlist URL.
///
/// Accepts anything carrying a `list` query parameter, e.g.
/// `https://www.youtube.com/playlist?list=PLxxx` or a watch URL inside a playlist.
pub fn extract_playlist_id(playlist_url: &str) -> Result<String> {
    let trimmed = playlist_url.trim();

    if let Ok(parsed) = url::Url::parse(trimmed) {
        let from_query = parsed
            .query_pairs()
            .find(|(k, _)| k == "list")
            .map(|(_, v)| v.into_owned())
            .filter(|v| !v.is_empty() && v.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-'));
        if let Some(id) = from_query {
            return Ok(id);
        }
    }

    list_param_regex()
        .captures(trimmed)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| {
            StudError::InvalidInput(format!(
                "Could not extract playlist ID from URL: {}",
                playlist_url
            ))
        })
}

/// Parse an ISO 8601 video duration (`PT1H2M3S`) into seconds.
///
/// Unparseable input yields 0.
pub fn parse_duration(duration: &str) -> u64 {
    let Some(caps) = duration_regex().captures(duration.trim()) else {
        return 0;
    };

    let part = |i: usize| {
        caps.get(i)
            .and_then(|m| m.as_str().parse::<u64>().ok())
            .unwrap_or(0)
    };

    part(1) * 3600 + part(2) * 60 + part(3)
}

/// Assemble playlist data from the three YouTube API responses.
///
/// Unavailable items and items without video details are dropped,
/// playlist order is kept.
pub fn build_playlist(
    playlist_id: &str,
    metadata: &PlaylistMetadata,
    items: &[PlaylistItem],
    details: &HashMap<String, VideoDetails>,
) -> PlaylistData {
    let videos = items
        .iter()
        .filter(|item| !is_unavailable(item))
        .filter_map(|item| {
            let detail = details.get(&item.video_id)?;
            Some(VideoMetadata {
                video_id: item.video_id.clone(),
                title: item.title.clone(),
                duration_seconds: detail.duration_seconds,
                youtube_url: format!("https://youtu.be/{}", item.video_id),
                published_at: detail.published_at,
                thumbnail_url: detail.thumbnail_url.clone(),
            })
        })
        .collect();

    PlaylistData {
        playlist_id: playlist_id.to_string(),
        title: metadata.title.clone(),
        description: metadata.description.clone(),
        channel_title: metadata.channel_title.clone(),
        videos,
        ingested_at: Utc::now(),
    }
}

fn is_unavailable(item: &PlaylistItem) -> bool {
    UNAVAILABLE_TITLES.contains(&item.title.as_str())
}

/// Fetches playlists from YouTube and stores them.
pub struct IngestService {
    client: YoutubeClient,
    store: JsonStore,
    max_results: usize,
}

impl IngestService {
    pub fn new(client: YoutubeClient, store: JsonStore, max_results: usize) -> Self {
        Self {
            client,
            store,
            max_results,
        }
    }

    /// Ingest a playlist and persist it to `playlists/<id>.json`.
    ///
    /// `course_title`, when given, replaces the YouTube playlist title.
    #[instrument(skip(self))]
    pub async fn ingest_playlist(
        &self,
        playlist_url: &str,
        course_title: Option<&str>,
    ) -> Result<PlaylistData> {
        let playlist_id = extract_playlist_id(playlist_url)?;

        let metadata = self.client.get_playlist_metadata(&playlist_id).await?;
        let items = self
            .client
            .get_playlist_videos(&playlist_id, self.max_results)
            .await?;

        if items.is_empty() {
            return Err(StudError::InvalidInput(format!(
                "No videos found in playlist: {}",
                playlist_id
            )));
        }

        let video_ids: Vec<String> = items
            .iter()
            .filter(|item| !is_unavailable(item))
            .map(|item| item.video_id.clone())
            .collect();
        let skipped = items.len() - video_ids.len();
        if skipped > 0 {
            warn!("Skipping {} unavailable videos", skipped);
        }

        let details = self.client.get_video_details(&video_ids).await?;

        let mut playlist = build_playlist(&playlist_id, &metadata, &items, &details);
        if let Some(title) = course_title.map(str::trim).filter(|t| !t.is_empty()) {
            playlist.title = title.to_string();
        }

        self.store
            .write(Collection::Playlists, &playlist.playlist_id, &playlist)?;

        info!(
            "Ingested playlist {} ({} videos)",
            playlist.playlist_id,
            playlist.videos.len()
        );
        Ok(playlist)
    }
}

/// Load a stored playlist.
pub fn load_playlist(store: &JsonStore, playlist_id: &str) -> Result<Option<PlaylistData>> {
    store.read(Collection::Playlists, playlist_id)
}

/// Summaries of every stored playlist, newest first.
pub fn list_playlists(store: &JsonStore) -> Result<Vec<PlaylistSummary>> {
    let mut summaries: Vec<PlaylistSummary> = store
        .read_all::<PlaylistData>(Collection::Playlists)?
        .iter()
        .map(|(_, p)| PlaylistSummary::from(p))
        .collect();
    summaries.sort_by(|a, b| b.ingested_at.cmp(&a.ingested_at));
    Ok(summaries)
}
