//! YouTube Data API v3 client.

use super::parse_duration;
use crate::config::YoutubeSettings;
use crate::error::{Result, StudError};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, instrument};

/// The API accepts at most 50 results per page and 50 ids per `videos` call.
const API_PAGE_LIMIT: usize = 50;

/// Playlist title and description.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaylistMetadata {
    pub title: String,
    pub description: String,
    pub channel_title: Option<String>,
    pub item_count: u64,
}

/// One entry of a playlist.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaylistItem {
    pub video_id: String,
    pub title: String,
}

/// Per-video details from the `videos` endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoDetails {
    pub duration_seconds: u64,
    pub published_at: Option<DateTime<Utc>>,
    pub thumbnail_url: Option<String>,
}

// Wire types. Only the fields we read are declared.

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistResource {
    snippet: PlaylistSnippet,
    #[serde(default)]
    content_details: PlaylistContentDetails,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistSnippet {
    title: String,
    #[serde(default)]
    description: String,
    channel_title: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistContentDetails {
    #[serde(default)]
    item_count: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistItemResource {
    snippet: ItemSnippet,
    content_details: ItemContentDetails,
}

#[derive(Debug, Deserialize)]
struct ItemSnippet {
    title: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItemContentDetails {
    video_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoResource {
    id: String,
    content_details: VideoContentDetails,
    snippet: VideoSnippet,
}

#[derive(Debug, Deserialize)]
struct VideoContentDetails {
    #[serde(default)]
    duration: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoSnippet {
    published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    thumbnails: HashMap<String, Thumbnail>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: String,
}

/// Client for the subset of the YouTube Data API used during ingestion.
pub struct YoutubeClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl YoutubeClient {
    /// Create a client from settings. Fails if no API key is configured.
    pub fn from_settings(settings: &YoutubeSettings) -> Result<Self> {
        let api_key = settings
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| StudError::Config("YOUTUBE_API_KEY not set".to_string()))?;

        Self::new(
            api_key,
            &settings.base_url,
            Duration::from_secs(settings.request_timeout_seconds),
        )
    }

    pub fn new(api_key: String, base_url: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StudError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get<T: DeserializeOwned>(&self, endpoint: &str, params: &[(&str, String)]) -> Result<T> {
        let url = format!("{}/{}", self.base_url, endpoint);
        debug!("GET {}", url);

        let response = self
            .http
            .get(&url)
            .query(params)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| {
                // The request URL carries the API key.
                StudError::Youtube(format!("{} request failed: {}", endpoint, e.without_url()))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StudError::Youtube(format!(
                "{} returned {}: {}",
                endpoint, status, body
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| {
                StudError::Youtube(format!("Invalid {} response: {}", endpoint, e.without_url()))
            })
    }

    /// Fetch playlist title, description and item count.
    #[instrument(skip(self))]
    pub async fn get_playlist_metadata(&self, playlist_id: &str) -> Result<PlaylistMetadata> {
        let response: ListResponse<PlaylistResource> = self
            .get(
                "playlists",
                &[
                    ("part", "snippet,contentDetails".to_string()),
                    ("id", playlist_id.to_string()),
                ],
            )
            .await?;

        let playlist = response
            .items
            .into_iter()
            .next()
            // YouTube answers an unknown or private playlist with an empty list.
            .ok_or_else(|| StudError::NotFound(format!("Playlist not found: {}", playlist_id)))?;

        Ok(PlaylistMetadata {
            title: playlist.snippet.title,
            description: playlist.snippet.description,
            channel_title: playlist.snippet.channel_title,
            item_count: playlist.content_details.item_count,
        })
    }

    /// Fetch playlist entries, following pagination up to `max_results`.
    #[instrument(skip(self))]
    pub async fn get_playlist_videos(
        &self,
        playlist_id: &str,
        max_results: usize,
    ) -> Result<Vec<PlaylistItem>> {
        let mut items = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut params = vec![
                ("part", "snippet,contentDetails".to_string()),
                ("playlistId", playlist_id.to_string()),
                ("maxResults", max_results.clamp(1, API_PAGE_LIMIT).to_string()),
            ];
            if let Some(token) = &page_token {
                params.push(("pageToken", token.clone()));
            }

            let page: ListResponse<PlaylistItemResource> =
                self.get("playlistItems", &params).await?;

            items.extend(page.items.into_iter().map(|item| PlaylistItem {
                video_id: item.content_details.video_id,
                title: item.snippet.title,
            }));

            page_token = page.next_page_token;
            if page_token.is_none() || items.len() >= max_results {
                break;
            }
        }

        items.truncate(max_results);
        debug!("Fetched {} playlist items", items.len());
        Ok(items)
    }

    /// Fetch duration and publish time for the given videos, keyed by video id.
    #[instrument(skip(self, video_ids), fields(count = video_ids.len()))]
    pub async fn get_video_details(
        &self,
        video_ids: &[String],
    ) -> Result<HashMap<String, VideoDetails>> {
        let mut details = HashMap::with_capacity(video_ids.len());

        for batch in video_ids.chunks(API_PAGE_LIMIT) {
            let response: ListResponse<VideoResource> = self
                .get(
                    "videos",
                    &[
                        ("part", "contentDetails,snippet".to_string()),
                        ("id", batch.join(",")),
                    ],
                )
                .await?;

            for video in response.items {
                let thumbnail_url = ["high", "medium", "default"]
                    .iter()
                    .find_map(|size| video.snippet.thumbnails.get(*size))
                    .map(|t| t.url.clone());

                details.insert(
                    video.id,
                    VideoDetails {
                        duration_seconds: parse_duration(&video.content_details.duration),
                        published_at: video.snippet.published_at,
                        thumbnail_url,
                    },
                );
            }
        }

        Ok(details)
    }
}
