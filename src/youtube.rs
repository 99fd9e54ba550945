use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::debug;
use reqwest::Client;
use serde::Deserialize;

use crate::config::youtube_api_key;
use crate::error::{Error, Result};

const YOUTUBE_BASE_URL: &str = "https://www.googleapis.com/youtube/v3";

/// Listing endpoints return at most 50 items per call.
const PAGE_SIZE: &str = "50";

/// One page of raw upstream entries plus the continuation cursor, if any.
#[derive(Debug, Clone)]
pub struct Page {
    pub entries: Vec<RawEntry>,
    pub next_cursor: Option<String>,
}

/// A raw per-video entry as the upstream returns it. Counts stay as the
/// API's decimal strings; None means the owner withheld the statistic.
#[derive(Debug, Clone)]
pub struct RawEntry {
    pub id: String,
    pub title: String,
    pub published_at: DateTime<Utc>,
    pub view_count: Option<String>,
    pub like_count: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchListResponse {
    next_page_token: Option<String>,
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: SearchItemId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchItemId {
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistItemsResponse {
    next_page_token: Option<String>,
    #[serde(default)]
    items: Vec<PlaylistItem>,
}

#[derive(Debug, Deserialize)]
struct PlaylistItem {
    snippet: PlaylistItemSnippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistItemSnippet {
    resource_id: ResourceId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResourceId {
    video_id: String,
}

#[derive(Debug, Deserialize)]
struct VideoListResponse {
    #[serde(default)]
    items: Vec<VideoItem>,
}

#[derive(Debug, Deserialize)]
struct VideoItem {
    id: String,
    snippet: VideoSnippet,
    statistics: Option<VideoStatistics>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoSnippet {
    title: String,
    published_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoStatistics {
    view_count: Option<String>,
    like_count: Option<String>,
}

/// YouTube Data API v3 client
pub struct YouTube {
    client: Client,
    api_key: String,
    call_count: AtomicU64,
}

impl YouTube {
    pub fn new() -> Result<Self> {
        let api_key = youtube_api_key().ok_or(Error::ApiKeyMissing)?;
        Self::with_api_key(api_key)
    }

    pub fn with_api_key(api_key: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            api_key,
            call_count: AtomicU64::new(0),
        })
    }

    /// Number of API requests issued since this client was created.
    pub fn call_count(&self) -> u64 {
        self.call_count.load(Ordering::Relaxed)
    }

    async fn get<T: for<'de> Deserialize<'de>>(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<T> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        debug!("GET {}/{} {:?}", YOUTUBE_BASE_URL, endpoint, params);

        let response = self
            .client
            .get(format!("{}/{}", YOUTUBE_BASE_URL, endpoint))
            .query(&[("key", self.api_key.as_str())])
            .query(params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_failure(status, &body));
        }

        Ok(response.json().await?)
    }

    /// One page of a channel's video listing via the search endpoint.
    /// Search snippets carry no statistics, so the page is completed with a
    /// batched videos.list call.
    pub async fn search_page(&self, channel_id: &str, cursor: Option<&str>) -> Result<Page> {
        let mut params = vec![
            ("part", "id"),
            ("channelId", channel_id),
            ("type", "video"),
            ("order", "date"),
            ("maxResults", PAGE_SIZE),
        ];
        if let Some(token) = cursor {
            params.push(("pageToken", token));
        }

        let response: SearchListResponse = self.get("search", &params).await?;

        let ids: Vec<String> = response
            .items
            .into_iter()
            .filter_map(|item| item.id.video_id)
            .collect();

        let entries = self.video_details(&ids).await?;

        Ok(Page {
            entries,
            next_cursor: normalize_cursor(response.next_page_token),
        })
    }

    /// One page of a playlist's item listing, completed with video details.
    pub async fn playlist_page(&self, playlist_id: &str, cursor: Option<&str>) -> Result<Page> {
        let mut params = vec![
            ("part", "snippet"),
            ("playlistId", playlist_id),
            ("maxResults", PAGE_SIZE),
        ];
        if let Some(token) = cursor {
            params.push(("pageToken", token));
        }

        let response: PlaylistItemsResponse = self.get("playlistItems", &params).await?;

        let ids: Vec<String> = response
            .items
            .into_iter()
            .map(|item| item.snippet.resource_id.video_id)
            .collect();

        let entries = self.video_details(&ids).await?;

        Ok(Page {
            entries,
            next_cursor: normalize_cursor(response.next_page_token),
        })
    }

    /// Fetch snippet + statistics for up to 50 video ids in one call,
    /// preserving the order of the requested ids. Private or deleted videos
    /// are absent from the response and silently skipped.
    async fn video_details(&self, ids: &[String]) -> Result<Vec<RawEntry>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let joined = ids.join(",");
        let params = [("part", "snippet,statistics"), ("id", joined.as_str())];
        let response: VideoListResponse = self.get("videos", &params).await?;

        let mut by_id: std::collections::HashMap<String, RawEntry> = response
            .items
            .into_iter()
            .map(|item| {
                let (view_count, like_count) = match item.statistics {
                    Some(stats) => (stats.view_count, stats.like_count),
                    None => (None, None),
                };
                (
                    item.id.clone(),
                    RawEntry {
                        id: item.id,
                        title: item.snippet.title,
                        published_at: item.snippet.published_at,
                        view_count,
                        like_count,
                    },
                )
            })
            .collect();

        Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
    }
}

/// Map an upstream failure status to an error kind. Quota and key failures
/// must not be retried; rate limiting and server errors may be, once.
fn classify_failure(status: reqwest::StatusCode, body: &str) -> Error {
    let summary = truncate_body(body);

    if status == reqwest::StatusCode::FORBIDDEN || status == reqwest::StatusCode::UNAUTHORIZED {
        return Error::Quota(format!("{}: {}", status, summary));
    }
    if status == reqwest::StatusCode::BAD_REQUEST && body.contains("API key") {
        return Error::Quota(format!("{}: {}", status, summary));
    }
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        return Error::Transient(format!("{}: {}", status, summary));
    }

    Error::Api(format!("{}: {}", status, summary))
}

fn truncate_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() > 200 {
        let head: String = trimmed.chars().take(200).collect();
        format!("{}...", head)
    } else {
        trimmed.to_string()
    }
}

/// The API signals exhaustion by omitting the token; treat an empty string
/// the same way so the paginator terminates.
fn normalize_cursor(token: Option<String>) -> Option<String> {
    token.filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_playlist_items_response() {
        let json = r#"{
            "nextPageToken": "CDIQAA",
            "items": [
                {"snippet": {"resourceId": {"videoId": "abc123xyz00"}}},
                {"snippet": {"resourceId": {"videoId": "def456uvw11"}}}
            ]
        }"#;

        let response: PlaylistItemsResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.next_page_token.as_deref(), Some("CDIQAA"));
        assert_eq!(response.items.len(), 2);
        assert_eq!(response.items[0].snippet.resource_id.video_id, "abc123xyz00");
    }

    #[test]
    fn parses_video_list_with_hidden_likes() {
        let json = r#"{
            "items": [{
                "id": "abc123xyz00",
                "snippet": {"title": "A video", "publishedAt": "2024-03-01T12:00:00Z"},
                "statistics": {"viewCount": "1234"}
            }]
        }"#;

        let response: VideoListResponse = serde_json::from_str(json).unwrap();
        let stats = response.items[0].statistics.as_ref().unwrap();
        assert_eq!(stats.view_count.as_deref(), Some("1234"));
        assert!(stats.like_count.is_none());
    }

    #[test]
    fn search_items_without_video_id_are_representable() {
        let json = r#"{"items": [{"id": {"kind": "youtube#channel"}}]}"#;
        let response: SearchListResponse = serde_json::from_str(json).unwrap();
        assert!(response.items[0].id.video_id.is_none());
        assert!(response.next_page_token.is_none());
    }

    #[test]
    fn quota_failures_are_final_rate_limits_are_not() {
        let quota = classify_failure(reqwest::StatusCode::FORBIDDEN, "quotaExceeded");
        assert!(matches!(quota, Error::Quota(_)));
        assert!(!quota.is_transient());

        let limited = classify_failure(reqwest::StatusCode::TOO_MANY_REQUESTS, "");
        assert!(limited.is_transient());

        let server = classify_failure(reqwest::StatusCode::BAD_GATEWAY, "upstream");
        assert!(server.is_transient());

        let bad = classify_failure(reqwest::StatusCode::NOT_FOUND, "playlistNotFound");
        assert!(matches!(bad, Error::Api(_)));
    }
}
