use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Normalized representation of one video.
///
/// `view_count` and `like_count` stay as the decimal strings the Data API
/// returns (statistics fields are JSON strings upstream). The fetcher
/// normalizes absent counts to "0"; the ranking engine parses and validates
/// them, so a malformed value skips one record instead of failing a fetch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoRecord {
    pub id: String,
    pub title: String,
    pub published_at: DateTime<Utc>,
    pub view_count: String,
    pub like_count: String,
    pub url: String,
    /// Populated by the ranking engine; None until then.
    pub score: Option<f64>,
}

impl VideoRecord {
    pub fn watch_url(id: &str) -> String {
        format!("https://www.youtube.com/watch?v={}", id)
    }
}
