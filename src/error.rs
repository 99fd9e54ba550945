use thiserror::Error;

use crate::video::VideoRecord;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("API key not set. Run `yt-rank init` or export YOUTUBE_API_KEY.")]
    ApiKeyMissing,

    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("YouTube API quota or authorization failure: {0}")]
    Quota(String),

    #[error("YouTube API rejected the request: {0}")]
    Api(String),

    #[error("Transient upstream failure: {0}")]
    Transient(String),

    #[error("Fetch aborted after retry: {reason} ({} videos recovered)", .partial.len())]
    Fetch {
        reason: String,
        partial: Vec<VideoRecord>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl Error {
    /// Whether the pagination loop may retry the same cursor once.
    /// Quota, identifier, and API rejections are final.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Transient(_) | Error::Http(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
