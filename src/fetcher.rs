use std::collections::HashSet;
use std::sync::OnceLock;
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{info, warn};
use regex::Regex;

use crate::error::{Error, Result};
use crate::ranking::{RankWeights, Ranking, rank};
use crate::video::VideoRecord;
use crate::youtube::{Page, RawEntry, YouTube};

/// Safety cap on pagination; upstream cursors have been observed to loop.
const MAX_PAGES: usize = 100;

/// Backoff before the single retry of a transient page failure.
const RETRY_BACKOFF: Duration = Duration::from_secs(2);

/// How a channel's videos are enumerated.
///
/// The search listing is empirically incomplete for full enumeration; the
/// uploads playlist derived from the channel id pages through everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Standard per-channel search listing
    Search,
    /// Uploads playlist derived from the channel id
    Uploads,
    /// Explicit playlist id or URL
    Playlist,
}

/// One fetch job: what to enumerate and how.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub target: String,
    pub strategy: Strategy,
}

static CHANNEL_ID_RE: OnceLock<Regex> = OnceLock::new();
static PLAYLIST_ID_RE: OnceLock<Regex> = OnceLock::new();
static LIST_PARAM_RE: OnceLock<Regex> = OnceLock::new();

fn channel_id_re() -> &'static Regex {
    CHANNEL_ID_RE.get_or_init(|| Regex::new(r"^U[A-Za-z0-9_-]+$").unwrap())
}

fn playlist_id_re() -> &'static Regex {
    PLAYLIST_ID_RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9_-]{2,}$").unwrap())
}

fn list_param_re() -> &'static Regex {
    LIST_PARAM_RE.get_or_init(|| Regex::new(r"[?&]list=([A-Za-z0-9_-]+)").unwrap())
}

fn validate_channel_id(channel_id: &str) -> Result<()> {
    if !channel_id_re().is_match(channel_id) {
        return Err(Error::InvalidIdentifier(format!(
            "not a channel id: {:?}",
            channel_id
        )));
    }
    Ok(())
}

/// Derive the uploads playlist id from a channel id by replacing the second
/// character with `U` (e.g. UCabc123 -> UUabc123). The uploads playlist is
/// the documented workaround for the search listing's incompleteness: it
/// enumerates every upload through ordinary playlist pagination.
pub fn uploads_playlist_id(channel_id: &str) -> Result<String> {
    validate_channel_id(channel_id)?;
    // Channel ids are ASCII, so byte slicing is safe.
    Ok(format!("{}U{}", &channel_id[..1], &channel_id[2..]))
}

/// Resolve a playlist target: either a bare playlist id, or a URL of the
/// form .../playlist?list=<id> from which the id is extracted.
pub fn playlist_id_from_target(target: &str) -> Result<String> {
    if target.contains("://") || target.contains("youtube.com") {
        if let Some(caps) = list_param_re().captures(target) {
            return Ok(caps[1].to_string());
        }
        return Err(Error::InvalidIdentifier(format!(
            "no list parameter in playlist URL: {:?}",
            target
        )));
    }

    if playlist_id_re().is_match(target) {
        return Ok(target.to_string());
    }

    Err(Error::InvalidIdentifier(format!(
        "not a playlist id or URL: {:?}",
        target
    )))
}

/// First-occurrence filter over video ids. Pagination can repeat entries
/// across pages under retry, and a combined search + uploads fetch sees the
/// same video from both sources; this is the single place uniqueness is
/// enforced.
#[derive(Debug, Default)]
pub struct Deduplicator {
    seen: HashSet<String>,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// True the first time an id is seen, false for every repeat.
    pub fn admit(&mut self, id: &str) -> bool {
        if self.seen.contains(id) {
            false
        } else {
            self.seen.insert(id.to_string());
            true
        }
    }

    pub fn seen_count(&self) -> usize {
        self.seen.len()
    }
}

/// A cursor-addressable upstream listing. The paginator only needs this one
/// operation, which keeps it testable without a network.
trait PageSource {
    async fn fetch_page(&mut self, cursor: Option<&str>) -> Result<Page>;
}

struct SearchSource<'a> {
    api: &'a YouTube,
    channel_id: String,
}

impl PageSource for SearchSource<'_> {
    async fn fetch_page(&mut self, cursor: Option<&str>) -> Result<Page> {
        self.api.search_page(&self.channel_id, cursor).await
    }
}

struct PlaylistSource<'a> {
    api: &'a YouTube,
    playlist_id: String,
}

impl PageSource for PlaylistSource<'_> {
    async fn fetch_page(&mut self, cursor: Option<&str>) -> Result<Page> {
        self.api.playlist_page(&self.playlist_id, cursor).await
    }
}

fn into_record(entry: RawEntry) -> VideoRecord {
    let url = VideoRecord::watch_url(&entry.id);
    VideoRecord {
        id: entry.id,
        title: entry.title,
        published_at: entry.published_at,
        view_count: entry.view_count.unwrap_or_else(|| "0".to_string()),
        like_count: entry.like_count.unwrap_or_else(|| "0".to_string()),
        url,
        score: None,
    }
}

/// Drive a page source to exhaustion, folding entries through the
/// deduplicator in upstream order. A transient failure is retried once on
/// the same cursor after a fixed backoff; a second consecutive failure
/// aborts with `Error::Fetch` carrying everything accumulated so far.
async fn drain<S: PageSource>(source: &mut S, dedup: &mut Deduplicator) -> Result<Vec<VideoRecord>> {
    let mut videos = Vec::new();
    let mut cursor: Option<String> = None;
    let mut pages = 0usize;

    loop {
        pages += 1;
        if pages > MAX_PAGES {
            warn!("reached page cap ({MAX_PAGES}); result may be incomplete");
            break;
        }

        let page = match source.fetch_page(cursor.as_deref()).await {
            Ok(page) => page,
            Err(e) if e.is_transient() => {
                warn!("page fetch failed, retrying once: {e}");
                tokio::time::sleep(RETRY_BACKOFF).await;
                match source.fetch_page(cursor.as_deref()).await {
                    Ok(page) => page,
                    // Quota failures keep their own kind so the caller can
                    // show an actionable message.
                    Err(retry_err @ Error::Quota(_)) => return Err(retry_err),
                    Err(retry_err) => {
                        return Err(Error::Fetch {
                            reason: retry_err.to_string(),
                            partial: videos,
                        });
                    }
                }
            }
            Err(e) => return Err(e),
        };

        for entry in page.entries {
            if dedup.admit(&entry.id) {
                videos.push(into_record(entry));
            }
        }

        cursor = page.next_cursor;
        if cursor.is_none() {
            break;
        }
    }

    Ok(videos)
}

/// Fetch the complete, deduplicated video set for a request.
pub async fn fetch(api: &YouTube, request: &FetchRequest) -> Result<Vec<VideoRecord>> {
    let mut dedup = Deduplicator::new();
    fetch_with(api, request, &mut dedup).await
}

/// Like [`fetch`], but folding into a caller-supplied deduplicator so two
/// strategies can be combined without duplicates.
pub async fn fetch_with(
    api: &YouTube,
    request: &FetchRequest,
    dedup: &mut Deduplicator,
) -> Result<Vec<VideoRecord>> {
    match request.strategy {
        Strategy::Search => {
            validate_channel_id(&request.target)?;
            info!("fetching channel {} via search listing", request.target);
            let mut source = SearchSource {
                api,
                channel_id: request.target.clone(),
            };
            drain(&mut source, dedup).await
        }
        Strategy::Uploads => {
            let playlist_id = uploads_playlist_id(&request.target)?;
            info!(
                "fetching channel {} via uploads playlist {}",
                request.target, playlist_id
            );
            let mut source = PlaylistSource { api, playlist_id };
            drain(&mut source, dedup).await
        }
        Strategy::Playlist => {
            let playlist_id = playlist_id_from_target(&request.target)?;
            info!("fetching playlist {}", playlist_id);
            let mut source = PlaylistSource { api, playlist_id };
            drain(&mut source, dedup).await
        }
    }
}

/// Caller-facing entry point: fetch, then rank. When `accept_partial` is
/// set, a mid-fetch abort downgrades to a warning and the recovered videos
/// are ranked instead.
pub async fn fetch_and_rank(
    api: &YouTube,
    request: &FetchRequest,
    weights: &RankWeights,
    as_of: DateTime<Utc>,
    accept_partial: bool,
) -> Result<Ranking> {
    let videos = match fetch(api, request).await {
        Ok(videos) => videos,
        Err(Error::Fetch { reason, partial }) if accept_partial => {
            warn!(
                "fetch incomplete ({reason}); ranking {} recovered videos",
                partial.len()
            );
            partial
        }
        Err(e) => return Err(e),
    };

    info!(
        "fetched {} videos in {} API call(s)",
        videos.len(),
        api.call_count()
    );

    Ok(rank(videos, as_of, weights))
}
