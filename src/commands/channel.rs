use chrono::Utc;

use crate::config::validate_config;
use crate::error::{Error, Result};
use crate::fetcher::{self, Deduplicator, FetchRequest, Strategy};
use crate::ranking::{RankWeights, Ranking, RejectedVideo, rank};
use crate::video::VideoRecord;
use crate::youtube::YouTube;

/// How the channel's videos are enumerated. `Combined` runs the search
/// listing first, then the uploads playlist, through one deduplicator, for
/// channels where the search listing drops videos.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Search,
    Uploads,
    Combined,
}

pub async fn run(
    channel: &str,
    mode: Mode,
    weights: &RankWeights,
    limit: usize,
    accept_partial: bool,
    json: bool,
) -> Result<()> {
    validate_config()?;
    weights.validate()?;

    let api = YouTube::new()?;
    eprintln!("Fetching videos from channel...");

    let ranking = match mode {
        Mode::Search | Mode::Uploads => {
            let strategy = if mode == Mode::Search {
                Strategy::Search
            } else {
                Strategy::Uploads
            };
            let request = FetchRequest {
                target: channel.to_string(),
                strategy,
            };
            fetcher::fetch_and_rank(&api, &request, weights, Utc::now(), accept_partial).await?
        }
        Mode::Combined => {
            let mut dedup = Deduplicator::new();

            let search = FetchRequest {
                target: channel.to_string(),
                strategy: Strategy::Search,
            };
            let mut videos =
                recover(fetcher::fetch_with(&api, &search, &mut dedup).await, accept_partial)?;

            let uploads = FetchRequest {
                target: channel.to_string(),
                strategy: Strategy::Uploads,
            };
            videos.extend(recover(
                fetcher::fetch_with(&api, &uploads, &mut dedup).await,
                accept_partial,
            )?);

            rank(videos, Utc::now(), weights)
        }
    };

    if ranking.videos.is_empty() {
        println!("No videos found for channel: {}", channel);
        report_rejected(&ranking.rejected);
        return Ok(());
    }

    if json {
        print_json(&ranking, limit)?;
    } else {
        print_ranking(&ranking, limit);
    }

    Ok(())
}

/// Downgrade a mid-fetch abort to its recovered prefix when the caller
/// accepts partial results.
fn recover(result: Result<Vec<VideoRecord>>, accept_partial: bool) -> Result<Vec<VideoRecord>> {
    match result {
        Err(Error::Fetch { reason, partial }) if accept_partial => {
            eprintln!(
                "Warning: fetch incomplete ({}); keeping {} video(s) already retrieved",
                reason,
                partial.len()
            );
            Ok(partial)
        }
        other => other,
    }
}

fn print_ranking(ranking: &Ranking, limit: usize) {
    let total = ranking.videos.len();
    println!("Found {} video(s), showing top {}:\n", total, total.min(limit));

    for (i, video) in ranking.videos.iter().take(limit).enumerate() {
        print_video_entry(i + 1, video);
    }

    report_rejected(&ranking.rejected);
}

fn print_json(ranking: &Ranking, limit: usize) -> Result<()> {
    let top: Vec<&VideoRecord> = ranking.videos.iter().take(limit).collect();
    println!("{}", serde_json::to_string_pretty(&top)?);
    report_rejected(&ranking.rejected);
    Ok(())
}

fn print_video_entry(index: usize, video: &VideoRecord) {
    let score_str = video
        .score
        .map(|s| format!(" (score {:.2})", s))
        .unwrap_or_default();

    println!("{}. {}{}", index, video.title, score_str);

    let views = video.view_count.parse::<i64>().unwrap_or(0);
    let likes = video.like_count.parse::<i64>().unwrap_or(0);
    println!(
        "   {} | {} | {}",
        format_view_count(views),
        format_like_count(likes),
        video.published_at.format("%Y-%m-%d")
    );

    // URL for easy copying
    println!("   {}", video.url);
    println!();
}

fn report_rejected(rejected: &[RejectedVideo]) {
    if rejected.is_empty() {
        return;
    }
    eprintln!("Skipped {} video(s) with unusable statistics:", rejected.len());
    for r in rejected {
        eprintln!("  {} ({}): {}", r.title, r.id, r.reason);
    }
}

fn format_view_count(views: i64) -> String {
    if views >= 1_000_000 {
        format!("{:.1}M views", views as f64 / 1_000_000.0)
    } else if views >= 1_000 {
        format!("{:.1}K views", views as f64 / 1_000.0)
    } else {
        format!("{} views", views)
    }
}

fn format_like_count(likes: i64) -> String {
    if likes >= 1_000_000 {
        format!("{:.1}M likes", likes as f64 / 1_000_000.0)
    } else if likes >= 1_000 {
        format!("{:.1}K likes", likes as f64 / 1_000.0)
    } else {
        format!("{} likes", likes)
    }
}
