use chrono::Utc;

use crate::config::validate_config;
use crate::error::Result;
use crate::fetcher::{self, FetchRequest, Strategy};
use crate::ranking::{RankWeights, Ranking, RejectedVideo};
use crate::video::VideoRecord;
use crate::youtube::YouTube;

pub async fn run(
    playlist: &str,
    weights: &RankWeights,
    limit: usize,
    accept_partial: bool,
    json: bool,
) -> Result<()> {
    validate_config()?;
    weights.validate()?;

    let api = YouTube::new()?;
    eprintln!("Fetching videos from playlist...");

    let request = FetchRequest {
        target: playlist.to_string(),
        strategy: Strategy::Playlist,
    };
    let ranking =
        fetcher::fetch_and_rank(&api, &request, weights, Utc::now(), accept_partial).await?;

    if ranking.videos.is_empty() {
        println!("No videos found in playlist: {}", playlist);
        report_rejected(&ranking.rejected);
        return Ok(());
    }

    if json {
        let top: Vec<&VideoRecord> = ranking.videos.iter().take(limit).collect();
        println!("{}", serde_json::to_string_pretty(&top)?);
        report_rejected(&ranking.rejected);
        return Ok(());
    }

    print_ranking(&ranking, limit);
    Ok(())
}

fn print_ranking(ranking: &Ranking, limit: usize) {
    let total = ranking.videos.len();
    println!("Found {} video(s), showing top {}:\n", total, total.min(limit));

    for (i, video) in ranking.videos.iter().take(limit).enumerate() {
        print_result(i + 1, video);
    }

    report_rejected(&ranking.rejected);
}

fn print_result(index: usize, video: &VideoRecord) {
    let score_str = video
        .score
        .map(|s| format!(" (score {:.2})", s))
        .unwrap_or_default();

    println!("{}. {}{}", index, video.title, score_str);

    if let Ok(views) = video.view_count.parse::<i64>() {
        println!(
            "   {} | {}",
            format_view_count(views),
            video.published_at.format("%Y-%m-%d")
        );
    }

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
