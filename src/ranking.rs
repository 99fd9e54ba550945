use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use log::warn;

use crate::error::{Error, Result};
use crate::video::VideoRecord;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Weights for the composite score. The decay is expressed as a half-life:
/// a video's score halves every `half_life_days`.
#[derive(Debug, Clone, Copy)]
pub struct RankWeights {
    pub like_weight: f64,
    pub view_weight: f64,
    pub half_life_days: f64,
}

impl Default for RankWeights {
    fn default() -> Self {
        Self {
            like_weight: 1.0,
            view_weight: 0.1,
            half_life_days: 90.0,
        }
    }
}

impl RankWeights {
    pub fn validate(&self) -> Result<()> {
        if !self.half_life_days.is_finite() || self.half_life_days <= 0.0 {
            return Err(Error::Config(format!(
                "half-life must be a positive number of days, got {}",
                self.half_life_days
            )));
        }
        if !self.like_weight.is_finite()
            || self.like_weight < 0.0
            || !self.view_weight.is_finite()
            || self.view_weight < 0.0
        {
            return Err(Error::Config(
                "like/view weights must be non-negative numbers".to_string(),
            ));
        }
        Ok(())
    }
}

/// A video excluded from ranking because its statistics were unusable.
#[derive(Debug, Clone)]
pub struct RejectedVideo {
    pub id: String,
    pub title: String,
    pub reason: String,
}

/// Ranked videos (score descending) plus the records that were skipped.
#[derive(Debug)]
pub struct Ranking {
    pub videos: Vec<VideoRecord>,
    pub rejected: Vec<RejectedVideo>,
}

/// Score every video and return a total ordering: score descending, ties
/// broken by newer `published_at`, then by id ascending. Records whose
/// counts do not parse as non-negative integers are moved to `rejected`
/// instead of aborting the pass. Pure: same inputs, same output.
pub fn rank(videos: Vec<VideoRecord>, as_of: DateTime<Utc>, weights: &RankWeights) -> Ranking {
    let mut ranked = Vec::with_capacity(videos.len());
    let mut rejected = Vec::new();

    for mut video in videos {
        let views = match parse_count("view_count", &video.view_count) {
            Ok(n) => n,
            Err(reason) => {
                warn!("skipping {}: {}", video.id, reason);
                rejected.push(RejectedVideo {
                    id: video.id,
                    title: video.title,
                    reason,
                });
                continue;
            }
        };
        let likes = match parse_count("like_count", &video.like_count) {
            Ok(n) => n,
            Err(reason) => {
                warn!("skipping {}: {}", video.id, reason);
                rejected.push(RejectedVideo {
                    id: video.id,
                    title: video.title,
                    reason,
                });
                continue;
            }
        };

        video.score = Some(score(likes, views, age_days(as_of, video.published_at), weights));
        ranked.push(video);
    }

    ranked.sort_by(compare);
    Ranking { videos: ranked, rejected }
}

fn age_days(as_of: DateTime<Utc>, published_at: DateTime<Utc>) -> f64 {
    (as_of - published_at).num_seconds().max(0) as f64 / SECONDS_PER_DAY
}

/// Popularity is combined linearly, then decayed multiplicatively, so a
/// recent, moderately popular video can outrank an old blockbuster. The
/// decay factor is 1 at age 0 and strictly decreasing, never reaching 0.
fn score(likes: u64, views: u64, age_days: f64, weights: &RankWeights) -> f64 {
    let popularity = likes as f64 * weights.like_weight + views as f64 * weights.view_weight;
    let decay = 0.5_f64.powf(age_days / weights.half_life_days);
    popularity * decay
}

fn parse_count(field: &str, raw: &str) -> std::result::Result<u64, String> {
    match raw.trim().parse::<i64>() {
        Ok(n) if n >= 0 => Ok(n as u64),
        Ok(n) => Err(format!("{field} is negative: {n}")),
        Err(_) => Err(format!("{field} {raw:?} is not a non-negative integer")),
    }
}

fn compare(a: &VideoRecord, b: &VideoRecord) -> Ordering {
    b.score
        .partial_cmp(&a.score)
        .unwrap_or(Ordering::Equal)
        .then_with(|| b.published_at.cmp(&a.published_at))
        .then_with(|| a.id.cmp(&b.id))
}

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;

    use super::*;

    fn as_of() -> DateTime<Utc> {
        "2026-08-01T00:00:00Z".parse().unwrap()
    }

    fn video(id: &str, likes: &str, views: &str, age_days: i64) -> VideoRecord {
        VideoRecord {
            id: id.to_string(),
            title: format!("video {id}"),
            published_at: as_of() - TimeDelta::days(age_days),
            view_count: views.to_string(),
            like_count: likes.to_string(),
            url: VideoRecord::watch_url(id),
            score: None,
        }
    }

    #[test]
    fn ranking_is_deterministic() {
        let weights = RankWeights::default();
        let input = vec![
            video("a", "10", "1000", 5),
            video("b", "200", "9000", 40),
            video("c", "0", "50", 300),
        ];

        let first = rank(input.clone(), as_of(), &weights);
        let second = rank(input, as_of(), &weights);

        let order = |r: &Ranking| -> Vec<(String, Option<f64>)> {
            r.videos.iter().map(|v| (v.id.clone(), v.score)).collect()
        };
        assert_eq!(order(&first), order(&second));
    }

    #[test]
    fn aging_never_increases_the_score() {
        let weights = RankWeights::default();
        let mut previous = f64::INFINITY;
        for age in [0, 1, 7, 30, 90, 365, 3650] {
            let ranking = rank(vec![video("a", "100", "10000", age)], as_of(), &weights);
            let score = ranking.videos[0].score.unwrap();
            assert!(
                score < previous,
                "score at age {age} ({score}) should be below {previous}"
            );
            previous = score;
        }
    }

    #[test]
    fn decay_is_one_at_age_zero() {
        let weights = RankWeights {
            like_weight: 1.0,
            view_weight: 0.1,
            half_life_days: 90.0,
        };
        let ranking = rank(vec![video("a", "100", "1000", 0)], as_of(), &weights);
        // popularity = 100 * 1.0 + 1000 * 0.1, undecayed
        assert_eq!(ranking.videos[0].score, Some(200.0));
    }

    #[test]
    fn ties_break_by_recency_then_id() {
        let weights = RankWeights::default();
        // Zero popularity everywhere: all scores are exactly 0.0.
        let input = vec![
            video("b", "0", "0", 10),
            video("c", "0", "0", 2),
            video("a", "0", "0", 2),
        ];

        let ranking = rank(input, as_of(), &weights);
        let ids: Vec<&str> = ranking.videos.iter().map(|v| v.id.as_str()).collect();
        // The two 2-day-old videos come first (newer), ordered a before b by id.
        assert_eq!(ids, vec!["a", "c", "b"]);
    }

    #[test]
    fn recent_video_outranks_old_blockbuster() {
        let weights = RankWeights {
            like_weight: 1.0,
            view_weight: 0.01,
            half_life_days: 90.0,
        };
        let input = vec![
            video("old_hit", "10", "100000", 365),
            video("fresh", "100", "10000", 1),
            video("middle", "50", "5000", 30),
        ];

        let ranking = rank(input, as_of(), &weights);
        let ids: Vec<&str> = ranking.videos.iter().map(|v| v.id.as_str()).collect();
        assert_eq!(ids[0], "fresh");
        assert_eq!(ids, vec!["fresh", "middle", "old_hit"]);
    }

    #[test]
    fn malformed_counts_are_reported_not_fatal() {
        let weights = RankWeights::default();
        let mut bad = video("bad", "0", "1000", 5);
        bad.like_count = "hidden".to_string();
        let input = vec![video("a", "10", "1000", 5), bad, video("b", "5", "500", 5)];

        let ranking = rank(input, as_of(), &weights);

        let ids: Vec<&str> = ranking.videos.iter().map(|v| v.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(ranking.rejected.len(), 1);
        assert_eq!(ranking.rejected[0].id, "bad");
        assert!(ranking.rejected[0].reason.contains("like_count"));
    }

    #[test]
    fn negative_counts_are_rejected() {
        let weights = RankWeights::default();
        let mut bad = video("bad", "10", "1000", 5);
        bad.view_count = "-3".to_string();

        let ranking = rank(vec![bad], as_of(), &weights);
        assert!(ranking.videos.is_empty());
        assert_eq!(ranking.rejected.len(), 1);
        assert!(ranking.rejected[0].reason.contains("negative"));
    }

    #[test]
    fn zeroed_likes_rank_on_views_alone() {
        let weights = RankWeights::default();
        let ranking = rank(vec![video("a", "0", "1000", 0)], as_of(), &weights);
        assert_eq!(ranking.videos[0].score, Some(100.0));
        assert!(ranking.rejected.is_empty());
    }

    #[test]
    fn weight_validation_rejects_nonsense() {
        let mut weights = RankWeights::default();
        weights.half_life_days = 0.0;
        assert!(weights.validate().is_err());

        let mut weights = RankWeights::default();
        weights.like_weight = -1.0;
        assert!(weights.validate().is_err());

        assert!(RankWeights::default().validate().is_ok());
    }
}
