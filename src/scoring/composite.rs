//! Weighted composite scoring (0-100 scale).

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use super::keywords::ScoringKeywords;
use super::normalize::normalize;
use super::trend::trend_score;
use super::types::{RawVideo, ScoreResult, ScoredVideo, ScoringError, VideoMetric};

/// `overall_score` above this marks a video as trending.
pub const TRENDING_THRESHOLD: f64 = 60.0;

const VELOCITY_WEIGHT: f64 = 0.30;
const ENGAGEMENT_WEIGHT: f64 = 0.25;
const NOVELTY_WEIGHT: f64 = 0.20;
const TITLE_QUALITY_WEIGHT: f64 = 0.15;
const SEO_WEIGHT: f64 = 0.10;

/// Titles outside 30-70 characters still earn the base length points once
/// they are longer than a single word or acronym. Shorter titles earn none.
const MIN_SCORED_TITLE_LENGTH: usize = 10;

const MAX_SCORE: f64 = 100.0;

/// Scores observations against an injected keyword configuration.
#[derive(Debug, Clone)]
pub struct CompositeScorer {
    keywords: Arc<ScoringKeywords>,
}

impl CompositeScorer {
    #[must_use]
    pub fn new(keywords: Arc<ScoringKeywords>) -> Self {
        Self { keywords }
    }

    #[must_use]
    pub fn keywords(&self) -> &ScoringKeywords {
        &self.keywords
    }

    /// Computes every sub-score and the weighted composite for one snapshot.
    #[must_use]
    pub fn score(
        &self,
        metric: &VideoMetric,
        title: &str,
        description: &str,
        tags: &[String],
    ) -> ScoreResult {
        let velocity = velocity_score(metric);
        let novelty = novelty_score(metric);
        let title_quality = title_quality_score(title, &self.keywords);
        let seo = seo_score(title, description, tags, &self.keywords);
        let overall = overall_score(
            velocity,
            metric.engagement_rate(),
            novelty,
            title_quality,
            seo,
        );

        ScoreResult {
            video_id: metric.video_id().to_string(),
            observed_at: metric.observed_at(),
            velocity_score: velocity,
            novelty_score: novelty,
            title_quality_score: title_quality,
            seo_score: seo,
            engagement_rate: metric.engagement_rate(),
            views_per_minute: metric.views_per_minute(),
            overall_score: overall,
            is_trending: overall > TRENDING_THRESHOLD,
        }
    }

    /// Normalizes, scores and categorizes one raw record observed at `now`.
    ///
    /// # Errors
    /// Propagates the [`ScoringError`] raised by [`normalize`].
    pub fn score_video(
        &self,
        raw: &RawVideo,
        now: DateTime<Utc>,
        clock_skew: Duration,
    ) -> Result<ScoredVideo, ScoringError> {
        let metric = normalize(raw, now, clock_skew)?;
        let score = self.score(&metric, &raw.title, &raw.description, &raw.tags);
        let category = self
            .keywords
            .categorize(&raw.title, &raw.description, &raw.tags)
            .to_string();

        Ok(ScoredVideo {
            trend_score: trend_score(&metric),
            content_type: raw.content_type(),
            video: raw.clone(),
            metric,
            score,
            category,
        })
    }
}

/// Ten points per view-per-minute, capped at 100.
#[must_use]
pub fn velocity_score(metric: &VideoMetric) -> f64 {
    (metric.views_per_minute() * 10.0).clamp(0.0, MAX_SCORE)
}

/// Loses one point per hour of age and bottoms out at zero.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn novelty_score(metric: &VideoMetric) -> f64 {
    (MAX_SCORE - metric.age_minutes() as f64 / 60.0).max(0.0)
}

/// Additive title heuristic.
///
/// | signal                                  | points |
/// |-----------------------------------------|--------|
/// | length 40-60 (else 30-70, else >= 10)   | 30/20/10 |
/// | emotional trigger word                  | 25     |
/// | contains a digit                        | 20     |
/// | one or two ALL-CAPS words               | 15     |
/// | contains `?`                            | 10     |
#[must_use]
pub fn title_quality_score(title: &str, keywords: &ScoringKeywords) -> f64 {
    let length = title.chars().count();
    let mut score: f64 = if (40..=60).contains(&length) {
        30.0
    } else if (30..=70).contains(&length) {
        20.0
    } else if length >= MIN_SCORED_TITLE_LENGTH {
        10.0
    } else {
        0.0
    };

    if keywords.emotional_triggers().matches(title) {
        score += 25.0;
    }
    if title.chars().any(|c| c.is_ascii_digit()) {
        score += 20.0;
    }
    if (1..=2).contains(&count_all_caps_words(title)) {
        score += 15.0;
    }
    if title.contains('?') {
        score += 10.0;
    }

    score.min(MAX_SCORE)
}

/// Keyword and metadata completeness heuristic.
#[must_use]
pub fn seo_score(
    title: &str,
    description: &str,
    tags: &[String],
    keywords: &ScoringKeywords,
) -> f64 {
    let mut score: f64 = 0.0;

    if keywords.ai_keywords().matches(title) {
        score += 30.0;
    }

    let description_length = description.chars().count();
    if description_length > 100 {
        score += 20.0;
    }
    if description_length > 200 {
        score += 10.0;
    }

    if keywords.ai_keywords().matches(description) {
        score += 20.0;
    }
    if tags.iter().any(|tag| !tag.trim().is_empty()) {
        score += 20.0;
    }

    score.min(MAX_SCORE)
}

/// Weighted blend of the sub-scores. The engagement rate enters raw, so the
/// result is clamped to keep it on the 0-100 scale.
#[must_use]
pub fn overall_score(
    velocity: f64,
    engagement_rate: f64,
    novelty: f64,
    title_quality: f64,
    seo: f64,
) -> f64 {
    let blended = VELOCITY_WEIGHT * velocity
        + ENGAGEMENT_WEIGHT * engagement_rate
        + NOVELTY_WEIGHT * novelty
        + TITLE_QUALITY_WEIGHT * title_quality
        + SEO_WEIGHT * seo;
    blended.clamp(0.0, MAX_SCORE)
}

/// Words of at least two letters whose letters are all uppercase, so "AI"
/// and "GPT-5" count but "I" and "Ok" do not.
fn count_all_caps_words(title: &str) -> usize {
    title
        .split_whitespace()
        .filter(|word| {
            let letters: Vec<char> = word.chars().filter(|c| c.is_alphabetic()).collect();
            letters.len() >= 2 && letters.iter().all(|c| c.is_uppercase())
        })
        .count()
}
