//! Deterministic stand-in for the YouTube API, used when no API key is set.
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use super::{SearchQuery, SourceError, VideoSource};
use crate::clients::youtube::video_url;
use crate::scoring::RawVideo;

const TITLE_TEMPLATES: [&str; 8] = [
    "{term} just changed everything: full breakdown",
    "I tested {term} for 30 days. Here is what happened",
    "Is {term} the AI breakthrough we were promised?",
    "{term} tutorial for beginners (2025)",
    "SHOCKING {term} demo nobody is talking about",
    "Why researchers are worried about {term}",
    "{term} vs GPT-4: honest comparison",
    "Top 10 {term} tools you need right now",
];

const CHANNELS: [&str; 5] = [
    "AI Explained",
    "Two Minute Papers",
    "Machine Learning Street Talk",
    "The AI Daily",
    "Prompt Lab",
];

#[derive(Debug)]
pub struct SyntheticVideoSource {
    rng: Mutex<StdRng>,
}

impl SyntheticVideoSource {
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    fn generate(&self, query: &SearchQuery) -> Vec<RawVideo> {
        let now = Utc::now();
        let window_minutes = (now - query.published_after).num_minutes().max(1);
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);

        (0..query.max_results)
            .map(|_| {
                let template = TITLE_TEMPLATES[rng.random_range(0..TITLE_TEMPLATES.len())];
                let channel = CHANNELS[rng.random_range(0..CHANNELS.len())];
                let id = format!("syn-{:012x}", rng.random::<u64>() & 0xffff_ffff_ffff);
                let published_at = now - Duration::minutes(rng.random_range(1..=window_minutes));
                let duration_seconds = if rng.random_bool(0.3) {
                    rng.random_range(15..60)
                } else {
                    rng.random_range(120..2_400)
                };
                let view_count: i64 = rng.random_range(100..500_000);
                let like_count = view_count * rng.random_range(5..80) / 1_000;
                let comment_count = view_count * rng.random_range(1..15) / 1_000;

                RawVideo {
                    url: video_url(&id, Some(duration_seconds)),
                    title: template.replace("{term}", &query.term),
                    description: format!(
                        "A look at {} and what it means for artificial intelligence. \
                         Links, timestamps and sources below.",
                        query.term
                    ),
                    tags: vec![query.term.to_lowercase(), "ai".to_string()],
                    channel_name: channel.to_string(),
                    published_at,
                    view_count,
                    like_count,
                    comment_count,
                    duration_seconds: Some(duration_seconds),
                    id,
                }
            })
            .collect()
    }
}

#[async_trait]
impl VideoSource for SyntheticVideoSource {
    fn name(&self) -> &'static str {
        "synthetic"
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<RawVideo>, SourceError> {
        let videos = self.generate(query);
        debug!(term = %query.term, count = videos.len(), "generated synthetic videos");
        Ok(videos)
    }
}
