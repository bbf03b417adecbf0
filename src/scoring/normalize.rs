use chrono::{DateTime, Duration, Utc};

use super::types::{RawVideo, ScoringError, VideoMetric};

/// Validates raw counts and turns them into a [`VideoMetric`] observed at `now`.
///
/// A publish time up to `clock_skew` ahead of `now` is accepted and treated as
/// brand new; anything further in the future is rejected.
///
/// # Errors
/// Returns [`ScoringError`] for an empty id, negative counts or a publish time
/// beyond the skew tolerance.
pub fn normalize(
    raw: &RawVideo,
    now: DateTime<Utc>,
    clock_skew: Duration,
) -> Result<VideoMetric, ScoringError> {
    if raw.id.trim().is_empty() {
        return Err(ScoringError::MissingVideoId);
    }

    let view_count = non_negative("view_count", raw.view_count)?;
    let like_count = non_negative("like_count", raw.like_count)?;
    let comment_count = non_negative("comment_count", raw.comment_count)?;

    let latest_accepted = now
        .checked_add_signed(clock_skew)
        .unwrap_or(DateTime::<Utc>::MAX_UTC);
    if raw.published_at > latest_accepted {
        return Err(ScoringError::PublishedInFuture {
            published_at: raw.published_at,
            now,
        });
    }

    Ok(VideoMetric::new(
        raw.id.clone(),
        view_count,
        like_count,
        comment_count,
        raw.published_at,
        now,
    ))
}

fn non_negative(field: &'static str, value: i64) -> Result<u64, ScoringError> {
    u64::try_from(value).map_err(|_| ScoringError::NegativeCount { field, value })
}
