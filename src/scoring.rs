//! Video scoring core.
//!
//! Turns raw video observations into derived rates ([`normalize`]), weighted
//! sub-scores and the 0-100 overall score ([`CompositeScorer`]), and the
//! separate 0-1 trend score used by spike detection ([`trend_score`]).
//!
//! Everything in here is pure and deterministic. Keyword lists are injected
//! through [`ScoringKeywords`] instead of living in module constants.

pub mod composite;
pub mod keywords;
pub mod normalize;
pub mod trend;
pub mod types;

pub use composite::{
    CompositeScorer, TRENDING_THRESHOLD, novelty_score, overall_score, seo_score,
    title_quality_score, velocity_score,
};
pub use keywords::{KeywordError, KeywordSet, ScoringKeywords};
pub use normalize::normalize;
pub use trend::{engagement_score, trend_score};
pub use types::{ContentType, RawVideo, ScoreResult, ScoredVideo, ScoringError, VideoMetric};
