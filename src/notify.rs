//! Subscriber alert fanout.

pub mod fanout;
pub mod types;

pub use fanout::{classify_urgency, fanout, is_due};
pub use types::{
    AlertFrequency, ContentTypeFilter, NotificationRecord, PreferenceParseError, ScoreTier,
    SubscriberPreference, Urgency,
};
