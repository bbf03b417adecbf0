//! Keyword dictionaries used by the scorer.
use aho_corasick::{AhoCorasick, AhoCorasickBuilder, MatchKind};
use thiserror::Error;

/// Category assigned when no configured category matches.
pub const GENERAL_CATEGORY: &str = "general";

pub const DEFAULT_AI_KEYWORDS: &[&str] = &[
    "ai",
    "artificial intelligence",
    "machine learning",
    "deep learning",
    "neural network",
    "chatgpt",
    "gpt",
    "openai",
    "llm",
    "claude",
    "gemini",
    "copilot",
    "midjourney",
    "stable diffusion",
    "agi",
];

pub const DEFAULT_EMOTIONAL_TRIGGERS: &[&str] = &[
    "amazing",
    "shocking",
    "incredible",
    "insane",
    "unbelievable",
    "secret",
    "revealed",
    "ultimate",
    "best",
    "worst",
    "mind-blowing",
    "crazy",
    "breaking",
    "finally",
    "exposed",
];

const DEFAULT_CATEGORIES: &[(&str, &[&str])] = &[
    (
        "llm",
        &["chatgpt", "gpt", "llm", "claude", "gemini", "language model"],
    ),
    (
        "image_generation",
        &["midjourney", "stable diffusion", "dall-e", "image generation", "sora"],
    ),
    ("robotics", &["robot", "robotics", "humanoid"]),
    ("research", &["paper", "research", "benchmark", "deepmind"]),
    ("tools", &["tutorial", "tool", "workflow", "automation", "copilot"]),
];

#[derive(Debug, Error)]
pub enum KeywordError {
    #[error("failed to compile keyword matcher: {0}")]
    Build(#[from] aho_corasick::BuildError),
}

/// A case-insensitive, whole-word keyword matcher.
#[derive(Debug, Clone)]
pub struct KeywordSet {
    words: Vec<String>,
    matcher: AhoCorasick,
}

impl KeywordSet {
    /// # Errors
    /// Returns [`KeywordError`] when the automaton cannot be built.
    pub fn new<I, S>(words: I) -> Result<Self, KeywordError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let words: Vec<String> = words
            .into_iter()
            .map(|word| word.as_ref().trim().to_lowercase())
            .filter(|word| !word.is_empty())
            .collect();
        let matcher = AhoCorasickBuilder::new()
            .match_kind(MatchKind::Standard)
            .ascii_case_insensitive(true)
            .build(&words)?;
        Ok(Self { words, matcher })
    }

    #[must_use]
    pub fn words(&self) -> &[String] {
        &self.words
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// True when any keyword occurs in `text` on word boundaries, so "ai"
    /// matches "AI news" but not "said".
    #[must_use]
    pub fn matches(&self, text: &str) -> bool {
        if self.words.is_empty() {
            return false;
        }
        self.matcher
            .find_overlapping_iter(text)
            .any(|found| is_word_boundary(text, found.start(), found.end()))
    }
}

fn is_word_boundary(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
}

/// A named keyword category.
#[derive(Debug, Clone)]
pub struct Category {
    pub name: String,
    pub keywords: KeywordSet,
}

/// Keyword configuration injected into the scorer.
#[derive(Debug, Clone)]
pub struct ScoringKeywords {
    ai_keywords: KeywordSet,
    emotional_triggers: KeywordSet,
    categories: Vec<Category>,
}

impl ScoringKeywords {
    #[must_use]
    pub fn new(
        ai_keywords: KeywordSet,
        emotional_triggers: KeywordSet,
        categories: Vec<Category>,
    ) -> Self {
        Self {
            ai_keywords,
            emotional_triggers,
            categories,
        }
    }

    /// Built-in dictionaries, with the AI keyword and trigger lists optionally
    /// replaced.
    ///
    /// # Errors
    /// Returns [`KeywordError`] when a matcher cannot be compiled.
    pub fn with_overrides(
        ai_keywords: Option<&[String]>,
        emotional_triggers: Option<&[String]>,
    ) -> Result<Self, KeywordError> {
        let ai_keywords = match ai_keywords {
            Some(words) => KeywordSet::new(words)?,
            None => KeywordSet::new(DEFAULT_AI_KEYWORDS)?,
        };
        let emotional_triggers = match emotional_triggers {
            Some(words) => KeywordSet::new(words)?,
            None => KeywordSet::new(DEFAULT_EMOTIONAL_TRIGGERS)?,
        };
        let categories = DEFAULT_CATEGORIES
            .iter()
            .map(|(name, words)| {
                Ok(Category {
                    name: (*name).to_string(),
                    keywords: KeywordSet::new(*words)?,
                })
            })
            .collect::<Result<Vec<_>, KeywordError>>()?;

        Ok(Self::new(ai_keywords, emotional_triggers, categories))
    }

    /// # Errors
    /// Returns [`KeywordError`] when a matcher cannot be compiled.
    pub fn builtin() -> Result<Self, KeywordError> {
        Self::with_overrides(None, None)
    }

    #[must_use]
    pub fn ai_keywords(&self) -> &KeywordSet {
        &self.ai_keywords
    }

    #[must_use]
    pub fn emotional_triggers(&self) -> &KeywordSet {
        &self.emotional_triggers
    }

    #[must_use]
    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    /// First category whose keywords occur in the title, tags or description,
    /// checked in that order of precedence per category.
    #[must_use]
    pub fn categorize(&self, title: &str, description: &str, tags: &[String]) -> &str {
        self.categories
            .iter()
            .find(|category| {
                category.keywords.matches(title)
                    || tags.iter().any(|tag| category.keywords.matches(tag))
                    || category.keywords.matches(description)
            })
            .map_or(GENERAL_CATEGORY, |category| category.name.as_str())
    }
}
