//! Publishing metadata generator.
//!
//! Stateless collaborator consumed once per job during finalization: derives
//! SEO keywords, hashtags, a title, and per-platform descriptions from the
//! generation prompt. No orchestration of its own.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Maximum title length in characters.
const MAX_TITLE_CHARS: usize = 60;

/// How many keywords to extract from the prompt.
const MAX_KEYWORDS: usize = 8;

/// How many hashtags to derive from the keywords.
const MAX_HASHTAGS: usize = 5;

/// Words carrying no SEO signal, skipped during extraction.
const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "in",
    "into", "is", "it", "of", "on", "or", "over", "the", "to", "with",
];

/// Publishing destinations the product knows how to describe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Youtube,
    Tiktok,
    Instagram,
}

impl Platform {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Youtube => "youtube",
            Self::Tiktok => "tiktok",
            Self::Instagram => "instagram",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "youtube" => Some(Self::Youtube),
            "tiktok" => Some(Self::Tiktok),
            "instagram" => Some(Self::Instagram),
            _ => None,
        }
    }

    /// Platform description length cap in characters.
    fn description_limit(self) -> usize {
        match self {
            Self::Youtube => 160,
            Self::Tiktok => 150,
            Self::Instagram => 125,
        }
    }
}

/// Generated publishing metadata for one job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishMetadata {
    pub title: String,
    pub keywords: Vec<String>,
    pub hashtags: Vec<String>,
    pub descriptions: BTreeMap<Platform, String>,
}

/// Derive publishing metadata from a prompt for the requested platforms.
///
/// Deterministic: the same prompt always yields the same metadata.
pub fn generate_metadata(prompt: &str, platforms: &[Platform]) -> PublishMetadata {
    let keywords = extract_keywords(prompt);
    let hashtags = keywords
        .iter()
        .take(MAX_HASHTAGS)
        .map(|k| format!("#{k}"))
        .collect();
    let title = make_title(prompt);

    let descriptions = platforms
        .iter()
        .map(|p| (*p, make_description(*p, &title, &keywords)))
        .collect();

    PublishMetadata {
        title,
        keywords,
        hashtags,
        descriptions,
    }
}

/// Significant lowercase words from the prompt, in order of appearance.
fn extract_keywords(prompt: &str) -> Vec<String> {
    let mut seen = Vec::new();
    for word in prompt
        .split(|c: char| !c.is_alphanumeric())
        .map(|w| w.to_lowercase())
    {
        if word.len() < 3 || STOPWORDS.contains(&word.as_str()) || seen.contains(&word) {
            continue;
        }
        seen.push(word);
        if seen.len() == MAX_KEYWORDS {
            break;
        }
    }
    seen
}

/// Prompt trimmed, first letter capitalized, cut at a word boundary.
fn make_title(prompt: &str) -> String {
    let trimmed = prompt.trim();
    let mut title = String::with_capacity(trimmed.len().min(MAX_TITLE_CHARS));
    for word in trimmed.split_whitespace() {
        let next_len = if title.is_empty() {
            word.chars().count()
        } else {
            title.chars().count() + 1 + word.chars().count()
        };
        if next_len > MAX_TITLE_CHARS {
            break;
        }
        if !title.is_empty() {
            title.push(' ');
        }
        title.push_str(word);
    }
    let mut chars = title.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => title,
    }
}

fn make_description(platform: Platform, title: &str, keywords: &[String]) -> String {
    let tail = keywords
        .iter()
        .take(3)
        .cloned()
        .collect::<Vec<_>>()
        .join(", ");
    let full = if tail.is_empty() {
        title.to_string()
    } else {
        format!("{title} - {tail}.")
    };
    truncate_chars(&full, platform.description_limit())
}

fn truncate_chars(s: &str, limit: usize) -> String {
    s.chars().take(limit).collect()
}
