#[cfg(test)]
mod tests;

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::Classification;

/// Streaming apps that are never productive
pub const DEFAULT_MEDIA_MARKERS: &[&str] = &["spotify"];

/// Video platforms whose titles decide the classification
pub const DEFAULT_VIDEO_MARKERS: &[&str] = &["youtube"];

/// Whole words that mark a video as educational
pub const DEFAULT_EDUCATIONAL_KEYWORDS: &[&str] = &[
    "class",
    "lecture",
    "unit",
    "chapter",
    "lesson",
    "tutorial",
    "course",
    "study",
    "java",
    "programming",
    "dsa",
    "concepts",
    "python",
    "fundamental",
];

/// User-defined override, matched against `"<process> <title>"` in lowercase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    pub pattern: String,
    pub classification: Classification,
}

/// Rule-based classification that bypasses the predictor for known apps.
///
/// Priority: media markers > video markers (title keywords) > user rules.
pub struct RuleEngine {
    media_markers: Vec<String>,
    video_markers: Vec<String>,
    educational_keywords: HashSet<String>,
    rules: Vec<(Rule, Regex)>,
}

impl RuleEngine {
    /// Create an engine from marker and keyword lists
    #[must_use]
    pub fn new<S: AsRef<str>>(
        media_markers: &[S],
        video_markers: &[S],
        educational_keywords: &[S],
    ) -> Self {
        let lower = |items: &[S]| -> Vec<String> {
            items
                .iter()
                .map(|s| s.as_ref().trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect()
        };

        Self {
            media_markers: lower(media_markers),
            video_markers: lower(video_markers),
            educational_keywords: lower(educational_keywords).into_iter().collect(),
            rules: Vec::new(),
        }
    }

    /// Add a user rule
    ///
    /// # Errors
    ///
    /// Returns an error if the regex pattern compilation fails
    pub fn add_rule(&mut self, rule: Rule) -> Result<(), regex::Error> {
        let regex = Regex::new(&rule.pattern)?;
        self.rules.push((rule, regex));
        Ok(())
    }

    /// Number of user rules loaded
    #[must_use]
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Classify a window, or `None` to defer to the predictor
    #[must_use]
    pub fn classify(&self, process_name: &str, window_title: &str) -> Option<Classification> {
        let title = window_title.to_lowercase();
        let combined = format!("{} {title}", process_name.to_lowercase());

        if self.media_markers.iter().any(|m| combined.contains(m.as_str())) {
            log::debug!("Override: media marker in '{combined}'");
            return Some(Classification::Distracting);
        }

        if self.video_markers.iter().any(|m| combined.contains(m.as_str())) {
            let classification = if self.has_educational_word(&title) {
                Classification::Productive
            } else {
                Classification::Distracting
            };
            log::debug!("Override: video marker in '{combined}' -> {classification}");
            return Some(classification);
        }

        self.rules
            .iter()
            .find(|(_, regex)| regex.is_match(&combined))
            .map(|(rule, _)| {
                log::debug!("Override: user rule '{}' -> {}", rule.pattern, rule.classification);
                rule.classification
            })
    }

    fn has_educational_word(&self, title: &str) -> bool {
        words(title).any(|word| self.educational_keywords.contains(word))
    }
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::new(
            DEFAULT_MEDIA_MARKERS,
            DEFAULT_VIDEO_MARKERS,
            DEFAULT_EDUCATIONAL_KEYWORDS,
        )
    }
}

/// Split a title into whole words.
///
/// Hyphens and apostrophes inside a word keep it together, so "world-class"
/// is a single word and never matches "class".
fn words(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '_' || c == '-' || c == '\''))
        .map(|w| w.trim_matches(|c| c == '-' || c == '\''))
        .filter(|w| !w.is_empty())
}
