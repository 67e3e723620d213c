//! Removal of volatile substrings before leaf equality checks.
//!
//! Rendered views embed navigation callbacks and generated temporary file names
//! that differ between two renderings of the same model. They are stripped from
//! both sides before comparing; the diff engines still receive the raw text.

use regex::Regex;
use std::borrow::Cow;
use tracing::warn;
use viewdiff_common::NormalizationConfig;

#[derive(Debug, Clone)]
pub struct ContentNormalizer {
    patterns: Vec<Regex>,
}

impl Default for ContentNormalizer {
    fn default() -> Self {
        Self::from_config(&NormalizationConfig::default())
    }
}

impl ContentNormalizer {
    /// A normalizer that leaves content untouched
    pub fn disabled() -> Self {
        Self { patterns: Vec::new() }
    }

    /// Compile the configured patterns. Invalid expressions are skipped.
    pub fn from_config(config: &NormalizationConfig) -> Self {
        if !config.enabled {
            return Self::disabled();
        }

        let patterns = config
            .patterns
            .iter()
            .filter_map(|pattern| match Regex::new(pattern) {
                Ok(regex) => Some(regex),
                Err(e) => {
                    warn!("Ignoring invalid normalization pattern {:?}: {}", pattern, e);
                    None
                }
            })
            .collect();

        Self { patterns }
    }

    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }

    pub fn normalize<'a>(&self, content: &'a str) -> Cow<'a, str> {
        let mut result = Cow::Borrowed(content);
        for pattern in &self.patterns {
            if pattern.is_match(&result) {
                result = Cow::Owned(pattern.replace_all(&result, "").into_owned());
            }
        }
        result
    }

    /// Equality after normalizing both sides the same way
    pub fn equivalent(&self, old: &str, new: &str) -> bool {
        old == new || self.normalize(old) == self.normalize(new)
    }
}
