//! Transcript Tag Stripping
//!
//! Multi-function speech models annotate their raw output with bracketed
//! tags, e.g. `<|zh|><|NEUTRAL|><|Speech|>欢迎`. Depending on how the text
//! was tokenized the same tags can also come back spaced out, like
//! `< | en | > < | EMO _ UNKNOWN | >`. The full tag grammar is
//! model-dependent, so the pattern list is pluggable rather than fixed.

use anyhow::{Context, Result};
use regex::Regex;

/// Compact tag form: `<|...|>`
const COMPACT_TAG: &str = r"<\|.*?\|>";
/// Spaced/tokenized tag form: `< | ... | >`
const SPACED_TAG: &str = r"< \|.*?\| >";

/// Removes model-emitted tag markers from raw transcripts.
///
/// Best-effort cleanup: the defaults cover the two tag forms observed so
/// far, and callers wrapping a different model can add patterns for its
/// grammar.
#[derive(Debug, Clone)]
pub struct TagStripper {
    patterns: Vec<Regex>,
}

impl TagStripper {
    /// Stripper for the two known tag forms.
    pub fn new() -> Self {
        Self {
            patterns: vec![
                Regex::new(COMPACT_TAG).expect("compact tag pattern"),
                Regex::new(SPACED_TAG).expect("spaced tag pattern"),
            ],
        }
    }

    /// Add a pattern for a tag form the defaults don't cover.
    pub fn add_pattern(&mut self, pattern: &str) -> Result<()> {
        let regex = Regex::new(pattern)
            .with_context(|| format!("invalid tag pattern: {}", pattern))?;
        self.patterns.push(regex);
        Ok(())
    }

    /// Remove every tag match and trim surrounding whitespace.
    ///
    /// Interior whitespace and all non-tag characters are preserved.
    pub fn strip(&self, text: &str) -> String {
        let mut cleaned = text.to_string();
        for pattern in &self.patterns {
            cleaned = pattern.replace_all(&cleaned, "").into_owned();
        }
        cleaned.trim().to_string()
    }
}

impl Default for TagStripper {
    fn default() -> Self {
        Self::new()
    }
}
