//! Filename selectors for provider registrations.

use anyhow::{Context, Result};
use regex::Regex;

use crate::core::DocumentId;

/// Glob pattern matched against the last path segment of a document location
#[derive(Debug, Clone)]
pub struct FileSelector {
    pattern: String,
    regex: Regex,
}

impl FileSelector {
    /// Compile a glob such as `*.hex` or `notes-?.md`.
    ///
    /// `*` matches any run of characters and `?` a single character, neither
    /// crossing a `/`. Matching is case-insensitive.
    pub fn new(pattern: &str) -> Result<Self> {
        let mut source = String::from("(?i)^");
        for ch in pattern.chars() {
            match ch {
                '*' => source.push_str("[^/]*"),
                '?' => source.push_str("[^/]"),
                other => source.push_str(&regex::escape(&other.to_string())),
            }
        }
        source.push('$');

        let regex = Regex::new(&source)
            .with_context(|| format!("invalid file selector '{}'", pattern))?;
        Ok(Self {
            pattern: pattern.to_string(),
            regex,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn matches(&self, id: &DocumentId) -> bool {
        id.file_name()
            .is_some_and(|name| self.regex.is_match(&name))
    }
}
