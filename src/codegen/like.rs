//! LIKE pattern compilation.
//!
//! Patterns without wildcards compile to plain string operations; only the
//! general case pays for a regex.

use regex::Regex;

use crate::error::{RapidsError, Result};

/// A compiled LIKE pattern.
#[derive(Debug, Clone)]
pub enum LikePattern {
    /// No wildcards: exact equality
    Literal(String),
    /// `pat%`
    Prefix(String),
    /// `%pat`
    Suffix(String),
    /// `%pat%`
    Contains(String),
    /// Anything else: anchored regex with `%` -> `.*` and `_` -> `.`
    Pattern(Regex),
}

impl LikePattern {
    /// Compile a SQL LIKE pattern.
    pub fn compile(pattern: &str) -> Result<LikePattern> {
        if !pattern.contains(['%', '_']) {
            return Ok(LikePattern::Literal(pattern.to_string()));
        }

        let percent_only = !pattern.contains('_');
        if percent_only {
            let inner = pattern.trim_matches('%');
            if !inner.contains('%') {
                let leading = pattern.starts_with('%');
                let trailing = pattern.ends_with('%');
                return Ok(match (leading, trailing) {
                    (true, true) => LikePattern::Contains(inner.to_string()),
                    (false, true) => LikePattern::Prefix(inner.to_string()),
                    (true, false) => LikePattern::Suffix(inner.to_string()),
                    (false, false) => LikePattern::Literal(inner.to_string()),
                });
            }
        }

        let mut regex = String::with_capacity(pattern.len() + 2);
        regex.push('^');
        for c in pattern.chars() {
            match c {
                '%' => regex.push_str(".*"),
                '_' => regex.push('.'),
                other => regex.push_str(&regex::escape(&other.to_string())),
            }
        }
        regex.push('$');

        Regex::new(&regex)
            .map(LikePattern::Pattern)
            .map_err(|e| RapidsError::internal(format!("bad LIKE pattern '{}': {}", pattern, e)))
    }

    /// Test a string against the pattern.
    pub fn matches(&self, text: &str) -> bool {
        match self {
            LikePattern::Literal(p) => text == p,
            LikePattern::Prefix(p) => text.starts_with(p),
            LikePattern::Suffix(p) => text.ends_with(p),
            LikePattern::Contains(p) => text.contains(p),
            LikePattern::Pattern(regex) => regex.is_match(text),
        }
    }
}
