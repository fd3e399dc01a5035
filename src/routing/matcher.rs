//! Segment matching logic.
//!
//! # Responsibilities
//! - Compile one raw pattern segment into a predicate
//! - Expose capture metadata (positional or regex capture name)
//! - Reject malformed segments at registration time
//!
//! # Segment Syntax (first match wins)
//! ```text
//! {name:regex}   regex capture, full-token match
//! :name          positional capture, matches any token
//! ^prefix        token starts with `prefix`
//! suffix^        token ends with `suffix`
//! *              catch-all
//! a*b            token contains `ab`
//! literal        exact match
//! ```
//!
//! # Design Decisions
//! - Regexes are anchored so `{level:[A-Z]+}` never matches `xERRORx`
//! - Compilation happens once per raw segment per level

use regex::Regex;

use crate::routing::types::{RouterError, RouterResult};

/// The bare catch-all segment.
pub const CATCH_ALL: &str = "*";

/// Trait for matching a topic token against a compiled condition.
pub trait Matcher: Send + Sync + std::fmt::Debug {
    /// Returns true if the token satisfies this condition.
    fn matches(&self, token: &str) -> bool;
}

/// A compiled segment predicate.
#[derive(Debug, Clone)]
pub enum SegmentPattern {
    /// Exact text.
    Literal(String),
    /// `*`: any token.
    CatchAll,
    /// `a*b`: token contains the text with `*` removed.
    Contains(String),
    /// `^text`: token starts with the text.
    Prefix(String),
    /// `text^`: token ends with the text.
    Suffix(String),
    /// `:name`: any token, captured.
    Positional { name: String },
    /// `{name:regex}`: anchored regex, captured.
    Regex { name: String, regex: Regex },
}

impl Matcher for SegmentPattern {
    fn matches(&self, token: &str) -> bool {
        match self {
            SegmentPattern::Literal(text) => token == text,
            SegmentPattern::CatchAll | SegmentPattern::Positional { .. } => true,
            SegmentPattern::Contains(text) => token.contains(text.as_str()),
            SegmentPattern::Prefix(text) => token.starts_with(text.as_str()),
            SegmentPattern::Suffix(text) => token.ends_with(text.as_str()),
            SegmentPattern::Regex { regex, .. } => regex.is_match(token),
        }
    }
}

/// One raw segment together with its compiled predicate.
#[derive(Debug, Clone)]
pub struct CompiledSegment {
    raw: String,
    pattern: SegmentPattern,
}

impl CompiledSegment {
    /// Compile a raw segment.
    pub fn compile(raw: &str) -> RouterResult<Self> {
        let pattern = compile_pattern(raw)?;
        Ok(Self {
            raw: raw.to_string(),
            pattern,
        })
    }

    /// The raw segment text this was compiled from.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn pattern(&self) -> &SegmentPattern {
        &self.pattern
    }

    /// Name the matched token is stored under, if this segment captures.
    pub fn capture_name(&self) -> Option<&str> {
        match &self.pattern {
            SegmentPattern::Positional { name } | SegmentPattern::Regex { name, .. } => {
                Some(name.as_str())
            }
            _ => None,
        }
    }

    pub fn is_capture(&self) -> bool {
        self.capture_name().is_some()
    }

    pub fn is_catch_all(&self) -> bool {
        matches!(self.pattern, SegmentPattern::CatchAll)
    }

    /// Display identity: the capture name, or the raw text with non-word
    /// characters stripped.
    pub fn identity(&self) -> String {
        match self.capture_name() {
            Some(name) => name.to_string(),
            None => self.raw.chars().filter(|c| is_word_char(*c)).collect(),
        }
    }
}

impl Matcher for CompiledSegment {
    fn matches(&self, token: &str) -> bool {
        self.pattern.matches(token)
    }
}

fn compile_pattern(raw: &str) -> RouterResult<SegmentPattern> {
    if raw.is_empty() {
        return Err(RouterError::InvalidPath("empty segment".into()));
    }

    if let Some(body) = raw.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
        let (name, expr) = body
            .split_once(':')
            .ok_or_else(|| RouterError::malformed(raw, "expected {name:regex}"))?;
        validate_capture_name(raw, name)?;
        if expr.is_empty() {
            return Err(RouterError::malformed(raw, "regex required"));
        }
        let regex = Regex::new(&format!("^(?:{expr})$"))
            .map_err(|e| RouterError::malformed(raw, e.to_string()))?;
        return Ok(SegmentPattern::Regex {
            name: name.to_string(),
            regex,
        });
    }

    if let Some(name) = raw.strip_prefix(':') {
        validate_capture_name(raw, name)?;
        return Ok(SegmentPattern::Positional {
            name: name.to_string(),
        });
    }

    let starts = raw.starts_with('^');
    let ends = raw.ends_with('^');
    if starts || ends {
        if raw.len() > 1 && starts && ends {
            return Err(RouterError::malformed(raw, "anchor on both ends"));
        }
        let text = raw.trim_matches('^');
        if text.is_empty() {
            return Err(RouterError::malformed(raw, "anchor requires text"));
        }
        return Ok(if starts {
            SegmentPattern::Prefix(text.to_string())
        } else {
            SegmentPattern::Suffix(text.to_string())
        });
    }

    if raw == CATCH_ALL {
        return Ok(SegmentPattern::CatchAll);
    }

    if raw.contains('*') {
        let text = raw.replace('*', "");
        if text.is_empty() {
            return Err(RouterError::malformed(raw, "wildcard requires text"));
        }
        return Ok(SegmentPattern::Contains(text));
    }

    if raw.contains(['{', '}']) {
        return Err(RouterError::malformed(raw, "unbalanced capture braces"));
    }

    Ok(SegmentPattern::Literal(raw.to_string()))
}

fn validate_capture_name(raw: &str, name: &str) -> RouterResult<()> {
    if name.is_empty() {
        return Err(RouterError::malformed(raw, "capture name required"));
    }
    if !name.chars().all(is_word_char) {
        return Err(RouterError::malformed(raw, "capture name must be a word"));
    }
    Ok(())
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}
