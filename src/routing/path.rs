//! Path and topic tokenization.
//!
//! Registered patterns and dispatched topics share the same trimming and
//! splitting rules. Topics are additionally rejected when they carry pattern
//! syntax.

use crate::routing::types::{RouterError, RouterResult};

/// Default hierarchy separator.
pub const DEFAULT_SEPARATOR: char = '.';

/// Characters that only make sense inside registered patterns.
pub const PATTERN_CHARS: [char; 7] = [':', '^', '*', '{', '}', '[', ']'];

/// Whether `separator` can delimit segments without colliding with segment
/// text or pattern syntax.
pub fn is_valid_separator(separator: char) -> bool {
    !(separator.is_alphanumeric()
        || separator.is_whitespace()
        || separator == '_'
        || PATTERN_CHARS.contains(&separator))
}

/// Split a registered pattern into raw segment tokens.
///
/// The separator is trimmed from both ends. Separators inside `{...}` do not
/// split, so regex segments may contain the separator. A separator-only path
/// yields a single root token (the separator itself).
pub fn path_to_tokens(path: &str, separator: char) -> RouterResult<Vec<String>> {
    if path.is_empty() {
        return Err(RouterError::InvalidPath("empty path".into()));
    }

    let trimmed = path.trim_matches(separator);
    if trimmed.is_empty() {
        return Ok(vec![separator.to_string()]);
    }

    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    for c in trimmed.chars() {
        match c {
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            _ => {}
        }
        if c == separator && depth == 0 {
            tokens.push(std::mem::take(&mut current));
        } else {
            current.push(c);
        }
    }
    tokens.push(current);

    if tokens.iter().any(String::is_empty) {
        return Err(RouterError::InvalidPath(format!("empty segment in `{path}`")));
    }
    Ok(tokens)
}

/// Split a concrete topic into tokens, rejecting pattern syntax.
pub fn topic_to_tokens(topic: &str, separator: char) -> RouterResult<Vec<String>> {
    if topic.contains(PATTERN_CHARS) {
        return Err(RouterError::InvalidTopic(topic.to_string()));
    }
    if topic.is_empty() {
        return Err(RouterError::InvalidPath("empty topic".into()));
    }

    let trimmed = topic.trim_matches(separator);
    if trimmed.is_empty() {
        return Ok(vec![separator.to_string()]);
    }

    let tokens: Vec<String> = trimmed.split(separator).map(str::to_string).collect();
    if tokens.iter().any(String::is_empty) {
        return Err(RouterError::InvalidPath(format!("empty segment in `{topic}`")));
    }
    Ok(tokens)
}

/// Join tokens back into their canonical path form.
pub fn tokens_to_path(tokens: &[String], separator: char) -> String {
    tokens.join(&separator.to_string())
}
