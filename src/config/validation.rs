//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check the separator cannot collide with pattern syntax
//! - Check every static route compiles
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is a pure function: AppConfig → Result<(), Vec<ValidationError>>

use std::collections::HashSet;

use thiserror::Error;

use crate::config::schema::AppConfig;
use crate::routing::matcher::CompiledSegment;
use crate::routing::path::path_to_tokens;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("separator `{0}` must not be alphanumeric, whitespace or pattern syntax")]
    InvalidSeparator(char),

    #[error("unknown log level `{0}`")]
    InvalidLogLevel(String),

    #[error("route #{0} has an empty name")]
    EmptyRouteName(usize),

    #[error("duplicate route name `{0}`")]
    DuplicateRouteName(String),

    #[error("route `{name}`: {reason}")]
    InvalidPattern { name: String, reason: String },
}

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Validate a parsed configuration.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let sep = config.router.separator;
    let separator_ok = config.router.validate().is_ok();
    if !separator_ok {
        errors.push(ValidationError::InvalidSeparator(sep));
    }

    let level = config.observability.log_level.to_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ValidationError::InvalidLogLevel(
            config.observability.log_level.clone(),
        ));
    }

    let mut names = HashSet::new();
    for (i, route) in config.routes.iter().enumerate() {
        if route.name.trim().is_empty() {
            errors.push(ValidationError::EmptyRouteName(i));
        } else if !names.insert(route.name.as_str()) {
            errors.push(ValidationError::DuplicateRouteName(route.name.clone()));
        }

        // Pattern checks are meaningless with a broken separator
        if separator_ok {
            if let Err(reason) = check_pattern(&route.pattern, sep) {
                errors.push(ValidationError::InvalidPattern {
                    name: route.name.clone(),
                    reason,
                });
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_pattern(pattern: &str, separator: char) -> Result<(), String> {
    let tokens = path_to_tokens(pattern, separator).map_err(|e| e.to_string())?;
    let last = tokens.len() - 1;
    for (i, token) in tokens.iter().enumerate() {
        // A trailing `*` goes to the catch-all slot and is never compiled
        if i == last && token == "*" {
            continue;
        }
        CompiledSegment::compile(token).map_err(|e| e.to_string())?;
    }
    Ok(())
}
