//! Matching strategies for triggers.
//!
//! A [`Matcher`] is built once per trigger when the trigger enters the store, so regular
//! expressions are compiled a single time. Matching itself is pure.

use regex::{Regex, RegexBuilder};
use thiserror::Error;

use crate::base::types::{Trigger, TriggerKind};

/// A trigger pattern that could not be evaluated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("trigger `{trigger_id}` has an invalid regex pattern `{pattern}`: {reason}")]
    InvalidRegex { trigger_id: String, pattern: String, reason: String },
}

/// A compiled, ready-to-evaluate pattern.
#[derive(Debug, Clone)]
pub enum Matcher {
    /// Lowercased pattern, compared against the lowercased input.
    Exact(String),
    /// Compiled case-insensitive expression, or the compile error to report.
    ///
    /// The `regex` crate has no lookaround and no backreferences, so patterns such as
    /// `(?=...)` or `(a)\1` fail to compile and never match.
    Regex(Result<Regex, PatternError>),
    /// Lowercased pattern words.
    Fuzzy(Vec<String>),
}

impl Matcher {
    /// Build the matcher for a trigger.
    pub fn for_trigger(trigger: &Trigger) -> Self {
        match trigger.kind {
            TriggerKind::Exact => Matcher::Exact(trigger.pattern.to_lowercase()),
            TriggerKind::Regex => {
                let compiled = RegexBuilder::new(&trigger.pattern).case_insensitive(true).build().map_err(|e| PatternError::InvalidRegex {
                    trigger_id: trigger.id.clone(),
                    pattern: trigger.pattern.clone(),
                    reason: e.to_string(),
                });

                Matcher::Regex(compiled)
            }
            TriggerKind::Fuzzy => Matcher::Fuzzy(words(&trigger.pattern)),
        }
    }

    /// Evaluate the input.
    ///
    /// An invalid regular expression is an error here, and never a panic; callers treat it as
    /// a non-match.
    pub fn matches(&self, input: &str) -> Result<bool, PatternError> {
        match self {
            Matcher::Exact(pattern) => Ok(input.to_lowercase() == *pattern),
            Matcher::Regex(Ok(regex)) => Ok(regex.is_match(input)),
            Matcher::Regex(Err(err)) => Err(err.clone()),
            Matcher::Fuzzy(pattern_words) => Ok(fuzzy_matches(pattern_words, &words(input))),
        }
    }
}

/// Lowercased whitespace-delimited words.
fn words(text: &str) -> Vec<String> {
    text.to_lowercase().split_whitespace().map(str::to_string).collect()
}

/// Every pattern word must be a substring of at least one input word.
fn fuzzy_matches(pattern_words: &[String], input_words: &[String]) -> bool {
    pattern_words.iter().all(|p| input_words.iter().any(|w| w.contains(p.as_str())))
}

// Tests.
