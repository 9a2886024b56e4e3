use thiserror::Error;

use crate::Dimension;

/// Why a pattern-side word was rejected by the tokenizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MalformedPatternReason {
    /// A wildcard character is glued to other characters (`ab_c`, `*x`).
    FusedWildcard,
}

impl std::fmt::Display for MalformedPatternReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MalformedPatternReason::FusedWildcard => f.write_str("wildcard fused with other characters"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphmasterError {
    #[error("Malformed {dimension} at byte {offset}: '{word}' ({reason})")]
    MalformedPattern { dimension: Dimension, word: String, offset: usize, reason: MalformedPatternReason },

    #[error("Malformed pattern: the pattern dimension needs at least one word")]
    EmptyPattern,

    #[error("Category not found: {path}")]
    CategoryNotFound { path: String },

    #[error("Match budget exceeded: {steps} steps taken, {budget} allowed")]
    MatchBudgetExceeded { budget: usize, steps: usize },
}

impl GraphmasterError {
    /// True for errors raised while tokenizing a category key.
    pub fn is_malformed_pattern(&self) -> bool {
        matches!(self, GraphmasterError::MalformedPattern { .. } | GraphmasterError::EmptyPattern)
    }
}

pub type GraphmasterResult<T> = Result<T, GraphmasterError>;
