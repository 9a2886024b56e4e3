//! A Graphmaster-style conversational pattern tree.
//!
//! Categories are keyed on three word dimensions (pattern, that, topic) joined
//! into a single token path. Matching walks the tree in lock-step with the
//! input, trying exact words before the `_` wildcard and `_` before `*`, and
//! returns the first category it reaches together with the captured stars.
//!
//! ```
//! use graphmaster::Graphmaster;
//!
//! let brain = Graphmaster::new();
//! brain.learn("MY NAME IS _", "", "", "greet-by-name").unwrap();
//!
//! let found = brain.match_text("my name is Ada", "", "").unwrap().unwrap();
//! assert_eq!(found.template, "greet-by-name");
//! assert_eq!(found.stars.input(1), "Ada");
//! ```

#[macro_use]
mod macros;
mod api;
mod engine;
pub mod error;

pub use api::{
    ActivationEntry, ActivationReport, Category, DEFAULT_STEP_BUDGET, Graphmaster, MatchResult, Options,
    STEP_BUDGET_ENV, Stars, TreeStats,
};
pub use engine::{NodeRef, PatternTree, RunMetrics};
pub use error::{GraphmasterError, GraphmasterResult, MalformedPatternReason};

// --- Core types -------------------------------------------------------------

/// One of the three key dimensions of a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Dimension {
    Pattern,
    That,
    Topic,
}

impl Dimension {
    pub const ALL: [Dimension; 3] = [Dimension::Pattern, Dimension::That, Dimension::Topic];

    pub(crate) fn index(self) -> usize {
        self as usize
    }

    /// The dimension that follows this one in a path, if any.
    pub(crate) fn next(self) -> Option<Dimension> {
        match self {
            Dimension::Pattern => Some(Dimension::That),
            Dimension::That => Some(Dimension::Topic),
            Dimension::Topic => None,
        }
    }

    /// The separator token that opens this dimension inside a path.
    pub(crate) fn separator(self) -> Option<Token> {
        match self {
            Dimension::Pattern => None,
            Dimension::That => Some(Token::ThatSep),
            Dimension::Topic => Some(Token::TopicSep),
        }
    }

    pub(crate) fn as_flag(self) -> DimensionSet {
        match self {
            Dimension::Pattern => DimensionSet::PATTERN,
            Dimension::That => DimensionSet::THAT,
            Dimension::Topic => DimensionSet::TOPIC,
        }
    }
}

impl std::fmt::Display for Dimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Dimension::Pattern => "pattern",
            Dimension::That => "that",
            Dimension::Topic => "topic",
        })
    }
}

/// A single edge label in the pattern tree.
///
/// Literal words are stored uppercased. Wildcards and separators are distinct
/// variants, so a literal `*` typed by a user can never alias the wildcard.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Token {
    Word(String),
    /// `_`: one or more words, tried right after exact words.
    Underscore,
    /// `*`: one or more words, tried last.
    Star,
    ThatSep,
    TopicSep,
}

impl Token {
    pub fn is_wildcard(&self) -> bool {
        matches!(self, Token::Underscore | Token::Star)
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Word(word) => f.write_str(word),
            Token::Underscore => f.write_str("_"),
            Token::Star => f.write_str("*"),
            Token::ThatSep => f.write_str("<THAT>"),
            Token::TopicSep => f.write_str("<TOPIC>"),
        }
    }
}

bitflags::bitflags! {
    /// Set of dimensions, e.g. the dimensions in which a category key uses
    /// wildcards.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct DimensionSet: u8 {
        const PATTERN = 1 << 0;
        const THAT    = 1 << 1;
        const TOPIC   = 1 << 2;
    }
}

/// Render a token path the way it is shown in reports and errors.
pub(crate) fn render_path(tokens: &[Token]) -> String {
    tokens.iter().map(|t| t.to_string()).collect::<Vec<_>>().join(" ")
}
