//! Tokenization and normalization.
//!
//! Two directions share the same word rules (whitespace split, uppercase
//! folding) but differ in how wildcard characters are treated:
//!
//! - **Pattern side** (`tokenize`, `pattern_path`): standalone `_` and `*`
//!   become wildcard tokens; a wildcard character glued to anything else is a
//!   malformed key. An empty pattern is rejected, empty that/topic become `*`.
//! - **Input side** (`InputWord`, `Query`): every word is literal. `*` typed by
//!   a user is just the word `*`.
//!
//! ```text
//! "Hello _"  ("" , "")  ─▶  HELLO _ <THAT> * <TOPIC> *
//! ```

use crate::error::{GraphmasterError, GraphmasterResult, MalformedPatternReason};
use crate::{Dimension, Token};

/// Case-fold a word to its tree key.
pub(crate) fn normalize_word(word: &str) -> String {
    word.to_uppercase()
}

/// Split pattern-side `text` into tokens for `dimension`.
pub(crate) fn tokenize(text: &str, dimension: Dimension) -> GraphmasterResult<Vec<Token>> {
    let mut tokens = Vec::new();

    for m in regex!(r"\S+").find_iter(text) {
        let word = m.as_str();
        let token = match word {
            "_" => Token::Underscore,
            "*" => Token::Star,
            _ if word.contains(['_', '*']) => {
                return Err(GraphmasterError::MalformedPattern {
                    dimension,
                    word: word.to_string(),
                    offset: m.start(),
                    reason: MalformedPatternReason::FusedWildcard,
                });
            }
            _ => Token::Word(normalize_word(word)),
        };
        tokens.push(token);
    }

    if tokens.is_empty() {
        match dimension {
            Dimension::Pattern => return Err(GraphmasterError::EmptyPattern),
            Dimension::That | Dimension::Topic => tokens.push(Token::Star),
        }
    }

    Ok(tokens)
}

/// Build the full tree key `pattern <THAT> that <TOPIC> topic`.
pub(crate) fn pattern_path(pattern: &str, that: &str, topic: &str) -> GraphmasterResult<Vec<Token>> {
    let mut path = tokenize(pattern, Dimension::Pattern)?;
    path.push(Token::ThatSep);
    path.extend(tokenize(that, Dimension::That)?);
    path.push(Token::TopicSep);
    path.extend(tokenize(topic, Dimension::Topic)?);
    Ok(path)
}

/// One word of live input: its literal tree key plus the text as the user
/// wrote it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct InputWord {
    pub token: Token,
    pub raw: String,
}

/// The three input segments a match runs against.
#[derive(Debug, Clone, Default)]
pub(crate) struct Query {
    segments: [Vec<InputWord>; 3],
}

impl Query {
    pub(crate) fn new<S: AsRef<str>>(input: &[S], that: &[S], topic: &[S]) -> Self {
        Query { segments: [input_words(input), input_words(that), input_words(topic)] }
    }

    pub(crate) fn from_text(input: &str, that: &str, topic: &str) -> Self {
        Query::new(&[input], &[that], &[topic])
    }

    pub(crate) fn segment(&self, dimension: Dimension) -> &[InputWord] {
        &self.segments[dimension.index()]
    }
}

/// Words handed in by callers may still contain spaces; split them again so
/// every `InputWord` is a single whitespace-free word.
fn input_words<S: AsRef<str>>(words: &[S]) -> Vec<InputWord> {
    words
        .iter()
        .flat_map(|w| w.as_ref().split_whitespace())
        .map(|w| InputWord { token: Token::Word(normalize_word(w)), raw: w.to_string() })
        .collect()
}
