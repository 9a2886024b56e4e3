//! Priority/backtracking search over a [`PatternTree`].
//!
//! The search walks the tree in lock-step with the query, one dimension at a
//! time. At every node the candidate transitions are tried in a fixed order:
//!
//! ```text
//! 1. exact word       consume 1 word
//! 2. `_` wildcard     consume n, n-1, ..., 1 words (rest of this dimension)
//! 3. `*` wildcard     consume n, n-1, ..., 1 words
//! 4. separator        only once the dimension is fully consumed
//! ```
//!
//! The first complete path that ends on a category wins, so a literal always
//! outranks a wildcard at the same position and `_` always outranks `*`.
//!
//! ## Empty query dimensions
//!
//! Learned keys store a missing that/topic as `*`. When the query has no words
//! for a dimension, the `*` edge is taken without consuming anything and no
//! star is recorded. A literal or `_` edge never satisfies an empty dimension.
//!
//! ## Bounded work
//!
//! Backtracking is explicit: each `Frame` on the stack remembers which
//! alternative it will try next, so stack depth is bounded by the path length
//! and every push or pop is one step against the caller's budget.

use tracing::{debug, trace};

use super::arena::NodeId;
use super::tokenizer::Query;
use super::tree::PatternTree;
use crate::api::Stars;
use crate::error::{GraphmasterError, GraphmasterResult};
use crate::{Dimension, Token};

/// Outcome of a successful search.
#[derive(Debug)]
pub(crate) struct Found {
    pub node: NodeId,
    pub stars: Stars,
    pub steps: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Wildcard {
    Underscore,
    Star,
}

impl Wildcard {
    fn token(self) -> Token {
        match self {
            Wildcard::Underscore => Token::Underscore,
            Wildcard::Star => Token::Star,
        }
    }
}

/// Next alternative a frame will try.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Literal,
    /// Try `kind` consuming `len` words; shrinks towards 1.
    Wildcard { kind: Wildcard, len: usize },
    Separator,
    Exhausted,
}

/// Words `start..end` of `dimension` captured by a wildcard edge.
#[derive(Debug, Clone, Copy)]
struct Capture {
    dimension: Dimension,
    start: usize,
    end: usize,
}

#[derive(Debug)]
struct Frame {
    node: NodeId,
    dimension: Dimension,
    /// Words of `dimension` consumed so far.
    pos: usize,
    phase: Phase,
    /// Capture made by the edge that led to this frame.
    capture: Option<Capture>,
}

impl Frame {
    fn new(node: NodeId, dimension: Dimension, pos: usize, capture: Option<Capture>, query: &Query) -> Self {
        let phase = if pos == query.segment(dimension).len() { Phase::Separator } else { Phase::Literal };
        Frame { node, dimension, pos, phase, capture }
    }
}

/// Run the search. `budget` caps node visits plus backtracks.
#[tracing::instrument(level = "trace", skip_all, fields(
    input = query.segment(Dimension::Pattern).len(),
    budget = budget,
))]
pub(crate) fn search<T>(tree: &PatternTree<T>, query: &Query, budget: usize) -> GraphmasterResult<Option<Found>> {
    let mut steps = 0usize;

    let Some(start) = enter(tree, query, NodeId::ROOT, Dimension::Pattern) else {
        return Ok(None);
    };
    tick(&mut steps, budget)?;
    let mut stack = vec![Frame::new(start, Dimension::Pattern, 0, None, query)];
    if accepts(tree, query, &stack[0]) {
        return Ok(Some(collect(&stack, query, start, steps)));
    }

    while let Some(top) = stack.last_mut() {
        let next = advance(tree, query, top);
        tick(&mut steps, budget)?;
        match next {
            Some(frame) => {
                let node = frame.node;
                let done = accepts(tree, query, &frame);
                stack.push(frame);
                if done {
                    trace!(steps, depth = stack.len(), "match found");
                    return Ok(Some(collect(&stack, query, node, steps)));
                }
            }
            None => {
                stack.pop();
            }
        }
    }

    trace!(steps, "no match");
    Ok(None)
}

fn tick(steps: &mut usize, budget: usize) -> GraphmasterResult<()> {
    *steps += 1;
    if *steps > budget {
        debug!(budget, "match aborted: step budget exhausted");
        return Err(GraphmasterError::MatchBudgetExceeded { budget, steps: *steps });
    }
    Ok(())
}

/// Move into `dimension` at `node`. An empty query dimension can only be
/// satisfied by the `*` edge, which is crossed without consuming words.
fn enter<T>(tree: &PatternTree<T>, query: &Query, node: NodeId, dimension: Dimension) -> Option<NodeId> {
    if query.segment(dimension).is_empty() { tree.node(node).child(&Token::Star) } else { Some(node) }
}

fn accepts<T>(tree: &PatternTree<T>, query: &Query, frame: &Frame) -> bool {
    frame.dimension == Dimension::Topic
        && frame.pos == query.segment(Dimension::Topic).len()
        && tree.node(frame.node).category.is_some()
}

/// Produce the next child frame of `frame` in priority order, or `None` when
/// every alternative has been tried.
fn advance<T>(tree: &PatternTree<T>, query: &Query, frame: &mut Frame) -> Option<Frame> {
    let node = tree.node(frame.node);
    let words = query.segment(frame.dimension);
    let remaining = words.len() - frame.pos;

    loop {
        match frame.phase {
            Phase::Literal => {
                frame.phase = Phase::Wildcard { kind: Wildcard::Underscore, len: remaining };
                if let Some(child) = node.child(&words[frame.pos].token) {
                    return Some(Frame::new(child, frame.dimension, frame.pos + 1, None, query));
                }
            }
            Phase::Wildcard { kind, len } => match node.child(&kind.token()) {
                Some(child) if len > 0 => {
                    frame.phase = Phase::Wildcard { kind, len: len - 1 };
                    let end = frame.pos + len;
                    let capture = Capture { dimension: frame.dimension, start: frame.pos, end };
                    return Some(Frame::new(child, frame.dimension, end, Some(capture), query));
                }
                _ => {
                    frame.phase = match kind {
                        Wildcard::Underscore => Phase::Wildcard { kind: Wildcard::Star, len: remaining },
                        Wildcard::Star => Phase::Exhausted,
                    };
                }
            },
            Phase::Separator => {
                frame.phase = Phase::Exhausted;
                let next = frame.dimension.next()?;
                let child = node.child(&next.separator()?)?;
                let entered = enter(tree, query, child, next)?;
                return Some(Frame::new(entered, next, 0, None, query));
            }
            Phase::Exhausted => return None,
        }
    }
}

fn collect(stack: &[Frame], query: &Query, node: NodeId, steps: usize) -> Found {
    let mut stars = Stars::default();
    for capture in stack.iter().filter_map(|f| f.capture) {
        let words = &query.segment(capture.dimension)[capture.start..capture.end];
        let text = words.iter().map(|w| w.raw.as_str()).collect::<Vec<_>>().join(" ");
        stars.push(capture.dimension, text);
    }
    Found { node, stars, steps }
}
