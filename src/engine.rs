//! Pattern tree and matching engine.
//!
//! The engine is split into focused submodules under `src/engine/`; the rest
//! of the crate only talks to [`PatternTree`] and the types re-exported here.
//!
//! ## How the parts work together
//!
//! ```text
//! learn(pattern, that, topic, template)
//!   │  pattern_path                       (tokenizer.rs)
//!   │    "hello _" "" "" ─▶ HELLO _ <THAT> * <TOPIC> *
//!   └─▶ PatternTree::learn                (tree.rs)
//!         - create missing nodes          (arena.rs)
//!         - store Category at the end
//!         - recompute height / average size up to the root
//!
//! match(input, that, topic)
//!   │  Query::new                         (tokenizer.rs)
//!   └─▶ matcher::search                   (matcher.rs)
//!         - literal, then `_`, then `*`, greedy-then-shrink
//!         - step budget checked on every visit / backtrack
//!         ─▶ category node + stars + RunMetrics (metrics.rs)
//! ```
//!
//! ## Responsibilities by module
//!
//! - `tokenizer.rs`: whitespace splitting, case folding, wildcard validation,
//!   path construction, and the input-side `Query`.
//! - `arena.rs`: slot storage for nodes with integer handles and a free list.
//! - `tree.rs`: `learn`, `forget` (with pruning), statistics, lookups, and
//!   the read-only `NodeRef` view.
//! - `matcher.rs`: the explicit-stack priority search.
//! - `metrics.rs`: per-match step and timing data.
//!
//! ## Debugging
//!
//! The engine logs through `tracing`. Run the CLI with
//! `RUST_LOG=graphmaster=trace` to see learned paths and search summaries.

#[path = "engine/arena.rs"]
mod arena;
#[path = "engine/matcher.rs"]
mod matcher;
#[path = "engine/metrics.rs"]
mod metrics;
#[path = "engine/tokenizer.rs"]
mod tokenizer;
#[path = "engine/tree.rs"]
mod tree;

#[cfg(test)]
#[path = "engine/tests.rs"]
mod tests;

pub use metrics::RunMetrics;
pub use tree::{NodeRef, PatternTree};
