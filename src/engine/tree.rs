//! The pattern tree ("Graphmaster").
//!
//! Every category is stored at the end of its token path:
//!
//! ```text
//! root ─ HELLO ─ <THAT> ─ * ─ <TOPIC> ─ * ●      "HELLO" / * / *
//!          └──── _ ─ <THAT> ─ * ─ <TOPIC> ─ * ●  "HELLO _" / * / *
//! ```
//!
//! `learn` creates missing nodes top-down; `forget` clears a category and prunes
//! the nodes that no longer lead anywhere. Both recompute the cached statistics
//! (`height`, `average_size`) along the touched ancestor chain before they
//! return, so readers never observe stale values.
//!
//! The tree itself is not synchronized. Shared use goes through
//! [`Graphmaster`](crate::Graphmaster), which wraps it in a readers–writer lock.

use tracing::{debug, trace};

use super::arena::{Node, NodeArena, NodeId};
use super::matcher;
use super::metrics::RunMetrics;
use super::tokenizer::{Query, pattern_path};
use crate::api::{ActivationEntry, Category, MatchResult, Options, TreeStats};
use crate::error::{GraphmasterError, GraphmasterResult};
use crate::{Token, render_path};

#[derive(Debug)]
pub struct PatternTree<T> {
    nodes: NodeArena<T>,
    categories: usize,
}

impl<T> Default for PatternTree<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> PatternTree<T> {
    pub fn new() -> Self {
        PatternTree { nodes: NodeArena::new(), categories: 0 }
    }

    /// Store `template` under `pattern` / `that` / `topic`.
    ///
    /// Empty `that` or `topic` stand for `*`. When a category already exists
    /// at the same path its template is replaced and the old one is returned.
    pub fn learn(&mut self, pattern: &str, that: &str, topic: &str, template: T) -> GraphmasterResult<Option<T>> {
        let path = pattern_path(pattern, that, topic)?;

        let mut id = NodeId::ROOT;
        let mut created = 0usize;
        for token in &path {
            id = match self.nodes[id].child(token) {
                Some(child) => child,
                None => {
                    created += 1;
                    self.nodes.alloc_child(id, token.clone())
                }
            };
        }

        let previous = self.nodes[id].category.replace(Category::new(template, &path)).map(|c| c.template);
        if previous.is_some() {
            debug!(path = %render_path(&path), "replaced existing category");
        } else {
            self.categories += 1;
        }
        trace!(path = %render_path(&path), created, "learned category");

        self.refresh_stats(id);
        Ok(previous)
    }

    /// Remove the category stored exactly at `pattern` / `that` / `topic` and
    /// return its template.
    pub fn forget(&mut self, pattern: &str, that: &str, topic: &str) -> GraphmasterResult<T> {
        let path = pattern_path(pattern, that, topic)?;
        let not_found = || GraphmasterError::CategoryNotFound { path: render_path(&path) };

        let id = self.find(&path).ok_or_else(not_found)?;
        let category = self.nodes[id].category.take().ok_or_else(not_found)?;
        self.categories -= 1;

        let mut current = id;
        let mut pruned = 0usize;
        while self.nodes[current].category.is_none() && self.nodes[current].children.is_empty() {
            match self.nodes.release(current) {
                Some(parent) => {
                    pruned += 1;
                    current = parent;
                }
                None => break,
            }
        }
        debug!(path = %render_path(&path), pruned, "forgot category");

        self.refresh_stats(current);
        Ok(category.template)
    }

    /// Look up the category stored exactly at a key (no wildcard matching).
    pub fn get(&self, pattern: &str, that: &str, topic: &str) -> Option<&Category<T>> {
        let path = pattern_path(pattern, that, topic).ok()?;
        self.find(&path).and_then(|id| self.nodes[id].category.as_ref())
    }

    pub fn contains(&self, pattern: &str, that: &str, topic: &str) -> bool {
        self.get(pattern, that, topic).is_some()
    }

    /// Number of stored categories.
    pub fn len(&self) -> usize {
        self.categories
    }

    pub fn is_empty(&self) -> bool {
        self.categories == 0
    }

    /// Number of live nodes, root included.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn categories(&self) -> impl Iterator<Item = &Category<T>> {
        self.nodes.iter().filter_map(|(_, node)| node.category.as_ref())
    }

    /// Read-only view of the root, for walking the tree node by node.
    pub fn root(&self) -> NodeRef<'_, T> {
        NodeRef { tree: self, id: NodeId::ROOT }
    }

    pub fn stats(&self) -> TreeStats {
        let root = &self.nodes[NodeId::ROOT];
        TreeStats {
            nodes: self.nodes.len(),
            categories: self.categories,
            height: root.height,
            average_size: root.average_size,
        }
    }

    /// Categories with their activation counts, most activated first; ties
    /// are ordered by key.
    pub fn activations(&self) -> Vec<ActivationEntry> {
        let mut entries: Vec<ActivationEntry> = self
            .categories()
            .map(|c| ActivationEntry {
                pattern: c.pattern().to_string(),
                that: c.that().to_string(),
                topic: c.topic().to_string(),
                activations: c.activations(),
            })
            .collect();
        entries.sort_by(|a, b| {
            b.activations
                .cmp(&a.activations)
                .then_with(|| a.pattern.cmp(&b.pattern))
                .then_with(|| a.that.cmp(&b.that))
                .then_with(|| a.topic.cmp(&b.topic))
        });
        entries
    }

    /// Find the best category for the given input, that and topic words.
    ///
    /// Words are case-insensitive and may contain spaces (they are split
    /// again). Wildcard characters in the input are ordinary words.
    pub fn match_input<S: AsRef<str>>(
        &self,
        input: &[S],
        that: &[S],
        topic: &[S],
        options: &Options,
    ) -> GraphmasterResult<Option<MatchResult<T>>>
    where
        T: Clone,
    {
        self.run_query(&Query::new(input, that, topic), options)
    }

    /// Like [`match_input`](Self::match_input) but takes whole sentences.
    pub fn match_text(
        &self,
        input: &str,
        that: &str,
        topic: &str,
        options: &Options,
    ) -> GraphmasterResult<Option<MatchResult<T>>>
    where
        T: Clone,
    {
        self.run_query(&Query::from_text(input, that, topic), options)
    }

    fn run_query(&self, query: &Query, options: &Options) -> GraphmasterResult<Option<MatchResult<T>>>
    where
        T: Clone,
    {
        let start = std::time::Instant::now();
        let Some(found) = matcher::search(self, query, options.step_budget)? else {
            return Ok(None);
        };

        let Some(category) = self.nodes[found.node].category.as_ref() else {
            return Ok(None);
        };
        if options.record_activations {
            category.record_activation();
        }

        Ok(Some(MatchResult {
            template: category.template.clone(),
            stars: found.stars,
            path: render_path(&self.path_to(found.node)),
            metrics: RunMetrics { steps: found.steps, elapsed: start.elapsed() },
        }))
    }

    pub(crate) fn node(&self, id: NodeId) -> &Node<T> {
        &self.nodes[id]
    }

    fn find(&self, path: &[Token]) -> Option<NodeId> {
        path.iter().try_fold(NodeId::ROOT, |id, token| self.nodes[id].child(token))
    }

    /// Tokens on the edges from the root down to `id`.
    fn path_to(&self, mut id: NodeId) -> Vec<Token> {
        let mut path = Vec::new();
        while let Some(key) = &self.nodes[id].key {
            path.push(key.clone());
            match self.nodes[id].parent {
                Some(parent) => id = parent,
                None => break,
            }
        }
        path.reverse();
        path
    }

    /// Recompute statistics from `id` up to the root.
    fn refresh_stats(&mut self, mut id: NodeId) {
        loop {
            let (height, average_size) = self.compute_stats(id);
            let node = &mut self.nodes[id];
            node.height = height;
            node.average_size = average_size;
            match node.parent {
                Some(parent) => id = parent,
                None => break,
            }
        }
    }

    /// Statistics of `id` from its children's (already current) values.
    fn compute_stats(&self, id: NodeId) -> (u32, f64) {
        let node = &self.nodes[id];
        if node.children.is_empty() {
            return (0, 0.0);
        }

        let mut min_height = u32::MAX;
        let mut child_sizes = 0.0;
        for &child in node.children.values() {
            let child = &self.nodes[child];
            min_height = min_height.min(child.height);
            child_sizes += child.average_size;
        }

        let size = node.children.len() as f64;
        let children_average = child_sizes / size;
        let average_size = if node.is_root() { children_average } else { (size + children_average) / 2.0 };
        (min_height + 1, average_size)
    }

    /// Check every structural invariant of the tree.
    #[cfg(test)]
    pub(crate) fn check_consistency(&self) -> Result<(), String> {
        let mut categories = 0;
        for (id, node) in self.nodes.iter() {
            if node.category.is_some() {
                categories += 1;
            }
            if !node.is_root() && node.category.is_none() && node.children.is_empty() {
                return Err(format!("{id:?} is a dangling node"));
            }
            for (token, &child) in &node.children {
                let child_node = &self.nodes[child];
                if child_node.parent != Some(id) || child_node.key.as_ref() != Some(token) {
                    return Err(format!("{child:?} is not linked back to {id:?}"));
                }
            }
            let expected = self.compute_stats(id);
            if node.height != expected.0 {
                return Err(format!("{id:?} height {} expected {}", node.height, expected.0));
            }
            if (node.average_size - expected.1).abs() > 1e-9 {
                return Err(format!("{id:?} average size {} expected {}", node.average_size, expected.1));
            }
        }
        if categories != self.categories {
            return Err(format!("counted {categories} categories, tracking {}", self.categories));
        }
        Ok(())
    }
}

/// Read-only view of one node of a [`PatternTree`].
///
/// Exposes the cached per-node statistics so corpus tooling can look below
/// the root without touching the tree.
pub struct NodeRef<'a, T> {
    tree: &'a PatternTree<T>,
    id: NodeId,
}

impl<T> Clone for NodeRef<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for NodeRef<'_, T> {}

impl<T> std::fmt::Debug for NodeRef<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeRef")
            .field("key", &self.key())
            .field("children", &self.len())
            .field("height", &self.height())
            .field("average_size", &self.average_size())
            .finish()
    }
}

impl<'a, T> NodeRef<'a, T> {
    fn node(&self) -> &'a Node<T> {
        self.tree.node(self.id)
    }

    fn at(&self, id: NodeId) -> NodeRef<'a, T> {
        NodeRef { tree: self.tree, id }
    }

    /// Edge label leading here; `None` for the root.
    pub fn key(&self) -> Option<&'a Token> {
        self.node().key.as_ref()
    }

    pub fn is_root(&self) -> bool {
        self.node().is_root()
    }

    pub fn parent(&self) -> Option<NodeRef<'a, T>> {
        self.node().parent.map(|id| self.at(id))
    }

    pub fn child(&self, token: &Token) -> Option<NodeRef<'a, T>> {
        self.node().child(token).map(|id| self.at(id))
    }

    /// Children in no particular order.
    pub fn children(&self) -> impl Iterator<Item = (&'a Token, NodeRef<'a, T>)> + use<'a, T> {
        let tree = self.tree;
        self.node().children.iter().map(move |(token, &id)| (token, NodeRef { tree, id }))
    }

    /// Number of children.
    pub fn len(&self) -> usize {
        self.node().children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.node().children.is_empty()
    }

    /// Fewest edges from here to a node without children.
    pub fn height(&self) -> u32 {
        self.node().height
    }

    pub fn average_size(&self) -> f64 {
        self.node().average_size
    }

    /// The category stored here, if this node ends a learned path.
    pub fn category(&self) -> Option<&'a Category<T>> {
        self.node().category.as_ref()
    }
}
