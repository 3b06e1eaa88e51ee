//! Hierarchical coverage statistics.
//!
//! A [`CoverageNode`] maps single path segments (package or module names)
//! to child nodes. Leaf nodes correspond to modules and carry directly
//! assigned line counts; branch nodes correspond to packages and derive
//! their counts by summing over their children. Aggregates are computed
//! lazily and memoized per node, so the tree must be fully built before
//! the first aggregate is read anywhere in it.

use std::collections::BTreeMap;
use std::fmt;

use once_cell::unsync::OnceCell;

use crate::error::{CovError, Result};

/// One node of the coverage tree.
#[derive(Debug, Default)]
pub struct CoverageNode {
    children: BTreeMap<String, CoverageNode>,
    /// Directly assigned `(covered, total)` counts. Only set on leaves.
    stats: Option<(u64, u64)>,
    /// Memoized recursive aggregate, computed on first read.
    cache: OnceCell<(u64, u64)>,
}

impl CoverageNode {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Child nodes, keyed by segment name.
    pub fn children(&self) -> &BTreeMap<String, CoverageNode> {
        &self.children
    }

    /// A node without children is a module; one with children is a package.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Look up the node at `path`, if present.
    #[must_use]
    pub fn get_at(&self, path: &[String]) -> Option<&CoverageNode> {
        let mut node = self;
        for segment in path {
            node = node.children.get(segment)?;
        }
        Some(node)
    }

    /// Assign leaf statistics at `path`, creating intermediate branch
    /// nodes as needed.
    ///
    /// A name that is used as both a module and a package makes the
    /// branch/leaf split ambiguous, so such paths are rejected with
    /// [`CovError::PathConflict`] instead of silently promoting or
    /// discarding data. Must not be called after any aggregate has been
    /// read from the tree; the memoized sums would go stale.
    pub fn set_at(&mut self, path: &[String], covered: u64, total: u64) -> Result<()> {
        let mut node = self;
        for (depth, segment) in path.iter().enumerate() {
            if node.stats.is_some() {
                return Err(CovError::PathConflict(path[..depth].join(".")));
            }
            node = node.children.entry(segment.clone()).or_default();
        }
        if !node.children.is_empty() {
            return Err(CovError::PathConflict(path.join(".")));
        }
        debug_assert!(
            node.cache.get().is_none(),
            "coverage tree mutated after an aggregate was read"
        );
        node.stats = Some((covered, total));
        Ok(())
    }

    /// `(covered, total)` line counts for this subtree.
    ///
    /// Computed recursively on first access and cached for the node's
    /// lifetime. Leaves that never had stats assigned read as `(0, 0)`.
    #[must_use]
    pub fn coverage(&self) -> (u64, u64) {
        *self.cache.get_or_init(|| {
            if self.children.is_empty() {
                self.stats.unwrap_or((0, 0))
            } else {
                debug_assert!(
                    self.stats.is_none(),
                    "branch node carries directly assigned stats"
                );
                let mut covered = 0;
                let mut total = 0;
                for child in self.children.values() {
                    let (c, t) = child.coverage();
                    covered += c;
                    total += t;
                }
                (covered, total)
            }
        })
    }

    /// Coverage percentage, floored. A subtree without executable lines
    /// reads as fully covered.
    #[must_use]
    pub fn percent(&self) -> u64 {
        let (covered, total) = self.coverage();
        if total == 0 {
            100
        } else {
            100 * covered / total
        }
    }

    /// Number of executable lines that were never executed.
    #[must_use]
    pub fn uncovered(&self) -> u64 {
        let (covered, total) = self.coverage();
        total - covered
    }

    /// Plain preorder traversal: the node itself first (with its path,
    /// empty for the root), then each child subtree in stored order.
    pub fn traverse(&self, visit: &mut dyn FnMut(&CoverageNode, &[String])) {
        let mut path = Vec::new();
        self.walk(&mut path, visit);
    }

    fn walk(&self, path: &mut Vec<String>, visit: &mut dyn FnMut(&CoverageNode, &[String])) {
        visit(self, path);
        for (name, child) in &self.children {
            path.push(name.clone());
            child.walk(path, visit);
            path.pop();
        }
    }

    /// Preorder traversal with children sorted by `key` at every level
    /// before recursing.
    pub fn traverse_ordered<K: Ord>(
        &self,
        key: &impl Fn(&str, &CoverageNode) -> K,
        visit: &mut dyn FnMut(&CoverageNode, &[String]),
    ) {
        let mut path = Vec::new();
        self.walk_ordered(&mut path, key, visit);
    }

    fn walk_ordered<K: Ord>(
        &self,
        path: &mut Vec<String>,
        key: &impl Fn(&str, &CoverageNode) -> K,
        visit: &mut dyn FnMut(&CoverageNode, &[String]),
    ) {
        visit(self, path);
        let mut entries: Vec<(&String, &CoverageNode)> = self.children.iter().collect();
        entries.sort_by_key(|&(name, node)| key(name, node));
        for (name, child) in entries {
            path.push(name.clone());
            child.walk_ordered(path, key, visit);
            path.pop();
        }
    }
}

impl fmt::Display for CoverageNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (covered, total) = self.coverage();
        write!(
            f,
            "{}% covered ({} of {} lines uncovered)",
            self.percent(),
            total - covered,
            total
        )
    }
}
