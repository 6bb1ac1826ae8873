//! Identifier index derived from the feature tree.

use std::collections::HashMap;

use tracing::{debug, instrument};

use crate::domain::identifier::Identifier;
use crate::domain::tree::{FeatureTree, NodeId};

/// Maps every reachable feature's identifier to its node.
///
/// The cache is a pure function of the tree and is only ever recomputed in
/// full. It remembers the tree revision it was built from, so readers can tell
/// whether it still describes the tree; it never repairs itself.
#[derive(Debug, Clone, Default)]
pub struct FeatureCache {
    entries: HashMap<Identifier, NodeId>,
    revision: Option<u64>,
}

impl FeatureCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup(&self, identifier: &Identifier) -> Option<NodeId> {
        self.entries.get(identifier).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn identifiers(&self) -> impl Iterator<Item = &Identifier> {
        self.entries.keys()
    }

    /// True if the cache was built from the tree's current revision.
    pub fn is_current(&self, tree: &FeatureTree) -> bool {
        self.revision == Some(tree.revision())
    }

    /// Adds one entry after an edit that left the rest of the map valid.
    pub(crate) fn record(&mut self, identifier: Identifier, node: NodeId, tree: &FeatureTree) {
        self.entries.insert(identifier, node);
        self.revision = Some(tree.revision());
    }

    /// Drops one entry after an edit that left the rest of the map valid.
    pub(crate) fn forget(&mut self, identifier: &Identifier, tree: &FeatureTree) {
        self.entries.remove(identifier);
        self.revision = Some(tree.revision());
    }

    /// Replaces the contents with a full pre-order walk of `tree`.
    #[instrument(level = "trace", skip_all)]
    pub fn rebuild(&mut self, tree: &FeatureTree) {
        let entries: HashMap<_, _> = tree
            .iter()
            .map(|(id, node)| (*node.feature().identifier(), id))
            .collect();
        debug!(
            previous = self.entries.len(),
            current = entries.len(),
            revision = tree.revision(),
            "rebuilt feature cache"
        );
        self.entries = entries;
        self.revision = Some(tree.revision());
    }
}
