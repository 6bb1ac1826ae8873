//! Feature model aggregate.

use tracing::{debug, instrument};

use crate::domain::attribute::{Attribute, AttributeStore, AttributeType, DESCRIPTION, NAME};
use crate::domain::cache::FeatureCache;
use crate::domain::feature::Feature;
use crate::domain::identifier::{Identifier, IdentifierFactory};
use crate::domain::mutator::Mutator;
use crate::domain::tree::{FeatureTree, NodeId};

/// Owns the feature tree, the identifier factory, the model's attributes and
/// the identifier cache.
///
/// Reading is done directly on the model. Structural edits go through a
/// [`Mutator`] (tracked: the cache is rebuilt afterwards) or a
/// [`RawMutator`](crate::domain::RawMutator) (untracked: the cache is left as
/// is until [`run_internally`](Self::run_internally) reconciles it).
#[derive(Debug)]
pub struct FeatureModel {
    identifier: Identifier,
    factory: Box<dyn IdentifierFactory>,
    tree: FeatureTree,
    attributes: AttributeStore,
    cache: FeatureCache,
    /// Lookup index patched entry by entry by gate edits while
    /// `run_internally` runs; never observable as the cache.
    working: Option<FeatureCache>,
}

impl FeatureModel {
    /// Creates a model with a single root feature. The model takes the first
    /// identifier from `factory`, the root feature the second.
    pub fn new(factory: impl IdentifierFactory + 'static) -> Self {
        Self::with_factory(Box::new(factory))
    }

    pub fn with_factory(factory: Box<dyn IdentifierFactory>) -> Self {
        let identifier = factory.next();
        let root = Feature::new(factory.next(), identifier);
        Self::assemble(identifier, factory, root)
    }

    pub(crate) fn assemble(
        identifier: Identifier,
        factory: Box<dyn IdentifierFactory>,
        root: Feature,
    ) -> Self {
        let tree = FeatureTree::new(root);
        let mut cache = FeatureCache::new();
        cache.rebuild(&tree);
        debug!(model = %identifier, "created feature model");
        Self {
            identifier,
            factory,
            tree,
            attributes: AttributeStore::new(),
            cache,
            working: None,
        }
    }

    pub fn identifier(&self) -> &Identifier {
        &self.identifier
    }

    pub fn identifier_factory(&self) -> &dyn IdentifierFactory {
        self.factory.as_ref()
    }

    /// Issues a fresh identifier from the model's factory.
    pub fn new_identifier(&self) -> Identifier {
        self.factory.next()
    }

    /// A feature with a fresh identifier, not yet placed in the tree.
    ///
    /// Identifiers already carried by a feature in the tree (e.g. explicit
    /// ones from an imported outline) are skipped.
    pub fn new_feature(&self) -> Feature {
        let mut identifier = self.new_identifier();
        while self.has_feature(&identifier) {
            identifier = self.new_identifier();
        }
        Feature::new(identifier, self.identifier)
    }

    pub fn tree(&self) -> &FeatureTree {
        &self.tree
    }

    pub(crate) fn tree_mut(&mut self) -> &mut FeatureTree {
        &mut self.tree
    }

    pub fn root(&self) -> NodeId {
        self.tree.root()
    }

    pub fn root_feature(&self) -> &Feature {
        self.tree.root_feature()
    }

    pub fn feature_cache(&self) -> &FeatureCache {
        &self.cache
    }

    /// Node carrying `identifier`.
    ///
    /// Answered from the cache while it matches the tree. After untracked
    /// edits it is answered from the working index inside
    /// [`run_internally`](Self::run_internally), otherwise by walking the
    /// tree (linear in the tree size).
    pub fn node_of(&self, identifier: &Identifier) -> Option<NodeId> {
        if self.cache.is_current(&self.tree) {
            self.cache.lookup(identifier)
        } else if let Some(working) = self.working.as_ref().filter(|w| w.is_current(&self.tree)) {
            working.lookup(identifier)
        } else {
            self.tree.find(identifier)
        }
    }

    pub fn feature(&self, identifier: &Identifier) -> Option<&Feature> {
        self.node_of(identifier).and_then(|id| self.tree.feature(id))
    }

    pub fn has_feature(&self, identifier: &Identifier) -> bool {
        self.node_of(identifier).is_some()
    }

    /// All features reachable from the root, depth-first in child order.
    pub fn features(&self) -> impl Iterator<Item = &Feature> {
        self.tree.iter().map(|(_, node)| node.feature())
    }

    pub fn feature_count(&self) -> usize {
        self.features().count()
    }

    pub fn attributes(&self) -> &AttributeStore {
        &self.attributes
    }

    pub(crate) fn attributes_mut(&mut self) -> &mut AttributeStore {
        &mut self.attributes
    }

    pub fn get_attribute<T: AttributeType>(&self, attribute: &Attribute<T>) -> Option<T> {
        self.attributes.get(attribute)
    }

    /// Explicit name, or `@<identifier>`.
    pub fn name(&self) -> String {
        self.attributes
            .get(&NAME)
            .unwrap_or_else(|| format!("@{}", self.identifier))
    }

    pub fn description(&self) -> Option<String> {
        self.attributes.get(&DESCRIPTION)
    }

    /// Tracked mutator for repeated use; every structural call it services
    /// rebuilds the cache.
    pub fn mutator(&mut self) -> Mutator<'_> {
        Mutator::per_call(self)
    }

    /// Runs `work` with a tracked mutator and rebuilds the cache once when it
    /// returns (or unwinds).
    pub fn mutate<R>(&mut self, work: impl FnOnce(&mut Mutator<'_>) -> R) -> R {
        let mut mutator = Mutator::batched(self);
        work(&mut mutator)
    }

    /// Runs `work`, which may edit the tree through untracked paths, then
    /// rebuilds the cache exactly once (also on unwind).
    ///
    /// While `work` runs, edits made through a [`FeatureTreeMutator`] keep a
    /// working index up to date, so lookups stay constant-time although the
    /// cache is stale.
    ///
    /// [`FeatureTreeMutator`]: crate::domain::FeatureTreeMutator
    pub fn run_internally<R>(&mut self, work: impl FnOnce(&mut FeatureModel) -> R) -> R {
        let owns_working = self.working.is_none();
        if owns_working {
            self.working = Some(self.working_index());
        }
        let guard = ReconcileOnDrop {
            model: self,
            owns_working,
        };
        work(&mut *guard.model)
    }

    fn working_index(&self) -> FeatureCache {
        if self.cache.is_current(&self.tree) {
            return self.cache.clone();
        }
        let mut index = FeatureCache::new();
        index.rebuild(&self.tree);
        index
    }

    /// True while the working index describes the tree.
    pub(crate) fn working_is_current(&self) -> bool {
        self.working
            .as_ref()
            .is_some_and(|working| working.is_current(&self.tree))
    }

    /// Patches the working index after adding `identifier`, if it was
    /// current before the edit.
    pub(crate) fn note_added(&mut self, identifier: Identifier, node: NodeId, was_current: bool) {
        if let (true, Some(working)) = (was_current, self.working.as_mut()) {
            working.record(identifier, node, &self.tree);
        }
    }

    /// Patches the working index after removing `identifier`, if it was
    /// current before the edit.
    pub(crate) fn note_removed(&mut self, identifier: &Identifier, was_current: bool) {
        if let (true, Some(working)) = (was_current, self.working.as_mut()) {
            working.forget(identifier, &self.tree);
        }
    }

    #[instrument(level = "trace", skip(self), fields(model = %self.identifier))]
    pub(crate) fn reconcile(&mut self) {
        self.cache.rebuild(&self.tree);
        if let Some(working) = self.working.as_mut() {
            working.clone_from(&self.cache);
        }
    }
}

struct ReconcileOnDrop<'a> {
    model: &'a mut FeatureModel,
    owns_working: bool,
}

impl Drop for ReconcileOnDrop<'_> {
    fn drop(&mut self) {
        if self.owns_working {
            self.model.working = None;
        }
        self.model.reconcile();
    }
}
