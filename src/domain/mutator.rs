//! Editing operations on a feature model.
//!
//! [`FeatureTreeMutator`] carries all edits as default methods over a single
//! capability, access to a `&mut FeatureModel`. Implementors only decide what
//! happens after a structural edit: [`Mutator`] rebuilds the cache,
//! [`RawMutator`] does nothing.

use tracing::{debug, instrument};

use crate::domain::attribute::{Attribute, AttributeType, DESCRIPTION, NAME};
use crate::domain::error::{ModelError, ModelResult};
use crate::domain::feature::Feature;
use crate::domain::identifier::Identifier;
use crate::domain::model::FeatureModel;
use crate::domain::tree::{GroupType, NodeId};

pub trait FeatureTreeMutator {
    /// The model being edited.
    fn mutable(&mut self) -> &mut FeatureModel;

    fn model(&self) -> &FeatureModel;

    /// Called after every successful structural edit.
    fn structure_changed(&mut self);

    /// Inserts `feature` as child of `parent` at `index`.
    fn add_feature_below_at(
        &mut self,
        feature: Feature,
        parent: &Identifier,
        index: usize,
    ) -> ModelResult<NodeId> {
        let node = add_below(self.mutable(), feature, parent, Some(index))?;
        self.structure_changed();
        Ok(node)
    }

    /// Appends `feature` as last child of `parent`.
    fn add_feature_below(&mut self, feature: Feature, parent: &Identifier) -> ModelResult<NodeId> {
        let node = add_below(self.mutable(), feature, parent, None)?;
        self.structure_changed();
        Ok(node)
    }

    /// Inserts `feature` directly after `sibling`.
    fn add_feature_next_to(&mut self, feature: Feature, sibling: &Identifier) -> ModelResult<NodeId> {
        let node = add_next_to(self.mutable(), feature, sibling)?;
        self.structure_changed();
        Ok(node)
    }

    fn create_feature_below_at(&mut self, parent: &Identifier, index: usize) -> ModelResult<Identifier> {
        let feature = self.model().new_feature();
        let identifier = *feature.identifier();
        self.add_feature_below_at(feature, parent, index)?;
        Ok(identifier)
    }

    fn create_feature_below(&mut self, parent: &Identifier) -> ModelResult<Identifier> {
        let feature = self.model().new_feature();
        let identifier = *feature.identifier();
        self.add_feature_below(feature, parent)?;
        Ok(identifier)
    }

    fn create_feature_next_to(&mut self, sibling: &Identifier) -> ModelResult<Identifier> {
        let feature = self.model().new_feature();
        let identifier = *feature.identifier();
        self.add_feature_next_to(feature, sibling)?;
        Ok(identifier)
    }

    /// Removes `feature`, moving its children into its place.
    fn remove_feature(&mut self, feature: &Identifier) -> ModelResult<()> {
        remove(self.mutable(), feature)?;
        self.structure_changed();
        Ok(())
    }

    fn set_group(&mut self, feature: &Identifier, group: GroupType) -> ModelResult<()> {
        let model = self.mutable();
        let node = resolve(model, feature)?;
        model.tree_mut().set_group(node, group)
    }

    fn set_attribute<T: AttributeType>(&mut self, attribute: &Attribute<T>, value: T) -> Option<T> {
        self.mutable().attributes_mut().set(attribute, value)
    }

    fn remove_attribute<T: AttributeType>(&mut self, attribute: &Attribute<T>) -> Option<T> {
        self.mutable().attributes_mut().remove(attribute)
    }

    fn set_name(&mut self, name: impl Into<String>) -> Option<String> {
        self.set_attribute(&NAME, name.into())
    }

    fn set_description(&mut self, description: impl Into<String>) -> Option<String> {
        self.set_attribute(&DESCRIPTION, description.into())
    }

    fn set_feature_attribute<T: AttributeType>(
        &mut self,
        feature: &Identifier,
        attribute: &Attribute<T>,
        value: T,
    ) -> ModelResult<Option<T>> {
        Ok(feature_mut(self.mutable(), feature)?
            .attributes_mut()
            .set(attribute, value))
    }

    fn remove_feature_attribute<T: AttributeType>(
        &mut self,
        feature: &Identifier,
        attribute: &Attribute<T>,
    ) -> ModelResult<Option<T>> {
        Ok(feature_mut(self.mutable(), feature)?
            .attributes_mut()
            .remove(attribute))
    }
}

/// Tracked mutator handed out by [`FeatureModel::mutator`] and
/// [`FeatureModel::mutate`].
///
/// Per-call mutators rebuild the cache after each structural edit. Batched
/// mutators rebuild once, when dropped.
pub struct Mutator<'a> {
    model: &'a mut FeatureModel,
    batched: bool,
}

impl<'a> Mutator<'a> {
    pub(crate) fn per_call(model: &'a mut FeatureModel) -> Self {
        Self { model, batched: false }
    }

    pub(crate) fn batched(model: &'a mut FeatureModel) -> Self {
        Self { model, batched: true }
    }
}

impl FeatureTreeMutator for Mutator<'_> {
    fn mutable(&mut self) -> &mut FeatureModel {
        &mut *self.model
    }

    fn model(&self) -> &FeatureModel {
        &*self.model
    }

    fn structure_changed(&mut self) {
        if !self.batched {
            self.model.reconcile();
        }
    }
}

impl Drop for Mutator<'_> {
    fn drop(&mut self) {
        if self.batched {
            self.model.reconcile();
        }
    }
}

/// Untracked mutator. Edits the tree exactly like [`Mutator`] but never
/// touches the cache; wrap its use in [`FeatureModel::run_internally`] to get
/// a single rebuild at the end.
pub struct RawMutator<'a> {
    model: &'a mut FeatureModel,
}

impl<'a> RawMutator<'a> {
    pub fn new(model: &'a mut FeatureModel) -> Self {
        Self { model }
    }
}

impl FeatureTreeMutator for RawMutator<'_> {
    fn mutable(&mut self) -> &mut FeatureModel {
        &mut *self.model
    }

    fn model(&self) -> &FeatureModel {
        &*self.model
    }

    fn structure_changed(&mut self) {}
}

fn resolve(model: &FeatureModel, identifier: &Identifier) -> ModelResult<NodeId> {
    model
        .node_of(identifier)
        .ok_or(ModelError::FeatureNotFound(*identifier))
}

fn feature_mut<'m>(model: &'m mut FeatureModel, identifier: &Identifier) -> ModelResult<&'m mut Feature> {
    let node = resolve(model, identifier)?;
    model
        .tree_mut()
        .feature_mut(node)
        .ok_or(ModelError::NodeNotFound(node))
}

#[instrument(level = "trace", skip(model, feature), fields(feature = %feature.identifier()))]
fn add_below(
    model: &mut FeatureModel,
    feature: Feature,
    parent: &Identifier,
    index: Option<usize>,
) -> ModelResult<NodeId> {
    if model.has_feature(feature.identifier()) {
        return Err(ModelError::FeatureAlreadyPresent(*feature.identifier()));
    }
    let parent_node = resolve(model, parent)?;
    let index = index.unwrap_or_else(|| model.tree().child_count(parent_node));
    attach(model, feature, parent_node, index)
}

#[instrument(level = "trace", skip(model, feature), fields(feature = %feature.identifier()))]
fn add_next_to(model: &mut FeatureModel, feature: Feature, sibling: &Identifier) -> ModelResult<NodeId> {
    if model.has_feature(feature.identifier()) {
        return Err(ModelError::FeatureAlreadyPresent(*feature.identifier()));
    }
    let sibling_node = resolve(model, sibling)?;
    let tree = model.tree();
    let parent_node = tree
        .parent(sibling_node)
        .ok_or(ModelError::RootHasNoSiblings(*sibling))?;
    let index = tree
        .index_of(parent_node, sibling_node)
        .ok_or(ModelError::NotAChild {
            parent: parent_node,
            child: sibling_node,
        })?;
    attach(model, feature, parent_node, index + 1)
}

/// Places `feature` in a new node under `parent`. Fails before touching the
/// tree if `index` is out of range.
fn attach(model: &mut FeatureModel, feature: Feature, parent: NodeId, index: usize) -> ModelResult<NodeId> {
    let identifier = *feature.identifier();
    let tracking = model.working_is_current();
    let node = model.tree_mut().insert_new_child_at(parent, feature, index)?;
    model.note_added(identifier, node, tracking);
    Ok(node)
}

/// Group type a parent takes over when its only child is removed.
fn collapsed_group(removed: GroupType) -> GroupType {
    match removed {
        GroupType::And => GroupType::And,
        GroupType::Alternative => GroupType::Alternative,
        GroupType::Or => GroupType::Or,
    }
}

#[instrument(level = "debug", skip(model))]
fn remove(model: &mut FeatureModel, feature: &Identifier) -> ModelResult<()> {
    let node = resolve(model, feature)?;
    if node == model.root() {
        return Err(ModelError::RootRemoval(*feature));
    }
    let tracking = model.working_is_current();

    let tree = model.tree_mut();
    let parent = tree.parent(node).ok_or(ModelError::RootRemoval(*feature))?;

    if tree.child_count(parent) == 1 {
        let group = tree.group(node).ok_or(ModelError::NodeNotFound(node))?;
        tree.set_group(parent, collapsed_group(group))?;
    }

    // Last to first, always at the removed node's index: keeps the children's order.
    let index = tree
        .index_of(parent, node)
        .ok_or(ModelError::NotAChild { parent, child: node })?;
    while tree.has_children(node) {
        let last = tree.child_count(node) - 1;
        let child = tree.remove_child_at(node, last)?;
        tree.insert_child_at(parent, child, index)?;
    }

    tree.remove_child(parent, node)?;
    let removed = tree.discard(node)?;
    // Moved children keep their node handles; only the removed entry changes.
    model.note_removed(removed.identifier(), tracking);
    debug!(feature = %removed.identifier(), "removed feature");
    Ok(())
}
