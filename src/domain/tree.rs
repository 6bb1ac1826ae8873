use std::fmt;

use generational_arena::{Arena, Index};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::domain::error::{ModelError, ModelResult};
use crate::domain::feature::Feature;
use crate::domain::identifier::Identifier;

/// Handle of a node in a [`FeatureTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(Index);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (slot, generation) = self.0.into_raw_parts();
        write!(f, "node#{slot}.{generation}")
    }
}

/// How the children of a node combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupType {
    #[default]
    And,
    Or,
    Alternative,
}

impl fmt::Display for GroupType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupType::And => write!(f, "and"),
            GroupType::Or => write!(f, "or"),
            GroupType::Alternative => write!(f, "alternative"),
        }
    }
}

/// Tree node in the arena-based feature hierarchy.
#[derive(Debug)]
pub struct FeatureNode {
    /// Payload, owned by the node
    feature: Feature,
    /// Parent node, None for the root and for detached nodes
    parent: Option<NodeId>,
    /// Children in display order
    children: Vec<NodeId>,
    /// Group type of the children; kept even when there are none
    group: GroupType,
}

impl FeatureNode {
    pub fn feature(&self) -> &Feature {
        &self.feature
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn group(&self) -> GroupType {
        self.group
    }

    pub fn is_and(&self) -> bool {
        self.group == GroupType::And
    }

    pub fn is_or(&self) -> bool {
        self.group == GroupType::Or
    }

    pub fn is_alternative(&self) -> bool {
        self.group == GroupType::Alternative
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }
}

/// Arena-based feature tree.
///
/// Nodes and their features live in a single generational arena; parent and
/// child links are [`NodeId`] handles, so there are no reference cycles and
/// navigation stays O(1). Exactly one node, the root, has no parent once every
/// operation has finished. Detached nodes only exist between
/// [`insert_detached`](Self::insert_detached) and the insert that attaches
/// them, or until they are [discarded](Self::discard).
#[derive(Debug)]
pub struct FeatureTree {
    arena: Arena<FeatureNode>,
    root: NodeId,
    /// Bumped on every topology change
    revision: u64,
}

impl FeatureTree {
    pub fn new(root_feature: Feature) -> Self {
        let mut arena = Arena::new();
        let root = NodeId(arena.insert_with(|index| Self::new_node(root_feature, NodeId(index))));
        Self {
            arena,
            root,
            revision: 0,
        }
    }

    fn new_node(mut feature: Feature, id: NodeId) -> FeatureNode {
        feature.set_node(id);
        FeatureNode {
            feature,
            parent: None,
            children: Vec::new(),
            group: GroupType::default(),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn root_feature(&self) -> &Feature {
        &self.arena[self.root.0].feature
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Number of live nodes, detached ones included.
    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    pub fn node(&self, id: NodeId) -> Option<&FeatureNode> {
        self.arena.get(id.0)
    }

    fn node_mut(&mut self, id: NodeId) -> ModelResult<&mut FeatureNode> {
        self.arena.get_mut(id.0).ok_or(ModelError::NodeNotFound(id))
    }

    pub fn feature(&self, id: NodeId) -> Option<&Feature> {
        self.node(id).map(FeatureNode::feature)
    }

    pub(crate) fn feature_mut(&mut self, id: NodeId) -> Option<&mut Feature> {
        self.arena.get_mut(id.0).map(|node| &mut node.feature)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.arena.contains(id.0)
    }

    /// True if `id` is live and reachable from the root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node_id) = current {
            if node_id == self.root {
                return true;
            }
            current = self.node(node_id).and_then(FeatureNode::parent);
        }
        false
    }

    /// Adds a parentless node carrying `feature`.
    #[instrument(level = "trace", skip(self, feature), fields(feature = %feature.identifier()))]
    pub fn insert_detached(&mut self, feature: Feature) -> NodeId {
        NodeId(self.arena.insert_with(|index| Self::new_node(feature, NodeId(index))))
    }

    /// Inserts `child` into the children of `parent` at `index`.
    ///
    /// `child` must not have a parent, must not be the root and must not be
    /// an ancestor of `parent`; `index` may equal the child count (append).
    #[instrument(level = "trace", skip(self))]
    pub fn insert_child_at(&mut self, parent: NodeId, child: NodeId, index: usize) -> ModelResult<()> {
        let len = self.node(parent).ok_or(ModelError::NodeNotFound(parent))?.child_count();
        let child_node = self.node(child).ok_or(ModelError::NodeNotFound(child))?;
        if child_node.parent.is_some() || child == self.root {
            return Err(ModelError::AlreadyAttached(child));
        }
        if index > len {
            return Err(ModelError::IndexOutOfRange { index, len });
        }
        if self.ancestors_inclusive(parent).any(|ancestor| ancestor == child) {
            return Err(ModelError::CycleDetected(child));
        }

        self.node_mut(child)?.parent = Some(parent);
        self.node_mut(parent)?.children.insert(index, child);
        self.revision += 1;
        Ok(())
    }

    /// Creates a node for `feature` as child of `parent` at `index`.
    ///
    /// The new node has no descendants, so it cannot close a cycle and no
    /// ancestor walk is done.
    #[instrument(level = "trace", skip(self, feature), fields(feature = %feature.identifier()))]
    pub fn insert_new_child_at(&mut self, parent: NodeId, feature: Feature, index: usize) -> ModelResult<NodeId> {
        let len = self.node(parent).ok_or(ModelError::NodeNotFound(parent))?.child_count();
        if index > len {
            return Err(ModelError::IndexOutOfRange { index, len });
        }

        let child = NodeId(self.arena.insert_with(|slot| Self::new_node(feature, NodeId(slot))));
        self.node_mut(child)?.parent = Some(parent);
        self.node_mut(parent)?.children.insert(index, child);
        self.revision += 1;
        Ok(child)
    }

    /// Detaches and returns the child of `parent` at `index`.
    #[instrument(level = "trace", skip(self))]
    pub fn remove_child_at(&mut self, parent: NodeId, index: usize) -> ModelResult<NodeId> {
        let parent_node = self.node_mut(parent)?;
        let len = parent_node.children.len();
        if index >= len {
            return Err(ModelError::IndexOutOfRange { index, len });
        }
        let child = parent_node.children.remove(index);
        self.node_mut(child)?.parent = None;
        self.revision += 1;
        Ok(child)
    }

    /// Detaches `child` from `parent`, returning its former index.
    #[instrument(level = "trace", skip(self))]
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> ModelResult<usize> {
        let index = self
            .index_of(parent, child)
            .ok_or(ModelError::NotAChild { parent, child })?;
        self.remove_child_at(parent, index)?;
        Ok(index)
    }

    pub fn index_of(&self, parent: NodeId, child: NodeId) -> Option<usize> {
        self.node(parent)?.children.iter().position(|&c| c == child)
    }

    /// Position of `id` among its parent's children.
    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.index_of(parent, id)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id)?.parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(FeatureNode::children).unwrap_or(&[])
    }

    pub fn has_children(&self, id: NodeId) -> bool {
        self.node(id).is_some_and(FeatureNode::has_children)
    }

    pub fn child_count(&self, id: NodeId) -> usize {
        self.node(id).map_or(0, FeatureNode::child_count)
    }

    pub fn group(&self, id: NodeId) -> Option<GroupType> {
        self.node(id).map(FeatureNode::group)
    }

    /// Overwrites the group type. Child count is not validated.
    #[instrument(level = "trace", skip(self))]
    pub fn set_group(&mut self, id: NodeId, group: GroupType) -> ModelResult<()> {
        self.node_mut(id)?.group = group;
        Ok(())
    }

    pub fn set_and(&mut self, id: NodeId) -> ModelResult<()> {
        self.set_group(id, GroupType::And)
    }

    pub fn set_or(&mut self, id: NodeId) -> ModelResult<()> {
        self.set_group(id, GroupType::Or)
    }

    pub fn set_alternative(&mut self, id: NodeId) -> ModelResult<()> {
        self.set_group(id, GroupType::Alternative)
    }

    /// Frees a detached node and everything below it, returning its feature.
    #[instrument(level = "trace", skip(self))]
    pub fn discard(&mut self, id: NodeId) -> ModelResult<Feature> {
        let node = self.node(id).ok_or(ModelError::NodeNotFound(id))?;
        if node.parent.is_some() || id == self.root {
            return Err(ModelError::AlreadyAttached(id));
        }

        let mut pending = node.children.clone();
        while let Some(descendant) = pending.pop() {
            if let Some(removed) = self.arena.remove(descendant.0) {
                pending.extend(removed.children);
            }
        }
        let removed = self.arena.remove(id.0).ok_or(ModelError::NodeNotFound(id))?;
        self.revision += 1;
        Ok(removed.feature)
    }

    /// Node carrying `identifier`, found by a full pre-order walk.
    pub fn find(&self, identifier: &Identifier) -> Option<NodeId> {
        self.iter()
            .find(|(_, node)| node.feature.identifier() == identifier)
            .map(|(id, _)| id)
    }

    fn ancestors_inclusive(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(Some(id), move |&current| self.parent(current))
    }

    /// Pre-order walk from the root, children in order.
    pub fn iter(&self) -> TreeIterator<'_> {
        TreeIterator::new(self)
    }

    pub fn iter_postorder(&self) -> PostOrderIterator<'_> {
        PostOrderIterator::new(self)
    }

    /// Number of levels below and including the root.
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut pending = vec![(self.root, 1)];
        while let Some((id, level)) = pending.pop() {
            deepest = deepest.max(level);
            pending.extend(self.children(id).iter().map(|&child| (child, level + 1)));
        }
        deepest
    }
}

pub struct TreeIterator<'a> {
    tree: &'a FeatureTree,
    stack: Vec<NodeId>,
}

impl<'a> TreeIterator<'a> {
    fn new(tree: &'a FeatureTree) -> Self {
        Self {
            tree,
            stack: vec![tree.root()],
        }
    }
}

impl<'a> Iterator for TreeIterator<'a> {
    type Item = (NodeId, &'a FeatureNode);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(current) = self.stack.pop() {
            if let Some(node) = self.tree.node(current) {
                // Push children in reverse order for left-to-right traversal
                self.stack.extend(node.children.iter().rev());
                return Some((current, node));
            }
        }
        None
    }
}

pub struct PostOrderIterator<'a> {
    tree: &'a FeatureTree,
    stack: Vec<(NodeId, bool)>,
}

impl<'a> PostOrderIterator<'a> {
    fn new(tree: &'a FeatureTree) -> Self {
        Self {
            tree,
            stack: vec![(tree.root(), false)],
        }
    }
}

impl<'a> Iterator for PostOrderIterator<'a> {
    type Item = (NodeId, &'a FeatureNode);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((current, visited)) = self.stack.pop() {
            if let Some(node) = self.tree.node(current) {
                if visited {
                    return Some((current, node));
                }
                self.stack.push((current, true));
                self.stack
                    .extend(node.children.iter().rev().map(|&child| (child, false)));
            }
        }
        None
    }
}
