//! Feature: the payload carried by each tree node.

use crate::domain::attribute::{Attribute, AttributeStore, AttributeType, ABSTRACT, DESCRIPTION, HIDDEN, NAME};
use crate::domain::identifier::Identifier;
use crate::domain::tree::NodeId;

/// Domain object carried by a [`FeatureNode`](crate::domain::FeatureNode).
///
/// The identifier is fixed at creation. `model` names the owning model by
/// identifier only (lookup, never ownership); `node` is the handle of the
/// owning tree node and is set when the feature is placed into a tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    identifier: Identifier,
    model: Identifier,
    node: Option<NodeId>,
    attributes: AttributeStore,
}

impl Feature {
    pub fn new(identifier: Identifier, model: Identifier) -> Self {
        Self {
            identifier,
            model,
            node: None,
            attributes: AttributeStore::new(),
        }
    }

    pub fn identifier(&self) -> &Identifier {
        &self.identifier
    }

    /// Identifier of the model this feature was created for.
    pub fn model(&self) -> &Identifier {
        &self.model
    }

    /// Handle of the owning node; `None` while the feature is not in a tree.
    pub fn node(&self) -> Option<NodeId> {
        self.node
    }

    pub(crate) fn set_node(&mut self, node: NodeId) {
        self.node = Some(node);
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

    pub fn is_abstract(&self) -> bool {
        self.attributes.get(&ABSTRACT).unwrap_or(false)
    }

    pub fn is_hidden(&self) -> bool {
        self.attributes.get(&HIDDEN).unwrap_or(false)
    }
}
