//! Ordered, serializable description of a feature tree.
//!
//! This is the hand-off point for import/export code: the crate produces and
//! consumes outlines but does not pick a file format for them.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::domain::attribute::{Attribute, AttributeKey, AttributeType, AttributeValue};
use crate::domain::error::{ModelError, ModelResult};
use crate::domain::feature::Feature;
use crate::domain::identifier::{Identifier, IdentifierFactory};
use crate::domain::model::FeatureModel;
use crate::domain::tree::{FeatureNode, GroupType, NodeId};

/// One explicitly set attribute of an outlined feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeEntry {
    pub namespace: String,
    pub name: String,
    pub value: AttributeValue,
}

/// A feature and, recursively, its children in order.
///
/// Dropping and comparing outlines works level by level without recursion;
/// the derived `Clone`, `Debug` and serde impls recurse once per level.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeatureOutline {
    /// Missing identifiers are issued by the importing model's factory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<Identifier>,
    #[serde(default)]
    pub group: GroupType,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<AttributeEntry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<FeatureOutline>,
}

impl FeatureOutline {
    pub fn new(group: GroupType) -> Self {
        Self {
            identifier: None,
            group,
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_identifier(mut self, identifier: Identifier) -> Self {
        self.identifier = Some(identifier);
        self
    }

    pub fn with_attribute<T: AttributeType>(mut self, attribute: &Attribute<T>, value: T) -> Self {
        self.attributes.push(AttributeEntry {
            namespace: attribute.key().namespace().to_string(),
            name: attribute.key().name().to_string(),
            value: value.into_value(),
        });
        self
    }

    pub fn with_child(mut self, child: FeatureOutline) -> Self {
        self.children.push(child);
        self
    }

    /// Number of features described, this one included.
    pub fn feature_count(&self) -> usize {
        let mut count = 0;
        let mut pending = vec![self];
        while let Some(entry) = pending.pop() {
            count += 1;
            pending.extend(entry.children.iter());
        }
        count
    }
}

impl PartialEq for FeatureOutline {
    fn eq(&self, other: &Self) -> bool {
        let mut pending = vec![(self, other)];
        while let Some((left, right)) = pending.pop() {
            if left.identifier != right.identifier
                || left.group != right.group
                || left.attributes != right.attributes
                || left.children.len() != right.children.len()
            {
                return false;
            }
            pending.extend(left.children.iter().zip(right.children.iter()));
        }
        true
    }
}

impl Drop for FeatureOutline {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut entry) = pending.pop() {
            pending.append(&mut entry.children);
        }
    }
}

impl FeatureModel {
    /// Describes the tree depth-first, children in order.
    pub fn outline(&self) -> FeatureOutline {
        // Post-order: a node's children are the last entries finished before it.
        let mut finished: Vec<FeatureOutline> = Vec::new();
        for (_, node) in self.tree().iter_postorder() {
            let first_child = finished.len().saturating_sub(node.child_count());
            let children = finished.split_off(first_child);
            finished.push(outline_entry(node, children));
        }
        finished.pop().unwrap_or_default()
    }

    /// Builds a model whose tree is equivalent to `outline`.
    ///
    /// The model identifier comes from `factory`, as do identifiers of
    /// features the outline leaves unnamed; neither ever repeats an explicit
    /// identifier of the outline. Duplicate identifiers are rejected. The
    /// tree is assembled through the untracked path and the cache rebuilt
    /// once at the end.
    #[instrument(level = "debug", skip_all, fields(features = outline.feature_count()))]
    pub fn from_outline(factory: Box<dyn IdentifierFactory>, outline: &FeatureOutline) -> ModelResult<Self> {
        let explicit = collect_identifiers(outline)?;

        let identifier = issue_identifier(factory.as_ref(), &explicit);
        let root = outline_feature(outline, identifier, factory.as_ref(), &explicit)?;
        let mut model = FeatureModel::assemble(identifier, factory, root);

        model.run_internally(|model| -> ModelResult<()> {
            let root = model.root();
            model.tree_mut().set_group(root, outline.group)?;

            let mut pending: Vec<(&FeatureOutline, NodeId)> =
                outline.children.iter().rev().map(|child| (child, root)).collect();
            while let Some((entry, parent)) = pending.pop() {
                let feature = outline_feature(entry, identifier, model.identifier_factory(), &explicit)?;
                let tree = model.tree_mut();
                let index = tree.child_count(parent);
                let node = tree.insert_new_child_at(parent, feature, index)?;
                tree.set_group(node, entry.group)?;
                pending.extend(entry.children.iter().rev().map(|child| (child, node)));
            }
            Ok(())
        })?;

        debug!(model = %model.identifier(), features = model.feature_cache().len(), "imported outline");
        Ok(model)
    }
}

fn outline_entry(node: &FeatureNode, children: Vec<FeatureOutline>) -> FeatureOutline {
    let feature = node.feature();
    FeatureOutline {
        identifier: Some(*feature.identifier()),
        group: node.group(),
        attributes: feature
            .attributes()
            .to_map()
            .iter()
            .map(|(key, value)| AttributeEntry {
                namespace: key.namespace().to_string(),
                name: key.name().to_string(),
                value: value.clone(),
            })
            .collect(),
        children,
    }
}

fn collect_identifiers(outline: &FeatureOutline) -> ModelResult<HashSet<Identifier>> {
    let mut seen = HashSet::new();
    let mut pending = vec![outline];
    while let Some(entry) = pending.pop() {
        if let Some(identifier) = entry.identifier {
            if !seen.insert(identifier) {
                return Err(ModelError::FeatureAlreadyPresent(identifier));
            }
        }
        pending.extend(entry.children.iter());
    }
    Ok(seen)
}

/// Next identifier from `factory` that the outline does not name itself.
fn issue_identifier(factory: &dyn IdentifierFactory, explicit: &HashSet<Identifier>) -> Identifier {
    let mut issued = factory.next();
    while explicit.contains(&issued) {
        issued = factory.next();
    }
    issued
}

/// Feature for one outline entry.
fn outline_feature(
    outline: &FeatureOutline,
    model: Identifier,
    factory: &dyn IdentifierFactory,
    explicit: &HashSet<Identifier>,
) -> ModelResult<Feature> {
    let identifier = outline
        .identifier
        .unwrap_or_else(|| issue_identifier(factory, explicit));

    let mut feature = Feature::new(identifier, model);
    for entry in &outline.attributes {
        if entry.name.is_empty() {
            return Err(ModelError::InvalidArgument(format!(
                "attribute without name on feature {identifier}"
            )));
        }
        let key = AttributeKey::new(entry.namespace.clone(), entry.name.clone(), entry.value.kind());
        feature.attributes_mut().set_value(key, entry.value.clone())?;
    }
    Ok(feature)
}
