//! Text rendering of feature trees via termtree.

use std::fmt;

use termtree::Tree;

use crate::domain::{FeatureModel, FeatureTree};

pub trait ToTermTree {
    fn to_term_tree(&self) -> Tree<String>;
}

impl ToTermTree for FeatureTree {
    fn to_term_tree(&self) -> Tree<String> {
        // Post-order: a node's children are the last trees finished before it.
        let mut finished: Vec<Tree<String>> = Vec::new();
        for (_, node) in self.iter_postorder() {
            let first_child = finished.len().saturating_sub(node.child_count());
            let leaves = finished.split_off(first_child);
            let label = format!("{} [{}]", node.feature().name(), node.group());
            finished.push(Tree::new(label).with_leaves(leaves));
        }
        finished.pop().unwrap_or_else(|| Tree::new(String::new()))
    }
}

impl ToTermTree for FeatureModel {
    fn to_term_tree(&self) -> Tree<String> {
        self.tree().to_term_tree()
    }
}

impl fmt::Display for FeatureModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_term_tree())
    }
}
