//! featmodel: feature models as an ordered tree of features.
//!
//! A [`FeatureModel`] owns the tree, an identifier factory, model-level
//! attributes and an identifier→node cache. Structural edits go through a
//! [`FeatureTreeMutator`]: the tracked [`Mutator`] keeps the cache in step
//! with the tree, the untracked [`RawMutator`] leaves reconciliation to
//! [`FeatureModel::run_internally`].

pub mod config;
pub mod domain;
pub mod errors;
pub mod logging;
pub mod tree_traits;
pub mod util;

pub use config::Settings;
pub use domain::{
    Attribute, AttributeStore, CounterFactory, Feature, FeatureModel, FeatureOutline, FeatureTree,
    FeatureTreeMutator, GroupType, Identifier, IdentifierFactory, ModelError, ModelResult, Mutator,
    NodeId, RawMutator, UuidFactory,
};
pub use errors::{SettingsError, SettingsResult};
