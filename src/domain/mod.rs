//! Domain layer: the feature model and its editing operations
//!
//! This layer is independent of external concerns (no I/O, no config loading).

pub mod attribute;
pub mod cache;
pub mod error;
pub mod feature;
pub mod identifier;
pub mod model;
pub mod mutator;
pub mod outline;
pub mod tree;

pub use attribute::{Attribute, AttributeKey, AttributeStore, AttributeType, AttributeValue, ValueKind};
pub use cache::FeatureCache;
pub use error::{ErrorKind, ModelError, ModelResult};
pub use feature::Feature;
pub use identifier::{CounterFactory, Identifier, IdentifierFactory, UuidFactory};
pub use model::FeatureModel;
pub use mutator::{FeatureTreeMutator, Mutator, RawMutator};
pub use outline::{AttributeEntry, FeatureOutline};
pub use tree::{FeatureNode, FeatureTree, GroupType, NodeId};
