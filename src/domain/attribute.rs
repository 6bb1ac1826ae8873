//! Typed attributes and the store that holds their values.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;

use serde::{Deserialize, Serialize};

use crate::domain::error::{ModelError, ModelResult};

/// Namespace of the attributes this crate defines itself.
pub const NAMESPACE: &str = "featmodel";

/// Display name of a model or feature.
pub const NAME: Attribute<String> = Attribute::new(NAMESPACE, "name");
/// Free-text description of a model or feature.
pub const DESCRIPTION: Attribute<String> = Attribute::new(NAMESPACE, "description");
/// Abstract features carry no implementation of their own.
pub const ABSTRACT: Attribute<bool> = Attribute::with_default(NAMESPACE, "abstract", false);
/// Hidden features are not offered to users during configuration.
pub const HIDDEN: Attribute<bool> = Attribute::with_default(NAMESPACE, "hidden", false);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Bool,
    Integer,
    Float,
    Text,
}

/// Untyped attribute value as stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl AttributeValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            AttributeValue::Bool(_) => ValueKind::Bool,
            AttributeValue::Integer(_) => ValueKind::Integer,
            AttributeValue::Float(_) => ValueKind::Float,
            AttributeValue::Text(_) => ValueKind::Text,
        }
    }
}

/// Rust types that can be stored as attribute values.
pub trait AttributeType: Clone + 'static {
    const KIND: ValueKind;

    fn into_value(self) -> AttributeValue;

    fn from_value(value: &AttributeValue) -> Option<Self>;
}

impl AttributeType for bool {
    const KIND: ValueKind = ValueKind::Bool;

    fn into_value(self) -> AttributeValue {
        AttributeValue::Bool(self)
    }

    fn from_value(value: &AttributeValue) -> Option<Self> {
        match value {
            AttributeValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl AttributeType for i64 {
    const KIND: ValueKind = ValueKind::Integer;

    fn into_value(self) -> AttributeValue {
        AttributeValue::Integer(self)
    }

    fn from_value(value: &AttributeValue) -> Option<Self> {
        match value {
            AttributeValue::Integer(i) => Some(*i),
            _ => None,
        }
    }
}

impl AttributeType for f64 {
    const KIND: ValueKind = ValueKind::Float;

    fn into_value(self) -> AttributeValue {
        AttributeValue::Float(self)
    }

    fn from_value(value: &AttributeValue) -> Option<Self> {
        match value {
            AttributeValue::Float(x) => Some(*x),
            _ => None,
        }
    }
}

impl AttributeType for String {
    const KIND: ValueKind = ValueKind::Text;

    fn into_value(self) -> AttributeValue {
        AttributeValue::Text(self)
    }

    fn from_value(value: &AttributeValue) -> Option<Self> {
        match value {
            AttributeValue::Text(s) => Some(s.clone()),
            _ => None,
        }
    }
}

/// Identity of an attribute: namespace, name and value type together.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AttributeKey {
    namespace: Cow<'static, str>,
    name: Cow<'static, str>,
    kind: ValueKind,
}

impl AttributeKey {
    pub fn new(
        namespace: impl Into<Cow<'static, str>>,
        name: impl Into<Cow<'static, str>>,
        kind: ValueKind,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            kind,
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ValueKind {
        self.kind
    }
}

impl fmt::Display for AttributeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.name)
    }
}

/// Typed attribute key with an optional default value.
#[derive(Debug, Clone)]
pub struct Attribute<T> {
    key: AttributeKey,
    default: Option<T>,
    _type: PhantomData<fn() -> T>,
}

impl<T: AttributeType> Attribute<T> {
    pub const fn new(namespace: &'static str, name: &'static str) -> Self {
        Self {
            key: AttributeKey {
                namespace: Cow::Borrowed(namespace),
                name: Cow::Borrowed(name),
                kind: T::KIND,
            },
            default: None,
            _type: PhantomData,
        }
    }

    pub const fn with_default(namespace: &'static str, name: &'static str, default: T) -> Self {
        Self {
            key: AttributeKey {
                namespace: Cow::Borrowed(namespace),
                name: Cow::Borrowed(name),
                kind: T::KIND,
            },
            default: Some(default),
            _type: PhantomData,
        }
    }

    /// Attribute with a runtime namespace and name.
    pub fn named(namespace: impl Into<Cow<'static, str>>, name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            key: AttributeKey::new(namespace, name, T::KIND),
            default: None,
            _type: PhantomData,
        }
    }

    pub fn defaulting_to(mut self, default: T) -> Self {
        self.default = Some(default);
        self
    }

    pub fn key(&self) -> &AttributeKey {
        &self.key
    }

    pub fn default_value(&self) -> Option<&T> {
        self.default.as_ref()
    }
}

/// Values explicitly set on one entity. Defaults are never materialized.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeStore {
    values: BTreeMap<AttributeKey, AttributeValue>,
}

impl AttributeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored value, else the attribute's default, else `None`.
    pub fn get<T: AttributeType>(&self, attribute: &Attribute<T>) -> Option<T> {
        self.values
            .get(&attribute.key)
            .and_then(T::from_value)
            .or_else(|| attribute.default.clone())
    }

    /// Stores `value`, returning the previously stored one.
    pub fn set<T: AttributeType>(&mut self, attribute: &Attribute<T>, value: T) -> Option<T> {
        self.values
            .insert(attribute.key.clone(), value.into_value())
            .as_ref()
            .and_then(T::from_value)
    }

    pub fn remove<T: AttributeType>(&mut self, attribute: &Attribute<T>) -> Option<T> {
        self.values
            .remove(&attribute.key)
            .as_ref()
            .and_then(T::from_value)
    }

    pub fn contains<T: AttributeType>(&self, attribute: &Attribute<T>) -> bool {
        self.values.contains_key(&attribute.key)
    }

    /// Untyped insert; the value must match the key's declared kind.
    pub fn set_value(&mut self, key: AttributeKey, value: AttributeValue) -> ModelResult<()> {
        if key.kind != value.kind() {
            return Err(ModelError::InvalidArgument(format!(
                "attribute {} expects {:?}, got {:?}",
                key,
                key.kind,
                value.kind()
            )));
        }
        self.values.insert(key, value);
        Ok(())
    }

    pub fn to_map(&self) -> &BTreeMap<AttributeKey, AttributeValue> {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
