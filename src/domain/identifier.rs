//! Identifiers and the factories that issue them.
//!
//! A factory hands out identifiers that never collide within its lineage.
//! [`IdentifierFactory::scoped`] derives a factory for a nested object graph
//! (e.g. a sub-model) that still cannot collide with the parent's identifiers.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque, comparable name of one entity within a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Identifier {
    Counter(u64),
    Uuid(Uuid),
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identifier::Counter(value) => write!(f, "{value}"),
            Identifier::Uuid(value) => write!(f, "{}", value.hyphenated()),
        }
    }
}

/// Issues identifiers.
///
/// Factories are single-owner objects: they use `Cell` for their state and
/// are not meant to be shared across threads.
pub trait IdentifierFactory: fmt::Debug {
    /// Issues a fresh identifier and advances the factory.
    fn next(&self) -> Identifier;

    /// Returns what [`next`](Self::next) would issue, without advancing.
    fn peek_next(&self) -> Identifier;

    /// Derives a factory whose identifiers never collide with this lineage.
    fn scoped(&self) -> Box<dyn IdentifierFactory>;
}

/// Sequential counter. Scoped factories share the counter.
#[derive(Debug, Clone)]
pub struct CounterFactory {
    counter: Rc<Cell<u64>>,
}

impl Default for CounterFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl CounterFactory {
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    pub fn starting_at(first: u64) -> Self {
        Self {
            counter: Rc::new(Cell::new(first)),
        }
    }
}

impl IdentifierFactory for CounterFactory {
    fn next(&self) -> Identifier {
        let current = self.counter.get();
        let advanced = current
            .checked_add(1)
            .unwrap_or_else(|| panic!("identifier space exhausted after {current}"));
        self.counter.set(advanced);
        Identifier::Counter(current)
    }

    fn peek_next(&self) -> Identifier {
        Identifier::Counter(self.counter.get())
    }

    fn scoped(&self) -> Box<dyn IdentifierFactory> {
        Box::new(self.clone())
    }
}

/// Random v4 UUIDs. The next value is drawn ahead of time so `peek_next`
/// is exact.
#[derive(Debug)]
pub struct UuidFactory {
    upcoming: Cell<Uuid>,
}

impl Default for UuidFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl UuidFactory {
    pub fn new() -> Self {
        Self {
            upcoming: Cell::new(Uuid::new_v4()),
        }
    }
}

impl IdentifierFactory for UuidFactory {
    fn next(&self) -> Identifier {
        Identifier::Uuid(self.upcoming.replace(Uuid::new_v4()))
    }

    fn peek_next(&self) -> Identifier {
        Identifier::Uuid(self.upcoming.get())
    }

    fn scoped(&self) -> Box<dyn IdentifierFactory> {
        Box::new(UuidFactory::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_counter_when_peeking_then_does_not_advance() {
        let factory = CounterFactory::new();
        assert_eq!(factory.peek_next(), Identifier::Counter(1));
        assert_eq!(factory.peek_next(), Identifier::Counter(1));
        assert_eq!(factory.next(), Identifier::Counter(1));
        assert_eq!(factory.peek_next(), Identifier::Counter(2));
    }

    #[test]
    fn given_scoped_counter_when_issuing_then_shares_lineage() {
        let factory = CounterFactory::starting_at(10);
        let scoped = factory.scoped();
        assert_eq!(factory.next(), Identifier::Counter(10));
        assert_eq!(scoped.next(), Identifier::Counter(11));
        assert_eq!(factory.peek_next(), Identifier::Counter(12));
    }

    #[test]
    #[should_panic(expected = "identifier space exhausted")]
    fn given_counter_at_max_when_issuing_then_panics() {
        let factory = CounterFactory::starting_at(u64::MAX);
        factory.next();
    }

    #[test]
    fn given_uuid_factory_when_peeking_then_next_matches() {
        let factory = UuidFactory::new();
        let peeked = factory.peek_next();
        assert_eq!(factory.next(), peeked);
        assert_ne!(factory.next(), peeked);
    }

    #[test]
    fn given_identifiers_when_displayed_then_renders_plain_value() {
        assert_eq!(Identifier::Counter(42).to_string(), "42");
        let uuid = Uuid::nil();
        assert_eq!(
            Identifier::Uuid(uuid).to_string(),
            "00000000-0000-0000-0000-000000000000"
        );
    }
}
