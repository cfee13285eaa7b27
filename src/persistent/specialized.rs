//! Type-specialized storage for maps built once from literal entries.
//!
//! A builder starts with the narrowest storage that fits its first binding
//! and moves to a more general one whenever a binding does not fit. The
//! chain always ends with the generic item table, which accepts anything:
//!
//! ```text
//! IntInt ──> IntValue ──┐
//! TokenInt ──┐          │
//! TokenStr ──┼> TokenValue ──> Items
//! Record ────┘
//! ```
//!
//! Frozen storage answers lookups through its native index. The first
//! structural update converts it into a trie, which is cached.

use super::duplicates::MergeDuplicates;
use super::map::TrieMap;
use super::record::Record;
use super::table::{Fit, Table, Token};
use super::OnceSlot;
use crate::error::MapError;
use crate::value::{Key, Str, Value};

/// Storage of a builder or a frozen specialized map.
pub(crate) enum Specialized {
    /// Integer keys with integer values.
    IntInt(Table<i64, i64>),
    /// Integer keys with arbitrary values.
    IntValue(Table<i64, Value>),
    /// String keys with integer values.
    TokenInt(Table<Token, i64>),
    /// String keys with string values.
    TokenStr(Table<Token, Str>),
    /// String keys with arbitrary values.
    TokenValue(Table<Token, Value>),
    /// Arbitrary keys and values.
    Items(Table<Key, Value>),
    /// Fields of a fixed shape.
    Record(Record),
}

macro_rules! dispatch {
    ($storage:expr, $inner:ident => $body:expr) => {
        match $storage {
            Specialized::IntInt($inner) => $body,
            Specialized::IntValue($inner) => $body,
            Specialized::TokenInt($inner) => $body,
            Specialized::TokenStr($inner) => $body,
            Specialized::TokenValue($inner) => $body,
            Specialized::Items($inner) => $body,
            Specialized::Record($inner) => $body,
        }
    };
}

const fn is_token(key: &Key) -> bool {
    matches!(key, Key::String(_) | Key::UntypedAtomic(_))
}

impl Specialized {
    /// Returns the narrowest storage able to hold the given binding.
    pub(crate) fn narrowest(key: &Key, value: &Value, capacity: usize) -> Self {
        match key {
            Key::Integer(_) if value.as_integer().is_some() => Self::IntInt(Table::with_capacity(capacity)),
            Key::Integer(_) => Self::IntValue(Table::with_capacity(capacity)),
            Key::String(_) | Key::UntypedAtomic(_) => {
                if value.as_integer().is_some() {
                    Self::TokenInt(Table::with_capacity(capacity))
                } else if value.as_string().is_some() {
                    Self::TokenStr(Table::with_capacity(capacity))
                } else {
                    Self::TokenValue(Table::with_capacity(capacity))
                }
            }
            Key::Double(_) | Key::Boolean(_) => Self::Items(Table::with_capacity(capacity)),
        }
    }

    /// Returns an empty storage one step more general than this one that
    /// can take a binding with `key`.
    fn successor(&self, key: &Key) -> Self {
        let capacity = self.len() + 1;
        match self {
            Self::IntInt(_) if matches!(key, Key::Integer(_)) => {
                Self::IntValue(Table::with_capacity(capacity))
            }
            Self::TokenInt(_) | Self::TokenStr(_) | Self::Record(_) if is_token(key) => {
                Self::TokenValue(Table::with_capacity(capacity))
            }
            _ => Self::Items(Table::with_capacity(capacity)),
        }
    }

    /// Returns the name of this storage kind.
    pub(crate) const fn kind_name(&self) -> &'static str {
        match self {
            Self::IntInt(_) => "int-int",
            Self::IntValue(_) => "int-value",
            Self::TokenInt(_) => "string-int",
            Self::TokenStr(_) => "string-string",
            Self::TokenValue(_) => "string-value",
            Self::Items(_) => "items",
            Self::Record(_) => "record",
        }
    }

    pub(crate) fn len(&self) -> usize {
        dispatch!(self, inner => inner.len())
    }

    pub(crate) fn get(&self, key: &Key) -> Option<Value> {
        dispatch!(self, inner => inner.get(key))
    }

    pub(crate) fn contains(&self, key: &Key) -> bool {
        dispatch!(self, inner => inner.contains(key))
    }

    /// Adds a binding if it fits, leaving the storage unchanged otherwise.
    pub(crate) fn add(
        &mut self,
        key: &Key,
        value: &Value,
        policy: MergeDuplicates,
    ) -> Result<Fit, MapError> {
        dispatch!(self, inner => inner.add(key, value, policy))
    }

    /// Visits every binding in storage order.
    pub(crate) fn try_for_each<E, F>(&self, function: &mut F) -> Result<(), E>
    where
        F: FnMut(&Key, &Value) -> Result<(), E>,
    {
        dispatch!(self, inner => inner.try_for_each(function))
    }

    pub(crate) fn shrink_to_fit(&mut self) {
        dispatch!(self, inner => inner.shrink_to_fit());
    }

    /// Adds a binding, moving to more general storage until it fits.
    pub(crate) fn insert(
        &mut self,
        key: &Key,
        value: &Value,
        policy: MergeDuplicates,
    ) -> Result<(), MapError> {
        loop {
            match self.add(key, value, policy)? {
                Fit::Accepted => return Ok(()),
                Fit::Rejected => {
                    let promoted = self.promote(key);
                    tracing::trace!(
                        from = self.kind_name(),
                        to = promoted.kind_name(),
                        size = self.len(),
                        "promoting map builder storage"
                    );
                    *self = promoted;
                }
            }
        }
    }

    /// Copies every binding into a more general storage.
    fn promote(&self, key: &Key) -> Self {
        let mut target = self.successor(key);
        if self.copy_into(&mut target) {
            return target;
        }
        let mut items = Self::Items(Table::with_capacity(self.len() + 1));
        self.copy_into(&mut items);
        items
    }

    fn copy_into(&self, target: &mut Self) -> bool {
        self.try_for_each(&mut |key, value| {
            match target.add(key, value, MergeDuplicates::UseLast) {
                Ok(Fit::Accepted) => Ok(()),
                Ok(Fit::Rejected) | Err(_) => Err(()),
            }
        })
        .is_ok()
    }

    pub(crate) fn entries(&self) -> Vec<(Key, Value)> {
        let mut entries = Vec::with_capacity(self.len());
        let Ok(()) = self.try_for_each::<std::convert::Infallible, _>(&mut |key, value| {
            entries.push((key.clone(), value.clone()));
            Ok(())
        });
        entries
    }
}

// =============================================================================
// SpecializedMap
// =============================================================================

/// A frozen specialized storage with a lazily built trie.
pub(crate) struct SpecializedMap {
    storage: Specialized,
    trie: OnceSlot<TrieMap>,
}

impl SpecializedMap {
    pub(crate) fn new(mut storage: Specialized) -> Self {
        storage.shrink_to_fit();
        Self {
            storage,
            trie: OnceSlot::new(),
        }
    }

    #[inline]
    pub(crate) const fn storage(&self) -> &Specialized {
        &self.storage
    }

    /// Returns the trie holding the same bindings in storage order.
    pub(crate) fn trie(&self) -> &TrieMap {
        self.trie.get_or_init(|| {
            tracing::debug!(
                kind = self.storage.kind_name(),
                size = self.storage.len(),
                "converting specialized map to trie"
            );
            TrieMap::from_entries(self.storage.entries())
        })
    }

    #[cfg(test)]
    fn has_trie(&self) -> bool {
        self.trie.get().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistent::RecordShape;
    use crate::value::Item;
    use rstest::rstest;

    fn storage_for(entries: &[(Key, Value)]) -> Specialized {
        let (first_key, first_value) = &entries[0];
        let mut storage = Specialized::narrowest(first_key, first_value, entries.len());
        for (key, value) in entries {
            storage.insert(key, value, MergeDuplicates::Reject).unwrap();
        }
        storage
    }

    #[rstest]
    #[case(vec![(Key::from(1), Value::from(1)), (Key::from(2), Value::from(2))], "int-int")]
    #[case(vec![(Key::from(1), Value::from(1)), (Key::from(2), Value::from("x"))], "int-value")]
    #[case(vec![(Key::from("a"), Value::from(1)), (Key::untyped("b"), Value::from(2))], "string-int")]
    #[case(vec![(Key::from("a"), Value::from("x")), (Key::from("b"), Value::from("y"))], "string-string")]
    #[case(vec![(Key::from("a"), Value::from("x")), (Key::from("b"), Value::from(2))], "string-value")]
    #[case(vec![(Key::from("a"), Value::from(1)), (Key::from(2), Value::from(2))], "items")]
    #[case(vec![(Key::from(true), Value::from(1))], "items")]
    fn test_storage_kind(#[case] entries: Vec<(Key, Value)>, #[case] expected: &str) {
        let storage = storage_for(&entries);
        assert_eq!(storage.kind_name(), expected);
        assert_eq!(storage.len(), entries.len());
        for (key, value) in &entries {
            assert_eq!(storage.get(key).as_ref(), Some(value));
        }
    }

    #[rstest]
    fn test_promotion_preserves_order() {
        let entries = vec![
            (Key::from(3), Value::from(30)),
            (Key::from(1), Value::from(10)),
            (Key::from(2), Value::from_items([Item::from(1), Item::from(2)])),
            (Key::from("z"), Value::from(0)),
        ];
        let storage = storage_for(&entries);
        assert_eq!(storage.kind_name(), "items");
        let keys: Vec<Key> = storage.entries().into_iter().map(|(key, _)| key).collect();
        assert_eq!(keys, vec![Key::from(3), Key::from(1), Key::from(2), Key::from("z")]);
    }

    #[rstest]
    fn test_combine_promotes_integer_values() {
        let mut storage = storage_for(&[(Key::from(1), Value::from(1))]);
        storage
            .insert(&Key::from(1), &Value::from(2), MergeDuplicates::Combine)
            .unwrap();
        assert_eq!(storage.kind_name(), "int-value");
        assert_eq!(storage.get(&Key::from(1)).map(|value| value.len()), Some(2));
    }

    #[rstest]
    fn test_duplicate_detected_across_promotion() {
        let mut storage = storage_for(&[(Key::from(1), Value::from(1))]);
        let result = storage.insert(&Key::double(1.0).unwrap(), &Value::from(2), MergeDuplicates::Reject);
        assert_eq!(result, Err(MapError::DuplicateKey { key: Key::from(1) }));
    }

    #[rstest]
    fn test_record_promotes_on_foreign_field() {
        let shape = RecordShape::new(["a", "b"]).unwrap();
        let mut storage = Specialized::Record(Record::new(shape));
        storage.insert(&Key::from("a"), &Value::from(1), MergeDuplicates::Reject).unwrap();
        assert_eq!(storage.kind_name(), "record");
        storage.insert(&Key::from("c"), &Value::from(2), MergeDuplicates::Reject).unwrap();
        assert_eq!(storage.kind_name(), "string-value");
        storage.insert(&Key::from(4), &Value::from(3), MergeDuplicates::Reject).unwrap();
        assert_eq!(storage.kind_name(), "items");
        assert_eq!(storage.len(), 3);
    }

    #[rstest]
    fn test_trie_is_built_lazily() {
        let map = SpecializedMap::new(storage_for(&[
            (Key::from(1), Value::from(1)),
            (Key::from(2), Value::from(2)),
        ]));
        assert!(!map.has_trie());
        assert_eq!(map.storage().get(&Key::from(2)), Some(Value::from(2)));
        assert!(!map.has_trie());
        assert_eq!(map.trie().len(), 2);
        assert!(map.has_trie());
    }
}
