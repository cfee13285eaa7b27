//! Insertion-ordered hash tables with a single key and value type.
//!
//! Specialized maps store their bindings in native form (`i64` keys, shared
//! strings, `i64` values) and convert to [`Key`] and [`Value`] only when a
//! binding is read.

use std::hash::{Hash, Hasher};

use rustc_hash::FxHashMap;

use super::duplicates::{MergeDuplicates, Winner};
use crate::error::MapError;
use crate::value::{Key, Str, Value, integral_i64};

/// Whether a specialization took a binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Fit {
    Accepted,
    /// The binding does not fit; the storage is unchanged.
    Rejected,
}

// =============================================================================
// Key and value kinds
// =============================================================================

/// Native key storage of a table.
pub(crate) trait SlotKey: Clone + Eq + Hash {
    /// Converts a key this table can store without changing its type.
    fn accept(key: &Key) -> Option<Self>;

    /// Converts a lookup key, normalizing it under the same-key relation.
    fn probe(key: &Key) -> Option<Self>;

    fn to_key(&self) -> Key;
}

/// Native value storage of a table.
pub(crate) trait SlotValue: Clone {
    fn accept(value: &Value) -> Option<Self>;

    fn to_value(&self) -> Value;
}

impl SlotKey for i64 {
    fn accept(key: &Key) -> Option<Self> {
        match key {
            Key::Integer(value) => Some(*value),
            _ => None,
        }
    }

    fn probe(key: &Key) -> Option<Self> {
        match key {
            Key::Integer(value) => Some(*value),
            Key::Double(value) => integral_i64(*value),
            _ => None,
        }
    }

    fn to_key(&self) -> Key {
        Key::Integer(*self)
    }
}

/// A string or untyped-atomic key, identified by its text.
#[derive(Clone, Debug)]
pub(crate) struct Token {
    text: Str,
    untyped: bool,
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.text == other.text
    }
}

impl Eq for Token {}

impl Hash for Token {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.text.hash(state);
    }
}

impl SlotKey for Token {
    fn accept(key: &Key) -> Option<Self> {
        match key {
            Key::String(text) => Some(Self {
                text: text.clone(),
                untyped: false,
            }),
            Key::UntypedAtomic(text) => Some(Self {
                text: text.clone(),
                untyped: true,
            }),
            _ => None,
        }
    }

    fn probe(key: &Key) -> Option<Self> {
        Self::accept(key)
    }

    fn to_key(&self) -> Key {
        if self.untyped {
            Key::UntypedAtomic(self.text.clone())
        } else {
            Key::String(self.text.clone())
        }
    }
}

impl SlotKey for Key {
    fn accept(key: &Key) -> Option<Self> {
        Some(key.clone())
    }

    fn probe(key: &Key) -> Option<Self> {
        Some(key.clone())
    }

    fn to_key(&self) -> Key {
        self.clone()
    }
}

impl SlotValue for i64 {
    fn accept(value: &Value) -> Option<Self> {
        value.as_integer()
    }

    fn to_value(&self) -> Value {
        Value::from(*self)
    }
}

impl SlotValue for Str {
    fn accept(value: &Value) -> Option<Self> {
        value.as_string().cloned()
    }

    fn to_value(&self) -> Value {
        Value::from(self.clone())
    }
}

impl SlotValue for Value {
    fn accept(value: &Value) -> Option<Self> {
        Some(value.clone())
    }

    fn to_value(&self) -> Value {
        self.clone()
    }
}

// =============================================================================
// Table
// =============================================================================

/// Bindings in insertion order plus a hash index into them.
pub(crate) struct Table<K, V> {
    entries: Vec<(K, V)>,
    index: FxHashMap<K, usize>,
}

impl<K: SlotKey, V: SlotValue> Table<K, V> {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            index: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
        }
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    fn position(&self, key: &Key) -> Option<usize> {
        K::probe(key).and_then(|probe| self.index.get(&probe).copied())
    }

    pub(crate) fn get(&self, key: &Key) -> Option<Value> {
        self.position(key)
            .map(|position| self.entries[position].1.to_value())
    }

    pub(crate) fn contains(&self, key: &Key) -> bool {
        self.position(key).is_some()
    }

    /// Adds a binding, resolving a bound key with `policy`.
    pub(crate) fn add(
        &mut self,
        key: &Key,
        value: &Value,
        policy: MergeDuplicates,
    ) -> Result<Fit, MapError> {
        let Some(slot_key) = K::accept(key) else {
            return Ok(Fit::Rejected);
        };
        let Some(&position) = self.index.get(&slot_key) else {
            let Some(slot_value) = V::accept(value) else {
                return Ok(Fit::Rejected);
            };
            self.index.insert(slot_key.clone(), self.entries.len());
            self.entries.push((slot_key, slot_value));
            return Ok(Fit::Accepted);
        };

        let (existing_key, existing_value) = &self.entries[position];
        let winner = policy.resolve(
            &existing_key.to_key(),
            &existing_value.to_value(),
            value,
        )?;
        let replacement = match winner {
            Winner::Left | Winner::Either => return Ok(Fit::Accepted),
            Winner::Right => V::accept(value).map(|slot_value| (slot_key, slot_value)),
            Winner::Combined(combined) => {
                V::accept(&combined).map(|slot_value| (existing_key.clone(), slot_value))
            }
        };
        match replacement {
            Some(entry) => {
                self.entries[position] = entry;
                Ok(Fit::Accepted)
            }
            None => Ok(Fit::Rejected),
        }
    }

    /// Visits every binding in insertion order.
    pub(crate) fn try_for_each<E, F>(&self, function: &mut F) -> Result<(), E>
    where
        F: FnMut(&Key, &Value) -> Result<(), E>,
    {
        self.entries
            .iter()
            .try_for_each(|(key, value)| function(&key.to_key(), &value.to_value()))
    }

    pub(crate) fn shrink_to_fit(&mut self) {
        self.entries.shrink_to_fit();
        self.index.shrink_to_fit();
    }
}
