//! Immutable item sequences bound to map keys.

use std::fmt;
use std::hash::{Hash, Hasher};

use super::{CodepointCollation, Collation, Item, Key, Str};
use crate::persistent::{ReferenceCounter, XqMap};

/// An immutable sequence of items.
///
/// Cloning a `Value` only bumps a reference count. The map engine treats
/// values as opaque apart from hashing, deep equality and concatenation.
///
/// # Examples
///
/// ```rust
/// use xqmap::value::{Item, Value};
///
/// let left = Value::from(1);
/// let right = Value::from_items([Item::from(2), Item::from(3)]);
/// let combined = left.concat(&right);
///
/// assert_eq!(combined.len(), 3);
/// assert_eq!(combined.to_string(), "(1, 2, 3)");
/// ```
#[derive(Clone)]
pub struct Value {
    items: ReferenceCounter<[Item]>,
}

impl Value {
    /// Creates the empty sequence.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            items: ReferenceCounter::from(Vec::new()),
        }
    }

    /// Creates a sequence holding a single item.
    #[must_use]
    pub fn singleton(item: Item) -> Self {
        Self {
            items: ReferenceCounter::from(vec![item]),
        }
    }

    /// Creates a sequence from items.
    #[must_use]
    pub fn from_items<I>(items: I) -> Self
    where
        I: IntoIterator<Item = Item>,
    {
        Self {
            items: items.into_iter().collect(),
        }
    }

    /// Returns the number of items.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` for the empty sequence.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns the items as a slice.
    #[inline]
    #[must_use]
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    /// Returns an iterator over the items.
    pub fn iter(&self) -> std::slice::Iter<'_, Item> {
        self.items.iter()
    }

    /// Returns the sequence of `self` followed by `other`.
    ///
    /// Concatenating with the empty sequence shares the other operand.
    #[must_use]
    pub fn concat(&self, other: &Self) -> Self {
        if other.is_empty() {
            return self.clone();
        }
        if self.is_empty() {
            return other.clone();
        }
        Self::from_items(self.iter().chain(other.iter()).cloned())
    }

    /// Returns `true` if both values share the same storage.
    #[inline]
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        ReferenceCounter::ptr_eq(&self.items, &other.items)
    }

    /// Returns the 32-bit hash of this sequence.
    #[must_use]
    pub fn hash32(&self) -> u32 {
        self.iter()
            .fold(1_u32, |hash, item| hash.wrapping_mul(31).wrapping_add(item.hash32()))
    }

    /// Compares two sequences item by item.
    #[must_use]
    pub fn deep_equal(&self, other: &Self, collation: &dyn Collation) -> bool {
        self.ptr_eq(other)
            || (self.len() == other.len()
                && self
                    .iter()
                    .zip(other.iter())
                    .all(|(left, right)| left.deep_equal(right, collation)))
    }

    /// Returns the integer if this is a single `xs:integer`.
    #[must_use]
    pub fn as_integer(&self) -> Option<i64> {
        match self.items() {
            [Item::Integer(value)] => Some(*value),
            _ => None,
        }
    }

    /// Returns the string if this is a single `xs:string`.
    #[must_use]
    pub fn as_string(&self) -> Option<&Str> {
        match self.items() {
            [Item::String(text)] => Some(text),
            _ => None,
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Self::empty()
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.deep_equal(other, &CodepointCollation)
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u32(self.hash32());
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_list().entries(self.iter()).finish()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.items() {
            [item] => fmt::Display::fmt(item, formatter),
            items => {
                formatter.write_str("(")?;
                for (index, item) in items.iter().enumerate() {
                    if index > 0 {
                        formatter.write_str(", ")?;
                    }
                    fmt::Display::fmt(item, formatter)?;
                }
                formatter.write_str(")")
            }
        }
    }
}

impl From<Item> for Value {
    fn from(item: Item) -> Self {
        Self::singleton(item)
    }
}

impl From<Key> for Value {
    fn from(key: Key) -> Self {
        Self::singleton(Item::from(key))
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::singleton(Item::Integer(value))
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::singleton(Item::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::singleton(Item::Double(value))
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::singleton(Item::Boolean(value))
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Self::singleton(Item::from(text))
    }
}

impl From<String> for Value {
    fn from(text: String) -> Self {
        Self::singleton(Item::from(text))
    }
}

impl From<Str> for Value {
    fn from(text: Str) -> Self {
        Self::singleton(Item::String(text))
    }
}

impl From<XqMap> for Value {
    fn from(map: XqMap) -> Self {
        Self::singleton(Item::Map(map))
    }
}

impl From<Vec<Item>> for Value {
    fn from(items: Vec<Item>) -> Self {
        Self {
            items: ReferenceCounter::from(items),
        }
    }
}

impl FromIterator<Item> for Value {
    fn from_iter<I: IntoIterator<Item = Item>>(iter: I) -> Self {
        Self::from_items(iter)
    }
}

impl<'a> IntoIterator for &'a Value {
    type Item = &'a Item;
    type IntoIter = std::slice::Iter<'a, Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeSeq;

        if let [item] = self.items() {
            return item.serialize(serializer);
        }
        let mut sequence = serializer.serialize_seq(Some(self.len()))?;
        for item in self.iter() {
            sequence.serialize_element(item)?;
        }
        sequence.end()
    }
}
