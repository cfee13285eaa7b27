//! The persistent map value.
//!
//! [`XqMap`] wraps one of four representations:
//!
//! - the empty map
//! - a single binding, stored inline
//! - a trie root plus a key-order tracker
//! - a specialized table frozen out of a [`MapBuilder`](super::MapBuilder)
//!
//! All of them expose the same behavior. A specialized map converts to a
//! trie (once, cached) on its first structural update or its first
//! [`XqMap::hash32`]; lookups and traversal never convert.
//!
//! # Examples
//!
//! ```rust
//! use xqmap::{Key, MergeDuplicates, Value, XqMap};
//!
//! let first: XqMap = [(Key::from("a"), Value::from(1)), (Key::from("b"), Value::from(2))]
//!     .into_iter()
//!     .collect();
//! let second: XqMap = [(Key::from("b"), Value::from(3)), (Key::from("c"), Value::from(4))]
//!     .into_iter()
//!     .collect();
//!
//! let merged = first.add_all(&second, MergeDuplicates::UseLast).unwrap();
//! assert_eq!(merged.get(&Key::from("b")), Value::from(3));
//! assert_eq!(
//!     merged.keys().collect::<Vec<_>>(),
//!     vec![Key::from("a"), Key::from("b"), Key::from("c")]
//! );
//! ```

use std::borrow::{Borrow, Cow};
use std::convert::Infallible;
use std::fmt;
use std::hash::{Hash, Hasher};

use super::ReferenceCounter;
use super::duplicates::MergeDuplicates;
use super::key_order::KeyOrder;
use super::merge::merge;
use super::node::{TrieNode, entry_hash};
use super::specialized::SpecializedMap;
use crate::error::MapError;
use crate::value::{CodepointCollation, Collation, Key, Value};

// =============================================================================
// TrieMap
// =============================================================================

/// A trie root with the logical order of its keys.
///
/// Holds at least two bindings when wrapped by an [`XqMap`]. The cached
/// conversion of a single-binding specialized map may hold fewer; updates
/// of it are unwrapped through `Repr::from_trie`.
#[derive(Clone)]
pub(crate) struct TrieMap {
    root: TrieNode,
    order: ReferenceCounter<KeyOrder>,
}

impl TrieMap {
    /// Builds a trie from bindings with distinct keys, in order.
    pub(crate) fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (Key, Value)>,
    {
        let mut root = TrieNode::Empty;
        let mut keys = Vec::new();
        for (key, value) in entries {
            let (next, added) = root.put(key.hash32(), key.clone(), value, 0);
            if added {
                keys.push(key);
            }
            root = next;
        }
        Self {
            root,
            order: ReferenceCounter::new(KeyOrder::from_keys(keys)),
        }
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.root.size()
    }

    fn get(&self, key: &Key) -> Option<&Value> {
        self.root.get(key.hash32(), key, 0)
    }

    /// Returns `None` if the map would not change.
    fn put(&self, key: Key, value: Value) -> Option<Self> {
        let (root, added) = self.root.put(key.hash32(), key.clone(), value, 0);
        if root.ptr_eq(&self.root) {
            return None;
        }
        let order = if added {
            ReferenceCounter::new(self.order.add(key))
        } else {
            self.order.clone()
        };
        Some(Self { root, order })
    }

    /// Returns `None` if the key is not bound.
    fn remove(&self, key: &Key) -> Option<Repr> {
        let root = self.root.delete(key.hash32(), key, 0);
        if root.ptr_eq(&self.root) {
            return None;
        }
        Some(Repr::from_root(root, || {
            ReferenceCounter::new(self.order.remove(key.clone()))
        }))
    }

    /// Visits every binding in logical order, reporting the stored key.
    ///
    /// `NaN` keys never match a lookup; the n-th ordered `NaN` key stands
    /// for the n-th `NaN` binding of its bucket.
    fn try_for_each<E, F>(&self, function: &mut F) -> Result<(), E>
    where
        F: FnMut(&Key, &Value) -> Result<(), E>,
    {
        let mut unmatched = None;
        self.order.keys().iter().try_for_each(|key| {
            let entry = if key.is_nan() {
                unmatched
                    .get_or_insert_with(|| self.nan_entries(key.hash32()))
                    .next()
            } else {
                self.root.get_entry(key.hash32(), key, 0)
            };
            match entry {
                Some((stored, value)) => function(stored, value),
                None => Ok(()),
            }
        })
    }

    fn nan_entries(&self, hash: u32) -> std::vec::IntoIter<(&Key, &Value)> {
        let mut entries = self.root.bucket(hash, 0);
        entries.retain(|(key, _)| key.is_nan());
        entries.into_iter()
    }
}

// =============================================================================
// XqMap Definition
// =============================================================================

#[derive(Clone)]
enum Repr {
    Empty,
    Single(Key, Value),
    Trie(ReferenceCounter<TrieMap>),
    Specialized(ReferenceCounter<SpecializedMap>),
}

impl Repr {
    /// Wraps a trie root, unwrapping roots with fewer than two bindings.
    fn from_root<F>(root: TrieNode, order: F) -> Self
    where
        F: FnOnce() -> ReferenceCounter<KeyOrder>,
    {
        match root.size() {
            0 => Self::Empty,
            1 => {
                let Err((key, value)) = root.try_for_each(&mut |key: &Key, value: &Value| {
                    Err((key.clone(), value.clone()))
                }) else {
                    return Self::Empty;
                };
                Self::Single(key, value)
            }
            _ => Self::Trie(ReferenceCounter::new(TrieMap {
                root,
                order: order(),
            })),
        }
    }

    /// Wraps a trie, unwrapping tries with fewer than two bindings.
    fn from_trie(trie: TrieMap) -> Self {
        let TrieMap { root, order } = trie;
        Self::from_root(root, || order)
    }
}

/// An immutable XQuery map value.
///
/// Every update returns a new map and leaves the receiver untouched; the new
/// version shares all unchanged structure with the old one. Keys follow the
/// XQuery "same key" relation (see [`Key`]), and iteration follows insertion
/// order.
///
/// `PartialEq` is deep equality under the code-point collation; `Hash` is
/// consistent with it.
///
/// # Examples
///
/// ```rust
/// use xqmap::{Key, Value, XqMap};
///
/// let map = XqMap::new()
///     .put(Key::from(1), Value::from("one"))
///     .put(Key::from(2), Value::from("two"));
///
/// assert_eq!(map.len(), 2);
/// assert_eq!(map.get(&Key::double(1.0).unwrap()), Value::from("one"));
///
/// let removed = map.remove(&Key::from(1));
/// assert_eq!(removed.len(), 1);
/// assert_eq!(map.len(), 2);
/// ```
#[derive(Clone)]
pub struct XqMap {
    repr: Repr,
}

#[cfg(feature = "arc")]
static_assertions::assert_impl_all!(XqMap: Send, Sync);

impl XqMap {
    /// Creates an empty map.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use xqmap::XqMap;
    ///
    /// let map = XqMap::new();
    /// assert!(map.is_empty());
    /// ```
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self { repr: Repr::Empty }
    }

    /// Creates a map with a single binding.
    #[inline]
    #[must_use]
    pub const fn singleton(key: Key, value: Value) -> Self {
        Self {
            repr: Repr::Single(key, value),
        }
    }

    pub(crate) fn from_specialized(map: SpecializedMap) -> Self {
        Self {
            repr: Repr::Specialized(ReferenceCounter::new(map)),
        }
    }

    /// Returns the number of bindings.
    ///
    /// # Complexity
    ///
    /// O(1)
    #[must_use]
    pub fn len(&self) -> usize {
        match &self.repr {
            Repr::Empty => 0,
            Repr::Single(..) => 1,
            Repr::Trie(trie) => trie.len(),
            Repr::Specialized(map) => map.storage().len(),
        }
    }

    /// Returns `true` if the map has no bindings.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        matches!(self.repr, Repr::Empty)
    }

    /// Returns the value bound to `key`, if any.
    ///
    /// # Complexity
    ///
    /// O(log32 N)
    #[must_use]
    pub fn lookup(&self, key: &Key) -> Option<Value> {
        match &self.repr {
            Repr::Empty => None,
            Repr::Single(existing, value) => existing.same_key(key).then(|| value.clone()),
            Repr::Trie(trie) => trie.get(key).cloned(),
            Repr::Specialized(map) => map.storage().get(key),
        }
    }

    /// Returns the value bound to `key`, or the empty sequence.
    #[must_use]
    pub fn get(&self, key: &Key) -> Value {
        self.lookup(key).unwrap_or_default()
    }

    /// Returns `true` if `key` is bound.
    #[must_use]
    pub fn contains(&self, key: &Key) -> bool {
        match &self.repr {
            Repr::Empty => false,
            Repr::Single(existing, _) => existing.same_key(key),
            Repr::Trie(trie) => trie.get(key).is_some(),
            Repr::Specialized(map) => map.storage().contains(key),
        }
    }

    /// Returns a map with `key` bound to `value`.
    ///
    /// A new key is appended to the key order; replacing the value of a
    /// bound key keeps its position. Putting the identical key and value
    /// instance returns a map sharing everything with the receiver.
    ///
    /// # Complexity
    ///
    /// O(log32 N)
    ///
    /// # Examples
    ///
    /// ```rust
    /// use xqmap::{Key, Value, XqMap};
    ///
    /// let map = XqMap::new()
    ///     .put(Key::from("k1"), Value::from(1))
    ///     .put(Key::from("k2"), Value::from(2))
    ///     .put(Key::from("k1"), Value::from(3));
    ///
    /// assert_eq!(map.keys().collect::<Vec<_>>(), vec![Key::from("k1"), Key::from("k2")]);
    /// assert_eq!(map.get(&Key::from("k1")), Value::from(3));
    /// ```
    #[must_use]
    pub fn put(&self, key: Key, value: Value) -> Self {
        let repr = match &self.repr {
            Repr::Empty => Repr::Single(key, value),
            Repr::Single(existing, old) if existing.same_key(&key) => {
                if old.ptr_eq(&value) && existing.is_identical(&key) {
                    return self.clone();
                }
                Repr::Single(key, value)
            }
            Repr::Single(existing, old) => Repr::Trie(ReferenceCounter::new(TrieMap::from_entries([
                (existing.clone(), old.clone()),
                (key, value),
            ]))),
            Repr::Trie(trie) => match trie.put(key, value) {
                Some(trie) => Repr::Trie(ReferenceCounter::new(trie)),
                None => return self.clone(),
            },
            Repr::Specialized(map) => match map.trie().put(key, value) {
                Some(trie) => Repr::from_trie(trie),
                None => return self.clone(),
            },
        };
        Self { repr }
    }

    /// Returns a map without `key`. Returns the receiver if `key` is not
    /// bound.
    ///
    /// # Complexity
    ///
    /// O(log32 N)
    #[must_use]
    pub fn remove(&self, key: &Key) -> Self {
        let removed = match &self.repr {
            Repr::Empty => None,
            Repr::Single(existing, _) => existing.same_key(key).then_some(Repr::Empty),
            Repr::Trie(trie) => trie.remove(key),
            Repr::Specialized(map) => {
                if map.storage().contains(key) {
                    map.trie().remove(key)
                } else {
                    None
                }
            }
        };
        removed.map_or_else(|| self.clone(), |repr| Self { repr })
    }

    /// Returns the trie form of this map, building it for single bindings.
    fn to_trie(&self) -> Cow<'_, TrieMap> {
        match &self.repr {
            Repr::Empty => Cow::Owned(TrieMap::from_entries([])),
            Repr::Single(key, value) => {
                Cow::Owned(TrieMap::from_entries([(key.clone(), value.clone())]))
            }
            Repr::Trie(trie) => Cow::Borrowed(trie.as_ref()),
            Repr::Specialized(map) => Cow::Borrowed(map.trie()),
        }
    }

    /// Merges `other` into this map.
    ///
    /// Keys of `other` that are not bound in `self` are appended in the
    /// order of `other`. Keys bound in both are resolved by `policy`.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::DuplicateKey`] under [`MergeDuplicates::Reject`]
    /// if a key is bound in both maps.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use xqmap::{Key, MapError, MergeDuplicates, Value, XqMap};
    ///
    /// let first = XqMap::singleton(Key::from("a"), Value::from(1));
    /// let second = XqMap::singleton(Key::from("a"), Value::from(2));
    ///
    /// let combined = first.add_all(&second, MergeDuplicates::Combine).unwrap();
    /// assert_eq!(combined.get(&Key::from("a")).len(), 2);
    ///
    /// let rejected = first.add_all(&second, MergeDuplicates::Reject);
    /// assert_eq!(rejected.err(), Some(MapError::DuplicateKey { key: Key::from("a") }));
    /// ```
    pub fn add_all(&self, other: &Self, policy: MergeDuplicates) -> Result<Self, MapError> {
        if other.is_empty() {
            return Ok(self.clone());
        }
        if self.is_empty() {
            return Ok(other.clone());
        }
        let left = self.to_trie();
        let right = other.to_trie();
        let root = merge(&left.root, &right.root, 0, policy)?;
        if root.ptr_eq(&left.root) {
            return Ok(self.clone());
        }
        let repr = Repr::from_root(root, || {
            let appended = right
                .order
                .keys()
                .iter()
                .filter(|key| !left.root.contains(key.hash32(), key, 0))
                .cloned()
                .collect::<Vec<_>>();
            ReferenceCounter::new(left.order.append(appended))
        });
        Ok(Self { repr })
    }

    /// Merges a sequence of maps from left to right, starting with the
    /// empty map.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::DuplicateKey`] under [`MergeDuplicates::Reject`]
    /// if a key is bound in more than one map.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use xqmap::{Key, MergeDuplicates, Value, XqMap};
    ///
    /// let maps = [
    ///     XqMap::singleton(Key::from(1), Value::from("a")),
    ///     XqMap::singleton(Key::from(2), Value::from("b")),
    ///     XqMap::singleton(Key::from(1), Value::from("c")),
    /// ];
    /// let merged = XqMap::merge_all(&maps, MergeDuplicates::UseLast).unwrap();
    /// assert_eq!(merged.len(), 2);
    /// assert_eq!(merged.get(&Key::from(1)), Value::from("c"));
    /// ```
    pub fn merge_all<I, M>(maps: I, policy: MergeDuplicates) -> Result<Self, MapError>
    where
        I: IntoIterator<Item = M>,
        M: Borrow<Self>,
    {
        maps.into_iter()
            .try_fold(Self::new(), |merged, map| merged.add_all(map.borrow(), policy))
    }

    // =========================================================================
    // Traversal
    // =========================================================================

    /// Visits every binding in order, stopping at the first error.
    ///
    /// # Errors
    ///
    /// Returns the first error returned by `function`.
    pub fn try_for_each<E, F>(&self, mut function: F) -> Result<(), E>
    where
        F: FnMut(&Key, &Value) -> Result<(), E>,
    {
        match &self.repr {
            Repr::Empty => Ok(()),
            Repr::Single(key, value) => function(key, value),
            Repr::Trie(trie) => trie.try_for_each(&mut function),
            Repr::Specialized(map) => map.storage().try_for_each(&mut function),
        }
    }

    /// Visits every binding in order.
    pub fn for_each<F>(&self, mut function: F)
    where
        F: FnMut(&Key, &Value),
    {
        let Ok(()) = self.try_for_each::<Infallible, _>(|key, value| {
            function(key, value);
            Ok(())
        });
    }

    /// Returns `true` if every binding satisfies `predicate`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use xqmap::{Key, Value, XqMap};
    ///
    /// let map: XqMap = (1..=3).map(|n| (Key::from(n), Value::from(n * 2))).collect();
    /// assert!(map.test(|_, value| value.as_integer().is_some_and(|n| n % 2 == 0)));
    /// assert!(!map.test(|key, _| *key != Key::from(2)));
    /// ```
    pub fn test<P>(&self, mut predicate: P) -> bool
    where
        P: FnMut(&Key, &Value) -> bool,
    {
        self.try_for_each(|key, value| if predicate(key, value) { Ok(()) } else { Err(()) })
            .is_ok()
    }

    /// Returns an iterator over the bindings in order.
    pub fn iter(&self) -> XqMapIterator {
        let mut entries = Vec::with_capacity(self.len());
        self.for_each(|key, value| entries.push((key.clone(), value.clone())));
        XqMapIterator {
            entries: entries.into_iter(),
        }
    }

    /// Returns an iterator over the keys in order.
    pub fn keys(&self) -> impl Iterator<Item = Key> + use<> {
        self.iter().map(|(key, _)| key)
    }

    /// Returns an iterator over the values in key order.
    pub fn values(&self) -> impl Iterator<Item = Value> + use<> {
        self.iter().map(|(_, value)| value)
    }

    // =========================================================================
    // Equality and hashing
    // =========================================================================

    /// Compares two maps for deep equality.
    ///
    /// Both maps must have the same keys; values bound to the same key must
    /// be deep-equal under `collation`. Key order is irrelevant.
    #[must_use]
    pub fn deep_equal(&self, other: &Self, collation: &dyn Collation) -> bool {
        if self.len() != other.len() {
            return false;
        }
        match (&self.repr, &other.repr) {
            (Repr::Trie(left), Repr::Trie(right)) => left.root.deep(&right.root, collation),
            _ => self.test(|key, value| {
                other
                    .lookup(key)
                    .is_some_and(|found| value.deep_equal(&found, collation))
            }),
        }
    }

    /// Returns the 32-bit hash of this map, independent of key order.
    ///
    /// The hash follows the trie layout, so a specialized map builds and
    /// caches its trie on the first call.
    #[must_use]
    pub fn hash32(&self) -> u32 {
        match &self.repr {
            Repr::Empty => 0,
            Repr::Single(key, value) => entry_hash(key, value),
            Repr::Trie(trie) => trie.root.hash(),
            Repr::Specialized(map) => map.trie().root.hash(),
        }
    }

    /// Returns the name of the current internal representation.
    ///
    /// One of `"empty"`, `"single"`, `"trie"` or the name of a specialized
    /// storage such as `"int-int"` or `"record"`. Intended for diagnostics.
    #[must_use]
    pub fn representation(&self) -> &'static str {
        match &self.repr {
            Repr::Empty => "empty",
            Repr::Single(..) => "single",
            Repr::Trie(_) => "trie",
            Repr::Specialized(map) => map.storage().kind_name(),
        }
    }

    /// Checks the internal invariants of this map.
    ///
    /// # Errors
    ///
    /// Returns a description of the first violated invariant.
    #[doc(hidden)]
    pub fn verify(&self) -> Result<(), String> {
        let Repr::Trie(trie) = &self.repr else {
            return Ok(());
        };
        if trie.len() < 2 {
            return Err(format!("trie map with {} bindings", trie.len()));
        }
        trie.root.verify(0, &mut Vec::new())?;
        let keys = trie.order.keys();
        if keys.len() != trie.len() {
            return Err(format!(
                "{} ordered keys for {} bindings",
                keys.len(),
                trie.len()
            ));
        }
        if let Some(key) = keys.iter().find(|key| !key.is_nan() && trie.get(key).is_none()) {
            return Err(format!("ordered key {key} is not bound"));
        }
        let ordered_nans = keys.iter().filter(|key| key.is_nan()).count();
        let mut bound_nans = 0;
        trie.root.for_each(&mut |key: &Key, _: &Value| {
            if key.is_nan() {
                bound_nans += 1;
            }
        });
        if ordered_nans == bound_nans {
            Ok(())
        } else {
            Err(format!(
                "{ordered_nans} ordered NaN keys for {bound_nans} NaN bindings"
            ))
        }
    }
}

// =============================================================================
// Iterator Implementation
// =============================================================================

/// An iterator over the bindings of an [`XqMap`], in order.
pub struct XqMapIterator {
    entries: std::vec::IntoIter<(Key, Value)>,
}

impl Iterator for XqMapIterator {
    type Item = (Key, Value);

    fn next(&mut self) -> Option<Self::Item> {
        self.entries.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.entries.size_hint()
    }
}

impl ExactSizeIterator for XqMapIterator {
    fn len(&self) -> usize {
        self.entries.len()
    }
}

impl DoubleEndedIterator for XqMapIterator {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.entries.next_back()
    }
}

// =============================================================================
// Standard Trait Implementations
// =============================================================================

impl Default for XqMap {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl IntoIterator for XqMap {
    type Item = (Key, Value);
    type IntoIter = XqMapIterator;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl IntoIterator for &XqMap {
    type Item = (Key, Value);
    type IntoIter = XqMapIterator;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl PartialEq for XqMap {
    fn eq(&self, other: &Self) -> bool {
        self.deep_equal(other, &CodepointCollation)
    }
}

impl Eq for XqMap {}

impl Hash for XqMap {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u32(self.hash32());
    }
}

impl fmt::Debug for XqMap {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = formatter.debug_map();
        self.for_each(|key, value| {
            map.entry(key, value);
        });
        map.finish()
    }
}

// =============================================================================
// Serde Support
// =============================================================================

#[cfg(feature = "serde")]
impl serde::Serialize for XqMap {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeMap;

        let mut map = serializer.serialize_map(Some(self.len()))?;
        self.try_for_each(|key, value| map.serialize_entry(key, value))?;
        map.end()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistent::MapBuilder;
    use crate::value::AsciiCaseInsensitiveCollation;
    use rstest::rstest;

    fn int_map(keys: impl IntoIterator<Item = i64>) -> XqMap {
        keys.into_iter().fold(XqMap::new(), |map, key| {
            map.put(Key::from(key), Value::from(key * 10))
        })
    }

    fn key_list(map: &XqMap) -> Vec<Key> {
        map.keys().collect()
    }

    #[rstest]
    fn test_representation_grows_and_shrinks() {
        let empty = XqMap::new();
        let single = empty.put(Key::from(1), Value::from(1));
        let trie = single.put(Key::from(2), Value::from(2));
        assert_eq!(empty.representation(), "empty");
        assert_eq!(single.representation(), "single");
        assert_eq!(trie.representation(), "trie");
        assert_eq!(trie.remove(&Key::from(1)).representation(), "single");
        assert_eq!(single.remove(&Key::from(1)).representation(), "empty");
    }

    #[rstest]
    fn test_put_identical_value_is_noop() {
        let value = Value::from("shared");
        let map = int_map(0..5).put(Key::from(9), value.clone());
        let again = map.put(Key::from(9), value);
        let (Repr::Trie(left), Repr::Trie(right)) = (&map.repr, &again.repr) else {
            panic!("expected trie maps");
        };
        assert!(ReferenceCounter::ptr_eq(left, right));
    }

    #[rstest]
    fn test_remove_absent_shares_receiver() {
        let map = int_map(0..5);
        let same = map.remove(&Key::from(42));
        let (Repr::Trie(left), Repr::Trie(right)) = (&map.repr, &same.repr) else {
            panic!("expected trie maps");
        };
        assert!(ReferenceCounter::ptr_eq(left, right));
    }

    #[rstest]
    fn test_replacement_keeps_position() {
        let map = int_map([3, 1, 2]).put(Key::from(1), Value::from(0));
        assert_eq!(key_list(&map), vec![Key::from(3), Key::from(1), Key::from(2)]);
        assert!(map.verify().is_ok());
    }

    #[rstest]
    fn test_iteration_reports_stored_key() {
        let map = XqMap::new()
            .put(Key::from(1), Value::from("a"))
            .put(Key::from(2), Value::from("b"))
            .put(Key::double(1.0).unwrap(), Value::from("c"));
        let keys = key_list(&map);
        assert_eq!(keys.len(), 2);
        assert!(keys[0].is_identical(&Key::double(1.0).unwrap()));
    }

    #[rstest]
    fn test_remove_and_reinsert_moves_key_to_end() {
        let map = int_map([1, 2, 3])
            .remove(&Key::from(1))
            .put(Key::from(1), Value::from(1));
        assert_eq!(key_list(&map), vec![Key::from(2), Key::from(3), Key::from(1)]);
        assert!(map.verify().is_ok());
    }

    #[rstest]
    fn test_specialized_map_converts_on_update() {
        let map: XqMap = (0..10).map(|n| (Key::from(n), Value::from(n))).collect();
        assert_eq!(map.representation(), "int-int");
        let updated = map.put(Key::from("x"), Value::from(1));
        assert_eq!(updated.representation(), "trie");
        assert_eq!(map.representation(), "int-int");
        assert_eq!(updated.len(), 11);
        assert_eq!(key_list(&updated).last(), Some(&Key::from("x")));
        assert!(updated.verify().is_ok());
    }

    #[rstest]
    fn test_specialized_remove_of_absent_key_does_not_convert() {
        let map: XqMap = (0..3).map(|n| (Key::from(n), Value::from(n))).collect();
        assert_eq!(map.remove(&Key::from(99)).representation(), "int-int");
        assert_eq!(map.remove(&Key::from(1)).representation(), "trie");
    }

    #[rstest]
    fn test_single_field_record_update_stays_single() {
        let shape = crate::persistent::RecordShape::new(["a"]).unwrap();
        let mut builder = MapBuilder::record(&shape);
        builder.put(Key::from("a"), Value::from(1));
        let map = builder.finish();
        assert_eq!(map.representation(), "record");

        let updated = map.put(Key::from("a"), Value::from(2));
        assert_eq!(updated.representation(), "single");
        assert_eq!(updated.get(&Key::from("a")), Value::from(2));
        assert!(updated.verify().is_ok());
    }

    #[rstest]
    fn test_nan_bindings_are_iterated_in_order() {
        let map = XqMap::new()
            .put(Key::from(1), Value::from("one"))
            .put(Key::Double(f64::NAN), Value::from("first"))
            .put(Key::from(2), Value::from("two"))
            .put(Key::Double(f64::NAN), Value::from("second"));
        assert_eq!(map.representation(), "trie");
        assert_eq!(map.len(), 4);
        assert_eq!(
            map.values().collect::<Vec<_>>(),
            vec![
                Value::from("one"),
                Value::from("first"),
                Value::from("two"),
                Value::from("second"),
            ]
        );
        assert!(map.verify().is_ok());
        assert_eq!(map.remove(&Key::Double(f64::NAN)).len(), 4);
    }

    #[rstest]
    fn test_add_all_appends_new_keys_in_other_order() {
        let left = int_map([5, 1]);
        let right = int_map([7, 1, 6]);
        let merged = left.add_all(&right, MergeDuplicates::UseFirst).unwrap();
        assert_eq!(
            key_list(&merged),
            vec![Key::from(5), Key::from(1), Key::from(7), Key::from(6)]
        );
        assert!(merged.verify().is_ok());
    }

    #[rstest]
    fn test_add_all_without_change_returns_receiver() {
        let left: XqMap = (0..4).map(|n| (Key::from(n), Value::from(n))).collect();
        let right = XqMap::singleton(Key::from(2), Value::from(99));
        let merged = left.add_all(&right, MergeDuplicates::UseFirst).unwrap();
        assert_eq!(merged.representation(), "int-int");
        assert_eq!(merged, left);
    }

    #[rstest]
    fn test_add_all_of_two_singletons_with_same_key() {
        let left = XqMap::singleton(Key::from("a"), Value::from(1));
        let right = XqMap::singleton(Key::from("a"), Value::from(2));
        let merged = left.add_all(&right, MergeDuplicates::UseLast).unwrap();
        assert_eq!(merged.representation(), "single");
        assert_eq!(merged.get(&Key::from("a")), Value::from(2));
    }

    #[rstest]
    fn test_deep_equal_ignores_order_and_representation() {
        let forward = int_map(0..20);
        let backward = int_map((0..20).rev());
        let mut builder = MapBuilder::new();
        for key in 0..20 {
            builder.put(Key::from(key), Value::from(key * 10));
        }
        let built = builder.finish();
        assert_eq!(forward, backward);
        assert_eq!(forward, built);
        assert_eq!(forward.hash32(), backward.hash32());
        assert_eq!(forward.hash32(), built.hash32());
    }

    #[rstest]
    fn test_deep_equal_with_collation() {
        let left = XqMap::singleton(Key::from(1), Value::from("Text"));
        let right = XqMap::singleton(Key::from(1), Value::from("tEXT"));
        assert!(left.deep_equal(&right, &AsciiCaseInsensitiveCollation));
        assert_ne!(left, right);
    }

    #[rstest]
    fn test_test_stops_at_first_failure() {
        let map = int_map(0..10);
        let mut visited = 0;
        assert!(!map.test(|key, _| {
            visited += 1;
            *key != Key::from(2)
        }));
        assert_eq!(visited, 3);
    }

    #[rstest]
    fn test_debug_lists_entries_in_order() {
        let map = int_map([2, 1]);
        assert_eq!(format!("{map:?}"), "{Integer(2): [Integer(20)], Integer(1): [Integer(10)]}");
    }
}
