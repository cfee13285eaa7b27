//! Immutable hash array mapped trie nodes.
//!
//! The trie branches on successive 5-bit slices of the 32-bit key hash,
//! starting with the least significant bits at level 0. Nodes are shared
//! between map versions and never change after construction: every
//! operation returns either a new node or, if nothing changed, a clone of
//! the receiver (detectable with [`TrieNode::ptr_eq`]).

use std::convert::Infallible;

use smallvec::{SmallVec, smallvec};

use super::ReferenceCounter;
use crate::value::{Collation, Key, Value};

// =============================================================================
// Constants
// =============================================================================

/// Bits of the hash consumed per level.
pub(crate) const BITS_PER_LEVEL: u32 = 5;

/// Branching factor (2^5 = 32).
pub(crate) const KIDS: usize = 1 << BITS_PER_LEVEL;

/// Bit mask for extracting a slot from a shifted hash.
#[allow(clippy::cast_possible_truncation)]
const MASK: u32 = (KIDS - 1) as u32;

/// Extracts the slot of a hash at a given level.
///
/// Levels beyond the width of the hash always yield slot 0.
#[inline]
pub(crate) const fn slot(hash: u32, level: u32) -> usize {
    match hash.checked_shr(level * BITS_PER_LEVEL) {
        Some(shifted) => (shifted & MASK) as usize,
        None => 0,
    }
}

/// Hash of a single binding.
#[inline]
pub(crate) fn entry_hash(key: &Key, value: &Value) -> u32 {
    key.hash32().wrapping_mul(31).wrapping_add(value.hash32())
}

// =============================================================================
// Node Definition
// =============================================================================

/// A node of the trie.
#[derive(Clone, Default)]
pub(crate) enum TrieNode {
    /// No bindings.
    #[default]
    Empty,
    /// Exactly one binding.
    Leaf(ReferenceCounter<Leaf>),
    /// Two or more bindings whose keys share one full hash.
    List(ReferenceCounter<List>),
    /// Up to 32 non-empty children, indexed by hash slot.
    Branch(ReferenceCounter<Branch>),
}

pub(crate) struct Leaf {
    pub(crate) hash: u32,
    pub(crate) key: Key,
    pub(crate) value: Value,
}

pub(crate) struct List {
    pub(crate) hash: u32,
    pub(crate) entries: SmallVec<[(Key, Value); 2]>,
}

pub(crate) struct Branch {
    pub(crate) kids: [TrieNode; KIDS],
    /// Bit `i` is set iff `kids[i]` is not empty.
    pub(crate) used: u32,
    pub(crate) size: usize,
}

/// Outcome of resolving a key that is already bound.
pub(crate) enum Resolution {
    /// Keep the existing binding untouched.
    Keep,
    /// Replace the binding with a new key and value.
    Replace(Key, Value),
}

impl Branch {
    /// Creates a branch, deriving the used mask and the size from `kids`.
    pub(crate) fn new(kids: [TrieNode; KIDS]) -> Self {
        let (used, size) = kids
            .iter()
            .enumerate()
            .filter(|(_, kid)| !kid.is_empty())
            .fold((0_u32, 0_usize), |(used, size), (index, kid)| {
                (used | 1 << index, size + kid.size())
            });
        Self { kids, used, size }
    }

    /// Returns a copy of this branch with one child replaced.
    fn with_kid(&self, index: usize, kid: TrieNode) -> TrieNode {
        let size = self.size - self.kids[index].size() + kid.size();
        let used = if kid.is_empty() {
            self.used & !(1 << index)
        } else {
            self.used | 1 << index
        };
        let mut kids = self.kids.clone();
        kids[index] = kid;
        TrieNode::Branch(ReferenceCounter::new(Self { kids, used, size }))
    }
}

pub(crate) fn empty_kids() -> [TrieNode; KIDS] {
    std::array::from_fn(|_| TrieNode::Empty)
}

impl TrieNode {
    // =========================================================================
    // Constructors
    // =========================================================================

    pub(crate) fn leaf(hash: u32, key: Key, value: Value) -> Self {
        Self::Leaf(ReferenceCounter::new(Leaf { hash, key, value }))
    }

    fn list(hash: u32, entries: SmallVec<[(Key, Value); 2]>) -> Self {
        Self::List(ReferenceCounter::new(List { hash, entries }))
    }

    pub(crate) fn branch(kids: [TrieNode; KIDS]) -> Self {
        Self::Branch(ReferenceCounter::new(Branch::new(kids)))
    }

    /// Builds the branch separating two nodes with different hashes,
    /// descending while both hashes share a slot.
    fn split(level: u32, first: Self, first_hash: u32, second: Self, second_hash: u32) -> Self {
        let first_slot = slot(first_hash, level);
        let second_slot = slot(second_hash, level);
        let mut kids = empty_kids();
        if first_slot == second_slot {
            kids[first_slot] = Self::split(level + 1, first, first_hash, second, second_hash);
        } else {
            kids[first_slot] = first;
            kids[second_slot] = second;
        }
        Self::branch(kids)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Returns the number of bindings reachable from this node.
    #[inline]
    pub(crate) fn size(&self) -> usize {
        match self {
            Self::Empty => 0,
            Self::Leaf(_) => 1,
            Self::List(list) => list.entries.len(),
            Self::Branch(branch) => branch.size,
        }
    }

    #[inline]
    pub(crate) const fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Returns `true` if both nodes are the same instance.
    pub(crate) fn ptr_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Empty, Self::Empty) => true,
            (Self::Leaf(left), Self::Leaf(right)) => ReferenceCounter::ptr_eq(left, right),
            (Self::List(left), Self::List(right)) => ReferenceCounter::ptr_eq(left, right),
            (Self::Branch(left), Self::Branch(right)) => ReferenceCounter::ptr_eq(left, right),
            _ => false,
        }
    }

    /// Finds the stored binding of a key.
    pub(crate) fn get_entry(&self, hash: u32, key: &Key, level: u32) -> Option<(&Key, &Value)> {
        let mut node = self;
        let mut level = level;
        loop {
            match node {
                Self::Empty => return None,
                Self::Leaf(leaf) => {
                    return (leaf.hash == hash && leaf.key.same_key(key))
                        .then_some((&leaf.key, &leaf.value));
                }
                Self::List(list) => {
                    if list.hash != hash {
                        return None;
                    }
                    return list
                        .entries
                        .iter()
                        .find(|(existing, _)| existing.same_key(key))
                        .map(|(existing, value)| (existing, value));
                }
                Self::Branch(branch) => {
                    node = &branch.kids[slot(hash, level)];
                    level += 1;
                }
            }
        }
    }

    pub(crate) fn get(&self, hash: u32, key: &Key, level: u32) -> Option<&Value> {
        self.get_entry(hash, key, level).map(|(_, value)| value)
    }

    pub(crate) fn contains(&self, hash: u32, key: &Key, level: u32) -> bool {
        self.get_entry(hash, key, level).is_some()
    }

    /// Returns every binding stored under a full hash, in physical order.
    pub(crate) fn bucket(&self, hash: u32, level: u32) -> Vec<(&Key, &Value)> {
        let mut node = self;
        let mut level = level;
        loop {
            match node {
                Self::Empty => return Vec::new(),
                Self::Leaf(leaf) if leaf.hash == hash => return vec![(&leaf.key, &leaf.value)],
                Self::List(list) if list.hash == hash => {
                    return list.entries.iter().map(|(key, value)| (key, value)).collect();
                }
                Self::Leaf(_) | Self::List(_) => return Vec::new(),
                Self::Branch(branch) => {
                    node = &branch.kids[slot(hash, level)];
                    level += 1;
                }
            }
        }
    }

    // =========================================================================
    // Updates
    // =========================================================================

    /// Inserts a binding, or replaces the value of a bound key.
    ///
    /// Returns the new node and whether a new key was added. Putting the
    /// identical key and value instance returns the receiver.
    pub(crate) fn put(&self, hash: u32, key: Key, value: Value, level: u32) -> (Self, bool) {
        let Ok(result) =
            self.upsert::<Infallible, _>(hash, key, value, level, &mut |old_key, old, key, value| {
                if old.ptr_eq(&value) && old_key.is_identical(&key) {
                    Ok(Resolution::Keep)
                } else {
                    Ok(Resolution::Replace(key, value))
                }
            });
        result
    }

    /// Inserts a binding, asking `resolve` what to do if the key is bound.
    ///
    /// Returns the new node and whether a new key was added.
    pub(crate) fn upsert<E, F>(
        &self,
        hash: u32,
        key: Key,
        value: Value,
        level: u32,
        resolve: &mut F,
    ) -> Result<(Self, bool), E>
    where
        F: FnMut(&Key, &Value, Key, Value) -> Result<Resolution, E>,
    {
        match self {
            Self::Empty => Ok((Self::leaf(hash, key, value), true)),
            Self::Leaf(leaf) if leaf.hash == hash => {
                if leaf.key.same_key(&key) {
                    return Ok(match resolve(&leaf.key, &leaf.value, key, value)? {
                        Resolution::Keep => (self.clone(), false),
                        Resolution::Replace(key, value) => (Self::leaf(hash, key, value), false),
                    });
                }
                let entries = smallvec![(leaf.key.clone(), leaf.value.clone()), (key, value)];
                Ok((Self::list(hash, entries), true))
            }
            Self::Leaf(leaf) => Ok((
                Self::split(level, self.clone(), leaf.hash, Self::leaf(hash, key, value), hash),
                true,
            )),
            Self::List(list) if list.hash == hash => {
                let position = list
                    .entries
                    .iter()
                    .position(|(existing, _)| existing.same_key(&key));
                match position {
                    Some(index) => {
                        let (old_key, old_value) = &list.entries[index];
                        match resolve(old_key, old_value, key, value)? {
                            Resolution::Keep => Ok((self.clone(), false)),
                            Resolution::Replace(key, value) => {
                                let mut entries = list.entries.clone();
                                entries[index] = (key, value);
                                Ok((Self::list(hash, entries), false))
                            }
                        }
                    }
                    None => {
                        let mut entries = list.entries.clone();
                        entries.push((key, value));
                        Ok((Self::list(hash, entries), true))
                    }
                }
            }
            Self::List(list) => Ok((
                Self::split(level, self.clone(), list.hash, Self::leaf(hash, key, value), hash),
                true,
            )),
            Self::Branch(branch) => {
                let index = slot(hash, level);
                let old = &branch.kids[index];
                let (kid, added) = old.upsert(hash, key, value, level + 1, resolve)?;
                if kid.ptr_eq(old) {
                    Ok((self.clone(), false))
                } else {
                    Ok((branch.with_kid(index, kid), added))
                }
            }
        }
    }

    /// Removes the binding of a key. Returns the receiver if the key is
    /// not bound.
    pub(crate) fn delete(&self, hash: u32, key: &Key, level: u32) -> Self {
        match self {
            Self::Empty => Self::Empty,
            Self::Leaf(leaf) => {
                if leaf.hash == hash && leaf.key.same_key(key) {
                    Self::Empty
                } else {
                    self.clone()
                }
            }
            Self::List(list) => {
                if list.hash != hash {
                    return self.clone();
                }
                let Some(index) = list
                    .entries
                    .iter()
                    .position(|(existing, _)| existing.same_key(key))
                else {
                    return self.clone();
                };
                if list.entries.len() == 2 {
                    let (key, value) = &list.entries[1 - index];
                    Self::leaf(hash, key.clone(), value.clone())
                } else {
                    let mut entries = list.entries.clone();
                    entries.remove(index);
                    Self::list(hash, entries)
                }
            }
            Self::Branch(branch) => {
                let index = slot(hash, level);
                let old = &branch.kids[index];
                let kid = old.delete(hash, key, level + 1);
                if kid.ptr_eq(old) {
                    return self.clone();
                }
                let used = if kid.is_empty() {
                    branch.used & !(1 << index)
                } else {
                    branch.used
                };
                if used.count_ones() == 1 {
                    let remaining = used.trailing_zeros() as usize;
                    let last = if remaining == index {
                        &kid
                    } else {
                        &branch.kids[remaining]
                    };
                    if !matches!(last, Self::Branch(_)) {
                        return last.clone();
                    }
                }
                branch.with_kid(index, kid)
            }
        }
    }

    // =========================================================================
    // Traversal
    // =========================================================================

    /// Visits every binding in physical trie order, stopping at the first
    /// error.
    pub(crate) fn try_for_each<E, F>(&self, function: &mut F) -> Result<(), E>
    where
        F: FnMut(&Key, &Value) -> Result<(), E>,
    {
        match self {
            Self::Empty => Ok(()),
            Self::Leaf(leaf) => function(&leaf.key, &leaf.value),
            Self::List(list) => list
                .entries
                .iter()
                .try_for_each(|(key, value)| function(key, value)),
            Self::Branch(branch) => branch
                .kids
                .iter()
                .try_for_each(|kid| kid.try_for_each(function)),
        }
    }

    /// Visits every binding in physical trie order.
    pub(crate) fn for_each<F>(&self, function: &mut F)
    where
        F: FnMut(&Key, &Value),
    {
        let Ok(()) = self.try_for_each::<Infallible, _>(&mut |key, value| {
            function(key, value);
            Ok(())
        });
    }

    /// Returns `true` if every binding satisfies `predicate`.
    pub(crate) fn all<F>(&self, predicate: &mut F) -> bool
    where
        F: FnMut(&Key, &Value) -> bool,
    {
        self.try_for_each(&mut |key, value| if predicate(key, value) { Ok(()) } else { Err(()) })
            .is_ok()
    }

    // =========================================================================
    // Hashing and equality
    // =========================================================================

    /// Structural hash of this subtree.
    pub(crate) fn hash(&self) -> u32 {
        match self {
            Self::Empty => 0,
            Self::Leaf(leaf) => entry_hash(&leaf.key, &leaf.value),
            Self::List(list) => list
                .entries
                .iter()
                .fold(0, |hash, (key, value)| hash ^ entry_hash(key, value)),
            Self::Branch(branch) => branch
                .kids
                .iter()
                .filter(|kid| !kid.is_empty())
                .fold(0_u32, |hash, kid| hash.wrapping_mul(31).wrapping_add(kid.hash())),
        }
    }

    /// Deep equality of two subtrees at the same level.
    pub(crate) fn deep(&self, other: &Self, collation: &dyn Collation) -> bool {
        if self.ptr_eq(other) {
            return true;
        }
        if self.size() != other.size() {
            return false;
        }
        match (self, other) {
            (Self::Branch(left), Self::Branch(right)) => {
                left.used == right.used
                    && left
                        .kids
                        .iter()
                        .zip(right.kids.iter())
                        .all(|(left, right)| left.deep(right, collation))
            }
            (Self::Branch(_), _) | (_, Self::Branch(_)) => false,
            _ => self.all(&mut |key, value| {
                other
                    .get(key.hash32(), key, 0)
                    .is_some_and(|found| value.deep_equal(found, collation))
            }),
        }
    }

    // =========================================================================
    // Invariant checks
    // =========================================================================

    /// Recursively checks the structural invariants of this subtree.
    ///
    /// `path` holds the slots taken from the root to reach this node.
    pub(crate) fn verify(&self, level: u32, path: &mut Vec<usize>) -> Result<(), String> {
        let placed = |hash: u32, path: &[usize]| {
            path.iter()
                .enumerate()
                .all(|(depth, expected)| u32::try_from(depth).is_ok_and(|depth| slot(hash, depth) == *expected))
        };
        match self {
            Self::Empty => Ok(()),
            Self::Leaf(leaf) => {
                if leaf.hash != leaf.key.hash32() {
                    return Err(format!("leaf {} stores a stale hash", leaf.key));
                }
                if !placed(leaf.hash, path) {
                    return Err(format!("leaf {} is in the wrong slot", leaf.key));
                }
                Ok(())
            }
            Self::List(list) => {
                if list.entries.len() < 2 {
                    return Err("list with fewer than two entries".to_string());
                }
                if !placed(list.hash, path) {
                    return Err("list is in the wrong slot".to_string());
                }
                for (index, (key, _)) in list.entries.iter().enumerate() {
                    if key.hash32() != list.hash {
                        return Err(format!("list key {key} has a different hash"));
                    }
                    if list.entries[..index]
                        .iter()
                        .any(|(other, _)| other.same_key(key))
                    {
                        return Err(format!("list holds {key} twice"));
                    }
                }
                Ok(())
            }
            Self::Branch(branch) => {
                if level > 6 {
                    return Err(format!("branch below the last level {level}"));
                }
                let mut used = 0_u32;
                let mut size = 0;
                for (index, kid) in branch.kids.iter().enumerate() {
                    if kid.is_empty() {
                        continue;
                    }
                    used |= 1 << index;
                    size += kid.size();
                    path.push(index);
                    let checked = kid.verify(level + 1, path);
                    path.pop();
                    checked?;
                }
                if used != branch.used {
                    return Err(format!("used mask {:#x} should be {used:#x}", branch.used));
                }
                if size != branch.size {
                    return Err(format!("branch size {} should be {size}", branch.size));
                }
                match used.count_ones() {
                    0 => Err("empty branch".to_string()),
                    1 if !matches!(
                        branch.kids[used.trailing_zeros() as usize],
                        Self::Branch(_)
                    ) =>
                    {
                        Err("single-child branch over a non-branch".to_string())
                    }
                    _ => Ok(()),
                }
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
