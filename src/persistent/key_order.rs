//! Insertion order of the keys of a trie-backed map.
//!
//! The trie places keys by hash, so the logical order is recorded separately
//! as two append-only logs: keys added and keys removed. The logical order is
//! the base sequence followed by the added keys, minus one earliest
//! occurrence per removed key. It is compacted on first read and cached, and
//! trackers derived from a compacted one start from the compacted sequence.

use rustc_hash::FxHashMap;

use super::{OnceSlot, ReferenceCounter};
use crate::value::Key;

// =============================================================================
// Log
// =============================================================================

/// A node of the log.
struct Node {
    key: Key,
    next: Option<ReferenceCounter<Node>>,
}

impl Drop for Node {
    // Unlinks uniquely owned successors one by one so long logs do not
    // overflow the stack.
    fn drop(&mut self) {
        let mut next = self.next.take();
        while let Some(node) = next {
            match ReferenceCounter::try_unwrap(node) {
                Ok(mut node) => next = node.next.take(),
                Err(_) => break,
            }
        }
    }
}

/// Persistent log of keys, newest first.
#[derive(Clone, Default)]
struct Log {
    head: Option<ReferenceCounter<Node>>,
    length: usize,
}

impl Log {
    fn push(&self, key: Key) -> Self {
        Self {
            head: Some(ReferenceCounter::new(Node {
                key,
                next: self.head.clone(),
            })),
            length: self.length + 1,
        }
    }

    const fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Returns the logged keys, oldest first.
    fn to_vec(&self) -> Vec<&Key> {
        let mut keys = Vec::with_capacity(self.length);
        let mut current = self.head.as_deref();
        while let Some(node) = current {
            keys.push(&node.key);
            current = node.next.as_deref();
        }
        keys.reverse();
        keys
    }
}

// =============================================================================
// KeyOrder
// =============================================================================

/// Records the logical key order of a map.
pub(crate) struct KeyOrder {
    base: ReferenceCounter<[Key]>,
    added: Log,
    removed: Log,
    compacted: OnceSlot<ReferenceCounter<[Key]>>,
}

impl KeyOrder {
    /// Creates a tracker holding `keys` in order.
    pub(crate) fn from_keys<I>(keys: I) -> Self
    where
        I: IntoIterator<Item = Key>,
    {
        Self {
            base: keys.into_iter().collect(),
            added: Log::default(),
            removed: Log::default(),
            compacted: OnceSlot::new(),
        }
    }

    /// Returns a tracker with `key` appended.
    pub(crate) fn add(&self, key: Key) -> Self {
        let (base, added, removed) = self.rebase();
        Self {
            base,
            added: added.push(key),
            removed,
            compacted: OnceSlot::new(),
        }
    }

    /// Returns a tracker with `keys` appended in order.
    pub(crate) fn append<I>(&self, keys: I) -> Self
    where
        I: IntoIterator<Item = Key>,
    {
        let (base, added, removed) = self.rebase();
        Self {
            base,
            added: keys.into_iter().fold(added, |log, key| log.push(key)),
            removed,
            compacted: OnceSlot::new(),
        }
    }

    /// Returns a tracker with one occurrence of `key` removed.
    pub(crate) fn remove(&self, key: Key) -> Self {
        let (base, added, removed) = self.rebase();
        Self {
            base,
            added,
            removed: removed.push(key),
            compacted: OnceSlot::new(),
        }
    }

    /// Returns the keys in logical order.
    pub(crate) fn keys(&self) -> ReferenceCounter<[Key]> {
        if self.added.is_empty() && self.removed.is_empty() {
            return self.base.clone();
        }
        self.compacted.get_or_init(|| self.compact()).clone()
    }

    /// Number of log entries not yet folded into a compacted sequence.
    #[cfg(test)]
    const fn pending(&self) -> usize {
        self.added.length + self.removed.length
    }

    fn rebase(&self) -> (ReferenceCounter<[Key]>, Log, Log) {
        match self.compacted.get() {
            Some(keys) => (keys.clone(), Log::default(), Log::default()),
            None => (self.base.clone(), self.added.clone(), self.removed.clone()),
        }
    }

    fn compact(&self) -> ReferenceCounter<[Key]> {
        let mut removals: FxHashMap<&Key, usize> = FxHashMap::default();
        for key in self.removed.to_vec() {
            *removals.entry(key).or_default() += 1;
        }
        let added = self.added.to_vec();
        self.base
            .iter()
            .chain(added)
            .filter(|key| match removals.get_mut(key) {
                Some(count) if *count > 0 => {
                    *count -= 1;
                    false
                }
                _ => true,
            })
            .cloned()
            .collect()
    }
}
