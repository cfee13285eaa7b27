//! Single-owner construction of map values.

use std::marker::PhantomData;
use std::rc::Rc;

use super::XqMap;
use super::duplicates::{MergeDuplicates, Winner};
use super::record::{Record, RecordShape};
use super::specialized::{Specialized, SpecializedMap};
use crate::error::MapError;
use crate::value::{Key, Value};

enum Building {
    Empty,
    Single(Key, Value),
    Storage(Specialized),
}

/// A mutable builder for [`XqMap`] values.
///
/// The builder picks the narrowest storage that fits every binding seen so
/// far: integer keys with integer values, string keys with string values,
/// and so on, down to a generic table. Each binding that does not fit moves
/// the bindings to a more general storage; the builder never moves back.
///
/// [`finish`](Self::finish) consumes the builder, so a map cannot be changed
/// once it is handed out.
///
/// # Design
///
/// - `PhantomData<Rc<()>>` makes the builder `!Send` and `!Sync`
/// - Clone is not implemented; there is exactly one owner
///
/// # Examples
///
/// ```rust
/// use xqmap::{Key, MapBuilder, MergeDuplicates, Value};
///
/// let mut builder = MapBuilder::new();
/// builder.put(Key::from(1), Value::from(10));
/// builder.put(Key::from(2), Value::from(20));
/// builder.add(Key::from(1), Value::from(11), MergeDuplicates::Combine).unwrap();
///
/// let map = builder.finish();
/// assert_eq!(map.len(), 2);
/// assert_eq!(map.get(&Key::from(1)).len(), 2);
/// ```
pub struct MapBuilder {
    building: Building,
    /// Marker to ensure `!Send` and `!Sync`.
    _marker: PhantomData<Rc<()>>,
}

static_assertions::assert_not_impl_any!(MapBuilder: Send, Sync);

impl MapBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            building: Building::Empty,
            _marker: PhantomData,
        }
    }

    /// Creates a builder storing the fields of `shape` positionally.
    ///
    /// Bindings whose key is not an `xs:string` field of the shape move the
    /// builder to a general string or item table.
    #[must_use]
    pub fn record(shape: &RecordShape) -> Self {
        Self {
            building: Building::Storage(Specialized::Record(Record::new(shape.clone()))),
            _marker: PhantomData,
        }
    }

    /// Returns the number of bindings added so far.
    #[must_use]
    pub fn len(&self) -> usize {
        match &self.building {
            Building::Empty => 0,
            Building::Single(..) => 1,
            Building::Storage(storage) => storage.len(),
        }
    }

    /// Returns `true` if no binding has been added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Binds `key` to `value`, replacing an existing binding of the same key.
    pub fn put(&mut self, key: Key, value: Value) {
        let replaced = self.add(key, value, MergeDuplicates::UseLast);
        debug_assert!(replaced.is_ok(), "replacing a binding cannot fail");
    }

    /// Binds `key` to `value`, resolving an existing binding with `policy`.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::DuplicateKey`] under [`MergeDuplicates::Reject`]
    /// if `key` is already bound. The builder is unchanged in that case.
    pub fn add(&mut self, key: Key, value: Value, policy: MergeDuplicates) -> Result<(), MapError> {
        match &mut self.building {
            Building::Empty => {
                self.building = Building::Single(key, value);
            }
            Building::Single(existing, old) if existing.same_key(&key) => {
                match policy.resolve(existing, old, &value)? {
                    Winner::Left | Winner::Either => {}
                    Winner::Right => self.building = Building::Single(key, value),
                    Winner::Combined(combined) => *old = combined,
                }
            }
            Building::Single(existing, old) => {
                let mut storage = Specialized::narrowest(existing, old, 2);
                storage.insert(existing, old, policy)?;
                storage.insert(&key, &value, policy)?;
                self.building = Building::Storage(storage);
            }
            Building::Storage(storage) => storage.insert(&key, &value, policy)?,
        }
        Ok(())
    }

    /// Freezes the builder into a map.
    ///
    /// # Complexity
    ///
    /// O(1); storage is moved, not copied
    #[must_use]
    pub fn finish(self) -> XqMap {
        match self.building {
            Building::Empty => XqMap::new(),
            Building::Single(key, value) => XqMap::singleton(key, value),
            Building::Storage(storage) => match storage.len() {
                0 => XqMap::new(),
                _ => XqMap::from_specialized(SpecializedMap::new(storage)),
            },
        }
    }
}

impl Default for MapBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Extend<(Key, Value)> for MapBuilder {
    fn extend<I: IntoIterator<Item = (Key, Value)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.put(key, value);
        }
    }
}

impl FromIterator<(Key, Value)> for XqMap {
    fn from_iter<I: IntoIterator<Item = (Key, Value)>>(iter: I) -> Self {
        let mut builder = MapBuilder::new();
        builder.extend(iter);
        builder.finish()
    }
}
