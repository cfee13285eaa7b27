//! Fixed-shape maps with positional value storage.

use std::fmt;

use rustc_hash::FxHashMap;

use super::ReferenceCounter;
use super::duplicates::{MergeDuplicates, Winner};
use super::table::Fit;
use crate::error::MapError;
use crate::value::{Key, Str, Value};

/// Shapes with at most this many fields are searched linearly.
const LINEAR_SCAN_LIMIT: usize = 8;

struct Fields {
    names: Box<[Str]>,
    index: FxHashMap<Str, usize>,
}

/// The closed, ordered set of string field names of a record-like map.
///
/// A shape is built once and shared by every map created from it, so field
/// names are never hashed again per record.
///
/// # Examples
///
/// ```rust
/// use xqmap::{Key, MapBuilder, RecordShape, Value};
///
/// let shape = RecordShape::new(["x", "y"]).unwrap();
/// let mut builder = MapBuilder::record(&shape);
/// builder.put(Key::from("y"), Value::from(2));
/// builder.put(Key::from("x"), Value::from(1));
/// let point = builder.finish();
///
/// assert_eq!(point.get(&Key::from("x")), Value::from(1));
/// assert_eq!(point.keys().collect::<Vec<_>>(), vec![Key::from("x"), Key::from("y")]);
/// ```
#[derive(Clone)]
pub struct RecordShape {
    fields: ReferenceCounter<Fields>,
}

impl RecordShape {
    /// Creates a shape from field names.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::DuplicateKey`] if a name occurs twice.
    pub fn new<I, S>(names: I) -> Result<Self, MapError>
    where
        I: IntoIterator<Item = S>,
        S: Into<Str>,
    {
        let names: Box<[Str]> = names.into_iter().map(Into::into).collect();
        let mut index = FxHashMap::with_capacity_and_hasher(names.len(), Default::default());
        for (position, name) in names.iter().enumerate() {
            if index.insert(name.clone(), position).is_some() {
                return Err(MapError::DuplicateKey {
                    key: Key::String(name.clone()),
                });
            }
        }
        Ok(Self {
            fields: ReferenceCounter::new(Fields { names, index }),
        })
    }

    /// Returns the number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.names.len()
    }

    /// Returns `true` if the shape has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.names.is_empty()
    }

    /// Returns the field names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.names.iter().map(AsRef::as_ref)
    }

    /// Returns the position of the field named `text`.
    fn position(&self, text: &str) -> Option<usize> {
        if self.len() <= LINEAR_SCAN_LIMIT {
            self.fields.names.iter().position(|name| &**name == text)
        } else {
            self.fields.index.get(text).copied()
        }
    }
}

impl PartialEq for RecordShape {
    fn eq(&self, other: &Self) -> bool {
        ReferenceCounter::ptr_eq(&self.fields, &other.fields)
            || self.fields.names == other.fields.names
    }
}

impl Eq for RecordShape {}

impl fmt::Debug for RecordShape {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_list().entries(self.names()).finish()
    }
}

/// Values of one record, by field position.
pub(crate) struct Record {
    shape: RecordShape,
    values: Vec<Option<Value>>,
    count: usize,
}

impl Record {
    pub(crate) fn new(shape: RecordShape) -> Self {
        Self {
            values: vec![None; shape.len()],
            shape,
            count: 0,
        }
    }

    #[inline]
    pub(crate) const fn len(&self) -> usize {
        self.count
    }

    fn field(&self, key: &Key) -> Option<usize> {
        match key {
            Key::String(text) | Key::UntypedAtomic(text) => self.shape.position(text),
            _ => None,
        }
    }

    pub(crate) fn get(&self, key: &Key) -> Option<Value> {
        self.field(key)
            .and_then(|position| self.values[position].clone())
    }

    pub(crate) fn contains(&self, key: &Key) -> bool {
        self.field(key)
            .is_some_and(|position| self.values[position].is_some())
    }

    /// Stores a value for a field of the shape. Only `xs:string` keys fit.
    pub(crate) fn add(
        &mut self,
        key: &Key,
        value: &Value,
        policy: MergeDuplicates,
    ) -> Result<Fit, MapError> {
        let Key::String(text) = key else {
            return Ok(Fit::Rejected);
        };
        let Some(position) = self.shape.position(text) else {
            return Ok(Fit::Rejected);
        };
        let slot = &mut self.values[position];
        match slot {
            None => {
                *slot = Some(value.clone());
                self.count += 1;
            }
            Some(existing) => match policy.resolve(key, existing, value)? {
                Winner::Left | Winner::Either => {}
                Winner::Right => *existing = value.clone(),
                Winner::Combined(combined) => *existing = combined,
            },
        }
        Ok(Fit::Accepted)
    }

    /// Visits the bound fields in shape order.
    pub(crate) fn try_for_each<E, F>(&self, function: &mut F) -> Result<(), E>
    where
        F: FnMut(&Key, &Value) -> Result<(), E>,
    {
        self.shape
            .fields
            .names
            .iter()
            .zip(&self.values)
            .filter_map(|(name, value)| value.as_ref().map(|value| (name, value)))
            .try_for_each(|(name, value)| function(&Key::String(name.clone()), value))
    }

    pub(crate) fn shrink_to_fit(&mut self) {
        self.values.shrink_to_fit();
    }
}
