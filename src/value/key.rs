//! Atomic map keys and the "same key" relation.
//!
//! Two keys are the same key if:
//!
//! - both are strings or untyped atomics with equal code points
//!   (untyped atomics are compared by their string identity),
//! - both are numeric and mathematically equal (`1` and `1.0e0` match),
//! - both are booleans with equal values.
//!
//! `NaN` is never the same key as anything, itself included. The validating
//! constructors reject it, but a `NaN` that slips through simply never
//! matches.

use std::fmt;
use std::hash::{Hash, Hasher};

use rustc_hash::FxHasher;

use super::{Item, Value};
use crate::error::MapError;
use crate::persistent::ReferenceCounter;

/// Shared, immutable string storage used by keys and items.
pub type Str = ReferenceCounter<str>;

/// Smallest `f64` that no longer fits into an `i64` (2^63).
const I64_LIMIT: f64 = 9_223_372_036_854_775_808.0;

/// Hash shared by every `NaN` payload.
const NAN_HASH: u32 = 0x7ff8_0000;

// =============================================================================
// Key Definition
// =============================================================================

/// An atomic value used as a map key.
///
/// `PartialEq`, `Eq` and `Hash` implement the "same key" relation, so keys
/// can be used directly in hash-based indexes.
///
/// # Examples
///
/// ```rust
/// use xqmap::Key;
///
/// assert_eq!(Key::from(1), Key::double(1.0).unwrap());
/// assert_eq!(Key::from("a"), Key::untyped("a"));
/// assert_ne!(Key::from("1"), Key::from(1));
/// assert_eq!(Key::from(1).hash32(), Key::double(1.0).unwrap().hash32());
/// ```
#[derive(Clone, Debug)]
pub enum Key {
    /// An `xs:integer`.
    Integer(i64),
    /// An `xs:double`.
    Double(f64),
    /// An `xs:boolean`.
    Boolean(bool),
    /// An `xs:string`.
    String(Str),
    /// An `xs:untypedAtomic`, keyed by its string identity.
    UntypedAtomic(Str),
}

impl Key {
    /// Creates a string key.
    #[inline]
    #[must_use]
    pub fn string(text: impl Into<Str>) -> Self {
        Self::String(text.into())
    }

    /// Creates an untyped-atomic key.
    #[inline]
    #[must_use]
    pub fn untyped(text: impl Into<Str>) -> Self {
        Self::UntypedAtomic(text.into())
    }

    /// Creates a double key.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::NanKey`] for `NaN`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use xqmap::{Key, MapError};
    ///
    /// assert!(Key::double(2.5).is_ok());
    /// assert_eq!(Key::double(f64::NAN), Err(MapError::NanKey));
    /// ```
    pub fn double(value: f64) -> Result<Self, MapError> {
        if value.is_nan() {
            Err(MapError::NanKey)
        } else {
            Ok(Self::Double(value))
        }
    }

    /// Returns the 32-bit hash of this key.
    ///
    /// The hash is consistent with the "same key" relation: numerically
    /// equal integers and doubles hash alike, and so do strings and untyped
    /// atomics with the same text.
    #[must_use]
    pub fn hash32(&self) -> u32 {
        match self {
            Self::Integer(value) => integer_hash(*value),
            Self::Double(value) => double_hash(*value),
            Self::Boolean(value) => {
                if *value {
                    1231
                } else {
                    1237
                }
            }
            Self::String(text) | Self::UntypedAtomic(text) => text_hash(text),
        }
    }

    /// Returns `true` if both keys are the same key.
    #[must_use]
    pub fn same_key(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Integer(left), Self::Integer(right)) => left == right,
            (Self::Integer(integer), Self::Double(double))
            | (Self::Double(double), Self::Integer(integer)) => {
                integral_i64(*double) == Some(*integer)
            }
            #[allow(clippy::float_cmp)]
            (Self::Double(left), Self::Double(right)) => left == right,
            (Self::Boolean(left), Self::Boolean(right)) => left == right,
            (
                Self::String(left) | Self::UntypedAtomic(left),
                Self::String(right) | Self::UntypedAtomic(right),
            ) => left == right,
            _ => false,
        }
    }

    /// Returns `true` if both keys are the same key and of the same type.
    #[must_use]
    pub fn is_identical(&self, other: &Self) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other) && self.same_key(other)
    }

    /// Returns `true` for a double `NaN`.
    #[must_use]
    pub const fn is_nan(&self) -> bool {
        matches!(self, Self::Double(value) if value.is_nan())
    }

    /// Returns the XQuery type name of this key.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Integer(_) => "xs:integer",
            Self::Double(_) => "xs:double",
            Self::Boolean(_) => "xs:boolean",
            Self::String(_) => "xs:string",
            Self::UntypedAtomic(_) => "xs:untypedAtomic",
        }
    }
}

// =============================================================================
// Hash computation
// =============================================================================

/// Folds the two halves of a 64-bit integer.
#[inline]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
const fn integer_hash(value: i64) -> u32 {
    let bits = value as u64;
    (bits ^ (bits >> 32)) as u32
}

#[allow(clippy::cast_possible_truncation)]
fn double_hash(value: f64) -> u32 {
    if value.is_nan() {
        return NAN_HASH;
    }
    match integral_i64(value) {
        Some(integer) => integer_hash(integer),
        None => {
            let bits = value.to_bits();
            (bits ^ (bits >> 32)) as u32
        }
    }
}

#[allow(clippy::cast_possible_truncation)]
fn text_hash(text: &str) -> u32 {
    let mut hasher = FxHasher::default();
    hasher.write(text.as_bytes());
    let hash = hasher.finish();
    (hash ^ (hash >> 32)) as u32
}

/// Returns the integer a double is mathematically equal to, if any.
#[allow(clippy::float_cmp, clippy::cast_possible_truncation)]
pub(crate) fn integral_i64(value: f64) -> Option<i64> {
    (value.fract() == 0.0 && (-I64_LIMIT..I64_LIMIT).contains(&value)).then(|| value as i64)
}

/// Writes a double the way diagnostic output shows it.
pub(crate) fn format_double(value: f64, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
    if value.is_nan() {
        formatter.write_str("NaN")
    } else if value.is_infinite() {
        formatter.write_str(if value > 0.0 { "INF" } else { "-INF" })
    } else if value != 0.0 && !(1e-6..1e6).contains(&value.abs()) {
        write!(formatter, "{value:E}")
    } else {
        write!(formatter, "{value}")
    }
}

/// Writes a string literal with doubled quotes.
pub(crate) fn format_string(text: &str, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
    formatter.write_str("\"")?;
    for (index, part) in text.split('"').enumerate() {
        if index > 0 {
            formatter.write_str("\"\"")?;
        }
        formatter.write_str(part)?;
    }
    formatter.write_str("\"")
}

// =============================================================================
// Standard Trait Implementations
// =============================================================================

impl PartialEq for Key {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.same_key(other)
    }
}

// Reflexive for every key the validating constructors produce; a `NaN`
// built through the public variant never matches, itself included.
impl Eq for Key {}

impl Hash for Key {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u32(self.hash32());
    }
}

impl fmt::Display for Key {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(value) => write!(formatter, "{value}"),
            Self::Double(value) => format_double(*value, formatter),
            Self::Boolean(value) => write!(formatter, "{value}()"),
            Self::String(text) | Self::UntypedAtomic(text) => format_string(text, formatter),
        }
    }
}

impl From<i64> for Key {
    #[inline]
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for Key {
    #[inline]
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<bool> for Key {
    #[inline]
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<&str> for Key {
    #[inline]
    fn from(text: &str) -> Self {
        Self::String(text.into())
    }
}

impl From<String> for Key {
    #[inline]
    fn from(text: String) -> Self {
        Self::String(text.into())
    }
}

impl TryFrom<f64> for Key {
    type Error = MapError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::double(value)
    }
}

impl TryFrom<&Item> for Key {
    type Error = MapError;

    /// Atomizes an item into a key.
    fn try_from(item: &Item) -> Result<Self, Self::Error> {
        match item {
            Item::Integer(value) => Ok(Self::Integer(*value)),
            Item::Double(value) => Self::double(*value),
            Item::Boolean(value) => Ok(Self::Boolean(*value)),
            Item::String(text) => Ok(Self::String(text.clone())),
            Item::UntypedAtomic(text) => Ok(Self::UntypedAtomic(text.clone())),
            Item::Map(_) | Item::Function(_) => Err(MapError::FunctionKey {
                type_name: item.type_name(),
            }),
        }
    }
}

impl TryFrom<&Value> for Key {
    type Error = MapError;

    /// Validates a sequence as a key: exactly one atomic, non-`NaN` item.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use xqmap::{Key, MapError, Value};
    ///
    /// assert_eq!(Key::try_from(&Value::from("a")), Ok(Key::from("a")));
    /// assert_eq!(Key::try_from(&Value::empty()), Err(MapError::EmptyKey));
    /// ```
    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        match value.items() {
            [] => Err(MapError::EmptyKey),
            [item] => Self::try_from(item),
            items => Err(MapError::KeySequence {
                length: items.len(),
            }),
        }
    }
}

// =============================================================================
// Serde Support
// =============================================================================

#[cfg(feature = "serde")]
impl serde::Serialize for Key {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            Self::Integer(value) => serializer.serialize_i64(*value),
            Self::Double(value) => serializer.serialize_f64(*value),
            Self::Boolean(value) => serializer.serialize_bool(*value),
            Self::String(text) | Self::UntypedAtomic(text) => serializer.serialize_str(text),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
