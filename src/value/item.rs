//! Items: the members of a value sequence.

use std::fmt;
use std::hash::{Hash, Hasher};

use super::key::{format_double, format_string};
use super::{CodepointCollation, Collation, Key, Str, integral_i64};
use crate::error::MapError;
use crate::persistent::{ReferenceCounter, XqMap};

// =============================================================================
// FunctionItem
// =============================================================================

#[derive(Debug)]
struct Signature {
    name: String,
    arity: usize,
}

/// An opaque function item.
///
/// The engine never calls functions; it only stores them. Two function items
/// are equal only if they are the same instance.
///
/// # Examples
///
/// ```rust
/// use xqmap::value::FunctionItem;
///
/// let function = FunctionItem::new("local:f", 2);
/// assert_eq!(function, function.clone());
/// assert_ne!(function, FunctionItem::new("local:f", 2));
/// ```
#[derive(Clone)]
pub struct FunctionItem {
    signature: ReferenceCounter<Signature>,
}

impl FunctionItem {
    /// Creates a new function item.
    #[must_use]
    pub fn new(name: impl Into<String>, arity: usize) -> Self {
        Self {
            signature: ReferenceCounter::new(Signature {
                name: name.into(),
                arity,
            }),
        }
    }

    /// Returns the function name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.signature.name
    }

    /// Returns the number of parameters.
    #[must_use]
    pub fn arity(&self) -> usize {
        self.signature.arity
    }

    /// Returns `true` if both handles refer to the same function instance.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        ReferenceCounter::ptr_eq(&self.signature, &other.signature)
    }

    #[allow(clippy::cast_possible_truncation)]
    fn hash32(&self) -> u32 {
        Key::String(self.name().into())
            .hash32()
            .wrapping_mul(31)
            .wrapping_add(self.arity() as u32)
    }
}

impl PartialEq for FunctionItem {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for FunctionItem {}

impl fmt::Debug for FunctionItem {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}#{}", self.name(), self.arity())
    }
}

impl fmt::Display for FunctionItem {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, formatter)
    }
}

// =============================================================================
// Item Definition
// =============================================================================

/// A single item of a value sequence.
///
/// `PartialEq` is deep equality under the code-point collation. `NaN` is
/// deep-equal to `NaN`, which keeps the relation reflexive.
///
/// # Examples
///
/// ```rust
/// use xqmap::value::Item;
///
/// assert_eq!(Item::from(1), Item::from(1.0));
/// assert_eq!(Item::from(f64::NAN), Item::from(f64::NAN));
/// assert_ne!(Item::from("1"), Item::from(1));
/// ```
#[derive(Clone, Debug)]
pub enum Item {
    /// An `xs:integer`.
    Integer(i64),
    /// An `xs:double`.
    Double(f64),
    /// An `xs:boolean`.
    Boolean(bool),
    /// An `xs:string`.
    String(Str),
    /// An `xs:untypedAtomic`.
    UntypedAtomic(Str),
    /// A nested map.
    Map(XqMap),
    /// A function item.
    Function(FunctionItem),
}

impl Item {
    /// Converts this item into a map key.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::FunctionKey`] for maps and functions and
    /// [`MapError::NanKey`] for `NaN`.
    pub fn to_key(&self) -> Result<Key, MapError> {
        Key::try_from(self)
    }

    /// Returns the XQuery type name of this item.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Integer(_) => "xs:integer",
            Self::Double(_) => "xs:double",
            Self::Boolean(_) => "xs:boolean",
            Self::String(_) => "xs:string",
            Self::UntypedAtomic(_) => "xs:untypedAtomic",
            Self::Map(_) => "map(*)",
            Self::Function(_) => "function(*)",
        }
    }

    /// Returns the 32-bit hash of this item, consistent with
    /// [`deep_equal`](Self::deep_equal) under the code-point collation.
    #[must_use]
    pub fn hash32(&self) -> u32 {
        match self {
            Self::Integer(value) => Key::Integer(*value).hash32(),
            Self::Double(value) => Key::Double(*value).hash32(),
            Self::Boolean(value) => Key::Boolean(*value).hash32(),
            Self::String(text) | Self::UntypedAtomic(text) => Key::String(text.clone()).hash32(),
            Self::Map(map) => map.hash32(),
            Self::Function(function) => function.hash32(),
        }
    }

    /// Compares two items for deep equality.
    ///
    /// Numerics compare by value, strings through `collation`, maps
    /// recursively and functions by identity.
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn deep_equal(&self, other: &Self, collation: &dyn Collation) -> bool {
        match (self, other) {
            (Self::Integer(left), Self::Integer(right)) => left == right,
            (Self::Integer(integer), Self::Double(double))
            | (Self::Double(double), Self::Integer(integer)) => {
                integral_i64(*double) == Some(*integer)
            }
            (Self::Double(left), Self::Double(right)) => {
                left == right || (left.is_nan() && right.is_nan())
            }
            (Self::Boolean(left), Self::Boolean(right)) => left == right,
            (
                Self::String(left) | Self::UntypedAtomic(left),
                Self::String(right) | Self::UntypedAtomic(right),
            ) => collation.equals(left, right),
            (Self::Map(left), Self::Map(right)) => left.deep_equal(right, collation),
            (Self::Function(left), Self::Function(right)) => left.ptr_eq(right),
            _ => false,
        }
    }
}

// =============================================================================
// Standard Trait Implementations
// =============================================================================

impl PartialEq for Item {
    fn eq(&self, other: &Self) -> bool {
        self.deep_equal(other, &CodepointCollation)
    }
}

impl Eq for Item {}

impl Hash for Item {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u32(self.hash32());
    }
}

impl fmt::Display for Item {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(value) => write!(formatter, "{value}"),
            Self::Double(value) => format_double(*value, formatter),
            Self::Boolean(value) => write!(formatter, "{value}()"),
            Self::String(text) | Self::UntypedAtomic(text) => format_string(text, formatter),
            Self::Map(map) => fmt::Display::fmt(map, formatter),
            Self::Function(function) => fmt::Display::fmt(function, formatter),
        }
    }
}

impl From<Key> for Item {
    fn from(key: Key) -> Self {
        match key {
            Key::Integer(value) => Self::Integer(value),
            Key::Double(value) => Self::Double(value),
            Key::Boolean(value) => Self::Boolean(value),
            Key::String(text) => Self::String(text),
            Key::UntypedAtomic(text) => Self::UntypedAtomic(text),
        }
    }
}

impl From<i64> for Item {
    #[inline]
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for Item {
    #[inline]
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<f64> for Item {
    #[inline]
    fn from(value: f64) -> Self {
        Self::Double(value)
    }
}

impl From<bool> for Item {
    #[inline]
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<&str> for Item {
    #[inline]
    fn from(text: &str) -> Self {
        Self::String(text.into())
    }
}

impl From<String> for Item {
    #[inline]
    fn from(text: String) -> Self {
        Self::String(text.into())
    }
}

impl From<XqMap> for Item {
    #[inline]
    fn from(map: XqMap) -> Self {
        Self::Map(map)
    }
}

impl From<FunctionItem> for Item {
    #[inline]
    fn from(function: FunctionItem) -> Self {
        Self::Function(function)
    }
}

// =============================================================================
// Serde Support
// =============================================================================

#[cfg(feature = "serde")]
impl serde::Serialize for Item {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            Self::Integer(value) => serializer.serialize_i64(*value),
            Self::Double(value) => serializer.serialize_f64(*value),
            Self::Boolean(value) => serializer.serialize_bool(*value),
            Self::String(text) | Self::UntypedAtomic(text) => serializer.serialize_str(text),
            Self::Map(map) => map.serialize(serializer),
            Self::Function(function) => Err(serde::ser::Error::custom(format!(
                "function item {function} cannot be serialized"
            ))),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::AsciiCaseInsensitiveCollation;
    use rstest::rstest;

    #[rstest]
    #[case(Item::from(1), Item::from(1.0), true)]
    #[case(Item::from(f64::NAN), Item::from(f64::NAN), true)]
    #[case(Item::from(0.5), Item::from(0.25), false)]
    #[case(Item::from("a"), Item::UntypedAtomic("a".into()), true)]
    #[case(Item::from("a"), Item::from("A"), false)]
    #[case(Item::from(true), Item::from(1), false)]
    fn test_deep_equal_codepoint(#[case] left: Item, #[case] right: Item, #[case] expected: bool) {
        assert_eq!(left.deep_equal(&right, &CodepointCollation), expected);
    }

    #[rstest]
    fn test_deep_equal_uses_collation() {
        let left = Item::from("Hello");
        let right = Item::from("hELLO");
        assert!(left.deep_equal(&right, &AsciiCaseInsensitiveCollation));
        assert!(!left.deep_equal(&right, &CodepointCollation));
    }

    #[rstest]
    fn test_deep_equal_items_hash_alike() {
        assert_eq!(Item::from(3).hash32(), Item::from(3.0).hash32());
        assert_eq!(
            Item::from("x").hash32(),
            Item::UntypedAtomic("x".into()).hash32()
        );
    }

    #[rstest]
    fn test_functions_compare_by_identity() {
        let function = FunctionItem::new("f", 0);
        let same = Item::from(function.clone());
        assert_eq!(Item::from(function), same);
        assert_ne!(same, Item::from(FunctionItem::new("f", 0)));
    }

    #[rstest]
    fn test_to_key_round_trips_atomics() {
        let key = Key::untyped("u");
        let item = Item::from(key.clone());
        assert!(item.to_key().is_ok_and(|converted| converted.is_identical(&key)));
    }

    #[rstest]
    fn test_map_item_is_not_a_key() {
        let item = Item::from(XqMap::new());
        assert_eq!(
            item.to_key(),
            Err(MapError::FunctionKey {
                type_name: "map(*)"
            })
        );
    }

    #[rstest]
    #[case(Item::from(true), "true()")]
    #[case(Item::from(FunctionItem::new("fn:count", 1)), "fn:count#1")]
    #[case(Item::from(XqMap::new()), "map { }")]
    fn test_display(#[case] item: Item, #[case] expected: &str) {
        assert_eq!(item.to_string(), expected);
    }
}
