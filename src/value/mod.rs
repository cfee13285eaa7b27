//! The host value model consumed by the map engine.
//!
//! The query engine owns the full XQuery type system; the map engine only
//! needs a small part of it:
//!
//! - [`Key`]: atomic keys, their 32-bit hash and the "same key" relation
//! - [`Item`]: the items a map value can hold, including nested maps
//! - [`Value`]: an immutable, reference-counted sequence of items
//! - [`Collation`]: string equality used by deep equality

mod collation;
mod item;
mod key;
mod sequence;

pub use collation::{AsciiCaseInsensitiveCollation, CodepointCollation, Collation};
pub use item::{FunctionItem, Item};
pub use key::{Key, Str};
pub use sequence::Value;

pub(crate) use key::integral_i64;
