//! # xqmap
//!
//! Persistent, insertion-ordered map values for an XQuery engine.
//!
//! ## Overview
//!
//! Maps are first-class values in XQuery: every update returns a new map and
//! every earlier version stays valid. This crate provides:
//!
//! - **Value model**: atomic [`Key`]s with the XQuery "same key" relation,
//!   [`Item`]s and [`Value`] sequences
//! - **Persistent maps**: [`XqMap`], a hash array mapped trie with structural
//!   sharing and deterministic (insertion) key order
//! - **Builders**: [`MapBuilder`], which picks a type-specialized storage for
//!   maps constructed once from literal entries
//! - **Merging**: [`MergeDuplicates`] policies for combining two maps
//!
//! ## Feature Flags
//!
//! - `arc` (default): share nodes through `Arc` so maps are `Send + Sync`
//! - `serde`: `Serialize` implementations for maps, keys and values
//! - `full`: Enable all features
//!
//! ## Example
//!
//! ```rust
//! use xqmap::prelude::*;
//!
//! let map = XqMap::new()
//!     .put(Key::from("a"), Value::from(1))
//!     .put(Key::from("b"), Value::from(2));
//! let updated = map.put(Key::from("a"), Value::from(10));
//!
//! assert_eq!(map.get(&Key::from("a")), Value::from(1));
//! assert_eq!(updated.get(&Key::from("a")), Value::from(10));
//! assert_eq!(updated.keys().collect::<Vec<_>>(), vec![Key::from("a"), Key::from("b")]);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Prelude module for convenient imports.
///
/// # Usage
///
/// ```rust
/// use xqmap::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::MapError;
    pub use crate::persistent::*;
    pub use crate::value::*;
}

pub mod error;
pub mod persistent;
pub mod value;

pub use error::MapError;
pub use persistent::{MapBuilder, MergeDuplicates, RecordShape, XqMap};
pub use value::{Key, Value};
