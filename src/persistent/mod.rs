//! Persistent (immutable) map values.
//!
//! This module provides the map engine behind XQuery map values:
//!
//! - [`XqMap`]: the map value, backed by a hash array mapped trie or by a
//!   type-specialized table frozen out of a builder
//! - [`MapBuilder`]: mutable, single-owner construction of a map
//! - [`RecordShape`]: the closed field set of record-like maps
//! - [`MergeDuplicates`]: how colliding keys are resolved by merges
//!
//! # Structural Sharing
//!
//! Every update returns a new map. Only the trie path from the root to the
//! changed entry is copied; everything else is shared with the previous
//! version, which stays valid.
//!
//! # Key Order
//!
//! Iteration follows insertion order, independent of where keys land in the
//! trie. Replacing a value keeps the key's position.
//!
//! # Examples
//!
//! ```rust
//! use xqmap::prelude::*;
//!
//! let first = XqMap::new().put(Key::from("a"), Value::from(1));
//! let second = XqMap::new()
//!     .put(Key::from("a"), Value::from(2))
//!     .put(Key::from("b"), Value::from(3));
//!
//! let merged = first.add_all(&second, MergeDuplicates::Combine).unwrap();
//! assert_eq!(merged.get(&Key::from("a")).len(), 2);
//! assert_eq!(merged.len(), 2);
//!
//! let rejected = first.add_all(&second, MergeDuplicates::Reject);
//! assert!(rejected.is_err());
//! ```

// =============================================================================
// Reference Counter Type Alias
// =============================================================================

/// Reference-counted smart pointer type.
///
/// When the `arc` feature is enabled (default), this is `std::sync::Arc`,
/// which makes maps `Send + Sync`.
///
/// When the `arc` feature is disabled, this is `std::rc::Rc`,
/// which is faster but not thread-safe.
#[cfg(feature = "arc")]
pub type ReferenceCounter<T> = std::sync::Arc<T>;

#[cfg(not(feature = "arc"))]
pub type ReferenceCounter<T> = std::rc::Rc<T>;

/// Write-once cache cell matching [`ReferenceCounter`].
#[cfg(feature = "arc")]
pub(crate) type OnceSlot<T> = std::sync::OnceLock<T>;

#[cfg(not(feature = "arc"))]
pub(crate) type OnceSlot<T> = std::cell::OnceCell<T>;

mod builder;
mod display;
mod duplicates;
mod key_order;
mod map;
mod merge;
mod node;
mod record;
mod specialized;
mod table;

pub use builder::MapBuilder;
pub use display::{DISPLAY_LIMIT, LimitedDisplay};
pub use duplicates::MergeDuplicates;
pub use map::{XqMap, XqMapIterator};
pub use record::RecordShape;

// =============================================================================
// Tests
// =============================================================================
