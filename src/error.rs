//! Errors raised while building, merging and keying maps.
//!
//! Every message carries the XQuery error code the query engine reports
//! for the condition.

use thiserror::Error;

use crate::value::Key;

/// Errors that can occur when working with map values.
///
/// Only [`DuplicateKey`](Self::DuplicateKey) is raised by the map engine
/// itself. The invalid-key variants are produced by key validation
/// ([`Key::try_from`], [`Key::double`]) before the engine sees a key.
///
/// # Examples
///
/// ```rust
/// use xqmap::{Key, MapError};
///
/// let error = MapError::DuplicateKey { key: Key::from("b") };
/// assert_eq!(error.to_string(), "[FOJS0003] Key \"b\" occurs more than once.");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MapError {
    /// A key occurs in both operands of a merge that rejects duplicates.
    #[error("[FOJS0003] Key {key} occurs more than once.")]
    DuplicateKey {
        /// The colliding key.
        key: Key,
    },
    /// The empty sequence was supplied as a key.
    #[error("[XPTY0004] Map key expected, empty sequence found.")]
    EmptyKey,
    /// A sequence of more than one item was supplied as a key.
    #[error("[XPTY0004] Map key expected, sequence of {length} items found.")]
    KeySequence {
        /// Number of items in the offending sequence.
        length: usize,
    },
    /// A function item (maps included) was supplied as a key.
    #[error("[FOTY0013] Items of type {type_name} cannot be used as map keys.")]
    FunctionKey {
        /// Type of the offending item.
        type_name: &'static str,
    },
    /// `NaN` was supplied as a key.
    #[error("[XPTY0004] NaN cannot be used as a map key.")]
    NanKey,
    /// The `duplicates` option of a merge named no known policy.
    #[error("[FOJS0005] Invalid value for duplicates option: '{option}'.")]
    UnknownMergeOption {
        /// The rejected option value.
        option: String,
    },
}
