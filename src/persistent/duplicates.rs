//! Policies for keys bound in both operands of a merge.

use std::fmt;
use std::str::FromStr;

use crate::error::MapError;
use crate::value::{Key, Value};

/// How a merge resolves a key that is bound on both sides.
///
/// The left side is the receiver of [`XqMap::add_all`](super::XqMap::add_all)
/// (or the value already held by a builder); the right side is the incoming
/// operand.
///
/// # Examples
///
/// ```rust
/// use xqmap::MergeDuplicates;
///
/// let policy: MergeDuplicates = "use-last".parse().unwrap();
/// assert_eq!(policy, MergeDuplicates::UseLast);
/// assert_eq!(MergeDuplicates::default(), MergeDuplicates::UseFirst);
/// assert_eq!(MergeDuplicates::Combine.to_string(), "combine");
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum MergeDuplicates {
    /// Fail with [`MapError::DuplicateKey`].
    Reject,
    /// Keep the left binding.
    #[default]
    UseFirst,
    /// Keep the right binding.
    UseLast,
    /// Keep whichever binding is cheapest to keep.
    UseAny,
    /// Bind the left value followed by the right value.
    Combine,
}

/// The binding chosen by a policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Winner {
    Left,
    Right,
    /// Either side is acceptable.
    Either,
    Combined(Value),
}

impl MergeDuplicates {
    /// All policies, in declaration order.
    pub const ALL: [Self; 5] = [
        Self::Reject,
        Self::UseFirst,
        Self::UseLast,
        Self::UseAny,
        Self::Combine,
    ];

    /// Returns the XQuery option string naming this policy.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Reject => "reject",
            Self::UseFirst => "use-first",
            Self::UseLast => "use-last",
            Self::UseAny => "use-any",
            Self::Combine => "combine",
        }
    }

    /// Returns `true` if merging a map with itself yields the same map.
    pub(crate) const fn is_idempotent(self) -> bool {
        matches!(self, Self::UseFirst | Self::UseLast | Self::UseAny)
    }

    /// Resolves a key bound to `left` and `right`.
    pub(crate) fn resolve(self, key: &Key, left: &Value, right: &Value) -> Result<Winner, MapError> {
        match self {
            Self::Reject => Err(MapError::DuplicateKey { key: key.clone() }),
            Self::UseFirst => Ok(Winner::Left),
            Self::UseLast => Ok(Winner::Right),
            Self::UseAny => Ok(Winner::Either),
            Self::Combine => Ok(Winner::Combined(left.concat(right))),
        }
    }
}

impl fmt::Display for MergeDuplicates {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for MergeDuplicates {
    type Err = MapError;

    fn from_str(option: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|policy| policy.as_str() == option)
            .ok_or_else(|| MapError::UnknownMergeOption {
                option: option.to_string(),
            })
    }
}
