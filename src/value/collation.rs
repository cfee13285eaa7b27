//! String collations used by deep equality.

/// Decides whether two strings are equal for the purposes of deep equality.
///
/// Key identity never depends on a collation: keys always compare by code
/// points. Collations only affect the comparison of string values.
pub trait Collation {
    /// Returns `true` if both strings are equal under this collation.
    fn equals(&self, left: &str, right: &str) -> bool;
}

/// The Unicode code-point collation, the XQuery default.
///
/// # Examples
///
/// ```rust
/// use xqmap::value::{CodepointCollation, Collation};
///
/// assert!(CodepointCollation.equals("abc", "abc"));
/// assert!(!CodepointCollation.equals("abc", "ABC"));
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CodepointCollation;

impl Collation for CodepointCollation {
    #[inline]
    fn equals(&self, left: &str, right: &str) -> bool {
        left == right
    }
}

/// The HTML ASCII case-insensitive collation.
///
/// ASCII letters compare without regard to case; all other characters
/// compare by code point.
///
/// # Examples
///
/// ```rust
/// use xqmap::value::{AsciiCaseInsensitiveCollation, Collation};
///
/// assert!(AsciiCaseInsensitiveCollation.equals("Key", "kEY"));
/// assert!(!AsciiCaseInsensitiveCollation.equals("straße", "STRASSE"));
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AsciiCaseInsensitiveCollation;

impl Collation for AsciiCaseInsensitiveCollation {
    fn equals(&self, left: &str, right: &str) -> bool {
        left.eq_ignore_ascii_case(right)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("a", "a", true)]
    #[case("a", "A", false)]
    #[case("", "", true)]
    fn test_codepoint_collation(#[case] left: &str, #[case] right: &str, #[case] expected: bool) {
        assert_eq!(CodepointCollation.equals(left, right), expected);
    }

    #[rstest]
    #[case("abc", "ABC", true)]
    #[case("abc", "abd", false)]
    #[case("Ä", "ä", false)]
    fn test_ascii_case_insensitive_collation(
        #[case] left: &str,
        #[case] right: &str,
        #[case] expected: bool,
    ) {
        assert_eq!(AsciiCaseInsensitiveCollation.equals(left, right), expected);
    }
}
