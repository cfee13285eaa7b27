//! Diagnostic rendering of maps.

use std::fmt;

use super::XqMap;

/// Number of bindings [`XqMap`]'s `Display` prints before truncating.
pub const DISPLAY_LIMIT: usize = 100;

/// Renders a map as `map { key: value, ... }`, printing at most `limit`
/// bindings followed by a `...` marker.
///
/// # Examples
///
/// ```rust
/// use xqmap::{Key, Value, XqMap};
///
/// let map: XqMap = (1..=3).map(|n| (Key::from(n), Value::from(n * n))).collect();
/// assert_eq!(map.to_string(), "map { 1: 1, 2: 4, 3: 9 }");
/// assert_eq!(map.display_limited(2).to_string(), "map { 1: 1, 2: 4, ... }");
/// ```
#[derive(Debug, Clone, Copy)]
pub struct LimitedDisplay<'a> {
    map: &'a XqMap,
    limit: usize,
}

impl XqMap {
    /// Returns a renderer printing at most `limit` bindings.
    #[must_use]
    pub const fn display_limited(&self, limit: usize) -> LimitedDisplay<'_> {
        LimitedDisplay { map: self, limit }
    }
}

impl fmt::Display for LimitedDisplay<'_> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("map {")?;
        let mut written = 0;
        // `None` stops at the limit.
        let rendered: Result<(), Option<fmt::Error>> = self.map.try_for_each(|key, value| {
            if written == self.limit {
                return Err(None);
            }
            let separator = if written == 0 { " " } else { ", " };
            write!(formatter, "{separator}{key}: {value}").map_err(Some)?;
            written += 1;
            Ok(())
        });
        match rendered {
            Ok(()) => {}
            Err(Some(error)) => return Err(error),
            Err(None) => formatter.write_str(if written == 0 { " ..." } else { ", ..." })?,
        }
        formatter.write_str(" }")
    }
}

impl fmt::Display for XqMap {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.display_limited(DISPLAY_LIMIT), formatter)
    }
}
