//! Named path captures.
//!
//! Captures are always the literal substrings the pattern matched. Turning
//! `"42"` into a number is the handler's business, never the matcher's.

use smallvec::SmallVec;

/// Typical routes capture one or two segments.
const INLINE_CAPTURES: usize = 2;

/// Named substrings captured from a request path.
///
/// # Example
///
/// ```rust
/// use feast_router::Captures;
///
/// let mut captures = Captures::new();
/// captures.insert("feed", "3");
/// captures.insert("id", "42");
///
/// assert_eq!(captures.get("id"), Some("42"));
/// assert_eq!(captures.get("page"), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Captures {
    inner: SmallVec<[(String, String); INLINE_CAPTURES]>,
}

impl Captures {
    /// Creates an empty capture set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a capture, replacing an earlier value under the same name.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.inner.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.inner.push((name, value)),
        }
    }

    /// Returns the captured text for `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.inner
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Returns true when nothing was captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Number of captures.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Iterates captures in pattern order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }
}

impl IntoIterator for Captures {
    type Item = (String, String);
    type IntoIter = smallvec::IntoIter<[(String, String); INLINE_CAPTURES]>;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.into_iter()
    }
}

impl FromIterator<(String, String)> for Captures {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let mut captures = Self::new();
        for (name, value) in iter {
            captures.insert(name, value);
        }
        captures
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_captures_empty() {
        let captures = Captures::new();
        assert!(captures.is_empty());
        assert_eq!(captures.len(), 0);
        assert_eq!(captures.get("id"), None);
    }

    #[test]
    fn test_captures_insert_replaces() {
        let mut captures = Captures::new();
        captures.insert("id", "1");
        captures.insert("id", "2");

        assert_eq!(captures.len(), 1);
        assert_eq!(captures.get("id"), Some("2"));
    }

    #[test]
    fn test_captures_keep_order() {
        let captures: Captures = vec![
            ("feed".to_string(), "3".to_string()),
            ("id".to_string(), "42".to_string()),
            ("extra".to_string(), "x".to_string()),
        ]
        .into_iter()
        .collect();

        let names: Vec<_> = captures.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["feed", "id", "extra"]);

        let owned: Vec<_> = captures.into_iter().collect();
        assert_eq!(owned[2], ("extra".to_string(), "x".to_string()));
    }
}
