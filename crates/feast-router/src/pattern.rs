//! Path templates compiled to anchored, case-insensitive regular expressions.
//!
//! A template mixes literal text with named placeholders:
//!
//! - `{name}` captures one or more ASCII digits
//! - `{name:token}` captures whatever the regular expression `token` matches
//!
//! Literal text is matched verbatim (regex metacharacters are escaped) and the
//! whole path must match, so `/feeds/{id}` never matches `/feeds/1/items`.

use std::fmt;

use regex::Regex;
use thiserror::Error;

use crate::Captures;

/// Token used for placeholders without an explicit expression.
///
/// ASCII only: `\d` would also accept other Unicode decimal digits.
pub const DEFAULT_TOKEN: &str = "[0-9]+";

/// Errors raised while compiling a path template.
#[derive(Debug, Error)]
pub enum PatternError {
    /// A `{` was never closed.
    #[error("unclosed placeholder in '{template}' at byte {position}")]
    Unclosed {
        /// The offending template.
        template: String,
        /// Byte offset of the opening brace.
        position: usize,
    },

    /// A `}` appeared outside any placeholder.
    #[error("unexpected '}}' in '{template}' at byte {position}")]
    UnexpectedClose {
        /// The offending template.
        template: String,
        /// Byte offset of the brace.
        position: usize,
    },

    /// Placeholder names must be identifiers.
    #[error("invalid placeholder name '{name}' in '{template}'")]
    InvalidName {
        /// The offending template.
        template: String,
        /// The rejected name.
        name: String,
    },

    /// The same placeholder name was used twice.
    #[error("duplicate placeholder '{name}' in '{template}'")]
    DuplicateName {
        /// The offending template.
        template: String,
        /// The repeated name.
        name: String,
    },

    /// The generated expression did not compile.
    #[error("invalid expression for '{template}': {source}")]
    Regex {
        /// The offending template.
        template: String,
        /// Underlying regex error.
        #[source]
        source: regex::Error,
    },
}

/// A compiled path template.
///
/// Matching is a pure function of the pattern and the path.
///
/// # Example
///
/// ```rust
/// use feast_router::Pattern;
///
/// let pattern = Pattern::compile("/feeds/{feed}/items/{id}").unwrap();
///
/// let captures = pattern.captures("/FEEDS/3/items/42").unwrap();
/// assert_eq!(captures.get("feed"), Some("3"));
/// assert_eq!(captures.get("id"), Some("42"));
///
/// assert!(pattern.captures("/feeds/3/items").is_none());
/// assert!(pattern.captures("/feeds/abc/items/42").is_none());
/// ```
#[derive(Debug, Clone)]
pub struct Pattern {
    template: String,
    regex: Regex,
    names: Vec<String>,
}

impl Pattern {
    /// Compiles a template.
    pub fn compile(template: &str) -> Result<Self, PatternError> {
        let (source, names) = translate(template)?;
        let regex = Regex::new(&source).map_err(|source| PatternError::Regex {
            template: template.to_string(),
            source,
        })?;

        Ok(Self {
            template: template.to_string(),
            regex,
            names,
        })
    }

    /// The template this pattern was compiled from.
    #[must_use]
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Placeholder names in template order.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Returns `true` when the whole path matches.
    #[must_use]
    pub fn is_match(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    /// Matches `path` and returns its captures, or `None` on no match.
    #[must_use]
    pub fn captures(&self, path: &str) -> Option<Captures> {
        let caps = self.regex.captures(path)?;
        let mut captures = Captures::new();
        for name in &self.names {
            if let Some(m) = caps.name(name) {
                captures.insert(name.as_str(), m.as_str());
            }
        }
        Some(captures)
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.template)
    }
}

/// Compiles `template` and matches `path` against it in one step.
pub fn match_path(template: &str, path: &str) -> Result<Option<Captures>, PatternError> {
    Ok(Pattern::compile(template)?.captures(path))
}

fn translate(template: &str) -> Result<(String, Vec<String>), PatternError> {
    let mut source = String::with_capacity(template.len() + 16);
    source.push_str("(?i)^");
    let mut names: Vec<String> = Vec::new();
    let mut literal_start = 0;
    let bytes = template.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'{' => {
                source.push_str(&regex::escape(&template[literal_start..i]));
                let close = find_close(template, i)?;
                let body = &template[i + 1..close];
                let (name, token) = body
                    .split_once(':')
                    .unwrap_or((body, DEFAULT_TOKEN));

                if !is_identifier(name) {
                    return Err(PatternError::InvalidName {
                        template: template.to_string(),
                        name: name.to_string(),
                    });
                }
                if names.iter().any(|n| n == name) {
                    return Err(PatternError::DuplicateName {
                        template: template.to_string(),
                        name: name.to_string(),
                    });
                }

                source.push_str("(?P<");
                source.push_str(name);
                source.push('>');
                source.push_str(token);
                source.push(')');
                names.push(name.to_string());

                i = close + 1;
                literal_start = i;
            }
            b'}' => {
                return Err(PatternError::UnexpectedClose {
                    template: template.to_string(),
                    position: i,
                })
            }
            _ => i += 1,
        }
    }

    source.push_str(&regex::escape(&template[literal_start..]));
    source.push('$');
    Ok((source, names))
}

// Custom tokens may contain their own braces (`\d{1,3}`), so track depth.
// Escaped characters and `[...]` classes never open or close a placeholder.
fn find_close(template: &str, open: usize) -> Result<usize, PatternError> {
    let bytes = template.as_bytes();
    let mut depth = 0usize;
    let mut i = open;

    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 1,
            b'[' => i = skip_class(bytes, i),
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Ok(i);
                }
            }
            _ => {}
        }
        i += 1;
    }

    Err(PatternError::Unclosed {
        template: template.to_string(),
        position: open,
    })
}

// Index of the `]` closing the class opened at `open`, or the end of input.
// A `]` right after `[` or `[^` is a literal member.
fn skip_class(bytes: &[u8], open: usize) -> usize {
    let mut i = open + 1;
    if bytes.get(i) == Some(&b'^') {
        i += 1;
    }
    if bytes.get(i) == Some(&b']') {
        i += 1;
    }
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 1,
            b'[' => i = skip_class(bytes, i),
            b']' => return i,
            _ => {}
        }
        i += 1;
    }
    bytes.len()
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_literal_pattern() {
        let pattern = Pattern::compile("/items/read").unwrap();
        assert!(pattern.is_match("/items/read"));
        assert!(pattern.is_match("/Items/READ"));
        assert!(!pattern.is_match("/items/read/"));
        assert!(!pattern.is_match("/x/items/read"));
        assert!(pattern.captures("/items/read").unwrap().is_empty());
    }

    #[test]
    fn test_default_token_is_digits() {
        let pattern = Pattern::compile("/feeds/{id}").unwrap();
        assert_eq!(pattern.captures("/feeds/17").unwrap().get("id"), Some("17"));
        assert!(pattern.captures("/feeds/").is_none());
        assert!(pattern.captures("/feeds/abc").is_none());
        assert!(pattern.captures("/feeds/17/items").is_none());
    }

    #[test]
    fn test_custom_token() {
        let pattern = Pattern::compile("/tags/{slug:[a-z-]+}").unwrap();
        assert_eq!(
            pattern.captures("/tags/rust-lang").unwrap().get("slug"),
            Some("rust-lang")
        );
        // case-insensitive applies to tokens too
        assert_eq!(pattern.captures("/tags/RUST").unwrap().get("slug"), Some("RUST"));
    }

    #[test]
    fn test_default_token_rejects_non_ascii_digits() {
        let pattern = Pattern::compile("/feeds/{id}").unwrap();
        // Arabic-Indic and fullwidth digits
        assert!(pattern.captures("/feeds/\u{661}\u{662}").is_none());
        assert!(pattern.captures("/feeds/\u{ff11}").is_none());
        assert!(match_path("/items/{id}", "/items/\u{966}").unwrap().is_none());
    }

    #[test]
    fn test_brace_inside_class_or_escape() {
        let pattern = Pattern::compile("/tags/{slug:[^/}]+}").unwrap();
        assert_eq!(pattern.captures("/tags/a}b").unwrap().get("slug"), Some("a}b"));
        assert!(!pattern.is_match("/tags/a/b"));

        let pattern = Pattern::compile(r"/raw/{body:\{[a-z]+\}}").unwrap();
        assert_eq!(pattern.captures("/raw/{abc}").unwrap().get("body"), Some("{abc}"));

        let pattern = Pattern::compile("/set/{v:[]{]+}").unwrap();
        assert_eq!(pattern.captures("/set/]{]").unwrap().get("v"), Some("]{]"));
    }

    #[test]
    fn test_custom_token_with_braces() {
        let pattern = Pattern::compile(r"/years/{year:\d{4}}").unwrap();
        assert!(pattern.is_match("/years/2024"));
        assert!(!pattern.is_match("/years/24"));
        assert_eq!(pattern.names(), ["year"]);
    }

    #[test]
    fn test_literal_metacharacters_are_escaped() {
        let pattern = Pattern::compile("/feed.json").unwrap();
        assert!(pattern.is_match("/feed.json"));
        assert!(!pattern.is_match("/feedxjson"));
    }

    #[test]
    fn test_compile_errors() {
        assert!(matches!(
            Pattern::compile("/feeds/{id"),
            Err(PatternError::Unclosed { position: 7, .. })
        ));
        assert!(matches!(
            Pattern::compile("/feeds/id}"),
            Err(PatternError::UnexpectedClose { .. })
        ));
        assert!(matches!(
            Pattern::compile("/feeds/{1d}"),
            Err(PatternError::InvalidName { .. })
        ));
        assert!(matches!(
            Pattern::compile("/a/{id}/b/{id}"),
            Err(PatternError::DuplicateName { .. })
        ));
        assert!(matches!(
            Pattern::compile("/a/{id:(}"),
            Err(PatternError::Regex { .. })
        ));
    }

    #[test]
    fn test_match_path() {
        let captures = match_path("/feeds/{feed}/items", "/feeds/9/items")
            .unwrap()
            .unwrap();
        assert_eq!(captures.get("feed"), Some("9"));
        assert!(match_path("/feeds/{feed}/items", "/feeds").unwrap().is_none());
    }

    proptest! {
        #[test]
        fn prop_digit_capture_roundtrips(id in 0u64..u64::MAX) {
            let pattern = Pattern::compile("/items/{id}").unwrap();
            let path = format!("/items/{id}");
            let captures = pattern.captures(&path).unwrap();
            let expected = id.to_string();
            prop_assert_eq!(captures.get("id"), Some(expected.as_str()));
        }

        #[test]
        fn prop_matching_is_pure(path in "/[a-z0-9/]{0,24}") {
            let pattern = Pattern::compile("/feeds/{id}").unwrap();
            let first = pattern.captures(&path);
            let second = pattern.captures(&path);
            prop_assert_eq!(first, second);
        }

        #[test]
        fn prop_trailing_text_never_matches(suffix in "[a-z/]{1,8}") {
            let pattern = Pattern::compile("/feeds/{id}").unwrap();
            let path = format!("/feeds/1{suffix}");
            prop_assert!(!pattern.is_match(&path));
        }
    }
}
