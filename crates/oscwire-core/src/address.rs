//! Address normalization and pattern matching
//!
//! Listeners register literal addresses:
//! ```text
//! /synth/1/cutoff
//! ```
//!
//! Senders address them with glob-style patterns:
//! - `?` matches any single character
//! - `*` matches any sequence of characters (including `/`)
//! - `[abc]`, `[a-z]`, `[!abc]` match one character of (or not of) a set
//! - `{foo,bar}` matches either alternative

use crate::{Error, Result};

/// Characters that may not appear in a registered (literal) address
const RESERVED: &[char] = &['#', '*', '[', ']', ',', '{', '}', '|', '?'];

/// Anything that can be turned into an OSC address
///
/// Strings are normalized with [`prepare_address`]; segment lists are
/// joined with `/`.
pub trait ToAddress {
    fn to_address(&self) -> String;
}

impl ToAddress for str {
    fn to_address(&self) -> String {
        prepare_address(self)
    }
}

impl ToAddress for String {
    fn to_address(&self) -> String {
        prepare_address(self)
    }
}

impl<T: ToAddress + ?Sized> ToAddress for &T {
    fn to_address(&self) -> String {
        (**self).to_address()
    }
}

impl<S: AsRef<str>> ToAddress for [S] {
    fn to_address(&self) -> String {
        join_segments(self)
    }
}

impl<S: AsRef<str>, const N: usize> ToAddress for [S; N] {
    fn to_address(&self) -> String {
        join_segments(self)
    }
}

impl<S: AsRef<str>> ToAddress for Vec<S> {
    fn to_address(&self) -> String {
        join_segments(self)
    }
}

fn join_segments<S: AsRef<str>>(segments: &[S]) -> String {
    let mut address = String::new();
    for segment in segments {
        address.push('/');
        address.push_str(segment.as_ref());
    }
    if address.is_empty() {
        address.push('/');
    }
    address
}

/// Normalize an address string
///
/// Adds a leading `/` and strips trailing slashes, except for the root
/// address `/`. The empty string stays empty.
///
/// ```
/// use oscwire_core::prepare_address;
///
/// assert_eq!(prepare_address("test/path"), "/test/path");
/// assert_eq!(prepare_address("/test/path/"), "/test/path");
/// assert_eq!(prepare_address("/"), "/");
/// ```
pub fn prepare_address(address: &str) -> String {
    if address.is_empty() {
        return String::new();
    }

    let trimmed = address.trim_end_matches('/');
    if trimmed.is_empty() {
        return "/".to_string();
    }

    if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}

/// Reject addresses that cannot be registered as literal listener keys
pub fn validate_literal(address: &str) -> Result<()> {
    if address.is_empty() {
        return Err(Error::Validation("address is empty".to_string()));
    }

    if !address.starts_with('/') {
        return Err(Error::Validation(format!(
            "address must start with '/': {}",
            address
        )));
    }

    let invalid = address
        .split('/')
        .flat_map(str::chars)
        .find(|c| c.is_whitespace() || RESERVED.contains(c));

    match invalid {
        Some(c) => Err(Error::Validation(format!(
            "address {:?} contains reserved character {:?}",
            address, c
        ))),
        None => Ok(()),
    }
}

/// Translate an OSC address pattern into regular expression source
///
/// The result is not anchored; [`Pattern::compile`] anchors it.
pub fn pattern_to_regex(pattern: &str) -> String {
    let mut regex = String::with_capacity(pattern.len() * 2);
    let mut chars = pattern.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '.' => regex.push_str("\\."),
            '(' => regex.push_str("\\("),
            ')' => regex.push_str("\\)"),
            '{' => regex.push('('),
            '}' => regex.push(')'),
            ',' => regex.push('|'),
            '[' => {
                regex.push('[');
                if chars.peek() == Some(&'!') {
                    chars.next();
                    regex.push('^');
                }
            }
            '?' => regex.push('.'),
            '*' => regex.push_str(".*"),
            '+' | '$' | '^' | '\\' | '|' => {
                regex.push('\\');
                regex.push(c);
            }
            _ => regex.push(c),
        }
    }

    regex
}

/// A compiled address pattern
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    regex: regex_lite::Regex,
}

impl Pattern {
    /// Compile a pattern; the address is normalized first
    pub fn compile(pattern: &str) -> Result<Self> {
        let source = prepare_address(pattern);
        let regex_str = format!("^(?:{})$", pattern_to_regex(&source));
        let regex = regex_lite::Regex::new(&regex_str)
            .map_err(|e| Error::InvalidPattern(format!("{}: {}", source, e)))?;

        Ok(Self { source, regex })
    }

    /// Check whether a literal address is fully matched by this pattern
    pub fn matches(&self, address: &str) -> bool {
        self.regex.is_match(address)
    }

    /// The normalized pattern string
    pub fn as_str(&self) -> &str {
        &self.source
    }
}
