// src/diff/exclude.rs

//! Exclusion rules for volatile snapshot fields.
//!
//! Patterns are written either in the bracket form used by change reports
//! (`root['assignments'][*]['contextid']`) or as a dotted shorthand
//! (`assignments.*.contextid`). `*` matches any single key or sequence
//! element. A pattern excludes the node it names together with everything
//! below it.
//!
//! Sequence elements are matched regardless of order, so a position such as
//! `[0]` does not name a stable element and is rejected; use `[*]`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::diff::path::{Path, Segment};
use crate::error::{AppError, Result};

/// Matcher for a single path segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Matcher {
    Key(String),
    Any,
}

impl Matcher {
    fn matches(&self, segment: &Segment) -> bool {
        match (self, segment) {
            (Matcher::Any, _) => true,
            (Matcher::Key(expected), Segment::Key(actual)) => expected == actual,
            _ => false,
        }
    }
}

/// A compiled exclusion pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ExclusionPattern {
    source: String,
    matchers: Vec<Matcher>,
}

impl ExclusionPattern {
    /// Parse a pattern in bracket or dotted form.
    pub fn parse(pattern: &str) -> Result<Self> {
        let trimmed = pattern.trim();
        if trimmed.is_empty() {
            return Err(AppError::pattern(pattern, "pattern is empty"));
        }

        let matchers = match trimmed.strip_prefix("root") {
            Some(rest) if rest.is_empty() || rest.starts_with('[') => {
                parse_bracketed(pattern, rest)?
            }
            _ => parse_dotted(pattern, trimmed)?,
        };

        Ok(Self {
            source: trimmed.to_string(),
            matchers,
        })
    }

    /// Whether this pattern covers `path` (the path itself or an ancestor).
    pub fn matches(&self, path: &Path) -> bool {
        let segments = path.segments();
        self.matchers.len() <= segments.len()
            && self
                .matchers
                .iter()
                .zip(segments)
                .all(|(matcher, segment)| matcher.matches(segment))
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl FromStr for ExclusionPattern {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ExclusionPattern {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<ExclusionPattern> for String {
    fn from(pattern: ExclusionPattern) -> Self {
        pattern.source
    }
}

impl fmt::Display for ExclusionPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn parse_bracketed(pattern: &str, mut rest: &str) -> Result<Vec<Matcher>> {
    let mut matchers = Vec::new();

    while !rest.is_empty() {
        rest = rest
            .strip_prefix('[')
            .ok_or_else(|| AppError::pattern(pattern, format!("expected '[' at '{}'", rest)))?;

        if let Some(quote) = rest.chars().next().filter(|c| *c == '\'' || *c == '"') {
            let (key, consumed) = read_quoted(pattern, &rest[1..], quote)?;
            rest = &rest[1 + consumed..];
            rest = rest
                .strip_prefix(']')
                .ok_or_else(|| AppError::pattern(pattern, "expected ']' after quoted key"))?;
            matchers.push(Matcher::Key(key));
        } else {
            let end = rest
                .find(']')
                .ok_or_else(|| AppError::pattern(pattern, "unterminated '['"))?;
            let inner = rest[..end].trim();
            rest = &rest[end + 1..];
            matchers.push(match inner {
                "*" => Matcher::Any,
                digits if is_position(digits) => return Err(position_error(pattern, digits)),
                other => {
                    return Err(AppError::pattern(
                        pattern,
                        format!("'{}' is neither '*' nor a quoted key", other),
                    ));
                }
            });
        }
    }

    Ok(matchers)
}

/// Read a quoted key; returns the key and the bytes consumed including the
/// closing quote.
fn read_quoted(pattern: &str, input: &str, quote: char) -> Result<(String, usize)> {
    let mut key = String::new();
    let mut escaped = false;

    for (offset, c) in input.char_indices() {
        if escaped {
            key.push(c);
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == quote {
            return Ok((key, offset + c.len_utf8()));
        } else {
            key.push(c);
        }
    }

    Err(AppError::pattern(pattern, "unterminated quoted key"))
}

fn parse_dotted(pattern: &str, body: &str) -> Result<Vec<Matcher>> {
    body.split('.')
        .map(|segment| match segment {
            "" => Err(AppError::pattern(pattern, "empty segment")),
            "*" => Ok(Matcher::Any),
            digits if is_position(digits) => Err(position_error(pattern, digits)),
            key => Ok(Matcher::Key(key.to_string())),
        })
        .collect()
}

fn is_position(segment: &str) -> bool {
    !segment.is_empty() && segment.chars().all(|c| c.is_ascii_digit())
}

fn position_error(pattern: &str, position: &str) -> AppError {
    AppError::pattern(
        pattern,
        format!(
            "sequence position {} is not stable across snapshots; use '*'",
            position
        ),
    )
}

/// A set of compiled exclusion patterns.
#[derive(Debug, Clone, Default)]
pub struct ExclusionSet {
    patterns: Vec<ExclusionPattern>,
}

impl ExclusionSet {
    pub fn new(patterns: Vec<ExclusionPattern>) -> Self {
        Self { patterns }
    }

    /// Compile a set from raw pattern strings.
    pub fn parse<I, S>(patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|p| ExclusionPattern::parse(p.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    /// Whether any pattern suppresses changes at `path`.
    pub fn is_excluded(&self, path: &Path) -> bool {
        self.patterns.iter().any(|p| p.matches(path))
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn patterns(&self) -> &[ExclusionPattern] {
        &self.patterns
    }
}
