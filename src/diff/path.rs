// src/diff/path.rs

//! Addressing scheme for values inside a snapshot.
//!
//! A path is rendered the way change reports print it, e.g.
//! `root['contents'][0]['modules']`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One step into a nested value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Segment {
    /// Mapping key
    Key(String),
    /// Sequence position
    Index(usize),
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Key(key) => {
                let escaped = key.replace('\\', "\\\\").replace('\'', "\\'");
                write!(f, "['{}']", escaped)
            }
            Segment::Index(index) => write!(f, "[{}]", index),
        }
    }
}

/// Location of a value, starting at the snapshot root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Path(Vec<Segment>);

impl Path {
    /// The snapshot root.
    pub fn root() -> Self {
        Self::default()
    }

    /// Extend the path by a mapping key.
    pub fn key(&self, key: &str) -> Self {
        self.child(Segment::Key(key.to_string()))
    }

    /// Extend the path by a sequence index.
    pub fn index(&self, index: usize) -> Self {
        self.child(Segment::Index(index))
    }

    fn child(&self, segment: Segment) -> Self {
        let mut segments = Vec::with_capacity(self.0.len() + 1);
        segments.extend_from_slice(&self.0);
        segments.push(segment);
        Self(segments)
    }

    pub fn segments(&self) -> &[Segment] {
        &self.0
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }
}

impl From<Vec<Segment>> for Path {
    fn from(segments: Vec<Segment>) -> Self {
        Self(segments)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("root")?;
        for segment in &self.0 {
            write!(f, "{}", segment)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_root() {
        assert_eq!(Path::root().to_string(), "root");
    }

    #[test]
    fn test_display_nested() {
        let path = Path::root().key("contents").index(0).key("modules");
        assert_eq!(path.to_string(), "root['contents'][0]['modules']");
        assert_eq!(path.depth(), 3);
    }

    #[test]
    fn test_display_escapes_quotes() {
        let path = Path::root().key("it's");
        assert_eq!(path.to_string(), "root['it\\'s']");
    }

    #[test]
    fn test_display_escapes_backslash_before_quote() {
        assert_eq!(Path::root().key("a\\").to_string(), "root['a\\\\']");
        assert_eq!(Path::root().key("\\'").to_string(), "root['\\\\\\'']");
    }

    #[test]
    fn test_serializes_as_segment_list() {
        let path = Path::root().key("b").index(3);
        let json = serde_json::to_value(&path).unwrap();
        assert_eq!(json, serde_json::json!(["b", 3]));
    }
}
