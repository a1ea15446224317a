// src/diff/structural.rs

//! Deep comparison of two snapshots.
//!
//! Mappings are compared key by key, sequences as multisets (element order
//! never matters, duplicate counts do), and scalars by strict equality:
//! `1` and `"1"` differ, and a value that changes type is reported as a
//! single change rather than a removal plus an addition.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::diff::exclude::ExclusionSet;
use crate::diff::path::Path;
use crate::error::{AppError, Result};

/// Default nesting limit for traversal.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// A scalar (or type-mismatched) value that differs between snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueChange {
    pub path: Path,
    pub old: Value,
    pub new: Value,
}

/// An element present in one sequence with no equal counterpart in the other.
///
/// Sequences are compared as multisets, so an element is identified by the
/// sequence holding it and its value, never by its position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceChange {
    /// Path of the sequence holding the element
    pub path: Path,
    pub value: Value,
}

/// Outcome of comparing two snapshots.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiffResult {
    /// Mapping entries present only in the new snapshot
    pub added: Vec<Path>,
    /// Mapping entries present only in the old snapshot
    pub removed: Vec<Path>,
    /// Values present on both sides that differ
    pub changed: Vec<ValueChange>,
    /// Sequence elements present only in the new snapshot
    pub sequence_added: Vec<SequenceChange>,
    /// Sequence elements present only in the old snapshot
    pub sequence_removed: Vec<SequenceChange>,
}

impl DiffResult {
    /// Check if there are any changes.
    pub fn has_changes(&self) -> bool {
        self.change_count() > 0
    }

    pub fn is_empty(&self) -> bool {
        !self.has_changes()
    }

    /// Get the total number of changes.
    pub fn change_count(&self) -> usize {
        self.added.len()
            + self.removed.len()
            + self.changed.len()
            + self.sequence_added.len()
            + self.sequence_removed.len()
    }
}

/// Computes a [`DiffResult`] between two JSON values.
#[derive(Debug, Clone)]
pub struct StructuralDiffer {
    exclusions: ExclusionSet,
    max_depth: usize,
}

impl Default for StructuralDiffer {
    fn default() -> Self {
        Self::new(ExclusionSet::default())
    }
}

impl StructuralDiffer {
    /// Create a differ with the given exclusions and the default depth limit.
    pub fn new(exclusions: ExclusionSet) -> Self {
        Self {
            exclusions,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn exclusions(&self) -> &ExclusionSet {
        &self.exclusions
    }

    /// Compare `old` against `new`.
    ///
    /// Fails with `InvalidSnapshot` when either side is `null` at the top
    /// level and with `DepthExceeded` when nesting passes the limit.
    pub fn diff(&self, old: &Value, new: &Value) -> Result<DiffResult> {
        if old.is_null() {
            return Err(AppError::invalid_snapshot("old", "top-level value is null"));
        }
        if new.is_null() {
            return Err(AppError::invalid_snapshot("new", "top-level value is null"));
        }

        let mut result = DiffResult::default();
        self.compare(&Path::root(), old, new, &mut result)?;
        Ok(result)
    }

    fn check_depth(&self, path: &Path) -> Result<()> {
        if path.depth() > self.max_depth {
            return Err(AppError::DepthExceeded {
                limit: self.max_depth,
                path: path.to_string(),
            });
        }
        Ok(())
    }

    fn compare(&self, path: &Path, old: &Value, new: &Value, out: &mut DiffResult) -> Result<()> {
        if self.exclusions.is_excluded(path) {
            return Ok(());
        }
        self.check_depth(path)?;

        match (old, new) {
            (Value::Object(old_map), Value::Object(new_map)) => {
                self.compare_maps(path, old_map, new_map, out)
            }
            (Value::Array(old_seq), Value::Array(new_seq)) => {
                self.compare_sequences(path, old_seq, new_seq, out)
            }
            _ if old == new => Ok(()),
            _ => {
                out.changed.push(ValueChange {
                    path: path.clone(),
                    old: old.clone(),
                    new: new.clone(),
                });
                Ok(())
            }
        }
    }

    fn compare_maps(
        &self,
        path: &Path,
        old: &Map<String, Value>,
        new: &Map<String, Value>,
        out: &mut DiffResult,
    ) -> Result<()> {
        for (key, old_value) in old {
            let child = path.key(key);
            match new.get(key) {
                Some(new_value) => self.compare(&child, old_value, new_value, out)?,
                None if !self.exclusions.is_excluded(&child) => out.removed.push(child),
                None => {}
            }
        }

        for key in new.keys().filter(|k| !old.contains_key(*k)) {
            let child = path.key(key);
            if !self.exclusions.is_excluded(&child) {
                out.added.push(child);
            }
        }

        Ok(())
    }

    fn compare_sequences(
        &self,
        path: &Path,
        old: &[Value],
        new: &[Value],
        out: &mut DiffResult,
    ) -> Result<()> {
        let old_items = self.fingerprint_elements(path, old)?;
        let new_items = self.fingerprint_elements(path, new)?;

        // Unmatched new elements per canonical key.
        let mut unmatched: HashMap<&str, Vec<&Element>> = HashMap::new();
        for item in &new_items {
            unmatched.entry(item.key.as_str()).or_default().push(item);
        }

        let mut removed: Vec<&Element> = Vec::new();
        for item in &old_items {
            let matched = unmatched
                .get_mut(item.key.as_str())
                .and_then(Vec::pop)
                .is_some();
            if !matched {
                removed.push(item);
            }
        }
        let mut added: Vec<&Element> = unmatched.into_values().flatten().collect();

        // Canonical key order keeps the result independent of element order.
        removed.sort_by(|a, b| a.key.cmp(&b.key));
        added.sort_by(|a, b| a.key.cmp(&b.key));

        out.sequence_removed
            .extend(removed.into_iter().map(|item| item.change(path)));
        out.sequence_added
            .extend(added.into_iter().map(|item| item.change(path)));

        Ok(())
    }

    /// Project every element of a sequence, dropping excluded ones.
    ///
    /// Exclusions reach elements only through `[*]`, so the same elements
    /// survive whatever their order.
    fn fingerprint_elements(&self, path: &Path, items: &[Value]) -> Result<Vec<Element>> {
        let element_path = path.index(0);
        if self.exclusions.is_excluded(&element_path) {
            return Ok(Vec::new());
        }

        items
            .iter()
            .map(|value| {
                let projected = self.project_children(&element_path, value)?;
                let key = serde_json::to_string(&canonicalize(&projected)?)?;
                Ok(Element { key, projected })
            })
            .collect()
    }

    /// Copy of `value` with every excluded descendant removed, or `None`
    /// when `path` itself is excluded.
    fn project(&self, path: &Path, value: &Value) -> Result<Option<Value>> {
        if self.exclusions.is_excluded(path) {
            return Ok(None);
        }
        self.project_children(path, value).map(Some)
    }

    fn project_children(&self, path: &Path, value: &Value) -> Result<Value> {
        self.check_depth(path)?;

        Ok(match value {
            Value::Object(map) => {
                let mut kept = Map::new();
                for (key, child) in map {
                    if let Some(child) = self.project(&path.key(key), child)? {
                        kept.insert(key.clone(), child);
                    }
                }
                Value::Object(kept)
            }
            Value::Array(items) => {
                // Elements share one wildcard-only path, as in `fingerprint_elements`.
                let element_path = path.index(0);
                if self.exclusions.is_excluded(&element_path) {
                    Value::Array(Vec::new())
                } else {
                    items
                        .iter()
                        .map(|child| self.project_children(&element_path, child))
                        .collect::<Result<Vec<_>>>()
                        .map(Value::Array)?
                }
            }
            scalar => scalar.clone(),
        })
    }
}

/// A sequence element prepared for multiset matching.
struct Element {
    key: String,
    projected: Value,
}

impl Element {
    fn change(&self, path: &Path) -> SequenceChange {
        SequenceChange {
            path: path.clone(),
            value: self.projected.clone(),
        }
    }
}

/// Order-insensitive normal form: every nested sequence is sorted by the
/// serialized form of its canonical elements.
fn canonicalize(value: &Value) -> Result<Value> {
    Ok(match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            let mut canonical = Map::new();
            for (key, child) in entries {
                canonical.insert(key.clone(), canonicalize(child)?);
            }
            Value::Object(canonical)
        }
        Value::Array(items) => {
            let mut keyed = items
                .iter()
                .map(|item| {
                    let canonical = canonicalize(item)?;
                    let key = serde_json::to_string(&canonical)?;
                    Ok((key, canonical))
                })
                .collect::<Result<Vec<_>>>()?;
            keyed.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Array(keyed.into_iter().map(|(_, v)| v).collect())
        }
        scalar => scalar.clone(),
    })
}

/// Convenience function to diff without exclusions.
pub fn diff_values(old: &Value, new: &Value) -> Result<DiffResult> {
    StructuralDiffer::default().diff(old, new)
}
