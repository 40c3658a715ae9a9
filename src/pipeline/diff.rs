// src/pipeline/diff.rs

//! Diff of freshly extracted identifiers against the seen set.

use std::collections::HashSet;

use crate::models::SeenSet;

/// Identifiers that appeared for the first time in a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffResult {
    /// New identifiers, in extraction order, without duplicates
    pub added: Vec<String>,
    /// Distinct identifiers extracted this run
    pub extracted_count: usize,
}

impl DiffResult {
    pub fn has_changes(&self) -> bool {
        !self.added.is_empty()
    }
}

/// Return the identifiers of `extracted` that are not in `seen`.
///
/// Duplicates within `extracted` are collapsed; the first occurrence keeps
/// its position.
pub fn calculate_diff(seen: &SeenSet, extracted: &[String]) -> DiffResult {
    let mut distinct = HashSet::new();
    let mut added = Vec::new();

    for id in extracted {
        if !distinct.insert(id.as_str()) {
            continue;
        }
        if !seen.contains(id) {
            added.push(id.clone());
        }
    }

    DiffResult {
        added,
        extracted_count: distinct.len(),
    }
}

/// Seen set grown by `extracted`.
pub fn merge_seen(seen: &SeenSet, extracted: &[String]) -> SeenSet {
    let mut merged = seen.clone();
    merged.extend(extracted.iter().cloned());
    merged
}
