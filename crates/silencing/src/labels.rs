//! Label Extraction
//!
//! Parses the human-readable `firing` narrative that Alertmanager renders
//! into a PagerDuty alert. The narrative repeats one block per firing alert:
//!
//! ```text
//! - Labels:
//!   - alertname=HighCPU
//!   - instance=node1
//! - Annotations:
//!   - summary=CPU high
//! ```

use std::collections::btree_map::{self, BTreeMap};

use tracing::debug;

/// Marker opening a labels section
const LABELS_MARKER: &str = "Labels:";

/// Marker closing a labels section
const ANNOTATIONS_MARKER: &str = "Annotations:";

/// List item prefix in front of narrative lines
const LIST_ITEM_PREFIX: &str = "- ";

/// Separator used when a label carries more than one value
pub const ALTERNATION_SEPARATOR: char = '|';

/// Label name to value mapping extracted from a narrative
///
/// Iteration follows key order, so the same narrative always produces the
/// same sequence of entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelSet {
    labels: BTreeMap<String, String>,
}

impl LabelSet {
    /// Create an empty label set
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a value into the set
    ///
    /// An absent key is inserted. A key whose current value equals `value`
    /// exactly is left alone. Any other value is appended as a new
    /// alternative, even one that already appears inside an alternation.
    /// Empty names are rejected and empty values never touch an existing
    /// entry.
    ///
    /// Returns `true` if the set changed.
    pub fn insert_merged(&mut self, name: &str, value: &str) -> bool {
        if name.is_empty() {
            return false;
        }

        match self.labels.entry(name.to_string()) {
            btree_map::Entry::Vacant(entry) => {
                entry.insert(value.to_string());
                true
            }
            btree_map::Entry::Occupied(mut entry) => {
                if value.is_empty() {
                    return false;
                }
                let existing = entry.get_mut();
                if existing.as_str() == value {
                    return false;
                }
                existing.push(ALTERNATION_SEPARATOR);
                existing.push_str(value);
                true
            }
        }
    }

    /// Look up the value of a label
    pub fn get(&self, name: &str) -> Option<&str> {
        self.labels.get(name).map(String::as_str)
    }

    /// Number of labels
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Whether no labels were found
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Iterate over `(name, value)` pairs in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.labels.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for LabelSet {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut set = Self::new();
        for (name, value) in iter {
            let (name, value): (String, String) = (name.into(), value.into());
            set.insert_merged(&name, &value);
        }
        set
    }
}

/// Extract and merge the labels of every `Labels:` block in a narrative
///
/// Never fails: lines that are not `key=value` pairs are skipped. A
/// narrative without any `Labels:` marker yields an empty set, and deciding
/// whether that is acceptable is up to the caller.
pub fn extract_labels(narrative: &str) -> LabelSet {
    let mut labels = LabelSet::new();

    // Text ahead of the first marker belongs to no block.
    for segment in narrative.split(LABELS_MARKER).skip(1) {
        if segment.trim().is_empty() {
            continue;
        }
        let block = format!("{LABELS_MARKER}{segment}");

        for (name, value) in extract_block_labels(&block) {
            labels.insert_merged(&name, &value);
        }
    }

    debug!("Extracted {} labels from narrative", labels.len());
    labels
}

/// Extract the labels of a single block, stopping at `Annotations:`
///
/// A key repeated inside one block keeps its last non-empty value.
fn extract_block_labels(block: &str) -> BTreeMap<String, String> {
    let mut labels = BTreeMap::new();
    let mut in_labels = false;

    for line in block.lines() {
        let line = line.trim();
        let line = line.strip_prefix(LIST_ITEM_PREFIX).unwrap_or(line);

        if line.starts_with(LABELS_MARKER) {
            in_labels = true;
            continue;
        }
        if line.starts_with(ANNOTATIONS_MARKER) {
            break;
        }
        if !in_labels {
            continue;
        }

        let Some((name, value)) = line.split_once('=') else {
            continue;
        };
        let (name, value) = (name.trim(), value.trim());
        if name.is_empty() {
            continue;
        }
        if value.is_empty() && labels.contains_key(name) {
            continue;
        }
        labels.insert(name.to_string(), value.to_string());
    }

    labels
}
