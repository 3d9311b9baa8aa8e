//! Cross-file frequency index

use std::path::{Path, PathBuf};

use ahash::AHashMap;

use crate::origin::distinct_origin_names;
use crate::plan::ColumnSnapshot;
use crate::value::CellValue;

/// Occurrences of one value across the indexed files
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct FrequencyEntry {
    /// Number of cells holding the value, across every file
    pub count: usize,
    /// One file path per occurrence, in indexing order
    pub origins: Vec<PathBuf>,
}

impl FrequencyEntry {
    /// Whether the value occurs more than once
    pub fn is_duplicate(&self) -> bool {
        self.count > 1
    }

    /// Distinct base names of the files holding the value, sorted
    pub fn distinct_origins(&self) -> Vec<String> {
        distinct_origin_names(&self.origins)
    }
}

/// Mapping from each distinct value to its [`FrequencyEntry`].
///
/// Built fresh for every run over the exact file set that is later annotated.
/// Counts do not depend on the order in which files are recorded; only the
/// order of each entry's `origins` does.
#[derive(Debug, Clone, Default)]
pub struct FrequencyIndex {
    entries: AHashMap<CellValue, FrequencyEntry>,
    cells: usize,
}

impl FrequencyIndex {
    /// Create an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one occurrence of `value` in `origin`
    pub fn record(&mut self, value: CellValue, origin: &Path) {
        let entry = self.entries.entry(value).or_insert_with(|| FrequencyEntry {
            count: 0,
            origins: Vec::new(),
        });
        entry.count += 1;
        entry.origins.push(origin.to_path_buf());
        self.cells += 1;
    }

    /// Record every cell of a column snapshot, top to bottom
    pub fn record_column(&mut self, column: &ColumnSnapshot, origin: &Path) {
        for value in column.values() {
            self.record(value.clone(), origin);
        }
    }

    /// Fold another index into this one.
    ///
    /// Origins of `other` are appended after the ones already recorded, so
    /// merging per-file indices in file order reproduces a sequential scan.
    pub fn merge(&mut self, other: FrequencyIndex) {
        for (value, theirs) in other.entries {
            match self.entries.get_mut(&value) {
                Some(ours) => {
                    ours.count += theirs.count;
                    ours.origins.extend(theirs.origins);
                }
                None => {
                    self.entries.insert(value, theirs);
                }
            }
        }
        self.cells += other.cells;
    }

    /// Look up the entry of a value
    pub fn get(&self, value: &CellValue) -> Option<&FrequencyEntry> {
        self.entries.get(value)
    }

    /// Occurrence count of a value (0 when never seen)
    pub fn count(&self, value: &CellValue) -> usize {
        self.get(value).map_or(0, |e| e.count)
    }

    /// Whether a value occurs more than once
    pub fn is_duplicate(&self, value: &CellValue) -> bool {
        self.count(value) > 1
    }

    /// Distinct base names of the files holding `value`, sorted
    pub fn distinct_origins(&self, value: &CellValue) -> Vec<String> {
        self.get(value)
            .map(FrequencyEntry::distinct_origins)
            .unwrap_or_default()
    }

    /// Number of distinct values
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing was indexed
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of cells recorded, duplicates included
    pub fn total_cells(&self) -> usize {
        self.cells
    }

    /// Iterate over all entries in unspecified order
    pub fn iter(&self) -> impl Iterator<Item = (&CellValue, &FrequencyEntry)> {
        self.entries.iter()
    }

    /// All entries, sorted by value
    pub fn sorted(&self) -> Vec<(&CellValue, &FrequencyEntry)> {
        let mut entries: Vec<_> = self.entries.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries
    }

    /// Entries whose count is greater than one, sorted by value
    pub fn duplicates(&self) -> Vec<(&CellValue, &FrequencyEntry)> {
        let mut entries: Vec<_> = self
            .entries
            .iter()
            .filter(|(_, e)| e.is_duplicate())
            .collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries
    }
}
