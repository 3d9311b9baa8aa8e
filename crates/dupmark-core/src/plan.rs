//! Duplicate classification
//!
//! Annotation is planned against an immutable snapshot of the designated
//! column, so the decision of what to mark is independent from the workbook
//! format that is later rewritten.

use crate::address::CellAddress;
use crate::error::{Error, Result};
use crate::index::FrequencyIndex;
use crate::value::CellValue;
use crate::{DESIGNATED_COLUMN, MAX_COLS};

/// Values of the designated column, one per row, starting at row 1.
///
/// Rows without a cell in the column are [`CellValue::Empty`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnSnapshot {
    values: Vec<CellValue>,
}

impl ColumnSnapshot {
    /// Create a snapshot from the values of rows 1..=n
    pub fn new(values: Vec<CellValue>) -> Self {
        Self { values }
    }

    /// Build a snapshot of `row_count` rows from sparse `(row, value)` pairs.
    ///
    /// Rows are zero-based; pairs beyond `row_count` are ignored and later
    /// pairs for the same row win.
    pub fn from_sparse<I>(row_count: u32, cells: I) -> Self
    where
        I: IntoIterator<Item = (u32, CellValue)>,
    {
        let mut values = vec![CellValue::Empty; row_count as usize];
        for (row, value) in cells {
            if let Some(slot) = values.get_mut(row as usize) {
                *slot = value;
            }
        }
        Self { values }
    }

    /// Values, top to bottom
    pub fn values(&self) -> &[CellValue] {
        &self.values
    }

    /// `(zero-based row, value)` pairs, top to bottom
    pub fn rows(&self) -> impl Iterator<Item = (u32, &CellValue)> {
        self.values.iter().enumerate().map(|(i, v)| (i as u32, v))
    }

    /// Number of rows in the snapshot
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the snapshot has no rows
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// One change to apply to a worksheet
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellEdit {
    /// Apply the duplicate marker to the designated-column cell of `row`.
    /// The cell value is kept.
    Mark {
        /// Zero-based row
        row: u32,
    },
    /// Write an origin file name into `(row, col)`, replacing any value there
    Origin {
        /// Zero-based row
        row: u32,
        /// Zero-based column, right of the designated column
        col: u16,
        /// Base name of the origin file
        name: String,
    },
}

impl CellEdit {
    /// Create a marker edit
    pub fn mark(row: u32) -> Self {
        CellEdit::Mark { row }
    }

    /// Create an origin edit
    pub fn origin<S: Into<String>>(row: u32, col: u16, name: S) -> Self {
        CellEdit::Origin {
            row,
            col,
            name: name.into(),
        }
    }

    /// Address of the cell this edit touches
    pub fn address(&self) -> CellAddress {
        match self {
            CellEdit::Mark { row } => CellAddress::new(*row, DESIGNATED_COLUMN),
            CellEdit::Origin { row, col, .. } => CellAddress::new(*row, *col),
        }
    }
}

/// The edits planned for one worksheet, in row-major order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnnotationPlan {
    edits: Vec<CellEdit>,
}

impl AnnotationPlan {
    /// All edits, row by row, marker first then origins left to right
    pub fn edits(&self) -> &[CellEdit] {
        &self.edits
    }

    /// Consume the plan
    pub fn into_edits(self) -> Vec<CellEdit> {
        self.edits
    }

    /// Zero-based rows receiving the marker
    pub fn marked_rows(&self) -> Vec<u32> {
        self.edits
            .iter()
            .filter_map(|e| match e {
                CellEdit::Mark { row } => Some(*row),
                CellEdit::Origin { .. } => None,
            })
            .collect()
    }

    /// Number of marked cells
    pub fn marked_count(&self) -> usize {
        self.edits
            .iter()
            .filter(|e| matches!(e, CellEdit::Mark { .. }))
            .count()
    }

    /// Number of origin cells to write
    pub fn origin_count(&self) -> usize {
        self.edits.len() - self.marked_count()
    }

    /// Whether the worksheet needs no change
    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }
}

/// Decide which cells of `column` are duplicates and what to write beside them.
///
/// Every value of `column` must be a key of `index`; a missing key means the
/// index was built over other files and yields [`Error::UnindexedValue`].
/// With `show_origins`, each duplicate row gets the distinct origin names of
/// its value in the columns right of the designated one, sorted by name.
pub fn plan_annotations(
    column: &ColumnSnapshot,
    index: &FrequencyIndex,
    show_origins: bool,
) -> Result<AnnotationPlan> {
    let mut edits = Vec::new();

    for (row, value) in column.rows() {
        let entry = index.get(value).ok_or_else(|| Error::UnindexedValue {
            row,
            value: value.clone(),
        })?;

        if !entry.is_duplicate() {
            continue;
        }

        edits.push(CellEdit::mark(row));

        if show_origins {
            for (i, name) in entry.distinct_origins().into_iter().enumerate() {
                let col = DESIGNATED_COLUMN as usize + 1 + i;
                if col >= MAX_COLS as usize {
                    return Err(Error::ColumnOutOfBounds(col as u32, MAX_COLS - 1));
                }
                edits.push(CellEdit::origin(row, col as u16, name));
            }
        }
    }

    Ok(AnnotationPlan { edits })
}
