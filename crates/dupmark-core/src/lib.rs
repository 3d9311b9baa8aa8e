//! # dupmark-core
//!
//! Core data structures for the dupmark duplicate marker.
//!
//! This crate holds everything that does not touch the file system:
//! - [`CellValue`] - the value of a designated-column cell, usable as an index key
//! - [`CellAddress`] - zero-based cell coordinates with A1 formatting
//! - [`FrequencyIndex`] - cross-file occurrence counts and origins per value
//! - [`ColumnSnapshot`] and [`plan_annotations`] - the pure duplicate classification
//! - [`RunConfig`] - the options of one run
//!
//! ## Example
//!
//! ```rust
//! use std::path::Path;
//! use dupmark_core::{plan_annotations, CellEdit, CellValue, ColumnSnapshot, FrequencyIndex};
//!
//! let a = ColumnSnapshot::new(vec![CellValue::from(1.0), CellValue::from(2.0)]);
//! let b = ColumnSnapshot::new(vec![CellValue::from(2.0)]);
//!
//! let mut index = FrequencyIndex::new();
//! index.record_column(&a, Path::new("A.xlsx"));
//! index.record_column(&b, Path::new("B.xlsx"));
//!
//! let plan = plan_annotations(&a, &index, true).unwrap();
//! assert_eq!(plan.marked_rows(), vec![1]);
//! assert!(plan.edits().contains(&CellEdit::origin(1, 1, "A.xlsx")));
//! ```

pub mod address;
pub mod color;
pub mod config;
pub mod error;
pub mod index;
pub mod origin;
pub mod plan;
pub mod value;

// Re-exports for convenience
pub use address::CellAddress;
pub use color::Color;
pub use config::RunConfig;
pub use error::{Error, Result};
pub use index::{FrequencyEntry, FrequencyIndex};
pub use origin::{distinct_origin_names, origin_name};
pub use plan::{plan_annotations, AnnotationPlan, CellEdit, ColumnSnapshot};
pub use value::CellValue;

/// Maximum number of rows in a worksheet (Excel limit)
pub const MAX_ROWS: u32 = 1_048_576;

/// Maximum number of columns in a worksheet (Excel limit)
pub const MAX_COLS: u16 = 16_384;

/// Column scanned for duplicates (column A)
pub const DESIGNATED_COLUMN: u16 = 0;
