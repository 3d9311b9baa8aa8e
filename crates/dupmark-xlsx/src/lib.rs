//! # dupmark-xlsx
//!
//! XLSX (Office Open XML) support for dupmark.
//!
//! - [`XlsxReader`] opens a workbook, resolves its active sheet and takes an
//!   [`XlsxDocument`] snapshot of that sheet's cells.
//! - [`XlsxPatcher`] applies [`CellEdit`](dupmark_core::CellEdit)s to a document and
//!   writes the result. Only the active worksheet part and the stylesheet are
//!   rewritten; every other ZIP entry is copied byte-for-byte.
//! - [`XlsxBuilder`] writes small workbooks from scratch (test data, fixtures).

pub mod builder;
pub mod error;
pub mod package;
pub mod patch;
pub mod reader;

mod rels;
mod styles;
mod xml;

pub use builder::XlsxBuilder;
pub use error::{XlsxError, XlsxResult};
pub use package::PackageLayout;
pub use patch::{PatchStats, XlsxPatcher};
pub use reader::{CellRecord, XlsxDocument, XlsxReader};
