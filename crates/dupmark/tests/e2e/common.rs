//! Common utilities for E2E tests.

use std::fs;
use std::path::{Path, PathBuf};

use dupmark::FileSet;
use dupmark_core::{CellAddress, CellValue};
use dupmark_xlsx::{XlsxBuilder, XlsxDocument, XlsxReader};

pub const RED: &str = "FFFF0000";

/// Write a single-sheet workbook with `values` in column A
pub fn write_column(dir: &Path, name: &str, values: &[i64]) -> PathBuf {
    let path = dir.join(name);
    XlsxBuilder::new()
        .column(values.iter().copied())
        .write_file(&path)
        .expect("write workbook");
    path
}

/// The A/B scenario: `A.xlsx = [1,2,3]`, `B.xlsx = [2,3,3]`
pub fn scenario(dir: &Path) -> FileSet {
    [
        write_column(dir, "A.xlsx", &[1, 2, 3]),
        write_column(dir, "B.xlsx", &[2, 3, 3]),
    ]
    .into_iter()
    .collect()
}

pub fn read(path: &Path) -> XlsxDocument {
    XlsxReader::read_file(path).expect("readable workbook")
}

/// Rows of column A that carry the marker color
pub fn marked_rows(doc: &XlsxDocument) -> Vec<u32> {
    (0..doc.row_count())
        .filter(|&row| doc.font_color(CellAddress::new(row, 0)).as_deref() == Some(RED))
        .collect()
}

/// Text values of a row from column B up to the first empty cell
pub fn origins_in_row(doc: &XlsxDocument, row: u32) -> Vec<String> {
    (1u16..)
        .map(|col| doc.value_at(row, col))
        .take_while(|v| !v.is_empty())
        .map(|v| match v {
            CellValue::Text(s) => s,
            other => panic!("unexpected origin value {other:?}"),
        })
        .collect()
}

/// Raw bytes of every file, in set order
pub fn snapshot(files: &FileSet) -> Vec<Vec<u8>> {
    files.iter().map(|p| fs::read(p).expect("readable file")).collect()
}
