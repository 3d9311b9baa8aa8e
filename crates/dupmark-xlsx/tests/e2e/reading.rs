//! Tests for reading the designated column of the active sheet.

use std::io::{Cursor, Write};

use dupmark_core::{CellAddress, CellValue};
use dupmark_xlsx::{XlsxBuilder, XlsxError, XlsxReader};
use pretty_assertions::assert_eq;

#[test]
fn test_read_file_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("numbers.xlsx");
    XlsxBuilder::new()
        .column([10, 20, 10])
        .write_file(&path)
        .unwrap();

    let doc = XlsxReader::read_file(&path).expect("Failed to read workbook");
    assert_eq!(
        doc.column().values(),
        &[CellValue::from(10), CellValue::from(20), CellValue::from(10)]
    );
    assert_eq!(doc.layout().styles_part.as_deref(), Some("xl/styles.xml"));
    assert_eq!(doc.layout().shared_strings_part, None);
}

#[test]
fn test_column_extends_to_last_row_of_any_column() {
    let bytes = XlsxBuilder::new()
        .cell(0, 0, "head")
        .cell(3, 1, "only in B")
        .to_bytes()
        .unwrap();
    let doc = XlsxReader::read(bytes).unwrap();

    assert_eq!(doc.row_count(), 4);
    assert_eq!(
        doc.column().values(),
        &[
            CellValue::from("head"),
            CellValue::Empty,
            CellValue::Empty,
            CellValue::Empty
        ]
    );
}

#[test]
fn test_typed_values_stay_distinct() {
    let bytes = XlsxBuilder::new()
        .column(vec![
            CellValue::from(3),
            CellValue::from("3"),
            CellValue::from(true),
            CellValue::Error("#DIV/0!".into()),
        ])
        .shared_strings(true)
        .to_bytes()
        .unwrap();
    let doc = XlsxReader::read(bytes).unwrap();

    let values = doc.column().values();
    assert_eq!(values[0], CellValue::Number(3.0));
    assert_eq!(values[1], CellValue::Text("3".into()));
    assert_ne!(values[0], values[1]);
    assert_eq!(values[2], CellValue::Boolean(true));
    assert_eq!(values[3], CellValue::Error("#DIV/0!".into()));
}

#[test]
fn test_only_active_sheet_is_read() {
    let bytes = XlsxBuilder::new()
        .sheet("First")
        .column(["first"])
        .sheet("Second")
        .column(["second"])
        .active_tab(1)
        .to_bytes()
        .unwrap();
    let doc = XlsxReader::read(bytes).unwrap();

    assert_eq!(doc.layout().sheet_index, 1);
    assert_eq!(doc.value_at(0, 0), CellValue::from("second"));
    assert!(doc.cell(CellAddress::new(0, 1)).is_none());
}

#[test]
fn test_builder_bold_cell_has_no_colour() {
    let bytes = XlsxBuilder::new()
        .styled_cell(0, 0, 1, dupmark_xlsx::builder::BOLD_STYLE)
        .to_bytes()
        .unwrap();
    let doc = XlsxReader::read(bytes).unwrap();
    assert_eq!(doc.cells()[0].style, Some(1));
    assert_eq!(doc.font_color(CellAddress::new(0, 0)), None);
}

#[test]
fn test_garbage_is_rejected() {
    let result = XlsxReader::read(b"definitely not a zip file".to_vec());
    assert!(matches!(result, Err(XlsxError::Zip(_))));
}

#[test]
fn test_zip_without_content_types_is_rejected() {
    let mut out = Cursor::new(Vec::new());
    {
        let mut zip = zip::ZipWriter::new(&mut out);
        zip.start_file("hello.txt", zip::write::SimpleFileOptions::default())
            .unwrap();
        zip.write_all(b"hello").unwrap();
        zip.finish().unwrap();
    }

    let result = XlsxReader::read(out.into_inner());
    assert!(matches!(result, Err(XlsxError::InvalidFormat(_))));
}

#[test]
fn test_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let result = XlsxReader::read_file(dir.path().join("absent.xlsx"));
    assert!(matches!(result, Err(XlsxError::Io(_))));
}
