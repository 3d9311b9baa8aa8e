//! Tests for patching: marker formats, origin cells and part preservation.

use dupmark_core::{CellAddress, CellEdit, CellValue, Color};
use dupmark_xlsx::{XlsxBuilder, XlsxError, XlsxPatcher, XlsxReader};
use pretty_assertions::assert_eq;

use crate::{entries, entry_names, entry_text};

const RED: &str = "FFFF0000";

fn sample() -> Vec<u8> {
    XlsxBuilder::new()
        .sheet("Notes")
        .column(["keep me"])
        .sheet("Data")
        .column([1, 2, 3])
        .cell(1, 1, "old B2")
        .cell(1, 4, "far right")
        .active_tab(1)
        .shared_strings(true)
        .to_bytes()
        .unwrap()
}

#[test]
fn test_marks_change_colour_not_values() {
    let doc = XlsxReader::read(sample()).unwrap();
    let (bytes, stats) = XlsxPatcher::default()
        .patch(&doc, &[CellEdit::mark(1), CellEdit::mark(2)])
        .unwrap();
    assert_eq!(stats.marked_cells, 2);
    assert_eq!(stats.marker_styles, 1);

    let patched = XlsxReader::read(bytes).unwrap();
    assert_eq!(patched.column(), doc.column());
    assert_eq!(patched.font_color(CellAddress::new(0, 0)), None);
    assert_eq!(
        patched.font_color(CellAddress::new(1, 0)).as_deref(),
        Some(RED)
    );
    assert_eq!(
        patched.font_color(CellAddress::new(2, 0)).as_deref(),
        Some(RED)
    );
}

#[test]
fn test_origins_overwrite_and_fill_cells() {
    let doc = XlsxReader::read(sample()).unwrap();
    let edits = [
        CellEdit::mark(1),
        CellEdit::origin(1, 1, "A.xlsx"),
        CellEdit::origin(1, 2, "B.xlsx"),
    ];
    let (bytes, stats) = XlsxPatcher::default().patch(&doc, &edits).unwrap();
    assert_eq!(stats.origin_cells, 2);

    let patched = XlsxReader::read(bytes).unwrap();
    assert_eq!(patched.value_at(1, 1), CellValue::from("A.xlsx"));
    assert_eq!(patched.value_at(1, 2), CellValue::from("B.xlsx"));
    // Cells outside the origin range are left alone
    assert_eq!(patched.value_at(1, 4), CellValue::from("far right"));
    assert_eq!(patched.value_at(0, 1), CellValue::Empty);
}

#[test]
fn test_untouched_parts_are_identical() {
    let original = sample();
    let doc = XlsxReader::read(original.clone()).unwrap();
    let (bytes, _) = XlsxPatcher::default()
        .patch(&doc, &[CellEdit::mark(0), CellEdit::origin(0, 1, "x.xlsx")])
        .unwrap();

    assert_eq!(entry_names(&bytes), entry_names(&original));

    let before = entries(&original);
    let after = entries(&bytes);
    for (name, data) in &before {
        if name == "xl/worksheets/sheet2.xml" || name == "xl/styles.xml" {
            assert_ne!(&after[name], data, "{name} should be rewritten");
        } else {
            assert_eq!(&after[name], data, "{name} should be unchanged");
        }
    }
}

#[test]
fn test_marker_keeps_base_format() {
    let bytes = XlsxBuilder::new()
        .styled_cell(0, 0, "bold", dupmark_xlsx::builder::BOLD_STYLE)
        .cell(1, 0, "plain")
        .to_bytes()
        .unwrap();
    let doc = XlsxReader::read(bytes).unwrap();
    let (bytes, stats) = XlsxPatcher::default()
        .patch(&doc, &[CellEdit::mark(0), CellEdit::mark(1)])
        .unwrap();
    assert_eq!(stats.marker_styles, 2);

    let styles = entry_text(&bytes, "xl/styles.xml");
    assert!(styles.contains(r#"<fonts count="4">"#));
    assert!(styles.contains(r#"<cellXfs count="4">"#));
    assert!(styles.contains(r#"<font><b/><sz val="11"/><color rgb="FFFF0000"/><name val="Calibri"/>"#));

    let patched = XlsxReader::read(bytes).unwrap();
    assert_eq!(patched.cells()[0].style, Some(2));
    assert_eq!(patched.cells()[1].style, Some(3));
}

#[test]
fn test_custom_marker_colour() {
    let doc = XlsxReader::read(XlsxBuilder::new().column([1]).to_bytes().unwrap()).unwrap();
    let (bytes, _) = XlsxPatcher::new(Color::rgb(0x12, 0x34, 0x56))
        .patch(&doc, &[CellEdit::mark(0)])
        .unwrap();
    let patched = XlsxReader::read(bytes).unwrap();
    assert_eq!(
        patched.font_color(CellAddress::new(0, 0)).as_deref(),
        Some("FF123456")
    );
}

#[test]
fn test_patch_is_deterministic() {
    let doc = XlsxReader::read(sample()).unwrap();
    let edits = [CellEdit::mark(2), CellEdit::origin(2, 1, "B.xlsx")];
    let (first, _) = XlsxPatcher::default().patch(&doc, &edits).unwrap();
    let (second, _) = XlsxPatcher::default().patch(&doc, &edits).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_no_edits_keeps_every_part() {
    let original = sample();
    let doc = XlsxReader::read(original.clone()).unwrap();
    let (bytes, stats) = XlsxPatcher::default().patch(&doc, &[]).unwrap();
    assert_eq!(stats, Default::default());
    assert_eq!(entries(&bytes), entries(&original));
}

#[test]
fn test_marking_without_stylesheet_fails() {
    let bytes = XlsxBuilder::new()
        .column([1, 1])
        .without_styles()
        .to_bytes()
        .unwrap();
    let doc = XlsxReader::read(bytes).unwrap();

    let result = XlsxPatcher::default().patch(&doc, &[CellEdit::mark(0)]);
    assert!(matches!(result, Err(XlsxError::MissingPart(_))));

    // Origin names alone do not need a stylesheet
    let (bytes, _) = XlsxPatcher::default()
        .patch(&doc, &[CellEdit::origin(0, 1, "a.xlsx")])
        .unwrap();
    let patched = XlsxReader::read(bytes).unwrap();
    assert_eq!(patched.value_at(0, 1), CellValue::from("a.xlsx"));
}

#[test]
fn test_mark_on_missing_cell_creates_it() {
    let bytes = XlsxBuilder::new()
        .cell(0, 0, 7)
        .cell(2, 1, "B3 only")
        .to_bytes()
        .unwrap();
    let doc = XlsxReader::read(bytes).unwrap();
    assert_eq!(doc.column().values()[1], CellValue::Empty);

    let (bytes, _) = XlsxPatcher::default()
        .patch(&doc, &[CellEdit::mark(1), CellEdit::mark(2)])
        .unwrap();
    let patched = XlsxReader::read(bytes).unwrap();
    assert_eq!(patched.value_at(1, 0), CellValue::Empty);
    assert_eq!(
        patched.font_color(CellAddress::new(1, 0)).as_deref(),
        Some(RED)
    );
    assert_eq!(
        patched.font_color(CellAddress::new(2, 0)).as_deref(),
        Some(RED)
    );
    assert_eq!(patched.value_at(2, 1), CellValue::from("B3 only"));
}
