//! Worksheet cell extraction

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use super::strings::decode_excel_escapes;
use super::CellRecord;
use crate::error::{XlsxError, XlsxResult};
use crate::xml::{attr_value, local_name};
use dupmark_core::{CellAddress, CellValue, MAX_ROWS};

/// Cells of one worksheet in document order
#[derive(Debug, Default)]
pub(crate) struct SheetCells {
    pub cells: Vec<CellRecord>,
    /// One past the last zero-based row that holds a cell, in any column
    pub row_count: u32,
}

/// A `<c>` element being read
#[derive(Debug)]
struct PendingCell {
    address: CellAddress,
    cell_type: Option<String>,
    style: Option<u32>,
    value: Option<String>,
    inline: Option<String>,
}

/// Parse the `<sheetData>` of a worksheet part
pub(crate) fn read_sheet_cells(xml: &[u8], shared_strings: &[String]) -> XlsxResult<SheetCells> {
    let mut reader = Reader::from_reader(xml);
    reader.trim_text(false);

    let mut buf = Vec::new();
    let mut sheet = SheetCells::default();

    let mut last_row: Option<u32> = None;
    let mut current_row: Option<u32> = None;
    let mut next_col: u16 = 0;

    let mut cell: Option<PendingCell> = None;
    let mut in_value = false;
    let mut in_inline_str = false;
    let mut in_inline_text = false;
    let mut phonetic_depth = 0usize;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match local_name(e.name().as_ref()) {
                b"row" => {
                    let row = row_number(&e, last_row)?;
                    last_row = Some(row);
                    current_row = Some(row);
                    next_col = 0;
                }
                b"c" => {
                    let pending = start_cell(&e, current_row, next_col)?;
                    next_col = pending.address.col.saturating_add(1);
                    cell = Some(pending);
                }
                b"v" if cell.is_some() => in_value = true,
                b"is" if cell.is_some() => {
                    in_inline_str = true;
                    if let Some(c) = cell.as_mut() {
                        c.inline.get_or_insert_with(String::new);
                    }
                }
                b"rPh" if in_inline_str => phonetic_depth += 1,
                b"t" if in_inline_str && phonetic_depth == 0 => in_inline_text = true,
                _ => {}
            },
            Ok(Event::Empty(e)) => match local_name(e.name().as_ref()) {
                b"row" => {
                    last_row = Some(row_number(&e, last_row)?);
                }
                b"c" => {
                    let pending = start_cell(&e, current_row, next_col)?;
                    next_col = pending.address.col.saturating_add(1);
                    finish_cell(pending, shared_strings, &mut sheet)?;
                }
                b"is" if cell.is_some() => {
                    if let Some(c) = cell.as_mut() {
                        c.inline.get_or_insert_with(String::new);
                    }
                }
                _ => {}
            },
            Ok(Event::End(e)) => match local_name(e.name().as_ref()) {
                b"row" => current_row = None,
                b"c" => {
                    if let Some(pending) = cell.take() {
                        finish_cell(pending, shared_strings, &mut sheet)?;
                    }
                    in_value = false;
                    in_inline_str = false;
                    in_inline_text = false;
                    phonetic_depth = 0;
                }
                b"v" => in_value = false,
                b"is" => in_inline_str = false,
                b"rPh" if phonetic_depth > 0 => phonetic_depth -= 1,
                b"t" => in_inline_text = false,
                _ => {}
            },
            Ok(Event::Text(e)) if in_value || in_inline_text => {
                let text = e.unescape()?;
                if let Some(c) = cell.as_mut() {
                    let target = if in_value {
                        c.value.get_or_insert_with(String::new)
                    } else {
                        c.inline.get_or_insert_with(String::new)
                    };
                    target.push_str(&text);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(XlsxError::Xml(e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(sheet)
}

/// Zero-based row of a `<row>` element; rows without `r` follow the previous one
fn row_number(e: &BytesStart<'_>, last_row: Option<u32>) -> XlsxResult<u32> {
    match attr_value(e, b"r")? {
        Some(r) => {
            let n: u32 = r
                .trim()
                .parse()
                .map_err(|_| XlsxError::Parse(format!("invalid row number '{}'", r)))?;
            if n == 0 || n > MAX_ROWS {
                return Err(XlsxError::Parse(format!("row number {} out of range", n)));
            }
            Ok(n - 1)
        }
        None => Ok(last_row.map_or(0, |r| r + 1)),
    }
}

fn start_cell(
    e: &BytesStart<'_>,
    current_row: Option<u32>,
    next_col: u16,
) -> XlsxResult<PendingCell> {
    let address = match attr_value(e, b"r")? {
        Some(r) => CellAddress::parse(&r)?,
        None => {
            let row = current_row
                .ok_or_else(|| XlsxError::Parse("cell without reference outside a row".into()))?;
            CellAddress::new(row, next_col)
        }
    };

    let style = attr_value(e, b"s")?
        .map(|s| {
            s.trim()
                .parse::<u32>()
                .map_err(|_| XlsxError::Parse(format!("invalid style index '{}' in {}", s, address)))
        })
        .transpose()?;

    Ok(PendingCell {
        address,
        cell_type: attr_value(e, b"t")?,
        style,
        value: None,
        inline: None,
    })
}

fn finish_cell(
    cell: PendingCell,
    shared_strings: &[String],
    sheet: &mut SheetCells,
) -> XlsxResult<()> {
    let value = cell_value(&cell, shared_strings)?;
    sheet.row_count = sheet.row_count.max(cell.address.row + 1);
    sheet.cells.push(CellRecord {
        address: cell.address,
        value,
        style: cell.style,
    });
    Ok(())
}

/// Interpret the cached value of a cell according to its `t` attribute
fn cell_value(cell: &PendingCell, shared_strings: &[String]) -> XlsxResult<CellValue> {
    let raw = cell.value.as_deref();
    let address = cell.address;

    let value = match cell.cell_type.as_deref() {
        Some("s") => match raw {
            Some(idx) => {
                let idx: usize = idx.trim().parse().map_err(|_| {
                    XlsxError::Parse(format!("invalid shared string index in {}", address))
                })?;
                let s = shared_strings.get(idx).ok_or_else(|| {
                    XlsxError::Parse(format!(
                        "shared string {} of {} out of range ({} strings)",
                        idx,
                        address,
                        shared_strings.len()
                    ))
                })?;
                CellValue::Text(s.clone())
            }
            None => CellValue::Empty,
        },
        Some("inlineStr") => match &cell.inline {
            Some(s) => CellValue::Text(decode_excel_escapes(s)),
            None => CellValue::Empty,
        },
        Some("str") | Some("d") => match raw {
            Some(s) => CellValue::Text(decode_excel_escapes(s)),
            None => CellValue::Empty,
        },
        Some("b") => match raw.map(str::trim) {
            Some("1") | Some("true") => CellValue::Boolean(true),
            Some("0") | Some("false") => CellValue::Boolean(false),
            Some(other) => {
                return Err(XlsxError::Parse(format!(
                    "invalid boolean '{}' in {}",
                    other, address
                )))
            }
            None => CellValue::Empty,
        },
        Some("e") => match raw {
            Some(s) => CellValue::Error(s.to_string()),
            None => CellValue::Empty,
        },
        Some("n") | None => match raw.map(str::trim) {
            Some(s) if !s.is_empty() => CellValue::Number(s.parse().map_err(|_| {
                XlsxError::Parse(format!("invalid number '{}' in {}", s, address))
            })?),
            _ => CellValue::Empty,
        },
        Some(other) => {
            log::warn!("unknown cell type '{}' in {}, reading as text", other, address);
            match raw {
                Some(s) => CellValue::Text(s.to_string()),
                None => CellValue::Empty,
            }
        }
    };

    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn values(xml: &str, shared: &[&str]) -> Vec<(String, CellValue)> {
        let shared: Vec<String> = shared.iter().map(|s| s.to_string()).collect();
        read_sheet_cells(xml.as_bytes(), &shared)
            .unwrap()
            .cells
            .into_iter()
            .map(|c| (c.address.to_a1_string(), c.value))
            .collect()
    }

    #[test]
    fn test_cell_types() {
        let xml = r#"<worksheet><sheetData>
  <row r="1">
    <c r="A1" t="s"><v>1</v></c>
    <c r="B1"><v>42.5</v></c>
    <c r="C1" t="b"><v>1</v></c>
    <c r="D1" t="e"><v>#N/A</v></c>
    <c r="E1" t="inlineStr"><is><t>inline &lt;x&gt;</t></is></c>
    <c r="F1" t="str"><f>UPPER("a")</f><v>A</v></c>
    <c r="G1" s="3"/>
  </row>
</sheetData></worksheet>"#;
        assert_eq!(
            values(xml, &["zero", "one"]),
            vec![
                ("A1".to_string(), CellValue::from("one")),
                ("B1".to_string(), CellValue::from(42.5)),
                ("C1".to_string(), CellValue::from(true)),
                ("D1".to_string(), CellValue::Error("#N/A".into())),
                ("E1".to_string(), CellValue::from("inline <x>")),
                ("F1".to_string(), CellValue::from("A")),
                ("G1".to_string(), CellValue::Empty),
            ]
        );
    }

    #[test]
    fn test_implicit_references() {
        let xml = r#"<worksheet><sheetData>
  <row><c><v>1</v></c><c><v>2</v></c></row>
  <row r="4"><c><v>3</v></c></row>
  <row/>
</sheetData></worksheet>"#;
        let sheet = read_sheet_cells(xml.as_bytes(), &[]).unwrap();
        let refs: Vec<String> = sheet.cells.iter().map(|c| c.address.to_string()).collect();
        assert_eq!(refs, vec!["A1", "B1", "A4"]);
        // A trailing row without cells does not extend the sheet
        assert_eq!(sheet.row_count, 4);
    }

    #[test]
    fn test_style_and_prefixed_elements() {
        let xml = r#"<x:worksheet xmlns:x="urn:x"><x:sheetData>
  <x:row r="2"><x:c r="A2" s="5"><x:v>7</x:v></x:c></x:row>
</x:sheetData></x:worksheet>"#;
        let sheet = read_sheet_cells(xml.as_bytes(), &[]).unwrap();
        assert_eq!(sheet.cells[0].style, Some(5));
        assert_eq!(sheet.cells[0].value, CellValue::from(7));
        assert_eq!(sheet.row_count, 2);
    }

    #[test]
    fn test_bad_shared_string_index() {
        let xml = r#"<worksheet><sheetData><row r="1"><c r="A1" t="s"><v>9</v></c></row></sheetData></worksheet>"#;
        assert!(matches!(
            read_sheet_cells(xml.as_bytes(), &[]),
            Err(XlsxError::Parse(_))
        ));
    }
}
