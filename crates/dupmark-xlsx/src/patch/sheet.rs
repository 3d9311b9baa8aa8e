//! Streaming worksheet rewrite
//!
//! Events of the worksheet part are copied as they are read. Only the rows
//! that carry an edit are touched: the designated cell gets a marker format,
//! origin cells are replaced by inline strings, and cells or rows that do not
//! exist yet are inserted in order.

use std::collections::BTreeMap;

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::reader::Reader;
use quick_xml::writer::Writer;

use crate::error::{XlsxError, XlsxResult};
use crate::styles::MarkerStyles;
use crate::xml::{attr_value, element_prefix, local_name, needs_space_preserve, prefixed, with_attribute};
use dupmark_core::{CellAddress, CellEdit, MAX_ROWS};

#[derive(Debug, Clone, PartialEq, Eq)]
enum CellAction {
    Mark,
    Origin(String),
}

/// Edits of one row, by column
type RowEdits = BTreeMap<u16, CellAction>;

/// An edited row whose element is currently open
struct OpenRow {
    index: u32,
    cells: RowEdits,
}

/// Bounding box of a set of cells
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Extent {
    first: CellAddress,
    last: CellAddress,
}

impl Extent {
    fn of(address: CellAddress) -> Self {
        Self {
            first: address,
            last: address,
        }
    }

    fn include(&mut self, other: Extent) {
        self.first.row = self.first.row.min(other.first.row);
        self.first.col = self.first.col.min(other.first.col);
        self.last.row = self.last.row.max(other.last.row);
        self.last.col = self.last.col.max(other.last.col);
    }

    fn parse(reference: &str) -> Option<Self> {
        let mut parts = reference.split(':');
        let first = CellAddress::parse(parts.next()?).ok()?;
        let last = match parts.next() {
            Some(p) => CellAddress::parse(p).ok()?,
            None => first,
        };
        Some(Self { first, last })
    }

    fn to_reference(self) -> String {
        if self.first == self.last {
            self.first.to_a1_string()
        } else {
            format!("{}:{}", self.first, self.last)
        }
    }
}

struct SheetPatcher<'a> {
    writer: Writer<Vec<u8>>,
    rows: BTreeMap<u32, RowEdits>,
    extent: Option<Extent>,
    markers: Option<&'a mut MarkerStyles>,
    prefix: Option<String>,
}

/// Apply `edits` to a worksheet part.
///
/// `markers` allocates the marker formats; it may only be `None` when
/// `edits` holds no [`CellEdit::Mark`].
pub(crate) fn patch_sheet(
    xml: &[u8],
    edits: &[CellEdit],
    markers: Option<&mut MarkerStyles>,
) -> XlsxResult<Vec<u8>> {
    let mut patcher = SheetPatcher::new(edits, markers, xml.len());

    let mut reader = Reader::from_reader(xml);
    reader.trim_text(false);
    let mut buf = Vec::new();

    let mut in_sheet_data = false;
    let mut last_row: Option<u32> = None;
    let mut open_row: Option<OpenRow> = None;
    let mut next_col: u16 = 0;
    // Depth inside a replaced cell whose content is dropped
    let mut skip_depth = 0usize;

    loop {
        buf.clear();
        let event = reader.read_event_into(&mut buf)?;

        if skip_depth > 0 {
            match event {
                Event::Start(_) => skip_depth += 1,
                Event::End(_) => skip_depth -= 1,
                Event::Eof => break,
                _ => {}
            }
            continue;
        }

        match event {
            Event::Eof => break,
            Event::Start(e) => match local_name(e.name().as_ref()) {
                b"sheetData" => {
                    patcher.prefix = element_prefix(e.name().as_ref());
                    in_sheet_data = true;
                    patcher.write(Event::Start(e.borrow()))?;
                }
                b"row" if in_sheet_data => {
                    let row = row_number(&e, last_row)?;
                    last_row = Some(row);
                    next_col = 0;
                    patcher.insert_rows_before(row)?;
                    match patcher.rows.remove(&row) {
                        Some(cells) => {
                            patcher.write(Event::Start(with_spans(&e, &cells)?))?;
                            open_row = Some(OpenRow { index: row, cells });
                        }
                        None => patcher.write(Event::Start(e.borrow()))?,
                    }
                }
                b"c" if open_row.is_some() => {
                    if let Some(open) = open_row.as_mut() {
                        let address = cell_address(&e, open.index, next_col)?;
                        next_col = address.col.saturating_add(1);
                        if patcher.patch_cell(open, address, &e, false)? {
                            skip_depth = 1;
                        }
                    }
                }
                _ => patcher.write(Event::Start(e.borrow()))?,
            },
            Event::Empty(e) => match local_name(e.name().as_ref()) {
                b"dimension" if !in_sheet_data => {
                    let patched = patcher.patch_dimension(&e)?;
                    patcher.write(Event::Empty(patched))?;
                }
                b"sheetData" => {
                    patcher.prefix = element_prefix(e.name().as_ref());
                    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                    if patcher.rows.is_empty() {
                        patcher.write(Event::Empty(e.borrow()))?;
                    } else {
                        patcher.write(Event::Start(e.borrow()))?;
                        patcher.insert_rows_before(u32::MAX)?;
                        patcher.write(Event::End(BytesEnd::new(name)))?;
                    }
                }
                b"row" if in_sheet_data => {
                    let row = row_number(&e, last_row)?;
                    last_row = Some(row);
                    patcher.insert_rows_before(row)?;
                    match patcher.rows.remove(&row) {
                        Some(cells) => {
                            let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                            patcher.write(Event::Start(with_spans(&e, &cells)?))?;
                            let mut open = OpenRow { index: row, cells };
                            patcher.insert_cells_before(&mut open, u16::MAX)?;
                            patcher.write(Event::End(BytesEnd::new(name)))?;
                        }
                        None => patcher.write(Event::Empty(e.borrow()))?,
                    }
                }
                b"c" if open_row.is_some() => {
                    if let Some(open) = open_row.as_mut() {
                        let address = cell_address(&e, open.index, next_col)?;
                        next_col = address.col.saturating_add(1);
                        patcher.patch_cell(open, address, &e, true)?;
                    }
                }
                _ => patcher.write(Event::Empty(e.borrow()))?,
            },
            Event::End(e) => {
                match local_name(e.name().as_ref()) {
                    b"row" if in_sheet_data => {
                        if let Some(mut open) = open_row.take() {
                            patcher.insert_cells_before(&mut open, u16::MAX)?;
                        }
                    }
                    b"sheetData" => {
                        patcher.insert_rows_before(u32::MAX)?;
                        in_sheet_data = false;
                    }
                    _ => {}
                }
                patcher.write(Event::End(e))?;
            }
            event => patcher.write(event)?,
        }
    }

    if !patcher.rows.is_empty() {
        return Err(XlsxError::InvalidFormat(
            "worksheet has no <sheetData> to annotate".into(),
        ));
    }

    Ok(patcher.writer.into_inner())
}

impl<'a> SheetPatcher<'a> {
    fn new(edits: &[CellEdit], markers: Option<&'a mut MarkerStyles>, capacity: usize) -> Self {
        let mut rows: BTreeMap<u32, RowEdits> = BTreeMap::new();
        let mut extent: Option<Extent> = None;

        for edit in edits {
            let address = edit.address();
            let action = match edit {
                CellEdit::Mark { .. } => CellAction::Mark,
                CellEdit::Origin { name, .. } => CellAction::Origin(name.clone()),
            };
            rows.entry(address.row)
                .or_default()
                .insert(address.col, action);
            match extent.as_mut() {
                Some(x) => x.include(Extent::of(address)),
                None => extent = Some(Extent::of(address)),
            }
        }

        Self {
            writer: Writer::new(Vec::with_capacity(capacity + 64 * edits.len())),
            rows,
            extent,
            markers,
            prefix: None,
        }
    }

    fn write(&mut self, event: Event<'_>) -> XlsxResult<()> {
        self.writer.write_event(event)?;
        Ok(())
    }

    fn name(&self, local: &str) -> String {
        prefixed(self.prefix.as_deref(), local)
    }

    fn marker_xf(&mut self, base: u32) -> XlsxResult<u32> {
        match self.markers.as_deref_mut() {
            Some(markers) => Ok(markers.xf_for(base)),
            None => Err(XlsxError::MissingPart("stylesheet".into())),
        }
    }

    /// Grow `<dimension ref>` to cover the edited cells
    fn patch_dimension(&self, e: &BytesStart<'_>) -> XlsxResult<BytesStart<'static>> {
        let current = attr_value(e, b"ref")?;
        let (Some(edits), Some(reference)) = (self.extent, current.as_deref()) else {
            return Ok(e.to_owned());
        };
        match Extent::parse(reference) {
            Some(mut extent) => {
                extent.include(edits);
                with_attribute(e, "ref", &extent.to_reference())
            }
            None => {
                log::debug!("leaving unparsable dimension '{}' unchanged", reference);
                Ok(e.to_owned())
            }
        }
    }

    /// Write every pending row that sorts before `limit` as a new row element
    fn insert_rows_before(&mut self, limit: u32) -> XlsxResult<()> {
        let rest = self.rows.split_off(&limit);
        let before = std::mem::replace(&mut self.rows, rest);

        for (index, cells) in before {
            let name = self.name("row");
            let mut start = BytesStart::new(name.clone());
            start.push_attribute(("r", (index + 1).to_string().as_str()));
            self.write(Event::Start(start))?;
            let mut open = OpenRow { index, cells };
            self.insert_cells_before(&mut open, u16::MAX)?;
            self.write(Event::End(BytesEnd::new(name)))?;
        }
        Ok(())
    }

    /// Write every pending cell of `row` whose column sorts before `limit`
    fn insert_cells_before(&mut self, row: &mut OpenRow, limit: u16) -> XlsxResult<()> {
        let rest = if limit == u16::MAX {
            BTreeMap::new()
        } else {
            row.cells.split_off(&limit)
        };
        let before = std::mem::replace(&mut row.cells, rest);

        for (col, action) in before {
            let address = CellAddress::new(row.index, col);
            match action {
                CellAction::Mark => {
                    let xf = self.marker_xf(0)?;
                    let mut cell = BytesStart::new(self.name("c"));
                    cell.push_attribute(("r", address.to_a1_string().as_str()));
                    cell.push_attribute(("s", xf.to_string().as_str()));
                    self.write(Event::Empty(cell))?;
                }
                CellAction::Origin(name) => self.write_inline_cell(address, None, &name)?,
            }
        }
        Ok(())
    }

    /// Handle an existing `<c>` of an edited row.
    ///
    /// Returns `true` when the cell was replaced and its content must be
    /// skipped.
    fn patch_cell(
        &mut self,
        row: &mut OpenRow,
        address: CellAddress,
        e: &BytesStart<'_>,
        empty: bool,
    ) -> XlsxResult<bool> {
        self.insert_cells_before(row, address.col)?;

        match row.cells.remove(&address.col) {
            Some(CellAction::Mark) => {
                let base = match attr_value(e, b"s")? {
                    Some(s) => s.trim().parse::<u32>().map_err(|_| {
                        XlsxError::Parse(format!("invalid style index '{}' in {}", s, address))
                    })?,
                    None => 0,
                };
                let xf = self.marker_xf(base)?;
                let patched = with_attribute(e, "s", &xf.to_string())?;
                if empty {
                    self.write(Event::Empty(patched))?;
                } else {
                    self.write(Event::Start(patched))?;
                }
                Ok(false)
            }
            Some(CellAction::Origin(name)) => {
                let style = attr_value(e, b"s")?;
                self.write_inline_cell(address, style.as_deref(), &name)?;
                Ok(!empty)
            }
            None => {
                let event = if empty {
                    Event::Empty(e.borrow())
                } else {
                    Event::Start(e.borrow())
                };
                self.write(event)?;
                Ok(false)
            }
        }
    }

    /// `<c r=".." s=".." t="inlineStr"><is><t>text</t></is></c>`
    fn write_inline_cell(
        &mut self,
        address: CellAddress,
        style: Option<&str>,
        text: &str,
    ) -> XlsxResult<()> {
        let c = self.name("c");
        let is = self.name("is");
        let t = self.name("t");

        let mut cell = BytesStart::new(c.clone());
        cell.push_attribute(("r", address.to_a1_string().as_str()));
        if let Some(style) = style {
            cell.push_attribute(("s", style));
        }
        cell.push_attribute(("t", "inlineStr"));

        let mut text_start = BytesStart::new(t.clone());
        if needs_space_preserve(text) {
            text_start.push_attribute(("xml:space", "preserve"));
        }

        self.write(Event::Start(cell))?;
        self.write(Event::Start(BytesStart::new(is.clone())))?;
        self.write(Event::Start(text_start))?;
        self.write(Event::Text(BytesText::new(text)))?;
        self.write(Event::End(BytesEnd::new(t)))?;
        self.write(Event::End(BytesEnd::new(is)))?;
        self.write(Event::End(BytesEnd::new(c)))?;
        Ok(())
    }
}

/// Copy of a `<row>` start whose `spans` hint also covers the edited columns
fn with_spans(e: &BytesStart<'_>, cells: &RowEdits) -> XlsxResult<BytesStart<'static>> {
    let Some(spans) = attr_value(e, b"spans")? else {
        return Ok(e.to_owned());
    };
    let (Some((&first_col, _)), Some((&last_col, _))) =
        (cells.first_key_value(), cells.last_key_value())
    else {
        return Ok(e.to_owned());
    };

    let parsed = spans
        .split_once(':')
        .and_then(|(a, b)| Some((a.trim().parse::<u32>().ok()?, b.trim().parse::<u32>().ok()?)));

    match parsed {
        Some((lo, hi)) => {
            let lo = lo.min(first_col as u32 + 1);
            let hi = hi.max(last_col as u32 + 1);
            with_attribute(e, "spans", &format!("{lo}:{hi}"))
        }
        None => Ok(e.to_owned()),
    }
}

fn row_number(e: &BytesStart<'_>, last_row: Option<u32>) -> XlsxResult<u32> {
    match attr_value(e, b"r")? {
        Some(r) => match r.trim().parse::<u32>() {
            Ok(n) if n >= 1 && n <= MAX_ROWS => Ok(n - 1),
            _ => Err(XlsxError::Parse(format!("invalid row number '{}'", r))),
        },
        None => Ok(last_row.map_or(0, |r| r + 1)),
    }
}

fn cell_address(e: &BytesStart<'_>, row: u32, next_col: u16) -> XlsxResult<CellAddress> {
    match attr_value(e, b"r")? {
        Some(r) => Ok(CellAddress::new(row, CellAddress::parse(&r)?.col)),
        None => Ok(CellAddress::new(row, next_col)),
    }
}
