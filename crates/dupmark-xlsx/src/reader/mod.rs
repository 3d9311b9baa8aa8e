//! XLSX reader
//!
//! Reads the active worksheet of a workbook into an [`XlsxDocument`]. The raw
//! package bytes are kept alongside the parsed cells so the same document can
//! later be patched without reading the file a second time.

pub(crate) mod sheet;
pub(crate) mod strings;

use std::fs;
use std::io::Cursor;
use std::path::Path;

use zip::ZipArchive;

use crate::error::XlsxResult;
use crate::package::PackageLayout;
use crate::styles::StyleSheet;
use crate::xml::{read_part, read_part_optional};
use dupmark_core::{CellAddress, CellValue, ColumnSnapshot, DESIGNATED_COLUMN};

/// One cell of the active worksheet
#[derive(Debug, Clone, PartialEq)]
pub struct CellRecord {
    /// Position of the cell
    pub address: CellAddress,
    /// Cached value (formulas contribute their last computed result)
    pub value: CellValue,
    /// Cell format index (`s` attribute), if any
    pub style: Option<u32>,
}

/// A workbook opened for duplicate marking
#[derive(Debug)]
pub struct XlsxDocument {
    bytes: Vec<u8>,
    layout: PackageLayout,
    cells: Vec<CellRecord>,
    row_count: u32,
    column: ColumnSnapshot,
    styles: Option<StyleSheet>,
}

impl XlsxDocument {
    /// Where the active sheet and its companion parts live in the package
    pub fn layout(&self) -> &PackageLayout {
        &self.layout
    }

    /// Every cell of the active worksheet, in document order
    pub fn cells(&self) -> &[CellRecord] {
        &self.cells
    }

    /// The cell at `address`, if the worksheet has one
    pub fn cell(&self, address: CellAddress) -> Option<&CellRecord> {
        self.cells.iter().find(|c| c.address == address)
    }

    /// Value at a zero-based position; missing cells read as empty
    pub fn value_at(&self, row: u32, col: u16) -> CellValue {
        self.cell(CellAddress::new(row, col))
            .map(|c| c.value.clone())
            .unwrap_or_default()
    }

    /// Number of rows up to the last one holding a cell
    pub fn row_count(&self) -> u32 {
        self.row_count
    }

    /// Snapshot of the designated column, one value per row
    pub fn column(&self) -> &ColumnSnapshot {
        &self.column
    }

    /// ARGB font colour of the cell at `address`, when its format sets one
    pub fn font_color(&self, address: CellAddress) -> Option<String> {
        let style = self.cell(address)?.style.unwrap_or(0);
        self.styles.as_ref()?.xf_font_rgb(style)
    }

    pub(crate) fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub(crate) fn styles(&self) -> Option<&StyleSheet> {
        self.styles.as_ref()
    }
}

/// XLSX file reader
pub struct XlsxReader;

impl XlsxReader {
    /// Read a workbook from a file path
    pub fn read_file<P: AsRef<Path>>(path: P) -> XlsxResult<XlsxDocument> {
        let bytes = fs::read(path.as_ref())?;
        Self::read(bytes)
    }

    /// Read a workbook from its package bytes
    pub fn read(bytes: Vec<u8>) -> XlsxResult<XlsxDocument> {
        let mut archive = ZipArchive::new(Cursor::new(bytes.as_slice()))?;
        let layout = PackageLayout::resolve(&mut archive)?;
        log::debug!(
            "active sheet '{}' at {}",
            layout.sheet_name,
            layout.sheet_part
        );

        let shared_strings = match &layout.shared_strings_part {
            Some(part) => match read_part_optional(&mut archive, part)? {
                Some(xml) => strings::read_shared_strings(&xml)?,
                None => {
                    log::warn!("shared strings part {} is missing", part);
                    Vec::new()
                }
            },
            None => Vec::new(),
        };

        let styles = match &layout.styles_part {
            Some(part) => match read_part_optional(&mut archive, part)? {
                Some(xml) => Some(StyleSheet::parse(&xml)?),
                None => {
                    log::warn!("stylesheet part {} is missing", part);
                    None
                }
            },
            None => None,
        };

        let sheet_xml = read_part(&mut archive, &layout.sheet_part)?;
        let sheet = sheet::read_sheet_cells(&sheet_xml, &shared_strings)?;

        let column = ColumnSnapshot::from_sparse(
            sheet.row_count,
            sheet
                .cells
                .iter()
                .filter(|c| c.address.col == DESIGNATED_COLUMN)
                .map(|c| (c.address.row, c.value.clone())),
        );

        drop(archive);
        Ok(XlsxDocument {
            bytes,
            layout,
            cells: sheet.cells,
            row_count: sheet.row_count,
            column,
            styles,
        })
    }
}
