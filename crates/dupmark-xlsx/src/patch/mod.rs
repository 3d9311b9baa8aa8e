//! XLSX patcher
//!
//! Writes a new package from an [`XlsxDocument`] and a list of cell edits.
//! The active worksheet and, when marker formats were allocated, the
//! stylesheet are rewritten; every other entry is copied raw, compressed
//! bytes and all.

mod sheet;

use std::io::{Cursor, Seek, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipArchive, ZipWriter};

use crate::error::{XlsxError, XlsxResult};
use crate::reader::XlsxDocument;
use crate::styles::MarkerStyles;
use crate::xml::read_part;
use dupmark_core::{CellEdit, Color};

/// What a patch changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PatchStats {
    /// Designated-column cells that received the marker format
    pub marked_cells: usize,
    /// Cells written with an origin name
    pub origin_cells: usize,
    /// Cell formats appended to the stylesheet
    pub marker_styles: usize,
}

/// Applies cell edits to workbooks
#[derive(Debug, Clone)]
pub struct XlsxPatcher {
    marker_color: Color,
}

impl Default for XlsxPatcher {
    fn default() -> Self {
        Self::new(Color::RED)
    }
}

impl XlsxPatcher {
    /// Patcher marking duplicates with `marker_color`
    pub fn new(marker_color: Color) -> Self {
        Self { marker_color }
    }

    /// Patch `doc` into a new in-memory package
    pub fn patch(&self, doc: &XlsxDocument, edits: &[CellEdit]) -> XlsxResult<(Vec<u8>, PatchStats)> {
        let mut out = Cursor::new(Vec::with_capacity(doc.bytes().len() + 1024));
        let stats = self.patch_to(doc, edits, &mut out)?;
        Ok((out.into_inner(), stats))
    }

    /// Patch `doc` into `writer`
    pub fn patch_to<W: Write + Seek>(
        &self,
        doc: &XlsxDocument,
        edits: &[CellEdit],
        writer: W,
    ) -> XlsxResult<PatchStats> {
        let layout = doc.layout();
        let mut archive = ZipArchive::new(Cursor::new(doc.bytes()))?;

        let mut stats = PatchStats::default();
        for edit in edits {
            match edit {
                CellEdit::Mark { .. } => stats.marked_cells += 1,
                CellEdit::Origin { .. } => stats.origin_cells += 1,
            }
        }

        let mut markers = match doc.styles() {
            Some(styles) => Some(MarkerStyles::new(styles, &self.marker_color)),
            None if stats.marked_cells > 0 => {
                return Err(XlsxError::MissingPart(
                    layout
                        .styles_part
                        .clone()
                        .unwrap_or_else(|| "stylesheet".to_string()),
                ))
            }
            None => None,
        };

        let new_sheet = if edits.is_empty() {
            None
        } else {
            let xml = read_part(&mut archive, &layout.sheet_part)?;
            Some(sheet::patch_sheet(&xml, edits, markers.as_mut())?)
        };

        let new_styles = match (&markers, &layout.styles_part, doc.styles()) {
            (Some(m), Some(part), Some(styles)) if !m.is_empty() => {
                stats.marker_styles = m.len();
                let xml = read_part(&mut archive, part)?;
                Some((part.as_str(), m.write(&xml, styles)?))
            }
            _ => None,
        };

        let mut zip = ZipWriter::new(writer);
        for i in 0..archive.len() {
            let file = archive.by_index(i)?;
            let name = file.name().to_string();

            let replacement = if name == layout.sheet_part {
                new_sheet.as_deref()
            } else {
                match &new_styles {
                    Some((part, xml)) if *part == name => Some(xml.as_slice()),
                    _ => None,
                }
            };

            match replacement {
                Some(data) => {
                    drop(file);
                    log::debug!("rewriting {} ({} bytes)", name, data.len());
                    // Fixed timestamp so identical input gives identical output
                    let options = SimpleFileOptions::default()
                        .compression_method(CompressionMethod::Deflated)
                        .last_modified_time(DateTime::default());
                    zip.start_file(name, options)?;
                    zip.write_all(data)?;
                }
                None => zip.raw_copy_file(file)?,
            }
        }
        zip.finish()?;

        Ok(stats)
    }
}
