//! Package layout: where the parts dupmark touches live inside the ZIP

use std::io::{Read, Seek};

use quick_xml::events::Event;
use quick_xml::reader::Reader;
use zip::ZipArchive;

use crate::error::{XlsxError, XlsxResult};
use crate::rels::{
    parse_relationships, rels_part_for, resolve_target, REL_OFFICE_DOCUMENT, REL_SHARED_STRINGS,
    REL_STYLES, REL_WORKSHEET,
};
use crate::xml::{attr_value, local_name, read_part, read_part_optional, relationship_id};

const DEFAULT_WORKBOOK_PART: &str = "xl/workbook.xml";

/// Part names resolved from the package relationships
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageLayout {
    /// Workbook part (usually `xl/workbook.xml`)
    pub workbook_part: String,
    /// Tab name of the active sheet
    pub sheet_name: String,
    /// Zero-based position of the active sheet among the workbook's sheets
    pub sheet_index: usize,
    /// Worksheet part of the active sheet
    pub sheet_part: String,
    /// Stylesheet part, when the workbook has one
    pub styles_part: Option<String>,
    /// Shared strings part, when the workbook has one
    pub shared_strings_part: Option<String>,
}

/// A `<sheet>` entry of the workbook part
#[derive(Debug)]
struct SheetEntry {
    name: String,
    r_id: String,
}

impl PackageLayout {
    /// Resolve the layout of an opened package
    pub fn resolve<R: Read + Seek>(archive: &mut ZipArchive<R>) -> XlsxResult<Self> {
        // Verify this is an OOXML package
        if archive.by_name("[Content_Types].xml").is_err() {
            return Err(XlsxError::InvalidFormat(
                "Missing [Content_Types].xml".into(),
            ));
        }

        let workbook_part = Self::find_workbook_part(archive)?;
        let workbook_xml = read_part(archive, &workbook_part)?;
        let (sheets, active_tab) = Self::read_workbook_xml(&workbook_xml)?;

        if sheets.is_empty() {
            return Err(XlsxError::InvalidFormat(format!(
                "{} declares no sheets",
                workbook_part
            )));
        }

        let sheet_index = if active_tab < sheets.len() {
            active_tab
        } else {
            log::warn!(
                "activeTab {} out of range ({} sheets), using the first sheet",
                active_tab,
                sheets.len()
            );
            0
        };
        let active = &sheets[sheet_index];

        let rels_part = rels_part_for(&workbook_part);
        let rels = parse_relationships(&read_part(archive, &rels_part)?)?;

        let sheet_rel = rels
            .iter()
            .find(|r| r.id == active.r_id)
            .ok_or_else(|| {
                XlsxError::InvalidFormat(format!(
                    "sheet '{}' refers to unknown relationship {}",
                    active.name, active.r_id
                ))
            })?;
        if !sheet_rel.is(REL_WORKSHEET) {
            return Err(XlsxError::InvalidFormat(format!(
                "active sheet '{}' is not a worksheet ({})",
                active.name, sheet_rel.rel_type
            )));
        }

        let part_of = |suffix: &str| {
            rels.iter()
                .find(|r| r.is(suffix) && !r.external)
                .map(|r| resolve_target(&workbook_part, &r.target))
        };

        Ok(Self {
            sheet_name: active.name.clone(),
            sheet_index,
            sheet_part: resolve_target(&workbook_part, &sheet_rel.target),
            styles_part: part_of(REL_STYLES),
            shared_strings_part: part_of(REL_SHARED_STRINGS),
            workbook_part,
        })
    }

    /// Follow the root relationships to the workbook part
    fn find_workbook_part<R: Read + Seek>(archive: &mut ZipArchive<R>) -> XlsxResult<String> {
        let Some(root_rels) = read_part_optional(archive, "_rels/.rels")? else {
            log::debug!("no _rels/.rels, assuming {}", DEFAULT_WORKBOOK_PART);
            return Ok(DEFAULT_WORKBOOK_PART.to_string());
        };

        let part = parse_relationships(&root_rels)?
            .into_iter()
            .find(|r| r.is(REL_OFFICE_DOCUMENT) && !r.external)
            .map(|r| resolve_target("", &r.target))
            .unwrap_or_else(|| DEFAULT_WORKBOOK_PART.to_string());
        Ok(part)
    }

    /// Read sheet names, relationship ids and the active tab from workbook.xml
    fn read_workbook_xml(xml: &[u8]) -> XlsxResult<(Vec<SheetEntry>, usize)> {
        let mut reader = Reader::from_reader(xml);
        reader.trim_text(true);

        let mut buf = Vec::new();
        let mut sheets = Vec::new();
        let mut active_tab: Option<usize> = None;

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Empty(e)) | Ok(Event::Start(e)) => match local_name(e.name().as_ref()) {
                    b"sheet" => {
                        let name = attr_value(&e, b"name")?;
                        let r_id = relationship_id(&e)?;
                        if let (Some(name), Some(r_id)) = (name, r_id) {
                            sheets.push(SheetEntry { name, r_id });
                        }
                    }
                    // Only the first view decides the active tab
                    b"workbookView" if active_tab.is_none() => {
                        let tab = attr_value(&e, b"activeTab")?
                            .map(|v| {
                                v.parse::<usize>().map_err(|_| {
                                    XlsxError::Parse(format!("invalid activeTab '{}'", v))
                                })
                            })
                            .transpose()?;
                        active_tab = Some(tab.unwrap_or(0));
                    }
                    _ => {}
                },
                Ok(Event::Eof) => break,
                Err(e) => return Err(XlsxError::Xml(e)),
                _ => {}
            }
            buf.clear();
        }

        Ok((sheets, active_tab.unwrap_or(0)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_workbook_xml_active_tab() {
        let xml = br#"<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
  <bookViews><workbookView activeTab="1"/><workbookView activeTab="0"/></bookViews>
  <sheets>
    <sheet name="First" sheetId="1" r:id="rId1"/>
    <sheet name="Second" sheetId="2" r:id="rId2"/>
  </sheets>
</workbook>"#;
        let (sheets, active) = PackageLayout::read_workbook_xml(xml).unwrap();
        assert_eq!(active, 1);
        assert_eq!(sheets.len(), 2);
        assert_eq!(sheets[1].name, "Second");
        assert_eq!(sheets[1].r_id, "rId2");
    }

    #[test]
    fn test_read_workbook_xml_defaults_to_first_sheet() {
        let xml = br#"<workbook xmlns:rel="urn:r"><sheets><sheet name="Only" rel:id="rId7"/></sheets></workbook>"#;
        let (sheets, active) = PackageLayout::read_workbook_xml(xml).unwrap();
        assert_eq!(active, 0);
        assert_eq!(sheets[0].r_id, "rId7");
    }
}
