//! Minimal workbook writer
//!
//! Produces small but complete `.xlsx` packages: one or more sheets, an
//! optional active tab, inline or shared strings and a two-entry stylesheet
//! (format 0 is the default, format 1 is bold). Entries carry a fixed
//! timestamp, so building the same workbook twice yields the same bytes.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Cursor, Seek, Write};
use std::path::Path;

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

use crate::error::{XlsxError, XlsxResult};
use dupmark_core::{CellAddress, CellValue, DESIGNATED_COLUMN, MAX_COLS, MAX_ROWS};

/// Index of the bold cell format in built workbooks
pub const BOLD_STYLE: u32 = 1;

#[derive(Debug, Clone)]
struct SheetSpec {
    name: String,
    cells: BTreeMap<(u32, u16), (CellValue, u32)>,
}

impl SheetSpec {
    fn new(name: String) -> Self {
        Self {
            name,
            cells: BTreeMap::new(),
        }
    }
}

/// Builder for small test and sample workbooks
#[derive(Debug, Clone)]
pub struct XlsxBuilder {
    sheets: Vec<SheetSpec>,
    active_tab: usize,
    shared_strings: bool,
    styles: bool,
}

impl Default for XlsxBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl XlsxBuilder {
    /// Empty builder; the first cell creates `Sheet1` if no sheet was added
    pub fn new() -> Self {
        Self {
            sheets: Vec::new(),
            active_tab: 0,
            shared_strings: false,
            styles: true,
        }
    }

    /// Append a sheet; following cells go to it
    pub fn sheet<S: Into<String>>(mut self, name: S) -> Self {
        self.sheets.push(SheetSpec::new(name.into()));
        self
    }

    /// Set the cell at a zero-based position of the current sheet
    pub fn cell<V: Into<CellValue>>(self, row: u32, col: u16, value: V) -> Self {
        self.styled_cell(row, col, value, 0)
    }

    /// Set a cell with an explicit cell format (0 or [`BOLD_STYLE`])
    pub fn styled_cell<V: Into<CellValue>>(mut self, row: u32, col: u16, value: V, style: u32) -> Self {
        if self.sheets.is_empty() {
            self.sheets.push(SheetSpec::new("Sheet1".to_string()));
        }
        if let Some(sheet) = self.sheets.last_mut() {
            sheet.cells.insert((row, col), (value.into(), style));
        }
        self
    }

    /// Fill the designated column of the current sheet from row 1 down
    pub fn column<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<CellValue>,
    {
        for (row, value) in values.into_iter().enumerate() {
            self = self.cell(row as u32, DESIGNATED_COLUMN, value);
        }
        self
    }

    /// Zero-based index of the sheet Excel opens first
    pub fn active_tab(mut self, index: usize) -> Self {
        self.active_tab = index;
        self
    }

    /// Store text through the shared string table instead of inline strings
    pub fn shared_strings(mut self, enabled: bool) -> Self {
        self.shared_strings = enabled;
        self
    }

    /// Leave the stylesheet part out of the package
    pub fn without_styles(mut self) -> Self {
        self.styles = false;
        self
    }

    /// Write the workbook to a file path
    pub fn write_file<P: AsRef<Path>>(&self, path: P) -> XlsxResult<()> {
        let mut file = BufWriter::new(File::create(path)?);
        self.write(&mut file)?;
        file.flush()?;
        Ok(())
    }

    /// Write the workbook into memory
    pub fn to_bytes(&self) -> XlsxResult<Vec<u8>> {
        let mut out = Cursor::new(Vec::new());
        self.write(&mut out)?;
        Ok(out.into_inner())
    }

    /// Write the workbook to a writer
    pub fn write<W: Write + Seek>(&self, writer: W) -> XlsxResult<()> {
        let default_sheets = [SheetSpec::new("Sheet1".to_string())];
        let sheets: &[SheetSpec] = if self.sheets.is_empty() {
            &default_sheets
        } else {
            &self.sheets
        };

        if self.active_tab >= sheets.len() {
            return Err(XlsxError::InvalidFormat(format!(
                "active tab {} out of range ({} sheets)",
                self.active_tab,
                sheets.len()
            )));
        }
        for sheet in sheets {
            let outside = sheet
                .cells
                .keys()
                .find(|&&(row, col)| row >= MAX_ROWS || col >= MAX_COLS);
            if let Some(&(row, col)) = outside {
                return Err(XlsxError::InvalidFormat(format!(
                    "cell ({}, {}) of '{}' is outside the sheet",
                    row, col, sheet.name
                )));
            }
        }

        let mut strings = SharedStrings::default();
        let worksheets: Vec<String> = sheets
            .iter()
            .map(|sheet| self.worksheet_xml(sheet, &mut strings))
            .collect();

        let mut zip = ZipWriter::new(writer);
        let options = || {
            SimpleFileOptions::default()
                .compression_method(CompressionMethod::Deflated)
                .last_modified_time(DateTime::default())
        };

        zip.start_file("[Content_Types].xml", options())?;
        zip.write_all(self.content_types_xml(sheets.len()).as_bytes())?;

        zip.start_file("_rels/.rels", options())?;
        zip.write_all(ROOT_RELS.as_bytes())?;

        zip.start_file("xl/workbook.xml", options())?;
        zip.write_all(self.workbook_xml(sheets).as_bytes())?;

        zip.start_file("xl/_rels/workbook.xml.rels", options())?;
        zip.write_all(self.workbook_rels_xml(sheets.len()).as_bytes())?;

        if self.styles {
            zip.start_file("xl/styles.xml", options())?;
            zip.write_all(STYLES_XML.as_bytes())?;
        }

        if self.shared_strings {
            zip.start_file("xl/sharedStrings.xml", options())?;
            zip.write_all(strings.to_xml().as_bytes())?;
        }

        for (i, xml) in worksheets.iter().enumerate() {
            zip.start_file(format!("xl/worksheets/sheet{}.xml", i + 1), options())?;
            zip.write_all(xml.as_bytes())?;
        }

        zip.finish()?;
        Ok(())
    }

    fn content_types_xml(&self, sheet_count: usize) -> String {
        let mut content = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
    <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
    <Default Extension="xml" ContentType="application/xml"/>
    <Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>"#,
        );
        if self.styles {
            content.push_str(
                r#"
    <Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/>"#,
            );
        }
        if self.shared_strings {
            content.push_str(
                r#"
    <Override PartName="/xl/sharedStrings.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sharedStrings+xml"/>"#,
            );
        }
        for i in 0..sheet_count {
            content.push_str(&format!(
                r#"
    <Override PartName="/xl/worksheets/sheet{}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#,
                i + 1
            ));
        }
        content.push_str("\n</Types>");
        content
    }

    fn workbook_xml(&self, sheets: &[SheetSpec]) -> String {
        let mut content = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
    <bookViews>
        <workbookView activeTab="{}"/>
    </bookViews>
    <sheets>"#,
            self.active_tab
        );
        for (i, sheet) in sheets.iter().enumerate() {
            content.push_str(&format!(
                r#"
        <sheet name="{}" sheetId="{}" r:id="rId{}"/>"#,
                escape_xml(&sheet.name),
                i + 1,
                i + 1
            ));
        }
        content.push_str(
            r#"
    </sheets>
</workbook>"#,
        );
        content
    }

    fn workbook_rels_xml(&self, sheet_count: usize) -> String {
        let mut content = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
        );
        for i in 0..sheet_count {
            content.push_str(&format!(
                r#"
    <Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{}.xml"/>"#,
                i + 1,
                i + 1
            ));
        }
        let mut next_id = sheet_count + 1;
        if self.styles {
            content.push_str(&format!(
                r#"
    <Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>"#,
                next_id
            ));
            next_id += 1;
        }
        if self.shared_strings {
            content.push_str(&format!(
                r#"
    <Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/sharedStrings" Target="sharedStrings.xml"/>"#,
                next_id
            ));
        }
        content.push_str("\n</Relationships>");
        content
    }

    fn worksheet_xml(&self, sheet: &SheetSpec, strings: &mut SharedStrings) -> String {
        let mut content = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">"#,
        );

        if let (Some(&(first_row, _)), Some(&(last_row, _))) =
            (sheet.cells.keys().next(), sheet.cells.keys().next_back())
        {
            let first_col = sheet.cells.keys().map(|&(_, c)| c).min().unwrap_or(0);
            let last_col = sheet.cells.keys().map(|&(_, c)| c).max().unwrap_or(0);
            content.push_str(&format!(
                "\n    <dimension ref=\"{}:{}\"/>",
                CellAddress::new(first_row, first_col),
                CellAddress::new(last_row, last_col)
            ));
        }

        content.push_str("\n    <sheetData>");

        let mut current_row: Option<u32> = None;
        for (&(row, col), (value, style)) in &sheet.cells {
            if current_row != Some(row) {
                if current_row.is_some() {
                    content.push_str("\n        </row>");
                }
                content.push_str(&format!("\n        <row r=\"{}\">", row + 1));
                current_row = Some(row);
            }

            let cell_ref = CellAddress::new(row, col).to_a1_string();
            let style_attr = if *style != 0 {
                format!(" s=\"{}\"", style)
            } else {
                String::new()
            };

            match value {
                CellValue::Empty => {
                    content.push_str(&format!("\n            <c r=\"{}\"{}/>", cell_ref, style_attr));
                }
                CellValue::Boolean(b) => {
                    content.push_str(&format!(
                        "\n            <c r=\"{}\"{} t=\"b\"><v>{}</v></c>",
                        cell_ref,
                        style_attr,
                        u8::from(*b)
                    ));
                }
                CellValue::Number(n) => {
                    content.push_str(&format!(
                        "\n            <c r=\"{}\"{}><v>{}</v></c>",
                        cell_ref, style_attr, n
                    ));
                }
                CellValue::Text(s) if self.shared_strings => {
                    content.push_str(&format!(
                        "\n            <c r=\"{}\"{} t=\"s\"><v>{}</v></c>",
                        cell_ref,
                        style_attr,
                        strings.index_of(s)
                    ));
                }
                CellValue::Text(s) => {
                    content.push_str(&format!(
                        "\n            <c r=\"{}\"{} t=\"inlineStr\"><is><t{}>{}</t></is></c>",
                        cell_ref,
                        style_attr,
                        space_attr(s),
                        escape_xml(s)
                    ));
                }
                CellValue::Error(e) => {
                    content.push_str(&format!(
                        "\n            <c r=\"{}\"{} t=\"e\"><v>{}</v></c>",
                        cell_ref,
                        style_attr,
                        escape_xml(e)
                    ));
                }
            }
        }

        if current_row.is_some() {
            content.push_str("\n        </row>");
        }
        content.push_str("\n    </sheetData>\n</worksheet>");
        content
    }
}

/// Shared string table in first-use order
#[derive(Debug, Default)]
struct SharedStrings {
    strings: Vec<String>,
    index: BTreeMap<String, usize>,
    references: usize,
}

impl SharedStrings {
    fn index_of(&mut self, s: &str) -> usize {
        self.references += 1;
        if let Some(&i) = self.index.get(s) {
            return i;
        }
        let i = self.strings.len();
        self.strings.push(s.to_string());
        self.index.insert(s.to_string(), i);
        i
    }

    fn to_xml(&self) -> String {
        let mut content = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="{}" uniqueCount="{}">"#,
            self.references,
            self.strings.len()
        );
        for s in &self.strings {
            content.push_str(&format!("\n    <si><t{}>{}</t></si>", space_attr(s), escape_xml(s)));
        }
        content.push_str("\n</sst>");
        content
    }
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

fn space_attr(s: &str) -> &'static str {
    if crate::xml::needs_space_preserve(s) {
        " xml:space=\"preserve\""
    } else {
        ""
    }
}

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
    <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>
</Relationships>"#;

const STYLES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <fonts count="2">
    <font><sz val="11"/><color theme="1"/><name val="Calibri"/><family val="2"/><scheme val="minor"/></font>
    <font><b/><sz val="11"/><color theme="1"/><name val="Calibri"/><family val="2"/><scheme val="minor"/></font>
  </fonts>
  <fills count="2">
    <fill><patternFill patternType="none"/></fill>
    <fill><patternFill patternType="gray125"/></fill>
  </fills>
  <borders count="1">
    <border><left/><right/><top/><bottom/><diagonal/></border>
  </borders>
  <cellStyleXfs count="1">
    <xf numFmtId="0" fontId="0" fillId="0" borderId="0"/>
  </cellStyleXfs>
  <cellXfs count="2">
    <xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/>
    <xf numFmtId="0" fontId="1" fillId="0" borderId="0" xfId="0" applyFont="1"/>
  </cellXfs>
  <cellStyles count="1">
    <cellStyle name="Normal" xfId="0" builtinId="0"/>
  </cellStyles>
</styleSheet>"#;
