//! Stylesheet (`xl/styles.xml`) handling
//!
//! The stylesheet is never rebuilt. Its `<fonts>` and `<cellXfs>` entries are
//! captured as raw event lists so that marker styles can be cloned from the
//! style a cell already uses, then appended at the end of each list while the
//! rest of the part streams through unchanged.

use std::collections::HashMap;

use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::reader::Reader;
use quick_xml::writer::Writer;

use crate::error::{XlsxError, XlsxResult};
use crate::xml::{attr_value, element_prefix, local_name, prefixed, with_attribute};
use dupmark_core::Color;

/// Font child elements that must follow `<color>`
const AFTER_COLOR: &[&[u8]] = &[b"name", b"family", b"charset", b"scheme"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Fonts,
    CellXfs,
}

impl Section {
    fn item(self) -> &'static [u8] {
        match self {
            Section::Fonts => b"font",
            Section::CellXfs => b"xf",
        }
    }
}

/// The parts of a stylesheet that marker styles are derived from
#[derive(Debug, Default)]
pub(crate) struct StyleSheet {
    fonts: Vec<Vec<Event<'static>>>,
    cell_xfs: Vec<Vec<Event<'static>>>,
}

impl StyleSheet {
    /// Capture the `<font>` and `<xf>` entries of `<fonts>` and `<cellXfs>`
    pub(crate) fn parse(xml: &[u8]) -> XlsxResult<Self> {
        let mut reader = Reader::from_reader(xml);
        reader.trim_text(false);

        let mut buf = Vec::new();
        let mut sheet = StyleSheet::default();
        let mut section: Option<Section> = None;
        let mut current: Vec<Event<'static>> = Vec::new();
        let mut depth = 0usize;

        loop {
            let event = reader.read_event_into(&mut buf)?.into_owned();
            match &event {
                Event::Eof => break,
                Event::Start(e) => {
                    let name = local_name(e.name().as_ref()).to_vec();
                    if depth > 0 {
                        depth += 1;
                        current.push(event);
                    } else if let Some(sec) = section {
                        if name == sec.item() {
                            depth = 1;
                            current.push(event);
                        }
                    } else if name == b"fonts" {
                        section = Some(Section::Fonts);
                    } else if name == b"cellXfs" {
                        section = Some(Section::CellXfs);
                    }
                }
                Event::Empty(e) => {
                    if depth > 0 {
                        current.push(event);
                    } else if let Some(sec) = section {
                        if local_name(e.name().as_ref()) == sec.item() {
                            sheet.list_mut(sec).push(vec![event]);
                        }
                    }
                }
                Event::End(e) => {
                    if depth > 0 {
                        depth -= 1;
                        current.push(event);
                        if depth == 0 {
                            if let Some(sec) = section {
                                sheet.list_mut(sec).push(std::mem::take(&mut current));
                            }
                        }
                    } else if matches!(local_name(e.name().as_ref()), b"fonts" | b"cellXfs") {
                        section = None;
                    }
                }
                _ => {
                    if depth > 0 {
                        current.push(event);
                    }
                }
            }
            buf.clear();
        }

        Ok(sheet)
    }

    fn list_mut(&mut self, section: Section) -> &mut Vec<Vec<Event<'static>>> {
        match section {
            Section::Fonts => &mut self.fonts,
            Section::CellXfs => &mut self.cell_xfs,
        }
    }

    pub(crate) fn font_count(&self) -> usize {
        self.fonts.len()
    }

    pub(crate) fn xf_count(&self) -> usize {
        self.cell_xfs.len()
    }

    /// `fontId` of a cell format
    pub(crate) fn xf_font_id(&self, xf: u32) -> Option<u32> {
        let events = self.cell_xfs.get(xf as usize)?;
        let start = opening_tag(events)?;
        attr_value(start, b"fontId").ok()??.trim().parse().ok()
    }

    /// `rgb` of a font's `<color>`, if it has one
    pub(crate) fn font_rgb(&self, font: u32) -> Option<String> {
        self.fonts.get(font as usize)?.iter().find_map(|event| match event {
            Event::Start(e) | Event::Empty(e) if local_name(e.name().as_ref()) == b"color" => {
                attr_value(e, b"rgb").ok().flatten()
            }
            _ => None,
        })
    }

    /// Font colour of the font a cell format points at
    pub(crate) fn xf_font_rgb(&self, xf: u32) -> Option<String> {
        self.font_rgb(self.xf_font_id(xf)?)
    }
}

fn opening_tag<'a>(events: &'a [Event<'static>]) -> Option<&'a BytesStart<'static>> {
    match events.first()? {
        Event::Start(e) | Event::Empty(e) => Some(e),
        _ => None,
    }
}

/// Marker cell formats allocated for one worksheet rewrite.
///
/// Each distinct base format gets exactly one marker format, numbered after
/// the existing `<cellXfs>` entries in the order the bases were first seen.
#[derive(Debug)]
pub(crate) struct MarkerStyles {
    argb: String,
    first_font: u32,
    first_xf: u32,
    bases: Vec<u32>,
    by_base: HashMap<u32, u32>,
}

impl MarkerStyles {
    pub(crate) fn new(sheet: &StyleSheet, color: &Color) -> Self {
        Self {
            argb: color.to_argb_hex(),
            first_font: sheet.font_count() as u32,
            first_xf: sheet.xf_count() as u32,
            bases: Vec::new(),
            by_base: HashMap::new(),
        }
    }

    /// Index of the marker format derived from `base`
    pub(crate) fn xf_for(&mut self, base: u32) -> u32 {
        if let Some(&xf) = self.by_base.get(&base) {
            return xf;
        }
        let xf = self.first_xf + self.bases.len() as u32;
        self.bases.push(base);
        self.by_base.insert(base, xf);
        xf
    }

    pub(crate) fn len(&self) -> usize {
        self.bases.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.bases.is_empty()
    }

    /// Rewrite the stylesheet with the allocated fonts and formats appended
    pub(crate) fn write(&self, xml: &[u8], sheet: &StyleSheet) -> XlsxResult<Vec<u8>> {
        let mut reader = Reader::from_reader(xml);
        reader.trim_text(false);
        let mut writer = Writer::new(Vec::with_capacity(xml.len() + 256 * self.len()));

        let mut buf = Vec::new();
        let mut fonts_done = false;
        let mut xfs_done = false;

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Eof => break,
                Event::Start(e) => {
                    let count = match local_name(e.name().as_ref()) {
                        b"fonts" => Some(sheet.font_count() + self.len()),
                        b"cellXfs" => Some(sheet.xf_count() + self.len()),
                        _ => None,
                    };
                    match count {
                        Some(count) => writer.write_event(Event::Start(with_attribute(
                            &e,
                            "count",
                            &count.to_string(),
                        )?))?,
                        None => writer.write_event(Event::Start(e))?,
                    }
                }
                Event::End(e) => {
                    let prefix = element_prefix(e.name().as_ref());
                    match local_name(e.name().as_ref()) {
                        b"fonts" => {
                            self.write_fonts(&mut writer, sheet, prefix.as_deref())?;
                            fonts_done = true;
                        }
                        b"cellXfs" => {
                            self.write_xfs(&mut writer, sheet, prefix.as_deref())?;
                            xfs_done = true;
                        }
                        _ => {}
                    }
                    writer.write_event(Event::End(e))?;
                }
                Event::Empty(e) if matches!(local_name(e.name().as_ref()), b"fonts" | b"cellXfs") => {
                    let prefix = element_prefix(e.name().as_ref());
                    let is_fonts = local_name(e.name().as_ref()) == b"fonts";
                    let count = self.len();
                    let start = with_attribute(&e, "count", &count.to_string())?;
                    let end = BytesEnd::new(String::from_utf8_lossy(e.name().as_ref()).into_owned());
                    writer.write_event(Event::Start(start))?;
                    if is_fonts {
                        self.write_fonts(&mut writer, sheet, prefix.as_deref())?;
                        fonts_done = true;
                    } else {
                        self.write_xfs(&mut writer, sheet, prefix.as_deref())?;
                        xfs_done = true;
                    }
                    writer.write_event(Event::End(end))?;
                }
                event => writer.write_event(event)?,
            }
            buf.clear();
        }

        if !self.is_empty() && !(fonts_done && xfs_done) {
            return Err(XlsxError::InvalidFormat(
                "stylesheet has no <fonts> or <cellXfs> list".into(),
            ));
        }

        Ok(writer.into_inner())
    }

    fn write_fonts(
        &self,
        writer: &mut Writer<Vec<u8>>,
        sheet: &StyleSheet,
        prefix: Option<&str>,
    ) -> XlsxResult<()> {
        for &base in &self.bases {
            let base_font = sheet
                .xf_font_id(base)
                .and_then(|id| sheet.fonts.get(id as usize));
            for event in marker_font(base_font.map(Vec::as_slice), &self.argb, prefix)? {
                writer.write_event(event)?;
            }
        }
        Ok(())
    }

    fn write_xfs(
        &self,
        writer: &mut Writer<Vec<u8>>,
        sheet: &StyleSheet,
        prefix: Option<&str>,
    ) -> XlsxResult<()> {
        for (i, &base) in self.bases.iter().enumerate() {
            let font_id = self.first_font + i as u32;
            let base_xf = sheet.cell_xfs.get(base as usize).map(Vec::as_slice);
            for event in marker_xf(base_xf, font_id, prefix)? {
                writer.write_event(event)?;
            }
        }
        Ok(())
    }
}

fn color_element(prefix: Option<&str>, argb: &str) -> Event<'static> {
    let mut color = BytesStart::new(prefixed(prefix, "color"));
    color.push_attribute(("rgb", argb));
    Event::Empty(color)
}

/// Copy of `base` whose `<color>` is replaced by (or extended with) `argb`
fn marker_font(
    base: Option<&[Event<'static>]>,
    argb: &str,
    prefix: Option<&str>,
) -> XlsxResult<Vec<Event<'static>>> {
    let Some(base) = base.filter(|b| opening_tag(b).is_some()) else {
        let name = prefixed(prefix, "font");
        return Ok(vec![
            Event::Start(BytesStart::new(name.clone())),
            color_element(prefix, argb),
            Event::End(BytesEnd::new(name)),
        ]);
    };

    if let [Event::Empty(font)] = base {
        let name = String::from_utf8_lossy(font.name().as_ref()).into_owned();
        let font_prefix = element_prefix(font.name().as_ref());
        return Ok(vec![
            Event::Start(font.clone()),
            color_element(font_prefix.as_deref(), argb),
            Event::End(BytesEnd::new(name)),
        ]);
    }

    let font_prefix = opening_tag(base).and_then(|e| element_prefix(e.name().as_ref()));
    let color = color_element(font_prefix.as_deref(), argb);
    let last = base.len() - 1;

    let mut out = Vec::with_capacity(base.len() + 1);
    let mut placed = false;
    let mut depth = 0usize;
    let mut skipping = 0usize;

    for (i, event) in base.iter().enumerate() {
        if skipping > 0 {
            match event {
                Event::Start(_) => skipping += 1,
                Event::End(_) => skipping -= 1,
                _ => {}
            }
            continue;
        }

        // Direct children of <font> sit at depth 1
        let child = match event {
            Event::Start(e) | Event::Empty(e) if depth == 1 => Some(local_name(e.name().into_inner())),
            _ => None,
        };

        if let Some(child) = child {
            if child == b"color" {
                if !placed {
                    out.push(color.clone());
                    placed = true;
                }
                if matches!(event, Event::Start(_)) {
                    skipping = 1;
                }
                continue;
            }
            if !placed && AFTER_COLOR.iter().any(|n| *n == child) {
                out.push(color.clone());
                placed = true;
            }
        }

        if i == last && !placed {
            out.push(color.clone());
            placed = true;
        }

        match event {
            Event::Start(_) => depth += 1,
            Event::End(_) => depth = depth.saturating_sub(1),
            _ => {}
        }
        out.push(event.clone());
    }

    Ok(out)
}

/// Copy of `base` pointing at `font_id`
fn marker_xf(
    base: Option<&[Event<'static>]>,
    font_id: u32,
    prefix: Option<&str>,
) -> XlsxResult<Vec<Event<'static>>> {
    let font_id = font_id.to_string();

    match base.and_then(|b| opening_tag(b).map(|start| (b, start))) {
        Some((events, start)) => {
            let patched = with_attribute(start, "fontId", &font_id)?;
            let patched = with_attribute(&patched, "applyFont", "1")?;
            let mut out = Vec::with_capacity(events.len());
            out.push(match &events[0] {
                Event::Empty(_) => Event::Empty(patched),
                _ => Event::Start(patched),
            });
            out.extend(events[1..].iter().cloned());
            Ok(out)
        }
        None => {
            let mut xf = BytesStart::new(prefixed(prefix, "xf"));
            xf.push_attribute(("numFmtId", "0"));
            xf.push_attribute(("fontId", font_id.as_str()));
            xf.push_attribute(("fillId", "0"));
            xf.push_attribute(("borderId", "0"));
            xf.push_attribute(("xfId", "0"));
            xf.push_attribute(("applyFont", "1"));
            Ok(vec![Event::Empty(xf)])
        }
    }
}
