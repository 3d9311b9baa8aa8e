//! Package relationships (`*.rels` parts)

use quick_xml::events::Event;
use quick_xml::reader::Reader;

use crate::error::{XlsxError, XlsxResult};
use crate::xml::{attr_value, local_name};

pub(crate) const REL_OFFICE_DOCUMENT: &str = "/officeDocument";
pub(crate) const REL_WORKSHEET: &str = "/worksheet";
pub(crate) const REL_STYLES: &str = "/styles";
pub(crate) const REL_SHARED_STRINGS: &str = "/sharedStrings";

/// One `<Relationship>` entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Relationship {
    pub id: String,
    pub rel_type: String,
    pub target: String,
    pub external: bool,
}

impl Relationship {
    /// Whether the relationship type ends with `suffix` (e.g. `/styles`)
    pub fn is(&self, suffix: &str) -> bool {
        self.rel_type.ends_with(suffix)
    }
}

/// Parse a relationships part
pub(crate) fn parse_relationships(xml: &[u8]) -> XlsxResult<Vec<Relationship>> {
    let mut reader = Reader::from_reader(xml);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut rels = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Empty(e)) | Ok(Event::Start(e))
                if local_name(e.name().as_ref()) == b"Relationship" =>
            {
                let id = attr_value(&e, b"Id")?;
                let rel_type = attr_value(&e, b"Type")?;
                let target = attr_value(&e, b"Target")?;
                let external = attr_value(&e, b"TargetMode")?.as_deref() == Some("External");

                if let (Some(id), Some(rel_type), Some(target)) = (id, rel_type, target) {
                    rels.push(Relationship {
                        id,
                        rel_type,
                        target,
                        external,
                    });
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(XlsxError::Xml(e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(rels)
}

/// Name of the relationships part belonging to `part`
/// (`xl/workbook.xml` -> `xl/_rels/workbook.xml.rels`)
pub(crate) fn rels_part_for(part: &str) -> String {
    match part.rfind('/') {
        Some(i) => format!("{}/_rels/{}.rels", &part[..i], &part[i + 1..]),
        None => format!("_rels/{part}.rels"),
    }
}

/// Resolve a relationship target against the part that owns the relationship.
///
/// Absolute targets start at the package root; relative ones are taken from
/// the source part's directory, with `.` and `..` segments folded.
pub(crate) fn resolve_target(source_part: &str, target: &str) -> String {
    let joined = if let Some(absolute) = target.strip_prefix('/') {
        absolute.to_string()
    } else {
        match source_part.rfind('/') {
            Some(i) => format!("{}/{}", &source_part[..i], target),
            None => target.to_string(),
        }
    };

    let mut segments: Vec<&str> = Vec::new();
    for segment in joined.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    segments.join("/")
}
