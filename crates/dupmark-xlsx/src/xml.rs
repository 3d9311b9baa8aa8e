//! Small helpers shared by the part readers and writers

use std::io::{Read, Seek};

use quick_xml::events::BytesStart;
use zip::result::ZipError;
use zip::ZipArchive;

use crate::error::{XlsxError, XlsxResult};

/// Element name without its namespace prefix
pub(crate) fn local_name(name: &[u8]) -> &[u8] {
    match name.iter().rposition(|&b| b == b':') {
        Some(i) => &name[i + 1..],
        None => name,
    }
}

/// Namespace prefix of an element name, if any
pub(crate) fn element_prefix(name: &[u8]) -> Option<String> {
    name.iter()
        .position(|&b| b == b':')
        .map(|i| String::from_utf8_lossy(&name[..i]).into_owned())
}

/// Element name carrying `prefix`
pub(crate) fn prefixed(prefix: Option<&str>, local: &str) -> String {
    match prefix {
        Some(p) => format!("{p}:{local}"),
        None => local.to_string(),
    }
}

/// Unescaped value of the attribute named exactly `key`
pub(crate) fn attr_value(e: &BytesStart<'_>, key: &[u8]) -> XlsxResult<Option<String>> {
    for attr in e.attributes() {
        let attr = attr?;
        if attr.key.as_ref() == key {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

/// Value of the relationship id attribute (`r:id`, whatever the prefix)
pub(crate) fn relationship_id(e: &BytesStart<'_>) -> XlsxResult<Option<String>> {
    for attr in e.attributes() {
        let attr = attr?;
        if attr.key.prefix().is_some() && attr.key.local_name().as_ref() == b"id" {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

/// Copy of `e` with attribute `key` set to `value`.
///
/// An existing attribute keeps its position; a new one is appended.
pub(crate) fn with_attribute(
    e: &BytesStart<'_>,
    key: &str,
    value: &str,
) -> XlsxResult<BytesStart<'static>> {
    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let mut out = BytesStart::new(name);
    let mut replaced = false;

    for attr in e.attributes() {
        let attr = attr?;
        if attr.key.as_ref() == key.as_bytes() {
            out.push_attribute((key, value));
            replaced = true;
        } else {
            out.push_attribute(attr);
        }
    }

    if !replaced {
        out.push_attribute((key, value));
    }
    Ok(out)
}

/// Read a ZIP entry that must exist
pub(crate) fn read_part<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> XlsxResult<Vec<u8>> {
    read_part_optional(archive, name)?.ok_or_else(|| XlsxError::MissingPart(name.to_string()))
}

/// Read a ZIP entry, `None` when absent
pub(crate) fn read_part_optional<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> XlsxResult<Option<Vec<u8>>> {
    let mut file = match archive.by_name(name) {
        Ok(f) => f,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let mut buf = Vec::with_capacity(file.size() as usize);
    file.read_to_end(&mut buf)?;
    Ok(Some(buf))
}

/// Whether text needs `xml:space="preserve"` to survive parsing
pub(crate) fn needs_space_preserve(s: &str) -> bool {
    s.starts_with(char::is_whitespace) || s.ends_with(char::is_whitespace)
}
