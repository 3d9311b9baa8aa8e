//! Shared string table and inline string text

use quick_xml::events::Event;
use quick_xml::reader::Reader;

use crate::error::{XlsxError, XlsxResult};
use crate::xml::local_name;

/// Decode Excel's `_xHHHH_` escape sequences in strings.
///
/// Excel uses this format to encode special characters in XML:
/// - `_x000d_` = CR (carriage return)
/// - `_x000a_` = LF (line feed)
/// - `_x0009_` = Tab
/// - `_x005f_` = Underscore (escaped underscore)
pub(crate) fn decode_excel_escapes(s: &str) -> String {
    if !s.contains("_x") {
        return s.to_string();
    }

    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '_' {
            result.push(c);
            continue;
        }

        let mut hex_chars = String::new();
        let mut is_escape = false;
        let mut saw_x = false;

        if chars.peek() == Some(&'x') {
            chars.next();
            saw_x = true;

            for _ in 0..4 {
                match chars.peek() {
                    Some(&ch) if ch.is_ascii_hexdigit() => {
                        hex_chars.push(ch);
                        chars.next();
                    }
                    _ => break,
                }
            }

            if hex_chars.len() == 4 && chars.peek() == Some(&'_') {
                chars.next();
                if let Some(decoded) =
                    u32::from_str_radix(&hex_chars, 16).ok().and_then(char::from_u32)
                {
                    result.push(decoded);
                    is_escape = true;
                } else {
                    // Not a scalar value: keep the sequence verbatim
                    result.push_str("_x");
                    result.push_str(&hex_chars);
                    result.push('_');
                    is_escape = true;
                }
            }
        }

        if !is_escape {
            result.push('_');
            if saw_x {
                result.push('x');
            }
            result.push_str(&hex_chars);
        }
    }

    result
}

/// Read the shared strings table
pub(crate) fn read_shared_strings(xml: &[u8]) -> XlsxResult<Vec<String>> {
    let mut reader = Reader::from_reader(xml);
    reader.trim_text(false);

    let mut buf = Vec::new();
    let mut strings = Vec::new();
    let mut current = String::new();
    let mut in_si = false;
    let mut in_t = false;
    // Phonetic runs (<rPh>) carry their own <t>, which is not part of the value
    let mut phonetic_depth = 0usize;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match local_name(e.name().as_ref()) {
                b"si" => {
                    in_si = true;
                    current.clear();
                }
                b"rPh" if in_si => phonetic_depth += 1,
                b"t" if in_si && phonetic_depth == 0 => in_t = true,
                _ => {}
            },
            Ok(Event::Empty(e)) if local_name(e.name().as_ref()) == b"si" => {
                strings.push(String::new());
            }
            Ok(Event::End(e)) => match local_name(e.name().as_ref()) {
                b"si" => {
                    strings.push(decode_excel_escapes(&current));
                    current.clear();
                    in_si = false;
                }
                b"rPh" if phonetic_depth > 0 => phonetic_depth -= 1,
                b"t" => in_t = false,
                _ => {}
            },
            Ok(Event::Text(e)) if in_t => {
                current.push_str(&e.unescape()?);
            }
            Ok(Event::CData(e)) if in_t => {
                current.push_str(&String::from_utf8_lossy(&e));
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(XlsxError::Xml(e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(strings)
}
