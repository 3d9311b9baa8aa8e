//! Common utilities for E2E tests.

use std::collections::BTreeMap;
use std::io::{Cursor, Read};

use zip::ZipArchive;

/// Decompressed contents of every entry of a package, by name
pub fn entries(bytes: &[u8]) -> BTreeMap<String, Vec<u8>> {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).expect("valid zip");
    let mut out = BTreeMap::new();
    for i in 0..archive.len() {
        let mut file = archive.by_index(i).expect("entry");
        let mut data = Vec::new();
        file.read_to_end(&mut data).expect("readable entry");
        out.insert(file.name().to_string(), data);
    }
    out
}

/// Entry names of a package in archive order
pub fn entry_names(bytes: &[u8]) -> Vec<String> {
    let archive = ZipArchive::new(Cursor::new(bytes)).expect("valid zip");
    archive.file_names().map(str::to_string).collect::<Vec<_>>()
}

/// A single entry as UTF-8 text
pub fn entry_text(bytes: &[u8], name: &str) -> String {
    let data = entries(bytes)
        .remove(name)
        .unwrap_or_else(|| panic!("missing entry {name}"));
    String::from_utf8(data).expect("utf-8 entry")
}
