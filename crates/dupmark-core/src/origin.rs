//! Origin file naming

use std::collections::BTreeSet;
use std::path::Path;

/// Display name of an origin file: its base name, with the directory part
/// stripped using the platform's path separator.
///
/// Paths without a final component (e.g. `..`) are shown whole.
pub fn origin_name(path: &Path) -> String {
    match path.file_name() {
        Some(name) => name.to_string_lossy().into_owned(),
        None => path.to_string_lossy().into_owned(),
    }
}

/// Distinct base names of `origins`, sorted lexicographically.
///
/// Repeated occurrences of a file collapse to one name, and so do different
/// files sharing a base name.
pub fn distinct_origin_names<'a, I, P>(origins: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a P>,
    P: AsRef<Path> + ?Sized + 'a,
{
    origins
        .into_iter()
        .map(|p| origin_name(p.as_ref()))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
