//! Annotation writer: the second pass of a run

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use dupmark_core::{origin_name, plan_annotations, FrequencyIndex, RunConfig};
use dupmark_xlsx::{XlsxPatcher, XlsxReader};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::error::{RunError, RunResult};
use crate::files::FileSet;
use crate::parallel::run_indexed;
use crate::progress::{ProgressEvent, ProgressSink};

/// Outcome of annotating one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReport {
    /// The file that was read
    pub input: PathBuf,
    /// Where the annotated version was saved
    pub output: PathBuf,
    /// Designated-column cells given the marker color
    pub marked_cells: usize,
    /// Cells written with an origin name
    pub origin_cells: usize,
}

/// Marks duplicates in files against a finished frequency index
pub struct Annotator<'a> {
    config: &'a RunConfig,
    index: &'a FrequencyIndex,
    patcher: XlsxPatcher,
}

impl<'a> Annotator<'a> {
    pub fn new(config: &'a RunConfig, index: &'a FrequencyIndex) -> Self {
        Self {
            config,
            index,
            patcher: XlsxPatcher::new(config.marker_color),
        }
    }

    /// Annotate one file and save it to its destination.
    ///
    /// The file is read again rather than reusing what the indexer saw, so
    /// the saved workbook reflects the file as it is now.
    pub fn annotate_file(&self, path: &Path) -> RunResult<FileReport> {
        let doc = XlsxReader::read_file(path).map_err(|e| RunError::read(path, e))?;

        let plan = plan_annotations(doc.column(), self.index, self.config.show_duplicate_origin)
            .map_err(|source| RunError::Consistency {
                path: path.to_path_buf(),
                source,
            })?;

        let (bytes, stats) = self
            .patcher
            .patch(&doc, plan.edits())
            .map_err(|e| RunError::read(path, e))?;

        let output = self.config.destination_for(path);
        persist(&output, path, &bytes)?;

        debug!(
            "{} -> {}: {} marked, {} origin cell(s)",
            path.display(),
            output.display(),
            stats.marked_cells,
            stats.origin_cells
        );

        Ok(FileReport {
            input: path.to_path_buf(),
            output,
            marked_cells: stats.marked_cells,
            origin_cells: stats.origin_cells,
        })
    }

    /// Annotate every file of the set, reporting each saved file to `progress`.
    ///
    /// Reports come back in set order. The first failure stops the pass;
    /// files already saved stay saved.
    pub fn write_all(&self, files: &FileSet, progress: &dyn ProgressSink) -> RunResult<Vec<FileReport>> {
        if self.config.make_copy {
            let dir = &self.config.output_directory;
            fs::create_dir_all(dir).map_err(|e| RunError::write(dir, e))?;
        }

        let total = files.len();
        let completed = Mutex::new(0usize);

        let reports = run_indexed(total, self.config.jobs, |i| {
            let path = &files.paths()[i];
            let report = self.annotate_file(path)?;

            // Count and notify under one lock so `completed` arrives in order
            let mut done = completed.lock().unwrap_or_else(|p| p.into_inner());
            *done += 1;
            progress.notify(ProgressEvent::FileWritten {
                name: origin_name(path),
                path: report.output.clone(),
                completed: *done,
                total,
            });
            Ok(report)
        })?;

        info!("annotated {} file(s)", reports.len());
        Ok(reports)
    }
}

/// Save `bytes` to `destination` through a temporary file in the same
/// directory, so a failed write never leaves a truncated workbook behind.
fn persist(destination: &Path, source: &Path, bytes: &[u8]) -> RunResult<()> {
    let dir = match destination.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let fail = |e| RunError::write(destination, e);

    let mut tmp = NamedTempFile::new_in(dir).map_err(fail)?;

    let permissions = fs::metadata(destination)
        .or_else(|_| fs::metadata(source))
        .map(|m| m.permissions());
    if let Ok(permissions) = permissions {
        tmp.as_file().set_permissions(permissions).map_err(fail)?;
    }

    tmp.write_all(bytes).map_err(fail)?;
    tmp.as_file().sync_all().map_err(fail)?;
    tmp.persist(destination).map_err(|e| fail(e.error))?;
    Ok(())
}
