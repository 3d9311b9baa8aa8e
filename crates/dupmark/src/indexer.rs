//! Value indexer: the first pass of a run

use std::path::Path;

use dupmark_core::FrequencyIndex;
use dupmark_xlsx::XlsxReader;
use tracing::{debug, info};

use crate::error::{RunError, RunResult};
use crate::files::FileSet;
use crate::parallel::run_indexed;

/// Builds the cross-file frequency index of the designated column
#[derive(Debug, Clone, Copy)]
pub struct Indexer {
    jobs: usize,
}

impl Default for Indexer {
    fn default() -> Self {
        Self::new(1)
    }
}

impl Indexer {
    /// Indexer reading up to `jobs` files at once
    pub fn new(jobs: usize) -> Self {
        Self { jobs: jobs.max(1) }
    }

    /// Index every file of the set.
    ///
    /// Files may be read concurrently, but per-file indexes are merged in set
    /// order, so counts and origin lists match a sequential scan. The first
    /// unreadable file fails the whole build.
    pub fn build(&self, files: &FileSet) -> RunResult<FrequencyIndex> {
        info!("indexing {} file(s)", files.len());

        let partials = run_indexed(files.len(), self.jobs, |i| index_file(&files.paths()[i]))?;

        let mut index = FrequencyIndex::new();
        for partial in partials {
            index.merge(partial);
        }

        info!(
            distinct = index.len(),
            cells = index.total_cells(),
            "index complete"
        );
        Ok(index)
    }
}

/// Index the designated column of one file
pub fn index_file(path: &Path) -> RunResult<FrequencyIndex> {
    let doc = XlsxReader::read_file(path).map_err(|e| RunError::read(path, e))?;

    let mut index = FrequencyIndex::new();
    index.record_column(doc.column(), path);
    debug!(
        "{}: {} row(s) from sheet '{}'",
        path.display(),
        doc.column().len(),
        doc.layout().sheet_name
    );
    Ok(index)
}
