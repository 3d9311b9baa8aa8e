//! Run errors

use std::path::{Path, PathBuf};

use dupmark_xlsx::XlsxError;
use thiserror::Error;

/// Result type for engine operations
pub type RunResult<T> = std::result::Result<T, RunError>;

/// Why a run stopped.
///
/// Every variant names the file it concerns. A run stops at the first error
/// and does not retry; files saved before the error stay saved.
#[derive(Debug, Error)]
pub enum RunError {
    /// The file is missing, not a workbook, or its active sheet cannot be read
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: XlsxError,
    },

    /// The file holds a value the frequency index has never seen, which means
    /// the index was built from a different file set
    #[error("{} does not match the index: {source}", path.display())]
    Consistency {
        path: PathBuf,
        #[source]
        source: dupmark_core::Error,
    },

    /// The annotated file could not be saved
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Two inputs share a base name and would be copied to the same file
    #[error(
        "{} and {} would both be saved as {}",
        first.display(),
        second.display(),
        destination.display()
    )]
    DestinationClash {
        first: PathBuf,
        second: PathBuf,
        destination: PathBuf,
    },

    /// A copy would be saved over one of the inputs
    #[error("copying {} to {} would overwrite an input", path.display(), destination.display())]
    OverwritesInput { path: PathBuf, destination: PathBuf },
}

impl RunError {
    /// The file the error concerns
    pub fn path(&self) -> &Path {
        match self {
            RunError::Read { path, .. }
            | RunError::Consistency { path, .. }
            | RunError::Write { path, .. }
            | RunError::OverwritesInput { path, .. } => path,
            RunError::DestinationClash { second, .. } => second,
        }
    }

    pub(crate) fn read(path: &Path, source: XlsxError) -> Self {
        RunError::Read {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn write(path: &Path, source: std::io::Error) -> Self {
        RunError::Write {
            path: path.to_path_buf(),
            source,
        }
    }
}
