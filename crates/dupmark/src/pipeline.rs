//! Run pipeline
//!
//! A run moves through `Idle -> Indexing -> Writing -> Done | Failed`.
//! Writing starts only after every file has been indexed, because a value's
//! duplicate status is unknown until the whole set has been seen.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use dupmark_core::{FrequencyIndex, RunConfig};
use tracing::{error, info, info_span};

use crate::error::{RunError, RunResult};
use crate::files::FileSet;
use crate::indexer::Indexer;
use crate::progress::{ProgressEvent, ProgressSink};
use crate::writer::Annotator;

/// Where a run currently is
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RunState {
    #[default]
    Idle,
    Indexing,
    Writing {
        completed: usize,
        total: usize,
    },
    /// Every file was saved
    Done,
    /// The run stopped on `path`
    Failed { path: PathBuf, message: String },
}

/// Totals of a finished run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub files: usize,
    /// Distinct values across the file set
    pub distinct_values: usize,
    /// Distinct values seen more than once
    pub duplicate_values: usize,
    pub marked_cells: usize,
    pub origin_cells: usize,
    /// Saved files, in set order
    pub outputs: Vec<PathBuf>,
}

/// Runs the indexer and the writer over a file set.
///
/// With the default [`RunConfig`] the input files are overwritten in place
/// and no backup is kept.
#[derive(Debug)]
pub struct Pipeline {
    config: RunConfig,
    state: Mutex<RunState>,
}

impl Pipeline {
    pub fn new(config: RunConfig) -> Self {
        Self {
            config,
            state: Mutex::new(RunState::Idle),
        }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Current state, readable from another thread during a run
    pub fn state(&self) -> RunState {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_state(&self, state: RunState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }

    /// Index `files`, then annotate and save each of them.
    ///
    /// Stops at the first failure. Files saved before the failure stay saved;
    /// the failure is also reported to `progress` as
    /// [`ProgressEvent::Failed`].
    pub fn run(&self, files: &FileSet, progress: &dyn ProgressSink) -> RunResult<RunSummary> {
        let _span = info_span!("run", files = files.len(), copy = self.config.make_copy).entered();

        progress.notify(ProgressEvent::Started { files: files.len() });
        if !self.config.make_copy && !files.is_empty() {
            info!("overwriting {} input file(s) in place", files.len());
        }

        match self.run_phases(files, progress) {
            Ok(summary) => {
                self.set_state(RunState::Done);
                info!(
                    marked = summary.marked_cells,
                    origins = summary.origin_cells,
                    "run finished"
                );
                progress.notify(ProgressEvent::Finished(summary.clone()));
                Ok(summary)
            }
            Err(e) => {
                let path = e.path().to_path_buf();
                let message = e.to_string();
                error!("{message}");
                self.set_state(RunState::Failed {
                    path: path.clone(),
                    message: message.clone(),
                });
                progress.notify(ProgressEvent::Failed { path, message });
                Err(e)
            }
        }
    }

    fn run_phases(&self, files: &FileSet, progress: &dyn ProgressSink) -> RunResult<RunSummary> {
        if self.config.make_copy {
            check_destinations(&self.config, files)?;
        }

        self.set_state(RunState::Indexing);
        let index = Indexer::new(self.config.jobs).build(files)?;
        let duplicate_values = index.duplicates().len();
        progress.notify(ProgressEvent::Indexed {
            distinct: index.len(),
            duplicates: duplicate_values,
        });

        self.set_state(RunState::Writing {
            completed: 0,
            total: files.len(),
        });
        let reports = self.write(files, &index, progress)?;

        Ok(RunSummary {
            files: files.len(),
            distinct_values: index.len(),
            duplicate_values,
            marked_cells: reports.iter().map(|r| r.marked_cells).sum(),
            origin_cells: reports.iter().map(|r| r.origin_cells).sum(),
            outputs: reports.into_iter().map(|r| r.output).collect(),
        })
    }

    fn write(
        &self,
        files: &FileSet,
        index: &FrequencyIndex,
        progress: &dyn ProgressSink,
    ) -> RunResult<Vec<crate::writer::FileReport>> {
        let tracking = |event: ProgressEvent| {
            if let ProgressEvent::FileWritten {
                completed, total, ..
            } = &event
            {
                self.set_state(RunState::Writing {
                    completed: *completed,
                    total: *total,
                });
            }
            progress.notify(event);
        };
        Annotator::new(&self.config, index).write_all(files, &tracking)
    }
}

/// In copy mode every input must map to its own destination file, and no
/// destination may be one of the inputs
fn check_destinations(config: &RunConfig, files: &FileSet) -> RunResult<()> {
    let inputs: HashSet<PathBuf> = files.iter().filter_map(resolve).collect();

    let mut seen: HashMap<PathBuf, &Path> = HashMap::new();
    for path in files.iter() {
        let destination = config.destination_for(path);
        if resolve(&destination).is_some_and(|d| inputs.contains(&d)) {
            return Err(RunError::OverwritesInput {
                path: path.to_path_buf(),
                destination,
            });
        }
        if let Some(first) = seen.insert(destination.clone(), path) {
            return Err(RunError::DestinationClash {
                first: first.to_path_buf(),
                second: path.to_path_buf(),
                destination,
            });
        }
    }
    Ok(())
}

/// `path` with its directory canonicalized; `None` if the directory is missing
fn resolve(path: &Path) -> Option<PathBuf> {
    let name = path.file_name()?;
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::canonicalize(dir).ok().map(|d| d.join(name))
}
