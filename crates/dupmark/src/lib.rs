//! # dupmark
//!
//! Find values repeated across spreadsheet files and mark them.
//!
//! A run reads column A of the active sheet of every file, counts each value
//! across the whole set, then rewrites each file with the repeated values in
//! a marker font color. Optionally the names of the files a repeated value
//! came from are written beside it, starting in column B.
//!
//! By default files are overwritten in place and no backup is kept. Use
//! [`RunConfig::copy_to`] to write annotated copies instead.
//!
//! ## Example
//!
//! ```rust,no_run
//! use dupmark::{FileSet, NoProgress, Pipeline, RunConfig};
//!
//! let files: FileSet = ["january.xlsx", "february.xlsx"].into_iter().collect();
//! let config = RunConfig::new().copy_to("data").with_origins(true);
//!
//! let summary = Pipeline::new(config).run(&files, &NoProgress)?;
//! println!("{} duplicate value(s) marked", summary.duplicate_values);
//! # Ok::<(), dupmark::RunError>(())
//! ```

pub mod error;
pub mod files;
pub mod generate;
pub mod indexer;
pub mod pipeline;
pub mod progress;
pub mod writer;

mod parallel;

pub use error::{RunError, RunResult};
pub use files::FileSet;
pub use generate::{generate, phone_number, GeneratorConfig};
pub use indexer::{index_file, Indexer};
pub use pipeline::{Pipeline, RunState, RunSummary};
pub use progress::{ChannelProgress, NoProgress, ProgressEvent, ProgressSink};
pub use writer::{Annotator, FileReport};

// Re-export the types callers need to configure a run and read its index
pub use dupmark_core::{Color, FrequencyEntry, FrequencyIndex, RunConfig};
