//! Run configuration

use std::path::{Path, PathBuf};

use crate::color::Color;

/// Directory used for copies when none is configured
pub const DEFAULT_OUTPUT_DIRECTORY: &str = "data";

/// Options of one duplicate-marking run.
///
/// The default configuration overwrites the input files in place. That mode
/// is destructive and keeps no backup; enable [`RunConfig::make_copy`] to
/// leave the inputs untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    /// Write annotated files into `output_directory` instead of overwriting the inputs
    pub make_copy: bool,
    /// Write the distinct origin file names beside every duplicate
    pub show_duplicate_origin: bool,
    /// Destination of copies; only used with `make_copy`
    pub output_directory: PathBuf,
    /// Font color given to duplicate cells
    pub marker_color: Color,
    /// Upper bound on worker threads used to read and write files
    pub jobs: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            make_copy: false,
            show_duplicate_origin: false,
            output_directory: PathBuf::from(DEFAULT_OUTPUT_DIRECTORY),
            marker_color: Color::RED,
            jobs: 1,
        }
    }
}

impl RunConfig {
    /// Create the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Write copies into `dir` instead of overwriting the inputs
    pub fn copy_to<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.make_copy = true;
        self.output_directory = dir.into();
        self
    }

    /// Overwrite the inputs (destructive, no backup)
    pub fn in_place(mut self) -> Self {
        self.make_copy = false;
        self
    }

    /// Enable or disable origin names beside duplicates
    pub fn with_origins(mut self, show: bool) -> Self {
        self.show_duplicate_origin = show;
        self
    }

    /// Set the marker font color
    pub fn with_marker_color(mut self, color: Color) -> Self {
        self.marker_color = color;
        self
    }

    /// Set the worker thread bound (0 is treated as 1)
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    /// Path the annotated version of `input` is saved to
    pub fn destination_for(&self, input: &Path) -> PathBuf {
        if !self.make_copy {
            return input.to_path_buf();
        }
        match input.file_name() {
            Some(name) => self.output_directory.join(name),
            None => self.output_directory.join(input),
        }
    }
}
