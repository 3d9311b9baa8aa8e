//! End-to-end tests for the dupmark engine.
//!
//! Workbooks are built in temporary directories with `XlsxBuilder`, run
//! through the pipeline and read back with `XlsxReader`.

mod common;
mod generator;
mod pipeline;

pub use common::*;
