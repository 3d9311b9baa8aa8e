//! End-to-end tests for dupmark-xlsx.
//!
//! Each test builds the workbook it needs with `XlsxBuilder`, reads it back
//! with `XlsxReader` and, for patching tests, inspects the package written
//! by `XlsxPatcher`.

mod common;
mod patching;
mod reading;

pub use common::*;
