//! Sample workbook generator
//!
//! Writes `1.xlsx..N.xlsx`, each with a column of random mobile-style phone
//! numbers. Numbers are drawn from a small space, so a few dozen files of a
//! few hundred rows contain plenty of duplicates to mark.

use std::fs;
use std::path::PathBuf;

use dupmark_xlsx::{XlsxBuilder, XlsxResult};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::info;

/// Operator prefixes following the leading `09`
pub const PHONE_PREFIXES: [&str; 5] = ["12", "35", "36", "02", "18"];

/// What [`generate`] writes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorConfig {
    pub files: usize,
    /// Phone numbers per file
    pub rows: usize,
    pub output_directory: PathBuf,
    /// Fixed seed for reproducible output; fresh entropy when `None`
    pub seed: Option<u64>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            files: 31,
            rows: 400,
            output_directory: PathBuf::from("months"),
            seed: None,
        }
    }
}

/// `09`, one of [`PHONE_PREFIXES`], then the digits 0 to 6 in random order
pub fn phone_number<R: Rng + ?Sized>(rng: &mut R) -> String {
    let prefix = PHONE_PREFIXES.choose(rng).copied().unwrap_or(PHONE_PREFIXES[0]);
    let mut digits: Vec<char> = ('0'..='6').collect();
    digits.shuffle(rng);

    let mut number = String::with_capacity(11);
    number.push_str("09");
    number.push_str(prefix);
    number.extend(digits);
    number
}

/// Write the sample workbooks, creating the directory if needed.
///
/// Existing files with the same names are overwritten. Returns the written
/// paths in order.
pub fn generate(config: &GeneratorConfig) -> XlsxResult<Vec<PathBuf>> {
    fs::create_dir_all(&config.output_directory)?;

    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let mut written = Vec::with_capacity(config.files);
    for i in 1..=config.files {
        let numbers: Vec<String> = (0..config.rows).map(|_| phone_number(&mut rng)).collect();
        let path = config.output_directory.join(format!("{i}.xlsx"));
        XlsxBuilder::new().column(numbers).write_file(&path)?;
        written.push(path);
    }

    info!(
        "generated {} file(s) of {} row(s) in {}",
        written.len(),
        config.rows,
        config.output_directory.display()
    );
    Ok(written)
}
