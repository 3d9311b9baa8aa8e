//! dupmark CLI - mark values repeated across spreadsheet files

use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use dupmark::{
    generate, ChannelProgress, FileSet, GeneratorConfig, Indexer, Pipeline, ProgressEvent,
    RunConfig,
};
use dupmark_core::config::DEFAULT_OUTPUT_DIRECTORY;
use dupmark_core::{CellValue, Color};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::mpsc;
use std::thread;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "dupmark")]
#[command(
    author,
    version,
    about = "Find values repeated in column A across spreadsheet files and mark them"
)]
struct Cli {
    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Less log output (-q errors only, -qq nothing)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    quiet: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Mark duplicates in every file
    ///
    /// Without --copy or --out the input files are OVERWRITTEN IN PLACE and
    /// no backup is kept.
    Mark {
        /// Input workbooks (xlsx, xlsm)
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Write annotated copies instead of overwriting the inputs
        #[arg(short, long)]
        copy: bool,

        /// Directory for copies (implies --copy; default: data)
        #[arg(short, long, value_name = "DIR")]
        out: Option<PathBuf>,

        /// Write the names of the files each duplicate came from, starting in column B
        #[arg(long)]
        origins: bool,

        /// Files read and written at once
        #[arg(short, long, default_value_t = 1)]
        jobs: usize,

        /// Font color of duplicate cells (RRGGBB or AARRGGBB)
        #[arg(long, default_value = "FF0000", value_name = "HEX")]
        color: Color,
    },

    /// List duplicate values without changing any file
    Scan {
        /// Input workbooks (xlsx, xlsm)
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// List every value, not only duplicates
        #[arg(short, long)]
        all: bool,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,

        /// Files read at once
        #[arg(short, long, default_value_t = 1)]
        jobs: usize,
    },

    /// Write sample workbooks filled with random phone numbers
    Generate {
        /// Number of workbooks
        #[arg(short, long, default_value_t = 31)]
        files: usize,

        /// Phone numbers per workbook
        #[arg(short, long, default_value_t = 400)]
        rows: usize,

        /// Output directory
        #[arg(short, long, default_value = "months", value_name = "DIR")]
        out: PathBuf,

        /// Seed for reproducible output
        #[arg(long)]
        seed: Option<u64>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Mark {
            files,
            copy,
            out,
            origins,
            jobs,
            color,
        } => {
            let mut config = RunConfig::new()
                .with_origins(origins)
                .with_marker_color(color)
                .with_jobs(jobs);
            if copy || out.is_some() {
                config = config.copy_to(out.unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIRECTORY)));
            }
            mark(files.into_iter().collect(), config)
        }
        Commands::Scan {
            files,
            all,
            json,
            jobs,
        } => scan(&files.into_iter().collect(), all, json, jobs),
        Commands::Generate {
            files,
            rows,
            out,
            seed,
        } => generate_samples(GeneratorConfig {
            files,
            rows,
            output_directory: out,
            seed,
        }),
    }
}

fn init_tracing(verbose: u8, quiet: u8) {
    let level = match (quiet, verbose) {
        (q, _) if q >= 2 => LevelFilter::OFF,
        (1, _) => LevelFilter::ERROR,
        (_, 0) => LevelFilter::WARN,
        (_, 1) => LevelFilter::INFO,
        (_, 2) => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };

    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    // try_init also routes `log` records from the xlsx crate
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .compact()
        .try_init();
}

fn mark(files: FileSet, config: RunConfig) -> Result<()> {
    if !config.make_copy {
        eprintln!(
            "Warning: overwriting {} file(s) in place, no backup is kept (use --copy to write copies)",
            files.len()
        );
    }
    let destination = config.make_copy.then(|| config.output_directory.clone());

    let bar = ProgressBar::new(files.len() as u64);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
            .context("Invalid progress template")?,
    );
    bar.set_message("indexing");

    tracing::debug!(?config, "starting run on {} file(s)", files.len());
    let (tx, rx) = mpsc::channel();
    let worker = thread::spawn(move || Pipeline::new(config).run(&files, &ChannelProgress::new(tx)));

    for event in rx {
        let percent = event.percent();
        match event {
            ProgressEvent::Indexed {
                distinct,
                duplicates,
            } => {
                bar.println(format!(
                    "Indexed {distinct} distinct value(s), {duplicates} duplicated"
                ));
                bar.set_message("writing");
            }
            ProgressEvent::FileWritten {
                name, completed, ..
            } => {
                bar.set_position(completed as u64);
                bar.set_message(format!("({name}) {:.1}%", percent.unwrap_or(100.0)));
            }
            ProgressEvent::Failed { path, .. } => {
                bar.abandon_with_message(format!("failed on {}", path.display()));
            }
            ProgressEvent::Started { .. } | ProgressEvent::Finished(_) => {}
        }
    }

    let summary = worker
        .join()
        .map_err(|_| anyhow!("Worker thread panicked"))?
        .context("Duplicate marking stopped")?;
    bar.finish_and_clear();

    println!(
        "Marked {} cell(s) holding {} duplicate value(s) across {} file(s)",
        summary.marked_cells, summary.duplicate_values, summary.files
    );
    if summary.origin_cells > 0 {
        println!("Wrote {} origin name(s)", summary.origin_cells);
    }
    if let Some(dir) = destination {
        println!("Saved copies to '{}'", dir.display());
    }

    Ok(())
}

/// One row of `scan --json`
#[derive(Serialize)]
struct ValueReport<'a> {
    value: &'a CellValue,
    count: usize,
    origins: Vec<String>,
}

fn scan(files: &FileSet, all: bool, json: bool, jobs: usize) -> Result<()> {
    let index = Indexer::new(jobs)
        .build(files)
        .context("Failed to index files")?;

    let entries = if all { index.sorted() } else { index.duplicates() };

    let stdout = io::stdout();
    let mut out = stdout.lock();

    if json {
        let reports: Vec<ValueReport> = entries
            .iter()
            .map(|&(value, entry)| ValueReport {
                value,
                count: entry.count,
                origins: entry.distinct_origins(),
            })
            .collect();
        serde_json::to_writer_pretty(&mut out, &reports).context("Failed to write JSON")?;
        writeln!(out).context("Failed to write to stdout")?;
    } else {
        for (value, entry) in &entries {
            let shown = match value {
                CellValue::Empty => "(empty)".to_string(),
                other => other.to_string(),
            };
            writeln!(
                out,
                "{}\t{}\t{}",
                entry.count,
                shown,
                entry.distinct_origins().join(", ")
            )
            .context("Failed to write to stdout")?;
        }
    }

    eprintln!(
        "{} file(s), {} cell(s), {} distinct value(s), {} duplicated",
        files.len(),
        index.total_cells(),
        index.len(),
        index.duplicates().len()
    );
    Ok(())
}

fn generate_samples(config: GeneratorConfig) -> Result<()> {
    let written = generate(&config).with_context(|| {
        format!(
            "Failed to generate workbooks in '{}'",
            config.output_directory.display()
        )
    })?;

    eprintln!(
        "Wrote {} workbook(s) of {} row(s) to '{}'",
        written.len(),
        config.rows,
        config.output_directory.display()
    );
    Ok(())
}
