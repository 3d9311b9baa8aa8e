//! Tests for full runs: marking, origins, modes and failures.

use std::fs;
use std::sync::{mpsc, Mutex};
use std::thread;

use dupmark::{
    Annotator, ChannelProgress, FileSet, Indexer, NoProgress, Pipeline, ProgressEvent, RunConfig,
    RunError, RunState, RunSummary,
};
use dupmark_core::CellValue;
use dupmark_xlsx::XlsxBuilder;
use pretty_assertions::assert_eq;

use crate::{marked_rows, origins_in_row, read, scenario, snapshot, write_column};

#[test]
fn test_scenario_with_origins() {
    let dir = tempfile::tempdir().unwrap();
    let files = scenario(dir.path());
    let out = dir.path().join("out");

    let summary = Pipeline::new(RunConfig::new().copy_to(&out).with_origins(true))
        .run(&files, &NoProgress)
        .unwrap();

    assert_eq!(
        summary,
        RunSummary {
            files: 2,
            distinct_values: 3,
            duplicate_values: 2,
            marked_cells: 5,
            origin_cells: 10,
            outputs: vec![out.join("A.xlsx"), out.join("B.xlsx")],
        }
    );

    let a = read(&out.join("A.xlsx"));
    assert_eq!(marked_rows(&a), vec![1, 2]);
    assert_eq!(origins_in_row(&a, 0), Vec::<String>::new());
    assert_eq!(origins_in_row(&a, 1), vec!["A.xlsx", "B.xlsx"]);
    assert_eq!(origins_in_row(&a, 2), vec!["A.xlsx", "B.xlsx"]);

    let b = read(&out.join("B.xlsx"));
    assert_eq!(marked_rows(&b), vec![0, 1, 2]);
    for row in 0..3 {
        assert_eq!(origins_in_row(&b, row), vec!["A.xlsx", "B.xlsx"]);
    }

    // Column A values are never altered
    assert_eq!(a.column(), read(&files.paths()[0]).column());
    assert_eq!(b.column(), read(&files.paths()[1]).column());
}

#[test]
fn test_copy_mode_leaves_inputs_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let files = scenario(dir.path());
    let before = snapshot(&files);

    Pipeline::new(RunConfig::new().copy_to(dir.path().join("out")).with_origins(true))
        .run(&files, &NoProgress)
        .unwrap();

    assert_eq!(snapshot(&files), before);
}

#[test]
fn test_repeated_runs_are_byte_identical() {
    let dir = tempfile::tempdir().unwrap();
    let files = scenario(dir.path());
    let out = dir.path().join("out");
    let pipeline = Pipeline::new(RunConfig::new().copy_to(&out).with_origins(true));

    let first = pipeline.run(&files, &NoProgress).unwrap();
    let first_bytes: Vec<Vec<u8>> = first.outputs.iter().map(|p| fs::read(p).unwrap()).collect();

    let second = pipeline.run(&files, &NoProgress).unwrap();
    let second_bytes: Vec<Vec<u8>> = second.outputs.iter().map(|p| fs::read(p).unwrap()).collect();

    assert_eq!(first, second);
    assert!(first_bytes == second_bytes, "outputs differ between runs");
}

#[test]
fn test_without_origins_no_adjacent_cell_changes() {
    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("A.xlsx");
    XlsxBuilder::new()
        .column([7, 8])
        .cell(0, 1, "note")
        .write_file(&a)
        .unwrap();
    let b = write_column(dir.path(), "B.xlsx", &[7]);
    let files: FileSet = [a, b].into_iter().collect();
    let out = dir.path().join("out");

    let summary = Pipeline::new(RunConfig::new().copy_to(&out))
        .run(&files, &NoProgress)
        .unwrap();
    assert_eq!(summary.origin_cells, 0);

    let doc = read(&out.join("A.xlsx"));
    assert_eq!(marked_rows(&doc), vec![0]);
    assert_eq!(doc.value_at(0, 1), CellValue::from("note"));
    assert_eq!(doc.value_at(1, 1), CellValue::Empty);
    assert_eq!(doc.value_at(0, 2), CellValue::Empty);
}

#[test]
fn test_in_place_mode_rewrites_inputs() {
    let dir = tempfile::tempdir().unwrap();
    let files = scenario(dir.path());
    let before = snapshot(&files);

    let summary = Pipeline::new(RunConfig::new()).run(&files, &NoProgress).unwrap();

    assert_eq!(summary.outputs, files.paths().to_vec());
    assert!(snapshot(&files) != before, "inputs were not rewritten");
    assert_eq!(marked_rows(&read(&files.paths()[0])), vec![1, 2]);
    assert_eq!(marked_rows(&read(&files.paths()[1])), vec![0, 1, 2]);
}

#[test]
fn test_corrupt_file_fails_before_any_write() {
    let dir = tempfile::tempdir().unwrap();
    let a = write_column(dir.path(), "A.xlsx", &[1, 1]);
    let broken = dir.path().join("broken.xlsx");
    fs::write(&broken, b"this is not a workbook").unwrap();
    let files: FileSet = [a.clone(), broken.clone()].into_iter().collect();
    let before = snapshot(&files);
    let out = dir.path().join("out");

    let pipeline = Pipeline::new(RunConfig::new().copy_to(&out));
    match pipeline.run(&files, &NoProgress) {
        Err(RunError::Read { path, .. }) => assert_eq!(path, broken),
        other => panic!("expected a read failure, got {other:?}"),
    }
    assert!(!out.exists());
    assert!(matches!(pipeline.state(), RunState::Failed { .. }));

    // In place, the readable file is left alone too
    assert!(Pipeline::new(RunConfig::new()).run(&files, &NoProgress).is_err());
    assert_eq!(snapshot(&files), before);
}

#[test]
fn test_parallel_run_matches_sequential() {
    let dir = tempfile::tempdir().unwrap();
    let inputs = dir.path().join("in");
    fs::create_dir(&inputs).unwrap();
    let files: FileSet = (0..6i64)
        .map(|i| write_column(&inputs, &format!("{i}.xlsx"), &[i, i + 1, 10, i * 2]))
        .collect();

    let run = |jobs: usize, out: &str| {
        let config = RunConfig::new()
            .copy_to(dir.path().join(out))
            .with_origins(true)
            .with_jobs(jobs);
        let summary = Pipeline::new(config).run(&files, &NoProgress).unwrap();
        let bytes: Vec<Vec<u8>> = summary.outputs.iter().map(|p| fs::read(p).unwrap()).collect();
        (summary.marked_cells, summary.origin_cells, bytes)
    };

    let sequential = run(1, "seq");
    let parallel = run(4, "par");
    assert_eq!(sequential.0, parallel.0);
    assert_eq!(sequential.1, parallel.1);
    assert!(sequential.2 == parallel.2, "parallel outputs differ");
}

#[test]
fn test_index_from_other_files_is_a_consistency_failure() {
    let dir = tempfile::tempdir().unwrap();
    let a = write_column(dir.path(), "A.xlsx", &[1]);
    let b = write_column(dir.path(), "B.xlsx", &[2, 3, 3]);

    let index = Indexer::default()
        .build(&[a].into_iter().collect())
        .unwrap();
    let config = RunConfig::new().copy_to(dir.path().join("out"));

    match Annotator::new(&config, &index).annotate_file(&b) {
        Err(RunError::Consistency { path, .. }) => assert_eq!(path, b),
        other => panic!("expected a consistency failure, got {other:?}"),
    }
}

#[test]
fn test_same_base_name_in_copy_mode_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let x = dir.path().join("x");
    let y = dir.path().join("y");
    fs::create_dir(&x).unwrap();
    fs::create_dir(&y).unwrap();
    let files: FileSet = [
        write_column(&x, "jan.xlsx", &[1]),
        write_column(&y, "jan.xlsx", &[1]),
    ]
    .into_iter()
    .collect();

    let result = Pipeline::new(RunConfig::new().copy_to(dir.path().join("out")))
        .run(&files, &NoProgress);

    assert!(matches!(result, Err(RunError::DestinationClash { .. })));
    assert!(!dir.path().join("out").exists());
}

#[test]
fn test_copy_into_the_input_directory_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let files = scenario(dir.path());
    let before = snapshot(&files);

    for out in [dir.path().to_path_buf(), dir.path().join(".")] {
        let pipeline = Pipeline::new(RunConfig::new().copy_to(out).with_origins(true));
        let result = pipeline.run(&files, &NoProgress);

        assert!(matches!(result, Err(RunError::OverwritesInput { .. })));
        assert!(matches!(pipeline.state(), RunState::Failed { .. }));
        assert_eq!(snapshot(&files), before);
    }
}

#[test]
fn test_copy_over_another_input_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");
    fs::create_dir(&out).unwrap();
    let files: FileSet = [
        write_column(&out, "jan.xlsx", &[1, 2]),
        write_column(dir.path(), "feb.xlsx", &[2]),
        write_column(dir.path(), "jan.xlsx", &[1]),
    ]
    .into_iter()
    .collect();
    let before = snapshot(&files);

    let result = Pipeline::new(RunConfig::new().copy_to(&out)).run(&files, &NoProgress);

    assert!(matches!(result, Err(RunError::OverwritesInput { .. })));
    assert_eq!(snapshot(&files), before);
}

#[test]
fn test_progress_events_are_ordered() {
    let dir = tempfile::tempdir().unwrap();
    let files: FileSet = (0..5i64)
        .map(|i| write_column(dir.path(), &format!("{i}.xlsx"), &[i, 100]))
        .collect();

    let events = Mutex::new(Vec::new());
    let sink = |event: ProgressEvent| events.lock().unwrap().push(event);
    let config = RunConfig::new().copy_to(dir.path().join("out")).with_jobs(3);
    let summary = Pipeline::new(config).run(&files, &sink).unwrap();

    let events = events.into_inner().unwrap();
    assert_eq!(events.len(), 8);
    assert_eq!(events[0], ProgressEvent::Started { files: 5 });
    assert_eq!(
        events[1],
        ProgressEvent::Indexed {
            distinct: 6,
            duplicates: 1
        }
    );
    let completed: Vec<usize> = events[2..7]
        .iter()
        .map(|e| match e {
            ProgressEvent::FileWritten { completed, total, .. } => {
                assert_eq!(*total, 5);
                *completed
            }
            other => panic!("unexpected event {other:?}"),
        })
        .collect();
    assert_eq!(completed, vec![1, 2, 3, 4, 5]);
    assert_eq!(events[2..7].last().and_then(ProgressEvent::percent), Some(100.0));
    assert_eq!(events[7], ProgressEvent::Finished(summary));
}

#[test]
fn test_channel_progress_from_worker_thread() {
    let dir = tempfile::tempdir().unwrap();
    let files = scenario(dir.path());
    let out = dir.path().join("out");

    let (tx, rx) = mpsc::channel();
    let worker = thread::spawn(move || {
        Pipeline::new(RunConfig::new().copy_to(out)).run(&files, &ChannelProgress::new(tx))
    });

    let names: Vec<String> = rx
        .iter()
        .filter_map(|event| match event {
            ProgressEvent::FileWritten { name, .. } => Some(name),
            _ => None,
        })
        .collect();

    assert!(worker.join().unwrap().is_ok());
    assert_eq!(names, vec!["A.xlsx", "B.xlsx"]);
}

#[test]
fn test_failure_is_reported_to_progress() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("gone.xlsx");
    let files: FileSet = [missing.clone()].into_iter().collect();

    let events = Mutex::new(Vec::new());
    let sink = |event: ProgressEvent| events.lock().unwrap().push(event);
    assert!(Pipeline::new(RunConfig::new()).run(&files, &sink).is_err());

    match events.into_inner().unwrap().pop() {
        Some(ProgressEvent::Failed { path, message }) => {
            assert_eq!(path, missing);
            assert!(message.contains("gone.xlsx"), "{message}");
        }
        other => panic!("expected a failure event, got {other:?}"),
    }
}
