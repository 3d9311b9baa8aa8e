//! Tests for the sample workbook generator.

use dupmark::{generate, FileSet, GeneratorConfig, NoProgress, Pipeline, RunConfig};
use dupmark_core::CellValue;
use pretty_assertions::assert_eq;

use crate::read;

#[test]
fn test_generates_numbered_files() {
    let dir = tempfile::tempdir().unwrap();
    let config = GeneratorConfig {
        files: 3,
        rows: 20,
        output_directory: dir.path().join("months"),
        seed: Some(42),
    };

    let written = generate(&config).unwrap();

    let names: Vec<String> = written
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["1.xlsx", "2.xlsx", "3.xlsx"]);

    for path in &written {
        let doc = read(path);
        assert_eq!(doc.column().len(), 20);
        for value in doc.column().values() {
            match value {
                CellValue::Text(s) => {
                    assert_eq!(s.len(), 11);
                    assert!(s.starts_with("09"), "{s}");
                }
                other => panic!("expected text, got {other:?}"),
            }
        }
    }
}

#[test]
fn test_seed_makes_output_reproducible() {
    let dir = tempfile::tempdir().unwrap();
    let config = |sub: &str| GeneratorConfig {
        files: 2,
        rows: 10,
        output_directory: dir.path().join(sub),
        seed: Some(9),
    };

    let first = generate(&config("a")).unwrap();
    let second = generate(&config("b")).unwrap();

    for (a, b) in first.iter().zip(&second) {
        assert_eq!(read(a).column(), read(b).column());
    }
}

#[test]
fn test_generated_files_can_be_marked() {
    let dir = tempfile::tempdir().unwrap();
    let written = generate(&GeneratorConfig {
        files: 2,
        rows: 30,
        output_directory: dir.path().join("months"),
        seed: Some(1),
    })
    .unwrap();

    let files: FileSet = written.into_iter().collect();
    let summary = Pipeline::new(RunConfig::new().copy_to(dir.path().join("data")))
        .run(&files, &NoProgress)
        .unwrap();

    assert_eq!(summary.files, 2);
    assert_eq!(summary.outputs.len(), 2);
}
