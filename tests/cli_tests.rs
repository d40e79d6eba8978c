//! Integration tests for the CLI application
//!
//! These tests verify that the CLI commands work correctly with real data files.

use std::io::Write;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::{NamedTempFile, TempDir};

/// Helper to create test data files
struct TestDataFiles {
    pub train_file: NamedTempFile,
    pub test_file: NamedTempFile,
    pub unlabeled_file: NamedTempFile,
}

impl TestDataFiles {
    fn new() -> std::io::Result<Self> {
        // Two classes of two-dimensional groups, four groups each
        let mut train_file = NamedTempFile::with_suffix(".csv")?;
        writeln!(train_file, "group,label,x,y")?;
        for g in 0..8 {
            let label = if g < 4 { 1 } else { -1 };
            let center = if g < 4 { 0.0 } else { 3.0 };
            let shift = 0.05 * g as f64;
            for (dx, dy) in [(-0.2, 0.1), (0.0, -0.15), (0.15, 0.05), (0.25, 0.2)] {
                writeln!(
                    train_file,
                    "g{},{},{},{}",
                    g,
                    label,
                    center + shift + dx,
                    center - shift + dy
                )?;
            }
        }
        train_file.flush()?;

        let mut test_file = NamedTempFile::with_suffix(".csv")?;
        writeln!(test_file, "group,label,x,y")?;
        for (dx, dy) in [(-0.1, 0.0), (0.1, 0.1), (0.2, -0.1)] {
            writeln!(test_file, "near_zero,1,{},{}", 0.1 + dx, 0.05 + dy)?;
            writeln!(test_file, "near_three,-1,{},{}", 3.1 + dx, 2.95 + dy)?;
        }
        test_file.flush()?;

        // Same groups without labels
        let mut unlabeled_file = NamedTempFile::with_suffix(".csv")?;
        for (dx, dy) in [(-0.1, 0.0), (0.1, 0.1), (0.2, -0.1)] {
            writeln!(unlabeled_file, "t1,,{},{}", 0.1 + dx, 0.05 + dy)?;
            writeln!(unlabeled_file, "t2,,{},{}", 3.1 + dx, 2.95 + dy)?;
        }
        unlabeled_file.flush()?;

        Ok(TestDataFiles {
            train_file,
            test_file,
            unlabeled_file,
        })
    }
}

fn run_cli(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_rsdm"))
        .args(args)
        .output()
        .expect("Failed to run CLI")
}

fn path_str(path: &Path) -> &str {
    path.to_str().expect("temp paths are valid UTF-8")
}

/// Train a small model and return its path inside `dir`
fn train_model(data: &TestDataFiles, dir: &TempDir, extra: &[&str]) -> std::path::PathBuf {
    let model_path = dir.path().join("model.json");
    let mut args = vec![
        "train",
        "--data",
        path_str(data.train_file.path()),
        "--output",
        path_str(&model_path),
        "--sigma",
        "0.5,1,2",
        "-C",
        "0.5,4",
        "--folds",
        "4",
    ];
    args.extend_from_slice(extra);

    let output = run_cli(&args);
    assert!(
        output.status.success(),
        "Train command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(model_path.exists(), "Model file was not created");
    model_path
}

#[test]
fn test_cli_train_command() {
    let test_data = TestDataFiles::new().expect("Failed to create test data");
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let model_path = train_model(&test_data, &temp_dir, &[]);

    let saved = std::fs::read_to_string(model_path).expect("Failed to read model");
    assert!(saved.contains("\"train_groups\""));
    assert!(saved.contains("\"cv_score\""));
}

#[test]
fn test_cli_train_with_options() {
    let test_data = TestDataFiles::new().expect("Failed to create test data");
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    train_model(
        &test_data,
        &temp_dir,
        &[
            "--projection",
            "covariance",
            "--scale-sigma",
            "--parallel",
            "--probability",
            "--time-budget",
            "60",
            "--epsilon",
            "0.0001",
            "--verbose",
        ],
    );
}

#[test]
fn test_cli_info_command() {
    let test_data = TestDataFiles::new().expect("Failed to create test data");
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let model_path = train_model(&test_data, &temp_dir, &[]);

    let output = run_cli(&["info", path_str(&model_path)]);
    assert!(
        output.status.success(),
        "Info command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("SDM Model Summary"));
    assert!(stdout.contains("Training Groups: 8"));
    assert!(stdout.contains("Pairwise Models"));
    assert!(stdout.contains("1 vs -1"));
}

#[test]
fn test_cli_predict_command() {
    let test_data = TestDataFiles::new().expect("Failed to create test data");
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let model_path = train_model(&test_data, &temp_dir, &[]);

    let output = run_cli(&[
        "predict",
        "--model",
        path_str(&model_path),
        "--data",
        path_str(test_data.unlabeled_file.path()),
    ]);
    assert!(
        output.status.success(),
        "Predict command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("# Predictions for 2 groups"));
    let rows: Vec<Vec<&str>> = stdout
        .lines()
        .filter(|line| !line.starts_with('#'))
        .map(|line| line.split_whitespace().collect())
        .collect();
    assert_eq!(rows.len(), 2);
    assert_eq!(&rows[0][..2], &["t1", "1"]);
    assert_eq!(&rows[1][..2], &["t2", "-1"]);
    // Binary rows carry the decision value and a zero pad
    assert_eq!(rows[0].len(), 4);
}

#[test]
fn test_cli_predict_to_file() {
    let test_data = TestDataFiles::new().expect("Failed to create test data");
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let model_path = train_model(&test_data, &temp_dir, &[]);
    let output_path = temp_dir.path().join("predictions.txt");

    let output = run_cli(&[
        "predict",
        "--model",
        path_str(&model_path),
        "--data",
        path_str(test_data.test_file.path()),
        "--output",
        path_str(&output_path),
    ]);
    assert!(
        output.status.success(),
        "Predict command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let written = std::fs::read_to_string(&output_path).expect("Failed to read predictions");
    assert!(written.contains("near_zero 1 "));
    assert!(written.contains("near_three -1 "));
}

#[test]
fn test_cli_evaluate_command() {
    let test_data = TestDataFiles::new().expect("Failed to create test data");
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let model_path = train_model(&test_data, &temp_dir, &[]);

    let output = run_cli(&[
        "evaluate",
        "--model",
        path_str(&model_path),
        "--data",
        path_str(test_data.test_file.path()),
    ]);
    assert!(
        output.status.success(),
        "Evaluate command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Model Evaluation"));
    assert!(stdout.contains("Groups: 2"));
    assert!(stdout.contains("Accuracy: 100.00%"));
}

#[test]
fn test_cli_evaluate_requires_labels() {
    let test_data = TestDataFiles::new().expect("Failed to create test data");
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let model_path = train_model(&test_data, &temp_dir, &[]);

    let output = run_cli(&[
        "evaluate",
        "--model",
        path_str(&model_path),
        "--data",
        path_str(test_data.unlabeled_file.path()),
    ]);
    assert!(!output.status.success());
}

#[test]
fn test_cli_error_handling() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let model_path = temp_dir.path().join("model.json");

    // Missing data file
    let output = run_cli(&[
        "train",
        "--data",
        "/nonexistent/train.csv",
        "--output",
        path_str(&model_path),
    ]);
    assert!(!output.status.success());
    assert!(!model_path.exists());

    // A single class cannot be trained
    let mut one_class = NamedTempFile::with_suffix(".csv").expect("Failed to create temp file");
    writeln!(one_class, "a,1,0.1\na,1,0.2\nb,1,0.5\nb,1,0.4").expect("Failed to write");
    one_class.flush().expect("Failed to flush");
    let output = run_cli(&[
        "train",
        "--data",
        path_str(one_class.path()),
        "--output",
        path_str(&model_path),
    ]);
    assert!(!output.status.success());

    // Missing model file
    let output = run_cli(&["info", "/nonexistent/model.json"]);
    assert!(!output.status.success());

    // Unknown projection
    let output = run_cli(&[
        "train",
        "--data",
        "train.csv",
        "--output",
        "model.json",
        "--projection",
        "spectral",
    ]);
    assert!(!output.status.success());
}

#[test]
fn test_cli_help() {
    let output = run_cli(&["--help"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("train"));
    assert!(stdout.contains("predict"));
    assert!(stdout.contains("evaluate"));

    let output = run_cli(&["train", "--help"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("--sigma"));
    assert!(stdout.contains("--projection"));
}
