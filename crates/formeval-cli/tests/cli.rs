use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use serde_json::Value;

const EXPECTED: &str = r#"{"title": "Mr", "surname": "Smith", "dob": "1/1/1980", "town": "Leeds"}"#;
const ACTUAL: &str = r#"{"title": "Mr", "surname": "Smith", "dob": "01/01/1980"}"#;

/// Run the binary inside `dir` with user config and env overrides out of reach.
fn formeval(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_formeval"))
        .args(args)
        .current_dir(dir)
        .env("HOME", dir)
        .env("XDG_CONFIG_HOME", dir.join(".config"))
        .env_remove("FORMEVAL_FORMAT")
        .env_remove("FORMEVAL_WORKERS")
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

fn read_json(path: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

#[test]
fn evaluate_writes_report_to_output_path() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("form.expected.json"), EXPECTED).unwrap();
    fs::write(dir.path().join("form.actual.json"), ACTUAL).unwrap();
    let out = dir.path().join("nested").join("report.json");

    let output = formeval(
        dir.path(),
        &[
            "evaluate",
            "--expected",
            "form.expected.json",
            "--actual",
            "form.actual.json",
            "-o",
            out.to_str().unwrap(),
            "--no-color",
        ],
    );
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(output.stdout.is_empty());

    let report = read_json(&out);
    let summary = &report["summary_metrics"];
    assert_eq!(summary["exact_matches"], 2);
    assert_eq!(summary["partial_matches"], 1);
    assert_eq!(summary["missing_fields"], 1);
    assert_eq!(summary["total_accuracy"], 75.0);
    assert_eq!(report["detailed_results"]["town"]["actual"], "MISSING");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Total accuracy:  75.00%"));
    assert!(!stderr.contains('\x1b'));
}

#[test]
fn evaluate_prints_report_to_stdout() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("e.json"), EXPECTED).unwrap();
    fs::write(dir.path().join("a.json"), ACTUAL).unwrap();

    let output = formeval(
        dir.path(),
        &["evaluate", "--expected", "e.json", "--actual", "a.json"],
    );
    assert!(output.status.success());
    let report: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["summary_metrics"]["exact_matches"], 2);
}

#[test]
fn fail_under_rejects_low_accuracy() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("e.json"), EXPECTED).unwrap();
    fs::write(dir.path().join("a.json"), ACTUAL).unwrap();
    let with_threshold = |pct: &'static str| {
        vec!["evaluate", "--expected", "e.json", "--actual", "a.json", "--fail-under", pct]
    };

    let output = formeval(dir.path(), &with_threshold("100"));
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("below the required 100.00%"));

    let output = formeval(dir.path(), &with_threshold("75"));
    assert!(output.status.success());
}

#[test]
fn evaluate_missing_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("e.json"), EXPECTED).unwrap();

    let output = formeval(
        dir.path(),
        &["evaluate", "--expected", "e.json", "--actual", "nope.json"],
    );
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("nope.json"));
}

#[test]
fn batch_writes_per_document_reports_and_summary() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("forms");
    fs::create_dir(&input).unwrap();
    for stem in ["alpha", "beta"] {
        fs::write(input.join(format!("{stem}.expected.json")), EXPECTED).unwrap();
        fs::write(input.join(format!("{stem}.actual.json")), ACTUAL).unwrap();
    }
    let reports = dir.path().join("reports");

    let output = formeval(
        dir.path(),
        &[
            "batch",
            "forms",
            "--out-dir",
            reports.to_str().unwrap(),
            "--workers",
            "2",
            "--no-color",
        ],
    );
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    for stem in ["alpha", "beta"] {
        let report = read_json(&reports.join(format!("{stem}.evaluation.json")));
        assert_eq!(report["summary_metrics"]["total_accuracy"], 75.0);
    }
    assert!(reports.join("summary.json").is_file());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Overall (2 evaluated, 0 failed)"));
}
