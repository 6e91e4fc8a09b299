//! CLI integration tests

use std::io::Write;
use std::path::Path;
use std::process::{Command, Output};

const LOG: &str = concat!(
    "I1012 12:00:00 capture started\n",
    r#"{us-east/prod} output: "NodeName: n1, Memory: 7Gi / 8Gi = 87%, CPU: 3950m / 4 = 98%\nNodeName: n2, Memory: 1Gi / 8Gi = 12%, CPU: 500m / 4 = 12%""#,
    "\n",
    r#"{eu-west/dev} output: "NodeName: d1, Memory: 100Mi / 200Mi = 50%, CPU: 100m / 200m = 50%""#,
    "\n",
);

fn allocatable(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_allocatable"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute command")
}

fn write_log(dir: &Path) -> String {
    let path = dir.join("foreachmaster.log");
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(LOG.as_bytes()).unwrap();
    path.display().to_string()
}

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let output = allocatable(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(stdout.contains("Node Allocatable Analyzer"), "Should show app name");
    assert!(stdout.contains("analyze"), "Should show analyze command");
    assert!(stdout.contains("classify"), "Should show classify command");
    assert!(stdout.contains("sweep"), "Should show sweep command");
    assert!(stdout.contains("reserve"), "Should show reserve command");
    assert!(stdout.contains("--policy"), "Should show policy option");
}

/// Test that the CLI shows version
#[test]
fn test_cli_version() {
    let output = allocatable(&["--version"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout.contains("allocatable"), "Should show binary name");
}

/// Test sweep subcommand help
#[test]
fn test_sweep_help() {
    let output = allocatable(&["sweep", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Sweep help should succeed");
    assert!(stdout.contains("--axis"), "Should show axis option");
    assert!(stdout.contains("--output-dir"), "Should show output-dir option");
    assert!(stdout.contains("--parallel"), "Should show parallel option");
}

/// Test analyze writes canonical CSV rows
#[test]
fn test_analyze_csv() {
    let dir = tempfile::tempdir().unwrap();
    let log = write_log(dir.path());

    let output = allocatable(&["--format", "csv", "analyze", "--path", &log]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Analyze should succeed");
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 3, "Header plus one row per cluster");
    assert!(lines[0].starts_with("Nodes,CPU Capacity,Memory Capacity"));
    assert!(lines[1].starts_with("2,8000,17179869184,160,"));
    assert!(lines[1].ends_with(",us-east/prod"));
}

/// Test the bounded-only filter drops clusters whose overage is zero
#[test]
fn test_analyze_bounded_only() {
    let dir = tempfile::tempdir().unwrap();
    let log = write_log(dir.path());

    let output = allocatable(&["--format", "csv", "analyze", "--path", &log]);
    assert!(output.status.success(), "Analyze should succeed");
    assert_eq!(String::from_utf8_lossy(&output.stdout).lines().count(), 3);

    // neither cluster exceeds its allocatable, so no overage sits inside the reservation
    let output = allocatable(&["--format", "csv", "analyze", "--path", &log, "--bounded-only"]);
    assert!(output.status.success(), "Filtered analyze should succeed");
    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 1, "Only the header should remain");
    assert!(lines[0].starts_with("Nodes,"));
}

/// Test analyze JSON output and the CSV file option
#[test]
fn test_analyze_json_with_output_file() {
    let dir = tempfile::tempdir().unwrap();
    let log = write_log(dir.path());
    let csv_path = dir.path().join("specificClusterStats.csv");

    let output = allocatable(&[
        "--format",
        "json",
        "analyze",
        "--path",
        &log,
        "--output",
        csv_path.to_str().unwrap(),
    ]);
    assert!(output.status.success(), "Analyze should succeed");

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["diagnostics"]["chunks_parsed"], 2);
    assert_eq!(json["diagnostics"]["chunks_skipped"], 1);
    assert_eq!(json["clusters"][0]["memory"]["max_percent"], 87);
    assert_eq!(json["reservation_policy"], "marginal");

    let written = std::fs::read_to_string(&csv_path).unwrap();
    assert_eq!(written.lines().count(), 3);
}

/// Test classify labels clusters against thresholds
#[test]
fn test_classify_json() {
    let dir = tempfile::tempdir().unwrap();
    let log = write_log(dir.path());

    let output = allocatable(&[
        "--format",
        "json",
        "classify",
        "--path",
        &log,
        "--memory-threshold",
        "60",
        "--cpu-threshold",
        "60",
        "--nodes",
    ]);
    assert!(output.status.success(), "Classify should succeed");

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    // prod: means 50% / 55%, maxima 87% / 98% -> unknown; dev: all 50% -> unaffected
    assert_eq!(json["clusters"][0]["class"], "unknown");
    assert_eq!(json["clusters"][1]["class"], "unaffected");
    assert_eq!(json["counts"]["nodes_affected"], 1);
    assert_eq!(json["counts"]["nodes_unaffected"], 2);
    assert_eq!(json["nodes"][0]["name"], "n1");
    assert_eq!(json["nodes"][0]["class"], "affected");
}

/// Test classify rejects out of range thresholds
#[test]
fn test_classify_invalid_threshold() {
    let dir = tempfile::tempdir().unwrap();
    let log = write_log(dir.path());

    let output = allocatable(&["classify", "--path", &log, "--cpu-threshold", "100"]);
    assert!(!output.status.success(), "Threshold of 100 should be rejected");
}

/// Test sweep writes the four distribution tables
#[test]
fn test_sweep_writes_tables() {
    let dir = tempfile::tempdir().unwrap();
    let log = write_log(dir.path());
    let out_dir = dir.path().join("out");

    let output = allocatable(&[
        "sweep",
        "--path",
        &log,
        "--output-dir",
        out_dir.to_str().unwrap(),
        "--parallel",
    ]);
    assert!(output.status.success(), "Sweep should succeed");

    for name in [
        "clusterStats.csv",
        "clusterNodeStats.csv",
        "nodeStats.csv",
        "clusterSizeStats.csv",
    ] {
        let content = std::fs::read_to_string(out_dir.join(name)).unwrap();
        assert_eq!(content.lines().count(), 101, "{name} should have header plus 100 rows");
    }

    let clusters = std::fs::read_to_string(out_dir.join("clusterStats.csv")).unwrap();
    // cpu threshold 0: both clusters have a positive mean, so both are affected
    assert_eq!(clusters.lines().nth(1), Some("0,0,2,0,0"));
}

/// Test reserve reports amounts under each policy
#[test]
fn test_reserve_policies() {
    let output = allocatable(&["--format", "json", "reserve", "--memory", "8Gi", "--cpu", "3"]);
    assert!(output.status.success(), "Reserve should succeed");
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json[0]["resource"], "memory");
    assert_eq!(json[0]["reserved_amount"], 1_932_735_283u64);
    assert_eq!(json[1]["resource"], "cpu");
    assert_eq!(json[1]["reserved_amount"], 75);

    let output = allocatable(&[
        "--format", "json", "--policy", "step", "reserve", "--memory", "8Gi", "--cpu", "3",
    ]);
    assert!(output.status.success(), "Reserve with step policy should succeed");
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json[0]["reserved_amount"], 2u64 << 30);
    assert_eq!(json[1]["reserved_amount"], 70);
}

/// Test reserve rejects malformed quantities
#[test]
fn test_reserve_bad_quantity() {
    let output = allocatable(&["reserve", "--memory", "8GB", "--cpu", "3"]);
    assert!(!output.status.success(), "Unknown suffix should be rejected");
}

/// Test metrics exposition is written after a run
#[test]
fn test_metrics_out() {
    let dir = tempfile::tempdir().unwrap();
    let log = write_log(dir.path());
    let metrics = dir.path().join("metrics.prom");

    let output = allocatable(&[
        "--format",
        "csv",
        "--metrics-out",
        metrics.to_str().unwrap(),
        "analyze",
        "--path",
        &log,
    ]);
    assert!(output.status.success(), "Analyze should succeed");

    let text = std::fs::read_to_string(&metrics).unwrap();
    assert!(text.contains("allocatable_chunks_parsed_total 2"));
    assert!(text.contains("allocatable_nodes_parsed_total 3"));
}
