use std::process::Command;

fn temp_path(label: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!(
        "citynav-cli-{label}-{}",
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos()
    ))
}

#[test]
fn cli_list_policies_writes_output() {
    let exe = env!("CARGO_BIN_EXE_citynav-tester");
    let output_path = temp_path("list");
    let status = Command::new(exe)
        .args(["--list-policies", "--output"])
        .arg(&output_path)
        .status()
        .expect("run cli");
    assert!(status.success());
    let content = std::fs::read_to_string(output_path).expect("read output");
    assert!(content.contains("Available policies"));
    assert!(content.contains("bee-line"));
}

#[test]
fn cli_runs_level_one_with_json_report() {
    let exe = env!("CARGO_BIN_EXE_citynav-tester");
    let output_path = temp_path("run");
    let status = Command::new(exe)
        .args(["--levels", "1", "--policies", "all", "--report", "json", "--output"])
        .arg(&output_path)
        .status()
        .expect("run cli");
    assert!(status.success());
    let content = std::fs::read_to_string(output_path).expect("read output");
    assert!(content.contains("\"policy\": \"follow-route\""));
    assert!(content.contains("\"passed\": true"));
}

#[test]
fn cli_rejects_unknown_policy() {
    let exe = env!("CARGO_BIN_EXE_citynav-tester");
    let output = Command::new(exe)
        .args(["--policies", "moonwalk"])
        .output()
        .expect("run cli");
    assert!(!output.status.success());
}

#[test]
fn cli_rejects_out_of_range_level() {
    let exe = env!("CARGO_BIN_EXE_citynav-tester");
    let output = Command::new(exe)
        .args(["--levels", "42"])
        .output()
        .expect("run cli");
    assert!(!output.status.success());
}
