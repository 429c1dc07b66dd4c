// Integration tests for the `eancheck` binary: run, compare, labels, extract, map.
// Run with: cargo test -p eancheck-cli --test cli_tests -- --nocapture

use std::path::Path;
use std::process::{Command, Output};

use rust_xlsxwriter::{DataValidation, Workbook};
use tempfile::{tempdir, TempDir};

fn eancheck() -> Command {
    Command::new(env!("CARGO_BIN_EXE_eancheck"))
}

fn run_in(dir: &Path, args: &[&str]) -> Output {
    eancheck()
        .current_dir(dir)
        .args(args)
        .output()
        .expect("spawn eancheck")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

/// Main workbook: EANs in B, status in F with a list validation.
fn write_orders(path: &Path, eans: &[&str], labels: &[&str]) {
    let mut wb = Workbook::new();
    let ws = wb.add_worksheet();
    ws.set_name("Orders").unwrap();
    ws.write_string(0, 0, "Item").unwrap();
    ws.write_string(0, 1, "EAN").unwrap();
    ws.write_string(0, 5, "Status").unwrap();
    for (i, ean) in eans.iter().enumerate() {
        ws.write_string(i as u32 + 1, 0, format!("item {i}")).unwrap();
        ws.write_string(i as u32 + 1, 1, *ean).unwrap();
    }
    let dv = DataValidation::new().allow_list_strings(labels).unwrap();
    ws.add_data_validation(1, 5, 200, 5, &dv).unwrap();
    wb.save(path).unwrap();
}

/// Vendor scenario: row 2 is received from Vendor A, row 3 is missing.
fn vendor_fixture() -> TempDir {
    let dir = tempdir().unwrap();
    write_orders(
        &dir.path().join("orders.xlsx"),
        &["12345678901234", "99999999999999"],
        &["Received - Vendor A", "Received - Vendor B", "Missing"],
    );
    std::fs::write(dir.path().join("Vendor A.csv"), "ean\n1234-5678-901234\n").unwrap();
    std::fs::write(dir.path().join("Vendor B.txt"), "nothing shipped this week\n").unwrap();
    write_config(dir.path(), "");
    dir
}

fn write_config(dir: &Path, labels_section: &str) {
    let config = format!(
        r#"
[main]
file = "orders.xlsx"
sheet = "Orders"
ean_column = "B"
status_column = "F"

[[references]]
file = "Vendor A.csv"

[[references]]
file = "Vendor B.txt"

{labels_section}
"#
    );
    std::fs::write(dir.join("orders.toml"), config).unwrap();
}

// ---------------------------------------------------------------------------
// run
// ---------------------------------------------------------------------------

#[test]
fn run_json_assigns_labels() {
    let dir = vendor_fixture();
    let output = run_in(dir.path(), &["run", "orders.toml", "--json"]);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let result: serde_json::Value = serde_json::from_str(&stdout(&output)).expect("valid JSON");

    assert_eq!(result["assignment"]["2"]["label"], "Received - Vendor A");
    assert_eq!(result["assignment"]["2"]["source"], "Vendor A");
    assert_eq!(result["assignment"]["3"]["label"], "Missing");
    assert_eq!(result["fallback_label"], "Missing");
    assert_eq!(result["summary"]["matched_rows"], 1);
    assert_eq!(result["summary"]["fallback_rows"], 1);

    // Empty reference is reported, not fatal
    assert!(stderr(&output).contains("has no valid identifiers"));
}

#[test]
fn run_writes_assignment_csv() {
    let dir = vendor_fixture();
    let output = run_in(dir.path(), &["run", "orders.toml", "--output", "out.csv"]);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let csv = std::fs::read_to_string(dir.path().join("out.csv")).unwrap();
    assert_eq!(
        csv,
        "row,identifier,label,source\n\
         2,12345678901234,Received - Vendor A,Vendor A\n\
         3,99999999999999,Missing,\n"
    );
}

#[test]
fn run_writes_annotated_workbook() {
    let dir = vendor_fixture();
    let output = run_in(dir.path(), &["run", "orders.toml", "-o", "labelled.xlsx"]);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(dir.path().join("labelled.xlsx").exists());
}

#[test]
fn strict_label_count_fails_with_config_code() {
    let dir = vendor_fixture();
    write_config(dir.path(), "[labels]\nexpected_count = 2\n");

    let lenient = run_in(dir.path(), &["run", "orders.toml"]);
    assert!(lenient.status.success());
    assert!(stderr(&lenient).contains("expected 2 candidate label(s), found 3"));

    let strict = run_in(dir.path(), &["run", "orders.toml", "--strict-labels"]);
    assert_eq!(strict.status.code(), Some(3));
    assert!(stderr(&strict).contains("error: expected 2 candidate label(s), found 3"));
}

#[test]
fn unresolved_mapping_exit_code() {
    let dir = tempdir().unwrap();
    write_orders(
        &dir.path().join("orders.xlsx"),
        &["12345678901234"],
        &["Vendor A", "Archive", "Backlog"],
    );
    std::fs::write(dir.path().join("Vendor A.csv"), "12345678901234\n").unwrap();
    std::fs::write(dir.path().join("Vendor B.txt"), "4012345678901\n").unwrap();
    write_config(dir.path(), "");

    let output = run_in(dir.path(), &["run", "orders.toml"]);
    assert_eq!(output.status.code(), Some(4));
    assert!(stderr(&output).contains("Vendor B"));
    assert!(stderr(&output).contains("hint:"));
}

#[test]
fn configured_fallback_absorbs_unmapped_sources() {
    let dir = tempdir().unwrap();
    write_orders(
        &dir.path().join("orders.xlsx"),
        &["12345678901234", "4012345678901"],
        &["Vendor A", "Archive", "Backlog"],
    );
    std::fs::write(dir.path().join("Vendor A.csv"), "12345678901234\n").unwrap();
    std::fs::write(dir.path().join("Vendor B.txt"), "4012345678901\n").unwrap();
    write_config(dir.path(), "[labels]\nfallback = \"Backlog\"\n");

    let output = run_in(dir.path(), &["run", "orders.toml", "--json"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let result: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(result["assignment"]["2"]["label"], "Vendor A");
    assert_eq!(result["assignment"]["3"]["label"], "Backlog");
    assert_eq!(result["mapping"]["unmapped"][0], "Vendor B");
}

#[test]
fn no_identifiers_exit_code() {
    let dir = tempdir().unwrap();
    write_orders(&dir.path().join("orders.xlsx"), &["n/a", "123"], &["Vendor A", "Missing"]);
    std::fs::write(dir.path().join("Vendor A.csv"), "12345678\n").unwrap();
    std::fs::write(dir.path().join("Vendor B.txt"), "\n").unwrap();
    write_config(dir.path(), "");

    let output = run_in(dir.path(), &["run", "orders.toml"]);
    assert_eq!(output.status.code(), Some(5));
}

#[test]
fn bad_config_and_missing_files() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("broken.toml"), "[main]\nfile = \"x.xlsx\"\n").unwrap();
    let output = run_in(dir.path(), &["run", "broken.toml"]);
    assert_eq!(output.status.code(), Some(3));

    let output = run_in(dir.path(), &["run", "absent.toml"]);
    assert_eq!(output.status.code(), Some(7));

    write_config(dir.path(), "");
    let output = run_in(dir.path(), &["run", "orders.toml"]);
    assert_eq!(output.status.code(), Some(7), "stderr: {}", stderr(&output));
}

// ---------------------------------------------------------------------------
// compare
// ---------------------------------------------------------------------------

#[test]
fn compare_identical_and_divergent() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("left.csv"), "ean,status\n1,Received\n2,Missing\n").unwrap();
    std::fs::write(dir.path().join("same.csv"), "ean,status\n1, Received \n2,Missing\n").unwrap();
    std::fs::write(dir.path().join("right.csv"), "ean,status\n1,Missing\n").unwrap();

    let same = run_in(dir.path(), &["compare", "left.csv", "same.csv", "--column", "B"]);
    assert!(same.status.success(), "stderr: {}", stderr(&same));
    assert_eq!(stdout(&same), "");

    let diff = run_in(
        dir.path(),
        &["compare", "left.csv", "right.csv", "--column", "B", "--output", "diff.csv"],
    );
    assert_eq!(diff.status.code(), Some(1));
    assert_eq!(
        stdout(&diff),
        "2\tmismatch\tReceived\tMissing\n3\tmissing_in_side2\tMissing\t-\n"
    );
    let written = std::fs::read_to_string(dir.path().join("diff.csv")).unwrap();
    assert!(written.starts_with("row,kind,left,right\n"));
}

#[test]
fn compare_json_counts() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("left.csv"), "ean,status\n1,A\n").unwrap();
    std::fs::write(dir.path().join("right.csv"), "ean,status\n1,A\n2,B\n").unwrap();

    let output = run_in(dir.path(), &["compare", "left.csv", "right.csv", "-c", "2", "--json"]);
    assert_eq!(output.status.code(), Some(1));
    let result: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(result["rows_compared"], 2);
    assert_eq!(result["matching"], 1);
    assert_eq!(result["missing_in_side1"], 1);
}

#[test]
fn compare_rejects_bad_column() {
    let dir = tempdir().unwrap();
    let output = run_in(dir.path(), &["compare", "a.csv", "b.csv", "--column", "B2"]);
    assert_eq!(output.status.code(), Some(2));
}

// ---------------------------------------------------------------------------
// labels / extract / map
// ---------------------------------------------------------------------------

#[test]
fn labels_from_list_validation() {
    let dir = vendor_fixture();
    let output = run_in(dir.path(), &["labels", "orders.xlsx", "--column", "F"]);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(stdout(&output), "Received - Vendor A\nReceived - Vendor B\nMissing\n");
    assert!(stderr(&output).contains("list validation"));
}

#[test]
fn labels_fall_back_to_column_values() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("orders.csv"), "ean,status\n1,Missing\n2,Received\n3,Missing\n").unwrap();

    let output = run_in(dir.path(), &["labels", "orders.csv", "--column", "B"]);
    assert!(output.status.success());
    assert_eq!(stdout(&output), "Missing\nReceived\n");

    let empty = run_in(dir.path(), &["labels", "orders.csv", "--column", "D"]);
    assert_eq!(empty.status.code(), Some(6));
}

#[test]
fn extract_from_text_document() {
    let dir = tempdir().unwrap();
    std::fs::write(
        dir.path().join("brief.txt"),
        "Delivery KING01042\nEAN 4012345678901, alt 0012-3456-7890\n",
    )
    .unwrap();

    let output = run_in(dir.path(), &["extract", "brief.txt", "--json"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let found: Vec<serde_json::Value> = serde_json::from_str(&stdout(&output)).unwrap();
    let eans: Vec<&str> = found.iter().map(|v| v["ean"].as_str().unwrap()).collect();
    assert!(eans.contains(&"4012345678901"));
    assert!(eans.contains(&"001234567890"));
    assert!(!eans.contains(&"KING01042"));

    let with_codes = run_in(dir.path(), &["extract", "brief.txt", "--allow-non-numeric", "--min-digits", "6"]);
    assert!(stdout(&with_codes).contains("KING01042\t"));

    let bad_bounds = run_in(dir.path(), &["extract", "brief.txt", "--min-digits", "9", "--max-digits", "8"]);
    assert_eq!(bad_bounds.status.code(), Some(2));
}

#[test]
fn map_dry_run_keeps_labels_exclusive() {
    let output = eancheck()
        .args([
            "map",
            "--source", "KING01042 Brief",
            "--source", "KING01058 Brief",
            "--label", "Recieved - KING01042",
            "--label", "Recieved - KING01058",
            "--label", "Missing",
        ])
        .output()
        .unwrap();

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(
        stdout(&output),
        "KING01042 Brief\tRecieved - KING01042\ttoken\nKING01058 Brief\tRecieved - KING01058\ttoken\n"
    );
    assert!(stderr(&output).contains("fallback label: Missing"));
}

#[test]
fn map_never_hands_out_the_no_match_label() {
    let output = eancheck()
        .args([
            "map",
            "--source", "ACME2024 missing items",
            "--label", "Missing",
            "--label", "Received - ACME2024",
        ])
        .output()
        .unwrap();

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(stdout(&output), "ACME2024 missing items\tReceived - ACME2024\ttoken\n");
    assert!(stderr(&output).contains("fallback label: Missing"));
}
