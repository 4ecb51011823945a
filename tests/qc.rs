mod common;

use assert_cmd::Command;
use predicates::str::contains;

use common::{TestWorkspace, cell, read_csv};

fn write_criteria(workspace: &TestWorkspace) {
    workspace.write(
        "rules.csv",
        "COLUMN NAME,VALID\n\
         WELL_NAME,Non-blank\n\
         OPERATOR,Only empty in CAM_Run_Tracker\n\
         MAX_TEMP,<600\n\
         STATE,State code\n\
         SOURCE,Source\n\
         MUD_TYPE,\"OBM, WBM\"\n\
         Phase_CALC,Matches phase equivalent\n\
         REPORTED_AS,Non-blank if INCIDENT_NUM non-blank\n",
    );
    workspace.write(
        "phases.csv",
        "PHASES,Phase_CALC\nCurve,CUR\nLateral,LAT\n",
    );
}

fn write_merged(workspace: &TestWorkspace) {
    workspace.write(
        "merged.csv",
        "SOURCE,OPERATOR,WELL_NAME,STATE,MAX_TEMP,MUD_TYPE,PHASES,Phase_CALC,INCIDENT_NUM,REPORTED_AS\n\
         Motor_KPI,OXY USA,State 1H,TX,599.9,OBM,Curve,CUR,,\n\
         Motor_KPI,,Blue 2H,ZZ,600,Brine,Curve,LAT,INC-1,\n\
         CAM_Run_Tracker,,Green 3H,LA,12,WBM,Lateral,LAT,,\n",
    );
}

#[test]
fn qc_flags_dirty_rows_and_reports_issues() {
    let workspace = TestWorkspace::new();
    write_criteria(&workspace);
    write_merged(&workspace);
    let output = workspace.path().join("flagged.csv");
    let issues = workspace.path().join("issues.json");

    Command::cargo_bin("runqc")
        .expect("binary exists")
        .args([
            "qc",
            "-i",
            workspace.path().join("merged.csv").to_str().unwrap(),
            "-r",
            workspace.path().join("rules.csv").to_str().unwrap(),
            "-p",
            workspace.path().join("phases.csv").to_str().unwrap(),
            "-o",
            output.to_str().unwrap(),
            "--issues",
            issues.to_str().unwrap(),
        ])
        .assert()
        .success();

    let (headers, rows) = read_csv(&output);
    assert_eq!(headers.last().map(String::as_str), Some("QC_FLAG"));
    assert_eq!(rows.len(), 3);
    assert_eq!(cell(&headers, &rows[0], "QC_FLAG"), "0");
    assert_eq!(cell(&headers, &rows[1], "QC_FLAG"), "1");
    // Blank operator is permitted on CAM Run Tracker rows.
    assert_eq!(cell(&headers, &rows[2], "QC_FLAG"), "0");

    let report: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&issues).expect("issues file"))
            .expect("issues json");
    let entries = report.as_array().expect("issue array");
    // Row 1 violates OPERATOR, MAX_TEMP, STATE, MUD_TYPE, Phase_CALC, and
    // REPORTED_AS.
    assert_eq!(entries.len(), 6);
    assert!(entries.iter().all(|entry| entry["row"] == 1));
    let columns: Vec<&str> = entries
        .iter()
        .map(|entry| entry["column"].as_str().unwrap())
        .collect();
    assert!(columns.contains(&"OPERATOR"));
    assert!(columns.contains(&"Phase_CALC"));
}

#[test]
fn qc_rejects_unrecognized_rule_text_at_load() {
    let workspace = TestWorkspace::new();
    write_merged(&workspace);
    workspace.write(
        "rules.csv",
        "COLUMN NAME,VALID\nWELL_NAME,looks fine to me\n",
    );
    workspace.write("phases.csv", "PHASES,Phase_CALC\nCurve,CUR\n");
    let output = workspace.path().join("flagged.csv");

    Command::cargo_bin("runqc")
        .expect("binary exists")
        .args([
            "qc",
            "-i",
            workspace.path().join("merged.csv").to_str().unwrap(),
            "-r",
            workspace.path().join("rules.csv").to_str().unwrap(),
            "-p",
            workspace.path().join("phases.csv").to_str().unwrap(),
            "-o",
            output.to_str().unwrap(),
        ])
        .assert()
        .failure()
        .stderr(contains("unrecognized rule"));
    assert!(!output.exists(), "no partial output on fatal config errors");
}

#[test]
fn qc_is_idempotent_over_an_already_flagged_table() {
    let workspace = TestWorkspace::new();
    write_criteria(&workspace);
    write_merged(&workspace);
    let first = workspace.path().join("flagged.csv");
    let second = workspace.path().join("flagged_again.csv");

    for (input, output) in [("merged.csv", &first), ("flagged.csv", &second)] {
        Command::cargo_bin("runqc")
            .expect("binary exists")
            .args([
                "qc",
                "-i",
                workspace.path().join(input).to_str().unwrap(),
                "-r",
                workspace.path().join("rules.csv").to_str().unwrap(),
                "-p",
                workspace.path().join("phases.csv").to_str().unwrap(),
                "-o",
                output.to_str().unwrap(),
            ])
            .assert()
            .success();
    }

    let (first_headers, first_rows) = read_csv(&first);
    let (second_headers, second_rows) = read_csv(&second);
    assert_eq!(first_headers, second_headers);
    let flags_first: Vec<&str> = first_rows
        .iter()
        .map(|row| cell(&first_headers, row, "QC_FLAG"))
        .collect();
    let flags_second: Vec<&str> = second_rows
        .iter()
        .map(|row| cell(&second_headers, row, "QC_FLAG"))
        .collect();
    assert_eq!(flags_first, flags_second);
}
