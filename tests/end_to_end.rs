pub mod test_utils;

use glider_tools::extraction::{extract_deployment, ExtractOptions};
use glider_tools::transects::{combine_all, survey_transects};
use std::fs;
use std::path::Path;
use tempdir::TempDir;
use test_utils::*;

/// One morning's run up the eastern side of the FZ box: surfacing at the SE
/// corner, mid-leg, then the NE corner.
fn write_leg_logs(logs_dir: &Path) {
    let text = log_text("cp_376", &[("3950.000", "-7022.500")]);
    write_file(&logs_dir.join("cp_376_network_20220815T000000.log"), &text);
    let text = log_text("cp_376", &[("3957.500", "-7022.500")]);
    write_file(&logs_dir.join("cp_376_network_20220815T060000.log"), &text);
    let text = log_text("cp_376", &[("4004.980", "-7022.500")]);
    write_file(&logs_dir.join("cp_376_network_20220815T120000.log"), &text);
}

#[test]
fn logs_to_extraction_to_transects() {
    let tmp = TempDir::new("end_to_end").unwrap();
    let logs_dir = tmp.path().join("logs");
    let output_root = tmp.path().join("output");
    write_leg_logs(&logs_dir);
    fs::create_dir_all(&output_root).unwrap();

    let summary = extract_deployment(&ExtractOptions {
        glider_name: GLIDER,
        deployment: 13,
        logs_dir: &logs_dir,
        deployments_csv: Path::new("./tests/data/CP05MOAS-GL376_Deploy.csv"),
        science_csv: Some(Path::new("./tests/data/science_times.csv")),
        output_root: &output_root,
    })
    .unwrap();
    assert_eq!(summary.rows_written, 3);

    // the distances computed off the real fixes drive the arrival flags
    let (headers, rows) = read_csv(&summary.csv_path);
    assert_eq!(column(&headers, &rows, "AT_SE_WPT"), vec!["1", "0", "0"]);
    assert_eq!(column(&headers, &rows, "AT_NE_WPT"), vec!["0", "0", "1"]);
    assert_eq!(column(&headers, &rows, "Science_on"), vec!["1", "1", "1"]);

    let survey_path = survey_transects(&output_root).unwrap();
    let (_, rows) = read_csv(&survey_path);
    assert_eq!(rows.len(), 1);
    assert_eq!(
        rows[0],
        vec![
            "376",
            "13",
            "FZ",
            "1",
            "1660521600",
            "1660564800",
            "0.5",
            "AT_SE_WPT:AT_NE_WPT",
        ]
    );

    let combined = combine_all(&output_root).unwrap();
    assert_eq!(combined.len(), 1);
    assert_eq!(
        combined[0],
        output_root.join("FZ_Gliders").join("FZ_Gliders_Combined.csv")
    );
    let (headers, rows) = read_csv(&combined[0]);
    assert_eq!(headers.len(), 20);
    assert_eq!(rows.len(), 3);
}
