pub mod test_utils;

use assert_float_eq::assert_float_absolute_eq;
use glider_tools::transects::{combine_line, survey_transects};
use glider_tools::waypoints::PatrolLine;
use std::fs;
use std::path::Path;
use tempdir::TempDir;
use test_utils::*;

const FLAG_HEADER: &str = "Datetime,Science_on,AT_SE_WPT,AT_NE_WPT,AT_NW_WPT,AT_SW_WPT";

/// One extraction CSV reduced to the columns the survey reads. Rows are
/// hourly, `flags` holds `(se, ne, nw, sw)` per row.
fn write_flag_csv(path: &Path, science: &[u8], flags: &[(u8, u8, u8, u8)]) {
    let mut text = format!("{FLAG_HEADER}\n");
    for (i, (se, ne, nw, sw)) in flags.iter().enumerate() {
        text.push_str(&format!(
            "{},{},{},{},{},{}\n",
            i as i64 * 3600,
            science[i],
            se,
            ne,
            nw,
            sw
        ));
    }
    write_file(path, &text);
}

/// A lap of the FZ box: SE at t0, NE at t2, NW at t4, SW at t6, SE at t8.
fn write_fz_lap(dir: &Path) {
    write_flag_csv(
        &dir.join("CP05MOAS-GL376_D00013_ds_logfile_extractions.csv"),
        &[1; 9],
        &[
            (1, 0, 0, 0),
            (0, 0, 0, 0),
            (0, 1, 0, 0),
            (0, 0, 0, 0),
            (0, 0, 1, 0),
            (0, 0, 0, 0),
            (0, 0, 0, 1),
            (0, 0, 0, 0),
            (1, 0, 0, 0),
        ],
    );
}

#[test]
fn surveys_one_lap_of_the_box() {
    let tmp = TempDir::new("transects").unwrap();
    let fz_dir = tmp.path().join("FZ_Gliders");
    write_fz_lap(&fz_dir);
    // corner visits without science never open a run
    write_flag_csv(
        &fz_dir.join("CP05MOAS-GL564_D00002_ds_logfile_extractions.csv"),
        &[0; 3],
        &[(1, 0, 0, 0), (0, 0, 0, 0), (0, 1, 0, 0)],
    );
    // stale output from an earlier run must not be read back in
    write_file(
        &fz_dir.join("FZ_Gliders_Combined.csv"),
        "not,a,flag,table\n1,2,3,4\n",
    );

    let csv_path = survey_transects(tmp.path()).unwrap();
    assert_eq!(csv_path, tmp.path().join("All_CGSN_Transects.csv"));
    let raw = fs::read(&csv_path).unwrap();
    assert_eq!(&raw[..3], b"\xef\xbb\xbf");

    let (headers, rows) = read_csv(&csv_path);
    assert_eq!(
        headers,
        vec![
            "Glider",
            "Deployment",
            "Line",
            "Transect",
            "Transect_Start",
            "Transect_End",
            "Transect_Total_Time",
            "Path",
        ]
    );
    assert_eq!(rows.len(), 5);
    for row in &rows {
        assert_eq!(row[0], "376");
        assert_eq!(row[1], "13");
        assert_eq!(row[2], "FZ");
        assert_eq!(row[3], "1");
    }

    // legs come out in patrol order, each completed once
    assert_eq!(&rows[0][4..6], &["21600", "28800"]);
    assert_eq!(rows[0][7], "AT_SW_WPT:AT_SE_WPT");
    assert_eq!(&rows[1][4..6], &["0", "7200"]);
    assert_eq!(rows[1][7], "AT_SE_WPT:AT_NE_WPT");
    assert_eq!(&rows[2][4..6], &["7200", "14400"]);
    assert_eq!(rows[2][7], "AT_NE_WPT:AT_NW_WPT");
    assert_eq!(&rows[3][4..6], &["14400", "21600"]);
    assert_eq!(rows[3][7], "AT_NW_WPT:AT_SW_WPT");
    // the station-keeping self-leg spans the whole lap
    assert_eq!(&rows[4][4..6], &["0", "28800"]);
    assert_eq!(rows[4][7], "AT_SE_WPT:AT_SE_WPT");

    let lap: f64 = rows[4][6].parse().unwrap();
    assert_float_absolute_eq!(lap, 8.0 / 24.0, 1e-12);
    let leg: f64 = rows[1][6].parse().unwrap();
    assert_float_absolute_eq!(leg, 2.0 / 24.0, 1e-12);
}

#[test]
fn survey_of_an_empty_root_writes_only_the_header() {
    let tmp = TempDir::new("transects_empty").unwrap();
    let csv_path = survey_transects(tmp.path()).unwrap();
    let (headers, rows) = read_csv(&csv_path);
    assert_eq!(headers.len(), 8);
    assert!(rows.is_empty());
}

#[test]
fn combines_a_line_and_stays_idempotent() {
    let tmp = TempDir::new("transects_combine").unwrap();
    let fz_dir = tmp.path().join("FZ_Gliders");
    write_fz_lap(&fz_dir);
    write_flag_csv(
        &fz_dir.join("CP05MOAS-GL564_D00002_ds_logfile_extractions.csv"),
        &[0; 3],
        &[(1, 0, 0, 0), (0, 0, 0, 0), (0, 1, 0, 0)],
    );

    let combined = combine_line(tmp.path(), PatrolLine::Fz).unwrap();
    assert_eq!(combined, fz_dir.join("FZ_Gliders_Combined.csv"));
    let raw = fs::read(&combined).unwrap();
    assert_eq!(&raw[..3], b"\xef\xbb\xbf");
    let (headers, rows) = read_csv(&combined);
    assert_eq!(headers, FLAG_HEADER.split(',').collect::<Vec<_>>());
    assert_eq!(rows.len(), 12);
    // the files stack in name order
    assert_eq!(rows[0][0], "0");
    assert_eq!(rows[9][0], "0");

    // a second pass must not fold its own output back in
    let combined = combine_line(tmp.path(), PatrolLine::Fz).unwrap();
    let (_, rows) = read_csv(&combined);
    assert_eq!(rows.len(), 12);
}

#[test]
fn mismatched_columns_abort_the_combine() {
    let tmp = TempDir::new("transects_mismatch").unwrap();
    let fz_dir = tmp.path().join("FZ_Gliders");
    write_fz_lap(&fz_dir);
    write_file(
        &fz_dir.join("CP05MOAS-GL564_D00002_ds_logfile_extractions.csv"),
        "Datetime,Science_on,AT_SE_WPT\n0,1,0\n",
    );
    let err = combine_line(tmp.path(), PatrolLine::Fz).unwrap_err();
    assert!(err.to_string().contains("column mismatch"), "{err:#}");
}

#[test]
fn combine_without_inputs_is_an_error() {
    let tmp = TempDir::new("transects_none").unwrap();
    let fz_dir = tmp.path().join("FZ_Gliders");
    fs::create_dir_all(&fz_dir).unwrap();
    write_file(
        &fz_dir.join("FZ_Gliders_Combined.csv"),
        "not,a,flag,table\n",
    );
    let err = combine_line(tmp.path(), PatrolLine::Fz).unwrap_err();
    assert!(err.to_string().contains("no extraction CSVs"), "{err:#}");
}
