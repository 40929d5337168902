pub mod test_utils;

use glider_tools::battery::process_fleet;
use std::fs;
use std::path::Path;
use tempdir::TempDir;
use test_utils::*;

const DAY: i64 = 86_400;
const START: i64 = 1_600_000_000;

/// Seven daily samples at one amphr/day, then a long gap and a heavy burn.
/// The odd rows exercise the loader's tolerance for relay garbage.
fn write_amphr_series(data_dir: &Path) {
    let mut text = String::from(
        "epoch_seconds,mission,m_coulomb_amphr_total(amp-hrs)\n",
    );
    for day in 0..7 {
        text.push_str(&format!("{},fz_survey.mi,{}\n", START + day * DAY, 20 + day));
    }
    text.push_str(&format!("{},fz_survey.mi,notanumber\n", START + 10 * DAY));
    text.push_str(&format!(",fz_survey.mi,{}\n", 99));
    text.push_str(&format!("{},fz_survey.mi,{}\n", START + 50 * DAY, 270));
    write_file(&data_dir.join("cp_564_D00013_amphr.csv"), &text);
}

#[test]
fn runs_battery_stats_for_the_fleet() {
    let tmp = TempDir::new("battery").unwrap();
    let data_dir = tmp.path().join("data");
    let output_dir = tmp.path().join("reports");
    write_amphr_series(&data_dir);

    let reports = process_fleet(
        Path::new("./tests/data/battery_metadata.csv"),
        &data_dir,
        &output_dir,
    )
    .unwrap();

    // ce_312 and the blank-deployment row never load; cp_376 has no series
    // file and is skipped with a notice rather than failing the fleet
    assert_eq!(reports.len(), 1);
    assert_eq!(
        reports[0],
        output_dir.join("cp_564-D00013_battery_stats.txt")
    );
    assert!(!output_dir.join("cp_376-D00007_battery_stats.txt").exists());

    let report = fs::read_to_string(&reports[0]).unwrap();
    let expected = [
        "cp_564 D00013 Battery Stats",
        "",
        "4s Batteries",
        "Nominal amphr available: 800",
        "Actual amphr spent at deployment: 20",
        "Actual amphr available for deployment: 780",
        "Expected deployment duration: 100 days",
        "Max amphr/day allowed for deployment: 7.8",
        "",
        "Actual days deployed: 50",
        "Actual amphr spent at recovery: 270",
        "Actual amphr spent for deployment: 250",
        "Actual amphr/day for deployment: 5",
        "Estimated amphr remaining at recovery: 530",
        "Estimated days remaining at recovery: 106",
    ]
    .join("\n");
    assert_eq!(report, expected);

    let (headers, rows) = read_csv(&output_dir.join("cp_564-D00013_battery_rates.csv"));
    assert_eq!(headers, vec!["Datetime", "Amphr_per_day", "Max_rate"]);
    // rates start once a full three-day window has passed
    assert_eq!(rows.len(), 5);
    assert_eq!(rows[0], vec!["1600259200", "1", "7.8"]);
    assert_eq!(rows[3], vec!["1600518400", "1", "7.8"]);
    // the jump after the gap lands over triple the running mean
    assert_eq!(rows[4], vec!["1604320000", "", "7.8"]);
}
