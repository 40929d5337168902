use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::Utc;

use crate::coordinates::{self, Position};
use crate::deployments;
use crate::dockserver;
use crate::waypoints;

/// Placeholder vocabulary of the output CSVs. `No match.` is what a missing
/// raw field renders as, `-1` marks an unusable coordinate and `n/a` a
/// distance that must not be computed from one.
pub const NO_MATCH: &str = "No match.";
pub const NOT_AVAILABLE: &str = "n/a";
pub const INVALID_COORDINATE: &str = "-1";

pub struct ExtractOptions<'a> {
    /// Full asset name, e.g. `CP05MOAS-GL376`; the trailing three digits are
    /// the serial the logs are matched against.
    pub glider_name: &'a str,
    pub deployment: u32,
    pub logs_dir: &'a Path,
    pub deployments_csv: &'a Path,
    pub science_csv: Option<&'a Path>,
    pub output_root: &'a Path,
}

#[derive(Debug)]
pub struct ExtractionSummary {
    pub rows_written: usize,
    pub files_skipped: usize,
    pub csv_path: PathBuf,
    pub line_csv_path: PathBuf,
}

struct Row {
    file_name: String,
    epoch: i64,
    position: Position,
    wpt_lat_dd: Option<f64>,
    wpt_lon_dd: Option<f64>,
    odometer: Option<String>,
}

fn glider_serial(glider_name: &str) -> &str {
    let n = glider_name.len();
    &glider_name[n.saturating_sub(3)..]
}

/// The decimal target coordinate of a waypoint readback. `0` means the
/// glider had no target loaded; garbage and sentinels are unusable.
fn waypoint_decimal(raw: &Option<String>) -> Option<f64> {
    let value = raw.as_deref()?;
    if value == "0" {
        return None;
    }
    coordinates::parse_degree_minutes(value).ok().flatten()
}

fn render_float(value: f64) -> String {
    format!("{value}")
}

/// Mines one glider deployment's dockserver logs into the fixed-column
/// extraction CSV, written under both the deployment directory and the
/// patrol-line collection directory.
pub fn extract_deployment(opts: &ExtractOptions) -> Result<ExtractionSummary> {
    let windows = deployments::load_deployment_windows(opts.deployments_csv)?;
    let window = deployments::find_window(&windows, opts.deployment)
        .ok_or_else(|| anyhow!("no deployment {} in {:?}", opts.deployment, opts.deployments_csv))?;
    let window_start = window.start_epoch;
    let window_stop = window
        .stop_epoch
        .unwrap_or_else(|| Utc::now().timestamp());
    let line = window.line;
    let line_label = match line {
        Some(line) => line.to_string(),
        None => window
            .notes
            .split(',')
            .next()
            .unwrap_or("")
            .trim()
            .to_string(),
    };

    let serial = glider_serial(opts.glider_name);
    let science_off = match opts.science_csv {
        Some(path) => {
            let rows = deployments::load_science_off(path)?;
            serial
                .parse::<u32>()
                .ok()
                .and_then(|s| deployments::science_off_for(&rows, s, opts.deployment))
        }
        None => None,
    };

    let mut rows: Vec<Row> = Vec::new();
    let mut files_skipped = 0;
    for path in dockserver::list_log_files(opts.logs_dir)? {
        let record = match dockserver::parse_log(&path) {
            Ok(record) => record,
            Err(err) => {
                warn!("skipping {:?}: {}", path, err);
                files_skipped += 1;
                continue;
            }
        };
        if !record.file_name.contains(serial) {
            continue;
        }
        let epoch = record.timestamp.and_utc().timestamp();
        if epoch < window_start || epoch > window_stop {
            continue;
        }
        let position = match &record.gps {
            Some(fix) => Position::from_fix(&fix.lat, &fix.lon).unwrap_or(Position::NoFix),
            None => Position::NoFix,
        };
        rows.push(Row {
            file_name: record.file_name,
            epoch,
            position,
            wpt_lat_dd: waypoint_decimal(&record.wpt_lat),
            wpt_lon_dd: waypoint_decimal(&record.wpt_lon),
            odometer: record.odometer,
        });
    }
    rows.sort_by_key(|r| r.epoch);

    let mut headers: Vec<String> = [
        "Glider",
        "Deployment",
        "File_Name",
        "Datetime",
        "Line",
        "GPS_Lat(DD)",
        "GPS_Lon(DD)",
        "WPT_Lat(DD)",
        "WPT_Lon(DD)",
        "m_tot_horz_dist",
        "Distance_to_waypoint",
    ]
    .iter()
    .map(|h| h.to_string())
    .collect();
    if let Some(line) = line {
        for corner in line.corners() {
            headers.push(waypoints::distance_column(corner.label));
        }
        for corner in line.corners() {
            headers.push(waypoints::flag_column(corner.label));
        }
    }
    headers.push("Science_on".to_string());

    let csv_name = format!(
        "{}_D{:05}_ds_logfile_extractions.csv",
        opts.glider_name, opts.deployment
    );
    let deployment_dir = opts
        .output_root
        .join(opts.glider_name)
        .join(format!("D{:05}", opts.deployment));
    let line_dir = opts.output_root.join(match line {
        Some(line) => format!("{line}_Gliders"),
        None => "No-Line_Gliders".to_string(),
    });
    fs::create_dir_all(&deployment_dir)?;
    fs::create_dir_all(&line_dir)?;
    let csv_path = deployment_dir.join(&csv_name);
    let line_csv_path = line_dir.join(&csv_name);

    let mut records: Vec<Vec<String>> = Vec::with_capacity(rows.len());
    for row in &rows {
        let mut cells: Vec<String> = Vec::with_capacity(headers.len());
        cells.push(serial.to_string());
        cells.push(opts.deployment.to_string());
        cells.push(row.file_name.clone());
        cells.push(row.epoch.to_string());
        cells.push(line_label.clone());
        match row.position.lat_lon() {
            Some((lat, lon)) => {
                cells.push(render_float(lat));
                cells.push(render_float(lon));
            }
            None => {
                cells.push(INVALID_COORDINATE.to_string());
                cells.push(INVALID_COORDINATE.to_string());
            }
        }
        for coordinate in [row.wpt_lat_dd, row.wpt_lon_dd] {
            match coordinate {
                Some(value) => cells.push(render_float(value)),
                None => cells.push(INVALID_COORDINATE.to_string()),
            }
        }
        cells.push(row.odometer.clone().unwrap_or_else(|| NO_MATCH.to_string()));
        let target_distance = match (row.position.lat_lon(), row.wpt_lat_dd, row.wpt_lon_dd) {
            (Some((lat, lon)), Some(wlat), Some(wlon)) => {
                Some(waypoints::geodesic_distance_m(lat, lon, wlat, wlon))
            }
            _ => None,
        };
        match target_distance {
            Some(distance) => cells.push(render_float(distance)),
            None => cells.push(NOT_AVAILABLE.to_string()),
        }
        if let Some(line) = line {
            let proximities = waypoints::classify(&row.position, line);
            for proximity in &proximities {
                match proximity.distance_m {
                    Some(distance) => cells.push(render_float(distance)),
                    None => cells.push(NOT_AVAILABLE.to_string()),
                }
            }
            for proximity in &proximities {
                cells.push(if proximity.arrived { "1" } else { "0" }.to_string());
            }
        }
        let science_on = match science_off {
            Some(off) => row.epoch < off,
            // no recorded switch-off: science ran the whole deployment
            None => true,
        };
        cells.push(if science_on { "1" } else { "0" }.to_string());
        records.push(cells);
    }

    for path in [&csv_path, &line_csv_path] {
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(&headers)?;
        for record in &records {
            writer.write_record(record)?;
        }
        writer.flush()?;
    }

    info!(
        "extracted {} rows for {} D{:05} ({} files skipped) -> {:?}",
        records.len(),
        opts.glider_name,
        opts.deployment,
        files_skipped,
        csv_path
    );
    Ok(ExtractionSummary {
        rows_written: records.len(),
        files_skipped,
        csv_path,
        line_csv_path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serial_is_name_tail() {
        assert_eq!(glider_serial("CP05MOAS-GL376"), "376");
        assert_eq!(glider_serial("cp_564"), "564");
        assert_eq!(glider_serial("64"), "64");
    }

    #[test]
    fn waypoint_targets() {
        assert_eq!(waypoint_decimal(&Some("3950.000".to_string())), Some(39.833));
        assert_eq!(waypoint_decimal(&Some("0".to_string())), None);
        assert_eq!(waypoint_decimal(&Some("No match.".to_string())), None);
        assert_eq!(waypoint_decimal(&Some("6969.6969".to_string())), None);
        assert_eq!(waypoint_decimal(&None), None);
    }
}
