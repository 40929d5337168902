use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::NaiveDateTime;
use regex::Regex;

use crate::coordinates;
use crate::utils;

lazy_static! {
    static ref GPS_LOCATION_RE: Regex = Regex::new(r"GPS Location:(.+?)\n").unwrap();
    // the lazy match ends at the " m" in "measured", leaving "<lat> N <lon> E"
    static ref SURFACING_RE: Regex = Regex::new(r"GPS Location:(.+?) m").unwrap();
    static ref CURR_TIME_RE: Regex = Regex::new(r"Curr Time:(.+?)\n").unwrap();
    static ref VEHICLE_NAME_RE: Regex = Regex::new(r"Vehicle Name: (......?)").unwrap();
    static ref FILE_STAMP_RE: Regex = Regex::new(r"[0-9]{8}T[0-9]{6}").unwrap();
}

pub const WPT_LAT_SENSOR: &str = "c_wpt_lat";
pub const WPT_LON_SENSOR: &str = "c_wpt_lon";
pub const ODOMETER_SENSOR: &str = "m_tot_horz_dist";

/// The raw degree-minute strings of the newest GPS paragraph in a log,
/// untouched by any conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GpsFix {
    pub lat: String,
    pub lon: String,
    pub age: String,
}

/// Everything the extraction pipeline wants from one dockserver log file.
#[derive(Debug, Clone)]
pub struct LogRecord {
    pub file_name: String,
    pub timestamp: NaiveDateTime,
    pub gps: Option<GpsFix>,
    pub wpt_lat: Option<String>,
    pub wpt_lon: Option<String>,
    pub odometer: Option<String>,
}

/// Latest `GPS Location:` paragraph of the log. The glider repeats the fix
/// many times per surfacing, only the last one reflects the final position.
pub fn gps_location(text: &str) -> Option<GpsFix> {
    let capture = GPS_LOCATION_RE
        .captures_iter(text)
        .last()
        .map(|c| c[1].to_string())?;
    let tokens: Vec<&str> = capture.split_whitespace().collect();
    // "<lat> N <lon> E measured <age> secs ago"
    Some(GpsFix {
        lat: (*tokens.first()?).to_string(),
        lon: (*tokens.get(2)?).to_string(),
        age: (*tokens.get(5)?).to_string(),
    })
}

/// Every `GPS Location:` fix of a log in file order, converted to decimal
/// degrees. A fix the glider could not take (sentinel minutes) or could not
/// be parsed yields `None` in its slot, so callers can still reason about
/// which surfacing it belonged to.
pub fn surfacing_fixes(text: &str) -> Vec<Option<(f64, f64)>> {
    SURFACING_RE
        .captures_iter(text)
        .map(|capture| {
            let tokens: Vec<&str> = capture[1].split_whitespace().collect();
            let lat = tokens
                .first()
                .and_then(|t| coordinates::parse_degree_minutes(t).ok().flatten());
            let lon = tokens
                .get(2)
                .and_then(|t| coordinates::parse_degree_minutes(t).ok().flatten());
            match (lat, lon) {
                (Some(lat), Some(lon)) => Some((lat, lon)),
                _ => None,
            }
        })
        .collect()
}

/// First readback of a sensor, e.g. `c_wpt_lat(lat)=3950.000 ...`.
/// The value is the text between the `=` and the next space.
pub fn sensor_value(text: &str, label: &str) -> Option<String> {
    let value = first_capture(text, label)?;
    let value = value.split('=').nth(1)?.split(' ').next()?;
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Odometer-style readbacks put a units token before the value
/// (`m_tot_horz_dist(km) 123.456`), so the value is the second token.
pub fn odometer_value(text: &str, label: &str) -> Option<String> {
    let value = first_capture(text, label)?;
    value.split_whitespace().nth(1).map(|v| v.to_string())
}

fn first_capture(text: &str, label: &str) -> Option<String> {
    let re = Regex::new(&format!("{}(.+?)\n", regex::escape(label))).ok()?;
    re.captures(text).map(|c| c[1].to_string())
}

/// All `Curr Time: Fri Sep 13 18:12:31 2019` stamps of a log, in file order.
/// Unparseable stamps are dropped.
pub fn curr_times(text: &str) -> Vec<NaiveDateTime> {
    CURR_TIME_RE
        .captures_iter(text)
        .filter_map(|c| {
            let tokens: Vec<&str> = c[1].split_whitespace().take(5).collect();
            if tokens.len() < 5 {
                return None;
            }
            NaiveDateTime::parse_from_str(&tokens.join(" "), "%a %b %d %H:%M:%S %Y").ok()
        })
        .collect()
}

/// First and last glider-side clock readings of a log, when it has any.
pub fn log_time_span(text: &str) -> Option<(NaiveDateTime, NaiveDateTime)> {
    let times = curr_times(text);
    Some((*times.first()?, *times.last()?))
}

/// Dockserver log names end in a `YYYYMMDDTHHMMSS` stamp
/// (`usf-bass_network_20190913T181231.log`); ma-file archive names are the
/// bare stamp. Anything else is a malformed name the batch driver skips.
pub fn datetime_from_file_name(file_name: &str) -> Result<NaiveDateTime> {
    let base = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(file_name);
    let segment = if base.to_lowercase().ends_with(".log") {
        base.rsplit('_').next().unwrap_or(base)
    } else {
        base
    };
    let field = |range: std::ops::Range<usize>| -> Result<u32> {
        let digits = segment
            .get(range)
            .ok_or_else(|| anyhow!("file name too short for a datetime: {:?}", base))?;
        Ok(digits.parse()?)
    };
    let year = field(0..4)? as i32;
    let month = field(4..6)?;
    let day = field(6..8)?;
    let hour = field(9..11)?;
    let minute = field(11..13)?;
    let second = field(13..15)?;
    chrono::NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|d| d.and_hms_opt(hour, minute, second))
        .ok_or_else(|| anyhow!("no datetime in file name: {:?}", base))
}

/// The `YYYYMMDDTHHMMSS` stamp embedded in a log name, for ordering.
pub fn file_name_stamp(file_name: &str) -> Option<&str> {
    FILE_STAMP_RE.find(file_name).map(|m| m.as_str())
}

pub fn vehicle_name(text: &str) -> Option<String> {
    VEHICLE_NAME_RE
        .captures(text)
        .map(|c| c[1].trim().to_string())
}

/// A log belongs to a glider when the serial tail of its vehicle name
/// (`cp_564` -> `564`) occurs in the glider name (`CP05MOAS-GL564`).
pub fn log_matches_glider(text: &str, glider: &str) -> bool {
    match vehicle_name(text) {
        Some(name) => match name.get(3..) {
            Some(serial) if !serial.is_empty() => glider.contains(serial),
            _ => false,
        },
        None => false,
    }
}

/// All `*.log` files of a directory in natural name order.
pub fn list_log_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut names: Vec<String> = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().to_string();
        if name.to_lowercase().ends_with(".log") && entry.path().is_file() {
            names.push(name);
        }
    }
    utils::natural_sort(&mut names);
    Ok(names.into_iter().map(|name| dir.join(name)).collect())
}

/// All `*.log` files of a directory in mission order, keyed by the name
/// stamp. Unstamped files sort first.
pub fn list_stamped_log_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut names: Vec<String> = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().to_string();
        if name.to_lowercase().ends_with(".log") && entry.path().is_file() {
            names.push(name);
        }
    }
    names.sort_by_key(|name| file_name_stamp(name).map(str::to_string));
    Ok(names.into_iter().map(|name| dir.join(name)).collect())
}

/// Parses one log file into a record. Field extraction never fails; only an
/// unreadable file or a name without a datetime is an error.
pub fn parse_log(path: &Path) -> Result<LogRecord> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| anyhow!("bad log path: {:?}", path))?
        .to_string();
    let timestamp = datetime_from_file_name(&file_name)?;
    let text = fs::read_to_string(path)?;
    Ok(LogRecord {
        file_name,
        timestamp,
        gps: gps_location(&text),
        wpt_lat: sensor_value(&text, WPT_LAT_SENSOR),
        wpt_lon: sensor_value(&text, WPT_LON_SENSOR),
        odometer: odometer_value(&text, ODOMETER_SENSOR),
    })
}
