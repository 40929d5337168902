#![allow(dead_code)]

use std::fs;
use std::path::Path;

pub const GLIDER: &str = "CP05MOAS-GL376";

/// A dockserver session log carrying the fields the pipelines mine. Every
/// fix gets its own clock line, the way the relay interleaves them.
pub fn log_text(vehicle: &str, fixes: &[(&str, &str)]) -> String {
    let mut text = format!("Vehicle Name: {vehicle}\n");
    for (lat, lon) in fixes {
        text.push_str("Curr Time: Fri Sep 13 18:12:31 2019 MT:  1234720\n");
        text.push_str(&format!(
            "GPS Location:  {lat} N {lon} E measured  43.731 secs ago\n"
        ));
    }
    text
}

pub fn with_waypoint(mut text: String, lat: &str, lon: &str) -> String {
    text.push_str(&format!("sensor:c_wpt_lat(lat)={lat} 3.21e+06 secs ago\n"));
    text.push_str(&format!("sensor:c_wpt_lon(lon)={lon} 3.22e+06 secs ago\n"));
    text
}

pub fn with_odometer(mut text: String, km: &str) -> String {
    text.push_str(&format!("sensor:m_tot_horz_dist(km) {km} 4.2 secs ago\n"));
    text
}

pub fn write_file(path: &Path, content: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// Headers and rows of a CSV, everything as strings. Strips the Excel
/// byte-order mark some of the outputs carry.
pub fn read_csv(path: &Path) -> (Vec<String>, Vec<Vec<String>>) {
    let text = fs::read_to_string(path).unwrap();
    let text = text.strip_prefix('\u{feff}').unwrap_or(&text);
    let mut reader = csv::Reader::from_reader(text.as_bytes());
    let headers = reader
        .headers()
        .unwrap()
        .iter()
        .map(str::to_string)
        .collect();
    let rows = reader
        .records()
        .map(|record| record.unwrap().iter().map(str::to_string).collect())
        .collect();
    (headers, rows)
}

pub fn column(headers: &[String], rows: &[Vec<String>], name: &str) -> Vec<String> {
    let index = headers
        .iter()
        .position(|h| h == name)
        .unwrap_or_else(|| panic!("no {name} column in {headers:?}"));
    rows.iter().map(|row| row[index].clone()).collect()
}
