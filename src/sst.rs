use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::NaiveDate;
use strum_macros::{Display, EnumString};

use crate::dockserver;

/// Gliders plotted on the shelf imagery unless the caller narrows the list.
pub const DEFAULT_GLIDERS: [&str; 4] = ["cp_340", "cp_376", "cp_559", "cp_564"];

pub const DEFAULT_LOOKBACK_DAYS: u32 = 10;

/// Pixel frame of one Rutgers SST image family. The frame maps the signed
/// west-negative longitudes the fleet reports onto image columns.
pub struct ImageGrid {
    pub left_px: f64,
    pub top_px: f64,
    pub right_px: f64,
    pub bottom_px: f64,
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

pub const COMPOSITE_GRID: ImageGrid = ImageGrid {
    left_px: 46.0,
    top_px: 38.0,
    right_px: 755.0,
    bottom_px: 770.0,
    min_lat: 35.0,
    max_lat: 46.0,
    min_lon: 63.0,
    max_lon: 77.0,
};

pub const HOURLY_GRID: ImageGrid = ImageGrid {
    left_px: 164.0,
    top_px: 147.0,
    right_px: 1767.0,
    bottom_px: 1340.0,
    min_lat: 38.0,
    max_lat: 42.0,
    min_lon: 68.0,
    max_lon: 75.0,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum ImageKind {
    Composite,
    Hourly,
}

impl ImageKind {
    pub fn grid(&self) -> &'static ImageGrid {
        match self {
            ImageKind::Composite => &COMPOSITE_GRID,
            ImageKind::Hourly => &HOURLY_GRID,
        }
    }

    /// Composite directories mix in thumbnails; only the `comp` frames sit
    /// on the mapped grid.
    pub fn matches_name(&self, image_name: &str) -> bool {
        match self {
            ImageKind::Composite => image_name.contains("comp"),
            ImageKind::Hourly => true,
        }
    }
}

impl ImageGrid {
    pub fn pixels_per_lon_degree(&self) -> f64 {
        (self.right_px - self.left_px) / (self.max_lon - self.min_lon)
    }

    pub fn pixels_per_lat_degree(&self) -> f64 {
        (self.bottom_px - self.top_px) / (self.max_lat - self.min_lat)
    }

    /// `lon` is signed, so `max_lon + lon` is the offset east of the frame's
    /// western edge in degrees.
    pub fn to_pixel(&self, lat: f64, lon: f64) -> (f64, f64) {
        let px = self.left_px + (self.max_lon + lon) * self.pixels_per_lon_degree();
        let py = self.top_px + (self.max_lat - lat) * self.pixels_per_lat_degree();
        (px, py)
    }

    /// The frames crop tight to the shelf; a fix outside the mapped box has
    /// no pixel on this image family.
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        lat >= self.min_lat
            && lat <= self.max_lat
            && -lon >= self.min_lon
            && -lon <= self.max_lon
    }
}

/// Image names start with the frame date (`220815.1430.comp.jpg`).
pub fn image_date_string(image_name: &str) -> Option<&str> {
    let base = image_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(image_name);
    let stem = base.split('.').next().unwrap_or(base);
    let date = stem.get(0..6)?;
    if date.chars().all(|c| c.is_ascii_digit()) {
        Some(date)
    } else {
        None
    }
}

/// `yymmdd` strings for today back through `lookback_days`, newest first.
pub fn recent_date_strings(today: NaiveDate, lookback_days: u32) -> Vec<String> {
    (0..=i64::from(lookback_days))
        .map(|i| (today - chrono::Duration::days(i)).format("%y%m%d").to_string())
        .collect()
}

/// Keeps the images of the lookback window, grouped newest day first.
pub fn cull_images(names: &[String], today: NaiveDate, lookback_days: u32) -> Vec<String> {
    let mut culled = Vec::new();
    for date in recent_date_strings(today, lookback_days) {
        culled.extend(names.iter().filter(|n| n.contains(&date)).cloned());
    }
    culled
}

/// The glider's position on one frame date: the last fix of the day's
/// earliest log, falling through to later logs while that fix is unusable.
pub fn position_on(logs_root: &Path, glider: &str, date_string: &str) -> Option<(f64, f64)> {
    let files = dockserver::list_stamped_log_files(&logs_root.join(glider)).ok()?;
    for path in files {
        let dated = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.contains(date_string));
        if !dated {
            continue;
        }
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(_) => continue,
        };
        if let Some(Some(fix)) = dockserver::surfacing_fixes(&text).pop() {
            return Some(fix);
        }
    }
    None
}

/// The most recent fix the glider has reported at all.
pub fn latest_position(logs_root: &Path, glider: &str) -> Option<(f64, f64)> {
    let files = dockserver::list_stamped_log_files(&logs_root.join(glider)).ok()?;
    for path in files.into_iter().rev() {
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(_) => continue,
        };
        if let Some(Some(fix)) = dockserver::surfacing_fixes(&text).pop() {
            return Some(fix);
        }
    }
    None
}

#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub image: String,
    pub glider: String,
    pub lat: f64,
    pub lon: f64,
    pub pixel_x: f64,
    pub pixel_y: f64,
}

/// Pairs every grid image of the lookback window with each glider's position
/// on the frame date and converts it to pixel coordinates.
pub fn map_fleet(
    images_dir: &Path,
    logs_root: &Path,
    gliders: &[String],
    kind: ImageKind,
    today: NaiveDate,
    lookback_days: u32,
) -> Result<Vec<Placement>> {
    let mut names: Vec<String> = Vec::new();
    for entry in fs::read_dir(images_dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().to_string();
        if name.ends_with(".jpg") && kind.matches_name(&name) && entry.path().is_file() {
            names.push(name);
        }
    }
    names.sort();

    let grid = kind.grid();
    let mut placements = Vec::new();
    for image in cull_images(&names, today, lookback_days) {
        let date_string = match image_date_string(&image) {
            Some(date) => date.to_string(),
            None => {
                warn!("no frame date in image name {}", image);
                continue;
            }
        };
        for glider in gliders {
            let (lat, lon) = match position_on(logs_root, glider, &date_string) {
                Some(fix) => fix,
                None => {
                    info!("{} has no position on {}", glider, date_string);
                    continue;
                }
            };
            if !grid.contains(lat, lon) {
                info!("{} off frame at ({}, {}) on {}", glider, lat, lon, date_string);
                continue;
            }
            let (pixel_x, pixel_y) = grid.to_pixel(lat, lon);
            placements.push(Placement {
                image: image.clone(),
                glider: glider.clone(),
                lat,
                lon,
                pixel_x,
                pixel_y,
            });
        }
    }
    Ok(placements)
}

pub fn write_placements(placements: &[Placement], csv_path: &Path) -> Result<PathBuf> {
    let mut writer = csv::Writer::from_path(csv_path)?;
    writer.write_record(["Image", "Glider", "Lat", "Lon", "Pixel_X", "Pixel_Y"])?;
    for p in placements {
        writer.write_record(&[
            p.image.clone(),
            p.glider.clone(),
            p.lat.to_string(),
            p.lon.to_string(),
            p.pixel_x.to_string(),
            p.pixel_y.to_string(),
        ])?;
    }
    writer.flush()?;
    info!("{} placements -> {:?}", placements.len(), csv_path);
    Ok(csv_path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn grid_scale() {
        assert!((COMPOSITE_GRID.pixels_per_lon_degree() - 709.0 / 14.0).abs() < 1e-9);
        assert!((COMPOSITE_GRID.pixels_per_lat_degree() - 732.0 / 11.0).abs() < 1e-9);
        assert!((HOURLY_GRID.pixels_per_lon_degree() - 1603.0 / 7.0).abs() < 1e-9);
        assert!((HOURLY_GRID.pixels_per_lat_degree() - 1193.0 / 4.0).abs() < 1e-9);
    }

    #[test]
    fn grid_corners_map_to_frame_corners() {
        let (px, py) = COMPOSITE_GRID.to_pixel(46.0, -77.0);
        assert!((px - 46.0).abs() < 1e-9);
        assert!((py - 38.0).abs() < 1e-9);
        let (px, py) = COMPOSITE_GRID.to_pixel(35.0, -63.0);
        assert!((px - 755.0).abs() < 1e-9);
        assert!((py - 770.0).abs() < 1e-9);
    }

    #[test]
    fn pixel_position() {
        let (px, py) = COMPOSITE_GRID.to_pixel(40.053, -70.648);
        assert!((px - 367.683428571).abs() < 1e-6);
        assert!((py - 433.745818182).abs() < 1e-6);
    }

    #[test]
    fn off_frame_positions_are_rejected() {
        assert!(COMPOSITE_GRID.contains(40.053, -70.648));
        assert!(!COMPOSITE_GRID.contains(40.053, -80.0));
        assert!(!COMPOSITE_GRID.contains(34.0, -70.648));
        assert!(!HOURLY_GRID.contains(43.0, -70.648));
        assert!(HOURLY_GRID.contains(40.0, -70.648));
    }

    #[test]
    fn image_kinds() {
        assert_eq!(ImageKind::from_str("composite").unwrap(), ImageKind::Composite);
        assert_eq!(ImageKind::from_str("hourly").unwrap(), ImageKind::Hourly);
        assert!(ImageKind::Composite.matches_name("220815.1430.comp.jpg"));
        assert!(!ImageKind::Composite.matches_name("220815.1430.thumb.jpg"));
        assert!(ImageKind::Hourly.matches_name("220815.1430.jpg"));
    }

    #[test]
    fn frame_dates() {
        assert_eq!(image_date_string("220815.1430.comp.jpg"), Some("220815"));
        assert_eq!(
            image_date_string("/tmp/images/220815.comp.jpg"),
            Some("220815")
        );
        assert_eq!(image_date_string("thumb.jpg"), None);
    }

    #[test]
    fn lookback_crosses_month_boundary() {
        let today = NaiveDate::from_ymd_opt(2022, 3, 1).unwrap();
        assert_eq!(
            recent_date_strings(today, 2),
            vec!["220301", "220228", "220227"]
        );
    }

    #[test]
    fn culling_groups_by_day() {
        let today = NaiveDate::from_ymd_opt(2022, 8, 16).unwrap();
        let names = vec![
            "220810.comp.jpg".to_string(),
            "220815.comp.jpg".to_string(),
            "220816.0200.comp.jpg".to_string(),
            "220816.1400.comp.jpg".to_string(),
        ];
        assert_eq!(
            cull_images(&names, today, 1),
            vec![
                "220816.0200.comp.jpg".to_string(),
                "220816.1400.comp.jpg".to_string(),
                "220815.comp.jpg".to_string(),
            ]
        );
    }
}
