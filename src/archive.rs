use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Result;
use kml::types::{
    AltitudeMode, Coord, Element, Geometry, KmlDocument, KmlVersion, LineString, Placemark,
};
use kml::{Kml, KmlWriter};

use crate::deployments;
use crate::dockserver;

const KML_NAMESPACE: &str = "http://www.opengis.net/kml/2.2";
const GX_NAMESPACE: &str = "http://www.google.com/kml/ext/2.2";
const TRAIL_STYLE_URL: &str = "gtrail";
const LOOKAT_RANGE_M: i64 = 230_000;

/// One glider deployment's surfacing trail, fixes in log order.
pub struct GliderTrail {
    pub cruise: String,
    pub glider: String,
    /// `(lat, lon)` decimal degrees.
    pub fixes: Vec<(f64, f64)>,
}

/// Walks one deployment's logs and collects its surfacing trail. The trail
/// wants where each surfacing started, so it takes the first usable fix of
/// every log, unlike the extraction pipeline which wants the last. A missing
/// or unreadable log directory yields an empty trail rather than an error,
/// so one retired deployment cannot sink a whole archive run.
pub fn deployment_trail(
    raw_dir: &Path,
    cruise: &str,
    glider: &str,
    deployment: u32,
) -> GliderTrail {
    let logs_dir = raw_dir
        .join(glider)
        .join(format!("D{deployment:05}"))
        .join("logs");
    let mut fixes = Vec::new();
    match dockserver::list_stamped_log_files(&logs_dir) {
        Ok(files) => {
            for path in files {
                let text = match fs::read_to_string(&path) {
                    Ok(text) => text,
                    Err(err) => {
                        warn!("unreadable log {:?}: {}", path, err);
                        continue;
                    }
                };
                if !dockserver::log_matches_glider(&text, glider) {
                    continue;
                }
                if let Some(fix) = dockserver::surfacing_fixes(&text).into_iter().flatten().next()
                {
                    fixes.push(fix);
                }
            }
        }
        Err(err) => warn!("no logs for {} D{:05}: {}", glider, deployment, err),
    }
    GliderTrail {
        cruise: cruise.to_string(),
        glider: glider.to_string(),
        fixes,
    }
}

fn text_element(name: &str, content: String) -> Element {
    Element {
        name: name.to_string(),
        attrs: HashMap::new(),
        content: Some(content),
        children: Vec::new(),
    }
}

/// Google Earth opens each trail centered on the glider's last surfacing.
fn look_at(lat: f64, lon: f64) -> Element {
    Element {
        name: "LookAt".to_string(),
        attrs: HashMap::new(),
        content: None,
        children: vec![
            text_element("latitude", lat.to_string()),
            text_element("longitude", lon.to_string()),
            text_element("range", LOOKAT_RANGE_M.to_string()),
            text_element("altitude", "0".to_string()),
            text_element("altitudeMode", "absolute".to_string()),
            text_element("heading", "0".to_string()),
            text_element("tilt", "0".to_string()),
        ],
    }
}

fn trail_placemark(trail: &GliderTrail) -> Option<Kml> {
    let (last_lat, last_lon) = *trail.fixes.last()?;
    let coords = trail
        .fixes
        .iter()
        .map(|&(lat, lon)| Coord {
            x: lon,
            y: lat,
            z: Some(0.0),
        })
        .collect();
    Some(Kml::Placemark(Placemark {
        name: Some(trail.glider.clone()),
        style_url: Some(TRAIL_STYLE_URL.to_string()),
        geometry: Some(Geometry::LineString(LineString {
            coords,
            altitude_mode: AltitudeMode::Absolute,
            ..Default::default()
        })),
        children: vec![look_at(last_lat, last_lon)],
        ..Default::default()
    }))
}

/// Assembles the archive document: one folder per cruise, one placemark per
/// glider with at least one fix. Cruises whose gliders all came up empty get
/// no folder.
pub fn build_archive(trails: &[GliderTrail]) -> Kml {
    let mut folders: Vec<(String, Vec<Kml>)> = Vec::new();
    for trail in trails {
        let placemark = match trail_placemark(trail) {
            Some(placemark) => placemark,
            None => {
                warn!("no fixes for {} on {}", trail.glider, trail.cruise);
                continue;
            }
        };
        match folders.iter_mut().find(|(cruise, _)| *cruise == trail.cruise) {
            Some((_, placemarks)) => placemarks.push(placemark),
            None => folders.push((trail.cruise.clone(), vec![placemark])),
        }
    }

    let folders = folders
        .into_iter()
        .map(|(cruise, placemarks)| {
            let mut elements = vec![Kml::Element(text_element("name", cruise))];
            elements.extend(placemarks);
            Kml::Folder {
                attrs: HashMap::new(),
                elements,
            }
        })
        .collect();

    Kml::KmlDocument(KmlDocument {
        version: KmlVersion::V22,
        attrs: HashMap::from([
            ("xmlns".to_string(), KML_NAMESPACE.to_string()),
            ("xmlns:gx".to_string(), GX_NAMESPACE.to_string()),
        ]),
        elements: vec![Kml::Document {
            attrs: HashMap::new(),
            elements: folders,
        }],
    })
}

pub fn write_archive(trails: &[GliderTrail], kml_path: &Path) -> Result<()> {
    let document = build_archive(trails);
    let mut file = fs::File::create(kml_path)?;
    file.write_all(b"<?xml version=\"1.0\" ?>\n")?;
    let mut writer = KmlWriter::from_writer(&mut file);
    writer.write(&document)?;
    Ok(())
}

/// Builds `Archive.kml` for every deployment the cruise config lists.
pub fn archive_fleet(raw_dir: &Path, config_path: &Path, kml_path: &Path) -> Result<PathBuf> {
    let cruises = deployments::load_archive_config(config_path)?;
    let mut trails = Vec::new();
    for cruise in &cruises {
        info!("archiving cruise {}", cruise.cruise);
        for reference in &cruise.deployments {
            let (glider, deployment) = deployments::parse_deployment_ref(reference)?;
            trails.push(deployment_trail(raw_dir, &cruise.cruise, &glider, deployment));
        }
    }
    write_archive(&trails, kml_path)?;
    let plotted = trails.iter().filter(|t| !t.fixes.is_empty()).count();
    info!("archived {}/{} trails -> {:?}", plotted, trails.len(), kml_path);
    Ok(kml_path.to_path_buf())
}
