use std::fs;
use std::path::Path;

use anyhow::Result;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::utils;
use crate::waypoints::PatrolLine;

const DEPLOY_DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// One deployment row of a `<glider>_Deploy.csv` asset-management export.
/// The export carries many more columns; only these four matter here.
#[derive(Debug, Deserialize)]
struct WindowRow {
    #[serde(rename = "deploymentNumber")]
    deployment_number: u32,
    #[serde(rename = "startDateTime")]
    start: String,
    #[serde(rename = "stopDateTime")]
    stop: Option<String>,
    notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct DeploymentWindow {
    pub deployment_number: u32,
    pub start_epoch: i64,
    /// `None` while the deployment is still in the water.
    pub stop_epoch: Option<i64>,
    pub line: Option<PatrolLine>,
    pub notes: String,
}

fn parse_deploy_datetime(value: &str) -> Result<i64> {
    let dt = NaiveDateTime::parse_from_str(value.trim(), DEPLOY_DATETIME_FORMAT)
        .map_err(|_| anyhow!("bad deployment datetime: {:?}", value))?;
    Ok(utils::epoch_seconds(dt))
}

/// Reads the deployment windows of one glider. Rows of the same deployment
/// number are folded together (latest start/stop win, first notes wins).
pub fn load_deployment_windows(path: &Path) -> Result<Vec<DeploymentWindow>> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut windows: Vec<DeploymentWindow> = Vec::new();
    for row in reader.deserialize() {
        let row: WindowRow = row?;
        let start_epoch = parse_deploy_datetime(&row.start)?;
        let stop_epoch = match row.stop.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(value) => Some(parse_deploy_datetime(value)?),
        };
        let notes = row.notes.unwrap_or_default();
        match windows
            .iter_mut()
            .find(|w| w.deployment_number == row.deployment_number)
        {
            Some(existing) => {
                existing.start_epoch = existing.start_epoch.max(start_epoch);
                existing.stop_epoch = match (existing.stop_epoch, stop_epoch) {
                    (Some(a), Some(b)) => Some(a.max(b)),
                    (a, b) => a.or(b),
                };
            }
            None => windows.push(DeploymentWindow {
                deployment_number: row.deployment_number,
                start_epoch,
                stop_epoch,
                line: PatrolLine::from_notes(&notes),
                notes,
            }),
        }
    }
    Ok(windows)
}

pub fn find_window(windows: &[DeploymentWindow], deployment: u32) -> Option<&DeploymentWindow> {
    windows.iter().find(|w| w.deployment_number == deployment)
}

#[derive(Debug, Deserialize)]
struct ScienceRow {
    #[serde(rename = "Glider")]
    glider: u32,
    #[serde(rename = "Deployment")]
    deployment: u32,
    #[serde(rename = "ScienceOffDatetime")]
    science_off: f64,
}

/// When the science payload of a deployment was switched off, in epoch
/// seconds. Rows past this moment carry no usable science data.
#[derive(Debug, Clone, Copy)]
pub struct ScienceOff {
    pub glider: u32,
    pub deployment: u32,
    pub science_off_epoch: i64,
}

pub fn load_science_off(path: &Path) -> Result<Vec<ScienceOff>> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut rows = Vec::new();
    for row in reader.deserialize() {
        let row: ScienceRow = row?;
        rows.push(ScienceOff {
            glider: row.glider,
            deployment: row.deployment,
            science_off_epoch: row.science_off as i64,
        });
    }
    Ok(rows)
}

pub fn science_off_for(rows: &[ScienceOff], glider_serial: u32, deployment: u32) -> Option<i64> {
    rows.iter()
        .find(|r| r.glider == glider_serial && r.deployment == deployment)
        .map(|r| r.science_off_epoch)
}

/// One cruise of the KML archive config: a display name plus the
/// `<glider>/D00001` deployments sailed on it, in file order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CruiseConfig {
    pub cruise: String,
    pub deployments: Vec<String>,
}

pub fn load_archive_config(path: &Path) -> Result<Vec<CruiseConfig>> {
    let text = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

/// Splits a `<glider>/D00001` deployment reference.
pub fn parse_deployment_ref(reference: &str) -> Result<(String, u32)> {
    let (glider, dpart) = reference
        .split_once('/')
        .ok_or_else(|| anyhow!("bad deployment reference: {:?}", reference))?;
    let number = dpart
        .strip_prefix('D')
        .unwrap_or(dpart)
        .trim_start_matches('0');
    let number: u32 = if number.is_empty() {
        bail!("bad deployment number in {:?}", reference);
    } else {
        number.parse()?
    };
    Ok((glider.to_string(), number))
}

/// One row of the battery-stats deployment metadata export.
#[derive(Debug, Deserialize)]
struct BatteryRow {
    glider_glider_name: String,
    dnum: Option<f64>,
    batt_type: String,
    start_date_epoch: f64,
    expected_recovery: f64,
}

#[derive(Debug, Clone)]
pub struct BatteryDeployment {
    pub glider: String,
    pub deployment: u32,
    pub battery_type: String,
    pub start_epoch: i64,
    pub expected_recovery_epoch: i64,
}

impl BatteryDeployment {
    pub fn expected_duration_days(&self) -> i64 {
        (self.expected_recovery_epoch - self.start_epoch) / 86_400
    }
}

/// Reads the battery metadata export, dropping Endurance gliders and rows
/// without an official deployment number.
pub fn load_battery_deployments(path: &Path) -> Result<Vec<BatteryDeployment>> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut rows = Vec::new();
    for row in reader.deserialize() {
        let row: BatteryRow = row?;
        if row.glider_glider_name.contains("ce") {
            continue;
        }
        let deployment = match row.dnum {
            Some(n) if n.is_finite() => n as u32,
            _ => continue,
        };
        rows.push(BatteryDeployment {
            glider: row.glider_glider_name,
            deployment,
            battery_type: row.batt_type,
            start_epoch: row.start_date_epoch as i64,
            expected_recovery_epoch: row.expected_recovery as i64,
        });
    }
    Ok(rows)
}
