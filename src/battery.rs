use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::deployments::{self, BatteryDeployment};
use crate::utils::round2;

/// Coulomb counter column of the flight-data export.
pub const AMPHR_SENSOR: &str = "m_coulomb_amphr_total(amp-hrs)";

/// Rolling window for the amphr/day rate, three days of seconds.
pub const RATE_WINDOW_SECONDS: i64 = 259_200;

/// One rolling-rate point. `None` marks a rate discarded as a counter reset
/// or an outlier.
#[derive(Debug, Clone, PartialEq)]
pub struct RateSample {
    pub epoch: i64,
    pub amphr_per_day: Option<f64>,
}

/// Loads an `epoch_seconds` + coulomb-counter series. Rows with missing or
/// non-numeric cells are dropped.
pub fn load_amphr_series(path: &Path) -> Result<Vec<(i64, f64)>> {
    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?.clone();
    let epoch_idx = headers
        .iter()
        .position(|h| h == "epoch_seconds")
        .ok_or_else(|| anyhow!("no epoch_seconds column in {:?}", path))?;
    let sensor_idx = headers
        .iter()
        .position(|h| h == AMPHR_SENSOR)
        .ok_or_else(|| anyhow!("no {} column in {:?}", AMPHR_SENSOR, path))?;
    let mut series = Vec::new();
    for record in reader.records() {
        let record = record?;
        let epoch = record.get(epoch_idx).and_then(|v| v.trim().parse::<i64>().ok());
        let value = record.get(sensor_idx).and_then(|v| v.trim().parse::<f64>().ok());
        if let (Some(epoch), Some(value)) = (epoch, value) {
            if value.is_finite() {
                series.push((epoch, value));
            }
        }
    }
    Ok(series)
}

fn running_mean(rates: &[RateSample]) -> Option<f64> {
    let kept: Vec<f64> = rates.iter().filter_map(|r| r.amphr_per_day).collect();
    if kept.is_empty() {
        None
    } else {
        Some(kept.iter().sum::<f64>() / kept.len() as f64)
    }
}

/// Rolling amphr/day over the trailing window. For each sample past the
/// first full window, the rate spans back to the nearest earlier sample at
/// least a window away. Negative rates are counter resets; a rate more than
/// three times the running mean is a spike. Both are kept as gaps so the
/// series still lines up with its dates.
pub fn rolling_rate(series: &[(i64, f64)], window_seconds: i64) -> Vec<RateSample> {
    let mut rates: Vec<RateSample> = Vec::new();
    if series.is_empty() {
        return rates;
    }
    let first_epoch = series[0].0;
    for (i, &(epoch, value)) in series.iter().enumerate() {
        if epoch - first_epoch < window_seconds {
            continue;
        }
        let mut look_back = i;
        while epoch - series[look_back].0 < window_seconds {
            look_back -= 1;
        }
        let time_delta_days = (epoch - series[look_back].0) as f64 / 86_400.0;
        let data_delta = value - series[look_back].1;
        let mut rate = Some(data_delta / time_delta_days);
        if let Some(r) = rate {
            if r < 0.0 {
                rate = None;
            }
        }
        if let (Some(r), Some(mean)) = (rate, running_mean(&rates)) {
            if r > 3.0 * mean {
                rate = None;
            }
        }
        rates.push(RateSample {
            epoch,
            amphr_per_day: rate,
        });
    }
    rates
}

/// Nominal amp-hour capacity by asset and battery pack. The Pioneer 564 and
/// 583 hulls carry the extended packs.
pub fn battery_capacity(glider: &str, battery_type: &str) -> f64 {
    let ref_des = glider.to_uppercase();
    let extended_hull = ref_des.contains("564") || ref_des.contains("583");
    if ref_des.contains("CP") {
        if battery_type == "4s" {
            if extended_hull {
                800.0
            } else {
                550.0
            }
        } else if extended_hull {
            1050.0
        } else {
            720.0
        }
    } else if battery_type == "3s" {
        1050.0
    } else {
        800.0
    }
}

/// Battery figures of one deployment, all rounded to two decimals.
#[derive(Debug, Clone, PartialEq)]
pub struct BatterySummary {
    pub glider: String,
    pub deployment: u32,
    pub battery_type: String,
    pub nominal_capacity: f64,
    pub amphr_low: f64,
    pub amphr_high: f64,
    pub amphr_spent: f64,
    pub amphr_available: f64,
    pub expected_duration_days: i64,
    pub max_rate: f64,
    pub days_deployed: f64,
    pub actual_rate: f64,
    pub amphr_remaining_at_recovery: f64,
    pub days_remaining_at_recovery: f64,
}

pub fn summarize(deployment: &BatteryDeployment, series: &[(i64, f64)]) -> Result<BatterySummary> {
    if series.is_empty() {
        bail!(
            "no amphr samples for {} D{:05}",
            deployment.glider,
            deployment.deployment
        );
    }
    let amphr_high = series.iter().map(|&(_, v)| v).fold(f64::MIN, f64::max);
    let amphr_low = series.iter().map(|&(_, v)| v).fold(f64::MAX, f64::min);
    let first_epoch = series.iter().map(|&(e, _)| e).min().unwrap_or(0);
    let last_epoch = series.iter().map(|&(e, _)| e).max().unwrap_or(0);

    let nominal_capacity = battery_capacity(&deployment.glider, &deployment.battery_type);
    let amphr_available = round2(nominal_capacity - amphr_low);
    let expected_duration_days = deployment.expected_duration_days();
    if expected_duration_days <= 0 {
        bail!(
            "bad expected duration for {} D{:05}",
            deployment.glider,
            deployment.deployment
        );
    }
    let days_deployed = round2((last_epoch - first_epoch) as f64 / 86_400.0);
    if days_deployed <= 0.0 {
        bail!(
            "deployment {} D{:05} spans no time",
            deployment.glider,
            deployment.deployment
        );
    }
    let actual_rate = round2((amphr_high - amphr_low) / days_deployed);
    let amphr_remaining_at_recovery = round2(nominal_capacity - amphr_high);

    Ok(BatterySummary {
        glider: deployment.glider.clone(),
        deployment: deployment.deployment,
        battery_type: deployment.battery_type.clone(),
        nominal_capacity,
        amphr_low,
        amphr_high,
        amphr_spent: round2(amphr_high - amphr_low),
        amphr_available,
        expected_duration_days,
        max_rate: round2(amphr_available / expected_duration_days as f64),
        days_deployed,
        actual_rate,
        amphr_remaining_at_recovery,
        days_remaining_at_recovery: round2(amphr_remaining_at_recovery / actual_rate),
    })
}

impl BatterySummary {
    /// The stats block of the deployment report.
    pub fn report(&self) -> String {
        [
            format!("{} D{:05} Battery Stats", self.glider, self.deployment),
            String::new(),
            format!("{} Batteries", self.battery_type),
            format!("Nominal amphr available: {}", self.nominal_capacity),
            format!("Actual amphr spent at deployment: {}", self.amphr_low),
            format!("Actual amphr available for deployment: {}", self.amphr_available),
            format!(
                "Expected deployment duration: {} days",
                self.expected_duration_days
            ),
            format!("Max amphr/day allowed for deployment: {}", self.max_rate),
            String::new(),
            format!("Actual days deployed: {}", self.days_deployed),
            format!("Actual amphr spent at recovery: {}", self.amphr_high),
            format!("Actual amphr spent for deployment: {}", self.amphr_spent),
            format!("Actual amphr/day for deployment: {}", self.actual_rate),
            format!(
                "Estimated amphr remaining at recovery: {}",
                self.amphr_remaining_at_recovery
            ),
            format!(
                "Estimated days remaining at recovery: {}",
                self.days_remaining_at_recovery
            ),
        ]
        .join("\n")
    }
}

/// Writes the rolling-rate series next to the flat maximum-rate line the
/// deployment was planned against. Discarded rates leave their cell empty.
pub fn write_rates(
    rates: &[RateSample],
    ideal_rate: f64,
    csv_path: &Path,
) -> Result<()> {
    let mut writer = csv::Writer::from_path(csv_path)?;
    writer.write_record(["Datetime", "Amphr_per_day", "Max_rate"])?;
    for rate in rates {
        writer.write_record(&[
            rate.epoch.to_string(),
            rate.amphr_per_day.map(|r| r.to_string()).unwrap_or_default(),
            ideal_rate.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// Runs battery stats for every deployment in the metadata export. The
/// amphr series of each deployment is read from
/// `<data_dir>/<glider>_D<n>_amphr.csv`; a deployment whose series is
/// missing or degenerate is reported and skipped.
pub fn process_fleet(
    metadata_csv: &Path,
    data_dir: &Path,
    output_dir: &Path,
) -> Result<Vec<PathBuf>> {
    let deployments = deployments::load_battery_deployments(metadata_csv)?;
    fs::create_dir_all(output_dir)?;
    let mut reports = Vec::new();
    for deployment in &deployments {
        let tag = format!("{}-D{:05}", deployment.glider, deployment.deployment);
        let series_path = data_dir.join(format!(
            "{}_D{:05}_amphr.csv",
            deployment.glider, deployment.deployment
        ));
        let result = load_amphr_series(&series_path)
            .and_then(|series| {
                let summary = summarize(deployment, &series)?;
                Ok((series, summary))
            })
            .with_context(|| format!("{tag} didn't work"));
        let (series, summary) = match result {
            Ok(parts) => parts,
            Err(err) => {
                warn!("{:#}", err);
                continue;
            }
        };

        let report_path = output_dir.join(format!("{tag}_battery_stats.txt"));
        fs::write(&report_path, summary.report())?;
        let rates = rolling_rate(&series, RATE_WINDOW_SECONDS);
        let ideal_rate = summary.amphr_available / summary.expected_duration_days as f64;
        write_rates(
            &rates,
            ideal_rate,
            &output_dir.join(format!("{tag}_battery_rates.csv")),
        )?;
        info!("battery stats for {} -> {:?}", tag, report_path);
        reports.push(report_path);
    }
    Ok(reports)
}
