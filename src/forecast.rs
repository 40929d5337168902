use std::path::Path;

use anyhow::Result;
use chrono::{DateTime, Timelike, Utc};
use itertools::iproduct;
use serde::Deserialize;
use strum_macros::{Display, EnumIter, EnumString};

pub const NOMADS_BASE: &str = "https://nomads.ncep.noaa.gov:9090/dods/";

/// Model runs published per day, UTC.
pub const RUN_HOURS: [&str; 4] = ["00", "06", "12", "18"];

/// Feet per meter, for wave heights reported to the pilots.
pub const FEET_PER_METER: f64 = 3.28084;

/// Wave height (ft) to period (s) ratio above which piloting gets dicey.
pub const CAUTION_RATIO: f64 = 2.0;

/// NOMADS publishes forecast steps on a three hour cadence.
pub const FORECAST_STEP_HOURS: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, EnumString)]
pub enum Model {
    #[strum(serialize = "nww3")]
    Nww3,
    #[strum(serialize = "rtofs")]
    Rtofs,
    #[strum(serialize = "gfs")]
    Gfs,
}

/// One forecast variable of a model, with its color scale for maps.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Parameter {
    pub name: &'static str,
    pub description: &'static str,
    pub units: &'static str,
    pub plot_min: f64,
    pub plot_max: f64,
}

const fn param(
    name: &'static str,
    description: &'static str,
    units: &'static str,
    plot_min: f64,
    plot_max: f64,
) -> Parameter {
    Parameter {
        name,
        description,
        units,
        plot_min,
        plot_max,
    }
}

const NWW3_PARAMETERS: [Parameter; 11] = [
    param("dirpwsfc", "primary wave direction", "deg", 0.0, 0.0),
    param("dirswsfc", "secondary wave direction", "deg", 0.0, 0.0),
    param(
        "htsgwsfc",
        "significant height of combined wind waves and swell",
        "m",
        0.0,
        14.0,
    ),
    param("perpwsfc", "primary wave mean period", "s", 0.0, 10.0),
    param("perswsfc", "secondary wave mean period", "s", 0.0, 0.0),
    param("ugrdsfc", "u-component of wind", "m/s", 0.0, 0.0),
    param("vgrdsfc", "v-component of wind", "m/s", 0.0, 0.0),
    param("wdirsfc", "wind direction (from which blowing)", "deg", 0.0, 0.0),
    param("windsfc", "wind speed", "m/s", 0.0, 25.0),
    param("wvdirsfc", "direction of wind waves", "deg", 0.0, 0.0),
    param("wvpersfc", "mean period of wind waves", "s", 0.0, 0.0),
];

const RTOFS_PARAMETERS: [Parameter; 3] = [
    param("ssh", "sea surface elevation", "m", -2.0, 2.0),
    param("ice_coverage", "ice coverage", "fraction covered", 0.0, 1.0),
    param("sea_ice_thickness", "sea ice thickness", "m", 0.0, 5.0),
];

const GFS_PARAMETERS: [Parameter; 2] = [
    param("apcpsfc", "surface total precipitation", "kg/m^2", 0.0, 10.0),
    param("tmpsfc", "surface temperature", "k", 0.0, 100.0),
];

impl Model {
    pub fn full_name(&self) -> &'static str {
        match self {
            Model::Nww3 => "NOAA WAVEWATCH III",
            Model::Rtofs => "RTOFS Global",
            Model::Gfs => "Global Forecast System",
        }
    }

    pub fn parameters(&self) -> &'static [Parameter] {
        match self {
            Model::Nww3 => &NWW3_PARAMETERS,
            Model::Rtofs => &RTOFS_PARAMETERS,
            Model::Gfs => &GFS_PARAMETERS,
        }
    }

    pub fn parameter(&self, name: &str) -> Option<&'static Parameter> {
        self.parameters().iter().find(|p| p.name == name)
    }

    /// OPeNDAP dataset URL for one run day. The RTOFS diagnostic set is
    /// published once per day and takes no run hour.
    pub fn dataset_url(&self, day: &str, run: &str) -> String {
        match self {
            Model::Nww3 => format!("{NOMADS_BASE}wave/nww3/nww3{day}/nww3{day}_{run}z"),
            Model::Rtofs => {
                format!("{NOMADS_BASE}rtofs/rtofs_global{day}/rtofs_glo_2ds_forecast_3hrly_diag")
            }
            Model::Gfs => format!("{NOMADS_BASE}gfs_0p25/gfs{day}/gfs_0p25_{run}z"),
        }
    }
}

/// Latest run hour already published at the given UTC hour of day.
pub fn run_hour_for(hour: u32) -> &'static str {
    match hour {
        0..=5 => "00",
        6..=11 => "06",
        12..=17 => "12",
        _ => "18",
    }
}

/// One dated run of a model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelRun {
    pub model: Model,
    pub day: String,
    pub run: String,
}

impl ModelRun {
    /// The latest run available at `moment`.
    pub fn at(model: Model, moment: DateTime<Utc>) -> ModelRun {
        ModelRun {
            model,
            day: moment.format("%Y%m%d").to_string(),
            run: run_hour_for(moment.hour()).to_string(),
        }
    }

    pub fn url(&self) -> String {
        self.model.dataset_url(&self.day, &self.run)
    }
}

/// The moored arrays the fleet operates around.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum Array {
    Irminger,
    Pioneer,
    Papa,
}

/// A lat/lon box on a model grid. Longitudes follow the NOMADS grids,
/// 0..360 east of Greenwich.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridBounds {
    pub lon_min: f64,
    pub lon_max: f64,
    pub lat_min: f64,
    pub lat_max: f64,
}

const fn bounds(lon_min: f64, lon_max: f64, lat_min: f64, lat_max: f64) -> GridBounds {
    GridBounds {
        lon_min,
        lon_max,
        lat_min,
        lat_max,
    }
}

impl Array {
    /// Map frame drawn around the array.
    pub fn mapping_bounds(&self) -> GridBounds {
        match self {
            Array::Irminger => bounds(301.0, 347.0, 53.0, 73.0),
            Array::Pioneer => bounds(280.0, 300.0, 35.0, 45.0),
            Array::Papa => bounds(200.0, 230.0, 40.0, 60.0),
        }
    }

    /// Tight box the condition averages are taken over.
    pub fn averaging_bounds(&self) -> GridBounds {
        match self {
            Array::Irminger => bounds(318.0, 322.0, 58.0, 60.0),
            Array::Pioneer => bounds(289.0, 291.0, 39.0, 41.0),
            Array::Papa => bounds(215.0, 217.0, 49.0, 51.0),
        }
    }
}

/// A gridded forecast series: one row-major `lats x lons` slab per time
/// step, already pulled off the model.
#[derive(Debug, Clone, PartialEq)]
pub struct GridSeries {
    pub lats: Vec<f64>,
    pub lons: Vec<f64>,
    pub steps: Vec<Vec<f64>>,
}

impl GridSeries {
    /// Mean over the cells strictly inside `bounds`, one value per time
    /// step. Non-finite cells (land fill) are left out of the mean.
    pub fn average_over(&self, bounds: &GridBounds) -> Result<Vec<f64>> {
        let lat_cells: Vec<usize> = self
            .lats
            .iter()
            .enumerate()
            .filter(|(_, &lat)| lat > bounds.lat_min && lat < bounds.lat_max)
            .map(|(i, _)| i)
            .collect();
        let lon_cells: Vec<usize> = self
            .lons
            .iter()
            .enumerate()
            .filter(|(_, &lon)| lon > bounds.lon_min && lon < bounds.lon_max)
            .map(|(j, _)| j)
            .collect();
        if lat_cells.is_empty() || lon_cells.is_empty() {
            bail!("averaging bounds select no grid cells");
        }
        let mut means = Vec::with_capacity(self.steps.len());
        for (step, slab) in self.steps.iter().enumerate() {
            if slab.len() != self.lats.len() * self.lons.len() {
                bail!(
                    "time step {} holds {} cells, grid is {}x{}",
                    step,
                    slab.len(),
                    self.lats.len(),
                    self.lons.len()
                );
            }
            let mut sum = 0.0;
            let mut count = 0usize;
            for (&i, &j) in iproduct!(&lat_cells, &lon_cells) {
                let value = slab[i * self.lons.len() + j];
                if value.is_finite() {
                    sum += value;
                    count += 1;
                }
            }
            means.push(if count == 0 { f64::NAN } else { sum / count as f64 });
        }
        Ok(means)
    }
}

/// One averaged forecast step, as stored in the series CSV.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct WaveSample {
    pub offset_hours: u32,
    pub height_m: f64,
    pub period_s: f64,
}

pub fn load_wave_series(path: &Path) -> Result<Vec<WaveSample>> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut samples = Vec::new();
    for sample in reader.deserialize() {
        samples.push(sample?);
    }
    Ok(samples)
}

/// Zips parallel height/period series onto the forecast cadence.
pub fn three_hourly(heights_m: &[f64], periods_s: &[f64]) -> Result<Vec<WaveSample>> {
    if heights_m.len() != periods_s.len() {
        bail!(
            "height and period series differ in length, {} vs {}",
            heights_m.len(),
            periods_s.len()
        );
    }
    Ok(heights_m
        .iter()
        .zip(periods_s)
        .enumerate()
        .map(|(step, (&height_m, &period_s))| WaveSample {
            offset_hours: step as u32 * FORECAST_STEP_HOURS,
            height_m,
            period_s,
        })
        .collect())
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaveRow {
    pub offset_hours: u32,
    pub height_ft: f64,
    pub period_s: f64,
    pub ratio: f64,
}

impl WaveRow {
    pub fn caution(&self) -> bool {
        self.ratio >= CAUTION_RATIO
    }
}

/// The wave-conditions outlook for one array and model run.
#[derive(Debug, Clone, PartialEq)]
pub struct WaveReport {
    pub array: Array,
    pub day: String,
    pub run: String,
    pub rows: Vec<WaveRow>,
}

pub fn wave_report(array: Array, day: &str, run: &str, samples: &[WaveSample]) -> WaveReport {
    let rows = samples
        .iter()
        .map(|sample| {
            let height_ft = sample.height_m * FEET_PER_METER;
            WaveRow {
                offset_hours: sample.offset_hours,
                height_ft,
                period_s: sample.period_s,
                ratio: height_ft / sample.period_s,
            }
        })
        .collect();
    WaveReport {
        array,
        day: day.to_string(),
        run: run.to_string(),
        rows,
    }
}

impl WaveReport {
    pub fn title(&self) -> String {
        format!(
            "{} Predicted Wave Conditions\nModel run: {}T{}0000Z",
            self.array, self.day, self.run
        )
    }

    pub fn render(&self) -> String {
        let mut out = self.title();
        out.push_str("\n\nHours  Height(ft)  Period(s)  Ratio(ft/s)\n");
        for row in &self.rows {
            out.push_str(&format!(
                "{:>5}  {:>10.2}  {:>9.2}  {:>11.2}{}\n",
                row.offset_hours,
                row.height_ft,
                row.period_s,
                row.ratio,
                if row.caution() { "  *" } else { "" }
            ));
        }
        if self.rows.iter().any(WaveRow::caution) {
            out.push_str(&format!(
                "\n* height:period ratio at or above {CAUTION_RATIO} ft/s\n"
            ));
        }
        out
    }
}
