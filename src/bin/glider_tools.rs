use std::path::PathBuf;

use anyhow::Result;
use chrono::Utc;
use clap::{Parser, Subcommand};

use glider_tools::extraction::{self, ExtractOptions};
use glider_tools::forecast::{self, Array, Model, ModelRun};
use glider_tools::sst::{self, ImageKind};
use glider_tools::{archive, battery, logs, transects};

#[derive(Debug, Parser)]
#[clap(name = "glider_tools", version = clap::crate_version!())]
struct GliderTools {
    /// Also keep rotating log files under this directory
    #[clap(long)]
    log_dir: Option<String>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Mine one deployment's dockserver logs into its extraction CSV
    Extract {
        /// Full asset name, e.g. CP05MOAS-GL376
        #[clap(long)]
        glider: String,

        #[clap(long)]
        deployment: u32,

        /// Directory of raw *.log dockserver files
        #[clap(long)]
        logs_dir: PathBuf,

        /// Deployment-window CSV for this glider
        #[clap(long)]
        deployments_csv: PathBuf,

        /// Science switch-off CSV; without it science counts as always on
        #[clap(long)]
        science_csv: Option<PathBuf>,

        /// Root the per-deployment and per-line CSVs are written under
        #[clap(long)]
        output_root: PathBuf,
    },

    /// Count completed patrol-line transects across every extraction CSV
    Transects {
        #[clap(long)]
        output_root: PathBuf,
    },

    /// Concatenate each line's extraction CSVs into one combined CSV
    Combine {
        #[clap(long)]
        output_root: PathBuf,
    },

    /// Build the Google Earth track archive of past deployments
    Archive {
        /// Root of the raw-data mirror, <raw>/<glider>/D00001/logs
        #[clap(long)]
        raw_dir: PathBuf,

        /// Cruise config JSON
        #[clap(long)]
        config: PathBuf,

        #[clap(long, default_value = "Archive.kml")]
        output: PathBuf,
    },

    /// Place recent glider positions on the SST image pixel grids
    SstMap {
        #[clap(long)]
        images_dir: PathBuf,

        /// Root of the per-glider dockserver log mirrors
        #[clap(long)]
        logs_root: PathBuf,

        /// Image family, composite or hourly
        #[clap(long, default_value_t = ImageKind::Composite)]
        kind: ImageKind,

        /// How many days back an image is still worth annotating
        #[clap(long, default_value_t = sst::DEFAULT_LOOKBACK_DAYS)]
        days: u32,

        /// Glider to place, repeatable; defaults to the monitored fleet
        #[clap(long = "glider")]
        gliders: Vec<String>,

        #[clap(long, default_value = "placements.csv")]
        output: PathBuf,
    },

    /// Battery endurance stats for every deployment in the metadata export
    Battery {
        #[clap(long)]
        metadata_csv: PathBuf,

        /// Directory of per-deployment coulomb-counter CSVs
        #[clap(long)]
        data_dir: PathBuf,

        #[clap(long)]
        output_dir: PathBuf,
    },

    /// Print the NOMADS dataset URL for a model run
    ForecastUrl {
        /// nww3, rtofs or gfs
        #[clap(long)]
        model: Model,

        /// Run day YYYYMMDD; defaults to today UTC
        #[clap(long)]
        day: Option<String>,

        /// Run hour 00/06/12/18; defaults to the latest published
        #[clap(long)]
        run: Option<String>,
    },

    /// Render the wave-conditions outlook from an averaged series CSV
    WaveReport {
        /// irminger, pioneer or papa
        #[clap(long)]
        array: Array,

        /// CSV with offset_hours, height_m and period_s columns
        #[clap(long)]
        series_csv: PathBuf,

        /// Model run day YYYYMMDD; defaults to today UTC
        #[clap(long)]
        day: Option<String>,

        /// Run hour; defaults to the latest published
        #[clap(long)]
        run: Option<String>,
    },
}

fn main() -> Result<()> {
    let opts = GliderTools::parse();
    logs::init(opts.log_dir.as_deref())?;

    match opts.command {
        Command::Extract {
            glider,
            deployment,
            logs_dir,
            deployments_csv,
            science_csv,
            output_root,
        } => {
            extraction::extract_deployment(&ExtractOptions {
                glider_name: &glider,
                deployment,
                logs_dir: &logs_dir,
                deployments_csv: &deployments_csv,
                science_csv: science_csv.as_deref(),
                output_root: &output_root,
            })?;
        }
        Command::Transects { output_root } => {
            transects::survey_transects(&output_root)?;
        }
        Command::Combine { output_root } => {
            transects::combine_all(&output_root)?;
        }
        Command::Archive {
            raw_dir,
            config,
            output,
        } => {
            archive::archive_fleet(&raw_dir, &config, &output)?;
        }
        Command::SstMap {
            images_dir,
            logs_root,
            kind,
            days,
            gliders,
            output,
        } => {
            let gliders = if gliders.is_empty() {
                sst::DEFAULT_GLIDERS.iter().map(|g| g.to_string()).collect()
            } else {
                gliders
            };
            let today = Utc::now().date_naive();
            let placements = sst::map_fleet(&images_dir, &logs_root, &gliders, kind, today, days)?;
            sst::write_placements(&placements, &output)?;
        }
        Command::Battery {
            metadata_csv,
            data_dir,
            output_dir,
        } => {
            battery::process_fleet(&metadata_csv, &data_dir, &output_dir)?;
        }
        Command::ForecastUrl { model, day, run } => {
            let mut model_run = ModelRun::at(model, Utc::now());
            if let Some(day) = day {
                model_run.day = day;
            }
            if let Some(run) = run {
                model_run.run = run;
            }
            println!("{}", model_run.url());
        }
        Command::WaveReport {
            array,
            series_csv,
            day,
            run,
        } => {
            let now = Utc::now();
            let day = day.unwrap_or_else(|| now.format("%Y%m%d").to_string());
            let run = run.unwrap_or_else(|| {
                forecast::run_hour_for(chrono::Timelike::hour(&now)).to_string()
            });
            let samples = forecast::load_wave_series(&series_csv)?;
            let report = forecast::wave_report(array, &day, &run, &samples);
            print!("{}", report.render());
        }
    }
    Ok(())
}
