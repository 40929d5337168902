use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use strum::IntoEnumIterator;

use crate::deployments;
use crate::waypoints::{self, PatrolLine};

/// One completed corner-to-corner run along a patrol line.
#[derive(Debug, Clone, PartialEq)]
pub struct Transect {
    /// 1-based count of this leg's completed runs within one deployment.
    pub number: u32,
    pub start_epoch: i64,
    pub end_epoch: i64,
    pub duration_days: f64,
    /// `AT_SW_WPT:AT_SE_WPT` style leg identifier.
    pub path: String,
}

#[derive(Debug, Clone)]
pub struct TransectRecord {
    pub glider: String,
    pub deployment: u32,
    pub line: PatrolLine,
    pub transect: Transect,
}

struct FlagRow {
    epoch: i64,
    science_on: bool,
    flags: Vec<bool>,
}

/// The arrival flags of one extraction CSV, rows in Datetime order.
pub struct FlagTable {
    columns: Vec<String>,
    rows: Vec<FlagRow>,
}

impl FlagTable {
    fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }
}

pub fn load_flag_table(path: &Path) -> Result<FlagTable> {
    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?.clone();
    let datetime_idx = headers
        .iter()
        .position(|h| h == "Datetime")
        .ok_or_else(|| anyhow!("no Datetime column in {:?}", path))?;
    let science_idx = headers
        .iter()
        .position(|h| h == "Science_on")
        .ok_or_else(|| anyhow!("no Science_on column in {:?}", path))?;
    let flag_indices: Vec<usize> = headers
        .iter()
        .enumerate()
        .filter(|(_, h)| h.starts_with("AT_") && h.ends_with("_WPT"))
        .map(|(i, _)| i)
        .collect();
    let columns: Vec<String> = flag_indices
        .iter()
        .map(|&i| headers[i].to_string())
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let epoch: i64 = record
            .get(datetime_idx)
            .unwrap_or("")
            .parse()
            .with_context(|| format!("bad Datetime in {:?}", path))?;
        let science_on = record.get(science_idx).unwrap_or("") == "1";
        let flags = flag_indices
            .iter()
            .map(|&i| record.get(i).unwrap_or("").trim() == "1")
            .collect();
        rows.push(FlagRow {
            epoch,
            science_on,
            flags,
        });
    }
    rows.sort_by_key(|r| r.epoch);
    Ok(FlagTable { columns, rows })
}

/// Walks one leg of the line. A run starts on the first unconsumed row where
/// the glider sits at the departure corner with science on, rides out that
/// dwell, and completes on the next arrival at the destination corner.
/// Running off the end of the record yields no run but still consumes the
/// rows, so a later start cannot reuse them.
pub fn count_leg_transects(
    table: &FlagTable,
    from_column: &str,
    to_column: &str,
) -> Result<Vec<Transect>> {
    let from = table
        .column_index(from_column)
        .ok_or_else(|| anyhow!("no {from_column} column"))?;
    let to = table
        .column_index(to_column)
        .ok_or_else(|| anyhow!("no {to_column} column"))?;
    let n = table.rows.len();
    let mut used = vec![false; n];
    let mut counter = 0;
    let mut transects = Vec::new();
    for index in 0..n {
        if !table.rows[index].science_on {
            continue;
        }
        if !table.rows[index].flags[from] || used[index] {
            continue;
        }
        let start = index;
        let mut cursor = index;
        while cursor < n && table.rows[cursor].flags[from] {
            cursor += 1;
        }
        while cursor < n && !table.rows[cursor].flags[to] {
            cursor += 1;
        }
        if cursor < n {
            counter += 1;
            let start_epoch = table.rows[start].epoch;
            let end_epoch = table.rows[cursor].epoch;
            transects.push(Transect {
                number: counter,
                start_epoch,
                end_epoch,
                duration_days: (end_epoch - start_epoch) as f64 / 86_400.0,
                path: format!("{from_column}:{to_column}"),
            });
        }
        for slot in used.iter_mut().take(cursor).skip(start) {
            *slot = true;
        }
    }
    Ok(transects)
}

fn line_extraction_files(dir: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().to_string();
        if name.ends_with(".csv") && !name.contains("Combined") && entry.path().is_file() {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}

fn deployment_from_file_name(name: &str) -> Result<(String, u32)> {
    let mut fields = name.split('_');
    let glider = fields
        .next()
        .ok_or_else(|| anyhow!("bad extraction file name: {name}"))?;
    let dfield = fields
        .next()
        .ok_or_else(|| anyhow!("bad extraction file name: {name}"))?;
    deployments::parse_deployment_ref(&format!("{glider}/{dfield}"))
}

/// Excel expects a byte-order mark on these CSVs.
fn bom_csv_writer(path: &Path) -> Result<csv::Writer<fs::File>> {
    let mut file = fs::File::create(path)?;
    file.write_all(b"\xef\xbb\xbf")?;
    Ok(csv::Writer::from_writer(file))
}

/// Counts every leg of every deployment filed under the per-line collection
/// directories and writes the fleet-wide `All_CGSN_Transects.csv`.
pub fn survey_transects(output_root: &Path) -> Result<PathBuf> {
    let mut records: Vec<TransectRecord> = Vec::new();
    for line in PatrolLine::iter() {
        let dir = output_root.join(format!("{line}_Gliders"));
        if !dir.is_dir() {
            warn!("no {:?}, skipping {} transects", dir, line);
            continue;
        }
        for name in line_extraction_files(&dir)? {
            let (glider_name, deployment) = deployment_from_file_name(&name)?;
            let serial = glider_name[glider_name.len().saturating_sub(3)..].to_string();
            let table = load_flag_table(&dir.join(&name))?;
            for (from_label, to_label) in line.legs() {
                let from_column = waypoints::flag_column(from_label);
                let to_column = waypoints::flag_column(to_label);
                for transect in count_leg_transects(&table, &from_column, &to_column)? {
                    records.push(TransectRecord {
                        glider: serial.clone(),
                        deployment,
                        line,
                        transect,
                    });
                }
            }
        }
    }

    let csv_path = output_root.join("All_CGSN_Transects.csv");
    let mut writer = bom_csv_writer(&csv_path)?;
    writer.write_record([
        "Glider",
        "Deployment",
        "Line",
        "Transect",
        "Transect_Start",
        "Transect_End",
        "Transect_Total_Time",
        "Path",
    ])?;
    for record in &records {
        writer.write_record(&[
            record.glider.clone(),
            record.deployment.to_string(),
            record.line.to_string(),
            record.transect.number.to_string(),
            record.transect.start_epoch.to_string(),
            record.transect.end_epoch.to_string(),
            record.transect.duration_days.to_string(),
            record.transect.path.clone(),
        ])?;
    }
    writer.flush()?;
    info!("{} transects -> {:?}", records.len(), csv_path);
    Ok(csv_path)
}

/// Stacks every extraction CSV of one line into `<line>_Gliders_Combined.csv`
/// next to its inputs. All inputs of a line share one schema; a header
/// mismatch means a stale or foreign file and aborts the stack.
pub fn combine_line(output_root: &Path, line: PatrolLine) -> Result<PathBuf> {
    let dir = output_root.join(format!("{line}_Gliders"));
    let names = line_extraction_files(&dir)?;
    if names.is_empty() {
        bail!("no extraction CSVs under {:?}", dir);
    }

    let csv_path = dir.join(format!("{line}_Gliders_Combined.csv"));
    let mut writer = bom_csv_writer(&csv_path)?;
    let mut expected: Option<csv::StringRecord> = None;
    let mut rows = 0;
    for name in &names {
        let mut reader = csv::Reader::from_path(dir.join(name))?;
        let headers = reader.headers()?.clone();
        match &expected {
            None => {
                writer.write_record(&headers)?;
                expected = Some(headers);
            }
            Some(expected) if *expected == headers => {}
            Some(_) => bail!("column mismatch in {:?}", dir.join(name)),
        }
        for record in reader.records() {
            writer.write_record(&record?)?;
            rows += 1;
        }
    }
    writer.flush()?;
    info!("combined {} rows from {} files -> {:?}", rows, names.len(), csv_path);
    Ok(csv_path)
}

pub fn combine_all(output_root: &Path) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();
    for line in PatrolLine::iter() {
        if !output_root.join(format!("{line}_Gliders")).is_dir() {
            continue;
        }
        written.push(combine_line(output_root, line)?);
    }
    Ok(written)
}
