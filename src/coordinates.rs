use anyhow::Result;

use crate::utils::round3;

/// Digit pattern a glider reports when the GPS never acquired. Different
/// firmware revisions pad it to different lengths (`6969.6969`,
/// `69696969.000`), all of them contain this run once punctuation is
/// stripped.
const NO_FIX_DIGITS: &str = "696969";

pub fn is_no_fix(value: &str) -> bool {
    let digits: String = value.chars().filter(|c| c.is_ascii_digit()).collect();
    digits.contains(NO_FIX_DIGITS)
}

/// Converts a degree-minute string (`DDMM.mmm`, sign leading) to signed
/// decimal degrees rounded to three decimals.
///
/// `Ok(None)` is the no-fix sentinel. `Err` means the value is not a
/// coordinate at all (empty, `No match.`, truncated garbage); callers in the
/// batch pipelines substitute their invalid marker instead of aborting.
pub fn parse_degree_minutes(raw: &str) -> Result<Option<f64>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        bail!("empty degree-minute value");
    }
    if is_no_fix(trimmed) {
        return Ok(None);
    }
    let value: f64 = trimmed
        .parse()
        .map_err(|_| anyhow!("not a degree-minute value: {:?}", trimmed))?;
    let degrees = (value / 100.0).trunc();
    let minutes = round3(value - degrees * 100.0).abs() / 60.0;
    let decimal = round3(degrees.abs() + minutes);
    if value < 0.0 {
        Ok(Some(-decimal))
    } else {
        Ok(Some(decimal))
    }
}

/// A surfacing position. Either both coordinates parsed, or the fix is
/// invalid as a whole. There is no partially-valid state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Position {
    LatLon { lat: f64, lon: f64 },
    NoFix,
}

impl Position {
    /// Builds a position from the two degree-minute strings of a GPS fix.
    /// A no-fix sentinel in either coordinate invalidates the whole fix.
    pub fn from_fix(lat: &str, lon: &str) -> Result<Position> {
        match (parse_degree_minutes(lat)?, parse_degree_minutes(lon)?) {
            (Some(lat), Some(lon)) => Ok(Position::LatLon { lat, lon }),
            _ => Ok(Position::NoFix),
        }
    }

    pub fn lat_lon(&self) -> Option<(f64, f64)> {
        match self {
            Position::LatLon { lat, lon } => Some((*lat, *lon)),
            Position::NoFix => None,
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, Position::LatLon { .. })
    }
}
