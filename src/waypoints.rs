use geo::algorithm::line_measures::metric_spaces::Geodesic;
use geo::Distance;
use geo_types::Point;
use strum_macros::{Display, EnumIter, EnumString};

use crate::coordinates::Position;

/// A glider is "at" a waypoint while it is inside this radius.
pub const ARRIVAL_THRESHOLD_M: f64 = 10_000.0;

/// The patrol lines the fleet runs off the shelf break. Deployment notes
/// name them by these strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, EnumString)]
pub enum PatrolLine {
    #[strum(serialize = "EB")]
    Eb,
    #[strum(serialize = "FZ")]
    Fz,
    #[strum(serialize = "SS-1")]
    Ss1,
    #[strum(serialize = "SS-2")]
    Ss2,
}

/// A named corner of a patrol line. Longitudes are signed, west negative.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Waypoint {
    pub line: PatrolLine,
    pub label: &'static str,
    pub lat: f64,
    pub lon: f64,
}

const fn wpt(line: PatrolLine, label: &'static str, lat: f64, lon: f64) -> Waypoint {
    Waypoint {
        line,
        label,
        lat,
        lon,
    }
}

const FZ_CORNERS: [Waypoint; 4] = [
    wpt(PatrolLine::Fz, "SE", 39.833, -70.375),
    wpt(PatrolLine::Fz, "NE", 40.083, -70.375),
    wpt(PatrolLine::Fz, "NW", 40.083, -71.167),
    wpt(PatrolLine::Fz, "SW", 39.833, -71.167),
];

const EB_CORNERS: [Waypoint; 6] = [
    wpt(PatrolLine::Eb, "SE", 39.833, -70.000),
    wpt(PatrolLine::Eb, "mid_E", 39.967, -70.000),
    wpt(PatrolLine::Eb, "N", 40.400, -70.000),
    wpt(PatrolLine::Eb, "W", 40.083, -70.190),
    wpt(PatrolLine::Eb, "mid_W", 39.967, -70.190),
    wpt(PatrolLine::Eb, "SW", 39.833, -70.190),
];

const SS1_CORNERS: [Waypoint; 6] = [
    wpt(PatrolLine::Ss1, "SE", 39.333, -70.000),
    wpt(PatrolLine::Ss1, "NE", 39.833, -70.000),
    wpt(PatrolLine::Ss1, "mid_S", 39.333, -70.583),
    wpt(PatrolLine::Ss1, "NW", 39.833, -71.167),
    wpt(PatrolLine::Ss1, "SW", 39.333, -71.167),
    wpt(PatrolLine::Ss1, "mid_N", 39.833, -70.583),
];

const SS2_CORNERS: [Waypoint; 6] = [
    wpt(PatrolLine::Ss2, "SE", 39.333, -70.292),
    wpt(PatrolLine::Ss2, "mid_E", 39.583, -70.000),
    wpt(PatrolLine::Ss2, "NE", 39.833, -70.292),
    wpt(PatrolLine::Ss2, "SW", 39.333, -70.875),
    wpt(PatrolLine::Ss2, "mid_W", 39.583, -71.167),
    wpt(PatrolLine::Ss2, "NW", 39.833, -70.875),
];

impl PatrolLine {
    /// Corner order is also the column order of the extraction CSV.
    pub fn corners(&self) -> &'static [Waypoint] {
        match self {
            PatrolLine::Fz => &FZ_CORNERS,
            PatrolLine::Eb => &EB_CORNERS,
            PatrolLine::Ss1 => &SS1_CORNERS,
            PatrolLine::Ss2 => &SS2_CORNERS,
        }
    }

    /// The legs a glider runs on this line, as (from, to) corner labels.
    /// The trailing self-leg counts station-keeping visits at the SE corner.
    pub fn legs(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            PatrolLine::Eb => &[
                ("SW", "SE"),
                ("SE", "mid_E"),
                ("mid_E", "N"),
                ("N", "W"),
                ("W", "mid_W"),
                ("mid_W", "SW"),
                ("SE", "SE"),
            ],
            PatrolLine::Fz => &[
                ("SW", "SE"),
                ("SE", "NE"),
                ("NE", "NW"),
                ("NW", "SW"),
                ("SE", "SE"),
            ],
            PatrolLine::Ss1 => &[
                ("SE", "NE"),
                ("NE", "mid_S"),
                ("mid_S", "NW"),
                ("NW", "SW"),
                ("SW", "mid_N"),
                ("mid_N", "SE"),
                ("SE", "SE"),
            ],
            PatrolLine::Ss2 => &[
                ("SE", "mid_E"),
                ("mid_E", "NE"),
                ("NE", "SW"),
                ("SW", "mid_W"),
                ("mid_W", "NW"),
                ("NW", "SE"),
                ("SE", "SE"),
            ],
        }
    }

    /// Maps the first comma-field of a deployment notes cell to a line.
    pub fn from_notes(notes: &str) -> Option<PatrolLine> {
        use strum::IntoEnumIterator;
        let field = notes.split(',').next().unwrap_or("").trim();
        PatrolLine::iter().find(|line| field.contains(&line.to_string()))
    }
}

pub fn distance_column(label: &str) -> String {
    format!("Distance_to_{label}_WPT")
}

pub fn flag_column(label: &str) -> String {
    format!("AT_{}_WPT", label.to_uppercase())
}

/// WGS84 ellipsoidal distance in meters.
pub fn geodesic_distance_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    Geodesic.distance(Point::new(lon1, lat1), Point::new(lon2, lat2))
}

#[derive(Debug, Clone, Copy)]
pub struct Proximity {
    pub waypoint: Waypoint,
    /// `None` when the position had no fix; rendered as `n/a` downstream.
    pub distance_m: Option<f64>,
    pub arrived: bool,
}

/// Distance and arrival flag for every corner of a line, in corner order.
/// An invalid position produces no distances and no arrivals, never numbers
/// computed from placeholder coordinates.
pub fn classify(position: &Position, line: PatrolLine) -> Vec<Proximity> {
    line.corners()
        .iter()
        .map(|waypoint| match position.lat_lon() {
            Some((lat, lon)) => {
                let distance = geodesic_distance_m(lat, lon, waypoint.lat, waypoint.lon);
                Proximity {
                    waypoint: *waypoint,
                    distance_m: Some(distance),
                    arrived: distance < ARRIVAL_THRESHOLD_M,
                }
            }
            None => Proximity {
                waypoint: *waypoint,
                distance_m: None,
                arrived: false,
            },
        })
        .collect()
}
