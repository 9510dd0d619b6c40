use serde::Serialize;

use crate::constants::RADIUS_PER_MAGNITUDE;
use crate::feed::EarthquakeRecord;

/// Fill colors for the six depth bands, deepest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DepthColor {
    Red,
    Tomato,
    Orange,
    Yellow,
    YellowGreen,
    Green,
}

impl DepthColor {
    /// CSS color name understood by Leaflet and the browser.
    pub fn css_name(self) -> &'static str {
        match self {
            DepthColor::Red => "red",
            DepthColor::Tomato => "tomato",
            DepthColor::Orange => "orange",
            DepthColor::Yellow => "yellow",
            DepthColor::YellowGreen => "yellowgreen",
            DepthColor::Green => "green",
        }
    }

    /// Position in `DEPTH_BANDS`; 0 is the deepest (most intense) band.
    pub fn band_index(self) -> usize {
        DEPTH_BANDS
            .iter()
            .position(|band| band.color == self)
            .unwrap_or(DEPTH_BANDS.len() - 1)
    }
}

impl std::fmt::Display for DepthColor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.css_name())
    }
}

/// One depth range: `low < depth <= high`. Open ends are `None`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DepthBand {
    pub color: DepthColor,
    pub label: &'static str,
    pub low_km: Option<f64>,
    pub high_km: Option<f64>,
}

impl DepthBand {
    pub fn contains(&self, depth: f64) -> bool {
        let above_low = self.low_km.map_or(true, |low| depth > low);
        let within_high = self.high_km.map_or(true, |high| depth <= high);
        above_low && within_high
    }
}

/// Single source for both the color lookup and the legend.
/// Labels are the ones shown in the legend, as published.
pub const DEPTH_BANDS: [DepthBand; 6] = [
    DepthBand {
        color: DepthColor::Red,
        label: "200+",
        low_km: Some(200.0),
        high_km: None,
    },
    DepthBand {
        color: DepthColor::Tomato,
        label: "200-10",
        low_km: Some(100.0),
        high_km: Some(200.0),
    },
    DepthBand {
        color: DepthColor::Orange,
        label: "100-50",
        low_km: Some(50.0),
        high_km: Some(100.0),
    },
    DepthBand {
        color: DepthColor::Yellow,
        label: "50-25",
        low_km: Some(25.0),
        high_km: Some(50.0),
    },
    DepthBand {
        color: DepthColor::YellowGreen,
        label: "25-10",
        low_km: Some(10.0),
        high_km: Some(25.0),
    },
    DepthBand {
        color: DepthColor::Green,
        label: "< 10",
        low_km: None,
        high_km: Some(10.0),
    },
];

/// Maps a hypocenter depth (km) to its band color.
///
/// Comparisons are strict-greater on the lower bound, so a depth sitting exactly
/// on a threshold belongs to the shallower band. Negative depths are green,
/// and so is NaN, which no band contains.
pub fn color_for_depth(depth: f64) -> DepthColor {
    DEPTH_BANDS
        .iter()
        .find(|band| band.contains(depth))
        .map(|band| band.color)
        .unwrap_or(DepthColor::Green)
}

/// Circle radius for a magnitude. Linear and unclamped: zero or negative
/// magnitudes give a zero or negative radius, which callers must guard.
pub fn radius_for_magnitude(magnitude: f64) -> f64 {
    magnitude * RADIUS_PER_MAGNITUDE
}

/// Visual encoding of one event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MarkerStyle {
    pub color: DepthColor,
    pub radius: f64,
    /// (latitude, longitude), the order Leaflet takes.
    pub position: (f64, f64),
}

impl MarkerStyle {
    pub fn for_record(record: &EarthquakeRecord) -> Self {
        Self {
            color: color_for_depth(record.depth),
            radius: radius_for_magnitude(record.magnitude),
            position: (record.latitude, record.longitude),
        }
    }
}
