//! Equirectangular projection of threat coordinates onto a fixed viewport.

use crate::severity::Severity;
use crate::telemetry::GeoThreatPoint;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Viewport the map is drawn into.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 400.0,
        }
    }
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Projects latitude/longitude into viewport coordinates.
///
/// `(90, -180)` lands on the top-left corner and `(-90, 180)` on the
/// bottom-right one.
pub fn project(lat: f64, lng: f64, viewport: Viewport) -> (f64, f64) {
    let x = (lng + 180.0) / 360.0 * viewport.width;
    let y = (90.0 - lat) / 180.0 * viewport.height;
    (x, y)
}

/// [`project`] onto the default 800x400 viewport.
pub fn project_default(lat: f64, lng: f64) -> (f64, f64) {
    project(lat, lng, Viewport::default())
}

/// Summary tiles shown under the threat map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GeoSummary {
    pub active_threats: usize,
    pub critical: usize,
    pub high: usize,
    pub countries: usize,
}

impl GeoSummary {
    pub fn from_points(points: &[GeoThreatPoint]) -> Self {
        let countries: HashSet<&str> = points.iter().map(|p| p.country.as_str()).collect();
        Self {
            active_threats: points.len(),
            critical: points
                .iter()
                .filter(|p| p.severity == Severity::Critical)
                .count(),
            high: points.iter().filter(|p| p.severity == Severity::High).count(),
            countries: countries.len(),
        }
    }
}
