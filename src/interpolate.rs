//! Inverse-distance weighted reconstruction of a dense rain field from the
//! sparse sample grid.
//!
//! Distances are great-circle kilometres. A lattice cell that lands exactly
//! on a sample is not special-cased: its zero distance is clamped to
//! [`MIN_DISTANCE_KM`], so the sample dominates the weighted sum without
//! being copied verbatim.

use std::cmp::Ordering;

use crate::constants::{EARTH_RADIUS_KM, IDW_POWER, MIN_DISTANCE_KM};
use crate::error::PipelineError;
use crate::grid::linspace;
use crate::types::{Coordinate, InterpolatedCell, Observation};

/// Which observations contribute to each cell estimate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Strategy {
    /// Every observation weighs in on every cell.
    Global,
    /// Only the `k` closest observations weigh in.
    Nearest(usize),
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Bounds {
    min_lat: f64,
    max_lat: f64,
    min_lon: f64,
    max_lon: f64,
}

pub fn haversine_km(from: Coordinate, to: Coordinate) -> f64 {
    let lat_a = from.latitude.to_radians();
    let lat_b = to.latitude.to_radians();
    let d_lat = lat_b - lat_a;
    let d_lon = to.longitude.to_radians() - from.longitude.to_radians();
    let sin_lat = (d_lat / 2.0).sin();
    let sin_lon = (d_lon / 2.0).sin();
    let a = sin_lat * sin_lat + lat_a.cos() * lat_b.cos() * sin_lon * sin_lon;
    EARTH_RADIUS_KM * 2.0 * a.sqrt().asin()
}

fn observed_bounds(observations: &[Observation]) -> Option<Bounds> {
    let first = observations.first()?.coordinate;
    let initial = Bounds {
        min_lat: first.latitude,
        max_lat: first.latitude,
        min_lon: first.longitude,
        max_lon: first.longitude,
    };
    Some(observations.iter().fold(initial, |bounds, observation| {
        let c = observation.coordinate;
        Bounds {
            min_lat: bounds.min_lat.min(c.latitude),
            max_lat: bounds.max_lat.max(c.latitude),
            min_lon: bounds.min_lon.min(c.longitude),
            max_lon: bounds.max_lon.max(c.longitude),
        }
    }))
}

fn weighted_mean(pairs: &[(f64, f64)]) -> f64 {
    let (weighted_sum, weight_sum) =
        pairs
            .iter()
            .fold((0.0, 0.0), |(weighted_sum, weight_sum), &(distance, value)| {
                let weight = 1.0 / distance.powi(IDW_POWER);
                (weighted_sum + weight * value, weight_sum + weight)
            });
    weighted_sum / weight_sum
}

/// IDW estimate at `target`. `scratch` is reused across cells.
fn estimate(
    target: Coordinate,
    observations: &[Observation],
    strategy: Strategy,
    scratch: &mut Vec<(f64, f64)>,
) -> f64 {
    scratch.clear();
    scratch.extend(observations.iter().map(|observation| {
        let distance = haversine_km(target, observation.coordinate);
        let distance = if distance == 0.0 {
            MIN_DISTANCE_KM
        } else {
            distance
        };
        (distance, observation.rain)
    }));

    match strategy {
        Strategy::Global => weighted_mean(scratch),
        Strategy::Nearest(k) => {
            let k = k.clamp(1, scratch.len());
            if k < scratch.len() {
                scratch.select_nth_unstable_by(k - 1, |left, right| {
                    left.0.partial_cmp(&right.0).unwrap_or(Ordering::Equal)
                });
            }
            weighted_mean(&scratch[..k])
        }
    }
}

/// Estimates rain on a `density × density` lattice spanning the observed
/// bounding box. Cells are emitted latitude-major.
pub fn interpolate(
    observations: &[Observation],
    density: i64,
    strategy: Strategy,
) -> Result<Vec<InterpolatedCell>, PipelineError> {
    if density <= 0 {
        return Err(PipelineError::InvalidInput(format!(
            "density must be a positive integer, got {density}"
        )));
    }
    let density = usize::try_from(density)
        .map_err(|_| PipelineError::InvalidInput(format!("density {density} is too large")))?;
    let bounds = observed_bounds(observations).ok_or_else(|| {
        PipelineError::Computation("no observations to interpolate from".to_string())
    })?;

    let lats = linspace(bounds.min_lat, bounds.max_lat, density);
    let lons = linspace(bounds.min_lon, bounds.max_lon, density);

    let mut scratch = Vec::with_capacity(observations.len());
    let mut cells = Vec::with_capacity(density * density);
    for &lat in &lats {
        for &lon in &lons {
            let rain = estimate(Coordinate::new(lat, lon), observations, strategy, &mut scratch);
            if !rain.is_finite() {
                return Err(PipelineError::Computation(format!(
                    "non-finite estimate at ({lat}, {lon})"
                )));
            }
            cells.push(InterpolatedCell { lat, lon, rain });
        }
    }

    Ok(cells)
}
