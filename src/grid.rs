use crate::constants::{GRID_MAX_LAT, GRID_MAX_LON, GRID_MIN_LAT, GRID_MIN_LON};
use crate::error::PipelineError;
use crate::types::Coordinate;

/// `count` evenly spaced values from `start` to `stop`, both ends included.
/// A single value collapses to `start`.
pub fn linspace(start: f64, stop: f64, count: usize) -> Vec<f64> {
    match count {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (count - 1) as f64;
            (0..count)
                .map(|index| {
                    if index == count - 1 {
                        stop
                    } else {
                        start + step * index as f64
                    }
                })
                .collect()
        }
    }
}

/// Sample lattice over the fixed Mexico/Gulf bounds, latitude-major.
pub fn generate_grid(grid_size: i64) -> Result<Vec<Coordinate>, PipelineError> {
    if grid_size <= 0 {
        return Err(PipelineError::InvalidInput(format!(
            "grid_size must be a positive integer, got {grid_size}"
        )));
    }
    let size = usize::try_from(grid_size).map_err(|_| {
        PipelineError::InvalidInput(format!("grid_size {grid_size} is too large"))
    })?;

    let lats = linspace(GRID_MIN_LAT, GRID_MAX_LAT, size);
    let lons = linspace(GRID_MIN_LON, GRID_MAX_LON, size);

    Ok(lats
        .iter()
        .flat_map(|&lat| lons.iter().map(move |&lon| Coordinate::new(lat, lon)))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linspace_includes_both_endpoints() {
        let values = linspace(14.5, 32.75, 4);
        assert_eq!(values.len(), 4);
        assert_eq!(values[0], 14.5);
        assert_eq!(values[3], 32.75);
        assert!((values[1] - 20.583333333333332).abs() < 1e-12);
    }

    #[test]
    fn linspace_single_value_is_lower_bound() {
        assert_eq!(linspace(-118.0, -86.5, 1), vec![-118.0]);
    }

    #[test]
    fn grid_has_square_count_within_bounds() {
        for grid_size in 1..=12 {
            let grid = generate_grid(grid_size).unwrap();
            assert_eq!(grid.len(), (grid_size * grid_size) as usize);
            for coordinate in &grid {
                assert!((GRID_MIN_LAT..=GRID_MAX_LAT).contains(&coordinate.latitude));
                assert!((GRID_MIN_LON..=GRID_MAX_LON).contains(&coordinate.longitude));
            }
        }
    }

    #[test]
    fn grid_is_latitude_major() {
        let grid = generate_grid(3).unwrap();
        assert_eq!(grid[0], Coordinate::new(14.5, -118.0));
        assert_eq!(grid[1].latitude, 14.5);
        assert_eq!(grid[2], Coordinate::new(14.5, -86.5));
        assert!(grid[3].latitude > grid[2].latitude);
        assert_eq!(grid[3].longitude, -118.0);
        assert_eq!(grid[8], Coordinate::new(32.75, -86.5));
    }

    #[test]
    fn two_by_two_grid_hits_the_corners() {
        let grid = generate_grid(2).unwrap();
        assert_eq!(
            grid,
            vec![
                Coordinate::new(14.5, -118.0),
                Coordinate::new(14.5, -86.5),
                Coordinate::new(32.75, -118.0),
                Coordinate::new(32.75, -86.5),
            ]
        );
    }

    #[test]
    fn non_positive_grid_size_is_rejected() {
        assert!(matches!(
            generate_grid(0),
            Err(PipelineError::InvalidInput(_))
        ));
        assert!(matches!(
            generate_grid(-3),
            Err(PipelineError::InvalidInput(_))
        ));
    }
}
