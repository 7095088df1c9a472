//! Spatial interpolation of signal strength over the unit canvas.
//!
//! Estimates use Inverse Distance Weighting:
//! value = sum(v_i / d_i^p) / sum(1 / d_i^p)
//!
//! Every function here is pure. Degenerate input (no samples, a query sitting
//! on a sample, a zero kernel) maps to a fixed fallback rather than an error,
//! so a heat map can always be drawn.

use crate::coordinate::Coordinate;
use serde::Serialize;

/// Value reported where there is no data at all
pub const NO_DATA_RSSI: i32 = -90;

/// Queries closer than this to a sample return the sample's value exactly
pub const SNAP_DISTANCE: f64 = 0.01;

pub const DEFAULT_POWER: f64 = 2.0;
pub const DEFAULT_MAX_DISTANCE: f64 = 2.0;
pub const DEFAULT_KERNEL_SIZE: i32 = 3;

/// Number of nearest samples consulted for confidence estimates
pub const CONFIDENCE_NEIGHBORS: usize = 5;

/// A measured value at a known coordinate
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HeatMapPoint {
    pub coordinate: Coordinate,
    pub rssi: i32,
}

impl HeatMapPoint {
    pub fn new(coordinate: Coordinate, rssi: i32) -> Self {
        HeatMapPoint { coordinate, rssi }
    }
}

/// Rectangular grid of dBm estimates, `height` rows of `width` cells
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Grid {
    width: usize,
    height: usize,
    rows: Vec<Vec<i32>>,
}

impl Grid {
    pub fn filled(width: usize, height: usize, value: i32) -> Self {
        let width = if height == 0 { 0 } else { width };
        Grid {
            width,
            height,
            rows: vec![vec![value; width]; height],
        }
    }

    /// Build from rows; every row must have the same length
    pub fn from_rows(rows: Vec<Vec<i32>>) -> Option<Self> {
        let height = rows.len();
        let width = rows.first().map(|r| r.len()).unwrap_or(0);
        if rows.iter().any(|r| r.len() != width) {
            return None;
        }
        Some(Grid { width, height, rows })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn get(&self, row: usize, col: usize) -> Option<i32> {
        self.rows.get(row).and_then(|r| r.get(col)).copied()
    }

    pub fn rows(&self) -> &[Vec<i32>] {
        &self.rows
    }

    pub fn cells(&self) -> impl Iterator<Item = i32> + '_ {
        self.rows.iter().flatten().copied()
    }

    pub fn min(&self) -> Option<i32> {
        self.cells().min()
    }

    pub fn max(&self) -> Option<i32> {
        self.cells().max()
    }
}

/// Interpolation settings shared by a heat map run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpatialInterpolator {
    pub power: f64,
    pub max_distance: f64,
}

impl Default for SpatialInterpolator {
    fn default() -> Self {
        SpatialInterpolator {
            power: DEFAULT_POWER,
            max_distance: DEFAULT_MAX_DISTANCE,
        }
    }
}

impl SpatialInterpolator {
    pub fn new(power: f64, max_distance: f64) -> Self {
        SpatialInterpolator { power, max_distance }
    }

    pub fn interpolate(&self, point: &Coordinate, samples: &[HeatMapPoint]) -> i32 {
        interpolate_rssi(point, samples, self.power, self.max_distance)
    }

    pub fn interpolate_with_confidence(
        &self,
        point: &Coordinate,
        samples: &[HeatMapPoint],
    ) -> (i32, f64) {
        interpolate_with_confidence(point, samples, self.power)
    }

    pub fn grid(&self, samples: &[HeatMapPoint], width: usize, height: usize) -> Grid {
        build_grid(samples, width, height, self.power, self.max_distance)
    }
}

/// Estimate the signal at `point` from `samples`.
///
/// Samples at or beyond `max_distance` are ignored; if that leaves nothing,
/// the nearest sample's value is used regardless of distance.
pub fn interpolate_rssi(
    point: &Coordinate,
    samples: &[HeatMapPoint],
    power: f64,
    max_distance: f64,
) -> i32 {
    if samples.is_empty() {
        return NO_DATA_RSSI;
    }

    let distances: Vec<f64> = samples
        .iter()
        .map(|s| point.distance_to(&s.coordinate))
        .collect();

    if let Some(i) = distances.iter().position(|&d| d < SNAP_DISTANCE) {
        return samples[i].rssi;
    }

    let mut weighted_sum = 0.0;
    let mut total_weight = 0.0;
    for (sample, &distance) in samples.iter().zip(&distances) {
        if distance >= max_distance {
            continue;
        }
        let weight = 1.0 / distance.powf(power);
        weighted_sum += sample.rssi as f64 * weight;
        total_weight += weight;
    }

    if total_weight == 0.0 {
        return nearest(samples, &distances);
    }

    (weighted_sum / total_weight).round() as i32
}

fn nearest(samples: &[HeatMapPoint], distances: &[f64]) -> i32 {
    let mut best = 0;
    for (i, &d) in distances.iter().enumerate() {
        if d < distances[best] {
            best = i;
        }
    }
    samples[best].rssi
}

/// Estimate plus a heuristic confidence in `(0, 1]`.
///
/// Only the nearest [`CONFIDENCE_NEIGHBORS`] samples are used. Confidence is
/// `1 / (1 + d)` where `d` is the farthest of those. With no samples at all the
/// result is `(NO_DATA_RSSI, 0.0)`.
pub fn interpolate_with_confidence(
    point: &Coordinate,
    samples: &[HeatMapPoint],
    power: f64,
) -> (i32, f64) {
    if samples.is_empty() {
        return (NO_DATA_RSSI, 0.0);
    }

    let mut by_distance: Vec<(f64, HeatMapPoint)> = samples
        .iter()
        .map(|s| (point.distance_to(&s.coordinate), *s))
        .collect();
    by_distance.sort_by(|a, b| a.0.total_cmp(&b.0));
    by_distance.truncate(CONFIDENCE_NEIGHBORS);

    let max_dist = by_distance.iter().map(|(d, _)| *d).fold(0.0, f64::max);
    let subset: Vec<HeatMapPoint> = by_distance.into_iter().map(|(_, s)| s).collect();

    let value = interpolate_rssi(point, &subset, power, 2.0 * max_dist);
    let confidence = 1.0 / (1.0 + max_dist);
    (value, confidence)
}

/// Interpolate every cell centre of a `height x width` canvas
pub fn generate_heat_map_grid(
    samples: &[HeatMapPoint],
    width: usize,
    height: usize,
    power: f64,
) -> Grid {
    build_grid(samples, width, height, power, DEFAULT_MAX_DISTANCE)
}

fn build_grid(
    samples: &[HeatMapPoint],
    width: usize,
    height: usize,
    power: f64,
    max_distance: f64,
) -> Grid {
    if samples.is_empty() {
        return Grid::filled(width, height, NO_DATA_RSSI);
    }

    let rows: Vec<Vec<i32>> = (0..height)
        .map(|row| {
            let y = (row as f64 + 0.5) / height as f64;
            (0..width)
                .map(|col| {
                    let x = (col as f64 + 0.5) / width as f64;
                    interpolate_rssi(&Coordinate::new(x, y), samples, power, max_distance)
                })
                .collect()
        })
        .collect();

    Grid {
        width: if height == 0 { 0 } else { width },
        height,
        rows,
    }
}

/// Unnormalized Gaussian weight for a `(dy, dx)` offset from the kernel centre
fn gaussian_weight(dy: i64, dx: i64, two_sigma_sq: f64) -> f64 {
    (-((dy * dy + dx * dx) as f64) / two_sigma_sq).exp()
}

/// Blur a grid with a `kernel_size x kernel_size` Gaussian.
///
/// Kernel taps that fall outside the grid are dropped and the remaining
/// weights renormalized, so edges are not darkened and a uniform field is left
/// unchanged. Only in-bounds taps are visited, so the cost depends on the grid
/// size and not on `kernel_size`.
pub fn apply_gaussian_smoothing(grid: &Grid, kernel_size: i32) -> Grid {
    if grid.is_empty() || kernel_size <= 0 {
        return grid.clone();
    }

    let size = kernel_size as i64;
    let centre = size / 2;
    let sigma = size as f64 / 3.0;
    let two_sigma_sq = 2.0 * sigma * sigma;
    let height = grid.height as i64;
    let width = grid.width as i64;

    let rows: Vec<Vec<i32>> = (0..height)
        .map(|row| {
            // Kernel offsets run from -centre to size - 1 - centre
            let r_lo = (row - centre).max(0);
            let r_hi = (row + size - 1 - centre).min(height - 1);
            (0..width)
                .map(|col| {
                    let c_lo = (col - centre).max(0);
                    let c_hi = (col + size - 1 - centre).min(width - 1);

                    let mut sum = 0.0;
                    let mut weight_sum = 0.0;
                    for r in r_lo..=r_hi {
                        for c in c_lo..=c_hi {
                            let weight = gaussian_weight(r - row, c - col, two_sigma_sq);
                            sum += grid.rows[r as usize][c as usize] as f64 * weight;
                            weight_sum += weight;
                        }
                    }
                    (sum / weight_sum).round() as i32
                })
                .collect()
        })
        .collect();

    Grid {
        width: grid.width,
        height: grid.height,
        rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(x: f64, y: f64, rssi: i32) -> HeatMapPoint {
        HeatMapPoint::new(Coordinate::new(x, y), rssi)
    }

    #[test]
    fn test_empty_samples_default() {
        for (x, y) in [(0.0, 0.0), (0.5, 0.5), (3.0, -1.0)] {
            let v = interpolate_rssi(&Coordinate::new(x, y), &[], DEFAULT_POWER, DEFAULT_MAX_DISTANCE);
            assert_eq!(v, NO_DATA_RSSI);
        }
    }

    #[test]
    fn test_snap_to_sample() {
        let samples = [point(0.2, 0.2, -42), point(0.8, 0.8, -77)];
        let at = |x, y| interpolate_rssi(&Coordinate::new(x, y), &samples, 2.0, 2.0);
        assert_eq!(at(0.2, 0.2), -42);
        assert_eq!(at(0.205, 0.2), -42);
        assert_eq!(at(0.8, 0.795), -77);
    }

    #[test]
    fn test_equidistant_samples_average() {
        let samples = [point(0.0, 0.5, -40), point(1.0, 0.5, -80)];
        let v = interpolate_rssi(&Coordinate::new(0.5, 0.5), &samples, 2.0, 2.0);
        assert!((v - -60).abs() <= 1);
    }

    #[test]
    fn test_closer_stronger_sample_dominates() {
        let samples = [point(0.0, 0.5, -30), point(1.0, 0.5, -90)];
        let v = interpolate_rssi(&Coordinate::new(0.2, 0.5), &samples, 2.0, 2.0);
        assert!(v > -60);
        // weights 1/0.04 and 1/0.64: (-30*25 + -90*1.5625) / 26.5625
        assert_eq!(v, -34);
    }

    #[test]
    fn test_max_distance_cutoff() {
        let samples = [point(0.1, 0.5, -30), point(0.9, 0.5, -90)];
        // Only the first sample is within 0.5 of the query
        let v = interpolate_rssi(&Coordinate::new(0.3, 0.5), &samples, 2.0, 0.5);
        assert_eq!(v, -30);
    }

    #[test]
    fn test_nearest_fallback_outside_max_distance() {
        let samples = [point(0.0, 0.0, -50), point(1.0, 1.0, -70)];
        let v = interpolate_rssi(&Coordinate::new(0.9, 0.8), &samples, 2.0, 0.05);
        assert_eq!(v, -70);
    }

    #[test]
    fn test_z_is_extra_dimension() {
        let samples = [
            HeatMapPoint::new(Coordinate::with_z(0.5, 0.5, 0.0), -40),
            HeatMapPoint::new(Coordinate::with_z(0.5, 0.5, 1.0), -80),
        ];
        let v = interpolate_rssi(&Coordinate::new(0.5, 0.5), &samples, 2.0, 2.0);
        assert_eq!(v, -40);
    }

    #[test]
    fn test_confidence_decreases_with_distance() {
        let samples = [point(0.5, 0.5, -50)];
        let (v_near, c_near) = interpolate_with_confidence(&Coordinate::new(0.5, 0.5), &samples, 2.0);
        let (v_far, c_far) = interpolate_with_confidence(&Coordinate::new(0.9, 0.5), &samples, 2.0);

        assert_eq!(v_near, -50);
        assert_eq!(v_far, -50);
        assert!((c_near - 1.0).abs() < 1e-12);
        assert!((c_far - 1.0 / 1.4).abs() < 1e-9);
        assert!(c_far < c_near);
    }

    #[test]
    fn test_confidence_uses_five_nearest() {
        let mut samples: Vec<HeatMapPoint> = (0..5)
            .map(|i| point(0.1 + 0.02 * i as f64, 0.1, -40))
            .collect();
        // A far, very weak sample must not influence the estimate
        samples.push(point(0.95, 0.95, -100));

        let (value, confidence) = interpolate_with_confidence(&Coordinate::new(0.1, 0.15), &samples, 2.0);
        assert_eq!(value, -40);
        assert!(confidence > 0.0 && confidence <= 1.0);

        let max_dist = Coordinate::new(0.1, 0.15).distance_to(&Coordinate::new(0.18, 0.1));
        assert!((confidence - 1.0 / (1.0 + max_dist)).abs() < 1e-12);
    }

    #[test]
    fn test_confidence_without_samples() {
        let (value, confidence) = interpolate_with_confidence(&Coordinate::new(0.5, 0.5), &[], 2.0);
        assert_eq!(value, NO_DATA_RSSI);
        assert_eq!(confidence, 0.0);
    }

    #[test]
    fn test_grid_dimensions() {
        let samples = [point(0.3, 0.3, -50)];
        for (w, h) in [(1, 1), (7, 3), (3, 7), (20, 20)] {
            for s in [&samples[..], &[][..]] {
                let grid = generate_heat_map_grid(s, w, h, DEFAULT_POWER);
                assert_eq!(grid.height(), h);
                assert_eq!(grid.rows().len(), h);
                assert!(grid.rows().iter().all(|r| r.len() == w));
            }
        }
    }

    #[test]
    fn test_empty_grid_is_default() {
        let grid = generate_heat_map_grid(&[], 4, 3, DEFAULT_POWER);
        assert!(grid.cells().all(|v| v == NO_DATA_RSSI));
    }

    #[test]
    fn test_grid_within_sample_bounds() {
        let samples = [
            point(0.1, 0.1, -100),
            point(0.9, 0.2, 0),
            point(0.5, 0.9, -55),
            point(0.4, 0.4, -72),
        ];
        let grid = generate_heat_map_grid(&samples, 30, 25, DEFAULT_POWER);
        assert!(grid.cells().all(|v| (-100..=0).contains(&v)));
        assert!(grid.min().unwrap() >= -100);
        assert!(grid.max().unwrap() <= 0);
    }

    #[test]
    fn test_grid_cell_centres() {
        let samples = [point(0.25, 0.25, -30), point(0.75, 0.75, -90)];
        let grid = generate_heat_map_grid(&samples, 2, 2, DEFAULT_POWER);
        // Cell centres coincide with the samples
        assert_eq!(grid.get(0, 0), Some(-30));
        assert_eq!(grid.get(1, 1), Some(-90));
        assert_eq!(grid.get(0, 1), Some(-60));
    }

    #[test]
    fn test_grid_deterministic() {
        let samples = [point(0.2, 0.7, -45), point(0.6, 0.1, -80)];
        let a = generate_heat_map_grid(&samples, 16, 9, DEFAULT_POWER);
        let b = generate_heat_map_grid(&samples, 16, 9, DEFAULT_POWER);
        assert_eq!(a, b);
    }

    #[test]
    fn test_smoothing_uniform_field_unchanged() {
        let grid = Grid::filled(6, 4, -65);
        for k in [1, 2, 3, 5, 9] {
            assert_eq!(apply_gaussian_smoothing(&grid, k), grid);
        }
    }

    #[test]
    fn test_smoothing_degenerate_input() {
        let grid = Grid::from_rows(vec![vec![-10, -90], vec![-50, -70]]).unwrap();
        assert_eq!(apply_gaussian_smoothing(&grid, 0), grid);
        assert_eq!(apply_gaussian_smoothing(&grid, -3), grid);

        let empty = Grid::filled(0, 0, -90);
        assert_eq!(apply_gaussian_smoothing(&empty, 3), empty);
    }

    #[test]
    fn test_smoothing_spreads_peak() {
        let mut rows = vec![vec![-90; 5]; 5];
        rows[2][2] = -30;
        let grid = Grid::from_rows(rows).unwrap();
        let smoothed = apply_gaussian_smoothing(&grid, DEFAULT_KERNEL_SIZE);

        assert_eq!(smoothed.width(), 5);
        assert_eq!(smoothed.height(), 5);
        let centre = smoothed.get(2, 2).unwrap();
        assert!(centre > -90 && centre < -30);
        assert!(smoothed.get(2, 1).unwrap() > -90);
        assert_eq!(smoothed.get(0, 0), Some(-90));
    }

    /// Full-kernel convolution used as a reference for small kernels
    fn reference_smoothing(grid: &Grid, size: usize) -> Grid {
        let sigma = size as f64 / 3.0;
        let two_sigma_sq = 2.0 * sigma * sigma;
        let centre = (size / 2) as i64;
        let (height, width) = (grid.height() as i64, grid.width() as i64);

        let rows: Vec<Vec<i32>> = (0..height)
            .map(|row| {
                (0..width)
                    .map(|col| {
                        let (mut sum, mut weight_sum) = (0.0, 0.0);
                        for ky in 0..size as i64 {
                            for kx in 0..size as i64 {
                                let (r, c) = (row + ky - centre, col + kx - centre);
                                if r < 0 || r >= height || c < 0 || c >= width {
                                    continue;
                                }
                                let w = gaussian_weight(ky - centre, kx - centre, two_sigma_sq);
                                sum += grid.get(r as usize, c as usize).unwrap() as f64 * w;
                                weight_sum += w;
                            }
                        }
                        (sum / weight_sum).round() as i32
                    })
                    .collect()
            })
            .collect();
        Grid::from_rows(rows).unwrap()
    }

    #[test]
    fn test_gaussian_weight_shape() {
        assert_eq!(gaussian_weight(0, 0, 2.0), 1.0);
        assert!((gaussian_weight(-1, 0, 2.0) - (-1.0f64 / 2.0).exp()).abs() < 1e-12);
        assert!(gaussian_weight(1, 1, 2.0) < gaussian_weight(0, 1, 2.0));
    }

    #[test]
    fn test_smoothing_matches_full_kernel() {
        let rows: Vec<Vec<i32>> = (0..5)
            .map(|r| (0..4).map(|c| -30 - 7 * r - 11 * c).collect())
            .collect();
        let grid = Grid::from_rows(rows).unwrap();
        for k in 1..=9 {
            assert_eq!(apply_gaussian_smoothing(&grid, k), reference_smoothing(&grid, k as usize), "k={}", k);
        }
    }

    #[test]
    fn test_huge_kernel_on_small_grid() {
        let grid = Grid::from_rows(vec![vec![-10, -90], vec![-50, -70]]).unwrap();
        let smoothed = apply_gaussian_smoothing(&grid, 1_000_000);

        // sigma dwarfs the grid, so every cell is the plain mean
        assert_eq!(smoothed, Grid::filled(2, 2, -55));
        assert_eq!(smoothed, apply_gaussian_smoothing(&grid, i32::MAX));
    }

    #[test]
    fn test_from_rows_rejects_ragged() {
        assert!(Grid::from_rows(vec![vec![1, 2], vec![3]]).is_none());
    }
}
