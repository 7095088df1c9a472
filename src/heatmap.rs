//! Measurement -> heat map pipeline.
//!
//! Lays out any unplaced locations, joins measurements with their coordinates
//! and hands the resulting points to the interpolator.

use crate::assignment::CoordinateAssignment;
use crate::config::HeatmapConfig;
use crate::database::Measurement;
use crate::interpolation::{apply_gaussian_smoothing, Grid, HeatMapPoint, SpatialInterpolator};
use log::{debug, info};

/// Join measurements with their mapped coordinates.
///
/// Measurements whose location has no coordinate are skipped.
pub fn build_points(
    measurements: &[Measurement],
    assignment: &CoordinateAssignment,
) -> Vec<HeatMapPoint> {
    let mapping = assignment.mapping();
    let points: Vec<HeatMapPoint> = measurements
        .iter()
        .filter_map(|m| {
            mapping
                .get(&m.location)
                .map(|c| HeatMapPoint::new(*c, m.rssi))
        })
        .collect();

    if points.len() < measurements.len() {
        debug!(
            "Skipped {} measurements without coordinates",
            measurements.len() - points.len()
        );
    }
    points
}

/// Distinct location names in order of first appearance
pub fn location_names(measurements: &[Measurement]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for m in measurements {
        if !names.contains(&m.location) {
            names.push(m.location.clone());
        }
    }
    names
}

#[derive(Debug, Clone)]
pub struct HeatMapBuilder {
    interpolator: SpatialInterpolator,
    width: usize,
    height: usize,
    smoothing: Option<i32>,
}

impl HeatMapBuilder {
    pub fn new(width: usize, height: usize) -> Self {
        HeatMapBuilder {
            interpolator: SpatialInterpolator::default(),
            width,
            height,
            smoothing: None,
        }
    }

    pub fn from_config(config: &HeatmapConfig) -> Self {
        HeatMapBuilder {
            interpolator: config.interpolator(),
            width: config.width,
            height: config.height,
            smoothing: config.smoothing.then_some(config.kernel_size),
        }
    }

    pub fn smoothing(mut self, kernel_size: Option<i32>) -> Self {
        self.smoothing = kernel_size;
        self
    }

    /// Build the grid from already-joined points
    pub fn build_from_points(&self, points: &[HeatMapPoint]) -> Grid {
        let grid = self.interpolator.grid(points, self.width, self.height);
        match self.smoothing {
            Some(kernel_size) => apply_gaussian_smoothing(&grid, kernel_size),
            None => grid,
        }
    }

    /// Ensure every measured location is placed, then build the grid
    pub fn build(&self, measurements: &[Measurement], assignment: &CoordinateAssignment) -> Grid {
        let names = location_names(measurements);
        if let Some(moved) = assignment.ensure_layout(&names) {
            info!(
                "Generated layout for {} locations ({} repositioned)",
                names.len(),
                moved.len()
            );
        }

        let points = build_points(measurements, assignment);
        info!(
            "Interpolating {} samples onto a {}x{} grid",
            points.len(),
            self.width,
            self.height
        );
        self.build_from_points(&points)
    }
}
