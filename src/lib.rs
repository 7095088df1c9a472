pub mod assignment;
pub mod config;
pub mod coordinate;
pub mod database;
pub mod heatmap;
pub mod interpolation;
pub mod layout;
pub mod report;
pub mod signal;
pub mod store;

pub use assignment::CoordinateAssignment;
pub use config::Config;
pub use coordinate::Coordinate;
pub use database::Database;
pub use interpolation::{
    apply_gaussian_smoothing, generate_heat_map_grid, interpolate_rssi,
    interpolate_with_confidence, Grid, HeatMapPoint, SpatialInterpolator,
};
pub use layout::generate_grid_layout;
