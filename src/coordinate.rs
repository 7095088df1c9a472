//! Normalized canvas coordinates for surveyed locations.
//!
//! x and y are fractions of the canvas width/height in `[0, 1]`. The optional
//! z component is carried for multi-floor data but only ever participates as an
//! extra Euclidean dimension.

use serde::{Deserialize, Serialize};

/// A normalized 2D (optionally 3D) point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub x: f64,
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z: Option<f64>,
}

impl Coordinate {
    pub fn new(x: f64, y: f64) -> Self {
        Coordinate { x, y, z: None }
    }

    pub fn with_z(x: f64, y: f64, z: f64) -> Self {
        Coordinate { x, y, z: Some(z) }
    }

    /// Euclidean distance; a missing z counts as 0 on either side
    pub fn distance_to(&self, other: &Coordinate) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z.unwrap_or(0.0) - other.z.unwrap_or(0.0);
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    /// Map onto a canvas of the given pixel size
    pub fn to_canvas(&self, width: f64, height: f64) -> (f64, f64) {
        (self.x * width, self.y * height)
    }

    /// Build a coordinate from a canvas position, clamped to the unit square
    pub fn from_canvas(px: f64, py: f64, width: f64, height: f64) -> Self {
        let x = if width > 0.0 { px / width } else { 0.0 };
        let y = if height > 0.0 { py / height } else { 0.0 };
        Coordinate::new(x.clamp(0.0, 1.0), y.clamp(0.0, 1.0))
    }

    /// True when x and y both lie within `[0, 1]`
    pub fn is_normalized(&self) -> bool {
        (0.0..=1.0).contains(&self.x) && (0.0..=1.0).contains(&self.y)
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.z {
            Some(z) => write!(f, "({:.3}, {:.3}, {:.3})", self.x, self.y, z),
            None => write!(f, "({:.3}, {:.3})", self.x, self.y),
        }
    }
}
