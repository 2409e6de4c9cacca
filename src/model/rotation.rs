//! Euler rotation value type.
//!
//! Angles are radians applied as intrinsic X, then Y, then Z rotations. The
//! rigid-body world stores orientation as a quaternion, so conversions in both
//! directions live here.

use std::fmt;
use std::str::FromStr;

use glam::{DQuat, EulerRot};
use serde::{Deserialize, Serialize};

use super::vector::{parse_triple, ParseTripleError};

const ORDER: EulerRot = EulerRot::XYZ;

/// Euler angles `(x, y, z)` in radians.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rotation {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Rotation {
    pub const ZERO: Rotation = Rotation::new(0.0, 0.0, 0.0);

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn from_array(a: [f64; 3]) -> Self {
        Self::new(a[0], a[1], a[2])
    }

    pub fn to_quat(self) -> DQuat {
        DQuat::from_euler(ORDER, self.x, self.y, self.z)
    }

    pub fn from_quat(q: DQuat) -> Self {
        let (x, y, z) = q.normalize().to_euler(ORDER);
        Self::new(x, y, z)
    }

    /// Component-wise squared distance, treating the angles as a vector.
    pub fn distance_to_squared(self, other: Rotation) -> f64 {
        let (dx, dy, dz) = (self.x - other.x, self.y - other.y, self.z - other.z);
        dx * dx + dy * dy + dz * dz
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    pub fn parse(s: &str) -> Result<Self, ParseTripleError> {
        parse_triple(s).map(Self::from_array)
    }
}

impl fmt::Display for Rotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.x, self.y, self.z)
    }
}

impl FromStr for Rotation {
    type Err = ParseTripleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
