//! 3D vector value type with the `"x y z"` textual form used by scene documents.

use std::fmt;
use std::str::FromStr;

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::Error;

/// A floating-point `(x, y, z)` triple.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector {
    pub const ZERO: Vector = Vector::new(0.0, 0.0, 0.0);
    pub const ONE: Vector = Vector::new(1.0, 1.0, 1.0);

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn from_array(a: [f64; 3]) -> Self {
        Self::new(a[0], a[1], a[2])
    }

    pub fn to_array(self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }

    /// Component-wise scaled copy.
    pub fn scaled(self, s: f64) -> Self {
        Self::new(self.x * s, self.y * s, self.z * s)
    }

    pub fn length(self) -> f64 {
        self.length_squared().sqrt()
    }

    pub fn length_squared(self) -> f64 {
        self.x * self.x + self.y * self.y + self.z * self.z
    }

    pub fn distance_to_squared(self, other: Vector) -> f64 {
        let (dx, dy, dz) = (self.x - other.x, self.y - other.y, self.z - other.z);
        dx * dx + dy * dy + dz * dz
    }

    /// True when every component is finite.
    pub fn is_finite(self) -> bool {
        self.length().is_finite()
    }

    /// Parse the whitespace separated `"x y z"` form.
    ///
    /// Exactly three components are required and the resulting length must be
    /// finite, so `"1 2"`, `"1 2 x"` and `"inf 0 0"` are all rejected.
    pub fn parse(s: &str) -> Result<Self, ParseTripleError> {
        parse_triple(s).map(Self::from_array)
    }
}

impl fmt::Display for Vector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.x, self.y, self.z)
    }
}

impl FromStr for Vector {
    type Err = ParseTripleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<DVec3> for Vector {
    fn from(v: DVec3) -> Self {
        Self::new(v.x, v.y, v.z)
    }
}

impl From<Vector> for DVec3 {
    fn from(v: Vector) -> Self {
        DVec3::new(v.x, v.y, v.z)
    }
}

impl From<[f64; 3]> for Vector {
    fn from(a: [f64; 3]) -> Self {
        Self::from_array(a)
    }
}

// ============================================================================
// Triple parsing (shared with Rotation)
// ============================================================================

/// Why a `"x y z"` string was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseTripleError {
    #[error("expected 3 components, got {0}")]
    Arity(usize),
    #[error("component {index} ({text:?}) is not a number")]
    NotANumber { index: usize, text: String },
    #[error("components must be finite")]
    NonFinite,
}

impl ParseTripleError {
    pub(crate) fn into_invalid(self, property: &str) -> Error {
        Error::InvalidArgument {
            property: property.to_string(),
            reason: self.to_string(),
        }
    }
}

pub(crate) fn parse_triple(s: &str) -> Result<[f64; 3], ParseTripleError> {
    let parts: Vec<&str> = s.split_whitespace().collect();
    if parts.len() != 3 {
        return Err(ParseTripleError::Arity(parts.len()));
    }
    let mut out = [0.0; 3];
    for (index, text) in parts.iter().enumerate() {
        out[index] = text.parse::<f64>().map_err(|_| ParseTripleError::NotANumber {
            index,
            text: (*text).to_string(),
        })?;
    }
    if out.iter().all(|c| c.is_finite()) {
        Ok(out)
    } else {
        Err(ParseTripleError::NonFinite)
    }
}
