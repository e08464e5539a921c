//! Geometric types carried by player actions.
//!
//! Positions are world units, view angles are degrees.

use serde::{Deserialize, Serialize};

/// 3D Vector - position, velocity, displacement
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    /// X component
    pub x: f64,
    /// Y component
    pub y: f64,
    /// Z component
    pub z: f64,
}

impl Vec3 {
    /// Zero vector
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    /// Creates a new Vec3
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Dot product
    #[must_use]
    pub fn dot(self, other: Self) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Length squared (avoids sqrt)
    #[must_use]
    pub fn length_squared(self) -> f64 {
        self.dot(self)
    }

    /// Length
    #[must_use]
    pub fn length(self) -> f64 {
        self.length_squared().sqrt()
    }

    /// Euclidean distance to another point
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        (self - other).length()
    }

    /// Scales every component
    #[must_use]
    pub fn scale(self, factor: f64) -> Self {
        Self::new(self.x * factor, self.y * factor, self.z * factor)
    }

    /// Returns true if every component is finite
    #[must_use]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl std::ops::Add for Vec3 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl std::ops::Sub for Vec3 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

/// Aim direction in degrees.
///
/// `yaw` is the horizontal angle and wraps at 360, `pitch` is the vertical
/// angle. Serialized as `{x, y}` to match the session layer's wire names.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewAngle {
    /// Horizontal angle.
    #[serde(rename = "x", alias = "yaw")]
    pub yaw: f64,
    /// Vertical angle.
    #[serde(rename = "y", alias = "pitch")]
    pub pitch: f64,
}

impl ViewAngle {
    /// Creates a new view angle.
    #[must_use]
    pub const fn new(yaw: f64, pitch: f64) -> Self {
        Self { yaw, pitch }
    }

    /// Angular distance to another view angle, in degrees.
    ///
    /// The yaw difference takes the short way around the circle.
    #[must_use]
    pub fn delta(self, other: Self) -> f64 {
        let yaw = wrap_degrees(self.yaw - other.yaw);
        let pitch = self.pitch - other.pitch;
        (yaw * yaw + pitch * pitch).sqrt()
    }
}

/// Wraps an angle difference into (-180, 180].
#[must_use]
pub fn wrap_degrees(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(360.0);
    if wrapped > 180.0 {
        wrapped - 360.0
    } else {
        wrapped
    }
}
