//! Cartesian/polar conversions for the stereo image
//!
//! Angles are measured from the +y axis towards +x, so a point on the y axis
//! has angle 0 and a correlated left/right pair sits at 45 degrees.

use libm::{atan2f, cosf, sinf};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Polar {
    pub radius: f32,
    /// Radians
    pub angle: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn to_polar(self) -> Polar {
        Polar {
            radius: (self.x * self.x + self.y * self.y).sqrt(),
            angle: atan2f(self.x, self.y),
        }
    }

    /// Clamp both coordinates into `[-limit, limit]`
    pub fn clamp(self, limit: f32) -> Self {
        Self {
            x: self.x.clamp(-limit, limit),
            y: self.y.clamp(-limit, limit),
        }
    }
}

impl Polar {
    pub fn to_cartesian(self) -> Point {
        Point {
            x: self.radius * sinf(self.angle),
            y: self.radius * cosf(self.angle),
        }
    }

    pub fn rotate_degrees(self, degrees: f32) -> Self {
        Self {
            radius: self.radius,
            angle: self.angle + degrees.to_radians(),
        }
    }
}
