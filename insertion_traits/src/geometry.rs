//! Plain value types shared across the hardware boundary.

/// Number of arm joints.
pub const JOINT_COUNT: usize = 7;

/// Joint angles in radians.
pub type JointPositions = [f64; JOINT_COUNT];

/// Cartesian position in metres; orientation is implicitly tool-down.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point {
    #[inline]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Euclidean distance to `other`.
    #[inline]
    pub fn distance(&self, other: &Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    /// Distance to `other` in the horizontal plane.
    #[inline]
    pub fn planar_distance(&self, other: &Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    #[inline]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// Linear interpolation; `t = 0` yields `self`, `t = 1` yields `to`.
    #[inline]
    pub fn lerp(&self, to: &Point, t: f64) -> Point {
        Point {
            x: self.x + (to.x - self.x) * t,
            y: self.y + (to.y - self.y) * t,
            z: self.z + (to.z - self.z) * t,
        }
    }
}

/// Force (N) and torque (Nm) measured at the tool, base frame.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Wrench {
    pub force: [f64; 3],
    pub torque: [f64; 3],
}

impl Wrench {
    pub const fn from_force(fx: f64, fy: f64, fz: f64) -> Self {
        Self {
            force: [fx, fy, fz],
            torque: [0.0; 3],
        }
    }

    /// Magnitude of the force component along the insertion (z) axis.
    #[inline]
    pub fn axial(&self) -> f64 {
        self.force[2].abs()
    }

    /// Magnitude of the in-plane (x, y) force.
    #[inline]
    pub fn lateral(&self) -> f64 {
        self.force[0].hypot(self.force[1])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lerp_endpoints() {
        let a = Point::new(0.0, 0.0, 1.0);
        let b = Point::new(1.0, 2.0, 0.0);
        assert_eq!(a.lerp(&b, 0.0), a);
        assert_eq!(a.lerp(&b, 1.0), b);
        assert!((a.lerp(&b, 0.5).y - 1.0).abs() < 1e-12);
    }

    #[test]
    fn wrench_components() {
        let w = Wrench::from_force(3.0, 4.0, -7.0);
        assert!((w.lateral() - 5.0).abs() < 1e-12);
        assert!((w.axial() - 7.0).abs() < 1e-12);
    }
}
