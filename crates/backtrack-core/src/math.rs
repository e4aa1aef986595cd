//! Angle and bounding box math over `glam` vectors
//!
//! World units follow the usual shooter convention: z is up, angles are in
//! degrees, and a participant's collision box is an axis-aligned box given in
//! local space relative to its origin.

use std::ops::Sub;

use serde::{Deserialize, Serialize};

pub use glam::Vec3;

/// Squared distance between two positions in the horizontal plane
#[inline]
pub fn horizontal_distance_squared(a: Vec3, b: Vec3) -> f32 {
    (a - b).truncate().length_squared()
}

/// Euler orientation in degrees
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct QAngle {
    pub pitch: f32,
    pub yaw: f32,
    pub roll: f32,
}

impl QAngle {
    pub const ZERO: QAngle = QAngle {
        pitch: 0.0,
        yaw: 0.0,
        roll: 0.0,
    };

    pub const fn new(pitch: f32, yaw: f32, roll: f32) -> Self {
        Self { pitch, yaw, roll }
    }

    fn as_vec3(&self) -> Vec3 {
        Vec3::new(self.pitch, self.yaw, self.roll)
    }

    fn from_vec3(v: Vec3) -> Self {
        Self::new(v.x, v.y, v.z)
    }

    /// Componentwise linear interpolation (no wrap-around handling)
    pub fn lerp(&self, other: &QAngle, t: f32) -> QAngle {
        Self::from_vec3(self.as_vec3().lerp(other.as_vec3(), t))
    }

    pub fn length_sqr(&self) -> f32 {
        self.as_vec3().length_squared()
    }

    /// Unit view direction for these angles
    pub fn forward(&self) -> Vec3 {
        let (sp, cp) = self.pitch.to_radians().sin_cos();
        let (sy, cy) = self.yaw.to_radians().sin_cos();
        Vec3::new(cp * cy, cp * sy, -sp)
    }
}

impl Sub for QAngle {
    type Output = QAngle;

    fn sub(self, rhs: QAngle) -> QAngle {
        Self::from_vec3(self.as_vec3() - rhs.as_vec3())
    }
}

/// Local-space axis-aligned collision box
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Bounds {
    pub mins: Vec3,
    pub maxs: Vec3,
}

impl Bounds {
    pub const fn new(mins: Vec3, maxs: Vec3) -> Self {
        Self { mins, maxs }
    }

    /// Standing player hull
    pub const fn standing() -> Self {
        Self::new(Vec3::new(-16.0, -16.0, 0.0), Vec3::new(16.0, 16.0, 72.0))
    }

    /// Crouched player hull
    pub const fn crouched() -> Self {
        Self::new(Vec3::new(-16.0, -16.0, 0.0), Vec3::new(16.0, 16.0, 36.0))
    }

    pub fn lerp(&self, other: &Bounds, t: f32) -> Bounds {
        Bounds {
            mins: self.mins.lerp(other.mins, t),
            maxs: self.maxs.lerp(other.maxs, t),
        }
    }

    /// World-space corners of the box placed at `origin`
    fn placed(&self, origin: Vec3) -> (Vec3, Vec3) {
        (origin + self.mins, origin + self.maxs)
    }

    /// Whether a world-space point lies inside the box placed at `origin`
    pub fn contains(&self, origin: Vec3, point: Vec3) -> bool {
        let (lo, hi) = self.placed(origin);
        point.cmpge(lo).all() && point.cmple(hi).all()
    }

    /// Whether two boxes placed at their origins overlap
    pub fn overlaps(&self, origin: Vec3, other: &Bounds, other_origin: Vec3) -> bool {
        let (a_lo, a_hi) = self.placed(origin);
        let (b_lo, b_hi) = other.placed(other_origin);
        a_lo.cmplt(b_hi).all() && a_hi.cmpgt(b_lo).all()
    }

    /// Distance along a ray at which it enters the box placed at `origin`.
    ///
    /// `dir` need not be normalized; the returned value is in units of `dir`.
    /// A ray starting inside the box hits at 0.
    pub fn ray_hit(&self, origin: Vec3, start: Vec3, dir: Vec3, max_t: f32) -> Option<f32> {
        let (lo, hi) = self.placed(origin);
        let mut t_min = 0.0f32;
        let mut t_max = max_t;

        for axis in 0..3 {
            let (s, d, l, h) = (start[axis], dir[axis], lo[axis], hi[axis]);
            if d.abs() < f32::EPSILON {
                if s < l || s > h {
                    return None;
                }
                continue;
            }
            let inv = 1.0 / d;
            let (mut t0, mut t1) = ((l - s) * inv, (h - s) * inv);
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }
            t_min = t_min.max(t0);
            t_max = t_max.min(t1);
            if t_min > t_max {
                return None;
            }
        }

        Some(t_min)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_horizontal_distance_ignores_height() {
        let a = Vec3::new(3.0, 4.0, 100.0);
        assert_eq!(horizontal_distance_squared(a, Vec3::ZERO), 25.0);
        assert_eq!(a.length_squared(), 10025.0);
    }

    #[test]
    fn test_forward_vectors() {
        let east = QAngle::new(0.0, 0.0, 0.0).forward();
        assert!((east.x - 1.0).abs() < 1e-6);

        let north = QAngle::new(0.0, 90.0, 0.0).forward();
        assert!((north.y - 1.0).abs() < 1e-6);

        // positive pitch looks down
        let down = QAngle::new(90.0, 0.0, 0.0).forward();
        assert!((down.z + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_bounds_contains_and_overlap() {
        let hull = Bounds::standing();
        let origin = Vec3::new(100.0, 0.0, 0.0);

        assert!(hull.contains(origin, Vec3::new(110.0, 5.0, 40.0)));
        assert!(!hull.contains(origin, Vec3::new(130.0, 5.0, 40.0)));

        assert!(hull.overlaps(origin, &hull, Vec3::new(120.0, 0.0, 0.0)));
        assert!(!hull.overlaps(origin, &hull, Vec3::new(140.0, 0.0, 0.0)));
        // touching faces do not overlap
        assert!(!hull.overlaps(origin, &hull, Vec3::new(132.0, 0.0, 0.0)));
    }

    #[test]
    fn test_bounds_lerp() {
        let mid = Bounds::standing().lerp(&Bounds::crouched(), 0.5);
        assert_eq!(mid.maxs, Vec3::new(16.0, 16.0, 54.0));
        assert_eq!(mid.mins, Bounds::standing().mins);
    }

    #[test]
    fn test_ray_hit() {
        let hull = Bounds::standing();
        let origin = Vec3::new(100.0, 0.0, 0.0);
        let start = Vec3::new(0.0, 0.0, 36.0);
        let dir = Vec3::X;

        let t = hull.ray_hit(origin, start, dir, 1000.0).unwrap();
        assert!((t - 84.0).abs() < 1e-4);

        // passes above the hull
        let high = Vec3::new(0.0, 0.0, 80.0);
        assert!(hull.ray_hit(origin, high, dir, 1000.0).is_none());

        // too short to reach
        assert!(hull.ray_hit(origin, start, dir, 50.0).is_none());
    }

    #[test]
    fn test_qangle_delta_and_lerp() {
        let a = QAngle::new(10.0, 20.0, 0.0);
        let b = QAngle::new(10.0, 23.0, 4.0);
        assert_eq!((b - a).length_sqr(), 25.0);
        assert_eq!(a.lerp(&b, 0.5), QAngle::new(10.0, 21.5, 2.0));
    }

    #[test]
    fn test_bounds_serde_round_trip() {
        let json = serde_json::to_string(&Bounds::crouched()).unwrap();
        let back: Bounds = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Bounds::crouched());
    }
}
