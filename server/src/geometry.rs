//! Map-plane geometry: points (x, z) and patrol rectangles.

use rand::Rng;
use serde::{Deserialize, Serialize};
use warband_shared::PatrolBounds;

/// A 2D position (x, z in map coordinates)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub z: f32,
}

impl Vec2 {
    pub fn new(x: f32, z: f32) -> Self {
        Self { x, z }
    }

    pub fn to_array(self) -> [f32; 2] {
        [self.x, self.z]
    }

    pub fn length(&self) -> f32 {
        (self.x * self.x + self.z * self.z).sqrt()
    }

    pub fn distance_to(&self, other: Vec2) -> f32 {
        (other - *self).length()
    }

    /// Step up to `max_distance` towards `target` without overshooting
    pub fn move_towards(self, target: Vec2, max_distance: f32) -> Vec2 {
        let delta = target - self;
        let dist = delta.length();
        if dist <= max_distance || dist <= f32::EPSILON {
            return target;
        }
        self + delta * (max_distance / dist)
    }

    /// Linear blend, `t = 0` is `self`
    pub fn lerp(self, other: Vec2, t: f32) -> Vec2 {
        self + (other - self) * t
    }
}

impl std::ops::Add for Vec2 {
    type Output = Vec2;
    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2 { x: self.x + rhs.x, z: self.z + rhs.z }
    }
}

impl std::ops::Sub for Vec2 {
    type Output = Vec2;
    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2 { x: self.x - rhs.x, z: self.z - rhs.z }
    }
}

impl std::ops::Mul<f32> for Vec2 {
    type Output = Vec2;
    fn mul(self, rhs: f32) -> Vec2 {
        Vec2 { x: self.x * rhs, z: self.z * rhs }
    }
}

/// Whether `pos` lies inside `bounds` grown by `margin` on every side
pub fn within_bounds(bounds: &PatrolBounds, pos: Vec2, margin: f32) -> bool {
    pos.x >= bounds.min_x - margin
        && pos.x <= bounds.max_x + margin
        && pos.z >= bounds.min_z - margin
        && pos.z <= bounds.max_z + margin
}

/// Closest point inside `bounds`
pub fn clamp_to_bounds(bounds: &PatrolBounds, pos: Vec2) -> Vec2 {
    Vec2::new(
        pos.x.clamp(bounds.min_x, bounds.max_x),
        pos.z.clamp(bounds.min_z, bounds.max_z),
    )
}

/// Uniform random point inside `bounds`
pub fn random_point<R: Rng + ?Sized>(bounds: &PatrolBounds, rng: &mut R) -> Vec2 {
    let x = if bounds.max_x > bounds.min_x {
        rng.gen_range(bounds.min_x..bounds.max_x)
    } else {
        bounds.min_x
    };
    let z = if bounds.max_z > bounds.min_z {
        rng.gen_range(bounds.min_z..bounds.max_z)
    } else {
        bounds.min_z
    };
    Vec2::new(x, z)
}

/// Centre of `bounds`
pub fn bounds_center(bounds: &PatrolBounds) -> Vec2 {
    Vec2::new(
        (bounds.min_x + bounds.max_x) / 2.0,
        (bounds.min_z + bounds.max_z) / 2.0,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_move_towards_clamps_at_target() {
        let start = Vec2::new(0.0, 0.0);
        let end = Vec2::new(10.0, 0.0);
        assert_eq!(start.move_towards(end, 4.0), Vec2::new(4.0, 0.0));
        assert_eq!(start.move_towards(end, 25.0), end);
    }

    #[test]
    fn test_random_point_stays_inside() {
        let bounds = PatrolBounds::from_corners(-5.0, 2.0, 5.0, 8.0);
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..500 {
            assert!(within_bounds(&bounds, random_point(&bounds, &mut rng), 0.0));
        }
    }

    #[test]
    fn test_degenerate_bounds() {
        let bounds = PatrolBounds::from_corners(3.0, 3.0, 3.0, 3.0);
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(random_point(&bounds, &mut rng), Vec2::new(3.0, 3.0));
        assert_eq!(clamp_to_bounds(&bounds, Vec2::new(-10.0, 40.0)), Vec2::new(3.0, 3.0));
    }
}
