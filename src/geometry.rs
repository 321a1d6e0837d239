//! Helix layout: where each pitch index sits in 3D space.

use crate::types::{PitchIndex, Vec3};
use std::f64::consts::PI;

/// Angle advanced per pitch step: 5π/6 rad (150°). Successive semitones land
/// far apart around the circle, so neighbouring pitches never overlap visually.
pub const ANGLE_STEP: f64 = 5.0 / 6.0 * PI;

/// Fixed helix. Pitch `i` sits at angle `i · ANGLE_STEP`, radius `radius`,
/// height `i · vertical_step + vertical_base`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HelixGeometry {
    pub radius: f32,
    pub vertical_step: f32,
    pub vertical_base: f32,
}

impl Default for HelixGeometry {
    fn default() -> Self {
        Self {
            radius: 100.0,
            vertical_step: 6.0,
            vertical_base: -200.0,
        }
    }
}

impl HelixGeometry {
    /// Position of a pitch on the helix. Total over all integers.
    pub fn position(&self, pitch: PitchIndex) -> Vec3 {
        let theta = pitch as f64 * ANGLE_STEP;
        let r = self.radius as f64;
        Vec3 {
            x: (r * theta.cos()) as f32,
            y: (r * theta.sin()) as f32,
            z: (pitch as f64 * self.vertical_step as f64 + self.vertical_base as f64) as f32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origin_pitch() {
        let g = HelixGeometry::default();
        let p = g.position(0);
        assert!((p.x - 100.0).abs() < 1e-4);
        assert!(p.y.abs() < 1e-4);
        assert!((p.z + 200.0).abs() < 1e-4);
    }

    #[test]
    fn test_vertical_spacing_and_radius() {
        let g = HelixGeometry::default();
        for i in [-40, -3, 0, 7, 36, 87] {
            for k in [1, 5, 12, 30] {
                let a = g.position(i);
                let b = g.position(i + k);
                let dz = b.z - a.z;
                assert!(
                    (dz - k as f32 * g.vertical_step).abs() < 1e-3,
                    "i={} k={} dz={}",
                    i,
                    k,
                    dz
                );
                assert!((a.radial() - g.radius).abs() < 1e-3);
                assert!((b.radial() - g.radius).abs() < 1e-3);
            }
        }
    }

    #[test]
    fn test_angular_period_is_twelve_steps() {
        // 12 · 5π/6 = 10π, a whole number of turns
        let g = HelixGeometry::default();
        let a = g.position(5);
        let b = g.position(17);
        assert!((a.x - b.x).abs() < 1e-3);
        assert!((a.y - b.y).abs() < 1e-3);
    }

    #[test]
    fn test_semitones_do_not_collide() {
        let g = HelixGeometry::default();
        let a = g.position(10);
        let b = g.position(11);
        let d = ((a.x - b.x).powi(2) + (a.y - b.y).powi(2)).sqrt();
        // chord of 150° on radius 100 ≈ 193
        assert!(d > 150.0, "d={}", d);
    }
}
