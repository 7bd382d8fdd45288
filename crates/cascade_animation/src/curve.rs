// SPDX-License-Identifier: MIT OR Apache-2.0
//! Timing curves for animation steps.

use serde::{Deserialize, Serialize};

/// Timing curve applied to a step's progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum AnimationCurve {
    /// Constant speed
    Linear,
    /// Slow start
    EaseIn,
    /// Slow end
    EaseOut,
    /// Slow start and end
    #[default]
    EaseInOut,
}

impl AnimationCurve {
    /// Map linear progress `t` (clamped to `[0, 1]`) to eased progress
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Linear => t,
            Self::EaseIn => t * t * t,
            Self::EaseOut => {
                let inv = 1.0 - t;
                1.0 - inv * inv * inv
            }
            Self::EaseInOut => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    let inv = -2.0 * t + 2.0;
                    1.0 - inv * inv * inv / 2.0
                }
            }
        }
    }

    /// Curve followed by the same motion played backwards
    pub fn reversed(self) -> Self {
        match self {
            Self::EaseIn => Self::EaseOut,
            Self::EaseOut => Self::EaseIn,
            other => other,
        }
    }

    /// Get the display name
    pub fn name(self) -> &'static str {
        match self {
            Self::Linear => "Linear",
            Self::EaseIn => "Ease In",
            Self::EaseOut => "Ease Out",
            Self::EaseInOut => "Ease In Out",
        }
    }
}

/// Linear interpolation between two floats
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Interpolate a 2D vector
pub fn lerp_vec2(a: [f32; 2], b: [f32; 2], t: f32) -> [f32; 2] {
    [lerp(a[0], b[0], t), lerp(a[1], b[1], t)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_curves_hit_endpoints() {
        for curve in [
            AnimationCurve::Linear,
            AnimationCurve::EaseIn,
            AnimationCurve::EaseOut,
            AnimationCurve::EaseInOut,
        ] {
            assert_eq!(curve.apply(0.0), 0.0, "{}", curve.name());
            assert!((curve.apply(1.0) - 1.0).abs() < 1e-6, "{}", curve.name());
        }
    }

    #[test]
    fn test_progress_is_clamped() {
        assert_eq!(AnimationCurve::Linear.apply(-1.0), 0.0);
        assert_eq!(AnimationCurve::Linear.apply(2.0), 1.0);
    }

    #[test]
    fn test_reversed_mirrors_ease() {
        assert_eq!(AnimationCurve::EaseIn.reversed(), AnimationCurve::EaseOut);
        assert_eq!(AnimationCurve::EaseOut.reversed(), AnimationCurve::EaseIn);
        assert_eq!(AnimationCurve::EaseInOut.reversed(), AnimationCurve::EaseInOut);

        // Playing the mirrored curve backwards retraces the original
        let t = 0.3;
        let forward = AnimationCurve::EaseIn.apply(t);
        let backward = 1.0 - AnimationCurve::EaseOut.apply(1.0 - t);
        assert!((forward - backward).abs() < 1e-6);
    }

    #[test]
    fn test_lerp_vec2() {
        assert_eq!(lerp_vec2([0.0, 10.0], [10.0, 20.0], 0.5), [5.0, 15.0]);
    }
}
