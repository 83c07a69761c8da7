//! Fade curve implementations for the pause/resume envelope
//!
//! A curve maps a normalized fade level (0.0 = silent, 1.0 = full volume)
//! to a gain multiplier. The envelope walks the level up for a fade-in and
//! down for a fade-out, so a single monotonic mapping covers both
//! directions and a reversed ramp retraces the same gains.

use std::f32::consts::{FRAC_PI_2, PI};
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// Fade curve types
///
/// - Linear: constant rate of change
/// - Exponential: slow start, fast finish
/// - Logarithmic: fast start, slow finish
/// - SCurve: smooth acceleration and deceleration
/// - EqualPower: constant perceived loudness across the ramp
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FadeCurve {
    /// v(t) = t
    #[default]
    Linear,

    /// v(t) = t²
    Exponential,

    /// v(t) = 1 - (1-t)²
    Logarithmic,

    /// v(t) = 0.5 × (1 - cos(π × t))
    SCurve,

    /// v(t) = sin(t × π/2)
    EqualPower,
}

impl FadeCurve {
    /// Gain multiplier at the given fade level
    ///
    /// # Arguments
    /// * `level` - Normalized fade level (clamped to 0.0..=1.0)
    ///
    /// # Returns
    /// Volume multiplier (0.0 = silence, 1.0 = full volume)
    pub fn gain(&self, level: f32) -> f32 {
        let t = level.clamp(0.0, 1.0);

        match self {
            FadeCurve::Linear => t,
            FadeCurve::Exponential => t * t,
            FadeCurve::Logarithmic => {
                let inv = 1.0 - t;
                1.0 - inv * inv
            }
            FadeCurve::SCurve => 0.5 * (1.0 - (PI * t).cos()),
            FadeCurve::EqualPower => (t * FRAC_PI_2).sin(),
        }
    }

    /// Canonical configuration value (lowercase, underscored)
    pub fn as_str(&self) -> &'static str {
        match self {
            FadeCurve::Linear => "linear",
            FadeCurve::Exponential => "exponential",
            FadeCurve::Logarithmic => "logarithmic",
            FadeCurve::SCurve => "s_curve",
            FadeCurve::EqualPower => "equal_power",
        }
    }

    /// All available fade curve variants
    pub fn all_variants() -> &'static [FadeCurve] {
        &[
            FadeCurve::Linear,
            FadeCurve::Exponential,
            FadeCurve::Logarithmic,
            FadeCurve::SCurve,
            FadeCurve::EqualPower,
        ]
    }
}

impl FromStr for FadeCurve {
    type Err = Error;

    /// Accepts the canonical names plus the usual aliases
    /// (`cosine`, `scurve`, `s-curve`, `equalpower`), case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "linear" => Ok(FadeCurve::Linear),
            "exponential" => Ok(FadeCurve::Exponential),
            "logarithmic" => Ok(FadeCurve::Logarithmic),
            "cosine" | "scurve" | "s-curve" | "s_curve" => Ok(FadeCurve::SCurve),
            "equal_power" | "equalpower" => Ok(FadeCurve::EqualPower),
            other => Err(Error::InvalidInput(format!("unknown fade curve '{}'", other))),
        }
    }
}

impl fmt::Display for FadeCurve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gain_bounds() {
        for curve in FadeCurve::all_variants() {
            let silent = curve.gain(0.0);
            let full = curve.gain(1.0);
            assert!(silent.abs() < 0.001, "{:?} at 0.0 should be ~0.0, got {}", curve, silent);
            assert!((full - 1.0).abs() < 0.001, "{:?} at 1.0 should be ~1.0, got {}", curve, full);
        }
    }

    #[test]
    fn test_gain_is_monotonic() {
        for curve in FadeCurve::all_variants() {
            let mut previous = curve.gain(0.0);
            for step in 1..=24 {
                let g = curve.gain(step as f32 / 24.0);
                assert!(g >= previous, "{:?} decreased at step {}", curve, step);
                previous = g;
            }
        }
    }

    #[test]
    fn test_gain_clamps_out_of_range_levels() {
        assert_eq!(FadeCurve::Linear.gain(-0.5), 0.0);
        assert_eq!(FadeCurve::Linear.gain(3.0), 1.0);
    }

    #[test]
    fn test_parse_aliases() {
        assert_eq!("cosine".parse::<FadeCurve>().unwrap(), FadeCurve::SCurve);
        assert_eq!("S-Curve".parse::<FadeCurve>().unwrap(), FadeCurve::SCurve);
        assert_eq!("equalpower".parse::<FadeCurve>().unwrap(), FadeCurve::EqualPower);
        assert_eq!("EXPONENTIAL".parse::<FadeCurve>().unwrap(), FadeCurve::Exponential);
    }

    #[test]
    fn test_parse_invalid() {
        assert!("".parse::<FadeCurve>().is_err());
        assert!("sawtooth".parse::<FadeCurve>().is_err());
    }

    #[test]
    fn test_default_is_linear() {
        assert_eq!(FadeCurve::default(), FadeCurve::Linear);
        assert_eq!(FadeCurve::default().to_string(), "linear");
    }
}
