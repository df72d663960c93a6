//! Radiance -> display color.
//!
//! Exposure, a luminance-weighted sunset hue bias, ACES filmic tonemap, gamma
//! and 8-bit quantization, in that order.

use crate::atmosphere::config::RenderConfig;
use crate::core::{Error, Result};
use crate::math::vector::{self, Vector3};

/// Denominators smaller than this map the tonemapped channel to zero.
const TONEMAP_EPSILON: f64 = 1e-12;

/// Rec. 709 relative luminance.
#[inline]
pub fn luminance(c: Vector3) -> f64 {
    0.2126 * c.x + 0.7152 * c.y + 0.0722 * c.z
}

/// Warm/purple shift that grows as the sky darkens.
///
/// With `k = strength / (1 + 2 * luminance)`, red is scaled by `1 + k`, blue
/// by `1 + k/2` and green by `1 - k/2`. Channels never go negative.
pub fn sunset_bias(c: Vector3, strength: f64) -> Vector3 {
    let weight = 1.0 / (1.0 + 2.0 * luminance(c));
    let k = strength * weight;
    Vector3::new(
        (c.x * (1.0 + k)).max(0.0),
        (c.y * (1.0 - 0.5 * k)).max(0.0),
        (c.z * (1.0 + 0.5 * k)).max(0.0),
    )
}

/// Narkowicz's ACES fit, clamped to `[0, 1]`.
#[inline]
pub fn aces_tonemap(x: f64) -> f64 {
    let numerator = x * (2.51 * x + 0.03);
    let denominator = x * (2.43 * x + 0.59) + 0.14;
    if denominator.abs() < TONEMAP_EPSILON {
        return 0.0;
    }
    (numerator / denominator).clamp(0.0, 1.0)
}

/// `x^(1/gamma)`.
#[inline]
pub fn gamma_correct(x: f64, gamma: f64) -> f64 {
    x.powf(1.0 / gamma)
}

/// Nearest integer in `[0, 255]` for a value in `[0, 1]`.
#[inline]
pub fn quantize(x: f64) -> u8 {
    (x * 255.0).round().clamp(0.0, 255.0) as u8
}

/// Post-processing parameters lifted from [`RenderConfig`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PostProcess {
    pub exposure: f64,
    pub gamma: f64,
    pub sunset_bias: f64,
}

impl PostProcess {
    pub fn from_config(config: &RenderConfig) -> Self {
        Self {
            exposure: config.exposure,
            gamma: config.gamma,
            sunset_bias: config.sunset_bias,
        }
    }

    /// Display-referred color in `[0, 1]` before quantization.
    pub fn map(&self, radiance: Vector3) -> Vector3 {
        let exposed = vector::scale(radiance, self.exposure);
        let biased = sunset_bias(exposed, self.sunset_bias);
        Vector3::new(
            gamma_correct(aces_tonemap(biased.x), self.gamma),
            gamma_correct(aces_tonemap(biased.y), self.gamma),
            gamma_correct(aces_tonemap(biased.z), self.gamma),
        )
    }

    /// Full pipeline to 8-bit RGB. Non-finite input or output is a
    /// [`Error::ComputationFailure`].
    pub fn apply(&self, radiance: Vector3) -> Result<[u8; 3]> {
        if !radiance.is_finite() {
            return Err(Error::ComputationFailure(format!(
                "non-finite radiance {radiance:?}"
            )));
        }
        let mapped = self.map(radiance);
        if !mapped.is_finite() {
            return Err(Error::ComputationFailure(format!(
                "non-finite display color {mapped:?}"
            )));
        }
        Ok([quantize(mapped.x), quantize(mapped.y), quantize(mapped.z)])
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
