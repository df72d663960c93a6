//! Single-scattering sky ray marcher.
//!
//! For each of `samples` view directions fanning from the horizon upward, the
//! visible atmosphere segment is marched with the midpoint rule. Light reaching
//! each step from the sun is attenuated by [`TransmittanceEngine`] lookups; the
//! attenuation between the camera and the step is the ratio of two
//! transmittance-to-space values, so no second integral is needed.

use std::time::Instant;

use crate::atmosphere::config::{AtmosphereConfig, DerivedConstants};
use crate::atmosphere::sun;
use crate::atmosphere::transmittance::TransmittanceEngine;
use crate::core::{Error, Result};
use crate::math::vector::{self, Vector3};
use crate::math::Ray;

/// Raw (linear, unbounded) inscattered radiance for one view sample.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RadianceSample {
    /// Position in the fan: 0 at the horizon, 1 at the top of the view.
    pub s: f64,
    pub radiance: Vector3,
}

/// Rayleigh phase function `c (1 + cos^2)`, with `c = 3/(16 pi)` taken from
/// [`DerivedConstants::rayleigh_phase`].
#[inline]
pub fn rayleigh_phase(cos_theta: f64, coefficient: f64) -> f64 {
    coefficient * (1.0 + cos_theta * cos_theta)
}

/// Henyey-Greenstein phase (Cornette-Shanks normalization) with asymmetry `g`.
/// `coefficient` is `3/(8 pi) (1 - g^2) / (2 + g^2)`, precomputed in
/// [`DerivedConstants::mie_phase`].
#[inline]
pub fn mie_phase(cos_theta: f64, g: f64, coefficient: f64) -> f64 {
    coefficient * (1.0 + cos_theta * cos_theta) / (1.0 + g * g - 2.0 * g * cos_theta).powf(1.5)
}

/// `numerator / denominator` per channel, clamped to `[0, 1]`. A channel with
/// a vanishing denominator yields 0.
fn transmittance_ratio(numerator: Vector3, denominator: Vector3) -> Vector3 {
    let ratio = |n: f64, d: f64| {
        if d <= f64::MIN_POSITIVE {
            0.0
        } else {
            (n / d).clamp(0.0, 1.0)
        }
    };
    Vector3::new(
        ratio(numerator.x, denominator.x),
        ratio(numerator.y, denominator.y),
        ratio(numerator.z, denominator.z),
    )
}

/// Drives the per-sample ray march. Owns its transmittance cache; give each
/// concurrent render its own renderer.
pub struct SkyRenderer {
    config: AtmosphereConfig,
    derived: DerivedConstants,
    engine: TransmittanceEngine,
}

impl SkyRenderer {
    /// Validate `config` and precompute its derived constants.
    pub fn new(config: AtmosphereConfig) -> Result<Self> {
        config.validate()?;
        let derived = config.derived();
        let engine = TransmittanceEngine::new(&config, &derived);
        Ok(Self {
            config,
            derived,
            engine,
        })
    }

    #[inline]
    pub fn config(&self) -> &AtmosphereConfig {
        &self.config
    }

    #[inline]
    pub fn engine(&self) -> &TransmittanceEngine {
        &self.engine
    }

    pub fn clear_cache(&mut self) {
        self.engine.clear_cache();
    }

    /// View direction of sample `i`: `normalize(0, s, focal)`.
    pub fn view_direction(&self, i: usize) -> (f64, Vector3) {
        let s = i as f64 / (self.config.render.samples - 1) as f64;
        (s, vector::normalize(Vector3::new(0.0, s, self.derived.focal_length)))
    }

    /// Raw radiance for every view sample, horizon first.
    ///
    /// Fails with [`Error::ComputationFailure`] if `elevation` is not finite or
    /// any resulting radiance is not finite.
    pub fn render(&mut self, elevation: f64) -> Result<Vec<RadianceSample>> {
        if !elevation.is_finite() {
            return Err(Error::ComputationFailure(format!(
                "solar elevation {elevation} is not finite"
            )));
        }

        let start = Instant::now();
        let sun_dir = sun::sun_direction(elevation);
        let samples = self.config.render.samples;

        let mut out = Vec::with_capacity(samples);
        for i in 0..samples {
            let (s, view_dir) = self.view_direction(i);
            let radiance = self.inscatter(view_dir, sun_dir);
            if !radiance.is_finite() {
                return Err(Error::ComputationFailure(format!(
                    "non-finite radiance {radiance:?} at sample {i}"
                )));
            }
            out.push(RadianceSample { s, radiance });
        }

        match self.engine.stats() {
            Some(stats) => log::debug!(
                "Rendered {} samples at elevation {:.4} rad in {:.2?} (cache: {} hits, {} misses, {} evictions, {}/{} entries)",
                samples,
                elevation,
                start.elapsed(),
                stats.hits,
                stats.misses,
                stats.evictions,
                stats.len,
                stats.capacity,
            ),
            None => log::debug!(
                "Rendered {} samples at elevation {:.4} rad in {:.2?} (cache disabled)",
                samples,
                elevation,
                start.elapsed(),
            ),
        }

        Ok(out)
    }

    /// Single-scattered radiance arriving at the camera along `view_dir`.
    pub fn inscatter(&mut self, view_dir: Vector3, sun_dir: Vector3) -> Vector3 {
        let medium = *self.engine.medium();
        let camera = Vector3::new(0.0, medium.ground_radius, 0.0);
        let ray = Ray::new(camera, view_dir);

        // No hit, or only behind the camera: deep space
        let Some(distance) = ray.intersect_sphere(medium.top_radius).forward_distance() else {
            return Vector3::ZERO;
        };

        let steps = self.config.render.samples;
        let step = distance / steps as f64;

        let camera_up = vector::normalize(camera);
        let camera_view_angle = vector::angle_between(camera_up, view_dir);
        let camera_to_space = self.engine.transmittance(0.0, camera_view_angle);
        let looking_down = vector::dot(camera_up, view_dir) < 0.0;

        let cos_theta = vector::dot(view_dir, sun_dir);
        let phase_r = rayleigh_phase(cos_theta, self.derived.rayleigh_phase);
        let phase_m = mie_phase(cos_theta, self.config.mie.asymmetry, self.derived.mie_phase);

        let mut total = Vector3::ZERO;
        for i in 0..steps {
            let point = ray.at((i as f64 + 0.5) * step);
            let radius = vector::length(point);
            let height = radius - medium.ground_radius;
            if height < 0.0 {
                // Inside the planet body: nothing scatters here
                continue;
            }
            let up = vector::scale(point, 1.0 / radius);

            let sample_to_space = self
                .engine
                .transmittance(height, vector::angle_between(up, view_dir));
            let camera_to_sample = if looking_down {
                transmittance_ratio(sample_to_space, camera_to_space)
            } else {
                transmittance_ratio(camera_to_space, sample_to_space)
            };
            let to_sun = self
                .engine
                .transmittance(height, vector::angle_between(up, sun_dir));

            let scattering = vector::add(
                vector::scale(
                    medium.rayleigh_scattering,
                    medium.rayleigh_density(height) * phase_r,
                ),
                Vector3::splat(medium.mie_scattering * medium.mie_density(height) * phase_m),
            );
            total = vector::add(total, vector::scale(to_sun * scattering * camera_to_sample, step));
        }

        vector::scale(total, self.config.render.sun_intensity)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
