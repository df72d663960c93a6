//! Physically based sky gradients.
//!
//! Turns a location and moment into a vertical color gradient: solar position,
//! a single-scattering ray march through a Rayleigh/Mie/ozone atmosphere, and a
//! tonemapping pipeline that quantizes radiance into CSS color stops. The main
//! entry point is [`SkySystem`]; [`generate_batch`] renders many locations in
//! parallel.

pub mod config;
pub mod gradient;
pub mod post;
pub mod renderer;
pub mod sun;
pub mod transmittance;

// Re-exports
pub use config::{
    AtmosphereConfig, CacheConfig, DerivedConstants, MieConfig, OzoneConfig, PlanetConfig,
    RayleighConfig, RenderConfig,
};
pub use gradient::{ColorStop, GradientBuilder, GradientDescriptor, Rgb, FALLBACK_RGB};
pub use post::PostProcess;
pub use renderer::{RadianceSample, SkyRenderer};
pub use sun::SolarPosition;
pub use transmittance::{CacheStats, TransmittanceEngine};

use rayon::prelude::*;

use crate::core::Result;

// ---------------------------------------------------------------------------
// SkySystem
// ---------------------------------------------------------------------------

/// One render session: a [`SkyRenderer`] with its transmittance cache and the
/// post-processing stage.
///
/// Rendering mutates the cache, so a `SkySystem` is used from one thread at a
/// time. Concurrent callers should each own a system (see [`generate_batch`])
/// or share one behind a `Mutex`.
pub struct SkySystem {
    renderer: SkyRenderer,
    post: PostProcess,
}

impl SkySystem {
    /// Create a new sky system. Fails if the configuration is invalid.
    pub fn new(config: AtmosphereConfig) -> Result<Self> {
        let post = PostProcess::from_config(&config.render);
        let renderer = SkyRenderer::new(config)?;
        Ok(Self { renderer, post })
    }

    /// Gradient for a location at `timestamp` (Unix seconds, `None` = now).
    ///
    /// Never fails: any error is logged and replaced by
    /// [`GradientDescriptor::fallback`].
    pub fn generate(
        &mut self,
        latitude: f64,
        longitude: f64,
        timestamp: Option<i64>,
    ) -> GradientDescriptor {
        self.try_generate(latitude, longitude, timestamp)
            .unwrap_or_else(|e| {
                log::warn!(
                    "Sky gradient for ({latitude}, {longitude}) at {timestamp:?} failed, using fallback: {e}"
                );
                GradientDescriptor::fallback()
            })
    }

    /// Like [`generate`](Self::generate) but surfaces the error.
    pub fn try_generate(
        &mut self,
        latitude: f64,
        longitude: f64,
        timestamp: Option<i64>,
    ) -> Result<GradientDescriptor> {
        let elevation = sun::solar_elevation(latitude, longitude, timestamp)?;
        self.try_generate_for_elevation(elevation)
    }

    /// Gradient for a known solar elevation (radians). Never fails.
    pub fn generate_for_elevation(&mut self, elevation: f64) -> GradientDescriptor {
        self.try_generate_for_elevation(elevation)
            .unwrap_or_else(|e| {
                log::warn!("Sky gradient at elevation {elevation} failed, using fallback: {e}");
                GradientDescriptor::fallback()
            })
    }

    pub fn try_generate_for_elevation(&mut self, elevation: f64) -> Result<GradientDescriptor> {
        let samples = self.renderer.render(elevation)?;
        let mut builder = GradientBuilder::with_capacity(samples.len());
        for sample in &samples {
            builder.push(sample.s, self.post.apply(sample.radiance)?);
        }
        builder.build()
    }

    /// Solar elevation (radians) for diagnostics and display.
    pub fn elevation(&self, latitude: f64, longitude: f64, timestamp: Option<i64>) -> Result<f64> {
        sun::solar_elevation(latitude, longitude, timestamp)
    }

    #[inline]
    pub fn config(&self) -> &AtmosphereConfig {
        self.renderer.config()
    }

    #[inline]
    pub fn renderer(&self) -> &SkyRenderer {
        &self.renderer
    }

    /// Cache counters, or `None` when caching is disabled.
    pub fn cache_stats(&self) -> Option<CacheStats> {
        self.renderer.engine().stats()
    }

    /// Discard cached transmittance samples at the end of a session.
    pub fn clear_cache(&mut self) {
        self.renderer.clear_cache();
    }
}

// ---------------------------------------------------------------------------
// Batch rendering
// ---------------------------------------------------------------------------

/// A location and moment to render.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    /// Unix seconds; `None` = now.
    pub timestamp: Option<i64>,
}

impl Location {
    pub fn new(latitude: f64, longitude: f64, timestamp: Option<i64>) -> Self {
        Self {
            latitude,
            longitude,
            timestamp,
        }
    }
}

/// Render many locations in parallel, in input order.
///
/// Each rayon worker builds its own [`SkySystem`], so caches are never shared
/// between threads. An invalid `config` yields the fallback for every entry.
pub fn generate_batch(config: &AtmosphereConfig, locations: &[Location]) -> Vec<GradientDescriptor> {
    locations
        .par_iter()
        .map_init(
            || SkySystem::new(config.clone()),
            |system, loc| match system {
                Ok(system) => system.generate(loc.latitude, loc.longitude, loc.timestamp),
                Err(e) => {
                    log::warn!("Invalid atmosphere config, using fallback: {e}");
                    GradientDescriptor::fallback()
                }
            },
        )
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
