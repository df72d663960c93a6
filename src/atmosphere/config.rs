//! Atmosphere configuration with Earth-like defaults.

use std::f64::consts::PI;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::{Error, Result};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Full atmosphere configuration. Physical lengths are in meters and
/// coefficients are per meter.
///
/// Constructed once and never mutated by the renderer; it is copied into each
/// [`SkyRenderer`](super::renderer::SkyRenderer), so one value can seed any
/// number of independent render sessions.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AtmosphereConfig {
    /// Molecular scattering.
    pub rayleigh: RayleighConfig,
    /// Aerosol scattering.
    pub mie: MieConfig,
    /// Ozone layer absorption.
    pub ozone: OzoneConfig,
    /// Planet and atmosphere shell radii.
    pub planet: PlanetConfig,
    /// Sampling and display parameters.
    pub render: RenderConfig,
    /// Transmittance cache parameters.
    pub cache: CacheConfig,
}

impl AtmosphereConfig {
    /// Check every parameter, failing on the first one out of range.
    pub fn validate(&self) -> Result<()> {
        for (i, c) in self.rayleigh.scattering.iter().enumerate() {
            non_negative(&format!("rayleigh.scattering[{i}]"), *c)?;
        }
        positive("rayleigh.scale_height", self.rayleigh.scale_height)?;

        non_negative("mie.scattering", self.mie.scattering)?;
        non_negative("mie.absorption", self.mie.absorption)?;
        positive("mie.scale_height", self.mie.scale_height)?;
        if !self.mie.asymmetry.is_finite() || self.mie.asymmetry.abs() >= 1.0 {
            return Err(invalid("mie.asymmetry", self.mie.asymmetry, "must lie in (-1, 1)"));
        }

        for (i, c) in self.ozone.absorption.iter().enumerate() {
            non_negative(&format!("ozone.absorption[{i}]"), *c)?;
        }
        non_negative("ozone.peak_altitude", self.ozone.peak_altitude)?;
        positive("ozone.half_width", self.ozone.half_width)?;

        positive("planet.ground_radius", self.planet.ground_radius)?;
        positive("planet.top_radius", self.planet.top_radius)?;
        if self.planet.top_radius <= self.planet.ground_radius {
            return Err(invalid(
                "planet.top_radius",
                self.planet.top_radius,
                "must exceed planet.ground_radius",
            ));
        }

        if self.render.samples < 2 {
            return Err(Error::InvalidConfig(format!(
                "render.samples = {} must be at least 2",
                self.render.samples
            )));
        }
        non_negative("render.sun_intensity", self.render.sun_intensity)?;
        let fov = self.render.field_of_view;
        if !fov.is_finite() || fov <= 0.0 || fov >= PI {
            return Err(invalid("render.field_of_view", fov, "must lie in (0, pi)"));
        }
        non_negative("render.exposure", self.render.exposure)?;
        positive("render.gamma", self.render.gamma)?;
        non_negative("render.sunset_bias", self.render.sunset_bias)?;

        if self.cache.enabled && self.cache.capacity == 0 {
            return Err(Error::InvalidConfig(
                "cache.capacity must be non-zero when the cache is enabled".to_string(),
            ));
        }

        Ok(())
    }

    /// Constants derived from the configuration, computed once per renderer.
    pub fn derived(&self) -> DerivedConstants {
        let g = self.mie.asymmetry;
        DerivedConstants {
            focal_length: 1.0 / (self.render.field_of_view * 0.5).tan(),
            rayleigh_phase: 3.0 / (16.0 * PI),
            mie_phase: 3.0 / (8.0 * PI) * (1.0 - g * g) / (2.0 + g * g),
            mie_extinction: self.mie.scattering + self.mie.absorption,
        }
    }

    /// Save to a pretty-printed JSON file (sync)
    pub fn save_sync(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, json)?;
        log::info!("Saved atmosphere config to {}", path.display());
        Ok(())
    }

    /// Load from a JSON file and validate (sync)
    pub fn load_sync(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        log::info!("Loaded atmosphere config from {}", path.display());
        Ok(config)
    }
}

fn invalid(name: &str, value: f64, requirement: &str) -> Error {
    Error::InvalidConfig(format!("{name} = {value} {requirement}"))
}

fn positive(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(name, value, "must be finite and positive"))
    }
}

fn non_negative(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(invalid(name, value, "must be finite and non-negative"))
    }
}

// ---------------------------------------------------------------------------
// Derived constants
// ---------------------------------------------------------------------------

/// Values precomputed from an [`AtmosphereConfig`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DerivedConstants {
    /// Z component of the unnormalized view direction: `1 / tan(fov / 2)`.
    pub focal_length: f64,
    /// Rayleigh phase normalization, `3 / (16 pi)`.
    pub rayleigh_phase: f64,
    /// Henyey-Greenstein (Cornette-Shanks form) normalization,
    /// `3 / (8 pi) * (1 - g^2) / (2 + g^2)`.
    pub mie_phase: f64,
    /// Mie scattering plus absorption.
    pub mie_extinction: f64,
}

// ---------------------------------------------------------------------------
// Scattering media
// ---------------------------------------------------------------------------

/// Rayleigh (molecular) scattering parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RayleighConfig {
    /// Scattering coefficient per channel (R, G, B), per meter.
    pub scattering: [f64; 3],
    /// Altitude over which density falls by `e`.
    pub scale_height: f64,
}

impl Default for RayleighConfig {
    fn default() -> Self {
        Self {
            scattering: [5.802e-6, 13.558e-6, 33.1e-6],
            scale_height: 8_000.0,
        }
    }
}

/// Mie (aerosol) scattering parameters. Wavelength independent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MieConfig {
    pub scattering: f64,
    pub absorption: f64,
    pub scale_height: f64,
    /// Henyey-Greenstein asymmetry `g`; positive is forward scattering.
    pub asymmetry: f64,
}

impl Default for MieConfig {
    fn default() -> Self {
        Self {
            scattering: 3.996e-6,
            absorption: 4.40e-6,
            scale_height: 1_200.0,
            asymmetry: 0.8,
        }
    }
}

/// Ozone absorption with a triangular density profile.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OzoneConfig {
    /// Absorption coefficient per channel, per meter.
    pub absorption: [f64; 3],
    /// Altitude of peak density (meters).
    pub peak_altitude: f64,
    /// Distance from the peak at which density reaches zero (meters).
    pub half_width: f64,
}

impl Default for OzoneConfig {
    fn default() -> Self {
        Self {
            absorption: [0.650e-6, 1.881e-6, 0.085e-6],
            peak_altitude: 25_000.0,
            half_width: 15_000.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Planet
// ---------------------------------------------------------------------------

/// Planet geometry. The camera sits on the ground sphere.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlanetConfig {
    pub ground_radius: f64,
    /// Radius of the top-of-atmosphere sphere.
    pub top_radius: f64,
}

impl Default for PlanetConfig {
    fn default() -> Self {
        Self {
            ground_radius: 6_360_000.0,
            top_radius: 6_460_000.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Render + post-processing
// ---------------------------------------------------------------------------

/// Sampling and display parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RenderConfig {
    /// View samples (= color stops), march steps per view ray, and
    /// integration steps per transmittance ray.
    pub samples: usize,
    pub sun_intensity: f64,
    /// Vertical field of view in radians.
    pub field_of_view: f64,
    /// Linear multiplier applied before tonemapping.
    pub exposure: f64,
    pub gamma: f64,
    /// Strength of the low-luminance red/blue boost.
    pub sunset_bias: f64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            samples: 32,
            sun_intensity: 20.0,
            field_of_view: std::f64::consts::FRAC_PI_3,
            exposure: 0.5,
            gamma: 2.2,
            sunset_bias: 0.15,
        }
    }
}

// ---------------------------------------------------------------------------
// Cache config
// ---------------------------------------------------------------------------

/// Transmittance cache parameters. Disabling the cache changes cost only.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    pub enabled: bool,
    /// Maximum entries before the least recently used quarter is evicted.
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            capacity: 4_096,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
