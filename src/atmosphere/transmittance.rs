//! Atmospheric transmittance along straight rays, with an LRU cache.
//!
//! [`TransmittanceEngine::transmittance`] integrates Rayleigh, Mie and ozone
//! optical depth from a point at height `h` toward the top of the atmosphere
//! and returns `exp(-tau)` per channel. Inputs are quantized before
//! integration whether or not the cache is enabled, so a cache hit returns
//! bit-for-bit what a fresh integration would.

use lru::LruCache;

use crate::atmosphere::config::{AtmosphereConfig, DerivedConstants};
use crate::math::vector::{self, Vector3};
use crate::math::Ray;

/// Height quantum (meters) of cache keys.
const HEIGHT_QUANTUM: f64 = 1e-2;
/// Angle quantum (radians) of cache keys.
const ANGLE_QUANTUM: f64 = 1e-6;

// ---------------------------------------------------------------------------
// Medium
// ---------------------------------------------------------------------------

/// Density profiles and extinction coefficients of the atmosphere.
#[derive(Clone, Copy, Debug)]
pub struct Medium {
    pub rayleigh_scattering: Vector3,
    pub rayleigh_scale_height: f64,
    pub mie_scattering: f64,
    pub mie_extinction: f64,
    pub mie_scale_height: f64,
    pub ozone_absorption: Vector3,
    pub ozone_peak_altitude: f64,
    pub ozone_half_width: f64,
    pub ground_radius: f64,
    pub top_radius: f64,
}

impl Medium {
    pub fn new(config: &AtmosphereConfig, derived: &DerivedConstants) -> Self {
        Self {
            rayleigh_scattering: Vector3::from_array(config.rayleigh.scattering),
            rayleigh_scale_height: config.rayleigh.scale_height,
            mie_scattering: config.mie.scattering,
            mie_extinction: derived.mie_extinction,
            mie_scale_height: config.mie.scale_height,
            ozone_absorption: Vector3::from_array(config.ozone.absorption),
            ozone_peak_altitude: config.ozone.peak_altitude,
            ozone_half_width: config.ozone.half_width,
            ground_radius: config.planet.ground_radius,
            top_radius: config.planet.top_radius,
        }
    }

    #[inline]
    pub fn rayleigh_density(&self, height: f64) -> f64 {
        (-height / self.rayleigh_scale_height).exp()
    }

    #[inline]
    pub fn mie_density(&self, height: f64) -> f64 {
        (-height / self.mie_scale_height).exp()
    }

    /// Tent profile peaking at `ozone_peak_altitude`, clamped to `[0, 1]`.
    #[inline]
    pub fn ozone_density(&self, height: f64) -> f64 {
        let d = 1.0 - (height - self.ozone_peak_altitude).abs() / self.ozone_half_width;
        d.clamp(0.0, 1.0)
    }

    /// `exp(-tau)` for accumulated optical depths.
    ///
    /// Paths through the planet body can drive densities to infinity; any
    /// channel whose optical depth is not a number is treated as opaque.
    pub fn transmittance(&self, depth: &OpticalDepth) -> Vector3 {
        let tau = self.rayleigh_scattering * depth.rayleigh
            + Vector3::splat(self.mie_extinction * depth.mie)
            + self.ozone_absorption * depth.ozone;
        let t = vector::exp(-tau);
        Vector3::new(opaque_if_nan(t.x), opaque_if_nan(t.y), opaque_if_nan(t.z))
    }
}

#[inline]
fn opaque_if_nan(t: f64) -> f64 {
    if t.is_nan() { 0.0 } else { t }
}

/// Density integrals (meters) along a path, one per constituent.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct OpticalDepth {
    pub rayleigh: f64,
    pub mie: f64,
    pub ozone: f64,
}

// ---------------------------------------------------------------------------
// Cache
// ---------------------------------------------------------------------------

/// `(height, angle)` quantized to fixed-point integers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SampleKey {
    height: i64,
    angle: i64,
}

impl SampleKey {
    pub fn quantize(height: f64, angle: f64) -> Self {
        Self {
            height: (height / HEIGHT_QUANTUM).round() as i64,
            angle: (angle / ANGLE_QUANTUM).round() as i64,
        }
    }

    #[inline]
    pub fn height(&self) -> f64 {
        self.height as f64 * HEIGHT_QUANTUM
    }

    #[inline]
    pub fn angle(&self) -> f64 {
        self.angle as f64 * ANGLE_QUANTUM
    }
}

/// Snapshot of cache counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub len: usize,
    pub capacity: usize,
}

/// Bounded least-recently-used cache of transmittance samples.
///
/// When an insert finds the cache full, the least recently used quarter of
/// the capacity is evicted in one go. Every successful lookup refreshes
/// recency.
pub struct TransmittanceCache {
    entries: LruCache<SampleKey, Vector3>,
    capacity: usize,
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl TransmittanceCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: LruCache::unbounded(),
            capacity: capacity.max(1),
            hits: 0,
            misses: 0,
            evictions: 0,
        }
    }

    pub fn get(&mut self, key: &SampleKey) -> Option<Vector3> {
        match self.entries.get(key) {
            Some(value) => {
                self.hits += 1;
                Some(*value)
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    pub fn insert(&mut self, key: SampleKey, value: Vector3) {
        if !self.entries.contains(&key) && self.entries.len() >= self.capacity {
            self.evict_oldest();
        }
        self.entries.put(key, value);
    }

    fn evict_oldest(&mut self) {
        let count = (self.capacity / 4).max(1);
        for _ in 0..count {
            if self.entries.pop_lru().is_none() {
                break;
            }
            self.evictions += 1;
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &SampleKey) -> bool {
        self.entries.contains(key)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            evictions: self.evictions,
            len: self.entries.len(),
            capacity: self.capacity,
        }
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Computes (height, angle) -> per-channel transmittance to space.
pub struct TransmittanceEngine {
    medium: Medium,
    samples: usize,
    cache: Option<TransmittanceCache>,
}

impl TransmittanceEngine {
    /// Build an engine from an already validated configuration.
    pub fn new(config: &AtmosphereConfig, derived: &DerivedConstants) -> Self {
        let cache = config
            .cache
            .enabled
            .then(|| TransmittanceCache::new(config.cache.capacity));
        Self {
            medium: Medium::new(config, derived),
            samples: config.render.samples,
            cache,
        }
    }

    #[inline]
    pub fn medium(&self) -> &Medium {
        &self.medium
    }

    /// Transmittance from `height` meters above ground toward space, along a
    /// direction `angle` radians from the local vertical.
    pub fn transmittance(&mut self, height: f64, angle: f64) -> Vector3 {
        let key = SampleKey::quantize(height, angle);
        if let Some(hit) = self.cache.as_mut().and_then(|c| c.get(&key)) {
            return hit;
        }

        let value = self.integrate(key.height(), key.angle());
        if let Some(cache) = self.cache.as_mut() {
            cache.insert(key, value);
        }
        value
    }

    /// Midpoint-rule integration of optical depth up to the top sphere.
    /// Unquantized and uncached.
    pub fn integrate(&self, height: f64, angle: f64) -> Vector3 {
        let medium = &self.medium;
        let origin = Vector3::new(0.0, medium.ground_radius + height, 0.0);
        let ray = Ray::new(origin, Vector3::new(angle.sin(), angle.cos(), 0.0));

        let Some(distance) = ray.intersect_sphere(medium.top_radius).forward_distance() else {
            return Vector3::ONE;
        };

        let step = distance / self.samples as f64;
        let mut depth = OpticalDepth::default();
        for i in 0..self.samples {
            let point = ray.at((i as f64 + 0.5) * step);
            let h = vector::length(point) - medium.ground_radius;
            depth.rayleigh += medium.rayleigh_density(h) * step;
            depth.mie += medium.mie_density(h) * step;
            depth.ozone += medium.ozone_density(h) * step;
        }

        medium.transmittance(&depth)
    }

    pub fn cache_enabled(&self) -> bool {
        self.cache.is_some()
    }

    /// Cache counters, or `None` when caching is disabled.
    pub fn stats(&self) -> Option<CacheStats> {
        self.cache.as_ref().map(TransmittanceCache::stats)
    }

    /// Drop all cached samples (end of a render session).
    pub fn clear_cache(&mut self) {
        if let Some(cache) = self.cache.as_mut() {
            cache.clear();
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    fn engine_with(enabled: bool, capacity: usize) -> TransmittanceEngine {
        let mut config = AtmosphereConfig::default();
        config.cache.enabled = enabled;
        config.cache.capacity = capacity;
        TransmittanceEngine::new(&config, &config.derived())
    }

    fn in_unit_range(t: Vector3) -> bool {
        t.to_array().iter().all(|c| (0.0..=1.0).contains(c))
    }

    #[test]
    fn test_zenith_blue_below_red() {
        let mut engine = engine_with(true, 64);
        let t = engine.transmittance(0.0, 0.0);
        assert!(in_unit_range(t), "{t:?}");
        assert!(t.z < t.x, "blue {} should be below red {}", t.z, t.x);
        assert!(t.z < t.y && t.y < t.x, "expected R > G > B, got {t:?}");
    }

    #[test]
    fn test_grazing_path_darker_than_zenith() {
        let mut engine = engine_with(true, 64);
        let zenith = engine.transmittance(0.0, 0.0);
        let horizon = engine.transmittance(0.0, FRAC_PI_2);
        assert!(horizon.x < zenith.x);
        assert!(horizon.z < zenith.z);
        assert!(in_unit_range(horizon));
    }

    #[test]
    fn test_higher_start_transmits_more() {
        let mut engine = engine_with(false, 0);
        let low = engine.transmittance(0.0, 0.3);
        let high = engine.transmittance(20_000.0, 0.3);
        assert!(high.z > low.z);
    }

    #[test]
    fn test_outside_atmosphere_looking_away_is_clear() {
        let engine = engine_with(false, 0);
        // 200 km above ground, looking straight up: top sphere is behind
        assert_eq!(engine.integrate(200_000.0, 0.0), Vector3::ONE);
        // Far enough out that a sideways ray misses the sphere entirely
        assert_eq!(engine.integrate(200_000.0, FRAC_PI_2), Vector3::ONE);
    }

    #[test]
    fn test_path_through_planet_is_opaque_not_nan() {
        let engine = engine_with(false, 0);
        let t = engine.integrate(0.0, std::f64::consts::PI);
        assert!(!t.is_nan());
        assert!(t.max_element() < 1e-6, "{t:?}");
    }

    #[test]
    fn test_ozone_profile() {
        let config = AtmosphereConfig::default();
        let medium = Medium::new(&config, &config.derived());
        assert_eq!(medium.ozone_density(25_000.0), 1.0);
        assert!((medium.ozone_density(17_500.0) - 0.5).abs() < 1e-12);
        assert_eq!(medium.ozone_density(0.0), 0.0);
        assert_eq!(medium.ozone_density(60_000.0), 0.0);
    }

    #[test]
    fn test_cache_is_transparent() {
        let mut cached = engine_with(true, 16);
        let mut uncached = engine_with(false, 0);
        // Revisit keys so that hits, misses and evictions all occur
        for round in 0..3 {
            for i in 0..40 {
                let h = i as f64 * 123.456;
                let a = i as f64 * 0.0371 + round as f64 * 1e-9;
                let a_val = cached.transmittance(h, a);
                let b_val = uncached.transmittance(h, a);
                assert!((a_val - b_val).abs().max_element() < 1e-12, "h={h} a={a}");
            }
        }
        let stats = cached.stats().unwrap();
        assert!(stats.evictions > 0);
        assert!(stats.len <= 16);
        assert!(cached.cache_enabled());
        assert!(!uncached.cache_enabled());
        assert!(uncached.stats().is_none());
    }

    #[test]
    fn test_cache_hits_on_repeat() {
        let mut engine = engine_with(true, 8);
        engine.transmittance(100.0, 0.5);
        engine.transmittance(100.0, 0.5);
        // Within the quantum: same key
        engine.transmittance(100.001, 0.5000001);
        let stats = engine.stats().unwrap();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.len, 1);

        engine.clear_cache();
        assert_eq!(engine.stats().unwrap().len, 0);
    }

    #[test]
    fn test_lru_evicts_oldest_quarter() {
        let mut cache = TransmittanceCache::new(8);
        let keys: Vec<SampleKey> = (0..8).map(|i| SampleKey::quantize(i as f64, 0.0)).collect();
        for k in &keys {
            cache.insert(*k, Vector3::ONE);
        }
        assert_eq!(cache.len(), 8);

        // Touch the two oldest so they become most recent
        assert!(cache.get(&keys[0]).is_some());
        assert!(cache.get(&keys[1]).is_some());

        cache.insert(SampleKey::quantize(100.0, 0.0), Vector3::ZERO);
        // Quarter of 8 = 2 evicted, then one inserted
        assert_eq!(cache.len(), 7);
        assert_eq!(cache.stats().evictions, 2);
        assert!(cache.contains(&keys[0]));
        assert!(cache.contains(&keys[1]));
        assert!(!cache.contains(&keys[2]));
        assert!(!cache.contains(&keys[3]));
        assert!(cache.contains(&keys[4]));
    }

    #[test]
    fn test_reinsert_existing_key_does_not_evict() {
        let mut cache = TransmittanceCache::new(4);
        for i in 0..4 {
            cache.insert(SampleKey::quantize(i as f64, 0.0), Vector3::ONE);
        }
        cache.insert(SampleKey::quantize(0.0, 0.0), Vector3::ZERO);
        assert_eq!(cache.len(), 4);
        assert_eq!(cache.stats().evictions, 0);
    }

    #[test]
    fn test_key_quantization() {
        let k = SampleKey::quantize(1234.5678, 0.1234567);
        assert!((k.height() - 1234.57).abs() < 1e-9);
        assert!((k.angle() - 0.123457).abs() < 1e-12);
        assert_eq!(k, SampleKey::quantize(1234.574, 0.12345665));
    }
}
