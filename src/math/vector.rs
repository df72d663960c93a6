//! Fixed three-component vector operations.
//!
//! [`Vector3`] is glam's `DVec3`: the dimension is part of the type, so none of
//! these functions can fail. The free functions pin down the edge-case
//! behavior the ray marcher depends on.

pub use crate::core::types::DVec3 as Vector3;

/// Dot product.
#[inline]
pub fn dot(a: Vector3, b: Vector3) -> f64 {
    a.dot(b)
}

/// Euclidean length.
#[inline]
pub fn length(v: Vector3) -> f64 {
    v.length()
}

/// Unit vector in the direction of `v`.
///
/// Returns [`Vector3::ZERO`] when `v` has length exactly zero.
#[inline]
pub fn normalize(v: Vector3) -> Vector3 {
    let len = v.length();
    if len == 0.0 {
        Vector3::ZERO
    } else {
        v / len
    }
}

/// Componentwise sum.
#[inline]
pub fn add(a: Vector3, b: Vector3) -> Vector3 {
    a + b
}

/// Multiply every component by `s`.
#[inline]
pub fn scale(v: Vector3, s: f64) -> Vector3 {
    v * s
}

/// Elementwise `e^x`.
#[inline]
pub fn exp(v: Vector3) -> Vector3 {
    Vector3::new(v.x.exp(), v.y.exp(), v.z.exp())
}

/// Angle in radians between two unit vectors.
///
/// The cosine is clamped to `[-1, 1]` so rounding never yields NaN.
#[inline]
pub fn angle_between(a: Vector3, b: Vector3) -> f64 {
    dot(a, b).clamp(-1.0, 1.0).acos()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
