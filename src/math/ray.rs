//! Ray type and sphere intersection

use super::vector::{self, Vector3};

/// Result of intersecting a ray with a sphere.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SphereHit {
    /// Ray parameter of the relevant root. Negative when the whole sphere
    /// lies behind the ray origin.
    Hit(f64),
    /// The ray's line never touches the sphere.
    Miss,
}

impl SphereHit {
    /// Hit distance, if any.
    #[inline]
    pub fn distance(self) -> Option<f64> {
        match self {
            SphereHit::Hit(t) => Some(t),
            SphereHit::Miss => None,
        }
    }

    /// Hit distance, only if strictly in front of the origin.
    #[inline]
    pub fn forward_distance(self) -> Option<f64> {
        self.distance().filter(|t| *t > 0.0)
    }
}

/// A ray defined by origin and direction
#[derive(Clone, Copy, Debug)]
pub struct Ray {
    pub origin: Vector3,
    pub direction: Vector3,
}

impl Ray {
    /// Create a new ray (direction should be normalized)
    pub fn new(origin: Vector3, direction: Vector3) -> Self {
        Self { origin, direction }
    }

    /// Get point along ray at parameter t
    #[inline]
    pub fn at(&self, t: f64) -> Vector3 {
        vector::add(self.origin, vector::scale(self.direction, t))
    }

    /// Intersect with a sphere of `radius` centered at the world origin.
    ///
    /// Solves the quadratic in the ray parameter. A negative discriminant is a
    /// [`SphereHit::Miss`]. Otherwise the near root is returned, unless it is
    /// negative (origin inside the sphere), in which case the far root is.
    pub fn intersect_sphere(&self, radius: f64) -> SphereHit {
        let a = vector::dot(self.direction, self.direction);
        if a == 0.0 {
            return SphereHit::Miss;
        }
        let b = 2.0 * vector::dot(self.origin, self.direction);
        let c = vector::dot(self.origin, self.origin) - radius * radius;
        let discriminant = b * b - 4.0 * a * c;
        if discriminant < 0.0 {
            return SphereHit::Miss;
        }

        let root = discriminant.sqrt();
        let near = (-b - root) / (2.0 * a);
        let far = (-b + root) / (2.0 * a);
        if near < 0.0 {
            SphereHit::Hit(far)
        } else {
            SphereHit::Hit(near)
        }
    }
}
