//! Mathematical utilities

pub mod ray;
pub mod vector;

pub use ray::{Ray, SphereHit};
pub use vector::Vector3;
