//! Skytint - physically based sky gradients from a location and a moment

pub mod core;
pub mod math;
pub mod atmosphere;

pub use atmosphere::{
    generate_batch, AtmosphereConfig, GradientDescriptor, Location, SkySystem,
};
pub use crate::core::Error;
