//! Component definitions consumed by the physics pipeline.

pub mod physics;
pub mod transform;
