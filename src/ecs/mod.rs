//! Entity Component System integration with hecs.

pub mod components;
