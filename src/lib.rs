//! tumble — a fixed-timestep rigid body physics pipeline.
//!
//! The crate detects collisions among a dynamic set of moving and static
//! bodies and resolves contact and joint constraints so bodies do not
//! interpenetrate. Component data (`Transform`, `Collider`, `PhysicsBody`)
//! lives in an external [`hecs::World`]; the pipeline reads and writes it
//! with a fixed ordering of stages.
//!
//! # Pipeline
//!
//! Once per fixed substep:
//!
//! 1. Rebuild the proxy cache (per-body collision snapshots)
//! 2. Broadphase: single-axis sweep-and-prune over bounding spheres
//! 3. Narrowphase: exact shape tests, contact generation
//! 4. Concave phase: dynamic shapes vs. static triangle geometry
//! 5. Merge contacts into persistent per-pair manifolds
//! 6. Build contact/joint/freedom constraints (warm-started)
//! 7. Sequential impulse solve with Baumgarte stabilization
//! 8. Cache impulses, integrate, fire enter/exit events
//!
//! # Example
//!
//! ```
//! use glam::Vec3;
//! use tumble::ecs::components::physics::{Collider, ColliderShape, PhysicsBody};
//! use tumble::ecs::components::transform::{GlobalTransform, Transform};
//! use tumble::physics::{PhysicsConfig, PhysicsWorld};
//!
//! let mut world = hecs::World::new();
//! let mut physics = PhysicsWorld::new(PhysicsConfig::default());
//!
//! world.spawn((
//!     Transform::from_position(Vec3::new(0.0, 5.0, 0.0)),
//!     GlobalTransform::default(),
//!     PhysicsBody::dynamic_box(1.0, Vec3::ONE),
//!     Collider::new(ColliderShape::Box { half_extents: Vec3::ONE }),
//! ));
//!
//! physics.step(&mut world, 1.0 / 60.0);
//! ```

pub mod ecs;
pub mod physics;

pub mod prelude {
    pub use crate::ecs::components::physics::{
        AxisLock, Collider, ColliderShape, PhysicsBody, PhysicsMaterial,
    };
    pub use crate::ecs::components::transform::{GlobalTransform, Transform};
    pub use crate::physics::{
        PhysicsConfig, PhysicsError, PhysicsEvent, PhysicsEventKind, PhysicsWorld,
    };
}
