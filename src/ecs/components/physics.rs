//! Physics components for ECS entities.
//!
//! An entity participates in collision detection when it has a [`Collider`]
//! and a [`GlobalTransform`](super::transform::GlobalTransform). It only
//! responds to forces and impulses when it also has a [`PhysicsBody`];
//! entities without one are treated as immovable (inverse mass and inverse
//! inertia of zero).

use glam::{Mat3, Vec3};

use crate::physics::hull::HullId;

/// Rigid body component. Precomputes inverse mass and inverse inertia so the
/// solver never divides at runtime.
#[derive(Debug, Clone)]
pub struct PhysicsBody {
    /// Kinematic bodies are moved by the user and ignore solver impulses.
    pub kinematic: bool,
    /// Whether gravity is applied each substep.
    pub use_gravity: bool,
    /// Inverse mass. Zero for kinematic bodies.
    pub inv_mass: f32,
    /// Inverse inertia tensor in body space.
    pub inv_inertia_local: Mat3,
    /// Inverse inertia tensor in world space. Advanced once per substep from
    /// the current orientation.
    pub inv_inertia_world: Mat3,
    pub linear_velocity: Vec3,
    pub angular_velocity: Vec3,
    /// Linear drag factor per second (exponential decay).
    pub linear_drag: f32,
    /// Angular drag factor per second (exponential decay).
    pub angular_drag: f32,
    /// Sleeping bodies skip gravity and integration until an impulse wakes
    /// them. Only set when sleeping is enabled in the config.
    pub asleep: bool,
    /// Consecutive substeps spent below the sleep velocity thresholds.
    pub low_motion_frames: u32,
}

impl PhysicsBody {
    /// Dynamic body with a unit-sphere mass distribution.
    pub fn dynamic(mass: f32) -> Self {
        Self::dynamic_sphere(mass, 1.0)
    }

    /// Dynamic body with the inertia of a solid box of the given half-extents.
    pub fn dynamic_box(mass: f32, half_extents: Vec3) -> Self {
        let h = half_extents;
        let ix = mass / 3.0 * (h.y * h.y + h.z * h.z);
        let iy = mass / 3.0 * (h.x * h.x + h.z * h.z);
        let iz = mass / 3.0 * (h.x * h.x + h.y * h.y);
        Self::from_inertia(mass, Vec3::new(ix, iy, iz))
    }

    /// Dynamic body with the inertia of a solid sphere of the given radius.
    pub fn dynamic_sphere(mass: f32, radius: f32) -> Self {
        let i = 0.4 * mass * radius * radius;
        Self::from_inertia(mass, Vec3::splat(i))
    }

    /// Kinematic body: manually moved, unaffected by forces and impulses.
    pub fn kinematic() -> Self {
        Self {
            kinematic: true,
            use_gravity: false,
            inv_mass: 0.0,
            inv_inertia_local: Mat3::ZERO,
            inv_inertia_world: Mat3::ZERO,
            linear_velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            linear_drag: 0.0,
            angular_drag: 0.0,
            asleep: false,
            low_motion_frames: 0,
        }
    }

    fn from_inertia(mass: f32, diagonal: Vec3) -> Self {
        debug_assert!(mass > 0.0, "dynamic body requires positive mass");
        let inv = Vec3::new(
            if diagonal.x > 0.0 { 1.0 / diagonal.x } else { 0.0 },
            if diagonal.y > 0.0 { 1.0 / diagonal.y } else { 0.0 },
            if diagonal.z > 0.0 { 1.0 / diagonal.z } else { 0.0 },
        );
        let inv_inertia = Mat3::from_diagonal(inv);
        Self {
            kinematic: false,
            use_gravity: true,
            inv_mass: 1.0 / mass,
            inv_inertia_local: inv_inertia,
            inv_inertia_world: inv_inertia,
            linear_velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            linear_drag: 0.01,
            angular_drag: 0.01,
            asleep: false,
            low_motion_frames: 0,
        }
    }

    /// Apply a linear impulse at the center of mass and wake the body.
    pub fn apply_impulse(&mut self, impulse: Vec3) {
        self.linear_velocity += impulse * self.inv_mass;
        self.wake();
    }

    /// Clear the sleep state.
    pub fn wake(&mut self) {
        self.asleep = false;
        self.low_motion_frames = 0;
    }
}

/// Collider shape. Capsules run along the local Y axis; convex hulls reference
/// externally-owned vertex data through the hull registry.
#[derive(Debug, Clone)]
pub enum ColliderShape {
    Box { half_extents: Vec3 },
    Sphere { radius: f32 },
    Capsule { radius: f32, half_height: f32 },
    ConvexHull { hull: HullId },
}

/// Collision detection component.
#[derive(Debug, Clone)]
pub struct Collider {
    pub shape: ColliderShape,
    /// Offset from the entity's transform origin.
    pub offset: Vec3,
    /// Sensors detect overlap and fire trigger events but exert no physical
    /// response.
    pub is_sensor: bool,
    /// Layer bitmask for raycast filtering.
    pub layer: u32,
}

impl Collider {
    pub fn new(shape: ColliderShape) -> Self {
        Self {
            shape,
            offset: Vec3::ZERO,
            is_sensor: false,
            layer: 1,
        }
    }

    pub fn sensor(shape: ColliderShape) -> Self {
        Self {
            is_sensor: true,
            ..Self::new(shape)
        }
    }

    pub fn with_layer(mut self, layer: u32) -> Self {
        self.layer = layer;
        self
    }
}

/// Surface material. Friction and restitution combine multiplicatively per
/// contact pair; entities without the component use [`PhysicsMaterial::default`].
#[derive(Debug, Clone, Copy)]
pub struct PhysicsMaterial {
    pub friction: f32,
    pub restitution: f32,
}

impl Default for PhysicsMaterial {
    fn default() -> Self {
        Self {
            friction: 0.5,
            restitution: 0.3,
        }
    }
}

/// Restricts translation or rotation along world axes. The solver zeroes the
/// corresponding velocity components every iteration.
#[derive(Debug, Clone, Copy, Default)]
pub struct AxisLock {
    pub linear: [bool; 3],
    pub angular: [bool; 3],
}

impl AxisLock {
    /// Lock all rotation, leaving translation free (upright characters).
    pub fn frozen_rotation() -> Self {
        Self {
            linear: [false; 3],
            angular: [true; 3],
        }
    }
}
