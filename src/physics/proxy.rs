//! Per-step collision proxies.
//!
//! Every substep the cache is rebuilt wholesale from all entities owning a
//! [`Collider`]: a flat array of lightweight snapshots (world matrix, shape,
//! loose bounding-sphere estimate, classification flags). No incremental
//! diffing — prior-step proxies are discarded, trading a little CPU for a
//! lot of bookkeeping simplicity.

use glam::{Mat4, Vec3};

use crate::ecs::components::physics::{Collider, ColliderShape, PhysicsBody};
use crate::ecs::components::transform::GlobalTransform;

use super::hull::HullRegistry;

/// Classification bits combined from the collider and the body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProxyFlags(u8);

impl ProxyFlags {
    /// Sensor collider: overlap events only, no physical response.
    pub const TRIGGER: ProxyFlags = ProxyFlags(1);
    /// No `PhysicsBody` component: immovable.
    pub const NO_BODY: ProxyFlags = ProxyFlags(1 << 1);
    /// Kinematic body: user-moved, ignores impulses.
    pub const KINEMATIC: ProxyFlags = ProxyFlags(1 << 2);

    pub fn contains(self, other: ProxyFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: ProxyFlags) {
        self.0 |= other.0;
    }
}

/// Read-only per-step snapshot of one collidable entity.
#[derive(Debug, Clone)]
pub struct Proxy {
    pub entity: hecs::Entity,
    pub matrix: Mat4,
    pub shape: ColliderShape,
    /// Center of the loose bounding sphere (world space).
    pub center: Vec3,
    /// Radius of the loose bounding sphere. Always an over-estimate.
    pub radius: f32,
    pub flags: ProxyFlags,
    pub layer: u32,
}

impl Proxy {
    pub fn is_trigger(&self) -> bool {
        self.flags.contains(ProxyFlags::TRIGGER)
    }

    /// Whether the proxy can ever move (has a body, static meshes excluded).
    pub fn is_dynamic(&self) -> bool {
        !self.flags.contains(ProxyFlags::NO_BODY)
    }
}

/// Flat array of proxies, rebuilt once per substep.
#[derive(Debug, Default)]
pub struct ProxyCache {
    proxies: Vec<Proxy>,
}

impl ProxyCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the full proxy array from every entity with a collider.
    pub fn update(&mut self, world: &hecs::World, hulls: &HullRegistry) {
        self.proxies.clear();

        for (entity, (collider, transform, body)) in world
            .query::<(&Collider, &GlobalTransform, Option<&PhysicsBody>)>()
            .iter()
        {
            let mut matrix = transform.0;
            if collider.offset != Vec3::ZERO {
                matrix *= Mat4::from_translation(collider.offset);
            }

            let scale = Vec3::new(
                matrix.x_axis.truncate().length(),
                matrix.y_axis.truncate().length(),
                matrix.z_axis.truncate().length(),
            );
            debug_assert!(
                scale.x > 0.0 && scale.y > 0.0 && scale.z > 0.0,
                "collider on {:?} has a degenerate scale {:?}",
                entity,
                scale
            );
            let max_scale = scale.x.max(scale.y).max(scale.z);

            let radius = match &collider.shape {
                ColliderShape::Box { half_extents } => (*half_extents * scale).length(),
                ColliderShape::Sphere { radius } => radius * max_scale,
                ColliderShape::Capsule {
                    radius,
                    half_height,
                } => (half_height + radius) * max_scale,
                ColliderShape::ConvexHull { hull } => match hulls.get(*hull) {
                    Ok(data) => data.max_extent * max_scale,
                    Err(err) => {
                        tracing::warn!(?entity, %err, "skipping collider with unresolved hull");
                        continue;
                    }
                },
            };

            let mut flags = ProxyFlags::default();
            if collider.is_sensor {
                flags.insert(ProxyFlags::TRIGGER);
            }
            match body {
                None => flags.insert(ProxyFlags::NO_BODY),
                Some(b) if b.kinematic => flags.insert(ProxyFlags::KINEMATIC),
                Some(_) => {}
            }

            self.proxies.push(Proxy {
                entity,
                center: matrix.w_axis.truncate(),
                matrix,
                shape: collider.shape.clone(),
                radius,
                flags,
                layer: collider.layer,
            });
        }
    }

    /// Snapshot slice, valid until the next [`update`](Self::update).
    pub fn proxies(&self) -> &[Proxy] {
        &self.proxies
    }
}
