//! Persistent contact manifolds and trigger overlap state.
//!
//! Manifolds are keyed by the unordered entity pair and survive across steps;
//! they are what make warm-starting and enter/exit events possible. Each
//! manifold holds up to four contact points with cached impulse magnitudes.
//!
//! Lifecycle per pair: a manifold starts `New` (enter event fires, then it is
//! demoted to `Stale`), flips to `Persisting` whenever a step adds a fresh
//! point, and is removed with an exit event once it is `Stale` with no
//! surviving points.

use std::collections::HashMap;

use glam::Vec3;

use crate::ecs::components::physics::PhysicsBody;
use crate::ecs::components::transform::GlobalTransform;

use super::narrowphase::ContactInfo;
use super::{PhysicsConfig, PhysicsEvent, PhysicsEventKind};

/// Canonicalized unordered entity pair (ordered by entity bits).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PairKey {
    a: hecs::Entity,
    b: hecs::Entity,
}

impl PairKey {
    pub fn new(x: hecs::Entity, y: hecs::Entity) -> Self {
        if x.to_bits() <= y.to_bits() {
            Self { a: x, b: y }
        } else {
            Self { a: y, b: x }
        }
    }

    pub fn first(&self) -> hecs::Entity {
        self.a
    }

    pub fn second(&self) -> hecs::Entity {
        self.b
    }

    pub fn contains(&self, entity: hecs::Entity) -> bool {
        self.a == entity || self.b == entity
    }
}

/// A single persistent contact point.
#[derive(Debug, Clone, Copy)]
pub struct Contact {
    /// Anchor in the first entity's local frame.
    pub local_a: Vec3,
    /// Anchor in the second entity's local frame.
    pub local_b: Vec3,
    /// World-space contact position, refreshed every step.
    pub world: Vec3,
    /// Contact normal, world space, oriented first → second.
    pub normal: Vec3,
    /// Penetration depth (non-negative).
    pub depth: f32,
    /// Accumulated normal impulse from the previous solve (warm start).
    pub normal_impulse: f32,
    /// Accumulated friction impulses along tangent and bitangent.
    pub tangent_impulse: [f32; 2],
}

/// Manifold lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifoldState {
    /// Created this step; enter event pending.
    New,
    /// Refreshed with a contact this step.
    Persisting,
    /// No fresh contact yet this step.
    Stale,
}

/// All contact points between one entity pair.
#[derive(Debug, Clone)]
pub struct Manifold {
    pub key: PairKey,
    pub state: ManifoldState,
    pub points: Vec<Contact>,
}

const MAX_CONTACTS: usize = 4;

impl Manifold {
    fn new(key: PairKey) -> Self {
        Self {
            key,
            state: ManifoldState::New,
            points: Vec::with_capacity(MAX_CONTACTS),
        }
    }

    /// Fold a contact in, respecting the four-point cap.
    ///
    /// A candidate close to an existing point refreshes it in place, keeping
    /// the cached impulses. At the cap, the candidate replaces whichever
    /// existing point leaves the largest contact patch, and the deepest point
    /// is never evicted.
    fn add_point(&mut self, contact: Contact, merge_distance: f32) {
        for p in &mut self.points {
            if (p.world - contact.world).length_squared() < merge_distance * merge_distance {
                let (ni, ti) = (p.normal_impulse, p.tangent_impulse);
                *p = contact;
                p.normal_impulse = ni;
                p.tangent_impulse = ti;
                return;
            }
        }

        if self.points.len() < MAX_CONTACTS {
            self.points.push(contact);
            return;
        }

        let deepest = self
            .points
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.depth.total_cmp(&b.depth))
            .map(|(i, _)| i)
            .unwrap_or(0);
        let candidate_is_deepest = contact.depth > self.points[deepest].depth;

        let mut best_index = None;
        let mut best_area = if candidate_is_deepest {
            // The candidate must be kept; any eviction is acceptable.
            f32::MIN
        } else {
            patch_area([
                self.points[0].world,
                self.points[1].world,
                self.points[2].world,
                self.points[3].world,
            ])
        };
        for i in 0..MAX_CONTACTS {
            if !candidate_is_deepest && i == deepest {
                continue;
            }
            let mut corners = [Vec3::ZERO; 4];
            for (j, c) in corners.iter_mut().enumerate() {
                *c = if j == i {
                    contact.world
                } else {
                    self.points[j].world
                };
            }
            let area = patch_area(corners);
            if area > best_area {
                best_area = area;
                best_index = Some(i);
            }
        }

        if let Some(i) = best_index {
            self.points[i] = contact;
        }
    }
}

/// Contact-patch area metric for four points: the largest parallelogram area
/// over the three ways of pairing them into diagonals.
fn patch_area(p: [Vec3; 4]) -> f32 {
    let a = (p[1] - p[0]).cross(p[3] - p[2]).length();
    let b = (p[2] - p[0]).cross(p[3] - p[1]).length();
    let c = (p[3] - p[0]).cross(p[2] - p[1]).length();
    a.max(b).max(c)
}

/// World transform of a pair member. Live entities without a transform
/// (e.g. the attribution entity of a static mesh) count as identity; `None`
/// means the entity is gone.
fn pair_transform(world: &hecs::World, entity: hecs::Entity) -> Option<glam::Mat4> {
    match world.get::<&GlobalTransform>(entity) {
        Ok(t) => Some(t.0),
        Err(_) if world.contains(entity) => Some(glam::Mat4::IDENTITY),
        Err(_) => None,
    }
}

/// Persistent manifold storage keyed by entity pair.
#[derive(Debug, Default)]
pub struct ManifoldCache {
    manifolds: HashMap<PairKey, Manifold>,
}

impl ManifoldCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.manifolds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.manifolds.is_empty()
    }

    pub fn get(&self, key: &PairKey) -> Option<&Manifold> {
        self.manifolds.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Manifold> {
        self.manifolds.values()
    }

    /// Refresh every manifold against current transforms and break contacts
    /// that drifted apart. Runs before narrowphase each substep.
    pub fn update(&mut self, world: &hecs::World, config: &PhysicsConfig) {
        self.manifolds.retain(|key, manifold| {
            if manifold.state == ManifoldState::Persisting {
                manifold.state = ManifoldState::Stale;
            }

            let (Some(xf_a), Some(xf_b)) = (
                pair_transform(world, key.first()),
                pair_transform(world, key.second()),
            ) else {
                // Entity destruction can race ahead of manifold cleanup.
                tracing::warn!(?key, "dropping manifold with destroyed entity");
                return false;
            };

            let break_sq =
                config.contact_drift_tolerance * config.contact_drift_tolerance;
            let mut worst_drift = break_sq;
            let mut worst_index = None;

            for (i, p) in manifold.points.iter_mut().enumerate() {
                let world_a = xf_a.transform_point3(p.local_a);
                let world_b = xf_b.transform_point3(p.local_b);
                let delta = world_b - world_a;
                let separation = delta.dot(p.normal);
                p.world = (world_a + world_b) * 0.5;
                p.depth = (-separation).max(0.0);

                if separation > config.contact_break_distance {
                    // Pulled apart along the normal: break immediately.
                    p.depth = f32::MIN;
                    continue;
                }
                let drift = (delta - p.normal * separation).length_squared();
                if drift > break_sq {
                    if config.single_tangential_break {
                        if drift >= worst_drift {
                            worst_drift = drift;
                            worst_index = Some(i);
                        }
                    } else {
                        p.depth = f32::MIN;
                    }
                }
            }
            if let Some(i) = worst_index {
                manifold.points[i].depth = f32::MIN;
            }
            manifold.points.retain(|p| p.depth != f32::MIN);

            true
        });
    }

    /// Fold freshly detected contacts (narrow and concave phases alike) into
    /// the cache. Newly colliding pairs wake both bodies.
    pub fn merge(
        &mut self,
        world: &hecs::World,
        seeds: &[(PairKey, ContactInfo)],
        config: &PhysicsConfig,
    ) {
        for (key, info) in seeds {
            let (Some(xf_a), Some(xf_b)) = (
                pair_transform(world, key.first()),
                pair_transform(world, key.second()),
            ) else {
                continue;
            };

            let manifold = self
                .manifolds
                .entry(*key)
                .or_insert_with(|| Manifold::new(*key));
            if manifold.state == ManifoldState::Stale {
                manifold.state = ManifoldState::Persisting;
            }
            if manifold.state == ManifoldState::New {
                for entity in [key.first(), key.second()] {
                    if let Ok(mut body) = world.get::<&mut PhysicsBody>(entity) {
                        body.wake();
                    }
                }
            }

            let contact = Contact {
                local_a: xf_a.inverse().transform_point3(info.point),
                local_b: xf_b.inverse().transform_point3(info.point),
                world: info.point,
                normal: info.normal,
                depth: info.penetration.max(0.0),
                normal_impulse: 0.0,
                tangent_impulse: [0.0; 2],
            };
            manifold.add_point(contact, config.contact_merge_distance);
        }
    }

    /// Write resolved impulse magnitudes back for next-step warm-starting.
    pub fn cache_impulses(&mut self, resolved: &[(PairKey, usize, f32, [f32; 2])]) {
        for (key, index, normal, tangent) in resolved {
            if let Some(manifold) = self.manifolds.get_mut(key) {
                debug_assert!(
                    *index < manifold.points.len(),
                    "warm-start index out of range"
                );
                if let Some(point) = manifold.points.get_mut(*index) {
                    point.normal_impulse = *normal;
                    point.tangent_impulse = *tangent;
                }
            }
        }
    }

    /// Emit enter/exit events and remove dead manifolds.
    pub fn notify(&mut self, events: &mut Vec<PhysicsEvent>) {
        self.manifolds.retain(|key, manifold| {
            if manifold.state == ManifoldState::New {
                events.push(PhysicsEvent {
                    kind: PhysicsEventKind::CollisionEnter,
                    a: key.first(),
                    b: key.second(),
                });
                manifold.state = ManifoldState::Stale;
            }
            if manifold.state == ManifoldState::Stale && manifold.points.is_empty() {
                events.push(PhysicsEvent {
                    kind: PhysicsEventKind::CollisionExit,
                    a: key.first(),
                    b: key.second(),
                });
                return false;
            }
            true
        });
    }

    /// Drop all manifolds involving an entity (explicit destruction path).
    pub fn remove_entity(&mut self, entity: hecs::Entity) {
        self.manifolds.retain(|key, _| !key.contains(entity));
    }

    pub fn clear(&mut self) {
        self.manifolds.clear();
    }
}

/// Trigger overlap state machine: enter on first overlap, exit once the
/// overlap goes away. No contact geometry.
#[derive(Debug, Default)]
pub struct TriggerCache {
    states: HashMap<PairKey, ManifoldState>,
}

impl TriggerCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Demote all tracked overlaps at the start of a substep.
    pub fn begin_step(&mut self) {
        for state in self.states.values_mut() {
            *state = ManifoldState::Stale;
        }
    }

    /// Record an overlap observed this substep.
    pub fn mark(&mut self, key: PairKey) {
        self.states
            .entry(key)
            .and_modify(|s| *s = ManifoldState::Persisting)
            .or_insert(ManifoldState::New);
    }

    /// Emit enter/exit events; forget pairs that stopped overlapping.
    pub fn notify(&mut self, events: &mut Vec<PhysicsEvent>) {
        self.states.retain(|key, state| match state {
            ManifoldState::New => {
                events.push(PhysicsEvent {
                    kind: PhysicsEventKind::TriggerEnter,
                    a: key.first(),
                    b: key.second(),
                });
                *state = ManifoldState::Persisting;
                true
            }
            ManifoldState::Persisting => true,
            ManifoldState::Stale => {
                events.push(PhysicsEvent {
                    kind: PhysicsEventKind::TriggerExit,
                    a: key.first(),
                    b: key.second(),
                });
                false
            }
        });
    }

    pub fn remove_entity(&mut self, entity: hecs::Entity) {
        self.states.retain(|key, _| !key.contains(entity));
    }

    pub fn clear(&mut self) {
        self.states.clear();
    }
}
