//! Fixed-timestep rigid body physics pipeline.
//!
//! [`PhysicsWorld`] owns everything that persists across steps: the manifold
//! and trigger caches, joints, registered static geometry, hull assets, and
//! the stage schedule. Component data lives in the caller's [`hecs::World`].
//!
//! [`PhysicsWorld::step`] accumulates wall-clock time and re-runs the whole
//! stage graph once per fixed substep, capped so a slow frame degrades into
//! simulation slowdown instead of a catch-up spiral.

use std::collections::HashMap;

use glam::Vec3;
use thiserror::Error;

pub mod broadphase;
pub mod concave;
pub mod contact;
pub mod hull;
pub mod integrate;
pub mod joint;
pub mod narrowphase;
pub mod proxy;
pub mod raycast;
pub mod schedule;
pub mod solver;

use broadphase::{BroadPhaseOutput, SweepAndPrune};
use concave::StaticScene;
use contact::{ManifoldCache, TriggerCache};
use hull::{HullId, HullRegistry};
use joint::JointSet;
use narrowphase::ContactInfo;
use proxy::ProxyCache;
use raycast::{Ray, RayHit};
use schedule::{Schedule, Stage};
use solver::Solver;

/// Errors surfaced by the physics module. Everything else in the pipeline is
/// handled defensively inline; these indicate malformed assets or misuse
/// detected before the step runs.
#[derive(Debug, Error)]
pub enum PhysicsError {
    /// A convex hull needs at least four vertices to span a volume.
    #[error("convex hull with {vertices} vertices cannot span a volume")]
    DegenerateHull { vertices: usize },
    /// A collider references a hull id that was never registered.
    #[error("hull asset {id} is not registered")]
    MissingHull { id: u32 },
}

/// All tunables of the pipeline. The defaults mirror a 60 Hz game loop.
#[derive(Debug, Clone)]
pub struct PhysicsConfig {
    pub gravity: Vec3,
    /// Simulation timestep; the step loop runs 0..=`max_substeps` of these
    /// per call depending on accumulated wall time.
    pub fixed_timestep: f32,
    /// Substep cap per [`PhysicsWorld::step`] call.
    pub max_substeps: u32,
    /// Sequential-impulse iterations per substep.
    pub solver_iterations: u32,
    pub warm_starting: bool,
    /// Scale on re-applied cached impulses when warm-starting.
    pub warm_start_factor: f32,
    /// Baumgarte stabilization factor (penetration → velocity bias).
    pub baumgarte: f32,
    /// Penetration depth tolerated without correction.
    pub penetration_slop: f32,
    /// Approach speeds below this produce no restitution bounce.
    pub restitution_slop: f32,
    /// Normal separation beyond which a cached contact point breaks.
    pub contact_break_distance: f32,
    /// Tangential drift beyond which a cached contact point breaks.
    pub contact_drift_tolerance: f32,
    /// Break only the single worst tangentially-drifted point per update,
    /// which reduces manifold churn on sliding contacts.
    pub single_tangential_break: bool,
    /// New contact points within this distance refresh an existing point
    /// instead of being added.
    pub contact_merge_distance: f32,
    /// Direct positional de-penetration on top of the Baumgarte bias.
    pub position_correction: bool,
    pub position_correction_factor: f32,
    /// Sleep subsystem toggle.
    pub sleeping: bool,
    pub sleep_linear_threshold: f32,
    pub sleep_angular_threshold: f32,
    /// Consecutive low-motion substeps before a body falls asleep.
    pub sleep_frames: u32,
    /// Hard clamp on angular speed (rad/s).
    pub max_angular_speed: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: Vec3::new(0.0, -9.81, 0.0),
            fixed_timestep: 1.0 / 60.0,
            max_substeps: 4,
            solver_iterations: 5,
            warm_starting: true,
            warm_start_factor: 1.0,
            baumgarte: 0.2,
            penetration_slop: 0.005,
            restitution_slop: 1.0,
            contact_break_distance: 0.02,
            contact_drift_tolerance: 0.05,
            single_tangential_break: true,
            contact_merge_distance: 0.02,
            position_correction: false,
            position_correction_factor: 0.2,
            sleeping: false,
            sleep_linear_threshold: 0.05,
            sleep_angular_threshold: 0.05,
            sleep_frames: 60,
            max_angular_speed: 8.0 * std::f32::consts::PI,
        }
    }
}

/// What happened to an entity pair this step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhysicsEventKind {
    CollisionEnter,
    CollisionExit,
    TriggerEnter,
    TriggerExit,
}

/// A collision or trigger lifecycle event, delivered during `NotifyEvents`.
#[derive(Debug, Clone, Copy)]
pub struct PhysicsEvent {
    pub kind: PhysicsEventKind,
    pub a: hecs::Entity,
    pub b: hecs::Entity,
}

/// Synchronous event sink invoked during the `NotifyEvents` stage, in
/// addition to the polled [`PhysicsWorld::take_events`] queue.
pub trait PhysicsEventHandler {
    fn collision_enter(&mut self, world: &hecs::World, a: hecs::Entity, b: hecs::Entity) {
        let _ = (world, a, b);
    }
    fn collision_exit(&mut self, world: &hecs::World, a: hecs::Entity, b: hecs::Entity) {
        let _ = (world, a, b);
    }
    fn trigger_enter(&mut self, world: &hecs::World, a: hecs::Entity, b: hecs::Entity) {
        let _ = (world, a, b);
    }
    fn trigger_exit(&mut self, world: &hecs::World, a: hecs::Entity, b: hecs::Entity) {
        let _ = (world, a, b);
    }
}

/// Click receiver for [`PhysicsWorld::raycast_to_clickables`].
pub trait Clickable {
    fn on_click(&mut self, hit: &RayHit);
}

/// The physics pipeline and all of its step-persistent state.
pub struct PhysicsWorld {
    pub config: PhysicsConfig,
    accumulator: f32,
    proxies: ProxyCache,
    broadphase: SweepAndPrune,
    manifolds: ManifoldCache,
    triggers: TriggerCache,
    joints: JointSet,
    scene: Option<StaticScene>,
    hulls: HullRegistry,
    clickables: HashMap<hecs::Entity, Box<dyn Clickable>>,
    events: Vec<PhysicsEvent>,
    handler: Option<Box<dyn PhysicsEventHandler>>,
    schedule: Schedule,
}

impl PhysicsWorld {
    pub fn new(config: PhysicsConfig) -> Self {
        Self {
            config,
            accumulator: 0.0,
            proxies: ProxyCache::new(),
            broadphase: SweepAndPrune::new(),
            manifolds: ManifoldCache::new(),
            triggers: TriggerCache::new(),
            joints: JointSet::new(),
            scene: None,
            hulls: HullRegistry::new(),
            clickables: HashMap::new(),
            events: Vec::new(),
            handler: None,
            schedule: Schedule::build(),
        }
    }

    /// Advance the simulation by `dt` seconds of wall time.
    pub fn step(&mut self, world: &mut hecs::World, dt: f32) {
        self.step_with(world, dt, |_| {});
    }

    /// Like [`step`](Self::step), with a fixed-timestep callback invoked at
    /// the start of every substep (game logic that must run at simulation
    /// rate: character control, kinematic movement).
    pub fn step_with(
        &mut self,
        world: &mut hecs::World,
        dt: f32,
        mut fixed_logic: impl FnMut(&mut hecs::World),
    ) {
        self.accumulator += dt;
        let mut substeps = 0;
        while self.accumulator >= self.config.fixed_timestep {
            if substeps >= self.config.max_substeps {
                // Spiral-of-death guard: drop the backlog and slow down.
                tracing::debug!(
                    backlog = self.accumulator,
                    "physics falling behind, dropping accumulated time"
                );
                self.accumulator = 0.0;
                break;
            }
            self.fixed_step(world, &mut fixed_logic);
            self.accumulator -= self.config.fixed_timestep;
            substeps += 1;
        }
    }

    /// Run the stage graph once.
    fn fixed_step(&mut self, world: &mut hecs::World, fixed_logic: &mut impl FnMut(&mut hecs::World)) {
        let dt = self.config.fixed_timestep;
        let stages: Vec<Stage> = self.schedule.stages().to_vec();

        let mut solver = Solver::default();
        let mut broad = BroadPhaseOutput::default();
        let mut contact_seeds: Vec<(contact::PairKey, ContactInfo)> = Vec::new();
        let mut concave_seeds: Vec<(contact::PairKey, ContactInfo)> = Vec::new();
        let mut fresh_events: Vec<PhysicsEvent> = Vec::new();

        for stage in stages {
            match stage {
                Stage::FixedLogic => fixed_logic(world),
                Stage::UpdateProxyCache => self.proxies.update(world, &self.hulls),
                Stage::UpdateManifolds => {
                    self.manifolds.update(world, &self.config);
                    self.triggers.begin_step();
                }
                Stage::UpdateInertia => integrate::update_inertia(world),
                Stage::ApplyGravity => integrate::apply_gravity(world, &self.config, dt),
                Stage::BroadPhase => broad = self.broadphase.find_pairs(&self.proxies),
                Stage::NarrowPhasePhysics => {
                    contact_seeds =
                        narrowphase::find_physics_contacts(&self.proxies, &broad.physics, &self.hulls);
                }
                Stage::NarrowPhaseTrigger => {
                    for key in
                        narrowphase::find_trigger_overlaps(&self.proxies, &broad.triggers, &self.hulls)
                    {
                        self.triggers.mark(key);
                    }
                }
                Stage::ConcavePhase => {
                    if let Some(scene) = &self.scene {
                        concave_seeds = scene.find_contacts(&self.proxies, &self.hulls);
                    }
                }
                Stage::MergeContacts => {
                    self.manifolds.merge(world, &contact_seeds, &self.config);
                    self.manifolds.merge(world, &concave_seeds, &self.config);
                }
                Stage::GenerateContactConstraints => {
                    solver.generate_contact_constraints(world, &self.manifolds, &self.config, dt);
                }
                Stage::GenerateFreedomConstraints => solver.generate_freedom_constraints(),
                Stage::UpdateJoints => {
                    solver.update_joints(world, &mut self.joints, &self.config, dt);
                }
                Stage::ResolveConstraints => solver.resolve(world, &mut self.joints, &self.config),
                Stage::CacheImpulses => {
                    self.manifolds.cache_impulses(&solver.cached_impulses());
                }
                Stage::Integrate => integrate::integrate(world, &self.config, dt),
                Stage::NotifyEvents => {
                    fresh_events.clear();
                    self.manifolds.notify(&mut fresh_events);
                    self.triggers.notify(&mut fresh_events);
                    if let Some(handler) = self.handler.as_deref_mut() {
                        for event in &fresh_events {
                            let (a, b) = (event.a, event.b);
                            match event.kind {
                                PhysicsEventKind::CollisionEnter => {
                                    handler.collision_enter(world, a, b)
                                }
                                PhysicsEventKind::CollisionExit => {
                                    handler.collision_exit(world, a, b)
                                }
                                PhysicsEventKind::TriggerEnter => {
                                    handler.trigger_enter(world, a, b)
                                }
                                PhysicsEventKind::TriggerExit => handler.trigger_exit(world, a, b),
                            }
                        }
                    }
                    self.events.extend_from_slice(&fresh_events);
                }
            }
        }
    }

    /// Drain the polled event queue.
    pub fn take_events(&mut self) -> Vec<PhysicsEvent> {
        std::mem::take(&mut self.events)
    }

    /// Install a synchronous event sink.
    pub fn set_event_handler(&mut self, handler: Box<dyn PhysicsEventHandler>) {
        self.handler = Some(handler);
    }

    /// Pin `anchor_a` on `a` to `anchor_b` on `b` (anchors in each entity's
    /// local frame), with the default bias and zero softness.
    pub fn add_joint(&mut self, a: hecs::Entity, b: hecs::Entity, anchor_a: Vec3, anchor_b: Vec3) {
        self.add_joint_with(a, b, anchor_a, anchor_b, 0.2, 0.0);
    }

    pub fn add_joint_with(
        &mut self,
        a: hecs::Entity,
        b: hecs::Entity,
        anchor_a: Vec3,
        anchor_b: Vec3,
        bias: f32,
        softness: f32,
    ) {
        if a == b {
            tracing::warn!(?a, "ignoring joint from an entity to itself");
            return;
        }
        self.joints.add(a, b, anchor_a, anchor_b, bias, softness);
    }

    pub fn remove_joint(&mut self, a: hecs::Entity, b: hecs::Entity) -> bool {
        self.joints.remove(a, b)
    }

    pub fn remove_all_joints(&mut self, entity: hecs::Entity) {
        self.joints.remove_entity(entity);
    }

    pub fn joints(&self) -> &JointSet {
        &self.joints
    }

    /// Register a concave static triangle mesh (world-space triangles),
    /// attributed to `entity` for contact events. Replaces any previous mesh.
    pub fn set_static_scene(&mut self, entity: hecs::Entity, triangles: Vec<[Vec3; 3]>) {
        let scene = StaticScene::build(entity, triangles);
        tracing::debug!(triangles = scene.triangle_count(), "static scene rebuilt");
        self.scene = Some(scene);
    }

    pub fn clear_static_scene(&mut self) {
        self.scene = None;
    }

    /// Register convex hull vertex data for [`ColliderShape::ConvexHull`]
    /// colliders.
    ///
    /// [`ColliderShape::ConvexHull`]: crate::ecs::components::physics::ColliderShape::ConvexHull
    pub fn add_hull(&mut self, points: Vec<Vec3>) -> Result<HullId, PhysicsError> {
        self.hulls.insert(points)
    }

    pub fn hulls(&self) -> &HullRegistry {
        &self.hulls
    }

    pub fn register_clickable(&mut self, entity: hecs::Entity, clickable: Box<dyn Clickable>) {
        self.clickables.insert(entity, clickable);
    }

    pub fn unregister_clickable(&mut self, entity: hecs::Entity) {
        self.clickables.remove(&entity);
    }

    /// Cast a ray against all colliders in `mask`; if the closest hit lands
    /// on a registered clickable, invoke it and return the hit. Geometry in
    /// front of a clickable blocks the click.
    pub fn raycast_to_clickables(
        &mut self,
        world: &hecs::World,
        ray: Ray,
        mask: u32,
    ) -> Option<RayHit> {
        let hit = raycast::raycast(world, &self.hulls, ray, mask)?;
        let clickable = self.clickables.get_mut(&hit.entity)?;
        clickable.on_click(&hit);
        Some(hit)
    }

    /// Closest ray hit against all colliders in `mask`.
    pub fn raycast(&self, world: &hecs::World, ray: Ray, mask: u32) -> Option<RayHit> {
        raycast::raycast(world, &self.hulls, ray, mask)
    }

    /// Forget all per-pair state for a destroyed entity: manifolds, trigger
    /// overlaps, joints, clickables. Transforms may already be gone, so no
    /// exit events fire.
    pub fn remove_entity(&mut self, entity: hecs::Entity) {
        self.manifolds.remove_entity(entity);
        self.triggers.remove_entity(entity);
        self.joints.remove_entity(entity);
        self.clickables.remove(&entity);
    }

    /// Drop all manifolds, trigger pairs, joints, and the static scene.
    /// Hull assets and clickables survive; call between scene loads.
    pub fn clear(&mut self) {
        self.accumulator = 0.0;
        self.manifolds.clear();
        self.triggers.clear();
        self.joints.clear();
        self.scene = None;
        self.events.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accumulator_substepping() {
        let mut physics = PhysicsWorld::new(PhysicsConfig::default());
        let mut world = hecs::World::new();

        let mut ran = 0;
        // 2.5 fixed steps of wall time: exactly two substeps run.
        physics.step_with(&mut world, 2.5 / 60.0, |_| ran += 1);
        assert_eq!(ran, 2);
        // The leftover fraction carries over into the next call.
        physics.step_with(&mut world, 0.6 / 60.0, |_| ran += 1);
        assert_eq!(ran, 3);
    }

    #[test]
    fn test_substep_cap_drops_backlog() {
        let mut physics = PhysicsWorld::new(PhysicsConfig::default());
        let mut world = hecs::World::new();

        let mut ran = 0;
        // A huge frame spike runs only `max_substeps` and discards the rest.
        physics.step_with(&mut world, 1.0, |_| ran += 1);
        assert_eq!(ran, physics.config.max_substeps);
        physics.step_with(&mut world, 0.0, |_| ran += 1);
        assert_eq!(ran, physics.config.max_substeps);
    }

    #[test]
    fn test_self_joint_rejected() {
        let mut physics = PhysicsWorld::new(PhysicsConfig::default());
        let mut world = hecs::World::new();
        let e = world.spawn(());
        physics.add_joint(e, e, Vec3::ZERO, Vec3::ZERO);
        assert!(physics.joints().is_empty());
    }

    #[test]
    fn test_clear_drops_pair_state() {
        let mut physics = PhysicsWorld::new(PhysicsConfig::default());
        let mut world = hecs::World::new();
        let a = world.spawn(());
        let b = world.spawn(());
        physics.add_joint(a, b, Vec3::ZERO, Vec3::ZERO);
        physics.set_static_scene(a, vec![[Vec3::ZERO, Vec3::X, Vec3::Z]]);

        physics.clear();
        assert!(physics.joints().is_empty());
        assert!(physics.scene.is_none());
    }
}
