//! Sequential-impulse constraint solver.
//!
//! Velocities only: each substep gathers a snapshot of every body touched by
//! a manifold or a joint, builds contact constraints (one normal row plus two
//! friction rows per point), warm-starts them from last step's cached
//! impulses, iterates joints and contacts together a fixed number of rounds,
//! and writes the resulting velocities back. Penetration is fed back through
//! a Baumgarte bias, with an optional direct position-correction pass.
//!
//! The phase methods mirror the pipeline stages so the scheduler can order
//! them explicitly: constraint generation, freedom constraints, joint
//! preparation, the iteration loop, and impulse caching.

use std::collections::HashMap;

use glam::{Mat3, Mat4, Vec3};

use crate::ecs::components::physics::{AxisLock, PhysicsBody, PhysicsMaterial};
use crate::ecs::components::transform::{GlobalTransform, Transform};

use super::contact::{ManifoldCache, PairKey};
use super::joint::JointSet;
use super::PhysicsConfig;

/// Velocity-level snapshot of one body for the duration of a solve.
#[derive(Debug, Clone, Copy)]
pub(crate) struct BodyState {
    pub(crate) entity: hecs::Entity,
    pub(crate) transform: Mat4,
    pub(crate) position: Vec3,
    /// Zero for static, kinematic, and sleeping bodies.
    pub(crate) inv_mass: f32,
    /// World-space inverse inertia tensor.
    pub(crate) inv_inertia: Mat3,
    pub(crate) linear: Vec3,
    pub(crate) angular: Vec3,
    pub(crate) friction: f32,
    pub(crate) restitution: f32,
    pub(crate) locked_linear: [bool; 3],
    pub(crate) locked_angular: [bool; 3],
}

impl BodyState {
    fn gather(world: &hecs::World, entity: hecs::Entity) -> Self {
        let transform = world
            .get::<&GlobalTransform>(entity)
            .map(|t| t.0)
            .unwrap_or(Mat4::IDENTITY);
        let material = world
            .get::<&PhysicsMaterial>(entity)
            .map(|m| *m)
            .unwrap_or_default();
        let lock = world
            .get::<&AxisLock>(entity)
            .map(|l| *l)
            .unwrap_or_default();

        let (inv_mass, inv_inertia, linear, angular) = match world.get::<&PhysicsBody>(entity) {
            Ok(body) if !body.kinematic && !body.asleep => (
                body.inv_mass,
                body.inv_inertia_world,
                body.linear_velocity,
                body.angular_velocity,
            ),
            // Kinematic bodies keep their user-driven velocity but never
            // receive impulses; sleeping bodies are pinned in place.
            Ok(body) => (0.0, Mat3::ZERO, body.linear_velocity, body.angular_velocity),
            Err(_) => (0.0, Mat3::ZERO, Vec3::ZERO, Vec3::ZERO),
        };

        Self {
            entity,
            transform,
            position: transform.w_axis.truncate(),
            inv_mass,
            inv_inertia,
            linear,
            angular,
            friction: material.friction,
            restitution: material.restitution,
            locked_linear: lock.linear,
            locked_angular: lock.angular,
        }
    }

    fn movable(&self) -> bool {
        self.inv_mass > 0.0
    }

    fn velocity_at(&self, r: Vec3) -> Vec3 {
        self.linear + self.angular.cross(r)
    }

    fn apply_impulse_at(&mut self, impulse: Vec3, r: Vec3) {
        self.linear += impulse * self.inv_mass;
        self.angular += self.inv_inertia * r.cross(impulse);
    }

    /// Zero out velocity components on locked axes.
    fn enforce_locks(&mut self) {
        for i in 0..3 {
            if self.locked_linear[i] {
                self.linear[i] = 0.0;
            }
            if self.locked_angular[i] {
                self.angular[i] = 0.0;
            }
        }
    }
}

/// One contact point turned into a normal row plus two friction rows.
struct ContactConstraint {
    key: PairKey,
    point: usize,
    a: usize,
    b: usize,
    r_a: Vec3,
    r_b: Vec3,
    normal: Vec3,
    tangent: Vec3,
    bitangent: Vec3,
    mass_normal: f32,
    mass_tangent: f32,
    mass_bitangent: f32,
    /// Target outgoing normal velocity (Baumgarte + restitution).
    bias: f32,
    friction: f32,
    depth: f32,
    normal_impulse: f32,
    tangent_impulse: [f32; 2],
}

fn effective_mass(a: &BodyState, b: &BodyState, r_a: Vec3, r_b: Vec3, dir: Vec3) -> f32 {
    let term_a = (a.inv_inertia * r_a.cross(dir)).cross(r_a);
    let term_b = (b.inv_inertia * r_b.cross(dir)).cross(r_b);
    let k = a.inv_mass + b.inv_mass + dir.dot(term_a + term_b);
    if k > 1e-9 {
        1.0 / k
    } else {
        0.0
    }
}

/// Per-substep solver state. Built fresh each substep; the phase methods run
/// in schedule order.
#[derive(Default)]
pub(crate) struct Solver {
    bodies: Vec<BodyState>,
    index: HashMap<hecs::Entity, usize>,
    constraints: Vec<ContactConstraint>,
    /// Indices of bodies with at least one locked axis.
    locked: Vec<usize>,
}

impl Solver {
    fn intern(&mut self, world: &hecs::World, entity: hecs::Entity) -> usize {
        if let Some(&i) = self.index.get(&entity) {
            return i;
        }
        self.bodies.push(BodyState::gather(world, entity));
        let i = self.bodies.len() - 1;
        self.index.insert(entity, i);
        i
    }

    /// Turn every manifold point into rows with effective masses and biases.
    pub(crate) fn generate_contact_constraints(
        &mut self,
        world: &hecs::World,
        manifolds: &ManifoldCache,
        config: &PhysicsConfig,
        dt: f32,
    ) {
        for manifold in manifolds.iter() {
            if manifold.points.is_empty() {
                continue;
            }
            let ia = self.intern(world, manifold.key.first());
            let ib = self.intern(world, manifold.key.second());
            if !self.bodies[ia].movable() && !self.bodies[ib].movable() {
                continue;
            }
            let friction = self.bodies[ia].friction * self.bodies[ib].friction;
            let restitution = self.bodies[ia].restitution * self.bodies[ib].restitution;

            for (pi, p) in manifold.points.iter().enumerate() {
                let (a, b) = (&self.bodies[ia], &self.bodies[ib]);
                let r_a = p.world - a.position;
                let r_b = p.world - b.position;
                let normal = p.normal;
                let (tangent, bitangent) = normal.any_orthonormal_pair();

                let approach = (b.velocity_at(r_b) - a.velocity_at(r_a)).dot(normal);
                let mut bias =
                    config.baumgarte * (p.depth - config.penetration_slop).max(0.0) / dt;
                if approach < -config.restitution_slop {
                    bias += restitution * -approach;
                }

                self.constraints.push(ContactConstraint {
                    key: manifold.key,
                    point: pi,
                    a: ia,
                    b: ib,
                    r_a,
                    r_b,
                    normal,
                    tangent,
                    bitangent,
                    mass_normal: effective_mass(a, b, r_a, r_b, normal),
                    mass_tangent: effective_mass(a, b, r_a, r_b, tangent),
                    mass_bitangent: effective_mass(a, b, r_a, r_b, bitangent),
                    bias,
                    friction,
                    depth: p.depth,
                    normal_impulse: p.normal_impulse,
                    tangent_impulse: p.tangent_impulse,
                });
            }
        }
    }

    /// Note which gathered bodies carry axis locks; their velocity components
    /// are clamped every iteration.
    pub(crate) fn generate_freedom_constraints(&mut self) {
        self.locked = self
            .bodies
            .iter()
            .enumerate()
            .filter(|(_, b)| {
                b.locked_linear.iter().any(|&l| l) || b.locked_angular.iter().any(|&l| l)
            })
            .map(|(i, _)| i)
            .collect();
    }

    /// Recompute joint effective masses and biases, warm-starting them.
    pub(crate) fn update_joints(
        &mut self,
        world: &hecs::World,
        joints: &mut JointSet,
        config: &PhysicsConfig,
        dt: f32,
    ) {
        for (key, joint) in joints.iter_mut() {
            let ia = self.intern(world, key.first());
            let ib = self.intern(world, key.second());
            let (a, b) = two(&mut self.bodies, ia, ib);
            joint.prepare(a, b, dt);
            if config.warm_starting {
                joint.warm_start(a, b, config.warm_start_factor);
            } else {
                joint.accumulated = Vec3::ZERO;
            }
        }
    }

    /// Run the sequential-impulse iterations and write velocities back.
    pub(crate) fn resolve(
        &mut self,
        world: &hecs::World,
        joints: &mut JointSet,
        config: &PhysicsConfig,
    ) {
        // Warm start contacts from last step's cached impulses.
        for c in &mut self.constraints {
            if config.warm_starting {
                c.normal_impulse *= config.warm_start_factor;
                c.tangent_impulse[0] *= config.warm_start_factor;
                c.tangent_impulse[1] *= config.warm_start_factor;
                let impulse = c.normal * c.normal_impulse
                    + c.tangent * c.tangent_impulse[0]
                    + c.bitangent * c.tangent_impulse[1];
                let (a, b) = two(&mut self.bodies, c.a, c.b);
                a.apply_impulse_at(-impulse, c.r_a);
                b.apply_impulse_at(impulse, c.r_b);
            } else {
                c.normal_impulse = 0.0;
                c.tangent_impulse = [0.0; 2];
            }
        }

        for _ in 0..config.solver_iterations {
            // Joints first: they are stiffer than contacts.
            for (key, joint) in joints.iter_mut() {
                let (ia, ib) = (self.index[&key.first()], self.index[&key.second()]);
                let (a, b) = two(&mut self.bodies, ia, ib);
                joint.solve(a, b);
            }

            for c in &mut self.constraints {
                let (a, b) = two(&mut self.bodies, c.a, c.b);

                // Normal row: accumulated clamp at zero.
                let vn = (b.velocity_at(c.r_b) - a.velocity_at(c.r_a)).dot(c.normal);
                let delta = c.mass_normal * (c.bias - vn);
                let new_total = (c.normal_impulse + delta).max(0.0);
                let applied = new_total - c.normal_impulse;
                c.normal_impulse = new_total;
                a.apply_impulse_at(-c.normal * applied, c.r_a);
                b.apply_impulse_at(c.normal * applied, c.r_b);

                // Friction rows: box-clamped by the accumulated normal impulse.
                let max_friction = c.friction * c.normal_impulse;
                for (dir, mass, acc) in [
                    (c.tangent, c.mass_tangent, 0usize),
                    (c.bitangent, c.mass_bitangent, 1usize),
                ] {
                    let vt = (b.velocity_at(c.r_b) - a.velocity_at(c.r_a)).dot(dir);
                    let delta = -mass * vt;
                    let new_total =
                        (c.tangent_impulse[acc] + delta).clamp(-max_friction, max_friction);
                    let applied = new_total - c.tangent_impulse[acc];
                    c.tangent_impulse[acc] = new_total;
                    a.apply_impulse_at(-dir * applied, c.r_a);
                    b.apply_impulse_at(dir * applied, c.r_b);
                }
            }

            for &i in &self.locked {
                self.bodies[i].enforce_locks();
            }
        }

        // Optional direct position correction on top of the Baumgarte bias.
        if config.position_correction {
            let mut shifts = vec![Vec3::ZERO; self.bodies.len()];
            for c in &self.constraints {
                let error = (c.depth - config.penetration_slop).max(0.0);
                if error <= 0.0 {
                    continue;
                }
                let total = self.bodies[c.a].inv_mass + self.bodies[c.b].inv_mass;
                if total <= 0.0 {
                    continue;
                }
                let push = c.normal * (config.position_correction_factor * error / total);
                shifts[c.a] -= push * self.bodies[c.a].inv_mass;
                shifts[c.b] += push * self.bodies[c.b].inv_mass;
            }
            for (body, shift) in self.bodies.iter().zip(&shifts) {
                if *shift == Vec3::ZERO {
                    continue;
                }
                if let Ok(mut t) = world.get::<&mut Transform>(body.entity) {
                    t.position += *shift;
                }
                if let Ok(mut g) = world.get::<&mut GlobalTransform>(body.entity) {
                    g.0.w_axis += shift.extend(0.0);
                }
            }
        }

        // Write velocities back to dynamic awake bodies.
        for body in &self.bodies {
            if !body.movable() {
                continue;
            }
            if let Ok(mut pb) = world.get::<&mut PhysicsBody>(body.entity) {
                pb.linear_velocity = body.linear;
                pb.angular_velocity = body.angular;
            }
        }
    }

    /// Per-point impulse magnitudes for the manifold cache to keep for next
    /// step's warm start.
    pub(crate) fn cached_impulses(&self) -> Vec<(PairKey, usize, f32, [f32; 2])> {
        self.constraints
            .iter()
            .map(|c| (c.key, c.point, c.normal_impulse, c.tangent_impulse))
            .collect()
    }
}

fn two(bodies: &mut [BodyState], i: usize, j: usize) -> (&mut BodyState, &mut BodyState) {
    debug_assert_ne!(i, j);
    if i < j {
        let (lo, hi) = bodies.split_at_mut(j);
        (&mut lo[i], &mut hi[0])
    } else {
        let (lo, hi) = bodies.split_at_mut(i);
        (&mut hi[0], &mut lo[j])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::components::physics::{Collider, ColliderShape};
    use crate::physics::narrowphase::ContactInfo;

    fn config() -> PhysicsConfig {
        PhysicsConfig::default()
    }

    fn seed(point: Vec3, normal: Vec3, depth: f32) -> ContactInfo {
        ContactInfo {
            normal,
            penetration: depth,
            point,
        }
    }

    fn solve(
        world: &hecs::World,
        manifolds: &ManifoldCache,
        joints: &mut JointSet,
        cfg: &PhysicsConfig,
    ) -> Vec<(PairKey, usize, f32, [f32; 2])> {
        let dt = 1.0 / 60.0;
        let mut solver = Solver::default();
        solver.generate_contact_constraints(world, manifolds, cfg, dt);
        solver.generate_freedom_constraints();
        solver.update_joints(world, joints, cfg, dt);
        solver.resolve(world, joints, cfg);
        solver.cached_impulses()
    }

    /// Two unit-mass spheres meeting head on stop approaching.
    #[test]
    fn test_head_on_contact_removes_approach_velocity() {
        let mut world = hecs::World::new();
        let cfg = config();
        let a = world.spawn((
            GlobalTransform(Mat4::IDENTITY),
            PhysicsBody::dynamic(1.0),
            PhysicsMaterial {
                friction: 0.0,
                restitution: 0.0,
            },
            Collider::new(ColliderShape::Sphere { radius: 1.0 }),
        ));
        let b = world.spawn((
            GlobalTransform(Mat4::from_translation(Vec3::new(1.9, 0.0, 0.0))),
            PhysicsBody::dynamic(1.0),
            PhysicsMaterial {
                friction: 0.0,
                restitution: 0.0,
            },
            Collider::new(ColliderShape::Sphere { radius: 1.0 }),
        ));
        world.get::<&mut PhysicsBody>(a).unwrap().linear_velocity = Vec3::X;
        world.get::<&mut PhysicsBody>(b).unwrap().linear_velocity = -Vec3::X;

        let key = PairKey::new(a, b);
        let normal = if key.first() == a { Vec3::X } else { -Vec3::X };
        let mut manifolds = ManifoldCache::new();
        manifolds.merge(
            &world,
            &[(key, seed(Vec3::new(0.95, 0.0, 0.0), normal, 0.1))],
            &cfg,
        );

        let mut joints = JointSet::new();
        solve(&world, &manifolds, &mut joints, &cfg);

        let va = world.get::<&PhysicsBody>(a).unwrap().linear_velocity;
        let vb = world.get::<&PhysicsBody>(b).unwrap().linear_velocity;
        // Relative velocity along the axis no longer closing.
        assert!((vb - va).x >= -1e-3, "va {va:?} vb {vb:?}");
    }

    /// High restitution reflects most of a fast approach.
    #[test]
    fn test_restitution_bounce() {
        let mut world = hecs::World::new();
        let cfg = config();
        let floor = world.spawn((
            GlobalTransform(Mat4::IDENTITY),
            Collider::new(ColliderShape::Box {
                half_extents: Vec3::new(10.0, 1.0, 10.0),
            }),
            PhysicsMaterial {
                friction: 0.0,
                restitution: 1.0,
            },
        ));
        let ball = world.spawn((
            GlobalTransform(Mat4::from_translation(Vec3::new(0.0, 1.45, 0.0))),
            PhysicsBody::dynamic_sphere(1.0, 0.5),
            PhysicsMaterial {
                friction: 0.0,
                restitution: 1.0,
            },
            Collider::new(ColliderShape::Sphere { radius: 0.5 }),
        ));
        world.get::<&mut PhysicsBody>(ball).unwrap().linear_velocity = Vec3::new(0.0, -5.0, 0.0);

        let key = PairKey::new(floor, ball);
        // Normal oriented first → second.
        let normal = if key.first() == floor { Vec3::Y } else { -Vec3::Y };
        let mut manifolds = ManifoldCache::new();
        manifolds.merge(
            &world,
            &[(key, seed(Vec3::new(0.0, 1.0, 0.0), normal, 0.05))],
            &cfg,
        );

        let mut joints = JointSet::new();
        solve(&world, &manifolds, &mut joints, &cfg);

        let v = world.get::<&PhysicsBody>(ball).unwrap().linear_velocity;
        assert!(v.y > 4.0, "expected a bounce, got {v:?}");
    }

    /// Friction removes tangential sliding; zero-friction materials do not.
    #[test]
    fn test_friction_damps_sliding() {
        let run = |friction: f32| -> f32 {
            let mut world = hecs::World::new();
            let cfg = config();
            let floor = world.spawn((
                GlobalTransform(Mat4::IDENTITY),
                Collider::new(ColliderShape::Box {
                    half_extents: Vec3::new(10.0, 1.0, 10.0),
                }),
                PhysicsMaterial {
                    friction,
                    restitution: 0.0,
                },
            ));
            let slider = world.spawn((
                GlobalTransform(Mat4::from_translation(Vec3::new(0.0, 1.49, 0.0))),
                PhysicsBody::dynamic_sphere(1.0, 0.5),
                PhysicsMaterial {
                    friction,
                    restitution: 0.0,
                },
                Collider::new(ColliderShape::Sphere { radius: 0.5 }),
            ));
            {
                let mut body = world.get::<&mut PhysicsBody>(slider).unwrap();
                body.linear_velocity = Vec3::new(2.0, -1.0, 0.0);
            }

            let key = PairKey::new(floor, slider);
            let normal = if key.first() == floor { Vec3::Y } else { -Vec3::Y };
            let mut manifolds = ManifoldCache::new();
            manifolds.merge(
                &world,
                &[(key, seed(Vec3::new(0.0, 1.0, 0.0), normal, 0.01))],
                &cfg,
            );

            let mut joints = JointSet::new();
            solve(&world, &manifolds, &mut joints, &cfg);
            let vx = world.get::<&PhysicsBody>(slider).unwrap().linear_velocity.x;
            vx
        };

        let slick = run(0.0);
        let grippy = run(1.0);
        assert!((slick - 2.0).abs() < 1e-3, "slick {slick}");
        assert!(grippy < slick - 0.1, "grippy {grippy} vs slick {slick}");
    }

    /// Static colliders never move; kinematic bodies keep their velocity.
    #[test]
    fn test_kinematic_body_is_immovable() {
        let mut world = hecs::World::new();
        let cfg = config();
        let mover = world.spawn((
            GlobalTransform(Mat4::IDENTITY),
            PhysicsBody::kinematic(),
            Collider::new(ColliderShape::Sphere { radius: 1.0 }),
        ));
        world.get::<&mut PhysicsBody>(mover).unwrap().linear_velocity = Vec3::X;
        let pushed = world.spawn((
            GlobalTransform(Mat4::from_translation(Vec3::new(1.9, 0.0, 0.0))),
            PhysicsBody::dynamic(1.0),
            Collider::new(ColliderShape::Sphere { radius: 1.0 }),
        ));

        let key = PairKey::new(mover, pushed);
        let normal = if key.first() == mover { Vec3::X } else { -Vec3::X };
        let mut manifolds = ManifoldCache::new();
        manifolds.merge(
            &world,
            &[(key, seed(Vec3::new(0.95, 0.0, 0.0), normal, 0.1))],
            &cfg,
        );

        let mut joints = JointSet::new();
        solve(&world, &manifolds, &mut joints, &cfg);

        // The kinematic body's velocity is untouched; the dynamic body is
        // pushed out of its way.
        let vm = world.get::<&PhysicsBody>(mover).unwrap().linear_velocity;
        let vp = world.get::<&PhysicsBody>(pushed).unwrap().linear_velocity;
        assert_eq!(vm, Vec3::X);
        assert!(vp.x > 0.5, "pushed velocity {vp:?}");
    }

    /// Locked angular axes stay at zero through the solve.
    #[test]
    fn test_axis_lock_freezes_rotation() {
        let mut world = hecs::World::new();
        let cfg = config();
        let floor = world.spawn((
            GlobalTransform(Mat4::IDENTITY),
            Collider::new(ColliderShape::Box {
                half_extents: Vec3::new(10.0, 1.0, 10.0),
            }),
        ));
        let body = world.spawn((
            GlobalTransform(Mat4::from_translation(Vec3::new(0.0, 1.9, 0.0))),
            PhysicsBody::dynamic_box(1.0, Vec3::ONE),
            AxisLock::frozen_rotation(),
            Collider::new(ColliderShape::Box {
                half_extents: Vec3::ONE,
            }),
        ));
        world.get::<&mut PhysicsBody>(body).unwrap().linear_velocity =
            Vec3::new(3.0, -1.0, 0.0);

        let key = PairKey::new(floor, body);
        let normal = if key.first() == floor { Vec3::Y } else { -Vec3::Y };
        // Off-center contact would normally torque the body.
        let mut manifolds = ManifoldCache::new();
        manifolds.merge(
            &world,
            &[(key, seed(Vec3::new(1.0, 1.0, 1.0), normal, 0.05))],
            &cfg,
        );

        let mut joints = JointSet::new();
        solve(&world, &manifolds, &mut joints, &cfg);

        let w = world.get::<&PhysicsBody>(body).unwrap().angular_velocity;
        assert!(w.length() < 1e-6, "angular velocity {w:?}");
    }

    /// Resolved impulses come back keyed for the manifold cache.
    #[test]
    fn test_resolved_impulses_reported() {
        let mut world = hecs::World::new();
        let cfg = config();
        let a = world.spawn((
            GlobalTransform(Mat4::IDENTITY),
            Collider::new(ColliderShape::Sphere { radius: 1.0 }),
        ));
        let b = world.spawn((
            GlobalTransform(Mat4::from_translation(Vec3::new(1.9, 0.0, 0.0))),
            PhysicsBody::dynamic(1.0),
            Collider::new(ColliderShape::Sphere { radius: 1.0 }),
        ));
        world.get::<&mut PhysicsBody>(b).unwrap().linear_velocity = -Vec3::X;

        let key = PairKey::new(a, b);
        let normal = if key.first() == a { Vec3::X } else { -Vec3::X };
        let mut manifolds = ManifoldCache::new();
        manifolds.merge(
            &world,
            &[(key, seed(Vec3::new(0.95, 0.0, 0.0), normal, 0.1))],
            &cfg,
        );

        let mut joints = JointSet::new();
        let resolved = solve(&world, &manifolds, &mut joints, &cfg);
        assert_eq!(resolved.len(), 1);
        let (rkey, point, normal_impulse, _) = resolved[0];
        assert_eq!(rkey, key);
        assert_eq!(point, 0);
        assert!(normal_impulse > 0.0);

        manifolds.cache_impulses(&resolved);
        assert!(manifolds.get(&key).unwrap().points[0].normal_impulse > 0.0);
    }

    /// A hanging body pinned by a joint converges toward its anchor.
    #[test]
    fn test_joint_solved_with_contacts_present() {
        let mut world = hecs::World::new();
        let cfg = config();
        let anchor = world.spawn((
            GlobalTransform(Mat4::IDENTITY),
            Collider::new(ColliderShape::Sphere { radius: 0.1 }),
        ));
        let bob = world.spawn((
            GlobalTransform(Mat4::from_translation(Vec3::new(0.0, -2.5, 0.0))),
            PhysicsBody::dynamic_sphere(1.0, 0.5),
            Collider::new(ColliderShape::Sphere { radius: 0.5 }),
        ));
        world.get::<&mut PhysicsBody>(bob).unwrap().linear_velocity =
            Vec3::new(0.0, -3.0, 0.0);

        let mut joints = JointSet::new();
        joints.add(anchor, bob, Vec3::ZERO, Vec3::new(0.0, 2.0, 0.0), 0.2, 0.0);

        let manifolds = ManifoldCache::new();
        solve(&world, &manifolds, &mut joints, &cfg);

        // Downward velocity mostly cancelled by the constraint.
        let v = world.get::<&PhysicsBody>(bob).unwrap().linear_velocity;
        assert!(v.y > -0.5, "velocity {v:?}");
    }
}
