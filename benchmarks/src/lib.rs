//! Shared scene builders for the physics benchmarks.
//!
//! Layouts are deterministic: a fixed-seed LCG provides jitter so runs are
//! comparable across machines and commits.

use glam::{Mat4, Quat, Vec3};
use tumble::physics::hull::HullRegistry;
use tumble::physics::proxy::ProxyCache;
use tumble::physics::{PhysicsConfig, PhysicsWorld};
use tumble::prelude::*;

pub struct Lcg(u64);

impl Lcg {
    pub fn new(seed: u64) -> Self {
        Self(seed)
    }

    pub fn next_f32(&mut self) -> f32 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        ((self.0 >> 33) as f32) / (u32::MAX >> 1) as f32
    }
}

fn grid_position(i: usize, spacing: f32) -> Vec3 {
    let side = 10;
    let x = (i % side) as f32;
    let y = ((i / side) % side) as f32;
    let z = (i / (side * side)) as f32;
    Vec3::new(x, y, z) * spacing
}

fn spawn(world: &mut hecs::World, position: Vec3, shape: ColliderShape) {
    world.spawn((
        Transform::from_position(position),
        GlobalTransform(Mat4::from_translation(position)),
        PhysicsBody::dynamic(1.0),
        Collider::new(shape),
    ));
}

fn cache_for(world: &hecs::World) -> (ProxyCache, HullRegistry) {
    let hulls = HullRegistry::new();
    let mut cache = ProxyCache::new();
    cache.update(world, &hulls);
    (cache, hulls)
}

/// `n` unit spheres on a grid tight enough that neighbors overlap.
pub fn setup_sphere_world(n: usize) -> (hecs::World, ProxyCache, HullRegistry) {
    let mut world = hecs::World::new();
    let mut rng = Lcg::new(7);
    for i in 0..n {
        let jitter = Vec3::splat(rng.next_f32() * 0.2);
        spawn(
            &mut world,
            grid_position(i, 1.8) + jitter,
            ColliderShape::Sphere { radius: 1.0 },
        );
    }
    let (cache, hulls) = cache_for(&world);
    (world, cache, hulls)
}

/// Alternating boxes, spheres, and capsules on the same tight grid.
pub fn setup_mixed_world(n: usize) -> (hecs::World, ProxyCache, HullRegistry) {
    let mut world = hecs::World::new();
    for i in 0..n {
        let shape = match i % 3 {
            0 => ColliderShape::Box {
                half_extents: Vec3::splat(0.9),
            },
            1 => ColliderShape::Sphere { radius: 1.0 },
            _ => ColliderShape::Capsule {
                radius: 0.5,
                half_height: 0.5,
            },
        };
        spawn(&mut world, grid_position(i, 1.8), shape);
    }
    let (cache, hulls) = cache_for(&world);
    (world, cache, hulls)
}

/// Spheres spread far apart; the sweep should reject almost everything.
pub fn setup_sparse_world(n: usize) -> (hecs::World, ProxyCache, HullRegistry) {
    let mut world = hecs::World::new();
    for i in 0..n {
        spawn(
            &mut world,
            grid_position(i, 10.0),
            ColliderShape::Sphere { radius: 1.0 },
        );
    }
    let (cache, hulls) = cache_for(&world);
    (world, cache, hulls)
}

/// A ground slab with `n` boxes stacked in loose columns above it, ready to
/// be stepped end to end.
pub fn setup_step_scene(n: usize) -> (hecs::World, PhysicsWorld) {
    let mut world = hecs::World::new();
    let physics = PhysicsWorld::new(PhysicsConfig::default());

    world.spawn((
        Transform::identity(),
        GlobalTransform::default(),
        Collider::new(ColliderShape::Box {
            half_extents: Vec3::new(50.0, 1.0, 50.0),
        }),
    ));

    let columns = 8;
    for i in 0..n {
        let col = i % columns;
        let row = i / columns;
        let position = Vec3::new(
            (col as f32 - columns as f32 / 2.0) * 2.5,
            1.0 + 2.1 * (row as f32 + 1.0),
            0.0,
        );
        world.spawn((
            Transform {
                position,
                rotation: Quat::from_rotation_y(0.1 * i as f32),
                scale: Vec3::ONE,
            },
            GlobalTransform(Mat4::from_rotation_translation(
                Quat::from_rotation_y(0.1 * i as f32),
                position,
            )),
            PhysicsBody::dynamic_box(1.0, Vec3::ONE),
            Collider::new(ColliderShape::Box {
                half_extents: Vec3::ONE,
            }),
        ));
    }
    (world, physics)
}
