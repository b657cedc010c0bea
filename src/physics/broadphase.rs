//! Broadphase collision detection: single-axis sweep-and-prune.
//!
//! Proxy bounding-sphere intervals are projected on the axis of greatest
//! positional variance (recomputed every update), sorted by interval start,
//! and swept once. Candidates that survive the 3D sphere test are classified
//! through a small lookup table and split into physics and trigger pairs.
//!
//! Complexity is O(n log n) for the sort plus a near-linear sweep; the worst
//! case degenerates to O(n²) when everything clusters on the sweep axis.

use super::proxy::{Proxy, ProxyCache, ProxyFlags};

/// How a candidate pair is processed downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionEventType {
    /// Discard the pair: neither side can respond.
    None,
    /// Full contact generation and constraint solving.
    Physics,
    /// Overlap tracking and enter/exit events only.
    Trigger,
}

/// Classification of one side of a pair, derived from its proxy flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Class {
    Dynamic = 0,
    Kinematic = 1,
    Fixed = 2,
    Sensor = 3,
}

impl Class {
    fn of(flags: ProxyFlags) -> Self {
        if flags.contains(ProxyFlags::TRIGGER) {
            Class::Sensor
        } else if flags.contains(ProxyFlags::NO_BODY) {
            Class::Fixed
        } else if flags.contains(ProxyFlags::KINEMATIC) {
            Class::Kinematic
        } else {
            Class::Dynamic
        }
    }
}

/// Event type per (class, class). Symmetric. Pairs where neither side can
/// move or sense resolve to `None` and are dropped before narrowphase.
const EVENT_TABLE: [[CollisionEventType; 4]; 4] = {
    use CollisionEventType::{None, Physics, Trigger};
    [
        // Dynamic vs ...
        [Physics, Physics, Physics, Trigger],
        // Kinematic vs ...
        [Physics, None, None, Trigger],
        // Fixed vs ...
        [Physics, None, None, None],
        // Sensor vs ...
        [Trigger, Trigger, None, None],
    ]
};

/// Resolve the event type for a candidate pair.
pub fn event_type(a: ProxyFlags, b: ProxyFlags) -> CollisionEventType {
    EVENT_TABLE[Class::of(a) as usize][Class::of(b) as usize]
}

/// A candidate overlapping pair of proxies (indices into the proxy cache).
#[derive(Debug, Clone, Copy)]
pub struct BroadPair {
    pub a: usize,
    pub b: usize,
    pub event: CollisionEventType,
}

/// Candidate pairs for one substep, split by downstream processing.
#[derive(Debug, Default)]
pub struct BroadPhaseOutput {
    pub physics: Vec<BroadPair>,
    pub triggers: Vec<BroadPair>,
}

/// Single-axis sweep-and-prune broadphase.
#[derive(Debug)]
pub struct SweepAndPrune {
    axis: usize,
    intervals: Vec<Interval>,
}

#[derive(Debug, Clone, Copy)]
struct Interval {
    proxy: usize,
    min: f32,
    max: f32,
}

impl Default for SweepAndPrune {
    fn default() -> Self {
        Self::new()
    }
}

impl SweepAndPrune {
    pub fn new() -> Self {
        Self {
            axis: 0,
            intervals: Vec::new(),
        }
    }

    /// Find all candidate overlapping pairs among the cached proxies.
    pub fn find_pairs(&mut self, cache: &ProxyCache) -> BroadPhaseOutput {
        let proxies = cache.proxies();
        self.axis = Self::variance_axis(proxies);

        self.intervals.clear();
        self.intervals.extend(proxies.iter().enumerate().map(|(i, p)| {
            let c = p.center[self.axis];
            Interval {
                proxy: i,
                min: c - p.radius,
                max: c + p.radius,
            }
        }));
        self.intervals
            .sort_unstable_by(|a, b| a.min.total_cmp(&b.min));

        let mut out = BroadPhaseOutput::default();
        for i in 0..self.intervals.len() {
            let lhs = self.intervals[i];
            for rhs in &self.intervals[i + 1..] {
                if rhs.min > lhs.max {
                    break;
                }
                let pa = &proxies[lhs.proxy];
                let pb = &proxies[rhs.proxy];

                let event = event_type(pa.flags, pb.flags);
                if event == CollisionEventType::None {
                    continue;
                }
                if !spheres_overlap(pa, pb) {
                    continue;
                }

                let pair = BroadPair {
                    a: lhs.proxy,
                    b: rhs.proxy,
                    event,
                };
                match event {
                    CollisionEventType::Physics => out.physics.push(pair),
                    CollisionEventType::Trigger => out.triggers.push(pair),
                    CollisionEventType::None => unreachable!(),
                }
            }
        }
        out
    }

    /// Axis with the greatest variance of proxy centers.
    fn variance_axis(proxies: &[Proxy]) -> usize {
        if proxies.len() < 2 {
            return 0;
        }
        let n = proxies.len() as f32;
        let mut mean = glam::Vec3::ZERO;
        for p in proxies {
            mean += p.center;
        }
        mean /= n;
        let mut var = glam::Vec3::ZERO;
        for p in proxies {
            let d = p.center - mean;
            var += d * d;
        }
        if var.y > var.x && var.y >= var.z {
            1
        } else if var.z > var.x {
            2
        } else {
            0
        }
    }
}

fn spheres_overlap(a: &Proxy, b: &Proxy) -> bool {
    let r = a.radius + b.radius;
    (b.center - a.center).length_squared() < r * r
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::components::physics::{Collider, ColliderShape, PhysicsBody};
    use crate::ecs::components::transform::GlobalTransform;
    use crate::physics::hull::HullRegistry;
    use glam::{Mat4, Vec3};

    fn sphere_at(world: &mut hecs::World, pos: Vec3, radius: f32, dynamic: bool) -> hecs::Entity {
        let collider = Collider::new(ColliderShape::Sphere { radius });
        if dynamic {
            world.spawn((
                GlobalTransform(Mat4::from_translation(pos)),
                PhysicsBody::dynamic(1.0),
                collider,
            ))
        } else {
            world.spawn((GlobalTransform(Mat4::from_translation(pos)), collider))
        }
    }

    fn pairs_for(world: &hecs::World) -> BroadPhaseOutput {
        let hulls = HullRegistry::new();
        let mut cache = ProxyCache::new();
        cache.update(world, &hulls);
        SweepAndPrune::new().find_pairs(&cache)
    }

    #[test]
    fn test_overlapping_pair_found() {
        let mut world = hecs::World::new();
        sphere_at(&mut world, Vec3::ZERO, 1.0, true);
        sphere_at(&mut world, Vec3::new(1.0, 0.0, 0.0), 1.0, true);

        let out = pairs_for(&world);
        assert_eq!(out.physics.len(), 1);
        assert!(out.triggers.is_empty());
    }

    #[test]
    fn test_separated_spheres_produce_nothing() {
        let mut world = hecs::World::new();
        sphere_at(&mut world, Vec3::ZERO, 0.5, true);
        sphere_at(&mut world, Vec3::new(10.0, 0.0, 0.0), 0.5, true);

        let out = pairs_for(&world);
        assert!(out.physics.is_empty());
    }

    #[test]
    fn test_fixed_fixed_discarded() {
        let mut world = hecs::World::new();
        sphere_at(&mut world, Vec3::ZERO, 1.0, false);
        sphere_at(&mut world, Vec3::ZERO, 1.0, false);

        let out = pairs_for(&world);
        assert!(out.physics.is_empty());
        assert!(out.triggers.is_empty());
    }

    #[test]
    fn test_sensor_pair_routed_to_triggers() {
        let mut world = hecs::World::new();
        world.spawn((
            GlobalTransform::default(),
            Collider::sensor(ColliderShape::Sphere { radius: 1.0 }),
        ));
        sphere_at(&mut world, Vec3::new(0.5, 0.0, 0.0), 1.0, true);

        let out = pairs_for(&world);
        assert!(out.physics.is_empty());
        assert_eq!(out.triggers.len(), 1);
    }

    #[test]
    fn test_event_table_symmetry() {
        let cases = [
            ProxyFlags::default(),
            ProxyFlags::TRIGGER,
            ProxyFlags::NO_BODY,
            ProxyFlags::KINEMATIC,
        ];
        for &a in &cases {
            for &b in &cases {
                assert_eq!(event_type(a, b), event_type(b, a));
            }
        }
    }

    /// Compare the sweep against a brute-force O(n²) oracle on a scattered
    /// scene, then perturb two spheres into overlap.
    #[test]
    fn test_matches_brute_force_oracle() {
        // Small deterministic LCG; no rand dependency needed for tests.
        let mut state = 0x2545F4914F6CDD1Du64;
        let mut next = || {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            ((state >> 33) as f32 / (1u64 << 31) as f32) * 100.0
        };

        let mut world = hecs::World::new();
        let mut entities = Vec::new();
        for _ in 0..64 {
            let pos = Vec3::new(next(), next(), next());
            entities.push(sphere_at(&mut world, pos, 0.4, true));
        }

        let hulls = HullRegistry::new();
        let mut cache = ProxyCache::new();
        cache.update(&world, &hulls);
        let swept = SweepAndPrune::new().find_pairs(&cache);

        {
            let proxies = cache.proxies();
            let mut brute: Vec<_> = Vec::new();
            for i in 0..proxies.len() {
                for j in (i + 1)..proxies.len() {
                    if spheres_overlap(&proxies[i], &proxies[j]) {
                        brute.push(key(proxies[i].entity, proxies[j].entity));
                    }
                }
            }
            let mut swept_pairs: Vec<_> = swept
                .physics
                .iter()
                .map(|p| key(proxies[p.a].entity, proxies[p.b].entity))
                .collect();
            swept_pairs.sort_unstable();
            brute.sort_unstable();
            assert_eq!(swept_pairs, brute);
        }

        // Drive two spheres into overlap; the sweep must still match the
        // oracle and must now contain that pair.
        let target = world
            .get::<&GlobalTransform>(entities[1])
            .unwrap()
            .position();
        world
            .get::<&mut GlobalTransform>(entities[0])
            .unwrap()
            .0 = Mat4::from_translation(target + Vec3::new(0.5, 0.0, 0.0));

        cache.update(&world, &hulls);
        let after = SweepAndPrune::new().find_pairs(&cache);
        let proxies = cache.proxies();

        let mut brute_after = Vec::new();
        for i in 0..proxies.len() {
            for j in (i + 1)..proxies.len() {
                if spheres_overlap(&proxies[i], &proxies[j]) {
                    brute_after.push(key(proxies[i].entity, proxies[j].entity));
                }
            }
        }
        let mut swept_after: Vec<_> = after
            .physics
            .iter()
            .map(|p| key(proxies[p.a].entity, proxies[p.b].entity))
            .collect();
        swept_after.sort_unstable();
        brute_after.sort_unstable();
        assert_eq!(swept_after, brute_after);
        assert!(swept_after.contains(&key(entities[0], entities[1])));
    }

    fn key(a: hecs::Entity, b: hecs::Entity) -> (u64, u64) {
        let (x, y) = (a.to_bits().get(), b.to_bits().get());
        if x <= y {
            (x, y)
        } else {
            (y, x)
        }
    }
}
