//! Ray queries against collider shapes.
//!
//! Rays are transformed into each collider's local space, tested against the
//! analytic shape there, and the closest hit across all colliders wins.
//! Convex hulls are tested against their local-space bounding box, which is
//! exact enough for picking.

use glam::{Mat4, Vec3};

use crate::ecs::components::physics::{Collider, ColliderShape};
use crate::ecs::components::transform::GlobalTransform;

use super::hull::HullRegistry;

/// A world-space ray. The direction is normalized at construction.
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    pub origin: Vec3,
    pub dir: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, dir: Vec3) -> Self {
        Self {
            origin,
            dir: dir.normalize_or_zero(),
        }
    }

    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.dir * t
    }
}

/// Closest intersection of a ray with a collider.
#[derive(Debug, Clone, Copy)]
pub struct RayHit {
    pub entity: hecs::Entity,
    /// Distance along the ray.
    pub t: f32,
    pub point: Vec3,
    pub normal: Vec3,
}

/// Cast against every collider whose layer intersects `mask`; returns the
/// closest hit.
pub fn raycast(
    world: &hecs::World,
    hulls: &HullRegistry,
    ray: Ray,
    mask: u32,
) -> Option<RayHit> {
    let mut best: Option<RayHit> = None;
    for (entity, (collider, transform)) in
        world.query::<(&Collider, &GlobalTransform)>().iter()
    {
        if collider.layer & mask == 0 {
            continue;
        }
        let mut matrix = transform.0;
        if collider.offset != Vec3::ZERO {
            matrix *= Mat4::from_translation(collider.offset);
        }
        let inv = matrix.inverse();
        let local_origin = inv.transform_point3(ray.origin);
        let local_dir = inv.transform_vector3(ray.dir);

        let local = match &collider.shape {
            ColliderShape::Sphere { radius } => ray_sphere(local_origin, local_dir, *radius),
            ColliderShape::Box { half_extents } => {
                ray_box(local_origin, local_dir, *half_extents)
            }
            ColliderShape::Capsule {
                radius,
                half_height,
            } => ray_capsule(local_origin, local_dir, *radius, *half_height),
            ColliderShape::ConvexHull { hull } => match hulls.get(*hull) {
                Ok(data) => {
                    let (min, max) = local_bounds(&data.points);
                    let center = (min + max) * 0.5;
                    ray_box(local_origin - center, local_dir, (max - min) * 0.5)
                }
                Err(err) => {
                    tracing::warn!(?entity, %err, "raycast skipping unresolved hull");
                    None
                }
            },
        };

        if let Some((t, local_normal)) = local {
            if best.as_ref().map_or(true, |b| t < b.t) {
                // Normals transform by the inverse transpose.
                let normal = inv
                    .transpose()
                    .transform_vector3(local_normal)
                    .normalize_or_zero();
                best = Some(RayHit {
                    entity,
                    t,
                    point: ray.at(t),
                    normal,
                });
            }
        }
    }
    best
}

fn local_bounds(points: &[Vec3]) -> (Vec3, Vec3) {
    let mut min = Vec3::splat(f32::MAX);
    let mut max = Vec3::splat(f32::MIN);
    for p in points {
        min = min.min(*p);
        max = max.max(*p);
    }
    (min, max)
}

/// Smallest non-negative root of `|o + t·d|² = r²`.
fn ray_sphere(origin: Vec3, dir: Vec3, radius: f32) -> Option<(f32, Vec3)> {
    let a = dir.length_squared();
    if a < 1e-12 {
        return None;
    }
    let b = 2.0 * origin.dot(dir);
    let c = origin.length_squared() - radius * radius;
    let disc = b * b - 4.0 * a * c;
    if disc < 0.0 {
        return None;
    }
    let sqrt = disc.sqrt();
    let t0 = (-b - sqrt) / (2.0 * a);
    let t1 = (-b + sqrt) / (2.0 * a);
    let t = if t0 >= 0.0 {
        t0
    } else if t1 >= 0.0 {
        t1
    } else {
        return None;
    };
    Some((t, (origin + dir * t).normalize_or_zero()))
}

/// Slab test against an axis-aligned box centered at the origin.
fn ray_box(origin: Vec3, dir: Vec3, half: Vec3) -> Option<(f32, Vec3)> {
    let mut t_min = f32::MIN;
    let mut t_max = f32::MAX;
    let mut normal = Vec3::ZERO;

    for i in 0..3 {
        if dir[i].abs() < 1e-9 {
            if origin[i].abs() > half[i] {
                return None;
            }
            continue;
        }
        let inv_d = 1.0 / dir[i];
        let mut t0 = (-half[i] - origin[i]) * inv_d;
        let mut t1 = (half[i] - origin[i]) * inv_d;
        let mut axis_normal = Vec3::ZERO;
        axis_normal[i] = -dir[i].signum();
        if t0 > t1 {
            std::mem::swap(&mut t0, &mut t1);
        }
        if t0 > t_min {
            t_min = t0;
            normal = axis_normal;
        }
        t_max = t_max.min(t1);
        if t_min > t_max {
            return None;
        }
    }

    if t_max < 0.0 {
        return None;
    }
    if t_min < 0.0 {
        // Origin inside the box: report the exit point.
        return Some((t_max, -normal));
    }
    Some((t_min, normal))
}

/// Capsule along the local Y axis: side cylinder plus two sphere caps.
fn ray_capsule(
    origin: Vec3,
    dir: Vec3,
    radius: f32,
    half_height: f32,
) -> Option<(f32, Vec3)> {
    let mut best: Option<(f32, Vec3)> = None;
    let mut consider = |hit: Option<(f32, Vec3)>| {
        if let Some((t, n)) = hit {
            if best.map_or(true, |(bt, _)| t < bt) {
                best = Some((t, n));
            }
        }
    };

    // Infinite cylinder on the XZ components, clipped to the segment span.
    let o = Vec3::new(origin.x, 0.0, origin.z);
    let d = Vec3::new(dir.x, 0.0, dir.z);
    let a = d.length_squared();
    if a > 1e-12 {
        let b = 2.0 * o.dot(d);
        let c = o.length_squared() - radius * radius;
        let disc = b * b - 4.0 * a * c;
        if disc >= 0.0 {
            let t = (-b - disc.sqrt()) / (2.0 * a);
            if t >= 0.0 {
                let p = origin + dir * t;
                if p.y.abs() <= half_height {
                    consider(Some((t, Vec3::new(p.x, 0.0, p.z).normalize_or_zero())));
                }
            }
        }
    }

    for cap_y in [half_height, -half_height] {
        let cap = Vec3::new(0.0, cap_y, 0.0);
        consider(
            ray_sphere(origin - cap, dir, radius)
                .filter(|&(t, _)| ((origin + dir * t).y - cap_y) * cap_y.signum() >= 0.0),
        );
    }
    best
}
