//! Narrowphase collision detection.
//!
//! Candidate pairs from the broadphase get exact shape-vs-shape tests here.
//! Sphere and box pairs use closed-form tests (distance check, SAT); every
//! other combination — capsules, convex hulls, and the triangles fed in by
//! the concave phase — goes through GJK over support mappings with EPA for
//! penetration depth and normal.

use glam::{Mat4, Vec3};

use crate::ecs::components::physics::ColliderShape;

use super::hull::{ConvexHullData, HullRegistry};
use super::proxy::ProxyCache;
use super::broadphase::BroadPair;
use super::contact::PairKey;

/// A single detected contact between two shapes.
#[derive(Debug, Clone, Copy)]
pub struct ContactInfo {
    /// Contact normal (from shape A to shape B), world space.
    pub normal: Vec3,
    /// Penetration depth.
    pub penetration: f32,
    /// Contact point in world space.
    pub point: Vec3,
}

/// World-space support mapping: farthest point of a convex set in a direction.
pub trait Support {
    fn support(&self, direction: Vec3) -> Vec3;
}

/// Support mapping of a collider shape under a world transform.
pub struct ShapeSupport<'a> {
    matrix: Mat4,
    inverse: Mat4,
    shape: &'a ColliderShape,
    hull: Option<&'a ConvexHullData>,
}

impl<'a> ShapeSupport<'a> {
    pub fn new(
        shape: &'a ColliderShape,
        matrix: Mat4,
        hulls: &'a HullRegistry,
    ) -> Option<Self> {
        let hull = match shape {
            ColliderShape::ConvexHull { hull } => match hulls.get(*hull) {
                Ok(data) => Some(data),
                Err(err) => {
                    debug_assert!(false, "unresolved hull in narrowphase: {err}");
                    return None;
                }
            },
            _ => None,
        };
        Some(Self {
            matrix,
            inverse: matrix.inverse(),
            shape,
            hull,
        })
    }
}

impl Support for ShapeSupport<'_> {
    fn support(&self, direction: Vec3) -> Vec3 {
        // Rotation/scale only; translation does not affect directions.
        let local_dir = self
            .inverse
            .transform_vector3(direction)
            .normalize_or_zero();

        let local_point = match self.shape {
            ColliderShape::Sphere { radius } => local_dir * *radius,
            ColliderShape::Box { half_extents } => Vec3::new(
                half_extents.x.copysign(local_dir.x),
                half_extents.y.copysign(local_dir.y),
                half_extents.z.copysign(local_dir.z),
            ),
            ColliderShape::Capsule {
                radius,
                half_height,
            } => {
                let cap = Vec3::new(0.0, half_height.copysign(local_dir.y), 0.0);
                cap + local_dir * *radius
            }
            // Hull data is resolved at construction; `new` returns None
            // otherwise.
            ColliderShape::ConvexHull { .. } => match self.hull {
                Some(data) => {
                    let mut best = data.points[0];
                    let mut best_dot = best.dot(local_dir);
                    for p in &data.points[1..] {
                        let d = p.dot(local_dir);
                        if d > best_dot {
                            best_dot = d;
                            best = *p;
                        }
                    }
                    best
                }
                None => Vec3::ZERO,
            },
        };

        self.matrix.transform_point3(local_point)
    }
}

/// Support mapping of a world-space triangle.
pub struct TriangleSupport(pub [Vec3; 3]);

impl Support for TriangleSupport {
    fn support(&self, direction: Vec3) -> Vec3 {
        let mut best = self.0[0];
        let mut best_dot = best.dot(direction);
        for p in &self.0[1..] {
            let d = p.dot(direction);
            if d > best_dot {
                best_dot = d;
                best = *p;
            }
        }
        best
    }
}

// ---------------------------------------------------------------------------
// GJK
// ---------------------------------------------------------------------------

/// Simplex used by GJK (up to 4 vertices in 3D).
#[derive(Debug, Clone)]
pub struct Simplex {
    points: Vec<Vec3>,
}

fn minkowski_support(a: &impl Support, b: &impl Support, direction: Vec3) -> Vec3 {
    a.support(direction) - b.support(-direction)
}

/// GJK intersection test. Returns the terminal simplex if the shapes overlap.
pub fn gjk_intersection(a: &impl Support, b: &impl Support) -> Option<Simplex> {
    let mut direction = Vec3::X;
    let mut simplex = Simplex {
        points: Vec::with_capacity(4),
    };

    let first = minkowski_support(a, b, direction);
    simplex.points.push(first);
    direction = -first;
    if direction.length_squared() < 1e-10 {
        return Some(simplex);
    }

    let second = minkowski_support(a, b, direction);
    if second.dot(direction) < 0.0 {
        return None;
    }
    simplex.points.push(second);
    direction = triple_cross(second - first, -first, second - first);
    if direction.length_squared() < 1e-10 {
        direction = (second - first).any_orthonormal_vector();
    }

    for _ in 0..64 {
        let point = minkowski_support(a, b, direction);
        if point.dot(direction) < 0.0 {
            return None;
        }
        simplex.points.push(point);

        if next_simplex(&mut simplex, &mut direction) {
            return Some(simplex);
        }
        if direction.length_squared() < 1e-10 {
            return Some(simplex);
        }
    }
    None
}

/// (a × b) × c
fn triple_cross(a: Vec3, b: Vec3, c: Vec3) -> Vec3 {
    a.cross(b).cross(c)
}

fn next_simplex(simplex: &mut Simplex, direction: &mut Vec3) -> bool {
    match simplex.points.len() {
        2 => simplex_line(simplex, direction),
        3 => simplex_triangle(simplex, direction),
        4 => simplex_tetrahedron(simplex, direction),
        _ => false,
    }
}

fn simplex_line(simplex: &mut Simplex, direction: &mut Vec3) -> bool {
    let a = simplex.points[1]; // most recently added
    let b = simplex.points[0];
    let ab = b - a;
    let ao = -a;

    if ab.dot(ao) > 0.0 {
        *direction = triple_cross(ab, ao, ab);
    } else {
        simplex.points = vec![a];
        *direction = ao;
    }
    false
}

fn simplex_triangle(simplex: &mut Simplex, direction: &mut Vec3) -> bool {
    let a = simplex.points[2];
    let b = simplex.points[1];
    let c = simplex.points[0];
    let ab = b - a;
    let ac = c - a;
    let ao = -a;
    let abc = ab.cross(ac);

    if abc.cross(ac).dot(ao) > 0.0 {
        if ac.dot(ao) > 0.0 {
            simplex.points = vec![c, a];
            *direction = triple_cross(ac, ao, ac);
        } else {
            simplex.points = vec![b, a];
            return simplex_line(simplex, direction);
        }
    } else if ab.cross(abc).dot(ao) > 0.0 {
        simplex.points = vec![b, a];
        return simplex_line(simplex, direction);
    } else if abc.dot(ao) > 0.0 {
        *direction = abc;
    } else {
        simplex.points = vec![b, c, a];
        *direction = -abc;
    }
    false
}

fn simplex_tetrahedron(simplex: &mut Simplex, direction: &mut Vec3) -> bool {
    let a = simplex.points[3];
    let b = simplex.points[2];
    let c = simplex.points[1];
    let d = simplex.points[0];
    let ab = b - a;
    let ac = c - a;
    let ad = d - a;
    let ao = -a;

    let abc = ab.cross(ac);
    let acd = ac.cross(ad);
    let adb = ad.cross(ab);

    if abc.dot(ao) > 0.0 {
        simplex.points = vec![c, b, a];
        *direction = abc;
        return simplex_triangle(simplex, direction);
    }
    if acd.dot(ao) > 0.0 {
        simplex.points = vec![d, c, a];
        *direction = acd;
        return simplex_triangle(simplex, direction);
    }
    if adb.dot(ao) > 0.0 {
        simplex.points = vec![b, d, a];
        *direction = adb;
        return simplex_triangle(simplex, direction);
    }
    true
}

// ---------------------------------------------------------------------------
// EPA
// ---------------------------------------------------------------------------

/// Expanding polytope: penetration depth and contact normal from a GJK simplex.
pub fn epa_penetration(
    simplex: &Simplex,
    a: &impl Support,
    b: &impl Support,
) -> Option<ContactInfo> {
    const TOLERANCE: f32 = 1e-4;
    const MAX_ITERATIONS: usize = 64;

    let mut polytope = simplex.points.clone();
    if polytope.len() < 4 {
        // Shallow touch; GJK terminated before building a tetrahedron.
        return None;
    }

    let mut faces: Vec<[usize; 3]> = vec![[0, 1, 2], [0, 3, 1], [0, 2, 3], [1, 3, 2]];

    for _ in 0..MAX_ITERATIONS {
        // Face closest to the origin.
        let mut min_dist = f32::MAX;
        let mut min_normal = Vec3::ZERO;

        for face in &faces {
            let fa = polytope[face[0]];
            let fb = polytope[face[1]];
            let fc = polytope[face[2]];
            let normal = (fb - fa).cross(fc - fa);
            let len = normal.length();
            if len < 1e-10 {
                continue;
            }
            let normal = normal / len;
            let dist = normal.dot(fa);
            let (normal, dist) = if dist < 0.0 { (-normal, -dist) } else { (normal, dist) };
            if dist < min_dist {
                min_dist = dist;
                min_normal = normal;
            }
        }

        if min_normal == Vec3::ZERO {
            return None;
        }

        let new_point = minkowski_support(a, b, min_normal);
        let new_dist = new_point.dot(min_normal);

        if new_dist - min_dist < TOLERANCE {
            let pa = a.support(min_normal);
            return Some(ContactInfo {
                normal: min_normal,
                penetration: min_dist,
                point: pa - min_normal * (min_dist * 0.5),
            });
        }

        // Expand: remove faces visible from the new point, stitch the hole.
        let new_idx = polytope.len();
        polytope.push(new_point);

        let mut edges: Vec<[usize; 2]> = Vec::new();
        let mut i = 0;
        while i < faces.len() {
            let face = faces[i];
            let fa = polytope[face[0]];
            let fb = polytope[face[1]];
            let fc = polytope[face[2]];
            let normal = (fb - fa).cross(fc - fa);
            let len = normal.length();
            if len < 1e-10 {
                faces.swap_remove(i);
                continue;
            }
            if (normal / len).dot(new_point - fa) > 0.0 {
                add_unique_edge(&mut edges, face[0], face[1]);
                add_unique_edge(&mut edges, face[1], face[2]);
                add_unique_edge(&mut edges, face[2], face[0]);
                faces.swap_remove(i);
            } else {
                i += 1;
            }
        }
        for edge in &edges {
            faces.push([edge[0], edge[1], new_idx]);
        }
        if faces.is_empty() {
            return None;
        }
    }
    None
}

fn add_unique_edge(edges: &mut Vec<[usize; 2]>, a: usize, b: usize) {
    // A shared edge appears once in each winding; both cancel.
    if let Some(pos) = edges.iter().position(|e| e[0] == b && e[1] == a) {
        edges.swap_remove(pos);
    } else {
        edges.push([a, b]);
    }
}

// ---------------------------------------------------------------------------
// Specialized tests
// ---------------------------------------------------------------------------

/// Sphere-vs-sphere distance test.
pub fn sphere_sphere(
    radius_a: f32,
    xf_a: Mat4,
    radius_b: f32,
    xf_b: Mat4,
) -> Option<ContactInfo> {
    let center_a = xf_a.w_axis.truncate();
    let center_b = xf_b.w_axis.truncate();
    let world_a = radius_a * max_scale(xf_a);
    let world_b = radius_b * max_scale(xf_b);

    let diff = center_b - center_a;
    let dist_sq = diff.length_squared();
    let min_dist = world_a + world_b;
    if dist_sq >= min_dist * min_dist {
        return None;
    }

    let dist = dist_sq.sqrt();
    let normal = if dist > 1e-6 { diff / dist } else { Vec3::Y };
    let penetration = min_dist - dist;
    Some(ContactInfo {
        normal,
        penetration,
        point: center_a + normal * (world_a - penetration * 0.5),
    })
}

/// Box-vs-sphere: closest point on the oriented box to the sphere center.
pub fn box_sphere(
    half_extents: Vec3,
    xf_box: Mat4,
    radius: f32,
    xf_sphere: Mat4,
) -> Option<ContactInfo> {
    let center = xf_sphere.w_axis.truncate();
    let world_radius = radius * max_scale(xf_sphere);

    let inv = xf_box.inverse();
    let local_center = inv.transform_point3(center);
    let clamped = local_center.clamp(-half_extents, half_extents);

    if clamped != local_center {
        // Center outside the box.
        let closest = xf_box.transform_point3(clamped);
        let diff = center - closest;
        let dist_sq = diff.length_squared();
        if dist_sq >= world_radius * world_radius {
            return None;
        }
        let dist = dist_sq.sqrt();
        let normal = if dist > 1e-6 { diff / dist } else { Vec3::Y };
        return Some(ContactInfo {
            normal,
            penetration: world_radius - dist,
            point: closest,
        });
    }

    // Center inside the box: push out along the axis of least depth.
    let depths = half_extents - local_center.abs();
    let (axis, depth) = if depths.x <= depths.y && depths.x <= depths.z {
        (Vec3::X * local_center.x.signum(), depths.x)
    } else if depths.y <= depths.z {
        (Vec3::Y * local_center.y.signum(), depths.y)
    } else {
        (Vec3::Z * local_center.z.signum(), depths.z)
    };
    let normal = xf_box.transform_vector3(axis).normalize_or_zero();
    Some(ContactInfo {
        normal,
        penetration: depth * max_scale(xf_box) + world_radius,
        point: center,
    })
}

/// Capsule-vs-sphere: sphere test against the closest point on the segment.
pub fn capsule_sphere(
    capsule_radius: f32,
    half_height: f32,
    xf_capsule: Mat4,
    sphere_radius: f32,
    xf_sphere: Mat4,
) -> Option<ContactInfo> {
    let p0 = xf_capsule.transform_point3(Vec3::new(0.0, -half_height, 0.0));
    let p1 = xf_capsule.transform_point3(Vec3::new(0.0, half_height, 0.0));
    let center = xf_sphere.w_axis.truncate();
    let on_segment = closest_point_on_segment(p0, p1, center);

    let world_cap = capsule_radius * max_scale(xf_capsule);
    let world_sph = sphere_radius * max_scale(xf_sphere);

    let diff = center - on_segment;
    let dist_sq = diff.length_squared();
    let min_dist = world_cap + world_sph;
    if dist_sq >= min_dist * min_dist {
        return None;
    }
    let dist = dist_sq.sqrt();
    let normal = if dist > 1e-6 { diff / dist } else { Vec3::Y };
    let penetration = min_dist - dist;
    Some(ContactInfo {
        normal,
        penetration,
        point: on_segment + normal * (world_cap - penetration * 0.5),
    })
}

pub(crate) fn closest_point_on_segment(a: Vec3, b: Vec3, p: Vec3) -> Vec3 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq < 1e-12 {
        return a;
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    a + ab * t
}

/// Unit axes and scaled half-extents of an oriented box.
fn obb_axes(half: Vec3, xf: Mat4) -> ([Vec3; 3], Vec3) {
    let axes = [
        xf.x_axis.truncate().normalize_or_zero(),
        xf.y_axis.truncate().normalize_or_zero(),
        xf.z_axis.truncate().normalize_or_zero(),
    ];
    // Bake scale into the extents so the axes stay unit length.
    let ext = half
        * Vec3::new(
            xf.x_axis.truncate().length(),
            xf.y_axis.truncate().length(),
            xf.z_axis.truncate().length(),
        );
    (axes, ext)
}

fn box_corners(half: Vec3, xf: Mat4) -> [Vec3; 8] {
    let mut corners = [Vec3::ZERO; 8];
    for (i, corner) in corners.iter_mut().enumerate() {
        let sign = Vec3::new(
            if i & 1 == 0 { 1.0 } else { -1.0 },
            if i & 2 == 0 { 1.0 } else { -1.0 },
            if i & 4 == 0 { 1.0 } else { -1.0 },
        );
        *corner = xf.transform_point3(half * sign);
    }
    corners
}

/// SAT box-vs-box over the 15 candidate axes.
pub fn sat_box_box(half_a: Vec3, xf_a: Mat4, half_b: Vec3, xf_b: Mat4) -> Option<ContactInfo> {
    let center_a = xf_a.w_axis.truncate();
    let center_b = xf_b.w_axis.truncate();
    let (axes_a, ext_a) = obb_axes(half_a, xf_a);
    let (axes_b, ext_b) = obb_axes(half_b, xf_b);

    let t = center_b - center_a;
    let mut min_overlap = f32::MAX;
    let mut best_axis = Vec3::ZERO;

    let mut test = |axis: Vec3| -> bool {
        let proj_a = ext_a.x * axes_a[0].dot(axis).abs()
            + ext_a.y * axes_a[1].dot(axis).abs()
            + ext_a.z * axes_a[2].dot(axis).abs();
        let proj_b = ext_b.x * axes_b[0].dot(axis).abs()
            + ext_b.y * axes_b[1].dot(axis).abs()
            + ext_b.z * axes_b[2].dot(axis).abs();
        let overlap = proj_a + proj_b - t.dot(axis).abs();
        if overlap <= 0.0 {
            return false;
        }
        if overlap < min_overlap {
            min_overlap = overlap;
            best_axis = axis;
        }
        true
    };

    for axis in axes_a {
        if !test(axis) {
            return None;
        }
    }
    for axis in axes_b {
        if !test(axis) {
            return None;
        }
    }
    for i in 0..3 {
        for j in 0..3 {
            let axis = axes_a[i].cross(axes_b[j]);
            let len = axis.length();
            if len < 1e-6 {
                continue; // parallel edges
            }
            if !test(axis / len) {
                return None;
            }
        }
    }

    if best_axis.dot(t) < 0.0 {
        best_axis = -best_axis;
    }

    // Representative point: deepest corner of B against the separating axis.
    let mut corner = center_b;
    for i in 0..3 {
        corner -= axes_b[i] * ext_b[i] * axes_b[i].dot(best_axis).signum();
    }
    Some(ContactInfo {
        normal: best_axis,
        penetration: min_overlap,
        point: corner + best_axis * (min_overlap * 0.5),
    })
}

/// Slack when testing whether a box corner sits inside the other box. Keeps
/// resting face contacts producing a full corner set even at slop-depth
/// penetration.
const CORNER_MARGIN: f32 = 0.05;

/// Box-vs-box with multiple contact points: the SAT axis plus every corner of
/// either box that sits inside the other. Face-on-face contact yields the
/// four supporting corners, which is what keeps stacks from wobbling on a
/// single-point manifold.
pub fn box_box_contacts(half_a: Vec3, xf_a: Mat4, half_b: Vec3, xf_b: Mat4) -> Vec<ContactInfo> {
    let Some(info) = sat_box_box(half_a, xf_a, half_b, xf_b) else {
        return Vec::new();
    };
    let n = info.normal;
    let center_a = xf_a.w_axis.truncate();
    let center_b = xf_b.w_axis.truncate();
    let (axes_a, ext_a) = obb_axes(half_a, xf_a);
    let (axes_b, ext_b) = obb_axes(half_b, xf_b);
    let proj = |axes: &[Vec3; 3], ext: Vec3, dir: Vec3| {
        ext.x * axes[0].dot(dir).abs()
            + ext.y * axes[1].dot(dir).abs()
            + ext.z * axes[2].dot(dir).abs()
    };

    let inv_a = xf_a.inverse();
    let inv_b = xf_b.inverse();
    let slack_a = half_a + Vec3::splat(CORNER_MARGIN);
    let slack_b = half_b + Vec3::splat(CORNER_MARGIN);
    let mut out = Vec::new();

    // A's supporting plane along n, B's along -n.
    let face_a = center_a.dot(n) + proj(&axes_a, ext_a, n);
    let face_b = center_b.dot(n) - proj(&axes_b, ext_b, n);

    for corner in box_corners(half_b, xf_b) {
        if inv_a.transform_point3(corner).abs().cmple(slack_a).all() {
            out.push(ContactInfo {
                normal: n,
                penetration: (face_a - corner.dot(n)).max(0.0),
                point: corner,
            });
        }
    }
    for corner in box_corners(half_a, xf_a) {
        if inv_b.transform_point3(corner).abs().cmple(slack_b).all() {
            out.push(ContactInfo {
                normal: n,
                penetration: (corner.dot(n) - face_b).max(0.0),
                point: corner,
            });
        }
    }

    if out.is_empty() {
        out.push(info);
    }
    out
}

fn max_scale(m: Mat4) -> f32 {
    m.x_axis
        .truncate()
        .length()
        .max(m.y_axis.truncate().length())
        .max(m.z_axis.truncate().length())
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// Exact test between two collider shapes, dispatching to the specialized
/// closed forms where one exists.
pub fn collide(
    shape_a: &ColliderShape,
    xf_a: Mat4,
    shape_b: &ColliderShape,
    xf_b: Mat4,
    hulls: &HullRegistry,
) -> Option<ContactInfo> {
    use ColliderShape::*;
    match (shape_a, shape_b) {
        (Sphere { radius: ra }, Sphere { radius: rb }) => sphere_sphere(*ra, xf_a, *rb, xf_b),
        (Box { half_extents: ha }, Box { half_extents: hb }) => {
            sat_box_box(*ha, xf_a, *hb, xf_b)
        }
        (Box { half_extents }, Sphere { radius }) => {
            box_sphere(*half_extents, xf_a, *radius, xf_b)
        }
        (Sphere { radius }, Box { half_extents }) => {
            box_sphere(*half_extents, xf_b, *radius, xf_a).map(flip)
        }
        (
            Capsule {
                radius,
                half_height,
            },
            Sphere { radius: rs },
        ) => capsule_sphere(*radius, *half_height, xf_a, *rs, xf_b),
        (
            Sphere { radius: rs },
            Capsule {
                radius,
                half_height,
            },
        ) => capsule_sphere(*radius, *half_height, xf_b, *rs, xf_a).map(flip),
        _ => {
            let sa = ShapeSupport::new(shape_a, xf_a, hulls)?;
            let sb = ShapeSupport::new(shape_b, xf_b, hulls)?;
            let simplex = gjk_intersection(&sa, &sb)?;
            epa_penetration(&simplex, &sa, &sb)
        }
    }
}

fn flip(mut info: ContactInfo) -> ContactInfo {
    info.normal = -info.normal;
    info
}

/// Like [`collide`] but may emit several contact points for shape pairs with
/// a flat contact patch (box-box). Everything else yields at most one point;
/// the persistent manifold accumulates more across steps.
pub fn collide_all(
    shape_a: &ColliderShape,
    xf_a: Mat4,
    shape_b: &ColliderShape,
    xf_b: Mat4,
    hulls: &HullRegistry,
) -> Vec<ContactInfo> {
    if let (
        ColliderShape::Box { half_extents: ha },
        ColliderShape::Box { half_extents: hb },
    ) = (shape_a, shape_b)
    {
        return box_box_contacts(*ha, xf_a, *hb, xf_b);
    }
    collide(shape_a, xf_a, shape_b, xf_b, hulls)
        .into_iter()
        .collect()
}

/// Exact contact between a collider and a world-space triangle (concave phase).
pub fn collide_triangle(
    shape: &ColliderShape,
    xf: Mat4,
    triangle: [Vec3; 3],
    hulls: &HullRegistry,
) -> Option<ContactInfo> {
    if let ColliderShape::Sphere { radius } = shape {
        let center = xf.w_axis.truncate();
        let world_radius = radius * max_scale(xf);
        let closest = closest_point_on_triangle(triangle, center);
        let diff = closest - center;
        let dist_sq = diff.length_squared();
        if dist_sq >= world_radius * world_radius {
            return None;
        }
        let dist = dist_sq.sqrt();
        let normal = if dist > 1e-6 {
            diff / dist
        } else {
            // Center on the triangle: use the face normal, away from it.
            (triangle[1] - triangle[0])
                .cross(triangle[2] - triangle[0])
                .normalize_or_zero()
        };
        return Some(ContactInfo {
            normal,
            penetration: world_radius - dist,
            point: closest,
        });
    }

    let sa = ShapeSupport::new(shape, xf, hulls)?;
    let sb = TriangleSupport(triangle);
    let simplex = gjk_intersection(&sa, &sb)?;
    epa_penetration(&simplex, &sa, &sb)
}

/// Closest point on a triangle to an arbitrary point (Ericson's method).
pub(crate) fn closest_point_on_triangle(tri: [Vec3; 3], p: Vec3) -> Vec3 {
    let [a, b, c] = tri;
    let ab = b - a;
    let ac = c - a;
    let ap = p - a;

    let d1 = ab.dot(ap);
    let d2 = ac.dot(ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return a;
    }

    let bp = p - b;
    let d3 = ab.dot(bp);
    let d4 = ac.dot(bp);
    if d3 >= 0.0 && d4 <= d3 {
        return b;
    }

    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        return a + ab * (d1 / (d1 - d3));
    }

    let cp = p - c;
    let d5 = ab.dot(cp);
    let d6 = ac.dot(cp);
    if d6 >= 0.0 && d5 <= d6 {
        return c;
    }

    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        return a + ac * (d2 / (d2 - d6));
    }

    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        return b + (c - b) * ((d4 - d3) / ((d4 - d3) + (d5 - d6)));
    }

    let denom = 1.0 / (va + vb + vc);
    a + ab * (vb * denom) + ac * (vc * denom)
}

// ---------------------------------------------------------------------------
// Pair processing
// ---------------------------------------------------------------------------

/// Run exact tests on broadphase physics pairs, producing contact seeds keyed
/// by canonical entity pair. Normals are oriented from the key's first entity
/// toward its second.
pub fn find_physics_contacts(
    cache: &ProxyCache,
    pairs: &[BroadPair],
    hulls: &HullRegistry,
) -> Vec<(PairKey, ContactInfo)> {
    let proxies = cache.proxies();
    let mut seeds = Vec::new();
    for pair in pairs {
        let pa = &proxies[pair.a];
        let pb = &proxies[pair.b];
        let key = PairKey::new(pa.entity, pb.entity);
        for info in collide_all(&pa.shape, pa.matrix, &pb.shape, pb.matrix, hulls) {
            let info = if key.first() == pa.entity {
                info
            } else {
                flip(info)
            };
            seeds.push((key, info));
        }
    }
    seeds
}

/// Run boolean overlap tests on broadphase trigger pairs.
pub fn find_trigger_overlaps(
    cache: &ProxyCache,
    pairs: &[BroadPair],
    hulls: &HullRegistry,
) -> Vec<PairKey> {
    let proxies = cache.proxies();
    let mut overlaps = Vec::new();
    for pair in pairs {
        let pa = &proxies[pair.a];
        let pb = &proxies[pair.b];
        let hit = match (&pa.shape, &pb.shape) {
            (ColliderShape::Sphere { radius: ra }, ColliderShape::Sphere { radius: rb }) => {
                sphere_sphere(*ra, pa.matrix, *rb, pb.matrix).is_some()
            }
            _ => {
                let sa = ShapeSupport::new(&pa.shape, pa.matrix, hulls);
                let sb = ShapeSupport::new(&pb.shape, pb.matrix, hulls);
                match (sa, sb) {
                    (Some(sa), Some(sb)) => gjk_intersection(&sa, &sb).is_some(),
                    _ => false,
                }
            }
        };
        if hit {
            overlaps.push(PairKey::new(pa.entity, pb.entity));
        }
    }
    overlaps
}
