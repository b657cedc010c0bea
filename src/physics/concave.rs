//! Concave static geometry.
//!
//! Triangle soups (level meshes, terrain) are too large and too concave for
//! the convex narrowphase, so they get their own path: a median-split AABB
//! tree built once at registration, queried every substep with each dynamic
//! proxy's bounding sphere. Candidate triangles then run through the same
//! exact tests as convex pairs.

use glam::Vec3;

use super::contact::PairKey;
use super::hull::HullRegistry;
use super::narrowphase::{self, ContactInfo};
use super::proxy::ProxyCache;

#[derive(Debug, Clone, Copy)]
struct Aabb {
    min: Vec3,
    max: Vec3,
}

impl Aabb {
    fn of_triangle(tri: &[Vec3; 3]) -> Self {
        Self {
            min: tri[0].min(tri[1]).min(tri[2]),
            max: tri[0].max(tri[1]).max(tri[2]),
        }
    }

    fn merge(self, other: Aabb) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    fn overlaps_sphere(&self, center: Vec3, radius: f32) -> bool {
        let closest = center.clamp(self.min, self.max);
        (closest - center).length_squared() <= radius * radius
    }
}

#[derive(Debug)]
enum Node {
    /// Triangle index range into the reordered triangle array.
    Leaf { start: usize, count: usize },
    /// Child node indices.
    Internal { left: usize, right: usize },
}

const LEAF_SIZE: usize = 4;

/// A registered concave static mesh: world-space triangles under an AABB tree,
/// attributed to the entity that owns the mesh.
#[derive(Debug)]
pub struct StaticScene {
    entity: hecs::Entity,
    triangles: Vec<[Vec3; 3]>,
    bounds: Vec<Aabb>,
    nodes: Vec<Node>,
    root: usize,
}

impl StaticScene {
    /// Build the tree over world-space triangles. Degenerate (zero-area)
    /// triangles are dropped up front.
    pub fn build(entity: hecs::Entity, triangles: Vec<[Vec3; 3]>) -> Self {
        let mut triangles: Vec<[Vec3; 3]> = triangles
            .into_iter()
            .filter(|t| (t[1] - t[0]).cross(t[2] - t[0]).length_squared() > 1e-12)
            .collect();

        let mut scene = Self {
            entity,
            bounds: Vec::new(),
            nodes: Vec::new(),
            root: 0,
            triangles: Vec::new(),
        };
        if triangles.is_empty() {
            scene.nodes.push(Node::Leaf { start: 0, count: 0 });
            scene.bounds.push(Aabb {
                min: Vec3::ZERO,
                max: Vec3::ZERO,
            });
            return scene;
        }
        let count = triangles.len();
        scene.root = scene.split(&mut triangles, 0, count);
        scene.triangles = triangles;
        scene
    }

    /// Recursive median split on the longest axis of the centroid bounds.
    fn split(&mut self, triangles: &mut [[Vec3; 3]], start: usize, count: usize) -> usize {
        let slice = &mut triangles[start..start + count];
        let bounds = slice
            .iter()
            .map(Aabb::of_triangle)
            .reduce(Aabb::merge)
            .unwrap_or(Aabb {
                min: Vec3::ZERO,
                max: Vec3::ZERO,
            });

        if count <= LEAF_SIZE {
            self.nodes.push(Node::Leaf { start, count });
            self.bounds.push(bounds);
            return self.nodes.len() - 1;
        }

        let extent = bounds.max - bounds.min;
        let axis = if extent.y > extent.x && extent.y >= extent.z {
            1
        } else if extent.z > extent.x {
            2
        } else {
            0
        };
        let centroid = |t: &[Vec3; 3]| (t[0][axis] + t[1][axis] + t[2][axis]) / 3.0;
        slice.sort_unstable_by(|a, b| centroid(a).total_cmp(&centroid(b)));

        let mid = count / 2;
        let left = self.split(triangles, start, mid);
        let right = self.split(triangles, start + mid, count - mid);
        self.nodes.push(Node::Internal { left, right });
        self.bounds.push(self.bounds[left].merge(self.bounds[right]));
        self.nodes.len() - 1
    }

    pub fn entity(&self) -> hecs::Entity {
        self.entity
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Triangle indices whose bounds intersect a sphere.
    fn query_sphere(&self, center: Vec3, radius: f32, out: &mut Vec<usize>) {
        if self.triangles.is_empty() {
            return;
        }
        let mut stack = vec![self.root];
        while let Some(node) = stack.pop() {
            if !self.bounds[node].overlaps_sphere(center, radius) {
                continue;
            }
            match self.nodes[node] {
                Node::Leaf { start, count } => out.extend(start..start + count),
                Node::Internal { left, right } => {
                    stack.push(left);
                    stack.push(right);
                }
            }
        }
    }

    /// Exact contacts between every dynamic non-sensor proxy and the mesh.
    /// Normals are oriented per the canonical pair key, like the narrowphase.
    pub fn find_contacts(
        &self,
        cache: &ProxyCache,
        hulls: &HullRegistry,
    ) -> Vec<(PairKey, ContactInfo)> {
        let mut seeds = Vec::new();
        let mut candidates = Vec::new();
        for proxy in cache.proxies() {
            if !proxy.is_dynamic() || proxy.is_trigger() || proxy.entity == self.entity {
                continue;
            }
            candidates.clear();
            self.query_sphere(proxy.center, proxy.radius, &mut candidates);
            if candidates.is_empty() {
                continue;
            }

            let key = PairKey::new(proxy.entity, self.entity);
            for &i in &candidates {
                if let Some(info) =
                    narrowphase::collide_triangle(&proxy.shape, proxy.matrix, self.triangles[i], hulls)
                {
                    // collide_triangle points the normal shape → triangle.
                    let info = if key.first() == proxy.entity {
                        info
                    } else {
                        ContactInfo {
                            normal: -info.normal,
                            ..info
                        }
                    };
                    seeds.push((key, info));
                }
            }
        }
        seeds
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::components::physics::{Collider, ColliderShape, PhysicsBody};
    use crate::ecs::components::transform::GlobalTransform;
    use glam::Mat4;

    /// A flat grid of triangles in the y = 0 plane covering [-n, n]².
    fn ground_grid(n: i32) -> Vec<[Vec3; 3]> {
        let mut tris = Vec::new();
        for x in -n..n {
            for z in -n..n {
                let (x, z) = (x as f32, z as f32);
                let a = Vec3::new(x, 0.0, z);
                let b = Vec3::new(x + 1.0, 0.0, z);
                let c = Vec3::new(x, 0.0, z + 1.0);
                let d = Vec3::new(x + 1.0, 0.0, z + 1.0);
                tris.push([a, b, c]);
                tris.push([b, d, c]);
            }
        }
        tris
    }

    #[test]
    fn test_build_drops_degenerate_triangles() {
        let mut world = hecs::World::new();
        let e = world.spawn(());
        let mut tris = ground_grid(1);
        tris.push([Vec3::ZERO, Vec3::ZERO, Vec3::X]); // zero area
        let scene = StaticScene::build(e, tris);
        assert_eq!(scene.triangle_count(), 8);
    }

    #[test]
    fn test_query_culls_far_triangles() {
        let mut world = hecs::World::new();
        let e = world.spawn(());
        let scene = StaticScene::build(e, ground_grid(16));

        let mut near = Vec::new();
        scene.query_sphere(Vec3::new(0.5, 0.0, 0.5), 0.6, &mut near);
        assert!(!near.is_empty());
        assert!(near.len() < scene.triangle_count() / 4);

        let mut far = Vec::new();
        scene.query_sphere(Vec3::new(0.0, 100.0, 0.0), 1.0, &mut far);
        assert!(far.is_empty());
    }

    #[test]
    fn test_sphere_resting_on_mesh_gets_contact() {
        let mut world = hecs::World::new();
        let mesh_entity = world.spawn(());
        let scene = StaticScene::build(mesh_entity, ground_grid(4));

        let ball = world.spawn((
            GlobalTransform(Mat4::from_translation(Vec3::new(0.5, 0.4, 0.5))),
            PhysicsBody::dynamic(1.0),
            Collider::new(ColliderShape::Sphere { radius: 0.5 }),
        ));

        let hulls = HullRegistry::new();
        let mut cache = ProxyCache::new();
        cache.update(&world, &hulls);

        let seeds = scene.find_contacts(&cache, &hulls);
        assert!(!seeds.is_empty());
        for (key, info) in &seeds {
            assert!(key.contains(ball));
            assert!(key.contains(mesh_entity));
            assert!(info.penetration > 0.0);
            // Oriented first → second along the pair key.
            let toward_mesh = if key.first() == ball { -Vec3::Y } else { Vec3::Y };
            assert!(info.normal.dot(toward_mesh) > 0.9);
        }
    }

    #[test]
    fn test_static_proxies_skipped() {
        let mut world = hecs::World::new();
        let mesh_entity = world.spawn(());
        let scene = StaticScene::build(mesh_entity, ground_grid(2));

        // A static collider and a sensor sitting in the mesh produce nothing.
        world.spawn((
            GlobalTransform(Mat4::from_translation(Vec3::new(0.5, 0.0, 0.5))),
            Collider::new(ColliderShape::Sphere { radius: 0.5 }),
        ));
        world.spawn((
            GlobalTransform(Mat4::from_translation(Vec3::new(0.5, 0.0, 0.5))),
            PhysicsBody::dynamic(1.0),
            Collider::sensor(ColliderShape::Sphere { radius: 0.5 }),
        ));

        let hulls = HullRegistry::new();
        let mut cache = ProxyCache::new();
        cache.update(&world, &hulls);
        assert!(scene.find_contacts(&cache, &hulls).is_empty());
    }
}
