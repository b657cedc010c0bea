//! Convex hull asset storage.
//!
//! Hull vertex data is owned outside the collider components; colliders hold
//! a [`HullId`] into this registry. Degenerate hulls are rejected when they
//! are inserted, before the pipeline ever runs.

use glam::Vec3;

use super::PhysicsError;

/// Handle to a convex hull in the [`HullRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HullId(pub(crate) u32);

/// Vertex set of a convex hull plus its precomputed loose bounds.
#[derive(Debug, Clone)]
pub struct ConvexHullData {
    pub points: Vec<Vec3>,
    /// Largest vertex distance from the local origin. Scaled by the transform
    /// to produce the broadphase bounding-sphere estimate.
    pub max_extent: f32,
}

/// Owns all convex hull vertex data referenced by colliders.
#[derive(Debug, Default)]
pub struct HullRegistry {
    hulls: Vec<ConvexHullData>,
}

impl HullRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a hull. Fails if the point set cannot span a volume.
    pub fn insert(&mut self, points: Vec<Vec3>) -> Result<HullId, PhysicsError> {
        if points.len() < 4 {
            return Err(PhysicsError::DegenerateHull {
                vertices: points.len(),
            });
        }
        let max_extent = points
            .iter()
            .map(|p| p.length())
            .fold(0.0f32, f32::max);
        let id = HullId(self.hulls.len() as u32);
        self.hulls.push(ConvexHullData { points, max_extent });
        Ok(id)
    }

    /// Look up hull data. Fails when the id does not resolve, which indicates
    /// a collider referencing an asset that was never loaded.
    pub fn get(&self, id: HullId) -> Result<&ConvexHullData, PhysicsError> {
        self.hulls
            .get(id.0 as usize)
            .ok_or(PhysicsError::MissingHull { id: id.0 })
    }

    pub fn clear(&mut self) {
        self.hulls.clear();
    }
}
