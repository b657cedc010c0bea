//! Point-to-point (ball) joints.
//!
//! A joint pins one local anchor on each body together. It is solved as a
//! single 3×3 block constraint inside the same sequential-impulse iterations
//! as the contacts, with Baumgarte position bias and optional softness on
//! the diagonal.

use std::collections::HashMap;

use glam::{Mat3, Vec3};

use super::contact::PairKey;
use super::solver::BodyState;

/// One point-to-point constraint between an entity pair.
#[derive(Debug, Clone)]
pub struct Joint {
    pub local_anchor_a: Vec3,
    pub local_anchor_b: Vec3,
    /// Position-error feedback gain (0 disables drift correction).
    pub bias_factor: f32,
    /// Constraint softness; 0 is perfectly rigid.
    pub softness: f32,

    // Prepared once per substep.
    pub(crate) r_a: Vec3,
    pub(crate) r_b: Vec3,
    pub(crate) mass_matrix: Mat3,
    pub(crate) bias: Vec3,
    /// Accumulated impulse, persisted across steps for warm-starting.
    pub(crate) accumulated: Vec3,
}

/// Cross-product matrix: `skew(v) * w == v × w`.
fn skew(v: Vec3) -> Mat3 {
    Mat3::from_cols(
        Vec3::new(0.0, v.z, -v.y),
        Vec3::new(-v.z, 0.0, v.x),
        Vec3::new(v.y, -v.x, 0.0),
    )
}

impl Joint {
    pub fn new(local_anchor_a: Vec3, local_anchor_b: Vec3, bias_factor: f32, softness: f32) -> Self {
        Self {
            local_anchor_a,
            local_anchor_b,
            bias_factor,
            softness,
            r_a: Vec3::ZERO,
            r_b: Vec3::ZERO,
            mass_matrix: Mat3::IDENTITY,
            bias: Vec3::ZERO,
            accumulated: Vec3::ZERO,
        }
    }

    /// Recompute anchor arms, the effective-mass matrix, and the position
    /// bias for the coming iterations.
    pub(crate) fn prepare(&mut self, a: &BodyState, b: &BodyState, dt: f32) {
        self.r_a = a.transform.transform_vector3(self.local_anchor_a);
        self.r_b = b.transform.transform_vector3(self.local_anchor_b);

        let sa = skew(self.r_a);
        let sb = skew(self.r_b);
        let mut k = Mat3::IDENTITY * (a.inv_mass + b.inv_mass)
            - sa * a.inv_inertia * sa
            - sb * b.inv_inertia * sb;
        k.x_axis.x += self.softness;
        k.y_axis.y += self.softness;
        k.z_axis.z += self.softness;
        self.mass_matrix = k.inverse();

        let anchor_a = a.position + self.r_a;
        let anchor_b = b.position + self.r_b;
        self.bias = -(self.bias_factor / dt) * (anchor_b - anchor_a);
    }

    /// Re-apply last step's accumulated impulse.
    pub(crate) fn warm_start(&mut self, a: &mut BodyState, b: &mut BodyState, factor: f32) {
        self.accumulated *= factor;
        apply(a, b, self.r_a, self.r_b, self.accumulated);
    }

    /// One sequential-impulse iteration.
    pub(crate) fn solve(&mut self, a: &mut BodyState, b: &mut BodyState) {
        let dv = b.linear + b.angular.cross(self.r_b) - a.linear - a.angular.cross(self.r_a);
        let impulse = self.mass_matrix * (self.bias - dv - self.softness * self.accumulated);
        apply(a, b, self.r_a, self.r_b, impulse);
        self.accumulated += impulse;
    }

    /// Current world-space separation of the two anchors.
    #[cfg(test)]
    pub(crate) fn anchor_error(&self, a: &BodyState, b: &BodyState) -> Vec3 {
        (b.position + self.r_b) - (a.position + self.r_a)
    }
}

fn apply(a: &mut BodyState, b: &mut BodyState, r_a: Vec3, r_b: Vec3, impulse: Vec3) {
    a.linear -= impulse * a.inv_mass;
    a.angular -= a.inv_inertia * r_a.cross(impulse);
    b.linear += impulse * b.inv_mass;
    b.angular += b.inv_inertia * r_b.cross(impulse);
}

/// All registered joints, keyed by the unordered entity pair. At most one
/// joint per pair.
#[derive(Debug, Default)]
pub struct JointSet {
    joints: HashMap<PairKey, Joint>,
}

impl JointSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.joints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.joints.is_empty()
    }

    /// Insert or replace the joint between a pair. Anchors are given in each
    /// entity's local frame; the stored joint is oriented to the canonical
    /// key order.
    pub fn add(
        &mut self,
        a: hecs::Entity,
        b: hecs::Entity,
        anchor_a: Vec3,
        anchor_b: Vec3,
        bias_factor: f32,
        softness: f32,
    ) {
        let key = PairKey::new(a, b);
        let (first, second) = if key.first() == a {
            (anchor_a, anchor_b)
        } else {
            (anchor_b, anchor_a)
        };
        self.joints
            .insert(key, Joint::new(first, second, bias_factor, softness));
    }

    pub fn remove(&mut self, a: hecs::Entity, b: hecs::Entity) -> bool {
        self.joints.remove(&PairKey::new(a, b)).is_some()
    }

    /// Drop every joint attached to an entity.
    pub fn remove_entity(&mut self, entity: hecs::Entity) {
        self.joints.retain(|key, _| !key.contains(entity));
    }

    pub fn clear(&mut self) {
        self.joints.clear();
    }

    pub fn get(&self, a: hecs::Entity, b: hecs::Entity) -> Option<&Joint> {
        self.joints.get(&PairKey::new(a, b))
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = (&PairKey, &mut Joint)> {
        self.joints.iter_mut()
    }
}
