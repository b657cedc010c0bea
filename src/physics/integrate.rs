//! Velocity integration and bookkeeping systems.
//!
//! Three passes that frame the solver each substep: refresh world-space
//! inverse inertia from the current orientation, apply gravity, and finally
//! advance transforms from the solved velocities (with drag, an angular
//! speed clamp, and optional sleep accounting).

use glam::{Mat3, Quat};

use crate::ecs::components::physics::{AxisLock, PhysicsBody};
use crate::ecs::components::transform::{GlobalTransform, Transform};

use super::PhysicsConfig;

/// Advance each body's world-space inverse inertia tensor: `R · I⁻¹ · Rᵀ`.
pub(crate) fn update_inertia(world: &mut hecs::World) {
    for (_, (body, transform)) in world.query_mut::<(&mut PhysicsBody, &Transform)>() {
        let r = Mat3::from_quat(transform.rotation);
        body.inv_inertia_world = r * body.inv_inertia_local * r.transpose();
    }
}

/// Accumulate gravity into dynamic awake bodies.
pub(crate) fn apply_gravity(world: &mut hecs::World, config: &PhysicsConfig, dt: f32) {
    for (_, (body, lock)) in world.query_mut::<(&mut PhysicsBody, Option<&AxisLock>)>() {
        if body.kinematic || body.asleep || !body.use_gravity {
            continue;
        }
        body.linear_velocity += config.gravity * dt;
        if let Some(lock) = lock {
            for i in 0..3 {
                if lock.linear[i] {
                    body.linear_velocity[i] = 0.0;
                }
            }
        }
    }
}

/// Integrate velocities into transforms.
///
/// Orientation advances by the small-angle quaternion derivative
/// `q' = normalize(q + ½·dt·ω·q)`, which is exact enough at fixed-timestep
/// rates once the angular speed clamp is in place.
pub(crate) fn integrate(world: &mut hecs::World, config: &PhysicsConfig, dt: f32) {
    for (_, (body, transform, global, lock)) in world.query_mut::<(
        &mut PhysicsBody,
        &mut Transform,
        &mut GlobalTransform,
        Option<&AxisLock>,
    )>() {
        if body.asleep {
            continue;
        }

        if !body.kinematic {
            body.linear_velocity *= (1.0 - body.linear_drag).clamp(0.0, 1.0).powf(dt);
            body.angular_velocity *= (1.0 - body.angular_drag).clamp(0.0, 1.0).powf(dt);

            let speed = body.angular_velocity.length();
            if speed > config.max_angular_speed {
                body.angular_velocity *= config.max_angular_speed / speed;
            }
        }

        if let Some(lock) = lock {
            for i in 0..3 {
                if lock.linear[i] {
                    body.linear_velocity[i] = 0.0;
                }
                if lock.angular[i] {
                    body.angular_velocity[i] = 0.0;
                }
            }
        }

        transform.position += body.linear_velocity * dt;
        let w = body.angular_velocity;
        if w.length_squared() > 1e-12 {
            let wq = Quat::from_xyzw(w.x, w.y, w.z, 0.0);
            transform.rotation =
                (transform.rotation + (wq * transform.rotation) * (0.5 * dt)).normalize();
        }
        global.0 = transform.to_matrix();

        if config.sleeping && !body.kinematic {
            let slow = body.linear_velocity.length() < config.sleep_linear_threshold
                && body.angular_velocity.length() < config.sleep_angular_threshold;
            if slow {
                body.low_motion_frames += 1;
                if body.low_motion_frames >= config.sleep_frames {
                    body.asleep = true;
                    body.linear_velocity = glam::Vec3::ZERO;
                    body.angular_velocity = glam::Vec3::ZERO;
                }
            } else {
                body.low_motion_frames = 0;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn spawn_dynamic(world: &mut hecs::World) -> hecs::Entity {
        world.spawn((
            Transform::identity(),
            GlobalTransform::default(),
            PhysicsBody::dynamic(1.0),
        ))
    }

    #[test]
    fn test_gravity_accelerates_dynamic_bodies() {
        let mut world = hecs::World::new();
        let config = PhysicsConfig::default();
        let e = spawn_dynamic(&mut world);
        let k = world.spawn((
            Transform::identity(),
            GlobalTransform::default(),
            PhysicsBody::kinematic(),
        ));

        apply_gravity(&mut world, &config, 1.0);
        let v = world.get::<&PhysicsBody>(e).unwrap().linear_velocity;
        assert!((v - config.gravity).length() < 1e-5);
        let vk = world.get::<&PhysicsBody>(k).unwrap().linear_velocity;
        assert_eq!(vk, Vec3::ZERO);
    }

    #[test]
    fn test_integration_advances_transform_and_global() {
        let mut world = hecs::World::new();
        let config = PhysicsConfig::default();
        let e = spawn_dynamic(&mut world);
        {
            let mut body = world.get::<&mut PhysicsBody>(e).unwrap();
            body.linear_velocity = Vec3::new(2.0, 0.0, 0.0);
            body.linear_drag = 0.0;
        }

        integrate(&mut world, &config, 0.5);
        let t = world.get::<&Transform>(e).unwrap().position;
        assert!((t - Vec3::new(1.0, 0.0, 0.0)).length() < 1e-5);
        let g = world.get::<&GlobalTransform>(e).unwrap().position();
        assert!((g - t).length() < 1e-6);
    }

    #[test]
    fn test_drag_decays_velocity() {
        let mut world = hecs::World::new();
        let config = PhysicsConfig::default();
        let e = spawn_dynamic(&mut world);
        {
            let mut body = world.get::<&mut PhysicsBody>(e).unwrap();
            body.linear_velocity = Vec3::X;
            body.linear_drag = 0.5;
        }

        integrate(&mut world, &config, 1.0);
        let v = world.get::<&PhysicsBody>(e).unwrap().linear_velocity.x;
        assert!((v - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_angular_speed_clamped() {
        let mut world = hecs::World::new();
        let config = PhysicsConfig::default();
        let e = spawn_dynamic(&mut world);
        {
            let mut body = world.get::<&mut PhysicsBody>(e).unwrap();
            body.angular_velocity = Vec3::new(1000.0, 0.0, 0.0);
            body.angular_drag = 0.0;
        }

        integrate(&mut world, &config, 1.0 / 60.0);
        let w = world.get::<&PhysicsBody>(e).unwrap().angular_velocity;
        assert!(w.length() <= config.max_angular_speed + 1e-3);
    }

    #[test]
    fn test_rotation_stays_normalized() {
        let mut world = hecs::World::new();
        let config = PhysicsConfig::default();
        let e = spawn_dynamic(&mut world);
        {
            let mut body = world.get::<&mut PhysicsBody>(e).unwrap();
            body.angular_velocity = Vec3::new(3.0, 2.0, 1.0);
            body.angular_drag = 0.0;
        }

        for _ in 0..120 {
            integrate(&mut world, &config, 1.0 / 60.0);
        }
        let q = world.get::<&Transform>(e).unwrap().rotation;
        assert!((q.length() - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_sleep_after_low_motion_frames() {
        let mut world = hecs::World::new();
        let mut config = PhysicsConfig::default();
        config.sleeping = true;
        config.sleep_frames = 10;
        let e = spawn_dynamic(&mut world);

        for _ in 0..10 {
            integrate(&mut world, &config, 1.0 / 60.0);
        }
        let body = world.get::<&PhysicsBody>(e).unwrap();
        assert!(body.asleep);

        // Asleep bodies no longer accumulate gravity.
        drop(body);
        apply_gravity(&mut world, &config, 1.0);
        let body = world.get::<&PhysicsBody>(e).unwrap();
        assert_eq!(body.linear_velocity, Vec3::ZERO);
    }

    #[test]
    fn test_update_inertia_tracks_orientation() {
        let mut world = hecs::World::new();
        let e = world.spawn((
            Transform {
                rotation: Quat::from_rotation_z(std::f32::consts::FRAC_PI_2),
                ..Transform::identity()
            },
            GlobalTransform::default(),
            PhysicsBody::dynamic_box(1.0, Vec3::new(1.0, 2.0, 3.0)),
        ));

        update_inertia(&mut world);
        let body = world.get::<&PhysicsBody>(e).unwrap();
        // A 90° roll about Z swaps the X and Y principal axes.
        let local_x = body.inv_inertia_local.x_axis.x;
        let world_y = body.inv_inertia_world.y_axis.y;
        assert!((local_x - world_y).abs() < 1e-5);
    }
}
