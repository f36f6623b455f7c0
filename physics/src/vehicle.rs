//! Four-wheel raycast-suspension vehicle controller.
//!
//! Wraps a dynamic chassis body plus rapier's `DynamicRayCastVehicleController`
//! and splits the frame into the two phases the pipeline expects:
//! - [`VehicleController::pre_step`] turns normalized inputs into per-wheel
//!   steering, engine force, brake and suspension rest length, then runs the
//!   wheel raycasts;
//! - [`VehicleController::post_step`] derives the per-frame measurements
//!   (speed, direction, wheel contact) from the stepped chassis pose.
//!
//! Conventions
//! - Chassis-local axes: +X forward, +Y up, +Z right; the wheel order is the
//!   two front wheels first, then the two rear wheels (steering drives the
//!   front pair).
//! - `speed`/`absolute_speed` are measured in meters per frame (the velocity
//!   is a position delta, not a rate).

use nalgebra::Point3;
use rapier3d::control::{DynamicRayCastVehicleController, WheelTuning};
use rapier3d::prelude::RigidBodyHandle;

use crate::body::{BodyDef, PhysicalBody};
use crate::world::PhysicsWorld;
use crate::{BodyCreationError, Quat, Vec3};

/// Named suspension height buckets chosen by upstream input
/// (crouch/jump semantics). The controller only applies the bucket value
/// it is given.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum SuspensionHeight {
    Low,
    #[default]
    Mid,
    High,
}

/// Per-wheel geometry and suspension parameters.
#[derive(Clone, Copy, Debug)]
pub struct WheelSettings {
    /// Chassis-local connection point of the suspension (meters).
    pub base_position: Vec3,
    /// Wheel radius (meters).
    pub radius: f32,
    /// Chassis-local suspension ray direction, usually -Y.
    pub direction: Vec3,
    /// Chassis-local axle (spin) axis. The rolling direction is
    /// `ground_normal x axle`, so on flat ground +Z rolls along +X.
    pub axle: Vec3,
    pub friction_slip: f32,
    pub side_friction_stiffness: f32,
    pub suspension_stiffness: f32,
    pub suspension_compression: f32,
    pub suspension_relaxation: f32,
    pub max_suspension_travel: f32,
    pub max_suspension_force: f32,
}

impl WheelSettings {
    pub fn at(base_position: Vec3) -> Self {
        Self {
            base_position,
            radius: 0.35,
            direction: -Vec3::y(),
            axle: Vec3::z(),
            friction_slip: 10.5,
            side_friction_stiffness: 1.0,
            suspension_stiffness: 50.0,
            suspension_compression: 4.4,
            suspension_relaxation: 2.3,
            max_suspension_travel: 0.5,
            max_suspension_force: 10_000.0,
        }
    }

    fn tuning(&self) -> WheelTuning {
        WheelTuning {
            suspension_stiffness: self.suspension_stiffness,
            suspension_compression: self.suspension_compression,
            suspension_damping: self.suspension_relaxation,
            max_suspension_travel: self.max_suspension_travel,
            side_friction_stiffness: self.side_friction_stiffness,
            friction_slip: self.friction_slip,
            max_suspension_force: self.max_suspension_force,
        }
    }
}

/// Vehicle-wide tunables.
#[derive(Clone, Copy, Debug)]
pub struct VehicleTuning {
    /// Maximum front-wheel angle at full steering input (radians).
    pub steering_amplitude: f32,
    pub engine_force_amplitude: f32,
    /// Multiplier applied to engine force and max speed while boosting.
    pub boost_multiplier: f32,
    /// Soft speed cap (meters per frame); the engine force fades
    /// asymptotically past it instead of hard-clamping.
    pub max_speed: f32,
    /// Scales pedal values to the per-wheel brake. The solver treats the
    /// brake as a per-step impulse clamp, so the applied value is
    /// `pedal * amplitude * dt`.
    pub brake_amplitude: f32,
    /// Passive rolling resistance applied when there is no pedal input.
    pub idle_brake: f32,
    /// Brake applied when the pedal opposes the travel direction,
    /// forcing a brake-then-reverse feel.
    pub reverse_brake: f32,
    /// Vertical recovery impulse per kilogram of chassis mass.
    pub flip_force: f32,
    /// Suspension rest length per height bucket (low, mid, high), meters.
    pub rest_lengths: [f32; 3],
}

impl Default for VehicleTuning {
    fn default() -> Self {
        Self {
            steering_amplitude: 0.35,
            engine_force_amplitude: 75.0,
            boost_multiplier: 2.0,
            max_speed: 2.0,
            brake_amplitude: 60.0,
            idle_brake: 0.15,
            reverse_brake: 1.0,
            flip_force: 6.0,
            rest_lengths: [0.1, 0.25, 0.4],
        }
    }
}

impl VehicleTuning {
    #[inline]
    pub fn rest_length(&self, height: SuspensionHeight) -> f32 {
        match height {
            SuspensionHeight::Low => self.rest_lengths[0],
            SuspensionHeight::Mid => self.rest_lengths[1],
            SuspensionHeight::High => self.rest_lengths[2],
        }
    }
}

/// Normalized player input, already mapped from whatever device produced it.
#[derive(Clone, Copy, Debug, Default)]
pub struct VehicleInputs {
    /// Accelerator pedal in [-1, 1]; negative reverses.
    pub accelerate: f32,
    /// Steering in [-1, 1].
    pub steer: f32,
    /// Boost in {0, 1}.
    pub boost: f32,
    /// Explicit brake in {0, 1}.
    pub brake: f32,
    /// Suspension height bucket per wheel.
    pub suspension: [SuspensionHeight; 4],
}

/// Per-wheel contact measurements, derived after the step.
#[derive(Clone, Copy, Debug, Default)]
pub struct WheelContact {
    pub in_contact: bool,
    pub contact_point: Vec3,
    pub suspension_length: f32,
}

/// Per-frame chassis measurements. Derived, never persisted.
#[derive(Clone, Copy, Debug)]
pub struct VehicleTelemetry {
    pub position: Vec3,
    pub quaternion: Quat,
    /// Position delta over the last frame (meters per frame).
    pub velocity: Vec3,
    /// Normalized travel direction; zero while at rest.
    pub direction: Vec3,
    /// Velocity projected on the chassis forward axis (signed).
    pub speed: f32,
    pub absolute_speed: f32,
    pub going_forward: bool,
    pub wheels: [WheelContact; 4],
}

impl Default for VehicleTelemetry {
    fn default() -> Self {
        Self {
            position: Vec3::zeros(),
            quaternion: Quat::identity(),
            velocity: Vec3::zeros(),
            direction: Vec3::zeros(),
            speed: 0.0,
            absolute_speed: 0.0,
            going_forward: true,
            wheels: [WheelContact::default(); 4],
        }
    }
}

/// Outcome of the brake-case selection. The three cases are mutually
/// exclusive and evaluated in order.
#[derive(Clone, Copy, Debug, PartialEq)]
struct BrakeDecision {
    brake: f32,
    cut_engine: bool,
}

/// Select the brake base value: explicit brake input wins, then idle rolling
/// resistance when the pedal is released, then the reverse guard when the
/// pedal opposes the current travel direction above walking speed.
fn brake_decision(
    accelerate: f32,
    brake_input: f32,
    going_forward: bool,
    absolute_speed: f32,
    tuning: &VehicleTuning,
) -> BrakeDecision {
    if brake_input > 0.0 {
        BrakeDecision {
            brake: brake_input,
            cut_engine: false,
        }
    } else if accelerate.abs() < 0.1 {
        BrakeDecision {
            brake: tuning.idle_brake,
            cut_engine: false,
        }
    } else if (accelerate > 0.0) != going_forward && absolute_speed > 0.5 {
        BrakeDecision {
            brake: tuning.reverse_brake,
            cut_engine: true,
        }
    } else {
        BrakeDecision {
            brake: 0.0,
            cut_engine: false,
        }
    }
}

/// Engine force with the smooth asymptotic speed cap: past the effective max
/// speed the force decays as `1 / (1 + overflow)` instead of clamping.
fn engine_force(accelerate: f32, boost: f32, absolute_speed: f32, tuning: &VehicleTuning) -> f32 {
    let effective_max = tuning.max_speed * (1.0 + (tuning.boost_multiplier - 1.0) * boost);
    let overflow = (absolute_speed - effective_max).max(0.0);
    accelerate * (1.0 + boost * tuning.boost_multiplier) * tuning.engine_force_amplitude
        / (1.0 + overflow)
}

/// Motion measurements derived from one frame of chassis movement.
fn derive_motion(
    previous: Vec3,
    current: Vec3,
    forward_world: Vec3,
) -> (Vec3, Vec3, f32, f32, bool) {
    let velocity = current - previous;
    let absolute_speed = velocity.norm();
    let direction = velocity.try_normalize(1.0e-9).unwrap_or_default();
    let speed = velocity.dot(&forward_world);
    // Threshold instead of a sign check, so jitter near zero velocity does
    // not flip the travel direction every frame.
    let going_forward = direction.dot(&forward_world) > 0.5;
    (velocity, direction, speed, absolute_speed, going_forward)
}

pub struct VehicleController {
    chassis: PhysicalBody,
    controller: DynamicRayCastVehicleController,
    pub tuning: VehicleTuning,
    wheels: [WheelSettings; 4],
    telemetry: VehicleTelemetry,
    previous_position: Vec3,
    going_forward: bool,
}

impl VehicleController {
    /// Create the chassis body and attach the four wheels.
    /// Wheel order: the two front wheels first, then the two rear wheels.
    pub fn new(
        world: &mut PhysicsWorld,
        chassis_def: &BodyDef,
        wheels: [WheelSettings; 4],
        tuning: VehicleTuning,
    ) -> Result<Self, BodyCreationError> {
        let chassis = world.create_body(chassis_def)?;

        let mut controller = DynamicRayCastVehicleController::new(chassis.handle);
        controller.index_up_axis = 1;
        controller.index_forward_axis = 0;

        let rest = tuning.rest_length(SuspensionHeight::default());
        for settings in &wheels {
            controller.add_wheel(
                Point3::from(settings.base_position),
                settings.direction,
                settings.axle,
                rest,
                settings.radius,
                &settings.tuning(),
            );
        }

        Ok(Self {
            chassis,
            controller,
            tuning,
            wheels,
            telemetry: VehicleTelemetry {
                position: chassis_def.position,
                quaternion: chassis_def.rotation,
                ..VehicleTelemetry::default()
            },
            previous_position: chassis_def.position,
            going_forward: true,
        })
    }

    #[inline]
    pub fn chassis(&self) -> &PhysicalBody {
        &self.chassis
    }

    #[inline]
    pub fn chassis_handle(&self) -> RigidBodyHandle {
        self.chassis.handle
    }

    #[inline]
    pub fn telemetry(&self) -> &VehicleTelemetry {
        &self.telemetry
    }

    /// The per-wheel settings the controller was built with.
    #[inline]
    pub fn wheel_settings(&self) -> &[WheelSettings; 4] {
        &self.wheels
    }

    /// Apply inputs to the wheels and run the raycast/suspension update.
    /// Runs in the pre-physics phase, before the world step.
    pub fn pre_step(&mut self, inputs: &VehicleInputs, dt: f32, world: &mut PhysicsWorld) {
        let accelerate = inputs.accelerate.clamp(-1.0, 1.0);
        let steer = inputs.steer.clamp(-1.0, 1.0);
        let boost = inputs.boost.clamp(0.0, 1.0);
        let brake_input = inputs.brake.clamp(0.0, 1.0);

        let steering = steer * self.tuning.steering_amplitude;
        let mut force = engine_force(
            accelerate,
            boost,
            self.telemetry.absolute_speed,
            &self.tuning,
        );
        let decision = brake_decision(
            accelerate,
            brake_input,
            self.going_forward,
            self.telemetry.absolute_speed,
            &self.tuning,
        );
        if decision.cut_engine {
            force = 0.0;
        }
        let brake = decision.brake * self.tuning.brake_amplitude * dt;

        for (index, wheel) in self.controller.wheels_mut().iter_mut().enumerate() {
            // Identical angle on both front wheels; no Ackermann correction.
            wheel.steering = if index < 2 { steering } else { 0.0 };
            wheel.engine_force = force;
            wheel.brake = brake;
            wheel.suspension_rest_length = self.tuning.rest_length(inputs.suspension[index]);
        }

        world.update_vehicle(&mut self.controller, dt);
    }

    /// Derive the per-frame measurements from the stepped chassis.
    /// Runs in the post-physics phase.
    pub fn post_step(&mut self, world: &PhysicsWorld) {
        let Some(body) = world.body(self.chassis.handle) else {
            return;
        };
        let position = *body.translation();
        let quaternion = *body.rotation();
        let forward_world = quaternion * Vec3::x();

        let (velocity, direction, speed, absolute_speed, going_forward) =
            derive_motion(self.previous_position, position, forward_world);
        self.previous_position = position;
        self.going_forward = going_forward;

        let mut wheels = [WheelContact::default(); 4];
        for (contact, wheel) in wheels.iter_mut().zip(self.controller.wheels()) {
            let info = wheel.raycast_info();
            contact.in_contact = info.is_in_contact;
            contact.contact_point = info.contact_point_ws.coords;
            contact.suspension_length = info.suspension_length;
        }

        self.telemetry = VehicleTelemetry {
            position,
            quaternion,
            velocity,
            direction,
            speed,
            absolute_speed,
            going_forward,
            wheels,
        };
    }

    /// Teleport the chassis to `position` with a yaw rotation, zeroing all
    /// velocities and the derived motion state.
    pub fn move_to(&mut self, world: &mut PhysicsWorld, position: Vec3, yaw: f32) {
        let rotation = Quat::from_axis_angle(&Vec3::y_axis(), yaw);
        world.teleport(self.chassis.handle, position, rotation);
        self.previous_position = position;
        self.telemetry = VehicleTelemetry {
            position,
            quaternion: rotation,
            ..VehicleTelemetry::default()
        };
    }

    /// Chassis mass in kilograms.
    #[inline]
    pub fn mass(&self, world: &PhysicsWorld) -> f32 {
        world.body_mass(self.chassis.handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::{BodyType, ColliderDef, ColliderShapeDef};
    use crate::groups::SurfaceCategory;

    #[test]
    fn engine_force_matches_worked_example() {
        // accel=1, boost=0, amplitude=7, absolute_speed=7, max_speed=5
        // => overflow=2 => force = 7/3.
        let tuning = VehicleTuning {
            engine_force_amplitude: 7.0,
            max_speed: 5.0,
            ..VehicleTuning::default()
        };
        let force = engine_force(1.0, 0.0, 7.0, &tuning);
        assert!((force - 7.0 / 3.0).abs() < 1.0e-6);
    }

    #[test]
    fn engine_force_is_monotonically_non_increasing_in_overflow() {
        let tuning = VehicleTuning {
            engine_force_amplitude: 7.0,
            max_speed: 5.0,
            ..VehicleTuning::default()
        };
        let mut previous = f32::INFINITY;
        for i in 0..100 {
            let speed = i as f32 * 0.25;
            let force = engine_force(1.0, 0.0, speed, &tuning);
            assert!(force <= previous + 1.0e-9);
            previous = force;
        }
        // At overflow = 0 the force is exactly accel * amplitude.
        assert!((engine_force(1.0, 0.0, 0.0, &tuning) - 7.0).abs() < 1.0e-6);
    }

    #[test]
    fn boost_raises_both_force_and_effective_max_speed() {
        let tuning = VehicleTuning::default();
        let plain = engine_force(1.0, 0.0, 0.0, &tuning);
        let boosted = engine_force(1.0, 1.0, 0.0, &tuning);
        assert!(boosted > plain);

        // A speed that overflows without boost does not overflow with it.
        let at_cap = tuning.max_speed * tuning.boost_multiplier;
        let boosted_at_cap = engine_force(1.0, 1.0, at_cap, &tuning);
        assert!(
            (boosted_at_cap - (1.0 + tuning.boost_multiplier) * tuning.engine_force_amplitude)
                .abs()
                < 1.0e-4
        );
    }

    #[test]
    fn brake_cases_are_mutually_exclusive_and_ordered() {
        let tuning = VehicleTuning::default();

        // (a) explicit brake wins even while accelerating against travel.
        let a = brake_decision(-1.0, 1.0, true, 2.0, &tuning);
        assert_eq!(a.brake, 1.0);
        assert!(!a.cut_engine);

        // (b) no pedal input: idle rolling resistance.
        let b = brake_decision(0.05, 0.0, true, 2.0, &tuning);
        assert_eq!(b.brake, tuning.idle_brake);
        assert!(!b.cut_engine);

        // (c) pedal opposing travel above the speed floor: reverse guard.
        let c = brake_decision(-1.0, 0.0, true, 2.0, &tuning);
        assert_eq!(c.brake, tuning.reverse_brake);
        assert!(c.cut_engine);

        // Below the speed floor the reverse guard does not engage.
        let d = brake_decision(-1.0, 0.0, true, 0.3, &tuning);
        assert_eq!(d.brake, 0.0);
        assert!(!d.cut_engine);
    }

    #[test]
    fn derived_motion_uses_threshold_not_sign_for_forward() {
        let forward = Vec3::x();

        // Straight forward travel.
        let (_, direction, speed, absolute, going_forward) =
            derive_motion(Vec3::zeros(), Vec3::new(1.0, 0.0, 0.0), forward);
        assert!(going_forward);
        assert!((speed - 1.0).abs() < 1.0e-6);
        assert!((absolute - 1.0).abs() < 1.0e-6);
        assert!((direction - forward).norm() < 1.0e-6);

        // Mostly sideways: positive forward component but below the 0.5
        // alignment threshold, so not "going forward".
        let (_, _, speed, _, going_forward) =
            derive_motion(Vec3::zeros(), Vec3::new(0.1, 0.0, 1.0), forward);
        assert!(speed > 0.0);
        assert!(!going_forward);

        // At rest the direction is zero and the flag stays off.
        let (velocity, direction, _, absolute, going_forward) =
            derive_motion(Vec3::zeros(), Vec3::zeros(), forward);
        assert_eq!(velocity, Vec3::zeros());
        assert_eq!(direction, Vec3::zeros());
        assert_eq!(absolute, 0.0);
        assert!(!going_forward);
    }

    #[test]
    fn suspension_buckets_map_to_rest_lengths() {
        let tuning = VehicleTuning::default();
        assert!(tuning.rest_length(SuspensionHeight::Low) < tuning.rest_length(SuspensionHeight::Mid));
        assert!(tuning.rest_length(SuspensionHeight::Mid) < tuning.rest_length(SuspensionHeight::High));
    }

    fn test_vehicle(world: &mut PhysicsWorld) -> VehicleController {
        // Flat floor.
        let floor = BodyDef::new(BodyType::Fixed, Vec3::new(0.0, -0.5, 0.0), Quat::identity())
            .with_collider({
                let mut c = ColliderDef::new(ColliderShapeDef::Cuboid {
                    half_extents: Vec3::new(100.0, 0.5, 100.0),
                });
                c.category = SurfaceCategory::Floor;
                c
            });
        world.create_body(&floor).unwrap();

        let chassis = BodyDef::new(BodyType::Dynamic, Vec3::new(0.0, 1.0, 0.0), Quat::identity())
            .with_collider({
                let mut c = ColliderDef::new(ColliderShapeDef::Cuboid {
                    half_extents: Vec3::new(1.0, 0.3, 0.6),
                });
                c.mass = Some(30.0);
                c
            });

        let wheels = [
            WheelSettings::at(Vec3::new(0.8, -0.2, 0.55)),
            WheelSettings::at(Vec3::new(0.8, -0.2, -0.55)),
            WheelSettings::at(Vec3::new(-0.8, -0.2, 0.55)),
            WheelSettings::at(Vec3::new(-0.8, -0.2, -0.55)),
        ];
        VehicleController::new(world, &chassis, wheels, VehicleTuning::default()).unwrap()
    }

    #[test]
    fn wheels_settle_into_contact_on_flat_ground() {
        let mut world = PhysicsWorld::default();
        let mut vehicle = test_vehicle(&mut world);
        let inputs = VehicleInputs::default();
        let dt = 1.0 / 60.0;

        for _ in 0..180 {
            vehicle.pre_step(&inputs, dt, &mut world);
            world.step(dt);
            vehicle.post_step(&world);
        }
        for contact in &vehicle.telemetry().wheels {
            assert!(contact.in_contact);
            assert!(contact.suspension_length >= 0.0);
        }
    }

    #[test]
    fn positive_throttle_drives_along_the_forward_axis() {
        let mut world = PhysicsWorld::default();
        let mut vehicle = test_vehicle(&mut world);
        let dt = 1.0 / 60.0;

        // Let the suspension settle first.
        let idle = VehicleInputs::default();
        for _ in 0..120 {
            vehicle.pre_step(&idle, dt, &mut world);
            world.step(dt);
            vehicle.post_step(&world);
        }
        let start = vehicle.telemetry().position;

        let throttle = VehicleInputs {
            accelerate: 1.0,
            ..VehicleInputs::default()
        };
        for _ in 0..120 {
            vehicle.pre_step(&throttle, dt, &mut world);
            world.step(dt);
            vehicle.post_step(&world);
        }
        // The chassis spawns unrotated with its forward axis on +X, so
        // positive throttle must move it along +X, with the travel-direction
        // flag and the signed speed agreeing.
        let telemetry = vehicle.telemetry();
        assert!(
            telemetry.position.x > start.x + 0.5,
            "vehicle did not advance along +X: {} -> {}",
            start.x,
            telemetry.position.x
        );
        assert!(telemetry.going_forward);
        assert!(telemetry.speed > 0.0);
    }

    #[test]
    fn wheel_settings_are_retained() {
        let mut world = PhysicsWorld::default();
        let vehicle = test_vehicle(&mut world);
        let settings = vehicle.wheel_settings();
        assert_eq!(settings[0].base_position, Vec3::new(0.8, -0.2, 0.55));
        assert!((settings[3].radius - 0.35).abs() < 1.0e-6);
    }

    #[test]
    fn move_to_teleports_and_clears_motion() {
        let mut world = PhysicsWorld::default();
        let mut vehicle = test_vehicle(&mut world);
        vehicle.move_to(&mut world, Vec3::new(5.0, 2.0, -3.0), 1.2);

        let telemetry = vehicle.telemetry();
        assert!((telemetry.position - Vec3::new(5.0, 2.0, -3.0)).norm() < 1.0e-6);
        assert_eq!(telemetry.absolute_speed, 0.0);

        let body = world.body(vehicle.chassis_handle()).unwrap();
        assert_eq!(body.linvel().norm(), 0.0);
        assert_eq!(body.angvel().norm(), 0.0);
    }
}
