//! Frame pipeline composition.
//!
//! [`Simulation`] is the explicit context that owns the world, the vehicle,
//! the recovery state machine, the force-field state and the entity sync;
//! everything reaches its collaborators through borrows, never through a
//! global. One [`Simulation::tick`] runs the three ordered phases:
//!
//! 1. pre-physics: drain the deferred explosion impulse, sample active
//!    vortices, apply vehicle inputs and wheel raycasts;
//! 2. world step: a single blocking solver call;
//! 3. post-physics: derive telemetry, run the stability tests, sync visuals.
//!
//! Everything is single-threaded and synchronous. External requests such as
//! explosions funnel into the pre-physics phase of the *next* frame; nothing
//! mutates the solver mid-frame.

use crate::constants::MAX_FRAME_DT;
use crate::forces::{Explosion, PendingImpulse, Vortex};
use crate::stability::{StabilityRecovery, StabilitySample, VehicleEvent};
use crate::sync::EntitySync;
use crate::vehicle::{VehicleController, VehicleInputs};
use crate::world::PhysicsWorld;
use crate::Vec3;

pub struct Simulation {
    pub world: PhysicsWorld,
    pub vehicle: VehicleController,
    pub stability: StabilityRecovery,
    pub sync: EntitySync,
    pending_explosion: PendingImpulse,
    vortices: Vec<Vortex>,
}

impl Simulation {
    pub fn new(world: PhysicsWorld, vehicle: VehicleController) -> Self {
        let stability = StabilityRecovery::new(vehicle.tuning.flip_force);
        Self {
            world,
            vehicle,
            stability,
            sync: EntitySync::new(),
            pending_explosion: PendingImpulse::default(),
            vortices: Vec::new(),
        }
    }

    /// Fire an explosion. The impulse is computed now but applied at the
    /// start of the next frame's pre-physics phase.
    pub fn explode(&mut self, position: Vec3) {
        let explosion = Explosion { position };
        let chassis_position = self.vehicle.telemetry().position;
        let mass = self.vehicle.mass(&self.world);
        if let Some(impulse) = explosion.impulse(chassis_position, mass) {
            self.pending_explosion.push(impulse);
        }
    }

    /// Activate a vortex field; it is sampled every frame until removed.
    pub fn add_vortex(&mut self, vortex: Vortex) {
        self.vortices.push(vortex);
    }

    pub fn clear_vortices(&mut self) {
        self.vortices.clear();
    }

    #[inline]
    pub fn vortices_mut(&mut self) -> &mut Vec<Vortex> {
        &mut self.vortices
    }

    /// Manual recovery trigger.
    pub fn flip(&mut self) {
        let rotation = self.vehicle.telemetry().quaternion;
        let mass = self.vehicle.mass(&self.world);
        let flip = self.stability.flip(&rotation, mass);
        let chassis = self.vehicle.chassis_handle();
        self.world.apply_impulse(chassis, flip.impulse);
        self.world.apply_torque_impulse(chassis, flip.torque);
    }

    /// Advance one frame. `dt` arrives pre-clamped from the frame scheduler;
    /// the clamp here is the last line of defense.
    pub fn tick(&mut self, dt: f32, inputs: &VehicleInputs) -> Vec<VehicleEvent> {
        let dt = dt.clamp(0.0, MAX_FRAME_DT);
        let chassis = self.vehicle.chassis_handle();

        // Pre-physics: deferred and continuous external impulses, then
        // vehicle inputs and wheel raycasts.
        if let Some(impulse) = self.pending_explosion.drain() {
            self.world.apply_impulse(chassis, impulse);
        }
        let chassis_position = self.vehicle.telemetry().position;
        for vortex in &self.vortices {
            if let Some(impulse) = vortex.impulse(chassis_position, dt) {
                self.world.apply_impulse(chassis, impulse);
            }
        }
        self.vehicle.pre_step(inputs, dt, &mut self.world);

        // World step.
        self.world.step(dt);

        // Post-physics: telemetry, stability, visuals.
        self.vehicle.post_step(&self.world);
        let telemetry = self.vehicle.telemetry();
        let sample = StabilitySample {
            absolute_speed: telemetry.absolute_speed,
            rotation: telemetry.quaternion,
            chassis_mass: self.vehicle.mass(&self.world),
        };
        if let Some(flip) = self.stability.test(&sample, dt) {
            self.world.apply_impulse(chassis, flip.impulse);
            self.world.apply_torque_impulse(chassis, flip.torque);
        }
        self.sync.update(&mut self.world);

        self.stability.take_events()
    }
}
