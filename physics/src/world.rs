//! Rapier-backed simulation world.
//!
//! Owns every rapier set plus the buoyancy-tracking list, and exposes body
//! creation and the per-frame [`PhysicsWorld::step`]. The world is created
//! once at startup, is exclusively owned by the frame loop, and lives for
//! the process lifetime; there is no body destruction path (the world is
//! bounded and pre-loaded).

use rapier3d::control::DynamicRayCastVehicleController;
use rapier3d::prelude::*;

use crate::body::{collider_from_def, BodyDef, BodyType, PhysicalBody};
use crate::constants::GRAVITY_MPS2;
use crate::{BodyCreationError, Iso, Quat, Vec3};

/// One entry of the buoyancy pass, registered at body creation.
struct BuoyancyEntry {
    handle: RigidBodyHandle,
    water_gravity_multiplier: f32,
}

pub struct PhysicsWorld {
    pub gravity: Vec3,
    params: IntegrationParameters,
    pipeline: PhysicsPipeline,
    islands: IslandManager,
    broad_phase: BroadPhaseBvh,
    narrow_phase: NarrowPhase,
    pub bodies: RigidBodySet,
    pub colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    buoyancy: Vec<BuoyancyEntry>,
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new(Vec3::new(0.0, -GRAVITY_MPS2, 0.0))
    }
}

impl PhysicsWorld {
    pub fn new(gravity: Vec3) -> Self {
        Self {
            gravity,
            params: IntegrationParameters::default(),
            pipeline: PhysicsPipeline::new(),
            islands: IslandManager::new(),
            broad_phase: BroadPhaseBvh::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            buoyancy: Vec::new(),
        }
    }

    /// Create a rigid body with its colliders and register it for the
    /// buoyancy pass. The initial-state snapshot is captured here, before
    /// any simulation step.
    pub fn create_body(&mut self, def: &BodyDef) -> Result<PhysicalBody, BodyCreationError> {
        if !(def.position.iter().all(|v| v.is_finite())
            && def.rotation.coords.iter().all(|v| v.is_finite()))
        {
            return Err(BodyCreationError::NonFinitePose);
        }

        let iso = Iso::from_parts(def.position.into(), def.rotation);
        let builder = match def.body_type {
            BodyType::Dynamic => RigidBodyBuilder::dynamic(),
            BodyType::Fixed => RigidBodyBuilder::fixed(),
        };
        let rb = builder.pose(iso).sleeping(def.sleeping).build();
        let handle = self.bodies.insert(rb);

        let mut collider_handles = Vec::with_capacity(def.colliders.len());
        for collider_def in &def.colliders {
            let collider = collider_from_def(collider_def)?;
            let co_handle = self
                .colliders
                .insert_with_parent(collider, handle, &mut self.bodies);
            collider_handles.push(co_handle);
        }

        self.buoyancy.push(BuoyancyEntry {
            handle,
            water_gravity_multiplier: def.water_gravity_multiplier,
        });

        Ok(PhysicalBody::new(handle, collider_handles, def))
    }

    /// Advance the world by one frame.
    ///
    /// The gravity-scale mutation runs before the solver step, every step,
    /// unconditionally: a body at depth `d = max(0, -y)` below sea level gets
    /// `gravity_scale = 1 + d * water_gravity_multiplier`, which approximates
    /// floatation without a fluid solver.
    pub fn step(&mut self, dt: f32) {
        self.params.dt = dt;

        for entry in &self.buoyancy {
            let Some(body) = self.bodies.get_mut(entry.handle) else {
                continue;
            };
            let depth = (-body.translation().y).max(0.0);
            body.set_gravity_scale(1.0 + depth * entry.water_gravity_multiplier, false);
        }

        let hooks = ();
        let events = ();
        self.pipeline.step(
            &self.gravity,
            &self.params,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            &hooks,
            &events,
        );
    }

    /// Run the raycast-wheel update of a vehicle controller against this
    /// world. The chassis body is excluded from the wheel rays.
    pub fn update_vehicle(&mut self, controller: &mut DynamicRayCastVehicleController, dt: f32) {
        let filter = QueryFilter::default().exclude_rigid_body(controller.chassis);
        let queries = self.broad_phase.as_query_pipeline_mut(
            self.narrow_phase.query_dispatcher(),
            &mut self.bodies,
            &mut self.colliders,
            filter,
        );
        controller.update_vehicle(dt, queries);
    }

    #[inline]
    pub fn body(&self, handle: RigidBodyHandle) -> Option<&RigidBody> {
        self.bodies.get(handle)
    }

    #[inline]
    pub fn body_mut(&mut self, handle: RigidBodyHandle) -> Option<&mut RigidBody> {
        self.bodies.get_mut(handle)
    }

    /// Total mass of a body in kilograms (0 if the handle is stale).
    #[inline]
    pub fn body_mass(&self, handle: RigidBodyHandle) -> f32 {
        self.bodies.get(handle).map(|b| b.mass()).unwrap_or(0.0)
    }

    /// Apply a world-space impulse at the body's center of mass.
    pub fn apply_impulse(&mut self, handle: RigidBodyHandle, impulse: Vec3) {
        if let Some(body) = self.bodies.get_mut(handle) {
            body.apply_impulse(impulse, true);
        }
    }

    /// Apply a world-space torque impulse.
    pub fn apply_torque_impulse(&mut self, handle: RigidBodyHandle, torque: Vec3) {
        if let Some(body) = self.bodies.get_mut(handle) {
            body.apply_torque_impulse(torque, true);
        }
    }

    /// Teleport a body, zeroing its linear and angular velocity.
    pub fn teleport(&mut self, handle: RigidBodyHandle, position: Vec3, rotation: Quat) {
        if let Some(body) = self.bodies.get_mut(handle) {
            body.set_linvel(Vec3::zeros(), false);
            body.set_angvel(Vec3::zeros(), false);
            body.set_position(Iso::from_parts(position.into(), rotation), true);
        }
    }
}
