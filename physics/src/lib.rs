//! Vehicle physics core: a fixed-timestep rigid-body world driven by rapier3d,
//! a four-wheel raycast-suspension vehicle controller, a stability/recovery
//! state machine, force-field appliers (explosion, vortex), and an entity sync
//! bridging bodies to externally-owned visual transforms.
//!
//! The frame pipeline is single-threaded and strictly ordered:
//! pre-physics (inputs, deferred impulses) -> world step -> post-physics
//! (telemetry, stability tests, visual sync). See [`sim::Simulation`].

pub mod body;
pub mod constants;
pub mod forces;
pub mod groups;
pub mod sim;
pub mod stability;
pub mod sync;
pub mod vehicle;
pub mod world;

use nalgebra as na;

/// Common math aliases for clarity and consistency.
pub type Vec3 = na::Vector3<f32>;
pub type Quat = na::UnitQuaternion<f32>;
pub type Iso = na::Isometry3<f32>;

pub use body::{BodyCreationError, BodyDef, BodyType, ColliderDef, ColliderShapeDef, PhysicalBody};
pub use forces::{remap_clamp, Explosion, Vortex};
pub use groups::{CollisionGroup, SurfaceCategory};
pub use sim::Simulation;
pub use stability::{StabilityRecovery, VehicleEvent};
pub use sync::{EntityId, EntitySync, PoseTarget};
pub use vehicle::{
    SuspensionHeight, VehicleController, VehicleInputs, VehicleTelemetry, VehicleTuning,
    WheelSettings,
};
pub use world::PhysicsWorld;
