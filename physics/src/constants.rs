/*!
World-level tuning constants.

These centralize the parameters used by the world step, the force-field
appliers, and the stability/recovery state machine. Keeping them together
makes tuning easier and helps ensure deterministic behavior across platforms.

Notes
- Distances are in meters, time in seconds, mass in kilograms.
- Per-vehicle tunables live in [`crate::vehicle::VehicleTuning`]; only values
  shared by the whole world belong here.
*/

use std::f32::consts::FRAC_PI_4;

/// Gravity magnitude in meters per second squared (positive value).
/// Applied as a downward acceleration along -Y.
pub const GRAVITY_MPS2: f32 = 9.81;

/// Upper clamp for the per-frame delta time (seconds).
///
/// The frame scheduler already clamps its delta; this is the last line of
/// defense against a huge step destabilizing the solver after a frame hitch.
pub const MAX_FRAME_DT: f32 = 0.125;

/// Default gravity-scale slope per meter of submersion depth.
///
/// A body at depth `d` below sea level (y = 0) gets
/// `gravity_scale = 1 + d * multiplier`. With the default -1.5, two meters of
/// submersion yields a scale of -2: gravity reverses and the body floats up.
pub const DEFAULT_WATER_GRAVITY_MULTIPLIER: f32 = -1.5;

/// Explosion falloff: full strength at or inside this planar radius (meters).
pub const EXPLOSION_FULL_RADIUS: f32 = 1.0;

/// Explosion falloff: zero strength at or beyond this planar radius (meters).
pub const EXPLOSION_ZERO_RADIUS: f32 = 7.0;

/// Explosion impulse gain, multiplied by falloff strength and chassis mass.
pub const EXPLOSION_GAIN: f32 = 4.0;

/// Vortex pull: zero at this distance from the core (meters).
pub const VORTEX_PULL_FAR: f32 = 20.0;

/// Vortex pull: full strength at this distance from the core (meters).
pub const VORTEX_PULL_NEAR: f32 = 2.0;

/// Vortex tangential twist: starts deflecting at this distance (meters).
pub const VORTEX_TWIST_FAR: f32 = 8.0;

/// Vortex tangential twist: reaches the maximum angle at this distance (meters).
pub const VORTEX_TWIST_NEAR: f32 = 2.0;

/// Maximum tangential deflection angle of the vortex pull (radians).
pub const VORTEX_MAX_TWIST: f32 = FRAC_PI_4;

/// Maximum vertical lift factor of the vortex pull at the core.
pub const VORTEX_MAX_LIFT: f32 = 0.5;

/// Fixed gain applied to the per-frame vortex impulse, on top of the
/// field's own strength scalar.
pub const VORTEX_GAIN: f32 = 25.0;

/// Speed hysteresis: `stopped` engages below this absolute speed (m per frame).
pub const STOP_SPEED_LOW: f32 = 0.04;

/// Speed hysteresis: `stopped` releases above this absolute speed (m per frame).
pub const STOP_SPEED_HIGH: f32 = 0.7;

/// Orientation ratio above which the chassis counts as upside-down.
///
/// `ratio = dot(chassis_up, world_down) * 0.5 + 0.5`, so 0 is upright and 1
/// is fully inverted. A single threshold is used for both directions; the
/// speed detector is the one with a two-sided band.
pub const UPSIDE_DOWN_RATIO: f32 = 0.3;

/// Delay between detecting an upside-down chassis and firing the corrective
/// flip (seconds). The flip only fires if the condition still holds.
pub const FLIP_DEBOUNCE_SECONDS: f32 = 1.0;

/// Torque gain applied on top of `flip_force * chassis_mass` when composing
/// the corrective flip torque.
pub const FLIP_TORQUE_GAIN: f32 = 0.35;
