//! External force-field appliers: point explosions and vortex fields.
//!
//! Both compute a world-space impulse for the chassis from a distance-based
//! falloff. An explosion is fire-and-forget and must never mutate the solver
//! mid-frame, so it parks its impulse in a single-slot pending queue drained
//! at the start of the next pre-physics phase. A vortex is continuous: it is
//! sampled every frame while active.

use crate::constants::{
    EXPLOSION_FULL_RADIUS, EXPLOSION_GAIN, EXPLOSION_ZERO_RADIUS, VORTEX_GAIN, VORTEX_MAX_LIFT,
    VORTEX_MAX_TWIST, VORTEX_PULL_FAR, VORTEX_PULL_NEAR, VORTEX_TWIST_FAR, VORTEX_TWIST_NEAR,
};
use crate::{Quat, Vec3};

/// Linear remap of `x` from `[in_a, in_b]` to `[out_a, out_b]`, clamped to
/// the output range. Reversed input ranges are supported, which is how the
/// "stronger near the core" falloffs are written. A degenerate input range
/// (`in_a == in_b`) acts as a step at the shared endpoint.
#[inline]
pub fn remap_clamp(x: f32, in_a: f32, in_b: f32, out_a: f32, out_b: f32) -> f32 {
    if in_a == in_b {
        return if x < in_b { out_a } else { out_b };
    }
    let t = ((x - in_a) / (in_b - in_a)).clamp(0.0, 1.0);
    out_a + (out_b - out_a) * t
}

/// An instantaneous point explosion.
#[derive(Copy, Clone, Debug)]
pub struct Explosion {
    pub position: Vec3,
}

impl Explosion {
    /// Impulse for a chassis at `chassis_position` with mass `chassis_mass`.
    ///
    /// Falloff is linear over the planar distance: full strength inside
    /// radius 1, zero beyond radius 7. The push is horizontal, away from the
    /// blast, with the vertical component forced to 1 so bodies always pop
    /// partially upward. Returns `None` outside the blast radius.
    pub fn impulse(&self, chassis_position: Vec3, chassis_mass: f32) -> Option<Vec3> {
        let planar = Vec3::new(
            chassis_position.x - self.position.x,
            0.0,
            chassis_position.z - self.position.z,
        );
        let distance = planar.norm();
        let strength = remap_clamp(
            distance,
            EXPLOSION_FULL_RADIUS,
            EXPLOSION_ZERO_RADIUS,
            1.0,
            0.0,
        );
        if strength <= 0.0 {
            return None;
        }

        let mut direction = planar.try_normalize(1.0e-9).unwrap_or_default();
        direction.y = 1.0;
        Some(direction * strength * chassis_mass * EXPLOSION_GAIN)
    }
}

/// A moving vortex field, sampled every frame while active.
#[derive(Copy, Clone, Debug)]
pub struct Vortex {
    pub position: Vec3,
    pub strength: f32,
}

impl Vortex {
    /// Per-frame impulse for a chassis at `chassis_position`.
    ///
    /// The pull ramps from zero at 20 m to full at 2 m. Close to the core
    /// the pull direction is rotated about world up by up to pi/4, producing
    /// an orbital deflection instead of a straight radial drag, and a
    /// vertical lift term ramps on the same proximity curve.
    pub fn impulse(&self, chassis_position: Vec3, dt: f32) -> Option<Vec3> {
        let to_field = self.position - chassis_position;
        let distance = to_field.norm();

        let pull = remap_clamp(distance, VORTEX_PULL_FAR, VORTEX_PULL_NEAR, 0.0, 1.0);
        if pull <= 0.0 {
            return None;
        }

        let planar = Vec3::new(to_field.x, 0.0, to_field.z);
        let radial = planar.try_normalize(1.0e-9).unwrap_or_default();

        let twist = remap_clamp(
            distance,
            VORTEX_TWIST_FAR,
            VORTEX_TWIST_NEAR,
            0.0,
            VORTEX_MAX_TWIST,
        );
        let lift = remap_clamp(
            distance,
            VORTEX_TWIST_FAR,
            VORTEX_TWIST_NEAR,
            0.0,
            VORTEX_MAX_LIFT,
        );

        let mut direction = Quat::from_axis_angle(&Vec3::y_axis(), twist) * radial;
        direction.y = lift;

        Some(direction * pull * dt * self.strength * VORTEX_GAIN)
    }
}

/// Single-slot queue for the deferred explosion impulse.
///
/// Event handlers may fire mid-frame; the world is exclusively owned by the
/// frame loop, so the impulse waits here until the next pre-physics phase.
/// A second explosion in the same frame replaces the pending impulse.
#[derive(Debug, Default)]
pub struct PendingImpulse {
    slot: Option<Vec3>,
}

impl PendingImpulse {
    pub fn push(&mut self, impulse: Vec3) {
        if self.slot.is_some() {
            log::debug!("pending impulse replaced before it was drained");
        }
        self.slot = Some(impulse);
    }

    /// Drained once per frame, at the start of pre-physics.
    pub fn drain(&mut self) -> Option<Vec3> {
        self.slot.take()
    }
}
