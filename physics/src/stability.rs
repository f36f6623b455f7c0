//! Stability detection and upside-down recovery.
//!
//! Two independent edge-triggered hysteresis detectors consume the chassis
//! telemetry once per frame, after the world step:
//! - speed: `stopped` engages below a low threshold and releases above a
//!   high one, with a dead band between so the flag cannot oscillate;
//! - orientation: a single threshold on the up-vector alignment ratio for
//!   both directions. The asymmetry with the speed detector is intentional
//!   and pinned by a test below.
//!
//! A debounce timer arms on the upside-down transition; if the condition
//! still holds when it fires, a corrective flip is produced: a vertical
//! impulse plus a torque whose axis depends on whether the chassis is flat
//! on its roof or lying on its side. A naive constant-torque recovery fails
//! for one of those two geometries.

use crate::constants::{
    FLIP_DEBOUNCE_SECONDS, FLIP_TORQUE_GAIN, STOP_SPEED_HIGH, STOP_SPEED_LOW, UPSIDE_DOWN_RATIO,
};
use crate::{Quat, Vec3};

/// Edge-triggered state transitions, at most one per crossing.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum VehicleEvent {
    Stopped,
    Started,
    UpsideDown,
    RightSideUp,
}

/// Per-frame snapshot consumed by the detectors.
#[derive(Copy, Clone, Debug)]
pub struct StabilitySample {
    pub absolute_speed: f32,
    pub rotation: Quat,
    pub chassis_mass: f32,
}

/// Corrective impulses to apply to the chassis, in world space.
#[derive(Copy, Clone, Debug)]
pub struct FlipImpulse {
    pub impulse: Vec3,
    pub torque: Vec3,
}

pub struct StabilityRecovery {
    stopped: bool,
    upside_down: bool,
    /// Seconds remaining until the armed flip fires.
    flip_timer: Option<f32>,
    /// Global time rate; scales the debounce duration.
    time_rate: f32,
    /// Vertical recovery impulse per kilogram of chassis mass.
    flip_force: f32,
    events: Vec<VehicleEvent>,
}

impl StabilityRecovery {
    /// Vehicles spawn at rest and upright.
    pub fn new(flip_force: f32) -> Self {
        Self {
            stopped: true,
            upside_down: false,
            flip_timer: None,
            time_rate: 1.0,
            flip_force,
            events: Vec::new(),
        }
    }

    #[inline]
    pub fn stopped(&self) -> bool {
        self.stopped
    }

    #[inline]
    pub fn upside_down(&self) -> bool {
        self.upside_down
    }

    pub fn set_time_rate(&mut self, rate: f32) {
        self.time_rate = rate.max(0.0);
    }

    /// Void a pending recovery, e.g. when the vehicle leaves its
    /// controllable state before the debounce fires.
    pub fn interrupt(&mut self) {
        self.flip_timer = None;
    }

    /// Take the events accumulated since the last drain.
    pub fn take_events(&mut self) -> Vec<VehicleEvent> {
        std::mem::take(&mut self.events)
    }

    /// Run both detectors and tick the debounce timer.
    ///
    /// Returns the corrective flip to apply when the debounce fires with the
    /// chassis still upside-down. Runs once per frame, post-step.
    pub fn test(&mut self, sample: &StabilitySample, dt: f32) -> Option<FlipImpulse> {
        self.test_speed(sample.absolute_speed);
        self.test_orientation(&sample.rotation);

        match self.flip_timer.take() {
            Some(remaining) => {
                let remaining = remaining - dt;
                if remaining > 0.0 {
                    self.flip_timer = Some(remaining);
                    None
                } else if self.upside_down {
                    log::debug!("flip debounce expired while upside-down, recovering");
                    Some(flip_impulse(
                        &sample.rotation,
                        sample.chassis_mass,
                        self.flip_force,
                    ))
                } else {
                    None
                }
            }
            None => None,
        }
    }

    /// Manual recovery trigger, bypassing detection and debounce.
    pub fn flip(&self, rotation: &Quat, chassis_mass: f32) -> FlipImpulse {
        flip_impulse(rotation, chassis_mass, self.flip_force)
    }

    fn test_speed(&mut self, absolute_speed: f32) {
        if !self.stopped && absolute_speed < STOP_SPEED_LOW {
            self.stopped = true;
            self.events.push(VehicleEvent::Stopped);
        } else if self.stopped && absolute_speed > STOP_SPEED_HIGH {
            self.stopped = false;
            self.events.push(VehicleEvent::Started);
        }
    }

    fn test_orientation(&mut self, rotation: &Quat) {
        // 0 = upright, 1 = fully inverted.
        let chassis_up = rotation * Vec3::y();
        let ratio = chassis_up.dot(&-Vec3::y()) * 0.5 + 0.5;

        let upside_down = ratio > UPSIDE_DOWN_RATIO;
        if upside_down == self.upside_down {
            return;
        }
        self.upside_down = upside_down;
        if upside_down {
            self.events.push(VehicleEvent::UpsideDown);
            // Re-arm (not extend) on every fresh transition.
            self.flip_timer = Some(FLIP_DEBOUNCE_SECONDS * self.time_rate);
        } else {
            self.events.push(VehicleEvent::RightSideUp);
            self.flip_timer = None;
        }
    }
}

/// Compose the corrective flip for the given chassis orientation.
///
/// The vertical impulse is unconditional. The torque axis depends on which
/// chassis axis points along world up: if the chassis up axis dominates the
/// body is flat on its roof and a roll about local X suffices; otherwise the
/// body lies on its side and the torque is composed from the side and
/// forward alignment terms. The local torque is rotated into the chassis
/// orientation before application.
fn flip_impulse(rotation: &Quat, chassis_mass: f32, flip_force: f32) -> FlipImpulse {
    let world_up = Vec3::y();
    let side = world_up.dot(&(rotation * Vec3::z()));
    let forward = world_up.dot(&(rotation * Vec3::x()));
    let up = world_up.dot(&(rotation * Vec3::y()));

    let magnitude = flip_force * chassis_mass * FLIP_TORQUE_GAIN;
    let local_torque = if up.abs() >= side.abs() && up.abs() >= forward.abs() {
        // Flat on the roof: neither lateral axis gives a useful sign.
        Vec3::x() * magnitude
    } else {
        // On its side: roll toward whichever lateral axis points up.
        Vec3::new(side * magnitude, 0.0, -forward * magnitude)
    };

    FlipImpulse {
        impulse: world_up * flip_force * chassis_mass,
        torque: rotation * local_torque,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(absolute_speed: f32, rotation: Quat) -> StabilitySample {
        StabilitySample {
            absolute_speed,
            rotation,
            chassis_mass: 30.0,
        }
    }

    fn upright() -> Quat {
        Quat::identity()
    }

    fn inverted() -> Quat {
        Quat::from_axis_angle(&Vec3::x_axis(), std::f32::consts::PI)
    }

    #[test]
    fn rest_emits_no_events_and_start_fires_once_above_high_threshold() {
        let mut recovery = StabilityRecovery::new(6.0);
        let dt = 1.0 / 60.0;

        // At rest: already stopped, nothing to report.
        recovery.test(&sample(0.0, upright()), dt);
        assert!(recovery.stopped());
        assert!(recovery.take_events().is_empty());

        // Accelerating through the dead band emits nothing.
        for speed in [0.1, 0.3, 0.5, 0.69] {
            recovery.test(&sample(speed, upright()), dt);
        }
        assert!(recovery.take_events().is_empty());

        // Crossing the high threshold emits exactly one Started.
        recovery.test(&sample(1.0, upright()), dt);
        recovery.test(&sample(1.2, upright()), dt);
        assert_eq!(recovery.take_events(), vec![VehicleEvent::Started]);
    }

    #[test]
    fn speed_dead_band_prevents_event_oscillation() {
        let mut recovery = StabilityRecovery::new(6.0);
        let dt = 1.0 / 60.0;
        recovery.test(&sample(1.0, upright()), dt);
        recovery.take_events();

        // Oscillating inside (low, high) never toggles the flag.
        for _ in 0..10 {
            recovery.test(&sample(0.05, upright()), dt);
            recovery.test(&sample(0.6, upright()), dt);
        }
        assert!(recovery.take_events().is_empty());

        // Dropping below low emits exactly one Stopped.
        recovery.test(&sample(0.01, upright()), dt);
        assert_eq!(recovery.take_events(), vec![VehicleEvent::Stopped]);
    }

    #[test]
    fn orientation_uses_a_single_threshold_both_ways() {
        // Unlike the speed detector there is no release band: every crossing
        // of the one threshold emits an event. This pins the intentional
        // asymmetry between the two detectors.
        let mut recovery = StabilityRecovery::new(6.0);
        let dt = 1.0 / 60.0;

        // ratio = sin(tilt/2)^2 along any horizontal axis; 1.2 rad tilt is
        // past the 0.3 ratio threshold, 1.0 rad is below it.
        let above = Quat::from_axis_angle(&Vec3::x_axis(), 1.2);
        let below = Quat::from_axis_angle(&Vec3::x_axis(), 1.0);

        for _ in 0..3 {
            recovery.test(&sample(0.0, above), dt);
            recovery.test(&sample(0.0, below), dt);
        }
        let events = recovery.take_events();
        assert_eq!(events.len(), 6);
        assert_eq!(events[0], VehicleEvent::UpsideDown);
        assert_eq!(events[1], VehicleEvent::RightSideUp);
    }

    #[test]
    fn flip_fires_once_after_debounce_while_held() {
        let mut recovery = StabilityRecovery::new(6.0);
        let dt = 0.1;
        let mut flips = 0;

        // Held inverted for 2 simulated seconds.
        for _ in 0..20 {
            if recovery.test(&sample(0.0, inverted()), dt).is_some() {
                flips += 1;
            }
        }
        assert_eq!(flips, 1);
        assert!(recovery.upside_down());
    }

    #[test]
    fn releasing_before_debounce_expiry_applies_nothing() {
        let mut recovery = StabilityRecovery::new(6.0);
        let dt = 0.1;

        // Half the debounce inverted, then upright again.
        for _ in 0..5 {
            assert!(recovery.test(&sample(0.0, inverted()), dt).is_none());
        }
        for _ in 0..20 {
            assert!(recovery.test(&sample(0.0, upright()), dt).is_none());
        }
        assert!(!recovery.upside_down());
    }

    #[test]
    fn flip_impulse_is_vertical_and_mass_scaled() {
        let recovery = StabilityRecovery::new(6.0);
        let flip = recovery.flip(&inverted(), 30.0);
        assert!((flip.impulse - Vec3::new(0.0, 6.0 * 30.0, 0.0)).norm() < 1.0e-4);
        // Flat on the roof: the torque reduces to a roll about local X.
        assert!(flip.torque.norm() > 0.0);
    }

    #[test]
    fn on_side_torque_differs_from_on_roof_torque() {
        // Lying on the side (local Z up) must not produce the same fixed
        // roll axis as lying flat on the roof.
        let on_side = Quat::from_axis_angle(&Vec3::x_axis(), std::f32::consts::FRAC_PI_2);
        let roof = flip_impulse(&inverted(), 30.0, 6.0);
        let side = flip_impulse(&on_side, 30.0, 6.0);
        assert!((roof.torque.normalize() - side.torque.normalize()).norm() > 0.1);
    }
}
