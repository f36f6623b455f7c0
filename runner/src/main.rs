//! Headless demo drive: builds a flat world with a few props, scripts a short
//! run (throttle, boost, a brake, one explosion, one vortex pass) and logs
//! telemetry and vehicle events. Useful for eyeballing tuning changes without
//! a renderer.

use nalgebra::Vector3;
use physics::{
    BodyDef, BodyType, ColliderDef, ColliderShapeDef, PhysicsWorld, Quat, Simulation,
    SurfaceCategory, VehicleController, VehicleInputs, VehicleTuning, Vortex, WheelSettings,
};

type Vec3 = Vector3<f32>;

const DT: f32 = 1.0 / 60.0;

fn floor() -> BodyDef {
    let mut collider = ColliderDef::new(ColliderShapeDef::Cuboid {
        half_extents: Vec3::new(500.0, 0.5, 500.0),
    });
    collider.category = SurfaceCategory::Floor;
    BodyDef::new(BodyType::Fixed, Vec3::new(0.0, -0.5, 0.0), Quat::identity())
        .with_collider(collider)
}

fn crate_prop(position: Vec3) -> BodyDef {
    let mut collider = ColliderDef::new(ColliderShapeDef::Cuboid {
        half_extents: Vec3::new(0.4, 0.4, 0.4),
    });
    collider.mass = Some(2.0);
    BodyDef::new(BodyType::Dynamic, position, Quat::identity()).with_collider(collider)
}

fn chassis() -> BodyDef {
    let mut collider = ColliderDef::new(ColliderShapeDef::Cuboid {
        half_extents: Vec3::new(1.0, 0.3, 0.6),
    });
    collider.mass = Some(30.0);
    collider.center_of_mass = Some(Vec3::new(0.0, -0.15, 0.0));
    BodyDef::new(BodyType::Dynamic, Vec3::new(0.0, 1.0, 0.0), Quat::identity())
        .with_collider(collider)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut world = PhysicsWorld::default();
    world.create_body(&floor())?;

    let wheels = [
        WheelSettings::at(Vec3::new(0.8, -0.2, 0.55)),
        WheelSettings::at(Vec3::new(0.8, -0.2, -0.55)),
        WheelSettings::at(Vec3::new(-0.8, -0.2, 0.55)),
        WheelSettings::at(Vec3::new(-0.8, -0.2, -0.55)),
    ];
    let vehicle = VehicleController::new(&mut world, &chassis(), wheels, VehicleTuning::default())?;
    let mut sim = Simulation::new(world, vehicle);
    log::info!(
        "vehicle ready: {:.1} kg, wheel radius {:.2} m",
        sim.vehicle.mass(&sim.world),
        sim.vehicle.wheel_settings()[0].radius,
    );

    // A couple of props ahead of the start line.
    for x in [8.0, 12.0, 16.0] {
        let id = sim
            .sync
            .add(&mut sim.world, &crate_prop(Vec3::new(x, 0.4, 0.5)), None)?;
        log::info!("prop {id:?} at x = {x}");
    }

    // Scripted 20-second run.
    for frame in 0..1200u32 {
        let t = frame as f32 * DT;

        let inputs = VehicleInputs {
            accelerate: if t < 14.0 { 1.0 } else { 0.0 },
            steer: if (6.0..8.0).contains(&t) { 0.6 } else { 0.0 },
            boost: if (4.0..6.0).contains(&t) { 1.0 } else { 0.0 },
            brake: if t >= 14.0 { 1.0 } else { 0.0 },
            ..VehicleInputs::default()
        };

        if frame == 300 {
            let at = sim.vehicle.telemetry().position + Vec3::new(4.0, 0.0, 0.0);
            log::info!("boom at {at:?}");
            sim.explode(at);
        }
        if frame == 600 {
            let at = sim.vehicle.telemetry().position + Vec3::new(0.0, 0.0, 15.0);
            log::info!("tornado at {at:?}");
            sim.add_vortex(Vortex {
                position: at,
                strength: 10.0,
            });
        }
        if frame == 900 {
            sim.clear_vortices();
        }

        for event in sim.tick(DT, &inputs) {
            log::info!("[{t:6.2}s] event: {event:?}");
        }

        if frame % 60 == 0 {
            let telemetry = sim.vehicle.telemetry();
            log::info!(
                "[{t:6.2}s] pos ({:6.1}, {:4.1}, {:6.1})  speed {:6.3}  contacts {}",
                telemetry.position.x,
                telemetry.position.y,
                telemetry.position.z,
                telemetry.absolute_speed,
                telemetry.wheels.iter().filter(|w| w.in_contact).count(),
            );
        }
    }

    Ok(())
}
