//! Rigid-body and collider descriptions.
//!
//! Game content maps its props to [`BodyDef`]/[`ColliderDef`], then calls
//! [`crate::world::PhysicsWorld::create_body`]. The shape set is a closed
//! enum: an unknown shape is a compile error here, not a silent no-op, and
//! degenerate shape parameters surface as [`BodyCreationError`] at creation
//! time instead of vanishing into the solver.
//!
//! Conventions
//! - Units are meters and kilograms.
//! - Rotations are unit quaternions.
//! - Collider poses are local to their parent body.

use nalgebra::{DMatrix, Point3};
use rapier3d::prelude::*;
use thiserror::Error;

use crate::groups::SurfaceCategory;
use crate::{constants::DEFAULT_WATER_GRAVITY_MULTIPLIER, Iso, Quat, Vec3};

/// Rejected body/collider configurations.
#[derive(Debug, Error)]
pub enum BodyCreationError {
    #[error("body pose contains non-finite values")]
    NonFinitePose,
    #[error("cuboid half-extents must be strictly positive, got {0:?}")]
    DegenerateCuboid(Vec3),
    #[error("cylinder dimensions must be strictly positive, got half_height {half_height}, radius {radius}")]
    DegenerateCylinder { half_height: f32, radius: f32 },
    #[error("trimesh collider rejected: {0}")]
    InvalidTrimesh(String),
    #[error("convex hull computation failed ({points} input points)")]
    HullFailed { points: usize },
    #[error("heightfield needs at least a 2x2 grid, got {rows}x{cols}")]
    HeightfieldTooSmall { rows: usize, cols: usize },
}

/// Is this body driven by the solver or pinned in place?
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum BodyType {
    #[default]
    Dynamic,
    Fixed,
}

/// Collider shapes supported by the world.
#[derive(Clone, Debug)]
pub enum ColliderShapeDef {
    /// Oriented box with given half-extents (meters).
    Cuboid { half_extents: Vec3 },
    /// Y-aligned cylinder (meters).
    Cylinder { half_height: f32, radius: f32 },
    /// Triangle mesh, typically level geometry.
    Trimesh {
        vertices: Vec<Point3<f32>>,
        indices: Vec<[u32; 3]>,
    },
    /// Convex hull of a point cloud.
    Hull { points: Vec<Point3<f32>> },
    /// Heightfield sampled on a regular grid, scaled to `scale` world units.
    Heightfield { heights: DMatrix<f32>, scale: Vec3 },
}

/// One collider attached to a body.
#[derive(Clone, Debug)]
pub struct ColliderDef {
    pub shape: ColliderShapeDef,
    /// Local translation relative to the parent body (meters).
    pub position: Vec3,
    /// Local rotation relative to the parent body.
    pub rotation: Quat,
    /// Override the collider mass (kilograms). `None` keeps the default
    /// density-derived mass.
    pub mass: Option<f32>,
    /// Override the local center of mass. Only meaningful with `mass`.
    pub center_of_mass: Option<Vec3>,
    pub friction: f32,
    pub restitution: f32,
    pub category: SurfaceCategory,
}

impl ColliderDef {
    pub fn new(shape: ColliderShapeDef) -> Self {
        Self {
            shape,
            position: Vec3::zeros(),
            rotation: Quat::identity(),
            mass: None,
            center_of_mass: None,
            friction: 0.5,
            restitution: 0.0,
            category: SurfaceCategory::default(),
        }
    }
}

/// A full body description: pose, type, buoyancy response and colliders.
#[derive(Clone, Debug)]
pub struct BodyDef {
    pub body_type: BodyType,
    pub position: Vec3,
    pub rotation: Quat,
    /// Created asleep. Also re-issued by [`crate::sync::EntitySync::reset`].
    pub sleeping: bool,
    /// Gravity-scale slope per meter of submersion below y = 0.
    pub water_gravity_multiplier: f32,
    pub colliders: Vec<ColliderDef>,
}

impl BodyDef {
    pub fn new(body_type: BodyType, position: Vec3, rotation: Quat) -> Self {
        Self {
            body_type,
            position,
            rotation,
            sleeping: false,
            water_gravity_multiplier: DEFAULT_WATER_GRAVITY_MULTIPLIER,
            colliders: Vec::new(),
        }
    }

    pub fn with_collider(mut self, collider: ColliderDef) -> Self {
        self.colliders.push(collider);
        self
    }
}

/// Pose snapshot captured once at creation, consumed only by reset.
#[derive(Clone, Copy, Debug)]
pub struct InitialState {
    pub position: Vec3,
    pub rotation: Quat,
    pub sleeping: bool,
}

/// A created rigid body, its colliders and its immutable initial state.
#[derive(Clone, Debug)]
pub struct PhysicalBody {
    pub handle: RigidBodyHandle,
    pub colliders: Vec<ColliderHandle>,
    pub body_type: BodyType,
    pub water_gravity_multiplier: f32,
    initial: InitialState,
}

impl PhysicalBody {
    pub(crate) fn new(
        handle: RigidBodyHandle,
        colliders: Vec<ColliderHandle>,
        def: &BodyDef,
    ) -> Self {
        Self {
            handle,
            colliders,
            body_type: def.body_type,
            water_gravity_multiplier: def.water_gravity_multiplier,
            // Captured exactly once, before any simulation step.
            initial: InitialState {
                position: def.position,
                rotation: def.rotation,
                sleeping: def.sleeping,
            },
        }
    }

    /// The creation-time snapshot used by reset.
    #[inline]
    pub fn initial(&self) -> &InitialState {
        &self.initial
    }
}

/// True if the point cloud spans a non-degenerate volume. `convex_hull`
/// happily builds flat hulls from coplanar clouds, so volume is checked
/// explicitly before handing the points over.
fn spans_volume(points: &[Point3<f32>]) -> bool {
    let Some((origin, rest)) = points.split_first() else {
        return false;
    };
    let mut u: Option<Vec3> = None;
    let mut v: Option<Vec3> = None;
    for point in rest {
        let d = point - origin;
        match (u, v) {
            (None, _) => {
                if d.norm_squared() > 1.0e-12 {
                    u = Some(d);
                }
            }
            (Some(a), None) => {
                if a.cross(&d).norm_squared() > 1.0e-12 {
                    v = Some(d);
                }
            }
            (Some(a), Some(b)) => {
                if a.cross(&b).dot(&d).abs() > 1.0e-9 {
                    return true;
                }
            }
        }
    }
    false
}

/// Build the rapier shape for a collider definition, validating parameters.
fn shared_shape(shape: &ColliderShapeDef) -> Result<SharedShape, BodyCreationError> {
    match shape {
        ColliderShapeDef::Cuboid { half_extents } => {
            if !(half_extents.x > 0.0 && half_extents.y > 0.0 && half_extents.z > 0.0) {
                return Err(BodyCreationError::DegenerateCuboid(*half_extents));
            }
            Ok(SharedShape::cuboid(
                half_extents.x,
                half_extents.y,
                half_extents.z,
            ))
        }
        ColliderShapeDef::Cylinder {
            half_height,
            radius,
        } => {
            if !(*half_height > 0.0 && *radius > 0.0) {
                return Err(BodyCreationError::DegenerateCylinder {
                    half_height: *half_height,
                    radius: *radius,
                });
            }
            Ok(SharedShape::cylinder(*half_height, *radius))
        }
        ColliderShapeDef::Trimesh { vertices, indices } => {
            SharedShape::trimesh(vertices.clone(), indices.clone())
                .map_err(|e| BodyCreationError::InvalidTrimesh(e.to_string()))
        }
        ColliderShapeDef::Hull { points } => {
            if !spans_volume(points) {
                return Err(BodyCreationError::HullFailed {
                    points: points.len(),
                });
            }
            SharedShape::convex_hull(points).ok_or(BodyCreationError::HullFailed {
                points: points.len(),
            })
        }
        ColliderShapeDef::Heightfield { heights, scale } => {
            if heights.nrows() < 2 || heights.ncols() < 2 {
                return Err(BodyCreationError::HeightfieldTooSmall {
                    rows: heights.nrows(),
                    cols: heights.ncols(),
                });
            }
            Ok(SharedShape::heightfield(heights.clone(), *scale))
        }
    }
}

/// Build a rapier collider from a [`ColliderDef`].
///
/// The returned collider carries the local pose; the caller attaches it to
/// its parent body.
pub fn collider_from_def(def: &ColliderDef) -> Result<Collider, BodyCreationError> {
    let shape = shared_shape(&def.shape)?;

    let mut builder = ColliderBuilder::new(shape.clone())
        .position(Iso::from_parts(def.position.into(), def.rotation))
        .friction(def.friction)
        .restitution(def.restitution)
        .collision_groups(def.category.interaction_groups());

    builder = match (def.mass, def.center_of_mass) {
        (Some(mass), Some(com)) => {
            // Keep the shape's inertia profile, rescaled to the target mass,
            // but relocate the center of mass.
            let base = shape.mass_properties(1.0);
            let scale = if base.mass() > 0.0 {
                mass / base.mass()
            } else {
                0.0
            };
            builder.mass_properties(MassProperties::new(
                Point3::from(com),
                mass,
                base.principal_inertia() * scale,
            ))
        }
        (Some(mass), None) => builder.mass(mass),
        (None, _) => builder,
    };

    Ok(builder.build())
}
