//! Bridges physical bodies to their externally-owned visual transforms.
//!
//! Visuals are reached through the [`PoseTarget`] observer trait so this
//! module never owns or understands scene nodes. Sleeping bodies are skipped
//! during the per-frame sync: they do not move, so skipping is safe by
//! construction and purely a performance concern.

use rapier3d::prelude::RigidBodyHandle;

use crate::body::{BodyDef, BodyType, PhysicalBody};
use crate::world::PhysicsWorld;
use crate::{BodyCreationError, Iso, Quat, Vec3};

/// Externally-owned visual transform written to by the sync.
pub trait PoseTarget {
    fn set_pose(&mut self, translation: Vec3, rotation: Quat);
}

/// Index of a tracked entity, stable for the lifetime of the world.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct EntityId(u32);

struct Entry {
    body: PhysicalBody,
    visual: Option<Box<dyn PoseTarget>>,
}

#[derive(Default)]
pub struct EntitySync {
    entries: Vec<Entry>,
    /// Sleep flags to re-issue one frame after a reset, so the solver has
    /// settled after the velocity reset before the body goes back to sleep.
    pending_sleep: Vec<RigidBodyHandle>,
}

impl EntitySync {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a body from `def` and track it, optionally attached to a
    /// visual transform. Sleeping or fixed bodies are synced immediately and
    /// exactly once; awake dynamic bodies are synced every frame.
    pub fn add(
        &mut self,
        world: &mut PhysicsWorld,
        def: &BodyDef,
        visual: Option<Box<dyn PoseTarget>>,
    ) -> Result<EntityId, BodyCreationError> {
        let body = world.create_body(def)?;
        let mut entry = Entry { body, visual };

        if (def.sleeping || def.body_type == BodyType::Fixed)
            && let Some(visual) = entry.visual.as_mut()
        {
            visual.set_pose(def.position, def.rotation);
        }

        let id = EntityId(self.entries.len() as u32);
        self.entries.push(entry);
        Ok(id)
    }

    #[inline]
    pub fn body(&self, id: EntityId) -> Option<&PhysicalBody> {
        self.entries.get(id.0 as usize).map(|e| &e.body)
    }

    /// Copy translation/rotation from every awake body to its visual.
    /// Runs once per frame, after the world step. The sleep flags deferred
    /// by [`Self::reset`] are re-issued after the sync loop, so a reset body
    /// pushes its restored pose to the visual before it goes back to sleep.
    pub fn update(&mut self, world: &mut PhysicsWorld) {
        for entry in &mut self.entries {
            let Some(visual) = entry.visual.as_mut() else {
                continue;
            };
            let Some(body) = world.body(entry.body.handle) else {
                continue;
            };
            // Fixed bodies got their one sync at creation; sleeping bodies
            // do not move.
            if !body.is_dynamic() || body.is_sleeping() {
                continue;
            }
            visual.set_pose(*body.translation(), *body.rotation());
        }

        for handle in self.pending_sleep.drain(..) {
            if let Some(body) = world.body_mut(handle) {
                body.sleep();
            }
        }
    }

    /// Re-apply the initial state captured at creation: position, rotation
    /// and zero velocities. Fixed bodies never moved, so only dynamic bodies
    /// are touched. The original sleep flag is re-issued one frame later.
    pub fn reset(&mut self, id: EntityId, world: &mut PhysicsWorld) {
        let Some(entry) = self.entries.get(id.0 as usize) else {
            log::warn!("reset for unknown entity {id:?}");
            return;
        };
        if entry.body.body_type != BodyType::Dynamic {
            return;
        }

        let initial = *entry.body.initial();
        if let Some(body) = world.body_mut(entry.body.handle) {
            body.set_linvel(Vec3::zeros(), false);
            body.set_angvel(Vec3::zeros(), false);
            body.set_position(Iso::from_parts(initial.position.into(), initial.rotation), true);
        }
        if initial.sleeping {
            self.pending_sleep.push(entry.body.handle);
        }
    }
}
