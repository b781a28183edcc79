use log::trace;
use nalgebra::{Isometry3, Point3, UnitQuaternion, UnitVector3, Vector3};

use super::super::locomotion::{CapsuleProfile, LocomotionHost};
use super::super::physics::PhysicsWorld;

/// One character's view of the physics world, as seen by its locomotion.
/// Queries exclude the character's own body; moves and rotations are
/// scheduled on its kinematic body and committed by the next physics step.
pub struct CharacterHost<'a> {
    physics: &'a mut PhysicsWorld,
    character_id: u32,
}

impl<'a> CharacterHost<'a> {
    /// Returns `None` when the physics world has no such character.
    pub fn new(physics: &'a mut PhysicsWorld, character_id: u32) -> Option<Self> {
        physics.character(character_id)?;
        Some(Self {
            physics,
            character_id,
        })
    }

    fn body_handle(&self) -> Option<rapier3d::prelude::RigidBodyHandle> {
        self.physics
            .character(self.character_id)
            .map(|character| character.body_handle)
    }
}

impl LocomotionHost for CharacterHost<'_> {
    fn cast_ray(
        &self,
        origin: &Point3<f32>,
        direction: &UnitVector3<f32>,
        max_distance: f32,
    ) -> Option<f32> {
        self.physics
            .cast_ray(origin, direction, max_distance, self.body_handle())
    }

    fn cast_capsule(
        &self,
        pose: &Isometry3<f32>,
        capsule: &CapsuleProfile,
        direction: &UnitVector3<f32>,
        max_distance: f32,
    ) -> Option<f32> {
        self.physics
            .cast_capsule(pose, capsule, direction, max_distance, self.body_handle())
    }

    fn move_actor_by(
        &mut self,
        pose: &Isometry3<f32>,
        displacement: &Vector3<f32>,
        up: &UnitVector3<f32>,
        dt: f32,
    ) -> Vector3<f32> {
        match self
            .physics
            .move_character(self.character_id, pose, displacement, up, dt)
        {
            Some(movement) => {
                trace!(
                    "Character {} desired {:?} applied {:?} (controller grounded: {})",
                    self.character_id,
                    displacement,
                    movement.translation,
                    movement.grounded
                );
                movement.translation
            }
            None => Vector3::zeros(),
        }
    }

    fn set_actor_rotation(&mut self, rotation: &UnitQuaternion<f32>) {
        self.physics.set_character_rotation(self.character_id, rotation);
    }

    fn set_camera_pivot_local_rotation(&mut self, rotation: &UnitQuaternion<f32>) {
        self.physics.set_camera_pivot(self.character_id, rotation);
    }
}
