use nalgebra::{Isometry3, Point3, Translation3, UnitQuaternion, UnitVector3, Vector3};
use rapier3d::control::{
    CharacterAutostep, CharacterLength, EffectiveCharacterMovement, KinematicCharacterController,
};
use rapier3d::parry::query::ShapeCastOptions;
use rapier3d::parry::shape::Capsule;
use rapier3d::prelude::*;
use std::collections::{HashMap, HashSet};

use super::constants::gameplay as gameplay_consts;
use super::constants::physics as consts;
use super::locomotion::CapsuleProfile;
use super::surface_motion::upright_target;

// Characters don't collide with each other, only with static geometry.
// Triggers are only ever found by shape queries from a character.
// Note: rapier3d uses InteractionGroups (not CollisionGroups like bevy_rapier)
const GROUP_STATIC: Group = Group::GROUP_1; // Planet, boulders, ores, NPC bodies
const GROUP_CHARACTER: Group = Group::GROUP_2; // Player characters
const GROUP_TRIGGER: Group = Group::GROUP_3; // NPC interaction volumes

/// What a collider belongs to in the game world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BodyTag {
    Planet,
    Boulder(u32),
    Ore(u32),
    Npc(u32),
    NpcTrigger(u32),
    Character(u32),
}

/// Rotation whose local +Y matches `up`.
pub fn surface_rotation(up: &UnitVector3<f32>) -> UnitQuaternion<f32> {
    upright_target(&UnitQuaternion::identity(), up)
}

/// Physics-side record of a character body.
pub struct CharacterBody {
    pub collider_handle: ColliderHandle,
    pub body_handle: RigidBodyHandle,
    pub capsule: CapsuleProfile,
    /// Local rotation of the camera pivot, owned by the locomotion look step
    pub camera_pivot: UnitQuaternion<f32>,
}

/// Wrapper around Rapier3D for the planet world.
/// Everything except characters is fixed; gravity is applied by locomotion, not by rapier.
pub struct PhysicsWorld {
    pub gravity: Vector<Real>,
    pub rigid_body_set: RigidBodySet,
    pub collider_set: ColliderSet,
    pub integration_parameters: IntegrationParameters,
    pub physics_pipeline: PhysicsPipeline,
    pub island_manager: IslandManager,
    pub broad_phase: DefaultBroadPhase,
    pub narrow_phase: NarrowPhase,
    pub impulse_joint_set: ImpulseJointSet,
    pub multibody_joint_set: MultibodyJointSet,
    pub ccd_solver: CCDSolver,
    pub query_pipeline: QueryPipeline,

    /// Collider owner lookup (for trigger detection)
    pub collider_tags: HashMap<ColliderHandle, BodyTag>,
    pub planet_handle: Option<RigidBodyHandle>,
    pub ore_bodies: HashMap<u32, RigidBodyHandle>,
    pub npc_bodies: HashMap<u32, RigidBodyHandle>,
    pub characters: HashMap<u32, CharacterBody>,
}

fn static_groups() -> InteractionGroups {
    InteractionGroups::new(GROUP_STATIC, Group::ALL)
}

/// Filter for character queries: solid static geometry only, never the character itself.
fn character_query_filter(exclude_body: Option<RigidBodyHandle>) -> QueryFilter<'static> {
    let filter = QueryFilter::default()
        .exclude_sensors()
        .groups(InteractionGroups::new(GROUP_CHARACTER, GROUP_STATIC));
    match exclude_body {
        Some(handle) => filter.exclude_rigid_body(handle),
        None => filter,
    }
}

fn pose(position: &Point3<f32>, rotation: &UnitQuaternion<f32>) -> Isometry3<f32> {
    Isometry3::from_parts(Translation3::from(position.coords), *rotation)
}

impl PhysicsWorld {
    pub fn new() -> Self {
        Self {
            gravity: Vector::zeros(),
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            integration_parameters: IntegrationParameters::default(),
            physics_pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            collider_tags: HashMap::new(),
            planet_handle: None,
            ore_bodies: HashMap::new(),
            npc_bodies: HashMap::new(),
            characters: HashMap::new(),
        }
    }

    /// Steps the physics simulation forward by dt seconds.
    /// Commits scheduled kinematic moves and refreshes the query pipeline.
    pub fn step(&mut self, dt: f32) {
        self.integration_parameters.dt = dt;
        self.physics_pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &(),
            &(),
        );
    }

    pub fn update_query_pipeline(&mut self) {
        self.query_pipeline.update(&self.collider_set);
    }

    fn insert_fixed(
        &mut self,
        position: Isometry3<f32>,
        collider: Collider,
        tag: BodyTag,
    ) -> (RigidBodyHandle, ColliderHandle) {
        let body = RigidBodyBuilder::fixed().position(position).build();
        let handle = self.rigid_body_set.insert(body);
        let collider_handle = self
            .collider_set
            .insert_with_parent(collider, handle, &mut self.rigid_body_set);
        self.collider_tags.insert(collider_handle, tag);
        (handle, collider_handle)
    }

    fn remove_body(&mut self, handle: RigidBodyHandle) {
        if let Some(body) = self.rigid_body_set.get(handle) {
            for ch in body.colliders() {
                self.collider_tags.remove(ch);
            }
        }
        self.rigid_body_set.remove(
            handle,
            &mut self.island_manager,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            true,
        );
    }

    /// Adds the planet: a fixed solid ball.
    pub fn add_planet(&mut self, center: Point3<f32>, radius: f32) -> RigidBodyHandle {
        let collider = ColliderBuilder::ball(radius)
            .collision_groups(static_groups())
            .build();
        let (handle, _) = self.insert_fixed(
            pose(&center, &UnitQuaternion::identity()),
            collider,
            BodyTag::Planet,
        );
        self.planet_handle = Some(handle);
        handle
    }

    /// Adds a fixed box, e.g. a boulder resting on the surface.
    pub fn add_boulder(
        &mut self,
        id: u32,
        position: Point3<f32>,
        rotation: UnitQuaternion<f32>,
        half_extents: [f32; 3],
    ) -> RigidBodyHandle {
        let [hx, hy, hz] = half_extents;
        let collider = ColliderBuilder::cuboid(hx, hy, hz)
            .collision_groups(static_groups())
            .build();
        self.insert_fixed(pose(&position, &rotation), collider, BodyTag::Boulder(id))
            .0
    }

    pub fn add_ore(&mut self, id: u32, position: Point3<f32>, rotation: UnitQuaternion<f32>) -> RigidBodyHandle {
        let [hx, hy, hz] = gameplay_consts::ORE_HALF_EXTENTS;
        let collider = ColliderBuilder::cuboid(hx, hy, hz)
            .collision_groups(static_groups())
            .build();
        let (handle, _) = self.insert_fixed(pose(&position, &rotation), collider, BodyTag::Ore(id));
        self.ore_bodies.insert(id, handle);
        handle
    }

    /// Removes a mined ore from the world.
    pub fn remove_ore(&mut self, id: u32) -> bool {
        match self.ore_bodies.remove(&id) {
            Some(handle) => {
                self.remove_body(handle);
                true
            }
            None => false,
        }
    }

    pub fn has_ore(&self, id: u32) -> bool {
        self.ore_bodies.contains_key(&id)
    }

    /// Adds an NPC: a solid box plus a sensor ball used as its interaction trigger.
    pub fn add_npc(
        &mut self,
        id: u32,
        position: Point3<f32>,
        rotation: UnitQuaternion<f32>,
        trigger_radius: f32,
    ) -> RigidBodyHandle {
        let [hx, hy, hz] = gameplay_consts::NPC_HALF_EXTENTS;
        let collider = ColliderBuilder::cuboid(hx, hy, hz)
            .collision_groups(static_groups())
            .build();
        let (handle, _) = self.insert_fixed(pose(&position, &rotation), collider, BodyTag::Npc(id));

        let trigger = ColliderBuilder::ball(trigger_radius)
            .sensor(true)
            .collision_groups(InteractionGroups::new(GROUP_TRIGGER, GROUP_CHARACTER))
            .build();
        let trigger_handle = self
            .collider_set
            .insert_with_parent(trigger, handle, &mut self.rigid_body_set);
        self.collider_tags.insert(trigger_handle, BodyTag::NpcTrigger(id));
        self.npc_bodies.insert(id, handle);
        handle
    }

    /// Adds a kinematic capsule character.
    /// Characters only collide with static geometry, not other characters.
    pub fn add_character(
        &mut self,
        id: u32,
        position: Point3<f32>,
        rotation: UnitQuaternion<f32>,
        capsule: CapsuleProfile,
    ) -> RigidBodyHandle {
        let body = RigidBodyBuilder::kinematic_position_based()
            .position(pose(&position, &rotation))
            .build();
        let body_handle = self.rigid_body_set.insert(body);

        let collider = ColliderBuilder::capsule_y(capsule.half_segment(), capsule.radius)
            .collision_groups(InteractionGroups::new(GROUP_CHARACTER, GROUP_STATIC))
            .build();
        let collider_handle = self
            .collider_set
            .insert_with_parent(collider, body_handle, &mut self.rigid_body_set);
        self.collider_tags.insert(collider_handle, BodyTag::Character(id));

        self.characters.insert(
            id,
            CharacterBody {
                collider_handle,
                body_handle,
                capsule,
                camera_pivot: UnitQuaternion::identity(),
            },
        );
        body_handle
    }

    pub fn character(&self, id: u32) -> Option<&CharacterBody> {
        self.characters.get(&id)
    }

    pub fn character_position(&self, id: u32) -> Option<Point3<f32>> {
        let character = self.characters.get(&id)?;
        let body = self.rigid_body_set.get(character.body_handle)?;
        Some(Point3::from(*body.translation()))
    }

    pub fn character_rotation(&self, id: u32) -> Option<UnitQuaternion<f32>> {
        let character = self.characters.get(&id)?;
        let body = self.rigid_body_set.get(character.body_handle)?;
        Some(*body.rotation())
    }

    /// Teleports a character, bypassing collision.
    pub fn set_character_position(&mut self, id: u32, position: Point3<f32>) {
        let Some(character) = self.characters.get(&id) else {
            return;
        };
        if let Some(body) = self.rigid_body_set.get_mut(character.body_handle) {
            body.set_translation(position.coords, true);
            body.set_next_kinematic_translation(position.coords);
        }
    }

    /// Schedules the character's rotation for the next physics step.
    pub fn set_character_rotation(&mut self, id: u32, rotation: &UnitQuaternion<f32>) {
        let Some(character) = self.characters.get(&id) else {
            return;
        };
        if let Some(body) = self.rigid_body_set.get_mut(character.body_handle) {
            body.set_next_kinematic_rotation(*rotation);
        }
    }

    pub fn set_camera_pivot(&mut self, id: u32, rotation: &UnitQuaternion<f32>) {
        if let Some(character) = self.characters.get_mut(&id) {
            character.camera_pivot = *rotation;
        }
    }

    /// Casts a ray against solid static geometry.
    /// Returns the distance to the first hit within `max_distance`.
    pub fn cast_ray(
        &self,
        origin: &Point3<f32>,
        direction: &UnitVector3<f32>,
        max_distance: f32,
        exclude_body: Option<RigidBodyHandle>,
    ) -> Option<f32> {
        let ray = Ray::new(*origin, direction.into_inner());
        self.query_pipeline
            .cast_ray(
                &self.rigid_body_set,
                &self.collider_set,
                &ray,
                max_distance,
                true, // solid
                character_query_filter(exclude_body),
            )
            .map(|(_, toi)| toi)
    }

    /// Sweeps a Y-aligned capsule posed at `shape_pos` along `direction`.
    /// Returns the travel distance at first contact (0 when already touching).
    pub fn cast_capsule(
        &self,
        shape_pos: &Isometry3<f32>,
        capsule: &CapsuleProfile,
        direction: &UnitVector3<f32>,
        max_distance: f32,
        exclude_body: Option<RigidBodyHandle>,
    ) -> Option<f32> {
        let shape = Capsule::new_y(capsule.half_segment(), capsule.radius);
        self.query_pipeline
            .cast_shape(
                &self.rigid_body_set,
                &self.collider_set,
                shape_pos,
                &direction.into_inner(),
                &shape,
                ShapeCastOptions::with_max_time_of_impact(max_distance),
                character_query_filter(exclude_body),
            )
            .map(|(_, hit)| hit.time_of_impact)
    }

    /// Moves a character from `current_pos` using the kinematic controller, with
    /// `up` as the controller's up axis, and schedules the resulting translation.
    pub fn move_character(
        &mut self,
        id: u32,
        current_pos: &Isometry3<f32>,
        desired_translation: &Vector3<f32>,
        up: &UnitVector3<f32>,
        dt: f32,
    ) -> Option<EffectiveCharacterMovement> {
        let character = self.characters.get(&id)?;
        let body_handle = character.body_handle;
        let collider = self.collider_set.get(character.collider_handle)?;
        let shape = collider.shape();

        // Fresh controller each step: `up` changes as the character circles the planet.
        let controller = KinematicCharacterController {
            up: *up,
            offset: CharacterLength::Absolute(consts::CHARACTER_OFFSET),
            autostep: Some(CharacterAutostep {
                max_height: CharacterLength::Absolute(consts::AUTOSTEP_MAX_HEIGHT),
                min_width: CharacterLength::Absolute(consts::AUTOSTEP_MIN_WIDTH),
                include_dynamic_bodies: false,
            }),
            max_slope_climb_angle: consts::MAX_SLOPE_CLIMB_DEGREES.to_radians(),
            min_slope_slide_angle: consts::MIN_SLOPE_SLIDE_DEGREES.to_radians(),
            snap_to_ground: Some(CharacterLength::Absolute(consts::SNAP_TO_GROUND)),
            ..Default::default()
        };

        let movement = controller.move_shape(
            dt,
            &self.rigid_body_set,
            &self.collider_set,
            &self.query_pipeline,
            shape,
            current_pos,
            *desired_translation,
            character_query_filter(Some(body_handle)),
            |_collision| {},
        );

        // Scheduled for the next physics step.
        let new_pos = current_pos.translation.vector + movement.translation;
        let body = self.rigid_body_set.get_mut(body_handle)?;
        body.set_next_kinematic_translation(new_pos);
        Some(movement)
    }

    /// Current (character, npc) trigger overlaps.
    /// Uses `intersections_with_shape` because kinematic/fixed sensor pairs
    /// never produce narrow-phase contacts.
    pub fn detect_trigger_overlaps(&self) -> HashSet<(u32, u32)> {
        let mut overlaps = HashSet::new();

        for (&character_id, character) in &self.characters {
            let Some(collider) = self.collider_set.get(character.collider_handle) else {
                continue;
            };
            let filter = QueryFilter::default()
                .exclude_rigid_body(character.body_handle)
                .exclude_solids();

            self.query_pipeline.intersections_with_shape(
                &self.rigid_body_set,
                &self.collider_set,
                collider.position(),
                collider.shape(),
                filter,
                |other| {
                    if let Some(BodyTag::NpcTrigger(npc_id)) = self.collider_tags.get(&other) {
                        overlaps.insert((character_id, *npc_id));
                    }
                    true // continue searching
                },
            );
        }

        overlaps
    }
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}
