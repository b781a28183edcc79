use crossbeam_channel::{Receiver, Sender};
use log::{debug, info, warn};
use nalgebra::{Point3, UnitVector3, Vector3};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use thiserror::Error;

use crate::config::{WorldConfig, WorldConfigError};

use super::actions::{PlayerAction, QueuedAction};
use super::constants::gameplay as gameplay_consts;
use super::focus::FocusCoordinator;
use super::input::FrameInput;
use super::inventory::{Inventory, OreKind};
use super::locomotion::{CapsuleProfile, GravityBody, LocomotionError, LocomotionFrame, SurfaceLocomotion};
use super::npc::NpcState;
use super::ore::{place_ores, surface_anchor, OreNode};
use super::physics::{surface_rotation, PhysicsWorld};

mod character_controller;
mod controller_runtime;
mod interaction;
mod observation;
mod tick_pipeline;

pub use character_controller::CharacterHost;
pub use observation::{NpcObservation, OreObservation, PlayerObservation};

/// Id of the single player character.
pub const PLAYER_ID: u32 = 1;

/// The planet the world is built around.
#[derive(Debug, Clone, Copy)]
pub struct Planet {
    pub center: Point3<f32>,
    pub radius: f32,
}

impl Planet {
    /// Height above the surface.
    pub fn altitude(&self, position: &Point3<f32>) -> f32 {
        nalgebra::distance(position, &self.center) - self.radius
    }
}

/// The player: locomotion-owned transform plus inventory.
pub struct Player {
    pub locomotion: SurfaceLocomotion,
    pub inventory: Inventory,
    pub mining_reach: f32,
    pub last_frame: Option<LocomotionFrame>,
}

/// Something that happened during a tick, reported in observations.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GameEvent {
    Landed,
    LeftGround,
    PromptShown { npc: u32 },
    PromptHidden { npc: u32 },
    DialogOpened { npc: u32 },
    DialogClosed { npc: u32 },
    PickaxeReceived,
    SlotSelected { slot: usize },
    OreMined { ore_id: u32, kind: OreKind, chunks: u32 },
    OreSold { kind: OreKind, amount: u32, earned: u64 },
    ActionRejected { action: String, reason: String },
}

#[derive(Debug, Error)]
pub enum InstanceError {
    #[error(transparent)]
    Config(#[from] WorldConfigError),
    #[error("failed to spawn player: {0}")]
    Locomotion(#[from] LocomotionError),
}

/// A running planet world: physics, the player, ores, NPCs and UI focus.
pub struct GameInstance {
    pub name: String,
    pub config: WorldConfig,
    pub planet: Planet,
    pub physics: PhysicsWorld,
    pub player: Player,
    pub ores: BTreeMap<u32, OreNode>,
    /// Ores removed by mining, to tell "already mined" from "never existed"
    pub mined_ores: BTreeSet<u32>,
    pub npcs: BTreeMap<u32, NpcState>,
    pub focus: FocusCoordinator,
    pub tick: u64,
    pub action_receiver: Receiver<QueuedAction>,
    pub action_sender: Sender<QueuedAction>,
    /// Events raised during the current tick
    pub events: Vec<GameEvent>,
    /// (character, npc) trigger overlaps from the previous tick
    pub previous_overlaps: HashSet<(u32, u32)>,
}

fn unit(v: [f32; 3]) -> Result<UnitVector3<f32>, WorldConfigError> {
    UnitVector3::try_new(Vector3::from(v), 1.0e-6)
        .ok_or_else(|| WorldConfigError::Invalid(format!("{v:?} is not a usable direction")))
}

impl GameInstance {
    /// Builds the world described by `config`.
    pub fn new(config: WorldConfig) -> Result<Self, InstanceError> {
        config.validate()?;
        let planet_config = config.planet()?;
        let planet = Planet {
            center: Point3::from(planet_config.center),
            radius: planet_config.radius,
        };

        let mut physics = PhysicsWorld::new();
        physics.add_planet(planet.center, planet.radius);

        for (id, boulder) in config.boulders.iter().enumerate() {
            let direction = unit(boulder.direction)?;
            let position = surface_anchor(
                &planet.center,
                planet.radius,
                &direction,
                boulder.half_extents[1] - boulder.sink,
            );
            physics.add_boulder(id as u32, position, surface_rotation(&direction), boulder.half_extents);
        }

        let ores: BTreeMap<u32, OreNode> =
            place_ores(&planet.center, planet.radius, &config.ores, &config.ore_scatter, 1)
                .into_iter()
                .map(|ore| (ore.id, ore))
                .collect();
        for ore in ores.values() {
            let direction = UnitVector3::new_normalize(ore.position - planet.center);
            physics.add_ore(ore.id, ore.position, surface_rotation(&direction));
        }

        let mut npcs = BTreeMap::new();
        for (index, npc) in config.npcs.iter().enumerate() {
            let id = index as u32 + 1;
            let direction = unit(npc.direction)?;
            let position = surface_anchor(
                &planet.center,
                planet.radius,
                &direction,
                gameplay_consts::NPC_HALF_EXTENTS[1],
            );
            physics.add_npc(id, position, surface_rotation(&direction), npc.trigger_radius);
            npcs.insert(id, NpcState::new(id, npc.name.clone(), position, npc.trigger_radius));
        }

        let player_config = &config.player;
        let mining_reach = player_config.mining_reach;
        let capsule = CapsuleProfile::new(player_config.radius, player_config.height);
        let spawn_direction = unit(player_config.spawn_direction)?;
        let spawn = planet.center + spawn_direction.into_inner() * (planet.radius + player_config.spawn_height);
        let orientation = surface_rotation(&spawn_direction);
        let locomotion = SurfaceLocomotion::activate(
            config.locomotion,
            capsule,
            Some(GravityBody {
                center: planet.center,
            }),
            spawn,
            orientation,
        )?;
        physics.add_character(PLAYER_ID, spawn, orientation, capsule);
        physics.update_query_pipeline();

        info!(
            "World '{}' ready: planet r={} with {} ores, {} NPCs, {} boulders",
            config.name,
            planet.radius,
            ores.len(),
            npcs.len(),
            config.boulders.len()
        );

        let (action_sender, action_receiver) = crossbeam_channel::unbounded();
        Ok(Self {
            name: config.name.clone(),
            player: Player {
                locomotion,
                inventory: Inventory::new(),
                mining_reach,
                last_frame: None,
            },
            config,
            planet,
            physics,
            ores,
            mined_ores: BTreeSet::new(),
            npcs,
            focus: FocusCoordinator::new(),
            tick: 0,
            action_receiver,
            action_sender,
            events: Vec::new(),
            previous_overlaps: HashSet::new(),
        })
    }

    /// Queues an action for processing at the start of the next tick.
    pub fn queue_action(&self, action: PlayerAction) {
        self.queue_action_for(PLAYER_ID, action);
    }

    pub fn queue_action_for(&self, player_id: u32, action: PlayerAction) {
        debug!("Queued {:?} for player {}", action, player_id);
        // Only fails once the receiver is gone, and the instance owns it.
        if let Err(err) = self.action_sender.send(QueuedAction { player_id, action }) {
            warn!("Dropped action for player {}: {:?}", player_id, err.into_inner().action);
        }
    }

    /// A sender collaborators can hold to queue actions.
    pub fn action_sender(&self) -> Sender<QueuedAction> {
        self.action_sender.clone()
    }

    /// Runs one simulation tick.
    pub fn tick(&mut self, input: &FrameInput) {
        tick_pipeline::run_tick_phases(self, input);
    }

    /// Seconds per tick from the world config.
    pub fn timestep(&self) -> f32 {
        self.config.timestep()
    }

    pub fn player_position(&self) -> Point3<f32> {
        self.player.locomotion.state().position
    }

    pub fn player_altitude(&self) -> f32 {
        self.planet.altitude(&self.player_position())
    }

    pub fn grounded(&self) -> bool {
        self.player.locomotion.grounded()
    }

    /// The NPC whose trigger the player currently stands in.
    pub fn nearby_npc(&self) -> Option<&NpcState> {
        self.npcs.values().find(|npc| npc.player_near)
    }

    /// Closest remaining ore to the player.
    pub fn nearest_ore(&self) -> Option<(&OreNode, f32)> {
        let position = self.player_position();
        self.ores
            .values()
            .map(|ore| (ore, nalgebra::distance(&position, &ore.position)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }

    /// Moves the player without sweeping (debug/scripted setups).
    pub fn teleport_player(&mut self, position: Point3<f32>) {
        self.player.locomotion.teleport(position);
        let orientation = self.player.locomotion.state().orientation;
        self.physics.set_character_position(PLAYER_ID, position);
        self.physics.set_character_rotation(PLAYER_ID, &orientation);
        self.physics.update_query_pipeline();
    }

    pub fn get_player_observation(&self) -> PlayerObservation {
        observation::build_player_observation(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::focus::UiFocus;

    fn world(extra: &str) -> GameInstance {
        let toml = format!(
            r#"
            name = "Test"
            [planet]
            radius = 30.0
            [player]
            spawn_height = 1.0
            {extra}
            "#
        );
        let config: WorldConfig = toml::from_str(&toml).unwrap();
        GameInstance::new(config).unwrap()
    }

    #[test]
    fn test_missing_planet_is_rejected() {
        let config: WorldConfig = toml::from_str(r#"name = "Void""#).unwrap();
        assert!(matches!(
            GameInstance::new(config),
            Err(InstanceError::Config(WorldConfigError::MissingPlanet))
        ));
    }

    #[test]
    fn test_world_spawns_player_on_surface() {
        let instance = world("");
        assert_eq!(instance.tick, 0);
        assert!((instance.player_altitude() - 1.0).abs() < 1e-4);
        assert_eq!(instance.focus.focus(), UiFocus::Gameplay);
        assert!(instance.physics.character(PLAYER_ID).is_some());
    }

    #[test]
    fn test_world_places_ores_and_npcs() {
        let instance = world(
            r#"
            [[ores]]
            kind = "iron"
            direction = [1.0, 0.0, 0.0]
            [[ore_scatter]]
            kind = "copper"
            count = 4
            seed = 3
            [[npcs]]
            name = "Trader"
            direction = [0.0, 0.0, 1.0]
            "#,
        );
        assert_eq!(instance.ores.len(), 5);
        assert!(instance.ores.keys().all(|id| instance.physics.has_ore(*id)));
        assert_eq!(instance.npcs.len(), 1);
        assert_eq!(instance.npcs[&1].name, "Trader");
        assert!(instance.nearby_npc().is_none());
    }

    #[test]
    fn test_idle_ticks_settle_on_ground() {
        let mut instance = world("");
        for _ in 0..30 {
            let input = FrameInput::idle(instance.timestep());
            instance.tick(&input);
        }
        assert_eq!(instance.tick, 30);
        assert!(instance.grounded());
        let altitude = instance.player_altitude();
        assert!(altitude > 0.9 && altitude < 1.2, "altitude {altitude}");
    }

    #[test]
    fn test_queued_actions_apply_on_next_tick() {
        let mut instance = world("");
        instance.queue_action(PlayerAction::SelectSlot { slot: 1 });
        let sender = instance.action_sender();
        std::thread::spawn(move || {
            sender
                .send(QueuedAction {
                    player_id: PLAYER_ID,
                    action: PlayerAction::SelectSlot { slot: 2 },
                })
                .unwrap();
        })
        .join()
        .unwrap();
        assert!(instance.events.is_empty());

        instance.tick(&FrameInput::idle(instance.timestep()));
        assert!(instance.events.contains(&GameEvent::SlotSelected { slot: 1 }));
        assert!(instance.events.contains(&GameEvent::SlotSelected { slot: 2 }));
        assert_eq!(instance.player.inventory.quickbar().selected(), 2);

        instance.tick(&FrameInput::idle(instance.timestep()));
        assert!(!instance
            .events
            .iter()
            .any(|e| matches!(e, GameEvent::SlotSelected { .. })));
    }

    #[test]
    fn test_physics_body_follows_locomotion_rotation() {
        let mut instance = world("");
        let walk = FrameInput {
            move_axis: nalgebra::Vector2::new(0.3, 1.0),
            look_delta: nalgebra::Vector2::new(40.0, 0.0),
            ..FrameInput::idle(instance.timestep())
        };
        for _ in 0..20 {
            instance.tick(&walk);
        }
        let axes_match = |instance: &GameInstance| {
            let body = instance.physics.character_rotation(PLAYER_ID).unwrap();
            let actor = instance.player.locomotion.state().orientation;
            [Vector3::y(), Vector3::z()]
                .iter()
                .all(|axis| (body * axis - actor * axis).norm() < 1e-4)
        };
        assert!(axes_match(&instance));

        instance.teleport_player(Point3::new(31.0, 0.0, 0.0));
        instance.tick(&FrameInput::idle(instance.timestep()));
        assert!(axes_match(&instance));
        let body = instance.physics.character_rotation(PLAYER_ID).unwrap();
        assert!((body * Vector3::y()).x > 0.99);
    }
}
