//! World configuration parsing from world.toml files

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::game::constants::{gameplay, physics};
use crate::game::inventory::OreKind;
use crate::game::locomotion::{LocomotionConfig, LocomotionError};

/// Planet section: the single gravity body
#[derive(Debug, Clone, Deserialize)]
pub struct PlanetConfig {
    #[serde(default)]
    pub center: [f32; 3],
    #[serde(default = "default_planet_radius")]
    pub radius: f32,
}

/// Player character section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Surface direction (from the planet center) the player spawns over
    pub spawn_direction: [f32; 3],
    /// Capsule center height above the surface at spawn
    pub spawn_height: f32,
    pub radius: f32,
    pub height: f32,
    pub mining_reach: f32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            spawn_direction: [0.0, 1.0, 0.0],
            spawn_height: physics::CHARACTER_SPAWN_HEIGHT,
            radius: physics::CHARACTER_RADIUS,
            height: physics::CHARACTER_HEIGHT,
            mining_reach: gameplay::MINING_REACH,
        }
    }
}

/// Static box resting on the surface, e.g. a boulder or crater rim
#[derive(Debug, Clone, Deserialize)]
pub struct BoulderConfig {
    pub direction: [f32; 3],
    pub half_extents: [f32; 3],
    /// How far the box sinks below the surface
    #[serde(default)]
    pub sink: f32,
}

/// A single hand-placed ore node
#[derive(Debug, Clone, Deserialize)]
pub struct OreConfig {
    pub kind: OreKind,
    pub direction: [f32; 3],
    #[serde(default = "default_chunk_amount")]
    pub chunk_amount: u32,
}

/// Ore nodes scattered over the surface from a seeded RNG
#[derive(Debug, Clone, Deserialize)]
pub struct OreScatterConfig {
    pub kind: OreKind,
    pub count: u32,
    #[serde(default)]
    pub seed: u64,
    #[serde(default = "default_chunk_amount")]
    pub chunk_amount: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NpcConfig {
    pub name: String,
    pub direction: [f32; 3],
    #[serde(default = "default_trigger_radius")]
    pub trigger_radius: f32,
}

/// Prices paid per chunk when selling ore
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ShopConfig {
    pub copper: u32,
    pub iron: u32,
    pub silver: u32,
    pub gold: u32,
}

impl Default for ShopConfig {
    fn default() -> Self {
        Self {
            copper: 5,
            iron: 8,
            silver: 15,
            gold: 30,
        }
    }
}

impl ShopConfig {
    pub fn price(&self, kind: OreKind) -> u32 {
        match kind {
            OreKind::Copper => self.copper,
            OreKind::Iron => self.iron,
            OreKind::Silver => self.silver,
            OreKind::Gold => self.gold,
        }
    }
}

/// World configuration from world.toml
#[derive(Debug, Clone, Deserialize)]
pub struct WorldConfig {
    /// Display name of the world
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Simulation ticks per second
    #[serde(default = "default_tick_rate")]
    pub tick_rate: u32,
    /// Required; `None` only so a missing table is reported by `validate`
    #[serde(default)]
    pub planet: Option<PlanetConfig>,
    #[serde(default)]
    pub player: PlayerConfig,
    #[serde(default)]
    pub locomotion: LocomotionConfig,
    #[serde(default)]
    pub boulders: Vec<BoulderConfig>,
    #[serde(default)]
    pub ores: Vec<OreConfig>,
    #[serde(default)]
    pub ore_scatter: Vec<OreScatterConfig>,
    #[serde(default)]
    pub npcs: Vec<NpcConfig>,
    #[serde(default)]
    pub shop: ShopConfig,
}

fn default_planet_radius() -> f32 {
    physics::PLANET_RADIUS
}

fn default_chunk_amount() -> u32 {
    gameplay::DEFAULT_CHUNK_AMOUNT
}

fn default_trigger_radius() -> f32 {
    gameplay::NPC_TRIGGER_RADIUS
}

fn default_tick_rate() -> u32 {
    (1.0 / physics::TIMESTEP).round() as u32
}

fn is_direction(v: &[f32; 3]) -> bool {
    v.iter().all(|c| c.is_finite()) && v.iter().map(|c| c * c).sum::<f32>() > 1.0e-8
}

fn positive(v: f32) -> bool {
    v.is_finite() && v > 0.0
}

impl WorldConfig {
    /// Load world configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, WorldConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| WorldConfigError::IoError(path.to_path_buf(), e))?;

        toml::from_str(&content).map_err(|e| WorldConfigError::ParseError(path.to_path_buf(), e))
    }

    /// Load world configuration from a game directory
    /// Looks for world.toml in the given directory
    pub fn from_game_dir(game_dir: &Path) -> Result<Self, WorldConfigError> {
        let config_path = game_dir.join("world.toml");
        Self::from_file(&config_path)
    }

    /// The planet section; errors when absent.
    pub fn planet(&self) -> Result<&PlanetConfig, WorldConfigError> {
        self.planet.as_ref().ok_or(WorldConfigError::MissingPlanet)
    }

    /// Seconds per simulation tick.
    pub fn timestep(&self) -> f32 {
        1.0 / self.tick_rate.max(1) as f32
    }

    /// Checks everything serde cannot: required sections, ranges and directions.
    pub fn validate(&self) -> Result<(), WorldConfigError> {
        let planet = self.planet()?;
        if !positive(planet.radius) || !planet.center.iter().all(|c| c.is_finite()) {
            return Err(WorldConfigError::Invalid(
                "planet.radius must be positive and planet.center finite".to_string(),
            ));
        }
        if self.tick_rate == 0 {
            return Err(WorldConfigError::Invalid("tick_rate must be at least 1".to_string()));
        }

        let player = &self.player;
        if !is_direction(&player.spawn_direction) {
            return Err(WorldConfigError::Invalid(
                "player.spawn_direction must be a non-zero vector".to_string(),
            ));
        }
        if !positive(player.radius) || !(player.height >= 2.0 * player.radius) {
            return Err(WorldConfigError::Invalid(
                "player capsule needs radius > 0 and height >= 2 * radius".to_string(),
            ));
        }
        if !(player.spawn_height.is_finite() && player.spawn_height >= player.height * 0.5) {
            return Err(WorldConfigError::Invalid(
                "player.spawn_height must keep the capsule above the surface".to_string(),
            ));
        }
        if !positive(player.mining_reach) {
            return Err(WorldConfigError::Invalid("player.mining_reach must be positive".to_string()));
        }

        self.locomotion.validate()?;

        for (i, boulder) in self.boulders.iter().enumerate() {
            if !is_direction(&boulder.direction) || !boulder.half_extents.iter().all(|e| positive(*e)) {
                return Err(WorldConfigError::Invalid(format!(
                    "boulders[{i}] needs a non-zero direction and positive half_extents"
                )));
            }
        }
        for (i, ore) in self.ores.iter().enumerate() {
            if !is_direction(&ore.direction) {
                return Err(WorldConfigError::Invalid(format!(
                    "ores[{i}].direction must be a non-zero vector"
                )));
            }
        }
        for (i, npc) in self.npcs.iter().enumerate() {
            if !is_direction(&npc.direction) || !positive(npc.trigger_radius) {
                return Err(WorldConfigError::Invalid(format!(
                    "npcs[{i}] ({}) needs a non-zero direction and positive trigger_radius",
                    npc.name
                )));
            }
        }
        Ok(())
    }
}

/// Errors that can occur when loading world configuration
#[derive(Debug, Error)]
pub enum WorldConfigError {
    #[error("Failed to read {}: {}", .0.display(), .1)]
    IoError(PathBuf, #[source] std::io::Error),
    #[error("Failed to parse {}: {}", .0.display(), .1)]
    ParseError(PathBuf, #[source] toml::de::Error),
    #[error("world.toml has no [planet] section")]
    MissingPlanet,
    #[error("Invalid locomotion settings: {0}")]
    Locomotion(#[from] LocomotionError),
    #[error("Invalid world config: {0}")]
    Invalid(String),
}
