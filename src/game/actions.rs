use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::inventory::{InventoryError, OreKind};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PlayerAction {
    /// Talk to the NPC whose trigger the player stands in
    Interact,
    CloseMenu,
    /// Dialog option: receive a pickaxe
    GivePickaxe,
    /// Dialog option: sell ore chunks
    SellOre { ore: OreKind, amount: u32 },
    SelectSlot { slot: usize },
    Mine { ore_id: u32 },
}

#[derive(Debug, Clone)]
pub struct QueuedAction {
    pub player_id: u32,
    pub action: PlayerAction,
}

/// Why a queued action was rejected. Rejections are logged and reported,
/// never fatal to the tick.
#[derive(Debug, Error, PartialEq)]
pub enum ActionError {
    #[error("no player with id {0}")]
    UnknownPlayer(u32),
    #[error("no NPC in interaction range")]
    NoNpcInRange,
    #[error("action requires an open dialog")]
    NoDialogOpen,
    #[error("no ore node with id {0}")]
    UnknownOre(u32),
    #[error("ore node {0} is already mined")]
    OreDepleted(u32),
    #[error("ore node {ore_id} is out of reach ({distance:.2} > {reach:.2})")]
    OutOfReach { ore_id: u32, distance: f32, reach: f32 },
    #[error("a pickaxe must be equipped to mine")]
    NoPickaxeEquipped,
    #[error(transparent)]
    Inventory(#[from] InventoryError),
}
