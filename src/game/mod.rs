//! Planet-surface gameplay: locomotion, mining, NPC dialogs and the quickbar.

pub mod actions;
pub mod constants;
pub mod focus;
pub mod input;
pub mod instance;
pub mod inventory;
pub mod locomotion;
pub mod npc;
pub mod ore;
pub mod physics;
pub mod surface_motion;
pub mod touch_events;

pub use instance::{GameEvent, GameInstance, InstanceError, PLAYER_ID};
