//! NPC trader: proximity prompt, dialog menu, pickaxe gift and ore shop.

use log::{debug, info};
use nalgebra::Point3;

use super::actions::ActionError;
use super::focus::FocusEvent;
use super::inventory::{Inventory, OreKind};

#[derive(Debug, Clone)]
pub struct NpcState {
    pub id: u32,
    pub name: String,
    pub position: Point3<f32>,
    pub trigger_radius: f32,
    pub player_near: bool,
    /// "Press E to talk"
    pub prompt_visible: bool,
    pub menu_open: bool,
}

impl NpcState {
    pub fn new(id: u32, name: impl Into<String>, position: Point3<f32>, trigger_radius: f32) -> Self {
        Self {
            id,
            name: name.into(),
            position,
            trigger_radius,
            player_near: false,
            prompt_visible: false,
            menu_open: false,
        }
    }

    pub fn on_player_enter(&mut self) {
        if !self.player_near {
            info!("Player entered trigger of NPC {} ({})", self.id, self.name);
        }
        self.player_near = true;
        self.prompt_visible = true;
    }

    /// Leaving the trigger hides the prompt and closes the menu.
    pub fn on_player_exit(&mut self) -> FocusEvent {
        info!("Player left trigger of NPC {} ({})", self.id, self.name);
        self.player_near = false;
        self.prompt_visible = false;
        self.menu_open = false;
        FocusEvent::DialogClosed(self.id)
    }

    pub fn interact(&mut self) -> Result<FocusEvent, ActionError> {
        if !self.player_near {
            return Err(ActionError::NoNpcInRange);
        }
        self.menu_open = true;
        debug!("Opening menu of NPC {}", self.id);
        Ok(FocusEvent::DialogOpened(self.id))
    }

    pub fn close_menu(&mut self) -> FocusEvent {
        self.menu_open = false;
        debug!("Closed menu of NPC {}", self.id);
        FocusEvent::DialogClosed(self.id)
    }

    pub fn give_pickaxe(&self, inventory: &mut Inventory) -> Result<(), ActionError> {
        if !self.menu_open {
            return Err(ActionError::NoDialogOpen);
        }
        inventory.give_pickaxe();
        info!("NPC {} gave the player a pickaxe", self.name);
        Ok(())
    }

    pub fn sell_ore(
        &self,
        inventory: &mut Inventory,
        kind: OreKind,
        amount: u32,
        price_per_chunk: u32,
    ) -> Result<u64, ActionError> {
        if !self.menu_open {
            return Err(ActionError::NoDialogOpen);
        }
        Ok(inventory.sell_ore(kind, amount, price_per_chunk)?)
    }
}
