//! Player inventory: money, ore chunks and a three-slot quickbar.

use std::collections::BTreeMap;
use std::fmt;

use log::{debug, info};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::constants::gameplay::QUICKBAR_SLOTS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OreKind {
    Copper,
    Iron,
    Silver,
    Gold,
}

impl OreKind {
    pub fn display_name(self) -> &'static str {
        match self {
            OreKind::Copper => "Copper",
            OreKind::Iron => "Iron",
            OreKind::Silver => "Silver",
            OreKind::Gold => "Gold",
        }
    }
}

impl fmt::Display for OreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Items that can sit in a quickbar slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Pickaxe,
}

impl ItemKind {
    pub fn display_name(self) -> &'static str {
        match self {
            ItemKind::Pickaxe => "Pickaxe",
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum InventoryError {
    #[error("quickbar slot {0} is out of range")]
    SlotOutOfRange(usize),
    #[error("not enough {kind} to sell: have {held}, need {requested}")]
    InsufficientOre {
        kind: OreKind,
        held: u32,
        requested: u32,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Quickbar {
    slots: [Option<ItemKind>; QUICKBAR_SLOTS],
    selected: usize,
}

impl Quickbar {
    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn slots(&self) -> &[Option<ItemKind>] {
        &self.slots
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Inventory {
    money: u64,
    has_pickaxe: bool,
    ore_chunks: BTreeMap<OreKind, u32>,
    quickbar: Quickbar,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn money(&self) -> u64 {
        self.money
    }

    pub fn has_pickaxe(&self) -> bool {
        self.has_pickaxe
    }

    pub fn quickbar(&self) -> &Quickbar {
        &self.quickbar
    }

    pub fn assign_to_slot(&mut self, slot: usize, item: Option<ItemKind>) -> Result<(), InventoryError> {
        let entry = self
            .quickbar
            .slots
            .get_mut(slot)
            .ok_or(InventoryError::SlotOutOfRange(slot))?;
        *entry = item;
        Ok(())
    }

    /// Item in `slot`; `None` for empty or out-of-range slots.
    pub fn slot_item(&self, slot: usize) -> Option<ItemKind> {
        self.quickbar.slots.get(slot).copied().flatten()
    }

    pub fn select_slot(&mut self, slot: usize) -> Result<(), InventoryError> {
        if slot >= QUICKBAR_SLOTS {
            return Err(InventoryError::SlotOutOfRange(slot));
        }
        self.quickbar.selected = slot;
        debug!(
            "Selected slot {} ({})",
            slot,
            self.slot_item(slot).map(ItemKind::display_name).unwrap_or("")
        );
        Ok(())
    }

    /// Item in the selected slot.
    pub fn equipped(&self) -> Option<ItemKind> {
        self.slot_item(self.quickbar.selected)
    }

    /// Display strings for each slot, empty when the slot is empty.
    pub fn slot_labels(&self) -> [&'static str; QUICKBAR_SLOTS] {
        self.quickbar
            .slots
            .map(|item| item.map(ItemKind::display_name).unwrap_or(""))
    }

    pub fn add_money(&mut self, amount: u64) {
        self.money = self.money.saturating_add(amount);
    }

    /// Grants the pickaxe, placing it in the first slot when that slot is free.
    pub fn give_pickaxe(&mut self) {
        self.has_pickaxe = true;
        if self.quickbar.slots[0].is_none() {
            self.quickbar.slots[0] = Some(ItemKind::Pickaxe);
        }
        info!("Player received pickaxe");
    }

    pub fn add_ore_chunks(&mut self, kind: OreKind, amount: u32) {
        let total = self.ore_chunks.entry(kind).or_insert(0);
        *total = total.saturating_add(amount);
        info!("Picked up {} {} chunk(s). Total: {}", amount, kind, total);
    }

    pub fn ore_count(&self, kind: OreKind) -> u32 {
        self.ore_chunks.get(&kind).copied().unwrap_or(0)
    }

    /// Removes up to `amount` chunks, stopping at zero.
    pub fn remove_ore(&mut self, kind: OreKind, amount: u32) {
        if let Some(total) = self.ore_chunks.get_mut(&kind) {
            *total = total.saturating_sub(amount);
        }
    }

    /// Sells `amount` chunks at `price_per_chunk`. Leaves the inventory
    /// untouched when fewer chunks are held. Returns the money earned.
    pub fn sell_ore(&mut self, kind: OreKind, amount: u32, price_per_chunk: u32) -> Result<u64, InventoryError> {
        let held = self.ore_count(kind);
        if held < amount {
            return Err(InventoryError::InsufficientOre {
                kind,
                held,
                requested: amount,
            });
        }
        self.remove_ore(kind, amount);
        let earned = u64::from(amount) * u64::from(price_per_chunk);
        self.add_money(earned);
        info!("Sold {} {} chunk(s) for ${}", amount, kind, earned);
        Ok(earned)
    }

    /// Ore chunk counts for observation output.
    pub fn ore_chunks(&self) -> &BTreeMap<OreKind, u32> {
        &self.ore_chunks
    }
}
