use nalgebra::{Point3, Vector3};
use serde::Serialize;
use std::collections::BTreeMap;

use super::super::focus::UiFocus;
use super::super::inventory::OreKind;
use super::{GameEvent, GameInstance};

/// Snapshot of everything the player can see, emitted once per tick.
#[derive(Debug, Clone, Serialize)]
pub struct PlayerObservation {
    pub tick: u64,
    pub position: [f32; 3],
    pub up: [f32; 3],
    pub forward: [f32; 3],
    pub altitude: f32,
    pub grounded: bool,
    pub vertical_velocity: f32,
    pub pitch: f32,
    pub focus: UiFocus,
    pub cursor_locked: bool,
    pub money: u64,
    pub has_pickaxe: bool,
    pub ore_chunks: BTreeMap<OreKind, u32>,
    pub quickbar: Vec<String>,
    pub selected_slot: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nearby_npc: Option<NpcObservation>,
    pub ores_remaining: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nearest_ore: Option<OreObservation>,
    pub events: Vec<GameEvent>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NpcObservation {
    pub id: u32,
    pub name: String,
    pub prompt_visible: bool,
    pub menu_open: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct OreObservation {
    pub id: u32,
    pub kind: OreKind,
    pub distance: f32,
}

fn round_f32(v: f32) -> f32 {
    (v * 1000.0).round() / 1000.0
}

fn round_vector(v: &Vector3<f32>) -> [f32; 3] {
    [round_f32(v.x), round_f32(v.y), round_f32(v.z)]
}

fn round_point(p: &Point3<f32>) -> [f32; 3] {
    round_vector(&p.coords)
}

pub(super) fn build_player_observation(instance: &GameInstance) -> PlayerObservation {
    let locomotion = &instance.player.locomotion;
    let state = locomotion.state();
    let inventory = &instance.player.inventory;
    let forward = state.orientation * -Vector3::z();

    PlayerObservation {
        tick: instance.tick,
        position: round_point(&state.position),
        up: round_vector(&locomotion.up()),
        forward: round_vector(&forward),
        altitude: round_f32(instance.player_altitude()),
        grounded: locomotion.grounded(),
        vertical_velocity: round_f32(state.vertical_velocity),
        pitch: round_f32(state.pitch),
        focus: instance.focus.focus(),
        cursor_locked: instance.focus.cursor_locked(),
        money: inventory.money(),
        has_pickaxe: inventory.has_pickaxe(),
        ore_chunks: inventory.ore_chunks().clone(),
        quickbar: inventory.slot_labels().iter().map(|s| s.to_string()).collect(),
        selected_slot: inventory.quickbar().selected(),
        nearby_npc: instance.nearby_npc().map(|npc| NpcObservation {
            id: npc.id,
            name: npc.name.clone(),
            prompt_visible: npc.prompt_visible,
            menu_open: npc.menu_open,
        }),
        ores_remaining: instance.ores.len(),
        nearest_ore: instance.nearest_ore().map(|(ore, distance)| OreObservation {
            id: ore.id,
            kind: ore.kind,
            distance: round_f32(distance),
        }),
        events: instance.events.clone(),
    }
}
