use log::{info, warn};

use super::super::actions::{ActionError, PlayerAction, QueuedAction};
use super::super::focus::{FocusEvent, UiFocus};
use super::super::ore::{check_mine, mine};
use super::super::touch_events::compute_trigger_transitions;
use super::{GameEvent, GameInstance, PLAYER_ID};

/// Applies one queued action. Rejections are logged and reported as events.
pub(super) fn process_action(instance: &mut GameInstance, queued: QueuedAction) {
    let description = format!("{:?}", queued.action);
    if let Err(e) = apply_action(instance, queued) {
        warn!("Rejected {}: {}", description, e);
        instance.events.push(GameEvent::ActionRejected {
            action: description,
            reason: e.to_string(),
        });
    }
}

fn apply_focus(instance: &mut GameInstance, event: FocusEvent) {
    if instance.focus.handle(event) {
        instance.events.push(match event {
            FocusEvent::DialogOpened(npc) => GameEvent::DialogOpened { npc },
            FocusEvent::DialogClosed(npc) => GameEvent::DialogClosed { npc },
        });
    }
}

/// The NPC whose dialog currently owns focus and has its menu open.
fn open_dialog(instance: &GameInstance) -> Result<u32, ActionError> {
    match instance.focus.focus() {
        UiFocus::Dialog { npc } if instance.npcs.get(&npc).is_some_and(|state| state.menu_open) => Ok(npc),
        _ => Err(ActionError::NoDialogOpen),
    }
}

fn apply_action(instance: &mut GameInstance, queued: QueuedAction) -> Result<(), ActionError> {
    if queued.player_id != PLAYER_ID {
        return Err(ActionError::UnknownPlayer(queued.player_id));
    }

    match queued.action {
        PlayerAction::Interact => {
            let npc = instance
                .npcs
                .values_mut()
                .find(|npc| npc.player_near)
                .ok_or(ActionError::NoNpcInRange)?;
            let event = npc.interact()?;
            apply_focus(instance, event);
        }
        PlayerAction::CloseMenu => {
            let npc_id = open_dialog(instance)?;
            if let Some(npc) = instance.npcs.get_mut(&npc_id) {
                let event = npc.close_menu();
                apply_focus(instance, event);
            }
        }
        PlayerAction::GivePickaxe => {
            let npc_id = open_dialog(instance)?;
            instance.npcs[&npc_id].give_pickaxe(&mut instance.player.inventory)?;
            instance.events.push(GameEvent::PickaxeReceived);
        }
        PlayerAction::SellOre { ore, amount } => {
            let price = instance.config.shop.price(ore);
            let npc_id = open_dialog(instance)?;
            let earned = instance.npcs[&npc_id].sell_ore(&mut instance.player.inventory, ore, amount, price)?;
            instance.events.push(GameEvent::OreSold {
                kind: ore,
                amount,
                earned,
            });
        }
        PlayerAction::SelectSlot { slot } => {
            instance.player.inventory.select_slot(slot)?;
            instance.events.push(GameEvent::SlotSelected { slot });
        }
        PlayerAction::Mine { ore_id } => {
            let Some(ore) = instance.ores.get(&ore_id) else {
                return Err(if instance.mined_ores.contains(&ore_id) {
                    ActionError::OreDepleted(ore_id)
                } else {
                    ActionError::UnknownOre(ore_id)
                });
            };
            let position = instance.player.locomotion.state().position;
            check_mine(&instance.player.inventory, ore, &position, instance.player.mining_reach)?;
            mine(&mut instance.player.inventory, ore);

            let event = GameEvent::OreMined {
                ore_id,
                kind: ore.kind,
                chunks: ore.chunk_amount,
            };
            instance.ores.remove(&ore_id);
            instance.mined_ores.insert(ore_id);
            instance.physics.remove_ore(ore_id);
            info!("Mined ore {} at tick {}", ore_id, instance.tick);
            instance.events.push(event);
        }
    }
    Ok(())
}

/// Detects trigger enter/exit for the player and updates NPC proximity and focus.
pub(super) fn fire_trigger_events(instance: &mut GameInstance) {
    let current = instance.physics.detect_trigger_overlaps();
    let transitions = compute_trigger_transitions(&current, &instance.previous_overlaps);

    for (character, npc_id) in transitions.exited {
        if character != PLAYER_ID {
            continue;
        }
        let Some(npc) = instance.npcs.get_mut(&npc_id) else {
            continue;
        };
        let event = npc.on_player_exit();
        instance.events.push(GameEvent::PromptHidden { npc: npc_id });
        apply_focus(instance, event);
    }

    for (character, npc_id) in transitions.entered {
        if character != PLAYER_ID {
            continue;
        }
        if let Some(npc) = instance.npcs.get_mut(&npc_id) {
            npc.on_player_enter();
            instance.events.push(GameEvent::PromptShown { npc: npc_id });
        }
    }

    instance.previous_overlaps = current;
}
