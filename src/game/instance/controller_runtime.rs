use log::{debug, warn};

use super::super::input::FrameInput;
use super::character_controller::CharacterHost;
use super::{GameEvent, GameInstance, PLAYER_ID};

/// Runs the player's locomotion for one frame against the physics world.
/// Look input is dropped while a dialog owns the cursor; movement still applies.
pub(super) fn update_character_movement(instance: &mut GameInstance, input: &FrameInput) {
    let input = if instance.focus.accepts_look() {
        *input
    } else {
        input.without_look()
    };

    let Some(mut host) = CharacterHost::new(&mut instance.physics, PLAYER_ID) else {
        warn!("Player character {} has no physics body", PLAYER_ID);
        return;
    };
    let Some(frame) = instance.player.locomotion.step(&mut host, &input) else {
        return;
    };

    if frame.landed {
        debug!("Player landed at tick {}", instance.tick);
        instance.events.push(GameEvent::Landed);
    }
    if frame.left_ground {
        debug!("Player left the ground at tick {}", instance.tick);
        instance.events.push(GameEvent::LeftGround);
    }
    instance.player.last_frame = Some(frame);
}
