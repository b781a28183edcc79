use log::{trace, warn};

use super::super::input::FrameInput;
use super::{controller_runtime, interaction, GameInstance};

/// Executes simulation phases for one tick:
/// actions -> query refresh -> character motion -> physics -> triggers.
pub(super) fn run_tick_phases(instance: &mut GameInstance, input: &FrameInput) {
    instance.events.clear();

    // Drain queued actions first so menu/focus changes apply to this frame's look.
    while let Ok(queued) = instance.action_receiver.try_recv() {
        interaction::process_action(instance, queued);
    }

    let dt = input.dt;
    if !(dt.is_finite() && dt > 0.0) {
        warn!("Skipping tick {} with invalid dt {}", instance.tick, dt);
        return;
    }

    // Update query pipeline before character movement so probes see removed ores.
    instance.physics.update_query_pipeline();

    controller_runtime::update_character_movement(instance, input);

    // Commits the scheduled kinematic move and refreshes queries.
    instance.physics.step(dt);

    interaction::fire_trigger_events(instance);

    instance.tick += 1;
    trace!(
        "Tick {} done: altitude {:.3}, grounded {}",
        instance.tick,
        instance.player_altitude(),
        instance.grounded()
    );
}
