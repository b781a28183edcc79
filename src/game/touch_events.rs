use std::collections::HashSet;
use std::hash::Hash;

/// Pair-wise trigger lifecycle for one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerTransitions<P> {
    pub entered: Vec<P>,
    pub exited: Vec<P>,
}

impl<P> Default for TriggerTransitions<P> {
    fn default() -> Self {
        Self {
            entered: Vec::new(),
            exited: Vec::new(),
        }
    }
}

impl<P> TriggerTransitions<P> {
    pub fn is_empty(&self) -> bool {
        self.entered.is_empty() && self.exited.is_empty()
    }
}

/// Compute enter/exit transitions from current and previous overlap sets.
/// Results are sorted so event order does not depend on hash order.
pub fn compute_trigger_transitions<P: Copy + Eq + Hash + Ord>(
    current: &HashSet<P>,
    previous: &HashSet<P>,
) -> TriggerTransitions<P> {
    let mut entered: Vec<P> = current.difference(previous).copied().collect();
    let mut exited: Vec<P> = previous.difference(current).copied().collect();
    entered.sort_unstable();
    exited.sort_unstable();

    TriggerTransitions { entered, exited }
}
