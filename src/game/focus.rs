//! Who owns the cursor: gameplay (locked, hidden) or an NPC dialog (free, visible).

use log::{debug, info};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "focus", rename_all = "snake_case")]
pub enum UiFocus {
    #[default]
    Gameplay,
    Dialog { npc: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusEvent {
    DialogOpened(u32),
    DialogClosed(u32),
}

/// Single owner of the cursor-lock state.
#[derive(Debug, Clone, Default)]
pub struct FocusCoordinator {
    focus: UiFocus,
}

impl FocusCoordinator {
    /// Starts a session in gameplay focus.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn focus(&self) -> UiFocus {
        self.focus
    }

    pub fn cursor_locked(&self) -> bool {
        self.focus == UiFocus::Gameplay
    }

    pub fn cursor_visible(&self) -> bool {
        !self.cursor_locked()
    }

    /// Look input only reaches the camera while the cursor is locked.
    pub fn accepts_look(&self) -> bool {
        self.cursor_locked()
    }

    /// Applies `event` and returns whether the focus changed.
    pub fn handle(&mut self, event: FocusEvent) -> bool {
        let next = match (self.focus, event) {
            (_, FocusEvent::DialogOpened(npc)) => UiFocus::Dialog { npc },
            (UiFocus::Dialog { npc: open }, FocusEvent::DialogClosed(npc)) if open == npc => {
                UiFocus::Gameplay
            }
            (current, FocusEvent::DialogClosed(npc)) => {
                debug!("Ignoring close of dialog {} while focus is {:?}", npc, current);
                current
            }
        };
        let changed = next != self.focus;
        if changed {
            info!("UI focus {:?} -> {:?}", self.focus, next);
            self.focus = next;
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_starts_locked() {
        let focus = FocusCoordinator::new();
        assert_eq!(focus.focus(), UiFocus::Gameplay);
        assert!(focus.cursor_locked());
        assert!(!focus.cursor_visible());
        assert!(focus.accepts_look());
    }

    #[test]
    fn test_dialog_frees_cursor_until_closed() {
        let mut focus = FocusCoordinator::new();
        assert!(focus.handle(FocusEvent::DialogOpened(3)));
        assert_eq!(focus.focus(), UiFocus::Dialog { npc: 3 });
        assert!(focus.cursor_visible());
        assert!(!focus.accepts_look());

        assert!(focus.handle(FocusEvent::DialogClosed(3)));
        assert!(focus.cursor_locked());
    }

    #[test]
    fn test_closing_other_dialog_is_ignored() {
        let mut focus = FocusCoordinator::new();
        focus.handle(FocusEvent::DialogOpened(1));
        assert!(!focus.handle(FocusEvent::DialogClosed(2)));
        assert_eq!(focus.focus(), UiFocus::Dialog { npc: 1 });

        focus.handle(FocusEvent::DialogClosed(1));
        assert!(!focus.handle(FocusEvent::DialogClosed(1)));
        assert_eq!(focus.focus(), UiFocus::Gameplay);
    }

    #[test]
    fn test_opening_second_dialog_switches_owner() {
        let mut focus = FocusCoordinator::new();
        focus.handle(FocusEvent::DialogOpened(1));
        focus.handle(FocusEvent::DialogOpened(2));
        assert!(!focus.handle(FocusEvent::DialogClosed(1)));
        assert_eq!(focus.focus(), UiFocus::Dialog { npc: 2 });
    }
}
