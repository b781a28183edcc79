//! Per-frame input sampling and scripted input playback.

use log::warn;
use nalgebra::Vector2;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::actions::PlayerAction;

/// Input consumed by one locomotion frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameInput {
    /// Move axis, each component in [-1, 1]
    pub move_axis: Vector2<f32>,
    pub look_delta: Vector2<f32>,
    /// True only on the frame the jump button went down
    pub jump_pressed: bool,
    /// Elapsed frame time in seconds
    pub dt: f32,
}

impl FrameInput {
    /// Idle input for a frame of length `dt`.
    pub fn idle(dt: f32) -> Self {
        Self {
            move_axis: Vector2::zeros(),
            look_delta: Vector2::zeros(),
            jump_pressed: false,
            dt,
        }
    }

    /// Reads all input capabilities of `source` for one frame.
    pub fn sample<S: InputSource + ?Sized>(source: &mut S, dt: f32) -> Self {
        Self {
            move_axis: source.read_move_axis(),
            look_delta: source.read_look_delta(),
            jump_pressed: source.was_jump_pressed_this_frame(),
            dt,
        }
    }

    /// Same input with the look delta discarded (cursor owned by UI).
    pub fn without_look(self) -> Self {
        Self {
            look_delta: Vector2::zeros(),
            ..self
        }
    }
}

/// Input capabilities provided by the host each frame.
pub trait InputSource {
    fn read_move_axis(&mut self) -> Vector2<f32>;
    fn read_look_delta(&mut self) -> Vector2<f32>;
    fn was_jump_pressed_this_frame(&mut self) -> bool;
}

/// Converts a held button level into a pressed-this-frame edge.
#[derive(Debug, Default, Clone, Copy)]
pub struct ButtonEdge {
    held: bool,
}

impl ButtonEdge {
    /// Feeds the current level; returns true only on the rising edge.
    pub fn update(&mut self, held: bool) -> bool {
        let pressed = held && !self.held;
        self.held = held;
        pressed
    }
}

/// One stretch of constant scripted input.
#[derive(Debug, Clone, Deserialize)]
pub struct InputSegment {
    /// Number of frames the segment lasts
    pub frames: u32,
    #[serde(default, rename = "move")]
    pub move_axis: [f32; 2],
    #[serde(default)]
    pub look: [f32; 2],
    /// Jump button held for the whole segment
    #[serde(default)]
    pub jump: bool,
    /// Actions queued on the segment's first frame
    #[serde(default)]
    pub actions: Vec<PlayerAction>,
}

/// Scripted input loaded from input.toml
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InputScript {
    #[serde(default, rename = "segment")]
    pub segments: Vec<InputSegment>,
}

impl InputScript {
    pub fn from_file(path: &Path) -> Result<Self, InputScriptError> {
        let content = std::fs::read_to_string(path).map_err(|source| InputScriptError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| InputScriptError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Total scripted frames.
    pub fn frame_count(&self) -> u64 {
        self.segments.iter().map(|s| u64::from(s.frames)).sum()
    }
}

/// Errors that can occur when loading an input script
#[derive(Debug, Error)]
pub enum InputScriptError {
    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Plays an [`InputScript`] back frame by frame.
#[derive(Debug, Clone)]
pub struct ScriptedInput {
    script: InputScript,
    segment: usize,
    frame_in_segment: u32,
    jump: ButtonEdge,
    current: Option<InputSegment>,
    /// Actions from zero-frame segments, due on the next played frame
    pending: Vec<PlayerAction>,
}

impl ScriptedInput {
    pub fn new(script: InputScript) -> Self {
        Self {
            script,
            segment: 0,
            frame_in_segment: 0,
            jump: ButtonEdge::default(),
            current: None,
            pending: Vec::new(),
        }
    }

    /// Moves to the next frame. Returns the actions scheduled for it,
    /// or `None` once the script is exhausted. Actions on zero-frame
    /// segments run on the next frame that is played.
    pub fn advance(&mut self) -> Option<Vec<PlayerAction>> {
        loop {
            let Some(segment) = self.script.segments.get(self.segment) else {
                if !self.pending.is_empty() {
                    warn!("Input script ended with {} actions never played", self.pending.len());
                    self.pending.clear();
                }
                return None;
            };
            if self.frame_in_segment < segment.frames {
                let mut actions = std::mem::take(&mut self.pending);
                if self.frame_in_segment == 0 {
                    actions.extend(segment.actions.iter().cloned());
                }
                self.current = Some(segment.clone());
                self.frame_in_segment += 1;
                return Some(actions);
            }
            if segment.frames == 0 {
                self.pending.extend(segment.actions.iter().cloned());
            }
            self.segment += 1;
            self.frame_in_segment = 0;
        }
    }

    pub fn is_finished(&self) -> bool {
        self.segment >= self.script.segments.len()
    }
}

impl InputSource for ScriptedInput {
    fn read_move_axis(&mut self) -> Vector2<f32> {
        self.current
            .as_ref()
            .map(|s| Vector2::new(s.move_axis[0], s.move_axis[1]))
            .unwrap_or_else(Vector2::zeros)
    }

    fn read_look_delta(&mut self) -> Vector2<f32> {
        self.current
            .as_ref()
            .map(|s| Vector2::new(s.look[0], s.look[1]))
            .unwrap_or_else(Vector2::zeros)
    }

    fn was_jump_pressed_this_frame(&mut self) -> bool {
        let held = self.current.as_ref().map(|s| s.jump).unwrap_or(false);
        self.jump.update(held)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_button_edge_fires_once_while_held() {
        let mut edge = ButtonEdge::default();
        assert!(edge.update(true));
        assert!(!edge.update(true));
        assert!(!edge.update(true));
        assert!(!edge.update(false));
        assert!(edge.update(true));
    }

    #[test]
    fn test_parse_input_script() {
        let toml = r#"
            [[segment]]
            frames = 2
            move = [0.0, 1.0]
            jump = true
            actions = [{ action = "interact" }, { action = "select_slot", slot = 1 }]

            [[segment]]
            frames = 1
            look = [4.0, -2.0]
        "#;
        let script: InputScript = toml::from_str(toml).unwrap();
        assert_eq!(script.segments.len(), 2);
        assert_eq!(script.frame_count(), 3);
        assert_eq!(script.segments[0].actions.len(), 2);
        assert_eq!(script.segments[1].look, [4.0, -2.0]);
    }

    #[test]
    fn test_scripted_input_playback() {
        let script = InputScript {
            segments: vec![
                InputSegment {
                    frames: 2,
                    move_axis: [0.0, 1.0],
                    look: [0.0, 0.0],
                    jump: true,
                    actions: vec![PlayerAction::Interact],
                },
                InputSegment {
                    frames: 1,
                    move_axis: [1.0, 0.0],
                    look: [0.0, 0.0],
                    jump: false,
                    actions: Vec::new(),
                },
            ],
        };
        let mut input = ScriptedInput::new(script);

        let actions = input.advance().unwrap();
        assert_eq!(actions.len(), 1);
        let frame = FrameInput::sample(&mut input, 0.1);
        assert_eq!(frame.move_axis, Vector2::new(0.0, 1.0));
        assert!(frame.jump_pressed);

        assert!(input.advance().unwrap().is_empty());
        assert!(!FrameInput::sample(&mut input, 0.1).jump_pressed, "held jump must not repeat");

        input.advance().unwrap();
        assert_eq!(FrameInput::sample(&mut input, 0.1).move_axis, Vector2::new(1.0, 0.0));

        assert!(input.advance().is_none());
        assert!(input.is_finished());
    }

    #[test]
    fn test_zero_frame_segment_actions_carry_to_next_frame() {
        let segment = |frames: u32, actions: Vec<PlayerAction>| InputSegment {
            frames,
            move_axis: [0.0, 0.0],
            look: [0.0, 0.0],
            jump: false,
            actions,
        };
        let script = InputScript {
            segments: vec![
                segment(1, Vec::new()),
                segment(0, vec![PlayerAction::SelectSlot { slot: 1 }]),
                segment(0, vec![PlayerAction::Interact]),
                segment(2, vec![PlayerAction::CloseMenu]),
                segment(0, vec![PlayerAction::GivePickaxe]),
            ],
        };
        assert_eq!(script.frame_count(), 3);
        let mut input = ScriptedInput::new(script);

        assert!(input.advance().unwrap().is_empty());
        assert_eq!(
            input.advance().unwrap(),
            vec![
                PlayerAction::SelectSlot { slot: 1 },
                PlayerAction::Interact,
                PlayerAction::CloseMenu
            ]
        );
        assert!(input.advance().unwrap().is_empty());
        // Nothing left to play the trailing actions on
        assert!(input.advance().is_none());
        assert!(input.advance().is_none());
    }
}
