//! Input handling (winit -> engine state).
//!
//! `Windowing` forwards window events here; `UserInput` folds them into an `InputState` and
//! turns that into camera deltas and one-shot scene commands once per frame.

use std::collections::HashSet;

use winit::event::{ElementState, MouseScrollDelta, WindowEvent};
use winit::keyboard::{Key, NamedKey, SmolStr};

/// Degrees of yaw/pitch per frame while an arrow key is held.
pub const ORBIT_DEGREES_PER_FRAME: f32 = 1.5;

/// Zoom distance per frame while PageUp/PageDown is held.
pub const ZOOM_PER_FRAME: f32 = 60.0;

/// Zoom distance per wheel line.
pub const ZOOM_PER_WHEEL_LINE: f32 = 250.0;

/// Wheel pixels that count as one line on touchpads.
const PIXELS_PER_WHEEL_LINE: f32 = 40.0;

/// Snapshot of user input.
#[derive(Default, Debug, Clone)]
pub struct InputState {
    pub keys_down: HashSet<Key>,
    pub keys_pressed: HashSet<Key>,
    pub keys_released: HashSet<Key>,

    /// Accumulated wheel lines since last `begin_frame` (positive = away from the user).
    pub wheel_lines: f32,
}

impl InputState {
    /// Clears per-frame transition state.
    pub fn begin_frame(&mut self) {
        self.keys_pressed.clear();
        self.keys_released.clear();
        self.wheel_lines = 0.0;
    }

    #[inline]
    pub fn key_down(&self, key: &Key) -> bool {
        self.keys_down.contains(key)
    }

    #[inline]
    pub fn key_pressed(&self, key: &Key) -> bool {
        self.keys_pressed.contains(key)
    }

    #[inline]
    pub fn key_released(&self, key: &Key) -> bool {
        self.keys_released.contains(key)
    }

    fn named_down(&self, key: NamedKey) -> bool {
        self.key_down(&Key::Named(key))
    }

    fn char_pressed(&self, c: &str) -> bool {
        self.keys_pressed.iter().any(|key| match key {
            Key::Character(s) => s.eq_ignore_ascii_case(c),
            _ => false,
        })
    }
}

/// Per-frame camera orbit change, in the units `CameraState::update` takes.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CameraDelta {
    pub yaw_degrees: f32,
    pub pitch_degrees: f32,
    pub zoom: f32,
}

impl CameraDelta {
    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }
}

/// One-shot actions triggered by a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneCommand {
    StartVideo,
    ToggleGameOver,
    Quit,
}

/// Stateful input event processor.
#[derive(Default, Debug, Clone)]
pub struct UserInput {
    state: InputState,
}

impl UserInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &InputState {
        &self.state
    }

    pub fn begin_frame(&mut self) {
        self.state.begin_frame();
    }

    /// Feed a winit event into this input handler.
    ///
    /// Returns `true` if the event was recognized/consumed as input.
    pub fn handle_window_event(&mut self, event: &WindowEvent) -> bool {
        match event {
            WindowEvent::KeyboardInput { event, .. } => {
                self.handle_key(event.logical_key.clone(), event.state);
                true
            }

            WindowEvent::MouseWheel { delta, .. } => {
                self.state.wheel_lines += match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / PIXELS_PER_WHEEL_LINE,
                };
                true
            }

            _ => false,
        }
    }

    pub fn handle_key(&mut self, key: Key, state: ElementState) {
        match state {
            ElementState::Pressed => {
                let was_down = self.state.keys_down.contains(&key);
                self.state.keys_down.insert(key.clone());
                if !was_down {
                    self.state.keys_pressed.insert(key);
                }
            }
            ElementState::Released => {
                self.state.keys_down.remove(&key);
                self.state.keys_released.insert(key);
            }
        }
    }

    /// Orbit change for this frame: arrows yaw/pitch, PageUp/PageDown and the wheel zoom.
    pub fn camera_delta(&self) -> CameraDelta {
        let s = &self.state;
        let axis = |negative: NamedKey, positive: NamedKey| {
            let mut v = 0.0;
            if s.named_down(negative) {
                v -= 1.0;
            }
            if s.named_down(positive) {
                v += 1.0;
            }
            v
        };

        CameraDelta {
            yaw_degrees: axis(NamedKey::ArrowLeft, NamedKey::ArrowRight) * ORBIT_DEGREES_PER_FRAME,
            pitch_degrees: axis(NamedKey::ArrowDown, NamedKey::ArrowUp) * ORBIT_DEGREES_PER_FRAME,
            // Wheel away from the user and PageUp both move closer.
            zoom: axis(NamedKey::PageUp, NamedKey::PageDown) * ZOOM_PER_FRAME
                - s.wheel_lines * ZOOM_PER_WHEEL_LINE,
        }
    }

    /// Commands whose key went down this frame.
    pub fn commands(&self) -> Vec<SceneCommand> {
        let s = &self.state;
        let mut commands = Vec::new();
        if s.char_pressed("v") {
            commands.push(SceneCommand::StartVideo);
        }
        if s.char_pressed("g") {
            commands.push(SceneCommand::ToggleGameOver);
        }
        if s.key_pressed(&Key::Named(NamedKey::Escape)) {
            commands.push(SceneCommand::Quit);
        }
        commands
    }
}

/// `Key::Character` for a single character, as winit reports it.
pub fn character_key(c: &str) -> Key {
    Key::Character(SmolStr::new(c))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn press(input: &mut UserInput, key: Key) {
        input.handle_key(key, ElementState::Pressed);
    }

    #[test]
    fn held_arrows_orbit_every_frame() {
        let mut input = UserInput::new();
        press(&mut input, Key::Named(NamedKey::ArrowRight));
        press(&mut input, Key::Named(NamedKey::ArrowDown));

        for _ in 0..3 {
            let delta = input.camera_delta();
            assert_eq!(delta.yaw_degrees, ORBIT_DEGREES_PER_FRAME);
            assert_eq!(delta.pitch_degrees, -ORBIT_DEGREES_PER_FRAME);
            assert_eq!(delta.zoom, 0.0);
            input.begin_frame();
        }
    }

    #[test]
    fn opposite_keys_cancel() {
        let mut input = UserInput::new();
        press(&mut input, Key::Named(NamedKey::ArrowLeft));
        press(&mut input, Key::Named(NamedKey::ArrowRight));
        assert!(input.camera_delta().is_zero());
    }

    #[test]
    fn wheel_zooms_for_one_frame_only() {
        let mut input = UserInput::new();
        input.state.wheel_lines = 2.0;
        assert_relative_eq!(input.camera_delta().zoom, -2.0 * ZOOM_PER_WHEEL_LINE);

        input.begin_frame();
        assert!(input.camera_delta().is_zero());
    }

    #[test]
    fn page_keys_zoom() {
        let mut input = UserInput::new();
        press(&mut input, Key::Named(NamedKey::PageDown));
        assert_eq!(input.camera_delta().zoom, ZOOM_PER_FRAME);

        input.handle_key(Key::Named(NamedKey::PageDown), ElementState::Released);
        press(&mut input, Key::Named(NamedKey::PageUp));
        assert_eq!(input.camera_delta().zoom, -ZOOM_PER_FRAME);
    }

    #[test]
    fn commands_fire_once_per_press() {
        let mut input = UserInput::new();
        press(&mut input, character_key("V"));
        press(&mut input, character_key("g"));
        press(&mut input, Key::Named(NamedKey::Escape));
        assert_eq!(
            input.commands(),
            vec![
                SceneCommand::StartVideo,
                SceneCommand::ToggleGameOver,
                SceneCommand::Quit
            ]
        );

        // Key repeat while held does not re-trigger.
        input.begin_frame();
        press(&mut input, character_key("V"));
        assert!(input.commands().is_empty());
        assert!(input.state().key_down(&character_key("V")));
    }

    #[test]
    fn release_is_tracked() {
        let mut input = UserInput::new();
        press(&mut input, character_key("g"));
        input.handle_key(character_key("g"), ElementState::Released);
        assert!(!input.state().key_down(&character_key("g")));
        assert!(input.state().key_released(&character_key("g")));
    }
}
