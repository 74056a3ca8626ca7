//! # Input State
//!
//! Keyboard state tracking for the camera controls. Events are taken in as
//! raw pressed/released edges; each frame the engine reads the derived
//! per-key state, and the frame boundary promotes `Pressed` to `Held`.

use std::collections::HashSet;

use winit::{
    event::{ElementState, KeyEvent, WindowEvent},
    keyboard::{KeyCode, PhysicalKey},
};

/// The per-frame state of a single key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyState {
    /// Key is not pressed
    NotPressed,
    /// Key was just pressed this frame
    Pressed,
    /// Key has been held down for multiple frames
    Held,
    /// Key was just released this frame
    Released,
}

impl KeyState {
    /// Derives the state from whether the key was down last frame and is
    /// down now.
    pub fn from_raw_states(previous: bool, current: bool) -> Self {
        match (previous, current) {
            (false, true) => KeyState::Pressed,
            (true, true) => KeyState::Held,
            (true, false) => KeyState::Released,
            (false, false) => KeyState::NotPressed,
        }
    }

    /// Whether the key is down, freshly or held.
    pub fn is_active(&self) -> bool {
        matches!(self, KeyState::Pressed | KeyState::Held)
    }
}

/// Tracks which keys are down across frame boundaries.
pub struct InputState {
    previous: HashSet<KeyCode>,
    current: HashSet<KeyCode>,
}

impl InputState {
    pub fn new() -> Self {
        InputState {
            previous: HashSet::new(),
            current: HashSet::new(),
        }
    }

    /// Records the keyboard edges carried by a window event. Non-keyboard
    /// events are ignored.
    pub fn intake_input(&mut self, event: &WindowEvent) {
        if let WindowEvent::KeyboardInput {
            event:
                KeyEvent {
                    state,
                    physical_key: PhysicalKey::Code(code),
                    ..
                },
            ..
        } = event
        {
            match state {
                ElementState::Pressed => {
                    self.current.insert(*code);
                }
                ElementState::Released => {
                    self.current.remove(code);
                }
            }
        }
    }

    /// The derived state of `key` for the current frame.
    pub fn key_state(&self, key: KeyCode) -> KeyState {
        KeyState::from_raw_states(self.previous.contains(&key), self.current.contains(&key))
    }

    /// Whether `key` is down this frame.
    pub fn is_active(&self, key: KeyCode) -> bool {
        self.key_state(key).is_active()
    }

    /// Whether `key` went down this frame and was up the frame before.
    pub fn is_just_pressed(&self, key: KeyCode) -> bool {
        self.key_state(key) == KeyState::Pressed
    }

    /// Closes the frame, so keys still down next read as `Held`.
    pub fn finish_frame(&mut self) {
        self.previous = self.current.clone();
    }

    /// Drops all tracked keys, used when the window loses focus and release
    /// events will never arrive.
    pub fn reset(&mut self) {
        self.previous.clear();
        self.current.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_state_transitions() {
        assert_eq!(KeyState::from_raw_states(false, true), KeyState::Pressed);
        assert_eq!(KeyState::from_raw_states(true, true), KeyState::Held);
        assert_eq!(KeyState::from_raw_states(true, false), KeyState::Released);
        assert_eq!(
            KeyState::from_raw_states(false, false),
            KeyState::NotPressed
        );
    }

    #[test]
    fn pressed_key_becomes_held_after_the_frame_boundary() {
        let mut input = InputState::new();
        input.current.insert(KeyCode::KeyQ);

        assert!(input.is_just_pressed(KeyCode::KeyQ));
        assert!(input.is_active(KeyCode::KeyQ));

        input.finish_frame();
        assert!(!input.is_just_pressed(KeyCode::KeyQ));
        assert_eq!(input.key_state(KeyCode::KeyQ), KeyState::Held);
    }

    #[test]
    fn reset_releases_everything() {
        let mut input = InputState::new();
        input.current.insert(KeyCode::KeyW);
        input.finish_frame();

        input.reset();
        assert_eq!(input.key_state(KeyCode::KeyW), KeyState::NotPressed);
    }
}
