// Input state tracking for keyboard and mouse
// Abstracts winit events into a queryable per-frame snapshot and the
// ControlState the user vessel's helm consumes.

use std::collections::HashSet;
use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

use super::helm::ControlState;

pub struct InputState {
    // Keyboard
    keys_held: HashSet<KeyCode>,

    // Mouse
    pub mouse_position: (f32, f32),
    mouse_prev_position: (f32, f32),
    pub mouse_delta: (f32, f32),
    orbiting: bool,

    // Scroll: accumulated vertical scroll this frame, reset in end_frame()
    pub scroll_delta: f32,
}

impl InputState {
    pub fn new() -> Self {
        Self {
            keys_held: HashSet::new(),
            mouse_position: (0.0, 0.0),
            mouse_prev_position: (0.0, 0.0),
            mouse_delta: (0.0, 0.0),
            orbiting: false,
            scroll_delta: 0.0,
        }
    }

    /// Feed a winit WindowEvent into the input state.
    ///
    /// Returns the new `ControlState` for every press, auto-repeat or release
    /// of a steering key. Each one counts as a separate input event for the
    /// helm's throttle, so holding W keeps opening it up.
    pub fn process_event(&mut self, event: &WindowEvent) -> Option<ControlState> {
        match event {
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(key) = event.physical_key {
                    return self.apply_key(key, event.state);
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.mouse_position = (position.x as f32, position.y as f32);
            }
            WindowEvent::MouseInput { state, button: MouseButton::Left, .. } => {
                self.orbiting = *state == ElementState::Pressed;
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let y = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 100.0,
                };
                self.scroll_delta += y;
            }
            _ => {}
        }
        None
    }

    /// Record a key transition. Returns the control state if `key` steers.
    pub fn apply_key(&mut self, key: KeyCode, state: ElementState) -> Option<ControlState> {
        match state {
            ElementState::Pressed => { self.keys_held.insert(key); }
            ElementState::Released => { self.keys_held.remove(&key); }
        }
        is_steering_key(key).then(|| self.controls())
    }

    /// Call once per frame after update() and render() have consumed input.
    /// Resets per-frame accumulators.
    pub fn end_frame(&mut self) {
        self.scroll_delta = 0.0;
        self.mouse_delta = (
            self.mouse_position.0 - self.mouse_prev_position.0,
            self.mouse_position.1 - self.mouse_prev_position.1,
        );
        self.mouse_prev_position = self.mouse_position;
    }

    pub fn is_key_held(&self, key: KeyCode) -> bool {
        self.keys_held.contains(&key)
    }

    /// True while the left mouse button is down (camera orbit drag).
    pub fn is_orbiting(&self) -> bool {
        self.orbiting
    }

    /// Current steering keys. WASD and the arrow keys are interchangeable.
    pub fn controls(&self) -> ControlState {
        let held = |a, b| self.is_key_held(a) || self.is_key_held(b);
        ControlState {
            left: held(KeyCode::KeyA, KeyCode::ArrowLeft),
            up: held(KeyCode::KeyW, KeyCode::ArrowUp),
            right: held(KeyCode::KeyD, KeyCode::ArrowRight),
            down: held(KeyCode::KeyS, KeyCode::ArrowDown),
        }
    }
}

fn is_steering_key(key: KeyCode) -> bool {
    matches!(
        key,
        KeyCode::KeyW | KeyCode::KeyA | KeyCode::KeyS | KeyCode::KeyD
            | KeyCode::ArrowUp | KeyCode::ArrowLeft | KeyCode::ArrowDown | KeyCode::ArrowRight
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_steering_keys_map_to_controls() {
        let mut input = InputState::new();
        let controls = input.apply_key(KeyCode::KeyW, ElementState::Pressed);
        assert_eq!(controls, Some(ControlState::AHEAD));

        let controls = input.apply_key(KeyCode::ArrowRight, ElementState::Pressed);
        assert_eq!(controls, Some(ControlState { right: true, ..ControlState::AHEAD }));

        let controls = input.apply_key(KeyCode::KeyW, ElementState::Released);
        assert_eq!(controls, Some(ControlState { right: true, ..ControlState::NONE }));
    }

    #[test]
    fn test_auto_repeat_is_reported_again() {
        let mut input = InputState::new();
        assert!(input.apply_key(KeyCode::KeyW, ElementState::Pressed).is_some());
        assert_eq!(
            input.apply_key(KeyCode::KeyW, ElementState::Pressed),
            Some(ControlState::AHEAD)
        );
    }

    #[test]
    fn test_other_keys_are_not_controls() {
        let mut input = InputState::new();
        assert_eq!(input.apply_key(KeyCode::F3, ElementState::Pressed), None);
        assert!(input.is_key_held(KeyCode::F3));
        assert_eq!(input.controls(), ControlState::NONE);
    }

    #[test]
    fn test_arrow_and_letter_keys_overlap() {
        let mut input = InputState::new();
        input.apply_key(KeyCode::KeyA, ElementState::Pressed);
        input.apply_key(KeyCode::ArrowLeft, ElementState::Pressed);
        input.apply_key(KeyCode::KeyA, ElementState::Released);
        assert!(input.controls().left);
    }
}
