//! Keyboard and mouse state for the orbit camera and the demo hotkeys.

use glam::Vec2;
use std::collections::HashSet;
use winit::event::{ElementState, MouseButton, MouseScrollDelta};
use winit::keyboard::KeyCode;

/// Pixels of trackpad scroll that count as one wheel line.
const PIXELS_PER_LINE: f32 = 40.0;

/// Input gathered between frames. Events accumulate; [`InputState::begin_frame`]
/// publishes them for the frame about to be simulated.
#[derive(Debug, Default)]
pub struct InputState {
    keys_held: HashSet<KeyCode>,
    /// Keys pressed since the last `begin_frame`.
    pending_pressed: HashSet<KeyCode>,
    /// Keys pressed during the previous event batch, readable this frame.
    keys_pressed: HashSet<KeyCode>,

    mouse_held: HashSet<MouseButton>,
    accumulated_delta: Vec2,
    mouse_delta: Vec2,

    accumulated_scroll: f32,
    scroll: f32,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish everything gathered since the previous call. Call once at the start of each frame.
    pub fn begin_frame(&mut self) {
        self.keys_pressed = std::mem::take(&mut self.pending_pressed);
        self.mouse_delta = self.accumulated_delta;
        self.accumulated_delta = Vec2::ZERO;
        self.scroll = self.accumulated_scroll;
        self.accumulated_scroll = 0.0;
    }

    pub fn process_keyboard(&mut self, key: KeyCode, state: ElementState) {
        match state {
            ElementState::Pressed => {
                // Key repeat reports Pressed again while held; only the first counts.
                if self.keys_held.insert(key) {
                    self.pending_pressed.insert(key);
                }
            }
            ElementState::Released => {
                self.keys_held.remove(&key);
            }
        }
    }

    pub fn process_mouse_button(&mut self, button: MouseButton, state: ElementState) {
        match state {
            ElementState::Pressed => {
                self.mouse_held.insert(button);
            }
            ElementState::Released => {
                self.mouse_held.remove(&button);
            }
        }
    }

    /// Raw device motion, in unaccelerated pixels.
    pub fn process_mouse_motion(&mut self, delta: (f64, f64)) {
        self.accumulated_delta.x += delta.0 as f32;
        self.accumulated_delta.y += delta.1 as f32;
    }

    /// Wheel input in lines; positive scrolls away from the user.
    pub fn process_scroll(&mut self, delta: MouseScrollDelta) {
        self.accumulated_scroll += match delta {
            MouseScrollDelta::LineDelta(_, y) => y,
            MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / PIXELS_PER_LINE,
        };
    }

    /// Whether `key` went down during the event batch before this frame.
    pub fn is_key_pressed(&self, key: KeyCode) -> bool {
        self.keys_pressed.contains(&key)
    }

    pub fn is_mouse_held(&self, button: MouseButton) -> bool {
        self.mouse_held.contains(&button)
    }

    /// Mouse motion while the left button is held; zero otherwise.
    pub fn drag_delta(&self) -> Vec2 {
        if self.is_mouse_held(MouseButton::Left) {
            self.mouse_delta
        } else {
            Vec2::ZERO
        }
    }

    /// Mouse motion while the right or middle button is held.
    pub fn pan_delta(&self) -> Vec2 {
        if self.is_mouse_held(MouseButton::Right) || self.is_mouse_held(MouseButton::Middle) {
            self.mouse_delta
        } else {
            Vec2::ZERO
        }
    }

    pub fn scroll(&self) -> f32 {
        self.scroll
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A held key with OS repeat still reports a single press.
    #[test]
    fn repeat_presses_count_once() {
        let mut input = InputState::new();
        input.process_keyboard(KeyCode::KeyP, ElementState::Pressed);
        input.process_keyboard(KeyCode::KeyP, ElementState::Pressed);
        input.begin_frame();
        assert!(input.is_key_pressed(KeyCode::KeyP));
        assert!(input.keys_held.contains(&KeyCode::KeyP));

        input.process_keyboard(KeyCode::KeyP, ElementState::Pressed);
        input.begin_frame();
        assert!(!input.is_key_pressed(KeyCode::KeyP));
    }

    /// A press and release between two frames is still seen once.
    #[test]
    fn tap_between_frames_is_not_lost() {
        let mut input = InputState::new();
        input.process_keyboard(KeyCode::Escape, ElementState::Pressed);
        input.process_keyboard(KeyCode::Escape, ElementState::Released);
        input.begin_frame();
        assert!(input.is_key_pressed(KeyCode::Escape));
        assert!(!input.keys_held.contains(&KeyCode::Escape));
    }

    #[test]
    fn drag_requires_left_button() {
        let mut input = InputState::new();
        input.process_mouse_motion((10.0, -4.0));
        input.begin_frame();
        assert_eq!(input.drag_delta(), Vec2::ZERO);

        input.process_mouse_button(MouseButton::Left, ElementState::Pressed);
        input.process_mouse_motion((10.0, -4.0));
        input.process_mouse_motion((2.0, 1.0));
        input.begin_frame();
        assert_eq!(input.drag_delta(), Vec2::new(12.0, -3.0));

        input.begin_frame();
        assert_eq!(input.drag_delta(), Vec2::ZERO);
    }

    #[test]
    fn pan_uses_right_or_middle_button() {
        let mut input = InputState::new();
        input.process_mouse_button(MouseButton::Left, ElementState::Pressed);
        input.process_mouse_motion((3.0, 4.0));
        input.begin_frame();
        assert_eq!(input.pan_delta(), Vec2::ZERO);

        input.process_mouse_button(MouseButton::Left, ElementState::Released);
        input.process_mouse_button(MouseButton::Right, ElementState::Pressed);
        input.process_mouse_motion((3.0, 4.0));
        input.begin_frame();
        assert_eq!(input.pan_delta(), Vec2::new(3.0, 4.0));
        assert_eq!(input.drag_delta(), Vec2::ZERO);

        input.process_mouse_button(MouseButton::Right, ElementState::Released);
        input.process_mouse_button(MouseButton::Middle, ElementState::Pressed);
        input.process_mouse_motion((-1.0, 0.0));
        input.begin_frame();
        assert_eq!(input.pan_delta(), Vec2::new(-1.0, 0.0));
    }

    #[test]
    fn pixel_scroll_converts_to_lines() {
        let mut input = InputState::new();
        input.process_scroll(MouseScrollDelta::LineDelta(0.0, 1.0));
        input.process_scroll(MouseScrollDelta::PixelDelta(winit::dpi::PhysicalPosition::new(0.0, 80.0)));
        input.begin_frame();
        assert!((input.scroll() - 3.0).abs() < 1e-6);
    }
}
