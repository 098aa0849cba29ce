use winit::event::{ElementState, MouseButton, MouseScrollDelta};
use winit::keyboard::{KeyCode, PhysicalKey};

/// Pixels of trackpad scroll that count as one wheel notch.
const PIXELS_PER_WHEEL_STEP: f32 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragMode {
    Orbit,
    Pan,
}

/// Pointer and keyboard state feeding the orbit controller.
#[derive(Default, Debug, Clone, Copy)]
pub struct InputState {
    pub orbit_left: bool,
    pub orbit_right: bool,
    pub orbit_up: bool,
    pub orbit_down: bool,
    drag: Option<DragMode>,
    cursor: Option<(f64, f64)>,
}

impl InputState {
    pub fn handle_key(&mut self, key: PhysicalKey, pressed: bool) {
        match key {
            PhysicalKey::Code(KeyCode::ArrowLeft) => self.orbit_left = pressed,
            PhysicalKey::Code(KeyCode::ArrowRight) => self.orbit_right = pressed,
            PhysicalKey::Code(KeyCode::ArrowUp) => self.orbit_up = pressed,
            PhysicalKey::Code(KeyCode::ArrowDown) => self.orbit_down = pressed,
            _ => {}
        }
    }

    /// Held arrow keys as (horizontal, vertical) in [-1, 1].
    pub fn key_orbit(&self) -> (f32, f32) {
        let axis = |negative: bool, positive: bool| f32::from(positive as u8) - f32::from(negative as u8);
        (
            axis(self.orbit_left, self.orbit_right),
            axis(self.orbit_up, self.orbit_down),
        )
    }

    /// Left button orbits, right button pans. A drag only starts when the
    /// press was not captured by the panel.
    pub fn handle_button(&mut self, button: MouseButton, state: ElementState, captured_by_ui: bool) {
        let mode = match button {
            MouseButton::Left => DragMode::Orbit,
            MouseButton::Right => DragMode::Pan,
            _ => return,
        };
        match state {
            ElementState::Pressed if !captured_by_ui => self.drag = Some(mode),
            ElementState::Pressed => {}
            ElementState::Released if self.drag == Some(mode) => self.drag = None,
            ElementState::Released => {}
        }
    }

    /// Records the cursor and returns the active drag with its delta in
    /// physical pixels.
    pub fn cursor_moved(&mut self, x: f64, y: f64) -> Option<(DragMode, f32, f32)> {
        let previous = self.cursor.replace((x, y));
        let mode = self.drag?;
        let (px, py) = previous?;
        Some((mode, (x - px) as f32, (y - py) as f32))
    }

    pub fn cursor_left(&mut self) {
        self.cursor = None;
        self.drag = None;
    }
}

/// Positive values scroll away from the user, i.e. zoom in.
pub fn wheel_steps(delta: MouseScrollDelta) -> f32 {
    match delta {
        MouseScrollDelta::LineDelta(_, y) => y,
        MouseScrollDelta::PixelDelta(position) => position.y as f32 / PIXELS_PER_WHEEL_STEP,
    }
}
