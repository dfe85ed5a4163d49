use winit::event::{DeviceEvent, ElementState, MouseButton, MouseScrollDelta, WindowEvent};

#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    CursorPos { x: f32, y: f32 },
    MouseButton { button: MouseButton, pressed: bool },
    MouseMove { dx: f32, dy: f32 },
    Wheel { delta: f32 },
    Other,
}

impl InputEvent {
    pub fn from_window_event(ev: &WindowEvent) -> Self {
        match ev {
            WindowEvent::CursorMoved { position, .. } => {
                InputEvent::CursorPos { x: position.x as f32, y: position.y as f32 }
            }
            WindowEvent::MouseInput { state, button, .. } => {
                InputEvent::MouseButton { button: *button, pressed: *state == ElementState::Pressed }
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let d = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(p) => p.y as f32 / 40.0,
                };
                InputEvent::Wheel { delta: d }
            }
            _ => InputEvent::Other,
        }
    }

    pub fn from_device_event(ev: &DeviceEvent) -> Self {
        match ev {
            DeviceEvent::MouseMotion { delta: (dx, dy) } => {
                InputEvent::MouseMove { dx: *dx as f32, dy: *dy as f32 }
            }
            _ => InputEvent::Other,
        }
    }
}

/// Per-frame pointer state: accumulated deltas plus click edge detection.
#[derive(Default)]
pub struct Input {
    cursor_pos: Option<(f32, f32)>,
    mouse_delta: (f32, f32),
    wheel: f32,
    left_pressed: bool,
    left_clicked: bool,
}

impl Input {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, ev: InputEvent) {
        match ev {
            InputEvent::CursorPos { x, y } => self.cursor_pos = Some((x, y)),
            InputEvent::MouseButton { button: MouseButton::Left, pressed } => {
                if pressed {
                    self.left_clicked = true;
                }
                self.left_pressed = pressed;
            }
            InputEvent::MouseMove { dx, dy } => {
                self.mouse_delta.0 += dx;
                self.mouse_delta.1 += dy;
            }
            InputEvent::Wheel { delta } => self.wheel += delta,
            _ => {}
        }
    }

    pub fn clear_frame(&mut self) {
        self.mouse_delta = (0.0, 0.0);
        self.wheel = 0.0;
        self.left_clicked = false;
    }

    pub fn cursor_position(&self) -> Option<(f32, f32)> {
        self.cursor_pos
    }

    pub fn left_held(&self) -> bool {
        self.left_pressed
    }

    /// Press edge since the last `clear_frame`.
    pub fn take_left_click(&mut self) -> bool {
        let was = self.left_clicked;
        self.left_clicked = false;
        was
    }

    pub fn mouse_delta(&self) -> (f32, f32) {
        self.mouse_delta
    }

    pub fn wheel_delta(&self) -> f32 {
        self.wheel
    }
}
