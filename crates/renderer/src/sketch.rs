//! The lifecycle contract between the runner and user code.
//!
//! A [`Sketch`] gets `setup` once, then `update` and `draw` every frame.
//! Input arrives between frames through the `key_*`, `mouse_*`, and
//! `window_resized`/`files_dropped`/`got_message` hooks, all of which default
//! to doing nothing so a sketch only implements what it needs.

use std::collections::BTreeSet;
use std::path::PathBuf;

use anyhow::Result;
use winit::keyboard::{Key as WinitKey, NamedKey};

use crate::runtime::TimeSample;
use crate::stage::{Frame, Stage};

/// Per-frame facts handed to `update`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameInfo {
    pub time: TimeSample,
    pub width: u32,
    pub height: u32,
}

impl FrameInfo {
    /// Seconds since the runner started.
    pub fn elapsed(&self) -> f32 {
        self.time.seconds
    }
}

pub trait Sketch {
    /// Runs once after the window and GPU device exist, before the first frame.
    fn setup(&mut self, stage: &mut Stage<'_>) -> Result<()>;

    fn update(&mut self, _info: &FrameInfo) -> Result<()> {
        Ok(())
    }

    fn draw(&mut self, frame: &mut Frame) -> Result<()>;

    fn key_pressed(&mut self, _key: &KeyInput) {}

    fn key_released(&mut self, _key: &KeyInput) {}

    fn mouse_moved(&mut self, _x: f32, _y: f32) {}

    fn mouse_dragged(&mut self, _x: f32, _y: f32, _button: MouseButton) {}

    fn mouse_pressed(&mut self, _x: f32, _y: f32, _button: MouseButton) {}

    fn mouse_released(&mut self, _x: f32, _y: f32, _button: MouseButton) {}

    fn mouse_scrolled(&mut self, _x: f32, _y: f32, _delta_x: f32, _delta_y: f32) {}

    fn window_resized(&mut self, _width: u32, _height: u32) {}

    fn files_dropped(&mut self, _paths: &[PathBuf], _x: f32, _y: f32) {}

    fn got_message(&mut self, _message: &str) {}
}

/// Keys as reported to sketches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Char(char),
    Escape,
    Enter,
    Tab,
    Backspace,
    Delete,
    ArrowLeft,
    ArrowRight,
    ArrowUp,
    ArrowDown,
    Shift,
    Control,
    Alt,
    Super,
    Function(u8),
    Unidentified,
}

impl Key {
    pub(crate) fn from_winit(key: &WinitKey) -> Self {
        match key {
            WinitKey::Character(value) => {
                let mut chars = value.chars();
                match (chars.next(), chars.next()) {
                    (Some(ch), None) => Key::Char(ch),
                    _ => Key::Unidentified,
                }
            }
            WinitKey::Named(named) => match named {
                NamedKey::Space => Key::Char(' '),
                NamedKey::Escape => Key::Escape,
                NamedKey::Enter => Key::Enter,
                NamedKey::Tab => Key::Tab,
                NamedKey::Backspace => Key::Backspace,
                NamedKey::Delete => Key::Delete,
                NamedKey::ArrowLeft => Key::ArrowLeft,
                NamedKey::ArrowRight => Key::ArrowRight,
                NamedKey::ArrowUp => Key::ArrowUp,
                NamedKey::ArrowDown => Key::ArrowDown,
                NamedKey::Shift => Key::Shift,
                NamedKey::Control => Key::Control,
                NamedKey::Alt => Key::Alt,
                NamedKey::Super => Key::Super,
                NamedKey::F1 => Key::Function(1),
                NamedKey::F2 => Key::Function(2),
                NamedKey::F3 => Key::Function(3),
                NamedKey::F4 => Key::Function(4),
                NamedKey::F5 => Key::Function(5),
                NamedKey::F6 => Key::Function(6),
                NamedKey::F7 => Key::Function(7),
                NamedKey::F8 => Key::Function(8),
                NamedKey::F9 => Key::Function(9),
                NamedKey::F10 => Key::Function(10),
                NamedKey::F11 => Key::Function(11),
                NamedKey::F12 => Key::Function(12),
                _ => Key::Unidentified,
            },
            _ => Key::Unidentified,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyInput {
    pub key: Key,
    /// True when the press was generated by key auto-repeat.
    pub repeat: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    Back,
    Forward,
    Other(u16),
}

impl From<winit::event::MouseButton> for MouseButton {
    fn from(value: winit::event::MouseButton) -> Self {
        match value {
            winit::event::MouseButton::Left => MouseButton::Left,
            winit::event::MouseButton::Right => MouseButton::Right,
            winit::event::MouseButton::Middle => MouseButton::Middle,
            winit::event::MouseButton::Back => MouseButton::Back,
            winit::event::MouseButton::Forward => MouseButton::Forward,
            winit::event::MouseButton::Other(code) => MouseButton::Other(code),
        }
    }
}

/// Engine-level input, already translated from windowing events.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    KeyPressed(KeyInput),
    KeyReleased(KeyInput),
    MouseMoved { x: f32, y: f32 },
    MouseDragged { x: f32, y: f32, button: MouseButton },
    MousePressed { x: f32, y: f32, button: MouseButton },
    MouseReleased { x: f32, y: f32, button: MouseButton },
    MouseScrolled { x: f32, y: f32, delta_x: f32, delta_y: f32 },
    WindowResized { width: u32, height: u32 },
    FilesDropped { paths: Vec<PathBuf>, x: f32, y: f32 },
    Message(String),
}

/// Forwards an input event to the matching sketch hook.
pub fn dispatch<S: Sketch + ?Sized>(sketch: &mut S, event: &InputEvent) {
    match event {
        InputEvent::KeyPressed(key) => sketch.key_pressed(key),
        InputEvent::KeyReleased(key) => sketch.key_released(key),
        InputEvent::MouseMoved { x, y } => sketch.mouse_moved(*x, *y),
        InputEvent::MouseDragged { x, y, button } => sketch.mouse_dragged(*x, *y, *button),
        InputEvent::MousePressed { x, y, button } => sketch.mouse_pressed(*x, *y, *button),
        InputEvent::MouseReleased { x, y, button } => sketch.mouse_released(*x, *y, *button),
        InputEvent::MouseScrolled {
            x,
            y,
            delta_x,
            delta_y,
        } => sketch.mouse_scrolled(*x, *y, *delta_x, *delta_y),
        InputEvent::WindowResized { width, height } => sketch.window_resized(*width, *height),
        InputEvent::FilesDropped { paths, x, y } => sketch.files_dropped(paths, *x, *y),
        InputEvent::Message(message) => sketch.got_message(message),
    }
}

/// Tracks cursor position and held buttons so raw window events can be
/// turned into moved/dragged/pressed/released callbacks.
#[derive(Debug, Default)]
pub(crate) struct InputTracker {
    cursor: (f32, f32),
    held: BTreeSet<MouseButton>,
}

impl InputTracker {
    pub(crate) fn cursor_moved(&mut self, x: f32, y: f32) -> InputEvent {
        self.cursor = (x, y);
        match self.held.iter().next() {
            Some(&button) => InputEvent::MouseDragged { x, y, button },
            None => InputEvent::MouseMoved { x, y },
        }
    }

    pub(crate) fn button(&mut self, pressed: bool, button: MouseButton) -> Option<InputEvent> {
        let (x, y) = self.cursor;
        if pressed {
            self.held.insert(button);
            Some(InputEvent::MousePressed { x, y, button })
        } else if self.held.remove(&button) {
            Some(InputEvent::MouseReleased { x, y, button })
        } else {
            // Release for a press that happened outside the window.
            None
        }
    }

    pub(crate) fn scrolled(&self, delta_x: f32, delta_y: f32) -> InputEvent {
        let (x, y) = self.cursor;
        InputEvent::MouseScrolled {
            x,
            y,
            delta_x,
            delta_y,
        }
    }

    pub(crate) fn file_dropped(&self, path: PathBuf) -> InputEvent {
        let (x, y) = self.cursor;
        InputEvent::FilesDropped {
            paths: vec![path],
            x,
            y,
        }
    }

    /// Forget held buttons, e.g. when the window loses focus mid-drag.
    pub(crate) fn release_all(&mut self) {
        self.held.clear();
    }
}
