//! winit window as a pollable event source
//!
//! The dispatcher waits on the event loop's own descriptor and calls
//! [`EventSource::drain`], which pumps winit with a zero timeout and turns
//! whatever arrived into [`InputEvent`]s.

use std::os::fd::{AsFd, BorrowedFd};
use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, Event, MouseButton, MouseScrollDelta, WindowEvent};
use winit::event_loop::EventLoop;
use winit::keyboard::{Key as WinitKey, KeyLocation, ModifiersState, NamedKey as WinitNamed};
use winit::platform::pump_events::{EventLoopExtPumpEvents, PumpStatus};
use winit::window::{Window, WindowBuilder, WindowId};

use crate::dispatcher::EventSource;
use crate::event::{Button, InputEvent};
use crate::input::{Key, KeyEvent, KeypadKey, Modifiers, NamedKey};

#[derive(Debug, Error)]
pub enum WindowError {
    #[error("failed to create event loop: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
    #[error("failed to create window: {0}")]
    Os(#[from] winit::error::OsError),
}

pub struct WinitSource {
    event_loop: EventLoop<()>,
    window: Arc<Window>,
    translator: Translator,
}

impl WinitSource {
    pub fn new(title: &str, size: PhysicalSize<u32>) -> Result<Self, WindowError> {
        let event_loop = EventLoop::new()?;
        let window = WindowBuilder::new()
            .with_title(title)
            .with_inner_size(size)
            .build(&event_loop)?;
        let window = Arc::new(window);
        log::debug!("Created {}x{} window", size.width, size.height);
        Ok(Self {
            translator: Translator::new(window.id()),
            event_loop,
            window,
        })
    }

    pub fn window(&self) -> Arc<Window> {
        self.window.clone()
    }
}

impl EventSource for WinitSource {
    fn fd(&self) -> BorrowedFd<'_> {
        self.event_loop.as_fd()
    }

    fn drain(&mut self, events: &mut Vec<InputEvent>) {
        let translator = &mut self.translator;
        let status = self.event_loop.pump_events(Some(Duration::ZERO), |event, _| {
            if let Event::WindowEvent { window_id, event } = event {
                translator.translate(window_id, event, events);
            }
        });
        if let PumpStatus::Exit(code) = status {
            log::debug!("Event loop exited with {}", code);
            events.push(InputEvent::Destroy);
        }
    }

    fn set_title(&mut self, title: &str) {
        self.window.set_title(title);
    }
}

/// Per-window state needed to turn winit events into [`InputEvent`]s
struct Translator {
    window_id: WindowId,
    modifiers: ModifiersState,
    cursor: (f64, f64),
}

impl Translator {
    fn new(window_id: WindowId) -> Self {
        Self {
            window_id,
            modifiers: ModifiersState::empty(),
            cursor: (0.0, 0.0),
        }
    }

    fn translate(&mut self, window_id: WindowId, event: WindowEvent, out: &mut Vec<InputEvent>) {
        if window_id != self.window_id {
            return;
        }
        match event {
            WindowEvent::CloseRequested | WindowEvent::Destroyed => out.push(InputEvent::Destroy),
            WindowEvent::RedrawRequested | WindowEvent::Occluded(false) => out.push(InputEvent::Expose),
            WindowEvent::Resized(size) => out.push(InputEvent::Resize {
                width: size.width,
                height: size.height,
            }),
            WindowEvent::Focused(focused) => out.push(InputEvent::Focus(focused)),
            WindowEvent::ModifiersChanged(modifiers) => self.modifiers = modifiers.state(),
            WindowEvent::KeyboardInput { event, .. } => {
                if event.state != ElementState::Pressed {
                    return;
                }
                let mods = modifiers(self.modifiers);
                let numpad = event.location == KeyLocation::Numpad;
                let key = match &event.logical_key {
                    WinitKey::Named(named) => map_named(*named, numpad),
                    WinitKey::Character(c) => {
                        // with Ctrl the layout text is already a control character
                        let text = match &event.text {
                            Some(text) if !mods.ctrl => text.as_str(),
                            _ => c.as_str(),
                        };
                        Some(map_character(text, numpad))
                    }
                    _ => event.text.as_ref().map(|text| Key::Text(text.to_string())),
                };
                match key {
                    Some(key) => out.push(InputEvent::Key(KeyEvent::new(key, mods))),
                    None => log::trace!("Unmapped key {:?}", event.logical_key),
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor = (position.x, position.y);
                out.push(InputEvent::Motion {
                    x: position.x,
                    y: position.y,
                });
            }
            WindowEvent::MouseInput { state, button, .. } => {
                let Some(button) = button_number(button) else {
                    return;
                };
                let (x, y) = self.cursor;
                let time = Instant::now();
                out.push(match state {
                    ElementState::Pressed => InputEvent::ButtonPress { button, x, y, time },
                    ElementState::Released => InputEvent::ButtonRelease { button, x, y, time },
                });
            }
            WindowEvent::MouseWheel { delta, .. } => {
                if let Some(button) = wheel_button(delta) {
                    let (x, y) = self.cursor;
                    out.push(InputEvent::ButtonPress {
                        button,
                        x,
                        y,
                        time: Instant::now(),
                    });
                }
            }
            _ => {}
        }
    }
}

fn modifiers(state: ModifiersState) -> Modifiers {
    Modifiers {
        shift: state.shift_key(),
        ctrl: state.control_key(),
        alt: state.alt_key(),
    }
}

fn map_named(key: WinitNamed, numpad: bool) -> Option<Key> {
    let named = match key {
        WinitNamed::Enter if numpad => NamedKey::Keypad(KeypadKey::Enter),
        WinitNamed::Enter => NamedKey::Return,
        WinitNamed::Backspace => NamedKey::Backspace,
        WinitNamed::Tab => NamedKey::Tab,
        WinitNamed::Escape => NamedKey::Escape,
        WinitNamed::Insert => NamedKey::Insert,
        WinitNamed::Delete => NamedKey::Delete,
        WinitNamed::Home => NamedKey::Home,
        WinitNamed::End => NamedKey::End,
        WinitNamed::ArrowUp => NamedKey::Up,
        WinitNamed::ArrowDown => NamedKey::Down,
        WinitNamed::ArrowLeft => NamedKey::Left,
        WinitNamed::ArrowRight => NamedKey::Right,
        WinitNamed::PageUp => NamedKey::PageUp,
        WinitNamed::PageDown => NamedKey::PageDown,
        WinitNamed::Space => return Some(Key::Text(" ".to_string())),
        WinitNamed::Shift
        | WinitNamed::Control
        | WinitNamed::Alt
        | WinitNamed::AltGraph
        | WinitNamed::Super
        | WinitNamed::Meta
        | WinitNamed::Hyper
        | WinitNamed::CapsLock
        | WinitNamed::NumLock
        | WinitNamed::ScrollLock => return Some(Key::Modifier),
        other => return function_key(other).map(|n| Key::Named(NamedKey::F(n))),
    };
    Some(Key::Named(named))
}

fn function_key(key: WinitNamed) -> Option<u8> {
    const KEYS: [WinitNamed; 20] = [
        WinitNamed::F1,
        WinitNamed::F2,
        WinitNamed::F3,
        WinitNamed::F4,
        WinitNamed::F5,
        WinitNamed::F6,
        WinitNamed::F7,
        WinitNamed::F8,
        WinitNamed::F9,
        WinitNamed::F10,
        WinitNamed::F11,
        WinitNamed::F12,
        WinitNamed::F13,
        WinitNamed::F14,
        WinitNamed::F15,
        WinitNamed::F16,
        WinitNamed::F17,
        WinitNamed::F18,
        WinitNamed::F19,
        WinitNamed::F20,
    ];
    KEYS.iter().position(|k| *k == key).map(|i| i as u8 + 1)
}

fn map_character(text: &str, numpad: bool) -> Key {
    if numpad {
        let keypad = match text {
            "+" => Some(KeypadKey::Plus),
            "-" => Some(KeypadKey::Minus),
            "*" => Some(KeypadKey::Star),
            "/" => Some(KeypadKey::Slash),
            "." => Some(KeypadKey::Dot),
            "," => Some(KeypadKey::Comma),
            "=" => Some(KeypadKey::Equal),
            _ => match text.as_bytes() {
                [d @ b'0'..=b'9'] => Some(KeypadKey::Digit(d - b'0')),
                _ => None,
            },
        };
        if let Some(keypad) = keypad {
            return Key::Named(NamedKey::Keypad(keypad));
        }
    }
    Key::Text(text.to_string())
}

fn button_number(button: MouseButton) -> Option<Button> {
    match button {
        MouseButton::Left => Some(1),
        MouseButton::Middle => Some(2),
        MouseButton::Right => Some(3),
        _ => None,
    }
}

fn wheel_button(delta: MouseScrollDelta) -> Option<Button> {
    let dy = match delta {
        MouseScrollDelta::LineDelta(_, y) => y as f64,
        MouseScrollDelta::PixelDelta(position) => position.y,
    };
    if dy > 0.0 {
        Some(4)
    } else if dy < 0.0 {
        Some(5)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use winit::dpi::PhysicalPosition;

    #[test]
    fn test_named_keys() {
        assert_eq!(map_named(WinitNamed::Enter, false), Some(Key::Named(NamedKey::Return)));
        assert_eq!(
            map_named(WinitNamed::Enter, true),
            Some(Key::Named(NamedKey::Keypad(KeypadKey::Enter)))
        );
        assert_eq!(map_named(WinitNamed::ArrowLeft, false), Some(Key::Named(NamedKey::Left)));
        assert_eq!(map_named(WinitNamed::F1, false), Some(Key::Named(NamedKey::F(1))));
        assert_eq!(map_named(WinitNamed::F20, false), Some(Key::Named(NamedKey::F(20))));
        assert_eq!(map_named(WinitNamed::F24, false), None);
        assert_eq!(map_named(WinitNamed::Space, false), Some(Key::Text(" ".into())));
    }

    #[test]
    fn test_modifier_keys_produce_modifier() {
        for key in [WinitNamed::Shift, WinitNamed::Control, WinitNamed::Alt, WinitNamed::Super] {
            assert_eq!(map_named(key, false), Some(Key::Modifier));
        }
    }

    #[test]
    fn test_numpad_characters() {
        assert_eq!(map_character("7", true), Key::Named(NamedKey::Keypad(KeypadKey::Digit(7))));
        assert_eq!(map_character("*", true), Key::Named(NamedKey::Keypad(KeypadKey::Star)));
        assert_eq!(map_character("7", false), Key::Text("7".into()));
        assert_eq!(map_character("é", true), Key::Text("é".into()));
    }

    #[test]
    fn test_modifier_state() {
        let state = ModifiersState::SHIFT | ModifiersState::CONTROL;
        assert_eq!(
            modifiers(state),
            Modifiers {
                shift: true,
                ctrl: true,
                alt: false
            }
        );
        assert!(modifiers(ModifiersState::empty()).is_empty());
    }

    #[test]
    fn test_buttons() {
        assert_eq!(button_number(MouseButton::Left), Some(1));
        assert_eq!(button_number(MouseButton::Middle), Some(2));
        assert_eq!(button_number(MouseButton::Right), Some(3));
        assert_eq!(button_number(MouseButton::Back), None);

        assert_eq!(wheel_button(MouseScrollDelta::LineDelta(0.0, 1.0)), Some(4));
        assert_eq!(wheel_button(MouseScrollDelta::LineDelta(0.0, -2.0)), Some(5));
        assert_eq!(
            wheel_button(MouseScrollDelta::PixelDelta(PhysicalPosition::new(0.0, -12.0))),
            Some(5)
        );
        assert_eq!(wheel_button(MouseScrollDelta::LineDelta(3.0, 0.0)), None);
    }

    #[test]
    fn test_translate_window_events() {
        let id = unsafe { WindowId::dummy() };
        let mut translator = Translator::new(id);
        let mut out = Vec::new();
        translator.translate(id, WindowEvent::Focused(true), &mut out);
        translator.translate(id, WindowEvent::RedrawRequested, &mut out);
        translator.translate(id, WindowEvent::CloseRequested, &mut out);
        translator.translate(
            id,
            WindowEvent::Resized(PhysicalSize::new(640, 480)),
            &mut out,
        );
        assert_eq!(
            out,
            vec![
                InputEvent::Focus(true),
                InputEvent::Expose,
                InputEvent::Destroy,
                InputEvent::Resize { width: 640, height: 480 }
            ]
        );
    }
}
