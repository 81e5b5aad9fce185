//! Synthetic input forwarded from the embedder into the page.
//!
//! Pointer coordinates are in device pixels of the backing buffer, i.e. the
//! caller has already multiplied view coordinates by the scale factor.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MouseButton {
    Left,
    Middle,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TouchPhase {
    Start,
    Move,
    End,
    Cancel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum InputEvent {
    MouseMove {
        x: f32,
        y: f32,
        #[serde(default)]
        modifiers: Modifiers,
    },
    MouseDown {
        x: f32,
        y: f32,
        button: MouseButton,
        #[serde(default = "one")]
        click_count: u32,
        #[serde(default)]
        modifiers: Modifiers,
    },
    MouseUp {
        x: f32,
        y: f32,
        button: MouseButton,
        #[serde(default = "one")]
        click_count: u32,
        #[serde(default)]
        modifiers: Modifiers,
    },
    MouseWheel {
        x: f32,
        y: f32,
        delta_x: f32,
        delta_y: f32,
        #[serde(default)]
        modifiers: Modifiers,
    },
    KeyDown {
        key_code: u32,
        #[serde(default)]
        modifiers: Modifiers,
    },
    KeyUp {
        key_code: u32,
        #[serde(default)]
        modifiers: Modifiers,
    },
    Char {
        ch: char,
        #[serde(default)]
        modifiers: Modifiers,
    },
    Touch {
        id: u32,
        x: f32,
        y: f32,
        phase: TouchPhase,
    },
}

fn one() -> u32 {
    1
}

impl InputEvent {
    /// Position of pointer events; keyboard events have none.
    pub fn position(&self) -> Option<(f32, f32)> {
        match *self {
            InputEvent::MouseMove { x, y, .. }
            | InputEvent::MouseDown { x, y, .. }
            | InputEvent::MouseUp { x, y, .. }
            | InputEvent::MouseWheel { x, y, .. }
            | InputEvent::Touch { x, y, .. } => Some((x, y)),
            InputEvent::KeyDown { .. } | InputEvent::KeyUp { .. } | InputEvent::Char { .. } => None,
        }
    }

    /// Copy of the event with its position shifted by `(-dx, -dy)`; used to
    /// re-express a pointer event in an overlay's local space.
    pub fn relative_to(&self, dx: f32, dy: f32) -> InputEvent {
        let mut ev = self.clone();
        match &mut ev {
            InputEvent::MouseMove { x, y, .. }
            | InputEvent::MouseDown { x, y, .. }
            | InputEvent::MouseUp { x, y, .. }
            | InputEvent::MouseWheel { x, y, .. }
            | InputEvent::Touch { x, y, .. } => {
                *x -= dx;
                *y -= dy;
            }
            InputEvent::KeyDown { .. } | InputEvent::KeyUp { .. } | InputEvent::Char { .. } => {}
        }
        ev
    }

    pub fn is_pointer(&self) -> bool {
        self.position().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyboard_events_have_no_position() {
        let ev = InputEvent::Char { ch: 'a', modifiers: Modifiers::default() };
        assert!(!ev.is_pointer());
        assert_eq!(ev.relative_to(5.0, 5.0), ev);
    }

    #[test]
    fn relative_to_shifts_pointer() {
        let ev = InputEvent::MouseDown {
            x: 30.0,
            y: 40.0,
            button: MouseButton::Left,
            click_count: 1,
            modifiers: Modifiers::default(),
        };
        assert_eq!(ev.relative_to(10.0, 15.0).position(), Some((20.0, 25.0)));
    }

    #[test]
    fn deserializes_tagged_json() {
        let ev: InputEvent =
            serde_json::from_str(r#"{"type":"mouseDown","x":1,"y":2,"button":"left"}"#).unwrap();
        match ev {
            InputEvent::MouseDown { click_count, button, .. } => {
                assert_eq!(click_count, 1);
                assert_eq!(button, MouseButton::Left);
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
