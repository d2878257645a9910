//! Input normalisation
//!
//! Mouse and touch input are folded into one gesture stream so the camera
//! never needs to know which device a contact came from.

use glam::Vec2;
use winit::event::{ElementState, MouseButton, MouseScrollDelta, TouchPhase};

/// Identity of one pointer or touch contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContactId {
    /// The mouse, while its primary button is held
    Pointer,
    /// A finger, by the platform's touch id
    Touch(u64),
}

/// Source-independent contact event
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureEvent {
    Start { contact: ContactId, position: Vec2 },
    Move { contact: ContactId, position: Vec2 },
    End { contact: ContactId },
}

/// Everything the camera reacts to
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    Gesture(GestureEvent),
    /// Wheel notches; positive moves the camera closer
    Wheel(f32),
}

/// Queues normalised input events between frames.
#[derive(Debug, Default)]
pub struct InputHandler {
    events: Vec<InputEvent>,
    cursor: Vec2,
    pointer_down: bool,
}

impl InputHandler {
    /// Create a new input handler with an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    fn push_gesture(&mut self, gesture: GestureEvent) {
        self.events.push(InputEvent::Gesture(gesture));
    }

    /// Handle a mouse button event. Only the left button drives the camera.
    pub fn handle_mouse_button(&mut self, button: MouseButton, state: ElementState) {
        if button != MouseButton::Left {
            return;
        }
        match state {
            ElementState::Pressed if !self.pointer_down => {
                self.pointer_down = true;
                self.push_gesture(GestureEvent::Start {
                    contact: ContactId::Pointer,
                    position: self.cursor,
                });
            }
            ElementState::Released if self.pointer_down => {
                self.pointer_down = false;
                self.push_gesture(GestureEvent::End {
                    contact: ContactId::Pointer,
                });
            }
            _ => {}
        }
    }

    /// Handle cursor movement in window coordinates
    pub fn handle_cursor_moved(&mut self, position: Vec2) {
        self.cursor = position;
        if self.pointer_down {
            self.push_gesture(GestureEvent::Move {
                contact: ContactId::Pointer,
                position,
            });
        }
    }

    /// Handle scroll wheel
    pub fn handle_scroll(&mut self, delta: MouseScrollDelta) {
        let scroll = match delta {
            MouseScrollDelta::LineDelta(_, y) => y,
            MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 120.0,
        };

        if scroll != 0.0 {
            self.events.push(InputEvent::Wheel(scroll));
        }
    }

    /// Handle a touch event
    pub fn handle_touch(&mut self, id: u64, phase: TouchPhase, position: Vec2) {
        let contact = ContactId::Touch(id);
        let gesture = match phase {
            TouchPhase::Started => GestureEvent::Start { contact, position },
            TouchPhase::Moved => GestureEvent::Move { contact, position },
            TouchPhase::Ended | TouchPhase::Cancelled => GestureEvent::End { contact },
        };
        self.push_gesture(gesture);
    }

    /// Release a held pointer when the window loses focus
    pub fn handle_focus_lost(&mut self) {
        self.handle_mouse_button(MouseButton::Left, ElementState::Released);
    }

    /// Number of events waiting for the next frame
    pub fn pending(&self) -> usize {
        self.events.len()
    }

    /// Take every queued event, in arrival order
    pub fn drain(&mut self) -> Vec<InputEvent> {
        std::mem::take(&mut self.events)
    }
}
