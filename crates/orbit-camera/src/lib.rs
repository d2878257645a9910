//! Orbit Camera - orbit camera driven by pointer and touch gestures
//!
//! Raw window input is normalised by [`InputHandler`] into source-independent
//! [`InputEvent`]s, which [`CameraController`] folds into yaw, pitch and
//! distance around a fixed target.

mod config;
mod controller;
mod input;

pub use config::CameraConfig;
pub use controller::{CameraController, CameraState, GestureState};
pub use input::{ContactId, GestureEvent, InputEvent, InputHandler};
