//! Orbit camera controller with drag rotation and pinch/wheel zoom

use glam::{Mat4, Quat, Vec2, Vec3};
use tracing::debug;

use crate::config::CameraConfig;
use crate::input::{ContactId, GestureEvent, InputEvent};

/// Pinch anchors closer than this do not produce a zoom step.
const MIN_ANCHOR_DISTANCE: f32 = 1e-3;

/// Where the camera is on its sphere around the target
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraState {
    pub target: Vec3,
    /// Rotation about world Y, unbounded
    pub yaw: f32,
    /// Rotation about the camera's X axis, clamped
    pub pitch: f32,
    pub distance: f32,
    /// Multiplier of the last pinch step; 1.0 outside a pinch
    pub zoom_scale: f32,
}

/// Which gesture is in progress
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureState {
    Idle,
    Rotating {
        contact: ContactId,
        last: Vec2,
    },
    Zooming {
        contacts: [(ContactId, Vec2); 2],
        anchor_distance: f32,
    },
}

/// Orbit camera controller
pub struct CameraController {
    /// Configuration
    pub config: CameraConfig,
    state: CameraState,
    gesture: GestureState,
}

impl Default for CameraController {
    fn default() -> Self {
        Self::new()
    }
}

impl CameraController {
    /// Create a new camera controller
    pub fn new() -> Self {
        Self::with_config(CameraConfig::default())
    }

    /// Create a camera controller with custom config
    pub fn with_config(config: CameraConfig) -> Self {
        let config = config.validated();
        let state = CameraState {
            target: config.target,
            yaw: 0.0,
            pitch: 0.0,
            distance: config.clamp_distance(config.initial_distance),
            zoom_scale: 1.0,
        };
        Self {
            config,
            state,
            gesture: GestureState::Idle,
        }
    }

    pub fn state(&self) -> &CameraState {
        &self.state
    }

    pub fn gesture(&self) -> &GestureState {
        &self.gesture
    }

    /// Return to the initial pose and drop any gesture in progress
    pub fn reset(&mut self) {
        *self = Self::with_config(self.config.clone());
    }

    /// Apply one normalised input event
    pub fn handle_event(&mut self, event: &InputEvent) {
        match *event {
            InputEvent::Gesture(gesture) => self.handle_gesture(gesture),
            InputEvent::Wheel(delta) => self.handle_wheel(delta),
        }
    }

    /// Advance the gesture state machine
    pub fn handle_gesture(&mut self, event: GestureEvent) {
        match (self.gesture, event) {
            (GestureState::Idle, GestureEvent::Start { contact, position }) => {
                debug!("Rotate started by {:?}", contact);
                self.gesture = GestureState::Rotating {
                    contact,
                    last: position,
                };
            }
            (GestureState::Rotating { contact, last }, GestureEvent::Start { contact: second, position })
                if second != contact =>
            {
                let anchor_distance = last.distance(position);
                debug!("Pinch started, anchor distance {:.1}", anchor_distance);
                self.gesture = GestureState::Zooming {
                    contacts: [(contact, last), (second, position)],
                    anchor_distance,
                };
            }
            (GestureState::Rotating { contact, last }, GestureEvent::Move { contact: moved, position })
                if moved == contact =>
            {
                self.rotate(position - last);
                self.gesture = GestureState::Rotating {
                    contact,
                    last: position,
                };
            }
            (GestureState::Zooming { mut contacts, anchor_distance }, GestureEvent::Move { contact, position }) => {
                let Some(slot) = contacts.iter().position(|(id, _)| *id == contact) else {
                    return;
                };
                contacts[slot].1 = position;
                let current = contacts[0].1.distance(contacts[1].1);
                if anchor_distance > MIN_ANCHOR_DISTANCE {
                    self.zoom(current / anchor_distance);
                }
                self.gesture = GestureState::Zooming {
                    contacts,
                    anchor_distance: current,
                };
            }
            (GestureState::Rotating { contact, .. }, GestureEvent::End { contact: ended })
                if ended == contact =>
            {
                self.end_gesture();
            }
            (GestureState::Zooming { contacts, .. }, GestureEvent::End { contact: ended })
                if contacts.iter().any(|(id, _)| *id == ended) =>
            {
                self.end_gesture();
            }
            _ => {}
        }
    }

    /// Wheel zoom by a fixed step; the sign of `delta` picks the direction
    pub fn handle_wheel(&mut self, delta: f32) {
        let step = if delta > 0.0 {
            -self.config.wheel_step
        } else if delta < 0.0 {
            self.config.wheel_step
        } else {
            return;
        };
        self.state.distance = self.config.clamp_distance(self.state.distance + step);
    }

    fn rotate(&mut self, delta: Vec2) {
        self.state.yaw += delta.x * self.config.sensitivity;
        self.state.pitch = self
            .config
            .clamp_pitch(self.state.pitch + delta.y * self.config.sensitivity);
    }

    fn zoom(&mut self, scale: f32) {
        self.state.distance = self.config.clamp_distance(self.state.distance / scale);
        self.state.zoom_scale = scale;
    }

    fn end_gesture(&mut self) {
        debug!("Gesture ended");
        self.gesture = GestureState::Idle;
        self.state.zoom_scale = 1.0;
    }

    /// Get the rotation quaternion (yaw about Y, then pitch about X)
    pub fn orientation(&self) -> Quat {
        Quat::from_rotation_y(self.state.yaw) * Quat::from_rotation_x(self.state.pitch)
    }

    /// Get the camera's current world position
    pub fn position(&self) -> Vec3 {
        self.state.target + self.orientation() * Vec3::new(0.0, 0.0, self.state.distance)
    }

    /// Get the camera's up direction
    pub fn up(&self) -> Vec3 {
        self.orientation() * Vec3::Y
    }

    /// Get the view matrix
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position(), self.state.target, self.up())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start(contact: ContactId, x: f32, y: f32) -> GestureEvent {
        GestureEvent::Start {
            contact,
            position: Vec2::new(x, y),
        }
    }

    fn moved(contact: ContactId, x: f32, y: f32) -> GestureEvent {
        GestureEvent::Move {
            contact,
            position: Vec2::new(x, y),
        }
    }

    fn end(contact: ContactId) -> GestureEvent {
        GestureEvent::End { contact }
    }

    #[test]
    fn initial_pose_looks_down_negative_z() {
        let camera = CameraController::new();
        assert_eq!(camera.state().distance, 5.0);
        assert!((camera.position() - Vec3::new(0.0, 0.0, 5.0)).length() < 1e-5);
        assert!((camera.up() - Vec3::Y).length() < 1e-5);
        assert_eq!(*camera.gesture(), GestureState::Idle);
    }

    #[test]
    fn drag_rotates_yaw_and_pitch() {
        let mut camera = CameraController::new();
        camera.handle_gesture(start(ContactId::Pointer, 100.0, 100.0));
        camera.handle_gesture(moved(ContactId::Pointer, 120.0, 110.0));

        let state = camera.state();
        assert!((state.yaw - 0.2).abs() < 1e-6);
        assert!((state.pitch - 0.1).abs() < 1e-6);
    }

    #[test]
    fn large_vertical_drag_clamps_pitch() {
        let mut camera = CameraController::new();
        camera.handle_gesture(start(ContactId::Pointer, 0.0, 0.0));
        camera.handle_gesture(moved(ContactId::Pointer, 0.0, 500.0));
        assert_eq!(camera.state().pitch, 1.5);

        camera.handle_gesture(moved(ContactId::Pointer, 0.0, -1000.0));
        assert_eq!(camera.state().pitch, -1.5);
    }

    #[test]
    fn yaw_is_not_clamped() {
        let mut camera = CameraController::new();
        camera.handle_gesture(start(ContactId::Pointer, 0.0, 0.0));
        camera.handle_gesture(moved(ContactId::Pointer, 2000.0, 0.0));
        assert!((camera.state().yaw - 20.0).abs() < 1e-4);
    }

    #[test]
    fn moves_from_other_contacts_are_ignored_while_rotating() {
        let mut camera = CameraController::new();
        camera.handle_gesture(start(ContactId::Touch(1), 0.0, 0.0));
        camera.handle_gesture(moved(ContactId::Touch(9), 50.0, 50.0));
        assert_eq!(camera.state().yaw, 0.0);
        assert_eq!(camera.state().pitch, 0.0);
    }

    #[test]
    fn second_contact_starts_pinch() {
        let mut camera = CameraController::new();
        camera.handle_gesture(start(ContactId::Touch(0), 0.0, 0.0));
        camera.handle_gesture(start(ContactId::Touch(1), 200.0, 0.0));
        match camera.gesture() {
            GestureState::Zooming { anchor_distance, .. } => assert_eq!(*anchor_distance, 200.0),
            other => panic!("expected Zooming, got: {:?}", other),
        }
    }

    #[test]
    fn pinch_in_halves_scale_and_reanchors() {
        let mut camera = CameraController::new();
        camera.handle_gesture(start(ContactId::Touch(0), 0.0, 0.0));
        camera.handle_gesture(start(ContactId::Touch(1), 200.0, 0.0));
        camera.handle_gesture(moved(ContactId::Touch(1), 100.0, 0.0));

        assert_eq!(camera.state().zoom_scale, 0.5);
        assert_eq!(camera.state().distance, 10.0);
        match camera.gesture() {
            GestureState::Zooming { anchor_distance, .. } => assert_eq!(*anchor_distance, 100.0),
            other => panic!("expected Zooming, got: {:?}", other),
        }
    }

    #[test]
    fn pinch_out_moves_closer() {
        let mut camera = CameraController::new();
        camera.handle_gesture(start(ContactId::Touch(0), 0.0, 0.0));
        camera.handle_gesture(start(ContactId::Touch(1), 100.0, 0.0));
        camera.handle_gesture(moved(ContactId::Touch(1), 200.0, 0.0));
        assert_eq!(camera.state().distance, 2.5);
    }

    #[test]
    fn coincident_anchor_skips_zoom_step() {
        let mut camera = CameraController::new();
        camera.handle_gesture(start(ContactId::Touch(0), 10.0, 10.0));
        camera.handle_gesture(start(ContactId::Touch(1), 10.0, 10.0));
        camera.handle_gesture(moved(ContactId::Touch(1), 110.0, 10.0));
        assert_eq!(camera.state().distance, 5.0);
        assert!(camera.state().distance.is_finite());
    }

    #[test]
    fn third_contact_is_ignored_while_zooming() {
        let mut camera = CameraController::new();
        camera.handle_gesture(start(ContactId::Touch(0), 0.0, 0.0));
        camera.handle_gesture(start(ContactId::Touch(1), 100.0, 0.0));
        let before = *camera.gesture();
        camera.handle_gesture(start(ContactId::Touch(2), 50.0, 50.0));
        camera.handle_gesture(moved(ContactId::Touch(2), 500.0, 50.0));
        assert_eq!(*camera.gesture(), before);
    }

    #[test]
    fn lifting_either_finger_ends_pinch() {
        for lifted in [0, 1] {
            let mut camera = CameraController::new();
            camera.handle_gesture(start(ContactId::Touch(0), 0.0, 0.0));
            camera.handle_gesture(start(ContactId::Touch(1), 100.0, 0.0));
            camera.handle_gesture(moved(ContactId::Touch(1), 150.0, 0.0));
            camera.handle_gesture(end(ContactId::Touch(lifted)));
            assert_eq!(*camera.gesture(), GestureState::Idle);
            assert_eq!(camera.state().zoom_scale, 1.0);
        }
    }

    #[test]
    fn release_returns_to_idle() {
        let mut camera = CameraController::new();
        camera.handle_gesture(start(ContactId::Pointer, 0.0, 0.0));
        camera.handle_gesture(end(ContactId::Touch(3)));
        assert!(matches!(camera.gesture(), GestureState::Rotating { .. }));
        camera.handle_gesture(end(ContactId::Pointer));
        assert_eq!(*camera.gesture(), GestureState::Idle);
    }

    #[test]
    fn wheel_steps_by_sign() {
        let mut camera = CameraController::new();
        camera.handle_event(&InputEvent::Wheel(-1.0));
        assert_eq!(camera.state().distance, 5.5);
        camera.handle_event(&InputEvent::Wheel(3.0));
        assert_eq!(camera.state().distance, 5.0);
        camera.handle_event(&InputEvent::Wheel(0.0));
        assert_eq!(camera.state().distance, 5.0);
    }

    #[test]
    fn wheel_never_leaves_distance_range() {
        let mut camera = CameraController::new();
        for _ in 0..40 {
            camera.handle_wheel(-1.0);
            assert!(camera.state().distance <= 10.0);
        }
        assert_eq!(camera.state().distance, 10.0);
        for _ in 0..40 {
            camera.handle_wheel(1.0);
            assert!(camera.state().distance >= 1.0);
        }
        assert_eq!(camera.state().distance, 1.0);
    }

    #[test]
    fn pinch_sequences_stay_in_range() {
        let mut camera = CameraController::new();
        camera.handle_gesture(start(ContactId::Touch(0), 0.0, 0.0));
        camera.handle_gesture(start(ContactId::Touch(1), 100.0, 0.0));
        let spreads = [400.0, 3.0, 900.0, 0.0, 55.0, 1.0, 700.0, 0.5, 120.0];
        for x in spreads.iter().cycle().take(90) {
            camera.handle_gesture(moved(ContactId::Touch(1), *x, 0.0));
            let d = camera.state().distance;
            assert!((1.0..=10.0).contains(&d), "distance {} out of range", d);
        }
    }

    #[test]
    fn drag_sequences_keep_pitch_bounded() {
        let mut camera = CameraController::new();
        camera.handle_gesture(start(ContactId::Pointer, 0.0, 0.0));
        let mut y = 0.0;
        for step in [37.0, -250.0, 900.0, -13.0, 4.0, -700.0, 160.0] {
            for _ in 0..10 {
                y += step;
                camera.handle_gesture(moved(ContactId::Pointer, 0.0, y));
                let pitch = camera.state().pitch;
                assert!((-1.5..=1.5).contains(&pitch), "pitch {} out of range", pitch);
            }
        }
    }

    #[test]
    fn view_matrix_places_target_in_front() {
        let mut camera = CameraController::new();
        camera.handle_gesture(start(ContactId::Pointer, 0.0, 0.0));
        camera.handle_gesture(moved(ContactId::Pointer, 80.0, -60.0));

        let view = camera.view_matrix();
        let target_in_view = view.transform_point3(camera.state().target);
        assert!(target_in_view.x.abs() < 1e-4);
        assert!(target_in_view.y.abs() < 1e-4);
        assert!((target_in_view.z + camera.state().distance).abs() < 1e-4);
    }

    #[test]
    fn inverted_distance_range_from_settings_does_not_panic() {
        let config: CameraConfig = toml::from_str("min_distance = 20.0\nmax_distance = 10.0").unwrap();
        let mut camera = CameraController::with_config(config);
        assert_eq!(camera.state().distance, 5.0);

        camera.handle_wheel(-1.0);
        assert_eq!(camera.state().distance, 5.5);
    }

    #[test]
    fn negative_pitch_limit_from_settings_does_not_panic() {
        let config: CameraConfig = toml::from_str("pitch_max = -1.0").unwrap();
        let mut camera = CameraController::with_config(config);

        camera.handle_gesture(start(ContactId::Pointer, 0.0, 0.0));
        camera.handle_gesture(moved(ContactId::Pointer, 0.0, 10.0));
        assert!((camera.state().pitch - 0.1).abs() < 1e-6);
    }

    #[test]
    fn reset_restores_initial_pose() {
        let mut camera = CameraController::new();
        camera.handle_gesture(start(ContactId::Pointer, 0.0, 0.0));
        camera.handle_gesture(moved(ContactId::Pointer, 30.0, 30.0));
        camera.handle_wheel(-1.0);
        camera.reset();
        assert_eq!(*camera.state(), *CameraController::new().state());
        assert_eq!(*camera.gesture(), GestureState::Idle);
    }
}
