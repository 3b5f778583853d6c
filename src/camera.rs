//! Orbit camera and its pointer/wheel controller.
//!
//! [`ArcRotateCamera`] circles a target point: `alpha` is the longitudinal and
//! `beta` the latitudinal angle, `radius` the distance to the target. Input is
//! accumulated into inertial offsets which [`ArcRotateCamera::update`] applies
//! and decays once per frame.

use std::f32::consts::{FRAC_PI_2, PI};

use cgmath::{Matrix4, Point3, Vector3};
use winit::{
    dpi::PhysicalPosition,
    event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent},
};

/// Offsets below this are snapped to zero.
const INERTIA_EPSILON: f32 = 0.001;
/// Pixels a single wheel notch is worth.
const PIXELS_PER_LINE: f32 = 100.0;

#[derive(Clone, Debug, PartialEq)]
pub struct ArcRotateCamera {
    pub alpha: f32,
    pub beta: f32,
    pub radius: f32,
    pub target: Point3<f32>,
    /// Fraction of the inertial offsets kept per frame.
    pub inertia: f32,
    /// Pixels of pointer travel per radian of rotation.
    pub angular_sensibility: f32,
    pub lower_radius_limit: Option<f32>,
    pub upper_radius_limit: Option<f32>,
    pub lower_beta_limit: f32,
    pub upper_beta_limit: f32,
    /// Higher values make the wheel zoom slower.
    pub wheel_precision: f32,
    inertial_alpha_offset: f32,
    inertial_beta_offset: f32,
    inertial_radius_offset: f32,
}

impl ArcRotateCamera {
    pub fn new(alpha: f32, beta: f32, radius: f32, target: Point3<f32>) -> Self {
        Self {
            alpha,
            beta,
            radius,
            target,
            inertia: 0.9,
            angular_sensibility: 1000.0,
            lower_radius_limit: None,
            upper_radius_limit: None,
            lower_beta_limit: 0.01,
            upper_beta_limit: PI - 0.01,
            wheel_precision: 3.0,
            inertial_alpha_offset: 0.0,
            inertial_beta_offset: 0.0,
            inertial_radius_offset: 0.0,
        }
    }

    /// Feeds a pointer drag of `dx`/`dy` pixels.
    pub fn handle_pointer_drag(&mut self, dx: f32, dy: f32) {
        self.inertial_alpha_offset -= dx / self.angular_sensibility;
        self.inertial_beta_offset -= dy / self.angular_sensibility;
    }

    /// Feeds a wheel movement in pixels, positive values zoom in.
    pub fn handle_wheel(&mut self, pixels: f32) {
        self.inertial_radius_offset += pixels / (self.wheel_precision * 40.0);
    }

    pub fn is_moving(&self) -> bool {
        self.inertial_alpha_offset != 0.0
            || self.inertial_beta_offset != 0.0
            || self.inertial_radius_offset != 0.0
    }

    /// Applies and decays the inertial offsets, then enforces the limits.
    pub fn update(&mut self) {
        if self.is_moving() {
            self.alpha += self.inertial_alpha_offset;
            self.beta += self.inertial_beta_offset;
            self.radius -= self.inertial_radius_offset;
            self.inertial_alpha_offset = decay(self.inertial_alpha_offset, self.inertia);
            self.inertial_beta_offset = decay(self.inertial_beta_offset, self.inertia);
            self.inertial_radius_offset = decay(self.inertial_radius_offset, self.inertia);
        }
        self.clamp();
    }

    fn clamp(&mut self) {
        self.beta = self.beta.clamp(self.lower_beta_limit, self.upper_beta_limit);
        if let Some(lower) = self.lower_radius_limit {
            if self.radius < lower {
                self.radius = lower;
                self.inertial_radius_offset = 0.0;
            }
        }
        if let Some(upper) = self.upper_radius_limit {
            if self.radius > upper {
                self.radius = upper;
                self.inertial_radius_offset = 0.0;
            }
        }
    }

    pub fn position(&self) -> Point3<f32> {
        let (sin_alpha, cos_alpha) = self.alpha.sin_cos();
        let (sin_beta, cos_beta) = self.beta.sin_cos();
        self.target
            + Vector3::new(
                self.radius * cos_alpha * sin_beta,
                self.radius * cos_beta,
                self.radius * sin_alpha * sin_beta,
            )
    }

    pub fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(self.position(), self.target, Vector3::unit_y())
    }
}

fn decay(offset: f32, inertia: f32) -> f32 {
    let offset = offset * inertia;
    if offset.abs() < INERTIA_EPSILON {
        0.0
    } else {
        offset
    }
}

impl Default for ArcRotateCamera {
    /// Faces the character from the front, slightly above the pedestal.
    fn default() -> Self {
        let mut camera = Self::new(FRAC_PI_2, FRAC_PI_2, 4.0, Point3::new(0.0, 1.2, 0.0));
        camera.inertia = 0.8;
        camera.angular_sensibility = 1000.0;
        camera.lower_radius_limit = Some(2.0);
        camera.upper_radius_limit = Some(10.0);
        camera.wheel_precision = 30.0;
        camera
    }
}

/// Translates window events into camera input. Left-drag orbits, the wheel zooms.
#[derive(Debug, Default)]
pub struct CameraController {
    dragging: bool,
    last_cursor: Option<PhysicalPosition<f64>>,
}

impl CameraController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the event moved the camera or changed the drag state.
    pub fn handle_window_events(&mut self, camera: &mut ArcRotateCamera, event: &WindowEvent) -> bool {
        match event {
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => {
                self.dragging = *state == ElementState::Pressed;
                true
            }
            WindowEvent::CursorMoved { position, .. } => {
                let moved = match (self.dragging, self.last_cursor) {
                    (true, Some(last)) => {
                        camera.handle_pointer_drag(
                            (position.x - last.x) as f32,
                            (position.y - last.y) as f32,
                        );
                        true
                    }
                    _ => false,
                };
                self.last_cursor = Some(*position);
                moved
            }
            WindowEvent::CursorLeft { .. } => {
                self.dragging = false;
                self.last_cursor = None;
                false
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let pixels = match delta {
                    MouseScrollDelta::LineDelta(_, lines) => lines * PIXELS_PER_LINE,
                    MouseScrollDelta::PixelDelta(position) => position.y as f32,
                };
                camera.handle_wheel(pixels);
                true
            }
            _ => false,
        }
    }
}
