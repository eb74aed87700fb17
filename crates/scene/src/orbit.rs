//! Turntable orbit: drag to spin around the center, right drag to slide the center,
//! wheel to dolly in and out.
//! Motion keeps some inertia and settles after the input stops.

use glam::{Vec2, Vec3};
use renderer::OrbitSource;

/// Radians per dragged pixel at sensitivity 1.
const ROTATE_SPEED: f32 = 0.004;
/// Fraction of distance per panned pixel.
const PAN_SPEED: f32 = 0.001;
/// Fraction of distance per wheel line.
const ZOOM_SPEED: f32 = 0.08;
/// Velocity kept per tick.
const DAMPING: f32 = 0.8;
const PITCH_LIMIT: f32 = 1.5;
pub const MIN_DISTANCE: f32 = 5.0;
pub const MAX_DISTANCE: f32 = 3000.0;

#[derive(Debug, Clone)]
pub struct TurntableOrbit {
    center: Vec3,
    distance: f32,
    /// Around +Y, zero looking down -Z.
    yaw: f32,
    /// Above the horizon, radians.
    pitch: f32,
    yaw_velocity: f32,
    pitch_velocity: f32,
    zoom_velocity: f32,
    /// Screen-space slide, in distance fractions per tick.
    pan_velocity: Vec2,
    sensitivity: f32,
}

impl TurntableOrbit {
    /// Orbit that starts exactly at `eye` looking at `center`.
    pub fn new(eye: Vec3, center: Vec3, sensitivity: f32) -> Self {
        let offset = eye - center;
        let distance = offset.length().clamp(MIN_DISTANCE, MAX_DISTANCE);
        let pitch = if offset.length_squared() > 0.0 {
            (offset.y / offset.length()).asin()
        } else {
            0.0
        };
        Self {
            center,
            distance,
            yaw: offset.x.atan2(offset.z),
            pitch: pitch.clamp(-PITCH_LIMIT, PITCH_LIMIT),
            yaw_velocity: 0.0,
            pitch_velocity: 0.0,
            zoom_velocity: 0.0,
            pan_velocity: Vec2::ZERO,
            sensitivity,
        }
    }

    /// Mouse drag in pixels. Right spins the scene right, down raises the eye.
    pub fn drag(&mut self, delta: Vec2) {
        self.yaw_velocity -= delta.x * ROTATE_SPEED * self.sensitivity;
        self.pitch_velocity += delta.y * ROTATE_SPEED * self.sensitivity;
    }

    /// Mouse drag in pixels. The scene follows the pointer.
    pub fn pan(&mut self, delta: Vec2) {
        self.pan_velocity += delta * PAN_SPEED * self.sensitivity;
    }

    /// Wheel lines; positive moves closer.
    pub fn zoom(&mut self, lines: f32) {
        self.zoom_velocity += lines * ZOOM_SPEED;
    }

    fn is_settled(&self) -> bool {
        self.yaw_velocity.abs() + self.pitch_velocity.abs() + self.zoom_velocity.abs() + self.pan_velocity.length()
            < 1e-6
    }

    /// Unit vector from the center toward the eye.
    fn direction(&self) -> Vec3 {
        let (sin_yaw, cos_yaw) = self.yaw.sin_cos();
        let (sin_pitch, cos_pitch) = self.pitch.sin_cos();
        Vec3::new(cos_pitch * sin_yaw, sin_pitch, cos_pitch * cos_yaw)
    }

    /// Camera right and up for the current orientation.
    fn screen_axes(&self) -> (Vec3, Vec3) {
        let forward = -self.direction();
        let right = forward.cross(Vec3::Y).try_normalize().unwrap_or(Vec3::X);
        (right, right.cross(forward))
    }
}

impl OrbitSource for TurntableOrbit {
    fn tick(&mut self) {
        if self.is_settled() {
            return;
        }
        self.yaw += self.yaw_velocity;
        self.pitch = (self.pitch + self.pitch_velocity).clamp(-PITCH_LIMIT, PITCH_LIMIT);
        self.distance = (self.distance * (1.0 - self.zoom_velocity)).clamp(MIN_DISTANCE, MAX_DISTANCE);
        let (right, up) = self.screen_axes();
        self.center += (up * self.pan_velocity.y - right * self.pan_velocity.x) * self.distance;
        self.yaw_velocity *= DAMPING;
        self.pitch_velocity *= DAMPING;
        self.zoom_velocity *= DAMPING;
        self.pan_velocity *= DAMPING;
    }

    fn eye(&self) -> Vec3 {
        self.center + self.direction() * self.distance
    }

    fn center(&self) -> Vec3 {
        self.center
    }
}
