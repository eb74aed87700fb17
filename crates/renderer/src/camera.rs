//! Camera rig with a free orbit mode and a scripted demo mode.
//!
//! In [`CameraMode::Interactive`] the eye/center/up come from an [`OrbitSource`]
//! every frame. In [`CameraMode::Demo`] the rig plays back keyframed eye and
//! target intervals, computes a fade level from timed windows, and hands control
//! back to the orbit source near the end of the script. The demo ends itself once
//! its clock reaches the scripted length.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

/// Length of the fade-in that opens every demo.
pub const OPENING_FADE_LENGTH: f32 = 4.0;
/// Length of the fade window appended at the end of a demo.
pub const CLOSING_FADE_LENGTH: f32 = 6.0;

/// Which input drives the camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraMode {
    Interactive,
    Demo,
}

/// User-driven orbit controller feeding the rig in interactive mode.
pub trait OrbitSource {
    /// Advance any damping/inertia. Called once per frame the rig reads from the source.
    fn tick(&mut self) {}
    fn eye(&self) -> Vec3;
    fn center(&self) -> Vec3;
    fn up(&self) -> Vec3 {
        Vec3::Y
    }
}

/// Linear movement of one camera axis (eye or target) over `[start_time, end_time)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyframeInterval {
    pub start_time: f32,
    pub end_time: f32,
    pub start_value: Vec3,
    pub end_value: Vec3,
}

impl KeyframeInterval {
    pub fn new(start_time: f32, end_time: f32, start_value: Vec3, end_value: Vec3) -> Self {
        Self { start_time, end_time, start_value, end_value }
    }

    /// Half-open: the end time belongs to whatever comes next.
    pub fn contains(&self, time: f32) -> bool {
        time >= self.start_time && time < self.end_time
    }

    /// Componentwise lerp at absolute `time`.
    pub fn sample(&self, time: f32) -> Vec3 {
        let t = (time - self.start_time) / (self.end_time - self.start_time);
        self.start_value * (1.0 - t) + self.end_value * t
    }
}

/// Timed window over which the screen fades out and back in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FadeWindow {
    pub start_time: f32,
    pub end_time: f32,
}

impl FadeWindow {
    pub fn new(start_time: f32, end_time: f32) -> Self {
        Self { start_time, end_time }
    }

    /// Closed on both ends.
    pub fn contains(&self, time: f32) -> bool {
        time >= self.start_time && time <= self.end_time
    }

    /// `|cos(pi * t)|` for the normalized position `t` inside the window.
    /// Evaluated as `|sin(pi * (0.5 - t))|`, which is exact at both edges and the midpoint.
    pub fn level(&self, time: f32) -> f32 {
        let t = (time - self.start_time) / (self.end_time - self.start_time);
        (std::f32::consts::PI * (0.5 - t)).sin().abs().clamp(0.0, 1.0)
    }
}

/// First interval containing `time`, in insertion order.
pub fn active_interval(intervals: &[KeyframeInterval], time: f32) -> Option<&KeyframeInterval> {
    intervals.iter().find(|k| k.contains(time))
}

/// Two schedule entries whose time spans intersect. The later one is masked by the earlier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduleOverlap {
    pub track: &'static str,
    pub first: usize,
    pub second: usize,
}

fn find_overlaps(track: &'static str, spans: &[(f32, f32)], out: &mut Vec<ScheduleOverlap>) {
    for (i, a) in spans.iter().enumerate() {
        for (j, b) in spans.iter().enumerate().skip(i + 1) {
            if a.0 < b.1 && b.0 < a.1 {
                out.push(ScheduleOverlap { track, first: i, second: j });
            }
        }
    }
}

/// Everything the demo mode plays back.
#[derive(Debug, Clone, Default)]
pub struct DemoScript {
    pub fades: Vec<FadeWindow>,
    pub positions: Vec<KeyframeInterval>,
    pub targets: Vec<KeyframeInterval>,
}

/// Perspective camera with an orthonormal basis and the interactive/demo state machine.
#[derive(Debug, Clone)]
pub struct CameraRig {
    mode: CameraMode,
    /// Vertical field of view in radians.
    pub fovy: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,

    position: Vec3,
    target: Vec3,
    forward: Vec3,
    right: Vec3,
    up: Vec3,
    view: Mat4,
    projection: Mat4,

    script: DemoScript,
    closing_fade: Option<FadeWindow>,
    demo_time: f32,
    demo_length: f32,
    demo_eye: Vec3,
    demo_target: Vec3,
    fade_level: f32,
}

impl CameraRig {
    /// Rig looking from `eye` at `center`, in interactive mode.
    pub fn new(eye: Vec3, center: Vec3) -> Self {
        let mut rig = Self {
            mode: CameraMode::Interactive,
            fovy: 45f32.to_radians(),
            aspect: 1.0,
            near: 0.1,
            far: 1000.0,
            position: eye,
            target: center,
            forward: -Vec3::Z,
            right: Vec3::X,
            up: Vec3::Y,
            view: Mat4::look_at_rh(eye, center, Vec3::Y),
            projection: Mat4::IDENTITY,
            script: DemoScript {
                fades: vec![FadeWindow::new(0.0, OPENING_FADE_LENGTH)],
                ..Default::default()
            },
            closing_fade: None,
            demo_time: 0.0,
            demo_length: 0.0,
            demo_eye: eye,
            demo_target: center,
            fade_level: 1.0,
        };
        rig.reorthogonalize(Vec3::Y);
        rig.update_projection();
        rig
    }

    /// Update aspect ratio and projection (call on resize).
    pub fn set_aspect(&mut self, width: u32, height: u32) {
        self.aspect = width.max(1) as f32 / height.max(1) as f32;
        self.update_projection();
    }

    pub fn update_projection(&mut self) {
        self.projection = Mat4::perspective_rh(self.fovy, self.aspect, self.near, self.far);
    }

    pub fn add_fade_window(&mut self, start_time: f32, end_time: f32) {
        self.script.fades.push(FadeWindow::new(start_time, end_time));
    }

    pub fn add_position_keyframe(&mut self, interval: KeyframeInterval) {
        self.script.positions.push(interval);
    }

    pub fn add_target_keyframe(&mut self, interval: KeyframeInterval) {
        self.script.targets.push(interval);
    }

    /// Enter demo mode with a fresh clock. Re-launching replaces the closing fade
    /// window rather than stacking another one.
    pub fn launch_demo(&mut self, total_length: f32) {
        self.demo_time = 0.0;
        self.demo_length = total_length;
        self.fade_level = 1.0;
        self.closing_fade = Some(FadeWindow::new(total_length - CLOSING_FADE_LENGTH, total_length));
        self.mode = CameraMode::Demo;
        for overlap in self.validate_schedule() {
            log::warn!(
                "Demo {} entries {} and {} overlap; entry {} wins while both are active",
                overlap.track,
                overlap.first,
                overlap.second,
                overlap.first
            );
        }
        log::info!("Demo camera started ({:.1}s)", total_length);
    }

    /// Return to interactive mode. Safe to call in any mode, any number of times.
    pub fn end_demo(&mut self) {
        if self.mode == CameraMode::Demo {
            log::info!("Demo camera ended at {:.2}s", self.demo_time);
        }
        self.mode = CameraMode::Interactive;
    }

    /// Advance one frame. `dt` is in seconds and only moves the demo clock.
    pub fn update(&mut self, dt: f32, orbit: &mut dyn OrbitSource) {
        if self.mode == CameraMode::Demo {
            self.demo_time += dt;
            if self.demo_time >= self.demo_length {
                self.end_demo();
            }
        }

        match self.mode {
            CameraMode::Interactive => self.follow_orbit(orbit),
            CameraMode::Demo => self.play_demo(orbit),
        }
    }

    fn follow_orbit(&mut self, orbit: &mut dyn OrbitSource) {
        orbit.tick();
        let (eye, center, up) = (orbit.eye(), orbit.center(), orbit.up());
        self.position = eye;
        self.target = center;
        self.view = Mat4::look_at_rh(eye, center, up);
        self.reorthogonalize(up);
    }

    fn play_demo(&mut self, orbit: &mut dyn OrbitSource) {
        let now = self.demo_time;

        let level = self.fade_windows().find(|w| w.contains(now)).map(|w| w.level(now));
        if let Some(level) = level {
            self.fade_level = level;
        }

        let stage = active_interval(&self.script.positions, now)
            .zip(active_interval(&self.script.targets, now))
            .map(|(p, t)| (p.sample(now), t.sample(now)));
        let in_closing_half = now >= self.demo_length - 0.5 * CLOSING_FADE_LENGTH;

        match stage {
            Some((eye, target)) if !in_closing_half => {
                self.demo_eye = eye;
                self.demo_target = target;
                self.position = eye;
                self.target = target;
                self.view = Mat4::look_at_rh(eye, target, Vec3::Y);
                // Right is taken against last frame's corrected up, so up trails forward by a frame.
                let previous_up = self.up;
                self.reorthogonalize(previous_up);
            }
            _ => self.follow_orbit(orbit),
        }
    }

    fn fade_windows(&self) -> impl Iterator<Item = &FadeWindow> {
        self.script.fades.iter().chain(self.closing_fade.iter())
    }

    fn reorthogonalize(&mut self, up: Vec3) {
        if let Some(forward) = (self.target - self.position).try_normalize() {
            self.forward = forward;
        }
        if let Some(right) = self.forward.cross(up).try_normalize() {
            self.right = right;
        }
        if let Some(up) = self.right.cross(self.forward).try_normalize() {
            self.up = up;
        }
    }

    /// Overlapping fade windows or keyframe intervals within one track.
    pub fn validate_schedule(&self) -> Vec<ScheduleOverlap> {
        let mut out = Vec::new();
        let fades: Vec<(f32, f32)> = self.fade_windows().map(|w| (w.start_time, w.end_time)).collect();
        find_overlaps("fade", &fades, &mut out);
        let spans = |list: &[KeyframeInterval]| list.iter().map(|k| (k.start_time, k.end_time)).collect::<Vec<_>>();
        find_overlaps("position", &spans(&self.script.positions), &mut out);
        find_overlaps("target", &spans(&self.script.targets), &mut out);
        out
    }

    pub fn mode(&self) -> CameraMode {
        self.mode
    }

    pub fn is_demo(&self) -> bool {
        self.mode == CameraMode::Demo
    }

    /// Fade opacity from the last demo update. 1.0 means fully visible.
    pub fn fade_level(&self) -> f32 {
        self.fade_level
    }

    pub fn demo_time(&self) -> f32 {
        self.demo_time
    }

    /// Last interpolated demo eye (used for water shading while the script plays).
    pub fn demo_eye(&self) -> Vec3 {
        self.demo_eye
    }

    /// Eye position used for shading: the scripted eye in demo mode, the current eye otherwise.
    pub fn shading_eye(&self) -> Vec3 {
        match self.mode {
            CameraMode::Demo => self.demo_eye,
            CameraMode::Interactive => self.position,
        }
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn target(&self) -> Vec3 {
        self.target
    }

    pub fn forward(&self) -> Vec3 {
        self.forward
    }

    pub fn right(&self) -> Vec3 {
        self.right
    }

    pub fn up(&self) -> Vec3 {
        self.up
    }

    pub fn view_matrix(&self) -> Mat4 {
        self.view
    }

    pub fn projection_matrix(&self) -> Mat4 {
        self.projection
    }

    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection * self.view
    }
}

/// Camera uniform data for GPU (must match `Camera` in the WGSL shaders).
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    pub proj: [[f32; 4]; 4],
    pub inv_view_proj: [[f32; 4]; 4],
    /// xyz = eye, w = 1.
    pub position: [f32; 4],
    pub right: [f32; 4],
    pub up: [f32; 4],
    pub forward: [f32; 4],
    /// x = time, y = near, z = far, w unused.
    pub params: [f32; 4],
}

impl CameraUniform {
    pub fn new() -> Self {
        Self {
            view_proj: Mat4::IDENTITY.to_cols_array_2d(),
            view: Mat4::IDENTITY.to_cols_array_2d(),
            proj: Mat4::IDENTITY.to_cols_array_2d(),
            inv_view_proj: Mat4::IDENTITY.to_cols_array_2d(),
            position: [0.0, 0.0, 0.0, 1.0],
            right: [1.0, 0.0, 0.0, 0.0],
            up: [0.0, 1.0, 0.0, 0.0],
            forward: [0.0, 0.0, -1.0, 0.0],
            params: [0.0; 4],
        }
    }

    pub fn update(&mut self, camera: &CameraRig, time: f32) {
        self.update_with_view(camera, camera.view_matrix(), time);
    }

    /// Same projection and basis, different view (used for the mirrored reflection camera).
    pub fn update_with_view(&mut self, camera: &CameraRig, view: Mat4, time: f32) {
        let proj = camera.projection_matrix();
        let view_proj = proj * view;
        self.view_proj = view_proj.to_cols_array_2d();
        self.view = view.to_cols_array_2d();
        self.proj = proj.to_cols_array_2d();
        self.inv_view_proj = view_proj.inverse().to_cols_array_2d();
        self.position = camera.position().extend(1.0).to_array();
        self.right = camera.right().extend(0.0).to_array();
        self.up = camera.up().extend(0.0).to_array();
        self.forward = camera.forward().extend(0.0).to_array();
        self.params = [time, camera.near, camera.far, 0.0];
    }

    /// A camera that is not the rig, e.g. the shadow light.
    pub fn from_matrices(view: Mat4, proj: Mat4, eye: Vec3) -> Self {
        let view_proj = proj * view;
        let inv_view = view.inverse();
        Self {
            view_proj: view_proj.to_cols_array_2d(),
            view: view.to_cols_array_2d(),
            proj: proj.to_cols_array_2d(),
            inv_view_proj: view_proj.inverse().to_cols_array_2d(),
            position: eye.extend(1.0).to_array(),
            right: inv_view.x_axis.truncate().extend(0.0).to_array(),
            up: inv_view.y_axis.truncate().extend(0.0).to_array(),
            forward: (-inv_view.z_axis.truncate()).extend(0.0).to_array(),
            params: [0.0; 4],
        }
    }
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedOrbit {
        eye: Vec3,
        center: Vec3,
        ticks: u32,
    }

    impl FixedOrbit {
        fn new() -> Self {
            Self { eye: Vec3::new(0.0, 10.0, 50.0), center: Vec3::ZERO, ticks: 0 }
        }
    }

    impl OrbitSource for FixedOrbit {
        fn tick(&mut self) {
            self.ticks += 1;
        }
        fn eye(&self) -> Vec3 {
            self.eye
        }
        fn center(&self) -> Vec3 {
            self.center
        }
    }

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-4
    }

    /// Fade is fully opaque at both window edges and fully faded at the midpoint.
    #[test]
    fn fade_level_edges_and_midpoint() {
        for &(start, end) in &[(0.0, 1.0), (12.0, 18.0), (51.0, 59.0), (20.0, 30.0)] {
            let w = FadeWindow::new(start, end);
            assert_eq!(w.level(start), 1.0);
            assert_eq!(w.level(end), 1.0);
            assert_eq!(w.level(start + (end - start) * 0.5), 0.0);
        }
    }

    #[test]
    fn fade_window_is_closed() {
        let w = FadeWindow::new(2.0, 4.0);
        assert!(w.contains(2.0));
        assert!(w.contains(4.0));
        assert!(!w.contains(4.0001));
    }

    /// Keyframe lookup is half-open and the lerp is exact at the start and midpoint.
    #[test]
    fn keyframe_interpolation() {
        let k = KeyframeInterval::new(0.0, 10.0, Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0));
        assert_eq!(k.sample(5.0), Vec3::new(5.0, 0.0, 0.0));
        assert_eq!(k.sample(0.0), Vec3::ZERO);
        assert!(k.contains(0.0));
        assert!(!k.contains(10.0));

        let next = KeyframeInterval::new(10.0, 20.0, Vec3::ONE, Vec3::ONE);
        let list = [k, next];
        assert_eq!(active_interval(&list, 10.0), Some(&next));
        assert_eq!(active_interval(&list, 20.0), None);
    }

    /// With overlapping entries the one added first wins.
    #[test]
    fn first_match_wins() {
        let a = KeyframeInterval::new(0.0, 10.0, Vec3::ZERO, Vec3::ZERO);
        let b = KeyframeInterval::new(5.0, 15.0, Vec3::ONE, Vec3::ONE);
        assert_eq!(active_interval(&[a, b], 7.0), Some(&a));
    }

    #[test]
    fn basis_is_orthonormal() {
        let rig = CameraRig::new(Vec3::new(-3.44, 71.84, 115.52), Vec3::new(-3.44, 51.84, -4.47));
        let (f, r, u) = (rig.forward(), rig.right(), rig.up());
        assert!((f.length() - 1.0).abs() < 1e-5);
        assert!((r.length() - 1.0).abs() < 1e-5);
        assert!((u.length() - 1.0).abs() < 1e-5);
        assert!(f.dot(r).abs() < 1e-5);
        assert!(f.dot(u).abs() < 1e-5);
        assert!(r.dot(u).abs() < 1e-5);
    }

    #[test]
    fn interactive_follows_orbit() {
        let mut rig = CameraRig::new(Vec3::ONE, Vec3::ZERO);
        let mut orbit = FixedOrbit::new();
        rig.update(0.016, &mut orbit);
        assert_eq!(orbit.ticks, 1);
        assert_eq!(rig.position(), orbit.eye);
        assert!(approx(rig.forward(), (orbit.center - orbit.eye).normalize()));
        assert_eq!(rig.view_matrix(), Mat4::look_at_rh(orbit.eye, orbit.center, Vec3::Y));
    }

    fn scripted_rig() -> CameraRig {
        let mut rig = CameraRig::new(Vec3::ONE, Vec3::ZERO);
        rig.add_fade_window(20.0, 30.0);
        rig.add_position_keyframe(KeyframeInterval::new(
            2.0,
            30.0,
            Vec3::new(0.0, 50.0, 100.0),
            Vec3::new(56.0, 50.0, 100.0),
        ));
        rig.add_target_keyframe(KeyframeInterval::new(2.0, 30.0, Vec3::ZERO, Vec3::new(0.0, 28.0, 0.0)));
        rig.add_position_keyframe(KeyframeInterval::new(
            30.0,
            63.0,
            Vec3::new(100.0, 80.0, 0.0),
            Vec3::new(-100.0, 80.0, 0.0),
        ));
        rig.add_target_keyframe(KeyframeInterval::new(30.0, 63.0, Vec3::ZERO, Vec3::ZERO));
        rig
    }

    /// A 66 s demo with a (20, 30) fade: at 25 s the screen is black and the camera is
    /// halfway through the stage covering 25 s.
    #[test]
    fn demo_scenario_at_25_seconds() {
        let mut rig = scripted_rig();
        let mut orbit = FixedOrbit::new();
        rig.launch_demo(66.0);
        assert_eq!(rig.fade_level(), 1.0);
        for _ in 0..25 {
            rig.update(1.0, &mut orbit);
        }
        assert_eq!(rig.demo_time(), 25.0);
        assert!(rig.is_demo());
        assert!(rig.fade_level() < 1e-6);
        let t = (25.0 - 2.0) / 28.0;
        let expected = Vec3::new(0.0, 50.0, 100.0) * (1.0 - t) + Vec3::new(56.0, 50.0, 100.0) * t;
        assert!(approx(rig.position(), expected), "{:?} vs {:?}", rig.position(), expected);
        assert!(approx(rig.demo_eye(), expected));
        // Only the 1 s frame, before the first stage, read the orbit.
        assert_eq!(orbit.ticks, 1);
    }

    /// Before the first stage the orbit controller drives the camera.
    #[test]
    fn demo_falls_back_before_first_stage() {
        let mut rig = scripted_rig();
        let mut orbit = FixedOrbit::new();
        rig.launch_demo(66.0);
        rig.update(1.0, &mut orbit);
        assert_eq!(orbit.ticks, 1);
        assert_eq!(rig.position(), orbit.eye);
        assert!(rig.is_demo());
    }

    /// Within the last half of the closing fade the orbit takes over even though a stage is active.
    #[test]
    fn demo_falls_back_in_closing_half() {
        let mut rig = scripted_rig();
        let mut orbit = FixedOrbit::new();
        rig.launch_demo(66.0);
        rig.update(62.0, &mut orbit);
        assert_eq!(orbit.ticks, 0);
        rig.update(1.5, &mut orbit);
        assert_eq!(orbit.ticks, 1);
        assert_eq!(rig.position(), orbit.eye);
    }

    /// The opening fade starts opaque, dips, and the closing window is appended at launch.
    #[test]
    fn opening_and_closing_fades() {
        let mut rig = scripted_rig();
        let mut orbit = FixedOrbit::new();
        rig.launch_demo(66.0);
        rig.update(2.0, &mut orbit);
        assert!(rig.fade_level() < 1e-6);
        rig.update(61.0, &mut orbit);
        assert!(rig.fade_level() < 1e-6, "closing fade midpoint at 63 s");
    }

    /// Between windows the last computed level is kept.
    #[test]
    fn fade_level_holds_outside_windows() {
        let mut rig = scripted_rig();
        let mut orbit = FixedOrbit::new();
        rig.launch_demo(66.0);
        rig.update(28.0, &mut orbit);
        let inside = FadeWindow::new(20.0, 30.0).level(28.0);
        assert!((rig.fade_level() - inside).abs() < 1e-6);
        rig.update(4.0, &mut orbit);
        assert!((rig.fade_level() - inside).abs() < 1e-6);
    }

    /// The demo ends itself when its clock reaches the scripted length.
    #[test]
    fn demo_ends_after_length() {
        let mut rig = scripted_rig();
        let mut orbit = FixedOrbit::new();
        rig.launch_demo(10.0);
        rig.update(9.0, &mut orbit);
        assert!(rig.is_demo());
        rig.update(1.0, &mut orbit);
        assert_eq!(rig.mode(), CameraMode::Interactive);
        assert_eq!(rig.position(), orbit.eye);
    }

    #[test]
    fn end_demo_is_idempotent() {
        let mut rig = scripted_rig();
        rig.end_demo();
        assert_eq!(rig.mode(), CameraMode::Interactive);
        rig.launch_demo(66.0);
        rig.end_demo();
        rig.end_demo();
        assert_eq!(rig.mode(), CameraMode::Interactive);
    }

    /// Relaunching resets the clock and does not stack closing windows.
    #[test]
    fn relaunch_replaces_closing_window() {
        let mut rig = scripted_rig();
        let mut orbit = FixedOrbit::new();
        rig.launch_demo(66.0);
        rig.update(5.0, &mut orbit);
        rig.launch_demo(40.0);
        assert_eq!(rig.demo_time(), 0.0);
        assert_eq!(rig.fade_windows().count(), 3);
        assert_eq!(rig.fade_windows().last(), Some(&FadeWindow::new(34.0, 40.0)));
    }

    #[test]
    fn overlaps_are_reported() {
        let mut rig = CameraRig::new(Vec3::ONE, Vec3::ZERO);
        rig.add_fade_window(2.0, 6.0);
        rig.add_position_keyframe(KeyframeInterval::new(0.0, 10.0, Vec3::ZERO, Vec3::ZERO));
        rig.add_position_keyframe(KeyframeInterval::new(10.0, 20.0, Vec3::ZERO, Vec3::ZERO));
        let overlaps = rig.validate_schedule();
        assert_eq!(overlaps, vec![ScheduleOverlap { track: "fade", first: 0, second: 1 }]);
    }

    #[test]
    fn aspect_updates_projection() {
        let mut rig = CameraRig::new(Vec3::ONE, Vec3::ZERO);
        rig.set_aspect(1920, 1080);
        assert!((rig.aspect - 16.0 / 9.0).abs() < 1e-6);
        let expected = Mat4::perspective_rh(45f32.to_radians(), 16.0 / 9.0, 0.1, 1000.0);
        assert_eq!(rig.projection_matrix(), expected);
    }
}
