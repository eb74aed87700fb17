//! duneshade: deferred-rendered procedural dunes with a scripted fly-through.

mod config;
mod frame;
mod input;
mod orbit;
mod setup;

use std::sync::Arc;

use anyhow::{Context, Result};
use engine_core::Time;
use renderer::{CameraRig, RenderSettings, Renderer};
use winit::application::ApplicationHandler;
use winit::event::{DeviceEvent, DeviceId, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Fullscreen, Window, WindowId};

use config::SceneControls;
use input::InputState;
use orbit::TurntableOrbit;
use setup::{Scene, DEMO_LENGTH, INITIAL_CENTER, INITIAL_EYE};

/// Frames between FPS log lines.
const FPS_LOG_INTERVAL: u64 = 600;

pub struct SceneState {
    pub renderer: Renderer,
    pub camera: CameraRig,
    orbit: TurntableOrbit,
    input: InputState,
    pub time: Time,
    controls: SceneControls,
    pub settings: RenderSettings,
    pub scene: Scene,
    running: bool,
}

impl SceneState {
    async fn new(window: Arc<Window>, controls: SceneControls) -> Result<Self> {
        let mut renderer = Renderer::new(window, controls.particle_count)
            .await
            .context("creating renderer")?;
        let (width, height) = renderer.dimensions();

        let mut camera = CameraRig::new(INITIAL_EYE, INITIAL_CENTER);
        camera.set_aspect(width, height);
        setup::install_demo_script(&mut camera);
        if controls.demo_on_start {
            camera.launch_demo(DEMO_LENGTH);
        }

        let scene = Scene::build(&mut renderer, &controls);
        let settings = controls.render_settings();
        log::info!(
            "Scene ready: post {:?}, seed {}, {} particles",
            settings.post_type,
            controls.seed,
            controls.particle_count
        );

        Ok(Self {
            renderer,
            camera,
            orbit: TurntableOrbit::new(INITIAL_EYE, INITIAL_CENTER, controls.orbit_sensitivity),
            input: InputState::new(),
            time: Time::new(),
            controls,
            settings,
            scene,
            running: true,
        })
    }

    /// Returns true when the app should exit.
    fn handle_window_event(&mut self, event: WindowEvent) -> bool {
        match event {
            WindowEvent::CloseRequested => {
                self.running = false;
                true
            }
            WindowEvent::Resized(size) => {
                self.renderer.resize(size.width, size.height);
                self.camera.set_aspect(size.width, size.height);
                false
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(key) = event.physical_key {
                    self.input.process_keyboard(key, event.state);
                }
                false
            }
            WindowEvent::MouseInput { state, button, .. } => {
                self.input.process_mouse_button(button, state);
                false
            }
            WindowEvent::MouseWheel { delta, .. } => {
                self.input.process_scroll(delta);
                false
            }
            WindowEvent::RedrawRequested => {
                self.update();
                if let Err(e) = frame::run(self) {
                    log::error!("Render error: {}", e);
                    self.running = false;
                    return true;
                }
                self.renderer.window.request_redraw();
                !self.running
            }
            _ => false,
        }
    }

    fn handle_device_event(&mut self, event: DeviceEvent) {
        if let DeviceEvent::MouseMotion { delta } = event {
            self.input.process_mouse_motion(delta);
        }
    }

    fn update(&mut self) {
        self.time.update();
        self.input.begin_frame();

        if self.input.is_key_pressed(KeyCode::Escape) {
            self.running = false;
            return;
        }
        if self.input.is_key_pressed(KeyCode::KeyP) {
            if self.camera.is_demo() {
                log::info!("Restarting demo");
            }
            self.camera.launch_demo(DEMO_LENGTH);
        }

        self.orbit.drag(self.input.drag_delta());
        self.orbit.pan(self.input.pan_delta());
        self.orbit.zoom(self.input.scroll());

        let dt = self.time.delta_seconds() * self.controls.demo_speed;
        self.camera.update(dt, &mut self.orbit);

        if self.time.frame_count() % FPS_LOG_INTERVAL == 0 {
            log::debug!("{:.1} fps", self.time.fps());
        }
    }
}

struct App {
    state: Option<SceneState>,
}

impl App {
    fn new() -> Self {
        Self { state: None }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }

        if !config::config_path().exists() {
            log::info!("No config.ron found, writing defaults to {:?}", config::config_path());
            SceneControls::default().save();
        }
        let controls = SceneControls::load();

        let mut window_attrs = Window::default_attributes()
            .with_title("duneshade")
            .with_inner_size(winit::dpi::LogicalSize::new(controls.window_width, controls.window_height));
        if controls.fullscreen {
            window_attrs = window_attrs.with_fullscreen(Some(Fullscreen::Borderless(None)));
        }

        let window = match event_loop.create_window(window_attrs) {
            Ok(w) => Arc::new(w),
            Err(e) => {
                log::error!("Failed to create window: {}", e);
                event_loop.exit();
                return;
            }
        };

        match pollster::block_on(SceneState::new(window.clone(), controls)) {
            Ok(s) => {
                self.state = Some(s);
                window.request_redraw();
            }
            Err(e) => {
                log::error!("Failed to initialize scene: {:#}", e);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        if let Some(state) = &mut self.state {
            if state.handle_window_event(event) || !state.running {
                event_loop.exit();
            }
        }
    }

    fn device_event(&mut self, _: &ActiveEventLoop, _: DeviceId, event: DeviceEvent) {
        if let Some(state) = &mut self.state {
            state.handle_device_event(event);
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    println!("duneshade");
    println!("  Left drag   - orbit the camera");
    println!("  Right drag  - pan");
    println!("  Wheel       - zoom");
    println!("  P           - play the demo fly-through");
    println!("  Escape      - quit");
    println!("  Settings are read from config.ron in the working directory.");

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new();
    event_loop.run_app(&mut app)?;

    Ok(())
}
