//! Application shell: winit event loop wiring, per-frame update order, and
//! the egui overlay. The frame loop owns all mutation of the registry; the
//! renderer and panel only see snapshots.

mod panel;

use crate::asset::RoomLoader;
use crate::camera::{Camera3D, OrbitController};
use crate::cli::CliArgs;
use crate::config::AppConfig;
use crate::events::EventLog;
use crate::input::{Input, InputEvent};
use crate::registry::{self, SceneRegistry};
use crate::renderer::{EguiFrame, Renderer};
use crate::time::Time;
use anyhow::{Context, Result};
use glam::{Vec2, Vec3};
use winit::application::ApplicationHandler;
use winit::event::{DeviceEvent, ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::keyboard::{Key, NamedKey};

use egui::Context as EguiCtx;
use egui_wgpu::{Renderer as EguiRenderer, RendererOptions, ScreenDescriptor};
use egui_winit::State as EguiWinit;

const INITIAL_ROOM_ID: &str = "gaming";
const INITIAL_CAMERA_POSITION: Vec3 = Vec3::new(6.0, 4.0, 8.0);
const LOOK_TARGET: Vec3 = Vec3::new(0.0, 1.5, 0.0);
const ORBIT_SENSITIVITY: f32 = 0.005;
const ZOOM_SENSITIVITY: f32 = 0.1;

pub fn run() -> Result<()> {
    run_with_args(CliArgs::default())
}

pub fn run_with_args(args: CliArgs) -> Result<()> {
    // An explicit --config must fail loudly; the default path falls back.
    let mut config = match &args.config_path {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::load_or_default("config/app.json"),
    };
    config.apply_overrides(&args.window_overrides());
    let initial_room = args.room.unwrap_or_else(|| INITIAL_ROOM_ID.to_string());
    let event_loop = EventLoop::new().context("Failed to create winit event loop")?;
    let mut app = App::new(config, initial_room);
    event_loop.run_app(&mut app).context("Event loop execution failed")?;
    Ok(())
}

pub struct App {
    config: AppConfig,
    renderer: Renderer,
    registry: SceneRegistry,
    loader: RoomLoader,
    events: EventLog,
    orbit: OrbitController,
    input: Input,
    time: Time,
    initial_room: String,
    should_close: bool,

    egui_ctx: EguiCtx,
    egui_winit: Option<EguiWinit>,
    egui_renderer: Option<EguiRenderer>,
    egui_screen: Option<ScreenDescriptor>,
}

impl App {
    pub fn new(config: AppConfig, initial_room: String) -> Self {
        let renderer = Renderer::new(&config.window);
        let registry = SceneRegistry::new(&config.viewer);
        let loader = RoomLoader::new(&config.viewer.models_root);
        let orbit =
            OrbitController::from_position(INITIAL_CAMERA_POSITION, LOOK_TARGET, config.camera.damping);
        Self {
            config,
            renderer,
            registry,
            loader,
            events: EventLog::default(),
            orbit,
            input: Input::new(),
            time: Time::new(),
            initial_room,
            should_close: false,
            egui_ctx: EguiCtx::default(),
            egui_winit: None,
            egui_renderer: None,
            egui_screen: None,
        }
    }

    fn camera(&self) -> Camera3D {
        self.orbit.camera(
            self.config.camera.fov_degrees.to_radians(),
            self.config.camera.near,
            self.config.camera.far,
        )
    }

    fn apply_camera_input(&mut self, dt: f32) {
        let (dx, dy) = self.input.mouse_delta();
        if self.input.left_held() && (dx != 0.0 || dy != 0.0) {
            self.orbit.orbit(Vec2::new(-dx, -dy) * ORBIT_SENSITIVITY);
        }
        let wheel = self.input.wheel_delta();
        if wheel != 0.0 {
            self.orbit.zoom((-wheel * ZOOM_SENSITIVITY).exp());
        }
        self.orbit.advance(dt);
    }

    fn handle_click(&mut self) {
        if !self.input.take_left_click() {
            return;
        }
        let Some((x, y)) = self.input.cursor_position() else {
            return;
        };
        let camera = self.camera();
        if let Some((origin, direction)) = camera.screen_ray(Vec2::new(x, y), self.renderer.size()) {
            self.registry.click(origin, direction, &mut self.events);
        }
    }

    fn apply_panel_actions(&mut self, actions: panel::PanelActions) {
        if let Some(room) = actions.switch_room {
            self.registry.switch_room(room, &self.loader, &mut self.events);
        }
        if actions.clear_selection {
            self.registry.clear_selection(&mut self.events);
        }
        if actions.toggle_device {
            self.registry.toggle_selected(&mut self.events);
        }
        if actions.fridge_delta != 0.0 {
            self.registry.adjust_fridge_temperature(actions.fridge_delta);
        }
        if actions.stove_delta != 0.0 {
            self.registry.adjust_stove_temperature(actions.stove_delta);
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if let Err(err) = self.renderer.ensure_window(event_loop) {
            eprintln!("Renderer initialization error: {err:?}");
            self.should_close = true;
            return;
        }
        if let Err(err) = self.renderer.init_scene_pipeline() {
            eprintln!("Failed to initialize scene pipeline: {err:?}");
            self.should_close = true;
            return;
        }

        if self.egui_winit.is_none() {
            if let Some(window) = self.renderer.window() {
                let state = EguiWinit::new(
                    self.egui_ctx.clone(),
                    egui::ViewportId::ROOT,
                    window,
                    Some(window.scale_factor() as f32),
                    window.theme(),
                    None,
                );
                self.egui_winit = Some(state);
            }
        }
        if self.egui_renderer.is_none() {
            let painter = match (self.renderer.device(), self.renderer.surface_format()) {
                (Ok(device), Ok(format)) => EguiRenderer::new(device, format, RendererOptions::default()),
                (Err(err), _) | (_, Err(err)) => {
                    eprintln!("Unable to initialize egui renderer: {err:?}");
                    self.should_close = true;
                    return;
                }
            };
            self.egui_renderer = Some(painter);
        }
        let size = self.renderer.size();
        self.egui_screen = Some(ScreenDescriptor {
            size_in_pixels: [size.width, size.height],
            pixels_per_point: self.egui_ctx.pixels_per_point(),
        });

        if self.registry.current_room_id().is_none() && !self.registry.load_in_flight() {
            if let Some(room) = registry::find_room(&self.initial_room) {
                self.registry.switch_room(room, &self.loader, &mut self.events);
            }
        }
    }

    fn window_event(&mut self, _el: &ActiveEventLoop, id: winit::window::WindowId, event: WindowEvent) {
        // egui wants the events too
        let mut consumed = false;
        let input_event = InputEvent::from_window_event(&event);
        let is_cursor_event = matches!(&input_event, InputEvent::CursorPos { .. });
        if let (Some(window), Some(state)) = (self.renderer.window(), self.egui_winit.as_mut()) {
            if id == window.id() {
                let resp = state.on_window_event(window, &event);
                if resp.consumed {
                    consumed = true;
                }
            }
        }
        if !consumed || is_cursor_event {
            self.input.push(input_event);
        }
        if consumed {
            return;
        }

        match &event {
            WindowEvent::CloseRequested => self.should_close = true,
            WindowEvent::Resized(size) => {
                self.renderer.resize(*size);
                if let Some(screen) = &mut self.egui_screen {
                    screen.size_in_pixels = [size.width, size.height];
                }
            }
            WindowEvent::KeyboardInput { event: KeyEvent { logical_key, state, .. }, .. } => {
                if let Key::Named(NamedKey::Escape) = logical_key {
                    if *state == ElementState::Pressed {
                        self.should_close = true;
                    }
                }
            }
            _ => {}
        }
    }

    fn device_event(&mut self, _e: &ActiveEventLoop, _dev: winit::event::DeviceId, ev: DeviceEvent) {
        self.input.push(InputEvent::from_device_event(&ev));
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.should_close {
            event_loop.exit();
            return;
        }
        self.time.tick();
        let dt = self.time.delta_seconds();

        self.apply_camera_input(dt);
        self.handle_click();
        self.registry.pump(&self.loader, &mut self.events);

        let raw_input = {
            let (Some(window), Some(state)) = (self.renderer.window(), self.egui_winit.as_mut())
            else {
                return;
            };
            state.take_egui_input(window)
        };
        let mut actions = panel::PanelActions::default();
        let full_output = self.egui_ctx.run(raw_input, |ctx| {
            actions = panel::draw(ctx, &self.registry, &self.events);
        });
        self.apply_panel_actions(actions);

        let egui::FullOutput { platform_output, textures_delta, shapes, .. } = full_output;
        if let (Some(window), Some(state)) = (self.renderer.window(), self.egui_winit.as_mut()) {
            state.handle_platform_output(window, platform_output);
        }
        if let Some(screen) = self.egui_screen.as_mut() {
            screen.pixels_per_point = self.egui_ctx.pixels_per_point();
        }

        let camera = self.camera();
        if let (Some(painter), Some(screen)) = (self.egui_renderer.as_mut(), self.egui_screen.as_ref())
        {
            if let Ok(device) = self.renderer.device() {
                if let Ok(queue) = self.renderer.queue() {
                    for (tex_id, delta) in &textures_delta.set {
                        painter.update_texture(device, queue, *tex_id, delta);
                    }
                }
            }
            let paint_jobs = self.egui_ctx.tessellate(shapes, screen.pixels_per_point);
            let ui = EguiFrame { painter: &mut *painter, paint_jobs: &paint_jobs, screen };
            if let Err(err) = self.renderer.render_frame(&self.registry, &camera, Some(ui)) {
                eprintln!("Frame skipped: {err:?}");
            }
            for tex_id in &textures_delta.free {
                painter.free_texture(tex_id);
            }
        } else if let Err(err) = self.renderer.render_frame(&self.registry, &camera, None) {
            eprintln!("Frame skipped: {err:?}");
        }

        self.input.clear_frame();
        if let Some(window) = self.renderer.window() {
            window.request_redraw();
        }
    }
}
