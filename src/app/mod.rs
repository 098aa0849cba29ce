pub mod egui_host;
mod events;
mod input;
mod timing;

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use glam::Vec3;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop, EventLoopProxy};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowAttributes, WindowId};

use crate::config::{AppConfig, ConfigError, CONFIG_FILE_NAME};
use crate::render::camera::{OrbitController, PerspectiveCamera};
use crate::render::viewport::{Viewport, ViewportChange};
use crate::render::{RenderContext, RenderError};
use crate::scene::binder::bind_model;
use crate::scene::environment;
use crate::scene::lighting::install_rig;
use crate::scene::serialization::{load_presets_from_file, save_presets_to_file, PresetError};
use crate::scene::Scene;
use crate::ui::{ControlPanel, PanelAction, PresetReport};
use egui_host::EguiHost;
pub use events::{spawn_load, AppEvent, LoadRequest};
use input::{wheel_steps, DragMode, InputState};
use timing::FrameTiming;

/// Orbit angle applied per frame while an arrow key is held, in radians.
const KEY_ORBIT_STEP: f32 = 0.02;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("event loop failed: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
    #[error("failed to create window: {0}")]
    Window(#[from] winit::error::OsError),
    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Everything the viewer owns, created once at startup and handed to the
/// event handlers by reference.
pub struct AppContext {
    pub config: AppConfig,
    pub scene: Scene,
    pub camera: PerspectiveCamera,
    pub controls: OrbitController,
    pub viewport: Viewport,
    pub panel: ControlPanel,
}

impl AppContext {
    pub fn new(config: AppConfig) -> Self {
        let aspect = config.window.width.max(1) as f32 / config.window.height.max(1) as f32;
        let camera = PerspectiveCamera::from_config(&config.camera, aspect);
        let controls = OrbitController::new(Vec3::from(config.camera.target), config.controls.clone());
        let viewport = Viewport::new(config.max_pixel_ratio);
        let mut scene = Scene::new();
        install_rig(&mut scene, &config.lights);

        Self {
            config,
            scene,
            camera,
            controls,
            viewport,
            panel: ControlPanel::new(),
        }
    }

    /// Environment and model loads issued once the window exists.
    pub fn startup_requests(&self) -> Vec<LoadRequest> {
        vec![
            LoadRequest::Environment(self.config.assets.environment_path()),
            LoadRequest::Model(self.config.assets.model_path()),
        ]
    }

    /// Applies a finished load to the scene and returns follow-up loads.
    pub fn handle_event(&mut self, event: AppEvent) -> Vec<LoadRequest> {
        match event {
            AppEvent::EnvironmentLoaded { path, result } => match result {
                Ok(image) => {
                    environment::install(
                        &mut self.scene,
                        image,
                        &path,
                        self.config.background,
                        self.config.environment_filters,
                    );
                    self.panel
                        .push_status(format!("Environment {} loaded", path.display()));
                }
                Err(err) => {
                    log::error!("Environment load failed: {}", err);
                    self.panel.push_error(format!("Environment: {}", err));
                }
            },
            AppEvent::ModelLoaded { path, result } => match result {
                Ok(model) => {
                    let root = model.insert_into(&mut self.scene);
                    let report = bind_model(
                        &mut self.scene,
                        root,
                        &self.config.materials,
                        &self.config.assets.root,
                        &mut self.panel,
                    );
                    log::info!(
                        "Model {} bound: {} bottle, {} cap, {} label, {} unmatched, {} textures known",
                        path.display(),
                        report.bottles.len(),
                        report.caps.len(),
                        report.labels.len(),
                        report.unmatched,
                        self.scene.textures.len()
                    );
                    self.panel.push_status(format!(
                        "Model {} loaded ({} nodes bound)",
                        path.display(),
                        report.replaced()
                    ));
                    for violation in &report.violations {
                        self.panel.push_error(violation.to_string());
                    }
                    return self
                        .scene
                        .textures
                        .take_load_requests()
                        .into_iter()
                        .map(LoadRequest::Texture)
                        .collect();
                }
                Err(err) => {
                    log::error!("Model load failed: {}", err);
                    self.panel.push_error(format!("Model: {}", err));
                }
            },
            AppEvent::TextureLoaded { id, path, result } => {
                if let Err(err) = &result {
                    log::error!("Texture load failed: {}", err);
                    self.panel.push_error(format!("Texture: {}", err));
                } else {
                    log::debug!("Texture {} decoded", path.display());
                }
                self.scene
                    .textures
                    .complete(id, result.map_err(|err| err.to_string()));
            }
        }
        Vec::new()
    }

    /// Per-frame update: exactly one orbit step, then transforms and projection.
    pub fn tick(&mut self, key_orbit: (f32, f32)) {
        let (horizontal, vertical) = key_orbit;
        if horizontal != 0.0 {
            self.controls.rotate_left(-horizontal * KEY_ORBIT_STEP);
        }
        if vertical != 0.0 {
            self.controls.rotate_up(-vertical * KEY_ORBIT_STEP);
        }
        self.controls.update(&mut self.camera);
        self.scene.update_world_transforms();
        if self.camera.projection_dirty() {
            self.camera.update_projection_matrix();
        }
    }

    pub fn resize(&mut self, physical: PhysicalSize<u32>, scale_factor: f64) -> Option<ViewportChange> {
        self.viewport.on_resize(physical, scale_factor, &mut self.camera)
    }

    pub fn save_presets(&self, path: &Path) -> Result<(), PresetError> {
        let presets = self.panel.capture_presets(&self.scene);
        save_presets_to_file(&presets, path)?;
        log::info!("Material presets saved to {}", path.display());
        Ok(())
    }

    pub fn load_presets(&mut self, path: &Path) -> Result<PresetReport, PresetError> {
        let presets = load_presets_from_file(path)?;
        let report = self.panel.apply_presets(&presets, &mut self.scene);
        log::info!(
            "Material presets loaded from {}: {} applied, {} skipped",
            path.display(),
            report.applied,
            report.skipped
        );
        Ok(report)
    }
}

pub struct App {
    context: AppContext,
    proxy: EventLoopProxy<AppEvent>,
    window: Option<Arc<Window>>,
    render: Option<RenderContext>,
    egui: Option<EguiHost>,
    input: InputState,
    timing: FrameTiming,
    fatal: Option<AppError>,
}

impl App {
    fn new(config: AppConfig, proxy: EventLoopProxy<AppEvent>) -> Self {
        let timing = FrameTiming::new(config.window.title.clone());
        Self {
            context: AppContext::new(config),
            proxy,
            window: None,
            render: None,
            egui: None,
            input: InputState::default(),
            timing,
            fatal: None,
        }
    }

    fn init_window(&mut self, event_loop: &ActiveEventLoop) -> Result<(), AppError> {
        let window_config = &self.context.config.window;
        let window_attrs = WindowAttributes::default()
            .with_title(window_config.title.clone())
            .with_inner_size(PhysicalSize::new(window_config.width, window_config.height))
            .with_resizable(true);
        let window = Arc::new(event_loop.create_window(window_attrs)?);

        let size = window.inner_size();
        self.context.resize(size, window.scale_factor());
        let render = RenderContext::new(window.clone(), self.context.viewport.raster_size())?;
        self.egui = Some(EguiHost::new(&window));
        self.render = Some(render);
        self.timing.retarget(&window);
        log::info!("Window created: {}x{}", size.width, size.height);
        self.window = Some(window);

        for request in self.context.startup_requests() {
            self.spawn(request);
        }
        Ok(())
    }

    fn spawn(&self, request: LoadRequest) {
        if let Err(err) = spawn_load(&self.proxy, request) {
            log::error!("Failed to start loader thread: {}", err);
        }
    }

    fn handle_resize(&mut self, new_size: PhysicalSize<u32>, scale_factor: f64) {
        if let Some(render) = &mut self.render {
            render.resize_surface(new_size);
        }
        if let Some(change) = self.context.resize(new_size, scale_factor) {
            if let Some(render) = &mut self.render {
                render.resize_raster(change.raster);
            }
        }
    }

    /// The orbit only advances on frames that are actually drawn.
    fn redraw(&mut self) {
        let frame_start = Instant::now();
        let (Some(window), Some(render), Some(egui)) =
            (self.window.as_ref(), self.render.as_mut(), self.egui.as_mut())
        else {
            return;
        };
        let frame = match render.acquire_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                self.timing.finish_frame(Some(window.as_ref()), frame_start);
                return;
            }
            Err(err) => {
                log::error!("Frame failed: {}", err);
                self.timing.finish_frame(Some(window.as_ref()), frame_start);
                return;
            }
        };
        let context = &mut self.context;
        context.tick(self.input.key_orbit());
        let (ui, action) = egui.run_panel(window, &mut context.panel, &mut context.scene);
        render.render_frame(frame, &context.scene, &context.camera, Some(&ui));
        self.timing.finish_frame(Some(window.as_ref()), frame_start);

        if let Some(action) = action {
            self.handle_panel_action(action);
        }
    }

    fn handle_panel_action(&mut self, action: PanelAction) {
        match action {
            PanelAction::SavePresets => {
                let Some(path) = rfd::FileDialog::new()
                    .add_filter("Material presets", &["json"])
                    .set_file_name("materials.json")
                    .save_file()
                else {
                    return;
                };
                match self.context.save_presets(&path) {
                    Ok(()) => self
                        .context
                        .panel
                        .push_status(format!("Saved presets to {}", path.display())),
                    Err(err) => {
                        log::warn!("Failed to save presets: {}", err);
                        self.context.panel.push_error(format!("Save failed: {}", err));
                    }
                }
            }
            PanelAction::LoadPresets => {
                let Some(path) = rfd::FileDialog::new()
                    .add_filter("Material presets", &["json"])
                    .pick_file()
                else {
                    return;
                };
                match self.context.load_presets(&path) {
                    Ok(report) => self.context.panel.push_status(format!(
                        "Loaded presets: {} applied, {} skipped",
                        report.applied, report.skipped
                    )),
                    Err(err) => {
                        log::warn!("Failed to load presets: {}", err);
                        self.context.panel.push_error(format!("Load failed: {}", err));
                    }
                }
            }
        }
    }
}

impl ApplicationHandler<AppEvent> for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(err) = self.init_window(event_loop) {
            log::error!("{}", err);
            self.fatal = Some(err);
            event_loop.exit();
        }
    }

    fn user_event(&mut self, _event_loop: &ActiveEventLoop, event: AppEvent) {
        for request in self.context.handle_event(event) {
            self.spawn(request);
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let Some(window) = self.window.clone() else {
            return;
        };
        let consumed = self
            .egui
            .as_mut()
            .is_some_and(|egui| egui.on_window_event(&window, &event));
        let pointer_on_panel = self.egui.as_ref().is_some_and(EguiHost::wants_pointer);

        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested, shutting down");
                event_loop.exit();
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if event.physical_key == PhysicalKey::Code(KeyCode::Escape) {
                    log::info!("Escape pressed, shutting down");
                    event_loop.exit();
                    return;
                }
                let pressed = event.state == ElementState::Pressed;
                // Releases always go through so keys never stick.
                if !consumed || !pressed {
                    self.input.handle_key(event.physical_key, pressed);
                }
            }
            WindowEvent::Resized(new_size) => {
                self.handle_resize(new_size, window.scale_factor());
                self.timing.retarget(&window);
            }
            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                self.handle_resize(window.inner_size(), scale_factor);
            }
            WindowEvent::Moved(_) => {
                self.timing.retarget(&window);
            }
            WindowEvent::CursorMoved { position, .. } => {
                if let Some((mode, dx, dy)) = self.input.cursor_moved(position.x, position.y) {
                    let height = window.inner_size().height as f32;
                    let context = &mut self.context;
                    match mode {
                        DragMode::Orbit => context.controls.handle_drag(dx, dy, height),
                        DragMode::Pan => {
                            context.controls.handle_pan(dx, dy, height, &context.camera);
                        }
                    }
                }
            }
            WindowEvent::CursorLeft { .. } => {
                self.input.cursor_left();
            }
            WindowEvent::MouseInput { state, button, .. } => {
                self.input
                    .handle_button(button, state, consumed || pointer_on_panel);
            }
            WindowEvent::MouseWheel { delta, .. } => {
                if !consumed && !pointer_on_panel {
                    self.context.controls.handle_wheel(wheel_steps(delta));
                }
            }
            WindowEvent::RedrawRequested => {
                self.redraw();
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.timing.frame_due(Instant::now()) {
            if let Some(window) = &self.window {
                window.request_redraw();
            }
        }
        event_loop.set_control_flow(ControlFlow::WaitUntil(self.timing.next_frame()));
    }
}

pub fn run() -> Result<(), AppError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let config = AppConfig::load_or_default(Path::new(CONFIG_FILE_NAME))?;
    log::info!("Vitrine starting; press Esc or close the window to exit");

    let event_loop = EventLoop::<AppEvent>::with_user_event().build()?;
    event_loop.set_control_flow(ControlFlow::Wait);

    let mut app = App::new(config, event_loop.create_proxy());
    event_loop.run_app(&mut app)?;
    if let Some(err) = app.fatal.take() {
        return Err(err);
    }

    log::info!("Goodbye");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{AppContext, AppEvent, LoadRequest};
    use crate::assets::gltf::{LoadedModel, ModelNode, ModelPrimitive};
    use crate::assets::AssetError;
    use crate::config::AppConfig;
    use crate::scene::environment::EnvironmentImage;
    use crate::scene::material::Side;
    use crate::scene::textures::TextureState;
    use crate::scene::{MeshData, Vertex};
    use glam::Mat4;
    use std::path::PathBuf;

    fn triangle() -> MeshData {
        let vertex = |x: f32, y: f32| Vertex {
            position: [x, y, 0.0],
            normal: [0.0, 0.0, 1.0],
            uv: [x, y],
        };
        MeshData::new(vec![vertex(0.0, 0.0), vertex(1.0, 0.0), vertex(0.0, 1.0)], vec![0, 1, 2])
    }

    fn product_model() -> LoadedModel {
        let names = ["Bottle_01", "Cap_01", "Label_Front", "Stand"];
        LoadedModel {
            name: "50g".to_string(),
            nodes: names
                .iter()
                .map(|name| ModelNode {
                    name: name.to_string(),
                    local: Mat4::IDENTITY,
                    primitives: vec![0],
                    children: Vec::new(),
                })
                .collect(),
            roots: vec![0, 1, 2, 3],
            primitives: vec![ModelPrimitive {
                mesh: triangle(),
                material: None,
            }],
            materials: Vec::new(),
            images: Vec::new(),
        }
    }

    #[test]
    fn context_starts_with_the_light_rig_and_camera() {
        let context = AppContext::new(AppConfig::default());
        assert_eq!(context.scene.lights.len(), 3);
        assert_eq!(context.camera.position.to_array(), [0.0, 0.7, 2.0]);
        assert_eq!(
            context.startup_requests(),
            vec![
                LoadRequest::Environment(PathBuf::from("assets/env.hdr")),
                LoadRequest::Model(PathBuf::from("assets/50g.gltf")),
            ]
        );
    }

    #[test]
    fn environment_event_enables_the_background() {
        let mut context = AppContext::new(AppConfig::default());
        let followups = context.handle_event(AppEvent::EnvironmentLoaded {
            path: PathBuf::from("assets/env.hdr"),
            result: Ok(EnvironmentImage {
                width: 2,
                height: 1,
                texels: vec![1.0; 8],
            }),
        });
        assert!(followups.is_empty());
        assert!(context.scene.environment().is_some());
        assert!(context.scene.background.enabled);
        assert_eq!(context.scene.background.blurriness, 0.1);
    }

    #[test]
    fn model_event_binds_materials_and_requests_label_textures() {
        let mut context = AppContext::new(AppConfig::default());
        let followups = context.handle_event(AppEvent::ModelLoaded {
            path: PathBuf::from("assets/50g.gltf"),
            result: Ok(product_model()),
        });

        let bottle = context.scene.find_by_name("Bottle_01").unwrap();
        let material = context.scene.node(bottle).unwrap().material.as_ref().unwrap();
        assert_eq!(material.transmission, 1.0);
        assert_eq!(material.side, Side::Double);
        assert_eq!(context.panel.material_groups(), 2);
        assert_eq!(context.panel.texture_selectors(), 1);
        assert_eq!(context.panel.visibility_toggles(), 1);

        let paths: Vec<PathBuf> = followups
            .into_iter()
            .map(|request| match request {
                LoadRequest::Texture(texture) => texture.path,
                other => panic!("unexpected request {:?}", other),
            })
            .collect();
        assert_eq!(
            paths,
            vec![PathBuf::from("assets/Label1.png"), PathBuf::from("assets/Label2.png")]
        );
    }

    #[test]
    fn failed_texture_is_recorded_and_reported() {
        let mut context = AppContext::new(AppConfig::default());
        let requests = context.handle_event(AppEvent::ModelLoaded {
            path: PathBuf::from("assets/50g.gltf"),
            result: Ok(product_model()),
        });
        let LoadRequest::Texture(request) = requests[0].clone() else {
            panic!("expected a texture request");
        };
        let path = request.path.clone();
        context.handle_event(AppEvent::TextureLoaded {
            id: request.id,
            path: path.clone(),
            result: Err(AssetError::EmptyImage {
                path: path.display().to_string(),
            }),
        });
        assert!(matches!(
            context.scene.textures.state(request.id),
            Some(TextureState::Failed(_))
        ));
        assert!(context.panel.status_lines().any(|line| line.contains("Texture")));
    }

    #[test]
    fn held_arrow_key_orbits_the_camera() {
        let mut context = AppContext::new(AppConfig::default());
        let start = context.camera.position;
        for _ in 0..5 {
            context.tick((1.0, 0.0));
        }
        assert!(context.camera.position.distance(start) > 1e-3);
        assert!(!context.camera.projection_dirty());
    }

    #[test]
    fn presets_round_trip_through_a_file() {
        let mut context = AppContext::new(AppConfig::default());
        context.handle_event(AppEvent::ModelLoaded {
            path: PathBuf::from("assets/50g.gltf"),
            result: Ok(product_model()),
        });
        let bottle = context.scene.find_by_name("Bottle_01").unwrap();

        let mut path = std::env::temp_dir();
        path.push(format!("vitrine_app_presets_{}.json", std::process::id()));
        context
            .scene
            .node_mut(bottle)
            .unwrap()
            .material
            .as_mut()
            .unwrap()
            .set_roughness(0.4);
        context.save_presets(&path).unwrap();

        context
            .scene
            .node_mut(bottle)
            .unwrap()
            .material
            .as_mut()
            .unwrap()
            .set_roughness(0.9);
        let report = context.load_presets(&path);
        let _ = std::fs::remove_file(&path);

        assert!(report.unwrap().applied >= 1);
        let material = context.scene.node(bottle).unwrap().material.as_ref().unwrap();
        assert_eq!(material.roughness, 0.4);
    }
}
