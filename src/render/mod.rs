pub mod camera;
mod egui_overlay;
mod gpu;
mod pipeline;
pub mod viewport;

use std::sync::Arc;

use winit::dpi::PhysicalSize;
use winit::window::Window;

use crate::app::egui_host::EguiFrameOutput;
use crate::scene::Scene;
use camera::PerspectiveCamera;
use egui_overlay::EguiOverlay;
use gpu::GpuScene;
use pipeline::{PresentPipeline, ScenePipelines, DEPTH_FORMAT, SCENE_COLOR_FORMAT};

/// Shown where no background is drawn; linear.
const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.05,
    g: 0.05,
    b: 0.06,
    a: 1.0,
};

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("failed to create window surface: {0}")]
    SurfaceCreateFailed(String),
    #[error("no compatible GPU adapter found")]
    AdapterUnavailable,
    #[error("failed to create GPU device: {0}")]
    DeviceRequestFailed(String),
    #[error("window surface reports no supported formats")]
    UnsupportedSurface,
    #[error("failed to acquire surface frame: {0}")]
    FrameAcquireFailed(String),
}

/// Offscreen color and depth the scene renders into at raster resolution.
struct SceneTarget {
    size: [u32; 2],
    color_view: wgpu::TextureView,
    depth_view: wgpu::TextureView,
    present_bind_group: wgpu::BindGroup,
}

impl SceneTarget {
    fn new(device: &wgpu::Device, present: &PresentPipeline, size: [u32; 2]) -> Self {
        let size = fit_extent(size, device.limits().max_texture_dimension_2d);
        let extent = wgpu::Extent3d {
            width: size[0],
            height: size[1],
            depth_or_array_layers: 1,
        };
        let color = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("scene color"),
            size: extent,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: SCENE_COLOR_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let depth = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("scene depth"),
            size: extent,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let color_view = color.create_view(&wgpu::TextureViewDescriptor::default());
        let depth_view = depth.create_view(&wgpu::TextureViewDescriptor::default());
        let present_bind_group = present.bind_group(device, &color_view);
        Self {
            size,
            color_view,
            depth_view,
            present_bind_group,
        }
    }
}

/// Clamps each side into `1..=max_dimension`.
fn fit_extent(size: [u32; 2], max_dimension: u32) -> [u32; 2] {
    size.map(|side| side.clamp(1, max_dimension.max(1)))
}

pub struct RenderContext {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    pipelines: ScenePipelines,
    present: PresentPipeline,
    target: SceneTarget,
    gpu_scene: GpuScene,
    overlay: EguiOverlay,
}

impl RenderContext {
    /// `raster` is the scene resolution; the surface follows the window size.
    pub fn new(window: Arc<Window>, raster: [u32; 2]) -> Result<Self, RenderError> {
        let window_size = window.inner_size();
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let surface = instance
            .create_surface(window)
            .map_err(|err| RenderError::SurfaceCreateFailed(err.to_string()))?;
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            force_fallback_adapter: false,
            compatible_surface: Some(&surface),
        }))
        .ok_or(RenderError::AdapterUnavailable)?;
        let info = adapter.get_info();
        log::info!("Using GPU adapter {} ({:?})", info.name, info.backend);

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("vitrine device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default().using_resolution(adapter.limits()),
                memory_hints: wgpu::MemoryHints::default(),
            },
            None,
        ))
        .map_err(|err| RenderError::DeviceRequestFailed(err.to_string()))?;

        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .iter()
            .copied()
            .find(wgpu::TextureFormat::is_srgb)
            .or_else(|| caps.formats.first().copied())
            .ok_or(RenderError::UnsupportedSurface)?;
        let alpha_mode = caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);
        let [width, height] = fit_extent(
            [window_size.width, window_size.height],
            device.limits().max_texture_dimension_2d,
        );
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width,
            height,
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);
        log::info!(
            "Surface configured: {:?} {}x{}",
            format,
            config.width,
            config.height
        );

        let pipelines = ScenePipelines::new(&device);
        let present = PresentPipeline::new(&device, format);
        let target = SceneTarget::new(&device, &present, raster);
        let gpu_scene = GpuScene::new(&device, &queue, &pipelines);
        let overlay = EguiOverlay::new(&device, format);

        Ok(Self {
            surface,
            device,
            queue,
            config,
            pipelines,
            present,
            target,
            gpu_scene,
            overlay,
        })
    }

    pub fn resize_surface(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        let [width, height] = fit_extent(
            [new_size.width, new_size.height],
            self.device.limits().max_texture_dimension_2d,
        );
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
    }

    pub fn resize_raster(&mut self, raster: [u32; 2]) {
        if self.target.size == fit_extent(raster, self.device.limits().max_texture_dimension_2d) {
            return;
        }
        self.target = SceneTarget::new(&self.device, &self.present, raster);
        log::debug!("Scene target resized to {}x{}", self.target.size[0], self.target.size[1]);
    }

    /// Next surface frame, or `None` when this frame has to be skipped. A lost
    /// or outdated surface is reconfigured first.
    pub fn acquire_frame(&mut self) -> Result<Option<wgpu::SurfaceTexture>, RenderError> {
        match acquire_outcome(self.surface.get_current_texture()) {
            Acquired::Ready(frame) => Ok(Some(frame)),
            Acquired::Reconfigure => {
                self.surface.configure(&self.device, &self.config);
                Ok(None)
            }
            Acquired::Skip => {
                log::warn!("Surface frame timed out; skipping frame");
                Ok(None)
            }
            Acquired::Failed(err) => Err(err),
        }
    }

    /// Draws the scene into `frame`, blits it and puts the panel on top.
    pub fn render_frame(
        &mut self,
        frame: wgpu::SurfaceTexture,
        scene: &Scene,
        camera: &PerspectiveCamera,
        ui: Option<&EguiFrameOutput>,
    ) {
        let frame_view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let prepared = self.gpu_scene.prepare(
            &self.device,
            &self.queue,
            &self.pipelines,
            scene,
            camera,
        );

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame encoder"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("scene pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.target.color_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.target.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Discard,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            self.gpu_scene.draw(&mut pass, &self.pipelines, &prepared);
        }
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("present pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &frame_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_pipeline(self.present.pipeline());
            pass.set_bind_group(0, &self.target.present_bind_group, &[]);
            pass.draw(0..3, 0..1);
        }

        let mut command_buffers = Vec::new();
        if let Some(ui) = ui {
            command_buffers = self
                .overlay
                .update(&self.device, &self.queue, &mut encoder, ui);
            self.overlay.render(&mut encoder, &frame_view, ui);
        }
        command_buffers.push(encoder.finish());
        self.queue.submit(command_buffers);
        frame.present();

        if let Some(ui) = ui {
            self.overlay.free_textures(ui);
        }
    }
}

#[derive(Debug)]
enum Acquired<T> {
    Ready(T),
    Reconfigure,
    Skip,
    Failed(RenderError),
}

fn acquire_outcome<T>(result: Result<T, wgpu::SurfaceError>) -> Acquired<T> {
    match result {
        Ok(frame) => Acquired::Ready(frame),
        Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => Acquired::Reconfigure,
        Err(wgpu::SurfaceError::Timeout) => Acquired::Skip,
        Err(err) => Acquired::Failed(RenderError::FrameAcquireFailed(err.to_string())),
    }
}
