use std::collections::HashMap;

use glam::{Mat4, Vec3};
use wgpu::util::DeviceExt;

use crate::assets::texture::fit_within;
use crate::render::camera::PerspectiveCamera;
use crate::render::pipeline::{pipeline_index, ScenePipelines};
use crate::scene::environment::{EnvironmentFilters, EnvironmentImage, Filter};
use crate::scene::lighting::MAX_LIGHTS;
use crate::scene::material::{EnvMapBinding, PhysicalMaterial};
use crate::scene::textures::{TextureId, TextureStore};
use crate::scene::{DrawItem, MeshData, MeshId, Scene};

/// Per-frame values shared by every draw. Layout matches `Frame` in common.wgsl.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FrameUniform {
    pub view_proj: [[f32; 4]; 4],
    pub inv_view_proj: [[f32; 4]; 4],
    pub camera_position: [f32; 4],
    pub light_positions: [[f32; 4]; MAX_LIGHTS],
    pub light_colors: [[f32; 4]; MAX_LIGHTS],
    pub environment: [f32; 4],
    pub params: [f32; 4],
}

impl FrameUniform {
    /// `environment_levels` is the mip count of the uploaded environment, zero when none is bound.
    pub fn new(scene: &Scene, camera: &PerspectiveCamera, environment_levels: u32) -> Self {
        let view_proj = camera.view_projection();
        let mut light_positions = [[0.0; 4]; MAX_LIGHTS];
        let mut light_colors = [[0.0; 4]; MAX_LIGHTS];
        let light_count = scene.lights.len().min(MAX_LIGHTS);
        for (index, light) in scene.lights.iter().take(MAX_LIGHTS).enumerate() {
            light_positions[index] = light.position.extend(light.intensity).to_array();
            let [r, g, b] = light.color.to_array();
            light_colors[index] = [r, g, b, 1.0];
        }

        let has_environment = environment_levels > 0;
        let max_mip = environment_levels.saturating_sub(1) as f32;
        let background = scene.background;
        let show_background = has_environment && background.enabled;

        Self {
            view_proj: view_proj.to_cols_array_2d(),
            inv_view_proj: view_proj.inverse().to_cols_array_2d(),
            camera_position: camera.position.extend(1.0).to_array(),
            light_positions,
            light_colors,
            environment: [
                if has_environment { 1.0 } else { 0.0 },
                max_mip,
                background.blurriness.clamp(0.0, 1.0),
                background.intensity,
            ],
            params: [
                light_count as f32,
                if show_background { 1.0 } else { 0.0 },
                0.0,
                0.0,
            ],
        }
    }

    pub fn background_enabled(&self) -> bool {
        self.params[1] > 0.5
    }
}

/// Per-draw material and transform. Layout matches `Draw` in scene.wgsl.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct DrawUniform {
    pub model: [[f32; 4]; 4],
    pub normal_matrix: [[f32; 4]; 4],
    pub base_color: [f32; 4],
    pub pbr: [f32; 4],
    pub extra: [f32; 4],
}

impl DrawUniform {
    pub fn new(world: Mat4, material: &PhysicalMaterial) -> Self {
        let normal_matrix = if world.determinant().abs() > f32::EPSILON {
            world.inverse().transpose()
        } else {
            world
        };
        let [r, g, b] = material.color.to_array();
        let env_bound = match material.env_map {
            EnvMapBinding::Scene => 1.0,
            EnvMapBinding::None => 0.0,
        };
        Self {
            model: world.to_cols_array_2d(),
            normal_matrix: normal_matrix.to_cols_array_2d(),
            base_color: [r, g, b, 1.0],
            pbr: [
                material.roughness,
                material.metalness,
                material.transmission,
                material.ior,
            ],
            extra: [material.env_map_intensity, env_bound, 0.0, 0.0],
        }
    }
}

/// Opaque draws in scene order, then transmissive draws back to front.
pub fn draw_order(scene: &Scene, draws: &[DrawItem], eye: Vec3) -> Vec<usize> {
    let mut opaque = Vec::new();
    let mut transmissive = Vec::new();
    for (index, draw) in draws.iter().enumerate() {
        let is_transmissive = scene
            .material(draw.material)
            .is_some_and(PhysicalMaterial::is_transmissive);
        if is_transmissive {
            let center = scene
                .mesh(draw.mesh)
                .map_or(Vec3::ZERO, MeshData::center);
            let distance = draw.world.transform_point3(center).distance_squared(eye);
            transmissive.push((index, distance));
        } else {
            opaque.push(index);
        }
    }
    transmissive.sort_by(|a, b| b.1.total_cmp(&a.1));
    opaque.extend(transmissive.into_iter().map(|(index, _)| index));
    opaque
}

/// Environment mip levels converted to RGBA16F, skipping levels the device cannot hold.
fn environment_levels(image: &EnvironmentImage, max_dimension: u32) -> Vec<(u32, u32, Vec<u16>)> {
    image
        .mip_chain()
        .into_iter()
        .skip_while(|level| level.width > max_dimension || level.height > max_dimension)
        .map(|level| {
            let texels = level
                .texels
                .iter()
                .map(|value| half::f16::from_f32(*value).to_bits())
                .collect();
            (level.width, level.height, texels)
        })
        .collect()
}

struct GpuMesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
}

struct GpuTexture {
    /// `None` for images that could not be uploaded.
    view: Option<wgpu::TextureView>,
    revision: u64,
}

struct GpuEnvironment {
    view: wgpu::TextureView,
    levels: u32,
}

pub struct PreparedDraw {
    pipeline: usize,
    mesh: MeshId,
    bind_group: wgpu::BindGroup,
}

/// Everything the scene pass needs for one frame.
pub struct PreparedFrame {
    pub background: bool,
    draws: Vec<PreparedDraw>,
}

/// GPU mirror of a `Scene`: meshes, textures, environment and uniforms.
pub struct GpuScene {
    frame_buffer: wgpu::Buffer,
    frame_bind_group: wgpu::BindGroup,
    env_sampler: wgpu::Sampler,
    map_sampler: wgpu::Sampler,
    fallback_map: wgpu::TextureView,
    fallback_env: wgpu::TextureView,
    environment: Option<GpuEnvironment>,
    environment_revision: u64,
    meshes: Vec<GpuMesh>,
    textures: HashMap<TextureId, GpuTexture>,
    draw_buffers: Vec<wgpu::Buffer>,
}

impl GpuScene {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue, pipelines: &ScenePipelines) -> Self {
        let frame_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("frame uniform"),
            size: std::mem::size_of::<FrameUniform>() as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let env_sampler =
            device.create_sampler(&environment_sampler(EnvironmentFilters::default()));
        let map_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("map sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        let fallback_map = upload_rgba8(device, queue, "fallback map", 1, 1, &[255; 4], true);
        let fallback_env = device
            .create_texture_with_data(
                queue,
                &wgpu::TextureDescriptor {
                    label: Some("fallback environment"),
                    size: wgpu::Extent3d {
                        width: 1,
                        height: 1,
                        depth_or_array_layers: 1,
                    },
                    mip_level_count: 1,
                    sample_count: 1,
                    dimension: wgpu::TextureDimension::D2,
                    format: wgpu::TextureFormat::Rgba16Float,
                    usage: wgpu::TextureUsages::TEXTURE_BINDING,
                    view_formats: &[],
                },
                wgpu::util::TextureDataOrder::LayerMajor,
                &[0; 8],
            )
            .create_view(&wgpu::TextureViewDescriptor::default());
        let frame_bind_group = frame_bind_group(
            device,
            pipelines,
            &frame_buffer,
            &fallback_env,
            &env_sampler,
        );

        Self {
            frame_buffer,
            frame_bind_group,
            env_sampler,
            map_sampler,
            fallback_map,
            fallback_env,
            environment: None,
            environment_revision: 0,
            meshes: Vec::new(),
            textures: HashMap::new(),
            draw_buffers: Vec::new(),
        }
    }

    /// Uploads whatever changed in `scene` and builds this frame's draw list.
    pub fn prepare(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        pipelines: &ScenePipelines,
        scene: &Scene,
        camera: &PerspectiveCamera,
    ) -> PreparedFrame {
        self.sync_meshes(device, scene);
        self.sync_environment(device, queue, pipelines, scene);

        let levels = self.environment.as_ref().map_or(0, |env| env.levels);
        let frame = FrameUniform::new(scene, camera, levels);
        queue.write_buffer(&self.frame_buffer, 0, bytemuck::bytes_of(&frame));

        let items = scene.visible_draws();
        let order = draw_order(scene, &items, camera.position);
        let mut draws = Vec::with_capacity(order.len());
        for (slot, index) in order.into_iter().enumerate() {
            let item = &items[index];
            let Some(material) = scene.material(item.material) else {
                continue;
            };
            if item.mesh.index() >= self.meshes.len() {
                continue;
            }
            if let Some(id) = material.map {
                self.sync_texture(device, queue, &scene.textures, id);
            }
            let uniform = DrawUniform::new(item.world, material);
            let buffer = self.draw_buffer(device, slot);
            queue.write_buffer(buffer, 0, bytemuck::bytes_of(&uniform));
            let map_view = material
                .map
                .and_then(|id| self.textures.get(&id))
                .and_then(|texture| texture.view.as_ref())
                .unwrap_or(&self.fallback_map);
            let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("draw bind group"),
                layout: &pipelines.draw_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: self.draw_buffers[slot].as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(map_view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: wgpu::BindingResource::Sampler(&self.map_sampler),
                    },
                ],
            });
            draws.push(PreparedDraw {
                pipeline: pipeline_index(material.is_transmissive(), material.is_double_sided()),
                mesh: item.mesh,
                bind_group,
            });
        }

        PreparedFrame {
            background: frame.background_enabled(),
            draws,
        }
    }

    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>, pipelines: &ScenePipelines, frame: &PreparedFrame) {
        pass.set_bind_group(0, &self.frame_bind_group, &[]);
        if frame.background {
            pass.set_pipeline(pipelines.background());
            pass.draw(0..3, 0..1);
        }
        let mut bound = None;
        for draw in &frame.draws {
            let Some(mesh) = self.meshes.get(draw.mesh.index()) else {
                continue;
            };
            if bound != Some(draw.pipeline) {
                pass.set_pipeline(pipelines.surface(draw.pipeline));
                bound = Some(draw.pipeline);
            }
            pass.set_bind_group(1, &draw.bind_group, &[]);
            pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
            pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            pass.draw_indexed(0..mesh.index_count, 0, 0..1);
        }
    }

    fn draw_buffer(&mut self, device: &wgpu::Device, slot: usize) -> &wgpu::Buffer {
        while self.draw_buffers.len() <= slot {
            self.draw_buffers.push(device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("draw uniform"),
                size: std::mem::size_of::<DrawUniform>() as wgpu::BufferAddress,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            }));
        }
        &self.draw_buffers[slot]
    }

    /// Meshes are append-only in the scene, so only the tail is new.
    fn sync_meshes(&mut self, device: &wgpu::Device, scene: &Scene) {
        for mesh in &scene.meshes()[self.meshes.len().min(scene.meshes().len())..] {
            self.meshes.push(GpuMesh {
                vertex_buffer: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("mesh vertices"),
                    contents: bytemuck::cast_slice(&mesh.vertices),
                    usage: wgpu::BufferUsages::VERTEX,
                }),
                index_buffer: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("mesh indices"),
                    contents: bytemuck::cast_slice(&mesh.indices),
                    usage: wgpu::BufferUsages::INDEX,
                }),
                index_count: mesh.indices.len() as u32,
            });
        }
    }

    fn sync_texture(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        store: &TextureStore,
        id: TextureId,
    ) {
        let revision = store.revision(id);
        if self
            .textures
            .get(&id)
            .is_some_and(|texture| texture.revision == revision)
        {
            return;
        }
        let Some(source) = store.image(id) else {
            return;
        };
        let srgb = store.options(id).map_or(true, |options| options.srgb);
        let label = store
            .path(id)
            .map_or_else(|| format!("texture {}", id.index()), |path| path.display().to_string());
        let expected = source.width as usize * source.height as usize * 4;
        if source.pixels.len() != expected || source.width == 0 || source.height == 0 {
            log::warn!(
                "Texture {} has {} bytes for {}x{}; drawing without it",
                label,
                source.pixels.len(),
                source.width,
                source.height
            );
            self.textures.insert(id, GpuTexture { view: None, revision });
            return;
        }
        let max_dimension = device.limits().max_texture_dimension_2d;
        let fitted;
        let image = if source.width.max(source.height) > max_dimension {
            let Some(resized) = fit_within(source, max_dimension) else {
                return;
            };
            log::warn!(
                "Texture {} ({}x{}) exceeds the {} texel limit; uploading {}x{}",
                label,
                source.width,
                source.height,
                max_dimension,
                resized.width,
                resized.height
            );
            fitted = resized;
            &fitted
        } else {
            source
        };
        let view = upload_rgba8(device, queue, &label, image.width, image.height, &image.pixels, srgb);
        log::debug!("Uploaded {} ({}x{})", label, image.width, image.height);
        self.textures.insert(id, GpuTexture { view: Some(view), revision });
    }

    fn sync_environment(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        pipelines: &ScenePipelines,
        scene: &Scene,
    ) {
        let revision = scene.environment_revision();
        if revision == self.environment_revision {
            return;
        }
        self.environment_revision = revision;
        self.environment = scene.environment().and_then(|environment| {
            let max_dimension = device.limits().max_texture_dimension_2d;
            let levels = environment_levels(&environment.image, max_dimension);
            let (width, height, _) = levels.first()?;
            let texture = device.create_texture(&wgpu::TextureDescriptor {
                label: Some("environment"),
                size: wgpu::Extent3d {
                    width: *width,
                    height: *height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: levels.len() as u32,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba16Float,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            });
            for (level, (width, height, texels)) in levels.iter().enumerate() {
                queue.write_texture(
                    wgpu::TexelCopyTextureInfo {
                        texture: &texture,
                        mip_level: level as u32,
                        origin: wgpu::Origin3d::ZERO,
                        aspect: wgpu::TextureAspect::All,
                    },
                    bytemuck::cast_slice(texels),
                    wgpu::TexelCopyBufferLayout {
                        offset: 0,
                        bytes_per_row: Some(width * 8),
                        rows_per_image: Some(*height),
                    },
                    wgpu::Extent3d {
                        width: *width,
                        height: *height,
                        depth_or_array_layers: 1,
                    },
                );
            }
            log::info!(
                "Uploaded environment {} ({}x{}, {} levels)",
                environment.source.display(),
                width,
                height,
                levels.len()
            );
            Some(GpuEnvironment {
                view: texture.create_view(&wgpu::TextureViewDescriptor::default()),
                levels: levels.len() as u32,
            })
        });
        let filters = scene
            .environment()
            .map_or_else(EnvironmentFilters::default, |environment| environment.filters);
        self.env_sampler = device.create_sampler(&environment_sampler(filters));
        let env_view = self
            .environment
            .as_ref()
            .map_or(&self.fallback_env, |env| &env.view);
        self.frame_bind_group = frame_bind_group(
            device,
            pipelines,
            &self.frame_buffer,
            env_view,
            &self.env_sampler,
        );
    }
}

fn environment_sampler(filters: EnvironmentFilters) -> wgpu::SamplerDescriptor<'static> {
    let mode = |filter: Filter| match filter {
        Filter::Nearest => wgpu::FilterMode::Nearest,
        Filter::Linear => wgpu::FilterMode::Linear,
    };
    wgpu::SamplerDescriptor {
        label: Some("environment sampler"),
        address_mode_u: wgpu::AddressMode::Repeat,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        mag_filter: mode(filters.mag),
        min_filter: mode(filters.min),
        mipmap_filter: mode(filters.mipmap),
        ..Default::default()
    }
}

fn frame_bind_group(
    device: &wgpu::Device,
    pipelines: &ScenePipelines,
    frame_buffer: &wgpu::Buffer,
    env_view: &wgpu::TextureView,
    env_sampler: &wgpu::Sampler,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("frame bind group"),
        layout: &pipelines.frame_layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: frame_buffer.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(env_view),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::Sampler(env_sampler),
            },
        ],
    })
}

fn upload_rgba8(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    label: &str,
    width: u32,
    height: u32,
    pixels: &[u8],
    srgb: bool,
) -> wgpu::TextureView {
    let format = if srgb {
        wgpu::TextureFormat::Rgba8UnormSrgb
    } else {
        wgpu::TextureFormat::Rgba8Unorm
    };
    device
        .create_texture_with_data(
            queue,
            &wgpu::TextureDescriptor {
                label: Some(label),
                size: wgpu::Extent3d {
                    width: width.max(1),
                    height: height.max(1),
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format,
                usage: wgpu::TextureUsages::TEXTURE_BINDING,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            pixels,
        )
        .create_view(&wgpu::TextureViewDescriptor::default())
}

#[cfg(test)]
mod tests {
    use super::{draw_order, environment_levels, environment_sampler, DrawUniform, FrameUniform};
    use crate::render::camera::PerspectiveCamera;
    use crate::scene::environment::{install, Background, EnvironmentFilters, EnvironmentImage, Filter};
    use crate::scene::lighting::{add_light, MAX_LIGHTS};
    use crate::scene::material::{EnvMapBinding, PhysicalMaterial};
    use crate::scene::{MeshData, Node, Scene, Vertex};
    use glam::{Mat4, Vec3};

    fn quad_mesh() -> MeshData {
        let vertex = |x: f32, y: f32| Vertex {
            position: [x, y, 0.0],
            normal: [0.0, 0.0, 1.0],
            uv: [0.0, 0.0],
        };
        MeshData::new(
            vec![vertex(-0.5, -0.5), vertex(0.5, -0.5), vertex(0.5, 0.5)],
            vec![0, 1, 2],
        )
    }

    fn add_draw(scene: &mut Scene, name: &str, z: f32, transmission: f32) {
        let mesh = scene.add_mesh(quad_mesh());
        let mut node = Node::new(name);
        node.mesh = Some(mesh);
        node.local = Mat4::from_translation(Vec3::new(0.0, 0.0, z));
        let mut material = PhysicalMaterial::default();
        material.set_transmission(transmission);
        node.material = Some(material);
        scene.add_node(node, None);
    }

    #[test]
    fn uniform_sizes_match_the_shader_structs() {
        assert_eq!(std::mem::size_of::<FrameUniform>(), 304);
        assert_eq!(std::mem::size_of::<DrawUniform>(), 176);
    }

    #[test]
    fn frame_uniform_packs_lights_and_clamps_the_count() {
        let mut scene = Scene::new();
        for index in 0..(MAX_LIGHTS + 1) {
            add_light(&mut scene, Vec3::new(index as f32, 5.0, 2.0), false);
        }
        let camera = PerspectiveCamera::new(35.0, 1.0, 0.01, 100.0);
        let frame = FrameUniform::new(&scene, &camera, 0);
        assert_eq!(frame.params[0], MAX_LIGHTS as f32);
        assert_eq!(frame.light_positions[1], [1.0, 5.0, 2.0, 0.1]);
        assert_eq!(frame.environment[0], 0.0);
        assert!(!frame.background_enabled());
    }

    #[test]
    fn background_needs_an_uploaded_environment() {
        let mut scene = Scene::new();
        let image = EnvironmentImage {
            width: 2,
            height: 1,
            texels: vec![1.0; 8],
        };
        install(
            &mut scene,
            image,
            "env.hdr",
            Background::default(),
            EnvironmentFilters::default(),
        );
        let camera = PerspectiveCamera::new(35.0, 1.0, 0.01, 100.0);

        let pending = FrameUniform::new(&scene, &camera, 0);
        assert!(!pending.background_enabled());

        let uploaded = FrameUniform::new(&scene, &camera, 2);
        assert!(uploaded.background_enabled());
        assert_eq!(uploaded.environment, [1.0, 1.0, 0.1, 0.9]);
    }

    #[test]
    fn draw_uniform_carries_material_parameters() {
        let mut material = PhysicalMaterial::default();
        material.set_roughness(0.2);
        material.set_ior(1.9);
        material.env_map = EnvMapBinding::None;
        material.env_map_intensity = 0.3;
        let uniform = DrawUniform::new(Mat4::from_scale(Vec3::splat(2.0)), &material);
        assert_eq!(uniform.pbr, [0.2, 0.0, 0.0, 1.9]);
        assert_eq!(uniform.extra[0], 0.3);
        assert_eq!(uniform.extra[1], 0.0);
        assert!((uniform.normal_matrix[0][0] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn transmissive_draws_come_last_and_back_to_front() {
        let mut scene = Scene::new();
        add_draw(&mut scene, "near_glass", 1.0, 1.0);
        add_draw(&mut scene, "cap", 0.0, 0.0);
        add_draw(&mut scene, "far_glass", -3.0, 1.0);
        scene.update_world_transforms();
        let draws = scene.visible_draws();

        let order = draw_order(&scene, &draws, Vec3::new(0.0, 0.0, 5.0));
        let names: Vec<&str> = order
            .iter()
            .map(|index| scene.node(draws[*index].node).unwrap().name.as_str())
            .collect();
        assert_eq!(names, ["cap", "far_glass", "near_glass"]);
    }

    #[test]
    fn environment_levels_skip_oversized_mips() {
        let image = EnvironmentImage {
            width: 8,
            height: 4,
            texels: vec![0.5; 8 * 4 * 4],
        };
        let levels = environment_levels(&image, 4);
        assert_eq!(levels.len(), 3);
        assert_eq!((levels[0].0, levels[0].1), (4, 2));
        assert_eq!(levels[0].2[0], half::f16::from_f32(0.5).to_bits());
    }

    #[test]
    fn environment_sampler_follows_configured_filters() {
        let filters = EnvironmentFilters {
            mag: Filter::Nearest,
            min: Filter::Linear,
            mipmap: Filter::Nearest,
        };
        let descriptor = environment_sampler(filters);
        assert_eq!(descriptor.mag_filter, wgpu::FilterMode::Nearest);
        assert_eq!(descriptor.min_filter, wgpu::FilterMode::Linear);
        assert_eq!(descriptor.mipmap_filter, wgpu::FilterMode::Nearest);
        assert_eq!(descriptor.address_mode_u, wgpu::AddressMode::Repeat);
    }
}
