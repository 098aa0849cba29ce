//! glTF import into a thread-safe intermediate model.
//!
//! Decoding happens on a loader thread; [`LoadedModel::insert_into`] later
//! materialises the hierarchy inside the [`Scene`] on the main thread.

use std::path::Path;

use glam::{Mat4, Vec3};

use crate::assets::AssetError;
use crate::scene::material::{Color, EnvMapBinding, PhysicalMaterial, Side};
use crate::scene::textures::{TextureId, TextureImage, TextureOptions};
use crate::scene::{MeshData, MeshId, Node, NodeId, Scene, Vertex};

#[derive(Debug, Clone, PartialEq)]
pub struct ModelMaterial {
    pub name: Option<String>,
    pub base_color: [f32; 4],
    pub metalness: f32,
    pub roughness: f32,
    pub double_sided: bool,
    pub base_color_image: Option<usize>,
}

impl Default for ModelMaterial {
    fn default() -> Self {
        Self {
            name: None,
            base_color: [1.0; 4],
            metalness: 1.0,
            roughness: 1.0,
            double_sided: false,
            base_color_image: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ModelPrimitive {
    pub mesh: MeshData,
    pub material: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct ModelNode {
    pub name: String,
    pub local: Mat4,
    pub primitives: Vec<usize>,
    pub children: Vec<usize>,
}

/// Everything needed to rebuild a glTF scene, with no GPU or scene handles.
#[derive(Debug, Clone, Default)]
pub struct LoadedModel {
    pub name: String,
    pub nodes: Vec<ModelNode>,
    pub roots: Vec<usize>,
    pub primitives: Vec<ModelPrimitive>,
    pub materials: Vec<ModelMaterial>,
    pub images: Vec<TextureImage>,
}

pub fn load_model(path: &Path) -> Result<LoadedModel, AssetError> {
    let (document, buffers, images) = gltf::import(path).map_err(|source| AssetError::Gltf {
        path: path.display().to_string(),
        source,
    })?;
    let fallback_name = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    build_model(&document, &buffers, &images, &path.display().to_string(), fallback_name)
}

/// Imports a self-contained glTF document held in memory.
#[cfg(test)]
pub fn load_model_from_slice(bytes: &[u8], name: &str) -> Result<LoadedModel, AssetError> {
    let (document, buffers, images) = gltf::import_slice(bytes).map_err(|source| AssetError::Gltf {
        path: name.to_string(),
        source,
    })?;
    build_model(&document, &buffers, &images, name, name.to_string())
}

fn build_model(
    document: &gltf::Document,
    buffers: &[gltf::buffer::Data],
    images: &[gltf::image::Data],
    path: &str,
    fallback_name: String,
) -> Result<LoadedModel, AssetError> {
    let scene = document
        .default_scene()
        .or_else(|| document.scenes().next())
        .ok_or_else(|| AssetError::NoScene {
            path: path.to_string(),
        })?;

    let mut model = LoadedModel {
        name: scene.name().map(str::to_string).unwrap_or(fallback_name),
        images: images.iter().map(convert_image).collect(),
        materials: document.materials().map(convert_material).collect(),
        ..LoadedModel::default()
    };

    // Primitive indices per glTF mesh.
    let mut mesh_primitives: Vec<Vec<usize>> = Vec::new();
    for mesh in document.meshes() {
        let mut indices = Vec::new();
        for primitive in mesh.primitives() {
            if primitive.mode() != gltf::mesh::Mode::Triangles {
                log::debug!(
                    "Skipping non-triangle primitive {} of mesh {:?}",
                    primitive.index(),
                    mesh.name()
                );
                continue;
            }
            let Some(data) = read_primitive(&primitive, buffers) else {
                log::warn!("Primitive {} of mesh {:?} has no positions", primitive.index(), mesh.name());
                continue;
            };
            indices.push(model.primitives.len());
            model.primitives.push(ModelPrimitive {
                mesh: data,
                material: primitive.material().index(),
            });
        }
        mesh_primitives.push(indices);
    }

    model.nodes = document
        .nodes()
        .map(|node| ModelNode {
            name: node.name().unwrap_or_default().to_string(),
            local: Mat4::from_cols_array_2d(&node.transform().matrix()),
            primitives: node
                .mesh()
                .and_then(|mesh| mesh_primitives.get(mesh.index()).cloned())
                .unwrap_or_default(),
            children: node.children().map(|child| child.index()).collect(),
        })
        .collect();
    model.roots = scene.nodes().map(|node| node.index()).collect();

    log::info!(
        "Loaded glTF {}: {} nodes, {} primitives, {} materials, {} images",
        path,
        model.nodes.len(),
        model.primitives.len(),
        model.materials.len(),
        model.images.len()
    );
    Ok(model)
}

fn read_primitive(primitive: &gltf::Primitive, buffers: &[gltf::buffer::Data]) -> Option<MeshData> {
    let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|data| data.0.as_slice()));
    let positions: Vec<[f32; 3]> = reader.read_positions()?.collect();
    let indices: Vec<u32> = match reader.read_indices() {
        Some(indices) => indices.into_u32().collect(),
        None => (0..positions.len() as u32).collect(),
    };
    let normals: Vec<[f32; 3]> = match reader.read_normals() {
        Some(normals) => normals.collect(),
        None => compute_normals(&positions, &indices),
    };
    let uvs: Vec<[f32; 2]> = match reader.read_tex_coords(0) {
        Some(uvs) => uvs.into_f32().collect(),
        None => vec![[0.0, 0.0]; positions.len()],
    };

    let vertices = positions
        .iter()
        .enumerate()
        .map(|(i, position)| Vertex {
            position: *position,
            normal: normals.get(i).copied().unwrap_or([0.0, 1.0, 0.0]),
            uv: uvs.get(i).copied().unwrap_or_default(),
        })
        .collect();
    let indices = indices
        .into_iter()
        .filter(|index| (*index as usize) < positions.len())
        .collect();
    Some(MeshData::new(vertices, indices))
}

/// Area-weighted smooth normals for primitives that ship without them.
fn compute_normals(positions: &[[f32; 3]], indices: &[u32]) -> Vec<[f32; 3]> {
    let mut normals = vec![Vec3::ZERO; positions.len()];
    for triangle in indices.chunks_exact(3) {
        let [a, b, c] = [triangle[0] as usize, triangle[1] as usize, triangle[2] as usize];
        if a >= positions.len() || b >= positions.len() || c >= positions.len() {
            continue;
        }
        let pa = Vec3::from(positions[a]);
        let face = (Vec3::from(positions[b]) - pa).cross(Vec3::from(positions[c]) - pa);
        normals[a] += face;
        normals[b] += face;
        normals[c] += face;
    }
    normals
        .into_iter()
        .map(|normal| normal.try_normalize().unwrap_or(Vec3::Y).to_array())
        .collect()
}

fn convert_material(material: gltf::Material) -> ModelMaterial {
    let pbr = material.pbr_metallic_roughness();
    ModelMaterial {
        name: material.name().map(str::to_string),
        base_color: pbr.base_color_factor(),
        metalness: pbr.metallic_factor(),
        roughness: pbr.roughness_factor(),
        double_sided: material.double_sided(),
        base_color_image: pbr
            .base_color_texture()
            .map(|info| info.texture().source().index()),
    }
}

fn convert_image(image: &gltf::image::Data) -> TextureImage {
    use gltf::image::Format;

    let texel_count = (image.width * image.height) as usize;
    let pixels = match image.format {
        Format::R8G8B8A8 => image.pixels.clone(),
        Format::R8G8B8 => image
            .pixels
            .chunks_exact(3)
            .flat_map(|rgb| [rgb[0], rgb[1], rgb[2], 255])
            .collect(),
        Format::R8G8 => image
            .pixels
            .chunks_exact(2)
            .flat_map(|rg| [rg[0], rg[0], rg[0], rg[1]])
            .collect(),
        Format::R8 => image
            .pixels
            .iter()
            .flat_map(|r| [*r, *r, *r, 255])
            .collect(),
        other => {
            log::warn!("Unsupported embedded image format {:?}; using white", other);
            vec![255; texel_count * 4]
        }
    };
    TextureImage {
        width: image.width,
        height: image.height,
        pixels,
    }
}

impl ModelMaterial {
    fn to_physical(&self, image_textures: &[Option<TextureId>]) -> PhysicalMaterial {
        let [r, g, b, _] = self.base_color;
        PhysicalMaterial {
            color: Color::from_linear([r, g, b]),
            roughness: self.roughness.clamp(0.0, 1.0),
            metalness: self.metalness.clamp(0.0, 1.0),
            map: self
                .base_color_image
                .and_then(|image| image_textures.get(image).copied().flatten()),
            env_map: EnvMapBinding::Scene,
            side: if self.double_sided {
                Side::Double
            } else {
                Side::Front
            },
            ..PhysicalMaterial::default()
        }
    }
}

impl LoadedModel {
    /// Adds the model under a new root node at the origin and returns it.
    pub fn insert_into(self, scene: &mut Scene) -> NodeId {
        let root = scene.add_node(Node::new(self.name.clone()), None);

        let image_textures: Vec<Option<TextureId>> = self
            .images
            .iter()
            .map(|image| Some(scene.textures.insert_ready(image.clone(), TextureOptions::default())))
            .collect();
        let mut inserter = Inserter {
            model: &self,
            image_textures,
            meshes: vec![None; self.primitives.len()],
            visited: vec![false; self.nodes.len()],
        };
        for &node in &self.roots {
            inserter.insert_node(scene, node, root);
        }
        scene.update_world_transforms();
        root
    }
}

struct Inserter<'a> {
    model: &'a LoadedModel,
    image_textures: Vec<Option<TextureId>>,
    meshes: Vec<Option<MeshId>>,
    visited: Vec<bool>,
}

impl Inserter<'_> {
    fn insert_node(&mut self, scene: &mut Scene, index: usize, parent: NodeId) {
        let model = self.model;
        let Some(source) = model.nodes.get(index) else {
            return;
        };
        if std::mem::replace(&mut self.visited[index], true) {
            log::warn!("glTF node {} is referenced twice; skipping repeat", index);
            return;
        }

        let mut node = Node::new(source.name.clone());
        node.local = source.local;
        // Several primitives become piece children so each keeps its own
        // material until the node itself is given one.
        let single = source.primitives.len() == 1;
        if single {
            self.attach_primitive(scene, &mut node, source.primitives[0]);
        }
        let id = scene.add_node(node, Some(parent));
        if !single {
            for (i, &primitive) in source.primitives.iter().enumerate() {
                let mut child = Node::new(format!("{}_{}", source.name, i));
                child.piece = true;
                self.attach_primitive(scene, &mut child, primitive);
                scene.add_node(child, Some(id));
            }
        }
        for &child in &source.children {
            self.insert_node(scene, child, id);
        }
    }

    fn attach_primitive(&mut self, scene: &mut Scene, node: &mut Node, primitive: usize) {
        let model = self.model;
        let Some(source) = model.primitives.get(primitive) else {
            return;
        };
        let mesh = *self.meshes[primitive].get_or_insert_with(|| scene.add_mesh(source.mesh.clone()));
        let material = source
            .material
            .and_then(|index| model.materials.get(index))
            .cloned()
            .unwrap_or_default();
        node.mesh = Some(mesh);
        node.material = Some(material.to_physical(&self.image_textures));
    }
}

#[cfg(test)]
mod tests {
    use super::load_model_from_slice;
    use crate::scene::material::Side;
    use crate::scene::Scene;
    use glam::Vec3;

    const TRIANGLE: &str = r#"{
        "asset": { "version": "2.0" },
        "scene": 0,
        "scenes": [ { "name": "Product", "nodes": [0] } ],
        "nodes": [
            { "name": "Group", "translation": [0.0, 1.0, 0.0], "children": [1, 2] },
            { "name": "Bottle_01", "mesh": 0 },
            { "name": "Stand", "mesh": 0 }
        ],
        "meshes": [ { "primitives": [ { "attributes": { "POSITION": 0 }, "material": 0 } ] } ],
        "materials": [ {
            "name": "Red",
            "doubleSided": true,
            "pbrMetallicRoughness": { "baseColorFactor": [1.0, 0.0, 0.0, 1.0], "metallicFactor": 0.0 }
        } ],
        "buffers": [ {
            "byteLength": 36,
            "uri": "data:application/octet-stream;base64,AAAAAAAAAAAAAAAAAACAPwAAAAAAAAAAAAAAAAAAgD8AAAAA"
        } ],
        "bufferViews": [ { "buffer": 0, "byteLength": 36 } ],
        "accessors": [ {
            "bufferView": 0,
            "componentType": 5126,
            "count": 3,
            "type": "VEC3",
            "min": [0.0, 0.0, 0.0],
            "max": [1.0, 1.0, 0.0]
        } ]
    }"#;

    #[test]
    fn embedded_triangle_loads_with_hierarchy() {
        let model = load_model_from_slice(TRIANGLE.as_bytes(), "triangle").unwrap();
        assert_eq!(model.name, "Product");
        assert_eq!(model.nodes.len(), 3);
        assert_eq!(model.roots, vec![0]);
        assert_eq!(model.primitives.len(), 1);
        let mesh = &model.primitives[0].mesh;
        assert_eq!(mesh.indices, vec![0, 1, 2]);
        // Normals are generated for the counter-clockwise triangle.
        assert_eq!(mesh.vertices[0].normal, [0.0, 0.0, 1.0]);
    }

    #[test]
    fn insert_builds_scene_nodes_sharing_one_mesh() {
        let model = load_model_from_slice(TRIANGLE.as_bytes(), "triangle").unwrap();
        let mut scene = Scene::new();
        let root = model.insert_into(&mut scene);

        let names: Vec<String> = scene
            .descendants(root)
            .into_iter()
            .filter_map(|id| scene.node(id).map(|node| node.name.clone()))
            .collect();
        assert_eq!(names, vec!["Product", "Group", "Bottle_01", "Stand"]);
        assert_eq!(scene.meshes().len(), 1);

        let bottle = scene.find_by_name("Bottle_01").and_then(|id| scene.node(id)).unwrap();
        let material = bottle.material.as_ref().unwrap();
        assert_eq!(material.color.r, 1.0);
        assert_eq!(material.color.g, 0.0);
        assert_eq!(material.side, Side::Double);
        assert_eq!(bottle.world.transform_point3(Vec3::ZERO), Vec3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn invalid_json_is_a_gltf_error() {
        let result = load_model_from_slice(b"{ not gltf", "broken");
        assert!(matches!(result, Err(crate::assets::AssetError::Gltf { .. })));
    }
}
