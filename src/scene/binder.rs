//! Name-driven material replacement for freshly loaded models.
//!
//! Every node below the model root is classified exactly once into a
//! [`NodeClass`] and the material rule for that class is applied. Node names
//! are expected to contain at most one of the class patterns; a name that
//! contains several is reported as a [`NamingViolation`] and left alone.

use std::path::Path;

use crate::scene::material::{Color, EnvMapBinding, PhysicalMaterial, Side};
use crate::scene::textures::{TextureOptions, TextureRegistry};
use crate::scene::{NodeId, Scene};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeClass {
    Bottle,
    Cap,
    Label,
    Unmatched,
}

impl NodeClass {
    const PATTERNS: [(&'static str, NodeClass); 3] = [
        ("Bottle", NodeClass::Bottle),
        ("Cap", NodeClass::Cap),
        ("Label", NodeClass::Label),
    ];

    /// Case-sensitive substring classification.
    pub fn classify(name: &str) -> Result<NodeClass, NamingViolation> {
        let matched: Vec<(&'static str, NodeClass)> = Self::PATTERNS
            .iter()
            .copied()
            .filter(|(pattern, _)| name.contains(pattern))
            .collect();
        match matched.as_slice() {
            [] => Ok(NodeClass::Unmatched),
            [(_, class)] => Ok(*class),
            _ => Err(NamingViolation {
                name: name.to_string(),
                patterns: matched.iter().map(|(pattern, _)| *pattern).collect(),
            }),
        }
    }

    pub fn group_label(self) -> Option<&'static str> {
        match self {
            NodeClass::Bottle => Some("Bottle"),
            NodeClass::Cap => Some("Cap"),
            NodeClass::Label | NodeClass::Unmatched => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("node `{name}` matches more than one material pattern ({})", .patterns.join(", "))]
pub struct NamingViolation {
    pub name: String,
    pub patterns: Vec<&'static str>,
}

/// Receives the controls the binder wants exposed for replaced materials.
pub trait ControlSink {
    fn bind_material_controls(&mut self, group: &str, node: NodeId);
    fn bind_texture_selector(&mut self, node: NodeId, registry: TextureRegistry, selected: &str);
    fn bind_visibility_toggle(&mut self, node: NodeId);
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct GlassPreset {
    pub color: Color,
    pub roughness: f32,
    pub metalness: f32,
    pub transmission: f32,
    pub ior: f32,
    pub env_map_intensity: f32,
}

impl Default for GlassPreset {
    fn default() -> Self {
        Self {
            color: Color::WHITE,
            roughness: 0.0,
            metalness: 0.0,
            transmission: 1.0,
            ior: 1.9,
            env_map_intensity: 0.3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CapPreset {
    pub env_map_intensity: f32,
}

impl Default for CapPreset {
    fn default() -> Self {
        Self {
            env_map_intensity: 0.3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LabelTexture {
    pub key: String,
    pub file: String,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct LabelPreset {
    pub textures: Vec<LabelTexture>,
    /// Key bound when the label is first replaced; falls back to the first entry.
    pub initial: String,
    pub options: TextureOptions,
    pub env_map_intensity: f32,
}

impl Default for LabelPreset {
    fn default() -> Self {
        Self {
            textures: vec![
                LabelTexture {
                    key: "label1".to_string(),
                    file: "Label1.png".to_string(),
                },
                LabelTexture {
                    key: "label2".to_string(),
                    file: "Label2.png".to_string(),
                },
            ],
            initial: "label1".to_string(),
            options: TextureOptions {
                flip_y: false,
                srgb: true,
            },
            env_map_intensity: 0.3,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct MaterialPresets {
    pub glass: GlassPreset,
    pub cap: CapPreset,
    pub label: LabelPreset,
}

impl MaterialPresets {
    pub fn glass_material(&self) -> PhysicalMaterial {
        let glass = &self.glass;
        let mut material = PhysicalMaterial {
            color: glass.color,
            env_map: EnvMapBinding::Scene,
            env_map_intensity: glass.env_map_intensity,
            side: Side::Double,
            ..PhysicalMaterial::default()
        };
        material.set_roughness(glass.roughness);
        material.set_metalness(glass.metalness);
        material.set_transmission(glass.transmission);
        material.set_ior(glass.ior);
        material
    }

    pub fn cap_material(&self, previous_color: Color) -> PhysicalMaterial {
        PhysicalMaterial {
            color: previous_color,
            env_map: EnvMapBinding::Scene,
            env_map_intensity: self.cap.env_map_intensity,
            side: Side::Double,
            ..PhysicalMaterial::default()
        }
    }

    pub fn label_material(&self, registry: &TextureRegistry, key: &str) -> PhysicalMaterial {
        PhysicalMaterial {
            map: registry.get(key),
            env_map: EnvMapBinding::Scene,
            env_map_intensity: self.label.env_map_intensity,
            side: Side::Double,
            ..PhysicalMaterial::default()
        }
    }
}

/// Outcome of binding one model.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BindingReport {
    pub bottles: Vec<NodeId>,
    pub caps: Vec<NodeId>,
    pub labels: Vec<NodeId>,
    pub unmatched: usize,
    pub violations: Vec<NamingViolation>,
}

impl BindingReport {
    pub fn replaced(&self) -> usize {
        self.bottles.len() + self.caps.len() + self.labels.len()
    }
}

/// Classifies every node under `root` and swaps in the preset materials.
/// Label textures are registered in the scene's texture store relative to
/// `asset_root`; decoding them is left to the caller.
pub fn bind_model(
    scene: &mut Scene,
    root: NodeId,
    presets: &MaterialPresets,
    asset_root: &Path,
    controls: &mut dyn ControlSink,
) -> BindingReport {
    let mut report = BindingReport::default();
    for id in scene.descendants(root) {
        // Pieces follow their named parent and are never bound on their own.
        let Some(name) = scene
            .node(id)
            .filter(|node| !node.piece)
            .map(|node| node.name.clone())
        else {
            continue;
        };
        let class = match NodeClass::classify(&name) {
            Ok(class) => class,
            Err(violation) => {
                log::warn!("{}; keeping its material", violation);
                report.violations.push(violation);
                continue;
            }
        };
        match class {
            NodeClass::Bottle => {
                set_material(scene, id, presets.glass_material());
                report.bottles.push(id);
            }
            NodeClass::Cap => {
                let previous = previous_color(scene, id);
                set_material(scene, id, presets.cap_material(previous));
                report.caps.push(id);
            }
            NodeClass::Label => {
                let registry = label_registry(scene, presets, asset_root);
                let selected = if registry.get(&presets.label.initial).is_some() {
                    presets.label.initial.clone()
                } else {
                    registry.first_key().unwrap_or_default().to_string()
                };
                set_material(scene, id, presets.label_material(&registry, &selected));
                controls.bind_texture_selector(id, registry, &selected);
                controls.bind_visibility_toggle(id);
                report.labels.push(id);
            }
            NodeClass::Unmatched => report.unmatched += 1,
        }
        if let Some(group) = class.group_label() {
            controls.bind_material_controls(group, id);
        }
        if class != NodeClass::Unmatched {
            log::debug!("Bound {:?} material to node `{}`", class, name);
        }
    }
    log::info!(
        "Material binding: {} bottle, {} cap, {} label, {} unmatched, {} naming violations",
        report.bottles.len(),
        report.caps.len(),
        report.labels.len(),
        report.unmatched,
        report.violations.len()
    );
    report
}

fn set_material(scene: &mut Scene, id: NodeId, material: PhysicalMaterial) {
    if let Some(node) = scene.node_mut(id) {
        node.material = Some(material);
    }
}

/// The node's own colour, or its first piece's for multi-primitive nodes.
fn previous_color(scene: &Scene, id: NodeId) -> Color {
    let own = scene.material(id);
    let from_piece = || {
        scene.node(id).and_then(|node| {
            node.children
                .iter()
                .filter(|child| scene.node(**child).is_some_and(|child| child.piece))
                .find_map(|child| scene.material(*child))
        })
    };
    own.or_else(from_piece)
        .map_or(Color::WHITE, |material| material.color)
}

fn label_registry(scene: &mut Scene, presets: &MaterialPresets, asset_root: &Path) -> TextureRegistry {
    let mut registry = TextureRegistry::new();
    for texture in &presets.label.textures {
        let id = scene
            .textures
            .register(asset_root.join(&texture.file), presets.label.options);
        registry.insert(texture.key.clone(), id);
    }
    registry
}
