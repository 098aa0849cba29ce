use std::collections::VecDeque;
use std::ops::RangeInclusive;

use crate::scene::binder::ControlSink;
use crate::scene::material::Color;
use crate::scene::serialization::{MaterialPresetFile, MaterialValues};
use crate::scene::textures::TextureRegistry;
use crate::scene::{NodeId, Scene};

const UNIT_RANGE: RangeInclusive<f32> = 0.0..=1.0;
const IOR_RANGE: RangeInclusive<f32> = 1.5..=2.33;
const SLIDER_STEP: f64 = 0.01;
const MAX_STATUS_LINES: usize = 6;

/// A colour picker plus sliders bound to one node's material.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialControls {
    pub group: String,
    pub node: NodeId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextureSelector {
    pub node: NodeId,
    pub registry: TextureRegistry,
    pub selected: String,
}

impl TextureSelector {
    /// Points the node's material at the texture registered under `key`.
    pub fn select(&mut self, key: &str, scene: &mut Scene) -> bool {
        let Some(texture) = self.registry.get(key) else {
            log::warn!("No texture registered under `{}`", key);
            return false;
        };
        let Some(material) = scene.node_mut(self.node).and_then(|node| node.material.as_mut()) else {
            return false;
        };
        material.map = Some(texture);
        self.selected = key.to_string();
        true
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VisibilityToggle {
    pub node: NodeId,
    pub hidden: bool,
}

impl VisibilityToggle {
    pub fn set_hidden(&mut self, hidden: bool, scene: &mut Scene) {
        self.hidden = hidden;
        if let Some(node) = scene.node_mut(self.node) {
            node.visible = !hidden;
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    Material(MaterialControls),
    TextureSelector(TextureSelector),
    VisibilityToggle(VisibilityToggle),
}

impl Binding {
    pub fn node(&self) -> NodeId {
        match self {
            Binding::Material(controls) => controls.node,
            Binding::TextureSelector(selector) => selector.node,
            Binding::VisibilityToggle(toggle) => toggle.node,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelAction {
    SavePresets,
    LoadPresets,
}

#[derive(Debug, Clone, PartialEq)]
struct StatusLine {
    text: String,
    is_error: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PresetReport {
    pub applied: usize,
    pub skipped: usize,
}

/// Immediate-mode panel. Widgets read the bound fields every frame and
/// write edits straight back into the scene.
#[derive(Debug, Default)]
pub struct ControlPanel {
    bindings: Vec<Binding>,
    status: VecDeque<StatusLine>,
}

impl ControlPanel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn texture_selector_mut(&mut self, node: NodeId) -> Option<&mut TextureSelector> {
        self.bindings.iter_mut().find_map(|binding| match binding {
            Binding::TextureSelector(selector) if selector.node == node => Some(selector),
            _ => None,
        })
    }

    pub fn visibility_toggle_mut(&mut self, node: NodeId) -> Option<&mut VisibilityToggle> {
        self.bindings.iter_mut().find_map(|binding| match binding {
            Binding::VisibilityToggle(toggle) if toggle.node == node => Some(toggle),
            _ => None,
        })
    }

    pub fn push_status(&mut self, text: impl Into<String>) {
        self.push_line(text.into(), false);
    }

    pub fn push_error(&mut self, text: impl Into<String>) {
        self.push_line(text.into(), true);
    }

    fn push_line(&mut self, text: String, is_error: bool) {
        self.status.push_back(StatusLine { text, is_error });
        while self.status.len() > MAX_STATUS_LINES {
            self.status.pop_front();
        }
    }

    pub fn show(&mut self, ctx: &egui::Context, scene: &mut Scene) -> Option<PanelAction> {
        let mut action = None;
        let Self { bindings, status } = self;
        egui::Window::new("Controls")
            .default_pos([12.0, 12.0])
            .resizable(false)
            .show(ctx, |ui| {
                for binding in bindings.iter_mut() {
                    match binding {
                        Binding::Material(controls) => material_ui(ui, controls, scene),
                        Binding::TextureSelector(selector) => texture_selector_ui(ui, selector, scene),
                        Binding::VisibilityToggle(toggle) => {
                            let mut hidden = toggle.hidden;
                            if ui.checkbox(&mut hidden, "Hide label").changed() {
                                toggle.set_hidden(hidden, scene);
                            }
                        }
                    }
                }

                ui.separator();
                ui.horizontal(|ui| {
                    if ui.button("Save presets…").clicked() {
                        action = Some(PanelAction::SavePresets);
                    }
                    if ui.button("Load presets…").clicked() {
                        action = Some(PanelAction::LoadPresets);
                    }
                });

                if !status.is_empty() {
                    ui.separator();
                    for line in status.iter() {
                        if line.is_error {
                            ui.colored_label(ui.visuals().error_fg_color, &line.text);
                        } else {
                            ui.label(&line.text);
                        }
                    }
                }
            });
        action
    }

    pub fn capture_presets(&self, scene: &Scene) -> MaterialPresetFile {
        let mut presets = MaterialPresetFile::default();
        for binding in &self.bindings {
            let Some(node) = scene.node(binding.node()) else {
                continue;
            };
            let entry = presets.entry_mut(&node.name);
            match binding {
                Binding::Material(_) => {
                    entry.material = node.material.as_ref().map(MaterialValues::capture);
                }
                Binding::TextureSelector(selector) => entry.texture = Some(selector.selected.clone()),
                Binding::VisibilityToggle(toggle) => entry.hidden = Some(toggle.hidden),
            }
        }
        presets
    }

    /// Applies saved values to bound nodes with matching names.
    pub fn apply_presets(&mut self, presets: &MaterialPresetFile, scene: &mut Scene) -> PresetReport {
        let mut report = PresetReport::default();
        for entry in &presets.entries {
            let mut nodes: Vec<NodeId> = self
                .bindings
                .iter()
                .map(Binding::node)
                .filter(|node| scene.node(*node).is_some_and(|n| n.name == entry.node))
                .collect();
            nodes.sort();
            nodes.dedup();
            if nodes.is_empty() {
                log::warn!("Preset entry `{}` matches no bound node; skipped", entry.node);
                report.skipped += 1;
                continue;
            }
            for node in nodes {
                let values = entry
                    .material
                    .as_ref()
                    .filter(|_| self.has_material_controls(node));
                if let (Some(values), Some(material)) =
                    (values, scene.node_mut(node).and_then(|n| n.material.as_mut()))
                {
                    values.apply(material);
                }
                if let (Some(key), Some(selector)) = (entry.texture.as_deref(), self.texture_selector_mut(node)) {
                    selector.select(key, scene);
                }
                if let (Some(hidden), Some(toggle)) = (entry.hidden, self.visibility_toggle_mut(node)) {
                    toggle.set_hidden(hidden, scene);
                }
            }
            report.applied += 1;
        }
        report
    }

    fn has_material_controls(&self, node: NodeId) -> bool {
        self.bindings
            .iter()
            .any(|binding| matches!(binding, Binding::Material(controls) if controls.node == node))
    }
}

#[cfg(test)]
impl ControlPanel {
    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    pub fn material_groups(&self) -> usize {
        self.count(|binding| matches!(binding, Binding::Material(_)))
    }

    pub fn texture_selectors(&self) -> usize {
        self.count(|binding| matches!(binding, Binding::TextureSelector(_)))
    }

    pub fn visibility_toggles(&self) -> usize {
        self.count(|binding| matches!(binding, Binding::VisibilityToggle(_)))
    }

    fn count(&self, predicate: impl Fn(&Binding) -> bool) -> usize {
        self.bindings.iter().filter(|binding| predicate(binding)).count()
    }

    pub fn status_lines(&self) -> impl Iterator<Item = &str> {
        self.status.iter().map(|line| line.text.as_str())
    }
}

impl ControlSink for ControlPanel {
    fn bind_material_controls(&mut self, group: &str, node: NodeId) {
        self.bindings.push(Binding::Material(MaterialControls {
            group: group.to_string(),
            node,
        }));
    }

    fn bind_texture_selector(&mut self, node: NodeId, registry: TextureRegistry, selected: &str) {
        self.bindings.push(Binding::TextureSelector(TextureSelector {
            node,
            registry,
            selected: selected.to_string(),
        }));
    }

    fn bind_visibility_toggle(&mut self, node: NodeId) {
        let hidden = false;
        self.bindings
            .push(Binding::VisibilityToggle(VisibilityToggle { node, hidden }));
    }
}

fn material_ui(ui: &mut egui::Ui, controls: &MaterialControls, scene: &mut Scene) {
    let Some(material) = scene
        .node_mut(controls.node)
        .and_then(|node| node.material.as_mut())
    else {
        return;
    };
    egui::CollapsingHeader::new(&controls.group)
        .id_salt(("material", controls.node.index()))
        .default_open(true)
        .show(ui, |ui| {
            ui.horizontal(|ui| {
                let mut srgb = material.color.to_srgb8();
                if ui.color_edit_button_srgb(&mut srgb).changed() {
                    material.color = Color::from_srgb8(srgb);
                }
                ui.label(format!("{} Color", controls.group));
            });
            ui.add(
                egui::Slider::new(&mut material.roughness, UNIT_RANGE)
                    .step_by(SLIDER_STEP)
                    .text("Roughness"),
            );
            ui.add(
                egui::Slider::new(&mut material.metalness, UNIT_RANGE)
                    .step_by(SLIDER_STEP)
                    .text("Metalness"),
            );
            ui.add(
                egui::Slider::new(&mut material.transmission, UNIT_RANGE)
                    .step_by(SLIDER_STEP)
                    .text("Transmission"),
            );
            ui.add(
                egui::Slider::new(&mut material.ior, IOR_RANGE)
                    .step_by(SLIDER_STEP)
                    .text("ior"),
            );
        });
}

fn texture_selector_ui(ui: &mut egui::Ui, selector: &mut TextureSelector, scene: &mut Scene) {
    let mut choice = selector.selected.clone();
    ui.horizontal(|ui| {
        egui::ComboBox::from_id_salt(("texture", selector.node.index()))
            .selected_text(choice.as_str())
            .show_ui(ui, |ui| {
                for key in selector.registry.keys() {
                    ui.selectable_value(&mut choice, key.to_string(), key);
                }
            });
        ui.label("texture");
    });
    if choice != selector.selected {
        selector.select(&choice, scene);
    }
}
