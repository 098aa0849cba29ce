use std::path::Path;

use crate::scene::material::{Color, PhysicalMaterial};

pub const PRESET_VERSION: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum PresetError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported preset version {found} (expected {})", PRESET_VERSION)]
    Version { found: u32 },
}

pub type Result<T> = std::result::Result<T, PresetError>;

/// Editable material fields, i.e. what the control panel exposes.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MaterialValues {
    pub color: Color,
    pub roughness: f32,
    pub metalness: f32,
    pub transmission: f32,
    pub ior: f32,
}

impl MaterialValues {
    pub fn capture(material: &PhysicalMaterial) -> Self {
        Self {
            color: material.color,
            roughness: material.roughness,
            metalness: material.metalness,
            transmission: material.transmission,
            ior: material.ior,
        }
    }

    pub fn apply(&self, material: &mut PhysicalMaterial) {
        material.color = self.color;
        material.set_roughness(self.roughness);
        material.set_metalness(self.metalness);
        material.set_transmission(self.transmission);
        material.set_ior(self.ior);
    }
}

/// Saved state for one bound node, matched back by node name.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PresetEntry {
    pub node: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material: Option<MaterialValues>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub texture: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hidden: Option<bool>,
}

impl PresetEntry {
    pub fn new(node: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            material: None,
            texture: None,
            hidden: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MaterialPresetFile {
    pub version: u32,
    pub entries: Vec<PresetEntry>,
}

impl Default for MaterialPresetFile {
    fn default() -> Self {
        Self {
            version: PRESET_VERSION,
            entries: Vec::new(),
        }
    }
}

impl MaterialPresetFile {
    /// Returns the entry for `node`, creating it if needed.
    pub fn entry_mut(&mut self, node: &str) -> &mut PresetEntry {
        let index = match self.entries.iter().position(|entry| entry.node == node) {
            Some(index) => index,
            None => {
                self.entries.push(PresetEntry::new(node));
                self.entries.len() - 1
            }
        };
        &mut self.entries[index]
    }
}

pub fn save_presets_to_file(presets: &MaterialPresetFile, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(presets)?;
    std::fs::write(path, json)?;
    Ok(())
}

pub fn load_presets_from_file(path: &Path) -> Result<MaterialPresetFile> {
    let json = std::fs::read_to_string(path)?;
    let presets: MaterialPresetFile = serde_json::from_str(&json)?;
    if presets.version != PRESET_VERSION {
        return Err(PresetError::Version {
            found: presets.version,
        });
    }
    Ok(presets)
}

#[cfg(test)]
mod tests {
    use super::{MaterialPresetFile, MaterialValues, PresetError};
    use crate::scene::material::{Color, PhysicalMaterial};

    fn temp_path(tag: &str) -> std::path::PathBuf {
        let mut path = std::env::temp_dir();
        let nonce = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        path.push(format!(
            "vitrine_presets_{}_{}_{}.json",
            tag,
            std::process::id(),
            nonce
        ));
        path
    }

    #[test]
    fn empty_fields_are_not_serialized() {
        let mut presets = MaterialPresetFile::default();
        presets.entry_mut("Label_Front").hidden = Some(true);
        let json = serde_json::to_string_pretty(&presets).unwrap();
        assert!(json.contains("\"hidden\": true"));
        assert!(!json.contains("\"material\""));
        assert!(!json.contains("\"texture\""));
    }

    #[test]
    fn entry_mut_reuses_existing_entries() {
        let mut presets = MaterialPresetFile::default();
        presets.entry_mut("Cap_01").texture = Some("a".to_string());
        presets.entry_mut("Cap_01").hidden = Some(false);
        assert_eq!(presets.entries.len(), 1);
        let entry = &presets.entries[0];
        assert_eq!(entry.node, "Cap_01");
        assert_eq!(entry.texture.as_deref(), Some("a"));
        assert_eq!(entry.hidden, Some(false));
    }

    #[test]
    fn apply_clamps_out_of_range_values() {
        let values = MaterialValues {
            color: Color::from_hex(0xFF0000),
            roughness: 2.0,
            metalness: 0.5,
            transmission: -1.0,
            ior: 5.0,
        };
        let mut material = PhysicalMaterial::default();
        values.apply(&mut material);
        assert_eq!(material.roughness, 1.0);
        assert_eq!(material.metalness, 0.5);
        assert_eq!(material.transmission, 0.0);
        assert_eq!(material.ior, crate::scene::material::IOR_MAX);
        assert_eq!(material.color, Color::from_hex(0xFF0000));
    }

    #[test]
    fn save_then_load_via_file() {
        let mut presets = MaterialPresetFile::default();
        presets.entry_mut("Bottle_01").material = Some(MaterialValues::capture(&PhysicalMaterial {
            roughness: 0.25,
            ..PhysicalMaterial::default()
        }));
        presets.entry_mut("Label_Front").texture = Some("label2".to_string());

        let path = temp_path("roundtrip");
        super::save_presets_to_file(&presets, &path).unwrap();
        let loaded = super::load_presets_from_file(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!(loaded, presets);
    }

    #[test]
    fn load_rejects_unknown_versions() {
        let path = temp_path("version");
        std::fs::write(&path, r#"{ "version": 99, "entries": [] }"#).unwrap();
        let result = super::load_presets_from_file(&path);
        let _ = std::fs::remove_file(&path);
        assert!(matches!(result, Err(PresetError::Version { found: 99 })));
    }

    #[test]
    fn load_reports_missing_files_as_io() {
        let result = super::load_presets_from_file(&temp_path("missing"));
        assert!(matches!(result, Err(PresetError::Io(_))));
    }
}
