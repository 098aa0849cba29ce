use glam::Vec3;

use crate::scene::material::Color;
use crate::scene::Scene;

pub const DEFAULT_INTENSITY: f32 = 0.1;

/// The renderer supports at most this many point lights.
pub const MAX_LIGHTS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointLight {
    pub position: Vec3,
    pub color: Color,
    pub intensity: f32,
    /// Recorded only; shadows are not rendered.
    pub cast_shadow: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LightConfig {
    pub position: [f32; 3],
    #[serde(default)]
    pub cast_shadow: bool,
}

pub fn default_rig() -> Vec<LightConfig> {
    vec![
        LightConfig {
            position: [0.0, 5.0, 2.0],
            cast_shadow: true,
        },
        LightConfig {
            position: [3.0, 5.0, 5.0],
            cast_shadow: false,
        },
        LightConfig {
            position: [-3.0, 5.0, 5.0],
            cast_shadow: false,
        },
    ]
}

/// Adds one white point light and returns its index.
pub fn add_light(scene: &mut Scene, position: Vec3, cast_shadow: bool) -> usize {
    if scene.lights.len() >= MAX_LIGHTS {
        log::warn!(
            "Scene already has {} lights; light at {:?} will not be rendered",
            MAX_LIGHTS,
            position
        );
    }
    scene.lights.push(PointLight {
        position,
        color: Color::WHITE,
        intensity: DEFAULT_INTENSITY,
        cast_shadow,
    });
    scene.lights.len() - 1
}

pub fn install_rig(scene: &mut Scene, lights: &[LightConfig]) {
    for light in lights {
        add_light(scene, Vec3::from(light.position), light.cast_shadow);
    }
    log::debug!("Installed {} point lights", lights.len());
}
