use crate::scene::textures::TextureId;

/// Linear RGB colour. Hex values and the colour picker work in sRGB and are
/// converted on the way in and out.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const WHITE: Color = Color {
        r: 1.0,
        g: 1.0,
        b: 1.0,
    };

    pub const fn from_linear(rgb: [f32; 3]) -> Self {
        Self {
            r: rgb[0],
            g: rgb[1],
            b: rgb[2],
        }
    }

    /// `0xRRGGBB` in sRGB.
    #[cfg(test)]
    pub fn from_hex(hex: u32) -> Self {
        Self::from_srgb8([
            ((hex >> 16) & 0xFF) as u8,
            ((hex >> 8) & 0xFF) as u8,
            (hex & 0xFF) as u8,
        ])
    }

    pub fn from_srgb8(srgb: [u8; 3]) -> Self {
        Self {
            r: srgb_to_linear(f32::from(srgb[0]) / 255.0),
            g: srgb_to_linear(f32::from(srgb[1]) / 255.0),
            b: srgb_to_linear(f32::from(srgb[2]) / 255.0),
        }
    }

    pub fn to_srgb8(self) -> [u8; 3] {
        let encode = |value: f32| (linear_to_srgb(value.clamp(0.0, 1.0)) * 255.0).round() as u8;
        [encode(self.r), encode(self.g), encode(self.b)]
    }

    pub fn to_array(self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

fn srgb_to_linear(value: f32) -> f32 {
    if value <= 0.04045 {
        value / 12.92
    } else {
        ((value + 0.055) / 1.055).powf(2.4)
    }
}

fn linear_to_srgb(value: f32) -> f32 {
    if value <= 0.003_130_8 {
        value * 12.92
    } else {
        1.055 * value.powf(1.0 / 2.4) - 0.055
    }
}

/// Which faces of a surface are shaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum Side {
    #[default]
    Front,
    Double,
}

/// How a material reaches the environment map. `Scene` refers to the one
/// shared environment owned by the scene; materials never own a copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum EnvMapBinding {
    None,
    #[default]
    Scene,
}

pub const IOR_MIN: f32 = 1.0;
pub const IOR_MAX: f32 = 2.333;

/// Physically-based material parameters attached to one scene node.
#[derive(Debug, Clone, PartialEq)]
pub struct PhysicalMaterial {
    pub color: Color,
    pub roughness: f32,
    pub metalness: f32,
    pub transmission: f32,
    pub ior: f32,
    pub map: Option<TextureId>,
    pub env_map: EnvMapBinding,
    pub env_map_intensity: f32,
    pub side: Side,
}

impl Default for PhysicalMaterial {
    fn default() -> Self {
        Self {
            color: Color::WHITE,
            roughness: 1.0,
            metalness: 0.0,
            transmission: 0.0,
            ior: 1.5,
            map: None,
            env_map: EnvMapBinding::Scene,
            env_map_intensity: 1.0,
            side: Side::Front,
        }
    }
}

impl PhysicalMaterial {
    pub fn set_roughness(&mut self, value: f32) {
        self.roughness = value.clamp(0.0, 1.0);
    }

    pub fn set_metalness(&mut self, value: f32) {
        self.metalness = value.clamp(0.0, 1.0);
    }

    pub fn set_transmission(&mut self, value: f32) {
        self.transmission = value.clamp(0.0, 1.0);
    }

    pub fn set_ior(&mut self, value: f32) {
        self.ior = value.clamp(IOR_MIN, IOR_MAX);
    }

    pub fn is_transmissive(&self) -> bool {
        self.transmission > 0.0
    }

    pub fn is_double_sided(&self) -> bool {
        self.side == Side::Double
    }
}
