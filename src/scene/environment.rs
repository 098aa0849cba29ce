use std::path::PathBuf;

/// Linear HDR pixels stored as RGBA f32, rows top to bottom.
#[derive(Debug, Clone, PartialEq)]
pub struct EnvironmentImage {
    pub width: u32,
    pub height: u32,
    pub texels: Vec<f32>,
}

impl EnvironmentImage {
    pub fn texel(&self, x: u32, y: u32) -> [f32; 4] {
        let offset = ((y * self.width + x) * 4) as usize;
        [
            self.texels[offset],
            self.texels[offset + 1],
            self.texels[offset + 2],
            self.texels[offset + 3],
        ]
    }

    /// Box-filtered half-size copy; each dimension bottoms out at one texel.
    pub fn downsample(&self) -> EnvironmentImage {
        let width = (self.width / 2).max(1);
        let height = (self.height / 2).max(1);
        let mut texels = Vec::with_capacity((width * height * 4) as usize);
        for y in 0..height {
            for x in 0..width {
                let mut sum = [0.0f32; 4];
                let mut count = 0.0;
                for sy in (y * 2)..(y * 2 + 2).min(self.height) {
                    for sx in (x * 2)..(x * 2 + 2).min(self.width) {
                        let texel = self.texel(sx, sy);
                        for (acc, value) in sum.iter_mut().zip(texel) {
                            *acc += value;
                        }
                        count += 1.0;
                    }
                }
                texels.extend(sum.iter().map(|value| value / count));
            }
        }
        EnvironmentImage {
            width,
            height,
            texels,
        }
    }

    /// Full mip chain starting with a copy of this image.
    pub fn mip_chain(&self) -> Vec<EnvironmentImage> {
        let mut levels = vec![self.clone()];
        loop {
            let last = &levels[levels.len() - 1];
            if last.width == 1 && last.height == 1 {
                break;
            }
            let next = last.downsample();
            levels.push(next);
        }
        levels
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Filter {
    Nearest,
    Linear,
}

/// Sampling of the environment texture, shared by lighting and background.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct EnvironmentFilters {
    pub mag: Filter,
    pub min: Filter,
    /// Blend between prefiltered levels; `nearest` snaps to one level.
    pub mipmap: Filter,
}

impl Default for EnvironmentFilters {
    fn default() -> Self {
        Self {
            mag: Filter::Linear,
            min: Filter::Linear,
            mipmap: Filter::Linear,
        }
    }
}

/// The one equirectangular environment texture shared by the background and
/// every material bound to the scene environment.
#[derive(Debug, Clone)]
pub struct EnvironmentMap {
    pub image: EnvironmentImage,
    pub source: PathBuf,
    pub filters: EnvironmentFilters,
}

/// Settings for drawing the environment behind the scene.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Background {
    #[serde(skip)]
    pub enabled: bool,
    pub blurriness: f32,
    pub intensity: f32,
}

impl Default for Background {
    fn default() -> Self {
        Self {
            enabled: false,
            blurriness: 0.1,
            intensity: 0.9,
        }
    }
}

/// Installs a decoded environment for lighting and as the blurred backdrop.
pub fn install(
    scene: &mut crate::scene::Scene,
    image: EnvironmentImage,
    source: impl Into<PathBuf>,
    background: Background,
    filters: EnvironmentFilters,
) {
    let map = EnvironmentMap {
        image,
        source: source.into(),
        filters,
    };
    log::info!(
        "Environment installed: {} ({}x{})",
        map.source.display(),
        map.image.width,
        map.image.height
    );
    scene.set_environment(map);
    scene.background = Background {
        enabled: true,
        ..background
    };
}

#[cfg(test)]
mod tests {
    use super::{install, Background, EnvironmentFilters, EnvironmentImage, Filter};
    use crate::scene::Scene;

    fn image(width: u32, height: u32, value: f32) -> EnvironmentImage {
        EnvironmentImage {
            width,
            height,
            texels: vec![value; (width * height * 4) as usize],
        }
    }

    #[test]
    fn mip_chain_halves_down_to_one_texel() {
        let levels = image(8, 4, 1.0).mip_chain();
        let sizes: Vec<(u32, u32)> = levels.iter().map(|l| (l.width, l.height)).collect();
        assert_eq!(sizes, vec![(8, 4), (4, 2), (2, 1), (1, 1)]);
    }

    #[test]
    fn downsample_averages_neighbours() {
        let mut source = image(2, 2, 0.0);
        source.texels[0] = 4.0;
        let half = source.downsample();
        assert_eq!(half.texel(0, 0)[0], 1.0);
    }

    #[test]
    fn install_enables_blurred_dimmed_background() {
        let mut scene = Scene::new();
        assert!(scene.environment().is_none());
        let filters = EnvironmentFilters {
            mag: Filter::Nearest,
            ..EnvironmentFilters::default()
        };
        install(&mut scene, image(4, 2, 0.5), "env.hdr", Background::default(), filters);

        let environment = scene.environment().expect("environment installed");
        assert_eq!(environment.filters.mag, Filter::Nearest);
        assert_eq!(environment.filters.mipmap, Filter::Linear);
        assert!(scene.background.enabled);
        assert_eq!(scene.background.blurriness, 0.1);
        assert_eq!(scene.background.intensity, 0.9);
        assert_eq!(scene.environment_revision(), 1);
    }

    #[test]
    fn filters_parse_from_snake_case_json() {
        let filters: EnvironmentFilters = serde_json::from_str(r#"{ "min": "nearest" }"#).unwrap();
        assert_eq!(filters.min, Filter::Nearest);
        assert_eq!(filters.mag, Filter::Linear);
    }
}
