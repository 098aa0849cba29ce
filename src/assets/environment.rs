use std::path::Path;

use crate::assets::AssetError;
use crate::scene::environment::EnvironmentImage;

/// Decodes an equirectangular HDR panorama into linear RGBA f32 texels.
pub fn load_environment(path: &Path) -> Result<EnvironmentImage, AssetError> {
    let decoded = image::open(path).map_err(|source| AssetError::Image {
        path: path.display().to_string(),
        source,
    })?;
    let rgba = decoded.to_rgba32f();
    let (width, height) = rgba.dimensions();
    if width == 0 || height == 0 {
        return Err(AssetError::EmptyImage {
            path: path.display().to_string(),
        });
    }
    log::info!("Decoded environment {} ({}x{})", path.display(), width, height);
    Ok(EnvironmentImage {
        width,
        height,
        texels: rgba.into_raw(),
    })
}

#[cfg(test)]
mod tests {
    use super::load_environment;
    use crate::assets::AssetError;
    use std::path::Path;

    #[test]
    fn missing_file_is_an_image_error() {
        let result = load_environment(Path::new("does/not/exist/env.hdr"));
        assert!(matches!(result, Err(AssetError::Image { .. })));
    }

    #[test]
    fn decodes_a_radiance_file() {
        let mut path = std::env::temp_dir();
        path.push(format!("vitrine_env_{}.hdr", std::process::id()));
        let pixels = vec![image::Rgb([0.5f32, 1.0, 2.0]); 4 * 2];
        let file = std::fs::File::create(&path).unwrap();
        image::codecs::hdr::HdrEncoder::new(file)
            .encode(&pixels, 4, 2)
            .unwrap();

        let decoded = load_environment(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!((decoded.width, decoded.height), (4, 2));
        assert_eq!(decoded.texels.len(), 4 * 2 * 4);
        let texel = decoded.texel(0, 0);
        assert!((texel[2] - 2.0).abs() < 0.05);
        assert_eq!(texel[3], 1.0);
    }
}
