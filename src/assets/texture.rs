use std::path::Path;

use crate::assets::AssetError;
use crate::scene::textures::{TextureImage, TextureOptions};

/// Decodes a colour image to RGBA8. `flip_y` mirrors rows so the first row
/// becomes the bottom of the texture.
pub fn load_texture(path: &Path, options: TextureOptions) -> Result<TextureImage, AssetError> {
    let decoded = image::open(path).map_err(|source| AssetError::Image {
        path: path.display().to_string(),
        source,
    })?;
    let mut rgba = decoded.to_rgba8();
    if options.flip_y {
        image::imageops::flip_vertical_in_place(&mut rgba);
    }
    let (width, height) = rgba.dimensions();
    if width == 0 || height == 0 {
        return Err(AssetError::EmptyImage {
            path: path.display().to_string(),
        });
    }
    log::debug!("Decoded texture {} ({}x{})", path.display(), width, height);
    Ok(TextureImage {
        width,
        height,
        pixels: rgba.into_raw(),
    })
}

/// Downscales `texture` so neither side exceeds `max_dimension`, keeping its
/// aspect ratio. `None` when the pixel buffer does not match its size.
pub fn fit_within(texture: &TextureImage, max_dimension: u32) -> Option<TextureImage> {
    let rgba = image::RgbaImage::from_raw(texture.width, texture.height, texture.pixels.clone())?;
    let max_dimension = max_dimension.max(1);
    let scale = max_dimension as f64 / texture.width.max(texture.height).max(1) as f64;
    if scale >= 1.0 {
        return Some(texture.clone());
    }
    let width = ((texture.width as f64 * scale).round() as u32).clamp(1, max_dimension);
    let height = ((texture.height as f64 * scale).round() as u32).clamp(1, max_dimension);
    let resized = image::imageops::resize(&rgba, width, height, image::imageops::FilterType::Triangle);
    Some(TextureImage {
        width,
        height,
        pixels: resized.into_raw(),
    })
}

#[cfg(test)]
mod tests {
    use super::{fit_within, load_texture};
    use crate::scene::textures::TextureImage;
    use crate::scene::textures::TextureOptions;

    fn write_two_row_png(tag: &str) -> std::path::PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("vitrine_tex_{}_{}.png", tag, std::process::id()));
        let mut image = image::RgbaImage::new(1, 2);
        image.put_pixel(0, 0, image::Rgba([255, 0, 0, 255]));
        image.put_pixel(0, 1, image::Rgba([0, 0, 255, 255]));
        image.save(&path).unwrap();
        path
    }

    #[test]
    fn keeps_row_order_without_flip() {
        let path = write_two_row_png("plain");
        let texture = load_texture(
            &path,
            TextureOptions {
                flip_y: false,
                srgb: true,
            },
        )
        .unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!((texture.width, texture.height), (1, 2));
        assert_eq!(&texture.pixels[0..4], &[255, 0, 0, 255]);
    }

    #[test]
    fn flip_y_swaps_rows() {
        let path = write_two_row_png("flipped");
        let texture = load_texture(
            &path,
            TextureOptions {
                flip_y: true,
                srgb: true,
            },
        )
        .unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!(&texture.pixels[0..4], &[0, 0, 255, 255]);
    }

    #[test]
    fn oversized_textures_shrink_to_the_limit() {
        let wide = TextureImage {
            width: 100,
            height: 20,
            pixels: vec![200; 100 * 20 * 4],
        };
        let fitted = fit_within(&wide, 64).unwrap();
        assert_eq!((fitted.width, fitted.height), (64, 13));
        assert_eq!(fitted.pixels.len(), 64 * 13 * 4);
        assert_eq!(&fitted.pixels[0..4], &[200, 200, 200, 200]);
    }

    #[test]
    fn mismatched_pixel_buffers_are_rejected() {
        let broken = TextureImage {
            width: 4,
            height: 4,
            pixels: vec![0; 12],
        };
        assert!(fit_within(&broken, 2).is_none());
    }
}
