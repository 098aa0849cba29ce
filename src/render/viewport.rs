use winit::dpi::{LogicalSize, PhysicalSize};

use crate::render::camera::PerspectiveCamera;

pub const DEFAULT_MAX_PIXEL_RATIO: f64 = 2.0;

/// What the renderer has to apply after a viewport update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportChange {
    pub raster: [u32; 2],
    pub aspect: f32,
    pub pixel_ratio: f64,
}

/// Logical surface size and the pixel ratio the scene is rasterised at.
#[derive(Debug, Clone, PartialEq)]
pub struct Viewport {
    logical: LogicalSize<f64>,
    pixel_ratio: f64,
    max_pixel_ratio: f64,
}

impl Viewport {
    pub fn new(max_pixel_ratio: f64) -> Self {
        Self {
            logical: LogicalSize::new(0.0, 0.0),
            pixel_ratio: 1.0,
            max_pixel_ratio: max_pixel_ratio.max(0.1),
        }
    }

    /// Applies a window size. Zero-sized windows and unchanged sizes leave
    /// both the viewport and the camera untouched.
    pub fn on_resize(
        &mut self,
        physical: PhysicalSize<u32>,
        scale_factor: f64,
        camera: &mut PerspectiveCamera,
    ) -> Option<ViewportChange> {
        if physical.width == 0 || physical.height == 0 || scale_factor <= 0.0 {
            return None;
        }
        let logical: LogicalSize<f64> = physical.to_logical(scale_factor);
        let pixel_ratio = scale_factor.min(self.max_pixel_ratio);
        if logical == self.logical && pixel_ratio == self.pixel_ratio {
            return None;
        }

        self.logical = logical;
        self.pixel_ratio = pixel_ratio;
        let aspect = self.aspect();
        camera.set_aspect(aspect);
        let raster = self.raster_size();
        log::debug!(
            "Viewport {}x{} @{:.2} -> raster {}x{}",
            logical.width,
            logical.height,
            pixel_ratio,
            raster[0],
            raster[1]
        );
        Some(ViewportChange {
            raster,
            aspect,
            pixel_ratio,
        })
    }

    pub fn aspect(&self) -> f32 {
        if self.logical.height <= 0.0 {
            return 1.0;
        }
        self.logical.width as f32 / self.logical.height as f32
    }

    pub fn raster_size(&self) -> [u32; 2] {
        [
            ((self.logical.width * self.pixel_ratio).round() as u32).max(1),
            ((self.logical.height * self.pixel_ratio).round() as u32).max(1),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::{Viewport, DEFAULT_MAX_PIXEL_RATIO};
    use crate::render::camera::{CameraConfig, PerspectiveCamera};
    use winit::dpi::PhysicalSize;

    fn camera() -> PerspectiveCamera {
        PerspectiveCamera::from_config(&CameraConfig::default(), 1.0)
    }

    #[test]
    fn resize_sets_aspect_to_width_over_height() {
        let mut viewport = Viewport::new(DEFAULT_MAX_PIXEL_RATIO);
        let mut camera = camera();
        let change = viewport
            .on_resize(PhysicalSize::new(1600, 900), 1.0, &mut camera)
            .expect("first resize applies");
        assert_eq!(camera.aspect, 1600.0 / 900.0);
        assert_eq!(change.aspect, camera.aspect);
        assert!(camera.projection_dirty());
        assert_eq!(change.raster, [1600, 900]);
    }

    #[test]
    fn pixel_ratio_is_clamped_to_two() {
        let mut viewport = Viewport::new(DEFAULT_MAX_PIXEL_RATIO);
        let mut camera = camera();
        let change = viewport
            .on_resize(PhysicalSize::new(3000, 1500), 3.0, &mut camera)
            .expect("resize applies");
        assert_eq!(change.pixel_ratio, 2.0);
        assert_eq!(viewport.aspect(), 2.0);
        assert_eq!(change.raster, [2000, 1000]);
        assert_eq!(camera.aspect, 2.0);
    }

    #[test]
    fn resizing_twice_to_the_same_size_is_a_no_op() {
        let mut viewport = Viewport::new(DEFAULT_MAX_PIXEL_RATIO);
        let mut camera = camera();
        assert!(viewport
            .on_resize(PhysicalSize::new(800, 600), 1.0, &mut camera)
            .is_some());
        camera.update_projection_matrix();
        let before = viewport.clone();

        assert!(viewport
            .on_resize(PhysicalSize::new(800, 600), 1.0, &mut camera)
            .is_none());
        assert_eq!(viewport, before);
        assert!(!camera.projection_dirty());
    }

    #[test]
    fn minimised_window_is_ignored() {
        let mut viewport = Viewport::new(DEFAULT_MAX_PIXEL_RATIO);
        let mut camera = camera();
        assert!(viewport
            .on_resize(PhysicalSize::new(0, 0), 1.0, &mut camera)
            .is_none());
        assert_eq!(camera.aspect, 1.0);
    }

    #[test]
    fn scale_factor_change_alone_updates_raster() {
        let mut viewport = Viewport::new(DEFAULT_MAX_PIXEL_RATIO);
        let mut camera = camera();
        viewport.on_resize(PhysicalSize::new(800, 600), 1.0, &mut camera);
        let change = viewport
            .on_resize(PhysicalSize::new(1200, 900), 1.5, &mut camera)
            .expect("ratio changed");
        assert_eq!(change.raster, [1200, 900]);
        assert_eq!(camera.aspect, 800.0 / 600.0);
    }
}
