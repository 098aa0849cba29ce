use crate::app::egui_host::EguiFrameOutput;

/// Draws the control panel on top of the presented frame.
pub struct EguiOverlay {
    renderer: egui_wgpu::Renderer,
}

impl EguiOverlay {
    pub fn new(device: &wgpu::Device, surface_format: wgpu::TextureFormat) -> Self {
        Self {
            renderer: egui_wgpu::Renderer::new(device, surface_format, None, 1, false),
        }
    }

    /// Applies texture updates and uploads tessellated meshes. Returns the
    /// command buffers egui-wgpu recorded for its own callbacks.
    pub fn update(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        output: &EguiFrameOutput,
    ) -> Vec<wgpu::CommandBuffer> {
        for (id, delta) in &output.textures.set {
            self.renderer.update_texture(device, queue, *id, delta);
        }
        self.renderer.update_buffers(
            device,
            queue,
            encoder,
            &output.primitives,
            &screen_descriptor(output),
        )
    }

    pub fn render(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
        output: &EguiFrameOutput,
    ) {
        let pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("egui pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        self.renderer.render(
            &mut pass.forget_lifetime(),
            &output.primitives,
            &screen_descriptor(output),
        );
    }

    /// Textures egui dropped this frame; call after the frame is submitted.
    pub fn free_textures(&mut self, output: &EguiFrameOutput) {
        for id in &output.textures.free {
            self.renderer.free_texture(id);
        }
    }
}

fn screen_descriptor(output: &EguiFrameOutput) -> egui_wgpu::ScreenDescriptor {
    egui_wgpu::ScreenDescriptor {
        size_in_pixels: output.size_px,
        pixels_per_point: output.pixels_per_point,
    }
}
