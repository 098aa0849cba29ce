use winit::event::WindowEvent;
use winit::window::Window;

use crate::scene::Scene;
use crate::ui::{ControlPanel, PanelAction};

/// One frame of tessellated panel geometry plus the texture changes it needs.
pub struct EguiFrameOutput {
    pub primitives: Vec<egui::ClippedPrimitive>,
    pub textures: egui::TexturesDelta,
    pub pixels_per_point: f32,
    pub size_px: [u32; 2],
}

/// Bridges winit input into egui and runs the control panel each frame.
pub struct EguiHost {
    ctx: egui::Context,
    state: egui_winit::State,
}

impl EguiHost {
    pub fn new(window: &Window) -> Self {
        let ctx = egui::Context::default();
        let state = egui_winit::State::new(
            ctx.clone(),
            egui::ViewportId::ROOT,
            window,
            Some(window.scale_factor() as f32),
            window.theme(),
            None,
        );
        Self { ctx, state }
    }

    /// True when the panel used the event and the camera should ignore it.
    pub fn on_window_event(&mut self, window: &Window, event: &WindowEvent) -> bool {
        self.state.on_window_event(window, event).consumed
    }

    pub fn wants_pointer(&self) -> bool {
        self.ctx.wants_pointer_input() || self.ctx.is_pointer_over_area()
    }

    /// Shows `panel` against `scene`; edits land in the scene immediately.
    pub fn run_panel(
        &mut self,
        window: &Window,
        panel: &mut ControlPanel,
        scene: &mut Scene,
    ) -> (EguiFrameOutput, Option<PanelAction>) {
        let input = self.state.take_egui_input(window);
        let mut action = None;
        let full = self.ctx.run(input, |ctx| {
            if let Some(clicked) = panel.show(ctx, scene) {
                action = Some(clicked);
            }
        });
        self.state.handle_platform_output(window, full.platform_output);

        let size = window.inner_size();
        let frame = EguiFrameOutput {
            primitives: self.ctx.tessellate(full.shapes, full.pixels_per_point),
            textures: full.textures_delta,
            pixels_per_point: full.pixels_per_point,
            size_px: [size.width.max(1), size.height.max(1)],
        };
        (frame, action)
    }
}
