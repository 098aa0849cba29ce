use std::time::{Duration, Instant};
use winit::window::Window;

const TITLE_REFRESH: Duration = Duration::from_millis(500);

/// Frame pacing target plus an fps readout in the window title.
pub struct FrameTiming {
    base_title: String,
    target: Duration,
    next_frame: Instant,
    window_start: Instant,
    frames_in_window: u32,
    render_ms: f32,
}

impl FrameTiming {
    pub fn new(base_title: String) -> Self {
        let now = Instant::now();
        Self {
            base_title,
            target: Duration::from_millis(16),
            next_frame: now,
            window_start: now,
            frames_in_window: 0,
            render_ms: 0.0,
        }
    }

    /// Paces redraws to the monitor refresh rate, 60 Hz when unknown.
    pub fn retarget(&mut self, window: &Window) {
        let refresh_millihertz = window
            .current_monitor()
            .and_then(|monitor| monitor.refresh_rate_millihertz());
        self.target = frame_duration(refresh_millihertz);
        self.next_frame = Instant::now() + self.target;
    }

    pub fn target(&self) -> Duration {
        self.target
    }

    /// Returns true when a redraw is due and schedules the next one.
    pub fn frame_due(&mut self, now: Instant) -> bool {
        if now < self.next_frame {
            return false;
        }
        self.next_frame = now + self.target;
        true
    }

    pub fn next_frame(&self) -> Instant {
        self.next_frame
    }

    pub fn finish_frame(&mut self, window: Option<&Window>, frame_start: Instant) {
        let now = Instant::now();
        self.render_ms = now.saturating_duration_since(frame_start).as_secs_f32() * 1000.0;
        self.frames_in_window = self.frames_in_window.saturating_add(1);

        let elapsed = now.saturating_duration_since(self.window_start);
        if elapsed < TITLE_REFRESH {
            return;
        }
        let fps = self.frames_in_window as f32 / elapsed.as_secs_f32();
        if let Some(window) = window {
            window.set_title(&format!(
                "{} - {:.1} fps (frame {:.2} ms)",
                self.base_title, fps, self.render_ms
            ));
        }
        self.frames_in_window = 0;
        self.window_start = now;
    }
}

fn frame_duration(refresh_millihertz: Option<u32>) -> Duration {
    match refresh_millihertz {
        Some(millihertz) if millihertz > 1000 => Duration::from_secs_f64(1000.0 / f64::from(millihertz)),
        _ => Duration::from_millis(16),
    }
}
