// src/timing.rs

//! Frame timing and FPS counting.

use log::debug;

/// Length of the FPS averaging window.
const FPS_WINDOW_MS: u64 = 1000;

/// Tracks delta time between frames and a once-per-second FPS figure.
#[derive(Debug, Clone, Default)]
pub struct FrameTimer {
    last_ms: Option<u64>,
    window_ms: u64,
    frames_in_window: u32,
    current_fps: u32,
    total_frames: u64,
}

impl FrameTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a frame at absolute time `time_ms` and return seconds since the
    /// previous frame. The first frame, and a clock that went backwards,
    /// report zero.
    pub fn update(&mut self, time_ms: u64) -> f32 {
        let elapsed_ms = match self.last_ms {
            Some(last) => time_ms.saturating_sub(last),
            None => 0,
        };
        self.last_ms = Some(time_ms);
        self.total_frames += 1;

        self.frames_in_window += 1;
        self.window_ms += elapsed_ms;
        if self.window_ms >= FPS_WINDOW_MS {
            self.current_fps = self.frames_in_window;
            debug!("FrameTimer: {} fps", self.current_fps);
            self.frames_in_window = 0;
            self.window_ms -= FPS_WINDOW_MS;
        }

        elapsed_ms as f32 / 1000.0
    }

    /// Frames counted so far in the current window.
    pub fn fps(&self) -> u32 {
        self.frames_in_window
    }

    /// Frame count of the last complete one-second window.
    pub fn current_fps(&self) -> u32 {
        self.current_fps
    }

    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }
}
