// src/app.rs

//! Frame-driven application loop.
//!
//! `TextApp` owns the device, the font and the renderer and turns one tick of
//! the host's clock into one rendered frame. Quit is polled at the top of each
//! frame; a requested quit ends the loop before anything is drawn.

use anyhow::{Context, Error as AnyhowError};

use crate::atlas::Font;
use crate::batch::Quad;
use crate::config::{Config, TextLine};
use crate::device::{ClearColor, DrawTarget, GraphicsDevice, TextureDescriptor, TextureHandle};
use crate::renderer::TextRenderer;
use crate::timing::FrameTimer;

/// Margin around the FPS readout, in pixels.
const FPS_MARGIN: f32 = 16.0;

/// What the loop should do after a frame.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum FrameStatus {
    /// The frame was rendered; keep going.
    Running,
    /// Quit was requested. Nothing was rendered for this frame.
    Shutdown,
}

/// Whatever tells the loop to stop: a key, a window close, a frame budget.
pub trait InputSource {
    /// Polled once at the top of every frame.
    fn quit_requested(&mut self) -> bool;
}

impl<F: FnMut() -> bool> InputSource for F {
    fn quit_requested(&mut self) -> bool {
        self()
    }
}

/// Requests quit after a fixed number of frames.
#[derive(Debug, Clone)]
pub struct FrameLimit {
    remaining: u32,
}

impl FrameLimit {
    pub fn new(frames: u32) -> Self {
        Self { remaining: frames }
    }
}

impl InputSource for FrameLimit {
    fn quit_requested(&mut self) -> bool {
        if self.remaining == 0 {
            return true;
        }
        self.remaining -= 1;
        false
    }
}

/// Offscreen render target plus the one-quad pass that copies it to the screen.
struct OffscreenPass {
    texture: TextureHandle,
    present: TextRenderer,
    quad: Quad,
}

pub struct TextApp<D: GraphicsDevice, I: InputSource> {
    device: D,
    font: Font,
    renderer: TextRenderer,
    offscreen: Option<OffscreenPass>,
    input: I,
    timer: FrameTimer,
    lines: Vec<TextLine>,
    show_fps: bool,
    clear_color: ClearColor,
    surface_height: f32,
}

impl<D: GraphicsDevice, I: InputSource> TextApp<D, I> {
    /// Take ownership of a device and a font built on it.
    pub fn new(mut device: D, font: Font, config: &Config, input: I) -> Result<Self, AnyhowError> {
        let renderer = TextRenderer::new(&mut device, config.batch.max_quads)
            .context("Failed to allocate text vertex buffer")?;

        let offscreen = if config.run.offscreen {
            let (width, height) = (config.surface.width, config.surface.height);
            let texture = device
                .create_texture(&TextureDescriptor::render_target(width, height))
                .context("Failed to create offscreen render target")?;
            let present =
                TextRenderer::new(&mut device, 1).context("Failed to allocate present buffer")?;
            log::info!("TextApp: Rendering offscreen into {:?} ({}x{})", texture, width, height);
            Some(OffscreenPass {
                texture,
                present,
                quad: Quad {
                    x0: 0.0,
                    y0: 0.0,
                    x1: width as f32,
                    y1: height as f32,
                    u0: 0.0,
                    v0: 0.0,
                    u1: 1.0,
                    v1: 1.0,
                },
            })
        } else {
            None
        };

        Ok(Self {
            device,
            font,
            renderer,
            offscreen,
            input,
            timer: FrameTimer::new(),
            lines: config.run.lines.clone(),
            show_fps: config.run.show_fps,
            clear_color: config.surface.clear_color(),
            surface_height: config.surface.height as f32,
        })
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn font(&self) -> &Font {
        &self.font
    }

    pub fn timer(&self) -> &FrameTimer {
        &self.timer
    }

    /// Render one frame stamped at `time_ms`.
    pub fn process_frame(&mut self, time_ms: u64) -> Result<FrameStatus, AnyhowError> {
        if self.input.quit_requested() {
            log::info!("TextApp: Quit requested. Signaling shutdown.");
            return Ok(FrameStatus::Shutdown);
        }

        let dt = self.timer.update(time_ms);
        log::trace!("TextApp: Frame at {} ms (dt {:.3}s)", time_ms, dt);

        let (target, background) = match &self.offscreen {
            Some(pass) => (DrawTarget::Texture(pass.texture), ClearColor::new(0.0, 0.0, 0.0, 0.0)),
            None => (DrawTarget::Screen, self.clear_color),
        };
        self.device
            .clear(target, background)
            .context("Failed to clear render target")?;

        let fps_line = self.show_fps.then(|| {
            let y = self.surface_height - self.font.line_height() - FPS_MARGIN;
            (format!("FPS: {}", self.timer.current_fps()), y)
        });

        let mut frame = self.renderer.begin_frame();
        let lines = self
            .lines
            .iter()
            .map(|line| (line.text.as_str(), line.x, line.y))
            .chain(fps_line.as_ref().map(|(text, y)| (text.as_str(), FPS_MARGIN, *y)));
        for (text, x, y) in lines {
            if let Err(e) = frame.draw_text(&self.font, text, x, y) {
                log::warn!("TextApp: {} - dropping the rest of this frame's text", e);
                break;
            }
        }
        frame
            .submit(&mut self.device, &self.font, target)
            .context("Failed to submit text batch")?;

        if let Some(pass) = &mut self.offscreen {
            self.device
                .clear(DrawTarget::Screen, self.clear_color)
                .context("Failed to clear screen")?;
            let mut present = pass.present.begin_frame();
            present.push_quad(&pass.quad)?;
            present
                .submit_with_texture(&mut self.device, pass.texture, DrawTarget::Screen)
                .context("Failed to present offscreen target")?;
        }

        Ok(FrameStatus::Running)
    }

    /// Drive frames `frame_interval_ms` apart until quit. Returns frames rendered.
    pub fn run(&mut self, frame_interval_ms: u64) -> Result<u64, AnyhowError> {
        let mut time_ms = 0;
        let mut frames = 0;
        log::info!("TextApp: Starting frame loop...");
        loop {
            match self.process_frame(time_ms)? {
                FrameStatus::Running => {
                    frames += 1;
                    time_ms += frame_interval_ms;
                }
                FrameStatus::Shutdown => break,
            }
        }
        log::info!("TextApp: Frame loop ended after {} frames.", frames);
        Ok(frames)
    }

    /// Release every device resource and hand the device back.
    pub fn shutdown(self) -> Result<D, AnyhowError> {
        let mut device = self.device;
        self.renderer
            .release(&mut device)
            .context("Failed to release text vertex buffer")?;
        if let Some(pass) = self.offscreen {
            pass.present
                .release(&mut device)
                .context("Failed to release present buffer")?;
            device
                .destroy_texture(pass.texture)
                .context("Failed to release offscreen target")?;
        }
        self.font
            .release(&mut device)
            .context("Failed to release font atlas")?;
        log::info!("TextApp: Resources released.");
        Ok(device)
    }
}
