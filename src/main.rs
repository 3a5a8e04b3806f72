// src/main.rs

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use atlas_text::{
    app::{FrameLimit, TextApp},
    atlas::build_font,
    config::Config,
    device::SoftwareDevice,
    rasterizer::TtfGlyphSource,
};

// Logging
use anyhow::Context;
use log::{error, info};

/// Main entry point for the `atlas-text` demo.
///
/// Usage: `atlas-text [config.json]`
fn main() -> anyhow::Result<()> {
    // Default filter is "info" if RUST_LOG is not set.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_micros()
        .init();

    info!("Starting atlas-text...");

    // --- Configuration ---
    let config = match std::env::args_os().nth(1).map(PathBuf::from) {
        Some(path) => {
            let config = Config::load(&path)?;
            info!("Configuration loaded from '{}'.", path.display());
            config
        }
        None => {
            info!("No config file given, using defaults.");
            Config::default()
        }
    };

    // --- Device and Font ---
    let mut device = SoftwareDevice::new(config.surface.width, config.surface.height);
    device.set_text_color(config.surface.text_color);

    let source = TtfGlyphSource::with_dpi(config.font.dpi);
    let font = build_font(
        &source,
        &mut device,
        &config.font.path,
        config.font.point_size,
        config.font.char_range(),
    )
    .with_context(|| format!("Failed to build font atlas from '{}'", config.font.path.display()))?;

    // --- Main Loop ---
    let mut app = TextApp::new(device, font, &config, FrameLimit::new(config.run.max_frames))
        .context("Failed to initialize text renderer")?;
    if let Err(e) = app.run(config.run.frame_interval_ms) {
        error!("Error in frame loop: {:#}. Root cause: {:?}. Exiting.", e, e.root_cause());
    }
    info!("Last complete second: {} fps", app.timer().current_fps());

    // --- Output ---
    let output = &config.run.output;
    let file = File::create(output)
        .with_context(|| format!("Failed to create output image '{}'", output.display()))?;
    app.device()
        .write_ppm(BufWriter::new(file))
        .with_context(|| format!("Failed to write output image '{}'", output.display()))?;
    info!("Wrote final frame to '{}'.", output.display());

    // --- Cleanup ---
    app.shutdown().context("Failed to release device resources")?;
    info!("atlas-text exited successfully.");

    Ok(())
}
