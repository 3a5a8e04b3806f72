// src/config.rs

//! Configuration for the atlas-text demo binary.
//!
//! Every struct derives `Deserialize` with `#[serde(default)]`, so a config
//! file only needs to name the settings it changes. Defaults draw printable
//! ASCII at 32 pt, white on a dark 640x480 surface.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::atlas::CharRange;
use crate::device::ClearColor;

// --- Top-Level Configuration Structure ---

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub font: FontConfig,
    pub batch: BatchConfig,
    pub surface: SurfaceConfig,
    pub run: RunConfig,
}

impl Config {
    /// Read a JSON config file. Missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
        Self::from_json(&text).with_context(|| format!("Invalid config file '{}'", path.display()))
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(text).context("Failed to parse config JSON")?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would only fail later, deep inside the pipeline.
    pub fn validate(&self) -> Result<()> {
        if !self.font.point_size.is_finite() || self.font.point_size <= 0.0 {
            anyhow::bail!("font.point_size must be positive, got {}", self.font.point_size);
        }
        if !self.font.dpi.is_finite() || self.font.dpi <= 0.0 {
            anyhow::bail!("font.dpi must be positive, got {}", self.font.dpi);
        }
        if self.font.first_char > self.font.last_char {
            anyhow::bail!(
                "font.first_char {:?} is after font.last_char {:?}",
                self.font.first_char,
                self.font.last_char
            );
        }
        if self.surface.width == 0 || self.surface.height == 0 {
            anyhow::bail!(
                "surface must be non-empty, got {}x{}",
                self.surface.width,
                self.surface.height
            );
        }
        Ok(())
    }
}

// --- Font ---

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FontConfig {
    /// TrueType/OpenType file to build the atlas from.
    pub path: PathBuf,
    /// Glyphs are packed into one atlas row, so the summed glyph widths at
    /// this size must fit `device::memory::MAX_TEXTURE_DIMENSION` (8192 px).
    /// Printable ASCII stays under it up to roughly 80 px per glyph.
    pub point_size: f32,
    /// Pixels per inch. At 72 one point is one pixel.
    pub dpi: f32,
    pub first_char: char,
    pub last_char: char,
}

impl FontConfig {
    pub fn char_range(&self) -> CharRange {
        CharRange::new(self.first_char, self.last_char)
    }
}

impl Default for FontConfig {
    fn default() -> Self {
        FontConfig {
            path: PathBuf::from("assets/fonts/NovaMono-Regular.ttf"),
            point_size: 32.0,
            dpi: 72.0,
            first_char: CharRange::PRINTABLE_ASCII.first(),
            last_char: CharRange::PRINTABLE_ASCII.last(),
        }
    }
}

// --- Batch ---

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BatchConfig {
    /// Most quads drawn in one frame. Extra glyphs are dropped.
    pub max_quads: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        BatchConfig { max_quads: 1024 }
    }
}

// --- Surface ---

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SurfaceConfig {
    pub width: u32,
    pub height: u32,
    /// Background RGBA, each channel in `0.0..=1.0`.
    pub clear_color: [f32; 4],
    pub text_color: [u8; 3],
}

impl SurfaceConfig {
    pub fn clear_color(&self) -> ClearColor {
        let [r, g, b, a] = self.clear_color;
        ClearColor::new(r, g, b, a)
    }
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        SurfaceConfig {
            width: 640,
            height: 480,
            clear_color: [0.1, 0.1, 0.1, 1.0],
            text_color: [255, 255, 255],
        }
    }
}

// --- Run ---

/// One string drawn every frame.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TextLine {
    pub text: String,
    pub x: f32,
    pub y: f32,
}

impl Default for TextLine {
    fn default() -> Self {
        TextLine {
            text: String::new(),
            x: 0.0,
            y: 0.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RunConfig {
    /// Frames to render before quitting.
    pub max_frames: u32,
    /// Simulated time between frames, in milliseconds.
    pub frame_interval_ms: u64,
    /// Render into an offscreen texture first, then copy it to the screen.
    pub offscreen: bool,
    /// Where the final frame is written as a PPM image.
    pub output: PathBuf,
    /// Draw the FPS counter as an extra line.
    pub show_fps: bool,
    pub lines: Vec<TextLine>,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            max_frames: 120,
            frame_interval_ms: 16,
            offscreen: false,
            output: PathBuf::from("atlas-text.ppm"),
            show_fps: true,
            lines: vec![
                TextLine {
                    text: "The quick brown fox jumps over the lazy dog".to_string(),
                    x: 16.0,
                    y: 16.0,
                },
                TextLine {
                    text: "0123456789 !\"#$%&'()*+,-./:;<=>?@[\\]^_`{|}~".to_string(),
                    x: 16.0,
                    y: 64.0,
                },
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_round_trip_through_json() {
        let config = Config::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let back = Config::from_json(&json).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let config = Config::from_json(r#"{ "font": { "point_size": 12.0 }, "run": { "max_frames": 3 } }"#).unwrap();
        assert_eq!(config.font.point_size, 12.0);
        assert_eq!(config.font.dpi, 72.0);
        assert_eq!(config.font.char_range(), CharRange::PRINTABLE_ASCII);
        assert_eq!(config.run.max_frames, 3);
        assert_eq!(config.run.frame_interval_ms, 16);
        assert_eq!(config.surface, SurfaceConfig::default());
        assert_eq!(config.batch.max_quads, 1024);
    }

    #[test]
    fn empty_object_is_the_default() {
        assert_eq!(Config::from_json("{}").unwrap(), Config::default());
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(Config::from_json(r#"{ "font": { "point_size": 0.0 } }"#).is_err());
        assert!(Config::from_json(r#"{ "font": { "first_char": "z", "last_char": "a" } }"#).is_err());
        assert!(Config::from_json(r#"{ "surface": { "width": 0 } }"#).is_err());
        assert!(Config::from_json("not json").is_err());
    }

    #[test]
    fn missing_file_names_the_path() {
        let err = Config::load(Path::new("/nonexistent/atlas-text.json")).unwrap_err();
        assert!(format!("{:#}", err).contains("/nonexistent/atlas-text.json"));
    }

    #[test]
    fn clear_color_converts() {
        let surface = SurfaceConfig {
            clear_color: [1.0, 0.0, 0.0, 1.0],
            ..SurfaceConfig::default()
        };
        assert_eq!(surface.clear_color().to_rgba8(), [255, 0, 0, 255]);
    }
}
