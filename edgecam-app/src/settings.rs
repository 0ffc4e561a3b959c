//! Host settings persistence via TOML.
//!
//! Settings are stored at `<config_dir>/edgecam/settings.toml`.
//! Missing or corrupted config files return sensible defaults, and zero
//! rates or dimensions in an otherwise valid file are reset on load.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use edgecam_media::{PipelineConfig, ProcessingMode};
use serde::{Deserialize, Serialize};

/// User-configurable settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Requested frame width (clamped by the pipeline to 1280).
    pub width: u32,
    /// Requested frame height (clamped by the pipeline to 720).
    pub height: u32,
    /// Synthetic camera frames per second.
    pub frame_rate: u32,
    /// Display refreshes per second.
    pub display_rate: u32,
    /// Mode the pipeline starts in.
    pub initial_mode: Mode,
    /// Chroma layout produced by the synthetic camera.
    pub chroma_layout: FeedLayout,
    /// Flip the processing mode every this many seconds (0 = never).
    pub toggle_every_secs: u64,
    /// Stop after this many seconds (0 = run until Ctrl-C).
    pub run_secs: u64,
}

/// Processing mode as written in the settings file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Edge,
    Raw,
}

impl From<Mode> for ProcessingMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Edge => ProcessingMode::EdgeDetection,
            Mode::Raw => ProcessingMode::Raw,
        }
    }
}

/// Chroma layout of the synthetic camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedLayout {
    /// Interleaved `U,V` chroma exposed as two aliased planes.
    SemiPlanar,
    /// Separate U and V planes.
    Planar,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            frame_rate: 30,
            display_rate: 60,
            initial_mode: Mode::Edge,
            chroma_layout: FeedLayout::SemiPlanar,
            toggle_every_secs: 0,
            run_secs: 0,
        }
    }
}

impl Settings {
    /// Load settings from the default config path.
    ///
    /// Returns defaults if the file doesn't exist or is corrupted.
    pub fn load() -> Self {
        Self::load_from_dir(Self::config_dir())
    }

    /// Save settings to the default config path.
    pub fn save(&self) -> Result<()> {
        self.save_to_dir(Self::config_dir())
    }

    /// Load settings from a specific config directory.
    ///
    /// Unreadable files fall back to defaults as a whole; a readable file
    /// with unusable values keeps its other fields and only has those
    /// values replaced (see [`Settings::validated`]).
    pub fn load_from_dir(config_dir: PathBuf) -> Self {
        let path = config_dir.join("settings.toml");
        match Self::read_file(&path) {
            Ok(Some(settings)) => {
                tracing::info!(path = %path.display(), "settings loaded");
                settings.validated()
            }
            Ok(None) => {
                tracing::info!(
                    path = %path.display(),
                    "settings file not found, using defaults"
                );
                Self::default()
            }
            Err(e) => {
                let detail = format!("{e:#}");
                tracing::warn!(
                    path = %path.display(),
                    error = %detail,
                    "unusable settings file, using defaults"
                );
                Self::default()
            }
        }
    }

    /// `Ok(None)` when the file does not exist.
    fn read_file(path: &Path) -> Result<Option<Self>> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e).context("failed to read settings file"),
        };
        let settings = toml::from_str(&contents).context("failed to parse settings file")?;
        Ok(Some(settings))
    }

    /// Replace values the camera feed or display loop cannot run with.
    ///
    /// Zero rates would give a zero tick period and zero dimensions are
    /// rejected by the pipeline, so each is reset to its default.
    pub fn validated(mut self) -> Self {
        let defaults = Self::default();
        for (name, value, default) in [
            ("frame_rate", &mut self.frame_rate, defaults.frame_rate),
            ("display_rate", &mut self.display_rate, defaults.display_rate),
            ("width", &mut self.width, defaults.width),
            ("height", &mut self.height, defaults.height),
        ] {
            if *value == 0 {
                tracing::warn!(setting = name, default, "setting must be non-zero, using default");
                *value = default;
            }
        }
        self
    }

    /// Save settings to a specific config directory.
    pub fn save_to_dir(&self, config_dir: PathBuf) -> Result<()> {
        std::fs::create_dir_all(&config_dir).with_context(|| {
            format!(
                "failed to create config directory: {}",
                config_dir.display()
            )
        })?;

        let path = config_dir.join("settings.toml");
        let contents = toml::to_string_pretty(self).context("failed to serialize settings")?;
        std::fs::write(&path, &contents)
            .with_context(|| format!("failed to write settings file: {}", path.display()))?;

        tracing::info!(path = %path.display(), "settings saved");
        Ok(())
    }

    /// Pipeline configuration for these settings.
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            width: self.width,
            height: self.height,
        }
    }

    /// Get the default config directory.
    fn config_dir() -> PathBuf {
        directories::ProjectDirs::from("", "", "edgecam")
            .map(|d| d.config_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("edgecam-config"))
    }
}
