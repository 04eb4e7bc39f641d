//! Mock core backed by an external command-line synthesizer.
//!
//! The tool is invoked as `<cli> <output.wav> <text> <preset>` and must leave
//! a PCM wave file at `<output.wav>` before it exits. The output path is
//! fixed per bridge, so calls are serialized on a lock keyed by that path.

use crate::audio::wav::read_wav;
use crate::audio::RawWave;
use crate::error::{EngineError, EngineResult};
use crate::paths::engine_root;
use crate::query::StyleId;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;
use tracing::{debug, warn};

/// One guard per temporary wave file in use
static TEMP_WAVE_LOCKS: Lazy<Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// Lock shared by every bridge writing to `path`
fn temp_wave_lock(path: &Path) -> Arc<Mutex<()>> {
    Arc::clone(
        TEMP_WAVE_LOCKS
            .lock()
            .entry(path.to_path_buf())
            .or_insert_with(|| Arc::new(Mutex::new(()))),
    )
}

/// Voice presets understood by the external tool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VoicePreset {
    /// Style 0
    Dvd,
    /// Style 1
    F1,
    /// Style 2
    F2,
    /// Style 3
    Imd1,
    /// Style 4
    Jgr,
    /// Style 5
    M1,
    /// Style 6
    M2,
    /// Style 7
    R1,
}

impl VoicePreset {
    /// Every preset, indexed by style id
    pub const ALL: [Self; 8] = [
        Self::Dvd,
        Self::F1,
        Self::F2,
        Self::Imd1,
        Self::Jgr,
        Self::M1,
        Self::M2,
        Self::R1,
    ];

    /// Map a style id to its preset.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidStyle`] for ids outside 0 through 7.
    pub fn from_style_id(style_id: StyleId) -> EngineResult<Self> {
        usize::try_from(style_id.0)
            .ok()
            .and_then(|index| Self::ALL.get(index).copied())
            .ok_or_else(|| EngineError::invalid_style(style_id))
    }

    /// Preset name passed on the command line
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Dvd => "dvd",
            Self::F1 => "f1",
            Self::F2 => "f2",
            Self::Imd1 => "imd1",
            Self::Jgr => "jgr",
            Self::M1 => "m1",
            Self::M2 => "m2",
            Self::R1 => "r1",
        }
    }
}

impl fmt::Display for VoicePreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Location overrides for the mock bridge
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MockBridgeConfig {
    /// External synthesizer executable
    pub cli_path: Option<PathBuf>,
    /// Fixed wave file the tool writes to
    pub temp_wave_path: Option<PathBuf>,
}

/// Mock core that shells out to an external synthesizer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockCoreBridge {
    cli_path: PathBuf,
    temp_wave_path: PathBuf,
}

impl Default for MockCoreBridge {
    fn default() -> Self {
        Self::from_config(&MockBridgeConfig::default())
    }
}

impl MockCoreBridge {
    /// Create a bridge with explicit paths
    #[must_use]
    pub fn new(cli_path: PathBuf, temp_wave_path: PathBuf) -> Self {
        Self {
            cli_path,
            temp_wave_path,
        }
    }

    /// Create a bridge from configuration, defaulting under the engine root
    #[must_use]
    pub fn from_config(config: &MockBridgeConfig) -> Self {
        let root = engine_root();
        Self {
            cli_path: config
                .cli_path
                .clone()
                .unwrap_or_else(|| root.join("bouyomi-cli").join("run")),
            temp_wave_path: config
                .temp_wave_path
                .clone()
                .unwrap_or_else(|| root.join("temp.wav")),
        }
    }

    /// Path of the external synthesizer
    #[must_use]
    pub fn cli_path(&self) -> &Path {
        &self.cli_path
    }

    /// Path of the shared temporary wave file
    #[must_use]
    pub fn temp_wave_path(&self) -> &Path {
        &self.temp_wave_path
    }

    /// Synthesize `text` with the preset mapped from `style_id`.
    ///
    /// Blocks until the external tool exits, then reads its output back.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidStyle`] before spawning anything if the
    /// style has no preset, and [`EngineError::ExternalProcess`] if the tool
    /// cannot be started, exits unsuccessfully, or leaves no readable wave.
    pub fn forward(&self, text: &str, style_id: StyleId) -> EngineResult<RawWave> {
        let preset = VoicePreset::from_style_id(style_id)?;

        let lock = temp_wave_lock(&self.temp_wave_path);
        let _guard = lock.lock();

        match std::fs::remove_file(&self.temp_wave_path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(EngineError::external_process(format!(
                    "Cannot clear stale output {}: {e}",
                    self.temp_wave_path.display()
                )))
            }
        }

        debug!(
            "Running {} with preset '{}' for {} characters",
            self.cli_path.display(),
            preset,
            text.chars().count()
        );

        let output = Command::new(&self.cli_path)
            .arg(&self.temp_wave_path)
            .arg(text)
            .arg(preset.as_str())
            .output()
            .map_err(|e| {
                EngineError::external_process(format!(
                    "Failed to start {}: {e}",
                    self.cli_path.display()
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!("Mock synthesizer exited with {}: {}", output.status, stderr.trim());
            return Err(EngineError::external_process(format!(
                "{} exited with {}: {}",
                self.cli_path.display(),
                output.status,
                stderr.trim()
            )));
        }

        read_wav(&self.temp_wave_path).map_err(|e| {
            EngineError::external_process(format!(
                "No readable output at {}: {e}",
                self.temp_wave_path.display()
            ))
        })
    }
}
