//! # Voxengine Core
//!
//! Versioned synthesis core registry and waveform pipeline for a Japanese
//! text-to-speech engine.
//!
//! ## Features
//!
//! - Registry of synthesis cores keyed by version, with latest-version lookup
//! - Core initialization from configuration with a mock fallback
//! - Mock core driving an external command-line synthesizer
//! - Query-to-waveform pipeline with prosody, resampling and silence padding
//!
//! ## Example
//!
//! ```rust,no_run
//! use voxengine_core::{initialize_cores_with_defaults, AudioQuery, CoreInitConfig, StyleId};
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = CoreInitConfig::from_toml_str("cpu_num_threads = 2")?;
//!     let cores = initialize_cores_with_defaults(&config);
//!
//!     let query = AudioQuery::from_json(&std::fs::read_to_string("query.json")?)?;
//!     let engine = cores.manager.tts_engine(None)?;
//!     let wave = engine.synthesize_wave(&query, StyleId(0), true)?;
//!     voxengine_core::audio::wav::write_wav(&wave, "out.wav".as_ref())?;
//!
//!     Ok(())
//! }
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod audio;
pub mod core;
pub mod error;
pub mod paths;
pub mod pipeline;
pub mod query;
pub mod version;

// Re-export main types for convenience
pub use crate::core::{
    initialize_cores, initialize_cores_with_defaults, ConfigWarning, CoreAdapter, CoreInitConfig,
    CoreLoader, CoreManager, InferenceBackend, InitializedCores, MockBridgeConfig, MockCoreBridge,
    NullCoreLoader, PhoneticUnits, VoicePreset,
};
pub use audio::{RawWave, Waveform};
pub use error::{EngineError, EngineResult};
pub use pipeline::TtsEngine;
pub use query::{AccentPhrase, AudioQuery, Mora, StyleId};
pub use version::{CoreVersion, MOCK_CORE_VERSION};

/// Version information for the voxengine-core crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default output sample rate (24 kHz)
pub const DEFAULT_SAMPLE_RATE: u32 = 24_000;
