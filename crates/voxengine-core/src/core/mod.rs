//! Synthesis cores: the uniform adapter, the registry and its initialization.
//!
//! A core is one inference backend identified by a version string. The
//! pipeline only ever talks to [`CoreAdapter`]; whether the adapter wraps a
//! native library or the mock bridge is invisible to it.

pub mod initializer;
pub mod manager;
pub mod mock;

use crate::audio::RawWave;
use crate::error::{EngineError, EngineResult};
use crate::query::{to_kana_text, Mora, StyleId};
use std::fmt;

pub use initializer::{
    initialize_cores, initialize_cores_with_defaults, ConfigWarning, CoreInitConfig, CoreLoader,
    DiscoveredCore, InitializedCores, LoadRequest, NullCoreLoader, ResolvedCoreSettings,
};
pub use manager::CoreManager;
pub use mock::{MockBridgeConfig, MockCoreBridge, VoicePreset};

/// Phonetic input handed to a backend
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PhoneticUnits<'a> {
    /// Concatenated kana text, for text-only backends
    Text(&'a str),
    /// Flattened moras with prosody, for prosody-aware backends
    Moras(&'a [Mora]),
}

impl PhoneticUnits<'_> {
    /// Plain-text view of the units
    #[must_use]
    pub fn to_text(&self) -> String {
        match self {
            Self::Text(text) => (*text).to_string(),
            Self::Moras(moras) => to_kana_text(moras),
        }
    }
}

/// Inference entry point of a native backend.
///
/// Implementations wrap whatever runtime actually produces audio; errors are
/// opaque to the engine and surface as [`EngineError::Synthesis`].
pub trait InferenceBackend: Send + Sync + fmt::Debug {
    /// Produce mono samples for the given units and style
    ///
    /// # Errors
    ///
    /// Any inference failure.
    fn infer(&self, units: &PhoneticUnits<'_>, style_id: StyleId) -> anyhow::Result<RawWave>;

    /// Whether the backend consumes per-mora prosody
    fn accepts_prosody(&self) -> bool {
        false
    }
}

/// A native backend loaded from a voice library
#[derive(Debug)]
pub struct NativeCore {
    backend: Box<dyn InferenceBackend>,
}

impl NativeCore {
    /// Wrap a loaded backend
    #[must_use]
    pub fn new(backend: Box<dyn InferenceBackend>) -> Self {
        Self { backend }
    }
}

/// Uniform handle over every kind of core
#[derive(Debug)]
pub enum CoreAdapter {
    /// Native inference backend
    Native(NativeCore),
    /// Mock backend driving an external synthesis tool
    Mock(MockCoreBridge),
}

impl CoreAdapter {
    /// Wrap a native backend
    #[must_use]
    pub fn native(backend: Box<dyn InferenceBackend>) -> Self {
        Self::Native(NativeCore::new(backend))
    }

    /// Synthesize raw audio from phonetic units
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Synthesis`] for native inference failures, and
    /// the mock bridge's errors unchanged.
    pub fn synthesize(
        &self,
        units: &PhoneticUnits<'_>,
        style_id: StyleId,
    ) -> EngineResult<RawWave> {
        match self {
            Self::Native(core) => core
                .backend
                .infer(units, style_id)
                .map_err(EngineError::from),
            Self::Mock(bridge) => bridge.forward(&units.to_text(), style_id),
        }
    }

    /// Whether the core wants [`PhoneticUnits::Moras`]
    #[must_use]
    pub fn accepts_prosody(&self) -> bool {
        match self {
            Self::Native(core) => core.backend.accepts_prosody(),
            Self::Mock(_) => false,
        }
    }

    /// Whether this is the mock core
    #[must_use]
    pub const fn is_mock(&self) -> bool {
        matches!(self, Self::Mock(_))
    }
}
