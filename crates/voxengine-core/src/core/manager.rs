//! Registry of loaded cores keyed by version.

use super::CoreAdapter;
use crate::error::{EngineError, EngineResult};
use crate::pipeline::TtsEngine;
use crate::version::latest_version;
use indexmap::IndexMap;
use tracing::{debug, info};

/// Collection of cores, one per version.
///
/// Registration needs `&mut self`; once populated the manager is only read,
/// and shared references can be used from any thread.
#[derive(Debug, Default)]
pub struct CoreManager {
    cores: IndexMap<String, CoreAdapter>,
}

impl CoreManager {
    /// Create an empty manager
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registered versions in registration order
    #[must_use]
    pub fn versions(&self) -> Vec<String> {
        self.cores.keys().cloned().collect()
    }

    /// Greatest registered version
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::EmptyRegistry`] if nothing is registered.
    pub fn latest_version(&self) -> EngineResult<String> {
        latest_version(self.cores.keys().map(String::as_str))
            .map(str::to_string)
            .ok_or(EngineError::EmptyRegistry)
    }

    /// Register a core, replacing any core already under `version`.
    ///
    /// A replaced version keeps its original position in [`Self::versions`].
    pub fn register_core(&mut self, core: CoreAdapter, version: impl Into<String>) {
        let version = version.into();
        if self.cores.insert(version.clone(), core).is_some() {
            info!("Replaced core {}", version);
        } else {
            debug!("Registered core {}", version);
        }
    }

    /// Core registered under `version`
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::CoreNotFound`] naming `version` if absent.
    pub fn get_core(&self, version: &str) -> EngineResult<&CoreAdapter> {
        self.cores
            .get(version)
            .ok_or_else(|| EngineError::core_not_found(version))
    }

    /// Whether a core is registered under `version`
    #[must_use]
    pub fn has_core(&self, version: &str) -> bool {
        self.cores.contains_key(version)
    }

    /// Version/core pairs in registration order
    #[must_use]
    pub fn items(&self) -> Vec<(&str, &CoreAdapter)> {
        self.cores.iter().map(|(v, c)| (v.as_str(), c)).collect()
    }

    /// Number of registered cores
    #[must_use]
    pub fn len(&self) -> usize {
        self.cores.len()
    }

    /// Whether no cores are registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cores.is_empty()
    }

    /// Synthesis engine over `version`, or over the latest core when `None`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::CoreNotFound`] for an unknown version and
    /// [`EngineError::EmptyRegistry`] when `None` is given and nothing is
    /// registered.
    pub fn tts_engine(&self, version: Option<&str>) -> EngineResult<TtsEngine<'_>> {
        let core = match version {
            Some(version) => self.get_core(version)?,
            None => {
                let latest = self.latest_version()?;
                self.get_core(&latest)?
            }
        };
        Ok(TtsEngine::new(core))
    }
}
