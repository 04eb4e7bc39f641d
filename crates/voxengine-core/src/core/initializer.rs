//! Turns a runtime configuration into a populated [`CoreManager`].
//!
//! Discovery of native voice libraries is delegated to a [`CoreLoader`];
//! this module only resolves settings, registers what the loader returns,
//! and guarantees the mock core as a fallback.

use super::mock::{MockBridgeConfig, MockCoreBridge};
use super::{CoreAdapter, CoreManager, InferenceBackend};
use crate::error::{EngineError, EngineResult};
use crate::paths::{engine_root, expand_user};
use crate::version::MOCK_CORE_VERSION;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Core initialization options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreInitConfig {
    /// Let backends run inference on the GPU
    pub use_gpu: bool,
    /// Directories holding voice libraries, in search order
    pub voicelib_dirs: Vec<PathBuf>,
    /// Combined install directory, searched for both libraries and runtimes
    pub voicevox_dir: Option<PathBuf>,
    /// Directories holding shared runtime libraries
    pub runtime_dirs: Vec<PathBuf>,
    /// Inference thread count; unset or 0 means half the logical cores
    pub cpu_num_threads: Option<u32>,
    /// Register the mock core when no core claims its version
    #[serde(alias = "enable_mock")]
    pub enable_mock_fallback: bool,
    /// Load every model up front instead of on first use
    pub load_all_models: bool,
    /// Mock bridge locations
    pub mock: MockBridgeConfig,
}

impl Default for CoreInitConfig {
    fn default() -> Self {
        Self {
            use_gpu: false,
            voicelib_dirs: Vec::new(),
            voicevox_dir: None,
            runtime_dirs: Vec::new(),
            cpu_num_threads: None,
            enable_mock_fallback: true,
            load_all_models: false,
            mock: MockBridgeConfig::default(),
        }
    }
}

impl CoreInitConfig {
    /// Parse a configuration from TOML
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Configuration`] for malformed TOML or unknown
    /// value types.
    pub fn from_toml_str(source: &str) -> EngineResult<Self> {
        Ok(toml::from_str(source)?)
    }

    /// Read a TOML configuration file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> EngineResult<Self> {
        let source = std::fs::read_to_string(path).map_err(|e| {
            EngineError::configuration(format!("Cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&source)
    }
}

/// Non-fatal condition raised while resolving the configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigWarning {
    /// Thread count was unset or zero and has been replaced
    CpuThreadsDefaulted {
        /// Thread count used instead
        resolved: u32,
    },
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CpuThreadsDefaulted { resolved } => write!(
                f,
                "cpu_num_threads is set to 0. Setting it to half of the logical cores ({resolved})."
            ),
        }
    }
}

/// Settings after defaults and path expansion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCoreSettings {
    /// Let backends run inference on the GPU
    pub use_gpu: bool,
    /// Library search directories
    pub voicelib_dirs: Vec<PathBuf>,
    /// Runtime search directories
    pub runtime_dirs: Vec<PathBuf>,
    /// Inference thread count handed to backends
    pub cpu_num_threads: u32,
    /// Eager model loading
    pub load_all_models: bool,
}

/// What a [`CoreLoader`] is asked to load
#[derive(Debug, Clone, Copy)]
pub struct LoadRequest<'a> {
    /// Library search directories
    pub voicelib_dirs: &'a [PathBuf],
    /// Runtime search directories
    pub runtime_dirs: &'a [PathBuf],
    /// Let backends run inference on the GPU
    pub use_gpu: bool,
    /// Process-wide inference thread count
    pub cpu_num_threads: u32,
    /// Eager model loading
    pub load_all_models: bool,
}

/// A backend found by a loader
#[derive(Debug)]
pub struct DiscoveredCore {
    /// Version the backend reports
    pub version: String,
    /// The loaded backend
    pub backend: Box<dyn InferenceBackend>,
}

/// Finds and loads native backends.
///
/// Each entry of the result is one library: loaded, or the reason it failed.
pub trait CoreLoader {
    /// Load every backend reachable from the request's directories
    fn discover(&self, request: &LoadRequest<'_>) -> Vec<EngineResult<DiscoveredCore>>;
}

/// Loader that finds nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NullCoreLoader;

impl CoreLoader for NullCoreLoader {
    fn discover(&self, _request: &LoadRequest<'_>) -> Vec<EngineResult<DiscoveredCore>> {
        Vec::new()
    }
}

/// Output of [`initialize_cores`]
#[derive(Debug)]
pub struct InitializedCores {
    /// Populated registry
    pub manager: CoreManager,
    /// Settings the loader ran with
    pub settings: ResolvedCoreSettings,
    /// Non-fatal configuration warnings
    pub warnings: Vec<ConfigWarning>,
    /// Backends that failed to load, as [`EngineError::BackendLoad`]
    pub load_failures: Vec<EngineError>,
}

/// Resolve the inference thread count.
///
/// `None` and `Some(0)` become `logical_cores / 2` (0 when the core count is
/// unknown) and produce a warning; any other value passes through.
#[must_use]
pub fn resolve_cpu_num_threads(
    requested: Option<u32>,
    logical_cores: Option<usize>,
) -> (u32, Option<ConfigWarning>) {
    match requested {
        Some(threads) if threads > 0 => (threads, None),
        _ => {
            let half = logical_cores.map_or(0, |cores| cores / 2);
            let resolved = u32::try_from(half).unwrap_or(u32::MAX);
            (resolved, Some(ConfigWarning::CpuThreadsDefaulted { resolved }))
        }
    }
}

/// Resolve one search list.
///
/// The explicit list, then the combined install directory; `root` alone if
/// both are absent. Every entry is home-expanded. Inputs are never modified.
#[must_use]
pub fn resolve_search_dirs(
    explicit: &[PathBuf],
    combined: Option<&Path>,
    root: &Path,
) -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = explicit
        .iter()
        .cloned()
        .chain(combined.map(Path::to_path_buf))
        .collect();
    if dirs.is_empty() {
        dirs.push(root.to_path_buf());
    }
    dirs.iter().map(|dir| expand_user(dir)).collect()
}

/// Build the core registry described by `config`.
///
/// Backend load failures never abort initialization: every core that loads
/// is registered and the failures are reported in
/// [`InitializedCores::load_failures`]. Without mock fallback the registry
/// may come back empty.
#[must_use]
pub fn initialize_cores(config: &CoreInitConfig, loader: &dyn CoreLoader) -> InitializedCores {
    info!("Initializing cores (use_gpu: {})", config.use_gpu);

    let mut warnings = Vec::new();
    let (cpu_num_threads, warning) =
        resolve_cpu_num_threads(config.cpu_num_threads, Some(num_cpus::get()));
    if let Some(warning) = warning {
        warn!("{}", warning);
        warnings.push(warning);
    }

    let root = engine_root();
    let combined = config.voicevox_dir.as_deref();
    let settings = ResolvedCoreSettings {
        use_gpu: config.use_gpu,
        voicelib_dirs: resolve_search_dirs(&config.voicelib_dirs, combined, root),
        runtime_dirs: resolve_search_dirs(&config.runtime_dirs, combined, root),
        cpu_num_threads,
        load_all_models: config.load_all_models,
    };
    debug!("Voice library dirs: {:?}", settings.voicelib_dirs);
    debug!("Runtime dirs: {:?}", settings.runtime_dirs);

    let request = LoadRequest {
        voicelib_dirs: &settings.voicelib_dirs,
        runtime_dirs: &settings.runtime_dirs,
        use_gpu: settings.use_gpu,
        cpu_num_threads: settings.cpu_num_threads,
        load_all_models: settings.load_all_models,
    };

    let mut manager = CoreManager::new();
    let mut load_failures = Vec::new();
    for result in loader.discover(&request) {
        match result {
            Ok(DiscoveredCore { version, backend }) => {
                info!("Loaded core {}", version);
                manager.register_core(CoreAdapter::native(backend), version);
            }
            Err(err) => {
                warn!("Core load failed, continuing: {}", err);
                load_failures.push(match err {
                    EngineError::BackendLoad { .. } => err,
                    other => EngineError::backend_load(other.to_string()),
                });
            }
        }
    }

    if config.enable_mock_fallback && !manager.has_core(MOCK_CORE_VERSION) {
        let bridge = MockCoreBridge::from_config(&config.mock);
        info!(
            "Registering mock core {} ({})",
            MOCK_CORE_VERSION,
            bridge.cli_path().display()
        );
        manager.register_core(CoreAdapter::Mock(bridge), MOCK_CORE_VERSION);
    }

    if manager.is_empty() {
        warn!("No cores available after initialization");
    }

    InitializedCores {
        manager,
        settings,
        warnings,
        load_failures,
    }
}

/// [`initialize_cores`] with a loader that discovers nothing
#[must_use]
pub fn initialize_cores_with_defaults(config: &CoreInitConfig) -> InitializedCores {
    initialize_cores(config, &NullCoreLoader)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::RawWave;
    use crate::core::PhoneticUnits;
    use crate::query::StyleId;
    use parking_lot::Mutex;
    use rstest::rstest;

    #[derive(Debug)]
    struct StubBackend;

    impl InferenceBackend for StubBackend {
        fn infer(&self, _units: &PhoneticUnits<'_>, _style_id: StyleId) -> anyhow::Result<RawWave> {
            Ok(RawWave::new(vec![0.0; 8], 24_000))
        }
    }

    /// Loader returning canned outcomes and recording what it was asked
    #[derive(Default)]
    struct ScriptedLoader {
        versions: Vec<&'static str>,
        failures: usize,
        seen: Mutex<Vec<(Vec<PathBuf>, Vec<PathBuf>, u32)>>,
    }

    impl CoreLoader for ScriptedLoader {
        fn discover(&self, request: &LoadRequest<'_>) -> Vec<EngineResult<DiscoveredCore>> {
            self.seen.lock().push((
                request.voicelib_dirs.to_vec(),
                request.runtime_dirs.to_vec(),
                request.cpu_num_threads,
            ));
            let loaded = self.versions.iter().map(|version| {
                Ok(DiscoveredCore {
                    version: (*version).to_string(),
                    backend: Box::new(StubBackend),
                })
            });
            let failed = (0..self.failures).map(|i| {
                Err(EngineError::backend_load(format!(
                    "libcore{i}.so: undefined symbol"
                )))
            });
            loaded.chain(failed).collect()
        }
    }

    #[rstest]
    #[case(None, Some(8), 4, true)]
    #[case(Some(0), Some(8), 4, true)]
    #[case(Some(0), Some(7), 3, true)]
    #[case(None, None, 0, true)]
    #[case(Some(4), Some(16), 4, false)]
    #[case(Some(1), None, 1, false)]
    fn test_resolve_cpu_num_threads(
        #[case] requested: Option<u32>,
        #[case] logical: Option<usize>,
        #[case] expected: u32,
        #[case] warns: bool,
    ) {
        let (threads, warning) = resolve_cpu_num_threads(requested, logical);
        assert_eq!(threads, expected);
        assert_eq!(warning.is_some(), warns);
        if let Some(ConfigWarning::CpuThreadsDefaulted { resolved }) = warning {
            assert_eq!(resolved, expected);
        }
    }

    #[test]
    fn test_search_dirs_fall_back_to_root() {
        let dirs = resolve_search_dirs(&[], None, Path::new("/opt/engine"));
        assert_eq!(dirs, vec![PathBuf::from("/opt/engine")]);
    }

    #[test]
    fn test_search_dirs_append_combined_dir() {
        let explicit = vec![PathBuf::from("/a"), PathBuf::from("/b")];
        let dirs = resolve_search_dirs(&explicit, Some(Path::new("/vv")), Path::new("/root"));
        assert_eq!(
            dirs,
            vec![PathBuf::from("/a"), PathBuf::from("/b"), PathBuf::from("/vv")]
        );
        assert_eq!(explicit.len(), 2);

        let only_combined = resolve_search_dirs(&[], Some(Path::new("/vv")), Path::new("/root"));
        assert_eq!(only_combined, vec![PathBuf::from("/vv")]);
    }

    #[test]
    fn test_search_dirs_expand_home() {
        let dirs = resolve_search_dirs(&[PathBuf::from("~/voicelib")], None, Path::new("/root"));
        assert_eq!(dirs, vec![expand_user(Path::new("~/voicelib"))]);
    }

    #[test]
    fn test_repeated_resolution_does_not_accumulate() {
        let config = CoreInitConfig {
            voicevox_dir: Some(PathBuf::from("/vv")),
            ..CoreInitConfig::default()
        };
        let resolve = || {
            resolve_search_dirs(
                &config.voicelib_dirs,
                config.voicevox_dir.as_deref(),
                Path::new("/r"),
            )
        };
        let first = resolve();
        let second = resolve();
        assert_eq!(first, second);
        assert_eq!(first.len(), 1);
        assert!(config.voicelib_dirs.is_empty());
    }

    #[test]
    fn test_mock_fallback_with_nothing_discovered() {
        let config = CoreInitConfig {
            cpu_num_threads: Some(2),
            ..CoreInitConfig::default()
        };
        let cores = initialize_cores_with_defaults(&config);
        assert!(!cores.manager.is_empty());
        assert!(cores.manager.has_core(MOCK_CORE_VERSION));
        assert!(cores.manager.get_core(MOCK_CORE_VERSION).unwrap().is_mock());
        assert!(cores.warnings.is_empty());
        assert_eq!(cores.settings.cpu_num_threads, 2);
        assert_eq!(cores.settings.voicelib_dirs, vec![engine_root().to_path_buf()]);
    }

    #[test]
    fn test_unset_threads_warn_exactly_once() {
        let cores = initialize_cores_with_defaults(&CoreInitConfig::default());
        assert_eq!(cores.warnings.len(), 1);
        let expected = u32::try_from(num_cpus::get() / 2).unwrap();
        assert_eq!(cores.settings.cpu_num_threads, expected);
        assert_eq!(
            cores.warnings[0],
            ConfigWarning::CpuThreadsDefaulted { resolved: expected }
        );
    }

    #[test]
    fn test_loader_sees_resolved_settings() {
        let loader = ScriptedLoader {
            versions: vec!["0.15.0"],
            ..ScriptedLoader::default()
        };
        let config = CoreInitConfig {
            voicelib_dirs: vec![PathBuf::from("/libs")],
            runtime_dirs: vec![PathBuf::from("/runtime")],
            voicevox_dir: Some(PathBuf::from("/vv")),
            cpu_num_threads: Some(6),
            ..CoreInitConfig::default()
        };
        let cores = initialize_cores(&config, &loader);

        let seen = loader.seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, vec![PathBuf::from("/libs"), PathBuf::from("/vv")]);
        assert_eq!(seen[0].1, vec![PathBuf::from("/runtime"), PathBuf::from("/vv")]);
        assert_eq!(seen[0].2, 6);

        assert_eq!(
            cores.manager.versions(),
            vec!["0.15.0".to_string(), MOCK_CORE_VERSION.to_string()]
        );
        assert_eq!(cores.manager.latest_version().unwrap(), "0.15.0");
    }

    #[test]
    fn test_load_failures_absorbed_with_fallback() {
        let loader = ScriptedLoader {
            versions: vec!["0.14.0"],
            failures: 2,
            ..ScriptedLoader::default()
        };
        let cores = initialize_cores(&CoreInitConfig::default(), &loader);
        assert_eq!(cores.load_failures.len(), 2);
        assert!(cores.manager.has_core("0.14.0"));
        assert!(cores.manager.has_core(MOCK_CORE_VERSION));
    }

    #[test]
    fn test_loaded_core_claiming_mock_version_is_kept() {
        let loader = ScriptedLoader {
            versions: vec![MOCK_CORE_VERSION],
            ..ScriptedLoader::default()
        };
        let cores = initialize_cores(&CoreInitConfig::default(), &loader);
        assert_eq!(cores.manager.len(), 1);
        assert!(!cores.manager.get_core(MOCK_CORE_VERSION).unwrap().is_mock());
    }

    /// Loader whose failure sits between two good libraries
    struct InterleavedLoader;

    impl CoreLoader for InterleavedLoader {
        fn discover(&self, _request: &LoadRequest<'_>) -> Vec<EngineResult<DiscoveredCore>> {
            let core = |version: &str| {
                Ok(DiscoveredCore {
                    version: version.to_string(),
                    backend: Box::new(StubBackend) as Box<dyn InferenceBackend>,
                })
            };
            vec![
                core("0.15.0"),
                Err(EngineError::backend_load("libcore_cuda.so: missing runtime")),
                Err(EngineError::file("libcore_old.so: permission denied")),
                core("0.14.0"),
            ]
        }
    }

    #[test]
    fn test_without_fallback_failures_keep_loaded_cores() {
        let config = CoreInitConfig {
            enable_mock_fallback: false,
            ..CoreInitConfig::default()
        };
        let cores = initialize_cores(&config, &InterleavedLoader);

        assert_eq!(
            cores.manager.versions(),
            vec!["0.15.0".to_string(), "0.14.0".to_string()]
        );
        assert!(!cores.manager.has_core(MOCK_CORE_VERSION));
        assert_eq!(cores.load_failures.len(), 2);
        assert!(cores
            .load_failures
            .iter()
            .all(|err| matches!(err, EngineError::BackendLoad { .. })));
        assert!(cores.load_failures[1].to_string().contains("libcore_old.so"));
    }

    #[test]
    fn test_without_fallback_only_failures_leave_registry_empty() {
        let loader = ScriptedLoader {
            failures: 2,
            ..ScriptedLoader::default()
        };
        let config = CoreInitConfig {
            enable_mock_fallback: false,
            ..CoreInitConfig::default()
        };
        let cores = initialize_cores(&config, &loader);
        assert!(cores.manager.is_empty());
        assert_eq!(cores.load_failures.len(), 2);
    }

    #[test]
    fn test_without_fallback_empty_registry() {
        let config = CoreInitConfig {
            enable_mock_fallback: false,
            ..CoreInitConfig::default()
        };
        let cores = initialize_cores_with_defaults(&config);
        assert!(cores.manager.is_empty());
    }

    #[test]
    fn test_config_from_toml() {
        let config = CoreInitConfig::from_toml_str(
            r#"
            use_gpu = true
            voicelib_dirs = ["~/voicelib", "/opt/voicelib"]
            voicevox_dir = "/opt/voicevox"
            cpu_num_threads = 4
            enable_mock = false
            load_all_models = true

            [mock]
            cli_path = "/opt/bouyomi/run"
            "#,
        )
        .unwrap();

        assert!(config.use_gpu);
        assert_eq!(config.voicelib_dirs.len(), 2);
        assert_eq!(config.voicevox_dir, Some(PathBuf::from("/opt/voicevox")));
        assert!(config.runtime_dirs.is_empty());
        assert_eq!(config.cpu_num_threads, Some(4));
        assert!(!config.enable_mock_fallback);
        assert!(config.load_all_models);
        assert_eq!(config.mock.cli_path, Some(PathBuf::from("/opt/bouyomi/run")));
        assert_eq!(config.mock.temp_wave_path, None);
    }

    #[test]
    fn test_config_defaults_from_empty_toml() {
        let config = CoreInitConfig::from_toml_str("").unwrap();
        assert_eq!(config, CoreInitConfig::default());
        assert!(config.enable_mock_fallback);
    }

    #[test]
    fn test_config_rejects_bad_types() {
        let err = CoreInitConfig::from_toml_str("cpu_num_threads = \"many\"").unwrap_err();
        assert!(matches!(err, EngineError::Configuration { .. }));
    }

    #[test]
    fn test_config_from_missing_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = CoreInitConfig::from_file(&dir.path().join("engine.toml")).unwrap_err();
        assert!(matches!(err, EngineError::Configuration { .. }));
    }
}
