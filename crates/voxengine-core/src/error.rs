//! Error types for the voxengine core layer.

use crate::query::StyleId;

/// Result type alias for voxengine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Main error type for core registry and synthesis operations
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// No core is registered under the requested version
    #[error("Core version '{version}' not found")]
    CoreNotFound {
        /// The version that was requested
        version: String,
    },

    /// The registry holds no cores at all
    #[error("No cores are registered")]
    EmptyRegistry,

    /// A version string could not be parsed
    #[error("Invalid core version: '{version}'")]
    InvalidVersion {
        /// The offending version string
        version: String,
    },

    /// A native backend failed to load
    #[error("Backend load failed: {message}")]
    BackendLoad {
        /// Error message describing the load failure
        message: String,
    },

    /// The style id is not handled by the selected backend
    #[error("Style id {style_id} is not supported by this core")]
    InvalidStyle {
        /// The rejected style id
        style_id: StyleId,
    },

    /// The external synthesis tool failed or produced no readable output
    #[error("External process failed: {message}")]
    ExternalProcess {
        /// Error message describing the process failure
        message: String,
    },

    /// Backend inference failed
    #[error("Synthesis failed: {message}")]
    Synthesis {
        /// Error message describing the failure
        message: String,
    },

    /// Waveform post-processing failed
    #[error("Audio processing error: {message}")]
    AudioProcessing {
        /// Error message describing the processing issue
        message: String,
    },

    /// Invalid input error
    #[error("Invalid input: {message}")]
    InvalidInput {
        /// Error message describing the invalid input
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Configuration {
        /// Error message describing the configuration issue
        message: String,
    },

    /// File I/O error
    #[error("File I/O error: {message}")]
    File {
        /// Error message describing the file operation failure
        message: String,
    },
}

impl EngineError {
    /// Create a new core-not-found error
    #[must_use]
    pub fn core_not_found<S: Into<String>>(version: S) -> Self {
        Self::CoreNotFound {
            version: version.into(),
        }
    }

    /// Create a new invalid version error
    #[must_use]
    pub fn invalid_version<S: Into<String>>(version: S) -> Self {
        Self::InvalidVersion {
            version: version.into(),
        }
    }

    /// Create a new backend load error
    #[must_use]
    pub fn backend_load<S: Into<String>>(message: S) -> Self {
        Self::BackendLoad {
            message: message.into(),
        }
    }

    /// Create a new invalid style error
    #[must_use]
    pub const fn invalid_style(style_id: StyleId) -> Self {
        Self::InvalidStyle { style_id }
    }

    /// Create a new external process error
    #[must_use]
    pub fn external_process<S: Into<String>>(message: S) -> Self {
        Self::ExternalProcess {
            message: message.into(),
        }
    }

    /// Create a new synthesis error
    #[must_use]
    pub fn synthesis<S: Into<String>>(message: S) -> Self {
        Self::Synthesis {
            message: message.into(),
        }
    }

    /// Create a new audio processing error
    #[must_use]
    pub fn audio_processing<S: Into<String>>(message: S) -> Self {
        Self::AudioProcessing {
            message: message.into(),
        }
    }

    /// Create a new invalid input error
    #[must_use]
    pub fn invalid_input<S: Into<String>>(message: S) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create a new configuration error
    #[must_use]
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a new file error
    #[must_use]
    pub fn file<S: Into<String>>(message: S) -> Self {
        Self::File {
            message: message.into(),
        }
    }

    /// Check if this error is due to invalid caller input
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::CoreNotFound { .. }
                | Self::InvalidVersion { .. }
                | Self::InvalidStyle { .. }
                | Self::InvalidInput { .. }
                | Self::Configuration { .. }
        )
    }

    /// Get the error category for logging
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match self {
            Self::CoreNotFound { .. } | Self::EmptyRegistry => "registry",
            Self::InvalidVersion { .. } => "version",
            Self::BackendLoad { .. } => "backend_load",
            Self::InvalidStyle { .. } => "style",
            Self::ExternalProcess { .. } => "external_process",
            Self::Synthesis { .. } => "synthesis",
            Self::AudioProcessing { .. } => "audio_processing",
            Self::InvalidInput { .. } => "input",
            Self::Configuration { .. } => "configuration",
            Self::File { .. } => "file",
        }
    }
}

impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        Self::file(err.to_string())
    }
}

impl From<hound::Error> for EngineError {
    fn from(err: hound::Error) -> Self {
        Self::audio_processing(format!("WAV codec error: {err}"))
    }
}

impl From<toml::de::Error> for EngineError {
    fn from(err: toml::de::Error) -> Self {
        Self::configuration(format!("Invalid TOML configuration: {err}"))
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        Self::invalid_input(format!("JSON serialization error: {err}"))
    }
}

impl From<anyhow::Error> for EngineError {
    fn from(err: anyhow::Error) -> Self {
        Self::synthesis(format!("{err:#}"))
    }
}
