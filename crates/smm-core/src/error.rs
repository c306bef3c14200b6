//! Error types for the installation registry.
//!
//! Every fallible operation in the crate returns [`SmmError`]. Errors are
//! grouped into the coarse [`ErrorKind`] categories that callers use to decide
//! whether the failure changed any state.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the registry.
#[derive(Debug, Error)]
pub enum SmmError {
    // Lookup errors
    #[error("Installation path does not exist: {0}")]
    PathNotFound(PathBuf),

    #[error("Installation not found: {path}")]
    InstallationNotFound { path: String },

    #[error("Profile not found: {name}")]
    ProfileNotFound { name: String },

    // Precondition errors
    #[error("Installation is not valid: {path}")]
    InvalidInstallation { path: String },

    #[error("No installation selected")]
    NoInstallationSelected,

    #[error("Installation already registered: {path}")]
    InstallationExists { path: String },

    #[error("Validation error for {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Invalid params: {message}")]
    InvalidParams { message: String },

    // File system errors
    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    // Serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    #[error("Persistence error: {message}")]
    Persistence { message: String },

    // External collaborators
    #[error("Process enumeration failed: {message}")]
    ProcessEnumeration { message: String },

    #[error("Failed to launch game: {message}")]
    LaunchFailed { message: String },

    #[error("Remote discovery failed for {path}: {message}")]
    RemoteDiscovery { path: String, message: String },

    #[error("Resolver error: {message}")]
    Resolver { message: String },

    // Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    // Generic errors
    #[error("{0}")]
    Other(String),
}

/// Result type alias for registry operations.
pub type Result<T> = std::result::Result<T, SmmError>;

/// Coarse error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A referenced path, profile or installation is absent.
    NotFound,
    /// Operation preconditions were not met.
    InvalidState,
    /// Disk, persistence or external process failure.
    Io,
    /// The mod resolver failed; passed through unchanged.
    Resolver,
    /// Anything else.
    Internal,
}

impl From<std::io::Error> for SmmError {
    fn from(err: std::io::Error) -> Self {
        SmmError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for SmmError {
    fn from(err: serde_json::Error) -> Self {
        SmmError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl SmmError {
    /// Create an IO error with path context.
    pub fn io_with_path(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        SmmError::Io {
            message: err.to_string(),
            path: Some(path.into()),
            source: Some(err),
        }
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SmmError::PathNotFound(_)
            | SmmError::InstallationNotFound { .. }
            | SmmError::ProfileNotFound { .. } => ErrorKind::NotFound,

            SmmError::InvalidInstallation { .. }
            | SmmError::NoInstallationSelected
            | SmmError::InstallationExists { .. }
            | SmmError::Validation { .. }
            | SmmError::InvalidParams { .. } => ErrorKind::InvalidState,

            SmmError::Io { .. }
            | SmmError::Json { .. }
            | SmmError::Persistence { .. }
            | SmmError::ProcessEnumeration { .. }
            | SmmError::LaunchFailed { .. }
            | SmmError::RemoteDiscovery { .. } => ErrorKind::Io,

            SmmError::Resolver { .. } => ErrorKind::Resolver,

            SmmError::Config { .. } | SmmError::Other(_) => ErrorKind::Internal,
        }
    }

    /// Convert to a JSON-RPC error code.
    ///
    /// Standard JSON-RPC error codes:
    /// - -32602: Invalid params
    /// - -32603: Internal error
    ///
    /// Custom error codes (application-defined, -32000 to -32099):
    /// - -32001: Not found
    /// - -32002: Invalid state
    /// - -32003: IO / persistence failure
    /// - -32004: Resolver failure
    pub fn to_rpc_error_code(&self) -> i32 {
        if let SmmError::InvalidParams { .. } = self {
            return -32602;
        }
        match self.kind() {
            ErrorKind::NotFound => -32001,
            ErrorKind::InvalidState => -32002,
            ErrorKind::Io => -32003,
            ErrorKind::Resolver => -32004,
            ErrorKind::Internal => -32603,
        }
    }
}
