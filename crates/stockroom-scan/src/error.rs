//! # Scan Error Types
//!
//! Error types for the scanner runtime.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Scan Error Categories                             │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────────┐  ┌─────────────────────┐ │
//! │  │  Camera (fatal) │  │  Engine             │  │  Session            │ │
//! │  │                 │  │                     │  │                     │ │
//! │  │ PermissionDenied│  │ EngineInit (→ next) │  │ AlreadyActive       │ │
//! │  │ CameraUnsupport.│  │ AllEnginesExhausted │  │ Cancelled           │ │
//! │  │                 │  │ EngineStop (logged) │  │ ChannelClosed       │ │
//! │  └─────────────────┘  └─────────────────────┘  └─────────────────────┘ │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────────┐                          │
//! │  │  Lookup         │  │  Configuration      │                          │
//! │  │                 │  │                     │                          │
//! │  │ Lookup          │  │ InvalidConfig       │                          │
//! │  │ Core            │  │ ConfigLoad / Save   │                          │
//! │  └─────────────────┘  └─────────────────────┘                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `EngineInit` never leaves the scanner on its own: the state machine folds
//! every per-engine failure into `AllEnginesExhausted`.

use std::fmt;

use thiserror::Error;

use crate::engine::EngineId;

/// Result type alias for scanner operations.
pub type ScanResult<T> = Result<T, ScanError>;

/// Why one engine could not be started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineFailure {
    pub engine: EngineId,
    pub reason: String,
}

impl fmt::Display for EngineFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.engine, self.reason)
    }
}

fn summarize(attempts: &[EngineFailure]) -> String {
    if attempts.is_empty() {
        return "no usable scanning engine".to_string();
    }
    attempts
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Scanner error type.
#[derive(Debug, Error)]
pub enum ScanError {
    // =========================================================================
    // Camera Errors
    // =========================================================================
    /// The user or platform refused camera access.
    #[error("Camera permission denied: {0}")]
    PermissionDenied(String),

    /// The runtime has no camera support at all.
    #[error("Camera access is not supported on this device")]
    CameraUnsupported,

    /// A camera stream could not be opened.
    #[error("Failed to open camera stream: {0}")]
    StreamUnavailable(String),

    // =========================================================================
    // Engine Errors
    // =========================================================================
    /// A specific engine failed to probe or start.
    #[error("Engine {engine} failed to initialize: {reason}")]
    EngineInit { engine: EngineId, reason: String },

    /// Every candidate engine failed.
    #[error("All scanning engines failed: {}", summarize(.attempts))]
    AllEnginesExhausted { attempts: Vec<EngineFailure> },

    /// An engine failed while releasing its resources.
    #[error("Engine {engine} failed to stop: {reason}")]
    EngineStop { engine: EngineId, reason: String },

    // =========================================================================
    // Session Errors
    // =========================================================================
    /// `start` was called while a session is starting or active.
    #[error("A scan session is already running")]
    AlreadyActive,

    /// `stop` was called while the session was still starting.
    #[error("Scan session was cancelled")]
    Cancelled,

    /// The detection channel closed without delivering a code.
    #[error("Channel error: {0}")]
    ChannelClosed(String),

    // =========================================================================
    // Lookup Errors
    // =========================================================================
    /// The data store could not answer a lookup.
    #[error("Lookup failed: {0}")]
    Lookup(String),

    /// Domain rule violation.
    #[error(transparent)]
    Core(#[from] stockroom_core::CoreError),

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<std::io::Error> for ScanError {
    fn from(err: std::io::Error) -> Self {
        ScanError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for ScanError {
    fn from(err: toml::de::Error) -> Self {
        ScanError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for ScanError {
    fn from(err: toml::ser::Error) -> Self {
        ScanError::ConfigSaveFailed(err.to_string())
    }
}

impl From<stockroom_core::ValidationError> for ScanError {
    fn from(err: stockroom_core::ValidationError) -> Self {
        ScanError::Core(err.into())
    }
}

// =============================================================================
// Error Categorization
// =============================================================================

impl ScanError {
    /// Returns true if the error ends a scan session and should be shown.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ScanError::PermissionDenied(_)
                | ScanError::CameraUnsupported
                | ScanError::AllEnginesExhausted { .. }
        )
    }

    /// Returns true if the camera itself is unavailable.
    pub fn is_permission_error(&self) -> bool {
        matches!(
            self,
            ScanError::PermissionDenied(_) | ScanError::CameraUnsupported
        )
    }

    /// Returns true if this error indicates a configuration problem.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            ScanError::InvalidConfig(_)
                | ScanError::ConfigLoadFailed(_)
                | ScanError::ConfigSaveFailed(_)
        )
    }
}
