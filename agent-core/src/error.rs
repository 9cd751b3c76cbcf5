use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Internal error taxonomy shared across the pipeline (spec §7).
///
/// Crates that own a stage of the pipeline (`persistence`, `tools`,
/// `orchestrator`) define their own `thiserror` enums for their internal
/// failure modes and convert into this shared kind only at the point a
/// decision needs to be made about propagation vs. degradation.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    #[error("invalid session")]
    InvalidSession,
    #[error("unsupported language")]
    UnsupportedLanguage,
    #[error("invalid location")]
    InvalidLocation,
    #[error("memory unavailable")]
    MemoryUnavailable,
    #[error("classification failed")]
    ClassificationFailed,
    #[error("model error")]
    ModelError,
    #[error("tool error")]
    ToolError,
    #[error("timeout")]
    Timeout,
    #[error("cancelled")]
    Cancelled,
    #[error("overloaded")]
    Overloaded,
    #[error("persistence failed")]
    PersistenceFailed,
}

impl ErrorKind {
    /// Stable lowercase-with-underscore token used in user-facing error
    /// payloads and metrics labels.
    pub fn as_code(&self) -> &'static str {
        match self {
            ErrorKind::InvalidSession => "INVALID_SESSION",
            ErrorKind::UnsupportedLanguage => "UNSUPPORTED_LANGUAGE",
            ErrorKind::InvalidLocation => "INVALID_LOCATION",
            ErrorKind::MemoryUnavailable => "MEMORY_UNAVAILABLE",
            ErrorKind::ClassificationFailed => "CLASSIFICATION_FAILED",
            ErrorKind::ModelError => "MODEL_ERROR",
            ErrorKind::ToolError => "TOOL_ERROR",
            ErrorKind::Timeout => "TIMEOUT",
            ErrorKind::Cancelled => "CANCELLED",
            ErrorKind::Overloaded => "OVERLOADED",
            ErrorKind::PersistenceFailed => "PERSISTENCE_FAILED",
        }
    }
}

pub type Result<T> = std::result::Result<T, ErrorKind>;
