//! Domain-specific error types for platewise

use thiserror::Error;

/// Main error type for the planning pipeline
#[derive(Error, Debug)]
pub enum PlanError {
    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Conflict: {message}")]
    Conflict { message: String },

    #[error("Upstream unavailable: {service}: {message}")]
    Upstream { service: String, message: String },

    #[error("Format error: {message}")]
    Format { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Serialization error: {message}")]
    Serialization { message: String },

    #[error("Timeout error: {operation} timed out after {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl PlanError {
    /// Only validation and conflict errors surface to the caller as request
    /// failures; everything else resolves through a deterministic fallback.
    pub fn is_request_failure(&self) -> bool {
        matches!(
            self,
            PlanError::Validation { .. } | PlanError::Conflict { .. }
        )
    }

    /// Stable machine-readable kind for transport layers to map onto a status.
    pub fn kind(&self) -> &'static str {
        match self {
            PlanError::Validation { .. } => "validation",
            PlanError::Conflict { .. } => "conflict",
            PlanError::Upstream { .. } => "upstream_unavailable",
            PlanError::Format { .. } => "format",
            PlanError::Config { .. } => "config",
            PlanError::Serialization { .. } => "serialization",
            PlanError::Timeout { .. } => "timeout",
            PlanError::Internal { .. } => "internal",
        }
    }
}

impl From<anyhow::Error> for PlanError {
    fn from(err: anyhow::Error) -> Self {
        PlanError::Internal {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for PlanError {
    fn from(err: serde_json::Error) -> Self {
        PlanError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<reqwest::Error> for PlanError {
    fn from(err: reqwest::Error) -> Self {
        PlanError::Upstream {
            service: err
                .url()
                .and_then(|u| u.host_str().map(|h| h.to_string()))
                .unwrap_or_else(|| "http".to_string()),
            message: format!("HTTP request failed: {}", err),
        }
    }
}

/// Result type alias for platewise operations
pub type Result<T> = std::result::Result<T, PlanError>;
