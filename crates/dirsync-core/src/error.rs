//! dirsync error types
//!
//! One taxonomy for the whole job, with a fatal/recoverable classification:
//! transport and login failures abort the run, data-level anomalies are
//! logged and skipped by the caller.

use thiserror::Error;

/// Error that can occur during a synchronization run.
#[derive(Debug, Error)]
pub enum SyncError {
    // Transport and session errors (fatal for the run)
    /// Failed to establish a connection to the directory or target system.
    #[error("connection failed: {message}")]
    ConnectionFailed {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Bind or login was rejected by the remote system.
    #[error("authentication failed against {system}")]
    AuthenticationFailed { system: String },

    /// A client method was called before `bind`/`login`.
    #[error("not connected to {system}")]
    NotConnected { system: String },

    /// The remote API rejected a request.
    #[error("api call '{method}' failed: {message}")]
    ApiFailure { method: String, message: String },

    /// The remote API answered with a shape we cannot interpret.
    #[error("malformed response from '{method}': {message}")]
    MalformedResponse { method: String, message: String },

    // Invariant violations (fatal for the run)
    /// A configured target group is still missing after the creation pass.
    #[error("target group '{group}' missing after creation pass")]
    GroupMissing { group: String },

    /// The configured umbrella group does not exist in the target system.
    #[error("umbrella group '{group}' not found in target system")]
    UmbrellaGroupNotFound { group: String },

    // Per-item errors (logged and skipped by the engine)
    /// No media type matches the configured description.
    #[error("no media type named '{description}' found, check your configuration")]
    MediaTypeNotFound { description: String },

    /// More than one media type matches the configured description.
    #[error("ambiguous media type '{description}': {matches} candidates")]
    AmbiguousMediaType { description: String, matches: usize },

    /// An account referenced by name has no id in the target system.
    #[error("account '{username}' not found in target system")]
    AccountNotFound { username: String },

    // Validation errors
    /// A severity level name is not in the fixed set.
    #[error("invalid severity level: '{name}'")]
    InvalidSeverity { name: String },

    /// Configuration is invalid.
    #[error("invalid configuration: {message}")]
    InvalidConfiguration { message: String },
}

impl SyncError {
    /// Whether this error must abort the whole run.
    ///
    /// Everything transport- or session-shaped is fatal; data-level
    /// anomalies are handled at the call site with a log line and a skip.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SyncError::ConnectionFailed { .. }
                | SyncError::AuthenticationFailed { .. }
                | SyncError::NotConnected { .. }
                | SyncError::GroupMissing { .. }
                | SyncError::UmbrellaGroupNotFound { .. }
                | SyncError::InvalidConfiguration { .. }
        )
    }

    // Convenience constructors

    /// Create a connection failed error.
    pub fn connection_failed(message: impl Into<String>) -> Self {
        SyncError::ConnectionFailed {
            message: message.into(),
            source: None,
        }
    }

    /// Create a connection failed error with source.
    pub fn connection_failed_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        SyncError::ConnectionFailed {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an api failure error.
    pub fn api_failure(method: impl Into<String>, message: impl Into<String>) -> Self {
        SyncError::ApiFailure {
            method: method.into(),
            message: message.into(),
        }
    }

    /// Create a malformed response error.
    pub fn malformed_response(method: impl Into<String>, message: impl Into<String>) -> Self {
        SyncError::MalformedResponse {
            method: method.into(),
            message: message.into(),
        }
    }

    /// Create an invalid configuration error.
    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        SyncError::InvalidConfiguration {
            message: message.into(),
        }
    }
}

/// Result type for synchronization operations.
pub type SyncResult<T> = Result<T, SyncError>;
