//! Error types for endpoint discovery operations.
//!
//! This module provides [`EdsError`], the error type for all failure modes
//! the EDS subsystem surfaces, with conversion to gRPC status codes for the
//! transport boundary.

/// Error type for endpoint discovery operations.
///
/// The hot build path recovers locally (empty assignments, skipped
/// clusters) and never produces an error; only bulk reconciliation and the
/// transport send surface one.
#[derive(Debug, thiserror::Error)]
pub enum EdsError {
    /// A registry query failed during reconciliation.
    ///
    /// Aborts the reconciliation pass; shards already applied in the pass
    /// stay applied.
    #[error("registry query failed for {service} via {registry}: {message}")]
    RegistryQueryFailed {
        /// Provider name of the failing registry.
        registry: String,
        /// Service hostname being queried.
        service: String,
        /// Description of the failure.
        message: String,
        /// Optional underlying error.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The transport rejected a push.
    #[error("send failed on connection {conn_id}")]
    SendFailed {
        /// Identifier of the connection the send failed on.
        conn_id: String,
        /// Status returned by the transport.
        #[source]
        source: tonic::Status,
    },

    /// A watched cluster name did not parse.
    ///
    /// Tolerated on the build path (treated as "no assignment"); exposed as
    /// an error only from the parsing API itself.
    #[error("invalid cluster name: {name}")]
    InvalidClusterName {
        /// The name that failed to parse.
        name: String,
    },

    /// Unexpected internal error.
    #[error("internal error: {message}")]
    Internal {
        /// Error message.
        message: String,
        /// Optional underlying error.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl EdsError {
    /// Create a registry-query error from any error type.
    pub fn registry_query<E>(
        registry: impl Into<String>,
        service: impl Into<String>,
        source: E,
    ) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::RegistryQueryFailed {
            registry: registry.into(),
            service: service.into(),
            message: source.to_string(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an internal error from any error type.
    pub fn internal<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Internal {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// Convert to `tonic::Status` for gRPC responses.
impl From<EdsError> for tonic::Status {
    fn from(err: EdsError) -> Self {
        match &err {
            EdsError::RegistryQueryFailed { .. } | EdsError::SendFailed { .. } => {
                tonic::Status::unavailable(err.to_string())
            }
            EdsError::InvalidClusterName { .. } => tonic::Status::invalid_argument(err.to_string()),
            EdsError::Internal { .. } => tonic::Status::internal(err.to_string()),
        }
    }
}
