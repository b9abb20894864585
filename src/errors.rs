//! Error types for neo4j-conn.

/// Alias for Results returning [`ConnError`].
pub type Result<T> = std::result::Result<T, ConnError>;

/// Failure reported by the driver collaborator.
///
/// The split between [`DriverError::Authentication`] and
/// [`DriverError::ServiceUnavailable`] is what the connection retry loop and the
/// smoke runner key on; everything else lands in [`DriverError::Other`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DriverError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Driver error: {0}")]
    Other(String),
}

impl DriverError {
    /// Whether the connection loop may try again after this failure.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DriverError::Authentication(_) | DriverError::ServiceUnavailable(_)
        )
    }
}

/// Top-level error type for neo4j-conn.
#[derive(Debug, thiserror::Error)]
pub enum ConnError {
    #[error("Connection error after {attempts} attempt(s): {source}")]
    Connection {
        attempts: u32,
        #[source]
        source: DriverError,
    },

    #[error(transparent)]
    Driver(#[from] DriverError),

    #[error("Query error: {0}")]
    Query(#[source] DriverError),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Connection is closed")]
    Closed,
}

impl ConnError {
    /// The collaborator failure behind this error, if there is one.
    pub fn driver_cause(&self) -> Option<&DriverError> {
        match self {
            ConnError::Connection { source, .. } => Some(source),
            ConnError::Driver(e) | ConnError::Query(e) => Some(e),
            _ => None,
        }
    }
}
