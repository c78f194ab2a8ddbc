//! Error types for the table layer.

use thiserror::Error;

/// Result type for table operations.
pub type TableResult<T> = Result<T, TableError>;

/// A request-level failure reported by the storage service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceError {
    /// HTTP-style status code (400, 404, 409, 412, ...).
    pub status: u16,
    /// Service error code, e.g. `EntityAlreadyExists`.
    pub code: String,
    pub message: String,
}

impl ServiceError {
    pub fn new(status: u16, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status == 404
    }

    pub fn is_conflict(&self) -> bool {
        self.status == 409
    }

    /// Returns true if an ETag condition did not match the stored entity.
    pub fn is_precondition_failed(&self) -> bool {
        self.status == 412
    }
}

impl std::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}: {}", self.status, self.code, self.message)
    }
}

/// Errors that can occur in table operations.
#[derive(Debug, Error)]
pub enum TableError {
    /// Local validation failed before any request was sent.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The service rejected the request. Passed through unmodified.
    #[error("service rejected request: {0}")]
    ServiceRejected(ServiceError),

    #[error(transparent)]
    Types(#[from] tablekit_types::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl TableError {
    /// Returns the service error if the service rejected the request.
    pub fn service_error(&self) -> Option<&ServiceError> {
        match self {
            TableError::ServiceRejected(e) => Some(e),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.service_error().is_some_and(ServiceError::is_not_found)
    }

    pub fn is_conflict(&self) -> bool {
        self.service_error().is_some_and(ServiceError::is_conflict)
    }

    pub fn is_precondition_failed(&self) -> bool {
        self.service_error()
            .is_some_and(ServiceError::is_precondition_failed)
    }
}

impl From<ServiceError> for TableError {
    fn from(e: ServiceError) -> Self {
        TableError::ServiceRejected(e)
    }
}
