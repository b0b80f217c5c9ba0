//! Error types for folio.

use thiserror::Error;

/// Common error type for folio.
///
/// The variants follow the failure taxonomy of the gallery core. Every
/// variant is returned synchronously to the immediate caller; nothing in
/// this crate retries internally.
#[derive(Error, Debug)]
pub enum FolioError {
    /// No usable identity on the request.
    #[error("unauthorized")]
    Unauthorized,

    /// Identity present but not allowed to do this.
    ///
    /// The reason is for logs only and never reaches the end user.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Folder or invite absent.
    #[error("{0} not found")]
    NotFound(String),

    /// Invite past its expiry.
    #[error("{0} has expired")]
    Expired(String),

    /// Malformed or missing caller input.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Resource already exists.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Deployment error: a required endpoint or setting is absent.
    #[error("configuration error: {0}")]
    Misconfigured(String),

    /// A collaborator call failed for reasons opaque to this core.
    #[error("upstream error: {0}")]
    Upstream(String),

    /// Database error.
    ///
    /// Database errors from sqlx are automatically converted.
    #[error("database error: {0}")]
    Database(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FolioError {
    /// HTTP status code the gateway should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            FolioError::Unauthorized => 401,
            FolioError::Forbidden(_) => 403,
            FolioError::NotFound(_) => 404,
            FolioError::Expired(_) => 410,
            FolioError::InvalidArgument(_) => 400,
            FolioError::Conflict(_) => 409,
            FolioError::Misconfigured(_)
            | FolioError::Upstream(_)
            | FolioError::Database(_)
            | FolioError::Io(_) => 500,
        }
    }

    /// Message that is safe to show to the end user.
    ///
    /// Authorization failures never say why, and internal store errors are
    /// never echoed verbatim.
    pub fn public_message(&self) -> String {
        match self {
            FolioError::Unauthorized => "Unauthorized.".to_string(),
            FolioError::Forbidden(_) => "Access not available.".to_string(),
            FolioError::Misconfigured(_) => "Server configuration is incomplete.".to_string(),
            FolioError::Upstream(_) | FolioError::Database(_) | FolioError::Io(_) => {
                "Request failed.".to_string()
            }
            FolioError::NotFound(_)
            | FolioError::Expired(_)
            | FolioError::InvalidArgument(_)
            | FolioError::Conflict(_) => self.to_string(),
        }
    }

    /// Whether this error came from a collaborator or the database.
    pub fn is_internal(&self) -> bool {
        self.status_code() >= 500
    }
}

// Conversion from sqlx errors
impl From<sqlx::Error> for FolioError {
    fn from(e: sqlx::Error) -> Self {
        FolioError::Database(e.to_string())
    }
}

/// Result type alias for folio operations.
pub type Result<T> = std::result::Result<T, FolioError>;
