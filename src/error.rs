use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum BridgeError {
    /// Malformed or missing input. Always reported back to the caller.
    #[error("{0}")]
    Validation(String),

    /// The secret handle does not resolve to a registration.
    #[error("Device not registered")]
    NotFound,

    /// Host-level credentials were missing or wrong.
    #[error("Unauthorized")]
    Unauthorized,

    /// Snapshot could not be written or read. In-memory state is kept.
    #[error("Persistence failed: {0}")]
    Persistence(String),

    /// The HTTP endpoint could not be exposed after all retries.
    #[error("Failed to expose endpoint: {0}")]
    StartupCapability(String),

    #[error(transparent)]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    SerdeJsonError(#[from] serde_json::Error),
}

impl BridgeError {
    /// Shorthand for a validation failure with a formatted message.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Shorthand for the `Missing required field: <name>` validation failure.
    pub fn missing_field(field: &str) -> Self {
        Self::Validation(format!("Missing required field: {}", field))
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
