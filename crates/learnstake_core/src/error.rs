//! crates/learnstake_core/src/error.rs
//!
//! Errors raised by the core services on top of the port errors they propagate.

use crate::ports::PortError;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Malformed or incomplete input. Raised before anything is written.
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// The text generator answered with something that is not the expected JSON envelope.
    #[error("Generator returned an unreadable response: {0}")]
    UpstreamFormat(String),

    #[error(transparent)]
    Port(#[from] PortError),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}
