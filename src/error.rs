//! Error types for the simulation core

/// Result type alias for this crate
pub type Result<T> = std::result::Result<T, SimError>;

/// Errors produced by the simulation core
///
/// The two variants map directly onto the two failure classes an HTTP host
/// distinguishes at the boundary: [`SimError::Validation`] corresponds to a
/// 400 response, [`SimError::Computation`] to a 500.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Computation(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
}

impl SimError {
    pub fn validation(msg: impl Into<String>) -> Self {
        SimError::Validation(msg.into())
    }

    pub fn computation(msg: impl Into<String>) -> Self {
        SimError::Computation(msg.into())
    }

    /// True if this is a validation failure (caller error, not a bug)
    pub fn is_validation(&self) -> bool {
        matches!(self, SimError::Validation(_))
    }
}
