//! Error types for service startup.

/// Errors that can occur while assembling the service.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// A configuration value was missing or malformed.
    #[error("configuration error: {0}")]
    Config(String),
}
