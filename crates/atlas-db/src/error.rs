//! Error types for the spatial engine layer.
//!
//! [`DbError`] splits [`sqlx`] failures into two classes the HTTP layer
//! treats differently: the engine being unreachable (pool exhausted,
//! connection refused) versus the engine rejecting a statement (malformed
//! template, bad geometry). Rejections indicate a programming defect and
//! are never retried.

/// Errors that can occur in the spatial engine layer.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// The engine could not be reached: pool exhausted or closed,
    /// connection refused, or transport failure.
    #[error("spatial engine unavailable: {0}")]
    Unavailable(#[source] sqlx::Error),

    /// The engine rejected the statement. Logged with the failing query
    /// name and never retried.
    #[error("query rejected by spatial engine: {0}")]
    Query(#[source] sqlx::Error),

    /// A configuration error (bad connection URL, missing setting).
    #[error("configuration error: {0}")]
    Config(String),

    /// The dedicated notification connection was lost and could not be
    /// re-established within the reconnect budget.
    #[error("notification channel lost: {0}")]
    ChannelLost(String),
}

impl From<sqlx::Error> for DbError {
    fn from(e: sqlx::Error) -> Self {
        if matches!(
            e,
            sqlx::Error::PoolTimedOut
                | sqlx::Error::PoolClosed
                | sqlx::Error::WorkerCrashed
                | sqlx::Error::Io(_)
                | sqlx::Error::Tls(_)
        ) {
            Self::Unavailable(e)
        } else {
            Self::Query(e)
        }
    }
}
