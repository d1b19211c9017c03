//! Change notification listener.
//!
//! Owns one dedicated `PostgreSQL` connection in listen mode. The
//! connection is never shared with the query pool: a connection that has
//! issued `LISTEN` cannot interleave ordinary queries. Every notification
//! received on the configured channel is forwarded as a
//! [`ChangeEvent`] over an in-process mpsc channel.
//!
//! Exactly one consumer exists for the lifetime of the listener: the
//! receiver half handed to the recompute worker. Handing out a new sender
//! replaces nothing and accumulates nothing; ownership of the receiver is
//! the registration.
//!
//! Connection loss triggers reconnect with exponential backoff. When the
//! reconnect budget is exhausted the run loop returns
//! [`DbError::ChannelLost`]; the caller logs this as fatal for the
//! notification subsystem, while request serving continues unaffected.

use std::time::Duration;

use atlas_types::ChangeEvent;
use sqlx::postgres::PgListener;
use tokio::sync::mpsc;

use crate::error::DbError;

/// First reconnect delay.
const INITIAL_BACKOFF_MS: u64 = 500;

/// Upper bound on the reconnect delay.
const MAX_BACKOFF_MS: u64 = 30_000;

/// Reconnect attempts before the listener gives up.
const MAX_RECONNECT_ATTEMPTS: u32 = 10;

/// Capacity of the in-process event channel.
///
/// Notifications are tiny and the consumer only flips cache flags, so a
/// small bound suffices; the sender awaiting on a full channel applies
/// backpressure to the wire.
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Listener for a single change notification channel.
#[derive(Debug, Clone)]
pub struct ChangeListener {
    url: String,
    channel: String,
}

impl ChangeListener {
    /// Create a listener for `channel` on the engine at `url`.
    pub fn new(url: impl Into<String>, channel: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            channel: channel.into(),
        }
    }

    /// The channel this listener subscribes to.
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Create the in-process event channel the listener feeds.
    pub fn event_channel() -> (mpsc::Sender<ChangeEvent>, mpsc::Receiver<ChangeEvent>) {
        mpsc::channel(EVENT_CHANNEL_CAPACITY)
    }

    /// Run the listen loop until the consumer goes away or the connection
    /// is lost beyond recovery.
    ///
    /// Returns `Ok(())` when the receiver half of `tx` has been dropped
    /// (shutdown). The dedicated connection is released when the loop
    /// returns.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::ChannelLost`] when the reconnect budget is
    /// exhausted, or the initial connection error when the first `LISTEN`
    /// cannot be issued at all.
    pub async fn run(self, tx: mpsc::Sender<ChangeEvent>) -> Result<(), DbError> {
        let mut listener = self.subscribe().await?;

        loop {
            match listener.recv().await {
                Ok(notification) => {
                    let event = ChangeEvent::now(notification.channel(), notification.payload());
                    tracing::debug!(
                        channel = event.channel,
                        payload = event.payload,
                        "change notification received"
                    );
                    if tx.send(event).await.is_err() {
                        tracing::info!(channel = self.channel, "event consumer gone, stopping");
                        return Ok(());
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        channel = self.channel,
                        error = %e,
                        "notification connection lost, reconnecting"
                    );
                    listener = self.reconnect().await?;
                }
            }
        }
    }

    /// Open the dedicated connection and issue `LISTEN`.
    async fn subscribe(&self) -> Result<PgListener, DbError> {
        let mut listener = PgListener::connect(&self.url).await?;
        listener.listen(&self.channel).await?;
        tracing::info!(channel = self.channel, "listening for change notifications");
        Ok(listener)
    }

    /// Re-establish the listen connection with exponential backoff.
    async fn reconnect(&self) -> Result<PgListener, DbError> {
        for attempt in 0..MAX_RECONNECT_ATTEMPTS {
            tokio::time::sleep(backoff_delay(attempt)).await;
            match self.subscribe().await {
                Ok(listener) => {
                    tracing::info!(channel = self.channel, attempt, "listener reconnected");
                    return Ok(listener);
                }
                Err(e) => {
                    tracing::warn!(
                        channel = self.channel,
                        attempt,
                        error = %e,
                        "listener reconnect failed"
                    );
                }
            }
        }
        Err(DbError::ChannelLost(format!(
            "gave up after {MAX_RECONNECT_ATTEMPTS} reconnect attempts on {}",
            self.channel
        )))
    }
}

/// Delay before reconnect attempt `attempt` (zero-based): doubles from
/// [`INITIAL_BACKOFF_MS`] up to [`MAX_BACKOFF_MS`].
pub fn backoff_delay(attempt: u32) -> Duration {
    let factor = 1_u64 << attempt.min(16);
    Duration::from_millis(INITIAL_BACKOFF_MS.saturating_mul(factor).min(MAX_BACKOFF_MS))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_from_base() {
        assert_eq!(backoff_delay(0), Duration::from_millis(500));
        assert_eq!(backoff_delay(1), Duration::from_millis(1_000));
        assert_eq!(backoff_delay(2), Duration::from_millis(2_000));
    }

    #[test]
    fn backoff_is_capped() {
        assert_eq!(backoff_delay(7), Duration::from_millis(30_000));
        assert_eq!(backoff_delay(60), Duration::from_millis(30_000));
    }

    #[test]
    fn listener_records_channel_name() {
        let listener = ChangeListener::new("postgresql://localhost/atlas", "car_changes");
        assert_eq!(listener.channel(), "car_changes");
    }
}
