//! Change notification events.
//!
//! The spatial engine emits a notification on a named channel whenever a
//! watched row changes. The listener converts each wire notification into a
//! [`ChangeEvent`] and forwards it over an in-process channel to the
//! recompute worker. Events are ephemeral: they are consumed exactly once
//! and never persisted.

use chrono::{DateTime, Utc};

/// A single change notification received from the spatial engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    /// The channel the notification arrived on (e.g. `car_changes`).
    pub channel: String,
    /// Optional payload attached by the emitting trigger. Empty when the
    /// trigger sends a bare NOTIFY.
    pub payload: String,
    /// When the listener received the notification.
    pub received_at: DateTime<Utc>,
}

impl ChangeEvent {
    /// Create an event stamped with the current time.
    pub fn now(channel: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            payload: payload.into(),
            received_at: Utc::now(),
        }
    }
}
