//! Configuration for the service binary.
//!
//! All configuration is loaded from environment variables. The service
//! needs the engine connection URL, the HTTP bind address, the
//! notification channel name, and the identity of the watched entity.

use atlas_types::EntityId;

use crate::error::ServiceError;

/// Default HTTP bind host.
const DEFAULT_HOST: &str = "0.0.0.0";

/// Default HTTP port.
const DEFAULT_PORT: u16 = 3000;

/// Default change notification channel.
const DEFAULT_CHANNEL: &str = "car_changes";

/// Default watched entity row id.
const DEFAULT_WATCH_ENTITY_ID: i64 = 5834;

/// Default engine pool size.
const DEFAULT_MAX_CONNECTIONS: u32 = 10;

/// Complete service configuration loaded from the environment.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Spatial engine connection URL.
    pub database_url: String,
    /// HTTP bind host.
    pub host: String,
    /// HTTP bind port.
    pub port: u16,
    /// Change notification channel the listener subscribes to.
    pub channel: String,
    /// The tracked entity whose derived results are watched.
    pub watched_entity: EntityId,
    /// Maximum number of pooled engine connections. The listener uses its
    /// own dedicated connection on top of this.
    pub max_connections: u32,
}

impl ServiceConfig {
    /// Load configuration from environment variables.
    ///
    /// Required variables:
    /// - `DATABASE_URL` -- spatial engine connection string
    ///
    /// Optional variables:
    /// - `HOST` -- HTTP bind host (default `0.0.0.0`)
    /// - `PORT` -- HTTP bind port (default 3000)
    /// - `NOTIFY_CHANNEL` -- notification channel (default `car_changes`)
    /// - `WATCH_ENTITY_ID` -- watched entity row id (default 5834)
    /// - `DB_MAX_CONNECTIONS` -- engine pool size (default 10)
    pub fn from_env() -> Result<Self, ServiceError> {
        let database_url = env_var("DATABASE_URL")?;

        let host = std::env::var("HOST").unwrap_or_else(|_| DEFAULT_HOST.to_owned());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| DEFAULT_PORT.to_string())
            .parse()
            .map_err(|e| ServiceError::Config(format!("invalid PORT: {e}")))?;

        let channel =
            std::env::var("NOTIFY_CHANNEL").unwrap_or_else(|_| DEFAULT_CHANNEL.to_owned());

        let watched_entity: i64 = std::env::var("WATCH_ENTITY_ID")
            .unwrap_or_else(|_| DEFAULT_WATCH_ENTITY_ID.to_string())
            .parse()
            .map_err(|e| ServiceError::Config(format!("invalid WATCH_ENTITY_ID: {e}")))?;

        let max_connections: u32 = std::env::var("DB_MAX_CONNECTIONS")
            .unwrap_or_else(|_| DEFAULT_MAX_CONNECTIONS.to_string())
            .parse()
            .map_err(|e| ServiceError::Config(format!("invalid DB_MAX_CONNECTIONS: {e}")))?;

        Ok(Self {
            database_url,
            host,
            port,
            channel,
            watched_entity: EntityId(watched_entity),
            max_connections,
        })
    }
}

/// Read a required environment variable.
fn env_var(name: &str) -> Result<String, ServiceError> {
    std::env::var(name)
        .map_err(|e| ServiceError::Config(format!("missing required env var {name}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_the_documented_values() {
        assert_eq!(DEFAULT_HOST, "0.0.0.0");
        assert_eq!(DEFAULT_PORT, 3000);
        assert_eq!(DEFAULT_CHANNEL, "car_changes");
        assert_eq!(DEFAULT_WATCH_ENTITY_ID, 5834);
    }

    #[test]
    fn missing_database_url_is_a_config_error() {
        // Direct check of the helper; from_env reads the real environment.
        let result = env_var("ATLAS_TEST_UNSET_VARIABLE");
        assert!(matches!(result, Err(ServiceError::Config(_))));
    }
}
