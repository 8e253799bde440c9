use std::str::FromStr;
use std::time::Duration;

use axum::http::HeaderValue;

use crate::error::ConfigError;

/// Default heartbeat period in milliseconds.
pub const DEFAULT_HEARTBEAT_INTERVAL_MS: u64 = 30_000;

/// Default cap on inbound frame and message size (1 MiB).
pub const DEFAULT_MAX_FRAME_BYTES: usize = 1024 * 1024;

/// Default path of the notification endpoint.
pub const DEFAULT_WS_PATH: &str = "/ws";

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<HeaderValue>,
    /// Notification endpoint settings.
    pub hub: HubConfig,
}

/// Settings for the WebSocket broadcast hub.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HubConfig {
    /// Period between heartbeat sweeps.
    pub heartbeat_interval: Duration,
    /// Largest inbound frame/message accepted by the transport.
    pub max_frame_bytes: usize,
    /// Route the endpoint is mounted on.
    pub path: String,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: Duration::from_millis(DEFAULT_HEARTBEAT_INTERVAL_MS),
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
            path: DEFAULT_WS_PATH.to_string(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                 | Default                    |
    /// |-------------------------|----------------------------|
    /// | `HOST`                  | `0.0.0.0`                  |
    /// | `PORT`                  | `3000`                     |
    /// | `CORS_ORIGINS`          | `http://localhost:5173`    |
    /// | `HEARTBEAT_INTERVAL_MS` | `30000`                    |
    /// | `WS_MAX_FRAME_BYTES`    | `1048576`                  |
    /// | `WS_PATH`               | `/ws`                      |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) but reads values through
    /// `lookup`, so callers (tests) need not touch the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port = parse_or(&lookup, "PORT", "u16", 3000u16)?;

        let cors_origins = lookup("CORS_ORIGINS")
            .unwrap_or_else(|| "http://localhost:5173".into())
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|origin| {
                HeaderValue::from_str(origin).map_err(|_| ConfigError::Invalid {
                    var: "CORS_ORIGINS",
                    expected: "origin header value",
                    value: origin.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let heartbeat_ms = parse_or(
            &lookup,
            "HEARTBEAT_INTERVAL_MS",
            "u64",
            DEFAULT_HEARTBEAT_INTERVAL_MS,
        )?;
        let max_frame_bytes = parse_or(
            &lookup,
            "WS_MAX_FRAME_BYTES",
            "usize",
            DEFAULT_MAX_FRAME_BYTES,
        )?;
        let path = lookup("WS_PATH")
            .map(|p| p.trim().to_string())
            .unwrap_or_else(|| DEFAULT_WS_PATH.into());

        Ok(Self {
            host,
            port,
            cors_origins,
            hub: HubConfig {
                heartbeat_interval: Duration::from_millis(heartbeat_ms),
                max_frame_bytes,
                path,
            },
        })
    }
}

fn parse_or<F, T>(
    lookup: &F,
    var: &'static str,
    expected: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(var) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
            var,
            expected,
            value: raw,
        }),
    }
}
