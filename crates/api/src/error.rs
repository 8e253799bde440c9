/// Errors raised while loading configuration from the environment.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An environment variable was set but could not be parsed.
    #[error("{var} must be a valid {expected}, got '{value}'")]
    Invalid {
        var: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Errors surfaced by the broadcast hub.
///
/// Per-connection transport failures never show up here; they are logged
/// and isolated to the connection that produced them.
#[derive(Debug, thiserror::Error)]
pub enum HubError {
    /// The endpoint configuration is unusable (startup-fatal).
    #[error("Invalid WebSocket endpoint configuration: {0}")]
    InvalidConfig(String),

    /// The endpoint path collides with another route (startup-fatal).
    #[error("WebSocket endpoint path '{0}' is already in use")]
    PathInUse(String),

    /// The publish payload could not be serialized; nothing was sent.
    #[error("Failed to serialize broadcast payload: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Convenience alias for hub operations.
pub type HubResult<T> = Result<T, HubError>;
