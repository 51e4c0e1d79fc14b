/// Errors produced while loading a [`TooBusyConfig`](crate::TooBusyConfig).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The input was not a valid JSON configuration.
    #[error("invalid JSON configuration: {0}")]
    Json(#[from] serde_json::Error),

    /// The input was not a valid TOML configuration.
    #[error("invalid TOML configuration: {0}")]
    Toml(#[from] toml::de::Error),
}
