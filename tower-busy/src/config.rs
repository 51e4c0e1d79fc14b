use std::time::Duration;

use http::HeaderValue;
use http::StatusCode;
use serde::Deserialize;
use serde::Deserializer;
use serde_json::Value;

use crate::error::ConfigError;

const DEFAULT_MESSAGE: &str = "Too busy!";

/// The body sent to a client whose request was shed.
///
/// Objects and arrays go out as JSON. Everything else goes out as plain text.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Text(String),
    Json(Value),
}

impl Default for Message {
    fn default() -> Self {
        Message::Text(DEFAULT_MESSAGE.to_string())
    }
}

impl Message {
    /// The `content-type` a reply carrying this message advertises.
    pub fn content_type(&self) -> HeaderValue {
        match self {
            Message::Text(_) => HeaderValue::from_static("text/plain; charset=utf-8"),
            Message::Json(_) => HeaderValue::from_static("application/json"),
        }
    }

    /// Renders the message as a response body.
    pub fn to_body(&self) -> String {
        match self {
            Message::Text(text) => text.clone(),
            Message::Json(value) => value.to_string(),
        }
    }
}

// A missing or empty message means "use the default".
impl From<Value> for Message {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Message::default(),
            Value::String(text) => Message::from(text),
            Value::Object(_) | Value::Array(_) => Message::Json(value),
            scalar => Message::Text(scalar.to_string()),
        }
    }
}

impl From<String> for Message {
    fn from(text: String) -> Self {
        if text.is_empty() {
            Message::default()
        } else {
            Message::Text(text)
        }
    }
}

impl From<&str> for Message {
    fn from(text: &str) -> Self {
        Message::from(text.to_string())
    }
}

impl<'de> Deserialize<'de> for Message {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Message::from)
    }
}

/// Configuration for a [`TooBusyLayer`](crate::TooBusyLayer).
///
/// Built once at startup, either with the `with_*` methods or by deserializing
/// it from JSON or TOML:
///
/// ```rust
/// use std::time::Duration;
/// use tower_busy::TooBusyConfig;
///
/// let config = TooBusyConfig::from_json_str(r#"{ "message": "Busy", "max_lag_ms": 70 }"#).unwrap();
/// assert_eq!(config.max_lag(), Some(Duration::from_millis(70)));
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TooBusyConfig {
    message: Message,
    #[serde(
        rename = "max_lag_ms",
        alias = "maxLag",
        deserialize_with = "deserialize_millis"
    )]
    max_lag: Option<Duration>,
    #[serde(skip, default = "default_status")]
    status: StatusCode,
}

impl Default for TooBusyConfig {
    fn default() -> Self {
        Self {
            message: Message::default(),
            max_lag: None,
            status: default_status(),
        }
    }
}

impl TooBusyConfig {
    /// Set the message sent when a request is shed.
    pub fn with_message(mut self, message: impl Into<Message>) -> Self {
        self.message = message.into();
        self
    }

    /// Set the lag threshold handed to the load monitor at construction.
    ///
    /// The monitor's threshold is process-wide, so this affects every gate
    /// sharing the same monitor.
    pub fn with_max_lag(mut self, max_lag: Duration) -> Self {
        self.max_lag = Some(max_lag);
        self
    }

    /// Set the status sent when a request is shed. Defaults to `503 Service Unavailable`.
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    pub fn message(&self) -> &Message {
        &self.message
    }

    pub fn max_lag(&self) -> Option<Duration> {
        self.max_lag
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn from_json_str(input: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(input)?)
    }

    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(input)?)
    }
}

fn default_status() -> StatusCode {
    StatusCode::SERVICE_UNAVAILABLE
}

fn deserialize_millis<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_millis))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn it_defaults_to_too_busy() {
        let config = TooBusyConfig::default();

        assert_eq!(config.message(), &Message::Text("Too busy!".to_string()));
        assert_eq!(config.max_lag(), None);
        assert_eq!(config.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_structured_messages_are_json() {
        let object = Message::from(json!({ "error": "busy" }));
        let array = Message::from(json!(["busy", 1]));

        assert!(matches!(object, Message::Json(_)));
        assert!(matches!(array, Message::Json(_)));
        assert_eq!(object.to_body(), r#"{"error":"busy"}"#);
        assert_eq!(object.content_type(), "application/json");
    }

    #[test]
    fn test_scalar_messages_are_text() {
        assert_eq!(Message::from(json!(42)), Message::Text("42".to_string()));
        assert_eq!(Message::from(json!(true)), Message::Text("true".to_string()));

        let text = Message::from("Test message");
        assert_eq!(text.to_body(), "Test message");
        assert_eq!(text.content_type(), "text/plain; charset=utf-8");
    }

    #[test]
    fn test_empty_messages_fall_back_to_default() {
        assert_eq!(Message::from(""), Message::default());
        assert_eq!(Message::from(Value::Null), Message::default());
    }

    #[test]
    fn test_builder() {
        let config = TooBusyConfig::default()
            .with_message("Test message")
            .with_max_lag(Duration::from_millis(100))
            .with_status(StatusCode::TOO_MANY_REQUESTS);

        assert_eq!(config.message().to_body(), "Test message");
        assert_eq!(config.max_lag(), Some(Duration::from_millis(100)));
        assert_eq!(config.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[test]
    fn test_from_json() {
        let config =
            TooBusyConfig::from_json_str(r#"{ "message": { "error": "busy" }, "maxLag": 100 }"#)
                .unwrap();

        assert_eq!(config.message(), &Message::Json(json!({ "error": "busy" })));
        assert_eq!(config.max_lag(), Some(Duration::from_millis(100)));
        // Status is never read from input
        assert_eq!(config.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_from_json_defaults() {
        let config = TooBusyConfig::from_json_str("{}").unwrap();
        assert_eq!(config, TooBusyConfig::default());
    }

    #[test]
    fn test_from_toml() {
        let config = TooBusyConfig::from_toml_str(
            r#"
            message = "Come back later"
            max_lag_ms = 70
            "#,
        )
        .unwrap();

        assert_eq!(config.message().to_body(), "Come back later");
        assert_eq!(config.max_lag(), Some(Duration::from_millis(70)));
    }

    #[test]
    fn test_rejects_unknown_fields() {
        let err = TooBusyConfig::from_json_str(r#"{ "status": 429 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
    }

    #[test]
    fn test_rejects_negative_lag() {
        let err = TooBusyConfig::from_toml_str("max_lag_ms = -1").unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }
}
