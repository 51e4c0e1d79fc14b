use http::HeaderMap;
use http::HeaderName;
use http::HeaderValue;
use http::Response;
use http::StatusCode;
use http::header::CONTENT_TYPE;

use crate::config::Message;

/// The response written for a shed request.
///
/// An [`OverloadHandler`](crate::OverloadHandler) receives a fresh `Reply` and
/// may send it. If it does, the gate leaves it alone; otherwise the gate sets
/// the configured status and sends the configured message.
#[derive(Debug)]
pub struct Reply {
    status: StatusCode,
    headers: HeaderMap,
    body: Option<String>,
}

impl Default for Reply {
    fn default() -> Self {
        Self::new()
    }
}

impl Reply {
    pub fn new() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// Set the status code. Has no effect once the reply is sent.
    pub fn status(&mut self, status: StatusCode) -> &mut Self {
        if !self.is_sent() {
            self.status = status;
        }
        self
    }

    /// Add a header. Has no effect once the reply is sent.
    pub fn header(&mut self, name: HeaderName, value: HeaderValue) -> &mut Self {
        if !self.is_sent() {
            self.headers.insert(name, value);
        }
        self
    }

    /// Send `message` as the body.
    ///
    /// A `content-type` matching the message is added unless one was already
    /// set. Only the first send counts.
    pub fn send(&mut self, message: impl Into<Message>) {
        self.write(&message.into());
    }

    /// `true` once a body has been sent.
    pub fn is_sent(&self) -> bool {
        self.body.is_some()
    }

    pub fn status_code(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    pub(crate) fn write(&mut self, message: &Message) {
        if self.is_sent() {
            tracing::debug!("reply already sent, ignoring second send");
            return;
        }
        self.headers
            .entry(CONTENT_TYPE)
            .or_insert_with(|| message.content_type());
        self.body = Some(message.to_body());
    }

    /// Convert into an `http::Response` with any body type buildable from a `String`.
    pub fn into_http_response<B>(self) -> Response<B>
    where
        B: From<String>,
    {
        let mut response = Response::new(B::from(self.body.unwrap_or_default()));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

#[cfg(feature = "axum")]
impl axum::response::IntoResponse for Reply {
    fn into_response(self) -> axum::response::Response {
        self.into_http_response::<axum::body::Body>()
    }
}

#[cfg(test)]
mod tests {
    use http::header::RETRY_AFTER;

    use super::*;

    #[test]
    fn it_starts_unsent() {
        let reply = Reply::new();

        assert!(!reply.is_sent());
        assert_eq!(reply.status_code(), StatusCode::OK);
        assert_eq!(reply.body(), None);
    }

    #[test]
    fn test_status_then_body() {
        let mut reply = Reply::new();
        reply
            .status(StatusCode::SERVICE_UNAVAILABLE)
            .send("Test message");

        assert!(reply.is_sent());
        let response = reply.into_http_response::<String>();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.body(), "Test message");
        assert_eq!(
            response.headers()[CONTENT_TYPE],
            "text/plain; charset=utf-8"
        );
    }

    #[test]
    fn test_json_body() {
        let mut reply = Reply::new();
        reply.send(serde_json::json!({ "busy": true }));

        assert_eq!(reply.body(), Some(r#"{"busy":true}"#));
        assert_eq!(reply.headers()[CONTENT_TYPE], "application/json");
    }

    #[test]
    fn test_only_first_send_counts() {
        let mut reply = Reply::new();
        reply.status(StatusCode::TOO_MANY_REQUESTS).send("first");
        reply.status(StatusCode::SERVICE_UNAVAILABLE).send("second");

        assert_eq!(reply.status_code(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(reply.body(), Some("first"));
    }

    #[test]
    fn test_explicit_content_type_is_kept() {
        let mut reply = Reply::new();
        reply
            .header(CONTENT_TYPE, HeaderValue::from_static("text/html"))
            .header(RETRY_AFTER, HeaderValue::from(5))
            .send("<p>busy</p>");

        let response = reply.into_http_response::<String>();
        assert_eq!(response.headers()[CONTENT_TYPE], "text/html");
        assert_eq!(response.headers()[RETRY_AFTER], "5");
    }

    #[test]
    fn test_unsent_reply_has_empty_body() {
        let response = Reply::new().into_http_response::<String>();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.body().is_empty());
    }
}
