//! HTTP response types for the Tracechain SDK.
//!
//! This module provides the raw [`HttpResponse`] returned by a transport,
//! the backend's [`ErrorEnvelope`], and the status-code classification that
//! turns a non-2xx response into a [`ClassifiedError`].

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::clients::errors::{ClassifiedError, ErrorKind};

/// Wait applied to a 429 response that carries no usable `Retry-After`.
pub const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// Header carrying the backend's request correlation ID.
pub const CORRELATION_ID_HEADER: &str = "x-correlation-id";

/// The error envelope carried by failure responses.
///
/// ```json
/// {"error": {"code": "PRODUCT_NOT_FOUND", "message": "...", "correlationId": "..."}}
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// The error body.
    pub error: ErrorBody,
}

/// The body of an [`ErrorEnvelope`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    /// Machine-readable error code.
    pub code: String,
    /// Human-readable message.
    pub message: String,
    /// Correlation ID for support requests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
}

/// A raw HTTP response from the Tracechain API.
///
/// Header names are stored lower-cased; a header may have multiple values.
#[derive(Clone, Debug)]
pub struct HttpResponse {
    /// The HTTP status code.
    pub code: u16,
    /// Response headers.
    pub headers: HashMap<String, Vec<String>>,
    /// The undecoded response body.
    pub body: String,
}

impl HttpResponse {
    /// Creates a new response, normalizing header names to lower case.
    #[must_use]
    pub fn new(code: u16, headers: HashMap<String, Vec<String>>, body: impl Into<String>) -> Self {
        let mut normalized: HashMap<String, Vec<String>> = HashMap::new();
        for (key, values) in headers {
            normalized
                .entry(key.to_lowercase())
                .or_default()
                .extend(values);
        }
        Self {
            code,
            headers: normalized,
            body: body.into(),
        }
    }

    /// Returns `true` if the status code is 2xx.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.code >= 200 && self.code <= 299
    }

    /// Returns the first value of a header (case-insensitive).
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_lowercase())
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// Returns the seconds to wait from the `Retry-After` header, if usable.
    ///
    /// Accepts delta-seconds (fractional values round up) or an HTTP-date.
    #[must_use]
    pub fn retry_after(&self) -> Option<u64> {
        self.header("retry-after")
            .and_then(|value| parse_retry_after(value, Utc::now()))
    }

    /// Parses the backend error envelope from the body, if present.
    #[must_use]
    pub fn error_envelope(&self) -> Option<ErrorEnvelope> {
        serde_json::from_str(&self.body).ok()
    }

    /// Returns the correlation ID from the envelope or the response headers.
    #[must_use]
    pub fn correlation_id(&self) -> Option<String> {
        self.error_envelope()
            .and_then(|envelope| envelope.error.correlation_id)
            .or_else(|| self.header(CORRELATION_ID_HEADER).map(String::from))
    }

    /// Classifies this response.
    ///
    /// 2xx responses are returned unchanged. Everything else becomes a
    /// [`ClassifiedError`]:
    /// - 429 → `RateLimited`, with `Retry-After` or [`DEFAULT_RETRY_AFTER_SECS`]
    /// - other 4xx → `ClientError`
    /// - 5xx → `ServerError`
    /// - anything else → `Unknown`
    ///
    /// # Errors
    ///
    /// Returns the classified error for any non-2xx status.
    pub fn into_result(self) -> Result<Self, ClassifiedError> {
        if self.is_ok() {
            return Ok(self);
        }

        let kind = match self.code {
            429 => ErrorKind::RateLimited {
                retry_after: Some(self.retry_after().unwrap_or(DEFAULT_RETRY_AFTER_SECS)),
            },
            400..=499 => ErrorKind::ClientError { status: self.code },
            500..=599 => ErrorKind::ServerError { status: self.code },
            _ => ErrorKind::Unknown,
        };

        let envelope = self.error_envelope();
        let message = envelope.as_ref().map_or_else(
            || fallback_message(self.code, &self.body),
            |e| e.error.message.clone(),
        );

        Err(ClassifiedError {
            kind,
            code: envelope.map(|e| e.error.code),
            message,
            correlation_id: self.correlation_id(),
        })
    }
}

fn fallback_message(code: u16, body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        format!("HTTP {code}")
    } else {
        format!("HTTP {code}: {}", excerpt(trimmed, 200))
    }
}

/// Truncates `text` to at most `max` characters for logs and messages.
pub(crate) fn excerpt(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text.to_string(),
    }
}

/// Parses a `Retry-After` value relative to `now`.
fn parse_retry_after(value: &str, now: DateTime<Utc>) -> Option<u64> {
    let value = value.trim();
    if let Ok(secs) = value.parse::<u64>() {
        return Some(secs);
    }
    if let Ok(secs) = value.parse::<f64>() {
        if secs.is_finite() && secs >= 0.0 {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            return Some(secs.ceil() as u64);
        }
        return None;
    }
    let at = DateTime::parse_from_rfc2822(value).ok()?;
    let delta = at.with_timezone(&Utc) - now;
    Some(u64::try_from(delta.num_seconds()).unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn response(code: u16, headers: &[(&str, &str)], body: &str) -> HttpResponse {
        let headers = headers
            .iter()
            .map(|(k, v)| ((*k).to_string(), vec![(*v).to_string()]))
            .collect();
        HttpResponse::new(code, headers, body)
    }

    #[test]
    fn test_success_passes_through() {
        let res = response(201, &[], r#"{"id":"p1"}"#).into_result().unwrap();
        assert_eq!(res.code, 201);
        assert_eq!(res.body, r#"{"id":"p1"}"#);
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let res = response(200, &[("X-Correlation-ID", "abc")], "");
        assert_eq!(res.header("x-correlation-id"), Some("abc"));
        assert_eq!(res.header("X-CORRELATION-ID"), Some("abc"));
    }

    #[test]
    fn test_429_uses_retry_after_header() {
        let err = response(429, &[("Retry-After", "5")], "")
            .into_result()
            .unwrap_err();
        assert_eq!(
            err.kind,
            ErrorKind::RateLimited {
                retry_after: Some(5)
            }
        );
    }

    #[test]
    fn test_429_defaults_to_sixty_seconds() {
        let err = response(429, &[], "").into_result().unwrap_err();
        assert_eq!(err.retry_after(), Some(DEFAULT_RETRY_AFTER_SECS));
    }

    #[test]
    fn test_4xx_carries_envelope_fields() {
        let body = r#"{"error":{"code":"VALIDATION_FAILED","message":"gtin must be 14 digits","correlationId":"c-9"}}"#;
        let err = response(422, &[], body).into_result().unwrap_err();

        assert_eq!(err.kind, ErrorKind::ClientError { status: 422 });
        assert_eq!(err.code.as_deref(), Some("VALIDATION_FAILED"));
        assert_eq!(err.message, "gtin must be 14 digits");
        assert_eq!(err.correlation_id.as_deref(), Some("c-9"));
    }

    #[test]
    fn test_4xx_without_envelope_uses_body_excerpt() {
        let err = response(404, &[], "not here").into_result().unwrap_err();
        assert_eq!(err.kind, ErrorKind::ClientError { status: 404 });
        assert!(err.code.is_none());
        assert_eq!(err.message, "HTTP 404: not here");
    }

    #[test]
    fn test_5xx_is_server_error() {
        let err = response(503, &[("x-correlation-id", "h-1")], "")
            .into_result()
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::ServerError { status: 503 });
        assert_eq!(err.message, "HTTP 503");
        assert_eq!(err.correlation_id.as_deref(), Some("h-1"));
    }

    #[test]
    fn test_unexpected_status_is_unknown() {
        let err = response(304, &[], "").into_result().unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unknown);
    }

    #[test]
    fn test_parse_retry_after_variants() {
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(parse_retry_after("7", now), Some(7));
        assert_eq!(parse_retry_after("2.1", now), Some(3));
        assert_eq!(parse_retry_after("-1", now), None);
        assert_eq!(parse_retry_after("soon", now), None);
        assert_eq!(
            parse_retry_after("Wed, 01 Jan 2025 00:00:30 +0000", now),
            Some(30)
        );
        assert_eq!(
            parse_retry_after("Tue, 31 Dec 2024 23:59:00 +0000", now),
            Some(0)
        );
    }

    #[test]
    fn test_excerpt_truncates_on_char_boundary() {
        assert_eq!(excerpt("héllo", 2), "hé…");
        assert_eq!(excerpt("hi", 10), "hi");
    }
}
