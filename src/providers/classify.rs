/*!
 * Mapping of HTTP failures onto the shared error taxonomy.
 *
 * Status codes decide most cases. A 400 or 429 body is inspected for
 * vendor codes that mean something more specific (an invalid key reported
 * as a bad request, quota exhaustion reported as rate limiting).
 */

use serde_json::Value;

use super::path::extract;
use super::transport::HttpResponse;
use crate::errors::{ErrorKind, ProviderError};

const MAX_MESSAGE_CHARS: usize = 300;

const AUTH_MARKERS: &[&str] = &["api_key_invalid", "invalid_api_key", "invalid x-api-key", "incorrect api key"];
const BILLING_MARKERS: &[&str] = &["insufficient_quota", "insufficient balance", "billing", "credit balance"];
const MODEL_MARKERS: &[&str] = &["model_not_found", "does not exist", "unknown model", "not_found_error"];
const BLOCKED_MARKERS: &[&str] = &["content_filter", "content_policy", "\"1301\"", "safety"];

/// Best-effort human message from an error body
pub fn error_message(body: &str) -> String {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let from_json = parsed.as_ref().and_then(|value| {
        ["error.message", "message", "error.msg", "[0].error.message"]
            .iter()
            .find_map(|path| extract(value, path).and_then(Value::as_str))
            .or_else(|| value.get("error").and_then(Value::as_str))
            .map(str::to_string)
    });
    let message = from_json.unwrap_or_else(|| body.trim().to_string());
    if message.chars().count() > MAX_MESSAGE_CHARS {
        let truncated: String = message.chars().take(MAX_MESSAGE_CHARS).collect();
        format!("{}...", truncated)
    } else {
        message
    }
}

fn body_mentions(body: &str, markers: &[&str]) -> bool {
    let lower = body.to_lowercase();
    markers.iter().any(|m| lower.contains(m))
}

/// Classify a non-success response by status code and body markers
pub fn classify_status(response: &HttpResponse) -> ProviderError {
    let message = error_message(&response.body);
    let body = &response.body;
    let kind = match response.status {
        401 => ErrorKind::AuthInvalid,
        402 => ErrorKind::BillingExhausted,
        403 if body_mentions(body, AUTH_MARKERS) => ErrorKind::AuthInvalid,
        403 => ErrorKind::PermissionDenied,
        404 => ErrorKind::ModelNotFound,
        408 => ErrorKind::Timeout,
        429 if body_mentions(body, BILLING_MARKERS) => ErrorKind::BillingExhausted,
        429 => ErrorKind::RateLimited,
        500..=599 => ErrorKind::ServerOverloaded,
        400 if body_mentions(body, AUTH_MARKERS) => ErrorKind::AuthInvalid,
        400 if body_mentions(body, BILLING_MARKERS) => ErrorKind::BillingExhausted,
        400 if body_mentions(body, MODEL_MARKERS) => ErrorKind::ModelNotFound,
        400 if body_mentions(body, BLOCKED_MARKERS) => ErrorKind::ContentPolicyBlocked,
        status => {
            return ProviderError::Unclassified {
                status_code: Some(status),
                message,
            };
        }
    };
    ProviderError::from_kind(kind, message)
}
