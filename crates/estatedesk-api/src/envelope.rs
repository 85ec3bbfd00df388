// Response envelopes of the Form Service and Record API.
//
// The server speaks a loose JSON dialect: form endpoints answer
// `{success, message?, data?}` or `{success: false, errors}`, DRF viewsets
// answer the bare object or `{detail}`, and the admin helpers answer
// `{success, error}`. Everything here reduces those shapes to typed results.

use indexmap::IndexMap;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;

/// Key under which errors not tied to a single field are reported.
pub const NON_FIELD_ERRORS: &str = "__all__";

/// Field name → message, in server order.
pub type FieldErrors = IndexMap<String, String>;

/// Outcome of a form submission.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionResult {
    /// The record was saved.
    Success {
        message: Option<String>,
        payload: Value,
    },
    /// The server validated the input and rejected it.
    ValidationFailure { field_errors: FieldErrors },
    /// Network or HTTP failure unrelated to validation.
    TransportError { message: String },
}

impl SubmissionResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// `GET <form>` body.
#[derive(Debug, Deserialize)]
pub(crate) struct FormEnvelope {
    pub html: Option<String>,
}

/// Successful reply from a Record API action or batch endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionReply {
    pub message: Option<String>,
    pub body: Value,
}

// ── Interpretation ──────────────────────────────────────────────────

/// Interpret a submission response.
///
/// - not ok + `errors` → `ValidationFailure`
/// - not ok otherwise → `TransportError` (detail, message, error, fallback)
/// - ok + `success: false` → `ValidationFailure`
/// - ok + `success: true` (or no flag at all) → `Success`
pub fn interpret_submission(status: StatusCode, body: &str) -> SubmissionResult {
    let json = parse_body(body);

    if !status.is_success() {
        if let Some(errors) = json.as_ref().and_then(|v| v.get("errors")) {
            return SubmissionResult::ValidationFailure {
                field_errors: flatten_errors(errors),
            };
        }
        return SubmissionResult::TransportError {
            message: failure_message(status, json.as_ref()),
        };
    }

    let Some(json) = json else {
        return SubmissionResult::TransportError {
            message: format!("unexpected response body (HTTP {})", status.as_u16()),
        };
    };

    match json.get("success").and_then(Value::as_bool) {
        Some(false) => {
            let field_errors = match json.get("errors") {
                Some(errors) => flatten_errors(errors),
                None => {
                    let mut map = FieldErrors::new();
                    map.insert(
                        NON_FIELD_ERRORS.to_owned(),
                        extract_message(&json).unwrap_or_else(|| "submission rejected".into()),
                    );
                    map
                }
            };
            SubmissionResult::ValidationFailure { field_errors }
        }
        _ => SubmissionResult::Success {
            message: json.get("message").and_then(Value::as_str).map(String::from),
            payload: json.get("data").cloned().unwrap_or(json),
        },
    }
}

/// Interpret a Record API response (action, delete, batch).
///
/// `Err((status, message))` when the server refused the request, either
/// with a non-2xx status or with an explicit `success: false`.
pub(crate) fn interpret_action(status: StatusCode, body: &str) -> Result<ActionReply, (u16, String)> {
    let json = parse_body(body);

    if !status.is_success() {
        return Err((status.as_u16(), failure_message(status, json.as_ref())));
    }

    let json = json.unwrap_or(Value::Null);
    if json.get("success").and_then(Value::as_bool) == Some(false) {
        let message = extract_message(&json).unwrap_or_else(|| "request rejected".into());
        return Err((status.as_u16(), message));
    }

    Ok(ActionReply {
        message: json.get("message").and_then(Value::as_str).map(String::from),
        body: json,
    })
}

/// Best-effort human message for a failed response.
pub(crate) fn failure_message(status: StatusCode, json: Option<&Value>) -> String {
    json.and_then(extract_message)
        .unwrap_or_else(|| format!("request failed (HTTP {})", status.as_u16()))
}

fn parse_body(body: &str) -> Option<Value> {
    if body.trim().is_empty() {
        return None;
    }
    serde_json::from_str(body).ok()
}

/// `detail`, then `message`, then `error`.
fn extract_message(json: &Value) -> Option<String> {
    ["detail", "message", "error"]
        .iter()
        .filter_map(|key| json.get(*key))
        .find_map(message_text)
}

fn message_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Array(items) => {
            let joined = items
                .iter()
                .filter_map(message_text)
                .collect::<Vec<_>>()
                .join(" ");
            (!joined.is_empty()).then_some(joined)
        }
        Value::Object(map) => map.get("message").and_then(message_text),
        Value::Null | Value::String(_) => None,
        other => Some(other.to_string()),
    }
}

/// Flatten `errors` into one message per field.
///
/// Django forms send `{field: [msg, ...]}`, some views send
/// `{field: msg}`, DRF sends `{field: [{message, code}]}`. A bare string
/// or list is treated as a non-field error.
fn flatten_errors(errors: &Value) -> FieldErrors {
    let mut out = FieldErrors::new();
    match errors {
        Value::Object(map) => {
            for (field, value) in map {
                let message = message_text(value).unwrap_or_else(|| value.to_string());
                let key = if field == "non_field_errors" {
                    NON_FIELD_ERRORS.to_owned()
                } else {
                    field.clone()
                };
                out.insert(key, message);
            }
        }
        other => {
            if let Some(message) = message_text(other) {
                out.insert(NON_FIELD_ERRORS.to_owned(), message);
            }
        }
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn ok_with_success_true_is_success() {
        let body = json!({"success": true, "message": "saved", "data": {"id": 4}}).to_string();
        let result = interpret_submission(StatusCode::OK, &body);

        assert_eq!(
            result,
            SubmissionResult::Success {
                message: Some("saved".into()),
                payload: json!({"id": 4}),
            }
        );
    }

    #[test]
    fn ok_with_success_false_maps_django_error_lists() {
        let body = json!({
            "success": false,
            "errors": {"name": ["This field is required."], "area": ["Too small.", "Must be positive."]}
        })
        .to_string();

        let SubmissionResult::ValidationFailure { field_errors } =
            interpret_submission(StatusCode::OK, &body)
        else {
            panic!("expected validation failure");
        };

        assert_eq!(field_errors["name"], "This field is required.");
        assert_eq!(field_errors["area"], "Too small. Must be positive.");
        assert_eq!(field_errors.keys().collect::<Vec<_>>(), ["name", "area"]);
    }

    #[test]
    fn ok_with_success_false_and_no_errors_becomes_non_field_error() {
        let body = json!({"success": false, "error": "bill already paid"}).to_string();
        let SubmissionResult::ValidationFailure { field_errors } =
            interpret_submission(StatusCode::OK, &body)
        else {
            panic!("expected validation failure");
        };
        assert_eq!(field_errors[NON_FIELD_ERRORS], "bill already paid");
    }

    #[test]
    fn not_ok_with_errors_is_validation_failure() {
        let body = json!({"errors": {"phone": "invalid"}}).to_string();
        let result = interpret_submission(StatusCode::BAD_REQUEST, &body);
        assert!(matches!(result, SubmissionResult::ValidationFailure { .. }));
    }

    #[test]
    fn not_ok_prefers_detail_then_message() {
        let body = json!({"message": "second", "detail": "first"}).to_string();
        assert_eq!(
            interpret_submission(StatusCode::FORBIDDEN, &body),
            SubmissionResult::TransportError {
                message: "first".into()
            }
        );

        let body = json!({"error": "third"}).to_string();
        assert_eq!(
            interpret_submission(StatusCode::INTERNAL_SERVER_ERROR, &body),
            SubmissionResult::TransportError {
                message: "third".into()
            }
        );
    }

    #[test]
    fn not_ok_without_json_mentions_status() {
        let result = interpret_submission(StatusCode::BAD_GATEWAY, "<html>bad gateway</html>");
        assert_eq!(
            result,
            SubmissionResult::TransportError {
                message: "request failed (HTTP 502)".into()
            }
        );
    }

    #[test]
    fn drf_non_field_errors_are_renamed() {
        let errors = json!({"non_field_errors": [{"message": "duplicate", "code": "unique"}]});
        let flat = flatten_errors(&errors);
        assert_eq!(flat[NON_FIELD_ERRORS], "duplicate");
    }

    #[test]
    fn action_without_success_flag_is_ok() {
        let reply = interpret_action(StatusCode::OK, r#"{"message": "reopened"}"#).unwrap();
        assert_eq!(reply.message.as_deref(), Some("reopened"));
    }

    #[test]
    fn action_with_error_body_is_rejected() {
        let err = interpret_action(StatusCode::BAD_REQUEST, r#"{"error": "already closed"}"#)
            .unwrap_err();
        assert_eq!(err, (400, "already closed".to_owned()));

        let err = interpret_action(StatusCode::OK, r#"{"success": false}"#).unwrap_err();
        assert_eq!(err, (200, "request rejected".to_owned()));
    }

    #[test]
    fn empty_delete_body_is_ok() {
        let reply = interpret_action(StatusCode::NO_CONTENT, "").unwrap();
        assert_eq!(reply.body, Value::Null);
    }
}
