//! Renders outcomes into status, content type and body.
//!
//! # Design
//! Every outcome maps to one fixed message. Client-facing text never carries
//! error detail or the interrupting rule; those stay in server logs. JSON
//! bodies are serialized from `Body` so field order is fixed
//! (`status`, `message`, `code`).

use serde::Serialize;

use crate::error::Stage;
use crate::http::{OutcomeResponse, ResponsePreference};
use crate::types::{Outcome, Verdict};

const METHOD_NOT_ALLOWED: &str = "Only POST requests are allowed\n";
const SUCCESS_MESSAGE: &str = "Validation successful! Your request passed all schema validations.";
const BLOCKED_MESSAGE: &str = "Request blocked by security policy";
const BLOCKED_TEXT: &str = "Error: Request blocked by security policy. Schema validation failed.\n";
const READ_FAILED: &str = "Failed to read request body";
const PROCESS_FAILED: &str = "Failed to process request body";

/// Machine-readable failure codes in JSON bodies.
pub const CODE_INTERNAL_ERROR: &str = "internal_error";
pub const CODE_SCHEMA_VALIDATION_FAILED: &str = "schema_validation_failed";

#[derive(Debug, Serialize)]
struct Body<'a> {
    status: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<&'a str>,
}

pub fn format(outcome: &Outcome, preference: ResponsePreference) -> OutcomeResponse {
    match outcome {
        Outcome::MethodNotAllowed => OutcomeResponse {
            status: 405,
            content_type: ResponsePreference::PlainText.content_type(),
            body: METHOD_NOT_ALLOWED.to_string(),
        },
        Outcome::Failed(err) => {
            let message = match err.stage {
                Stage::BodyRead => READ_FAILED,
                Stage::BodyProcess => PROCESS_FAILED,
            };
            render(
                500,
                preference,
                Body {
                    status: "error",
                    message,
                    code: Some(CODE_INTERNAL_ERROR),
                },
                format!("Internal server error: {message}\n"),
            )
        }
        Outcome::Decided(Verdict::Blocked(_)) => render(
            403,
            preference,
            Body {
                status: "error",
                message: BLOCKED_MESSAGE,
                code: Some(CODE_SCHEMA_VALIDATION_FAILED),
            },
            BLOCKED_TEXT.to_string(),
        ),
        Outcome::Decided(Verdict::Allowed) => render(
            200,
            preference,
            Body {
                status: "success",
                message: SUCCESS_MESSAGE,
                code: None,
            },
            format!("{SUCCESS_MESSAGE}\n"),
        ),
    }
}

fn render(status: u16, preference: ResponsePreference, json: Body<'_>, text: String) -> OutcomeResponse {
    let body = match preference {
        // Serializing a struct of string slices cannot fail.
        ResponsePreference::Json => serde_json::to_string(&json).unwrap_or_default(),
        ResponsePreference::PlainText => text,
    };
    OutcomeResponse {
        status,
        content_type: preference.content_type(),
        body,
    }
}
