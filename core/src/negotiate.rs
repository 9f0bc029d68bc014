//! Response format selection.
//!
//! This is a substring heuristic, not RFC 9110 negotiation: quality values
//! and wildcards are ignored. JSON is chosen when `Accept` or `Content-Type`
//! mentions `application/json`, and an `Accept` that mentions `text/html`
//! always wins over that.

use crate::http::{Headers, ResponsePreference};

const JSON: &str = "application/json";
const HTML: &str = "text/html";

pub fn negotiate(headers: &Headers) -> ResponsePreference {
    let accept = headers.get("accept").unwrap_or_default();
    let content_type = headers.get("content-type").unwrap_or_default();

    let wants_json = accept.contains(JSON) || content_type.contains(JSON);
    if wants_json && !accept.contains(HTML) {
        ResponsePreference::Json
    } else {
        ResponsePreference::PlainText
    }
}
