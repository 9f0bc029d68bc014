//! End-to-end dispatcher scenarios against a deterministic engine.

mod support;

use support::{post, request, NeedleEngine, TruncatedBody};
use validation_core::Dispatcher;

const JSON: (&str, &str) = ("Content-Type", "application/json");

// --- scenario A: allowed ---

#[test]
fn json_request_passes() {
    let engine = NeedleEngine::blocking("DROP TABLE");
    let dispatcher = Dispatcher::new(engine.clone());

    let resp = dispatcher.handle(post(&[JSON], &br#"{"a":1}"#[..]));

    assert_eq!(resp.status, 200);
    assert_eq!(resp.content_type, "application/json");
    let body: serde_json::Value = serde_json::from_str(&resp.body).unwrap();
    assert_eq!(body["status"], "success");
    assert_eq!(
        body["message"],
        "Validation successful! Your request passed all schema validations."
    );
    assert!(body.get("code").is_none());
    assert_eq!(engine.finalized(), 1);
}

// --- scenario B: blocked ---

#[test]
fn json_request_blocked() {
    let engine = NeedleEngine::blocking("\"a\":1");
    let dispatcher = Dispatcher::new(engine.clone());

    let resp = dispatcher.handle(post(&[JSON], &br#"{"a":1}"#[..]));

    assert_eq!(resp.status, 403);
    assert_eq!(resp.content_type, "application/json");
    let body: serde_json::Value = serde_json::from_str(&resp.body).unwrap();
    assert_eq!(body["status"], "error");
    assert_eq!(body["code"], "schema_validation_failed");
    assert_eq!(engine.finalized(), 1);
}

// --- scenario C: wrong method ---

#[test]
fn get_is_rejected_without_engine() {
    let engine = NeedleEngine::default();
    let dispatcher = Dispatcher::new(engine.clone());

    let resp = dispatcher.handle(request("GET", &[JSON, ("Accept", "application/json")], &b""[..]));

    assert_eq!(resp.status, 405);
    assert_eq!(resp.content_type, "text/plain");
    assert_eq!(resp.body, "Only POST requests are allowed\n");
    assert_eq!(engine.opened(), 0);
}

// --- scenario D: unreadable body ---

#[test]
fn truncated_body_is_internal_error_json() {
    let engine = NeedleEngine::default();
    let dispatcher = Dispatcher::new(engine.clone());

    let resp = dispatcher.handle(post(&[JSON], TruncatedBody::new()));

    assert_eq!(resp.status, 500);
    assert_eq!(resp.content_type, "application/json");
    let body: serde_json::Value = serde_json::from_str(&resp.body).unwrap();
    assert_eq!(body["code"], "internal_error");
    assert_eq!(body["message"], "Failed to read request body");
    assert_eq!(engine.finalized(), 1);
}

#[test]
fn truncated_body_is_internal_error_text() {
    let dispatcher = Dispatcher::new(NeedleEngine::default());

    let resp = dispatcher.handle(post(&[("Content-Type", "text/xml")], TruncatedBody::new()));

    assert_eq!(resp.status, 500);
    assert_eq!(resp.content_type, "text/plain");
    assert_eq!(resp.body, "Internal server error: Failed to read request body\n");
}

#[test]
fn engine_failure_is_internal_error() {
    let engine = NeedleEngine::failing();
    let dispatcher = Dispatcher::new(engine.clone());

    let resp = dispatcher.handle(post(&[JSON], &b"{}"[..]));

    assert_eq!(resp.status, 500);
    assert_eq!(
        resp.body,
        r#"{"status":"error","message":"Failed to process request body","code":"internal_error"}"#
    );
    assert_eq!(engine.finalized(), 1);
}

// --- scenario E: address without port ---

#[test]
fn portless_remote_addr_is_processed() {
    let engine = NeedleEngine::default();
    let dispatcher = Dispatcher::new(engine.clone());
    let mut req = post(&[JSON], &b"{}"[..]);
    req.remote_addr = "@gateway-peer".to_string();

    let resp = dispatcher.handle(req);

    assert_eq!(resp.status, 200);
    let connections = engine.connections.lock().unwrap();
    assert_eq!(connections[0], ("@gateway-peer".to_string(), 0, "gateway.local".to_string(), 80));
}

#[test]
fn tls_request_reports_port_443() {
    let engine = NeedleEngine::default();
    let dispatcher = Dispatcher::new(engine.clone());
    let mut req = post(&[], &b""[..]);
    req.tls = true;

    dispatcher.handle(req);

    let connections = engine.connections.lock().unwrap();
    assert_eq!(connections[0], ("203.0.113.9".to_string(), 52100, "gateway.local".to_string(), 443));
}

// --- finalization across every branch ---

#[test]
fn every_branch_finalizes_exactly_once() {
    let engine = NeedleEngine::blocking("evil");
    let dispatcher = Dispatcher::new(engine.clone());

    dispatcher.handle(post(&[], &b"fine"[..]));
    dispatcher.handle(post(&[], &b"evil"[..]));
    dispatcher.handle(post(&[], TruncatedBody::new()));
    dispatcher.handle(request("PUT", &[], &b"evil"[..]));

    assert_eq!(engine.opened(), 3);
    assert_eq!(engine.finalized(), 3);

    let failing = NeedleEngine::failing();
    Dispatcher::new(failing.clone()).handle(post(&[], &b"x"[..]));
    assert_eq!(failing.finalized(), 1);
}

#[test]
fn shared_engine_serves_concurrent_workers() {
    let engine = NeedleEngine::blocking("evil");
    let dispatcher = std::sync::Arc::new(Dispatcher::new(engine.clone()));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let dispatcher = std::sync::Arc::clone(&dispatcher);
            std::thread::spawn(move || {
                let body: &'static [u8] = if i % 2 == 0 { b"evil" } else { b"fine" };
                dispatcher.handle(post(&[], body)).status
            })
        })
        .collect();

    let statuses: Vec<u16> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    for (i, status) in statuses.iter().enumerate() {
        assert_eq!(*status, if i % 2 == 0 { 403 } else { 200 });
    }
    assert_eq!(engine.finalized(), 8);
}
