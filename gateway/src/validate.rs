//! `/validate` handler: adapts axum requests to the inspection pipeline.
//!
//! # Design
//! The body is collected asynchronously up to `max_body_bytes`, but a
//! collection failure is not acted on here. It is parked inside
//! `BufferedBody` and surfaces when the pipeline reads the body, so the
//! engine still receives connection, URI and header facts first. The
//! dispatcher then runs on the blocking pool: engine work is CPU-bound and
//! never yields mid-transaction.

use std::io::{self, Cursor, Read};
use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::{self, Bytes};
use axum::extract::{ConnectInfo, Request, State};
use axum::http::request::Parts;
use axum::http::uri::Scheme;
use axum::http::{header, Method, StatusCode, Version};
use axum::response::{IntoResponse, Response};
use tracing::error;
use validation_core::{
    format, negotiate, EngineError, Headers, HttpMethod, InboundRequest, Outcome, OutcomeResponse,
    RuleEngine, StageError,
};

use crate::AppState;

/// A request body that was buffered ahead of the pipeline.
#[derive(Debug)]
pub enum BufferedBody {
    Ready(Cursor<Bytes>),
    /// Collection failed; the error is returned by the first read.
    Failed(Option<io::Error>),
}

impl BufferedBody {
    pub fn empty() -> Self {
        BufferedBody::Ready(Cursor::new(Bytes::new()))
    }

    pub async fn collect(body: body::Body, limit: usize) -> Self {
        match body::to_bytes(body, limit).await {
            Ok(bytes) => BufferedBody::Ready(Cursor::new(bytes)),
            Err(err) => BufferedBody::Failed(Some(io::Error::other(err))),
        }
    }
}

impl Read for BufferedBody {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            BufferedBody::Ready(cursor) => cursor.read(buf),
            BufferedBody::Failed(err) => Err(err
                .take()
                .unwrap_or_else(|| io::Error::other("request body unavailable"))),
        }
    }
}

/// Protocol string as it appears on an HTTP/1 request line.
pub fn protocol(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "HTTP/0.9",
        Version::HTTP_10 => "HTTP/1.0",
        Version::HTTP_11 => "HTTP/1.1",
        Version::HTTP_2 => "HTTP/2.0",
        Version::HTTP_3 => "HTTP/3.0",
        _ => "HTTP/1.1",
    }
}

/// Builds the pipeline's view of a request from its HTTP parts.
pub fn inbound_request<B>(parts: &Parts, body: B) -> InboundRequest<B> {
    let remote_addr = parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.to_string())
        .unwrap_or_default();

    let host = parts
        .headers
        .get(header::HOST)
        .map(|h| String::from_utf8_lossy(h.as_bytes()).into_owned())
        .or_else(|| parts.uri.authority().map(|a| a.to_string()))
        .unwrap_or_default();

    let headers = parts
        .headers
        .iter()
        .map(|(name, value)| (name.as_str(), String::from_utf8_lossy(value.as_bytes()).into_owned()))
        .collect::<Headers>();

    InboundRequest {
        method: HttpMethod::from(parts.method.as_str()),
        url: parts.uri.to_string(),
        protocol: protocol(parts.version).to_string(),
        remote_addr,
        host,
        tls: parts.uri.scheme() == Some(&Scheme::HTTPS),
        headers,
        body,
    }
}

pub async fn validate<E: RuleEngine + 'static>(State(state): State<AppState<E>>, request: Request) -> Response {
    let (parts, body) = request.into_parts();

    // Non-POST requests are rejected before the body phase; do not buffer them.
    let body = if parts.method == Method::POST {
        BufferedBody::collect(body, state.max_body_bytes).await
    } else {
        BufferedBody::empty()
    };

    let inbound = inbound_request(&parts, body);
    let preference = negotiate(&inbound.headers);
    let dispatcher = Arc::clone(&state.dispatcher);

    match tokio::task::spawn_blocking(move || dispatcher.handle(inbound)).await {
        Ok(outcome) => into_response(outcome),
        Err(err) => {
            error!(error = %err, "validation worker did not complete");
            let failure = StageError::body_process(EngineError::Internal(err.to_string()));
            into_response(format(&Outcome::Failed(failure), preference))
        }
    }
}

pub fn into_response(outcome: OutcomeResponse) -> Response {
    let status = StatusCode::from_u16(outcome.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, [(header::CONTENT_TYPE, outcome.content_type)], outcome.body).into_response()
}
