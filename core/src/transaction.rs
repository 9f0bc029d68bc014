//! Per-request transaction guard.
//!
//! # Design
//! `Transaction` wraps an engine transaction together with the connection
//! facts and a phase cursor. Phase methods are crate-private so only the
//! orchestrator drives them, always in cursor order. Finalization lives in
//! `Drop`: whichever way a request ends (success, block, body failure, or an
//! unwinding panic), `process_logging` runs exactly once.

use tracing::debug;
use uuid::Uuid;

use crate::engine::{EngineTransaction, Interruption, RuleEngine};
use crate::error::EngineError;
use crate::http::{Headers, InboundRequest};

const HTTP_PORT: u16 = 80;
const HTTPS_PORT: u16 = 443;

/// Ordered stages of fact submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    Connection,
    Uri,
    RequestHeaders,
    RequestBody,
    Logging,
}

/// Connection facts handed to the engine in the first phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionInfo {
    pub client_ip: String,
    pub client_port: u16,
    pub server_host: String,
    pub server_port: u16,
}

impl ConnectionInfo {
    pub fn from_request<B>(request: &InboundRequest<B>) -> Self {
        let (client_ip, client_port) = split_remote_addr(&request.remote_addr);
        Self {
            client_ip,
            client_port,
            server_host: request.host.clone(),
            server_port: if request.tls { HTTPS_PORT } else { HTTP_PORT },
        }
    }
}

/// Splits a peer address into IP and port. Never fails: anything that does
/// not carry a numeric port yields port 0.
///
/// - `10.0.0.1:5000` → (`10.0.0.1`, 5000)
/// - `[::1]:5000` → (`::1`, 5000)
/// - `::1` (several colons, no brackets) → (`::1`, 0)
/// - `/run/app.sock` → (`/run/app.sock`, 0)
/// - `10.0.0.1:http` → (`10.0.0.1`, 0)
pub fn split_remote_addr(addr: &str) -> (String, u16) {
    if let Some(rest) = addr.strip_prefix('[') {
        if let Some((ip, tail)) = rest.split_once(']') {
            let port = tail
                .strip_prefix(':')
                .and_then(|p| p.parse().ok())
                .unwrap_or(0);
            return (ip.to_string(), port);
        }
        return (addr.to_string(), 0);
    }

    match addr.split_once(':') {
        Some((ip, port)) if !port.contains(':') => (ip.to_string(), port.parse().unwrap_or(0)),
        _ => (addr.to_string(), 0),
    }
}

/// A single-use inspection session for one request.
pub struct Transaction<T: EngineTransaction> {
    id: Uuid,
    inner: T,
    connection: ConnectionInfo,
    phase: Phase,
    finalized: bool,
}

impl<T: EngineTransaction> Transaction<T> {
    /// Opens a transaction on `engine` for `request`.
    pub fn open<E, B>(engine: &E, request: &InboundRequest<B>) -> Self
    where
        E: RuleEngine<Transaction = T> + ?Sized,
    {
        let tx = Self {
            id: Uuid::new_v4(),
            inner: engine.new_transaction(),
            connection: ConnectionInfo::from_request(request),
            phase: Phase::Connection,
            finalized: false,
        };
        debug!(tx_id = %tx.id, client_ip = %tx.connection.client_ip, "transaction opened");
        tx
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn connection(&self) -> &ConnectionInfo {
        &self.connection
    }

    /// The next phase this transaction expects.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn interruption(&self) -> Option<Interruption> {
        self.inner.interruption()
    }

    fn advance(&mut self, from: Phase, to: Phase) {
        debug_assert_eq!(self.phase, from, "transaction phases fed out of order");
        debug!(tx_id = %self.id, phase = ?to, "phase advanced");
        self.phase = to;
    }

    pub(crate) fn feed_connection(&mut self) {
        let c = &self.connection;
        self.inner
            .process_connection(&c.client_ip, c.client_port, &c.server_host, c.server_port);
        self.advance(Phase::Connection, Phase::Uri);
    }

    pub(crate) fn feed_uri(&mut self, url: &str, method: &str, protocol: &str) {
        self.inner.process_uri(url, method, protocol);
        self.advance(Phase::Uri, Phase::RequestHeaders);
    }

    pub(crate) fn feed_headers(&mut self, headers: &Headers) {
        for (name, value) in headers.iter() {
            self.inner.add_request_header(name, value);
        }
        self.inner.process_request_headers();
        self.advance(Phase::RequestHeaders, Phase::RequestBody);
    }

    pub(crate) fn feed_body(&mut self, body: &[u8]) -> Result<(), EngineError> {
        debug_assert_eq!(self.phase, Phase::RequestBody, "body fed before headers");
        self.inner.write_request_body(body)?;
        self.inner.process_request_body()?;
        self.advance(Phase::RequestBody, Phase::Logging);
        Ok(())
    }

    /// Finalizes now instead of at drop.
    pub fn finish(mut self) {
        self.finalize();
    }

    fn finalize(&mut self) {
        if self.finalized {
            return;
        }
        self.finalized = true;
        self.inner.process_logging();
        debug!(tx_id = %self.id, "transaction finalized");
    }
}

impl<T: EngineTransaction> Drop for Transaction<T> {
    fn drop(&mut self) {
        self.finalize();
    }
}
