//! Deterministic engine and request builders for the integration tests.

#![allow(dead_code)]

use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use validation_core::{
    EngineError, EngineTransaction, Headers, HttpMethod, InboundRequest, Interruption, RuleEngine,
};

/// Blocks any request whose body contains `needle`; optionally fails on
/// body submission. Counts opened and finalized transactions.
#[derive(Clone, Default)]
pub struct NeedleEngine {
    pub needle: Option<Vec<u8>>,
    pub fail_body: bool,
    pub opened: Arc<AtomicUsize>,
    pub finalized: Arc<AtomicUsize>,
    pub connections: Arc<Mutex<Vec<(String, u16, String, u16)>>>,
}

impl NeedleEngine {
    pub fn blocking(needle: &str) -> Self {
        Self {
            needle: Some(needle.as_bytes().to_vec()),
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail_body: true,
            ..Self::default()
        }
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn finalized(&self) -> usize {
        self.finalized.load(Ordering::SeqCst)
    }
}

impl RuleEngine for NeedleEngine {
    type Transaction = NeedleTransaction;

    fn new_transaction(&self) -> NeedleTransaction {
        self.opened.fetch_add(1, Ordering::SeqCst);
        NeedleTransaction {
            engine: self.clone(),
            body: Vec::new(),
            interruption: None,
        }
    }
}

pub struct NeedleTransaction {
    engine: NeedleEngine,
    body: Vec<u8>,
    interruption: Option<Interruption>,
}

impl EngineTransaction for NeedleTransaction {
    fn process_connection(&mut self, client_ip: &str, client_port: u16, host: &str, port: u16) {
        self.engine.connections.lock().unwrap().push((
            client_ip.to_string(),
            client_port,
            host.to_string(),
            port,
        ));
    }

    fn process_uri(&mut self, _uri: &str, _method: &str, _protocol: &str) {}

    fn add_request_header(&mut self, _name: &str, _value: &str) {}

    fn process_request_headers(&mut self) {}

    fn write_request_body(&mut self, chunk: &[u8]) -> Result<(), EngineError> {
        if self.engine.fail_body {
            return Err(EngineError::Internal("body buffer unavailable".to_string()));
        }
        self.body.extend_from_slice(chunk);
        Ok(())
    }

    fn process_request_body(&mut self) -> Result<(), EngineError> {
        if let Some(needle) = &self.engine.needle {
            if !needle.is_empty() && self.body.windows(needle.len()).any(|w| w == needle.as_slice()) {
                self.interruption = Some(Interruption::new(Some("needle".to_string()), "needle found"));
            }
        }
        Ok(())
    }

    fn interruption(&self) -> Option<Interruption> {
        self.interruption.clone()
    }

    fn process_logging(&mut self) {
        self.engine.finalized.fetch_add(1, Ordering::SeqCst);
    }
}

/// A body stream that delivers a few bytes and then breaks.
pub struct TruncatedBody {
    sent: bool,
}

impl TruncatedBody {
    pub fn new() -> Self {
        Self { sent: false }
    }
}

impl io::Read for TruncatedBody {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.sent {
            return Err(io::Error::new(io::ErrorKind::ConnectionReset, "stream truncated"));
        }
        self.sent = true;
        let chunk = b"{\"a\":";
        let n = chunk.len().min(buf.len());
        buf[..n].copy_from_slice(&chunk[..n]);
        Ok(n)
    }
}

pub fn post<B>(headers: &[(&str, &str)], body: B) -> InboundRequest<B> {
    request("POST", headers, body)
}

pub fn request<B>(method: &str, headers: &[(&str, &str)], body: B) -> InboundRequest<B> {
    InboundRequest {
        method: HttpMethod::from(method),
        url: "/validate?probe=1".to_string(),
        protocol: "HTTP/1.1".to_string(),
        remote_addr: "203.0.113.9:52100".to_string(),
        host: "gateway.local".to_string(),
        tls: false,
        headers: headers.iter().copied().collect::<Headers>(),
        body,
    }
}
