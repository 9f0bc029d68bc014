//! Recording stub engine shared by the unit tests.

use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::engine::{EngineTransaction, Interruption, RuleEngine};
use crate::error::EngineError;
use crate::http::{Headers, HttpMethod, InboundRequest};

#[derive(Debug, Clone, Copy, Default)]
pub enum Behaviour {
    #[default]
    Allow,
    Interrupt,
    FailWrite,
    FailProcess,
    /// Panics while the body is written.
    Panic,
}

#[derive(Default)]
pub struct StubEngine {
    pub behaviour: Behaviour,
    calls: Arc<Mutex<Vec<String>>>,
    opened: Arc<AtomicUsize>,
    finalized: Arc<AtomicUsize>,
}

impl StubEngine {
    pub fn with(behaviour: Behaviour) -> Self {
        Self {
            behaviour,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn finalized(&self) -> usize {
        self.finalized.load(Ordering::SeqCst)
    }
}

impl RuleEngine for StubEngine {
    type Transaction = StubTransaction;

    fn new_transaction(&self) -> StubTransaction {
        self.opened.fetch_add(1, Ordering::SeqCst);
        StubTransaction {
            behaviour: self.behaviour,
            calls: Arc::clone(&self.calls),
            finalized: Arc::clone(&self.finalized),
            interrupted: false,
        }
    }
}

pub struct StubTransaction {
    behaviour: Behaviour,
    calls: Arc<Mutex<Vec<String>>>,
    finalized: Arc<AtomicUsize>,
    interrupted: bool,
}

impl StubTransaction {
    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

impl EngineTransaction for StubTransaction {
    fn process_connection(&mut self, client_ip: &str, client_port: u16, host: &str, port: u16) {
        self.record(format!("connection {client_ip} {client_port} {host} {port}"));
    }

    fn process_uri(&mut self, uri: &str, method: &str, protocol: &str) {
        self.record(format!("uri {method} {uri} {protocol}"));
    }

    fn add_request_header(&mut self, name: &str, value: &str) {
        self.record(format!("header {name}: {value}"));
    }

    fn process_request_headers(&mut self) {
        self.record("headers done".to_string());
    }

    fn write_request_body(&mut self, chunk: &[u8]) -> Result<(), EngineError> {
        self.record(format!("body {} bytes", chunk.len()));
        match self.behaviour {
            Behaviour::FailWrite => Err(EngineError::BodyLimitExceeded { limit: 0 }),
            Behaviour::Panic => panic!("stub engine panicked"),
            _ => Ok(()),
        }
    }

    fn process_request_body(&mut self) -> Result<(), EngineError> {
        self.record("body done".to_string());
        match self.behaviour {
            Behaviour::FailProcess => Err(EngineError::Internal("boom".to_string())),
            Behaviour::Interrupt => {
                self.interrupted = true;
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn interruption(&self) -> Option<Interruption> {
        self.interrupted
            .then(|| Interruption::new(Some("stub".to_string()), "stub rule matched"))
    }

    fn process_logging(&mut self) {
        self.record("logging".to_string());
        self.finalized.fetch_add(1, Ordering::SeqCst);
    }
}

/// A body that fails on the first read.
pub struct BrokenBody;

impl io::Read for BrokenBody {
    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::UnexpectedEof, "client went away"))
    }
}

pub fn request(method: &str, body: &'static [u8]) -> InboundRequest<&'static [u8]> {
    with_body(method, body)
}

pub fn with_body<B>(method: &str, body: B) -> InboundRequest<B> {
    InboundRequest {
        method: HttpMethod::from(method),
        url: "/validate".to_string(),
        protocol: "HTTP/1.1".to_string(),
        remote_addr: "127.0.0.1:40000".to_string(),
        host: "localhost:8080".to_string(),
        tls: false,
        headers: [("Content-Type", "application/json")].into_iter().collect::<Headers>(),
        body,
    }
}
