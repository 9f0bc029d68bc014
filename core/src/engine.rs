//! Contract between the pipeline and an inspection engine.
//!
//! # Design
//! The engine is consumed as a capability set: it can open transactions, and
//! a transaction accepts facts phase by phase, reports whether a rule
//! interrupted it, and is finalized once. Any engine satisfying these traits
//! can be plugged in, including the stubs the tests use.
//!
//! `RuleEngine` must be `Send + Sync` because one engine handle is shared by
//! every concurrent worker. `EngineTransaction` is only `Send`: it moves to
//! the worker that owns it and is never shared.

use crate::error::EngineError;

/// Details reported by an engine when a rule stops a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interruption {
    /// Identifier of the rule that matched, when the engine tracks one.
    pub rule_id: Option<String>,
    /// Human-readable reason, for server-side logs only.
    pub reason: String,
}

impl Interruption {
    pub fn new(rule_id: Option<String>, reason: impl Into<String>) -> Self {
        Self {
            rule_id,
            reason: reason.into(),
        }
    }
}

/// Factory for per-request transactions.
pub trait RuleEngine: Send + Sync {
    type Transaction: EngineTransaction;

    fn new_transaction(&self) -> Self::Transaction;
}

/// One inspection session, fed in the order the methods are declared.
pub trait EngineTransaction: Send {
    fn process_connection(
        &mut self,
        client_ip: &str,
        client_port: u16,
        server_host: &str,
        server_port: u16,
    );

    fn process_uri(&mut self, uri: &str, method: &str, protocol: &str);

    fn add_request_header(&mut self, name: &str, value: &str);

    /// Signals that every header has been added.
    fn process_request_headers(&mut self);

    /// Buffers body bytes. An `Err` is an engine failure, not a policy match.
    fn write_request_body(&mut self, chunk: &[u8]) -> Result<(), EngineError>;

    /// Signals that the whole body has been written.
    fn process_request_body(&mut self) -> Result<(), EngineError>;

    /// The interruption raised so far, if any.
    fn interruption(&self) -> Option<Interruption>;

    fn is_interrupted(&self) -> bool {
        self.interruption().is_some()
    }

    /// Closes the transaction. Called exactly once, on every exit path.
    fn process_logging(&mut self);
}
