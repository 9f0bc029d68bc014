//! Request inspection pipeline for the validation gateway.
//!
//! # Overview
//! Turns one inbound HTTP request into one verdict-shaped response. The
//! request is decomposed into the facts an inspection engine expects
//! (connection, URI, headers, body), fed through a transaction in that order,
//! and the engine's pass/interrupt answer is rendered as JSON or plain text.
//!
//! # Design
//! - The engine is a trait pair (`RuleEngine`, `EngineTransaction`); the
//!   core ships no engine of its own.
//! - `Transaction` finalizes in `Drop`, so every exit path logs it once.
//! - No network I/O and no async runtime: the host builds an
//!   `InboundRequest` and writes back the `OutcomeResponse`.

pub mod dispatch;
pub mod engine;
pub mod error;
pub mod format;
pub mod http;
pub mod negotiate;
pub mod orchestrator;
pub mod transaction;
pub mod types;

#[cfg(test)]
mod testing;

pub use dispatch::Dispatcher;
pub use engine::{EngineTransaction, Interruption, RuleEngine};
pub use error::{EngineError, Stage, StageCause, StageError};
pub use format::format;
pub use http::{Headers, HttpMethod, InboundRequest, OutcomeResponse, ResponsePreference};
pub use negotiate::negotiate;
pub use transaction::{split_remote_addr, ConnectionInfo, Phase, Transaction};
pub use types::{Outcome, Verdict};
