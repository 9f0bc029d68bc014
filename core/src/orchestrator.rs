//! Drives one transaction through the inspection phases.
//!
//! # Design
//! `run` is the only code that touches a transaction's phase methods, and it
//! calls them in one straight line: connection, URI, headers, body. The body
//! is read only after the header phase has completed, so an engine that
//! rejects on headers still sees the full header set first. Read and engine
//! failures end the run with a `StageError`; a matched rule ends it with
//! `Verdict::Blocked`. Finalization is left to the transaction guard.

use std::io::Read;

use tracing::debug;

use crate::engine::EngineTransaction;
use crate::error::StageError;
use crate::http::InboundRequest;
use crate::transaction::Transaction;
use crate::types::Verdict;

pub fn run<T, B>(tx: &mut Transaction<T>, request: &mut InboundRequest<B>) -> Result<Verdict, StageError>
where
    T: EngineTransaction,
    B: Read,
{
    tx.feed_connection();
    tx.feed_uri(&request.url, request.method.as_str(), &request.protocol);
    tx.feed_headers(&request.headers);

    let body = request.read_body().map_err(StageError::body_read)?;
    debug!(tx_id = %tx.id(), bytes = body.len(), "request body read");

    tx.feed_body(&body).map_err(StageError::body_process)?;

    Ok(match tx.interruption() {
        Some(interruption) => Verdict::Blocked(interruption),
        None => Verdict::Allowed,
    })
}
