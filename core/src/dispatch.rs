//! Top-level request handling.
//!
//! `Dispatcher` holds the shared engine handle and turns one inbound request
//! into one `OutcomeResponse`. It is the only place that opens transactions,
//! and every transaction it opens is dropped (and so finalized) before
//! `handle` returns.

use std::io::Read;

use tracing::{debug, error, info, warn};

use crate::engine::RuleEngine;
use crate::format::format;
use crate::http::{HttpMethod, InboundRequest, OutcomeResponse, ResponsePreference};
use crate::negotiate::negotiate;
use crate::orchestrator;
use crate::transaction::Transaction;
use crate::types::{Outcome, Verdict};

#[derive(Debug, Clone)]
pub struct Dispatcher<E> {
    engine: E,
}

impl<E: RuleEngine> Dispatcher<E> {
    pub fn new(engine: E) -> Self {
        Self { engine }
    }

    #[cfg(test)]
    pub(crate) fn engine(&self) -> &E {
        &self.engine
    }

    pub fn handle<B: Read>(&self, mut request: InboundRequest<B>) -> OutcomeResponse {
        if request.method != HttpMethod::Post {
            debug!(method = %request.method, "rejected non-POST request");
            return format(&Outcome::MethodNotAllowed, ResponsePreference::PlainText);
        }

        let preference = negotiate(&request.headers);
        let content_type = request.headers.get("content-type").unwrap_or_default().to_string();

        let mut tx = Transaction::open(&self.engine, &request);
        let tx_id = tx.id();
        let result = orchestrator::run(&mut tx, &mut request);
        tx.finish();

        match &result {
            Ok(Verdict::Allowed) => {
                info!(%tx_id, %content_type, "request passed validation");
            }
            Ok(Verdict::Blocked(interruption)) => {
                warn!(
                    %tx_id,
                    %content_type,
                    rule_id = interruption.rule_id.as_deref().unwrap_or("-"),
                    reason = %interruption.reason,
                    "request blocked by security policy"
                );
            }
            Err(err) => {
                error!(%tx_id, stage = %err.stage, error = %err.source, "request failed");
            }
        }

        format(&Outcome::from(result), preference)
    }
}
