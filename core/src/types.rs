//! Verdicts and outcomes produced by the pipeline.

use crate::engine::Interruption;
use crate::error::StageError;

/// Result of a completed transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Allowed,
    /// A rule interrupted the transaction. The interruption is for logs and
    /// never reaches the client.
    Blocked(Interruption),
}

/// Everything the formatter knows how to render.
#[derive(Debug)]
pub enum Outcome {
    MethodNotAllowed,
    Failed(StageError),
    Decided(Verdict),
}

impl From<Result<Verdict, StageError>> for Outcome {
    fn from(result: Result<Verdict, StageError>) -> Self {
        match result {
            Ok(verdict) => Outcome::Decided(verdict),
            Err(err) => Outcome::Failed(err),
        }
    }
}
