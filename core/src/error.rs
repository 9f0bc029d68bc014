//! Error types for the inspection pipeline.
//!
//! # Design
//! A policy rejection is not an error: it is a `Verdict`. Errors here are
//! infrastructure failures that end one request with a 500. `StageError`
//! records which stage failed so the formatter can pick the client message
//! while the source error is only ever logged.

use std::fmt;

use thiserror::Error;

/// Failures raised by an engine while it processes a transaction.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The body grew past the engine's configured limit.
    #[error("request body exceeds engine limit of {limit} bytes")]
    BodyLimitExceeded { limit: usize },

    /// Any other engine-internal failure.
    #[error("engine failure: {0}")]
    Internal(String),
}

/// Pipeline stage at which a request failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// The request body could not be read from the client.
    BodyRead,
    /// The engine failed while taking or finishing the body.
    BodyProcess,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::BodyRead => write!(f, "body read"),
            Stage::BodyProcess => write!(f, "body process"),
        }
    }
}

/// Underlying cause of a stage failure.
#[derive(Debug, Error)]
pub enum StageCause {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// A stage failure together with its underlying cause.
#[derive(Debug, Error)]
#[error("{stage} failed: {source}")]
pub struct StageError {
    pub stage: Stage,
    #[source]
    pub source: StageCause,
}

impl StageError {
    pub fn body_read(source: std::io::Error) -> Self {
        Self {
            stage: Stage::BodyRead,
            source: StageCause::Io(source),
        }
    }

    pub fn body_process(source: EngineError) -> Self {
        Self {
            stage: Stage::BodyProcess,
            source: StageCause::Engine(source),
        }
    }
}
