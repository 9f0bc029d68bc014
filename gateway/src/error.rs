//! Startup errors for the gateway.
//!
//! Everything here is fatal: the binary logs it and exits. Per-request
//! failures never use these types; they go through `validation_core`.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot determine working directory: {0}")]
    WorkingDir(#[source] std::io::Error),

    #[error("main rules file not found at {}; expected <rules-dir>/rules/main.conf", .0.display())]
    MissingRulesFile(PathBuf),

    #[error("cannot read rules file {}: {source}", .path.display())]
    ReadRules {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("rules line {line}: {message}")]
    Syntax { line: usize, message: String },

    #[error("rules line {line}: schema `{file}` is outside the schemas directory")]
    SchemaPath { line: usize, file: String },

    #[error("rules line {line}: cannot read schema {}: {source}", .path.display())]
    ReadSchema {
        line: usize,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("rules line {line}: invalid schema {}: {message}", .path.display())]
    Schema {
        line: usize,
        path: PathBuf,
        message: String,
    },

    #[error("rules line {line}: invalid pattern: {source}")]
    Pattern {
        line: usize,
        #[source]
        source: regex::Error,
    },
}
