//! Reference rule engine backed by a line-oriented directive file.
//!
//! # Format
//! ```text
//! # comments and blank lines are ignored
//! deny <id> <TARGET> <regex>     interrupt when the regex matches TARGET
//! require-json <id>              interrupt when a JSON content type carries a non-JSON body
//! require-header <id> <name>     interrupt when the header is absent
//! validate-schema <id> <file>    interrupt when the body does not satisfy a JSON Schema
//! body-limit <bytes>             fail body submission above this size
//! ```
//! Schema files are resolved against the schemas directory and compiled
//! (draft 7) when the rules load, so a bad schema stops startup.
//! Targets: `METHOD`, `URI`, `PROTOCOL`, `REMOTE_ADDR`, `HEADERS` (each
//! `name: value` line), `HEADER:<name>`, `BODY`.
//!
//! Header-side rules run when headers complete, body-side rules when the
//! body completes. The first match interrupts and later rules are skipped.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use jsonschema::{Draft, JSONSchema};
use regex::Regex;
use tracing::{debug, info};
use validation_core::{EngineError, EngineTransaction, Interruption, RuleEngine};

use crate::error::ConfigError;
use crate::schemas::confine;

#[derive(Debug, Clone)]
enum Target {
    Method,
    Uri,
    Protocol,
    RemoteAddr,
    Headers,
    Header(String),
    Body,
}

#[derive(Clone)]
struct Schema {
    file: String,
    compiled: Arc<JSONSchema>,
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema").field("file", &self.file).finish_non_exhaustive()
    }
}

impl Schema {
    fn load(schemas_dir: &Path, file: &str, line: usize) -> Result<Self, ConfigError> {
        let path = confine(schemas_dir, file).ok_or_else(|| ConfigError::SchemaPath {
            line,
            file: file.to_string(),
        })?;
        let src = std::fs::read_to_string(&path).map_err(|source| ConfigError::ReadSchema {
            line,
            path: path.clone(),
            source,
        })?;
        let invalid = |message: String| ConfigError::Schema {
            line,
            path: path.clone(),
            message,
        };
        let doc: serde_json::Value = serde_json::from_str(&src).map_err(|err| invalid(err.to_string()))?;
        let compiled = JSONSchema::options()
            .with_draft(Draft::Draft7)
            .compile(&doc)
            .map_err(|err| invalid(err.to_string()))?;
        debug!(path = %path.display(), "schema compiled");
        Ok(Self {
            file: file.to_string(),
            compiled: Arc::new(compiled),
        })
    }

    /// Returns the first violation, if any.
    fn violation(&self, body: &[u8]) -> Option<String> {
        let instance = match serde_json::from_slice::<serde_json::Value>(body) {
            Ok(instance) => instance,
            Err(err) => return Some(format!("body is not valid JSON for {}: {err}", self.file)),
        };
        let first = match self.compiled.validate(&instance) {
            Ok(()) => None,
            Err(mut errors) => errors.next().map(|err| err.to_string()),
        };
        first.map(|err| format!("{} violated: {err}", self.file))
    }
}

#[derive(Debug, Clone)]
enum Check {
    Deny { target: Target, pattern: Regex },
    RequireJson,
    RequireHeader(String),
    ValidateSchema(Schema),
}

#[derive(Debug, Clone)]
struct Rule {
    id: String,
    check: Check,
}

impl Rule {
    fn inspects_body(&self) -> bool {
        matches!(
            self.check,
            Check::RequireJson
                | Check::ValidateSchema(_)
                | Check::Deny {
                    target: Target::Body,
                    ..
                }
        )
    }
}

/// Immutable rule set shared by every worker.
#[derive(Debug, Clone)]
pub struct RuleSet {
    rules: Arc<[Rule]>,
    body_limit: Option<usize>,
}

impl RuleSet {
    pub fn from_file(path: &Path, schemas_dir: &Path) -> Result<Self, ConfigError> {
        let src = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadRules {
            path: path.to_path_buf(),
            source,
        })?;
        let rules = Self::parse(&src, schemas_dir)?;
        info!(path = %path.display(), rules = rules.len(), "rules loaded");
        Ok(rules)
    }

    /// Parses directives; `validate-schema` files are read from `schemas_dir`.
    pub fn parse(src: &str, schemas_dir: &Path) -> Result<Self, ConfigError> {
        let mut rules = Vec::new();
        let mut body_limit = None;

        for (idx, raw) in src.lines().enumerate() {
            let line = idx + 1;
            let text = raw.trim();
            if text.is_empty() || text.starts_with('#') {
                continue;
            }
            let syntax = |message: &str| ConfigError::Syntax {
                line,
                message: message.to_string(),
            };

            let (directive, rest) = next_token(text).ok_or_else(|| syntax("empty directive"))?;
            match directive {
                "deny" => {
                    let (id, rest) = next_token(rest).ok_or_else(|| syntax("deny needs an id"))?;
                    let (target, pattern) =
                        next_token(rest).ok_or_else(|| syntax("deny needs a target"))?;
                    let target = parse_target(target).ok_or_else(|| syntax("unknown target"))?;
                    if pattern.is_empty() {
                        return Err(syntax("deny needs a pattern"));
                    }
                    let pattern =
                        Regex::new(pattern).map_err(|source| ConfigError::Pattern { line, source })?;
                    rules.push(Rule {
                        id: id.to_string(),
                        check: Check::Deny { target, pattern },
                    });
                }
                "require-json" => {
                    let (id, _) = next_token(rest).ok_or_else(|| syntax("require-json needs an id"))?;
                    rules.push(Rule {
                        id: id.to_string(),
                        check: Check::RequireJson,
                    });
                }
                "require-header" => {
                    let (id, rest) =
                        next_token(rest).ok_or_else(|| syntax("require-header needs an id"))?;
                    let (name, _) =
                        next_token(rest).ok_or_else(|| syntax("require-header needs a header name"))?;
                    rules.push(Rule {
                        id: id.to_string(),
                        check: Check::RequireHeader(name.to_string()),
                    });
                }
                "validate-schema" => {
                    let (id, rest) =
                        next_token(rest).ok_or_else(|| syntax("validate-schema needs an id"))?;
                    let (file, _) =
                        next_token(rest).ok_or_else(|| syntax("validate-schema needs a schema file"))?;
                    rules.push(Rule {
                        id: id.to_string(),
                        check: Check::ValidateSchema(Schema::load(schemas_dir, file, line)?),
                    });
                }
                "body-limit" => {
                    let (bytes, _) = next_token(rest).ok_or_else(|| syntax("body-limit needs a size"))?;
                    let bytes = bytes
                        .parse::<usize>()
                        .map_err(|_| syntax("body-limit must be a byte count"))?;
                    body_limit = Some(bytes);
                }
                _ => return Err(syntax(&format!("unknown directive `{directive}`"))),
            }
        }

        Ok(Self {
            rules: rules.into(),
            body_limit,
        })
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn body_limit(&self) -> Option<usize> {
        self.body_limit
    }
}

/// Splits off the first whitespace-delimited token; the remainder is trimmed.
fn next_token(s: &str) -> Option<(&str, &str)> {
    let s = s.trim_start();
    if s.is_empty() {
        return None;
    }
    match s.find(char::is_whitespace) {
        Some(at) => Some((&s[..at], s[at..].trim())),
        None => Some((s, "")),
    }
}

fn parse_target(s: &str) -> Option<Target> {
    if let Some(name) = s.strip_prefix("HEADER:") {
        return (!name.is_empty()).then(|| Target::Header(name.to_string()));
    }
    Some(match s {
        "METHOD" => Target::Method,
        "URI" => Target::Uri,
        "PROTOCOL" => Target::Protocol,
        "REMOTE_ADDR" => Target::RemoteAddr,
        "HEADERS" => Target::Headers,
        "BODY" => Target::Body,
        _ => return None,
    })
}

impl RuleEngine for RuleSet {
    type Transaction = RuleTransaction;

    fn new_transaction(&self) -> RuleTransaction {
        RuleTransaction {
            rules: Arc::clone(&self.rules),
            body_limit: self.body_limit,
            remote_addr: String::new(),
            method: String::new(),
            uri: String::new(),
            protocol: String::new(),
            headers: Vec::new(),
            body: Vec::new(),
            interruption: None,
        }
    }
}

/// Facts collected for one request, evaluated against the shared rules.
pub struct RuleTransaction {
    rules: Arc<[Rule]>,
    body_limit: Option<usize>,
    remote_addr: String,
    method: String,
    uri: String,
    protocol: String,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
    interruption: Option<Interruption>,
}

impl RuleTransaction {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    fn evaluate(&mut self, body_phase: bool) {
        if self.interruption.is_some() {
            return;
        }
        let hit = self
            .rules
            .iter()
            .filter(|rule| rule.inspects_body() == body_phase)
            .find_map(|rule| self.matches(rule).map(|reason| (rule.id.clone(), reason)));
        if let Some((id, reason)) = hit {
            debug!(rule_id = %id, %reason, "rule matched");
            self.interruption = Some(Interruption::new(Some(id), reason));
        }
    }

    /// Returns the reason when `rule` matches.
    fn matches(&self, rule: &Rule) -> Option<String> {
        match &rule.check {
            Check::Deny { target, pattern } => {
                let found = match target {
                    Target::Method => pattern.is_match(&self.method),
                    Target::Uri => pattern.is_match(&self.uri),
                    Target::Protocol => pattern.is_match(&self.protocol),
                    Target::RemoteAddr => pattern.is_match(&self.remote_addr),
                    Target::Headers => self
                        .headers
                        .iter()
                        .any(|(n, v)| pattern.is_match(&format!("{n}: {v}"))),
                    Target::Header(name) => self
                        .headers
                        .iter()
                        .filter(|(n, _)| n.eq_ignore_ascii_case(name))
                        .any(|(_, v)| pattern.is_match(v)),
                    Target::Body => pattern.is_match(&String::from_utf8_lossy(&self.body)),
                };
                found.then(|| format!("{target:?} matched /{}/", pattern.as_str()))
            }
            Check::RequireJson => {
                let is_json = self
                    .header("content-type")
                    .is_some_and(|ct| ct.contains("application/json"));
                if !is_json {
                    return None;
                }
                serde_json::from_slice::<serde_json::Value>(&self.body)
                    .err()
                    .map(|err| format!("body is not valid JSON: {err}"))
            }
            Check::RequireHeader(name) => self
                .header(name)
                .is_none()
                .then(|| format!("missing required header {name}")),
            Check::ValidateSchema(schema) => schema.violation(&self.body),
        }
    }
}

impl EngineTransaction for RuleTransaction {
    fn process_connection(&mut self, client_ip: &str, client_port: u16, _host: &str, _port: u16) {
        self.remote_addr = format!("{client_ip}:{client_port}");
    }

    fn process_uri(&mut self, uri: &str, method: &str, protocol: &str) {
        self.uri = uri.to_string();
        self.method = method.to_string();
        self.protocol = protocol.to_string();
    }

    fn add_request_header(&mut self, name: &str, value: &str) {
        self.headers.push((name.to_string(), value.to_string()));
    }

    fn process_request_headers(&mut self) {
        self.evaluate(false);
    }

    fn write_request_body(&mut self, chunk: &[u8]) -> Result<(), EngineError> {
        if let Some(limit) = self.body_limit {
            if self.body.len() + chunk.len() > limit {
                return Err(EngineError::BodyLimitExceeded { limit });
            }
        }
        self.body.extend_from_slice(chunk);
        Ok(())
    }

    fn process_request_body(&mut self) -> Result<(), EngineError> {
        self.evaluate(true);
        Ok(())
    }

    fn interruption(&self) -> Option<Interruption> {
        self.interruption.clone()
    }

    fn process_logging(&mut self) {
        debug!(
            method = %self.method,
            uri = %self.uri,
            body_bytes = self.body.len(),
            interrupted = self.interruption.is_some(),
            "transaction closed"
        );
    }
}
