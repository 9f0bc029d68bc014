//! HTTP request and response types for the inspection pipeline.
//!
//! # Design
//! These types describe one inbound request and one outcome as plain data.
//! The core never touches the network: the host (the gateway crate, or a
//! test) builds an `InboundRequest` from whatever framework it runs on and
//! writes the returned `OutcomeResponse` back to the client. The body stays a
//! blocking reader so a broken stream is only discovered during the body
//! phase, after connection, URI and header facts were already fed.

use std::fmt;
use std::io::Read;

/// HTTP method of an inbound request.
///
/// Methods the pipeline does not care about individually are kept verbatim
/// in `Other` so they can still be logged and rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Head,
    Post,
    Put,
    Patch,
    Delete,
    Options,
    Other(String),
}

impl HttpMethod {
    pub fn as_str(&self) -> &str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Head => "HEAD",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Other(method) => method,
        }
    }
}

impl From<&str> for HttpMethod {
    fn from(method: &str) -> Self {
        match method {
            "GET" => HttpMethod::Get,
            "HEAD" => HttpMethod::Head,
            "POST" => HttpMethod::Post,
            "PUT" => HttpMethod::Put,
            "PATCH" => HttpMethod::Patch,
            "DELETE" => HttpMethod::Delete,
            "OPTIONS" => HttpMethod::Options,
            other => HttpMethod::Other(other.to_string()),
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered header multimap with case-insensitive name lookup.
///
/// Entries keep their arrival order, so repeated values of one name stay in
/// the order the client sent them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a value; existing values for the same name are kept.
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    /// First value of `name`, compared case-insensitively.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// All values of `name` in arrival order.
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.entries
            .iter()
            .filter(move |(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<N: Into<String>, V: Into<String>> FromIterator<(N, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(|(n, v)| (n.into(), v.into())).collect(),
        }
    }
}

/// Snapshot of one inbound HTTP request.
///
/// `remote_addr` is the raw peer address as the listener reported it
/// (`host:port`, `[v6]:port`, or a bare socket path); it is parsed when the
/// transaction is opened. `host` is the destination the client addressed.
#[derive(Debug)]
pub struct InboundRequest<B> {
    pub method: HttpMethod,
    pub url: String,
    pub protocol: String,
    pub remote_addr: String,
    pub host: String,
    pub tls: bool,
    pub headers: Headers,
    pub body: B,
}

impl<B: Read> InboundRequest<B> {
    /// Drains the body into memory.
    pub fn read_body(&mut self) -> std::io::Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.body.read_to_end(&mut buf)?;
        Ok(buf)
    }
}

/// Response representation chosen for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponsePreference {
    Json,
    PlainText,
}

impl ResponsePreference {
    pub fn content_type(self) -> &'static str {
        match self {
            ResponsePreference::Json => "application/json",
            ResponsePreference::PlainText => "text/plain",
        }
    }
}

/// Final status, content type and body handed back to the HTTP layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutcomeResponse {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
}
