//! HTTP front end for the inspection pipeline.
//!
//! Routes:
//! - `/validate`: every method goes to the dispatcher, which answers 405 for
//!   anything but POST.
//! - `GET /schemas/{*path}`: schema documents from the configured directory.
//! - `GET /`: endpoint listing and active rules file.

pub mod config;
pub mod error;
pub mod rules;
pub mod schemas;
pub mod validate;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::State;
use axum::routing::{any, get};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use validation_core::{Dispatcher, RuleEngine};

pub use config::{Config, Settings};
pub use error::ConfigError;
pub use rules::RuleSet;

/// Shared, read-only state handed to every handler.
pub struct AppState<E = RuleSet> {
    pub dispatcher: Arc<Dispatcher<E>>,
    pub rules_file: PathBuf,
    pub schemas_dir: PathBuf,
    pub port: u16,
    pub max_body_bytes: usize,
}

impl<E> Clone for AppState<E> {
    fn clone(&self) -> Self {
        Self {
            dispatcher: Arc::clone(&self.dispatcher),
            rules_file: self.rules_file.clone(),
            schemas_dir: self.schemas_dir.clone(),
            port: self.port,
            max_body_bytes: self.max_body_bytes,
        }
    }
}

impl<E: RuleEngine> AppState<E> {
    pub fn new(engine: E, settings: &Settings) -> Self {
        Self {
            dispatcher: Arc::new(Dispatcher::new(engine)),
            rules_file: settings.rules_file.clone(),
            schemas_dir: settings.schemas_dir.clone(),
            port: settings.port,
            max_body_bytes: settings.max_body_bytes,
        }
    }
}

pub fn app<E: RuleEngine + 'static>(state: AppState<E>) -> Router {
    Router::new()
        .route("/", get(index::<E>))
        .route("/validate", any(validate::validate::<E>))
        .route("/schemas/{*path}", get(schemas::schema::<E>))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run<E: RuleEngine + 'static>(
    listener: TcpListener,
    state: AppState<E>,
) -> Result<(), std::io::Error> {
    axum::serve(
        listener,
        app(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
}

async fn index<E>(State(state): State<AppState<E>>) -> String {
    format!(
        "
Schema Validation Gateway

Available Endpoints:
- POST /validate (request body and headers are inspected)
- GET /schemas/<file> (relative to the configured schemas directory)

Example:
  curl -X POST -H \"Content-Type: application/json\" --data @valid_user.json http://localhost:{port}/validate

Listening on port {port}. Rules loaded from: {rules}
",
        port = state.port,
        rules = state.rules_file.display(),
    )
}
