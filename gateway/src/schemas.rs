//! Read-only file route for schema documents.
//!
//! A requested path must stay under the schemas root twice over: lexically
//! (no absolute paths, no `..` climbing above the root) and after symlinks
//! are resolved (the canonical file must start with the canonical root).

use std::io;
use std::path::{Component, Path, PathBuf};

use axum::extract::{Path as UrlPath, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use tracing::{debug, error};

use crate::AppState;

/// Joins `requested` onto `root` without ever leaving it.
///
/// Returns `None` when the path is absolute or climbs above the root.
pub fn confine(root: &Path, requested: &str) -> Option<PathBuf> {
    let mut relative = PathBuf::new();
    for component in Path::new(requested).components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                if !relative.pop() {
                    return None;
                }
            }
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(root.join(relative))
}

fn content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => "application/json",
        _ => "text/plain",
    }
}

fn invalid_path() -> Response {
    (StatusCode::BAD_REQUEST, "Invalid path\n").into_response()
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "404 page not found\n").into_response()
}

pub async fn schema<E>(State(state): State<AppState<E>>, UrlPath(requested): UrlPath<String>) -> Response {
    let Some(candidate) = confine(&state.schemas_dir, &requested) else {
        debug!(%requested, "schema path escapes root");
        return invalid_path();
    };

    let (root, file) = match tokio::try_join!(
        tokio::fs::canonicalize(&state.schemas_dir),
        tokio::fs::canonicalize(&candidate)
    ) {
        Ok(paths) => paths,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return not_found(),
        Err(err) => {
            error!(path = %candidate.display(), error = %err, "cannot resolve schema path");
            return not_found();
        }
    };
    if !file.starts_with(&root) {
        debug!(%requested, resolved = %file.display(), "schema symlink escapes root");
        return invalid_path();
    }

    match tokio::fs::metadata(&file).await {
        Ok(meta) if meta.is_file() => {}
        _ => return not_found(),
    }

    match tokio::fs::read(&file).await {
        Ok(contents) => {
            debug!(path = %file.display(), "serving schema file");
            ([(header::CONTENT_TYPE, content_type(&file))], contents).into_response()
        }
        Err(err) => {
            error!(path = %file.display(), error = %err, "cannot read schema file");
            not_found()
        }
    }
}
