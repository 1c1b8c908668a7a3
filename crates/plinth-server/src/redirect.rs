//! Root redirect to the default locale's landing page.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::server::ServerState;

/// Compute the redirect target for a request path.
///
/// Only the bare site root redirects; every other path, including `/index.html`
/// and paths that do not exist, is left to the file service.
pub fn redirect_target(path: &str, locale_home: &str) -> Option<String> {
    (path == "/").then(|| locale_home.to_string())
}

/// Middleware answering `/` with a 302 to the default locale.
pub async fn locale_redirect(
    State(state): State<Arc<ServerState>>,
    request: Request,
    next: Next,
) -> Response {
    if let Some(target) = redirect_target(request.uri().path(), &state.locale_home) {
        return (StatusCode::FOUND, [(header::LOCATION, target)]).into_response();
    }
    next.run(request).await
}
