//! Preview server implementation.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Request, State,
    },
    http::{header, HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tower_http::services::ServeDir;

use plinth_static::{SiteBuilder, SiteConfig};

use crate::redirect;
use crate::reload::{reload_client_script, ReloadHub, ReloadMessage};
use crate::watcher::{FileWatcher, WatchEvent};

/// WebSocket endpoint for reload notifications.
pub const RELOAD_WS_PATH: &str = "/__reload";

/// URL of the injected client script.
pub const RELOAD_SCRIPT_PATH: &str = "/__reload.js";

/// Configuration for the preview server.
#[derive(Debug, Clone)]
pub struct PreviewConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Open browser on start
    pub open: bool,

    /// Watch the input tree and rebuild on change
    pub watch: bool,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            open: true,
            watch: true,
        }
    }
}

/// Errors that can occur with the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Invalid address {0}:{1}")]
    Address(String, u16),

    #[error("Failed to bind to {0}: {1}")]
    Bind(SocketAddr, String),

    #[error("File watch error: {0}")]
    Watch(String),
}

/// Shared server state.
pub struct ServerState {
    /// Landing path of the default locale, target of the root redirect.
    pub locale_home: String,

    /// Live reload hub.
    pub hub: ReloadHub,
}

/// Preview server serving the built site with live reload.
pub struct PreviewServer {
    site: SiteConfig,
    config: PreviewConfig,
}

impl PreviewServer {
    /// Create a new preview server for a site.
    pub fn new(site: SiteConfig, config: PreviewConfig) -> Self {
        Self { site, config }
    }

    /// Start the server. Runs until the process is stopped.
    pub async fn start(self) -> Result<(), ServerError> {
        let addr: SocketAddr = format!("{}:{}", self.config.host, self.config.port)
            .parse()
            .map_err(|_| ServerError::Address(self.config.host.clone(), self.config.port))?;

        let state = Arc::new(ServerState {
            locale_home: self.site.locale_home(),
            hub: ReloadHub::new(),
        });

        if self.config.watch {
            let (watcher, mut rx) = FileWatcher::new(&[self.site.input_dir.clone()])
                .map_err(|e| ServerError::Watch(e.to_string()))?;

            let site = self.site.clone();
            let hub = state.hub.clone();
            tokio::spawn(async move {
                let builder = SiteBuilder::new(site);
                while let Some(event) = rx.recv().await {
                    handle_watch_event(&builder, &hub, event).await;
                }
                // Keep watcher alive
                drop(watcher);
            });
        }

        let app = router(self.site.output_dir.clone(), Arc::clone(&state));

        tracing::info!(
            "Serving {} at http://{}",
            self.site.output_dir.display(),
            addr
        );

        if self.config.open {
            let url = format!("http://{}", addr);
            let _ = open::that(&url);
        }

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Bind(addr, e.to_string()))?;

        axum::serve(listener, app)
            .await
            .map_err(|e| ServerError::Bind(addr, e.to_string()))?;

        Ok(())
    }
}

/// Build the router: reload endpoints, static files, and the middleware pair
/// for the root redirect and script injection.
fn router(output_dir: PathBuf, state: Arc<ServerState>) -> Router {
    Router::new()
        .route(RELOAD_WS_PATH, get(ws_handler))
        .route(RELOAD_SCRIPT_PATH, get(script_handler))
        .fallback_service(ServeDir::new(output_dir))
        .layer(middleware::from_fn(inject_reload_script))
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            redirect::locale_redirect,
        ))
        .with_state(state)
}

/// Rebuild the site after a change, notifying clients on success.
///
/// A failing rebuild keeps the last good output on disk and keeps serving it.
async fn handle_watch_event(builder: &SiteBuilder, hub: &ReloadHub, event: WatchEvent) {
    match &event {
        WatchEvent::StyleChanged(path) => {
            tracing::info!("Stylesheet changed: {}", path.display());
        }
        WatchEvent::TemplateChanged(path) => {
            tracing::info!("Template changed: {}", path.display());
        }
        WatchEvent::Created(path) => tracing::info!("Created: {}", path.display()),
        WatchEvent::Deleted(path) => tracing::info!("Deleted: {}", path.display()),
        WatchEvent::Modified(path) => tracing::info!("Modified: {}", path.display()),
    }

    match builder.build().await {
        Ok(result) => {
            tracing::info!("Rebuilt {} pages in {}ms", result.pages, result.duration_ms);
            hub.send(ReloadMessage::Reload);
        }
        Err(e) => {
            tracing::error!("Rebuild failed: {e}");
        }
    }
}

/// Handler for the reload WebSocket endpoint.
async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<ServerState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws(socket, state))
}

/// Handle a WebSocket connection.
async fn handle_ws(mut socket: WebSocket, state: Arc<ServerState>) {
    let mut rx = state.hub.subscribe();

    let Ok(msg) = serde_json::to_string(&ReloadMessage::Connected) else {
        return;
    };
    if socket.send(Message::Text(msg.into())).await.is_err() {
        return;
    }

    while let Ok(reload) = rx.recv().await {
        let Ok(json) = serde_json::to_string(&reload) else {
            continue;
        };
        if socket.send(Message::Text(json.into())).await.is_err() {
            break;
        }
    }
}

/// Handler for the reload client script.
async fn script_handler() -> impl IntoResponse {
    (
        [("content-type", "application/javascript")],
        reload_client_script(RELOAD_WS_PATH),
    )
}

/// Append the reload script tag to HTML responses.
async fn inject_reload_script(request: Request, next: Next) -> Response {
    let response = next.run(request).await;

    let is_html = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("text/html"));
    if !is_html {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!("Failed to buffer response body: {e}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let mut html = bytes.to_vec();
    html.extend_from_slice(format!("\n<script src=\"{RELOAD_SCRIPT_PATH}\"></script>").as_bytes());
    parts
        .headers
        .insert(header::CONTENT_LENGTH, HeaderValue::from(html.len() as u64));

    Response::from_parts(parts, Body::from(html))
}
