//! Preview server with live reload for plinth sites.
//!
//! Serves the built output directory, redirects the bare root to the default
//! locale's landing page, watches the input tree for changes, and pushes
//! reload messages to connected browsers over a WebSocket.

pub mod redirect;
pub mod reload;
pub mod server;
pub mod watcher;

pub use redirect::redirect_target;
pub use reload::{ReloadHub, ReloadMessage};
pub use server::{
    PreviewConfig, PreviewServer, ServerError, ServerState, RELOAD_SCRIPT_PATH, RELOAD_WS_PATH,
};
pub use watcher::{FileWatcher, WatchEvent};
