// src/serve/mod.rs

//! Live-reload preview server.
//!
//! - [`events`] broadcasts reload and error events to clients.
//! - [`livereload`] holds the browser script and HTML injection.
//! - [`server`] is the axum app: static files, the script and the
//!   Server-Sent Events stream.

pub mod events;
pub mod livereload;
pub mod server;

pub use events::{ReloadEvent, ReloadHub};
pub use livereload::{EVENTS_PATH, SCRIPT_PATH, inject_script};
pub use server::{PreviewServer, router};
