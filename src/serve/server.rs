// src/serve/server.rs

use std::net::SocketAddr;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::Router;
use axum::extract::{Request, State};
use axum::http::{StatusCode, header};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use futures::stream::{self, Stream};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, oneshot};
use tower::ServiceExt;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::errors::Result;
use crate::serve::events::ReloadHub;
use crate::serve::livereload::{CLIENT_SCRIPT, EVENTS_PATH, SCRIPT_PATH, inject_script};

#[derive(Debug, Clone)]
struct ServerState {
    root: Arc<PathBuf>,
    hub: ReloadHub,
}

/// Build the preview router serving `root`.
pub fn router(root: impl Into<PathBuf>, hub: ReloadHub) -> Router {
    let state = ServerState {
        root: Arc::new(root.into()),
        hub,
    };

    Router::new()
        .route(EVENTS_PATH, get(events))
        .route(SCRIPT_PATH, get(client_script))
        .fallback(static_file)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn client_script() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/javascript; charset=utf-8")],
        CLIENT_SCRIPT,
    )
}

async fn events(
    State(state): State<ServerState>,
) -> Sse<impl Stream<Item = std::result::Result<Event, axum::Error>>> {
    let rx = state.hub.subscribe();
    debug!(clients = state.hub.client_count(), "preview client connected");

    let stream = stream::unfold(rx, |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(event) => return Some((Event::default().json_data(&event), rx)),
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!(missed, "preview client fell behind; skipping events");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// Map a request path to a file under `root`, refusing to leave it.
fn resolve(root: &Path, uri_path: &str) -> Option<PathBuf> {
    let rel = Path::new(uri_path.trim_start_matches('/'));
    if rel
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
    {
        return None;
    }

    let mut path = root.join(rel);
    if uri_path.ends_with('/') || path.is_dir() {
        path.push("index.html");
    }
    Some(path)
}

fn is_html(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("html" | "htm")
    )
}

async fn static_file(State(state): State<ServerState>, req: Request) -> Response {
    let Some(path) = resolve(&state.root, req.uri().path()) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    if is_html(&path) {
        if let Ok(bytes) = tokio::fs::read(&path).await {
            let html = String::from_utf8_lossy(&bytes);
            return Html(inject_script(&html)).into_response();
        }
    }

    match ServeDir::new(state.root.as_ref()).oneshot(req).await {
        Ok(res) => res.into_response(),
        Err(never) => match never {},
    }
}

/// A running preview server.
#[derive(Debug)]
pub struct PreviewServer {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    handle: tokio::task::JoinHandle<()>,
}

impl PreviewServer {
    /// Bind `host:port` and start serving `root`.
    ///
    /// Binding happens before this returns, so an address in use fails here.
    pub async fn start(host: &str, port: u16, root: PathBuf, hub: ReloadHub) -> Result<Self> {
        let listener = TcpListener::bind((host, port))
            .await
            .with_context(|| format!("binding preview server on {host}:{port}"))?;
        let addr = listener
            .local_addr()
            .context("reading preview server address")?;

        info!("preview server listening on http://{} serving {:?}", addr, root);

        let app = router(root, hub);
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            let res = axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await;
            if let Err(e) = res {
                warn!(error = %e, "preview server stopped with error");
            }
        });

        Ok(Self {
            addr,
            shutdown: Some(shutdown_tx),
            handle,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Stop accepting connections. Open event streams never end on their own,
    /// so the server is aborted if it has not drained after a short grace
    /// period.
    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }

        let abort = self.handle.abort_handle();
        if tokio::time::timeout(Duration::from_secs(1), &mut self.handle)
            .await
            .is_err()
        {
            debug!("preview server did not drain in time; aborting");
            abort.abort();
        }
        info!("preview server stopped");
    }
}
