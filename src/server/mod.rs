//! HTTP front end.
//!
//! Routes:
//! - `GET /` - Upload page
//! - `POST /upload` - Process a survey image and render its map
//! - `GET /map` - The most recently rendered map
//! - `GET /map/:id` - A specific map
//! - `GET /health` - Liveness check

use std::{collections::VecDeque, net::SocketAddr, num::NonZeroUsize, sync::Arc};

use axum::{Router, extract::DefaultBodyLimit, routing::get, routing::post};
use handlebars::Handlebars;
use tempfile::TempDir;
use tokio::{fs, net::TcpListener, signal, sync::RwLock};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::{pipeline::Pipeline, prelude::*};

mod routes;

pub use routes::{ErrorResponse, UploadResponse};

/// The largest upload we accept.
pub const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Template for our upload page.
const INDEX_TEMPLATE: &str = include_str!("index.hbs");

/// Shared server state.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    pipeline: Pipeline,
    maps_dir: PathBuf,
    /// How many maps we keep on disk.
    keep_maps: NonZeroUsize,
    /// Maps written by this process, oldest first.
    maps: RwLock<VecDeque<Uuid>>,
    index_html: String,
    /// Keeps our scratch directory alive when we have no `--data-dir`.
    _scratch: Option<TempDir>,
}

impl AppState {
    /// Create our state. Maps are stored under `data_dir/maps`, or in a
    /// temporary directory which is removed on shutdown. Only the newest
    /// `keep_maps` maps are kept.
    pub async fn new(
        pipeline: Pipeline,
        data_dir: Option<&Path>,
        keep_maps: NonZeroUsize,
    ) -> Result<Self> {
        let (maps_dir, scratch) = match data_dir {
            Some(dir) => (dir.join("maps"), None),
            None => {
                let scratch = TempDir::with_prefix("survey-mapper")
                    .context("cannot create temporary data directory")?;
                (scratch.path().join("maps"), Some(scratch))
            }
        };
        fs::create_dir_all(&maps_dir)
            .await
            .with_context(|| format!("cannot create {:?}", maps_dir))?;
        debug!(maps_dir = %maps_dir.display(), %keep_maps, "Storing maps");

        Ok(Self {
            inner: Arc::new(AppStateInner {
                pipeline,
                maps_dir,
                keep_maps,
                maps: RwLock::new(VecDeque::new()),
                index_html: render_index()?,
                _scratch: scratch,
            }),
        })
    }

    /// Get the pipeline.
    pub fn pipeline(&self) -> &Pipeline {
        &self.inner.pipeline
    }

    /// Where we store the map with `id`.
    pub fn map_path(&self, id: Uuid) -> PathBuf {
        self.inner.maps_dir.join(format!("{id}.html"))
    }

    /// The id of the most recently rendered map, if any.
    pub async fn latest_map(&self) -> Option<Uuid> {
        self.inner.maps.read().await.back().copied()
    }

    /// Write `html` as the map `id`, make it the latest map, and delete the
    /// oldest maps beyond our limit.
    pub async fn store_map(&self, id: Uuid, html: &str) -> std::io::Result<()> {
        fs::write(self.map_path(id), html).await?;

        let expired = {
            let mut maps = self.inner.maps.write().await;
            maps.push_back(id);
            let excess = maps.len().saturating_sub(self.inner.keep_maps.get());
            maps.drain(..excess).collect::<Vec<_>>()
        };
        for old in expired {
            match fs::remove_file(self.map_path(old)).await {
                Ok(()) => debug!(id = %old, "Removed expired map"),
                Err(err) => warn!(id = %old, "Failed to remove expired map: {}", err),
            }
        }
        Ok(())
    }

    /// Our rendered upload page.
    pub fn index_html(&self) -> &str {
        &self.inner.index_html
    }
}

fn render_index() -> Result<String> {
    let mut handlebars = Handlebars::new();
    handlebars
        .register_template_string("index", INDEX_TEMPLATE)
        .context("failed to compile index template")?;
    handlebars
        .render(
            "index",
            &json!({
                "version": env!("CARGO_PKG_VERSION"),
                "max_upload_mib": MAX_UPLOAD_BYTES / (1024 * 1024),
            }),
        )
        .context("failed to render index template")
}

/// Build our router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(routes::index))
        .route("/health", get(routes::health_check))
        .route("/upload", post(routes::upload))
        .route("/map", get(routes::latest_map))
        .route("/map/:id", get(routes::map_by_id))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve `state` on `addr` until we receive Ctrl+C or SIGTERM.
#[instrument(level = "debug", skip(state))]
pub async fn serve(addr: SocketAddr, state: AppState) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("cannot listen on {addr}"))?;
    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server failed")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Wait for a shutdown signal.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                error!("Failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown...");
        },
        _ = terminate => {
            info!("Received SIGTERM, starting graceful shutdown...");
        },
    }
}
