use std::sync::Arc;

use snote_gc::{GarbageCollector, GcHandle, GcScheduler};
use snote_refs::MarkdownExtractor;
use snote_render::RenderCache;
use snote_store::DiskStorage;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::SnoteConfig;
use crate::error::{ServerError, ServerResult};
use crate::router::build_router;
use crate::state::AppState;

/// snote HTTP server over a disk store.
pub struct SnoteServer {
    config: SnoteConfig,
    state: AppState,
    cache: Arc<RenderCache>,
}

impl SnoteServer {
    /// Open the disk store under `config.storage_root` and wire up state.
    ///
    /// Background tasks are not started until [`serve`](Self::serve).
    pub async fn open(config: SnoteConfig) -> ServerResult<Self> {
        let storage = Arc::new(DiskStorage::open(&config.storage_root).await?);
        let cache = Arc::new(RenderCache::new(config.render.ttl()));
        let state = AppState::new(storage.clone(), storage, Arc::clone(&cache));
        Ok(Self {
            config,
            state,
            cache,
        })
    }

    pub fn config(&self) -> &SnoteConfig {
        &self.config
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        build_router(self.state.clone(), self.config.upload_limit())
    }

    fn start_gc(&self) -> GcHandle {
        let collector = GarbageCollector::new(
            Arc::clone(&self.state.notes),
            Arc::clone(&self.state.blobs),
            Arc::new(MarkdownExtractor),
        );
        GcScheduler::new(collector, self.config.gc.interval()).start()
    }

    /// Start background tasks and serve until Ctrl-C, then stop the
    /// collector gracefully.
    pub async fn serve(self) -> ServerResult<()> {
        let background = CancellationToken::new();
        let sweeper = Arc::clone(&self.cache)
            .spawn_sweeper(self.config.render.sweep_interval(), background.clone());

        let gc = self.config.gc.enabled.then(|| self.start_gc());
        let mut state = self.state.clone();
        if let Some(handle) = &gc {
            state = state.with_gc(handle.clone());
        }
        let app = build_router(state, self.config.upload_limit());

        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        info!(
            addr = %self.config.bind_addr,
            root = %self.config.storage_root.display(),
            gc = self.config.gc.enabled,
            "snote server listening"
        );
        let served = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| ServerError::Internal(e.to_string()));

        info!("shutting down background tasks");
        background.cancel();
        let _ = sweeper.await;
        if let Some(handle) = gc {
            handle.shutdown().await;
        }
        served
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "cannot listen for ctrl-c, serving until killed");
        std::future::pending::<()>().await;
    }
}
