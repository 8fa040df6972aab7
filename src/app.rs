//! Application assembly and server lifecycle.

use crate::cache::{CacheLayer, CacheStore, MemoryStore, RedisStore};
use crate::config::Config;
use crate::enrollment::EnrollmentService;
use crate::orchestrator::FetchOrchestrator;
use crate::portal::session::SessionManager;
use crate::portal::{DetailClient, HttpTransport, SearchClient};
use crate::state::AppState;
use crate::web::create_router;
use anyhow::Context;
use figment::Figment;
use figment::providers::Env;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tracing::{info, warn};

/// Load configuration from the process environment.
pub fn load_config() -> anyhow::Result<Config> {
    Figment::new()
        .merge(Env::raw())
        .extract()
        .context("failed to load configuration from environment")
}

pub struct App {
    config: Config,
    state: AppState,
}

impl App {
    /// Wire the full service graph from configuration.
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let transport = Arc::new(HttpTransport::new(Duration::from_secs(
            config.portal_timeout_secs,
        ))?);

        let sessions = Arc::new(SessionManager::new(
            transport.clone(),
            config.portal_base_url.clone(),
            Duration::from_secs(config.session_ttl_secs),
        ));

        // One limiter for search and detail calls combined.
        let limiter = Arc::new(Semaphore::new(config.max_concurrent_requests));
        let search = SearchClient::new(
            transport.clone(),
            sessions.clone(),
            limiter.clone(),
            config.portal_base_url.clone(),
            config.max_subjects_per_request,
        );
        let details = DetailClient::new(
            transport,
            sessions.clone(),
            limiter,
            config.portal_base_url.clone(),
        );
        let orchestrator = FetchOrchestrator::new(search, details, config.default_terms.clone());

        let store: Arc<dyn CacheStore> = match config.redis_url.as_deref() {
            Some(url) => match RedisStore::connect(url).await {
                Ok(store) => Arc::new(store),
                Err(e) => {
                    warn!(error = %e, "redis unavailable, falling back to in-process cache");
                    Arc::new(MemoryStore::new())
                }
            },
            None => {
                info!("REDIS_URL not set, using in-process cache");
                Arc::new(MemoryStore::new())
            }
        };
        let cache = CacheLayer::new(store, Duration::from_secs(config.cache_ttl_secs));

        let enrollment = Arc::new(EnrollmentService::new(
            orchestrator,
            cache,
            sessions.clone(),
            Duration::from_secs(config.request_timeout_secs),
        ));

        let state = AppState {
            enrollment,
            sessions,
            started_at: Instant::now(),
        };

        Ok(Self { config, state })
    }

    /// Serve until interrupted.
    pub async fn run(self) -> anyhow::Result<()> {
        let router = create_router(self.state);
        let addr = format!("0.0.0.0:{}", self.config.port);
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("failed to bind {addr}"))?;
        info!(
            %addr,
            portal = %self.config.portal_base_url,
            "server listening"
        );

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("server error")
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to install ctrl-c handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received ctrl-c, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
