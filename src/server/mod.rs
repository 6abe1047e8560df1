//! HTTP surface: router assembly and server lifecycle.
//!
//! Two endpoints: `GET /health` (liveness + AI-pool pressure) and
//! `POST /analyze/` (one transcript upload per request). The analyze route
//! carries the upload-size cap and, when configured, API-key protection;
//! CORS and request tracing wrap everything.
//!
//! Shutdown is graceful: the listener drains in-flight requests, the temp
//! sweeper stops, and the worker pool gets ten seconds to finish.

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod state;

use std::future::Future;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::analysis::Analyzer;
use crate::cleanup::run_periodic_cleanup;
use crate::config::Config;
use crate::lexicon::Lexicon;
use crate::llm::keys::KeyRing;
use crate::llm::NarrativeClient;
use crate::pool::AiPool;

pub use self::error::ApiError;
pub use self::state::AppState;

/// Builds the application router over shared state.
pub fn build_router(state: Arc<AppState>) -> Router {
    let analyze_routes = Router::new()
        .route("/analyze/", post(handlers::analyze))
        .layer(axum::middleware::from_fn_with_state(
            Arc::clone(&state),
            middleware::check_api_key,
        ))
        .layer(axum::middleware::from_fn_with_state(
            Arc::clone(&state),
            middleware::limit_upload_size,
        ))
        .layer(DefaultBodyLimit::max(
            state.config.max_upload_size_bytes as usize,
        ));

    Router::new()
        .route("/health", get(handlers::health))
        .merge(analyze_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state.config.allowed_origins))
        .with_state(state)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::ORIGIN,
            header::CONTENT_TYPE,
            header::CONTENT_LENGTH,
            header::AUTHORIZATION,
            header::HeaderName::from_static(middleware::API_KEY_HEADER),
        ])
        .allow_credentials(true)
}

/// Wires the process together from a loaded config: lexicon, LLM client,
/// worker pool, orchestrator, shared state.
pub fn build_state(config: Config) -> anyhow::Result<Arc<AppState>> {
    let lexicon = Arc::new(Lexicon::load(&config.data_dir));

    let keys = KeyRing::new(
        config.llm_primary_keys.clone(),
        config.llm_fallback_key.clone(),
    );
    let client = Arc::new(NarrativeClient::new(config.llm.clone(), keys)?);
    if client.is_disabled() {
        warn!("AI analysis is disabled: no upstream credentials");
    }

    let pool = Arc::new(AiPool::start(config.max_concurrent_ai_calls, client));
    let analyzer = Analyzer::new(
        Arc::clone(&lexicon),
        Arc::clone(&pool),
        config.ai_queue_timeout,
        config.llm.max_users_for_people_block,
    );

    Ok(Arc::new(AppState::new(config, pool, analyzer)))
}

/// Runs the server until SIGINT/SIGTERM.
pub async fn run(config: Config) -> anyhow::Result<()> {
    run_with_shutdown(config, shutdown_signal()).await
}

/// Runs the server until `shutdown` resolves, then drains everything.
pub async fn run_with_shutdown<F>(config: Config, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    std::fs::create_dir_all(&config.temp_dir_root)?;

    let state = build_state(config)?;

    let (cleanup_tx, cleanup_rx) = watch::channel(false);
    let cleanup_handle = tokio::spawn(run_periodic_cleanup(
        state.config.temp_dir_root.clone(),
        state.config.max_temp_file_age,
        state.config.max_temp_file_age / 2,
        cleanup_rx,
    ));

    let addr = state.config.listen_addr();
    let listener = TcpListener::bind(&addr).await?;
    info!(
        addr = %addr,
        workers = state.config.max_concurrent_ai_calls,
        queue_timeout_secs = state.config.ai_queue_timeout.as_secs(),
        max_upload_mb = state.config.max_upload_size_bytes / (1024 * 1024),
        analysis_timeout_secs = state.config.analysis_timeout.as_secs(),
        "server starting"
    );

    let router = build_router(Arc::clone(&state));
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("shutting down server");
    let _ = cleanup_tx.send(true);
    state.pool.shutdown().await;
    let _ = cleanup_handle.await;
    info!("server exiting");

    Ok(())
}

/// Resolves on SIGINT or, on unix, SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("failed to install Ctrl+C handler: {e}");
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
                warn!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received Ctrl+C, initiating graceful shutdown"),
        _ = terminate => info!("received SIGTERM, initiating graceful shutdown"),
    }
}
