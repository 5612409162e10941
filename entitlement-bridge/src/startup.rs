//! Application startup and lifecycle management.

use crate::config::BridgeConfig;
use crate::handlers;
use crate::registry::{Directory, RegistryClient};
use crate::services::{GroupCreationPolicy, Reconciler};
use axum::middleware::from_fn;
use axum::{
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use service_core::error::AppError;
use service_core::middleware::{metrics_middleware, request_id_middleware, REQUEST_ID_HEADER};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Shared application state. Read-only after startup.
#[derive(Clone)]
pub struct AppState {
    pub reconciler: Arc<Reconciler>,
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(config: &BridgeConfig, directory: Arc<dyn Directory>) -> Result<Self, AppError> {
        let policy = GroupCreationPolicy::new(&config.groups.create_groups_for_resources)
            .map_err(|e| {
                AppError::ConfigError(anyhow::anyhow!(
                    "Invalid CREATE_GROUPS_FOR_RESOURCES pattern: {}",
                    e
                ))
            })?;

        tracing::info!(
            patterns = ?policy.patterns(),
            "Group creation policy loaded"
        );

        Ok(Self {
            reconciler: Arc::new(Reconciler::new(directory, policy)),
            metrics: None,
        })
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::health_check))
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics))
        .route("/approve", post(handlers::approve))
        .route("/revoke", post(handlers::revoke))
        .layer(from_fn(metrics_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
        .with_state(state)
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Build the application against the configured registry.
    pub async fn build(
        config: BridgeConfig,
        metrics: Option<PrometheusHandle>,
    ) -> Result<Self, AppError> {
        let client = RegistryClient::new(&config.registry, config.retry.retry_config())
            .map_err(|e| {
                tracing::error!("Failed to build registry HTTP client: {}", e);
                AppError::ConfigError(anyhow::Error::new(e))
            })?;

        tracing::info!(
            registry_url = %config.registry.url,
            coid = config.registry.coid,
            retry_attempts = config.retry.attempts,
            "Registry client initialized"
        );

        Self::build_with_directory(config, Arc::new(client), metrics).await
    }

    /// Build the application against any directory implementation.
    pub async fn build_with_directory(
        config: BridgeConfig,
        directory: Arc<dyn Directory>,
        metrics: Option<PrometheusHandle>,
    ) -> Result<Self, AppError> {
        let port = config.common.port;
        let mut state = AppState::new(&config, directory)?;
        if let Some(handle) = metrics {
            state = state.with_metrics(handle);
        }

        // Port 0 binds a random port, used by tests.
        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind HTTP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        Ok(Self {
            port,
            listener,
            router: build_router(state),
        })
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        self.run_with_shutdown(std::future::pending()).await
    }

    /// Serve until `shutdown` resolves, then drain in-flight requests.
    pub async fn run_with_shutdown<F>(self, shutdown: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        tracing::info!("Listening on port {}", self.port);
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await
    }
}
