//! HTTP server
//!
//! Wires the configured [`VolumeClient`] into a [`JobRunner`] and serves the
//! job API over axum. On shutdown the server stops accepting requests and
//! then waits for every job that is still running.

pub mod api;

use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::cache::VolumeCache;
use crate::client::VolumeClient;
use crate::config::{Config, ServerConfig};
use crate::jobs::JobRunner;
use crate::scheduler::SchedulerConfig;

pub use api::{create_router, ApiError};

// ============================================================================
// App State
// ============================================================================

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub runner: Arc<JobRunner>,

    /// Server start time
    pub start_time: Instant,

    pub config: ServerConfig,
}

// ============================================================================
// Server
// ============================================================================

pub struct Server {
    config: ServerConfig,
    state: AppState,
}

impl Server {
    /// Build the full lookup stack from configuration
    pub fn new(config: &Config) -> Result<Self, ServerError> {
        config
            .validate()
            .map_err(|e| ServerError::Config(e.to_string()))?;

        let cache = Arc::new(VolumeCache::new());
        let client = VolumeClient::new(&config.api, cache)
            .map_err(|e| ServerError::Init(e.to_string()))?;
        let runner = JobRunner::with_lookup(
            Arc::new(client),
            SchedulerConfig::from(&config.lookup),
        );

        Ok(Self::with_runner(Arc::new(runner), config.server.clone()))
    }

    /// Serve an existing runner
    pub fn with_runner(runner: Arc<JobRunner>, config: ServerConfig) -> Self {
        let state = AppState {
            runner,
            start_time: Instant::now(),
            config: config.clone(),
        };
        Self { config, state }
    }

    pub fn state(&self) -> AppState {
        self.state.clone()
    }

    /// Build the router with all routes and configured layers
    pub fn build_router(&self) -> Router {
        let mut router = create_router(self.state.clone());

        if self.config.enable_cors {
            router = router.layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            );
        }

        if self.config.enable_request_logging {
            router = router.layer(TraceLayer::new_for_http());
        }

        router
    }

    /// Serve until `shutdown_signal` resolves, then drain running jobs
    pub async fn start_with_shutdown(
        &self,
        shutdown_signal: impl std::future::Future<Output = ()> + Send + 'static,
    ) -> Result<(), ServerError> {
        let router = self.build_router();
        let addr = self.config.bind_address;

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Bind(e.to_string()))?;

        tracing::info!(%addr, "searchvol server listening");

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal)
            .await
            .map_err(|e| ServerError::Serve(e.to_string()))?;

        self.state.runner.shutdown().await;
        tracing::info!("Server shutdown complete");
        Ok(())
    }
}

// ============================================================================
// Server Errors
// ============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum ServerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Initialization error: {0}")]
    Init(String),

    #[error("Failed to bind: {0}")]
    Bind(String),

    #[error("Server error: {0}")]
    Serve(String),
}
