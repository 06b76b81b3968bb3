//! Application Startup
//!
//! Application building and server initialization.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use tokio::net::TcpListener;

use crate::config::{Settings, StoreBackend};
use crate::domain::ChatStore;
use crate::infrastructure::database;
use crate::infrastructure::repositories::{MemoryChatStore, PgChatStore};
use crate::presentation::http::{handlers, routes};
use crate::presentation::middleware::{cors, logging, JwtVerifier, TokenVerifier};
use crate::presentation::websocket::Gateway;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ChatStore>,
    pub gateway: Arc<Gateway>,
    pub verifier: Arc<dyn TokenVerifier>,
    pub settings: Arc<Settings>,
}

impl AppState {
    /// Wire a fresh gateway and a JWT verifier around `store`.
    ///
    /// The dispatcher is idle until its workers are started.
    pub fn new(settings: Settings, store: Arc<dyn ChatStore>) -> Self {
        let gateway = Arc::new(Gateway::new(
            store.clone(),
            settings.dispatcher.queue_capacity,
        ));
        let verifier = Arc::new(JwtVerifier::new(&settings.jwt));

        Self {
            store,
            gateway,
            verifier,
            settings: Arc::new(settings),
        }
    }
}

/// Routes plus the tracing and CORS layers
pub fn build_router(state: AppState) -> Router {
    let cors = cors::create_cors_layer(&state.settings.cors);
    routes::create_router(state)
        .layer(logging::create_trace_layer())
        .layer(cors)
}

/// Connect the configured chat store, applying migrations when asked to
pub async fn connect_store(settings: &Settings) -> Result<Arc<dyn ChatStore>> {
    match settings.store.backend {
        StoreBackend::Postgres => {
            let pool = database::create_pool(&settings.database)
                .await
                .context("Failed to connect to PostgreSQL")?;
            tracing::info!("Database connection pool created");

            if settings.database.run_migrations {
                database::run_migrations(&pool)
                    .await
                    .context("Failed to run database migrations")?;
                tracing::info!("Database migrations applied");
            }

            Ok(Arc::new(PgChatStore::new(pool)))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using the in-memory chat store; data is lost on restart");
            Ok(Arc::new(MemoryChatStore::new()))
        }
    }
}

/// Application instance
pub struct Application {
    listener: TcpListener,
    router: Router,
    gateway: Arc<Gateway>,
}

impl Application {
    /// Build the application from settings
    pub async fn build(settings: Settings) -> Result<Self> {
        let store = connect_store(&settings).await?;

        let workers = settings.dispatcher.worker_count();
        let addr = settings.server_addr();
        let state = AppState::new(settings, store);

        state.gateway.dispatcher().start(workers);
        handlers::health::init_server_start();

        let gateway = state.gateway.clone();
        let router = build_router(state);

        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind {}", addr))?;
        tracing::info!("Listening on {}", addr);

        Ok(Self {
            listener,
            router,
            gateway,
        })
    }

    /// Run the server until a shutdown signal arrives, then drain the broadcast queue
    pub async fn run_until_stopped(self) -> Result<()> {
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        self.gateway.dispatcher().shutdown().await;
        Ok(())
    }

    /// Get the bound address
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl-C - initiating graceful shutdown"),
        _ = terminate => tracing::info!("Received SIGTERM - initiating graceful shutdown"),
    }
}
