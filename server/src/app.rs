//! Application lifecycle management and graceful shutdown.
//!
//! [`Application::build`] connects to `PostgreSQL`, applies migrations and
//! binds the listener. [`Application::run`] serves until Ctrl+C or SIGTERM,
//! then stops the cleanup task.

use crate::cleanup::spawn_cleanup_task;
use crate::config::Config;
use anyhow::Context;
use metrics_exporter_prometheus::PrometheusHandle;
use sqlx::postgres::PgPoolOptions;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use take_a_number_core::{SystemClock, TicketService};
use take_a_number_postgres::PostgresTicketStore;
use take_a_number_web::{build_router, AppState};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::{info, warn};

/// How long the cleanup task gets to finish its current run on shutdown.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// A bound, ready-to-serve application.
pub struct Application {
    listener: TcpListener,
    router: axum::Router,
    service: Arc<TicketService>,
    cleanup_every: Option<Duration>,
}

impl Application {
    /// Connect to the database, migrate it and bind the HTTP listener.
    ///
    /// # Errors
    ///
    /// Returns an error if the database is unreachable, a migration fails or
    /// the address cannot be bound.
    pub async fn build(config: &Config, metrics: Option<PrometheusHandle>) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.database.max_connections)
            .min_connections(config.database.min_connections)
            .acquire_timeout(config.database.connect_timeout())
            .connect(&config.database.url)
            .await
            .context("failed to connect to PostgreSQL")?;
        info!(
            max_connections = config.database.max_connections,
            "✓ Database pool ready"
        );

        let store = PostgresTicketStore::from_pool(pool);
        store.migrate().await.context("failed to run migrations")?;

        let service = Arc::new(TicketService::new(
            Arc::new(store),
            Arc::new(SystemClock),
            config.tickets.lifecycle(),
        ));

        Self::with_service(config, service, metrics).await
    }

    /// Bind the HTTP listener around an existing service.
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound.
    pub async fn with_service(
        config: &Config,
        service: Arc<TicketService>,
        metrics: Option<PrometheusHandle>,
    ) -> anyhow::Result<Self> {
        let address = config.bind_address();
        let listener = TcpListener::bind(&address)
            .await
            .with_context(|| format!("failed to bind {address}"))?;

        let mut state = AppState::new(Arc::clone(&service));
        if let Some(handle) = metrics {
            state = state.with_metrics(handle);
        }

        Ok(Self {
            listener,
            router: build_router(state),
            service,
            cleanup_every: config.tickets.cleanup_interval(),
        })
    }

    /// Address the listener is bound to.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket has no local address.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serve until Ctrl+C or SIGTERM.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP server fails.
    pub async fn run(self) -> anyhow::Result<()> {
        self.run_until(shutdown_signal()).await
    }

    /// Serve until `signal` completes, then shut down gracefully.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP server fails.
    pub async fn run_until(
        self,
        signal: impl Future<Output = ()> + Send + 'static,
    ) -> anyhow::Result<()> {
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        let cleanup = match self.cleanup_every {
            Some(every) => Some(spawn_cleanup_task(
                Arc::clone(&self.service),
                every,
                shutdown_rx,
            )),
            None => {
                info!("Scheduled cleanup disabled");
                None
            }
        };

        info!(address = %self.listener.local_addr()?, "HTTP server listening for requests");
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(signal)
            .await
            .context("HTTP server failed")?;

        info!("HTTP server stopped, initiating graceful shutdown...");
        let _ = shutdown_tx.send(());

        if let Some(handle) = cleanup {
            match tokio::time::timeout(SHUTDOWN_TIMEOUT, handle).await {
                Ok(Ok(())) => info!("Cleanup task stopped gracefully"),
                Ok(Err(e)) => warn!(error = %e, "Cleanup task failed"),
                Err(_) => warn!("Cleanup task shutdown timed out"),
            }
        }

        info!("Graceful shutdown complete");
        Ok(())
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
///
/// If a handler cannot be installed the corresponding branch never fires.
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        () = terminate => {
            info!("Received SIGTERM signal");
        }
    }
}
