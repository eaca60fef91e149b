use std::future::Future;
use std::sync::Arc;

use tokio::net::TcpListener;

use mcps_ledger::{HttpLedger, InMemoryLedger, LedgerClient};
use mcps_records::RecordStore;

use crate::auth::ApiKeyGate;
use crate::config::{AppConfig, LedgerBackend};
use crate::error::ServerResult;
use crate::router::build_router;
use crate::state::AppState;

/// MCP Storage HTTP server.
pub struct McpsServer {
    config: AppConfig,
    state: AppState,
}

impl McpsServer {
    /// Build a server whose ledger is chosen by `config.ledger_backend`.
    pub fn new(config: AppConfig) -> ServerResult<Self> {
        config.validate()?;
        let ledger: Arc<dyn LedgerClient> = match config.ledger_backend {
            LedgerBackend::Http => Arc::new(HttpLedger::new(&config.ledger)?),
            LedgerBackend::Memory => {
                tracing::warn!("using the in-memory ledger; records are lost on exit");
                Arc::new(InMemoryLedger::default())
            }
        };
        Self::with_ledger(config, ledger)
    }

    /// Build a server over an existing ledger client, ignoring
    /// `config.ledger_backend`.
    pub fn with_ledger(config: AppConfig, ledger: Arc<dyn LedgerClient>) -> ServerResult<Self> {
        let gate = ApiKeyGate::from_config(&config.auth)?;
        if gate.is_none() {
            tracing::warn!("API-key authentication is disabled");
        }
        let records = RecordStore::new(ledger, config.records.clone());
        Ok(Self { state: AppState::new(records, gate), config })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        build_router(self.state.clone(), &self.config.server)
    }

    /// Serve until Ctrl-C.
    pub async fn serve(self) -> ServerResult<()> {
        self.serve_with_shutdown(shutdown_signal()).await
    }

    pub async fn serve_with_shutdown<F>(self, signal: F) -> ServerResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = self.router();
        let listener = TcpListener::bind(self.config.server.bind_addr).await?;
        tracing::info!(
            addr = %listener.local_addr()?,
            owner = %self.state.records().ledger().owner(),
            "MCP Storage server listening"
        );
        axum::serve(listener, app).with_graceful_shutdown(signal).await?;
        tracing::info!("server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
