//! Server state
//!
//! Holds shared references to the engine and its collaborators. Cheap to
//! clone; every handler receives it through axum state.

use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::auth::JwtService;
use crate::collaborators::{
    LogNotifier, MemoryCatalog, MemoryReceiptStore, Notifier, ReceiptStore, WebhookNotifier,
};
use crate::core::Config;
use crate::engine::{NotifyWorker, OrderEngine, Storage};

/// Shared server state
#[derive(Clone)]
pub struct ServerState {
    pub config: Config,
    pub engine: Arc<OrderEngine>,
    pub jwt_service: Arc<JwtService>,
    /// Object-storage collaborator for uploaded receipts
    pub receipts: Arc<dyn ReceiptStore>,
}

impl ServerState {
    /// Initialize storage, collaborators, and the engine
    ///
    /// The catalog and receipt store default to in-memory implementations;
    /// production deployments swap in their real collaborators here.
    ///
    /// # Panics
    ///
    /// Panics when the working directory or database cannot be created.
    pub fn initialize(config: &Config) -> Self {
        config
            .ensure_work_dir_structure()
            .expect("Failed to create work directory structure");

        let db_path = config.database_dir().join("store.db");
        let storage = Storage::open(&db_path).expect("Failed to open database");

        let catalog = Arc::new(MemoryCatalog::new());
        let receipts: Arc<dyn ReceiptStore> = Arc::new(MemoryReceiptStore::new());
        let engine = Arc::new(OrderEngine::new(
            storage,
            catalog,
            receipts.clone(),
            config.pricing(),
        ));
        let jwt_service = Arc::new(JwtService::new(config.jwt.clone()));

        Self {
            config: config.clone(),
            engine,
            jwt_service,
            receipts,
        }
    }

    /// Start background tasks; must run before serving requests
    ///
    /// Spawns the notify worker wired to the configured notifier.
    pub fn start_background_tasks(&self, shutdown: CancellationToken) {
        let notifier: Arc<dyn Notifier> = match &self.config.notify_webhook_url {
            Some(url) => {
                tracing::info!(endpoint = %url, "Using webhook notifier");
                Arc::new(WebhookNotifier::new(url.clone()))
            }
            None => Arc::new(LogNotifier),
        };

        let worker = NotifyWorker::new(self.engine.storage().clone(), notifier);
        let nudge_rx = self.engine.subscribe_outbox();
        tokio::spawn(worker.run(nudge_rx, shutdown));
    }
}

impl std::fmt::Debug for ServerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerState")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
