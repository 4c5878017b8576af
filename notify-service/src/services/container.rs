//! Service container for dependency injection.
//!
//! The ServiceContainer builds the event store and the dispatch pipeline
//! once, and manages the lifecycle of the dispatch worker.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::Result;
use crate::api::server::AppState;
use crate::config::ServiceConfig;
use crate::events::{EventStore, InMemoryEventStore};
use crate::notification::{DispatchQueue, Notifier, dispatch_channel};

/// Service container holding all application services.
pub struct ServiceContainer {
    /// Event history shared with the API.
    pub store: Arc<dyn EventStore>,
    /// Producer side of the dispatch pipeline.
    pub dispatcher: DispatchQueue,
    notifier_types: Vec<String>,
    recent_default: usize,
    shutdown_timeout: Duration,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl ServiceContainer {
    /// Build all services from `config` and start the dispatch worker.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(config: &ServiceConfig) -> Result<Self> {
        let notifiers: Vec<Arc<dyn Notifier>> =
            config.notifiers.iter().map(|c| c.build()).collect();
        Self::with_notifiers(config, notifiers)
    }

    /// Like [`ServiceContainer::new`], with explicitly constructed notifiers.
    pub fn with_notifiers(
        config: &ServiceConfig,
        notifiers: Vec<Arc<dyn Notifier>>,
    ) -> Result<Self> {
        if notifiers.is_empty() {
            return Err(crate::Error::config("at least one notifier is required"));
        }

        let store: Arc<dyn EventStore> =
            Arc::new(InMemoryEventStore::with_capacity(config.history_capacity));
        let (dispatcher, worker) = dispatch_channel(config.dispatch_capacity, notifiers);
        let notifier_types: Vec<String> = worker
            .notifier_types()
            .into_iter()
            .map(str::to_string)
            .collect();

        info!(
            history_capacity = store.capacity(),
            dispatch_capacity = dispatcher.capacity(),
            notifiers = ?notifier_types,
            "Services initialized"
        );

        Ok(Self {
            store,
            dispatcher,
            notifier_types,
            recent_default: config.recent_default,
            shutdown_timeout: config.shutdown_timeout,
            worker: Mutex::new(Some(worker.spawn())),
        })
    }

    /// Names of the configured notifiers, in delivery order.
    pub fn notifier_types(&self) -> &[String] {
        &self.notifier_types
    }

    /// Build the API state backed by these services.
    pub fn app_state(&self) -> AppState {
        AppState::new(
            self.store.clone(),
            self.dispatcher.clone(),
            self.notifier_types.clone(),
        )
        .with_recent_default(self.recent_default)
    }

    /// Shutdown all services gracefully with the configured timeout.
    pub async fn shutdown(&self) {
        self.shutdown_with_timeout(self.shutdown_timeout).await
    }

    /// Close the dispatch queue and wait up to `timeout` for the worker to
    /// drain it. The worker is aborted if the timeout elapses.
    pub async fn shutdown_with_timeout(&self, timeout: Duration) {
        info!("Shutting down services (timeout: {:?})", timeout);

        self.dispatcher.close();

        let Some(mut worker) = self.worker.lock().take() else {
            return;
        };

        match tokio::time::timeout(timeout, &mut worker).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, "Dispatch worker terminated abnormally"),
            Err(_) => {
                warn!(
                    pending = self.dispatcher.pending(),
                    "Shutdown timeout reached, abandoning undelivered events"
                );
                worker.abort();
            }
        }

        info!(stats = ?self.dispatcher.stats(), "Services shut down");
    }

    /// Check if shutdown has been requested.
    pub fn is_shutting_down(&self) -> bool {
        self.dispatcher.is_closed()
    }
}
