//! The Supervisor wires the engine together and manages the lifecycle of
//! the ingestion loop and the per-transport delivery workers.

use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::config::AppConfig;
use crate::engine::history::StateHistory;
use crate::engine::maintenance::MaintenanceTracker;
use crate::engine::processor::{Processor, ProcessorConfig};
use crate::engine::report::ReportEngine;
use crate::engine::router::NotificationRouter;
use crate::locks::LockRegistry;
use crate::models::{Event, Transport};
use crate::notification::gateway::{ChannelGateway, LoggingGateway};
use crate::notification::queue::ChannelQueues;
use crate::notification::template::TemplateService;
use crate::notification::worker::ChannelWorker;
use crate::persistence::traits::{
    ContactRepository, MaintenanceStore, StateStore, Store,
};

/// SupervisorError represents errors that can occur within the Supervisor.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// The builder was not given a configuration.
    #[error("Missing configuration for Supervisor")]
    MissingConfig,
    /// The builder was not given a store.
    #[error("Missing store for Supervisor")]
    MissingStore,
    /// A transport's delivery queue was not created.
    #[error("Missing delivery queue for transport '{0}'")]
    MissingQueue(Transport),
}

/// The SupervisorBuilder is used to construct a Supervisor instance with
/// all necessary components.
pub struct SupervisorBuilder<S: Store + 'static> {
    config: Option<AppConfig>,
    store: Option<Arc<S>>,
    gateways: HashMap<Transport, Arc<dyn ChannelGateway>>,
    templates: Option<TemplateService>,
}

/// Owns the engine services and the worker tasks; processes inbound
/// events until the source closes or shutdown is signalled.
pub struct Supervisor {
    config: AppConfig,
    processor: Arc<Processor>,
    reports: Arc<ReportEngine>,
    workers: Vec<ChannelWorker>,
    cancellation_token: CancellationToken,
    join_set: JoinSet<()>,
}

impl Supervisor {
    /// Creates a new SupervisorBuilder to configure and build a
    /// Supervisor instance.
    pub fn builder<S: Store + 'static>() -> SupervisorBuilder<S> {
        SupervisorBuilder::new()
    }

    /// The ingestion processor, for embedders driving events directly.
    pub fn processor(&self) -> Arc<Processor> {
        self.processor.clone()
    }

    /// The report engine over the same store.
    pub fn reports(&self) -> Arc<ReportEngine> {
        self.reports.clone()
    }

    /// Runs the supervisor: spawns the channel workers and processes
    /// events until the source closes or a shutdown signal arrives.
    pub async fn run(mut self, mut events: mpsc::Receiver<Event>) {
        for worker in self.workers.drain(..) {
            let cancel = self.cancellation_token.clone();
            self.join_set.spawn(worker.run(cancel));
        }

        tracing::info!("Supervisor started, processing events.");
        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Shutdown signal received.");
                    break;
                }
                event = events.recv() => match event {
                    Some(event) => match self.processor.process(&event).await {
                        Ok(alerts) => {
                            tracing::debug!(check = %event.check, enqueued = alerts.len(),
                                "Event processed.");
                        }
                        Err(e) => {
                            tracing::error!(check = %event.check, error = %e,
                                "Failed to process event.");
                        }
                    },
                    None => {
                        tracing::info!("Event source closed.");
                        break;
                    }
                },
            }
        }

        self.shutdown().await;
    }

    async fn shutdown(mut self) {
        tracing::info!("Shutting down supervisor...");
        self.cancellation_token.cancel();
        let deadline = tokio::time::Instant::now() + self.config.shutdown_timeout;
        loop {
            match tokio::time::timeout_at(deadline, self.join_set.join_next()).await {
                Ok(Some(_)) => continue,
                Ok(None) => break,
                Err(_) => {
                    tracing::warn!(
                        timeout_secs = self.config.shutdown_timeout.as_secs(),
                        "Workers did not stop within the shutdown timeout, aborting."
                    );
                    self.join_set.abort_all();
                    break;
                }
            }
        }
        tracing::info!("Supervisor stopped.");
    }
}

impl<S: Store + 'static> SupervisorBuilder<S> {
    /// Creates a new SupervisorBuilder instance.
    pub fn new() -> Self {
        Self { config: None, store: None, gateways: HashMap::new(), templates: None }
    }

    /// Sets the configuration for the Supervisor.
    pub fn config(mut self, config: AppConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Sets the store backing every repository.
    pub fn store(mut self, store: Arc<S>) -> Self {
        self.store = Some(store);
        self
    }

    /// Sets the delivery gateway for one transport. Transports without a
    /// gateway fall back to the logging gateway.
    pub fn gateway(mut self, transport: Transport, gateway: Arc<dyn ChannelGateway>) -> Self {
        self.gateways.insert(transport, gateway);
        self
    }

    /// Replaces the default template set.
    pub fn templates(mut self, templates: TemplateService) -> Self {
        self.templates = Some(templates);
        self
    }

    /// Builds the Supervisor instance, validating all required components
    /// are set.
    pub fn build(self) -> Result<Supervisor, SupervisorError> {
        let config = self.config.ok_or(SupervisorError::MissingConfig)?;
        let store = self.store.ok_or(SupervisorError::MissingStore)?;

        let history = Arc::new(StateHistory::new(store.clone() as Arc<dyn StateStore>));
        let maintenance =
            Arc::new(MaintenanceTracker::new(store.clone() as Arc<dyn MaintenanceStore>));
        let (queues, mut receivers) = ChannelQueues::new(config.channel_capacity);
        let router = Arc::new(NotificationRouter::new(
            store.clone() as Arc<dyn ContactRepository>,
            history.clone(),
            maintenance.clone(),
            queues,
        ));
        let reports =
            Arc::new(ReportEngine::new(store.clone(), history.clone(), maintenance.clone()));
        let processor = Arc::new(Processor::new(
            store.clone(),
            history,
            maintenance,
            router.clone(),
            Arc::new(LockRegistry::new()),
            ProcessorConfig { ack_maintenance_secs: config.ack_maintenance_secs },
        ));

        let templates = Arc::new(self.templates.unwrap_or_default());
        let mut gateways = self.gateways;
        let mut workers = Vec::with_capacity(Transport::ALL.len());
        for transport in Transport::ALL {
            let receiver = receivers
                .remove(&transport)
                .ok_or(SupervisorError::MissingQueue(transport))?;
            let gateway = gateways
                .remove(&transport)
                .unwrap_or_else(|| Arc::new(LoggingGateway) as Arc<dyn ChannelGateway>);
            workers.push(ChannelWorker::new(
                transport,
                receiver,
                gateway,
                templates.clone(),
                router.clone(),
            ));
        }

        Ok(Supervisor {
            config,
            processor,
            reports,
            workers,
            cancellation_token: CancellationToken::new(),
            join_set: JoinSet::new(),
        })
    }
}

impl<S: Store + 'static> Default for SupervisorBuilder<S> {
    fn default() -> Self {
        Self::new()
    }
}
