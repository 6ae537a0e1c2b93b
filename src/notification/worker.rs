//! Single-consumer delivery workers, one per transport.

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::engine::router::NotificationRouter;
use crate::models::{Alert, SendOutcome, Transport};
use crate::notification::gateway::ChannelGateway;
use crate::notification::template::TemplateService;

/// A blocking pop-process loop over one transport's delivery queue.
///
/// There is no redelivery: a message that fails to render or deliver is
/// logged and dropped, and a worker that stops is restarted by external
/// process supervision.
pub struct ChannelWorker {
    transport: Transport,
    receiver: mpsc::Receiver<Alert>,
    gateway: Arc<dyn ChannelGateway>,
    templates: Arc<TemplateService>,
    router: Arc<NotificationRouter>,
}

impl ChannelWorker {
    /// Creates a worker for one transport's queue.
    pub fn new(
        transport: Transport,
        receiver: mpsc::Receiver<Alert>,
        gateway: Arc<dyn ChannelGateway>,
        templates: Arc<TemplateService>,
        router: Arc<NotificationRouter>,
    ) -> Self {
        Self { transport, receiver, gateway, templates, router }
    }

    /// Runs the worker loop until the queue closes or shutdown is
    /// signalled.
    pub async fn run(mut self, cancel: CancellationToken) {
        tracing::info!(transport = %self.transport, "Channel worker started.");
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                alert = self.receiver.recv() => match alert {
                    Some(alert) => self.handle(alert).await,
                    None => break,
                },
            }
        }
        tracing::info!(transport = %self.transport, "Channel worker stopped.");
    }

    async fn handle(&self, alert: Alert) {
        let rendered = match self.templates.render_alert(&alert) {
            Ok(rendered) => rendered,
            Err(e) => {
                tracing::error!(transport = %self.transport, check = %alert.check, error = %e,
                    "Failed to render notification, dropping.");
                return;
            }
        };

        let success = match self.gateway.deliver(&alert, &rendered).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(transport = %self.transport, check = %alert.check,
                    address = %alert.address, error = %e, "Delivery failed.");
                false
            }
        };

        // sends are recorded at the alert's own timestamp so throttling
        // stays within the event timeline
        let outcome = SendOutcome::for_alert(&alert, alert.time, success);
        if let Err(e) = self.router.record_outcome(&outcome).await {
            tracing::error!(transport = %self.transport, error = %e,
                "Failed to record delivery outcome.");
        }
    }
}
