//! The boundary between the core and the per-channel delivery adapters.

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use thiserror::Error;

use crate::models::Alert;

/// Error reported by a delivery gateway. The core only logs it and feeds
/// the failure into its bookkeeping; retrying is the gateway's business.
#[derive(Debug, Error)]
#[error("Delivery failed: {0}")]
pub struct GatewayError(pub String);

/// A per-transport delivery adapter: render has already happened, the
/// gateway makes one outbound call and reports success or failure.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ChannelGateway: Send + Sync {
    /// Delivers one rendered message.
    async fn deliver(&self, alert: &Alert, rendered: &str) -> Result<(), GatewayError>;
}

/// A gateway that only logs deliveries. Used by the `run` command when no
/// real adapters are wired in, and handy for dry runs.
pub struct LoggingGateway;

#[async_trait]
impl ChannelGateway for LoggingGateway {
    async fn deliver(&self, alert: &Alert, rendered: &str) -> Result<(), GatewayError> {
        tracing::info!(
            transport = %alert.transport,
            address = %alert.address,
            contact = %alert.contact_name,
            message = rendered,
            "Delivering notification."
        );
        Ok(())
    }
}
