//! Per-transport delivery queues between the router and the channel
//! workers.

use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::models::{Alert, Transport};

/// Error returned when enqueueing onto a closed queue.
#[derive(Debug, Error)]
#[error("Delivery queue for transport '{0}' is closed")]
pub struct QueueClosed(pub Transport);

/// The sending half of the per-transport delivery queues.
///
/// One bounded queue exists per transport; sends apply backpressure when a
/// worker falls behind.
#[derive(Clone)]
pub struct ChannelQueues {
    senders: HashMap<Transport, mpsc::Sender<Alert>>,
}

impl ChannelQueues {
    /// Creates a queue per transport, returning the senders bundle and the
    /// receivers to hand to the channel workers.
    pub fn new(capacity: usize) -> (Self, HashMap<Transport, mpsc::Receiver<Alert>>) {
        let mut senders = HashMap::new();
        let mut receivers = HashMap::new();
        for transport in Transport::ALL {
            let (tx, rx) = mpsc::channel(capacity);
            senders.insert(transport, tx);
            receivers.insert(transport, rx);
        }
        (Self { senders }, receivers)
    }

    /// Enqueues an alert onto its transport's queue.
    pub async fn send(&self, alert: Alert) -> Result<(), QueueClosed> {
        let transport = alert.transport;
        match self.senders.get(&transport) {
            Some(sender) => sender.send(alert).await.map_err(|_| QueueClosed(transport)),
            None => Err(QueueClosed(transport)),
        }
    }
}
