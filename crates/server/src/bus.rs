//! In-process hand-off between the front door and the worker.
//!
//! Messages travel as the serialized envelope a hosted topic would deliver,
//! `{"id", "subject", "Message"}`, so the worker decodes exactly what a remote
//! subscriber would see. Delivery is at-least-once from the worker's point of
//! view: nothing here deduplicates.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

pub const BUS_SUBJECT: &str = "Discord stock bot command";

#[derive(Debug, Error)]
pub enum BusError {
    #[error("bus is closed")]
    Closed,
    #[error("bus is full ({capacity} messages pending)")]
    Full { capacity: usize },
    #[error("bus message could not be encoded: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusMessage {
    pub id: Uuid,
    pub subject: String,
    /// Raw interaction JSON, byte for byte as received.
    #[serde(rename = "Message")]
    pub message: String,
}

impl BusMessage {
    pub fn new(message: impl Into<String>) -> Self {
        Self { id: Uuid::new_v4(), subject: BUS_SUBJECT.to_owned(), message: message.into() }
    }
}

#[async_trait]
pub trait MessageBus: Send + Sync {
    async fn publish(&self, message: BusMessage) -> Result<(), BusError>;
}

/// Bounded tokio channel. Publishing never waits; a full channel is an error
/// so the webhook can still answer in time.
#[derive(Clone)]
pub struct ChannelBus {
    sender: mpsc::Sender<String>,
    capacity: usize,
}

pub struct BusReceiver {
    receiver: mpsc::Receiver<String>,
}

impl BusReceiver {
    /// Next serialized envelope; `None` once every publisher is gone.
    pub async fn recv(&mut self) -> Option<String> {
        self.receiver.recv().await
    }
}

pub fn channel(capacity: usize) -> (ChannelBus, BusReceiver) {
    let (sender, receiver) = mpsc::channel(capacity);
    (ChannelBus { sender, capacity }, BusReceiver { receiver })
}

#[async_trait]
impl MessageBus for ChannelBus {
    async fn publish(&self, message: BusMessage) -> Result<(), BusError> {
        let envelope = serde_json::to_string(&message)?;
        self.sender.try_send(envelope).map_err(|error| match error {
            mpsc::error::TrySendError::Full(_) => BusError::Full { capacity: self.capacity },
            mpsc::error::TrySendError::Closed(_) => BusError::Closed,
        })?;

        debug!(
            event_name = "bus.message.published",
            message_id = %message.id,
            subject = %message.subject,
            "published interaction to bus"
        );
        Ok(())
    }
}
