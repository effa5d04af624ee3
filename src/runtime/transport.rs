//! Delivery seam for outbound replies.
//!
//! The engine never talks to a messaging platform directly; it hands every
//! reply to a [`Transport`]. [`ChannelTransport`] backs the embedding and
//! test path, [`ConsoleTransport`] backs the demo binary.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("delivery failed: {0}")]
    Failed(String),

    #[error("transport channel closed")]
    Closed,
}

/// Sends one reply to one user.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn deliver(&self, user_id: &str, text: &str) -> Result<(), TransportError>;
}

/// One outbound reply, addressed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub user_id: String,
    pub text: String,
}

/// Transport that forwards replies into an in-process channel. The receiving
/// half is handed to whoever embeds the engine.
#[derive(Debug, Clone)]
pub struct ChannelTransport {
    tx: mpsc::Sender<OutboundMessage>,
}

impl ChannelTransport {
    /// Create a transport and the receiver its deliveries arrive on.
    pub fn pair(buffer: usize) -> (Self, mpsc::Receiver<OutboundMessage>) {
        let (tx, rx) = mpsc::channel(buffer);
        (Self { tx }, rx)
    }
}

#[async_trait]
impl Transport for ChannelTransport {
    async fn deliver(&self, user_id: &str, text: &str) -> Result<(), TransportError> {
        self.tx
            .send(OutboundMessage {
                user_id: user_id.to_string(),
                text: text.to_string(),
            })
            .await
            .map_err(|_| TransportError::Closed)
    }
}

/// Prints replies to stdout. Used by the console demo binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleTransport;

impl ConsoleTransport {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Transport for ConsoleTransport {
    async fn deliver(&self, user_id: &str, text: &str) -> Result<(), TransportError> {
        log::debug!("delivering to {user_id}: {text:?}");
        println!("bot> {text}");
        Ok(())
    }
}
