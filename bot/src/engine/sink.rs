use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::notification::Notification;

/// Identifies a sent announcement well enough to edit it later.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageRef {
    pub server_id: String,
    pub channel_id: String,
    pub message_id: String,
}

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("channel {0} is unavailable")]
    ChannelUnavailable(String),
    #[error("platform rejected the request ({status}): {body}")]
    Rejected { status: u16, body: String },
    #[error("request failed: {0}")]
    Request(String),
}

/// Delivery of messages to platform channels.
#[async_trait]
pub trait MessageSink: Send + Sync {
    /// Post an announcement embed, returning a reference to the new message.
    async fn send(
        &self,
        server_id: &str,
        channel_id: &str,
        notification: &Notification,
    ) -> Result<MessageRef, SinkError>;

    /// Post a plain text message.
    async fn send_text(&self, server_id: &str, channel_id: &str, text: &str)
    -> Result<(), SinkError>;

    /// Replace the embed of a previously sent announcement.
    async fn edit(&self, message: &MessageRef, notification: &Notification)
    -> Result<(), SinkError>;
}
