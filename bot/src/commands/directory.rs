use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A platform entity (channel, member or role) resolved by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Named {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("platform rejected the lookup ({status}): {body}")]
    Rejected { status: u16, body: String },
    #[error("lookup failed: {0}")]
    Request(String),
}

/// Lookups of chat-platform entities needed to validate command arguments.
/// `Ok(None)` means the entity does not exist in that server.
#[async_trait]
pub trait Directory: Send + Sync {
    async fn channel(&self, server_id: &str, channel_id: &str)
    -> Result<Option<Named>, DirectoryError>;

    async fn member(&self, server_id: &str, user_id: &str)
    -> Result<Option<Named>, DirectoryError>;

    async fn role(&self, server_id: &str, role_id: &str) -> Result<Option<Named>, DirectoryError>;
}
