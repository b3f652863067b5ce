use serde::{Deserialize, Serialize};

use super::permissions::Permissions;

/// A chat message forwarded by the platform gateway.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommandEvent {
    pub server_id: String,
    pub server_name: String,
    pub channel_id: String,
    pub author_id: String,
    /// Display name used in release titles.
    pub author_name: String,
    pub content: String,
    /// Raw permission bits of the author in this server.
    #[serde(default)]
    pub author_permissions: u64,
}

impl CommandEvent {
    pub fn permissions(&self) -> Permissions {
        Permissions::from_bits_truncate(self.author_permissions)
    }
}
