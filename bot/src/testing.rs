//! In-process fakes for the platform and metadata collaborators.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::commands::directory::{Directory, DirectoryError, Named};
use crate::engine::metadata::{MetadataError, MetadataSource, ModlistMetadata};
use crate::engine::notification::Notification;
use crate::engine::sink::{MessageRef, MessageSink, SinkError};

#[derive(Debug, Clone)]
pub struct SentMessage {
    pub message: MessageRef,
    pub notification: Notification,
}

#[derive(Debug, Clone)]
pub struct EditedMessage {
    pub message: MessageRef,
    pub notification: Notification,
}

/// Records everything sent through it. Channels marked failing reject sends and edits.
#[derive(Default)]
pub struct RecordingSink {
    next_id: AtomicU64,
    sent: Mutex<Vec<SentMessage>>,
    texts: Mutex<Vec<(String, String)>>,
    edits: Mutex<Vec<EditedMessage>>,
    failing: Mutex<HashSet<String>>,
}

impl RecordingSink {
    pub fn fail_channel(&self, channel_id: &str) {
        self.failing.lock().insert(channel_id.to_string());
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().clone()
    }

    /// Plain text messages as (channel id, text).
    pub fn texts(&self) -> Vec<(String, String)> {
        self.texts.lock().clone()
    }

    pub fn edits(&self) -> Vec<EditedMessage> {
        self.edits.lock().clone()
    }

    fn check(&self, channel_id: &str) -> Result<(), SinkError> {
        if self.failing.lock().contains(channel_id) {
            return Err(SinkError::ChannelUnavailable(channel_id.to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl MessageSink for RecordingSink {
    async fn send(
        &self,
        server_id: &str,
        channel_id: &str,
        notification: &Notification,
    ) -> Result<MessageRef, SinkError> {
        self.check(channel_id)?;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let message = MessageRef {
            server_id: server_id.to_string(),
            channel_id: channel_id.to_string(),
            message_id: format!("m{id}"),
        };
        self.sent.lock().push(SentMessage {
            message: message.clone(),
            notification: notification.clone(),
        });
        Ok(message)
    }

    async fn send_text(
        &self,
        _server_id: &str,
        channel_id: &str,
        text: &str,
    ) -> Result<(), SinkError> {
        self.check(channel_id)?;
        self.texts
            .lock()
            .push((channel_id.to_string(), text.to_string()));
        Ok(())
    }

    async fn edit(
        &self,
        message: &MessageRef,
        notification: &Notification,
    ) -> Result<(), SinkError> {
        self.check(&message.channel_id)?;
        self.edits.lock().push(EditedMessage {
            message: message.clone(),
            notification: notification.clone(),
        });
        Ok(())
    }
}

/// Metadata served from a fixed table. Counts fetches.
#[derive(Default)]
pub struct StaticMetadata {
    entries: Mutex<HashMap<String, ModlistMetadata>>,
    fetches: AtomicUsize,
}

impl StaticMetadata {
    pub fn with(id: &str, title: &str, version: &str) -> Self {
        let source = Self::default();
        source.insert(id, title, version);
        source
    }

    pub fn insert(&self, id: &str, title: &str, version: &str) {
        self.entries.lock().insert(
            id.to_string(),
            ModlistMetadata {
                title: title.to_string(),
                version: version.to_string(),
                image_link: format!("https://example.com/{id}.png"),
            },
        );
    }

    pub fn set_version(&self, id: &str, version: &str) {
        if let Some(entry) = self.entries.lock().get_mut(id) {
            entry.version = version.to_string();
        }
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl MetadataSource for StaticMetadata {
    async fn fetch(&self, modlist_id: &str) -> Result<ModlistMetadata, MetadataError> {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        self.entries
            .lock()
            .get(modlist_id)
            .cloned()
            .ok_or_else(|| MetadataError::UnknownModlist(modlist_id.to_string()))
    }
}

/// Fixed set of channels, members and roles keyed by (server id, entity id).
#[derive(Default)]
pub struct FakeDirectory {
    channels: HashMap<(String, String), String>,
    members: HashMap<(String, String), String>,
    roles: HashMap<(String, String), String>,
}

impl FakeDirectory {
    pub fn with_channel(mut self, server_id: &str, id: &str, name: &str) -> Self {
        self.channels
            .insert((server_id.into(), id.into()), name.into());
        self
    }

    pub fn with_member(mut self, server_id: &str, id: &str, name: &str) -> Self {
        self.members
            .insert((server_id.into(), id.into()), name.into());
        self
    }

    pub fn with_role(mut self, server_id: &str, id: &str, name: &str) -> Self {
        self.roles.insert((server_id.into(), id.into()), name.into());
        self
    }

    fn find(
        table: &HashMap<(String, String), String>,
        server_id: &str,
        id: &str,
    ) -> Option<Named> {
        table
            .get(&(server_id.to_string(), id.to_string()))
            .map(|name| Named {
                id: id.to_string(),
                name: name.clone(),
            })
    }
}

#[async_trait]
impl Directory for FakeDirectory {
    async fn channel(
        &self,
        server_id: &str,
        channel_id: &str,
    ) -> Result<Option<Named>, DirectoryError> {
        Ok(Self::find(&self.channels, server_id, channel_id))
    }

    async fn member(
        &self,
        server_id: &str,
        user_id: &str,
    ) -> Result<Option<Named>, DirectoryError> {
        Ok(Self::find(&self.members, server_id, user_id))
    }

    async fn role(&self, server_id: &str, role_id: &str) -> Result<Option<Named>, DirectoryError> {
        Ok(Self::find(&self.roles, server_id, role_id))
    }
}
