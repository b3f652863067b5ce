use dashmap::DashMap;
use tracing::{debug, info};

use crate::error::{HeraldError, HeraldResult};

use super::channel::Channel;
use super::server::Server;

/// Result of removing a channel's subscription to a modlist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unlisten {
    /// The channel was listening and no longer is.
    Removed,
    /// The channel was not listening; nothing changed.
    NotListening,
}

/// Servers, their channels and what each channel listens to.
///
/// Every mutation goes through `DashMap::get_mut` on the server entry, so
/// concurrent commands touching the same server are serialised.
#[derive(Default)]
pub struct SubscriptionRegistry {
    servers: DashMap<String, Server>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create a server. An existing server keeps its channels but takes the new name.
    pub fn spawn_server(&self, id: &str, name: &str) -> Server {
        let mut server = self
            .servers
            .entry(id.to_string())
            .or_insert_with(|| {
                info!(server_id = %id, %name, "server spawned");
                Server::new(id.to_string(), name.to_string())
            });
        if server.name != name {
            server.name = name.to_string();
        }
        server.clone()
    }

    /// Insert a channel unless one with the same id already exists.
    /// Returns true if the channel was new.
    pub fn add_channel(&self, server_id: &str, channel: Channel) -> HeraldResult<bool> {
        let mut server = self
            .servers
            .get_mut(server_id)
            .ok_or_else(|| HeraldError::not_found(format!("No such server: {server_id}")))?;

        if server.channels.contains_key(&channel.id) {
            return Ok(false);
        }
        debug!(%server_id, channel_id = %channel.id, "channel added");
        server.channels.insert(channel.id.clone(), channel);
        Ok(true)
    }

    /// Subscribe a channel to a modlist. Returns false only when the channel
    /// does not belong to the server; repeated subscriptions are absorbed.
    pub fn add_listener(&self, server_id: &str, channel_id: &str, modlist_id: &str) -> bool {
        let Some(mut server) = self.servers.get_mut(server_id) else {
            return false;
        };
        match server.channels.get_mut(channel_id) {
            Some(channel) => {
                channel.listen_to(modlist_id);
                true
            }
            None => false,
        }
    }

    /// Unsubscribe a channel from a modlist.
    pub fn remove_listener(
        &self,
        server_id: &str,
        channel_id: &str,
        modlist_id: &str,
    ) -> HeraldResult<Unlisten> {
        let mut server = self.servers.get_mut(server_id).ok_or_else(|| {
            HeraldError::not_found("This server is not listening to any modlists yet")
        })?;
        let channel = server.channels.get_mut(channel_id).ok_or_else(|| {
            HeraldError::not_found(format!("Channel {channel_id} is not listening to anything"))
        })?;

        if channel.unlisten_to(modlist_id) {
            Ok(Unlisten::Removed)
        } else {
            Ok(Unlisten::NotListening)
        }
    }

    /// Snapshots of every server with at least one channel listening to the modlist,
    /// ordered by server id.
    pub fn servers_listening_to(&self, modlist_id: &str) -> Vec<Server> {
        let mut servers: Vec<Server> = self
            .servers
            .iter()
            .filter(|s| s.is_listening_to(modlist_id))
            .map(|s| s.clone())
            .collect();
        servers.sort_by(|a, b| a.id.cmp(&b.id));
        servers
    }

    /// Remove the modlist from every channel of every server.
    /// Returns how many subscriptions were dropped.
    pub fn cascade_delete(&self, modlist_id: &str) -> usize {
        let mut removed = 0;
        for mut server in self.servers.iter_mut() {
            for channel in server.channels.values_mut() {
                if channel.unlisten_to(modlist_id) {
                    removed += 1;
                }
            }
        }
        info!(%modlist_id, removed, "subscriptions cascaded");
        removed
    }

    /// Configure the role pinged when the modlist releases in this server.
    /// The server must already have a channel listening to the modlist.
    pub fn set_list_role(
        &self,
        server_id: &str,
        modlist_id: &str,
        role_id: &str,
    ) -> HeraldResult<()> {
        let mut server = self
            .servers
            .get_mut(server_id)
            .filter(|s| s.is_listening_to(modlist_id))
            .ok_or_else(|| {
                HeraldError::not_found(format!(
                    "This server is not listening to any channels yet for list {modlist_id}"
                ))
            })?;
        server
            .list_roles
            .insert(modlist_id.to_string(), role_id.to_string());
        Ok(())
    }

    /// Toggle automatic subscription of a channel to newly added modlists.
    pub fn set_auto_listen(
        &self,
        server_id: &str,
        channel_id: &str,
        enabled: bool,
    ) -> HeraldResult<()> {
        let mut server = self
            .servers
            .get_mut(server_id)
            .ok_or_else(|| HeraldError::not_found(format!("No such server: {server_id}")))?;
        let channel = server
            .channels
            .get_mut(channel_id)
            .ok_or_else(|| HeraldError::not_found(format!("No such channel: {channel_id}")))?;
        channel.auto_listen_to_new_lists = enabled;
        Ok(())
    }

    /// (server id, channel id) pairs of every channel flagged for auto-listening.
    pub fn auto_listeners(&self) -> Vec<(String, String)> {
        let mut channels: Vec<(String, String)> = self
            .servers
            .iter()
            .flat_map(|server| {
                server
                    .channels
                    .values()
                    .filter(|c| c.auto_listen_to_new_lists)
                    .map(|c| (server.id.clone(), c.id.clone()))
                    .collect::<Vec<_>>()
            })
            .collect();
        channels.sort();
        channels
    }

    /// Subscribe every auto-listening channel to a new modlist.
    /// Returns the (server id, channel id) pairs that were subscribed.
    pub fn auto_subscribe(&self, modlist_id: &str) -> Vec<(String, String)> {
        let mut subscribed = Vec::new();
        for mut server in self.servers.iter_mut() {
            let server_id = server.id.clone();
            for channel in server.channels.values_mut() {
                if channel.auto_listen_to_new_lists && channel.listen_to(modlist_id) {
                    subscribed.push((server_id.clone(), channel.id.clone()));
                }
            }
        }
        subscribed.sort();
        subscribed
    }

    pub fn get_server(&self, server_id: &str) -> Option<Server> {
        self.servers.get(server_id).map(|s| s.clone())
    }

    /// Place a fully built server, replacing any entry with the same id (startup loading).
    pub fn insert_server(&self, server: Server) {
        self.servers.insert(server.id.clone(), server);
    }

    pub fn len(&self) -> usize {
        self.servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }
}
