use std::collections::HashSet;
use std::sync::Arc;

use sqlx::SqlitePool;
use tokio::sync::Mutex;
use tracing::{error, info};

use crate::db::queries;
use crate::error::{HeraldError, HeraldResult};

use super::broadcaster::{Caller, ReleaseBroadcaster, ReleaseOutcome, authorize};
use super::channel::Channel;
use super::metadata::MetadataSource;
use super::modlist::{Modlist, ModlistHandle};
use super::modlists::ModlistRegistry;
use super::server::Server;
use super::sink::MessageSink;
use super::subscriptions::{SubscriptionRegistry, Unlisten};

/// Application context: the registries, the broadcaster and their collaborators.
/// Built once at startup and shared by reference with every command handler.
pub struct Herald {
    modlists: ModlistRegistry,
    subscriptions: SubscriptionRegistry,
    broadcaster: ReleaseBroadcaster,
    metadata: Arc<dyn MetadataSource>,
    /// Bot administrators (platform user ids).
    admins: HashSet<String>,
    /// Optional database pool. When present, every mutation is written through.
    db: Option<SqlitePool>,
    /// Serialises registry mutations.
    mutations: Mutex<()>,
}

impl Herald {
    pub fn new(
        metadata: Arc<dyn MetadataSource>,
        sink: Arc<dyn MessageSink>,
        admins: impl IntoIterator<Item = String>,
        db: Option<SqlitePool>,
    ) -> Self {
        Self {
            modlists: ModlistRegistry::new(),
            subscriptions: SubscriptionRegistry::new(),
            broadcaster: ReleaseBroadcaster::new(sink),
            metadata,
            admins: admins.into_iter().collect(),
            db,
            mutations: Mutex::new(()),
        }
    }

    // ── Startup loading ─────────────────────────────────────────────

    /// Load modlists, servers, channels and subscriptions into memory.
    pub async fn load_from_db(&self) -> HeraldResult<()> {
        let Some(pool) = &self.db else {
            return Ok(());
        };

        for row in queries::modlists::list_modlists(pool).await? {
            self.modlists.add(row.into())?;
        }

        for row in queries::servers::list_servers(pool).await? {
            let mut server = Server::new(row.id.clone(), row.name);

            for ch in queries::servers::list_channels(pool, &row.id).await? {
                let mut channel = Channel::new(ch.id.clone());
                channel.auto_listen_to_new_lists = ch.auto_listen != 0;
                server.channels.insert(ch.id, channel);
            }
            for l in queries::servers::list_listeners(pool, &row.id).await? {
                if let Some(channel) = server.channels.get_mut(&l.channel_id) {
                    channel.listen_to(&l.modlist_id);
                }
            }
            for r in queries::servers::list_list_roles(pool, &row.id).await? {
                server.list_roles.insert(r.modlist_id, r.role_id);
            }

            self.subscriptions.insert_server(server);
        }

        info!(
            modlists = self.modlists.len(),
            servers = self.subscriptions.len(),
            "loaded state from database"
        );
        Ok(())
    }

    // ── Accessors ───────────────────────────────────────────────────

    pub fn modlists(&self) -> &ModlistRegistry {
        &self.modlists
    }

    pub fn subscriptions(&self) -> &SubscriptionRegistry {
        &self.subscriptions
    }

    pub fn is_admin(&self, user_id: &str) -> bool {
        self.admins.contains(user_id)
    }

    /// Describe a command author for release/revise authorization.
    pub fn caller(&self, user_id: &str, name: &str) -> Caller {
        Caller {
            user_id: user_id.to_string(),
            name: name.to_string(),
            is_admin: self.is_admin(user_id),
        }
    }

    /// Resolve a modlist id to its shared handle.
    pub fn modlist(&self, modlist_id: &str) -> HeraldResult<ModlistHandle> {
        self.modlists
            .get_by_id(modlist_id)
            .ok_or_else(|| HeraldError::modlist_not_found(modlist_id))
    }

    fn snapshot(&self, modlist_id: &str) -> HeraldResult<Modlist> {
        Ok(self.modlist(modlist_id)?.read().clone())
    }

    // ── Subscriptions ───────────────────────────────────────────────
    //
    // Registry mutations hold `mutations` from their existence checks until
    // memory is updated. A failed database write leaves memory as it was.

    /// Subscribe a channel to a modlist, creating the server and channel records as needed.
    pub async fn listen(
        &self,
        server_id: &str,
        server_name: &str,
        channel_id: &str,
        modlist_id: &str,
    ) -> HeraldResult<Modlist> {
        let _guard = self.mutations.lock().await;
        let modlist = self.snapshot(modlist_id)?;

        if let Some(pool) = &self.db {
            queries::servers::subscribe(pool, server_id, server_name, channel_id, modlist_id)
                .await
                .inspect_err(|e| error!(error = %e, "failed to persist subscription"))?;
        }

        self.subscriptions.spawn_server(server_id, server_name);
        self.subscriptions
            .add_channel(server_id, Channel::new(channel_id.to_string()))?;
        if !self
            .subscriptions
            .add_listener(server_id, channel_id, modlist_id)
        {
            return Err(HeraldError::not_found("Channel does not exist in server"));
        }

        info!(%server_id, %channel_id, %modlist_id, "channel listening");
        Ok(modlist)
    }

    /// Unsubscribe a channel from a modlist.
    pub async fn unlisten(
        &self,
        server_id: &str,
        channel_id: &str,
        modlist_id: &str,
    ) -> HeraldResult<(Modlist, Unlisten)> {
        let _guard = self.mutations.lock().await;
        let modlist = self.snapshot(modlist_id)?;
        let outcome = self
            .subscriptions
            .remove_listener(server_id, channel_id, modlist_id)?;
        if outcome == Unlisten::NotListening {
            return Ok((modlist, outcome));
        }

        if let Some(pool) = &self.db
            && let Err(e) =
                queries::servers::remove_listener(pool, server_id, channel_id, modlist_id).await
        {
            error!(error = %e, "failed to persist unsubscription");
            self.subscriptions.add_listener(server_id, channel_id, modlist_id);
            return Err(e.into());
        }

        info!(%server_id, %channel_id, %modlist_id, "channel stopped listening");
        Ok((modlist, outcome))
    }

    /// Servers (with their channels) subscribed to a modlist.
    pub fn listeners(&self, modlist_id: &str) -> HeraldResult<(Modlist, Vec<Server>)> {
        let modlist = self.snapshot(modlist_id)?;
        let servers = self.subscriptions.servers_listening_to(modlist_id);
        if servers.is_empty() {
            return Err(HeraldError::NoSubscribers(
                modlist.display_title().to_string(),
            ));
        }
        Ok((modlist, servers))
    }

    /// Configure the role pinged when a modlist releases in a server.
    pub async fn set_role(
        &self,
        server_id: &str,
        modlist_id: &str,
        role_id: &str,
    ) -> HeraldResult<Modlist> {
        let _guard = self.mutations.lock().await;
        let modlist = self.snapshot(modlist_id)?;
        let not_listening = || {
            HeraldError::not_found(format!(
                "This server is not listening to any channels yet for list {}",
                modlist.display_title()
            ))
        };
        let listening = self
            .subscriptions
            .get_server(server_id)
            .is_some_and(|s| s.is_listening_to(modlist_id));
        if !listening {
            return Err(not_listening());
        }

        if let Some(pool) = &self.db {
            queries::servers::set_list_role(pool, server_id, modlist_id, role_id)
                .await
                .inspect_err(|e| error!(error = %e, "failed to persist list role"))?;
        }

        self.subscriptions
            .set_list_role(server_id, modlist_id, role_id)
            .map_err(|_| not_listening())?;

        info!(%server_id, %modlist_id, %role_id, "list role set");
        Ok(modlist)
    }

    /// Toggle whether a channel subscribes to every newly added modlist.
    pub async fn set_auto_listen(
        &self,
        server_id: &str,
        server_name: &str,
        channel_id: &str,
        enabled: bool,
    ) -> HeraldResult<()> {
        let _guard = self.mutations.lock().await;

        if let Some(pool) = &self.db {
            queries::servers::set_auto_listen(pool, server_id, server_name, channel_id, enabled)
                .await
                .inspect_err(|e| error!(error = %e, "failed to persist auto-listen"))?;
        }

        self.subscriptions.spawn_server(server_id, server_name);
        self.subscriptions
            .add_channel(server_id, Channel::new(channel_id.to_string()))?;
        self.subscriptions
            .set_auto_listen(server_id, channel_id, enabled)?;

        info!(%server_id, %channel_id, enabled, "auto-listen updated");
        Ok(())
    }

    // ── Modlists ────────────────────────────────────────────────────

    /// Register a modlist managed by `author_id`, pulling its metadata first.
    /// Channels flagged for auto-listening are subscribed to it.
    pub async fn add_modlist(&self, modlist_id: &str, author_id: &str) -> HeraldResult<Modlist> {
        if self.modlists.contains(modlist_id) {
            return Err(HeraldError::DuplicateModlist(modlist_id.to_string()));
        }

        let metadata = self.metadata.fetch(modlist_id).await?;
        let mut modlist = Modlist::new(modlist_id.to_string(), author_id.to_string());
        modlist.apply_metadata(metadata);

        let _guard = self.mutations.lock().await;
        // Another addmodlist may have won while the metadata was in flight
        if self.modlists.contains(modlist_id) {
            return Err(HeraldError::DuplicateModlist(modlist_id.to_string()));
        }

        if let Some(pool) = &self.db {
            let listeners = self.subscriptions.auto_listeners();
            queries::modlists::insert_modlist(pool, &modlist, &listeners)
                .await
                .inspect_err(|e| error!(error = %e, %modlist_id, "failed to persist modlist"))?;
        }

        self.modlists.add(modlist.clone())?;
        let subscribed = self.subscriptions.auto_subscribe(modlist_id);

        info!(
            %modlist_id,
            %author_id,
            auto_subscribed = subscribed.len(),
            "modlist added"
        );
        Ok(modlist)
    }

    /// Delete a modlist after removing every subscription to it.
    pub async fn delete_modlist(&self, modlist_id: &str) -> HeraldResult<Modlist> {
        let _guard = self.mutations.lock().await;
        let modlist = self.snapshot(modlist_id)?;

        if let Some(pool) = &self.db {
            queries::modlists::delete_modlist(pool, modlist_id)
                .await
                .inspect_err(|e| error!(error = %e, %modlist_id, "failed to delete modlist"))?;
        }

        let removed = self.subscriptions.cascade_delete(modlist_id);
        self.modlists.delete(modlist_id)?;
        self.broadcaster.forget(modlist_id).await;

        info!(%modlist_id, subscriptions = removed, "modlist deleted");
        Ok(modlist)
    }

    /// All modlists ordered by id.
    pub fn list_modlists(&self) -> Vec<Modlist> {
        self.modlists.list_all()
    }

    // ── Releases ────────────────────────────────────────────────────

    /// Announce a new release of a modlist in every subscribed channel.
    pub async fn release(
        &self,
        modlist_id: &str,
        caller: &Caller,
        body: &str,
    ) -> HeraldResult<ReleaseOutcome> {
        let handle = self.modlist(modlist_id)?;
        authorize(&handle.read(), caller)?;

        let outcome = self
            .broadcaster
            .release(
                &handle,
                &self.modlists,
                &self.subscriptions,
                self.metadata.as_ref(),
                caller,
                body,
            )
            .await?;

        if let Some(pool) = &self.db
            && let Err(e) = queries::modlists::update_metadata(pool, &outcome.modlist).await
        {
            // The announcement already went out; a stale stored version is refreshed next time.
            error!(error = %e, %modlist_id, "failed to persist refreshed metadata");
        }

        Ok(outcome)
    }

    /// Edit every message of the latest release. Returns the modlist and the edit count.
    pub async fn revise(
        &self,
        modlist_id: &str,
        caller: &Caller,
        body: &str,
    ) -> HeraldResult<(Modlist, usize)> {
        let handle = self.modlist(modlist_id)?;
        let revised = self.broadcaster.revise(&handle, caller, body).await?;
        let modlist = handle.read().clone();
        Ok((modlist, revised))
    }
}
