use std::sync::Arc;

use dashmap::DashMap;
use futures_util::future::join_all;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::error::{HeraldError, HeraldResult};

use super::metadata::MetadataSource;
use super::modlist::{Modlist, ModlistHandle};
use super::modlists::ModlistRegistry;
use super::notification::{Notification, role_mention};
use super::sink::{MessageRef, MessageSink};
use super::subscriptions::SubscriptionRegistry;

/// The user issuing a release or revision.
#[derive(Debug, Clone)]
pub struct Caller {
    pub user_id: String,
    /// Display name used in the announcement title.
    pub name: String,
    pub is_admin: bool,
}

/// What a successful release reached.
#[derive(Debug, Clone)]
pub struct ReleaseOutcome {
    /// The modlist as announced, after its metadata refresh.
    pub modlist: Modlist,
    pub channel_count: usize,
    pub sent: Vec<MessageRef>,
}

/// One channel to announce in.
struct Target {
    server_id: String,
    channel_id: String,
    role_id: Option<String>,
}

/// Only the modlist's author or an administrator may release or revise it.
pub fn authorize(modlist: &Modlist, caller: &Caller) -> HeraldResult<()> {
    if caller.is_admin || caller.user_id == modlist.author_id {
        Ok(())
    } else {
        Err(HeraldError::Unauthorized(
            "You're not managing this list".into(),
        ))
    }
}

/// Fans release announcements out to subscribed channels and keeps the
/// references needed to revise the latest release of each modlist.
///
/// `release` and `revise` for the same modlist never overlap: both hold that
/// modlist's lock for their whole duration.
pub struct ReleaseBroadcaster {
    sink: Arc<dyn MessageSink>,
    /// Messages of the most recent release per modlist id (process lifetime only).
    records: DashMap<String, Vec<MessageRef>>,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl ReleaseBroadcaster {
    pub fn new(sink: Arc<dyn MessageSink>) -> Self {
        Self {
            sink,
            records: DashMap::new(),
            locks: DashMap::new(),
        }
    }

    fn lock_for(&self, modlist_id: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(modlist_id.to_string())
            .or_default()
            .clone()
    }

    /// Announce a new release in every subscribed channel.
    ///
    /// The modlist is refreshed first so the announcement carries the live
    /// version and image. A channel that fails to receive the announcement is
    /// skipped; the release only fails if no channel received it. On success
    /// the sent messages replace any earlier record for this modlist.
    pub async fn release(
        &self,
        handle: &ModlistHandle,
        modlists: &ModlistRegistry,
        subscriptions: &SubscriptionRegistry,
        source: &dyn MetadataSource,
        caller: &Caller,
        body: &str,
    ) -> HeraldResult<ReleaseOutcome> {
        let modlist_id = handle.read().id.clone();
        let lock = self.lock_for(&modlist_id);
        let _guard = lock.lock().await;
        // Deleted while this release waited for the lock
        if !modlists.contains(&modlist_id) {
            return Err(HeraldError::modlist_not_found(&modlist_id));
        }

        let modlist = modlists.refresh(handle, source).await?;

        let servers = subscriptions.servers_listening_to(&modlist_id);
        if servers.is_empty() {
            return Err(HeraldError::NoSubscribers(
                modlist.display_title().to_string(),
            ));
        }

        let targets: Vec<Target> = servers
            .iter()
            .flat_map(|server| {
                let role_id = server.list_roles.get(&modlist_id).cloned();
                server.listening_channels(&modlist_id).map(move |channel| Target {
                    server_id: server.id.clone(),
                    channel_id: channel.id.clone(),
                    role_id: role_id.clone(),
                })
            })
            .collect();

        let notification = Notification::release(&caller.name, &modlist, body);
        let sent: Vec<MessageRef> =
            join_all(targets.iter().map(|t| self.deliver(t, &notification)))
                .await
                .into_iter()
                .flatten()
                .collect();

        if sent.is_empty() {
            warn!(%modlist_id, targets = targets.len(), "release reached no channels");
            return Err(HeraldError::BroadcastFailed(
                modlist.display_title().to_string(),
            ));
        }

        self.records.insert(modlist_id.clone(), sent.clone());
        info!(
            %modlist_id,
            version = %modlist.version,
            channels = sent.len(),
            failed = targets.len() - sent.len(),
            "modlist released"
        );

        Ok(ReleaseOutcome {
            modlist,
            channel_count: sent.len(),
            sent,
        })
    }

    /// Send the announcement to one channel, then ping its role if configured.
    async fn deliver(&self, target: &Target, notification: &Notification) -> Option<MessageRef> {
        let sent = match self
            .sink
            .send(&target.server_id, &target.channel_id, notification)
            .await
        {
            Ok(message) => message,
            Err(e) => {
                warn!(
                    server_id = %target.server_id,
                    channel_id = %target.channel_id,
                    error = %e,
                    "failed to deliver release announcement"
                );
                return None;
            }
        };

        if let Some(role_id) = &target.role_id
            && let Err(e) = self
                .sink
                .send_text(&target.server_id, &target.channel_id, &role_mention(role_id))
                .await
        {
            warn!(channel_id = %target.channel_id, %role_id, error = %e, "failed to ping release role");
        }

        Some(sent)
    }

    /// Rewrite every message of the latest release with a new body.
    /// Title, version and image come from the modlist as currently stored.
    /// Returns how many messages were edited.
    pub async fn revise(
        &self,
        handle: &ModlistHandle,
        caller: &Caller,
        body: &str,
    ) -> HeraldResult<usize> {
        let modlist_id = handle.read().id.clone();
        let lock = self.lock_for(&modlist_id);
        let _guard = lock.lock().await;

        let modlist = handle.read().clone();
        authorize(&modlist, caller)?;

        let messages = self
            .records
            .get(&modlist_id)
            .map(|r| r.clone())
            .ok_or_else(|| HeraldError::NoPriorRelease(modlist.display_title().to_string()))?;

        let notification = Notification::release(&caller.name, &modlist, body);
        let results = join_all(messages.iter().map(|m| self.sink.edit(m, &notification))).await;

        let mut revised = 0;
        for (message, result) in messages.iter().zip(results) {
            match result {
                Ok(()) => revised += 1,
                Err(e) => warn!(
                    channel_id = %message.channel_id,
                    message_id = %message.message_id,
                    error = %e,
                    "failed to revise release message"
                ),
            }
        }

        info!(%modlist_id, revised, "release revised");
        Ok(revised)
    }

    /// Drop the release record and lock of a deleted modlist. Waits for a
    /// release or revise in flight to finish first.
    pub async fn forget(&self, modlist_id: &str) {
        let lock = self.lock_for(modlist_id);
        let _guard = lock.lock().await;
        self.records.remove(modlist_id);
        self.locks.remove(modlist_id);
    }

    /// Messages of the latest release of a modlist, if any happened since startup.
    pub fn last_release(&self, modlist_id: &str) -> Option<Vec<MessageRef>> {
        self.records.get(modlist_id).map(|r| r.clone())
    }
}
