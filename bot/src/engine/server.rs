use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use super::channel::Channel;

/// A chat server (guild) with at least one subscription command issued in it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Server {
    pub id: String,
    pub name: String,
    /// Channels keyed by channel id, ordered for stable display.
    pub channels: BTreeMap<String, Channel>,
    /// Modlist id -> role id to mention alongside a release.
    pub list_roles: HashMap<String, String>,
}

impl Server {
    pub fn new(id: String, name: String) -> Self {
        Self {
            id,
            name,
            channels: BTreeMap::new(),
            list_roles: HashMap::new(),
        }
    }

    /// Channels in this server subscribed to the given modlist.
    pub fn listening_channels<'a>(
        &'a self,
        modlist_id: &'a str,
    ) -> impl Iterator<Item = &'a Channel> + 'a {
        self.channels
            .values()
            .filter(move |c| c.is_listening_to(modlist_id))
    }

    pub fn is_listening_to(&self, modlist_id: &str) -> bool {
        self.listening_channels(modlist_id).next().is_some()
    }
}
