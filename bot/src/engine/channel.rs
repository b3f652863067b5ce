use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// A platform channel that can receive release announcements.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub id: String,
    /// Modlist ids this channel announces releases for.
    pub listening_to: HashSet<String>,
    /// When set, newly added modlists are subscribed automatically.
    pub auto_listen_to_new_lists: bool,
}

impl Channel {
    pub fn new(id: String) -> Self {
        Self {
            id,
            listening_to: HashSet::new(),
            auto_listen_to_new_lists: false,
        }
    }

    /// Start listening. Returns true if the id was not already present.
    pub fn listen_to(&mut self, modlist_id: &str) -> bool {
        self.listening_to.insert(modlist_id.to_string())
    }

    /// Stop listening. Returns true if the id was present and got removed.
    pub fn unlisten_to(&mut self, modlist_id: &str) -> bool {
        self.listening_to.remove(modlist_id)
    }

    pub fn is_listening_to(&self, modlist_id: &str) -> bool {
        self.listening_to.contains(modlist_id)
    }
}
