use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::metadata::ModlistMetadata;

/// A curated, versioned content list with a single managing author.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modlist {
    /// Machine id of the list (e.g. `tpf`), unique across the registry.
    pub id: String,
    /// Platform user id of the person allowed to release the list.
    pub author_id: String,
    pub title: String,
    pub version: String,
    pub image_link: String,
}

impl Modlist {
    /// A modlist with no metadata yet. Title/version/image are filled by a refresh.
    pub fn new(id: String, author_id: String) -> Self {
        Self {
            id,
            author_id,
            title: String::new(),
            version: String::new(),
            image_link: String::new(),
        }
    }

    /// Overwrite the externally sourced fields, keeping id and author.
    pub fn apply_metadata(&mut self, metadata: ModlistMetadata) {
        self.title = metadata.title;
        self.version = metadata.version;
        self.image_link = metadata.image_link;
    }

    /// Title for display, falling back to the id while metadata is missing.
    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            &self.id
        } else {
            &self.title
        }
    }
}

/// Shared handle to a registry-owned modlist. A refresh through any handle
/// is visible to every other holder.
pub type ModlistHandle = Arc<RwLock<Modlist>>;
