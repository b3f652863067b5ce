use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::RwLock;
use tracing::info;

use crate::error::{HeraldError, HeraldResult};

use super::metadata::MetadataSource;
use super::modlist::{Modlist, ModlistHandle};

/// Owner of every known modlist, keyed by id.
#[derive(Default)]
pub struct ModlistRegistry {
    modlists: DashMap<String, ModlistHandle>,
}

impl ModlistRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new modlist. Fails if the id is taken.
    pub fn add(&self, modlist: Modlist) -> HeraldResult<ModlistHandle> {
        match self.modlists.entry(modlist.id.clone()) {
            Entry::Occupied(_) => Err(HeraldError::DuplicateModlist(modlist.id)),
            Entry::Vacant(slot) => {
                let handle = Arc::new(RwLock::new(modlist));
                slot.insert(handle.clone());
                Ok(handle)
            }
        }
    }

    pub fn get_by_id(&self, id: &str) -> Option<ModlistHandle> {
        self.modlists.get(id).map(|m| m.clone())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.modlists.contains_key(id)
    }

    /// Remove a modlist. Outstanding handles stay readable but are detached.
    pub fn delete(&self, id: &str) -> HeraldResult<ModlistHandle> {
        self.modlists
            .remove(id)
            .map(|(_, handle)| handle)
            .ok_or_else(|| HeraldError::modlist_not_found(id))
    }

    /// Pull title/version/image from the metadata source into the stored entry.
    /// Returns a snapshot of the refreshed modlist.
    pub async fn refresh(
        &self,
        handle: &ModlistHandle,
        source: &dyn MetadataSource,
    ) -> HeraldResult<Modlist> {
        let id = handle.read().id.clone();
        let metadata = source.fetch(&id).await?;

        let mut modlist = handle.write();
        modlist.apply_metadata(metadata);
        info!(modlist_id = %modlist.id, version = %modlist.version, "modlist refreshed");
        Ok(modlist.clone())
    }

    /// All modlists ordered by id.
    pub fn list_all(&self) -> Vec<Modlist> {
        let mut all: Vec<Modlist> = self.modlists.iter().map(|m| m.read().clone()).collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        all
    }

    pub fn len(&self) -> usize {
        self.modlists.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modlists.is_empty()
    }
}
