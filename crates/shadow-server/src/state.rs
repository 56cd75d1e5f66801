use std::sync::Arc;

use shadow_crypto::ContentHasher;
use shadow_entry::EntryManager;
use shadow_store::open_store;

use crate::config::ServerConfig;
use crate::error::ServerResult;

/// Shared handler state.
#[derive(Clone, Debug)]
pub struct AppState {
    pub entries: Arc<EntryManager>,
}

impl AppState {
    pub fn new(entries: EntryManager) -> Self {
        Self {
            entries: Arc::new(entries),
        }
    }

    /// Open the configured store and load every entry. Blocks.
    pub fn open(config: &ServerConfig) -> ServerResult<Self> {
        let store = open_store(&config.store)?;
        let entries = EntryManager::load(store, ContentHasher::new(config.hash))?;
        Ok(Self::new(entries))
    }
}
