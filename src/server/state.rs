//! Application state management

use std::sync::Arc;

use crate::loading::DataLoader;
use crate::reduction::Orchestrator;
use crate::render::{ArtifactStore, FsArtifactStore};

use super::ServerConfig;

/// Application state shared across handlers
pub struct AppState {
    pub config: ServerConfig,
    pub loader: DataLoader,
    pub orchestrator: Orchestrator,
    pub store: Arc<dyn ArtifactStore>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        let store = Arc::new(FsArtifactStore::new(&config.storage_dir, config.public_url.clone()));
        Self {
            loader: DataLoader::new(&config.project_root),
            orchestrator: Orchestrator::new(),
            store,
            config,
        }
    }

    /// Replace the artifact store, e.g. with an in-memory one.
    pub fn with_store(mut self, store: Arc<dyn ArtifactStore>) -> Self {
        self.store = store;
        self
    }
}
