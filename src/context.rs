use anyhow::{Context, Result};
use std::sync::Arc;

use crate::catalog::LocalCatalog;
use crate::config::Config;
use crate::playlists::PlaylistStore;
use crate::service::openwhyd::OfflineRemote;
use crate::service::{CatalogRemote, OpenWhydClient, Resolver, ResolverSettings, Session};
use crate::storage::{KvStore, MemoryStore, RedbStore};

/// Everything the core needs, wired once at startup and passed explicitly
pub struct CatalogContext {
    pub config: Config,
    pub resolver: Arc<Resolver>,
    pub playlists: Arc<PlaylistStore>,
}

impl CatalogContext {
    pub fn new(
        config: Config,
        remote: Arc<dyn CatalogRemote>,
        catalog: Arc<LocalCatalog>,
        store: Arc<dyn KvStore>,
    ) -> Self {
        let settings = ResolverSettings::from(&config.catalog);
        let resolver = Arc::new(Resolver::new(remote, catalog, settings));
        let playlists = Arc::new(PlaylistStore::new(
            resolver.clone(),
            store,
            config.storage.history_size,
        ));

        Self {
            config,
            resolver,
            playlists,
        }
    }

    /// Build the real collaborators described by `config`.
    ///
    /// `ephemeral` keeps all state in memory for this process only.
    pub fn from_config(config: Config, ephemeral: bool) -> Result<Self> {
        let remote: Arc<dyn CatalogRemote> = if config.remote.enabled {
            Arc::new(
                OpenWhydClient::new(&config.remote).context("Failed to create HTTP client")?,
            )
        } else {
            tracing::info!("Remote service disabled, using local dataset only");
            Arc::new(OfflineRemote)
        };

        let catalog = Arc::new(LocalCatalog::from_path(config.dataset_path()?));

        let store: Arc<dyn KvStore> = if ephemeral {
            Arc::new(MemoryStore::new())
        } else {
            let path = config.storage_path()?;
            Arc::new(
                RedbStore::open(&path)
                    .with_context(|| format!("Failed to open storage at {}", path.display()))?,
            )
        };
        tracing::debug!("Using {} storage", store.backend_name());

        Ok(Self::new(config, remote, catalog, store))
    }

    /// Restore the persisted session, if any is still valid
    pub async fn start(&self) -> Option<Session> {
        self.playlists.restore_session().await
    }
}
