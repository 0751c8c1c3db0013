use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};

use marginalia_lib::config::AnnotationSettings;
use marginalia_lib::coordinator::PersistenceCoordinator;
use marginalia_lib::remote::{HttpAnnotationApi, RemoteAnnotationApi};
use marginalia_lib::store::{AnnotationStore, JsonFileStore};

/// Shared application state for CLI commands
pub struct App {
    pub settings: AnnotationSettings,
    pub store: Arc<JsonFileStore>,
    pub remote: Option<Arc<HttpAnnotationApi>>,
}

impl App {
    /// Load settings and open the store
    pub fn new(config: Option<&Path>, store_override: Option<PathBuf>) -> Result<Self> {
        let settings = match config {
            Some(path) => AnnotationSettings::load(path)
                .with_context(|| format!("Failed to load settings from {}", path.display()))?,
            None => AnnotationSettings::default(),
        };

        let store_path = match store_override.or_else(|| settings.store_path.clone()) {
            Some(path) => path,
            None => JsonFileStore::default_path().context("Failed to get data directory")?,
        };
        let store = JsonFileStore::new(store_path.clone())
            .with_context(|| format!("Failed to open store at {}", store_path.display()))?;

        let remote = settings
            .remote
            .as_ref()
            .map(HttpAnnotationApi::new)
            .transpose()
            .context("Failed to configure remote annotation API")?
            .map(Arc::new);

        Ok(Self {
            settings,
            store: Arc::new(store),
            remote,
        })
    }

    pub fn coordinator(&self) -> PersistenceCoordinator {
        let store: Arc<dyn AnnotationStore> = self.store.clone();
        let remote = self
            .remote
            .clone()
            .map(|remote| remote as Arc<dyn RemoteAnnotationApi>);
        PersistenceCoordinator::new(store, remote)
    }
}
