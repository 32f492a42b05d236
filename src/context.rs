use std::sync::Arc;

use crate::api::{self, Navigator, PanelApi};
use crate::config::AppConfig;
use crate::error::StorageError;
use crate::store::{FileStorage, SessionStore, Storage, ThemeStore};

/// Everything a command needs, wired once at startup.
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<AppConfig>,
    pub session: SessionStore,
    pub theme: ThemeStore,
    pub api: Arc<dyn PanelApi>,
}

impl AppContext {
    pub fn new(config: AppConfig, storage: Arc<dyn Storage>, navigator: Arc<dyn Navigator>) -> Self {
        let session = SessionStore::load(storage.clone());
        let theme = ThemeStore::load(storage, config.system_theme);
        let api = api::create_api(&config, session.clone(), navigator);

        Self {
            config: Arc::new(config),
            session,
            theme,
            api,
        }
    }

    /// Context backed by `storage.json` under the configured state directory.
    pub fn open(config: AppConfig, navigator: Arc<dyn Navigator>) -> Result<Self, StorageError> {
        let storage = FileStorage::open(&config.state_dir)?;
        Ok(Self::new(config, Arc::new(storage), navigator))
    }
}
