use std::sync::Arc;

use bookstore_core::database::Db;
use bookstore_core::database::types::StoreError;

use super::config::Config;

pub struct AppState {
    pub config: Config,
    pub db: Db,
}

impl AppState {
    pub async fn new() -> Result<Arc<Self>, StoreError> {
        let config = Config::load();
        let db = Db::init(&config.database_path).await?;

        Ok(Arc::new(Self { config, db }))
    }
}
