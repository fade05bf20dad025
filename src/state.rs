use std::sync::Arc;
use std::time::Duration;

use crate::config::AppConfig;
use crate::storage::{KvStore, MemoryKv, SqliteKv};
use crate::tracker::repo::DayRepo;
use crate::upstream::chat::ChatClient;
use crate::upstream::usda::UsdaClient;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub kv: Arc<dyn KvStore>,
    /// Absent until USDA_API_KEY is configured; handlers answer 500.
    pub usda: Option<Arc<UsdaClient>>,
    /// Absent until OPENAI_API_KEY is configured; chat answers 501.
    pub chat: Option<Arc<ChatClient>>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);
        let kv = Arc::new(SqliteKv::connect(&config.database_url).await?) as Arc<dyn KvStore>;
        Self::from_parts(config, kv)
    }

    pub fn from_parts(config: Arc<AppConfig>, kv: Arc<dyn KvStore>) -> anyhow::Result<Self> {
        let usda = match &config.usda.api_key {
            Some(key) => Some(Arc::new(UsdaClient::new(
                config.usda.base_url.as_str(),
                key.as_str(),
                Duration::from_secs(config.usda.timeout_secs),
            )?)),
            None => None,
        };
        let chat = match &config.chat.api_key {
            Some(key) => Some(Arc::new(ChatClient::new(
                config.chat.base_url.as_str(),
                key.as_str(),
                config.chat.model.as_str(),
                Duration::from_secs(config.chat.timeout_secs),
            )?)),
            None => None,
        };

        Ok(Self {
            config,
            kv,
            usda,
            chat,
        })
    }

    pub fn repo(&self) -> DayRepo {
        DayRepo::new(self.kv.clone())
    }

    /// State with an in-memory store and no upstream clients, for tests.
    pub fn fake() -> Self {
        Self {
            config: Arc::new(AppConfig::for_tests()),
            kv: Arc::new(MemoryKv::new()),
            usda: None,
            chat: None,
        }
    }
}
