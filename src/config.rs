use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct UsdaConfig {
    /// Missing key is a runtime condition, not a startup failure: the
    /// proxy answers 500 until the key is configured.
    pub api_key: Option<String>,
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub usda: UsdaConfig,
    pub chat: ChatConfig,
    /// Rough burn estimate per step; ~400 kcal for 10k steps.
    pub step_kcal_burn: f64,
    pub default_goal: u32,
    pub default_steps: u32,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url =
            std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite:nutrilog.db".into());

        let usda = UsdaConfig {
            api_key: std::env::var("USDA_API_KEY").ok().filter(|k| !k.is_empty()),
            base_url: std::env::var("USDA_BASE_URL")
                .unwrap_or_else(|_| "https://api.nal.usda.gov/fdc/v1".into()),
            timeout_secs: std::env::var("USDA_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(12),
        };

        let chat = ChatConfig {
            api_key: std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.is_empty()),
            base_url: std::env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".into()),
            model: std::env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".into()),
            timeout_secs: std::env::var("OPENAI_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(20),
        };

        Ok(Self {
            database_url,
            usda,
            chat,
            step_kcal_burn: std::env::var("STEP_KCAL_BURN")
                .ok()
                .and_then(|v| v.parse::<f64>().ok())
                .unwrap_or(0.04),
            default_goal: std::env::var("DEFAULT_DAILY_GOAL")
                .ok()
                .and_then(|v| v.parse::<u32>().ok())
                .unwrap_or(2000),
            default_steps: std::env::var("DEFAULT_STEPS")
                .ok()
                .and_then(|v| v.parse::<u32>().ok())
                .unwrap_or(2500),
        })
    }

    /// Config for tests: no upstream keys, in-memory database.
    pub fn for_tests() -> Self {
        Self {
            database_url: "sqlite::memory:".into(),
            usda: UsdaConfig {
                api_key: None,
                base_url: "http://127.0.0.1:9".into(),
                timeout_secs: 1,
            },
            chat: ChatConfig {
                api_key: None,
                base_url: "http://127.0.0.1:9".into(),
                model: "gpt-4o-mini".into(),
                timeout_secs: 1,
            },
            step_kcal_burn: 0.04,
            default_goal: 2000,
            default_steps: 2500,
        }
    }
}

