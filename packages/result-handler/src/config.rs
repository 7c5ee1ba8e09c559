use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

pub use common::config::MqAppConfig;

/// Scoring configuration.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ScoringConfig {
    /// Scale accepted testcases by the checker-reported fraction instead of
    /// all-or-nothing.
    #[serde(default)]
    pub partial_credit: bool,
}

/// Result-handler specific configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct ResultHandlerConfig {
    /// Number of result messages processed concurrently. Default: 4.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

fn default_concurrency() -> usize {
    4
}

impl Default for ResultHandlerConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
        }
    }
}

/// Result-handler application configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct ResultHandlerAppConfig {
    #[serde(default)]
    pub result_handler: ResultHandlerConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub mq: MqAppConfig,
}

impl ResultHandlerAppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let config_path =
            std::env::var("GAVEL_CONFIG").unwrap_or_else(|_| "config/config".to_string());

        let s = Config::builder()
            .set_default("result_handler.concurrency", 4_i64)?
            .set_default("scoring.partial_credit", false)?
            .set_default("mq.url", "redis://localhost:6379")?
            .set_default("mq.pool_size", 5_i64)?
            .set_default("mq.task_queue_name", "judger_tasks")?
            .set_default("mq.result_queue_name", "judger_results")?
            .add_source(File::with_name(&config_path).required(false))
            .add_source(Environment::with_prefix("GAVEL").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
