use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

pub use common::config::MqAppConfig;

/// Judger-specific configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct JudgerConfig {
    /// Unique identifier for this judger instance. Default: a fresh UUID.
    #[serde(default = "default_judger_id")]
    pub id: String,
    /// Number of sandbox slots. Default: the number of CPU cores.
    #[serde(default)]
    pub slots: Option<usize>,
    /// Isolate executable path. Default: "isolate".
    #[serde(default = "default_isolate_bin")]
    pub isolate_bin: String,
    /// Object store root. Default: "./objects".
    #[serde(default = "default_storage_path")]
    pub storage_path: String,
}

fn default_judger_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
fn default_isolate_bin() -> String {
    "isolate".into()
}
fn default_storage_path() -> String {
    "./objects".into()
}

impl Default for JudgerConfig {
    fn default() -> Self {
        Self {
            id: default_judger_id(),
            slots: None,
            isolate_bin: default_isolate_bin(),
            storage_path: default_storage_path(),
        }
    }
}

/// Judger application configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct JudgerAppConfig {
    #[serde(default)]
    pub judger: JudgerConfig,
    #[serde(default)]
    pub mq: MqAppConfig,
}

impl JudgerAppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let config_path =
            std::env::var("GAVEL_CONFIG").unwrap_or_else(|_| "config/config".to_string());

        let s = Config::builder()
            .set_default("judger.isolate_bin", "isolate")?
            .set_default("judger.storage_path", "./objects")?
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
