use serde::Deserialize;

/// App-level MQ configuration shared by every binary.
#[derive(Debug, Deserialize, Clone)]
pub struct MqAppConfig {
    /// Redis connection URL. Default: "redis://localhost:6379".
    #[serde(default = "default_mq_url")]
    pub url: String,
    /// Connection pool size. Default: 5.
    #[serde(default = "default_mq_pool_size")]
    pub pool_size: u8,
    /// Queue name for judger tasks (result-handler publishes, judger
    /// consumes). Default: "judger_tasks".
    #[serde(default = "default_task_queue_name")]
    pub task_queue_name: String,
    /// Queue name for judger results (judger publishes, result-handler
    /// consumes). Default: "judger_results".
    #[serde(default = "default_result_queue_name")]
    pub result_queue_name: String,
}

fn default_mq_url() -> String {
    "redis://localhost:6379".into()
}
fn default_mq_pool_size() -> u8 {
    5
}
fn default_task_queue_name() -> String {
    "judger_tasks".into()
}
fn default_result_queue_name() -> String {
    "judger_results".into()
}

impl Default for MqAppConfig {
    fn default() -> Self {
        Self {
            url: default_mq_url(),
            pool_size: default_mq_pool_size(),
            task_queue_name: default_task_queue_name(),
            result_queue_name: default_result_queue_name(),
        }
    }
}
