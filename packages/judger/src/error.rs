use common::mq::MessageError;
use common::storage::StorageError;
use thiserror::Error;

use crate::sandbox::SandboxError;

#[derive(Debug, Error)]
pub enum JudgerError {
    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Sandbox error: {0}")]
    Sandbox(#[from] SandboxError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Malformed task payload: {0}")]
    MalformedTask(#[from] serde_json::Error),

    #[error("Unknown language: {0}")]
    UnknownLanguage(String),

    #[error("Publish error: {0}")]
    Publish(#[from] MessageError),

    #[error("MQ error: {0}")]
    Mq(String),
}

impl From<mq::MqError> for JudgerError {
    fn from(e: mq::MqError) -> Self {
        JudgerError::Mq(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, JudgerError>;
