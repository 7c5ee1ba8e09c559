use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use std::fmt::Debug;
use thiserror::Error;

use crate::result::JudgerResult;
use crate::task::JudgerTask;

/// Core trait for all MQ messages.
pub trait Message: Serialize + DeserializeOwned + Debug + Send + Sync + Clone {
    fn message_type() -> &'static str
    where
        Self: Sized;

    fn message_id(&self) -> &str;
}

#[derive(Debug, Error)]
pub enum MessageError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Publish failed: {0}")]
    Publish(String),
}

/// Capability to put judger tasks on the task queue.
///
/// The state machine publishes all grading tasks for a submission through
/// this before committing the Grading transition.
#[async_trait]
pub trait TaskSink: Send + Sync {
    async fn publish_task(&self, task: JudgerTask) -> Result<(), MessageError>;
}

/// Capability to put judger results on the results queue.
#[async_trait]
pub trait ResultSink: Send + Sync {
    async fn publish_result(&self, result: JudgerResult) -> Result<(), MessageError>;
}
