use std::sync::Arc;

use async_trait::async_trait;
use common::mq::{MessageError, ResultSink, TaskSink};
use common::result::JudgerResult;
use common::task::JudgerTask;

use crate::models::MqQueue;

/// Broker-backed publisher for the two judger queues.
///
/// Owns the queue names so callers only ever say "publish this task" or
/// "publish this result".
pub struct QueueRouter {
    queue: Arc<MqQueue>,
    task_queue_name: String,
    result_queue_name: String,
}

impl QueueRouter {
    pub fn new(
        queue: Arc<MqQueue>,
        task_queue_name: impl Into<String>,
        result_queue_name: impl Into<String>,
    ) -> Self {
        Self {
            queue,
            task_queue_name: task_queue_name.into(),
            result_queue_name: result_queue_name.into(),
        }
    }
}

#[async_trait]
impl TaskSink for QueueRouter {
    async fn publish_task(&self, task: JudgerTask) -> Result<(), MessageError> {
        self.queue
            .publish(&self.task_queue_name, None, &task, None)
            .await
            .map(|_| ())
            .map_err(|e| MessageError::Publish(e.to_string()))
    }
}

#[async_trait]
impl ResultSink for QueueRouter {
    async fn publish_result(&self, result: JudgerResult) -> Result<(), MessageError> {
        self.queue
            .publish(&self.result_queue_name, None, &result, None)
            .await
            .map(|_| ())
            .map_err(|e| MessageError::Publish(e.to_string()))
    }
}
