use common::mq::MessageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MqError {
    /// The message itself could not be produced or encoded.
    #[error("Message error: {0}")]
    Message(#[from] MessageError),

    /// The broker connection or delivery failed.
    #[error("Broker error: {0}")]
    Broker(String),
}

impl From<broccoli_queue::error::BroccoliError> for MqError {
    fn from(e: broccoli_queue::error::BroccoliError) -> Self {
        MqError::Broker(e.to_string())
    }
}
