pub mod config;
pub mod error;
pub mod models;
pub mod router;

pub use config::ConsumeConfig;
pub use error::MqError;
pub use models::{BrokerMessage, BroccoliError, MqBuilder, MqConfig, MqQueue, init_mq};
pub use router::QueueRouter;

pub type Mq = MqQueue;
