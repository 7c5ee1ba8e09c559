pub mod config;
pub mod constraints;
pub mod languages;
pub mod mq;
pub mod problem;
pub mod result;
pub mod storage;
pub mod submission;
pub mod task;
pub mod team_score;

pub use constraints::Constraints;
pub use result::{CompilingResult, CompilingStatus, GradingResult, GradingStatus, JudgerResult};
pub use submission::{Submission, SubmissionScope, SubmissionStatus, SubmissionTestcase};
pub use task::{BlobRef, CompilingTask, GradingTask, JudgerTask};
pub use team_score::TeamScore;
