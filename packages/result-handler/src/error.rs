use common::mq::MessageError;
use thiserror::Error;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum ResultError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("No testcase found at index {index} of submission {submission_id}")]
    TestcaseNotFound {
        submission_id: String,
        index: usize,
    },

    #[error("Unknown language: {0}")]
    UnknownLanguage(String),

    #[error("Publish error: {0}")]
    Mq(#[from] MessageError),
}

impl ResultError {
    /// Whether this error is stale-message fallout that an at-least-once
    /// consumer should log and drop rather than retry.
    pub fn is_stale_fallout(&self) -> bool {
        matches!(self, ResultError::Store(StoreError::SubmissionNotFound(_)))
    }
}

pub type Result<T> = std::result::Result<T, ResultError>;
