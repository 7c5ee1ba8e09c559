use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("No submission found with the given ID: {0}")]
    SubmissionNotFound(String),

    #[error("No problem found: {0}")]
    ProblemNotFound(String),

    #[error("Store error: {0}")]
    Internal(String),
}
