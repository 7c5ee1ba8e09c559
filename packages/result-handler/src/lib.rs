pub mod config;
pub mod consumers;
pub mod error;
pub mod services;
pub mod store;

pub use error::{Result, ResultError};
pub use services::{NewSubmission, ResultService, ScoreboardService, ScoringPolicy, SubmissionService};
