pub mod result;
pub mod scoreboard;
pub mod submission;

pub use result::{ResultService, ScoringPolicy};
pub use scoreboard::ScoreboardService;
pub use submission::{NewSubmission, SubmissionService};
