pub mod error;
pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::problem::Problem;
use common::result::GradingResult;
use common::submission::{Submission, SubmissionTestcase};
use common::team_score::TeamScore;

pub use error::StoreError;
pub use memory::{MemoryProblemStore, MemoryRanklist, MemorySubmissionStore, MemoryTeamScoreStore};

/// Submission document store.
///
/// Every mutation is either conditional on the current status or a
/// commutative per-index update, never an unconditional whole-document
/// overwrite; that is what makes concurrent grading-result processing safe
/// without a lock. Conditional methods return whether they applied, so a
/// caller racing a duplicate delivery simply observes `false`.
#[async_trait]
pub trait SubmissionStore: Send + Sync {
    async fn insert(&self, submission: Submission) -> Result<(), StoreError>;

    async fn fetch(&self, id: &str) -> Result<Submission, StoreError>;

    /// Pending -> Compiling.
    async fn mark_compiling(&self, id: &str) -> Result<bool, StoreError>;

    /// Compiling -> Grading, setting the testcase vector (exactly once) and
    /// `graded_cases = 0`.
    async fn begin_grading(
        &self,
        id: &str,
        testcases: Vec<SubmissionTestcase>,
    ) -> Result<bool, StoreError>;

    /// Compiling -> CompileFailed with the compiler log.
    async fn mark_compile_failed(&self, id: &str, log: Option<String>) -> Result<bool, StoreError>;

    /// While Grading: set result and score at `index` and increment
    /// `graded_cases` by one. The increment is commutative across indices;
    /// an index that already holds a result is left untouched (duplicate
    /// delivery).
    async fn record_testcase_result(
        &self,
        id: &str,
        index: usize,
        result: GradingResult,
        score: u32,
    ) -> Result<bool, StoreError>;

    /// {Compiling, Grading} -> Terminated with an explanatory log. Never
    /// touches a terminal record.
    async fn terminate(&self, id: &str, log: Option<String>) -> Result<bool, StoreError>;

    /// Grading with all cases resolved -> Graded with the final score;
    /// clears `graded_cases`.
    async fn finalize_graded(&self, id: &str, score: u32) -> Result<bool, StoreError>;
}

/// Read-only problem lookup, by domain or contest scope.
#[async_trait]
pub trait ProblemStore: Send + Sync {
    async fn fetch_domain_problem(
        &self,
        domain_id: &str,
        problem_id: &str,
    ) -> Result<Problem, StoreError>;

    async fn fetch_contest_problem(
        &self,
        contest_id: &str,
        problem_id: &str,
    ) -> Result<Problem, StoreError>;
}

/// Contest standings store. Score updates are keep-maximum and never
/// decrease a stored value.
#[async_trait]
pub trait TeamScoreStore: Send + Sync {
    /// Raise the team's best score for a problem to `score` if it is higher,
    /// creating the record lazily. Returns whether the stored value
    /// increased.
    async fn raise_problem_score(
        &self,
        contest_id: &str,
        team_id: &str,
        problem_id: &str,
        score: u32,
    ) -> Result<bool, StoreError>;

    /// Record when the current best score for a problem was achieved.
    async fn set_problem_time(
        &self,
        contest_id: &str,
        team_id: &str,
        problem_id: &str,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    async fn fetch(
        &self,
        contest_id: &str,
        team_id: &str,
    ) -> Result<Option<TeamScore>, StoreError>;
}

/// Staleness flag for a contest's cached ranklist.
#[async_trait]
pub trait RanklistCache: Send + Sync {
    async fn mark_stale(&self, contest_id: &str) -> Result<(), StoreError>;

    async fn is_stale(&self, contest_id: &str) -> Result<bool, StoreError>;
}

/// External aggregation routine that recomputes a team's total score across
/// problems.
#[async_trait]
pub trait ScoreAggregator: Send + Sync {
    async fn recalculate_team_total(
        &self,
        contest_id: &str,
        team_id: &str,
    ) -> Result<(), StoreError>;
}
