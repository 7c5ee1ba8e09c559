use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use common::problem::Problem;
use common::result::GradingResult;
use common::submission::{Submission, SubmissionStatus, SubmissionTestcase};
use common::team_score::TeamScore;

use super::error::StoreError;
use super::{ProblemStore, RanklistCache, ScoreAggregator, SubmissionStore, TeamScoreStore};

/// In-memory submission store.
///
/// DashMap gives per-entry locking, so each conditional update or counter
/// increment below executes atomically with respect to other updates of the
/// same submission while different submissions proceed in parallel — the
/// same guarantees a document store provides with conditional writes and
/// `$inc`/`$set`-by-index updates.
#[derive(Default)]
pub struct MemorySubmissionStore {
    submissions: DashMap<String, Submission>,
}

impl MemorySubmissionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SubmissionStore for MemorySubmissionStore {
    async fn insert(&self, submission: Submission) -> Result<(), StoreError> {
        self.submissions.insert(submission.id.clone(), submission);
        Ok(())
    }

    async fn fetch(&self, id: &str) -> Result<Submission, StoreError> {
        self.submissions
            .get(id)
            .map(|entry| entry.clone())
            .ok_or_else(|| StoreError::SubmissionNotFound(id.to_string()))
    }

    async fn mark_compiling(&self, id: &str) -> Result<bool, StoreError> {
        let mut entry = self
            .submissions
            .get_mut(id)
            .ok_or_else(|| StoreError::SubmissionNotFound(id.to_string()))?;
        if entry.status != SubmissionStatus::Pending {
            return Ok(false);
        }
        entry.status = SubmissionStatus::Compiling;
        Ok(true)
    }

    async fn begin_grading(
        &self,
        id: &str,
        testcases: Vec<SubmissionTestcase>,
    ) -> Result<bool, StoreError> {
        let mut entry = self
            .submissions
            .get_mut(id)
            .ok_or_else(|| StoreError::SubmissionNotFound(id.to_string()))?;
        if entry.status != SubmissionStatus::Compiling {
            return Ok(false);
        }
        entry.status = SubmissionStatus::Grading;
        entry.graded_cases = Some(0);
        entry.testcases = Some(testcases);
        Ok(true)
    }

    async fn mark_compile_failed(&self, id: &str, log: Option<String>) -> Result<bool, StoreError> {
        let mut entry = self
            .submissions
            .get_mut(id)
            .ok_or_else(|| StoreError::SubmissionNotFound(id.to_string()))?;
        if entry.status != SubmissionStatus::Compiling {
            return Ok(false);
        }
        entry.status = SubmissionStatus::CompileFailed;
        entry.log = log;
        Ok(true)
    }

    async fn record_testcase_result(
        &self,
        id: &str,
        index: usize,
        result: GradingResult,
        score: u32,
    ) -> Result<bool, StoreError> {
        let mut entry = self
            .submissions
            .get_mut(id)
            .ok_or_else(|| StoreError::SubmissionNotFound(id.to_string()))?;
        if entry.status != SubmissionStatus::Grading {
            return Ok(false);
        }
        let Some(testcases) = entry.testcases.as_mut() else {
            return Err(StoreError::Internal(format!(
                "submission {id} is Grading without testcases"
            )));
        };
        let Some(case) = testcases.get_mut(index) else {
            return Err(StoreError::Internal(format!(
                "testcase index {index} out of bounds for submission {id}"
            )));
        };
        // Duplicate delivery: the slot is already resolved, do not count it
        // twice.
        if case.result.is_some() {
            return Ok(false);
        }
        case.result = Some(result);
        case.score = Some(score);
        entry.graded_cases = Some(entry.graded_cases.unwrap_or(0) + 1);
        Ok(true)
    }

    async fn terminate(&self, id: &str, log: Option<String>) -> Result<bool, StoreError> {
        let mut entry = self
            .submissions
            .get_mut(id)
            .ok_or_else(|| StoreError::SubmissionNotFound(id.to_string()))?;
        if !matches!(
            entry.status,
            SubmissionStatus::Compiling | SubmissionStatus::Grading
        ) {
            return Ok(false);
        }
        entry.status = SubmissionStatus::Terminated;
        entry.log = log;
        entry.graded_cases = None;
        Ok(true)
    }

    async fn finalize_graded(&self, id: &str, score: u32) -> Result<bool, StoreError> {
        let mut entry = self
            .submissions
            .get_mut(id)
            .ok_or_else(|| StoreError::SubmissionNotFound(id.to_string()))?;
        let complete = entry.status == SubmissionStatus::Grading
            && entry.graded_cases == entry.testcases.as_ref().map(Vec::len);
        if !complete {
            return Ok(false);
        }
        entry.status = SubmissionStatus::Graded;
        entry.score = Some(score);
        entry.graded_cases = None;
        Ok(true)
    }
}

/// In-memory problem lookup, keyed by (scope id, problem id).
#[derive(Default)]
pub struct MemoryProblemStore {
    domain_problems: DashMap<(String, String), Problem>,
    contest_problems: DashMap<(String, String), Problem>,
}

impl MemoryProblemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_domain_problem(&self, domain_id: &str, problem: Problem) {
        self.domain_problems
            .insert((domain_id.to_string(), problem.id.clone()), problem);
    }

    pub fn insert_contest_problem(&self, contest_id: &str, problem: Problem) {
        self.contest_problems
            .insert((contest_id.to_string(), problem.id.clone()), problem);
    }
}

#[async_trait]
impl ProblemStore for MemoryProblemStore {
    async fn fetch_domain_problem(
        &self,
        domain_id: &str,
        problem_id: &str,
    ) -> Result<Problem, StoreError> {
        self.domain_problems
            .get(&(domain_id.to_string(), problem_id.to_string()))
            .map(|entry| entry.clone())
            .ok_or_else(|| StoreError::ProblemNotFound(format!("{domain_id}/{problem_id}")))
    }

    async fn fetch_contest_problem(
        &self,
        contest_id: &str,
        problem_id: &str,
    ) -> Result<Problem, StoreError> {
        self.contest_problems
            .get(&(contest_id.to_string(), problem_id.to_string()))
            .map(|entry| entry.clone())
            .ok_or_else(|| StoreError::ProblemNotFound(format!("{contest_id}/{problem_id}")))
    }
}

/// In-memory team score store; doubles as the total-score aggregator.
#[derive(Default)]
pub struct MemoryTeamScoreStore {
    scores: DashMap<(String, String), TeamScore>,
}

impl MemoryTeamScoreStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TeamScoreStore for MemoryTeamScoreStore {
    async fn raise_problem_score(
        &self,
        contest_id: &str,
        team_id: &str,
        problem_id: &str,
        score: u32,
    ) -> Result<bool, StoreError> {
        let mut entry = self
            .scores
            .entry((contest_id.to_string(), team_id.to_string()))
            .or_insert_with(|| TeamScore::new(contest_id, team_id));
        // Keep-maximum: an equal or lower score is a no-op. Setting a score
        // where none existed counts as an increase, even a zero.
        match entry.scores.get(problem_id).copied() {
            Some(current) if score <= current => Ok(false),
            _ => {
                entry.scores.insert(problem_id.to_string(), score);
                Ok(true)
            }
        }
    }

    async fn set_problem_time(
        &self,
        contest_id: &str,
        team_id: &str,
        problem_id: &str,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut entry = self
            .scores
            .entry((contest_id.to_string(), team_id.to_string()))
            .or_insert_with(|| TeamScore::new(contest_id, team_id));
        entry.time.insert(problem_id.to_string(), at);
        Ok(())
    }

    async fn fetch(
        &self,
        contest_id: &str,
        team_id: &str,
    ) -> Result<Option<TeamScore>, StoreError> {
        Ok(self
            .scores
            .get(&(contest_id.to_string(), team_id.to_string()))
            .map(|entry| entry.clone()))
    }
}

#[async_trait]
impl ScoreAggregator for MemoryTeamScoreStore {
    async fn recalculate_team_total(
        &self,
        contest_id: &str,
        team_id: &str,
    ) -> Result<(), StoreError> {
        if let Some(mut entry) = self
            .scores
            .get_mut(&(contest_id.to_string(), team_id.to_string()))
        {
            entry.total_score = entry.scores.values().sum();
        }
        Ok(())
    }
}

/// In-memory ranklist staleness flags, one per contest.
#[derive(Default)]
pub struct MemoryRanklist {
    stale: DashMap<String, bool>,
}

impl MemoryRanklist {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RanklistCache for MemoryRanklist {
    async fn mark_stale(&self, contest_id: &str) -> Result<(), StoreError> {
        self.stale.insert(contest_id.to_string(), true);
        Ok(())
    }

    async fn is_stale(&self, contest_id: &str) -> Result<bool, StoreError> {
        Ok(self
            .stale
            .get(contest_id)
            .map(|entry| *entry)
            .unwrap_or(false))
    }
}
