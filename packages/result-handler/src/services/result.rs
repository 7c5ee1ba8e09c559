use std::sync::Arc;

use common::mq::TaskSink;
use common::result::{CompilingResult, CompilingStatus, GradingResult, JudgerResult};
use common::submission::{SubmissionScope, SubmissionStatus, SubmissionTestcase};
use common::task::{GradingTask, GradingTestcase, JudgerTask};
use tracing::{debug, error, info, instrument};

use crate::error::{Result, ResultError};
use crate::services::scoreboard::ScoreboardService;
use crate::store::{ProblemStore, SubmissionStore};

const NO_TESTCASES_LOG: &str = "Problem does not have testcases";
const NO_CHECKER_LOG: &str = "Problem Checker does not exist or is not compiled";

/// How a testcase result converts into points. The default is all-or-nothing:
/// full points on Accepted, zero otherwise.
#[derive(Clone, Copy, Debug, Default)]
pub struct ScoringPolicy {
    /// When enabled, an accepted result scores `points * checker_fraction`
    /// instead of all-or-nothing.
    pub partial_credit: bool,
}

impl ScoringPolicy {
    pub fn testcase_score(&self, points: u32, result: &GradingResult) -> u32 {
        if !result.status.is_accepted() {
            return 0;
        }
        match (self.partial_credit, result.checker_fraction) {
            (true, Some(fraction)) => (f64::from(points) * fraction.clamp(0.0, 1.0)).round() as u32,
            _ => points,
        }
    }
}

/// The submission state machine.
///
/// Every handler is a function of (persisted state, event): it re-reads the
/// submission first and applies mutations only when the current status
/// matches the expected precondition, which makes each handler safe under
/// the broker's at-least-once delivery.
pub struct ResultService {
    submissions: Arc<dyn SubmissionStore>,
    problems: Arc<dyn ProblemStore>,
    tasks: Arc<dyn TaskSink>,
    scoreboard: Arc<ScoreboardService>,
    scoring: ScoringPolicy,
}

impl ResultService {
    pub fn new(
        submissions: Arc<dyn SubmissionStore>,
        problems: Arc<dyn ProblemStore>,
        tasks: Arc<dyn TaskSink>,
        scoreboard: Arc<ScoreboardService>,
        scoring: ScoringPolicy,
    ) -> Self {
        Self {
            submissions,
            problems,
            tasks,
            scoreboard,
            scoring,
        }
    }

    /// Dispatch one result message from the judger.
    pub async fn handle_judger_result(&self, result: JudgerResult) -> Result<()> {
        match result {
            JudgerResult::Compiling {
                submission_id,
                result,
            } => self.handle_compiling_result(result, &submission_id).await,
            JudgerResult::Grading {
                submission_id,
                testcase_index,
                result,
            } => {
                self.handle_grading_result(result, &submission_id, testcase_index)
                    .await
            }
        }
    }

    #[instrument(skip(self, result))]
    pub async fn handle_compiling_result(
        &self,
        result: CompilingResult,
        submission_id: &str,
    ) -> Result<()> {
        let submission = self.submissions.fetch(submission_id).await?;

        if submission.status != SubmissionStatus::Compiling {
            debug!(status = %submission.status, "stale compiling result ignored");
            return Ok(());
        }

        if result.status == CompilingStatus::Failed {
            self.submissions
                .mark_compile_failed(submission_id, result.log)
                .await?;
            return Ok(());
        }

        let problem = match &submission.scope {
            SubmissionScope::Testing {
                domain_id,
                problem_id,
            } => {
                self.problems
                    .fetch_domain_problem(domain_id, problem_id)
                    .await?
            }
            SubmissionScope::Contest {
                contest_id,
                problem_id,
                ..
            } => {
                self.problems
                    .fetch_contest_problem(contest_id, problem_id)
                    .await?
            }
        };

        // Without testcases or a compiled checker there is nothing to grade;
        // terminate rather than hang in Grading forever.
        let testcases = match problem.testcases.as_ref().filter(|t| !t.is_empty()) {
            Some(testcases) => testcases,
            None => {
                return self
                    .complete_grading(submission_id, Some(NO_TESTCASES_LOG.into()))
                    .await;
            }
        };
        let Some(checker) = problem.checker.clone() else {
            return self
                .complete_grading(submission_id, Some(NO_CHECKER_LOG.into()))
                .await;
        };

        // All grading tasks are published before the Grading transition is
        // committed; a result racing ahead finds status != Grading and is
        // ignored until a consistent read.
        let mut submission_testcases = Vec::with_capacity(testcases.len());
        for (index, testcase) in testcases.iter().enumerate() {
            self.tasks
                .publish_task(JudgerTask::Grading(GradingTask {
                    submission_id: submission_id.to_string(),
                    problem_id: problem.id.clone(),
                    testcase_index: index,
                    language: submission.language.clone(),
                    constraints: problem.constraints.clone(),
                    testcase: GradingTestcase {
                        input: testcase.input.clone(),
                        output: testcase.output.clone(),
                    },
                    checker: Some(checker.clone()),
                }))
                .await?;
            submission_testcases.push(SubmissionTestcase {
                points: testcase.points,
                input: testcase.input.clone(),
                output: testcase.output.clone(),
                score: None,
                result: None,
            });
        }

        let applied = self
            .submissions
            .begin_grading(submission_id, submission_testcases)
            .await?;
        if !applied {
            debug!("Grading transition lost a race; duplicate delivery");
        } else {
            info!(cases = testcases.len(), "submission moved to Grading");
        }
        Ok(())
    }

    #[instrument(skip(self, result))]
    pub async fn handle_grading_result(
        &self,
        result: GradingResult,
        submission_id: &str,
        testcase_index: usize,
    ) -> Result<()> {
        let submission = self.submissions.fetch(submission_id).await?;

        if submission.status != SubmissionStatus::Grading {
            debug!(status = %submission.status, "stale grading result ignored");
            return Ok(());
        }

        // A result pointing outside the stored testcase array is a contract
        // violation; report it, never write it.
        let case = submission
            .testcases
            .as_ref()
            .and_then(|testcases| testcases.get(testcase_index))
            .ok_or_else(|| ResultError::TestcaseNotFound {
                submission_id: submission_id.to_string(),
                index: testcase_index,
            })?;

        let score = self.scoring.testcase_score(case.points, &result);
        self.submissions
            .record_testcase_result(submission_id, testcase_index, result, score)
            .await?;

        // Decide completion on a fresh read; results race, so the count may
        // fill on another handler's watch, and complete_grading tolerates
        // being invoked more than once.
        let updated = self.submissions.fetch(submission_id).await?;
        if updated.status == SubmissionStatus::Grading
            && updated.graded_cases == updated.testcases.as_ref().map(Vec::len)
        {
            self.complete_grading(submission_id, None).await?;
        }
        Ok(())
    }

    /// Finalize a submission: Graded when every case resolved, Terminated
    /// when grading was cut short.
    #[instrument(skip(self, log))]
    pub async fn complete_grading(
        &self,
        submission_id: &str,
        log: Option<String>,
    ) -> Result<()> {
        let submission = self.submissions.fetch(submission_id).await?;

        match submission.status {
            status if status.is_terminal() => {
                // Must never overwrite a terminal record.
                error!(status = %status, "completeGrading called on a terminal submission");
                Ok(())
            }
            SubmissionStatus::Pending => {
                error!("completeGrading called on a Pending submission");
                Ok(())
            }
            SubmissionStatus::Compiling => {
                self.submissions.terminate(submission_id, log).await?;
                Ok(())
            }
            SubmissionStatus::Grading => {
                let testcases = submission.testcases.as_deref().unwrap_or_default();
                if submission.graded_cases != Some(testcases.len()) {
                    self.submissions.terminate(submission_id, log).await?;
                    return Ok(());
                }

                let score: u32 = testcases.iter().map(|case| case.score.unwrap_or(0)).sum();
                let applied = self.submissions.finalize_graded(submission_id, score).await?;
                if !applied {
                    // A concurrent invocation finalized first.
                    return Ok(());
                }
                info!(score, "submission graded");

                if let SubmissionScope::Contest {
                    contest_id,
                    problem_id,
                    team_id,
                } = &submission.scope
                {
                    self.scoreboard
                        .apply_graded_submission(
                            contest_id,
                            team_id,
                            problem_id,
                            score,
                            submission.created_at,
                        )
                        .await?;
                }
                Ok(())
            }
            // Statuses are covered above; the compiler cannot see that.
            _ => Ok(()),
        }
    }
}
