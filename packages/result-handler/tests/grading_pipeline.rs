use std::sync::Arc;

use async_trait::async_trait;
use common::languages::LanguageRegistry;
use common::mq::{MessageError, TaskSink};
use common::problem::{Problem, ProblemTestcase};
use common::result::{CompilingResult, GradingResult, GradingStatus, JudgerResult};
use common::submission::{SubmissionScope, SubmissionStatus};
use common::task::{BlobRef, JudgerTask};
use result_handler::services::{
    NewSubmission, ResultService, ScoreboardService, ScoringPolicy, SubmissionService,
};
use result_handler::store::{
    MemoryProblemStore, MemoryRanklist, MemorySubmissionStore, MemoryTeamScoreStore,
    RanklistCache, SubmissionStore, TeamScoreStore,
};
use result_handler::ResultError;
use tokio::sync::Mutex;

/// Task sink that records published tasks instead of touching a broker.
#[derive(Default)]
struct RecordingTaskSink {
    tasks: Mutex<Vec<JudgerTask>>,
}

#[async_trait]
impl TaskSink for RecordingTaskSink {
    async fn publish_task(&self, task: JudgerTask) -> Result<(), MessageError> {
        self.tasks.lock().await.push(task);
        Ok(())
    }
}

impl RecordingTaskSink {
    async fn drain(&self) -> Vec<JudgerTask> {
        std::mem::take(&mut *self.tasks.lock().await)
    }
}

struct Harness {
    submissions: Arc<MemorySubmissionStore>,
    problems: Arc<MemoryProblemStore>,
    team_scores: Arc<MemoryTeamScoreStore>,
    ranklist: Arc<MemoryRanklist>,
    sink: Arc<RecordingTaskSink>,
    submission_service: SubmissionService,
    result_service: Arc<ResultService>,
}

impl Harness {
    fn new(scoring: ScoringPolicy) -> Self {
        let submissions = Arc::new(MemorySubmissionStore::new());
        let problems = Arc::new(MemoryProblemStore::new());
        let team_scores = Arc::new(MemoryTeamScoreStore::new());
        let ranklist = Arc::new(MemoryRanklist::new());
        let sink = Arc::new(RecordingTaskSink::default());

        let scoreboard = Arc::new(ScoreboardService::new(
            Arc::clone(&team_scores) as Arc<dyn TeamScoreStore>,
            Arc::clone(&team_scores) as _,
            Arc::clone(&ranklist) as Arc<dyn RanklistCache>,
        ));
        let submission_service = SubmissionService::new(
            Arc::clone(&submissions) as Arc<dyn SubmissionStore>,
            Arc::clone(&sink) as Arc<dyn TaskSink>,
            LanguageRegistry::builtin(),
        );
        let result_service = Arc::new(ResultService::new(
            Arc::clone(&submissions) as _,
            Arc::clone(&problems) as _,
            Arc::clone(&sink) as _,
            scoreboard,
            scoring,
        ));

        Self {
            submissions,
            problems,
            team_scores,
            ranklist,
            sink,
            submission_service,
            result_service,
        }
    }

    /// Create and queue a submission, dropping the compiling task it
    /// publishes so tests only observe grading tasks.
    async fn submit(&self, scope: SubmissionScope) -> String {
        let id = self
            .submission_service
            .create_submission(
                NewSubmission {
                    language: "cpp".into(),
                    source: "int main() {}".into(),
                },
                scope,
            )
            .await
            .unwrap();
        self.submission_service.queue_submission(&id).await.unwrap();
        self.sink.drain().await;
        id
    }

    async fn compile_succeeded(&self, id: &str) {
        self.result_service
            .handle_compiling_result(CompilingResult::succeeded(), id)
            .await
            .unwrap();
    }

    async fn deliver(&self, id: &str, index: usize, status: GradingStatus) {
        self.result_service
            .handle_grading_result(GradingResult::new(status), id, index)
            .await
            .unwrap();
    }
}

fn testing_scope() -> SubmissionScope {
    SubmissionScope::Testing {
        domain_id: "d1".into(),
        problem_id: "p1".into(),
    }
}

fn contest_scope(team_id: &str) -> SubmissionScope {
    SubmissionScope::Contest {
        contest_id: "c1".into(),
        problem_id: "p1".into(),
        team_id: team_id.into(),
    }
}

fn problem(points: &[u32], with_checker: bool) -> Problem {
    Problem {
        id: "p1".into(),
        constraints: Default::default(),
        testcases: Some(
            points
                .iter()
                .enumerate()
                .map(|(i, &points)| ProblemTestcase {
                    input: BlobRef::new(format!("p1/{i}.in"), "v1"),
                    output: BlobRef::new(format!("p1/{i}.out"), "v1"),
                    points,
                })
                .collect(),
        ),
        checker: with_checker.then(|| BlobRef::new("p1/checker", "v1")),
    }
}

#[tokio::test]
async fn test_full_grading_flow() {
    let h = Harness::new(ScoringPolicy::default());
    h.problems.insert_domain_problem("d1", problem(&[40, 30, 30], true));
    let id = h.submit(testing_scope()).await;

    h.compile_succeeded(&id).await;

    let tasks = h.sink.drain().await;
    assert_eq!(tasks.len(), 3);
    for (i, task) in tasks.iter().enumerate() {
        match task {
            JudgerTask::Grading(task) => {
                assert_eq!(task.submission_id, id);
                assert_eq!(task.testcase_index, i);
                assert!(task.checker.is_some());
            }
            other => panic!("unexpected task: {other:?}"),
        }
    }
    let submission = h.submissions.fetch(&id).await.unwrap();
    assert_eq!(submission.status, SubmissionStatus::Grading);
    assert_eq!(submission.graded_cases, Some(0));

    h.deliver(&id, 0, GradingStatus::Accepted).await;
    h.deliver(&id, 1, GradingStatus::WrongAnswer).await;
    h.deliver(&id, 2, GradingStatus::Accepted).await;

    let submission = h.submissions.fetch(&id).await.unwrap();
    assert_eq!(submission.status, SubmissionStatus::Graded);
    assert_eq!(submission.score, Some(70));
    assert_eq!(submission.graded_cases, None);
    let scores: Vec<_> = submission
        .testcases
        .unwrap()
        .iter()
        .map(|c| c.score)
        .collect();
    assert_eq!(scores, vec![Some(40), Some(0), Some(30)]);
}

#[tokio::test]
async fn test_compile_failure() {
    let h = Harness::new(ScoringPolicy::default());
    h.problems.insert_domain_problem("d1", problem(&[100], true));
    let id = h.submit(testing_scope()).await;

    h.result_service
        .handle_compiling_result(
            CompilingResult::failed("main.cpp:1:1: error: expected unqualified-id"),
            &id,
        )
        .await
        .unwrap();

    let submission = h.submissions.fetch(&id).await.unwrap();
    assert_eq!(submission.status, SubmissionStatus::CompileFailed);
    assert_eq!(
        submission.log.as_deref(),
        Some("main.cpp:1:1: error: expected unqualified-id")
    );
    assert!(h.sink.drain().await.is_empty());
}

#[tokio::test]
async fn test_missing_checker_terminates() {
    let h = Harness::new(ScoringPolicy::default());
    h.problems.insert_domain_problem("d1", problem(&[100], false));
    let id = h.submit(testing_scope()).await;

    h.compile_succeeded(&id).await;

    let submission = h.submissions.fetch(&id).await.unwrap();
    assert_eq!(submission.status, SubmissionStatus::Terminated);
    assert_eq!(
        submission.log.as_deref(),
        Some("Problem Checker does not exist or is not compiled")
    );
    assert!(h.sink.drain().await.is_empty());
}

#[tokio::test]
async fn test_missing_testcases_terminates() {
    let h = Harness::new(ScoringPolicy::default());
    h.problems.insert_domain_problem(
        "d1",
        Problem {
            id: "p1".into(),
            constraints: Default::default(),
            testcases: None,
            checker: Some(BlobRef::new("p1/checker", "v1")),
        },
    );
    let id = h.submit(testing_scope()).await;

    h.compile_succeeded(&id).await;

    let submission = h.submissions.fetch(&id).await.unwrap();
    assert_eq!(submission.status, SubmissionStatus::Terminated);
    assert_eq!(
        submission.log.as_deref(),
        Some("Problem does not have testcases")
    );
}

#[tokio::test]
async fn test_out_of_range_index_is_an_error() {
    let h = Harness::new(ScoringPolicy::default());
    h.problems.insert_domain_problem("d1", problem(&[40, 30, 30], true));
    let id = h.submit(testing_scope()).await;
    h.compile_succeeded(&id).await;

    let err = h
        .result_service
        .handle_grading_result(GradingResult::new(GradingStatus::Accepted), &id, 5)
        .await
        .unwrap_err();
    assert!(matches!(err, ResultError::TestcaseNotFound { index: 5, .. }));

    // Nothing was mutated.
    let submission = h.submissions.fetch(&id).await.unwrap();
    assert_eq!(submission.status, SubmissionStatus::Grading);
    assert_eq!(submission.graded_cases, Some(0));
}

#[tokio::test]
async fn test_duplicate_result_counted_once() {
    let h = Harness::new(ScoringPolicy::default());
    h.problems.insert_domain_problem("d1", problem(&[50, 50], true));
    let id = h.submit(testing_scope()).await;
    h.compile_succeeded(&id).await;

    h.deliver(&id, 0, GradingStatus::Accepted).await;
    // Redelivery of the same result must not double-count.
    h.deliver(&id, 0, GradingStatus::Accepted).await;

    let submission = h.submissions.fetch(&id).await.unwrap();
    assert_eq!(submission.status, SubmissionStatus::Grading);
    assert_eq!(submission.graded_cases, Some(1));

    h.deliver(&id, 1, GradingStatus::Accepted).await;
    let submission = h.submissions.fetch(&id).await.unwrap();
    assert_eq!(submission.status, SubmissionStatus::Graded);
    assert_eq!(submission.score, Some(100));
}

#[tokio::test]
async fn test_result_order_does_not_matter() {
    let mut finals = Vec::new();
    for order in [[0usize, 1, 2], [2, 0, 1], [1, 2, 0]] {
        let h = Harness::new(ScoringPolicy::default());
        h.problems.insert_domain_problem("d1", problem(&[40, 30, 30], true));
        let id = h.submit(testing_scope()).await;
        h.compile_succeeded(&id).await;

        for index in order {
            let status = if index == 1 {
                GradingStatus::TimeLimitExceeded
            } else {
                GradingStatus::Accepted
            };
            h.deliver(&id, index, status).await;
        }
        finals.push(h.submissions.fetch(&id).await.unwrap().score);
    }
    assert_eq!(finals, vec![Some(70), Some(70), Some(70)]);
}

#[tokio::test]
async fn test_results_after_termination_ignored() {
    let h = Harness::new(ScoringPolicy::default());
    h.problems.insert_domain_problem("d1", problem(&[100], true));
    let id = h.submit(testing_scope()).await;
    h.compile_succeeded(&id).await;

    h.result_service
        .complete_grading(&id, Some("judging aborted".into()))
        .await
        .unwrap();
    let submission = h.submissions.fetch(&id).await.unwrap();
    assert_eq!(submission.status, SubmissionStatus::Terminated);

    // A straggler result for the terminated submission is dropped.
    h.deliver(&id, 0, GradingStatus::Accepted).await;
    let submission = h.submissions.fetch(&id).await.unwrap();
    assert_eq!(submission.status, SubmissionStatus::Terminated);
    assert_eq!(submission.score, None);
}

#[tokio::test]
async fn test_complete_grading_never_overwrites_terminal() {
    let h = Harness::new(ScoringPolicy::default());
    h.problems.insert_domain_problem("d1", problem(&[100], true));
    let id = h.submit(testing_scope()).await;
    h.compile_succeeded(&id).await;
    h.deliver(&id, 0, GradingStatus::Accepted).await;

    let graded = h.submissions.fetch(&id).await.unwrap();
    assert_eq!(graded.status, SubmissionStatus::Graded);

    h.result_service
        .complete_grading(&id, Some("late".into()))
        .await
        .unwrap();

    let after = h.submissions.fetch(&id).await.unwrap();
    assert_eq!(after.status, SubmissionStatus::Graded);
    assert_eq!(after.score, Some(100));
    assert_eq!(after.log, None);
}

#[tokio::test]
async fn test_contest_scoreboard_updates() {
    let h = Harness::new(ScoringPolicy::default());
    h.problems.insert_contest_problem("c1", problem(&[60, 40], true));
    let id = h.submit(contest_scope("t1")).await;
    h.compile_succeeded(&id).await;

    h.deliver(&id, 0, GradingStatus::Accepted).await;
    h.deliver(&id, 1, GradingStatus::WrongAnswer).await;

    let score = h.team_scores.fetch("c1", "t1").await.unwrap().unwrap();
    assert_eq!(score.scores.get("p1"), Some(&60));
    assert_eq!(score.total_score, 60);
    assert!(score.time.contains_key("p1"));
    assert!(h.ranklist.is_stale("c1").await.unwrap());
}

#[tokio::test]
async fn test_team_score_never_decreases() {
    let h = Harness::new(ScoringPolicy::default());
    h.problems.insert_contest_problem("c1", problem(&[100], true));

    let first = h.submit(contest_scope("t1")).await;
    h.compile_succeeded(&first).await;
    h.deliver(&first, 0, GradingStatus::Accepted).await;

    let before = h.team_scores.fetch("c1", "t1").await.unwrap().unwrap();
    assert_eq!(before.total_score, 100);
    let solved_at = *before.time.get("p1").unwrap();

    // A later, worse submission leaves the standings untouched.
    let second = h.submit(contest_scope("t1")).await;
    h.compile_succeeded(&second).await;
    h.deliver(&second, 0, GradingStatus::WrongAnswer).await;

    let after = h.team_scores.fetch("c1", "t1").await.unwrap().unwrap();
    assert_eq!(after.scores.get("p1"), Some(&100));
    assert_eq!(after.total_score, 100);
    assert_eq!(*after.time.get("p1").unwrap(), solved_at);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_results_finalize_once() {
    let h = Harness::new(ScoringPolicy::default());
    h.problems
        .insert_contest_problem("c1", problem(&[25, 25, 25, 25], true));
    let id = h.submit(contest_scope("t1")).await;
    h.compile_succeeded(&id).await;

    // All four results land concurrently, plus duplicates of each.
    let mut handles = Vec::new();
    for index in 0..4 {
        for _ in 0..3 {
            let service = Arc::clone(&h.result_service);
            let id = id.clone();
            handles.push(tokio::spawn(async move {
                service
                    .handle_grading_result(
                        GradingResult::new(GradingStatus::Accepted),
                        &id,
                        index,
                    )
                    .await
            }));
        }
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let submission = h.submissions.fetch(&id).await.unwrap();
    assert_eq!(submission.status, SubmissionStatus::Graded);
    assert_eq!(submission.score, Some(100));

    let score = h.team_scores.fetch("c1", "t1").await.unwrap().unwrap();
    assert_eq!(score.scores.get("p1"), Some(&100));
    assert_eq!(score.total_score, 100);
}

#[tokio::test]
async fn test_unknown_language_rejected() {
    let h = Harness::new(ScoringPolicy::default());
    let err = h
        .submission_service
        .create_submission(
            NewSubmission {
                language: "cobol".into(),
                source: "DISPLAY 'HELLO'.".into(),
            },
            testing_scope(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ResultError::UnknownLanguage(lang) if lang == "cobol"));
}

#[tokio::test]
async fn test_unknown_submission_is_stale_fallout() {
    let h = Harness::new(ScoringPolicy::default());
    let err = h
        .result_service
        .handle_judger_result(JudgerResult::Grading {
            submission_id: "gone".into(),
            testcase_index: 0,
            result: GradingResult::new(GradingStatus::Accepted),
        })
        .await
        .unwrap_err();
    assert!(err.is_stale_fallout());
}

#[tokio::test]
async fn test_partial_credit_scoring() {
    let h = Harness::new(ScoringPolicy {
        partial_credit: true,
    });
    h.problems.insert_domain_problem("d1", problem(&[100], true));
    let id = h.submit(testing_scope()).await;
    h.compile_succeeded(&id).await;

    let mut result = GradingResult::new(GradingStatus::Accepted);
    result.checker_fraction = Some(0.35);
    h.result_service
        .handle_grading_result(result, &id, 0)
        .await
        .unwrap();

    let submission = h.submissions.fetch(&id).await.unwrap();
    assert_eq!(submission.status, SubmissionStatus::Graded);
    assert_eq!(submission.score, Some(35));
}

#[test]
fn test_scoring_policy_table() {
    let strict = ScoringPolicy::default();
    let partial = ScoringPolicy {
        partial_credit: true,
    };
    let mut accepted = GradingResult::new(GradingStatus::Accepted);
    accepted.checker_fraction = Some(0.5);
    let rejected = GradingResult::new(GradingStatus::WrongAnswer);

    assert_eq!(strict.testcase_score(40, &accepted), 40);
    assert_eq!(partial.testcase_score(40, &accepted), 20);
    assert_eq!(strict.testcase_score(40, &rejected), 0);
    assert_eq!(partial.testcase_score(40, &rejected), 0);
    assert_eq!(
        partial.testcase_score(40, &GradingResult::new(GradingStatus::Accepted)),
        40
    );
}

#[tokio::test]
async fn test_compiling_result_on_created_submission_ignored() {
    let h = Harness::new(ScoringPolicy::default());
    let id = h
        .submission_service
        .create_submission(
            NewSubmission {
                language: "cpp".into(),
                source: "int main() {}".into(),
            },
            testing_scope(),
        )
        .await
        .unwrap();

    // Still Pending; a compiling result is stale and dropped.
    h.result_service
        .handle_compiling_result(CompilingResult::succeeded(), &id)
        .await
        .unwrap();
    let submission = h.submissions.fetch(&id).await.unwrap();
    assert_eq!(submission.status, SubmissionStatus::Pending);
}
