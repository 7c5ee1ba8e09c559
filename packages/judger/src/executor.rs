use std::sync::Arc;

use async_trait::async_trait;
use common::languages::{Language, LanguageRegistry};
use common::result::{
    CompilingResult, GradingResult, GradingStatus, JudgerResult, ResourceMetrics,
};
use common::storage::ObjectStore;
use common::task::{CompilingTask, GradingTask, JudgerTask};
use common::Constraints;
use tracing::{debug, instrument};

use crate::error::{JudgerError, Result};
use crate::sandbox::{RunOutcome, RunSpec, RunStatus, Sandbox};

const INPUT_FILE: &str = "case.in";
const OUTPUT_FILE: &str = "case.out";
const EXPECTED_FILE: &str = "expected.out";
const CHECKER_FILE: &str = "checker";
const CHECKER_OUTPUT_FILE: &str = "checker.out";

/// Object-store prefix for compiled submission artifacts.
fn artifact_object_name(submission_id: &str) -> String {
    format!("binaries/{submission_id}")
}

/// Limits for compiler and checker invocations. Task constraints overlay
/// these, so a task can tighten them but an unset field stays sane for a
/// compiler (which needs more processes and time than the graded program).
fn tool_limits() -> Constraints {
    Constraints::new()
        .with_time_ms(30_000)
        .with_memory_kb(512 * Constraints::MB)
        .with_output_kb(64 * Constraints::MB)
        .with_processes(10)
}

/// Executes one judger task on an already-acquired sandbox slot.
#[async_trait]
pub trait Execute: Send + Sync {
    async fn execute(&self, task: JudgerTask, slot: u32) -> Result<JudgerResult>;
}

pub struct Executor {
    sandbox: Arc<dyn Sandbox>,
    storage: Arc<dyn ObjectStore>,
    languages: LanguageRegistry,
}

impl Executor {
    pub fn new(
        sandbox: Arc<dyn Sandbox>,
        storage: Arc<dyn ObjectStore>,
        languages: LanguageRegistry,
    ) -> Self {
        Self {
            sandbox,
            storage,
            languages,
        }
    }

    fn language(&self, key: &str) -> Result<&Language> {
        self.languages
            .get(key)
            .ok_or_else(|| JudgerError::UnknownLanguage(key.to_string()))
    }

    /// Compile a submission. A compiler rejection is a `Failed` result, not
    /// an error; only sandbox/storage faults propagate as errors.
    ///
    /// On success the runnable artifact is published to the object store so
    /// grading tasks (which run in fresh sandboxes, possibly on another
    /// judger) can fetch it.
    #[instrument(skip(self, task), fields(submission_id = %task.submission_id))]
    async fn compile(&self, task: &CompilingTask, slot: u32) -> Result<CompilingResult> {
        let lang = self.language(&task.language)?;

        let Some(compile_command) = &lang.compile else {
            // Interpreted language: the source is the artifact.
            self.storage
                .put(&artifact_object_name(&task.submission_id), task.source.as_bytes())
                .await?;
            return Ok(CompilingResult::succeeded());
        };

        self.sandbox
            .write_file(slot, &lang.source_name, task.source.as_bytes())
            .await?;

        let argv = Language::expand_command(compile_command, &lang.source_name, &lang.artifact_name);
        let outcome = self
            .sandbox
            .run(
                slot,
                RunSpec {
                    argv,
                    stdin_file: None,
                    stdout_file: None,
                    limits: tool_limits().overlaid(&task.constraints),
                },
            )
            .await?;

        if !outcome.status.is_success() {
            debug!(status = ?outcome.status, "compilation rejected");
            return Ok(CompilingResult::failed(outcome.stderr));
        }

        let artifact = self.sandbox.read_file(slot, &lang.artifact_name).await?;
        self.storage
            .put(&artifact_object_name(&task.submission_id), &artifact)
            .await?;

        Ok(CompilingResult::succeeded())
    }

    /// Run one testcase against the submission's compiled artifact.
    #[instrument(
        skip(self, task),
        fields(submission_id = %task.submission_id, testcase_index = task.testcase_index)
    )]
    async fn grade(&self, task: &GradingTask, slot: u32) -> Result<GradingResult> {
        let lang = self.language(&task.language)?;

        let artifact = self
            .storage
            .get_current(&artifact_object_name(&task.submission_id))
            .await?;
        let input = self.storage.get(&task.testcase.input).await?;
        let expected = self.storage.get(&task.testcase.output).await?;

        self.sandbox
            .write_executable(slot, &lang.artifact_name, &artifact)
            .await?;
        self.sandbox.write_file(slot, INPUT_FILE, &input).await?;

        let argv = Language::expand_command(&lang.run, &lang.source_name, &lang.artifact_name);
        let outcome = self
            .sandbox
            .run(
                slot,
                RunSpec {
                    argv,
                    stdin_file: Some(INPUT_FILE.into()),
                    stdout_file: Some(OUTPUT_FILE.into()),
                    limits: task.constraints.clone(),
                },
            )
            .await?;

        let metrics = ResourceMetrics {
            time_ms: outcome.time_ms,
            memory_kb: outcome.memory_kb,
        };

        let status = match outcome.status {
            RunStatus::Exited(0) => {
                return self.check_output(task, slot, &expected, metrics).await;
            }
            RunStatus::TimeLimit => GradingStatus::TimeLimitExceeded,
            RunStatus::MemoryLimit => GradingStatus::MemoryLimitExceeded,
            RunStatus::OutputLimit => GradingStatus::OutputLimitExceeded,
            RunStatus::Exited(_) | RunStatus::Signaled(_) => GradingStatus::RuntimeError,
        };

        Ok(GradingResult::new(status)
            .with_log(outcome.stderr)
            .with_metrics(metrics))
    }

    /// Compare the produced output against the expected output, through the
    /// checker when the task carries one.
    async fn check_output(
        &self,
        task: &GradingTask,
        slot: u32,
        expected: &[u8],
        metrics: ResourceMetrics,
    ) -> Result<GradingResult> {
        let produced = self.sandbox.read_file(slot, OUTPUT_FILE).await?;

        let Some(checker) = &task.checker else {
            let status = if outputs_match(&produced, expected) {
                GradingStatus::Accepted
            } else {
                GradingStatus::WrongAnswer
            };
            return Ok(GradingResult::new(status).with_metrics(metrics));
        };

        let checker_bin = self.storage.get(checker).await?;
        self.sandbox
            .write_executable(slot, CHECKER_FILE, &checker_bin)
            .await?;
        self.sandbox.write_file(slot, EXPECTED_FILE, expected).await?;

        let check = self
            .sandbox
            .run(
                slot,
                RunSpec {
                    argv: vec![
                        format!("./{CHECKER_FILE}"),
                        INPUT_FILE.into(),
                        OUTPUT_FILE.into(),
                        EXPECTED_FILE.into(),
                    ],
                    stdin_file: None,
                    stdout_file: Some(CHECKER_OUTPUT_FILE.into()),
                    limits: tool_limits(),
                },
            )
            .await?;

        match check.status {
            RunStatus::Exited(0) => {
                let fraction = self
                    .sandbox
                    .read_file(slot, CHECKER_OUTPUT_FILE)
                    .await
                    .ok()
                    .and_then(|out| parse_checker_fraction(&out));
                let mut result = GradingResult::new(GradingStatus::Accepted).with_metrics(metrics);
                result.checker_fraction = fraction;
                Ok(result)
            }
            RunStatus::Exited(_) => Ok(GradingResult::new(GradingStatus::WrongAnswer)
                .with_log(check.stderr)
                .with_metrics(metrics)),
            // The checker itself misbehaving tells us nothing about the
            // submission.
            _ => Ok(GradingResult::new(GradingStatus::SandboxError)
                .with_log(format!("checker run ended abnormally: {:?}", check.status))
                .with_metrics(metrics)),
        }
    }
}

#[async_trait]
impl Execute for Executor {
    async fn execute(&self, task: JudgerTask, slot: u32) -> Result<JudgerResult> {
        match task {
            JudgerTask::Compiling(task) => {
                let result = self.compile(&task, slot).await?;
                Ok(JudgerResult::Compiling {
                    submission_id: task.submission_id,
                    result,
                })
            }
            JudgerTask::Grading(task) => {
                let result = self.grade(&task, slot).await?;
                Ok(JudgerResult::Grading {
                    submission_id: task.submission_id,
                    testcase_index: task.testcase_index,
                    result,
                })
            }
        }
    }
}

/// Exact match after per-line trailing-whitespace normalization.
fn outputs_match(produced: &[u8], expected: &[u8]) -> bool {
    normalize(produced) == normalize(expected)
}

fn normalize(data: &[u8]) -> Vec<String> {
    let text = String::from_utf8_lossy(data);
    let mut lines: Vec<String> = text.lines().map(|l| l.trim_end().to_string()).collect();
    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    lines
}

/// A checker may print a score fraction in [0, 1] as its first token.
fn parse_checker_fraction(output: &[u8]) -> Option<f64> {
    let text = String::from_utf8_lossy(output);
    let fraction: f64 = text.split_whitespace().next()?.parse().ok()?;
    (0.0..=1.0).contains(&fraction).then_some(fraction)
}
