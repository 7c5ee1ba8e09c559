use std::sync::Arc;

use chrono::Utc;
use common::languages::LanguageRegistry;
use common::mq::TaskSink;
use common::submission::{Submission, SubmissionScope, SubmissionStatus};
use common::task::{CompilingTask, JudgerTask};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::{Result, ResultError};
use crate::store::SubmissionStore;

/// A submission as received from the outside, before it is persisted.
#[derive(Clone, Debug)]
pub struct NewSubmission {
    pub language: String,
    pub source: String,
}

/// Submission intake: persist, then hand off to the judger queue.
pub struct SubmissionService {
    submissions: Arc<dyn SubmissionStore>,
    tasks: Arc<dyn TaskSink>,
    languages: LanguageRegistry,
}

impl SubmissionService {
    pub fn new(
        submissions: Arc<dyn SubmissionStore>,
        tasks: Arc<dyn TaskSink>,
        languages: LanguageRegistry,
    ) -> Self {
        Self {
            submissions,
            tasks,
            languages,
        }
    }

    /// Persist a new submission in `Pending`. Rejects unknown languages up
    /// front so nothing unjudgeable ever reaches the queue.
    pub async fn create_submission(
        &self,
        submission: NewSubmission,
        scope: SubmissionScope,
    ) -> Result<String> {
        if !self.languages.contains(&submission.language) {
            return Err(ResultError::UnknownLanguage(submission.language));
        }

        let id = Uuid::new_v4().to_string();
        self.submissions
            .insert(Submission {
                id: id.clone(),
                language: submission.language,
                source: submission.source,
                scope,
                status: SubmissionStatus::Pending,
                log: None,
                graded_cases: None,
                testcases: None,
                score: None,
                created_at: Utc::now(),
            })
            .await?;
        Ok(id)
    }

    /// Publish the compiling task for a pending submission, then move it to
    /// `Compiling`. Publish happens before the status commit, same as the
    /// grading fan-out.
    #[instrument(skip(self))]
    pub async fn queue_submission(&self, id: &str) -> Result<()> {
        let submission = self.submissions.fetch(id).await?;
        let language = self
            .languages
            .get(&submission.language)
            .ok_or_else(|| ResultError::UnknownLanguage(submission.language.clone()))?;

        self.tasks
            .publish_task(JudgerTask::Compiling(CompilingTask {
                submission_id: id.to_string(),
                source: submission.source,
                language: submission.language,
                constraints: language.default_constraints.clone(),
            }))
            .await?;
        self.submissions.mark_compiling(id).await?;
        info!(submission_id = id, "submission queued for compiling");
        Ok(())
    }

    pub async fn fetch_submission(&self, id: &str) -> Result<Submission> {
        Ok(self.submissions.fetch(id).await?)
    }
}
