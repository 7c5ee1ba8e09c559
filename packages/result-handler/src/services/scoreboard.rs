use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument};

use crate::error::Result;
use crate::store::{RanklistCache, ScoreAggregator, TeamScoreStore};

/// Contest standings updater.
///
/// Score updates are keep-maximum, so applying graded submissions in any
/// order (or more than once) converges on the same standings. The solve
/// time, total recalculation and ranklist invalidation only run when the
/// stored best actually moved.
pub struct ScoreboardService {
    scores: Arc<dyn TeamScoreStore>,
    aggregator: Arc<dyn ScoreAggregator>,
    ranklist: Arc<dyn RanklistCache>,
}

impl ScoreboardService {
    pub fn new(
        scores: Arc<dyn TeamScoreStore>,
        aggregator: Arc<dyn ScoreAggregator>,
        ranklist: Arc<dyn RanklistCache>,
    ) -> Self {
        Self {
            scores,
            aggregator,
            ranklist,
        }
    }

    #[instrument(skip(self, submitted_at))]
    pub async fn apply_graded_submission(
        &self,
        contest_id: &str,
        team_id: &str,
        problem_id: &str,
        score: u32,
        submitted_at: DateTime<Utc>,
    ) -> Result<()> {
        let increased = self
            .scores
            .raise_problem_score(contest_id, team_id, problem_id, score)
            .await?;
        if !increased {
            debug!(score, "score did not improve on the stored best");
            return Ok(());
        }

        self.scores
            .set_problem_time(contest_id, team_id, problem_id, submitted_at)
            .await?;
        self.aggregator
            .recalculate_team_total(contest_id, team_id)
            .await?;
        self.ranklist.mark_stale(contest_id).await?;
        info!(score, "team score raised");
        Ok(())
    }
}
