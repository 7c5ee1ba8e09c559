use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Per-team contest standings record.
///
/// `scores` holds the best score per problem and only ever moves upward
/// (keep-maximum updates); `time` holds the submission time of the best
/// score and is bumped only when the score actually improved.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TeamScore {
    pub contest_id: String,
    pub team_id: String,
    #[serde(default)]
    pub scores: HashMap<String, u32>,
    #[serde(default)]
    pub time: HashMap<String, DateTime<Utc>>,
    /// Total across problems, maintained by the external aggregation routine.
    #[serde(default)]
    pub total_score: u32,
}

impl TeamScore {
    pub fn new(contest_id: impl Into<String>, team_id: impl Into<String>) -> Self {
        Self {
            contest_id: contest_id.into(),
            team_id: team_id.into(),
            scores: HashMap::new(),
            time: HashMap::new(),
            total_score: 0,
        }
    }
}
