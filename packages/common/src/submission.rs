use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::result::GradingResult;
use crate::task::BlobRef;

/// Status of a submission during the judging lifecycle.
///
/// Legal transitions: `Pending -> Compiling -> {CompileFailed, Grading}`,
/// `Grading -> {Graded, Terminated}`, `Compiling -> Terminated` (abort).
/// Terminal statuses are absorbing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum SubmissionStatus {
    /// Created by the API layer, not yet picked up.
    Pending,
    /// A compiling task is in flight.
    Compiling,
    /// Compiled; per-testcase grading tasks are in flight.
    Grading,
    /// Compilation failed; `log` holds the compiler diagnostics.
    CompileFailed,
    /// All testcases resolved; `score` is final.
    Graded,
    /// Grading was aborted; `log` explains why.
    Terminated,
}

impl SubmissionStatus {
    /// Returns true if no further transition is allowed from this status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::CompileFailed | Self::Graded | Self::Terminated)
    }

    /// All possible status values.
    pub const ALL: &'static [SubmissionStatus] = &[
        Self::Pending,
        Self::Compiling,
        Self::Grading,
        Self::CompileFailed,
        Self::Graded,
        Self::Terminated,
    ];

    /// Returns the string representation (PascalCase).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Compiling => "Compiling",
            Self::Grading => "Grading",
            Self::CompileFailed => "CompileFailed",
            Self::Graded => "Graded",
            Self::Terminated => "Terminated",
        }
    }
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Default for SubmissionStatus {
    fn default() -> Self {
        Self::Pending
    }
}

/// Error when parsing an invalid status string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseStatusError {
    invalid: String,
}

impl fmt::Display for ParseStatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Invalid status '{}'. Valid values: {}",
            self.invalid,
            SubmissionStatus::ALL
                .iter()
                .map(|s| s.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        )
    }
}

impl std::error::Error for ParseStatusError {}

impl FromStr for SubmissionStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Compiling" => Ok(Self::Compiling),
            "Grading" => Ok(Self::Grading),
            "CompileFailed" => Ok(Self::CompileFailed),
            "Graded" => Ok(Self::Graded),
            "Terminated" => Ok(Self::Terminated),
            _ => Err(ParseStatusError {
                invalid: s.to_string(),
            }),
        }
    }
}

/// Where a submission is scored: against a domain problem (testing) or inside
/// a contest (affects the ranklist).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "PascalCase")]
pub enum SubmissionScope {
    Testing {
        domain_id: String,
        problem_id: String,
    },
    Contest {
        contest_id: String,
        problem_id: String,
        team_id: String,
    },
}

impl SubmissionScope {
    pub fn problem_id(&self) -> &str {
        match self {
            Self::Testing { problem_id, .. } => problem_id,
            Self::Contest { problem_id, .. } => problem_id,
        }
    }
}

/// One slot of a submission's testcase array.
///
/// `points` and the input/output references are copied from the problem at
/// the Compiling -> Grading transition; `score` and `result` are filled in
/// per-index as grading results arrive.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SubmissionTestcase {
    pub points: u32,
    pub input: BlobRef,
    pub output: BlobRef,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<GradingResult>,
}

/// A submission document.
///
/// `language`, `source`, and `scope` are immutable once created. The testcase
/// vector is set exactly once, at the Compiling -> Grading transition, and its
/// length never changes afterward; `graded_cases` never exceeds that length.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Submission {
    pub id: String,
    pub language: String,
    pub source: String,
    #[serde(flatten)]
    pub scope: SubmissionScope,
    pub status: SubmissionStatus,
    /// Present only in CompileFailed/Terminated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log: Option<String>,
    /// Present only while Grading.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub graded_cases: Option<usize>,
    /// Present from Grading onward.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub testcases: Option<Vec<SubmissionTestcase>>,
    /// Present only once Graded; equals the sum of per-testcase scores.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<u32>,
    pub created_at: DateTime<Utc>,
}

impl Submission {
    pub fn is_contest_scoped(&self) -> bool {
        matches!(self.scope, SubmissionScope::Contest { .. })
    }
}
