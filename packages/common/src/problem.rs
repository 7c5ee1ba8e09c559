use serde::{Deserialize, Serialize};

use crate::constraints::Constraints;
use crate::task::BlobRef;

/// One hidden testcase of a problem.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProblemTestcase {
    pub input: BlobRef,
    pub output: BlobRef,
    pub points: u32,
}

/// A problem, read-only from the grading core's point of view.
///
/// A problem with no testcases or no compiled checker cannot be graded; the
/// state machine terminates such submissions with an explanatory log instead
/// of leaving them in Grading forever.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Problem {
    pub id: String,
    pub constraints: Constraints,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub testcases: Option<Vec<ProblemTestcase>>,
    /// Compiled checker artifact, if the problem has one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checker: Option<BlobRef>,
}

impl Problem {
    /// Whether this problem has everything grading needs.
    pub fn is_gradable(&self) -> bool {
        self.testcases.as_ref().is_some_and(|t| !t.is_empty()) && self.checker.is_some()
    }
}
