use serde::{Deserialize, Serialize};

use crate::mq::Message;

/// Outcome of a compiling task. A failing compile is a result, not an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum CompilingStatus {
    Succeeded,
    Failed,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CompilingResult {
    pub status: CompilingStatus,
    /// Compiler diagnostics; present on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log: Option<String>,
}

impl CompilingResult {
    pub fn succeeded() -> Self {
        Self {
            status: CompilingStatus::Succeeded,
            log: None,
        }
    }

    pub fn failed(log: impl Into<String>) -> Self {
        Self {
            status: CompilingStatus::Failed,
            log: Some(log.into()),
        }
    }
}

/// Verdict for one testcase run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum GradingStatus {
    Accepted,
    WrongAnswer,
    TimeLimitExceeded,
    MemoryLimitExceeded,
    OutputLimitExceeded,
    RuntimeError,
    /// The sandbox itself faulted; the run tells us nothing about the program.
    SandboxError,
}

impl GradingStatus {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }
}

/// Resource usage of a single run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceMetrics {
    /// CPU time used in milliseconds.
    pub time_ms: u64,
    /// Peak memory used in kilobytes.
    pub memory_kb: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GradingResult {
    pub status: GradingStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<ResourceMetrics>,
    /// Checker-reported score fraction in [0, 1]. Only consulted when
    /// partial-credit scoring is enabled; otherwise Accepted means full
    /// points.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checker_fraction: Option<f64>,
}

impl GradingResult {
    pub fn new(status: GradingStatus) -> Self {
        Self {
            status,
            log: None,
            metrics: None,
            checker_fraction: None,
        }
    }

    pub fn with_log(mut self, log: impl Into<String>) -> Self {
        self.log = Some(log.into());
        self
    }

    pub fn with_metrics(mut self, metrics: ResourceMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }
}

/// A result message on the judger results queue.
///
/// The envelope carries the submission id (and testcase index for grading)
/// so the result handler can correlate it back to the right document slot.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum JudgerResult {
    Compiling {
        submission_id: String,
        #[serde(flatten)]
        result: CompilingResult,
    },
    Grading {
        submission_id: String,
        testcase_index: usize,
        #[serde(flatten)]
        result: GradingResult,
    },
}

impl JudgerResult {
    pub fn submission_id(&self) -> &str {
        match self {
            Self::Compiling { submission_id, .. } => submission_id,
            Self::Grading { submission_id, .. } => submission_id,
        }
    }
}

impl Message for JudgerResult {
    fn message_type() -> &'static str {
        "judger_result"
    }

    fn message_id(&self) -> &str {
        self.submission_id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_wire_shape() {
        let result = JudgerResult::Grading {
            submission_id: "s1".into(),
            testcase_index: 1,
            result: GradingResult::new(GradingStatus::WrongAnswer).with_metrics(ResourceMetrics {
                time_ms: 12,
                memory_kb: 4096,
            }),
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["type"], "Grading");
        assert_eq!(json["status"], "WrongAnswer");
        assert_eq!(json["testcase_index"], 1);
        assert_eq!(json["metrics"]["time_ms"], 12);
    }

    #[test]
    fn test_compile_failure_is_a_result() {
        let result = CompilingResult::failed("syntax error");
        assert_eq!(result.status, CompilingStatus::Failed);
        assert_eq!(result.log.as_deref(), Some("syntax error"));
    }
}
