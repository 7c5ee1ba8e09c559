use serde::{Deserialize, Serialize};

use crate::constraints::Constraints;
use crate::mq::Message;

/// Reference to an object-store blob by name and content version.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobRef {
    pub object_name: String,
    pub version_id: String,
}

impl BlobRef {
    pub fn new(object_name: impl Into<String>, version_id: impl Into<String>) -> Self {
        Self {
            object_name: object_name.into(),
            version_id: version_id.into(),
        }
    }
}

/// Work descriptor for compiling a submission's source.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CompilingTask {
    pub submission_id: String,
    pub source: String,
    pub language: String,
    pub constraints: Constraints,
}

/// The input/output pair a grading run is checked against.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GradingTestcase {
    pub input: BlobRef,
    pub output: BlobRef,
}

/// Work descriptor for grading one testcase of a submission.
///
/// `testcase_index` correlates the eventual result back to the correct slot
/// of the submission's testcase array.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GradingTask {
    pub submission_id: String,
    pub problem_id: String,
    pub testcase_index: usize,
    pub language: String,
    pub constraints: Constraints,
    pub testcase: GradingTestcase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checker: Option<BlobRef>,
}

/// A task message on the judger queue. The tag is a closed set; anything else
/// fails deserialization and is dropped by the scheduler as a poison message.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum JudgerTask {
    Compiling(CompilingTask),
    Grading(GradingTask),
}

impl JudgerTask {
    pub fn submission_id(&self) -> &str {
        match self {
            Self::Compiling(task) => &task.submission_id,
            Self::Grading(task) => &task.submission_id,
        }
    }
}

impl Message for JudgerTask {
    fn message_type() -> &'static str {
        "judger_task"
    }

    fn message_id(&self) -> &str {
        self.submission_id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_wire_tag() {
        let task = JudgerTask::Compiling(CompilingTask {
            submission_id: "s1".into(),
            source: "int main() {}".into(),
            language: "cpp".into(),
            constraints: Constraints::new().with_time_ms(2000),
        });
        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(json["type"], "Compiling");
        assert_eq!(json["submission_id"], "s1");
    }

    #[test]
    fn test_unknown_tag_rejected() {
        let raw = r#"{ "type": "Linting", "submission_id": "s1" }"#;
        assert!(serde_json::from_str::<JudgerTask>(raw).is_err());
    }

    #[test]
    fn test_grading_task_roundtrip() {
        let task = JudgerTask::Grading(GradingTask {
            submission_id: "s1".into(),
            problem_id: "p1".into(),
            testcase_index: 2,
            language: "cpp".into(),
            constraints: Constraints::default(),
            testcase: GradingTestcase {
                input: BlobRef::new("p1/1.in", "v1"),
                output: BlobRef::new("p1/1.out", "v1"),
            },
            checker: None,
        });
        let json = serde_json::to_string(&task).unwrap();
        let parsed: JudgerTask = serde_json::from_str(&json).unwrap();
        match parsed {
            JudgerTask::Grading(task) => assert_eq!(task.testcase_index, 2),
            other => panic!("unexpected task: {other:?}"),
        }
    }
}
