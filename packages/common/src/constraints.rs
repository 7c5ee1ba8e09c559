use serde::{Deserialize, Serialize};

/// Resource constraints a task is executed under.
///
/// All fields are optional; absent fields fall back to whatever the sandbox
/// layer considers safe for the run in question.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constraints {
    /// CPU time limit in milliseconds.
    #[serde(default)]
    pub time_ms: Option<u64>,

    /// Memory limit in kilobytes.
    #[serde(default)]
    pub memory_kb: Option<u64>,

    /// Maximum output size in kilobytes.
    #[serde(default)]
    pub output_kb: Option<u64>,

    /// Maximum number of processes/threads.
    #[serde(default)]
    pub processes: Option<u32>,
}

impl Constraints {
    /// 1 megabyte in kilobytes
    pub const MB: u64 = 1024;
    /// 1 gigabyte in kilobytes
    pub const GB: u64 = 1024 * 1024;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_time_ms(mut self, ms: u64) -> Self {
        self.time_ms = Some(ms);
        self
    }

    pub fn with_memory_kb(mut self, kb: u64) -> Self {
        self.memory_kb = Some(kb);
        self
    }

    pub fn with_output_kb(mut self, kb: u64) -> Self {
        self.output_kb = Some(kb);
        self
    }

    pub fn with_processes(mut self, count: u32) -> Self {
        self.processes = Some(count);
        self
    }

    /// Overlay another set of constraints on top of this one.
    ///
    /// Values from `overrides` take precedence when both are present.
    pub fn overlaid(&self, overrides: &Constraints) -> Constraints {
        Constraints {
            time_ms: overrides.time_ms.or(self.time_ms),
            memory_kb: overrides.memory_kb.or(self.memory_kb),
            output_kb: overrides.output_kb.or(self.output_kb),
            processes: overrides.processes.or(self.processes),
        }
    }
}
