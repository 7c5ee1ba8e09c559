pub mod error;
pub mod isolate;

use async_trait::async_trait;
use common::Constraints;

pub use error::SandboxError;
pub use isolate::IsolateSandbox;

/// A single program invocation inside a sandbox slot.
#[derive(Clone, Debug)]
pub struct RunSpec {
    /// Program and arguments, resolved paths.
    pub argv: Vec<String>,
    /// File inside the sandbox to connect to stdin.
    pub stdin_file: Option<String>,
    /// File inside the sandbox to capture stdout into.
    pub stdout_file: Option<String>,
    pub limits: Constraints,
}

/// How a sandboxed run ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RunStatus {
    /// The program ran to completion with this exit code.
    Exited(i32),
    /// Killed by the CPU or wall-clock limit.
    TimeLimit,
    /// Killed by the memory limit (OOM).
    MemoryLimit,
    /// Killed for exceeding the output size limit.
    OutputLimit,
    /// Killed by some other signal.
    Signaled(i32),
}

impl RunStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Exited(0))
    }
}

#[derive(Clone, Debug)]
pub struct RunOutcome {
    pub status: RunStatus,
    /// CPU time used in milliseconds.
    pub time_ms: u64,
    /// Peak memory used in kilobytes.
    pub memory_kb: u64,
    /// Captured stderr (diagnostics; stdout goes to `stdout_file`).
    pub stderr: String,
}

/// A disposable isolated execution environment, one per pool slot.
///
/// How isolation is achieved is the implementation's business; the scheduler
/// and executor only rely on this contract. `init` and `destroy` bracket each
/// task; a slot carries no residue between tasks.
#[async_trait]
pub trait Sandbox: Send + Sync {
    async fn init(&self, slot: u32) -> Result<(), SandboxError>;

    async fn destroy(&self, slot: u32) -> Result<(), SandboxError>;

    /// Place a regular file into the sandbox's working directory.
    async fn write_file(&self, slot: u32, name: &str, data: &[u8]) -> Result<(), SandboxError>;

    /// Place an executable file into the sandbox's working directory.
    async fn write_executable(&self, slot: u32, name: &str, data: &[u8])
    -> Result<(), SandboxError>;

    /// Read a file out of the sandbox's working directory.
    async fn read_file(&self, slot: u32, name: &str) -> Result<Vec<u8>, SandboxError>;

    /// Run a program under the given limits.
    async fn run(&self, slot: u32, spec: RunSpec) -> Result<RunOutcome, SandboxError>;
}
