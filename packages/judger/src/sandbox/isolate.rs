use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::fs;
use tokio::process::Command;

use super::{RunOutcome, RunSpec, RunStatus, Sandbox, SandboxError};

const SIGXFSZ: i32 = 25;

/// `isolate(1)`-backed sandbox; the pool slot id doubles as the isolate box
/// id.
pub struct IsolateSandbox {
    bin: String,
    /// Working directory of each initialized box, as reported by
    /// `isolate --init`.
    box_dirs: Mutex<HashMap<u32, PathBuf>>,
}

impl IsolateSandbox {
    pub fn new(bin: impl Into<String>) -> Self {
        Self {
            bin: bin.into(),
            box_dirs: Mutex::new(HashMap::new()),
        }
    }

    fn box_dir(&self, slot: u32) -> Result<PathBuf, SandboxError> {
        self.box_dirs
            .lock()
            .map_err(|_| SandboxError::Unknown("box directory map poisoned".into()))?
            .get(&slot)
            .cloned()
            .ok_or_else(|| SandboxError::File(format!("box {slot} is not initialized")))
    }

    fn file_path(&self, slot: u32, name: &str) -> Result<PathBuf, SandboxError> {
        if name.contains("..") || name.starts_with('/') {
            return Err(SandboxError::File(format!("invalid sandbox file name: {name}")));
        }
        Ok(self.box_dir(slot)?.join(name))
    }
}

fn add_limit_args(command: &mut Command, limits: &common::Constraints) {
    if let Some(time_ms) = limits.time_ms {
        let secs = time_ms as f64 / 1000.0;
        command.arg(format!("--time={secs}"));
        // Grace so isolate reports the limit instead of racing the kill.
        command.arg(format!("--wall-time={}", secs * 2.0 + 1.0));
        command.arg("--extra-time=0.5");
    }
    if let Some(memory_kb) = limits.memory_kb {
        command.arg(format!("--cg-mem={memory_kb}"));
    }
    if let Some(output_kb) = limits.output_kb {
        command.arg(format!("--fsize={output_kb}"));
    }
    if let Some(processes) = limits.processes {
        command.arg(format!("--processes={processes}"));
    }
}

async fn parse_meta_file(meta_path: &PathBuf) -> Result<RunOutcome, SandboxError> {
    let content = fs::read_to_string(meta_path).await.map_err(|err| {
        SandboxError::Execution(format!("failed to read isolate meta file: {err}"))
    })?;

    let mut raw = HashMap::<String, String>::new();

    for line in content.lines() {
        if let Some((key, value)) = line.split_once(':') {
            raw.insert(key.trim().to_string(), value.trim().to_string());
        }
    }

    let oom_killed = raw.get("cg-oom-killed").is_some_and(|v| v == "1");

    let parse_i32 = |key: &str| raw.get(key).and_then(|v| v.parse::<i32>().ok());
    let parse_u64 = |key: &str| raw.get(key).and_then(|v| v.parse::<u64>().ok());
    let parse_f64 = |key: &str| {
        raw.get(key)
            .and_then(|v| v.parse::<f64>().ok())
            .unwrap_or(0.0)
    };

    let exit_code = parse_i32("exitcode").unwrap_or(0);
    let signal = parse_i32("exitsig");
    let status = match raw.get("status").map(String::as_str) {
        Some("TO") => RunStatus::TimeLimit,
        Some("SG") if oom_killed => RunStatus::MemoryLimit,
        Some("SG") if signal == Some(SIGXFSZ) => RunStatus::OutputLimit,
        Some("SG") => RunStatus::Signaled(signal.unwrap_or(0)),
        Some("RE") | Some("XX") | None => RunStatus::Exited(exit_code),
        Some(_) => RunStatus::Exited(exit_code),
    };
    let status = if oom_killed && status != RunStatus::TimeLimit {
        RunStatus::MemoryLimit
    } else {
        status
    };

    Ok(RunOutcome {
        status,
        time_ms: (parse_f64("time") * 1000.0).round() as u64,
        memory_kb: parse_u64("cg-mem").or(parse_u64("max-rss")).unwrap_or(0),
        stderr: String::new(),
    })
}

#[async_trait]
impl Sandbox for IsolateSandbox {
    async fn init(&self, slot: u32) -> Result<(), SandboxError> {
        let output = Command::new(&self.bin)
            .arg(format!("--box-id={slot}"))
            .arg("--cg")
            .arg("--init")
            .output()
            .await
            .map_err(|err| {
                SandboxError::Initialization(format!("failed to execute isolate --init: {err}"))
            })?;

        if !output.status.success() {
            return Err(SandboxError::Initialization(format!(
                "isolate --init failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let path_text = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if path_text.is_empty() {
            return Err(SandboxError::Initialization(
                "isolate --init did not return sandbox path".to_string(),
            ));
        }

        // isolate prints the box root; the program's working directory is
        // root/box.
        let box_dir = PathBuf::from(path_text).join("box");
        self.box_dirs
            .lock()
            .map_err(|_| SandboxError::Unknown("box directory map poisoned".into()))?
            .insert(slot, box_dir);
        Ok(())
    }

    async fn destroy(&self, slot: u32) -> Result<(), SandboxError> {
        let output = Command::new(&self.bin)
            .arg(format!("--box-id={slot}"))
            .arg("--cg")
            .arg("--cleanup")
            .output()
            .await
            .map_err(|err| {
                SandboxError::Execution(format!("failed to execute isolate --cleanup: {err}"))
            })?;

        if let Ok(mut dirs) = self.box_dirs.lock() {
            dirs.remove(&slot);
        }

        if !output.status.success() {
            return Err(SandboxError::Execution(format!(
                "isolate --cleanup failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(())
    }

    async fn write_file(&self, slot: u32, name: &str, data: &[u8]) -> Result<(), SandboxError> {
        let path = self.file_path(slot, name)?;
        fs::write(&path, data)
            .await
            .map_err(|err| SandboxError::File(format!("failed to write {name}: {err}")))
    }

    async fn write_executable(
        &self,
        slot: u32,
        name: &str,
        data: &[u8],
    ) -> Result<(), SandboxError> {
        use std::os::unix::fs::PermissionsExt;

        let path = self.file_path(slot, name)?;
        fs::write(&path, data)
            .await
            .map_err(|err| SandboxError::File(format!("failed to write {name}: {err}")))?;
        fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
            .await
            .map_err(|err| SandboxError::File(format!("failed to chmod {name}: {err}")))
    }

    async fn read_file(&self, slot: u32, name: &str) -> Result<Vec<u8>, SandboxError> {
        let path = self.file_path(slot, name)?;
        fs::read(&path)
            .await
            .map_err(|err| SandboxError::File(format!("failed to read {name}: {err}")))
    }

    async fn run(&self, slot: u32, spec: RunSpec) -> Result<RunOutcome, SandboxError> {
        if spec.argv.is_empty() {
            return Err(SandboxError::Execution(
                "isolate --run requires at least one program argument".to_string(),
            ));
        }

        let meta_path = std::env::temp_dir().join(format!("gavel-isolate-{slot}.meta"));

        let mut command = Command::new(&self.bin);
        command
            .arg(format!("--box-id={slot}"))
            .arg("--cg")
            .arg(format!("--meta={}", meta_path.to_string_lossy()));

        add_limit_args(&mut command, &spec.limits);

        if let Some(stdin) = &spec.stdin_file {
            command.arg(format!("--stdin={stdin}"));
        }
        if let Some(stdout) = &spec.stdout_file {
            command.arg(format!("--stdout={stdout}"));
        }

        command.arg("--run").arg("--").args(&spec.argv);

        let output = command.output().await.map_err(|err| {
            SandboxError::Execution(format!("failed to execute isolate --run: {err}"))
        })?;

        // isolate exits 0 when the program succeeded and 1 when the program
        // failed; anything else is an isolate fault.
        match output.status.code() {
            Some(0) | Some(1) => {
                let mut outcome = parse_meta_file(&meta_path).await?;
                outcome.stderr = String::from_utf8_lossy(&output.stderr).to_string();
                Ok(outcome)
            }
            _ => Err(SandboxError::Unknown(format!(
                "isolate internal error: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            ))),
        }
    }
}
