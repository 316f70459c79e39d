/// Execution Engine - Abstraction for Running Harness Programs
///
/// **Core Responsibility:**
/// Run a generated harness and decode its sentinel line into an
/// `ExecutionOutcome`.
///
/// **Critical Architectural Boundary:**
/// - Engine knows HOW to execute (local subprocess, remote HTTP service)
/// - Engine does NOT know expected outputs
/// - Engine does NOT evaluate correctness
/// - Engine returns raw decoded results for the Evaluator to judge
///
/// **Why This Exists:**
/// The orchestrator only sees `ExecutionBackend`, so a sandboxed or
/// container-based backend can be added without touching scoring logic.

pub mod local;
pub mod remote;
pub mod versions;

use crate::error::{ErrorKind, ExecutionError, FUNCTION_NOT_FOUND};
use crate::harness::HarnessProgram;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

pub use local::LocalBackend;
pub use remote::RemoteBackend;
pub use versions::{RuntimeCatalog, RuntimeInfo, RuntimeVersionCache};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Local,
    Remote,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Local => f.write_str("local"),
            BackendKind::Remote => f.write_str("remote"),
        }
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "local" => Ok(BackendKind::Local),
            "remote" | "piston" => Ok(BackendKind::Remote),
            other => Err(format!("unknown backend '{}'", other)),
        }
    }
}

/// Decoded result of one harness run
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionOutcome {
    /// `__result` payload; `Some(Value::Null)` when the harness returned null
    pub result: Option<Value>,
    pub error: Option<ExecutionError>,
    pub elapsed_ms: u64,
}

impl ExecutionOutcome {
    pub fn success(result: Value, elapsed_ms: u64) -> Self {
        Self {
            result: Some(result),
            error: None,
            elapsed_ms,
        }
    }

    pub fn failure(error: ExecutionError, elapsed_ms: u64) -> Self {
        Self {
            result: None,
            error: Some(error),
            elapsed_ms,
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Strategy for running a harness
#[async_trait]
pub trait ExecutionBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Run `program` with `timeout` as the run-phase budget. Never fails:
    /// every problem is reported inside the outcome.
    async fn run(&self, program: &HarnessProgram, timeout: Duration) -> ExecutionOutcome;
}

/// What the harness printed as its sentinel line
#[derive(Debug, Clone, PartialEq)]
pub enum Sentinel {
    Result(Value),
    Error(String),
}

/// Find the last `{"__result": ...}` / `{"__error": ...}` line in stdout.
/// Interleaved user output on other lines is ignored.
pub fn parse_sentinel(stdout: &str) -> Option<Sentinel> {
    stdout.lines().rev().find_map(|line| {
        let line = line.trim();
        if !(line.starts_with("{\"__result\"") || line.starts_with("{\"__error\"")) {
            return None;
        }
        let value: Value = serde_json::from_str(line).ok()?;
        let object = value.as_object()?;
        if let Some(error) = object.get("__error") {
            let message = match error {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            return Some(Sentinel::Error(message));
        }
        object.get("__result").cloned().map(Sentinel::Result)
    })
}

/// Classify raw process output. Shared by both backends once the process
/// (or remote run stage) has finished within its budget.
pub fn outcome_from_output(
    stdout: &str,
    stderr: &str,
    exited_ok: bool,
    elapsed_ms: u64,
) -> ExecutionOutcome {
    match parse_sentinel(stdout) {
        Some(Sentinel::Result(value)) => ExecutionOutcome::success(value, elapsed_ms),
        Some(Sentinel::Error(message)) => {
            let kind = if message.starts_with(FUNCTION_NOT_FOUND) {
                ErrorKind::FunctionNotFound
            } else {
                ErrorKind::RuntimeError
            };
            ExecutionOutcome::failure(ExecutionError::new(kind, message), elapsed_ms)
        }
        None => {
            let stderr = stderr.trim();
            let stdout = stdout.trim();
            let message = if !stderr.is_empty() {
                stderr.to_string()
            } else if !exited_ok && !stdout.is_empty() {
                stdout.to_string()
            } else if exited_ok {
                "Invalid output: no result line".to_string()
            } else {
                "Runtime Error".to_string()
            };
            ExecutionOutcome::failure(ExecutionError::runtime(message), elapsed_ms)
        }
    }
}
