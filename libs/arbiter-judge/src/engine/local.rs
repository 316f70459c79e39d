/// Local Backend - Host Subprocess Execution
///
/// **Core Responsibility:**
/// Write the harness into a per-invocation workspace, compile it when the
/// language needs it, run it under a wall-clock timeout and decode the
/// sentinel line.
///
/// **Guarantees:**
/// - Workspace directories are UUID-named and removed on every exit path
///   (`WorkspaceGuard`)
/// - Children are spawned with `kill_on_drop`, so an expired timeout kills
///   the process
/// - A missing binary falls through to the next candidate name; only when
///   all are missing is an `InfrastructureError` reported
/// - A failed compile step is a `CompilationError` and nothing is run

use super::{outcome_from_output, BackendKind, ExecutionBackend, ExecutionOutcome};
use crate::config::{CommandTemplate, LanguageConfigManager};
use crate::error::{ExecutionError, TIME_LIMIT_EXCEEDED};
use crate::harness::HarnessProgram;
use arbiter_common::types::Language;
use async_trait::async_trait;
use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Workspace cleanup guard - removes the directory on drop
struct WorkspaceGuard {
    path: PathBuf,
}

impl WorkspaceGuard {
    async fn create(root: &Path) -> io::Result<Self> {
        let path = root.join(format!("arbiter-{}", Uuid::new_v4()));
        tokio::fs::create_dir_all(&path).await?;
        Ok(Self { path })
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for WorkspaceGuard {
    fn drop(&mut self) {
        // Best-effort cleanup - cannot be async in Drop
        if let Err(e) = std::fs::remove_dir_all(&self.path) {
            warn!(path = %self.path.display(), error = %e, "Failed to remove workspace");
        }
    }
}

#[derive(Debug, Error)]
enum CommandError {
    #[error("no usable binary found (tried {})", .0.join(", "))]
    ToolchainMissing(Vec<String>),

    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("timed out")]
    TimedOut,

    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}

struct CommandOutput {
    program: String,
    stdout: String,
    stderr: String,
    success: bool,
}

/// Paths substituted into command templates
struct Placeholders {
    dir: PathBuf,
    source: PathBuf,
    sources: Vec<PathBuf>,
    binary: PathBuf,
}

impl Placeholders {
    fn new(dir: &Path, file_names: &[&str]) -> Self {
        let sources: Vec<PathBuf> = file_names.iter().map(|name| dir.join(name)).collect();
        Self {
            dir: dir.to_path_buf(),
            source: sources.first().cloned().unwrap_or_else(|| dir.to_path_buf()),
            sources,
            binary: dir.join(format!("main{}", std::env::consts::EXE_SUFFIX)),
        }
    }

    fn expand_one(&self, template: &str) -> String {
        template
            .replace("{source}", &self.source.to_string_lossy())
            .replace("{binary}", &self.binary.to_string_lossy())
            .replace("{dir}", &self.dir.to_string_lossy())
    }

    fn expand(&self, args: &[String]) -> Vec<String> {
        let mut out = Vec::with_capacity(args.len());
        for arg in args {
            if arg == "{sources}" {
                out.extend(self.sources.iter().map(|p| p.to_string_lossy().into_owned()));
            } else {
                out.push(self.expand_one(arg));
            }
        }
        out
    }
}

/// Result of the simplified stdin path
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptOutput {
    pub output: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub time_ms: u64,
}

pub struct LocalBackend {
    languages: Arc<LanguageConfigManager>,
    compile_timeout: Duration,
    work_root: PathBuf,
}

impl LocalBackend {
    pub fn new(languages: Arc<LanguageConfigManager>, compile_timeout: Duration) -> Self {
        Self {
            languages,
            compile_timeout,
            work_root: std::env::temp_dir(),
        }
    }

    /// Create workspaces under `root` instead of the system temp dir
    pub fn with_work_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.work_root = root.into();
        self
    }

    async fn execute(
        &self,
        program: &HarnessProgram,
        timeout: Duration,
        started: Instant,
    ) -> Result<ExecutionOutcome, ExecutionError> {
        let config = self
            .languages
            .get_config(&program.language)
            .map_err(|e| ExecutionError::infrastructure(e.to_string()))?;

        let workspace = WorkspaceGuard::create(&self.work_root).await.map_err(|e| {
            ExecutionError::infrastructure(format!("Failed to create workspace: {}", e))
        })?;
        for file in &program.files {
            tokio::fs::write(workspace.path().join(&file.name), &file.content)
                .await
                .map_err(|e| {
                    ExecutionError::infrastructure(format!("Failed to write {}: {}", file.name, e))
                })?;
        }
        let names: Vec<&str> = program.files.iter().map(|f| f.name.as_str()).collect();
        let paths = Placeholders::new(workspace.path(), &names);

        if let Some(compile) = &config.compile {
            self.compile(compile, &paths, workspace.path()).await?;
        }

        match run_command(&config.run, &paths, workspace.path(), None, timeout).await {
            Ok(output) => {
                let elapsed_ms = started.elapsed().as_millis() as u64;
                debug!(
                    program = %output.program,
                    success = output.success,
                    elapsed_ms = elapsed_ms,
                    "Harness finished"
                );
                Ok(outcome_from_output(
                    &output.stdout,
                    &output.stderr,
                    output.success,
                    elapsed_ms,
                ))
            }
            Err(CommandError::TimedOut) => {
                warn!(timeout_ms = timeout.as_millis() as u64, "Harness timed out");
                Err(ExecutionError::timeout())
            }
            Err(e) => Err(toolchain_error(program.language, e)),
        }
    }

    async fn compile(
        &self,
        compile: &CommandTemplate,
        paths: &Placeholders,
        cwd: &Path,
    ) -> Result<(), ExecutionError> {
        match run_command(compile, paths, cwd, None, self.compile_timeout).await {
            Ok(output) if output.success => Ok(()),
            Ok(output) => {
                let stderr = output.stderr.trim();
                let message = if stderr.is_empty() {
                    output.stdout.trim()
                } else {
                    stderr
                };
                let message = if message.is_empty() {
                    "Compilation failed"
                } else {
                    message
                };
                Err(ExecutionError::compilation(message))
            }
            Err(CommandError::TimedOut) => Err(ExecutionError::compilation(format!(
                "Compilation timed out after {}ms",
                self.compile_timeout.as_millis()
            ))),
            Err(e) => Err(ExecutionError::infrastructure(format!("Compiler unavailable: {}", e))),
        }
    }

    /// Run raw source with `stdin`, no harness. Stdout is returned as is.
    pub async fn run_script(
        &self,
        language: Language,
        code: &str,
        stdin: &str,
        timeout: Duration,
    ) -> ScriptOutput {
        let started = Instant::now();
        let result = self.execute_script(language, code, stdin, timeout).await;
        let time_ms = started.elapsed().as_millis() as u64;
        match result {
            Ok((output, error)) => ScriptOutput {
                output,
                error,
                time_ms,
            },
            Err(error) => ScriptOutput {
                output: String::new(),
                error: Some(error.message),
                time_ms,
            },
        }
    }

    async fn execute_script(
        &self,
        language: Language,
        code: &str,
        stdin: &str,
        timeout: Duration,
    ) -> Result<(String, Option<String>), ExecutionError> {
        let config = self
            .languages
            .get_config(&language)
            .map_err(|e| ExecutionError::infrastructure(e.to_string()))?;
        let workspace = WorkspaceGuard::create(&self.work_root).await.map_err(|e| {
            ExecutionError::infrastructure(format!("Failed to create workspace: {}", e))
        })?;
        tokio::fs::write(workspace.path().join(&config.source_file), code)
            .await
            .map_err(|e| ExecutionError::infrastructure(format!("Failed to write source: {}", e)))?;
        let paths = Placeholders::new(workspace.path(), &[config.source_file.as_str()]);

        if let Some(compile) = &config.compile {
            self.compile(compile, &paths, workspace.path()).await?;
        }

        match run_command(&config.run, &paths, workspace.path(), Some(stdin), timeout).await {
            Ok(output) => {
                let error = if output.success {
                    None
                } else {
                    let stderr = output.stderr.trim();
                    Some(if stderr.is_empty() {
                        "Runtime Error".to_string()
                    } else {
                        stderr.to_string()
                    })
                };
                Ok((output.stdout, error))
            }
            Err(CommandError::TimedOut) => Ok((String::new(), Some(TIME_LIMIT_EXCEEDED.to_string()))),
            Err(e) => Err(toolchain_error(language, e)),
        }
    }
}

#[async_trait]
impl ExecutionBackend for LocalBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Local
    }

    #[tracing::instrument(skip(self, program), fields(language = %program.language))]
    async fn run(&self, program: &HarnessProgram, timeout: Duration) -> ExecutionOutcome {
        let started = Instant::now();
        match self.execute(program, timeout, started).await {
            Ok(outcome) => outcome,
            Err(error) => {
                let elapsed_ms = started.elapsed().as_millis() as u64;
                info!(kind = ?error.kind, elapsed_ms = elapsed_ms, "Local execution failed");
                ExecutionOutcome::failure(error, elapsed_ms)
            }
        }
    }
}

fn display_name(language: Language) -> &'static str {
    match language {
        Language::JavaScript => "Node.js",
        Language::Python => "Python",
        Language::Cpp => "C++ compiler",
        Language::Java => "Java",
        Language::Rust => "Rust",
    }
}

fn toolchain_error(language: Language, error: CommandError) -> ExecutionError {
    match error {
        CommandError::ToolchainMissing(tried) => {
            let name = display_name(language);
            ExecutionError::infrastructure(format!(
                "{} not found. Please install {} and ensure it is in your PATH. (tried {})",
                name,
                name,
                tried.join(", ")
            ))
        }
        other => ExecutionError::infrastructure(other.to_string()),
    }
}

/// Try each candidate binary in order. `NotFound` moves on to the next one,
/// any other spawn failure is final.
async fn run_command(
    template: &CommandTemplate,
    paths: &Placeholders,
    cwd: &Path,
    stdin: Option<&str>,
    timeout: Duration,
) -> Result<CommandOutput, CommandError> {
    let args = paths.expand(&template.args);
    let mut tried = Vec::with_capacity(template.candidates.len());

    for candidate in &template.candidates {
        let program = paths.expand_one(candidate);
        let mut command = Command::new(&program);
        command
            .args(&args)
            .current_dir(cwd)
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(program = %program, "Binary not found, trying next candidate");
                tried.push(program);
                continue;
            }
            Err(source) => return Err(CommandError::Spawn { program, source }),
        };

        if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
            let input = input.to_string();
            tokio::spawn(async move {
                // The child may exit without reading its input
                let _ = pipe.write_all(input.as_bytes()).await;
                let _ = pipe.shutdown().await;
            });
        }

        return match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Err(_) => Err(CommandError::TimedOut),
            Ok(Err(e)) => Err(CommandError::Io(e)),
            Ok(Ok(output)) => Ok(CommandOutput {
                program,
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                success: output.status.success(),
            }),
        };
    }

    Err(CommandError::ToolchainMissing(tried))
}
