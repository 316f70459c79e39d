/// Remote Backend - Piston-compatible Compile-and-Run Service
///
/// **Core Responsibility:**
/// Ship the harness files to the remote service and translate its
/// compile/run stages into an `ExecutionOutcome`.
///
/// **Timeouts:**
/// - `run_timeout` is the per-test budget, in milliseconds
/// - `compile_timeout` comes from configuration
/// - The HTTP request itself waits `max(5000, run_timeout + 4000)` ms so that
///   queueing on the service side does not masquerade as a slow solution
///
/// A killed run stage (`SIGKILL`) or an expired HTTP wait is a
/// `TimeLimitExceeded`; transport failures and unexpected responses are
/// `InfrastructureError`.

use super::versions::{RuntimeCatalog, RuntimeInfo, RuntimeVersionCache};
use super::{outcome_from_output, BackendKind, ExecutionBackend, ExecutionOutcome};
use crate::config::LanguageConfigManager;
use crate::error::ExecutionError;
use crate::harness::HarnessProgram;
use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const MIN_HTTP_TIMEOUT_MS: u64 = 5000;
const HTTP_OVERHEAD_MS: u64 = 4000;

#[derive(Debug, Clone, Serialize)]
pub struct PistonFile {
    pub name: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PistonRequest {
    pub language: String,
    pub version: String,
    pub files: Vec<PistonFile>,
    pub compile_timeout: u64,
    pub run_timeout: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PistonStage {
    #[serde(default)]
    pub stdout: String,
    #[serde(default)]
    pub stderr: String,
    #[serde(default)]
    pub output: String,
    pub code: Option<i64>,
    pub signal: Option<String>,
}

impl PistonStage {
    fn failed(&self) -> bool {
        self.code.map_or(self.signal.is_some(), |code| code != 0)
    }

    fn killed(&self) -> bool {
        self.signal.as_deref() == Some("SIGKILL")
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PistonResponse {
    pub run: Option<PistonStage>,
    pub compile: Option<PistonStage>,
    /// Set by the service instead of `run` when it rejects the request
    pub message: Option<String>,
}

/// Thin HTTP client for the Piston API
#[derive(Debug, Clone)]
pub struct PistonClient {
    client: Client,
    base_url: String,
    catalog_timeout: Duration,
}

impl PistonClient {
    pub fn new(base_url: impl Into<String>, catalog_timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            catalog_timeout,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn execute(
        &self,
        request: &PistonRequest,
        http_timeout: Duration,
    ) -> Result<PistonResponse, reqwest::Error> {
        let response = self
            .client
            .post(format!("{}/execute", self.base_url))
            .timeout(http_timeout)
            .json(request)
            .send()
            .await?;
        response.json::<PistonResponse>().await
    }
}

#[async_trait]
impl RuntimeCatalog for PistonClient {
    async fn runtimes(&self) -> anyhow::Result<Vec<RuntimeInfo>> {
        let url = format!("{}/runtimes", self.base_url);
        let runtimes = self
            .client
            .get(&url)
            .timeout(self.catalog_timeout)
            .send()
            .await
            .with_context(|| format!("Failed to reach {}", url))?
            .error_for_status()?
            .json::<Vec<RuntimeInfo>>()
            .await
            .context("Malformed runtime catalog")?;
        debug!(count = runtimes.len(), "Fetched runtime catalog");
        Ok(runtimes)
    }
}

pub struct RemoteBackend {
    client: PistonClient,
    versions: Arc<RuntimeVersionCache>,
    languages: Arc<LanguageConfigManager>,
    compile_timeout: Duration,
}

impl RemoteBackend {
    pub fn new(
        client: PistonClient,
        versions: Arc<RuntimeVersionCache>,
        languages: Arc<LanguageConfigManager>,
        compile_timeout: Duration,
    ) -> Self {
        Self {
            client,
            versions,
            languages,
            compile_timeout,
        }
    }

    pub fn http_timeout(run_timeout: Duration) -> Duration {
        let run_ms = run_timeout.as_millis() as u64;
        Duration::from_millis(MIN_HTTP_TIMEOUT_MS.max(run_ms + HTTP_OVERHEAD_MS))
    }

    async fn build_request(
        &self,
        program: &HarnessProgram,
        timeout: Duration,
    ) -> Result<PistonRequest, ExecutionError> {
        let config = self
            .languages
            .get_config(&program.language)
            .map_err(|e| ExecutionError::infrastructure(e.to_string()))?;
        let version = self.versions.version_for(program.language).await;

        Ok(PistonRequest {
            language: config.remote.language.clone(),
            version,
            files: program
                .files
                .iter()
                .map(|file| PistonFile {
                    name: file.name.clone(),
                    content: file.content.clone(),
                })
                .collect(),
            compile_timeout: self.compile_timeout.as_millis() as u64,
            run_timeout: timeout.as_millis() as u64,
        })
    }
}

#[async_trait]
impl ExecutionBackend for RemoteBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Remote
    }

    #[tracing::instrument(skip(self, program), fields(language = %program.language))]
    async fn run(&self, program: &HarnessProgram, timeout: Duration) -> ExecutionOutcome {
        let started = Instant::now();
        let request = match self.build_request(program, timeout).await {
            Ok(request) => request,
            Err(error) => return ExecutionOutcome::failure(error, 0),
        };

        info!(
            remote_language = %request.language,
            version = %request.version,
            files = request.files.len(),
            "Submitting to remote service"
        );

        let response = self
            .client
            .execute(&request, Self::http_timeout(timeout))
            .await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match response {
            Ok(response) => outcome_from_response(response, elapsed_ms),
            Err(e) if e.is_timeout() => {
                warn!(elapsed_ms = elapsed_ms, "Remote execution timed out");
                ExecutionOutcome::failure(ExecutionError::timeout(), elapsed_ms)
            }
            Err(e) => {
                warn!(error = %e, "Remote execution failed");
                ExecutionOutcome::failure(
                    ExecutionError::infrastructure(format!("Remote execution failed: {}", e)),
                    elapsed_ms,
                )
            }
        }
    }
}

/// Classify a decoded service response
pub fn outcome_from_response(response: PistonResponse, elapsed_ms: u64) -> ExecutionOutcome {
    if let Some(compile) = &response.compile {
        if compile.failed() {
            let message = [compile.stderr.trim(), compile.output.trim(), compile.stdout.trim()]
                .into_iter()
                .find(|text| !text.is_empty())
                .unwrap_or("Compilation failed");
            return ExecutionOutcome::failure(ExecutionError::compilation(message), elapsed_ms);
        }
    }

    let Some(run) = response.run else {
        let message = response
            .message
            .unwrap_or_else(|| "Invalid response from remote service".to_string());
        return ExecutionOutcome::failure(ExecutionError::infrastructure(message), elapsed_ms);
    };

    if run.killed() {
        return ExecutionOutcome::failure(ExecutionError::timeout(), elapsed_ms);
    }

    outcome_from_output(&run.stdout, &run.stderr, !run.failed(), elapsed_ms)
}
