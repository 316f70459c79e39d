/// Judge Executor - High-Level Orchestration
///
/// **Responsibility:**
/// Drive one submission through normalizer → resolver → harness → backend
/// → evaluator for every test case, and aggregate the verdicts.
///
/// **Architecture:**
/// 1. Validate the submission (language, test cases, backend)
/// 2. Resolve the entry point once; every case shares the resolution
/// 3. Per case: parse input, generate harness, run it, evaluate
/// 4. Aggregate into a `JudgeResult`
///
/// This module is the glue layer - it knows nothing about:
/// - How code executes (engine's job)
/// - How outputs compare (evaluator's job)
///
/// A failing test case never stops its siblings. Only a submission-level
/// problem produces `overallError`.

use crate::config::LanguageConfigManager;
use crate::engine::versions::RuntimeVersionCache;
use crate::engine::{
    BackendKind, ExecutionBackend, ExecutionOutcome, LocalBackend, RemoteBackend,
};
use crate::engine::remote::PistonClient;
use crate::error::{ExecutionError, JudgeError};
use crate::evaluator;
use crate::harness::{generate_harness, HarnessProgram};
use crate::normalizer::{self, ParsedArguments};
use crate::resolver::{self, EntryPoint, Resolution};
use arbiter_common::config::JudgeConfig;
use arbiter_common::types::{ExecutionResult, JudgeResult, Language, TestCase};
use futures_util::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// One judging request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    /// Language name as sent by the client; validated by the judge
    pub language: String,
    pub code: String,
    pub test_cases: Vec<TestCase>,
    pub entry_point: EntryPoint,
    /// Per test case budget; the configured default when absent
    #[serde(default)]
    pub time_limit_ms: Option<u64>,
    /// Overrides the language's default backend
    #[serde(default)]
    pub backend: Option<BackendKind>,
}

pub struct Judge {
    languages: Arc<LanguageConfigManager>,
    backends: HashMap<BackendKind, Arc<dyn ExecutionBackend>>,
    default_time_limit: Duration,
    max_parallel_tests: usize,
}

impl Judge {
    pub fn new(languages: Arc<LanguageConfigManager>, default_time_limit: Duration) -> Self {
        Self {
            languages,
            backends: HashMap::new(),
            default_time_limit,
            max_parallel_tests: 1,
        }
    }

    /// Register a backend under its own kind, replacing any previous one
    pub fn with_backend(mut self, backend: Arc<dyn ExecutionBackend>) -> Self {
        self.backends.insert(backend.kind(), backend);
        self
    }

    pub fn with_max_parallel_tests(mut self, max: usize) -> Self {
        self.max_parallel_tests = max.max(1);
        self
    }

    /// Production wiring: language registry from disk (or built in), local
    /// subprocess backend and Piston backend with its version cache
    pub fn from_config(config: &JudgeConfig) -> Result<Self, JudgeError> {
        let languages = Arc::new(LanguageConfigManager::load_or_builtin(Path::new(
            &config.languages_config,
        ))?);

        let local = LocalBackend::new(
            languages.clone(),
            Duration::from_millis(config.local_compile_timeout_ms),
        );

        let client = PistonClient::new(
            config.piston_url.clone(),
            Duration::from_millis(config.catalog_timeout_ms),
        );
        let versions = Arc::new(RuntimeVersionCache::new(
            Arc::new(client.clone()),
            config.version_overrides.clone(),
            languages.remote_aliases(),
        ));
        let remote = RemoteBackend::new(
            client,
            versions,
            languages.clone(),
            Duration::from_millis(config.remote_compile_timeout_ms),
        );

        info!(
            languages = ?languages.list_languages(),
            piston_url = %config.piston_url,
            max_parallel_tests = config.max_parallel_tests,
            "Judge configured"
        );

        Ok(Self::new(languages, Duration::from_millis(config.default_time_limit_ms))
            .with_backend(Arc::new(local))
            .with_backend(Arc::new(remote))
            .with_max_parallel_tests(config.max_parallel_tests))
    }

    pub fn languages(&self) -> &Arc<LanguageConfigManager> {
        &self.languages
    }

    /// Judge a submission. Always returns a complete result.
    #[tracing::instrument(skip(self, submission), fields(language = %submission.language, tests = submission.test_cases.len()))]
    pub async fn submit(&self, submission: &Submission) -> JudgeResult {
        let (language, backend) = match self.prepare(submission) {
            Ok(prepared) => prepared,
            Err(e) => {
                warn!(error = %e, "Submission rejected");
                return JudgeResult::failed(submission.test_cases.len(), e.to_string());
            }
        };

        let time_limit = submission
            .time_limit_ms
            .map(Duration::from_millis)
            .unwrap_or(self.default_time_limit);

        let resolution = resolver::resolve(&submission.code, language, &submission.entry_point);
        match &resolution {
            Resolution::Found(entry) => {
                debug!(ident = %entry.ident, receiver = ?entry.receiver, "Entry point resolved")
            }
            Resolution::NotFound { tried } => {
                info!(tried = ?tried, "Entry point not found in source")
            }
        }

        let context = CaseContext {
            language,
            code: &submission.code,
            entry_point: &submission.entry_point,
            resolution: &resolution,
            backend: backend.as_ref(),
            time_limit,
        };

        let results: Vec<ExecutionResult> = stream::iter(0..submission.test_cases.len())
            .map(|index| context.judge_case(index, &submission.test_cases[index]))
            .buffered(self.max_parallel_tests)
            .collect()
            .await;

        let result = evaluator::aggregate(results);
        info!(
            backend = %backend.kind(),
            passed = result.passed_tests,
            total = result.total_tests,
            "Submission judged"
        );
        result
    }

    fn prepare(
        &self,
        submission: &Submission,
    ) -> Result<(Language, Arc<dyn ExecutionBackend>), JudgeError> {
        let language = Language::from_name(&submission.language)
            .filter(|language| self.languages.is_enabled(language))
            .ok_or_else(|| JudgeError::UnsupportedLanguage(submission.language.clone()))?;

        if submission.test_cases.is_empty() {
            return Err(JudgeError::NoTestCases);
        }

        let kind = match submission.backend {
            Some(kind) => kind,
            None => self.languages.default_backend(&language)?,
        };
        let backend = self
            .backends
            .get(&kind)
            .cloned()
            .ok_or(JudgeError::BackendUnavailable {
                language,
                backend: kind,
            })?;

        Ok((language, backend))
    }
}

/// Everything one test case needs, shared across the submission
struct CaseContext<'a> {
    language: Language,
    code: &'a str,
    entry_point: &'a EntryPoint,
    resolution: &'a Resolution,
    backend: &'a dyn ExecutionBackend,
    time_limit: Duration,
}

impl CaseContext<'_> {
    async fn judge_case(&self, index: usize, test_case: &TestCase) -> ExecutionResult {
        let parsed = normalizer::parse(&test_case.input);
        if parsed.degraded {
            debug!(test_index = index, input = %test_case.input, "Input degraded to raw string");
        }

        let outcome = match self.harness(&parsed) {
            Ok(program) => self.backend.run(&program, self.time_limit).await,
            Err(error) => ExecutionOutcome::failure(error, 0),
        };

        let result = evaluator::evaluate_test(index, &outcome, test_case, parsed.degraded);
        info!(
            test_index = index,
            passed = result.passed,
            status = result.status.as_str(),
            elapsed_ms = result.execution_time,
            "Test case finished"
        );
        result
    }

    fn harness(&self, parsed: &ParsedArguments) -> Result<HarnessProgram, ExecutionError> {
        let args = normalizer::structure(parsed, self.entry_point.shape);
        generate_harness(self.language, self.code, &args, self.resolution)
    }
}

/// Generate the harness for a single input without running it
pub fn build_harness(
    language: Language,
    code: &str,
    input: &str,
    entry_point: &EntryPoint,
) -> Result<HarnessProgram, ExecutionError> {
    let resolution = resolver::resolve(code, language, entry_point);
    let args = normalizer::structure(&normalizer::parse(input), entry_point.shape);
    generate_harness(language, code, &args, &resolution)
}
