// CLI commands for judging solutions locally
use anyhow::{bail, Context, Result};
use arbiter_common::config::JudgeConfig;
use arbiter_common::types::{JudgeResult, Language, SubmissionStatus, TestCase};
use arbiter_judge::engine::remote::PistonClient;
use arbiter_judge::engine::{RuntimeCatalog, RuntimeVersionCache};
use arbiter_judge::executor::{build_harness, Submission};
use arbiter_judge::{ArgShape, BackendKind, EntryPoint, Judge, LanguageConfigManager};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Test files are either a bare array or `{"testCases": [...]}`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TestFile {
    Cases(Vec<TestCase>),
    Wrapped {
        #[serde(rename = "testCases")]
        test_cases: Vec<TestCase>,
    },
}

pub fn parse_test_cases(content: &str) -> Result<Vec<TestCase>> {
    let file: TestFile = serde_json::from_str(content).context("Failed to parse test cases")?;
    Ok(match file {
        TestFile::Cases(cases) => cases,
        TestFile::Wrapped { test_cases } => test_cases,
    })
}

pub fn entry_point(name: &str, shape: Option<ArgShape>) -> EntryPoint {
    match shape {
        Some(shape) => EntryPoint::new(name, shape),
        None => EntryPoint::infer(name),
    }
}

fn parse_language(name: &str) -> Result<Language> {
    match Language::from_name(name) {
        Some(language) => Ok(language),
        None => bail!("Unsupported language '{}'", name),
    }
}

fn read_source(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

/// Judge a solution file and print one line per test case
pub async fn judge_file(
    language: &str,
    source: &Path,
    tests: &Path,
    entry: EntryPoint,
    time_limit: Option<u64>,
    backend: Option<BackendKind>,
    json: bool,
) -> Result<()> {
    let code = read_source(source)?;
    let test_cases = parse_test_cases(&read_source(tests)?)?;

    let judge = Judge::from_config(&JudgeConfig::from_env()).context("Failed to configure judge")?;

    if !json {
        println!(
            "🚀 Judging {} ({}) against {} test case(s)",
            source.display(),
            language,
            test_cases.len()
        );
        println!("   Entry point: {} [{}]\n", entry.name, entry.shape);
    }

    let submission = Submission {
        language: language.to_string(),
        code,
        test_cases,
        entry_point: entry,
        time_limit_ms: time_limit,
        backend,
    };
    let result = judge.submit(&submission).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_result(&result);
    }

    if let Some(error) = &result.overall_error {
        bail!("{}", error);
    }
    Ok(())
}

fn print_result(result: &JudgeResult) {
    for case in &result.results {
        let mark = if case.passed { "✓" } else { "✗" };
        println!(
            "  {} Test {} [{}] {}ms",
            mark,
            case.test_case_index + 1,
            case.status.as_str(),
            case.execution_time
        );
        if !case.passed {
            println!("    Expected: {}", case.expected_output);
            println!("    Got:      {}", case.actual_output);
            if let Some(error) = &case.error {
                println!("    Error:    {}", error);
            }
        }
    }

    println!(
        "\n{} {}/{} passed ({:.0}%) in {}ms",
        if result.status() == SubmissionStatus::Accepted { "✅" } else { "❌" },
        result.passed_tests,
        result.total_tests,
        result.accuracy(),
        result.total_execution_time()
    );
}

/// Print every file of the generated harness
pub fn print_harness(language: &str, source: &Path, input: &str, entry: &EntryPoint) -> Result<()> {
    let language = parse_language(language)?;
    let code = read_source(source)?;

    let program = build_harness(language, &code, input, entry)
        .map_err(|e| anyhow::anyhow!("Cannot build harness: {}", e))?;

    for file in &program.files {
        println!("// ===== {} =====", file.name);
        println!("{}", file.content);
    }
    Ok(())
}

/// Show the remote catalog and which version each language resolves to
pub async fn list_runtimes() -> Result<()> {
    let config = JudgeConfig::from_env();
    let languages = LanguageConfigManager::load_or_builtin(Path::new(&config.languages_config))?;
    let client = PistonClient::new(
        config.piston_url.clone(),
        Duration::from_millis(config.catalog_timeout_ms),
    );

    println!("📋 Runtimes at {}\n", client.base_url());
    match client.runtimes().await {
        Ok(runtimes) => {
            println!("{:<16} {:<12} {}", "LANGUAGE", "VERSION", "ALIASES");
            println!("{}", "─".repeat(60));
            for runtime in &runtimes {
                println!(
                    "{:<16} {:<12} {}",
                    runtime.language,
                    runtime.version,
                    runtime.aliases.join(", ")
                );
            }
            println!("\n✅ Total: {} runtime(s)\n", runtimes.len());
        }
        Err(e) => println!("⚠️  Catalog unavailable: {:#}\n", e),
    }

    let versions = RuntimeVersionCache::new(
        Arc::new(client),
        config.version_overrides.clone(),
        languages.remote_aliases(),
    );
    println!("Resolved versions:");
    for language in languages.list_languages() {
        let backend = languages.default_backend(&language)?;
        println!(
            "  {:<12} {:<12} (default backend: {})",
            language.as_str(),
            versions.version_for(language).await,
            backend
        );
    }
    Ok(())
}
