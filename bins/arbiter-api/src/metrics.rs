// Prometheus metrics for judged submissions

use arbiter_common::types::{JudgeResult, Language};
use lazy_static::lazy_static;
use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};

lazy_static! {
    pub static ref REGISTRY: Registry = {
        let registry = Registry::new();
        registry
            .register(Box::new(SUBMISSIONS_TOTAL.clone()))
            .unwrap();
        registry
            .register(Box::new(TEST_DURATION_SECONDS.clone()))
            .unwrap();
        registry
    };
    pub static ref SUBMISSIONS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("arbiter_submissions_total", "Judged submissions by language and verdict"),
        &["language", "status"]
    )
    .unwrap();
    pub static ref TEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new("arbiter_test_duration_seconds", "Wall-clock time per test case")
            .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
        &["language", "status"]
    )
    .unwrap();
}

/// Record one judged submission. `language` is `None` when it was rejected.
pub fn record(language: Option<Language>, result: &JudgeResult) {
    let language = language.map(|l| l.as_str()).unwrap_or("unsupported");
    let status = if result.overall_error.is_some() {
        "rejected".to_string()
    } else {
        result.status().to_string()
    };
    SUBMISSIONS_TOTAL
        .with_label_values(&[language, &status])
        .inc();

    for case in &result.results {
        TEST_DURATION_SECONDS
            .with_label_values(&[language, case.status.as_str()])
            .observe(case.execution_time as f64 / 1000.0);
    }
}

/// Prometheus text exposition of every registered metric
pub fn render() -> String {
    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();
    if let Err(e) = encoder.encode(&REGISTRY.gather(), &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbiter_common::types::{ExecutionResult, TestStatus};

    #[test]
    fn test_render_includes_recorded_submission() {
        let result = JudgeResult {
            success: true,
            total_tests: 1,
            passed_tests: 1,
            results: vec![ExecutionResult {
                test_case_index: 0,
                passed: true,
                actual_output: "[0,1]".to_string(),
                expected_output: "[0,1]".to_string(),
                error: None,
                execution_time: 120,
                status: TestStatus::Passed,
            }],
            overall_error: None,
        };
        record(Some(Language::Java), &result);

        let text = render();
        assert!(text.contains("arbiter_submissions_total"));
        assert!(text.contains("language=\"java\""));
        assert!(text.contains("arbiter_test_duration_seconds_bucket"));
    }
}
