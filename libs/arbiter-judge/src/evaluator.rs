/// Result Evaluator - Language-Agnostic Comparison Logic
///
/// **Core Responsibility:**
/// Turn a decoded harness result into its canonical string and compare it
/// with the test case's authored expected output.
///
/// **Critical Properties:**
/// - Knows nothing about processes or HTTP
/// - Knows nothing about language runtimes
/// - Pure function: (execution outcome, expected output) → verdict
///
/// **Canonicalization Rules:**
/// - Number: decimal form, integral floats printed without a fraction
/// - Boolean: `true` / `false`
/// - Array: compact JSON, element order preserved
/// - Null (empty list or tree): `[]`
/// - `{val, next}` chains: walked into an array, at most `MAX_WALK` nodes
/// - Anything else: compact JSON of the raw value
///
/// **Comparison:**
/// Exact string equality. No trimming, no numeric tolerance: expected
/// outputs are authored in canonical form.

use crate::engine::ExecutionOutcome;
use arbiter_common::types::{ExecutionResult, JudgeResult, TestCase, TestStatus};
use serde_json::{Number, Value};
use tracing::debug;

/// Upper bound on nodes walked out of a linked structure
pub const MAX_WALK: usize = 1000;

/// `actualOutput` recorded for any test case that did not produce a result
pub const ERROR_OUTPUT: &str = "ERROR";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comparison {
    pub actual_output: String,
    pub passed: bool,
}

/// Canonical string form of a harness result
pub fn canonicalize(result: &Value) -> String {
    match normalize(result) {
        Value::Null => "[]".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

fn normalize(value: &Value) -> Value {
    match value {
        Value::Number(n) => Value::Number(normalize_number(n)),
        Value::Array(items) => Value::Array(items.iter().map(normalize).collect()),
        Value::Object(map) if map.contains_key("val") && map.contains_key("next") => {
            Value::Array(walk_list(value))
        }
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, value)| (key.clone(), normalize(value)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// `2.0` prints as `2`, `-0.0` as `0`
fn normalize_number(n: &Number) -> Number {
    if n.is_f64() {
        if let Some(f) = n.as_f64() {
            if f.fract() == 0.0 && f.abs() < 9.007_199_254_740_992e15 {
                return Number::from(f as i64);
            }
        }
    }
    n.clone()
}

fn walk_list(head: &Value) -> Vec<Value> {
    let mut values = Vec::new();
    let mut current = head;
    while let Value::Object(node) = current {
        let Some(val) = node.get("val") else { break };
        values.push(normalize(val));
        if values.len() >= MAX_WALK {
            break;
        }
        match node.get("next") {
            Some(next) => current = next,
            None => break,
        }
    }
    values
}

/// Decide one test case. Any execution error is a failure with
/// `actualOutput = "ERROR"`.
pub fn compare(outcome: &ExecutionOutcome, expected_output: &str) -> Comparison {
    if outcome.error.is_some() {
        return Comparison {
            actual_output: ERROR_OUTPUT.to_string(),
            passed: false,
        };
    }

    let actual_output = outcome
        .result
        .as_ref()
        .map(canonicalize)
        .unwrap_or_else(|| "[]".to_string());
    let passed = actual_output == expected_output;
    Comparison {
        actual_output,
        passed,
    }
}

/// Evaluate a single test case outcome
///
/// Status priority:
/// 1. Execution error kind (degraded input turns it into `ParseError`)
/// 2. Output comparison
pub fn evaluate_test(
    index: usize,
    outcome: &ExecutionOutcome,
    test_case: &TestCase,
    degraded_input: bool,
) -> ExecutionResult {
    let comparison = compare(outcome, &test_case.expected_output);

    let status = match &outcome.error {
        Some(_) if degraded_input => TestStatus::ParseError,
        Some(error) => error.kind.status(),
        None if comparison.passed => TestStatus::Passed,
        None => TestStatus::WrongAnswer,
    };

    debug!(
        test_index = index,
        status = status.as_str(),
        actual = %comparison.actual_output,
        expected = %test_case.expected_output,
        "Evaluated test case"
    );

    ExecutionResult {
        test_case_index: index,
        passed: comparison.passed,
        actual_output: comparison.actual_output,
        expected_output: test_case.expected_output.clone(),
        error: outcome.error.as_ref().map(|e| e.message.clone()),
        execution_time: outcome.elapsed_ms,
        status,
    }
}

/// Aggregate per-test results into the submission verdict
pub fn aggregate(results: Vec<ExecutionResult>) -> JudgeResult {
    let passed_tests = results.iter().filter(|r| r.passed).count();
    JudgeResult {
        success: true,
        total_tests: results.len(),
        passed_tests,
        results,
        overall_error: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, ExecutionError};
    use serde_json::json;

    fn make_outcome(result: Value) -> ExecutionOutcome {
        ExecutionOutcome::success(result, 7)
    }

    fn make_test_case(expected: &str) -> TestCase {
        TestCase::new("input", expected)
    }

    #[test]
    fn test_canonical_scalars() {
        assert_eq!(canonicalize(&json!(42)), "42");
        assert_eq!(canonicalize(&json!(-3)), "-3");
        assert_eq!(canonicalize(&json!(2.0)), "2");
        assert_eq!(canonicalize(&json!(2.5)), "2.5");
        assert_eq!(canonicalize(&json!(true)), "true");
        assert_eq!(canonicalize(&json!(false)), "false");
    }

    #[test]
    fn test_canonical_arrays_are_compact() {
        assert_eq!(canonicalize(&json!([0, 1])), "[0,1]");
        assert_eq!(canonicalize(&json!([[1, 2], [3.0]])), "[[1,2],[3]]");
        assert_eq!(canonicalize(&json!(["a", "b"])), r#"["a","b"]"#);
        assert_eq!(canonicalize(&json!([])), "[]");
    }

    #[test]
    fn test_null_is_empty_structure() {
        assert_eq!(canonicalize(&Value::Null), "[]");
    }

    #[test]
    fn test_strings_and_objects_are_json() {
        assert_eq!(canonicalize(&json!("bab")), "\"bab\"");
        assert_eq!(canonicalize(&json!({"a": 1})), r#"{"a":1}"#);
    }

    #[test]
    fn test_linked_nodes_are_walked() {
        let list = json!({"val": 1, "next": {"val": 2, "next": {"val": 3, "next": null}}});
        assert_eq!(canonicalize(&list), "[1,2,3]");
    }

    #[test]
    fn test_walk_is_bounded() {
        let mut node = json!(null);
        for i in 0..(MAX_WALK + 50) {
            node = json!({"val": i, "next": node});
        }
        let walked = walk_list(&node);
        assert_eq!(walked.len(), MAX_WALK);
    }

    #[test]
    fn test_compare_exact_match_only() {
        let outcome = make_outcome(json!([0, 1]));
        assert!(compare(&outcome, "[0,1]").passed);
        assert!(!compare(&outcome, "[0, 1]").passed);
        assert!(!compare(&outcome, "[0,1]\n").passed);
    }

    #[test]
    fn test_error_outcome_reports_error_output() {
        let outcome = ExecutionOutcome::failure(ExecutionError::runtime("boom"), 3);
        let result = evaluate_test(0, &outcome, &make_test_case("1"), false);
        assert!(!result.passed);
        assert_eq!(result.actual_output, "ERROR");
        assert_eq!(result.error.as_deref(), Some("boom"));
        assert_eq!(result.status, TestStatus::RuntimeError);
        assert_eq!(result.execution_time, 3);
    }

    #[test]
    fn test_status_mapping() {
        let passed = evaluate_test(0, &make_outcome(json!(true)), &make_test_case("true"), false);
        assert_eq!(passed.status, TestStatus::Passed);

        let wrong = evaluate_test(1, &make_outcome(json!(false)), &make_test_case("true"), false);
        assert_eq!(wrong.status, TestStatus::WrongAnswer);
        assert!(wrong.error.is_none());

        let tle = ExecutionOutcome::failure(ExecutionError::timeout(), 2000);
        let tle = evaluate_test(2, &tle, &make_test_case("true"), false);
        assert_eq!(tle.status, TestStatus::TimeLimitExceeded);
    }

    #[test]
    fn test_degraded_input_failure_is_parse_error() {
        let outcome = ExecutionOutcome::failure(
            ExecutionError::new(ErrorKind::RuntimeError, "TypeError: nums.map is not a function"),
            4,
        );
        let result = evaluate_test(0, &outcome, &make_test_case("[1]"), true);
        assert_eq!(result.status, TestStatus::ParseError);

        // A degraded input that still succeeds is judged normally
        let result = evaluate_test(0, &make_outcome(json!("x")), &make_test_case("\"x\""), true);
        assert_eq!(result.status, TestStatus::Passed);
    }

    #[test]
    fn test_aggregate_counts() {
        let results = vec![
            evaluate_test(0, &make_outcome(json!(1)), &make_test_case("1"), false),
            evaluate_test(1, &make_outcome(json!(2)), &make_test_case("3"), false),
            evaluate_test(2, &make_outcome(json!(3)), &make_test_case("3"), false),
        ];
        let judged = aggregate(results);
        assert!(judged.success);
        assert_eq!(judged.total_tests, 3);
        assert_eq!(judged.passed_tests, 2);
        assert_eq!(judged.passed_tests, judged.results.iter().filter(|r| r.passed).count());
    }
}
