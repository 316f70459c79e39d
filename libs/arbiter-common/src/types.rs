use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Languages accepted by the judge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    JavaScript,
    Python,
    Cpp,
    Java,
    Rust,
}

impl Language {
    pub const ALL: [Language; 5] = [
        Language::JavaScript,
        Language::Python,
        Language::Cpp,
        Language::Java,
        Language::Rust,
    ];

    /// Parse a language name as sent by clients.
    /// Accepts the canonical names plus a few common spellings.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "javascript" | "js" | "node" => Some(Language::JavaScript),
            "python" | "py" | "python3" => Some(Language::Python),
            "cpp" | "c++" => Some(Language::Cpp),
            "java" => Some(Language::Java),
            "rust" | "rs" => Some(Language::Rust),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::JavaScript => "javascript",
            Language::Python => "python",
            Language::Cpp => "cpp",
            Language::Java => "java",
            Language::Rust => "rust",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single test case owned by the question collaborator.
/// `input` mirrors a printed call (`"[2,7,11,15], 9"`), `expected_output`
/// is already in canonical form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCase {
    pub input: String,
    pub expected_output: String,
    #[serde(default)]
    pub explanation: String,
}

impl TestCase {
    pub fn new(input: impl Into<String>, expected_output: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            expected_output: expected_output.into(),
            explanation: String::new(),
        }
    }
}

/// Per-test verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TestStatus {
    Passed,
    WrongAnswer,
    ParseError,
    FunctionNotFound,
    CompilationError,
    RuntimeError,
    TimeLimitExceeded,
    InfrastructureError,
}

impl TestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TestStatus::Passed => "passed",
            TestStatus::WrongAnswer => "wrong_answer",
            TestStatus::ParseError => "parse_error",
            TestStatus::FunctionNotFound => "function_not_found",
            TestStatus::CompilationError => "compilation_error",
            TestStatus::RuntimeError => "runtime_error",
            TestStatus::TimeLimitExceeded => "time_limit_exceeded",
            TestStatus::InfrastructureError => "infrastructure_error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub test_case_index: usize,
    pub passed: bool,
    pub actual_output: String,
    pub expected_output: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Wall-clock milliseconds spent on this test case
    pub execution_time: u64,
    pub status: TestStatus,
}

/// Terminal artifact of one submission.
///
/// For a completed result `passed_tests` equals the number of passed
/// entries in `results` and `total_tests` equals the number of submitted
/// test cases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JudgeResult {
    pub success: bool,
    pub total_tests: usize,
    pub passed_tests: usize,
    pub results: Vec<ExecutionResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overall_error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubmissionStatus {
    Accepted,
    #[serde(rename = "Wrong Answer")]
    WrongAnswer,
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmissionStatus::Accepted => f.write_str("Accepted"),
            SubmissionStatus::WrongAnswer => f.write_str("Wrong Answer"),
        }
    }
}

impl JudgeResult {
    /// Submission-level failure: nothing was executed.
    pub fn failed(total_tests: usize, error: impl Into<String>) -> Self {
        Self {
            success: false,
            total_tests,
            passed_tests: 0,
            results: Vec::new(),
            overall_error: Some(error.into()),
        }
    }

    pub fn status(&self) -> SubmissionStatus {
        if self.success && self.total_tests > 0 && self.passed_tests == self.total_tests {
            SubmissionStatus::Accepted
        } else {
            SubmissionStatus::WrongAnswer
        }
    }

    /// Percentage of passed tests, 0 when nothing ran
    pub fn accuracy(&self) -> f64 {
        if self.total_tests == 0 {
            return 0.0;
        }
        (self.passed_tests as f64 / self.total_tests as f64) * 100.0
    }

    pub fn total_execution_time(&self) -> u64 {
        self.results.iter().map(|r| r.execution_time).sum()
    }
}

/// What the judge hands to the submission-persistence collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionRecord {
    pub id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question_id: Option<u64>,
    pub code: String,
    pub language: Language,
    pub status: SubmissionStatus,
    pub score: f64,
    pub execution_time: u64,
    pub result: JudgeResult,
    pub submitted_at: DateTime<Utc>,
}

impl SubmissionRecord {
    pub fn new(
        user_id: Option<String>,
        question_id: Option<u64>,
        code: String,
        language: Language,
        result: JudgeResult,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            question_id,
            code,
            language,
            status: result.status(),
            score: result.accuracy(),
            execution_time: result.total_execution_time(),
            result,
            submitted_at: Utc::now(),
        }
    }
}
