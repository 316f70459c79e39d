//! Error taxonomy
//!
//! Per-test failures travel inside `ExecutionOutcome` as `ExecutionError`
//! and never abort sibling test cases. `JudgeError` covers the few problems
//! that stop a whole submission before anything runs.

use crate::engine::BackendKind;
use arbiter_common::types::{Language, TestStatus};
use thiserror::Error;

/// Message prefix every harness emits when the entry point is missing
pub const FUNCTION_NOT_FOUND: &str = "Function not found";

pub const TIME_LIMIT_EXCEEDED: &str = "Time Limit Exceeded";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    FunctionNotFound,
    CompilationError,
    RuntimeError,
    TimeLimitExceeded,
    InfrastructureError,
}

impl ErrorKind {
    pub fn status(&self) -> TestStatus {
        match self {
            ErrorKind::FunctionNotFound => TestStatus::FunctionNotFound,
            ErrorKind::CompilationError => TestStatus::CompilationError,
            ErrorKind::RuntimeError => TestStatus::RuntimeError,
            ErrorKind::TimeLimitExceeded => TestStatus::TimeLimitExceeded,
            ErrorKind::InfrastructureError => TestStatus::InfrastructureError,
        }
    }
}

/// A classified failure of a single execution
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ExecutionError {
    pub kind: ErrorKind,
    pub message: String,
}

impl ExecutionError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn runtime(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RuntimeError, message)
    }

    pub fn timeout() -> Self {
        Self::new(ErrorKind::TimeLimitExceeded, TIME_LIMIT_EXCEEDED)
    }

    pub fn compilation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::CompilationError, message)
    }

    pub fn infrastructure(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InfrastructureError, message)
    }

    pub fn function_not_found(tried: &[String]) -> Self {
        Self::new(
            ErrorKind::FunctionNotFound,
            format!("{}: {}", FUNCTION_NOT_FOUND, tried.join(", ")),
        )
    }
}

/// Submission-level failures
#[derive(Debug, Error)]
pub enum JudgeError {
    #[error("Unsupported language")]
    UnsupportedLanguage(String),

    #[error("No test cases provided")]
    NoTestCases,

    #[error("No {backend} backend available for {language}")]
    BackendUnavailable {
        language: Language,
        backend: BackendKind,
    },

    #[error("Failed to load language configuration: {0}")]
    Config(#[from] anyhow::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_is_message() {
        let err = ExecutionError::compilation("main.cpp:3: error: expected ';'");
        assert_eq!(err.to_string(), "main.cpp:3: error: expected ';'");
        assert_eq!(err.kind.status(), TestStatus::CompilationError);
    }

    #[test]
    fn test_execution_errors_never_claim_parse_error() {
        // ParseError is decided by the evaluator from the input, not by a run
        let errors = [
            ExecutionError::runtime("boom"),
            ExecutionError::timeout(),
            ExecutionError::compilation("error"),
            ExecutionError::infrastructure("down"),
            ExecutionError::function_not_found(&[]),
        ];
        for error in errors {
            assert_ne!(error.kind.status(), TestStatus::ParseError);
        }
    }

    #[test]
    fn test_function_not_found_message() {
        let err = ExecutionError::function_not_found(&["twoSum".to_string(), "two_sum".to_string()]);
        assert_eq!(err.message, "Function not found: twoSum, two_sum");
        assert_eq!(err.kind, ErrorKind::FunctionNotFound);
    }

    #[test]
    fn test_submission_errors_match_wire_messages() {
        assert_eq!(
            JudgeError::UnsupportedLanguage("cobol".into()).to_string(),
            "Unsupported language"
        );
        assert_eq!(JudgeError::NoTestCases.to_string(), "No test cases provided");
        assert_eq!(
            JudgeError::BackendUnavailable {
                language: Language::Rust,
                backend: BackendKind::Remote,
            }
            .to_string(),
            "No remote backend available for rust"
        );
        assert_eq!(ExecutionError::timeout().message, "Time Limit Exceeded");
    }
}
