//! Judging core: turns a submission (language, source, test cases) into a
//! `JudgeResult`.
//!
//! Pipeline per test case:
//! normalizer → resolver → harness → engine → evaluator, driven by `executor`.

pub mod config;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod executor;
pub mod harness;
pub mod normalizer;
pub mod resolver;

#[cfg(test)]
mod engine_tests;

pub use config::LanguageConfigManager;
pub use engine::{BackendKind, ExecutionBackend, ExecutionOutcome};
pub use error::{ErrorKind, ExecutionError, JudgeError};
pub use executor::{Judge, Submission};
pub use normalizer::ArgShape;
pub use resolver::EntryPoint;
