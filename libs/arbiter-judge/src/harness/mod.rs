/// Language Adapters - Harness Generation
///
/// **Core Responsibility:**
/// Wrap the verbatim user source in a self-contained program that rebuilds
/// the arguments, calls the resolved entry point and prints exactly one
/// sentinel line:
///
/// ```text
/// {"__result": <value>}
/// {"__error": "<message>"}
/// ```
///
/// **Critical Properties:**
/// - User source is embedded unmodified
/// - Every failure inside the harness is caught and reported as `__error`
/// - `Resolution::NotFound` still produces a runnable program; it only
///   emits the "Function not found" error
/// - Generation is deterministic for given inputs
///
/// The sentinel is printed after a newline so stray user output without a
/// trailing newline cannot corrupt it.

mod cpp;
mod java;
mod javascript;
mod python;
mod rust;

use crate::error::ExecutionError;
use crate::normalizer::Argument;
use crate::resolver::Resolution;
use arbiter_common::types::Language;
use serde_json::Value;

pub use cpp::CppAdapter;
pub use java::JavaAdapter;
pub use javascript::JavaScriptAdapter;
pub use python::PythonAdapter;
pub use rust::RustAdapter;

/// One generated source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub name: String,
    pub content: String,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}

/// Generated program for one test case. `files[0]` is the entry file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessProgram {
    pub language: Language,
    pub files: Vec<SourceFile>,
}

impl HarnessProgram {
    pub fn single(language: Language, name: &str, content: String) -> Self {
        Self {
            language,
            files: vec![SourceFile::new(name, content)],
        }
    }
}

/// Harness generator for one language
pub trait LanguageAdapter: Send + Sync {
    /// Build the harness. An `Err` means the arguments cannot be expressed in
    /// this language; the caller reports it like any other runtime failure.
    fn generate(
        &self,
        source: &str,
        args: &[Argument],
        resolution: &Resolution,
    ) -> Result<HarnessProgram, ExecutionError>;
}

pub fn adapter_for(language: Language) -> &'static dyn LanguageAdapter {
    match language {
        Language::JavaScript => &JavaScriptAdapter,
        Language::Python => &PythonAdapter,
        Language::Cpp => &CppAdapter,
        Language::Java => &JavaAdapter,
        Language::Rust => &RustAdapter,
    }
}

pub fn generate_harness(
    language: Language,
    source: &str,
    args: &[Argument],
    resolution: &Resolution,
) -> Result<HarnessProgram, ExecutionError> {
    adapter_for(language).generate(source, args, resolution)
}

/// Message used by every harness when the entry point is missing
pub(crate) fn not_found_message(resolution: &Resolution) -> Option<String> {
    match resolution {
        Resolution::Found(_) => None,
        Resolution::NotFound { tried } => {
            Some(ExecutionError::function_not_found(tried).message)
        }
    }
}

/// Argument type as seen by the statically typed harnesses
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum StaticType {
    Int,
    Long,
    Bool,
    Str,
    /// A bare `null`
    Null,
    List(Box<StaticType>),
    Nullable(Box<StaticType>),
    Unknown,
}

impl StaticType {
    pub(crate) fn infer(value: &Value) -> StaticType {
        match value {
            Value::Null => StaticType::Null,
            Value::Bool(_) => StaticType::Bool,
            Value::Number(n) => match truncate(n) {
                Some(v) if i32::try_from(v).is_ok() => StaticType::Int,
                Some(_) => StaticType::Long,
                None => StaticType::Unknown,
            },
            Value::String(_) => StaticType::Str,
            Value::Array(items) => {
                let element = items
                    .iter()
                    .map(StaticType::infer)
                    .reduce(StaticType::unify)
                    .unwrap_or(StaticType::Int);
                match element {
                    StaticType::Null => StaticType::List(Box::new(StaticType::Nullable(
                        Box::new(StaticType::Int),
                    ))),
                    StaticType::Unknown => StaticType::Unknown,
                    other => StaticType::List(Box::new(other)),
                }
            }
            Value::Object(_) => StaticType::Unknown,
        }
    }

    fn unify(self, other: StaticType) -> StaticType {
        use StaticType::*;
        match (self, other) {
            (a, b) if a == b => a,
            (Int, Long) | (Long, Int) => Long,
            (Null, Nullable(t)) | (Nullable(t), Null) => Nullable(t),
            (Null, t) | (t, Null) => Nullable(Box::new(t)),
            (Nullable(a), b) | (b, Nullable(a)) => match (*a).unify(b) {
                Unknown => Unknown,
                Nullable(t) => Nullable(t),
                t => Nullable(Box::new(t)),
            },
            (List(a), List(b)) => match (*a).unify(*b) {
                Unknown => Unknown,
                t => List(Box::new(t)),
            },
            _ => Unknown,
        }
    }
}

/// Integer value of a JSON number, fractional part dropped
pub(crate) fn truncate(n: &serde_json::Number) -> Option<i64> {
    if let Some(v) = n.as_i64() {
        return Some(v);
    }
    let f = n.as_f64()?;
    if f.is_finite() && f.abs() < 9.2e18 {
        Some(f.trunc() as i64)
    } else {
        None
    }
}

/// How control characters are written inside a string literal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Escape {
    /// `\012`, valid in C++ and Java
    Octal,
    /// `\u{a}`
    RustUnicode,
}

/// Double-quoted literal with quote, backslash and control characters escaped
pub(crate) fn quoted(text: &str, style: Escape) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 || c as u32 == 0x7f => match style {
                Escape::Octal => out.push_str(&format!("\\{:03o}", c as u32)),
                Escape::RustUnicode => out.push_str(&format!("\\u{{{:x}}}", c as u32)),
            },
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
