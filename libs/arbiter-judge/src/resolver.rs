/// Entry-Point Resolver
///
/// **Core Responsibility:**
/// Decide which user-defined callable the harness invokes.
///
/// Every question declares its entry point (`EntryPoint`). The resolver turns
/// the declaration into an ordered list of candidate identifiers for the
/// submission language, then checks the source text for a declaration of
/// each candidate. This is a textual scan, not a parser: comments are
/// stripped first, string literals are not.
///
/// A missing entry point is not an error here. `Resolution::NotFound` is
/// handed to the harness, which reports it at run time through the same
/// channel as every other execution failure.

use crate::normalizer::ArgShape;
use arbiter_common::types::Language;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

lazy_static! {
    /// Well-known problems and the argument shape they expect
    static ref KNOWN_SHAPES: HashMap<&'static str, ArgShape> = {
        let mut m = HashMap::new();
        m.insert("reverseList", ArgShape::LinkedList);
        m.insert("mergeTwoLists", ArgShape::LinkedList);
        m.insert("middleNode", ArgShape::LinkedList);
        m.insert("isPalindromeList", ArgShape::LinkedList);
        m.insert("hasCycle", ArgShape::CyclicList);
        m.insert("detectCycle", ArgShape::CyclicList);
        m.insert("inorderTraversal", ArgShape::BinaryTree);
        m.insert("preorderTraversal", ArgShape::BinaryTree);
        m.insert("postorderTraversal", ArgShape::BinaryTree);
        m.insert("levelOrder", ArgShape::BinaryTree);
        m.insert("maxDepth", ArgShape::BinaryTree);
        m.insert("invertTree", ArgShape::BinaryTree);
        m.insert("isSymmetric", ArgShape::BinaryTree);
        m.insert("isSameTree", ArgShape::BinaryTree);
        m
    };
    static ref JS_CLASS: Regex = Regex::new(r"\bclass\s+([A-Za-z_$][\w$]*)").unwrap();
    static ref PY_CLASS: Regex = Regex::new(r"(?m)^class\s+([A-Za-z_]\w*)").unwrap();
    static ref CPP_CLASS: Regex = Regex::new(r"\b(?:class|struct)\s+([A-Za-z_]\w*)\s*(?::[^{;]*)?\{").unwrap();
    static ref JAVA_CLASS: Regex = Regex::new(r"\bclass\s+([A-Za-z_]\w*)").unwrap();
    static ref RUST_IMPL: Regex = Regex::new(r"\bimpl\s+([A-Za-z_]\w*)\s*\{").unwrap();
}

/// Class names the harnesses provide themselves; never a receiver
const HELPER_TYPES: [&str; 2] = ["ListNode", "TreeNode"];

/// Declared entry point of a question
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryPoint {
    /// Canonical (camelCase) name, e.g. `twoSum`
    pub name: String,
    #[serde(default)]
    pub shape: ArgShape,
    /// Identifier pinned for a specific language, tried first
    #[serde(default)]
    pub aliases: HashMap<Language, String>,
}

impl EntryPoint {
    pub fn new(name: impl Into<String>, shape: ArgShape) -> Self {
        Self {
            name: name.into(),
            shape,
            aliases: HashMap::new(),
        }
    }

    /// Entry point for callers that only know the name. The shape comes from
    /// the table of well-known problems, `Plain` otherwise.
    pub fn infer(name: &str) -> Self {
        let canonical = to_camel(name.trim());
        let shape = KNOWN_SHAPES
            .get(canonical.as_str())
            .copied()
            .unwrap_or_default();
        Self::new(name.trim(), shape)
    }

    pub fn with_alias(mut self, language: Language, ident: impl Into<String>) -> Self {
        self.aliases.insert(language, ident.into());
        self
    }

    /// Ordered, de-duplicated identifiers to look for in `language` source
    pub fn candidates(&self, language: Language) -> Vec<String> {
        let mut names = Vec::new();
        if let Some(alias) = self.aliases.get(&language) {
            names.push(alias.clone());
        }
        let camel = to_camel(&self.name);
        match language {
            Language::JavaScript | Language::Java | Language::Cpp => {
                names.push(camel);
                names.push(self.name.clone());
            }
            Language::Python | Language::Rust => {
                names.push(to_snake(&self.name));
                names.push(camel);
                names.push(self.name.clone());
            }
        }

        let mut seen = std::collections::HashSet::new();
        names.retain(|n| !n.is_empty() && seen.insert(n.clone()));
        names
    }
}

/// How the harness reaches the callable
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Receiver {
    Free,
    /// Method on a user class, called through a fresh instance
    Class(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEntry {
    pub ident: String,
    pub receiver: Receiver,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Found(ResolvedEntry),
    NotFound { tried: Vec<String> },
}

impl Resolution {
    pub fn is_found(&self) -> bool {
        matches!(self, Resolution::Found(_))
    }
}

/// Find the first candidate the source declares as a callable
pub fn resolve(source: &str, language: Language, entry: &EntryPoint) -> Resolution {
    let code = strip_comments(source, language);
    let tried = entry.candidates(language);

    for ident in &tried {
        if let Some(receiver) = find_declaration(&code, language, ident) {
            tracing::debug!(
                language = %language,
                ident = %ident,
                receiver = ?receiver,
                "Resolved entry point"
            );
            return Resolution::Found(ResolvedEntry {
                ident: ident.clone(),
                receiver,
            });
        }
    }

    tracing::debug!(language = %language, tried = ?tried, "Entry point not found");
    Resolution::NotFound { tried }
}

fn find_declaration(code: &str, language: Language, ident: &str) -> Option<Receiver> {
    let name = regex::escape(ident);
    match language {
        Language::JavaScript => {
            let free = Regex::new(&format!(
                r"\bfunction\s*\*?\s*{name}\s*\(|\b(?:const|let|var)\s+{name}\s*=|\b(?:module\.)?exports\.{name}\s*="
            ))
            .ok()?;
            if let Some(m) = free.find(code) {
                if brace_depth(code, m.start(), language) == 0 {
                    return Some(Receiver::Free);
                }
            }
            let method = Regex::new(&format!(
                r"(?m)^\s*(?:async\s+)?(?:static\s+)?{name}\s*\([^)]*\)\s*\{{"
            ))
            .ok()?;
            let m = method.find(code)?;
            Some(class_receiver(code, &JS_CLASS, m.start()))
        }
        Language::Python => {
            let def = Regex::new(&format!(r"(?m)^([ \t]*)def\s+{name}\s*\(")).ok()?;
            if let Some(caps) = def.captures(code) {
                if caps[1].is_empty() {
                    return Some(Receiver::Free);
                }
                let start = caps.get(0).map(|m| m.start()).unwrap_or(0);
                return Some(python_receiver(code, start));
            }
            let lambda = Regex::new(&format!(r"(?m)^{name}\s*=\s*lambda\b")).ok()?;
            lambda.find(code).map(|_| Receiver::Free)
        }
        Language::Cpp => {
            let def = Regex::new(&format!(
                r"[\w>\]*&]\s*[*&]*\s*\b{name}\s*\([^;{{}}]*\)\s*(?:const\s*)?(?:noexcept\s*)?(?:override\s*)?(?:->[^{{;]*)?\{{"
            ))
            .ok()?;
            let m = def.find(code)?;
            if brace_depth(code, m.start(), language) == 0 {
                Some(Receiver::Free)
            } else {
                Some(class_receiver(code, &CPP_CLASS, m.start()))
            }
        }
        Language::Java => {
            let def = Regex::new(&format!(
                r"[\w>\]]\s+{name}\s*\([^;{{}}]*\)\s*(?:throws\s+[\w.,\s]+)?\{{"
            ))
            .ok()?;
            let m = def.find(code)?;
            if brace_depth(code, m.start(), language) == 0 {
                // Bare method, the harness wraps it in a class
                Some(Receiver::Free)
            } else {
                Some(class_receiver(code, &JAVA_CLASS, m.start()))
            }
        }
        Language::Rust => {
            let def = Regex::new(&format!(r"\bfn\s+{name}\s*[<(]")).ok()?;
            let m = def.find(code)?;
            if brace_depth(code, m.start(), language) == 0 {
                Some(Receiver::Free)
            } else {
                Some(class_receiver(code, &RUST_IMPL, m.start()))
            }
        }
    }
}

/// `Solution` when the source declares it, otherwise the last user type
/// declared before `position`
fn class_receiver(code: &str, pattern: &Regex, position: usize) -> Receiver {
    let mut fallback = None;
    for caps in pattern.captures_iter(code) {
        let name = &caps[1];
        if HELPER_TYPES.contains(&name) {
            continue;
        }
        if name == "Solution" {
            return Receiver::Class(name.to_string());
        }
        let start = caps.get(0).map(|m| m.start()).unwrap_or(usize::MAX);
        if start < position {
            fallback = Some(name.to_string());
        }
    }
    Receiver::Class(fallback.unwrap_or_else(|| "Solution".to_string()))
}

fn python_receiver(code: &str, position: usize) -> Receiver {
    let enclosing = PY_CLASS
        .captures_iter(&code[..position])
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
        .filter(|name| !HELPER_TYPES.contains(&name.as_str()))
        .last();
    Receiver::Class(enclosing.unwrap_or_else(|| "Solution".to_string()))
}

/// Nesting depth of `{` at `position`, ignoring braces inside string and
/// char literals
fn brace_depth(code: &str, position: usize, language: Language) -> usize {
    // Rust lifetimes would open a char literal that never closes
    let char_quotes = language != Language::Rust;
    let mut depth: usize = 0;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for c in code[..position.min(code.len())].chars() {
        if let Some(q) = quote {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                _ if c == q => quote = None,
                _ => {}
            }
            continue;
        }
        match c {
            '"' | '`' => quote = Some(c),
            '\'' if char_quotes => quote = Some(c),
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    depth
}

/// Remove comments so commented-out code never counts as a declaration.
/// String literals are kept intact.
pub fn strip_comments(source: &str, language: Language) -> String {
    let mut out = String::with_capacity(source.len());
    let mut chars = source.chars().peekable();
    let mut quote: Option<char> = None;
    let hash_comments = language == Language::Python;

    while let Some(c) = chars.next() {
        if let Some(q) = quote {
            out.push(c);
            if c == '\\' {
                if let Some(next) = chars.next() {
                    out.push(next);
                }
            } else if c == q || c == '\n' {
                quote = None;
            }
            continue;
        }

        match c {
            '"' | '\'' | '`' => {
                // Rust lifetimes look like an opening char literal
                if !(c == '\'' && language == Language::Rust) {
                    quote = Some(c);
                }
                out.push(c);
            }
            '#' if hash_comments => {
                while let Some(&next) = chars.peek() {
                    if next == '\n' {
                        break;
                    }
                    chars.next();
                }
            }
            '/' if !hash_comments && chars.peek() == Some(&'/') => {
                while let Some(&next) = chars.peek() {
                    if next == '\n' {
                        break;
                    }
                    chars.next();
                }
            }
            '/' if !hash_comments && chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for next in chars.by_ref() {
                    if prev == '*' && next == '/' {
                        break;
                    }
                    if next == '\n' {
                        out.push('\n');
                    }
                    prev = next;
                }
            }
            _ => out.push(c),
        }
    }
    out
}

/// `maxSubArray` → `max_sub_array`
pub fn to_snake(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev_lower = false;
    for c in name.chars() {
        if c.is_uppercase() {
            if prev_lower {
                out.push('_');
            }
            out.extend(c.to_lowercase());
            prev_lower = false;
        } else {
            out.push(c);
            prev_lower = c.is_lowercase() || c.is_ascii_digit();
        }
    }
    out
}

/// `two_sum` → `twoSum`; camelCase input is returned unchanged
pub fn to_camel(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper_next = false;
    for c in name.chars() {
        if c == '_' && !out.is_empty() {
            upper_next = true;
        } else if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn found(ident: &str, receiver: Receiver) -> Resolution {
        Resolution::Found(ResolvedEntry {
            ident: ident.to_string(),
            receiver,
        })
    }

    #[test]
    fn test_case_conversions() {
        assert_eq!(to_snake("maxSubArray"), "max_sub_array");
        assert_eq!(to_snake("twoSum"), "two_sum");
        assert_eq!(to_snake("already_snake"), "already_snake");
        assert_eq!(to_camel("two_sum"), "twoSum");
        assert_eq!(to_camel("twoSum"), "twoSum");
    }

    #[test]
    fn test_candidates_per_language() {
        let entry = EntryPoint::new("maxSubArray", ArgShape::Plain);
        assert_eq!(entry.candidates(Language::JavaScript), vec!["maxSubArray"]);
        assert_eq!(
            entry.candidates(Language::Python),
            vec!["max_sub_array", "maxSubArray"]
        );

        let pinned = entry.with_alias(Language::Rust, "max_subarray");
        assert_eq!(
            pinned.candidates(Language::Rust),
            vec!["max_subarray", "max_sub_array", "maxSubArray"]
        );
    }

    #[test]
    fn test_infer_known_shapes() {
        assert_eq!(EntryPoint::infer("reverseList").shape, ArgShape::LinkedList);
        assert_eq!(EntryPoint::infer("has_cycle").shape, ArgShape::CyclicList);
        assert_eq!(EntryPoint::infer("inorderTraversal").shape, ArgShape::BinaryTree);
        assert_eq!(EntryPoint::infer("twoSum").shape, ArgShape::Plain);
    }

    #[test]
    fn test_javascript_free_function_and_arrow() {
        let entry = EntryPoint::new("twoSum", ArgShape::Plain);
        let src = "function twoSum(nums, target) {\n  return [0, 1];\n}";
        assert_eq!(resolve(src, Language::JavaScript, &entry), found("twoSum", Receiver::Free));

        let src = "const twoSum = (nums, target) => [0, 1];";
        assert_eq!(resolve(src, Language::JavaScript, &entry), found("twoSum", Receiver::Free));
    }

    #[test]
    fn test_javascript_class_method() {
        let entry = EntryPoint::new("isValid", ArgShape::Plain);
        let src = "class Solution {\n  isValid(s) {\n    return true;\n  }\n}";
        assert_eq!(
            resolve(src, Language::JavaScript, &entry),
            found("isValid", Receiver::Class("Solution".to_string()))
        );
    }

    #[test]
    fn test_wrong_function_is_not_found() {
        let entry = EntryPoint::new("twoSum", ArgShape::Plain);
        let src = "function maxSubArray(nums) { return 6; }";
        assert_eq!(
            resolve(src, Language::JavaScript, &entry),
            Resolution::NotFound { tried: vec!["twoSum".to_string()] }
        );
    }

    #[test]
    fn test_commented_out_declaration_is_ignored() {
        let entry = EntryPoint::new("twoSum", ArgShape::Plain);
        let src = "// function twoSum(a, b) {}\n/* function twoSum() {} */\nfunction other() {}";
        assert!(!resolve(src, Language::JavaScript, &entry).is_found());

        let src = "# def two_sum(nums, target):\ndef other():\n    pass";
        assert!(!resolve(src, Language::Python, &entry).is_found());
    }

    #[test]
    fn test_python_snake_case_and_solution_class() {
        let entry = EntryPoint::new("twoSum", ArgShape::Plain);
        let src = "def two_sum(nums, target):\n    return [0, 1]\n";
        assert_eq!(resolve(src, Language::Python, &entry), found("two_sum", Receiver::Free));

        let src = "class Solution:\n    def twoSum(self, nums, target):\n        return [0, 1]\n";
        assert_eq!(
            resolve(src, Language::Python, &entry),
            found("twoSum", Receiver::Class("Solution".to_string()))
        );
    }

    #[test]
    fn test_cpp_free_function_and_method() {
        let entry = EntryPoint::new("twoSum", ArgShape::Plain);
        let src = "vector<int> twoSum(vector<int>& nums, int target) {\n  return {0, 1};\n}";
        assert_eq!(resolve(src, Language::Cpp, &entry), found("twoSum", Receiver::Free));

        let src = "class Solution {\npublic:\n    vector<int> twoSum(vector<int>& nums, int target) {\n        return {0, 1};\n    }\n};";
        assert_eq!(
            resolve(src, Language::Cpp, &entry),
            found("twoSum", Receiver::Class("Solution".to_string()))
        );
    }

    #[test]
    fn test_cpp_call_is_not_a_declaration() {
        let entry = EntryPoint::new("twoSum", ArgShape::Plain);
        let src = "int main() { auto r = twoSum(v, 9); }";
        assert!(!resolve(src, Language::Cpp, &entry).is_found());
    }

    #[test]
    fn test_java_method_in_class() {
        let entry = EntryPoint::new("maxSubArray", ArgShape::Plain);
        let src = "class Solution {\n    public int maxSubArray(int[] nums) {\n        return 6;\n    }\n}";
        assert_eq!(
            resolve(src, Language::Java, &entry),
            found("maxSubArray", Receiver::Class("Solution".to_string()))
        );

        let src = "public static int maxSubArray(int[] nums) {\n    return 6;\n}";
        assert_eq!(resolve(src, Language::Java, &entry), found("maxSubArray", Receiver::Free));
    }

    #[test]
    fn test_rust_free_fn_and_impl() {
        let entry = EntryPoint::new("twoSum", ArgShape::Plain);
        let src = "fn two_sum(nums: Vec<i32>, target: i32) -> Vec<i32> { vec![0, 1] }";
        assert_eq!(resolve(src, Language::Rust, &entry), found("two_sum", Receiver::Free));

        let src = "impl Solution {\n    pub fn two_sum(nums: Vec<i32>, target: i32) -> Vec<i32> {\n        vec![0, 1]\n    }\n}";
        assert_eq!(
            resolve(src, Language::Rust, &entry),
            found("two_sum", Receiver::Class("Solution".to_string()))
        );
    }

    #[test]
    fn test_helper_types_are_not_receivers() {
        let entry = EntryPoint::new("reverseList", ArgShape::LinkedList);
        let src = "class ListNode {\n  constructor(val) { this.val = val; }\n}\nclass Solver {\n  reverseList(head) {\n    return head;\n  }\n}";
        assert_eq!(
            resolve(src, Language::JavaScript, &entry),
            found("reverseList", Receiver::Class("Solver".to_string()))
        );
    }

    #[test]
    fn test_entry_point_serde() {
        let entry: EntryPoint = serde_json::from_str(
            r#"{"name":"hasCycle","shape":"cyclic_list","aliases":{"rust":"has_cycle"}}"#,
        )
        .unwrap();
        assert_eq!(entry.shape, ArgShape::CyclicList);
        assert_eq!(entry.aliases.get(&Language::Rust).map(String::as_str), Some("has_cycle"));
    }
}
