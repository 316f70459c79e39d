// Rust harness: user code plus a `JudgeJson` serializer and a panic-catching main
use super::{not_found_message, quoted, truncate, Escape, HarnessProgram, LanguageAdapter, StaticType};
use crate::error::ExecutionError;
use crate::normalizer::{Argument, Structural};
use crate::resolver::{strip_comments, Receiver, Resolution};
use arbiter_common::types::Language;
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{json, Value};

lazy_static! {
    static ref USER_LIST_NODE: Regex = Regex::new(r"\bstruct\s+ListNode\b").unwrap();
    static ref USER_TREE_NODE: Regex = Regex::new(r"\bstruct\s+TreeNode\b").unwrap();
    static ref USER_SOLUTION: Regex = Regex::new(r"\bstruct\s+Solution\b").unwrap();
    static ref IMPL_SOLUTION: Regex = Regex::new(r"\bimpl\s+Solution\b").unwrap();
}

const CALL_PLACEHOLDER: &str = "__JUDGE_CALL__";

const HEADER: &str = "#![allow(dead_code, unused_imports, unused_variables, unused_mut, non_snake_case)]\nuse std::collections::*;\n";

const LIST_NODE: &str = r#"
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct ListNode {
    pub val: i32,
    pub next: Option<Box<ListNode>>,
}

impl ListNode {
    #[inline]
    pub fn new(val: i32) -> Self {
        ListNode { next: None, val }
    }
}
"#;

const TREE_NODE: &str = r#"
#[derive(Debug, PartialEq, Eq)]
pub struct TreeNode {
    pub val: i32,
    pub left: Option<std::rc::Rc<std::cell::RefCell<TreeNode>>>,
    pub right: Option<std::rc::Rc<std::cell::RefCell<TreeNode>>>,
}

impl TreeNode {
    #[inline]
    pub fn new(val: i32) -> Self {
        TreeNode { val, left: None, right: None }
    }
}
"#;

const SOLUTION: &str = "\npub struct Solution;\n";

const HELPERS: &str = r#"

const __JUDGE_MAX_WALK: usize = 1000;

fn __judge_build_list(values: &[i32]) -> Option<Box<ListNode>> {
    let mut head: Option<Box<ListNode>> = None;
    for &val in values.iter().rev() {
        head = Some(Box::new(ListNode { val, next: head }));
    }
    head
}

fn __judge_build_tree(values: &[Option<i32>]) -> Option<std::rc::Rc<std::cell::RefCell<TreeNode>>> {
    use std::cell::RefCell;
    use std::rc::Rc;
    let first = match values.first() {
        Some(Some(v)) => *v,
        _ => return None,
    };
    let root = Rc::new(RefCell::new(TreeNode { val: first, left: None, right: None }));
    let mut queue = std::collections::VecDeque::new();
    queue.push_back(Rc::clone(&root));
    let mut i = 1;
    while i < values.len() {
        let node = match queue.pop_front() {
            Some(node) => node,
            None => break,
        };
        if let Some(Some(v)) = values.get(i) {
            let child = Rc::new(RefCell::new(TreeNode { val: *v, left: None, right: None }));
            node.borrow_mut().left = Some(Rc::clone(&child));
            queue.push_back(child);
        }
        i += 1;
        if let Some(Some(v)) = values.get(i) {
            let child = Rc::new(RefCell::new(TreeNode { val: *v, left: None, right: None }));
            node.borrow_mut().right = Some(Rc::clone(&child));
            queue.push_back(child);
        }
        i += 1;
    }
    Some(root)
}

fn __judge_quote(s: &str, out: &mut String) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
}

trait JudgeJson {
    fn judge_json(&self, out: &mut String);
}

macro_rules! __judge_json_display {
    ($($t:ty),*) => {
        $(impl JudgeJson for $t {
            fn judge_json(&self, out: &mut String) {
                out.push_str(&self.to_string());
            }
        })*
    };
}

__judge_json_display!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, bool);

impl JudgeJson for f64 {
    fn judge_json(&self, out: &mut String) {
        if !self.is_finite() {
            out.push_str("null");
        } else if self.fract() == 0.0 && self.abs() < 1e15 {
            out.push_str(&(*self as i64).to_string());
        } else {
            out.push_str(&self.to_string());
        }
    }
}

impl JudgeJson for f32 {
    fn judge_json(&self, out: &mut String) {
        (*self as f64).judge_json(out)
    }
}

impl JudgeJson for char {
    fn judge_json(&self, out: &mut String) {
        __judge_quote(&self.to_string(), out)
    }
}

impl JudgeJson for str {
    fn judge_json(&self, out: &mut String) {
        __judge_quote(self, out)
    }
}

impl JudgeJson for String {
    fn judge_json(&self, out: &mut String) {
        __judge_quote(self, out)
    }
}

impl JudgeJson for () {
    fn judge_json(&self, out: &mut String) {
        out.push_str("null")
    }
}

impl<T: JudgeJson + ?Sized> JudgeJson for &T {
    fn judge_json(&self, out: &mut String) {
        (**self).judge_json(out)
    }
}

impl<T: JudgeJson> JudgeJson for [T] {
    fn judge_json(&self, out: &mut String) {
        out.push('[');
        for (i, item) in self.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            item.judge_json(out);
        }
        out.push(']');
    }
}

impl<T: JudgeJson, const N: usize> JudgeJson for [T; N] {
    fn judge_json(&self, out: &mut String) {
        self[..].judge_json(out)
    }
}

impl<T: JudgeJson> JudgeJson for Vec<T> {
    fn judge_json(&self, out: &mut String) {
        self[..].judge_json(out)
    }
}

impl<T: JudgeJson> JudgeJson for VecDeque<T> {
    fn judge_json(&self, out: &mut String) {
        let items: Vec<&T> = self.iter().collect();
        items.judge_json(out)
    }
}

impl<T: JudgeJson> JudgeJson for Option<T> {
    fn judge_json(&self, out: &mut String) {
        match self {
            Some(v) => v.judge_json(out),
            None => out.push_str("null"),
        }
    }
}

impl<A: JudgeJson, B: JudgeJson> JudgeJson for (A, B) {
    fn judge_json(&self, out: &mut String) {
        out.push('[');
        self.0.judge_json(out);
        out.push(',');
        self.1.judge_json(out);
        out.push(']');
    }
}

impl<A: JudgeJson, B: JudgeJson, C: JudgeJson> JudgeJson for (A, B, C) {
    fn judge_json(&self, out: &mut String) {
        out.push('[');
        self.0.judge_json(out);
        out.push(',');
        self.1.judge_json(out);
        out.push(',');
        self.2.judge_json(out);
        out.push(']');
    }
}

impl JudgeJson for Box<ListNode> {
    fn judge_json(&self, out: &mut String) {
        out.push('[');
        let mut node: Option<&ListNode> = Some(self.as_ref());
        let mut n = 0;
        while let Some(current) = node {
            if n >= __JUDGE_MAX_WALK {
                break;
            }
            if n > 0 {
                out.push(',');
            }
            out.push_str(&current.val.to_string());
            node = current.next.as_deref();
            n += 1;
        }
        out.push(']');
    }
}

impl JudgeJson for std::rc::Rc<std::cell::RefCell<TreeNode>> {
    fn judge_json(&self, out: &mut String) {
        let mut parts: Vec<String> = Vec::new();
        let mut queue = std::collections::VecDeque::new();
        queue.push_back(Some(std::rc::Rc::clone(self)));
        while let Some(entry) = queue.pop_front() {
            if parts.len() >= __JUDGE_MAX_WALK {
                break;
            }
            match entry {
                None => parts.push("null".to_string()),
                Some(node) => {
                    let node = node.borrow();
                    parts.push(node.val.to_string());
                    queue.push_back(node.left.clone());
                    queue.push_back(node.right.clone());
                }
            }
        }
        while parts.last().map(|p| p == "null").unwrap_or(false) {
            parts.pop();
        }
        out.push('[');
        out.push_str(&parts.join(","));
        out.push(']');
    }
}

fn main() {
    std::panic::set_hook(Box::new(|_| {}));
    let outcome = std::panic::catch_unwind(|| {
        let answer = __JUDGE_CALL__;
        let mut out = String::new();
        JudgeJson::judge_json(&answer, &mut out);
        out
    });
    match outcome {
        Ok(json) => println!("\n{{\"__result\":{}}}", json),
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "Runtime Error".to_string());
            let mut out = String::new();
            __judge_quote(&message, &mut out);
            println!("\n{{\"__error\":{}}}", out);
        }
    }
}
"#;

const NOT_FOUND_MAIN: &str = r#"
fn main() {
    println!("\n{}", __JUDGE_LINE__);
}
"#;

pub struct RustAdapter;

impl LanguageAdapter for RustAdapter {
    fn generate(
        &self,
        source: &str,
        args: &[Argument],
        resolution: &Resolution,
    ) -> Result<HarnessProgram, ExecutionError> {
        let code = strip_comments(source, Language::Rust);

        let mut out = String::with_capacity(HELPERS.len() + source.len() + 1024);
        out.push_str(HEADER);
        if !USER_LIST_NODE.is_match(&code) {
            out.push_str(LIST_NODE);
        }
        if !USER_TREE_NODE.is_match(&code) {
            out.push_str(TREE_NODE);
        }
        if IMPL_SOLUTION.is_match(&code) && !USER_SOLUTION.is_match(&code) {
            out.push_str(SOLUTION);
        }

        match resolution {
            Resolution::NotFound { .. } => {
                out.push('\n');
                out.push_str(source);
                out.push('\n');
                let message = not_found_message(resolution).unwrap_or_default();
                let line = json!({ "__error": message }).to_string();
                out.push_str(
                    &NOT_FOUND_MAIN.replace("__JUDGE_LINE__", &quoted(&line, Escape::RustUnicode)),
                );
            }
            Resolution::Found(entry) => {
                out.push('\n');
                out.push_str(source);
                out.push('\n');

                let rendered = args
                    .iter()
                    .map(render_argument)
                    .collect::<Result<Vec<_>, _>>()?;
                let call = match &entry.receiver {
                    Receiver::Free => format!("{}({})", entry.ident, rendered.join(", ")),
                    Receiver::Class(class) => {
                        format!("{}::{}({})", class, entry.ident, rendered.join(", "))
                    }
                };
                out.push_str(&HELPERS.replace(CALL_PLACEHOLDER, &call));
            }
        }

        Ok(HarnessProgram::single(Language::Rust, "main.rs", out))
    }
}

fn render_argument(arg: &Argument) -> Result<String, ExecutionError> {
    match arg {
        Argument::Structural(Structural::List(values)) => {
            Ok(format!("__judge_build_list(&{})", slice_literal(values)))
        }
        Argument::Structural(Structural::CyclicList { values, position }) => {
            if *position >= 0 {
                return Err(ExecutionError::runtime("Cyclic linked lists are not supported in Rust"));
            }
            Ok(format!("__judge_build_list(&{})", slice_literal(values)))
        }
        Argument::Structural(Structural::Tree(values)) => {
            let items: Vec<String> = values
                .iter()
                .map(|v| v.map(|x| format!("Some({})", x)).unwrap_or_else(|| "None".to_string()))
                .collect();
            Ok(format!("__judge_build_tree(&[{}])", items.join(", ")))
        }
        other => {
            let value = other.to_json();
            let ty = StaticType::infer(&value);
            if ty == StaticType::Unknown {
                return Err(ExecutionError::runtime(format!(
                    "Unsupported argument for Rust: {}",
                    value
                )));
            }
            Ok(literal(&value, &ty))
        }
    }
}

fn slice_literal(values: &[i64]) -> String {
    let items: Vec<String> = values.iter().map(|v| v.to_string()).collect();
    format!("[{}]", items.join(", "))
}

fn literal(value: &Value, ty: &StaticType) -> String {
    match (value, ty) {
        (Value::Null, _) => "None".to_string(),
        (Value::Bool(b), StaticType::Nullable(_)) => format!("Some({})", b),
        (Value::Bool(b), _) => b.to_string(),
        (Value::Number(n), StaticType::Nullable(_)) => {
            format!("Some({})", truncate(n).unwrap_or(0))
        }
        (Value::Number(n), _) => truncate(n).unwrap_or(0).to_string(),
        (Value::String(s), StaticType::Nullable(_)) => {
            format!("Some(String::from({}))", quoted(s, Escape::RustUnicode))
        }
        (Value::String(s), _) => format!("String::from({})", quoted(s, Escape::RustUnicode)),
        (Value::Array(items), StaticType::List(inner)) => {
            let parts: Vec<String> = items.iter().map(|v| literal(v, inner)).collect();
            format!("vec![{}]", parts.join(", "))
        }
        (Value::Array(items), _) => {
            let parts: Vec<String> = items
                .iter()
                .map(|v| literal(v, &StaticType::infer(v)))
                .collect();
            format!("vec![{}]", parts.join(", "))
        }
        (Value::Object(_), _) => "Default::default()".to_string(),
    }
}
