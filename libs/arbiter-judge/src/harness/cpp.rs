// C++17 harness
use super::{not_found_message, quoted, truncate, Escape, HarnessProgram, LanguageAdapter, StaticType};
use crate::error::ExecutionError;
use crate::normalizer::{Argument, Structural};
use crate::resolver::{strip_comments, Receiver, Resolution};
use arbiter_common::types::Language;
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{json, Value};
use std::fmt::Write as _;

lazy_static! {
    static ref USER_LIST_NODE: Regex = Regex::new(r"\b(?:struct|class)\s+ListNode\s*\{").unwrap();
    static ref USER_TREE_NODE: Regex = Regex::new(r"\b(?:struct|class)\s+TreeNode\s*\{").unwrap();
}

const HEADER: &str = "#include <bits/stdc++.h>\nusing namespace std;\n";

const LIST_NODE: &str = r#"
struct ListNode {
    int val;
    ListNode *next;
    ListNode() : val(0), next(nullptr) {}
    ListNode(int x) : val(x), next(nullptr) {}
    ListNode(int x, ListNode *next) : val(x), next(next) {}
};
"#;

const TREE_NODE: &str = r#"
struct TreeNode {
    int val;
    TreeNode *left;
    TreeNode *right;
    TreeNode() : val(0), left(nullptr), right(nullptr) {}
    TreeNode(int x) : val(x), left(nullptr), right(nullptr) {}
    TreeNode(int x, TreeNode *left, TreeNode *right) : val(x), left(left), right(right) {}
};
"#;

const HELPERS: &str = r#"
static const size_t __JUDGE_MAX_WALK = 1000;

static ListNode* __judge_build_list(const vector<int>& values, int pos) {
    ListNode dummy;
    ListNode* tail = &dummy;
    ListNode* target = nullptr;
    for (size_t i = 0; i < values.size(); ++i) {
        tail->next = new ListNode(values[i]);
        tail = tail->next;
        if ((int)i == pos) target = tail;
    }
    if (target != nullptr) tail->next = target;
    return dummy.next;
}

static TreeNode* __judge_build_tree(const vector<optional<int>>& values) {
    if (values.empty() || !values[0].has_value()) return nullptr;
    TreeNode* root = new TreeNode(*values[0]);
    deque<TreeNode*> queue{root};
    size_t i = 1;
    while (!queue.empty() && i < values.size()) {
        TreeNode* node = queue.front();
        queue.pop_front();
        if (i < values.size() && values[i].has_value()) {
            node->left = new TreeNode(*values[i]);
            queue.push_back(node->left);
        }
        ++i;
        if (i < values.size() && values[i].has_value()) {
            node->right = new TreeNode(*values[i]);
            queue.push_back(node->right);
        }
        ++i;
    }
    return root;
}

static void __judge_emit(ostream& os, const string& s) {
    os << '"';
    for (unsigned char c : s) {
        switch (c) {
            case '"': os << "\\\""; break;
            case '\\': os << "\\\\"; break;
            case '\n': os << "\\n"; break;
            case '\r': os << "\\r"; break;
            case '\t': os << "\\t"; break;
            default:
                if (c < 0x20) {
                    char buf[8];
                    snprintf(buf, sizeof(buf), "\\u%04x", c);
                    os << buf;
                } else {
                    os << c;
                }
        }
    }
    os << '"';
}
static void __judge_emit(ostream& os, const char* s) { __judge_emit(os, string(s)); }
static void __judge_emit(ostream& os, char c) { __judge_emit(os, string(1, c)); }
static void __judge_emit(ostream& os, bool b) { os << (b ? "true" : "false"); }
static void __judge_emit(ostream& os, int v) { os << v; }
static void __judge_emit(ostream& os, long v) { os << v; }
static void __judge_emit(ostream& os, long long v) { os << v; }
static void __judge_emit(ostream& os, unsigned v) { os << v; }
static void __judge_emit(ostream& os, unsigned long v) { os << v; }
static void __judge_emit(ostream& os, unsigned long long v) { os << v; }
static void __judge_emit(ostream& os, double v) {
    if (!isfinite(v)) { os << "null"; return; }
    ostringstream tmp;
    tmp << setprecision(15) << v;
    os << tmp.str();
}
static void __judge_emit(ostream& os, float v) { __judge_emit(os, (double)v); }
static void __judge_emit(ostream& os, ListNode* head) {
    os << '[';
    size_t n = 0;
    for (ListNode* node = head; node != nullptr && n < __JUDGE_MAX_WALK; node = node->next, ++n) {
        if (n) os << ',';
        os << node->val;
    }
    os << ']';
}
static void __judge_emit(ostream& os, TreeNode* root) {
    vector<string> parts;
    deque<TreeNode*> queue{root};
    while (root != nullptr && !queue.empty() && parts.size() < __JUDGE_MAX_WALK) {
        TreeNode* node = queue.front();
        queue.pop_front();
        if (node == nullptr) { parts.push_back("null"); continue; }
        parts.push_back(to_string(node->val));
        queue.push_back(node->left);
        queue.push_back(node->right);
    }
    while (!parts.empty() && parts.back() == "null") parts.pop_back();
    os << '[';
    for (size_t i = 0; i < parts.size(); ++i) {
        if (i) os << ',';
        os << parts[i];
    }
    os << ']';
}
template <class T> static void __judge_emit(ostream& os, const optional<T>& v);
template <class A, class B> static void __judge_emit(ostream& os, const pair<A, B>& p);
template <class T> static void __judge_emit(ostream& os, const vector<T>& v);
template <class T> static void __judge_emit(ostream& os, const optional<T>& v) {
    if (v.has_value()) __judge_emit(os, *v); else os << "null";
}
template <class A, class B> static void __judge_emit(ostream& os, const pair<A, B>& p) {
    os << '[';
    __judge_emit(os, p.first);
    os << ',';
    __judge_emit(os, p.second);
    os << ']';
}
template <class T> static void __judge_emit(ostream& os, const vector<T>& v) {
    os << '[';
    for (size_t i = 0; i < v.size(); ++i) {
        if (i) os << ',';
        __judge_emit(os, (T)v[i]);
    }
    os << ']';
}

// `void` entry points report null like the dynamic languages do
template <class F> static void __judge_report(F&& call) {
    ostringstream __judge_out;
    if constexpr (is_void_v<invoke_result_t<F&>>) {
        call();
        __judge_out << "null";
    } else {
        auto __judge_answer = call();
        __judge_emit(__judge_out, __judge_answer);
    }
    cout << "\n{\"__result\":" << __judge_out.str() << "}" << endl;
}
"#;

pub struct CppAdapter;

impl LanguageAdapter for CppAdapter {
    fn generate(
        &self,
        source: &str,
        args: &[Argument],
        resolution: &Resolution,
    ) -> Result<HarnessProgram, ExecutionError> {
        let code = strip_comments(source, Language::Cpp);
        let mut out = String::with_capacity(HELPERS.len() + source.len() + 1024);
        out.push_str(HEADER);
        if !USER_LIST_NODE.is_match(&code) {
            out.push_str(LIST_NODE);
        }
        if !USER_TREE_NODE.is_match(&code) {
            out.push_str(TREE_NODE);
        }
        out.push('\n');
        out.push_str(source);
        out.push('\n');
        out.push_str(HELPERS);

        out.push_str("\nint main() {\n");
        match resolution {
            Resolution::NotFound { .. } => {
                let message = not_found_message(resolution).unwrap_or_default();
                let line = json!({ "__error": message }).to_string();
                let _ = writeln!(out, "    cout << \"\\n\" << {} << endl;", quoted(&line, Escape::Octal));
            }
            Resolution::Found(entry) => {
                out.push_str("    try {\n");
                let mut names = Vec::with_capacity(args.len());
                for (i, arg) in args.iter().enumerate() {
                    let name = format!("arg{}", i);
                    let _ = writeln!(out, "        {};", declare(&name, arg)?);
                    names.push(name);
                }
                let call = format!("{}({})", entry.ident, names.join(", "));
                match &entry.receiver {
                    Receiver::Free => {
                        let _ = writeln!(out, "        __judge_report([&]() {{ return {}; }});", call);
                    }
                    Receiver::Class(class) => {
                        let _ = writeln!(out, "        {} __judge_solution;", class);
                        let _ = writeln!(
                            out,
                            "        __judge_report([&]() {{ return __judge_solution.{}; }});",
                            call
                        );
                    }
                }
                out.push_str("    } catch (const exception& e) {\n");
                out.push_str("        cout << \"\\n{\\\"__error\\\":\";\n");
                out.push_str("        __judge_emit(cout, string(e.what()));\n");
                out.push_str("        cout << \"}\" << endl;\n");
                out.push_str("    } catch (...) {\n");
                out.push_str("        cout << \"\\n{\\\"__error\\\":\\\"Runtime Error\\\"}\" << endl;\n");
                out.push_str("    }\n");
            }
        }
        out.push_str("    return 0;\n}\n");

        Ok(HarnessProgram::single(Language::Cpp, "main.cpp", out))
    }
}

/// Local variable declaration for one argument
fn declare(name: &str, arg: &Argument) -> Result<String, ExecutionError> {
    match arg {
        Argument::Structural(Structural::List(values)) => Ok(format!(
            "ListNode* {} = __judge_build_list({}, -1)",
            name,
            int_list(values)
        )),
        Argument::Structural(Structural::CyclicList { values, position }) => Ok(format!(
            "ListNode* {} = __judge_build_list({}, {})",
            name,
            int_list(values),
            position
        )),
        Argument::Structural(Structural::Tree(values)) => {
            let items: Vec<String> = values
                .iter()
                .map(|v| v.map(|x| x.to_string()).unwrap_or_else(|| "nullopt".to_string()))
                .collect();
            Ok(format!(
                "TreeNode* {} = __judge_build_tree(vector<optional<int>>{{{}}})",
                name,
                items.join(", ")
            ))
        }
        other => {
            let value = other.to_json();
            let ty = StaticType::infer(&value);
            if ty == StaticType::Null {
                return Ok(format!("nullptr_t {} = nullptr", name));
            }
            let type_name = type_name(&ty).ok_or_else(|| unsupported(&value))?;
            Ok(format!("{} {} = {}", type_name, name, literal(&value, &ty)))
        }
    }
}

fn unsupported(value: &Value) -> ExecutionError {
    ExecutionError::runtime(format!("Unsupported argument for C++: {}", value))
}

fn int_list(values: &[i64]) -> String {
    let items: Vec<String> = values.iter().map(|v| v.to_string()).collect();
    format!("vector<int>{{{}}}", items.join(", "))
}

fn type_name(ty: &StaticType) -> Option<String> {
    Some(match ty {
        StaticType::Int => "int".to_string(),
        StaticType::Long => "long long".to_string(),
        StaticType::Bool => "bool".to_string(),
        StaticType::Str => "string".to_string(),
        StaticType::List(inner) => format!("vector<{}>", type_name(inner)?),
        StaticType::Nullable(inner) => format!("optional<{}>", type_name(inner)?),
        StaticType::Null | StaticType::Unknown => return None,
    })
}

fn literal(value: &Value, ty: &StaticType) -> String {
    match (value, ty) {
        (Value::Null, _) => "nullopt".to_string(),
        (Value::Bool(b), _) => b.to_string(),
        (Value::Number(n), StaticType::Long) => format!("{}LL", truncate(n).unwrap_or(0)),
        (Value::Number(n), StaticType::Nullable(inner)) if **inner == StaticType::Long => {
            format!("{}LL", truncate(n).unwrap_or(0))
        }
        (Value::Number(n), _) => truncate(n).unwrap_or(0).to_string(),
        (Value::String(s), _) => quoted(s, Escape::Octal),
        (Value::Array(items), StaticType::List(inner)) => {
            let parts: Vec<String> = items.iter().map(|v| literal(v, inner)).collect();
            format!("{{{}}}", parts.join(", "))
        }
        _ => "{}".to_string(),
    }
}
