// Java harness: Main.java drives the user's class in its own file
use super::{not_found_message, quoted, truncate, Escape, HarnessProgram, LanguageAdapter, SourceFile, StaticType};
use crate::error::ExecutionError;
use crate::normalizer::{Argument, Structural};
use crate::resolver::{strip_comments, Receiver, Resolution};
use arbiter_common::types::Language;
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{json, Value};
use std::fmt::Write as _;

lazy_static! {
    static ref USER_LIST_NODE: Regex = Regex::new(r"\bclass\s+ListNode\b").unwrap();
    static ref USER_TREE_NODE: Regex = Regex::new(r"\bclass\s+TreeNode\b").unwrap();
    static ref PUBLIC_CLASS: Regex =
        Regex::new(r"\bpublic\s+(?:final\s+|abstract\s+)*class\s+([A-Za-z_]\w*)").unwrap();
    static ref PACKAGE: Regex = Regex::new(r"(?m)^\s*package\s+[\w.]+\s*;").unwrap();
    static ref TYPE_DECLARATION: Regex =
        Regex::new(r"\b(?:class|interface|enum|record)\s+[A-Za-z_]\w*").unwrap();
}

const LIST_NODE: &str = r#"class ListNode {
    int val;
    ListNode next;
    ListNode() {}
    ListNode(int val) { this.val = val; }
    ListNode(int val, ListNode next) { this.val = val; this.next = next; }
}
"#;

const TREE_NODE: &str = r#"class TreeNode {
    int val;
    TreeNode left;
    TreeNode right;
    TreeNode() {}
    TreeNode(int val) { this.val = val; }
    TreeNode(int val, TreeNode left, TreeNode right) {
        this.val = val;
        this.left = left;
        this.right = right;
    }
}
"#;

const MAIN_HEAD: &str = r#"import java.util.*;

public class Main {
    private static final int MAX_WALK = 1000;

    static ListNode buildList(int[] values, int pos) {
        ListNode dummy = new ListNode(0);
        ListNode tail = dummy;
        ListNode target = null;
        for (int i = 0; i < values.length; i++) {
            tail.next = new ListNode(values[i]);
            tail = tail.next;
            if (i == pos) target = tail;
        }
        if (target != null) tail.next = target;
        return dummy.next;
    }

    static TreeNode buildTree(Integer[] values) {
        if (values.length == 0 || values[0] == null) return null;
        TreeNode root = new TreeNode(values[0]);
        ArrayDeque<TreeNode> queue = new ArrayDeque<>();
        queue.add(root);
        int i = 1;
        while (!queue.isEmpty() && i < values.length) {
            TreeNode node = queue.poll();
            if (i < values.length && values[i] != null) {
                node.left = new TreeNode(values[i]);
                queue.add(node.left);
            }
            i++;
            if (i < values.length && values[i] != null) {
                node.right = new TreeNode(values[i]);
                queue.add(node.right);
            }
            i++;
        }
        return root;
    }

    static String quote(String s) {
        StringBuilder sb = new StringBuilder("\"");
        for (char c : s.toCharArray()) {
            switch (c) {
                case '"': sb.append("\\\""); break;
                case '\\': sb.append("\\\\"); break;
                case '\n': sb.append("\\n"); break;
                case '\r': sb.append("\\r"); break;
                case '\t': sb.append("\\t"); break;
                default:
                    if (c < 0x20) sb.append(String.format("\\u%04x", (int) c));
                    else sb.append(c);
            }
        }
        return sb.append('"').toString();
    }

    static void emitDouble(StringBuilder sb, double d) {
        if (Double.isNaN(d) || Double.isInfinite(d)) sb.append("null");
        else if (d == Math.rint(d) && Math.abs(d) < 1e15) sb.append((long) d);
        else sb.append(d);
    }

    static void emit(StringBuilder sb, Object v) {
        if (v == null) { sb.append("null"); return; }
        if (v instanceof String) { sb.append(quote((String) v)); return; }
        if (v instanceof Character) { sb.append(quote(String.valueOf(v))); return; }
        if (v instanceof Boolean) { sb.append(v); return; }
        if (v instanceof Double || v instanceof Float) { emitDouble(sb, ((Number) v).doubleValue()); return; }
        if (v instanceof Number) { sb.append(v); return; }
        if (v instanceof ListNode) {
            sb.append('[');
            int n = 0;
            for (ListNode node = (ListNode) v; node != null && n < MAX_WALK; node = node.next, n++) {
                if (n > 0) sb.append(',');
                sb.append(node.val);
            }
            sb.append(']');
            return;
        }
        if (v instanceof TreeNode) {
            List<String> parts = new ArrayList<>();
            ArrayDeque<Optional<TreeNode>> queue = new ArrayDeque<>();
            queue.add(Optional.of((TreeNode) v));
            while (!queue.isEmpty() && parts.size() < MAX_WALK) {
                Optional<TreeNode> next = queue.poll();
                if (!next.isPresent()) { parts.add("null"); continue; }
                TreeNode node = next.get();
                parts.add(String.valueOf(node.val));
                queue.add(Optional.ofNullable(node.left));
                queue.add(Optional.ofNullable(node.right));
            }
            while (!parts.isEmpty() && parts.get(parts.size() - 1).equals("null")) parts.remove(parts.size() - 1);
            sb.append('[').append(String.join(",", parts)).append(']');
            return;
        }
        if (v instanceof int[]) { int[] a = (int[]) v; sb.append('['); for (int i = 0; i < a.length; i++) { if (i > 0) sb.append(','); sb.append(a[i]); } sb.append(']'); return; }
        if (v instanceof long[]) { long[] a = (long[]) v; sb.append('['); for (int i = 0; i < a.length; i++) { if (i > 0) sb.append(','); sb.append(a[i]); } sb.append(']'); return; }
        if (v instanceof double[]) { double[] a = (double[]) v; sb.append('['); for (int i = 0; i < a.length; i++) { if (i > 0) sb.append(','); emitDouble(sb, a[i]); } sb.append(']'); return; }
        if (v instanceof boolean[]) { boolean[] a = (boolean[]) v; sb.append('['); for (int i = 0; i < a.length; i++) { if (i > 0) sb.append(','); sb.append(a[i]); } sb.append(']'); return; }
        if (v instanceof char[]) { char[] a = (char[]) v; sb.append('['); for (int i = 0; i < a.length; i++) { if (i > 0) sb.append(','); sb.append(quote(String.valueOf(a[i]))); } sb.append(']'); return; }
        if (v instanceof Object[]) { Object[] a = (Object[]) v; sb.append('['); for (int i = 0; i < a.length; i++) { if (i > 0) sb.append(','); emit(sb, a[i]); } sb.append(']'); return; }
        if (v instanceof Iterable) {
            sb.append('[');
            boolean first = true;
            for (Object x : (Iterable<?>) v) { if (!first) sb.append(','); emit(sb, x); first = false; }
            sb.append(']');
            return;
        }
        if (v instanceof Map) {
            sb.append('{');
            boolean first = true;
            for (Map.Entry<?, ?> e : ((Map<?, ?>) v).entrySet()) {
                if (!first) sb.append(',');
                sb.append(quote(String.valueOf(e.getKey()))).append(':');
                emit(sb, e.getValue());
                first = false;
            }
            sb.append('}');
            return;
        }
        sb.append(quote(v.toString()));
    }

    static void finish(String key, StringBuilder payload) {
        System.out.println();
        System.out.println("{\"" + key + "\":" + payload + "}");
        System.out.flush();
    }

    public static void main(String[] args) {
        try {
"#;

const MAIN_TAIL: &str = r#"        } catch (Throwable t) {
            finish("__error", new StringBuilder(quote(t.toString())));
        }
    }
}
"#;

pub struct JavaAdapter;

impl LanguageAdapter for JavaAdapter {
    fn generate(
        &self,
        source: &str,
        args: &[Argument],
        resolution: &Resolution,
    ) -> Result<HarnessProgram, ExecutionError> {
        let code = strip_comments(source, Language::Java);

        let mut main = String::with_capacity(MAIN_HEAD.len() + 1024);
        main.push_str(MAIN_HEAD);

        // Bare methods need a class to compile, found or not
        let mut wrap_in_class = !TYPE_DECLARATION.is_match(&code);
        match resolution {
            Resolution::NotFound { .. } => {
                let message = not_found_message(resolution).unwrap_or_default();
                let line = json!({ "__error": message }).to_string();
                let _ = writeln!(main, "            System.out.println();");
                let _ = writeln!(main, "            System.out.println({});", quoted(&line, Escape::Octal));
            }
            Resolution::Found(entry) => {
                let mut names = Vec::with_capacity(args.len());
                for (i, arg) in args.iter().enumerate() {
                    let name = format!("arg{}", i);
                    let _ = writeln!(main, "            {};", declare(&name, arg)?);
                    names.push(name);
                }
                let class = match &entry.receiver {
                    Receiver::Free => {
                        wrap_in_class = true;
                        "Solution".to_string()
                    }
                    Receiver::Class(class) => class.clone(),
                };
                let call = format!("new {}().{}({})", class, entry.ident, names.join(", "));
                if returns_void(&code, &entry.ident) {
                    let _ = writeln!(main, "            {};", call);
                    main.push_str("            finish(\"__result\", new StringBuilder(\"null\"));\n");
                } else {
                    let _ = writeln!(main, "            Object answer = {};", call);
                    main.push_str("            StringBuilder payload = new StringBuilder();\n");
                    main.push_str("            emit(payload, answer);\n");
                    main.push_str("            finish(\"__result\", payload);\n");
                }
            }
        }
        main.push_str(MAIN_TAIL);

        let mut user = String::with_capacity(source.len() + 64);
        if !PACKAGE.is_match(&code) {
            user.push_str("import java.util.*;\n");
        }
        if wrap_in_class {
            user.push_str("class Solution {\n");
            user.push_str(source);
            user.push_str("\n}\n");
        } else {
            user.push_str(source);
            user.push('\n');
        }
        let user_file = PUBLIC_CLASS
            .captures(&code)
            .map(|caps| format!("{}.java", &caps[1]))
            .unwrap_or_else(|| "Solution.java".to_string());

        let mut files = vec![
            SourceFile::new("Main.java", main),
            SourceFile::new(user_file, user),
        ];

        let mut structures = String::new();
        if !USER_LIST_NODE.is_match(&code) {
            structures.push_str(LIST_NODE);
        }
        if !USER_TREE_NODE.is_match(&code) {
            structures.push_str(TREE_NODE);
        }
        if !structures.is_empty() {
            files.push(SourceFile::new("Structures.java", structures));
        }

        Ok(HarnessProgram {
            language: Language::Java,
            files,
        })
    }
}

/// `void` methods cannot be bound to a value; they report null instead
fn returns_void(code: &str, ident: &str) -> bool {
    Regex::new(&format!(r"\bvoid\s+{}\s*\(", regex::escape(ident)))
        .map(|re| re.is_match(code))
        .unwrap_or(false)
}

fn declare(name: &str, arg: &Argument) -> Result<String, ExecutionError> {
    match arg {
        Argument::Structural(Structural::List(values)) => Ok(format!(
            "ListNode {} = buildList({}, -1)",
            name,
            int_array(values)
        )),
        Argument::Structural(Structural::CyclicList { values, position }) => Ok(format!(
            "ListNode {} = buildList({}, {})",
            name,
            int_array(values),
            position
        )),
        Argument::Structural(Structural::Tree(values)) => {
            let items: Vec<String> = values
                .iter()
                .map(|v| v.map(|x| x.to_string()).unwrap_or_else(|| "null".to_string()))
                .collect();
            Ok(format!(
                "TreeNode {} = buildTree(new Integer[]{{{}}})",
                name,
                items.join(", ")
            ))
        }
        other => {
            let value = other.to_json();
            let ty = StaticType::infer(&value);
            if ty == StaticType::Null {
                return Ok(format!("Object {} = null", name));
            }
            let type_name = type_name(&ty).ok_or_else(|| {
                ExecutionError::runtime(format!("Unsupported argument for Java: {}", value))
            })?;
            let init = match &ty {
                StaticType::List(_) => format!("new {}{}", type_name, literal(&value, &ty)),
                _ => literal(&value, &ty),
            };
            Ok(format!("{} {} = {}", type_name, name, init))
        }
    }
}

fn int_array(values: &[i64]) -> String {
    let items: Vec<String> = values.iter().map(|v| v.to_string()).collect();
    format!("new int[]{{{}}}", items.join(", "))
}

fn type_name(ty: &StaticType) -> Option<String> {
    Some(match ty {
        StaticType::Int => "int".to_string(),
        StaticType::Long => "long".to_string(),
        StaticType::Bool => "boolean".to_string(),
        StaticType::Str => "String".to_string(),
        StaticType::List(inner) => format!("{}[]", type_name(inner)?),
        StaticType::Nullable(inner) => match inner.as_ref() {
            StaticType::Int => "Integer".to_string(),
            StaticType::Long => "Long".to_string(),
            StaticType::Bool => "Boolean".to_string(),
            StaticType::Str => "String".to_string(),
            other => type_name(other)?,
        },
        StaticType::Null | StaticType::Unknown => return None,
    })
}

fn literal(value: &Value, ty: &StaticType) -> String {
    let is_long = |ty: &StaticType| match ty {
        StaticType::Long => true,
        StaticType::Nullable(inner) => **inner == StaticType::Long,
        _ => false,
    };
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) if is_long(ty) => format!("{}L", truncate(n).unwrap_or(0)),
        Value::Number(n) => truncate(n).unwrap_or(0).to_string(),
        Value::String(s) => quoted(s, Escape::Octal),
        Value::Array(items) => {
            let inner = match ty {
                StaticType::List(inner) => inner.as_ref(),
                other => other,
            };
            let parts: Vec<String> = items.iter().map(|v| literal(v, inner)).collect();
            format!("{{{}}}", parts.join(", "))
        }
        Value::Object(_) => "null".to_string(),
    }
}
