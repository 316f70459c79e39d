// CPython harness
use super::{not_found_message, HarnessProgram, LanguageAdapter};
use crate::error::ExecutionError;
use crate::normalizer::{Argument, Structural};
use crate::resolver::{Receiver, Resolution};
use arbiter_common::types::Language;
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use std::fmt::Write as _;

lazy_static! {
    static ref USER_LIST_NODE: Regex = Regex::new(r"(?m)^class\s+ListNode\b").unwrap();
    static ref USER_TREE_NODE: Regex = Regex::new(r"(?m)^class\s+TreeNode\b").unwrap();
}

const HEADER: &str = r#"from typing import *
import bisect
import collections
import functools
import heapq
import itertools
import json
import math
import sys
from collections import Counter, OrderedDict, defaultdict, deque

sys.setrecursionlimit(10000)
"#;

const LIST_NODE: &str = r#"
class ListNode:
    def __init__(self, val=0, next=None):
        self.val = val
        self.next = next
"#;

const TREE_NODE: &str = r#"
class TreeNode:
    def __init__(self, val=0, left=None, right=None):
        self.val = val
        self.left = left
        self.right = right
"#;

const HELPERS: &str = r#"

__JUDGE_MAX_WALK = 1000


def __judge_array_to_list(values):
    dummy = ListNode(0)
    tail = dummy
    for v in values:
        tail.next = ListNode(v)
        tail = tail.next
    return dummy.next


def __judge_list_with_cycle(values, pos):
    head = __judge_array_to_list(values)
    if head is None or pos < 0:
        return head
    node, tail, target, i = head, None, None, 0
    while node is not None:
        if i == pos:
            target = node
        tail = node
        node = node.next
        i += 1
    tail.next = target
    return head


def __judge_array_to_tree(values):
    if not values or values[0] is None:
        return None
    root = TreeNode(values[0])
    queue = collections.deque([root])
    i = 1
    while queue and i < len(values):
        node = queue.popleft()
        if i < len(values) and values[i] is not None:
            node.left = TreeNode(values[i])
            queue.append(node.left)
        i += 1
        if i < len(values) and values[i] is not None:
            node.right = TreeNode(values[i])
            queue.append(node.right)
        i += 1
    return root


def __judge_plain(v):
    if v is None or isinstance(v, (bool, int, float, str)):
        return v
    if hasattr(v, "val") and hasattr(v, "next"):
        out = []
        node = v
        while node is not None and len(out) < __JUDGE_MAX_WALK:
            out.append(__judge_plain(node.val))
            node = node.next
        return out
    if hasattr(v, "val") and (hasattr(v, "left") or hasattr(v, "right")):
        out = []
        queue = collections.deque([v])
        while queue and len(out) < __JUDGE_MAX_WALK:
            node = queue.popleft()
            if node is None:
                out.append(None)
                continue
            out.append(__judge_plain(node.val))
            queue.append(getattr(node, "left", None))
            queue.append(getattr(node, "right", None))
        while out and out[-1] is None:
            out.pop()
        return out
    if isinstance(v, dict):
        return {str(k): __judge_plain(x) for k, x in v.items()}
    if isinstance(v, (list, tuple, set, frozenset, collections.deque)):
        return [__judge_plain(x) for x in v]
    return str(v)


def __judge_emit(payload):
    sys.stdout.write("\n" + json.dumps(payload, separators=(",", ":")) + "\n")
    sys.stdout.flush()
"#;

pub struct PythonAdapter;

impl LanguageAdapter for PythonAdapter {
    fn generate(
        &self,
        source: &str,
        args: &[Argument],
        resolution: &Resolution,
    ) -> Result<HarnessProgram, ExecutionError> {
        let mut out = String::with_capacity(HEADER.len() + HELPERS.len() + source.len() + 512);
        out.push_str(HEADER);
        if !USER_LIST_NODE.is_match(source) {
            out.push_str(LIST_NODE);
        }
        if !USER_TREE_NODE.is_match(source) {
            out.push_str(TREE_NODE);
        }
        out.push('\n');
        out.push_str(source);
        out.push('\n');
        out.push_str(HELPERS);

        let raw: Vec<Value> = args.iter().map(Argument::to_json).collect();
        let payload = Value::Array(raw).to_string();
        let _ = writeln!(out, "\n__JUDGE_ARGS = {}\n", python_string(&payload));

        out.push_str("\ndef __judge_build_args():\n");
        out.push_str("    raw = json.loads(__JUDGE_ARGS)\n");
        let built: Vec<String> = args
            .iter()
            .enumerate()
            .map(|(i, arg)| build_expression(i, arg))
            .collect();
        let _ = writeln!(out, "    return [{}]\n", built.join(", "));

        out.push_str("\ndef __judge_main():\n");
        out.push_str("    try:\n");
        match resolution {
            Resolution::NotFound { .. } => {
                let message = not_found_message(resolution).unwrap_or_default();
                let _ = writeln!(out, "        raise NameError({})", python_string(&message));
            }
            Resolution::Found(entry) => {
                let lookup = match &entry.receiver {
                    Receiver::Free => format!("globals().get({})", python_string(&entry.ident)),
                    Receiver::Class(class) => {
                        format!("getattr({}(), {}, None)", class, python_string(&entry.ident))
                    }
                };
                let _ = writeln!(out, "        fn = {}", lookup);
                out.push_str("        if not callable(fn):\n");
                let _ = writeln!(
                    out,
                    "            raise NameError({})",
                    python_string(&format!("Function not found: {}", entry.ident))
                );
                out.push_str("        result = fn(*__judge_build_args())\n");
                out.push_str("        __judge_emit({\"__result\": __judge_plain(result)})\n");
            }
        }
        out.push_str("    except Exception as e:\n");
        out.push_str("        __judge_emit({\"__error\": str(e) or type(e).__name__})\n");
        out.push_str("\n\n__judge_main()\n");

        Ok(HarnessProgram::single(Language::Python, "main.py", out))
    }
}

/// A JSON string literal is also a valid Python string literal
fn python_string(text: &str) -> String {
    Value::String(text.to_string()).to_string()
}

fn build_expression(index: usize, arg: &Argument) -> String {
    match arg {
        Argument::Structural(Structural::List(_)) => format!("__judge_array_to_list(raw[{}])", index),
        Argument::Structural(Structural::CyclicList { position, .. }) => {
            format!("__judge_list_with_cycle(raw[{}], {})", index, position)
        }
        Argument::Structural(Structural::Tree(_)) => format!("__judge_array_to_tree(raw[{}])", index),
        _ => format!("raw[{}]", index),
    }
}
