// Node.js harness: async IIFE around the user code with a CommonJS shim
use super::{not_found_message, HarnessProgram, LanguageAdapter};
use crate::error::ExecutionError;
use crate::normalizer::{Argument, Structural};
use crate::resolver::{Receiver, Resolution};
use arbiter_common::types::Language;
use std::fmt::Write as _;

const PRELUDE: &str = r##"function ListNode(val, next) {
  this.val = val === undefined ? 0 : val;
  this.next = next === undefined ? null : next;
}
function TreeNode(val, left, right) {
  this.val = val === undefined ? 0 : val;
  this.left = left === undefined ? null : left;
  this.right = right === undefined ? null : right;
}
const __MAX_WALK = 1000;
function __arrayToList(values) {
  const dummy = new ListNode(0);
  let tail = dummy;
  for (const v of values) { tail.next = new ListNode(v); tail = tail.next; }
  return dummy.next;
}
function __listWithCycle(values, pos) {
  const head = __arrayToList(values);
  if (head === null || pos < 0) return head;
  let tail = head, target = null, i = 0;
  for (let node = head; node !== null; node = node.next, i++) {
    if (i === pos) target = node;
    tail = node;
  }
  tail.next = target;
  return head;
}
function __arrayToTree(values) {
  if (!values.length || values[0] === null) return null;
  const root = new TreeNode(values[0]);
  const queue = [root];
  let i = 1;
  while (queue.length && i < values.length) {
    const node = queue.shift();
    if (i < values.length && values[i] !== null) { node.left = new TreeNode(values[i]); queue.push(node.left); }
    i++;
    if (i < values.length && values[i] !== null) { node.right = new TreeNode(values[i]); queue.push(node.right); }
    i++;
  }
  return root;
}
function __isList(v) { return v !== null && typeof v === 'object' && 'val' in v && 'next' in v; }
function __isTree(v) { return v !== null && typeof v === 'object' && 'val' in v && ('left' in v || 'right' in v); }
function __toPlain(v) {
  if (v === undefined || v === null) return null;
  if (typeof v === 'bigint') return Number(v);
  if (__isList(v)) {
    const out = [];
    for (let node = v; node !== null && node !== undefined && out.length < __MAX_WALK; node = node.next) out.push(__toPlain(node.val));
    return out;
  }
  if (__isTree(v)) {
    const out = [];
    const queue = [v];
    while (queue.length && out.length < __MAX_WALK) {
      const node = queue.shift();
      if (node === null || node === undefined) { out.push(null); continue; }
      out.push(__toPlain(node.val));
      queue.push(node.left === undefined ? null : node.left, node.right === undefined ? null : node.right);
    }
    while (out.length && out[out.length - 1] === null) out.pop();
    return out;
  }
  if (v instanceof Set) return Array.from(v, __toPlain);
  if (v instanceof Map) return Object.fromEntries(Array.from(v, ([k, x]) => [k, __toPlain(x)]));
  if (Array.isArray(v) || ArrayBuffer.isView(v)) return Array.from(v, __toPlain);
  return v;
}
function __emit(payload) {
  process.stdout.write('\n' + JSON.stringify(payload) + '\n');
}
"##;

pub struct JavaScriptAdapter;

impl LanguageAdapter for JavaScriptAdapter {
    fn generate(
        &self,
        source: &str,
        args: &[Argument],
        resolution: &Resolution,
    ) -> Result<HarnessProgram, ExecutionError> {
        let mut out = String::with_capacity(PRELUDE.len() + source.len() + 512);
        out.push_str(PRELUDE);
        out.push_str("(async () => {\n");
        out.push_str("  const module = { exports: {} };\n");
        out.push_str("  const exports = module.exports;\n");
        out.push_str("  try {\n");
        out.push_str(source);
        out.push_str("\n;\n");

        match resolution {
            Resolution::NotFound { .. } => {
                let message = not_found_message(resolution).unwrap_or_default();
                let _ = writeln!(out, "    throw new Error({});", js_string(&message));
            }
            Resolution::Found(entry) => {
                let lookup = match &entry.receiver {
                    Receiver::Free => format!(
                        "(typeof {id} === 'function' ? {id} : typeof module.exports.{id} === 'function' ? module.exports.{id} : typeof module.exports === 'function' ? module.exports : undefined)",
                        id = entry.ident
                    ),
                    Receiver::Class(class) => format!(
                        "(() => {{ const __inst = new {class}(); return __inst.{id}.bind(__inst); }})()",
                        class = class,
                        id = entry.ident
                    ),
                };
                let _ = writeln!(out, "    const __fn = {};", lookup);
                let _ = writeln!(
                    out,
                    "    if (typeof __fn !== 'function') throw new Error({});",
                    js_string(&format!("Function not found: {}", entry.ident))
                );
                let rendered: Vec<String> = args.iter().map(render_argument).collect();
                let _ = writeln!(out, "    const __args = [{}];", rendered.join(", "));
                out.push_str("    let __value = __fn(...__args);\n");
                out.push_str(
                    "    if (__value && typeof __value.then === 'function') __value = await __value;\n",
                );
                out.push_str("    __emit({ __result: __toPlain(__value) });\n");
            }
        }

        out.push_str("  } catch (e) {\n");
        out.push_str(
            "    __emit({ __error: String(e && e.message !== undefined ? e.message : e) });\n",
        );
        out.push_str("  }\n");
        out.push_str("})();\n");

        Ok(HarnessProgram::single(Language::JavaScript, "main.js", out))
    }
}

fn js_string(text: &str) -> String {
    serde_json::Value::String(text.to_string()).to_string()
}

/// JSON is valid JavaScript expression syntax
fn render_argument(arg: &Argument) -> String {
    match arg {
        Argument::Structural(Structural::List(_)) => format!("__arrayToList({})", arg.to_json()),
        Argument::Structural(Structural::CyclicList { position, .. }) => {
            format!("__listWithCycle({}, {})", arg.to_json(), position)
        }
        Argument::Structural(Structural::Tree(_)) => format!("__arrayToTree({})", arg.to_json()),
        other => other.to_json().to_string(),
    }
}
