/// Input Normalizer - Test Input Strings to Typed Arguments
///
/// **Core Responsibility:**
/// Re-derive argument boundaries from a human-authored input string such as
/// `"[2,7,11,15], 9"` or `"[3,2,0,-4] with cycle at position 1"`.
///
/// **Critical Properties:**
/// - Total: never fails. Unparsable input degrades to a single raw string
///   argument and the result is flagged `degraded`
/// - Knows nothing about languages or execution
/// - Structural reconstruction (lists, trees) is only *marked* here; each
///   harness rebuilds the actual nodes
///
/// **Parsing Order (trimmed input):**
/// 1. `<array> with cycle at position <k>` / `<array> with no cycle`
/// 2. Several top-level comma separated values (`name = ` prefixes allowed)
/// 3. A single bracketed array, `null` entries kept as missing-child markers
/// 4. A quoted string literal
/// 5. A bare numeric literal
/// 6. Any other JSON value, else the raw string

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::fmt;
use std::str::FromStr;

lazy_static! {
    static ref CYCLE_PHRASE: Regex = Regex::new(
        r"(?is)^(\[.*\])\s*,?\s*with\s+(?:no\s+cycle|cycle\s+at\s+position\s+(-?\d+))\s*$"
    )
    .unwrap();
    static ref NAMED_ARG: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*\s*=\s*").unwrap();
}

/// How the harness should rebuild array arguments before the call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArgShape {
    #[default]
    Plain,
    LinkedList,
    BinaryTree,
    CyclicList,
}

impl FromStr for ArgShape {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "plain" => Ok(ArgShape::Plain),
            "linked_list" | "list" => Ok(ArgShape::LinkedList),
            "binary_tree" | "tree" => Ok(ArgShape::BinaryTree),
            "cyclic_list" | "cycle" => Ok(ArgShape::CyclicList),
            other => Err(format!("unknown argument shape '{}'", other)),
        }
    }
}

impl fmt::Display for ArgShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ArgShape::Plain => "plain",
            ArgShape::LinkedList => "linked_list",
            ArgShape::BinaryTree => "binary_tree",
            ArgShape::CyclicList => "cyclic_list",
        };
        f.write_str(name)
    }
}

/// Marker for arguments the harness must turn into node structures
#[derive(Debug, Clone, PartialEq)]
pub enum Structural {
    List(Vec<i64>),
    /// `position` is the index the tail links back to, -1 for none
    CyclicList { values: Vec<i64>, position: i64 },
    /// Level-order values, `None` is a missing child
    Tree(Vec<Option<i64>>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Argument {
    Number(Number),
    Bool(bool),
    Str(String),
    IntArray(Vec<i64>),
    StrArray(Vec<String>),
    Matrix(Vec<Vec<i64>>),
    /// Integer array with `null` holes
    Sparse(Vec<Option<i64>>),
    /// Anything that fits none of the typed forms
    Json(Value),
    Structural(Structural),
}

impl Argument {
    /// Plain JSON form, used by the dynamically typed harnesses and for
    /// literal type inference in the typed ones
    pub fn to_json(&self) -> Value {
        match self {
            Argument::Number(n) => Value::Number(n.clone()),
            Argument::Bool(b) => Value::Bool(*b),
            Argument::Str(s) => Value::String(s.clone()),
            Argument::IntArray(values) => ints(values),
            Argument::StrArray(values) => {
                Value::Array(values.iter().cloned().map(Value::String).collect())
            }
            Argument::Matrix(rows) => Value::Array(rows.iter().map(|row| ints(row)).collect()),
            Argument::Sparse(values) => sparse(values),
            Argument::Json(value) => value.clone(),
            Argument::Structural(Structural::List(values)) => ints(values),
            Argument::Structural(Structural::CyclicList { values, .. }) => ints(values),
            Argument::Structural(Structural::Tree(values)) => sparse(values),
        }
    }
}

fn ints(values: &[i64]) -> Value {
    Value::Array(values.iter().map(|v| Value::from(*v)).collect())
}

fn sparse(values: &[Option<i64>]) -> Value {
    Value::Array(
        values
            .iter()
            .map(|v| v.map(Value::from).unwrap_or(Value::Null))
            .collect(),
    )
}

/// Ordered arguments for one test case
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParsedArguments {
    pub values: Vec<Argument>,
    /// Set when some part of the input fell back to a raw string
    pub degraded: bool,
}

impl ParsedArguments {
    fn new(values: Vec<Argument>) -> Self {
        Self {
            values,
            degraded: false,
        }
    }

    fn raw(input: &str) -> Self {
        Self {
            values: vec![Argument::Str(input.to_string())],
            degraded: true,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Parse a test input string into arguments. Never fails.
pub fn parse(input: &str) -> ParsedArguments {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return ParsedArguments::default();
    }

    if let Some(parsed) = parse_cycle_phrase(trimmed) {
        return parsed;
    }

    let parts = split_top_level(trimmed);
    if parts.len() > 1 {
        let mut parsed = ParsedArguments::default();
        for part in parts {
            let part = strip_name(part);
            match serde_json::from_str::<Value>(part) {
                Ok(value) => parsed.values.push(classify(value)),
                Err(_) => {
                    parsed.values.push(Argument::Str(part.to_string()));
                    parsed.degraded = true;
                }
            }
        }
        return parsed;
    }

    let single = strip_name(trimmed);

    if single.starts_with('[') && single.ends_with(']') {
        if let Ok(value) = serde_json::from_str::<Value>(single) {
            return ParsedArguments::new(vec![classify(value)]);
        }
    }

    if single.len() >= 2 && single.starts_with('"') && single.ends_with('"') {
        let text = serde_json::from_str::<String>(single)
            .unwrap_or_else(|_| single[1..single.len() - 1].to_string());
        return ParsedArguments::new(vec![Argument::Str(text)]);
    }

    if let Ok(number) = single.parse::<Number>() {
        return ParsedArguments::new(vec![Argument::Number(number)]);
    }

    match serde_json::from_str::<Value>(single) {
        Ok(value) => ParsedArguments::new(vec![classify(value)]),
        Err(_) => ParsedArguments::raw(trimmed),
    }
}

fn parse_cycle_phrase(input: &str) -> Option<ParsedArguments> {
    let caps = CYCLE_PHRASE.captures(input)?;
    let values = serde_json::from_str::<Vec<i64>>(&caps[1]).ok()?;
    let position = caps
        .get(2)
        .and_then(|m| m.as_str().parse::<i64>().ok())
        .unwrap_or(-1);
    Some(ParsedArguments::new(vec![
        Argument::IntArray(values),
        Argument::Number(Number::from(position)),
    ]))
}

fn strip_name(part: &str) -> &str {
    match NAMED_ARG.find(part) {
        // `a == b` is not a named argument
        Some(m) if !part[m.end()..].starts_with('=') => part[m.end()..].trim(),
        _ => part.trim(),
    }
}

/// Split on commas outside brackets, braces and string literals
fn split_top_level(input: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth: i32 = 0;
    let mut in_string = false;
    let mut escaped = false;
    let mut start = 0;

    for (i, c) in input.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '[' | '{' | '(' => depth += 1,
            ']' | '}' | ')' => depth -= 1,
            ',' if depth == 0 => {
                parts.push(input[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(input[start..].trim());
    parts.retain(|p| !p.is_empty());
    parts
}

/// Pick the most specific typed form for a JSON value
fn classify(value: Value) -> Argument {
    match value {
        Value::Number(n) => Argument::Number(n),
        Value::Bool(b) => Argument::Bool(b),
        Value::String(s) => Argument::Str(s),
        Value::Array(items) => classify_array(items),
        other => Argument::Json(other),
    }
}

fn classify_array(items: Vec<Value>) -> Argument {
    if items.iter().all(|v| v.as_i64().is_some()) {
        return Argument::IntArray(items.iter().filter_map(Value::as_i64).collect());
    }
    if items.iter().all(Value::is_string) {
        return Argument::StrArray(
            items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
        );
    }
    if items.iter().all(|v| v.is_null() || v.as_i64().is_some()) {
        return Argument::Sparse(items.iter().map(Value::as_i64).collect());
    }
    let rows: Option<Vec<Vec<i64>>> = items
        .iter()
        .map(|row| {
            row.as_array()
                .and_then(|cells| cells.iter().map(Value::as_i64).collect())
        })
        .collect();
    match rows {
        Some(rows) => Argument::Matrix(rows),
        None => Argument::Json(Value::Array(items)),
    }
}

/// Mark array arguments for structural reconstruction according to `shape`
pub fn structure(parsed: &ParsedArguments, shape: ArgShape) -> Vec<Argument> {
    match shape {
        ArgShape::Plain => parsed.values.clone(),
        ArgShape::LinkedList => parsed
            .values
            .iter()
            .map(|arg| match arg {
                Argument::IntArray(values) => Argument::Structural(Structural::List(values.clone())),
                other => other.clone(),
            })
            .collect(),
        ArgShape::BinaryTree => parsed
            .values
            .iter()
            .map(|arg| match arg {
                Argument::IntArray(values) => Argument::Structural(Structural::Tree(
                    values.iter().copied().map(Some).collect(),
                )),
                Argument::Sparse(values) => Argument::Structural(Structural::Tree(values.clone())),
                other => other.clone(),
            })
            .collect(),
        ArgShape::CyclicList => {
            let mut values = parsed.values.iter();
            let mut out = Vec::with_capacity(parsed.len());
            match values.next() {
                Some(Argument::IntArray(items)) => {
                    let position = match parsed.values.get(1) {
                        Some(Argument::Number(n)) => {
                            values.next();
                            n.as_i64().unwrap_or(-1)
                        }
                        _ => -1,
                    };
                    out.push(Argument::Structural(Structural::CyclicList {
                        values: items.clone(),
                        position,
                    }));
                }
                Some(other) => out.push(other.clone()),
                None => {}
            }
            out.extend(values.cloned());
            out
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn num(n: i64) -> Argument {
        Argument::Number(Number::from(n))
    }

    #[test]
    fn test_array_and_scalar() {
        let parsed = parse("[2,7,11,15], 9");
        assert_eq!(parsed.values, vec![Argument::IntArray(vec![2, 7, 11, 15]), num(9)]);
        assert!(!parsed.degraded);
    }

    #[test]
    fn test_nested_array_is_one_argument() {
        let parsed = parse("[[1,3],[2,6],[8,10],[15,18]]");
        assert_eq!(
            parsed.values,
            vec![Argument::Matrix(vec![vec![1, 3], vec![2, 6], vec![8, 10], vec![15, 18]])]
        );
    }

    #[test]
    fn test_two_arrays() {
        let parsed = parse("[1,2,4], [1,3,4]");
        assert_eq!(
            parsed.values,
            vec![Argument::IntArray(vec![1, 2, 4]), Argument::IntArray(vec![1, 3, 4])]
        );
    }

    #[test]
    fn test_named_arguments() {
        let parsed = parse("nums = [2,7,11,15], target = 9");
        assert_eq!(parsed.values, vec![Argument::IntArray(vec![2, 7, 11, 15]), num(9)]);
    }

    #[test]
    fn test_sparse_array_keeps_nulls() {
        let parsed = parse("[1,null,2,3]");
        assert_eq!(
            parsed.values,
            vec![Argument::Sparse(vec![Some(1), None, Some(2), Some(3)])]
        );
    }

    #[test]
    fn test_quoted_string() {
        assert_eq!(parse("\"(]\"").values, vec![Argument::Str("(]".to_string())]);
        assert_eq!(parse("\"a,b\"").values, vec![Argument::Str("a,b".to_string())]);
        assert_eq!(parse("\"()[]{}\"").values, vec![Argument::Str("()[]{}".to_string())]);
    }

    #[test]
    fn test_numbers() {
        assert_eq!(parse("2").values, vec![num(2)]);
        assert_eq!(parse("  -7 ").values, vec![num(-7)]);
        let parsed = parse("2.5");
        assert_eq!(parsed.values[0].to_json(), json!(2.5));
    }

    #[test]
    fn test_cycle_phrases() {
        let parsed = parse("[3,2,0,-4] with cycle at position 1");
        assert_eq!(parsed.values, vec![Argument::IntArray(vec![3, 2, 0, -4]), num(1)]);

        let parsed = parse("[1] with no cycle");
        assert_eq!(parsed.values, vec![Argument::IntArray(vec![1]), num(-1)]);

        let parsed = parse("[1,2], with cycle at position 0");
        assert_eq!(parsed.values, vec![Argument::IntArray(vec![1, 2]), num(0)]);
    }

    #[test]
    fn test_empty_input_has_no_arguments() {
        assert!(parse("   ").is_empty());
        assert_eq!(parse("[]").values, vec![Argument::IntArray(vec![])]);
    }

    #[test]
    fn test_unparsable_degrades_to_raw_string() {
        let parsed = parse("hello world");
        assert_eq!(parsed.values, vec![Argument::Str("hello world".to_string())]);
        assert!(parsed.degraded);

        let parsed = parse("[1,2], banana");
        assert_eq!(parsed.values[1], Argument::Str("banana".to_string()));
        assert!(parsed.degraded);
    }

    #[test]
    fn test_json_fallbacks() {
        assert_eq!(parse("true").values, vec![Argument::Bool(true)]);
        assert_eq!(
            parse("[\"eat\",\"tea\"]").values,
            vec![Argument::StrArray(vec!["eat".to_string(), "tea".to_string()])]
        );
        assert_eq!(
            parse("{\"a\": 1}").values,
            vec![Argument::Json(json!({"a": 1}))]
        );
    }

    #[test]
    fn test_structure_linked_list() {
        let parsed = parse("[1,2,3,4,5]");
        let args = structure(&parsed, ArgShape::LinkedList);
        assert_eq!(
            args,
            vec![Argument::Structural(Structural::List(vec![1, 2, 3, 4, 5]))]
        );
        assert_eq!(args[0].to_json(), json!([1, 2, 3, 4, 5]));
    }

    #[test]
    fn test_structure_tree_from_sparse_and_dense() {
        let args = structure(&parse("[1,null,2,3]"), ArgShape::BinaryTree);
        assert_eq!(
            args,
            vec![Argument::Structural(Structural::Tree(vec![Some(1), None, Some(2), Some(3)]))]
        );
        let args = structure(&parse("[4,2,7]"), ArgShape::BinaryTree);
        assert_eq!(
            args,
            vec![Argument::Structural(Structural::Tree(vec![Some(4), Some(2), Some(7)]))]
        );
    }

    #[test]
    fn test_structure_cyclic_list_consumes_position() {
        let args = structure(&parse("[3,2,0,-4] with cycle at position 1"), ArgShape::CyclicList);
        assert_eq!(
            args,
            vec![Argument::Structural(Structural::CyclicList {
                values: vec![3, 2, 0, -4],
                position: 1
            })]
        );

        let args = structure(&parse("[1,2]"), ArgShape::CyclicList);
        assert_eq!(
            args,
            vec![Argument::Structural(Structural::CyclicList { values: vec![1, 2], position: -1 })]
        );
    }

    #[test]
    fn test_plain_shape_is_untouched() {
        let parsed = parse("[2,7,11,15], 9");
        assert_eq!(structure(&parsed, ArgShape::Plain), parsed.values);
    }

    #[test]
    fn test_shape_names() {
        assert_eq!("linked-list".parse::<ArgShape>().unwrap(), ArgShape::LinkedList);
        assert_eq!("tree".parse::<ArgShape>().unwrap(), ArgShape::BinaryTree);
        assert!("graph".parse::<ArgShape>().is_err());
        assert_eq!(ArgShape::CyclicList.to_string(), "cyclic_list");
    }
}
