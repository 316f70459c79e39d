/// End-to-end judging against real toolchains
///
/// These tests drive the full pipeline through the local backend:
/// 1. Interpreted languages pass, fail and report missing functions
/// 2. Structural inputs (lists, cycles, trees) survive reconstruction
/// 3. Compilation failures mark every test case
/// 4. Unbounded loops are cut off by the time limit
///
/// Each test returns early when its toolchain is not on PATH, so the suite
/// runs everywhere and exercises whatever compilers the host has.

#[cfg(test)]
mod toolchain_tests {
    use crate::config::LanguageConfigManager;
    use crate::engine::{BackendKind, LocalBackend};
    use crate::executor::{Judge, Submission};
    use crate::normalizer::ArgShape;
    use crate::resolver::EntryPoint;
    use arbiter_common::types::{JudgeResult, TestCase, TestStatus};
    use std::sync::Arc;
    use std::process::Stdio;
    use std::time::{Duration, Instant};
    use tokio::process::Command;

    const NODE: &[&str] = &["node", "nodejs"];
    const PYTHON: &[&str] = &["python3", "python"];
    const CPP: &[&str] = &["g++", "clang++"];
    const JAVA: &[&str] = &["javac", "java"];
    const RUST: &[&str] = &["rustc"];

    async fn spawns(binary: &str) -> bool {
        Command::new(binary)
            .arg("-version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .is_ok()
    }

    /// Whether the toolchain can run here. Java needs both binaries, the
    /// others need any one candidate.
    async fn toolchain(candidates: &[&str]) -> bool {
        let mut found = Vec::new();
        for binary in candidates {
            found.push(spawns(binary).await);
        }
        let available = if candidates == JAVA {
            found.iter().all(|f| *f)
        } else {
            found.iter().any(|f| *f)
        };
        if !available {
            eprintln!("skipping: {} not on PATH", candidates.join(" / "));
        }
        available
    }

    fn local_judge() -> Judge {
        let languages = Arc::new(LanguageConfigManager::builtin());
        let local = LocalBackend::new(languages.clone(), Duration::from_secs(30));
        Judge::new(languages, Duration::from_secs(5)).with_backend(Arc::new(local))
    }

    async fn judge(language: &str, code: &str, entry: EntryPoint, cases: &[(&str, &str)]) -> JudgeResult {
        let submission = Submission {
            language: language.to_string(),
            code: code.to_string(),
            test_cases: cases
                .iter()
                .map(|(input, expected)| TestCase::new(*input, *expected))
                .collect(),
            entry_point: entry,
            time_limit_ms: None,
            backend: Some(BackendKind::Local),
        };
        local_judge().submit(&submission).await
    }

    /// Test: twoSum passes in JavaScript with console noise
    #[tokio::test]
    async fn test_javascript_two_sum() {
        if !toolchain(NODE).await {
            return;
        }
        let code = r#"
function twoSum(nums, target) {
    console.log("searching", nums.length);
    const seen = new Map();
    for (let i = 0; i < nums.length; i++) {
        if (seen.has(target - nums[i])) return [seen.get(target - nums[i]), i];
        seen.set(nums[i], i);
    }
    return [];
}
"#;
        let result = judge(
            "javascript",
            code,
            EntryPoint::infer("twoSum"),
            &[("[2,7,11,15], 9", "[0,1]"), ("[3,2,4], 6", "[1,2]")],
        )
        .await;

        assert_eq!(result.passed_tests, 2, "{:?}", result.results);
        assert_eq!(result.results[0].actual_output, "[0,1]");
    }

    /// Test: missing entry point is reported per test case
    #[tokio::test]
    async fn test_javascript_function_not_found() {
        if !toolchain(NODE).await {
            return;
        }
        let code = "function maxSubArray(nums) { return Math.max(...nums); }";
        let result = judge(
            "javascript",
            code,
            EntryPoint::infer("twoSum"),
            &[("[2,7,11,15], 9", "[0,1]"), ("[3,3], 6", "[0,1]")],
        )
        .await;

        assert_eq!(result.results.len(), 2);
        for case in &result.results {
            assert!(!case.passed);
            assert_eq!(case.status, TestStatus::FunctionNotFound);
            assert!(case.error.as_deref().unwrap().contains("Function not found"));
        }
    }

    /// Test: string argument and boolean result in Python
    #[tokio::test]
    async fn test_python_is_valid() {
        if !toolchain(PYTHON).await {
            return;
        }
        let code = r#"
class Solution:
    def isValid(self, s: str) -> bool:
        pairs = {')': '(', ']': '[', '}': '{'}
        stack = []
        for ch in s:
            if ch in pairs:
                if not stack or stack.pop() != pairs[ch]:
                    return False
            else:
                stack.append(ch)
        return not stack
"#;
        let result = judge(
            "python",
            code,
            EntryPoint::infer("isValid"),
            &[("\"(]\"", "false"), ("\"()[]{}\"", "true")],
        )
        .await;

        assert_eq!(result.passed_tests, 2, "{:?}", result.results);
    }

    /// Test: cycle input is rebuilt with the tail pointing back
    #[tokio::test]
    async fn test_python_has_cycle() {
        if !toolchain(PYTHON).await {
            return;
        }
        let code = r#"
def hasCycle(head):
    slow = fast = head
    while fast and fast.next:
        slow, fast = slow.next, fast.next.next
        if slow is fast:
            return True
    return False
"#;
        let result = judge(
            "python",
            code,
            EntryPoint::infer("hasCycle"),
            &[
                ("[3,2,0,-4] with cycle at position 1", "true"),
                ("[1] with no cycle", "false"),
            ],
        )
        .await;

        assert_eq!(result.passed_tests, 2, "{:?}", result.results);
    }

    /// Test: tree round trip through inorder traversal
    #[tokio::test]
    async fn test_python_inorder_traversal() {
        if !toolchain(PYTHON).await {
            return;
        }
        let code = r#"
def inorder_traversal(root):
    out = []
    def walk(node):
        if node:
            walk(node.left)
            out.append(node.val)
            walk(node.right)
    walk(root)
    return out
"#;
        let result = judge(
            "python",
            code,
            EntryPoint::new("inorderTraversal", ArgShape::BinaryTree),
            &[("[1,null,2,3]", "[1,3,2]"), ("[]", "[]")],
        )
        .await;

        assert_eq!(result.passed_tests, 2, "{:?}", result.results);
    }

    /// Test: unbounded loop hits the time limit and nothing hangs
    #[tokio::test]
    async fn test_infinite_loop_times_out() {
        if !toolchain(NODE).await {
            return;
        }
        let submission = Submission {
            language: "javascript".to_string(),
            code: "function spin() { while (true) {} }".to_string(),
            test_cases: vec![TestCase::new("", "1")],
            entry_point: EntryPoint::infer("spin"),
            time_limit_ms: Some(1000),
            backend: Some(BackendKind::Local),
        };

        let started = Instant::now();
        let result = local_judge().submit(&submission).await;
        assert_eq!(result.results[0].status, TestStatus::TimeLimitExceeded);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    /// Test: compile failure marks every case
    #[tokio::test]
    async fn test_cpp_compilation_error() {
        if !toolchain(CPP).await {
            return;
        }
        let code = r#"
class Solution {
public:
    vector<int> twoSum(vector<int>& nums, int target) {
        return {0, 1}
    }
};
"#;
        let result = judge(
            "cpp",
            code,
            EntryPoint::infer("twoSum"),
            &[("[2,7,11,15], 9", "[0,1]"), ("[3,3], 6", "[0,1]")],
        )
        .await;

        assert_eq!(result.passed_tests, 0);
        for case in &result.results {
            assert_eq!(case.status, TestStatus::CompilationError);
        }
    }

    /// Test: C++ linked list reversal
    #[tokio::test]
    async fn test_cpp_reverse_list() {
        if !toolchain(CPP).await {
            return;
        }
        let code = r#"
class Solution {
public:
    ListNode* reverseList(ListNode* head) {
        ListNode* prev = nullptr;
        while (head) {
            ListNode* next = head->next;
            head->next = prev;
            prev = head;
            head = next;
        }
        return prev;
    }
};
"#;
        let result = judge(
            "cpp",
            code,
            EntryPoint::infer("reverseList"),
            &[("[1,2,3,4,5]", "[5,4,3,2,1]"), ("[]", "[]")],
        )
        .await;

        assert_eq!(result.passed_tests, 2, "{:?}", result.results);
    }

    /// Test: Java class with array arguments
    #[tokio::test]
    async fn test_java_two_sum() {
        if !toolchain(JAVA).await {
            return;
        }
        let code = r#"
class Solution {
    public int[] twoSum(int[] nums, int target) {
        Map<Integer, Integer> seen = new HashMap<>();
        for (int i = 0; i < nums.length; i++) {
            Integer j = seen.get(target - nums[i]);
            if (j != null) return new int[]{j, i};
            seen.put(nums[i], i);
        }
        return new int[0];
    }
}
"#;
        let result = judge(
            "java",
            code,
            EntryPoint::infer("twoSum"),
            &[("[2,7,11,15], 9", "[0,1]")],
        )
        .await;

        assert_eq!(result.passed_tests, 1, "{:?}", result.results);
    }

    /// Test: Rust max depth over a tree argument
    #[tokio::test]
    async fn test_rust_max_depth() {
        if !toolchain(RUST).await {
            return;
        }
        let code = r#"
use std::rc::Rc;
use std::cell::RefCell;

impl Solution {
    pub fn max_depth(root: Option<Rc<RefCell<TreeNode>>>) -> i32 {
        match root {
            None => 0,
            Some(node) => {
                let node = node.borrow();
                1 + Self::max_depth(node.left.clone()).max(Self::max_depth(node.right.clone()))
            }
        }
    }
}
"#;
        let result = judge(
            "rust",
            code,
            EntryPoint::infer("maxDepth"),
            &[("[3,9,20,null,null,15,7]", "3")],
        )
        .await;

        assert_eq!(result.passed_tests, 1, "{:?}", result.results);
    }

    /// Test: a missing entry point is FunctionNotFound in every language
    #[tokio::test]
    async fn test_function_not_found_everywhere() {
        let submissions: [(&str, &[&str], &str); 5] = [
            ("javascript", NODE, "function addOne(x) { return x + 1; }"),
            ("python", PYTHON, "def add_one(x):\n    return x + 1\n"),
            ("cpp", CPP, "int addOne(int x) { return x + 1; }"),
            ("java", JAVA, "public int addOne(int x) { return x + 1; }"),
            ("rust", RUST, "fn add_one(x: i32) -> i32 { x + 1 }"),
        ];
        for (language, candidates, code) in submissions {
            if !toolchain(candidates).await {
                continue;
            }
            let result = judge(
                language,
                code,
                EntryPoint::infer("twoSum"),
                &[("[2,7,11,15], 9", "[0,1]")],
            )
            .await;

            let case = &result.results[0];
            assert_eq!(case.status, TestStatus::FunctionNotFound, "{}: {:?}", language, case);
            assert!(case.error.as_deref().unwrap_or_default().starts_with("Function not found"));
        }
    }

    /// Test: in-place `void` entry points report the same verdict as JavaScript
    #[tokio::test]
    async fn test_void_entry_point_matches_across_languages() {
        let submissions: [(&str, &[&str], &str); 3] = [
            (
                "javascript",
                NODE,
                "function rotate(nums, k) { nums.unshift(...nums.splice(nums.length - k)); }",
            ),
            (
                "cpp",
                CPP,
                "class Solution {\npublic:\n    void rotate(vector<int>& nums, int k) {\n        std::rotate(nums.begin(), nums.end() - k, nums.end());\n    }\n};",
            ),
            (
                "java",
                JAVA,
                "class Solution {\n    public void rotate(int[] nums, int k) {\n        int[] copy = nums.clone();\n        for (int i = 0; i < nums.length; i++) nums[(i + k) % nums.length] = copy[i];\n    }\n}",
            ),
        ];
        for (language, candidates, code) in submissions {
            if !toolchain(candidates).await {
                continue;
            }
            let result = judge(
                language,
                code,
                EntryPoint::new("rotate", ArgShape::Plain),
                &[("[1,2,3,4,5], 2", "[]")],
            )
            .await;

            let case = &result.results[0];
            assert_eq!(case.status, TestStatus::Passed, "{}: {:?}", language, case);
            assert_eq!(case.actual_output, "[]");
        }
    }
}
