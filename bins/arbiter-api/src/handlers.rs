// HTTP route handlers for the Arbiter API

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use arbiter_common::types::{ExecutionResult, JudgeResult, Language, SubmissionRecord, TestCase};
use arbiter_judge::executor::Submission;
use arbiter_judge::EntryPoint;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

use crate::metrics;
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JudgeRequest {
    #[serde(flatten)]
    pub submission: Submission,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub question_id: Option<u64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JudgeResponse {
    pub status: String,
    pub accuracy: u32,
    pub total_tests: usize,
    pub passed_tests: usize,
    pub results: Vec<ExecutionResult>,
    pub success: bool,
    pub error: Option<String>,
    pub execution_time: u64,
    pub submission_id: Option<Uuid>,
    pub timestamp: String,
}

impl JudgeResponse {
    fn new(result: JudgeResult, submission_id: Option<Uuid>) -> Self {
        Self {
            status: result.status().to_string(),
            accuracy: result.accuracy().round() as u32,
            total_tests: result.total_tests,
            passed_tests: result.passed_tests,
            execution_time: result.total_execution_time(),
            success: result.success,
            error: result.overall_error,
            results: result.results,
            submission_id,
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestJudgeRequest {
    #[serde(default = "default_test_language")]
    pub language: String,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub test_input: Option<String>,
    #[serde(default)]
    pub expected_output: Option<String>,
    #[serde(default)]
    pub entry_point: Option<EntryPoint>,
}

fn default_test_language() -> String {
    "cpp".to_string()
}

#[derive(Debug, Deserialize)]
pub struct ScriptRequest {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub stdin: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptResponse {
    pub success: bool,
    pub output: String,
    pub error: Option<String>,
    pub execution_time: u64,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LanguageInfo {
    pub name: Language,
    pub default_backend: String,
    pub remote_language: String,
}

fn bad_request(message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({ "error": message })),
    )
        .into_response()
}

/// POST /judge - Judge a submission against its test cases
pub async fn judge_submission(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<JudgeRequest>,
) -> Response {
    if payload.submission.code.trim().is_empty() || payload.submission.language.trim().is_empty() {
        return bad_request("Missing required fields: code, language");
    }

    let submission = payload.submission;
    let result = state.judge.submit(&submission).await;
    let language = Language::from_name(&submission.language);
    metrics::record(language, &result);

    // Hand the record to the persistence collaborator
    let submission_id = match (&payload.user_id, language) {
        (Some(_), Some(language)) if result.overall_error.is_none() => {
            let record = SubmissionRecord::new(
                payload.user_id.clone(),
                payload.question_id,
                submission.code.clone(),
                language,
                result.clone(),
            );
            match serde_json::to_string(&record) {
                Ok(json) => {
                    info!(
                        target: "submissions",
                        submission_id = %record.id,
                        status = %record.status,
                        record = %json,
                        "Submission recorded"
                    );
                    Some(record.id)
                }
                Err(e) => {
                    error!(error = %e, "Failed to serialize submission record");
                    None
                }
            }
        }
        _ => None,
    };

    info!(
        language = %submission.language,
        passed = result.passed_tests,
        total = result.total_tests,
        "Judge request completed"
    );

    (StatusCode::OK, Json(JudgeResponse::new(result, submission_id))).into_response()
}

/// POST /judge/test - Judge one ad-hoc test case
pub async fn test_judge(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<TestJudgeRequest>,
) -> Response {
    if payload.code.trim().is_empty() {
        return bad_request("Code is required");
    }

    let mut test_case = TestCase::new(
        payload.test_input.unwrap_or_else(|| "[2,7,11,15], 9".to_string()),
        payload.expected_output.unwrap_or_else(|| "[0,1]".to_string()),
    );
    test_case.explanation = "Ad-hoc test case".to_string();

    let submission = Submission {
        language: payload.language,
        code: payload.code,
        test_cases: vec![test_case],
        entry_point: payload
            .entry_point
            .unwrap_or_else(|| EntryPoint::infer("twoSum")),
        time_limit_ms: None,
        backend: None,
    };

    let result = state.judge.submit(&submission).await;
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "message": "Test judge completed",
            "result": result,
            "timestamp": Utc::now().to_rfc3339(),
        })),
    )
        .into_response()
}

/// POST /execute/python - Run Python source directly with stdin
pub async fn execute_python(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ScriptRequest>,
) -> Response {
    if payload.code.trim().is_empty() {
        return bad_request("Missing required field: code");
    }

    let script = state
        .local
        .run_script(Language::Python, &payload.code, &payload.stdin, state.script_timeout)
        .await;

    let output = if script.error.is_none() && script.output.is_empty() {
        "Code executed successfully".to_string()
    } else {
        script.output
    };

    (
        StatusCode::OK,
        Json(ScriptResponse {
            success: true,
            output,
            error: script.error,
            execution_time: script.time_ms,
            timestamp: Utc::now().to_rfc3339(),
        }),
    )
        .into_response()
}

/// GET /languages - Configured languages and their default backend
pub async fn list_languages(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let languages = state.judge.languages();
    let infos: Vec<LanguageInfo> = languages
        .list_languages()
        .into_iter()
        .filter_map(|language| {
            let config = languages.get_config(&language).ok()?;
            Some(LanguageInfo {
                name: language,
                default_backend: config.default_backend.to_string(),
                remote_language: config.remote.language.clone(),
            })
        })
        .collect();
    Json(infos)
}

/// GET /status - Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// GET /metrics - Prometheus scrape endpoint
pub async fn metrics() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics::render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbiter_judge::engine::{BackendKind, ExecutionBackend, ExecutionOutcome, LocalBackend};
    use arbiter_judge::harness::HarnessProgram;
    use arbiter_judge::LanguageConfigManager;
    use arbiter_judge::Judge;
    use async_trait::async_trait;
    use axum::body::to_bytes;
    use serde_json::{json, Value};
    use std::time::Duration;

    /// Answers every run with the same result
    struct FixedBackend(BackendKind, Value);

    #[async_trait]
    impl ExecutionBackend for FixedBackend {
        fn kind(&self) -> BackendKind {
            self.0
        }

        async fn run(&self, _program: &HarnessProgram, _timeout: Duration) -> ExecutionOutcome {
            ExecutionOutcome::success(self.1.clone(), 4)
        }
    }

    fn make_state(answer: Value) -> Arc<AppState> {
        let languages = Arc::new(LanguageConfigManager::builtin());
        let judge = Judge::new(languages.clone(), Duration::from_secs(1))
            .with_backend(Arc::new(FixedBackend(BackendKind::Local, answer.clone())))
            .with_backend(Arc::new(FixedBackend(BackendKind::Remote, answer)));
        Arc::new(AppState {
            judge,
            local: LocalBackend::new(languages, Duration::from_secs(1)),
            script_timeout: Duration::from_secs(1),
        })
    }

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn judge_request(body: Value) -> JudgeRequest {
        serde_json::from_value(body).unwrap()
    }

    #[tokio::test]
    async fn test_judge_response_shape() {
        let state = make_state(json!([0, 1]));
        let request = judge_request(json!({
            "language": "javascript",
            "code": "function twoSum(nums, target) { return [0, 1]; }",
            "testCases": [
                {"input": "[2,7,11,15], 9", "expectedOutput": "[0,1]"},
                {"input": "[3,3], 6", "expectedOutput": "[1,0]"}
            ],
            "entryPoint": {"name": "twoSum"},
            "userId": "user-1",
            "questionId": 1
        }));

        let response = judge_submission(State(state), Json(request)).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["status"], "Wrong Answer");
        assert_eq!(body["accuracy"], 50);
        assert_eq!(body["totalTests"], 2);
        assert_eq!(body["passedTests"], 1);
        assert_eq!(body["executionTime"], 8);
        assert_eq!(body["results"][0]["actualOutput"], "[0,1]");
        assert!(body["submissionId"].is_string());
    }

    #[tokio::test]
    async fn test_unsupported_language_is_reported_in_body() {
        let state = make_state(json!(1));
        let request = judge_request(json!({
            "language": "cobol",
            "code": "DISPLAY 'HI'",
            "testCases": [{"input": "1", "expectedOutput": "1"}],
            "entryPoint": {"name": "main"}
        }));

        let body = body_json(judge_submission(State(state), Json(request)).await).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Unsupported language");
        assert!(body["submissionId"].is_null());
    }

    #[tokio::test]
    async fn test_missing_code_rejected() {
        let state = make_state(json!(1));
        let request = judge_request(json!({
            "language": "python",
            "code": "  ",
            "testCases": [],
            "entryPoint": {"name": "twoSum"}
        }));

        let response = judge_submission(State(state), Json(request)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_ad_hoc_defaults_to_two_sum() {
        let state = make_state(json!([0, 1]));
        let request = TestJudgeRequest {
            language: default_test_language(),
            code: "vector<int> twoSum(vector<int>& nums, int target) { return {0, 1}; }".to_string(),
            test_input: None,
            expected_output: None,
            entry_point: None,
        };

        let body = body_json(test_judge(State(state), Json(request)).await).await;
        assert_eq!(body["result"]["passedTests"], 1);
        assert_eq!(body["result"]["results"][0]["expectedOutput"], "[0,1]");
    }

    #[tokio::test]
    async fn test_languages_listing() {
        let state = make_state(json!(1));
        let response = list_languages(State(state)).await.into_response();
        let body = body_json(response).await;
        let names: Vec<&str> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|l| l["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["javascript", "python", "cpp", "java", "rust"]);
        assert_eq!(body[2]["remoteLanguage"], "c++");
        assert_eq!(body[2]["defaultBackend"], "remote");
    }
}
