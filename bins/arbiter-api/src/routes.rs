// Route table for the Arbiter API

use crate::handlers;
use crate::AppState;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/judge", post(handlers::judge_submission))
        .route("/judge/test", post(handlers::test_judge))
        .route("/execute/python", post(handlers::execute_python))
        .route("/languages", get(handlers::list_languages))
        .route("/status", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics))
}
