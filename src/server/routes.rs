use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::Instrument;
use uuid::Uuid;

use crate::guidance::types::AnnotatedElement;
use crate::server::state::AppState;

/// Flat `{"status": "error", "message": ...}` envelope the extension expects.
pub(crate) fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(json!({ "status": "error", "message": message.into() })),
    )
        .into_response()
}

fn parse_body<T: DeserializeOwned>(
    body: Result<Json<Value>, JsonRejection>,
) -> Result<T, Response> {
    let Json(body) = body.map_err(|e| {
        error_response(
            StatusCode::BAD_REQUEST,
            format!("Invalid request body: {}", e.body_text()),
        )
    })?;
    serde_json::from_value(body).map_err(|e| {
        error_response(
            StatusCode::BAD_REQUEST,
            format!("Invalid request body: {e}"),
        )
    })
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

#[derive(Debug, Deserialize)]
pub struct ParseRequest {
    message: String,
    #[serde(default)]
    context: Vec<AnnotatedElement>,
    #[serde(default)]
    instructions_file: Option<String>,
}

/// Generates a fresh instruction block from the user request and the page
/// snapshot, and appends it as the active block for later resolution.
pub async fn parse(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Response {
    let span = tracing::info_span!("parse", request_id = %Uuid::new_v4());
    async move {
        let req: ParseRequest = match parse_body(body) {
            Ok(req) => req,
            Err(response) => return response,
        };
        let key = state.record_key(req.instructions_file);

        match state.generator.generate(&key, &req.message, &req.context).await {
            Ok(result) => {
                Json(json!({ "status": "success", "result": result })).into_response()
            }
            Err(e) => error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Instruction generation failed: {e}"),
            ),
        }
    }
    .instrument(span)
    .await
}

#[derive(Debug, Deserialize)]
pub struct SelectElementRequest {
    annotated_html: Vec<AnnotatedElement>,
    #[serde(default)]
    step_index: usize,
    #[serde(default)]
    instructions_file: Option<String>,
}

/// Resolves one step of the active instruction block against the elements
/// currently on the page.
pub async fn select_element(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Response {
    let span = tracing::info_span!("select_element", request_id = %Uuid::new_v4());
    async move {
        let req: SelectElementRequest = match parse_body(body) {
            Ok(req) => req,
            Err(response) => return response,
        };
        let key = state.record_key(req.instructions_file);

        match state
            .runner
            .resolve_step(&key, &req.annotated_html, req.step_index)
            .await
        {
            Ok(outcome) => {
                Json(json!({ "status": "success", "result": outcome })).into_response()
            }
            Err(e) => error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Step resolution failed: {e}"),
            ),
        }
    }
    .instrument(span)
    .await
}

#[derive(Debug, Deserialize)]
pub struct SelectAllRequest {
    annotated_html: Vec<AnnotatedElement>,
    #[serde(default)]
    instructions_file: Option<String>,
}

/// Previews the element match for every step at once. Nothing is persisted.
pub async fn select_all_elements(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Response {
    let span = tracing::info_span!("select_all_elements", request_id = %Uuid::new_v4());
    async move {
        let req: SelectAllRequest = match parse_body(body) {
            Ok(req) => req,
            Err(response) => return response,
        };
        let key = state.record_key(req.instructions_file);

        match state.runner.preview_all_steps(&key, &req.annotated_html).await {
            Ok(outcome) => {
                Json(json!({ "status": "success", "results": outcome })).into_response()
            }
            Err(e) => error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Step resolution failed: {e}"),
            ),
        }
    }
    .instrument(span)
    .await
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(default)]
    instructions_file: Option<String>,
}

/// Every resolution recorded for the requested record, in insertion order.
pub async fn history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Response {
    let span = tracing::info_span!("history", request_id = %Uuid::new_v4());
    async move {
        let key = state.record_key(query.instructions_file);
        let history = state.store.read_resolution_history(&key);
        Json(json!({
            "status": "success",
            "count": history.len(),
            "history": history,
        }))
        .into_response()
    }
    .instrument(span)
    .await
}
