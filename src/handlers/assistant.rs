use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};

use crate::error::{AppError, Result};
use crate::models::{AssistantQuery, AssistantReply};
use crate::AppState;

/// Ask the assistant a question
/// POST /api/ai/query
pub async fn query(
    State(state): State<AppState>,
    payload: std::result::Result<Json<AssistantQuery>, JsonRejection>,
) -> Result<Json<AssistantReply>> {
    let invalid = || AppError::BadRequest("Query is required and must be a string".to_string());

    let Json(req) = payload.map_err(|e| {
        tracing::debug!("Rejected assistant query body: {}", e);
        invalid()
    })?;

    let query = match req.query {
        Some(serde_json::Value::String(q)) if !q.trim().is_empty() => q,
        _ => return Err(invalid()),
    };

    let reply = state.assistant.reply(&query, req.include_image).await;
    Ok(Json(reply))
}

/// Welcome message with the assistant avatar
/// GET /api/ai/welcome
pub async fn welcome(State(state): State<AppState>) -> Json<AssistantReply> {
    Json(state.assistant.welcome().await)
}
