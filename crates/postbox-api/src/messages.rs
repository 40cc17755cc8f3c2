use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;
use tracing::error;
use uuid::Uuid;

use postbox_core::{fanout, ledger, query};
use postbox_types::api::{Claims, MessageListResponse, SendMessageRequest, SendMessageResponse};
use postbox_types::models::{DeleteOutcome, MessageFilter, SortOrder};

use crate::auth::AppState;
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub filter: MessageFilter,
    #[serde(default)]
    pub sort: SortOrder,
}

pub async fn send_message(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    // Run blocking DB work off the async runtime
    let db = state.clone();
    let sender = claims.sub;
    let receipt = tokio::task::spawn_blocking(move || {
        fanout::send(&db.db, sender, &req.subject, &req.body, &req.recipients)
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        ApiError::Internal
    })??;

    Ok((
        StatusCode::CREATED,
        Json(SendMessageResponse {
            message_id: receipt.message_id,
            status: receipt.status,
            failed_recipients: receipt.failed_recipients,
            created_at: receipt.created_at,
        }),
    ))
}

pub async fn list_messages(
    State(state): State<AppState>,
    Query(q): Query<ListQuery>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let viewer = claims.sub;
    let messages =
        tokio::task::spawn_blocking(move || query::list_for(&db.db, viewer, q.filter, q.sort))
            .await
            .map_err(|e| {
                error!("spawn_blocking join error: {}", e);
                ApiError::Internal
            })??;

    Ok(Json(MessageListResponse {
        count: messages.len(),
        messages,
    }))
}

pub async fn get_message(
    State(state): State<AppState>,
    Path(message_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let viewer = claims.sub;
    let view = tokio::task::spawn_blocking(move || query::fetch(&db.db, viewer, message_id))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal
        })??;

    Ok(Json(view))
}

pub async fn mark_read(
    State(state): State<AppState>,
    Path(message_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let owner = claims.sub;
    tokio::task::spawn_blocking(move || ledger::mark_read(&db.db, owner, message_id))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal
        })??;

    Ok(Json(json!({ "read": true })))
}

pub async fn mark_unread(
    State(state): State<AppState>,
    Path(message_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let owner = claims.sub;
    tokio::task::spawn_blocking(move || ledger::mark_unread(&db.db, owner, message_id))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal
        })??;

    Ok(Json(json!({ "read": false })))
}

pub async fn delete_message(
    State(state): State<AppState>,
    Path(message_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let owner = claims.sub;
    let outcome =
        tokio::task::spawn_blocking(move || ledger::delete_record(&db.db, owner, message_id))
            .await
            .map_err(|e| {
                error!("spawn_blocking join error: {}", e);
                ApiError::Internal
            })??;

    let deleted = match outcome {
        DeleteOutcome::RecordRemoved => "record",
        DeleteOutcome::MessageFullyDeleted => "message",
    };
    Ok(Json(json!({ "deleted": deleted })))
}
