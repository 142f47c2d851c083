use axum::{
    Json,
    extract::{Path, State},
};
use tracing::info;

use gencord_core::App;
use gencord_types::api::DeletedResponse;
use gencord_types::models::{Channel, Message};

use crate::error::ApiError;

/// GET /api/channels — static channels only; rooms are reachable by code.
pub async fn list_channels(State(app): State<App>) -> Json<Vec<Channel>> {
    Json(app.list_channels().await)
}

/// GET /api/channels/{id}/messages — the retained history in send order.
pub async fn get_messages(
    State(app): State<App>,
    Path(channel_id): Path<String>,
) -> Result<Json<Vec<Message>>, ApiError> {
    Ok(Json(app.history(&channel_id).await?))
}

/// DELETE /api/channels/{id} — rooms only; static channels are refused.
pub async fn delete_channel(
    State(app): State<App>,
    Path(channel_id): Path<String>,
) -> Result<Json<DeletedResponse>, ApiError> {
    app.delete_channel(&channel_id).await?;
    info!("channel {} deleted", channel_id);
    Ok(Json(DeletedResponse { ok: true }))
}
