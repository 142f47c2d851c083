use axum::{Json, extract::State};
use tracing::info;

use gencord_core::App;
use gencord_types::api::JoinRoomRequest;
use gencord_types::models::Room;

use crate::error::ApiError;

/// GET /api/rooms — all active rooms with their shareable codes.
pub async fn list_rooms(State(app): State<App>) -> Json<Vec<Room>> {
    Json(app.list_rooms().await)
}

/// POST /api/rooms — mint a fresh code and its channel.
pub async fn create_room(State(app): State<App>) -> Json<Room> {
    let room = app.create_room().await;
    info!("room {} created ({})", room.code, room.channel_id);
    Json(room)
}

/// POST /api/rooms/join — case-insensitive code lookup.
pub async fn join_room(
    State(app): State<App>,
    Json(req): Json<JoinRoomRequest>,
) -> Result<Json<Room>, ApiError> {
    Ok(Json(app.join_room(&req.code).await?))
}
