use serde::{Deserialize, Serialize};

// -- Auth --

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// `created` is true when this call claimed the name and made the account.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub username: String,
    pub created: bool,
}

// -- Rooms --

#[derive(Debug, Deserialize)]
pub struct JoinRoomRequest {
    pub code: String,
}

// -- Channels --

#[derive(Debug, Serialize)]
pub struct DeletedResponse {
    pub ok: bool,
}
