use axum::{Json, extract::State};
use tracing::info;

use gencord_core::App;
use gencord_types::api::{LoginRequest, LoginResponse};

use crate::error::ApiError;

/// POST /api/auth/login — login-or-register in one step: the first caller
/// for a name claims it, later callers must present the same password.
pub async fn login(
    State(app): State<App>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let outcome = app.login_or_register(&req.username, &req.password).await?;
    if outcome.created {
        info!("account {} created", outcome.username);
    }
    Ok(Json(LoginResponse {
        username: outcome.username,
        created: outcome.created,
    }))
}
