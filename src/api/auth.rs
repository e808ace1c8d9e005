//! Current account endpoints. Tokens are issued elsewhere and only verified here.

use axum::{extract::State, http::StatusCode, Json};

use crate::{
    error::AppResult,
    models::user::{ChangePassword, User},
    AppState,
};

use super::{AuthenticatedUser, JsonBody};

/// Account behind the bearer token
pub async fn me(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<User>> {
    let user = state.services.users.me(claims.user_id).await?;
    Ok(Json(user))
}

/// Change own password
pub async fn change_password(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    JsonBody(request): JsonBody<ChangePassword>,
) -> AppResult<StatusCode> {
    state
        .services
        .users
        .change_password(claims.user_id, request)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
