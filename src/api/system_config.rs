//! System configuration endpoints

use axum::{extract::State, Json};

use crate::{
    error::AppResult,
    models::system_config::{SystemConfig, UpdateSystemConfig},
    AppState,
};

use super::{AuthenticatedUser, JsonBody};

pub async fn get_config(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<SystemConfig>> {
    claims.require_staff()?;

    let config = state.services.system_config.get().await?;
    Ok(Json(config))
}

/// Partial update, administrators only
pub async fn update_config(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    JsonBody(update): JsonBody<UpdateSystemConfig>,
) -> AppResult<Json<SystemConfig>> {
    claims.require_admin()?;

    let config = state.services.system_config.update(update, claims.user_id).await?;
    Ok(Json(config))
}

pub async fn reset_config(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<SystemConfig>> {
    claims.require_admin()?;

    let config = state.services.system_config.reset(claims.user_id).await?;
    Ok(Json(config))
}
