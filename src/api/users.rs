//! Staff account management endpoints (administrators only)

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::{
        user::{CreateUser, UpdateUser, User, UserQuery},
        PaginatedResponse, Pagination,
    },
    AppState,
};

use super::{AuthenticatedUser, EntityId, JsonBody, QueryParams};

/// List users with search and pagination
pub async fn list_users(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    QueryParams(query): QueryParams<UserQuery>,
) -> AppResult<Json<PaginatedResponse<User>>> {
    claims.require_admin()?;

    let (users, total) = state.services.users.search(&query).await?;
    Ok(Json(Pagination::new(query.page, query.per_page).into_response(users, total)))
}

/// Get user details by ID
pub async fn get_user(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    EntityId(id): EntityId,
) -> AppResult<Json<User>> {
    claims.require_admin()?;

    let user = state.services.users.get_by_id(id).await?;
    Ok(Json(user))
}

/// Create a new user
pub async fn create_user(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    JsonBody(user): JsonBody<CreateUser>,
) -> AppResult<(StatusCode, Json<User>)> {
    claims.require_admin()?;

    let created = state.services.users.create(user).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Update a user
pub async fn update_user(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    EntityId(id): EntityId,
    JsonBody(user): JsonBody<UpdateUser>,
) -> AppResult<Json<User>> {
    claims.require_admin()?;

    let updated = state.services.users.update(id, user, claims.user_id).await?;
    Ok(Json(updated))
}

/// Delete a user
pub async fn delete_user(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    EntityId(id): EntityId,
) -> AppResult<StatusCode> {
    claims.require_admin()?;

    state.services.users.delete(id, claims.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
