//! Resource catalogue and stock endpoints

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::{
        loan::{LoanDetails, LoanQuery},
        resource::{Availability, CreateResource, Resource, ResourceQuery, StockAdjustment, UpdateResource},
        PaginatedResponse, Pagination,
    },
    AppState,
};

use super::{AuthenticatedUser, EntityId, JsonBody, QueryParams};

/// List resources with filters and pagination
pub async fn list_resources(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    QueryParams(query): QueryParams<ResourceQuery>,
) -> AppResult<Json<PaginatedResponse<Resource>>> {
    claims.require_staff()?;

    let (resources, total) = state.services.resources.search(&query).await?;
    Ok(Json(Pagination::new(query.page, query.per_page).into_response(resources, total)))
}

pub async fn get_resource(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    EntityId(id): EntityId,
) -> AppResult<Json<Resource>> {
    claims.require_staff()?;

    let resource = state.services.resources.get_by_id(id).await?;
    Ok(Json(resource))
}

pub async fn create_resource(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    JsonBody(resource): JsonBody<CreateResource>,
) -> AppResult<(StatusCode, Json<Resource>)> {
    claims.require_staff()?;

    let created = state.services.resources.create(resource).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_resource(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    EntityId(id): EntityId,
    JsonBody(resource): JsonBody<UpdateResource>,
) -> AppResult<Json<Resource>> {
    claims.require_staff()?;

    let updated = state.services.resources.update(id, resource).await?;
    Ok(Json(updated))
}

pub async fn delete_resource(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    EntityId(id): EntityId,
) -> AppResult<StatusCode> {
    claims.require_staff()?;

    state.services.resources.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Apply a manual stock adjustment (add/remove units, damage, repair, recover)
pub async fn adjust_stock(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    EntityId(id): EntityId,
    JsonBody(adjustment): JsonBody<StockAdjustment>,
) -> AppResult<Json<Resource>> {
    claims.require_staff()?;

    let resource = state.services.resources.adjust_stock(id, adjustment).await?;
    Ok(Json(resource))
}

pub async fn availability(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    EntityId(id): EntityId,
) -> AppResult<Json<Availability>> {
    claims.require_staff()?;

    let availability = state.services.resources.availability(id).await?;
    Ok(Json(availability))
}

pub async fn list_categories(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<String>>> {
    claims.require_staff()?;

    let categories = state.services.resources.categories().await?;
    Ok(Json(categories))
}

pub async fn resource_loans(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    EntityId(id): EntityId,
    QueryParams(query): QueryParams<LoanQuery>,
) -> AppResult<Json<PaginatedResponse<LoanDetails>>> {
    claims.require_staff()?;

    let pagination = Pagination::new(query.page, query.per_page);
    let (loans, total) = state.services.resources.loans(id, query).await?;
    Ok(Json(pagination.into_response(loans, total)))
}
