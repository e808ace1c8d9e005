//! Loan endpoints

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::{
        loan::{CreateLoan, LoanDetails, LoanQuery, OverdueRefresh, ReturnLoan},
        resource::StockSyncReport,
        PaginatedResponse, Pagination,
    },
    AppState,
};

use super::{AuthenticatedUser, EntityId, JsonBody, OptionalJsonBody, QueryParams};

/// List loans with filters and pagination
pub async fn list_loans(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    QueryParams(query): QueryParams<LoanQuery>,
) -> AppResult<Json<PaginatedResponse<LoanDetails>>> {
    claims.require_staff()?;

    let (loans, total) = state.services.loans.search(&query).await?;
    Ok(Json(Pagination::new(query.page, query.per_page).into_response(loans, total)))
}

/// Open loans past their due date
pub async fn list_overdue(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    QueryParams(mut query): QueryParams<LoanQuery>,
) -> AppResult<Json<PaginatedResponse<LoanDetails>>> {
    claims.require_staff()?;

    query.overdue = Some(true);
    let (loans, total) = state.services.loans.search(&query).await?;
    Ok(Json(Pagination::new(query.page, query.per_page).into_response(loans, total)))
}

pub async fn get_loan(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    EntityId(id): EntityId,
) -> AppResult<Json<LoanDetails>> {
    claims.require_staff()?;

    let loan = state.services.loans.get(id).await?;
    Ok(Json(loan))
}

/// Create a new loan
pub async fn create_loan(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    JsonBody(request): JsonBody<CreateLoan>,
) -> AppResult<(StatusCode, Json<LoanDetails>)> {
    claims.require_staff()?;

    let loan = state.services.loans.create(request, claims.user_id).await?;
    Ok((StatusCode::CREATED, Json(loan)))
}

/// Return a loan; an empty body means returned in good condition
pub async fn return_loan(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    EntityId(id): EntityId,
    OptionalJsonBody(request): OptionalJsonBody<ReturnLoan>,
) -> AppResult<Json<LoanDetails>> {
    claims.require_staff()?;

    let request = request.unwrap_or_default();
    let loan = state.services.loans.return_loan(id, request).await?;
    Ok(Json(loan))
}

pub async fn renew_loan(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    EntityId(id): EntityId,
) -> AppResult<Json<LoanDetails>> {
    claims.require_staff()?;

    let loan = state.services.loans.renew(id).await?;
    Ok(Json(loan))
}

pub async fn mark_lost(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    EntityId(id): EntityId,
) -> AppResult<Json<LoanDetails>> {
    claims.require_staff()?;

    let loan = state.services.loans.mark_lost(id).await?;
    Ok(Json(loan))
}

/// Delete a closed (returned or lost) loan
pub async fn delete_loan(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    EntityId(id): EntityId,
) -> AppResult<StatusCode> {
    claims.require_staff()?;

    state.services.loans.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Recompute loan counters from open loans
pub async fn sync_stock(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<StockSyncReport>> {
    claims.require_admin()?;

    let report = state.services.loans.sync_stock().await?;
    Ok(Json(report))
}

pub async fn refresh_overdue(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<OverdueRefresh>> {
    claims.require_admin()?;

    let refresh = state.services.loans.refresh_overdue().await?;
    Ok(Json(refresh))
}
