//! Reporting endpoints (read only)

use axum::{
    extract::State,
    Json,
};

use crate::{
    error::AppResult,
    models::report::{
        InventoryByType, OverdueEntry, PersonLoanSummary, ReportQuery, StatEntry, Summary, TopResource,
        YearQuery, YearReport,
    },
    AppState,
};

use super::{AuthenticatedUser, QueryParams};

pub async fn summary(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Summary>> {
    claims.require_staff()?;

    let summary = state.services.reports.summary().await?;
    Ok(Json(summary))
}

pub async fn loans_by_person(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    QueryParams(query): QueryParams<ReportQuery>,
) -> AppResult<Json<Vec<PersonLoanSummary>>> {
    claims.require_staff()?;

    let rows = state.services.reports.loans_by_person(&query).await?;
    Ok(Json(rows))
}

pub async fn loans_by_status(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    QueryParams(query): QueryParams<ReportQuery>,
) -> AppResult<Json<Vec<StatEntry>>> {
    claims.require_staff()?;

    let counts = state.services.reports.loans_by_status(&query).await?;
    Ok(Json(counts))
}

pub async fn loans_by_year(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    QueryParams(query): QueryParams<YearQuery>,
) -> AppResult<Json<YearReport>> {
    claims.require_staff()?;

    let report = state.services.reports.loans_by_year(query.year).await?;
    Ok(Json(report))
}

pub async fn overdue(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    QueryParams(query): QueryParams<ReportQuery>,
) -> AppResult<Json<Vec<OverdueEntry>>> {
    claims.require_staff()?;

    let entries = state.services.reports.overdue(&query).await?;
    Ok(Json(entries))
}

pub async fn top_resources(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    QueryParams(query): QueryParams<ReportQuery>,
) -> AppResult<Json<Vec<TopResource>>> {
    claims.require_staff()?;

    let top = state.services.reports.top_resources(&query).await?;
    Ok(Json(top))
}

pub async fn inventory(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<InventoryByType>>> {
    claims.require_staff()?;

    let inventory = state.services.reports.inventory().await?;
    Ok(Json(inventory))
}
