//! Borrower endpoints

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::{
        loan::{LoanDetails, LoanQuery},
        person::{CreatePerson, PeopleStats, Person, PersonQuery, UpdatePerson},
        PaginatedResponse, Pagination,
    },
    AppState,
};

use super::{AuthenticatedUser, EntityId, JsonBody, QueryParams};

/// List people with filters and pagination
pub async fn list_people(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    QueryParams(query): QueryParams<PersonQuery>,
) -> AppResult<Json<PaginatedResponse<Person>>> {
    claims.require_staff()?;

    let (people, total) = state.services.people.search(&query).await?;
    Ok(Json(Pagination::new(query.page, query.per_page).into_response(people, total)))
}

pub async fn get_person(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    EntityId(id): EntityId,
) -> AppResult<Json<Person>> {
    claims.require_staff()?;

    let person = state.services.people.get_by_id(id).await?;
    Ok(Json(person))
}

pub async fn create_person(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    JsonBody(person): JsonBody<CreatePerson>,
) -> AppResult<(StatusCode, Json<Person>)> {
    claims.require_staff()?;

    let created = state.services.people.create(person).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_person(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    EntityId(id): EntityId,
    JsonBody(person): JsonBody<UpdatePerson>,
) -> AppResult<Json<Person>> {
    claims.require_staff()?;

    let updated = state.services.people.update(id, person).await?;
    Ok(Json(updated))
}

/// Delete a person; refused while they hold open loans
pub async fn delete_person(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    EntityId(id): EntityId,
) -> AppResult<StatusCode> {
    claims.require_staff()?;

    state.services.people.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn activate_person(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    EntityId(id): EntityId,
) -> AppResult<Json<Person>> {
    claims.require_staff()?;

    let person = state.services.people.set_active(id, true).await?;
    Ok(Json(person))
}

pub async fn deactivate_person(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    EntityId(id): EntityId,
) -> AppResult<Json<Person>> {
    claims.require_staff()?;

    let person = state.services.people.set_active(id, false).await?;
    Ok(Json(person))
}

/// Loan history of a person
pub async fn person_loans(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    EntityId(id): EntityId,
    QueryParams(query): QueryParams<LoanQuery>,
) -> AppResult<Json<PaginatedResponse<LoanDetails>>> {
    claims.require_staff()?;

    let pagination = Pagination::new(query.page, query.per_page);
    let (loans, total) = state.services.people.loans(id, query).await?;
    Ok(Json(pagination.into_response(loans, total)))
}

/// Headcount by type and grade
pub async fn people_stats(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<PeopleStats>> {
    claims.require_staff()?;

    let stats = state.services.people.stats().await?;
    Ok(Json(stats))
}
