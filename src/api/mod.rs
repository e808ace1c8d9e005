//! REST API: extractors, handlers and the router

pub mod auth;
pub mod health;
pub mod loans;
pub mod people;
pub mod reports;
pub mod resources;
pub mod system_config;
pub mod users;

use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, FromRequestParts, Path, Request},
    http::request::Parts,
    routing::{get, post, put},
    Router,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use serde::de::DeserializeOwned;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use uuid::Uuid;

use crate::{error::AppError, models::user::UserClaims, AppState};

/// Extractor for authenticated user from JWT token
pub struct AuthenticatedUser(pub UserClaims);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| AppError::Authentication("Missing or malformed bearer token".to_string()))?;

        let claims = UserClaims::from_token(bearer.token(), &state.config.auth.jwt_secret)
            .map_err(|e| AppError::Authentication(e.to_string()))?;

        Ok(AuthenticatedUser(claims))
    }
}

/// `:id` path segment parsed as a UUID; anything else is a 400
pub struct EntityId(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for EntityId
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;

        Uuid::parse_str(&raw)
            .map(EntityId)
            .map_err(|_| AppError::Validation(format!("Invalid id '{}'", raw)))
    }
}

/// JSON request body; rejections use the common error body
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct JsonBody<T>(pub T);

/// Query string; rejections use the common error body
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct QueryParams<T>(pub T);

/// JSON body that may be left out entirely. A body that is present must parse.
pub struct OptionalJsonBody<T>(pub Option<T>);

#[async_trait]
impl<S, T> FromRequest<S> for OptionalJsonBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(OptionalJsonBody(None));
        }

        let axum::Json(value) = axum::Json::<T>::from_bytes(&bytes)?;
        Ok(OptionalJsonBody(Some(value)))
    }
}

/// Create the application router with all routes
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_v1 = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Current account
        .route("/auth/me", get(auth::me))
        .route("/auth/password", put(auth::change_password))
        // Staff accounts
        .route("/users", get(users::list_users).post(users::create_user))
        .route(
            "/users/:id",
            get(users::get_user).put(users::update_user).delete(users::delete_user),
        )
        // People
        .route("/people", get(people::list_people).post(people::create_person))
        .route("/people/stats", get(people::people_stats))
        .route(
            "/people/:id",
            get(people::get_person).put(people::update_person).delete(people::delete_person),
        )
        .route("/people/:id/activate", post(people::activate_person))
        .route("/people/:id/deactivate", post(people::deactivate_person))
        .route("/people/:id/loans", get(people::person_loans))
        // Resources
        .route("/resources", get(resources::list_resources).post(resources::create_resource))
        .route("/resources/categories", get(resources::list_categories))
        .route(
            "/resources/:id",
            get(resources::get_resource)
                .put(resources::update_resource)
                .delete(resources::delete_resource),
        )
        .route("/resources/:id/stock", post(resources::adjust_stock))
        .route("/resources/:id/availability", get(resources::availability))
        .route("/resources/:id/loans", get(resources::resource_loans))
        // Loans
        .route("/loans", get(loans::list_loans).post(loans::create_loan))
        .route("/loans/overdue", get(loans::list_overdue))
        .route("/loans/maintenance/sync-stock", post(loans::sync_stock))
        .route("/loans/maintenance/refresh-overdue", post(loans::refresh_overdue))
        .route("/loans/:id", get(loans::get_loan).delete(loans::delete_loan))
        .route("/loans/:id/return", post(loans::return_loan))
        .route("/loans/:id/renew", post(loans::renew_loan))
        .route("/loans/:id/lost", post(loans::mark_lost))
        // System configuration
        .route(
            "/system-config",
            get(system_config::get_config).put(system_config::update_config),
        )
        .route("/system-config/reset", post(system_config::reset_config))
        // Reports
        .route("/reports/summary", get(reports::summary))
        .route("/reports/loans-by-person", get(reports::loans_by_person))
        .route("/reports/loans-by-status", get(reports::loans_by_status))
        .route("/reports/loans-by-year", get(reports::loans_by_year))
        .route("/reports/overdue", get(reports::overdue))
        .route("/reports/top-resources", get(reports::top_resources))
        .route("/reports/inventory", get(reports::inventory))
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_v1)
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors)
}
