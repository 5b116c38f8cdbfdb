use axum::{
    Extension, Json, Router,
    extract::State,
    middleware,
    routing::post,
};
use axum_valid::Valid;

use crate::{
    dto::visit::{ChangePasswordRequest, LoginRequest, VisitResponse},
    error::AppError,
    routes::visit::require_visitor,
    services::flow_service,
    state::{SharedState, visit::VisitorId},
};

/// Moderator sign-in and credential management.
pub fn router(state: SharedState) -> Router<SharedState> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/password/toggle", post(toggle_change_password))
        .route("/auth/password", post(change_password))
        .route_layer(middleware::from_fn_with_state(state, require_visitor))
}

/// Sign the visitor in as moderator.
#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "auth",
    params(("X-Visitor-Id" = String, Header, description = "Visitor id returned by POST /visits")),
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in", body = VisitResponse),
        (status = 401, description = "Incorrect password")
    )
)]
pub async fn login(
    State(state): State<SharedState>,
    Extension(VisitorId(id)): Extension<VisitorId>,
    Valid(Json(payload)): Valid<Json<LoginRequest>>,
) -> Result<Json<VisitResponse>, AppError> {
    Ok(Json(
        flow_service::login(&state, id, &payload.password).await?,
    ))
}

/// Drop moderator rights and the held session.
#[utoipa::path(
    post,
    path = "/auth/logout",
    tag = "auth",
    params(("X-Visitor-Id" = String, Header, description = "Visitor id returned by POST /visits")),
    responses((status = 200, description = "Signed out", body = VisitResponse))
)]
pub async fn logout(
    State(state): State<SharedState>,
    Extension(VisitorId(id)): Extension<VisitorId>,
) -> Result<Json<VisitResponse>, AppError> {
    Ok(Json(flow_service::logout(&state, id).await?))
}

/// Show or hide the change-password form.
#[utoipa::path(
    post,
    path = "/auth/password/toggle",
    tag = "auth",
    params(("X-Visitor-Id" = String, Header, description = "Visitor id returned by POST /visits")),
    responses((status = 200, description = "Form toggled", body = VisitResponse))
)]
pub async fn toggle_change_password(
    State(state): State<SharedState>,
    Extension(VisitorId(id)): Extension<VisitorId>,
) -> Result<Json<VisitResponse>, AppError> {
    Ok(Json(flow_service::toggle_change_password(&state, id).await?))
}

/// Replace the moderator password.
#[utoipa::path(
    post,
    path = "/auth/password",
    tag = "auth",
    params(("X-Visitor-Id" = String, Header, description = "Visitor id returned by POST /visits")),
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = VisitResponse),
        (status = 400, description = "Mismatch or too short"),
        (status = 401, description = "Current password incorrect or not signed in")
    )
)]
pub async fn change_password(
    State(state): State<SharedState>,
    Extension(VisitorId(id)): Extension<VisitorId>,
    Valid(Json(payload)): Valid<Json<ChangePasswordRequest>>,
) -> Result<Json<VisitResponse>, AppError> {
    Ok(Json(
        flow_service::change_password(
            &state,
            id,
            &payload.current,
            &payload.new,
            &payload.confirm,
        )
        .await?,
    ))
}
