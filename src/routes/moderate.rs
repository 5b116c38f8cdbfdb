use axum::{
    Extension, Json, Router,
    extract::State,
    http::header,
    middleware,
    response::IntoResponse,
    routing::{get, post, put},
};
use axum_valid::Valid;

use crate::{
    dto::visit::{AutoRefreshRequest, CreateSessionRequest, VisitResponse},
    error::AppError,
    routes::visit::require_visitor,
    services::flow_service,
    state::{SharedState, visit::VisitorId},
};

/// Moderator-only endpoints.
pub fn router(state: SharedState) -> Router<SharedState> {
    Router::new()
        .route("/sessions", post(create_session))
        .route("/moderate/refresh", post(refresh))
        .route("/moderate/end", post(end_session))
        .route("/moderate/auto-refresh", put(set_auto_refresh))
        .route("/moderate/qr.svg", get(join_qr))
        .route_layer(middleware::from_fn_with_state(state, require_visitor))
}

/// Create a session and open its dashboard.
#[utoipa::path(
    post,
    path = "/sessions",
    tag = "moderate",
    params(("X-Visitor-Id" = String, Header, description = "Visitor id returned by POST /visits")),
    request_body = CreateSessionRequest,
    responses(
        (status = 200, description = "Session created", body = VisitResponse),
        (status = 400, description = "Blank question"),
        (status = 409, description = "No free PIN found")
    )
)]
pub async fn create_session(
    State(state): State<SharedState>,
    Extension(VisitorId(id)): Extension<VisitorId>,
    Valid(Json(payload)): Valid<Json<CreateSessionRequest>>,
) -> Result<Json<VisitResponse>, AppError> {
    Ok(Json(
        flow_service::create_session(&state, id, &payload.question).await?,
    ))
}

/// Recompute the dashboard.
#[utoipa::path(
    post,
    path = "/moderate/refresh",
    tag = "moderate",
    params(("X-Visitor-Id" = String, Header, description = "Visitor id returned by POST /visits")),
    responses((status = 200, description = "Fresh view", body = VisitResponse))
)]
pub async fn refresh(
    State(state): State<SharedState>,
    Extension(VisitorId(id)): Extension<VisitorId>,
) -> Result<Json<VisitResponse>, AppError> {
    Ok(Json(flow_service::refresh(&state, id).await?))
}

/// Stop moderating the held session and return to the create screen.
#[utoipa::path(
    post,
    path = "/moderate/end",
    tag = "moderate",
    params(("X-Visitor-Id" = String, Header, description = "Visitor id returned by POST /visits")),
    responses((status = 200, description = "Session released", body = VisitResponse))
)]
pub async fn end_session(
    State(state): State<SharedState>,
    Extension(VisitorId(id)): Extension<VisitorId>,
) -> Result<Json<VisitResponse>, AppError> {
    Ok(Json(flow_service::end_session(&state, id).await?))
}

/// Turn periodic dashboard pushes on or off.
#[utoipa::path(
    put,
    path = "/moderate/auto-refresh",
    tag = "moderate",
    params(("X-Visitor-Id" = String, Header, description = "Visitor id returned by POST /visits")),
    request_body = AutoRefreshRequest,
    responses((status = 200, description = "Flag updated", body = VisitResponse))
)]
pub async fn set_auto_refresh(
    State(state): State<SharedState>,
    Extension(VisitorId(id)): Extension<VisitorId>,
    Valid(Json(payload)): Valid<Json<AutoRefreshRequest>>,
) -> Result<Json<VisitResponse>, AppError> {
    Ok(Json(
        flow_service::set_auto_refresh(&state, id, payload.enabled).await?,
    ))
}

/// QR code of the held session's join link.
#[utoipa::path(
    get,
    path = "/moderate/qr.svg",
    tag = "moderate",
    params(("X-Visitor-Id" = String, Header, description = "Visitor id returned by POST /visits")),
    responses(
        (status = 200, description = "SVG QR code", content_type = "image/svg+xml", body = String),
        (status = 409, description = "No held session")
    )
)]
pub async fn join_qr(
    State(state): State<SharedState>,
    Extension(VisitorId(id)): Extension<VisitorId>,
) -> Result<impl IntoResponse, AppError> {
    let svg = flow_service::join_qr_svg(&state, id)?;
    Ok(([(header::CONTENT_TYPE, "image/svg+xml")], svg))
}
