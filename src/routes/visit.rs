use axum::{
    Extension, Json, Router,
    body::Body,
    extract::{Query, State},
    http::Request,
    middleware::{self, Next},
    response::Response,
    routing::{get, post, put},
};
use axum_valid::Valid;
use uuid::Uuid;

use crate::{
    dto::visit::{JoinQuery, ModeRequest, VisitResponse},
    error::AppError,
    services::flow_service,
    state::{SharedState, visit::VisitorId},
};

const VISITOR_HEADER: &str = "x-visitor-id";

/// Visitor lifecycle endpoints.
pub fn router(state: SharedState) -> Router<SharedState> {
    Router::new()
        .route("/visits/view", get(current_view))
        .route("/visits/mode", put(select_mode))
        .route_layer(middleware::from_fn_with_state(state, require_visitor))
        .route("/visits", post(open_visit))
}

/// Start a visit, optionally pre-filling the participant PIN from a join link.
#[utoipa::path(
    post,
    path = "/visits",
    tag = "visit",
    params(JoinQuery),
    responses((status = 200, description = "Visit opened", body = VisitResponse))
)]
pub async fn open_visit(
    State(state): State<SharedState>,
    Valid(Query(query)): Valid<Query<JoinQuery>>,
) -> Result<Json<VisitResponse>, AppError> {
    Ok(Json(
        flow_service::open_visit(&state, query.pin.as_deref()).await?,
    ))
}

/// Render the view of the visitor's current mode.
#[utoipa::path(
    get,
    path = "/visits/view",
    tag = "visit",
    params(("X-Visitor-Id" = String, Header, description = "Visitor id returned by POST /visits")),
    responses((status = 200, description = "Current view", body = VisitResponse))
)]
pub async fn current_view(
    State(state): State<SharedState>,
    Extension(VisitorId(id)): Extension<VisitorId>,
) -> Result<Json<VisitResponse>, AppError> {
    Ok(Json(flow_service::current_view(&state, id).await?))
}

/// Switch between participate, create and moderate.
#[utoipa::path(
    put,
    path = "/visits/mode",
    tag = "visit",
    params(("X-Visitor-Id" = String, Header, description = "Visitor id returned by POST /visits")),
    request_body = ModeRequest,
    responses((status = 200, description = "View of the selected mode", body = VisitResponse))
)]
pub async fn select_mode(
    State(state): State<SharedState>,
    Extension(VisitorId(id)): Extension<VisitorId>,
    Valid(Json(payload)): Valid<Json<ModeRequest>>,
) -> Result<Json<VisitResponse>, AppError> {
    Ok(Json(
        flow_service::select_mode(&state, id, payload.mode).await?,
    ))
}

/// Resolve the `X-Visitor-Id` header to a known visitor and expose it as [`VisitorId`].
pub async fn require_visitor(
    State(state): State<SharedState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let raw = req
        .headers()
        .get(VISITOR_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| {
            AppError::Unauthorized("missing visitor header `X-Visitor-Id`".into())
        })?;

    let id = Uuid::parse_str(raw.trim())
        .map_err(|_| AppError::Unauthorized("malformed visitor id".into()))?;
    if !state.has_visitor(id) {
        return Err(AppError::Unauthorized("unknown visitor".into()));
    }

    req.extensions_mut().insert(VisitorId(id));
    Ok(next.run(req).await)
}
