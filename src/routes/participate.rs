use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    middleware,
    routing::{get, post, put},
};
use axum_valid::Valid;

use crate::{
    dto::{
        view::ParticipantSessionView,
        visit::{PinPath, PinRequest, SubmitResponseRequest, VisitResponse},
    },
    error::AppError,
    routes::visit::require_visitor,
    services::flow_service,
    state::{SharedState, visit::VisitorId},
};

/// Participant endpoints plus the public session lookup.
pub fn router(state: SharedState) -> Router<SharedState> {
    Router::new()
        .route("/participate/pin", put(set_pin))
        .route("/participate/responses", post(submit_response))
        .route_layer(middleware::from_fn_with_state(state, require_visitor))
        .route("/sessions/{pin}", get(public_session))
}

/// Enter the PIN of the session to join. A blank PIN clears it.
#[utoipa::path(
    put,
    path = "/participate/pin",
    tag = "participate",
    params(("X-Visitor-Id" = String, Header, description = "Visitor id returned by POST /visits")),
    request_body = PinRequest,
    responses((status = 200, description = "Participant view for the PIN", body = VisitResponse))
)]
pub async fn set_pin(
    State(state): State<SharedState>,
    Extension(VisitorId(id)): Extension<VisitorId>,
    Valid(Json(payload)): Valid<Json<PinRequest>>,
) -> Result<Json<VisitResponse>, AppError> {
    Ok(Json(
        flow_service::set_participant_pin(&state, id, &payload.pin).await?,
    ))
}

/// Answer the question of the session the visitor joined.
#[utoipa::path(
    post,
    path = "/participate/responses",
    tag = "participate",
    params(("X-Visitor-Id" = String, Header, description = "Visitor id returned by POST /visits")),
    request_body = SubmitResponseRequest,
    responses(
        (status = 200, description = "Response recorded", body = VisitResponse),
        (status = 400, description = "Blank response"),
        (status = 404, description = "No session for the visitor's PIN")
    )
)]
pub async fn submit_response(
    State(state): State<SharedState>,
    Extension(VisitorId(id)): Extension<VisitorId>,
    Valid(Json(payload)): Valid<Json<SubmitResponseRequest>>,
) -> Result<Json<VisitResponse>, AppError> {
    Ok(Json(
        flow_service::submit_response(&state, id, &payload.response).await?,
    ))
}

/// Question, participant count and phrase cloud of a session.
#[utoipa::path(
    get,
    path = "/sessions/{pin}",
    tag = "participate",
    params(PinPath),
    responses(
        (status = 200, description = "Session found", body = ParticipantSessionView),
        (status = 400, description = "PIN is not six digits"),
        (status = 404, description = "Unknown PIN")
    )
)]
pub async fn public_session(
    State(state): State<SharedState>,
    Valid(Path(path)): Valid<Path<PinPath>>,
) -> Result<Json<ParticipantSessionView>, AppError> {
    Ok(Json(flow_service::public_session(&state, &path.pin).await?))
}
