use std::convert::Infallible;

use axum::{
    Router,
    extract::{Path, Query, State},
    response::sse::{Event, Sse},
    routing::get,
};
use axum_valid::Valid;
use futures::Stream;

use crate::{
    dto::visit::{PinPath, SseVisitorQuery},
    error::AppError,
    services::sse_service,
    state::SharedState,
};

#[utoipa::path(
    get,
    path = "/sse/moderate",
    tag = "sse",
    params(SseVisitorQuery),
    responses(
        (status = 200, description = "Moderator dashboard stream", content_type = "text/event-stream", body = String),
        (status = 401, description = "Unknown visitor")
    )
)]
/// Push the moderator dashboard on connect, on new responses and on auto-refresh ticks.
pub async fn moderate_stream(
    State(state): State<SharedState>,
    Query(query): Query<SseVisitorQuery>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    Ok(sse_service::moderate_stream(state, query.visitor)?)
}

#[utoipa::path(
    get,
    path = "/sse/sessions/{pin}",
    tag = "sse",
    params(PinPath),
    responses(
        (status = 200, description = "Participant view stream", content_type = "text/event-stream", body = String),
        (status = 404, description = "Unknown PIN")
    )
)]
/// Push the participant view of a session whenever it receives a response.
pub async fn participant_stream(
    State(state): State<SharedState>,
    Valid(Path(path)): Valid<Path<PinPath>>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    Ok(sse_service::participant_stream(state, path.pin).await?)
}

/// Configure the SSE endpoints.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new()
        .route("/sse/moderate", get(moderate_stream))
        .route("/sse/sessions/{pin}", get(participant_stream))
}
