use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Live Poll Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::visit::open_visit,
        crate::routes::visit::current_view,
        crate::routes::visit::select_mode,
        crate::routes::participate::set_pin,
        crate::routes::participate::submit_response,
        crate::routes::participate::public_session,
        crate::routes::auth::login,
        crate::routes::auth::logout,
        crate::routes::auth::toggle_change_password,
        crate::routes::auth::change_password,
        crate::routes::moderate::create_session,
        crate::routes::moderate::refresh,
        crate::routes::moderate::end_session,
        crate::routes::moderate::set_auto_refresh,
        crate::routes::moderate::join_qr,
        crate::routes::sse::moderate_stream,
        crate::routes::sse::participant_stream,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::visit::VisitResponse,
            crate::dto::visit::ModeRequest,
            crate::dto::visit::PinRequest,
            crate::dto::visit::SubmitResponseRequest,
            crate::dto::visit::LoginRequest,
            crate::dto::visit::ChangePasswordRequest,
            crate::dto::visit::CreateSessionRequest,
            crate::dto::visit::AutoRefreshRequest,
            crate::dto::view::ViewResponse,
            crate::dto::view::ParticipantSessionView,
            crate::dto::sse::ResponseRecordedEvent,
            crate::state::visit::VisitMode,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "visit", description = "Visitor lifecycle and mode selection"),
        (name = "participate", description = "Joining sessions and answering"),
        (name = "auth", description = "Moderator sign-in and password management"),
        (name = "moderate", description = "Session creation and the moderator dashboard"),
        (name = "sse", description = "Server-sent events streams"),
    )
)]
pub struct ApiDoc;
