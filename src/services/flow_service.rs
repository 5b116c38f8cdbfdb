//! Per-visitor flow: mode selection, sign-in, the participant and moderator screens and the
//! actions available on each of them. Every action returns the freshly rendered view.

use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    dto::{
        view::{
            AuthRequiredView, CreateView, ModerateView, ModeratedSessionView,
            ParticipantSessionView, ParticipateView, ViewResponse, WordCloudDto,
        },
        visit::VisitResponse,
    },
    error::ServiceError,
    services::{
        aggregation::{CHART_SIZE, aggregate},
        join_link::{join_link, qr_svg},
        response_service, session_service, word_cloud,
    },
    state::{
        SharedState,
        visit::{VisitMode, VisitorContext},
    },
};

const ENTER_PIN: &str = "enter the session PIN to begin";
const INVALID_PIN: &str = "invalid PIN, check the code with the moderator";
const WAITING_FOR_CLOUD: &str = "waiting for more responses to build the word cloud";
const WAITING_FOR_RESPONSES: &str = "waiting for participant responses";
const NO_ACTIVE_SESSION: &str = "no active session, create a new session first";
const SESSION_NOT_FOUND: &str = "session not found";
const SIGN_IN_TO_CREATE: &str = "enter the moderator password to create a session";
const SIGN_IN_TO_MODERATE: &str = "enter the moderator password to open the moderation panel";

/// Register a new visitor, optionally arriving through a join link.
pub async fn open_visit(
    state: &SharedState,
    join_pin: Option<&str>,
) -> Result<VisitResponse, ServiceError> {
    let visitor = state.open_visitor(join_pin);
    info!(visitor_id = %visitor.id(), "visit opened");
    respond(state, visitor.id()).await
}

/// Render the view of the visitor's current mode.
pub async fn current_view(state: &SharedState, id: Uuid) -> Result<VisitResponse, ServiceError> {
    respond(state, id).await
}

pub async fn select_mode(
    state: &SharedState,
    id: Uuid,
    mode: VisitMode,
) -> Result<VisitResponse, ServiceError> {
    state.update_visitor(id, |visitor| visitor.select_mode(mode))?;
    respond(state, id).await
}

pub async fn set_participant_pin(
    state: &SharedState,
    id: Uuid,
    pin: &str,
) -> Result<VisitResponse, ServiceError> {
    state.update_visitor(id, |visitor| visitor.set_participant_pin(pin))?;
    respond(state, id).await
}

/// Submit a response to the session of the visitor's participant PIN.
pub async fn submit_response(
    state: &SharedState,
    id: Uuid,
    text: &str,
) -> Result<VisitResponse, ServiceError> {
    let visitor = state.visitor(id)?;
    let pin = visitor.participant_pin();
    if pin.is_empty() {
        return Err(ServiceError::InvalidState(ENTER_PIN.into()));
    }

    let session = session_service::get_session_by_pin(state, pin)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("no session with PIN `{pin}`")))?;
    response_service::add_response(state, session.id, text).await?;

    Ok(respond(state, id)
        .await?
        .with_notice("response submitted, thank you for participating"))
}

/// Sign the visitor in as moderator. Other visitors are not affected.
pub async fn login(
    state: &SharedState,
    id: Uuid,
    password: &str,
) -> Result<VisitResponse, ServiceError> {
    state.visitor(id)?;
    if !state.auth().authenticate(state.store(), password).await? {
        warn!(visitor_id = %id, "moderator sign-in rejected");
        return Err(ServiceError::Unauthorized("incorrect password".into()));
    }

    state.update_visitor(id, VisitorContext::authenticate)?;
    info!(visitor_id = %id, "moderator signed in");
    Ok(respond(state, id).await?.with_notice("authenticated"))
}

pub async fn logout(state: &SharedState, id: Uuid) -> Result<VisitResponse, ServiceError> {
    state.update_visitor(id, VisitorContext::sign_out)?;
    info!(visitor_id = %id, "moderator signed out");
    respond(state, id).await
}

/// Expand or collapse the change-password form of the create screen.
pub async fn toggle_change_password(
    state: &SharedState,
    id: Uuid,
) -> Result<VisitResponse, ServiceError> {
    ensure_moderator(state, id)?;
    state.update_visitor(id, VisitorContext::toggle_change_password)?;
    respond(state, id).await
}

pub async fn change_password(
    state: &SharedState,
    id: Uuid,
    current: &str,
    new: &str,
    confirm: &str,
) -> Result<VisitResponse, ServiceError> {
    ensure_moderator(state, id)?;
    state
        .auth()
        .change_password(state.store(), current, new, confirm)
        .await?;
    state.update_visitor(id, VisitorContext::hide_change_password)?;
    Ok(respond(state, id).await?.with_notice("password changed"))
}

/// Create a session and move the visitor onto its dashboard.
pub async fn create_session(
    state: &SharedState,
    id: Uuid,
    question: &str,
) -> Result<VisitResponse, ServiceError> {
    ensure_moderator(state, id)?;
    let session = session_service::create_session(state, question).await?;
    let notice = format!("session created, PIN {}", session.pin);
    state.update_visitor(id, |visitor| {
        visitor.start_moderating(session.id, session.pin.clone())
    })?;
    Ok(respond(state, id).await?.with_notice(notice))
}

/// Recompute the dashboard on demand.
pub async fn refresh(state: &SharedState, id: Uuid) -> Result<VisitResponse, ServiceError> {
    ensure_moderator(state, id)?;
    respond(state, id).await
}

/// Stop moderating the held session. Its data stays in the store.
pub async fn end_session(state: &SharedState, id: Uuid) -> Result<VisitResponse, ServiceError> {
    let visitor = ensure_moderator(state, id)?;
    if let Some(held) = visitor.moderated() {
        info!(pin = %held.pin, session_id = %held.session_id, "session ended by moderator");
    }
    state.update_visitor(id, VisitorContext::end_moderation)?;
    respond(state, id).await
}

pub async fn set_auto_refresh(
    state: &SharedState,
    id: Uuid,
    enabled: bool,
) -> Result<VisitResponse, ServiceError> {
    ensure_moderator(state, id)?;
    state.update_visitor(id, |visitor| visitor.set_auto_refresh(enabled))?;
    respond(state, id).await
}

/// SVG QR code of the held session's join link.
pub fn join_qr_svg(state: &SharedState, id: Uuid) -> Result<String, ServiceError> {
    let visitor = ensure_moderator(state, id)?;
    let held = visitor
        .moderated()
        .ok_or_else(|| ServiceError::InvalidState(NO_ACTIVE_SESSION.into()))?;
    qr_svg(&join_link(state.config().join_base_url(), &held.pin))
}

/// Dashboard of the visitor regardless of the selected mode, or the sign-in prompt.
pub async fn moderate_view(state: &SharedState, id: Uuid) -> Result<ViewResponse, ServiceError> {
    let visitor = state.visitor(id)?;
    if !visitor.is_authenticated() {
        return Ok(auth_required(VisitMode::Moderate));
    }
    Ok(ViewResponse::Moderate(
        build_moderate_view(state, &visitor).await?,
    ))
}

/// Question, participant count and cloud for `pin`, or `None` when no session has it.
pub async fn participant_session(
    state: &SharedState,
    pin: &str,
) -> Result<Option<ParticipantSessionView>, ServiceError> {
    let Some(session) = session_service::get_session_by_pin(state, pin).await? else {
        return Ok(None);
    };

    let responses = response_service::get_responses(state, session.id).await?;
    let cloud = word_cloud::build(&responses);
    Ok(Some(ParticipantSessionView {
        session_id: session.id,
        pin: session.pin,
        question: session.question,
        participant_count: responses.len(),
        word_cloud: cloud.as_ref().map(WordCloudDto::from),
    }))
}

/// Same as [`participant_session`] but unknown PINs are an error.
pub async fn public_session(
    state: &SharedState,
    pin: &str,
) -> Result<ParticipantSessionView, ServiceError> {
    participant_session(state, pin)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("no session with PIN `{pin}`")))
}

async fn respond(state: &SharedState, id: Uuid) -> Result<VisitResponse, ServiceError> {
    let view = render(state, id).await?;
    // Rendering may clear a stale session, so read the context afterwards.
    let visitor = state.visitor(id)?;
    Ok(VisitResponse {
        visitor_id: id,
        mode: visitor.mode(),
        authenticated: visitor.is_authenticated(),
        notice: None,
        view,
    })
}

async fn render(state: &SharedState, id: Uuid) -> Result<ViewResponse, ServiceError> {
    let visitor = state.visitor(id)?;
    let mode = visitor.mode();
    if mode.requires_moderator() && !visitor.is_authenticated() {
        return Ok(auth_required(mode));
    }

    Ok(match mode {
        VisitMode::Participate => {
            ViewResponse::Participate(participate_view(state, visitor.participant_pin()).await?)
        }
        VisitMode::Create => ViewResponse::Create(CreateView {
            show_change_password: visitor.show_change_password(),
            min_password_length: state.auth().config().min_password_length(),
        }),
        VisitMode::Moderate => ViewResponse::Moderate(build_moderate_view(state, &visitor).await?),
    })
}

async fn participate_view(state: &SharedState, pin: &str) -> Result<ParticipateView, ServiceError> {
    if pin.trim().is_empty() {
        return Ok(ParticipateView {
            pin: pin.to_string(),
            session: None,
            message: Some(ENTER_PIN.into()),
        });
    }

    let view = match participant_session(state, pin).await? {
        Some(session) => ParticipateView {
            pin: pin.to_string(),
            message: session
                .word_cloud
                .is_none()
                .then(|| WAITING_FOR_CLOUD.to_string()),
            session: Some(session),
        },
        None => ParticipateView {
            pin: pin.to_string(),
            session: None,
            message: Some(INVALID_PIN.into()),
        },
    };
    Ok(view)
}

async fn build_moderate_view(
    state: &SharedState,
    visitor: &VisitorContext,
) -> Result<ModerateView, ServiceError> {
    let mut view = ModerateView {
        session: None,
        message: None,
        auto_refresh: visitor.auto_refresh(),
        refresh_interval_secs: state.config().auto_refresh_interval().as_secs(),
    };

    let Some(held) = visitor.moderated() else {
        view.message = Some(NO_ACTIVE_SESSION.into());
        return Ok(view);
    };

    let Some(session) = session_service::get_session_by_pin(state, &held.pin).await? else {
        warn!(pin = %held.pin, session_id = %held.session_id, "held session no longer exists");
        state.update_visitor(visitor.id(), VisitorContext::forget_session)?;
        view.message = Some(SESSION_NOT_FOUND.into());
        return Ok(view);
    };

    let responses = response_service::get_responses(state, session.id).await?;
    let stats = aggregate(&responses);
    let cloud = word_cloud::build(&responses);
    let link = join_link(state.config().join_base_url(), &session.pin);

    if stats.total == 0 {
        view.message = Some(WAITING_FOR_RESPONSES.into());
    }
    view.session = Some(ModeratedSessionView::new(
        session,
        link,
        &stats,
        CHART_SIZE,
        cloud.as_ref(),
    ));
    Ok(view)
}

fn auth_required(mode: VisitMode) -> ViewResponse {
    let message = match mode {
        VisitMode::Create => SIGN_IN_TO_CREATE,
        _ => SIGN_IN_TO_MODERATE,
    };
    ViewResponse::AuthRequired(AuthRequiredView {
        mode,
        message: message.into(),
    })
}

fn ensure_moderator(state: &SharedState, id: Uuid) -> Result<VisitorContext, ServiceError> {
    let visitor = state.visitor(id)?;
    if visitor.is_authenticated() {
        Ok(visitor)
    } else {
        Err(ServiceError::Unauthorized(
            "moderator sign-in required".into(),
        ))
    }
}
