use std::{convert::Infallible, time::Duration};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::{Stream, StreamExt};
use tokio::{
    sync::broadcast::{self, error::RecvError},
    time::{self, Instant, MissedTickBehavior},
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    dto::sse::ServerEvent,
    error::ServiceError,
    services::{
        flow_service,
        sse_events::{
            EVENT_MODERATE_VIEW, EVENT_PARTICIPANT_VIEW, EVENT_SESSION_MISSING, named_event,
        },
    },
    state::SharedState,
};

const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

/// Open the moderator dashboard stream of a visitor.
pub fn moderate_stream(
    state: SharedState,
    visitor_id: Uuid,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ServiceError> {
    if !state.has_visitor(visitor_id) {
        return Err(ServiceError::Unauthorized(format!(
            "unknown visitor `{visitor_id}`"
        )));
    }
    info!(%visitor_id, "New moderate SSE connection");
    Ok(to_sse_stream(moderate_updates(state, visitor_id)))
}

/// Open the participant stream of the session with `pin`.
pub async fn participant_stream(
    state: SharedState,
    pin: String,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ServiceError> {
    let updates = participant_updates(state, pin).await?;
    Ok(to_sse_stream(updates))
}

/// Dashboard events: one on connect, one per recorded response of the held session and one
/// per auto-refresh tick while auto-refresh is on. Ends when the visitor is gone.
pub fn moderate_updates(state: SharedState, visitor_id: Uuid) -> impl Stream<Item = ServerEvent> {
    async_stream::stream! {
        let period = state.config().auto_refresh_interval();
        let mut ticker = time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut watched: Option<Uuid> = None;
        let mut receiver: Option<broadcast::Receiver<ServerEvent>> = None;
        let mut render = true;

        loop {
            let Ok(visitor) = state.visitor(visitor_id) else {
                break;
            };
            let held = visitor.moderated().map(|session| session.session_id);
            if held != watched {
                receiver = held.map(|session_id| state.live().subscribe(session_id));
                if let Some(previous) = watched {
                    state.live().release(previous);
                }
                watched = held;
            }

            if render {
                match flow_service::moderate_view(&state, visitor_id).await {
                    Ok(view) => {
                        if let Some(event) = named_event(EVENT_MODERATE_VIEW, &view) {
                            yield event;
                        }
                    }
                    Err(ServiceError::NotFound(_)) => break,
                    Err(err) => warn!(%visitor_id, error = %err, "failed to render moderate view"),
                }
            }

            render = tokio::select! {
                _ = ticker.tick() => state
                    .visitor(visitor_id)
                    .map(|visitor| visitor.auto_refresh())
                    .unwrap_or(true),
                changed = next_notification(&mut receiver) => changed,
            };
        }

        info!(%visitor_id, "Moderate SSE stream ended");
    }
}

/// Participant view events of one session: one on connect and one per recorded response.
pub async fn participant_updates(
    state: SharedState,
    pin: String,
) -> Result<impl Stream<Item = ServerEvent>, ServiceError> {
    let initial = flow_service::public_session(&state, &pin).await?;
    let mut receiver = state.live().subscribe(initial.session_id);
    info!(%pin, session_id = %initial.session_id, "New participant SSE connection");

    Ok(async_stream::stream! {
        if let Some(event) = named_event(EVENT_PARTICIPANT_VIEW, &initial) {
            yield event;
        }

        loop {
            match receiver.recv().await {
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => debug!(skipped, "participant stream lagged"),
                Err(RecvError::Closed) => break,
            }

            match flow_service::participant_session(&state, &pin).await {
                Ok(Some(view)) => {
                    if let Some(event) = named_event(EVENT_PARTICIPANT_VIEW, &view) {
                        yield event;
                    }
                }
                Ok(None) => {
                    yield ServerEvent::new(Some(EVENT_SESSION_MISSING.into()), pin.clone());
                    break;
                }
                Err(err) => warn!(%pin, error = %err, "failed to render participant view"),
            }
        }

        info!(%pin, "Participant SSE stream ended");
    })
}

/// Wait for the next change notification. Without a receiver this never resolves.
async fn next_notification(receiver: &mut Option<broadcast::Receiver<ServerEvent>>) -> bool {
    let Some(rx) = receiver.as_mut() else {
        return futures::future::pending().await;
    };

    match rx.recv().await {
        Ok(_) => true,
        Err(RecvError::Lagged(skipped)) => {
            debug!(skipped, "moderate stream lagged");
            true
        }
        Err(RecvError::Closed) => {
            *receiver = None;
            false
        }
    }
}

/// Wrap a stream of server events into an SSE response with keep-alive comments.
fn to_sse_stream(
    updates: impl Stream<Item = ServerEvent> + Send + 'static,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = updates.map(|payload| {
        let mut event = Event::default().data(payload.data);
        if let Some(name) = payload.event {
            event = event.event(name);
        }
        Ok(event)
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(KEEP_ALIVE_INTERVAL)
            .text("keep-alive"),
    )
}

#[cfg(all(test, feature = "sqlite-store"))]
mod tests {
    use std::pin::pin;

    use super::*;
    use crate::{
        config::AppConfig,
        services::{
            response_service::add_response,
            session_service::create_session,
            test_support::{TEST_PASSWORD, test_state, test_state_with},
        },
    };

    const WAIT: Duration = Duration::from_secs(2);

    #[tokio::test]
    async fn participant_stream_follows_new_responses() {
        let state = test_state();
        let session = create_session(&state, "Favorite color?").await.unwrap();
        let mut updates = pin!(
            participant_updates(state.clone(), session.pin.clone())
                .await
                .unwrap()
        );

        let first = updates.next().await.unwrap();
        assert_eq!(first.event.as_deref(), Some(EVENT_PARTICIPANT_VIEW));
        assert!(first.data.contains("\"participant_count\":0"));

        add_response(&state, session.id, "Red").await.unwrap();
        let second = time::timeout(WAIT, updates.next()).await.unwrap().unwrap();
        assert!(second.data.contains("\"participant_count\":1"));
    }

    #[tokio::test]
    async fn participant_stream_requires_a_known_pin() {
        let state = test_state();
        let result = participant_updates(state, "123456".into()).await;
        assert!(matches!(result, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn moderate_stream_pushes_on_new_responses() {
        let state = test_state();
        let visit = flow_service::open_visit(&state, None).await.unwrap();
        let id = visit.visitor_id;
        flow_service::login(&state, id, TEST_PASSWORD).await.unwrap();
        flow_service::create_session(&state, id, "Favorite color?")
            .await
            .unwrap();
        let session_id = state.visitor(id).unwrap().moderated().unwrap().session_id;

        let mut updates = pin!(moderate_updates(state.clone(), id));
        let first = updates.next().await.unwrap();
        assert_eq!(first.event.as_deref(), Some(EVENT_MODERATE_VIEW));
        assert!(first.data.contains("\"total\":0"));

        add_response(&state, session_id, "Red").await.unwrap();
        let second = time::timeout(WAIT, updates.next()).await.unwrap().unwrap();
        assert!(second.data.contains("\"total\":1"));
        assert!(second.data.contains("Red (1x)"));
    }

    #[tokio::test]
    async fn auto_refresh_ticks_rerender_until_disabled() {
        let period = Duration::from_millis(50);
        let state = test_state_with(AppConfig::default().with_auto_refresh_interval(period));
        let id = flow_service::open_visit(&state, None)
            .await
            .unwrap()
            .visitor_id;
        flow_service::login(&state, id, TEST_PASSWORD).await.unwrap();
        flow_service::create_session(&state, id, "Favorite color?")
            .await
            .unwrap();

        let mut updates = pin!(moderate_updates(state.clone(), id));
        let first = updates.next().await.unwrap();
        assert_eq!(first.event.as_deref(), Some(EVENT_MODERATE_VIEW));

        let ticked = time::timeout(WAIT, updates.next()).await.unwrap().unwrap();
        assert_eq!(ticked.event.as_deref(), Some(EVENT_MODERATE_VIEW));
        assert!(ticked.data.contains("\"total\":0"));

        flow_service::set_auto_refresh(&state, id, false)
            .await
            .unwrap();
        assert!(time::timeout(period * 5, updates.next()).await.is_err());
    }

    #[tokio::test]
    async fn moderate_stream_prompts_signed_out_visitors() {
        let state = test_state();
        let id = flow_service::open_visit(&state, None)
            .await
            .unwrap()
            .visitor_id;

        let mut updates = pin!(moderate_updates(state, id));
        let first = updates.next().await.unwrap();
        assert!(first.data.contains("\"view\":\"auth_required\""));
    }

    #[tokio::test]
    async fn unknown_visitor_cannot_open_a_moderate_stream() {
        let state = test_state();
        assert!(matches!(
            moderate_stream(state, Uuid::new_v4()),
            Err(ServiceError::Unauthorized(_))
        ));
    }
}
