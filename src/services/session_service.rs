//! Session creation and PIN lookup.

use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    dao::{models::SessionEntity, poll_store::PollStore},
    dto::validation::PIN_LENGTH,
    error::ServiceError,
    state::SharedState,
};

/// Create a session for `question`, allocating a PIN no other session uses.
///
/// Up to `pin_attempts` candidates are checked in a single store call; when all of them
/// collide the call fails with [`ServiceError::PinSpaceExhausted`] instead of reusing a PIN.
pub async fn create_session(
    state: &SharedState,
    question: &str,
) -> Result<SessionEntity, ServiceError> {
    let candidates = (0..state.config().pin_attempts())
        .map(|_| generate_pin())
        .collect();
    create_session_with_pins(state.store(), question, candidates).await
}

/// Same as [`create_session`] with explicit PIN candidates, tried in order.
pub async fn create_session_with_pins(
    store: &dyn PollStore,
    question: &str,
    candidates: Vec<String>,
) -> Result<SessionEntity, ServiceError> {
    let question = question.trim();
    if question.is_empty() {
        return Err(ServiceError::InvalidInput(
            "please type a valid question".into(),
        ));
    }

    let attempts = u32::try_from(candidates.len()).unwrap_or(u32::MAX);
    match store.create_session(question.to_string(), candidates).await {
        Ok(Some(session)) => {
            info!(pin = %session.pin, session_id = %session.id, "session created");
            Ok(session)
        }
        Ok(None) => {
            warn!(attempts, "every PIN candidate collided with an existing session");
            Err(ServiceError::PinSpaceExhausted { attempts })
        }
        Err(err) => {
            warn!(error = %err, "failed to create session");
            Err(err.into())
        }
    }
}

/// Look a session up by its exact PIN. An unknown PIN is not an error.
pub async fn get_session_by_pin(
    state: &SharedState,
    pin: &str,
) -> Result<Option<SessionEntity>, ServiceError> {
    let pin = pin.trim();
    if pin.is_empty() {
        return Ok(None);
    }

    state
        .store()
        .find_session_by_pin(pin.to_string())
        .await
        .map_err(|err| {
            warn!(%pin, error = %err, "failed to look up session");
            err.into()
        })
}

/// Six digit candidate taken from the leading decimal digits of a random UUID.
///
/// A v4 UUID always has its version bits set, so its integer value has well over six digits.
pub fn generate_pin() -> String {
    Uuid::new_v4()
        .as_u128()
        .to_string()
        .chars()
        .take(PIN_LENGTH)
        .collect()
}

#[cfg(all(test, feature = "sqlite-store"))]
mod tests {
    use super::*;
    use crate::{dto::validation::validate_pin, services::test_support::test_state};

    #[test]
    fn generated_pins_are_six_digits() {
        for _ in 0..200 {
            let pin = generate_pin();
            assert!(validate_pin(&pin).is_ok(), "bad pin {pin}");
        }
    }

    #[tokio::test]
    async fn created_session_is_found_by_its_pin() {
        let state = test_state();
        let session = create_session(&state, "  Favorite color?  ").await.unwrap();
        assert!(validate_pin(&session.pin).is_ok());
        assert_eq!(session.question, "Favorite color?");

        let found = get_session_by_pin(&state, &session.pin).await.unwrap().unwrap();
        assert_eq!(found.id, session.id);
        assert_eq!(found.question, "Favorite color?");
    }

    #[tokio::test]
    async fn blank_question_is_rejected() {
        let state = test_state();
        let err = create_session(&state, "   ").await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn collisions_move_to_the_next_candidate() {
        let state = test_state();
        let first = create_session_with_pins(state.store(), "one", vec!["100000".into()])
            .await
            .unwrap();
        let second = create_session_with_pins(
            state.store(),
            "two",
            vec!["100000".into(), "200000".into()],
        )
        .await
        .unwrap();

        assert_eq!(first.pin, "100000");
        assert_eq!(second.pin, "200000");
    }

    #[tokio::test]
    async fn exhausted_candidates_fail_without_duplicating() {
        let state = test_state();
        create_session_with_pins(state.store(), "one", vec!["100000".into()])
            .await
            .unwrap();

        let err = create_session_with_pins(
            state.store(),
            "two",
            vec!["100000".into(), "100000".into()],
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::PinSpaceExhausted { attempts: 2 }));

        let found = get_session_by_pin(&state, "100000").await.unwrap().unwrap();
        assert_eq!(found.question, "one");
    }

    #[tokio::test]
    async fn unknown_or_blank_pin_is_not_found() {
        let state = test_state();
        assert!(get_session_by_pin(&state, "999999").await.unwrap().is_none());
        assert!(get_session_by_pin(&state, "  ").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn concurrent_sessions_get_distinct_pins() {
        let state = test_state();
        let tasks: Vec<_> = (0..16)
            .map(|i| {
                let state = state.clone();
                tokio::spawn(async move { create_session(&state, &format!("q{i}")).await })
            })
            .collect();

        let mut pins = std::collections::HashSet::new();
        for task in tasks {
            let session = task.await.unwrap().unwrap();
            assert!(pins.insert(session.pin));
        }
    }
}
