//! Visit-scoped state: what one visitor is looking at and whether they are signed in as
//! moderator. Nothing here is persisted; contexts are lost on restart.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Identifier of a visitor context, resolved from the `X-Visitor-Id` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VisitorId(pub Uuid);

/// Screen a visitor has selected. Exactly one is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum VisitMode {
    /// Join a session by PIN and answer its question.
    #[default]
    Participate,
    /// Moderator screen creating a new session.
    Create,
    /// Moderator dashboard of the held session.
    Moderate,
}

impl VisitMode {
    /// Whether the mode is restricted to authenticated moderators.
    pub fn requires_moderator(self) -> bool {
        matches!(self, VisitMode::Create | VisitMode::Moderate)
    }
}

/// Moderator authentication of a single visitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthState {
    #[default]
    Unauthenticated,
    Authenticated,
}

/// Session currently watched by a moderator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeratedSession {
    pub session_id: Uuid,
    pub pin: String,
}

/// Per-visitor state threaded through the flow controller.
#[derive(Debug, Clone)]
pub struct VisitorContext {
    id: Uuid,
    mode: VisitMode,
    auth: AuthState,
    moderated: Option<ModeratedSession>,
    auto_refresh: bool,
    participant_pin: String,
    show_change_password: bool,
    last_seen: Instant,
}

impl VisitorContext {
    /// Fresh context in participate mode, optionally pre-filled from a join link.
    pub fn new(id: Uuid, join_pin: Option<&str>) -> Self {
        Self {
            id,
            mode: VisitMode::default(),
            auth: AuthState::default(),
            moderated: None,
            auto_refresh: true,
            participant_pin: join_pin.map(str::trim).unwrap_or_default().to_string(),
            show_change_password: false,
            last_seen: Instant::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Last time the context was read or updated.
    pub fn last_seen(&self) -> Instant {
        self.last_seen
    }

    pub fn touch(&mut self, now: Instant) {
        self.last_seen = now;
    }

    /// Whether the context went untouched for longer than `timeout` as of `now`.
    pub fn is_idle(&self, now: Instant, timeout: Duration) -> bool {
        now.saturating_duration_since(self.last_seen) > timeout
    }

    pub fn mode(&self) -> VisitMode {
        self.mode
    }

    pub fn select_mode(&mut self, mode: VisitMode) {
        self.mode = mode;
    }

    pub fn is_authenticated(&self) -> bool {
        self.auth == AuthState::Authenticated
    }

    pub fn authenticate(&mut self) {
        self.auth = AuthState::Authenticated;
    }

    /// Drop moderator rights. The held session reference goes with them.
    pub fn sign_out(&mut self) {
        self.auth = AuthState::Unauthenticated;
        self.moderated = None;
        self.show_change_password = false;
    }

    pub fn moderated(&self) -> Option<&ModeratedSession> {
        self.moderated.as_ref()
    }

    /// Hold a freshly created session and jump to the dashboard.
    pub fn start_moderating(&mut self, session_id: Uuid, pin: String) {
        self.moderated = Some(ModeratedSession { session_id, pin });
        self.mode = VisitMode::Moderate;
    }

    /// "End session": forget the held session and go back to the create screen. Stored
    /// data is untouched.
    pub fn end_moderation(&mut self) {
        self.moderated = None;
        self.mode = VisitMode::Create;
    }

    /// Forget a held session that no longer resolves, staying on the current screen.
    pub fn forget_session(&mut self) {
        self.moderated = None;
    }

    pub fn auto_refresh(&self) -> bool {
        self.auto_refresh
    }

    pub fn set_auto_refresh(&mut self, enabled: bool) {
        self.auto_refresh = enabled;
    }

    pub fn participant_pin(&self) -> &str {
        &self.participant_pin
    }

    pub fn set_participant_pin(&mut self, pin: &str) {
        self.participant_pin = pin.trim().to_string();
    }

    pub fn show_change_password(&self) -> bool {
        self.show_change_password
    }

    /// Flip the password-change form visibility, returning the new value.
    pub fn toggle_change_password(&mut self) -> bool {
        self.show_change_password = !self.show_change_password;
        self.show_change_password
    }

    pub fn hide_change_password(&mut self) {
        self.show_change_password = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> VisitorContext {
        VisitorContext::new(Uuid::new_v4(), None)
    }

    #[test]
    fn new_context_defaults_to_participation() {
        let ctx = context();
        assert_eq!(ctx.mode(), VisitMode::Participate);
        assert!(!ctx.is_authenticated());
        assert!(ctx.auto_refresh());
        assert!(ctx.moderated().is_none());
        assert_eq!(ctx.participant_pin(), "");
    }

    #[test]
    fn join_link_pin_is_seeded_trimmed() {
        let ctx = VisitorContext::new(Uuid::new_v4(), Some(" 123456 "));
        assert_eq!(ctx.participant_pin(), "123456");
    }

    #[test]
    fn moderation_lifecycle() {
        let mut ctx = context();
        ctx.authenticate();
        ctx.select_mode(VisitMode::Create);

        let session_id = Uuid::new_v4();
        ctx.start_moderating(session_id, "424242".into());
        assert_eq!(ctx.mode(), VisitMode::Moderate);
        assert_eq!(
            ctx.moderated(),
            Some(&ModeratedSession {
                session_id,
                pin: "424242".into()
            })
        );

        ctx.end_moderation();
        assert_eq!(ctx.mode(), VisitMode::Create);
        assert!(ctx.moderated().is_none());
        assert!(ctx.is_authenticated());
    }

    #[test]
    fn sign_out_drops_held_session() {
        let mut ctx = context();
        ctx.authenticate();
        ctx.start_moderating(Uuid::new_v4(), "111111".into());
        ctx.toggle_change_password();

        ctx.sign_out();
        assert!(!ctx.is_authenticated());
        assert!(ctx.moderated().is_none());
        assert!(!ctx.show_change_password());
    }

    #[test]
    fn change_password_form_toggles() {
        let mut ctx = context();
        assert!(ctx.toggle_change_password());
        assert!(!ctx.toggle_change_password());
        ctx.toggle_change_password();
        ctx.hide_change_password();
        assert!(!ctx.show_change_password());
    }

    #[test]
    fn idleness_is_measured_from_the_last_touch() {
        let mut ctx = context();
        let timeout = Duration::from_secs(60);
        let later = ctx.last_seen() + Duration::from_secs(61);
        assert!(!ctx.is_idle(ctx.last_seen(), timeout));
        assert!(ctx.is_idle(later, timeout));

        ctx.touch(later);
        assert!(!ctx.is_idle(later + Duration::from_secs(30), timeout));
    }

    #[test]
    fn only_moderator_modes_require_auth() {
        assert!(!VisitMode::Participate.requires_moderator());
        assert!(VisitMode::Create.requires_moderator());
        assert!(VisitMode::Moderate.requires_moderator());
    }
}
