//! Requests and envelopes of the visitor-facing routes.

use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{dto::validation::validate_pin, dto::view::ViewResponse, state::visit::VisitMode};

/// Visitor envelope returned by every visitor route.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct VisitResponse {
    pub visitor_id: Uuid,
    pub mode: VisitMode,
    pub authenticated: bool,
    /// One-off confirmation of the action that produced this response.
    pub notice: Option<String>,
    pub view: ViewResponse,
}

impl VisitResponse {
    pub fn with_notice(mut self, notice: impl Into<String>) -> Self {
        self.notice = Some(notice.into());
        self
    }
}

/// Query string of `POST /visits`, carrying the PIN of a join link.
#[derive(Debug, Default, Deserialize, IntoParams, Validate)]
#[into_params(parameter_in = Query)]
pub struct JoinQuery {
    #[validate(length(max = 32))]
    pub pin: Option<String>,
}

/// Query string identifying the visitor of an SSE stream.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SseVisitorQuery {
    pub visitor: Uuid,
}

/// PIN path segment of the public session routes.
#[derive(Debug, Deserialize, IntoParams, Validate)]
#[into_params(parameter_in = Path)]
pub struct PinPath {
    /// Six digit session PIN.
    #[validate(custom(function = "validate_pin"))]
    pub pin: String,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct ModeRequest {
    pub mode: VisitMode,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct PinRequest {
    /// Blank clears the PIN.
    #[validate(length(max = 32))]
    pub pin: String,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct SubmitResponseRequest {
    #[validate(length(max = 1000))]
    pub response: String,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct LoginRequest {
    #[validate(length(max = 256))]
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct ChangePasswordRequest {
    #[validate(length(max = 256))]
    pub current: String,
    #[validate(length(max = 256))]
    pub new: String,
    #[validate(length(max = 256))]
    pub confirm: String,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateSessionRequest {
    #[validate(length(max = 1000))]
    pub question: String,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct AutoRefreshRequest {
    pub enabled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pin_path_requires_six_digits() {
        assert!(PinPath { pin: "123456".into() }.validate().is_ok());
        assert!(PinPath { pin: "12345".into() }.validate().is_err());
        assert!(PinPath { pin: "abcdef".into() }.validate().is_err());
    }

    #[test]
    fn overlong_response_is_rejected() {
        let request = SubmitResponseRequest {
            response: "x".repeat(1_001),
        };
        assert!(request.validate().is_err());
        assert!(
            SubmitResponseRequest {
                response: "Red".into()
            }
            .validate()
            .is_ok()
        );
    }

    #[test]
    fn mode_parses_snake_case() {
        let request: ModeRequest = serde_json::from_str(r#"{"mode":"moderate"}"#).unwrap();
        assert_eq!(request.mode, VisitMode::Moderate);
    }
}
