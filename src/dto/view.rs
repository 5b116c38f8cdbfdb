//! Screens returned to visitors. Each variant carries only what that screen displays.

use serde::Serialize;
use serde_with::skip_serializing_none;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    dao::models::SessionEntity,
    dto::format_system_time,
    services::{
        aggregation::{Aggregates, ResponseCount},
        word_cloud::{PhraseCloud, PlacedPhrase},
    },
    state::visit::VisitMode,
};

/// View for the visitor's current mode, tagged by `view`.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum ViewResponse {
    Participate(ParticipateView),
    AuthRequired(AuthRequiredView),
    Create(CreateView),
    Moderate(ModerateView),
}

/// Participant screen: PIN entry and, once the PIN resolves, the question.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ParticipateView {
    /// PIN as entered by the participant (may be blank).
    pub pin: String,
    pub session: Option<ParticipantSessionView>,
    /// Prompt or validation message shown instead of, or below, the question.
    pub message: Option<String>,
}

/// What a participant sees for a resolved session.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ParticipantSessionView {
    pub session_id: Uuid,
    pub pin: String,
    pub question: String,
    /// Number of responses received so far.
    pub participant_count: usize,
    pub word_cloud: Option<WordCloudDto>,
}

/// Shown when a moderator-only mode is selected without signing in.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AuthRequiredView {
    pub mode: VisitMode,
    pub message: String,
}

/// Session creation form.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CreateView {
    /// Whether the change-password sub-form is expanded.
    pub show_change_password: bool,
    pub min_password_length: usize,
}

/// Moderator dashboard.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ModerateView {
    pub session: Option<ModeratedSessionView>,
    pub message: Option<String>,
    pub auto_refresh: bool,
    pub refresh_interval_secs: u64,
}

/// Live statistics of the held session.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ModeratedSessionView {
    pub session_id: Uuid,
    pub pin: String,
    pub question: String,
    /// Link encoded in the QR code, `<base>?pin=<pin>`.
    pub join_link: String,
    pub created_at: String,
    pub stats: ResponseStats,
    /// Bar chart data, at most fifteen entries.
    pub chart: Vec<ResponseCountDto>,
    pub word_cloud: Option<WordCloudDto>,
    /// Every distinct response, most frequent first.
    pub ranked: Vec<RankedResponseDto>,
}

impl ModeratedSessionView {
    pub fn new(
        session: SessionEntity,
        join_link: String,
        stats: &Aggregates,
        chart_size: usize,
        cloud: Option<&PhraseCloud>,
    ) -> Self {
        Self {
            session_id: session.id,
            created_at: format_system_time(session.created_at),
            pin: session.pin,
            question: session.question,
            join_link,
            stats: ResponseStats::from(stats),
            chart: stats
                .top(chart_size)
                .iter()
                .map(ResponseCountDto::from)
                .collect(),
            word_cloud: cloud.map(WordCloudDto::from),
            ranked: stats
                .ranked
                .iter()
                .enumerate()
                .map(|(index, entry)| RankedResponseDto {
                    rank: index + 1,
                    response: entry.response.clone(),
                    count: entry.count,
                })
                .collect(),
        }
    }
}

/// Headline metrics.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ResponseStats {
    pub total: usize,
    pub unique: usize,
    pub most_popular: Option<MostPopularDto>,
}

impl From<&Aggregates> for ResponseStats {
    fn from(stats: &Aggregates) -> Self {
        Self {
            total: stats.total,
            unique: stats.unique(),
            most_popular: stats.most_popular().map(|entry| MostPopularDto {
                label: entry.label(),
                response: entry.response.clone(),
                count: entry.count,
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MostPopularDto {
    pub response: String,
    pub count: usize,
    /// Display label, e.g. `Red (1x)`.
    pub label: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ResponseCountDto {
    pub response: String,
    pub count: usize,
}

impl From<&ResponseCount> for ResponseCountDto {
    fn from(entry: &ResponseCount) -> Self {
        Self {
            response: entry.response.clone(),
            count: entry.count,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RankedResponseDto {
    /// 1-based position.
    pub rank: usize,
    pub response: String,
    pub count: usize,
}

/// Phrase cloud ready to draw.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct WordCloudDto {
    pub phrases: Vec<PlacedPhraseDto>,
}

impl From<&PhraseCloud> for WordCloudDto {
    fn from(cloud: &PhraseCloud) -> Self {
        Self {
            phrases: cloud.phrases.iter().map(PlacedPhraseDto::from).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PlacedPhraseDto {
    pub text: String,
    pub count: usize,
    pub font_size: u32,
    pub x: f64,
    pub y: f64,
    /// Rotation in degrees, 0 or 90.
    pub rotation: u16,
    pub color: String,
}

impl From<&PlacedPhrase> for PlacedPhraseDto {
    fn from(phrase: &PlacedPhrase) -> Self {
        Self {
            text: phrase.text.clone(),
            count: phrase.count,
            font_size: phrase.font_size,
            x: phrase.x,
            y: phrase.y,
            rotation: phrase.rotation.degrees(),
            color: phrase.color.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use super::*;
    use crate::services::aggregation::{CHART_SIZE, aggregate};

    #[test]
    fn view_is_tagged_by_mode() {
        let view = ViewResponse::Create(CreateView {
            show_change_password: false,
            min_password_length: 6,
        });
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["view"], "create");
        assert_eq!(json["min_password_length"], 6);
    }

    #[test]
    fn empty_fields_are_omitted() {
        let view = ParticipateView {
            pin: String::new(),
            session: None,
            message: Some("enter the session PIN to begin".into()),
        };
        let json = serde_json::to_value(&view).unwrap();
        assert!(json.get("session").is_none());
        assert_eq!(json["message"], "enter the session PIN to begin");
    }

    #[test]
    fn ranked_list_is_one_based() {
        let session = SessionEntity {
            id: Uuid::new_v4(),
            pin: "123456".into(),
            question: "Favorite color?".into(),
            created_at: SystemTime::UNIX_EPOCH,
        };
        let stats = aggregate(&["Blue", "Red", "Blue"]);
        let view = ModeratedSessionView::new(
            session,
            "http://localhost:8080?pin=123456".into(),
            &stats,
            CHART_SIZE,
            None,
        );

        assert_eq!(view.ranked[0].rank, 1);
        assert_eq!(view.ranked[0].response, "Blue");
        assert_eq!(view.ranked[1].rank, 2);
        assert_eq!(view.stats.total, 3);
        assert_eq!(view.stats.unique, 2);
        assert_eq!(view.stats.most_popular.unwrap().label, "Blue (2x)");
        assert_eq!(view.created_at, "1970-01-01T00:00:00Z");
    }
}
