//! Sharing session endpoint handlers.

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use chrono::{DateTime, Local, Utc};
use domain::services::{Phase, SessionState};
use serde::{Deserialize, Serialize};
use shared::display::{format_coordinate, format_date, format_time, UNSET};
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;

const SHARE_LABEL: &str = "Share your location";
const STOP_LABEL: &str = "Stop Sharing your location";
const LOADING_LABEL: &str = "...Loading Location";
const ACTIVE_SINCE: &str = "Active since";
const INACTIVE_AT: &str = "Inactive at";

/// Request body for editing the display name.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateNameRequest {
    pub device_name: String,
}

/// Optional request body for starting a session.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartSharingRequest {
    #[serde(default)]
    pub device_name: Option<String>,
}

/// What the control screen shows.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SharingStatusResponse {
    pub phase: String,
    pub device_id: Uuid,
    pub device_name: String,
    pub is_active: bool,
    pub name_editable: bool,
    pub toggle_label: String,
    pub deactivation_pending: bool,
    pub summary: UsageSummary,
}

/// Usage summary panel.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageSummary {
    pub label: String,
    pub date: String,
    pub time: String,
    pub latitude: String,
    pub longitude: String,
}

impl SharingStatusResponse {
    /// Render `state`, showing timestamps in the local timezone.
    pub fn from_state(state: &SessionState) -> Self {
        Self::render(state, |at| at.with_timezone(&Local))
    }

    fn render<Tz, F>(state: &SessionState, to_display: F) -> Self
    where
        Tz: chrono::TimeZone,
        Tz::Offset: std::fmt::Display,
        F: Fn(DateTime<Utc>) -> DateTime<Tz>,
    {
        let toggle_label = match state.phase() {
            Phase::Starting(_) => LOADING_LABEL,
            Phase::Active => STOP_LABEL,
            Phase::Idle | Phase::Stopping => SHARE_LABEL,
        };
        let at = state.session_started_at().map(to_display);
        let location = state.current_location();

        Self {
            phase: state.phase().as_str().to_string(),
            device_id: state.device_id(),
            device_name: state.device_name().to_string(),
            is_active: state.is_active(),
            name_editable: state.name_editable(),
            toggle_label: toggle_label.to_string(),
            deactivation_pending: state.deactivation_pending(),
            summary: UsageSummary {
                label: if state.is_active() {
                    ACTIVE_SINCE
                } else {
                    INACTIVE_AT
                }
                .to_string(),
                date: at.as_ref().map_or_else(|| UNSET.to_string(), format_date),
                time: at.as_ref().map_or_else(|| UNSET.to_string(), format_time),
                latitude: format_coordinate(location.map(|p| p.latitude)),
                longitude: format_coordinate(location.map(|p| p.longitude)),
            },
        }
    }
}

/// Current session status.
///
/// GET /api/v1/sharing
pub async fn get_status(State(state): State<AppState>) -> Json<SharingStatusResponse> {
    Json(SharingStatusResponse::from_state(&state.controller.state()))
}

/// Edit the display name. Rejected while sharing.
///
/// PUT /api/v1/sharing/name
pub async fn update_name(
    State(state): State<AppState>,
    payload: Result<Json<UpdateNameRequest>, JsonRejection>,
) -> Result<Json<SharingStatusResponse>, ApiError> {
    let Json(request) = payload?;
    let session = state.controller.edit_name(request.device_name).await?;
    Ok(Json(SharingStatusResponse::from_state(&session)))
}

/// Start sharing, optionally under a new name.
///
/// POST /api/v1/sharing/start
pub async fn start_sharing(
    State(state): State<AppState>,
    payload: Result<Json<StartSharingRequest>, JsonRejection>,
) -> Result<Json<SharingStatusResponse>, ApiError> {
    // A bare POST without a JSON body keeps the current name.
    let device_name = match payload {
        Ok(Json(body)) => body.device_name,
        Err(JsonRejection::MissingJsonContentType(_)) => None,
        Err(rejection) => return Err(rejection.into()),
    };
    let session = state.controller.start(device_name).await?;

    tracing::info!(
        device_name = %session.device_name(),
        record_id = ?session.record_id(),
        "Sharing started"
    );

    Ok(Json(SharingStatusResponse::from_state(&session)))
}

/// Stop sharing.
///
/// POST /api/v1/sharing/stop
pub async fn stop_sharing(
    State(state): State<AppState>,
) -> Result<Json<SharingStatusResponse>, ApiError> {
    let session = state.controller.stop().await?;
    Ok(Json(SharingStatusResponse::from_state(&session)))
}

/// The single share/stop button.
///
/// POST /api/v1/sharing/toggle
pub async fn toggle_sharing(
    State(state): State<AppState>,
) -> Result<Json<SharingStatusResponse>, ApiError> {
    let session = state.controller.toggle().await?;
    Ok(Json(SharingStatusResponse::from_state(&session)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use domain::models::{DeviceRecord, Position};
    use domain::services::SessionEvent;

    fn render_utc(state: &SessionState) -> SharingStatusResponse {
        SharingStatusResponse::render(state, |at| at)
    }

    fn active_state() -> SessionState {
        let device_id = Uuid::new_v4();
        let at = Utc.with_ymd_and_hms(2024, 3, 5, 9, 7, 0).unwrap();
        let position = Position::new(13.7563, 100.5018);

        let mut state = SessionState::new(device_id, "android");
        for event in [
            SessionEvent::StartRequested {
                device_name: "kitchen".into(),
            },
            SessionEvent::OwnRecordLoaded(None),
            SessionEvent::NameOwnerLoaded(None),
            SessionEvent::PositionFetched(position),
            SessionEvent::RecordWritten {
                record: DeviceRecord {
                    id: 1,
                    device_id,
                    device_name: "kitchen".into(),
                    device_type: "android".into(),
                    latitude: Some(position.latitude),
                    longitude: Some(position.longitude),
                    is_active: true,
                    create_at: at,
                    update_at: at,
                },
                at,
            },
        ] {
            state = state.apply(event).state;
        }
        state
    }

    #[test]
    fn test_idle_status_has_placeholders() {
        let state = SessionState::new(Uuid::new_v4(), "android");
        let status = render_utc(&state);

        assert_eq!(status.phase, "idle");
        assert!(status.name_editable);
        assert_eq!(status.toggle_label, SHARE_LABEL);
        assert_eq!(status.summary.label, INACTIVE_AT);
        assert_eq!(status.summary.date, "-");
        assert_eq!(status.summary.time, "-");
        assert_eq!(status.summary.latitude, "-");
        assert_eq!(status.summary.longitude, "-");
    }

    #[test]
    fn test_active_status() {
        let status = render_utc(&active_state());

        assert_eq!(status.phase, "active");
        assert!(status.is_active);
        assert!(!status.name_editable);
        assert_eq!(status.toggle_label, STOP_LABEL);
        assert_eq!(status.summary.label, ACTIVE_SINCE);
        assert_eq!(status.summary.date, "05 March 2024");
        assert_eq!(status.summary.time, "09:07");
        assert_eq!(status.summary.latitude, "13.7563");
        assert_eq!(status.summary.longitude, "100.5018");
    }

    #[test]
    fn test_starting_status_shows_loading() {
        let state = SessionState::new(Uuid::new_v4(), "android")
            .apply(SessionEvent::StartRequested {
                device_name: "kitchen".into(),
            })
            .state;
        let status = render_utc(&state);

        assert_eq!(status.phase, "starting");
        assert_eq!(status.toggle_label, LOADING_LABEL);
    }

    #[test]
    fn test_status_serializes_camel_case() {
        let json = serde_json::to_value(render_utc(&active_state())).unwrap();

        assert_eq!(json["deviceName"], "kitchen");
        assert_eq!(json["nameEditable"], false);
        assert_eq!(json["toggleLabel"], STOP_LABEL);
        assert_eq!(json["summary"]["label"], ACTIVE_SINCE);
    }

    #[test]
    fn test_start_request_name_is_optional() {
        let body: StartSharingRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(body.device_name, None);

        let body: StartSharingRequest =
            serde_json::from_str(r#"{"deviceName":"den"}"#).unwrap();
        assert_eq!(body.device_name.as_deref(), Some("den"));
    }
}
