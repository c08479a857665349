use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use common::error::ReplayError;
use common::types::{PlaybackSnapshot, RecordedFrame};

use crate::playback::SeekTarget;
use crate::state::ReplayState;

type SharedState = Arc<ReplayState>;

/// Request-level error: carries a machine-readable kind alongside the
/// human-readable message.
#[derive(Debug)]
pub struct ApiError(ReplayError);

impl From<ReplayError> for ApiError {
    fn from(err: ReplayError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            ReplayError::InvalidParameter(_) => StatusCode::BAD_REQUEST,
            ReplayError::EmptyRecording | ReplayError::RecordingNotFound(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = Json(json!({
            "error": self.0.kind(),
            "message": self.0.to_string(),
        }));
        (status, body).into_response()
    }
}

pub async fn health_check() -> Json<Value> {
    Json(json!({"status": "ok"}))
}

/// Current frame's live-feed payload, verbatim.
pub async fn live_feed(State(state): State<SharedState>) -> Result<Json<Value>, ApiError> {
    let index = state.engine().current_index()?;
    let frame = frame_at(&state, index)?;
    Ok(Json(frame.live_feed.clone()))
}

pub async fn flag_data(State(state): State<SharedState>) -> Result<Json<Value>, ApiError> {
    auxiliary_payload(&state, |f| f.flag_data.clone())
}

pub async fn pit_data(State(state): State<SharedState>) -> Result<Json<Value>, ApiError> {
    auxiliary_payload(&state, |f| f.pit_data.clone())
}

pub async fn points_data(State(state): State<SharedState>) -> Result<Json<Value>, ApiError> {
    auxiliary_payload(&state, |f| f.points_data.clone())
}

pub async fn stage_points(State(state): State<SharedState>) -> Result<Json<Value>, ApiError> {
    auxiliary_payload(&state, |f| f.stage_points.clone())
}

/// Auxiliary feeds degrade to an empty array when the frame carries no
/// payload, matching the live API's quiet periods.
fn auxiliary_payload(
    state: &SharedState,
    payload: impl Fn(&RecordedFrame) -> Option<Value>,
) -> Result<Json<Value>, ApiError> {
    let index = state.engine().current_index()?;
    let frame = frame_at(state, index)?;
    Ok(Json(payload(frame).unwrap_or_else(|| json!([]))))
}

fn frame_at(state: &SharedState, index: usize) -> Result<&RecordedFrame, ApiError> {
    state
        .recording
        .frame(index)
        .ok_or_else(|| ApiError(ReplayError::EmptyRecording))
}

pub async fn replay_status(
    State(state): State<SharedState>,
) -> Result<Json<PlaybackSnapshot>, ApiError> {
    Ok(Json(state.engine().snapshot()?))
}

pub async fn replay_play(
    State(state): State<SharedState>,
) -> Result<Json<PlaybackSnapshot>, ApiError> {
    let mut engine = state.engine();
    engine.play()?;
    Ok(Json(engine.snapshot()?))
}

pub async fn replay_pause(
    State(state): State<SharedState>,
) -> Result<Json<PlaybackSnapshot>, ApiError> {
    let mut engine = state.engine();
    engine.pause()?;
    Ok(Json(engine.snapshot()?))
}

pub async fn replay_stop(
    State(state): State<SharedState>,
) -> Result<Json<PlaybackSnapshot>, ApiError> {
    let mut engine = state.engine();
    engine.stop()?;
    Ok(Json(engine.snapshot()?))
}

#[derive(Debug, Deserialize)]
pub struct SeekQuery {
    frame: Option<u64>,
    lap: Option<i64>,
    percent: Option<f64>,
}

pub async fn replay_seek(
    State(state): State<SharedState>,
    Query(query): Query<SeekQuery>,
) -> Result<Json<PlaybackSnapshot>, ApiError> {
    // Fixed precedence when several selectors are given.
    let target = if let Some(frame) = query.frame {
        SeekTarget::Frame(frame)
    } else if let Some(lap) = query.lap {
        SeekTarget::Lap(lap)
    } else if let Some(percent) = query.percent {
        SeekTarget::Percent(percent)
    } else {
        return Err(ApiError(ReplayError::InvalidParameter(
            "missing seek selector (frame, lap, or percent)".to_string(),
        )));
    };

    let mut engine = state.engine();
    engine.seek(target)?;
    Ok(Json(engine.snapshot()?))
}

#[derive(Debug, Deserialize)]
pub struct SpeedQuery {
    value: Option<f64>,
}

pub async fn replay_speed(
    State(state): State<SharedState>,
    Query(query): Query<SpeedQuery>,
) -> Result<Json<PlaybackSnapshot>, ApiError> {
    let value = query.value.ok_or_else(|| {
        ApiError(ReplayError::InvalidParameter(
            "missing speed value".to_string(),
        ))
    })?;

    let mut engine = state.engine();
    engine.set_speed(value)?;
    Ok(Json(engine.snapshot()?))
}

pub async fn replay_loop(
    State(state): State<SharedState>,
) -> Result<Json<PlaybackSnapshot>, ApiError> {
    let mut engine = state.engine();
    engine.toggle_loop()?;
    Ok(Json(engine.snapshot()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use common::clock::ManualClock;
    use common::types::{PlaybackStatus, Recording, RecordingMetadata};
    use std::time::Duration;

    fn test_state() -> (SharedState, Arc<ManualClock>) {
        let frames = (0..4u64)
            .map(|i| RecordedFrame {
                timestamp: 1_700_000_000.0 + i as f64,
                frame_number: i,
                elapsed_ms: i * 1000,
                live_feed: json!({"lap_number": i + 1, "flag_state": 1}),
                flag_data: if i == 0 {
                    Some(json!([{"flag_state": 1}]))
                } else {
                    None
                },
                pit_data: None,
                points_data: None,
                stage_points: None,
            })
            .collect();

        let recording = Arc::new(Recording {
            metadata: RecordingMetadata {
                recording_id: "rec_test".to_string(),
                start_time: Utc::now(),
                end_time: None,
                race_id: 1,
                series_id: 1,
                run_name: "Test 400".to_string(),
                track_name: "Test Speedway".to_string(),
                run_type: 3,
                interval_ms: 1000,
                total_frames: 4,
                total_duration_sec: 3.0,
                file_size_bytes: 0,
                compressed: false,
                version: "1.0".to_string(),
            },
            frames,
        });

        let clock = Arc::new(ManualClock::new());
        (
            Arc::new(ReplayState::new(recording, clock.clone())),
            clock,
        )
    }

    #[tokio::test]
    async fn test_live_feed_serves_current_frame_verbatim() {
        let (state, clock) = test_state();
        state.engine().play().unwrap();
        clock.advance(Duration::from_millis(2000));

        let Json(payload) = live_feed(State(state)).await.unwrap();
        assert_eq!(payload, json!({"lap_number": 3, "flag_state": 1}));
    }

    #[tokio::test]
    async fn test_auxiliary_feed_defaults_to_empty_array() {
        let (state, _clock) = test_state();
        state.engine().seek(SeekTarget::Frame(0)).unwrap();
        let Json(payload) = flag_data(State(state.clone())).await.unwrap();
        assert_eq!(payload, json!([{"flag_state": 1}]));

        state.engine().seek(SeekTarget::Frame(1)).unwrap();
        let Json(payload) = flag_data(State(state)).await.unwrap();
        assert_eq!(payload, json!([]));
    }

    #[tokio::test]
    async fn test_play_returns_updated_snapshot() {
        let (state, _clock) = test_state();
        let Json(snapshot) = replay_play(State(state)).await.unwrap();
        assert_eq!(snapshot.status, PlaybackStatus::Playing);
        assert_eq!(snapshot.frame_index, 0);
        assert_eq!(snapshot.lap, Some(1));
    }

    #[tokio::test]
    async fn test_seek_selector_precedence_frame_over_lap() {
        let (state, _clock) = test_state();
        let query = SeekQuery {
            frame: Some(1),
            lap: Some(4),
            percent: Some(100.0),
        };
        let Json(snapshot) = replay_seek(State(state), Query(query)).await.unwrap();
        assert_eq!(snapshot.frame_index, 1);
    }

    #[tokio::test]
    async fn test_seek_without_selector_is_bad_request() {
        let (state, _clock) = test_state();
        let query = SeekQuery {
            frame: None,
            lap: None,
            percent: None,
        };
        let err = replay_seek(State(state), Query(query)).await.unwrap_err();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_speed_without_value_is_bad_request() {
        let (state, _clock) = test_state();
        let err = replay_speed(State(state), Query(SpeedQuery { value: None }))
            .await
            .unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_invalid_speed_value_is_bad_request() {
        let (state, _clock) = test_state();
        let err = replay_speed(State(state), Query(SpeedQuery { value: Some(-2.0) }))
            .await
            .unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_empty_recording_maps_to_service_unavailable() {
        let response = ApiError(ReplayError::EmptyRecording).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_loop_toggle_round_trip() {
        let (state, _clock) = test_state();
        let Json(first) = replay_loop(State(state.clone())).await.unwrap();
        assert!(!first.looping);
        let Json(second) = replay_loop(State(state)).await.unwrap();
        assert!(second.looping);
    }
}
