use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Recording session metadata. Created from the first captured frame and
/// finalized exactly once when the recorder stops.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingMetadata {
    pub recording_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub race_id: i64,
    pub series_id: i64,
    pub run_name: String,
    pub track_name: String,
    /// 1=Practice, 2=Qualifying, 3=Race
    pub run_type: i32,
    pub interval_ms: u64,
    pub total_frames: u64,
    pub total_duration_sec: f64,
    #[serde(default)]
    pub file_size_bytes: u64,
    #[serde(default = "default_compressed")]
    pub compressed: bool,
    #[serde(default = "default_version")]
    pub version: String,
}

fn default_compressed() -> bool {
    true
}

fn default_version() -> String {
    "1.0".to_string()
}

/// A single captured snapshot of the live feed plus the auxiliary payloads
/// fetched at the same instant. Immutable once appended to a recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedFrame {
    /// Wall time of capture, Unix epoch seconds.
    pub timestamp: f64,
    /// 0-based, strictly increasing by 1 per successful capture.
    pub frame_number: u64,
    /// Milliseconds since the recording started, non-decreasing.
    pub elapsed_ms: u64,
    pub live_feed: Value,
    pub flag_data: Option<Value>,
    pub pit_data: Option<Value>,
    pub points_data: Option<Value>,
    pub stage_points: Option<Value>,
}

impl RecordedFrame {
    /// Lap number embedded in the live-feed payload, used as a seek target.
    pub fn lap_number(&self) -> Option<i64> {
        self.live_feed.get("lap_number").and_then(Value::as_i64)
    }

    /// Last name of the driver currently running in first place.
    pub fn leader_name(&self) -> Option<&str> {
        let vehicles = self.live_feed.get("vehicles")?.as_array()?;
        let leader = vehicles
            .iter()
            .find(|v| v.get("running_position").and_then(Value::as_i64) == Some(1))?;
        leader.get("driver")?.get("last_name")?.as_str()
    }
}

/// A finalized, ordered sequence of frames plus metadata. Frames are ordered
/// by `frame_number` ascending with no gaps; `elapsed_ms` is non-decreasing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recording {
    pub metadata: RecordingMetadata,
    pub frames: Vec<RecordedFrame>,
}

impl Recording {
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn frame(&self, index: usize) -> Option<&RecordedFrame> {
        self.frames.get(index)
    }

    pub fn last_elapsed_ms(&self) -> Option<u64> {
        self.frames.last().map(|f| f.elapsed_ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackStatus {
    Stopped,
    Playing,
    Paused,
}

/// Status snapshot returned by every replay control endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackSnapshot {
    pub status: PlaybackStatus,
    pub frame_index: u64,
    pub total_frames: u64,
    pub lap: Option<i64>,
    pub speed: f64,
    #[serde(rename = "loop")]
    pub looping: bool,
    pub progress_percent: f64,
    pub run_name: String,
    pub track_name: String,
}

/// One row of the recordings-directory listing. Built from
/// `decode_metadata_only`, so frame bodies are never loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingSummary {
    pub file_name: String,
    pub file_path: String,
    pub file_size_bytes: u64,
    pub metadata: RecordingMetadata,
}

pub fn run_type_name(run_type: i32) -> &'static str {
    match run_type {
        1 => "practice",
        2 => "qualifying",
        3 => "race",
        _ => "session",
    }
}
