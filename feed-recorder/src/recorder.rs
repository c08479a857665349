//! Capture loop for a live race feed.
//!
//! One frame is appended per successful capture tick. A failed or slow
//! fetch skips the tick and the loop retries on the next scheduled one, so
//! `frame_number` stays gapless. Any stop condition (duration, frame
//! count, cancellation) finalizes the recording and persists whatever was
//! captured so far.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::Utc;
use serde_json::Value;
// tokio's Instant follows the runtime clock, so tick accounting stays
// consistent when tests pause time.
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use common::codec;
use common::error::{ReplayError, Result};
use common::source::{FeedSnapshot, FeedSource};
use common::types::{run_type_name, Recording, RecordedFrame, RecordingMetadata};

use crate::config::RecorderConfig;

pub struct SessionRecorder {
    source: Arc<dyn FeedSource>,
    config: RecorderConfig,
    frames: Vec<RecordedFrame>,
    metadata: Option<RecordingMetadata>,
    start_instant: Option<Instant>,
}

impl SessionRecorder {
    pub fn new(source: Arc<dyn FeedSource>, config: RecorderConfig) -> Self {
        Self {
            source,
            config,
            frames: Vec::new(),
            metadata: None,
            start_instant: None,
        }
    }

    pub fn frame_count(&self) -> u64 {
        self.frames.len() as u64
    }

    /// Runs the capture loop until a stop condition fires. An in-flight
    /// fetch is abandoned on cancellation; captured frames are kept.
    pub async fn run(&mut self, shutdown: CancellationToken) -> Result<()> {
        let mut ticker = tokio::time::interval(self.config.interval);
        // A slow fetch must not queue up a burst of make-up ticks.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let deadline = self.config.duration.map(|d| Instant::now() + d);
        info!(
            "Recording every {:?} into {:?}",
            self.config.interval, self.config.output_dir
        );

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Stop signal received");
                    break;
                }
                _ = ticker.tick() => {
                    tokio::select! {
                        _ = shutdown.cancelled() => {
                            info!("Stop signal received, abandoning in-flight capture");
                            break;
                        }
                        _ = self.capture_tick() => {}
                    }
                }
            }

            if let Some(max) = self.config.max_frames {
                if self.frame_count() >= max {
                    info!("Frame limit reached ({})", max);
                    break;
                }
            }
            if let Some(deadline) = deadline {
                if Instant::now() >= deadline {
                    info!("Duration limit reached");
                    break;
                }
            }
        }

        Ok(())
    }

    /// Captures one frame. Fetch failures are logged and recovered locally;
    /// they never propagate past the tick.
    async fn capture_tick(&mut self) {
        let snapshot =
            match tokio::time::timeout(self.config.fetch_timeout, self.source.fetch_current_frame())
                .await
            {
                Ok(Ok(snapshot)) => snapshot,
                Ok(Err(e)) => {
                    warn!("Fetch failed, skipping tick: {}", e);
                    return;
                }
                Err(_) => {
                    warn!(
                        "Fetch timed out after {:?}, skipping tick",
                        self.config.fetch_timeout
                    );
                    return;
                }
            };

        if snapshot.live_feed.is_null() {
            warn!("Live feed returned no data, skipping tick");
            return;
        }

        if self.metadata.is_none() {
            let metadata = self.init_metadata(&snapshot.live_feed);
            info!(
                "Recording session: {} @ {} ({})",
                metadata.run_name,
                metadata.track_name,
                run_type_name(metadata.run_type)
            );
            self.metadata = Some(metadata);
            self.start_instant = Some(Instant::now());
        }

        let elapsed_ms = self
            .start_instant
            .map(|start| start.elapsed().as_millis() as u64)
            .unwrap_or(0);

        let frame = RecordedFrame {
            timestamp: epoch_seconds(),
            frame_number: self.frames.len() as u64,
            elapsed_ms,
            live_feed: snapshot.live_feed,
            flag_data: snapshot.flag_data,
            pit_data: snapshot.pit_data,
            points_data: snapshot.points_data,
            stage_points: snapshot.stage_points,
        };

        info!(
            "Frame {:>5} | {:>7.1}s | lap {:>3} | leader {}",
            frame.frame_number,
            frame.elapsed_ms as f64 / 1000.0,
            frame.lap_number().unwrap_or(0),
            frame.leader_name().unwrap_or("?"),
        );
        self.frames.push(frame);
    }

    fn init_metadata(&self, live_feed: &Value) -> RecordingMetadata {
        let race_id = live_feed.get("race_id").and_then(Value::as_i64).unwrap_or(0);
        let series_id = live_feed
            .get("series_id")
            .and_then(Value::as_i64)
            .unwrap_or(1);
        let run_type = live_feed
            .get("run_type")
            .and_then(Value::as_i64)
            .unwrap_or(1) as i32;
        let start_time = Utc::now();

        RecordingMetadata {
            recording_id: format!(
                "nascar_s{}_r{}_{}_{}",
                series_id,
                race_id,
                run_type_name(run_type),
                start_time.format("%Y%m%d_%H%M%S")
            ),
            start_time,
            end_time: None,
            race_id,
            series_id,
            run_name: json_str(live_feed, "run_name"),
            track_name: json_str(live_feed, "track_name"),
            run_type,
            interval_ms: self.config.interval.as_millis() as u64,
            total_frames: 0,
            total_duration_sec: 0.0,
            file_size_bytes: 0,
            compressed: self.config.compress,
            version: "1.0".to_string(),
        }
    }

    /// Seals the metadata and hands back the finished recording. Fails with
    /// `EmptyRecording` when no frame was ever captured.
    pub fn finalize(&mut self) -> Result<Recording> {
        let mut metadata = self.metadata.take().ok_or(ReplayError::EmptyRecording)?;
        if self.frames.is_empty() {
            return Err(ReplayError::EmptyRecording);
        }

        let frames = std::mem::take(&mut self.frames);
        metadata.end_time = Some(Utc::now());
        metadata.total_frames = frames.len() as u64;
        metadata.total_duration_sec = match (frames.first(), frames.last()) {
            (Some(first), Some(last)) => last.timestamp - first.timestamp,
            _ => 0.0,
        };

        Ok(Recording { metadata, frames })
    }

    /// Writes the recording into the configured output directory and
    /// returns the file path.
    pub async fn persist(&self, recording: &Recording) -> Result<PathBuf> {
        let bytes = codec::encode(recording, self.config.compress)?;

        let mut file_name = format!("{}.json", recording.metadata.recording_id);
        if self.config.compress {
            file_name.push_str(".gz");
        }
        let path = self.config.output_dir.join(file_name);

        tokio::fs::create_dir_all(&self.config.output_dir)
            .await
            .map_err(|e| {
                ReplayError::PersistFailure(format!("{}: {}", self.config.output_dir.display(), e))
            })?;
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|e| ReplayError::PersistFailure(format!("{}: {}", path.display(), e)))?;

        info!(
            "Recording saved: {} ({} frames, {} bytes)",
            path.display(),
            recording.metadata.total_frames,
            bytes.len()
        );
        Ok(path)
    }
}

fn epoch_seconds() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

fn json_str(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or("Unknown")
        .to_string()
}
