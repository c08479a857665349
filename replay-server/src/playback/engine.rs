//! Playback engine: maps wall-clock time onto a frame index.
//!
//! The engine never stores the current frame index. It keeps an anchor
//! (the frame index that was current at a known wall instant) and derives
//! the index from `(now - anchor_wall) * speed` on every read. Every
//! control operation re-anchors, so the displayed position is continuous
//! across play/pause/seek/speed changes.
//!
//! Frame intervals are not uniform (the recorder skips failed ticks), so
//! the lookup is a binary search over `elapsed_ms`, not arithmetic
//! stepping.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use common::clock::Clock;
use common::error::{ReplayError, Result};
use common::types::{PlaybackSnapshot, PlaybackStatus, Recording, RecordedFrame};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SeekTarget {
    Frame(u64),
    Lap(i64),
    Percent(f64),
}

pub struct PlaybackEngine {
    recording: Arc<Recording>,
    clock: Arc<dyn Clock>,
    status: PlaybackStatus,
    speed: f64,
    looping: bool,
    anchor_wall: std::time::Instant,
    anchor_index: usize,
}

impl PlaybackEngine {
    pub fn new(recording: Arc<Recording>, clock: Arc<dyn Clock>) -> Self {
        let anchor_wall = clock.now();
        Self {
            recording,
            clock,
            status: PlaybackStatus::Stopped,
            speed: 1.0,
            looping: true,
            anchor_wall,
            anchor_index: 0,
        }
    }

    pub fn status(&self) -> PlaybackStatus {
        self.status
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn looping(&self) -> bool {
        self.looping
    }

    pub fn set_looping(&mut self, looping: bool) {
        self.looping = looping;
    }

    fn ensure_frames(&self) -> Result<()> {
        if self.recording.is_empty() {
            return Err(ReplayError::EmptyRecording);
        }
        Ok(())
    }

    fn anchor_at(&mut self, index: usize) {
        self.anchor_index = index;
        self.anchor_wall = self.clock.now();
    }

    /// Starts or resumes playback. From Stopped, playback begins at frame
    /// 0; otherwise the current position carries over without a jump.
    pub fn play(&mut self) -> Result<()> {
        self.ensure_frames()?;
        let index = if self.status == PlaybackStatus::Stopped {
            0
        } else {
            self.current_index()?
        };
        self.anchor_at(index);
        self.status = PlaybackStatus::Playing;
        debug!("Playback playing from frame {}", index);
        Ok(())
    }

    pub fn pause(&mut self) -> Result<()> {
        self.ensure_frames()?;
        let index = self.current_index()?;
        self.anchor_at(index);
        self.status = PlaybackStatus::Paused;
        debug!("Playback paused at frame {}", index);
        Ok(())
    }

    pub fn stop(&mut self) -> Result<()> {
        self.ensure_frames()?;
        self.anchor_at(0);
        self.status = PlaybackStatus::Stopped;
        Ok(())
    }

    /// Changes the playback speed without moving the currently served
    /// frame: the engine re-anchors at the current index first.
    pub fn set_speed(&mut self, speed: f64) -> Result<()> {
        self.ensure_frames()?;
        if !(speed.is_finite() && speed > 0.0) {
            return Err(ReplayError::InvalidParameter(format!(
                "speed must be positive, got {speed}"
            )));
        }
        let index = self.current_index()?;
        self.anchor_at(index);
        self.speed = speed;
        debug!("Playback speed set to {:.2}x at frame {}", speed, index);
        Ok(())
    }

    /// Resolves the target to a frame index, re-anchors there, and
    /// preserves the current status (playing keeps playing, paused stays
    /// paused).
    pub fn seek(&mut self, target: SeekTarget) -> Result<usize> {
        self.ensure_frames()?;
        // Settle any pending end-of-recording transition first.
        let _ = self.current_index()?;

        let last = self.recording.len() - 1;
        let index = match target {
            SeekTarget::Frame(frame) => (frame as usize).min(last),
            SeekTarget::Percent(percent) => {
                if !percent.is_finite() {
                    return Err(ReplayError::InvalidParameter(format!(
                        "percent must be a number, got {percent}"
                    )));
                }
                let clamped = percent.clamp(0.0, 100.0);
                (clamped / 100.0 * last as f64).round() as usize
            }
            // First frame at or past the requested lap; the last frame
            // when the recording never reaches it.
            SeekTarget::Lap(lap) => self
                .recording
                .frames
                .iter()
                .position(|f| f.lap_number().is_some_and(|l| l >= lap))
                .unwrap_or(last),
        };

        self.anchor_at(index);
        debug!("Seek {:?} resolved to frame {}", target, index);
        Ok(index)
    }

    pub fn toggle_loop(&mut self) -> Result<bool> {
        self.ensure_frames()?;
        self.looping = !self.looping;
        Ok(self.looping)
    }

    /// Derives the current frame index from the anchor and the clock.
    ///
    /// Playing past the final frame either wraps to frame 0 (loop on) or
    /// holds the final frame and flips the status to Paused (loop off).
    pub fn current_index(&mut self) -> Result<usize> {
        self.ensure_frames()?;
        if self.status != PlaybackStatus::Playing {
            return Ok(self.anchor_index);
        }

        let frames = &self.recording.frames;
        let last_index = frames.len() - 1;
        let last_ms = frames[last_index].elapsed_ms as f64;

        let real_elapsed = self
            .clock
            .now()
            .saturating_duration_since(self.anchor_wall);
        let virtual_ms =
            real_elapsed.as_secs_f64() * 1000.0 * self.speed + frames[self.anchor_index].elapsed_ms as f64;

        if virtual_ms <= last_ms {
            return Ok(locate(frames, virtual_ms));
        }

        if self.looping {
            // Wrap: the final frame holds for one nominal interval, then
            // playback re-anchors at the overflow remainder past frame 0.
            let cycle_ms = last_ms + self.recording.metadata.interval_ms.max(1) as f64;
            let remainder_ms = virtual_ms % cycle_ms;
            let index = locate(frames, remainder_ms);
            let sub_frame_ms = remainder_ms - frames[index].elapsed_ms as f64;

            self.anchor_index = index;
            self.anchor_wall = self
                .clock
                .now()
                .checked_sub(Duration::from_secs_f64(sub_frame_ms / self.speed / 1000.0))
                .unwrap_or_else(|| self.clock.now());
            debug!("Playback wrapped to frame {}", index);
            return Ok(index);
        }

        // Hold on the final frame rather than playing past the end.
        self.status = PlaybackStatus::Paused;
        self.anchor_at(last_index);
        debug!("Playback reached the end, holding frame {}", last_index);
        Ok(last_index)
    }

    pub fn snapshot(&mut self) -> Result<PlaybackSnapshot> {
        let index = self.current_index()?;
        let total = self.recording.len();
        let frame = &self.recording.frames[index];

        Ok(PlaybackSnapshot {
            status: self.status,
            frame_index: index as u64,
            total_frames: total as u64,
            lap: frame.lap_number(),
            speed: self.speed,
            looping: self.looping,
            progress_percent: if total > 1 {
                index as f64 / (total - 1) as f64 * 100.0
            } else {
                100.0
            },
            run_name: self.recording.metadata.run_name.clone(),
            track_name: self.recording.metadata.track_name.clone(),
        })
    }
}

/// Greatest index whose `elapsed_ms` does not exceed `virtual_ms`.
fn locate(frames: &[RecordedFrame], virtual_ms: f64) -> usize {
    frames
        .partition_point(|f| (f.elapsed_ms as f64) <= virtual_ms)
        .saturating_sub(1)
}
