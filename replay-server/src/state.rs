use std::sync::{Arc, Mutex, MutexGuard};

use common::clock::Clock;
use common::types::Recording;

use crate::playback::PlaybackEngine;

/// Shared server state: one loaded recording, one playback engine.
///
/// The mutex is the single serialization point for all engine reads and
/// mutations. Nothing blocking runs while it is held; every lookup works
/// against the in-memory frame array.
pub struct ReplayState {
    pub recording: Arc<Recording>,
    engine: Mutex<PlaybackEngine>,
}

impl ReplayState {
    pub fn new(recording: Arc<Recording>, clock: Arc<dyn Clock>) -> Self {
        let engine = PlaybackEngine::new(recording.clone(), clock);
        Self {
            recording,
            engine: Mutex::new(engine),
        }
    }

    pub fn engine(&self) -> MutexGuard<'_, PlaybackEngine> {
        // The engine stays consistent even if a handler panicked mid-call.
        self.engine.lock().unwrap_or_else(|e| e.into_inner())
    }
}
