use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RecorderConfig {
    pub output_dir: PathBuf,
    /// Capture cadence, measured tick start to tick start.
    pub interval: Duration,
    /// Stop after this much wall time, if set.
    pub duration: Option<Duration>,
    /// Stop after this many captured frames, if set.
    pub max_frames: Option<u64>,
    pub compress: bool,
    /// Upper bound on a single fetch; a slow tick is skipped, not awaited.
    pub fetch_timeout: Duration,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("recordings"),
            interval: Duration::from_secs(1),
            duration: None,
            max_frames: None,
            compress: true,
            fetch_timeout: Duration::from_secs(10),
        }
    }
}
