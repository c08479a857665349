mod engine;

pub use engine::{PlaybackEngine, SeekTarget};
