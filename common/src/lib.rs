pub mod clock;
pub mod codec;
pub mod error;
pub mod listing;
pub mod source;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::*;
pub use source::{FeedSnapshot, FeedSource, HttpFeedSource};
pub use types::*;
