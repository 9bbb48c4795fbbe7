pub mod controller;
pub mod session;

pub use controller::{ElementId, PlayerEvent, WatchDetector};
pub use session::{WatchPhase, WatchSession, MIN_WATCHED_FRACTION, MIN_WATCHED_SECS};
