pub mod controller;
pub mod dedup;
pub mod feed;
pub mod loop_worker;

pub use controller::DetectionController;
pub use dedup::Deduplicator;
pub use feed::{ChannelSource, DetectionEvent, DetectionSource};
