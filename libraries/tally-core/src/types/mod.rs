//! Domain types shared by the listener and its hosts

mod ids;
mod metadata;
mod playback_state;
mod source;

pub use ids::SourceId;
pub use metadata::TrackMetadata;
pub use playback_state::{PlaybackState, PlaybackStatus};
pub use source::Source;
