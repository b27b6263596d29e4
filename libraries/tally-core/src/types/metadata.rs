use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Metadata of the item a session is playing
///
/// Providers frequently omit fields, so every one of them is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackMetadata {
    /// Track or episode title
    pub title: Option<String>,

    /// Performing artist
    pub artist: Option<String>,

    /// Album the track belongs to
    pub album: Option<String>,

    /// Total length of the item
    pub duration: Option<Duration>,
}

impl TrackMetadata {
    /// Metadata with a title and artist
    pub fn new(title: impl Into<String>, artist: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            artist: Some(artist.into()),
            ..Self::default()
        }
    }

    /// Set the album
    #[must_use]
    pub fn with_album(mut self, album: impl Into<String>) -> Self {
        self.album = Some(album.into());
        self
    }

    /// Set the duration
    #[must_use]
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }
}
