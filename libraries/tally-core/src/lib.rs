//! Tally Core
//!
//! Platform-agnostic types, collaborator traits, and error handling for the
//! Tally media-session listener.
//!
//! # Architecture
//!
//! The core crate defines:
//! - **Domain Types**: `Source`, `SourceId`, `PlaybackState`, `TrackMetadata`
//! - **Collaborator Traits**: `SessionProvider` (the platform's media sessions),
//!   `PreferenceStore` (persisted settings), `PlaybackSink` (the tracker that
//!   turns events into scrobbles)
//! - **Error Handling**: Unified `TallyError` and `Result` types
//!
//! # Example
//!
//! ```rust
//! use tally_core::{MemoryPreferenceStore, PreferenceStore};
//! use tally_core::types::{PlaybackState, PlaybackStatus, SourceId, TrackMetadata};
//! use std::time::Duration;
//!
//! let id = SourceId::new("org.videolan.vlc");
//! let state = PlaybackState::new(PlaybackStatus::Playing, Duration::from_secs(3));
//! let metadata = TrackMetadata::new("Windowlicker", "Aphex Twin");
//!
//! let store = MemoryPreferenceStore::new();
//! store.set_bool(&format!("player.{id}"), true).unwrap();
//! assert!(state.is_playing());
//! assert_eq!(metadata.album, None);
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod error;
pub mod preferences;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use error::{Result, TallyError};
pub use preferences::MemoryPreferenceStore;
pub use traits::{
    ActiveSourcesListener, PlaybackSink, PreferenceStore, SessionProvider, SourceEvents,
};

pub use types::{PlaybackState, PlaybackStatus, Source, SourceId, TrackMetadata};
