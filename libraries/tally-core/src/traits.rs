//! Collaborator traits for Tally

use crate::error::Result;
use crate::types::{PlaybackState, Source, SourceId, TrackMetadata};
use std::sync::Arc;

/// Receives change notifications for one subscribed source
///
/// A fresh value is built for every subscription, so it knows which source
/// (and which subscription of that source) it belongs to. Providers may call
/// it from any thread.
pub trait SourceEvents: Send + Sync {
    /// The session's playback state changed
    fn on_playback_state_changed(&self, state: PlaybackState);

    /// The session's metadata changed
    fn on_metadata_changed(&self, metadata: TrackMetadata);
}

/// Listener for full active-session lists
pub type ActiveSourcesListener<C> = Box<dyn Fn(Vec<Source<C>>) + Send + Sync>;

/// Platform media-session enumeration and notification
///
/// Implemented by the host (Android `MediaSessionManager`, MPRIS, SMTC, ...).
/// Notifications may be delivered on arbitrary threads.
pub trait SessionProvider: Send + Sync + 'static {
    /// Opaque per-session controller handle
    type Controller: Clone + Send + Sync + 'static;

    /// Handle returned by `subscribe`, given back to `unsubscribe`
    type Subscription: Send + 'static;

    /// Whether the host has granted access to media sessions
    fn has_access(&self) -> bool {
        true
    }

    /// Currently active sessions
    ///
    /// # Errors
    /// Returns an error if the platform cannot enumerate sessions
    fn active_sources(&self) -> Result<Vec<Source<Self::Controller>>>;

    /// Install the listener that receives every subsequent full session list
    ///
    /// # Errors
    /// Returns an error if the listener cannot be installed
    fn watch_active_sources(&self, listener: ActiveSourcesListener<Self::Controller>)
        -> Result<()>;

    /// Remove the listener installed by `watch_active_sources`
    fn unwatch_active_sources(&self);

    /// Register change callbacks for one session
    ///
    /// `events` may be invoked before this returns, from this thread or any
    /// other; such early events are delivered once the subscription is in place.
    ///
    /// # Errors
    /// Returns an error if the platform refuses the registration
    fn subscribe(
        &self,
        source: &Source<Self::Controller>,
        events: Arc<dyn SourceEvents>,
    ) -> Result<Self::Subscription>;

    /// Remove callbacks previously installed with `subscribe`
    ///
    /// May block until callbacks already in flight have returned. Events that
    /// arrive after this call starts are discarded.
    fn unsubscribe(&self, subscription: Self::Subscription);

    /// Current playback state of a session, if it has one
    fn playback_state(&self, controller: &Self::Controller) -> Option<PlaybackState>;

    /// Current metadata of a session, if it has any
    fn metadata(&self, controller: &Self::Controller) -> Option<TrackMetadata>;
}

/// Persisted key/value preferences
///
/// Calls must be bounded; the listener never retries them.
pub trait PreferenceStore: Send + Sync {
    /// Whether a value is stored under `key`
    fn contains(&self, key: &str) -> Result<bool>;

    /// Read a boolean, falling back to `default` when absent
    fn get_bool(&self, key: &str, default: bool) -> Result<bool>;

    /// Store a boolean
    fn set_bool(&self, key: &str, value: bool) -> Result<()>;
}

/// Downstream consumer of normalized session events (the playback tracker)
pub trait PlaybackSink: Send + Sync {
    /// A tracked source reported a new playback state
    fn on_source_state_changed(&self, source_id: &SourceId, state: PlaybackState);

    /// A tracked source reported new metadata
    fn on_source_metadata_changed(&self, source_id: &SourceId, metadata: TrackMetadata);

    /// A tracked source went away; no further events follow for it
    fn on_source_terminated(&self, source_id: &SourceId);
}
