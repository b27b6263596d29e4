//! Tracker Events
//!
//! Channel-based delivery of normalized session events to an async tracker.
//! Events are emitted at key points:
//! - State changes (including the replayed state right after subscribing)
//! - Metadata changes (including the replayed metadata)
//! - Termination (the source went away; nothing follows it)

use serde::{Deserialize, Serialize};
use tally_core::{PlaybackSink, PlaybackState, SourceId, TrackMetadata};
use tokio::sync::mpsc;
use tracing::debug;

/// Events forwarded to the playback tracker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TrackerEvent {
    /// A tracked source reported a new playback state
    StateChanged {
        /// Source the state belongs to
        source_id: SourceId,
        /// The new state
        state: PlaybackState,
    },

    /// A tracked source reported new metadata
    MetadataChanged {
        /// Source the metadata belongs to
        source_id: SourceId,
        /// The new metadata
        metadata: TrackMetadata,
    },

    /// A tracked source went away
    Terminated {
        /// Source that terminated
        source_id: SourceId,
    },
}

impl TrackerEvent {
    /// Source the event is about
    pub fn source_id(&self) -> &SourceId {
        match self {
            Self::StateChanged { source_id, .. }
            | Self::MetadataChanged { source_id, .. }
            | Self::Terminated { source_id } => source_id,
        }
    }
}

/// `PlaybackSink` that sends every event into an unbounded channel
///
/// Sending never blocks, so it is safe to use from the dispatcher's
/// serialized path. Events sent after the receiver is gone are dropped.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<TrackerEvent>,
}

impl ChannelSink {
    /// Create a sink and the receiver the tracker consumes
    pub fn new() -> (Self, mpsc::UnboundedReceiver<TrackerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn send(&self, event: TrackerEvent) {
        if let Err(e) = self.tx.send(event) {
            debug!(
                "Tracker receiver dropped, discarding event for {}",
                e.0.source_id()
            );
        }
    }
}

impl PlaybackSink for ChannelSink {
    fn on_source_state_changed(&self, source_id: &SourceId, state: PlaybackState) {
        self.send(TrackerEvent::StateChanged {
            source_id: source_id.clone(),
            state,
        });
    }

    fn on_source_metadata_changed(&self, source_id: &SourceId, metadata: TrackMetadata) {
        self.send(TrackerEvent::MetadataChanged {
            source_id: source_id.clone(),
            metadata,
        });
    }

    fn on_source_terminated(&self, source_id: &SourceId) {
        self.send(TrackerEvent::Terminated {
            source_id: source_id.clone(),
        });
    }
}
