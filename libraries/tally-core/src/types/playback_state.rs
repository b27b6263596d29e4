/// Playback state types reported by media sessions
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Coarse playback status of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackStatus {
    /// Actively playing
    Playing,
    /// Paused, resumable at the current position
    Paused,
    /// Stopped or never started
    Stopped,
    /// Waiting for data before playback can continue
    Buffering,
    /// The session reported a playback error
    Error,
    /// The provider reported a state Tally does not map
    #[default]
    Unknown,
}

impl PlaybackStatus {
    /// Convert to string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Playing => "playing",
            Self::Paused => "paused",
            Self::Stopped => "stopped",
            Self::Buffering => "buffering",
            Self::Error => "error",
            Self::Unknown => "unknown",
        }
    }

    /// Parse from string
    #[must_use]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "playing" => Some(Self::Playing),
            "paused" => Some(Self::Paused),
            "stopped" => Some(Self::Stopped),
            "buffering" => Some(Self::Buffering),
            "error" => Some(Self::Error),
            "unknown" => Some(Self::Unknown),
            _ => None,
        }
    }
}

impl std::fmt::Display for PlaybackStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Snapshot of a session's playback state
///
/// Forwarded to the tracker as-is; the listener never interprets it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackState {
    /// Current status
    pub status: PlaybackStatus,

    /// Position within the current item when the state was captured
    pub position: Duration,

    /// When the provider captured this state
    pub updated_at: DateTime<Utc>,
}

impl PlaybackState {
    /// Create a state captured now
    pub fn new(status: PlaybackStatus, position: Duration) -> Self {
        Self {
            status,
            position,
            updated_at: Utc::now(),
        }
    }

    /// Whether the session is actively playing
    pub fn is_playing(&self) -> bool {
        self.status == PlaybackStatus::Playing
    }
}
