//! Playback source as reported by the session provider

use super::SourceId;

/// An active media session
///
/// `C` is the provider's controller handle. It is only ever handed back to the
/// provider (to read state or subscribe) and is never compared: two reports
/// describe the same source exactly when their `id`s are equal.
#[derive(Debug, Clone)]
pub struct Source<C> {
    /// Stable identity of the owning application
    pub id: SourceId,
    /// Opaque provider handle for this session
    pub controller: C,
}

impl<C> Source<C> {
    /// Create a new source
    pub fn new(id: impl Into<SourceId>, controller: C) -> Self {
        Self {
            id: id.into(),
            controller,
        }
    }
}
