//! Per-source tracking preference
//!
//! Decides whether events from a source are forwarded at all. The first time a
//! source is seen its preference is written from the global "track new
//! sources" default; after that only explicit user action changes it.

use crate::config::PreferenceSettings;
use std::sync::Arc;
use tally_core::{PreferenceStore, Result, SourceId};
use tracing::{debug, info, warn};

/// Tracking gate backed by a `PreferenceStore`
#[derive(Clone)]
pub struct PreferenceGate {
    store: Arc<dyn PreferenceStore>,
    settings: PreferenceSettings,
}

impl PreferenceGate {
    /// Create a gate over `store` using the given key layout
    pub fn new(store: Arc<dyn PreferenceStore>, settings: PreferenceSettings) -> Self {
        Self { store, settings }
    }

    /// Whether events from `source_id` should be forwarded
    ///
    /// Writes the default preference for a previously unseen source before
    /// returning. Storage failures fail open.
    pub fn allowed(&self, source_id: &SourceId) -> bool {
        match self.evaluate(source_id) {
            Ok(allowed) => allowed,
            Err(e) => {
                warn!(
                    "Preference store unavailable for {}, tracking anyway: {}",
                    source_id, e
                );
                true
            }
        }
    }

    fn evaluate(&self, source_id: &SourceId) -> Result<bool> {
        let key = self.settings.source_key(source_id);

        if self.store.contains(&key)? {
            return self.store.get_bool(&key, true);
        }

        let default = self.track_new_sources()?;
        self.store.set_bool(&key, default)?;
        debug!("First sighting of {}, stored default {}", source_id, default);
        Ok(default)
    }

    /// Stored preference for `source_id`, if any
    ///
    /// Unlike `allowed`, this never writes and surfaces storage errors.
    pub fn is_enabled(&self, source_id: &SourceId) -> Result<Option<bool>> {
        let key = self.settings.source_key(source_id);
        if !self.store.contains(&key)? {
            return Ok(None);
        }
        self.store.get_bool(&key, true).map(Some)
    }

    /// Explicitly enable or disable tracking for a source
    ///
    /// Takes effect the next time the source is discovered.
    pub fn set_enabled(&self, source_id: &SourceId, enabled: bool) -> Result<()> {
        let key = self.settings.source_key(source_id);
        self.store.set_bool(&key, enabled)?;
        info!(
            "Tracking {} for {}",
            if enabled { "enabled" } else { "disabled" },
            source_id
        );
        Ok(())
    }

    /// Global default applied to newly seen sources
    pub fn track_new_sources(&self) -> Result<bool> {
        self.store.get_bool(
            &self.settings.track_new_sources_key,
            self.settings.track_new_sources_default,
        )
    }

    /// Change the global default for newly seen sources
    pub fn set_track_new_sources(&self, enabled: bool) -> Result<()> {
        self.store
            .set_bool(&self.settings.track_new_sources_key, enabled)
    }
}

impl std::fmt::Debug for PreferenceGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreferenceGate")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
