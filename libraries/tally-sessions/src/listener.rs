//! Listener service
//!
//! Wires a `SessionDispatcher` to a `SessionProvider`: checks access,
//! installs the active-sessions listener, and reconciles the sessions that
//! are already active at start-up.

use crate::config::ListenerConfig;
use crate::dispatcher::{ReconcileReport, SessionDispatcher};
use std::sync::Arc;
use tally_core::{PlaybackSink, PreferenceStore, Result, SessionProvider, Source, TallyError};
use tracing::{info, warn};

/// Running media-session listener
///
/// Stops on drop.
pub struct SessionListener<P: SessionProvider> {
    provider: Arc<P>,
    dispatcher: SessionDispatcher<P>,
    running: bool,
}

impl<P: SessionProvider> SessionListener<P> {
    /// Start listening to `provider`
    ///
    /// # Errors
    /// - `AccessDenied` if the host has not granted media-session access
    /// - the provider's error if the listener cannot be installed
    pub fn start(
        provider: Arc<P>,
        store: Arc<dyn PreferenceStore>,
        sink: Arc<dyn PlaybackSink>,
        config: &ListenerConfig,
    ) -> Result<Self> {
        config.validate()?;

        if !provider.has_access() {
            warn!("Media session access has not been granted");
            return Err(TallyError::AccessDenied);
        }

        let dispatcher = SessionDispatcher::new(Arc::clone(&provider), store, sink, config);

        let weak = dispatcher.downgrade();
        provider.watch_active_sources(Box::new(move |sources: Vec<Source<P::Controller>>| {
            if let Some(dispatcher) = weak.upgrade() {
                dispatcher.on_active_sources_changed(sources);
            }
        }))?;

        info!("Session listener started");

        let mut listener = Self {
            provider,
            dispatcher,
            running: true,
        };

        // Sessions that were already active never produce a change notification.
        if let Err(e) = listener.refresh() {
            listener.stop();
            return Err(e);
        }

        Ok(listener)
    }

    /// Reconcile against the provider's current session list
    ///
    /// # Errors
    /// - `Stopped` once `stop` has run
    /// - the provider's error if sessions cannot be enumerated
    pub fn refresh(&self) -> Result<ReconcileReport> {
        if !self.running {
            return Err(TallyError::Stopped);
        }
        let sources = self.provider.active_sources()?;
        Ok(self.dispatcher.on_active_sources_changed(sources))
    }

    /// The dispatcher driving this listener
    pub fn dispatcher(&self) -> &SessionDispatcher<P> {
        &self.dispatcher
    }

    /// Whether the listener is still installed
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Remove the provider listener and terminate every tracked source
    ///
    /// Session lists still in flight from the provider are ignored afterwards.
    pub fn stop(&mut self) {
        if !self.running {
            return;
        }
        self.running = false;

        self.provider.unwatch_active_sources();
        let terminated = self.dispatcher.shutdown();
        info!(
            "Session listener stopped ({} sources terminated)",
            terminated.len()
        );
    }
}

impl<P: SessionProvider> Drop for SessionListener<P> {
    fn drop(&mut self) {
        self.stop();
    }
}
