//! Session reconciliation and event dispatch
//!
//! Every full session list pushed by the provider is reconciled against the
//! previously known set in one pass under a single lock:
//!
//! 1. drop malformed and duplicate entries
//! 2. diff against the known set by identifier
//! 3. for each removed source: unregister, then report termination
//! 4. for each added source: consult the gate; if allowed, register and
//!    immediately replay the current state and metadata (hydration)
//!
//! Per-source callbacks never wait for that lock. They append to a pending
//! queue, and whichever thread holds (or next acquires) the lock delivers
//! the queue, forwarding only events whose subscription is still live. A
//! provider may therefore call back synchronously from `subscribe`, or block
//! in `unsubscribe` until in-flight callbacks return, without stalling a
//! pass. Because termination is reported under the lock after the
//! subscription is removed, no event for a source can reach the sink after
//! its termination.
//!
//! Sink methods are invoked while the lock is held, so a sink must not call
//! back into the dispatcher.

use crate::config::ListenerConfig;
use crate::differ::{dedupe, diff};
use crate::gate::PreferenceGate;
use crate::registry::{CallbackRegistry, SubscriptionToken};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError, Weak};
use tally_core::{
    PlaybackSink, PlaybackState, PreferenceStore, SessionProvider, Source, SourceEvents, SourceId,
    TrackMetadata,
};
use tracing::{debug, info, trace, warn};

/// Where a known source currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourcePhase {
    /// The gate refused it; it is ignored until it disappears
    Blocked,
    /// Allowed and subscribed; its events are forwarded
    Subscribed,
    /// Allowed, but the provider refused the subscription
    Unsubscribed,
}

/// Outcome of one reconciliation pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Newly discovered sources, in report order
    pub added: Vec<SourceId>,
    /// Sources no longer reported, sorted
    pub removed: Vec<SourceId>,
    /// Added sources that are now subscribed
    pub subscribed: Vec<SourceId>,
    /// Added sources the gate refused
    pub blocked: Vec<SourceId>,
    /// Added sources whose subscription failed
    pub failed: Vec<SourceId>,
    /// Removed sources a termination event was emitted for
    pub terminated: Vec<SourceId>,
}

impl ReconcileReport {
    /// Whether the pass changed nothing
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

struct KnownSource<C> {
    source: Source<C>,
    phase: SourcePhase,
}

struct DispatchState<P: SessionProvider> {
    known: HashMap<SourceId, KnownSource<P::Controller>>,
    registry: CallbackRegistry<P>,
    stopped: bool,
}

enum Change {
    State(PlaybackState),
    Metadata(TrackMetadata),
}

struct PendingEvent {
    token: SubscriptionToken,
    change: Change,
}

struct Shared<P: SessionProvider> {
    provider: Arc<P>,
    gate: PreferenceGate,
    sink: Arc<dyn PlaybackSink>,
    state: Mutex<DispatchState<P>>,
    pending: Mutex<VecDeque<PendingEvent>>,
}

impl<P: SessionProvider> Shared<P> {
    fn lock(&self) -> MutexGuard<'_, DispatchState<P>> {
        // State is consistent between statements; a panicking sink leaves it usable.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn try_lock(&self) -> Option<MutexGuard<'_, DispatchState<P>>> {
        match self.state.try_lock() {
            Ok(state) => Some(state),
            Err(TryLockError::Poisoned(poisoned)) => Some(poisoned.into_inner()),
            Err(TryLockError::WouldBlock) => None,
        }
    }

    fn pending(&self) -> MutexGuard<'_, VecDeque<PendingEvent>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` under the state lock, then deliver whatever was queued meanwhile
    fn with_state<R>(&self, f: impl FnOnce(&mut DispatchState<P>) -> R) -> R {
        let mut state = self.lock();
        let result = f(&mut state);
        self.release(state);
        result
    }

    /// Drain the queue and unlock
    ///
    /// An event queued after the final drain but before the unlock would be
    /// stranded, so the queue is checked again once the lock is free. If
    /// another thread has taken the lock by then, it drains on its own release.
    fn release<'a>(&'a self, mut state: MutexGuard<'a, DispatchState<P>>) {
        loop {
            self.deliver_pending(&state);
            drop(state);

            if self.pending().is_empty() {
                return;
            }
            match self.try_lock() {
                Some(next) => state = next,
                None => return,
            }
        }
    }

    /// Forward queued events whose subscription is still live; the caller holds the lock
    fn deliver_pending(&self, state: &DispatchState<P>) {
        loop {
            let batch = std::mem::take(&mut *self.pending());
            if batch.is_empty() {
                return;
            }

            for event in batch {
                let PendingEvent { token, change } = event;
                if state.stopped || !state.registry.is_live(&token) {
                    trace!(
                        "Discarding late event for {} (generation {})",
                        token.source_id,
                        token.generation
                    );
                    continue;
                }
                match change {
                    Change::State(playback) => {
                        self.sink.on_source_state_changed(&token.source_id, playback);
                    }
                    Change::Metadata(metadata) => {
                        self.sink
                            .on_source_metadata_changed(&token.source_id, metadata);
                    }
                }
            }
        }
    }
}

/// Reconciles provider session lists and relays events to the tracker
///
/// Cheap to clone; clones share state.
pub struct SessionDispatcher<P: SessionProvider> {
    shared: Arc<Shared<P>>,
}

impl<P: SessionProvider> Clone for SessionDispatcher<P> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

/// Non-owning handle to a `SessionDispatcher`
pub struct WeakDispatcher<P: SessionProvider> {
    shared: Weak<Shared<P>>,
}

impl<P: SessionProvider> WeakDispatcher<P> {
    /// The dispatcher, if it is still alive
    pub fn upgrade(&self) -> Option<SessionDispatcher<P>> {
        self.shared
            .upgrade()
            .map(|shared| SessionDispatcher { shared })
    }
}

impl<P: SessionProvider> Clone for WeakDispatcher<P> {
    fn clone(&self) -> Self {
        Self {
            shared: Weak::clone(&self.shared),
        }
    }
}

impl<P: SessionProvider> SessionDispatcher<P> {
    /// Create a dispatcher
    pub fn new(
        provider: Arc<P>,
        store: Arc<dyn PreferenceStore>,
        sink: Arc<dyn PlaybackSink>,
        config: &ListenerConfig,
    ) -> Self {
        let registry = CallbackRegistry::new(Arc::clone(&provider));
        Self {
            shared: Arc::new(Shared {
                provider,
                gate: PreferenceGate::new(store, config.preferences.clone()),
                sink,
                state: Mutex::new(DispatchState {
                    known: HashMap::new(),
                    registry,
                    stopped: false,
                }),
                pending: Mutex::new(VecDeque::new()),
            }),
        }
    }

    /// Non-owning handle, for listeners installed on the provider
    pub fn downgrade(&self) -> WeakDispatcher<P> {
        WeakDispatcher {
            shared: Arc::downgrade(&self.shared),
        }
    }

    /// The preference gate used for new sources
    pub fn gate(&self) -> &PreferenceGate {
        &self.shared.gate
    }

    /// Reconcile a full list of currently active sessions
    ///
    /// Ignored once the dispatcher has been shut down.
    pub fn on_active_sources_changed(&self, sources: Vec<Source<P::Controller>>) -> ReconcileReport {
        self.shared
            .with_state(|state| self.reconcile(state, sources))
    }

    fn reconcile(
        &self,
        state: &mut DispatchState<P>,
        sources: Vec<Source<P::Controller>>,
    ) -> ReconcileReport {
        let mut report = ReconcileReport::default();
        if state.stopped {
            debug!("Dispatcher is shut down, ignoring {} active sessions", sources.len());
            return report;
        }

        let sources = dedupe(sources);
        let old: HashSet<SourceId> = state.known.keys().cloned().collect();
        let new: HashSet<SourceId> = sources.iter().map(|s| s.id.clone()).collect();
        let changes = diff(&old, &new);

        if changes.is_empty() {
            trace!("Active sessions reported, nothing changed");
            return report;
        }
        debug!(
            "Active sessions changed: {} added, {} removed",
            changes.added.len(),
            changes.removed.len()
        );

        for source_id in &changes.removed {
            state.known.remove(source_id);
            report.removed.push(source_id.clone());

            if state.registry.unregister(source_id) {
                info!("Stopped listening for events from {}", source_id);
                self.shared.sink.on_source_terminated(source_id);
                report.terminated.push(source_id.clone());
            }
        }

        for source in sources {
            if !changes.added.contains(&source.id) {
                continue;
            }
            report.added.push(source.id.clone());

            let phase = self.discover(state, &source);
            match phase {
                SourcePhase::Blocked => report.blocked.push(source.id.clone()),
                SourcePhase::Subscribed => report.subscribed.push(source.id.clone()),
                SourcePhase::Unsubscribed => report.failed.push(source.id.clone()),
            }
            state
                .known
                .insert(source.id.clone(), KnownSource { source, phase });
        }

        report
    }

    fn discover(
        &self,
        state: &mut DispatchState<P>,
        source: &Source<P::Controller>,
    ) -> SourcePhase {
        let shared = &self.shared;

        if !shared.gate.allowed(&source.id) {
            info!("Ignoring player {}", source.id);
            return SourcePhase::Blocked;
        }

        let weak = Arc::downgrade(shared);
        let registered = state.registry.register(source, |token| {
            Arc::new(SourceCallback { token, shared: weak }) as Arc<dyn SourceEvents>
        });

        match registered {
            Ok(_) => {}
            // Unreachable while `known` and the registry change together under the lock.
            Err(e) if e.is_already_registered() => {
                debug!("{} is already subscribed", source.id);
                return SourcePhase::Subscribed;
            }
            Err(e) => {
                warn!("Could not subscribe to {}: {}", source.id, e);
                return SourcePhase::Unsubscribed;
            }
        }

        info!("Listening for events from {}", source.id);

        // Events the provider delivered from inside `subscribe` come first.
        shared.deliver_pending(state);

        // Playback may already be in progress; the provider only reports changes.
        if let Some(playback) = shared.provider.playback_state(&source.controller) {
            shared.sink.on_source_state_changed(&source.id, playback);
        }
        if let Some(metadata) = shared.provider.metadata(&source.controller) {
            shared.sink.on_source_metadata_changed(&source.id, metadata);
        }

        SourcePhase::Subscribed
    }

    /// Terminate every subscribed source and stop accepting work
    ///
    /// Each subscription is removed before its termination is reported. Later
    /// session lists and callbacks are ignored. Returns the terminated sources;
    /// calling it again returns nothing.
    pub fn shutdown(&self) -> Vec<SourceId> {
        let shared = &self.shared;
        let terminated = shared.with_state(|state| {
            state.stopped = true;
            state.known.clear();
            let terminated = state.registry.unregister_all();
            for source_id in &terminated {
                shared.sink.on_source_terminated(source_id);
            }
            terminated
        });

        if !terminated.is_empty() {
            info!("Stopped listening to {} sources", terminated.len());
        }
        terminated
    }

    /// Whether `shutdown` has run
    pub fn is_shut_down(&self) -> bool {
        self.shared.with_state(|state| state.stopped)
    }

    /// Every source in the last reported list, including blocked ones
    pub fn active_sources(&self) -> Vec<SourceId> {
        let mut ids: Vec<SourceId> = self
            .shared
            .with_state(|state| state.known.keys().cloned().collect());
        ids.sort();
        ids
    }

    /// Sources whose events are currently forwarded
    pub fn subscribed_sources(&self) -> Vec<SourceId> {
        self.shared.with_state(|state| state.registry.sources())
    }

    /// Phase of a known source
    pub fn phase(&self, source_id: &SourceId) -> Option<SourcePhase> {
        self.shared
            .with_state(|state| state.known.get(source_id).map(|k| k.phase))
    }

    /// Controller handle of a known source
    pub fn controller(&self, source_id: &SourceId) -> Option<P::Controller> {
        self.shared.with_state(|state| {
            state
                .known
                .get(source_id)
                .map(|k| k.source.controller.clone())
        })
    }
}

/// Change callbacks for one subscription of one source
struct SourceCallback<P: SessionProvider> {
    token: SubscriptionToken,
    shared: Weak<Shared<P>>,
}

impl<P: SessionProvider> SourceCallback<P> {
    fn forward(&self, change: Change) {
        let Some(shared) = self.shared.upgrade() else {
            return;
        };

        shared.pending().push_back(PendingEvent {
            token: self.token.clone(),
            change,
        });

        // Busy means a pass or another callback holds the lock; it delivers on release.
        if let Some(state) = shared.try_lock() {
            shared.release(state);
        };
    }
}

impl<P: SessionProvider> SourceEvents for SourceCallback<P> {
    fn on_playback_state_changed(&self, state: PlaybackState) {
        self.forward(Change::State(state));
    }

    fn on_metadata_changed(&self, metadata: TrackMetadata) {
        self.forward(Change::Metadata(metadata));
    }
}
