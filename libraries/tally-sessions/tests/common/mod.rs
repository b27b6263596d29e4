//! Shared test doubles: a scriptable session provider and a recording sink
//! that write into one journal, so tests can assert on global ordering.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::thread;
use std::time::Duration;
use tally_core::{
    ActiveSourcesListener, PlaybackSink, PlaybackState, PlaybackStatus, Result, SessionProvider,
    Source, SourceEvents, SourceId, TallyError, TrackMetadata,
};

static INIT: Once = Once::new();

pub fn init_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_max_level(tracing::Level::DEBUG)
            .try_init();
    });
}

/// Everything observable, in the order it happened
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Subscribe(String),
    Unsubscribe(String),
    State(String, PlaybackStatus),
    Metadata(String, Option<String>),
    Terminated(String),
}

impl Call {
    pub fn source(&self) -> &str {
        match self {
            Call::Subscribe(id)
            | Call::Unsubscribe(id)
            | Call::State(id, _)
            | Call::Metadata(id, _)
            | Call::Terminated(id) => id,
        }
    }
}

#[derive(Debug, Default)]
pub struct Journal {
    calls: Mutex<Vec<Call>>,
}

impl Journal {
    pub fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, id: &str) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| c.source() == id)
            .collect()
    }

    pub fn count(&self, call: &Call) -> usize {
        self.calls().iter().filter(|c| *c == call).count()
    }

    pub fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }
}

/// Session state the fake provider reports for hydration
#[derive(Debug, Default)]
pub struct FakeSession {
    pub state: Mutex<Option<PlaybackState>>,
    pub metadata: Mutex<Option<TrackMetadata>>,
}

pub type Controller = Arc<FakeSession>;

pub fn playing() -> PlaybackState {
    PlaybackState::new(PlaybackStatus::Playing, Duration::from_secs(42))
}

pub fn paused() -> PlaybackState {
    PlaybackState::new(PlaybackStatus::Paused, Duration::from_secs(43))
}

pub fn song(title: &str) -> TrackMetadata {
    TrackMetadata::new(title, "Some Artist")
        .with_album("Some Album")
        .with_duration(Duration::from_secs(200))
}

pub fn session(
    id: &str,
    state: Option<PlaybackState>,
    metadata: Option<TrackMetadata>,
) -> Source<Controller> {
    Source::new(
        id,
        Arc::new(FakeSession {
            state: Mutex::new(state),
            metadata: Mutex::new(metadata),
        }),
    )
}

pub fn idle(id: &str) -> Source<Controller> {
    session(id, None, None)
}

struct Binding {
    source_id: SourceId,
    events: Arc<dyn SourceEvents>,
}

type SharedListener = Arc<dyn Fn(Vec<Source<Controller>>) + Send + Sync>;

/// How the fake provider calls back while a registration is in progress
#[derive(Debug, Clone, Default)]
pub enum Echo {
    /// Only when a test emits
    #[default]
    Never,
    /// From inside `subscribe`, on the calling thread
    Inline(PlaybackState),
    /// From another thread that `subscribe` waits for
    OtherThread(PlaybackState),
}

pub struct FakeProvider {
    journal: Arc<Journal>,
    sessions: Mutex<Vec<Source<Controller>>>,
    listener: Mutex<Option<SharedListener>>,
    live: Mutex<HashMap<u64, Binding>>,
    ever: Mutex<Vec<Binding>>,
    next_handle: AtomicU64,
    access: AtomicBool,
    refuse: Mutex<HashSet<String>>,
    fail_enumeration: AtomicBool,
    echo: Mutex<Echo>,
    drain_on_unsubscribe: AtomicBool,
}

impl FakeProvider {
    pub fn new(journal: Arc<Journal>) -> Self {
        Self {
            journal,
            sessions: Mutex::new(Vec::new()),
            listener: Mutex::new(None),
            live: Mutex::new(HashMap::new()),
            ever: Mutex::new(Vec::new()),
            next_handle: AtomicU64::new(1),
            access: AtomicBool::new(true),
            refuse: Mutex::new(HashSet::new()),
            fail_enumeration: AtomicBool::new(false),
            echo: Mutex::new(Echo::Never),
            drain_on_unsubscribe: AtomicBool::new(false),
        }
    }

    pub fn deny_access(&self) {
        self.access.store(false, Ordering::SeqCst);
    }

    pub fn fail_enumeration(&self) {
        self.fail_enumeration.store(true, Ordering::SeqCst);
    }

    pub fn refuse_subscriptions_for(&self, id: &str) {
        self.refuse.lock().unwrap().insert(id.to_string());
    }

    pub fn echo_on_subscribe(&self, echo: Echo) {
        *self.echo.lock().unwrap() = echo;
    }

    /// Make `unsubscribe` wait for a callback delivered on another thread,
    /// like platforms that block until in-flight notifications finish
    pub fn drain_on_unsubscribe(&self) {
        self.drain_on_unsubscribe.store(true, Ordering::SeqCst);
    }

    /// Set the sessions returned by `active_sources` without notifying
    pub fn set_sessions(&self, sessions: Vec<Source<Controller>>) {
        *self.sessions.lock().unwrap() = sessions;
    }

    /// Set the sessions and notify the installed listener, if any
    ///
    /// The listener runs without any of the fake's locks held, so pushes from
    /// several threads reach the dispatcher concurrently.
    pub fn push(&self, sessions: Vec<Source<Controller>>) {
        self.set_sessions(sessions.clone());
        let listener = self.listener.lock().unwrap().clone();
        if let Some(listener) = listener {
            listener(sessions);
        }
    }

    pub fn has_listener(&self) -> bool {
        self.listener.lock().unwrap().is_some()
    }

    pub fn live_subscriptions(&self) -> usize {
        self.live.lock().unwrap().len()
    }

    fn live_for(&self, id: &str) -> Vec<Arc<dyn SourceEvents>> {
        self.live
            .lock()
            .unwrap()
            .values()
            .filter(|b| b.source_id.as_str() == id)
            .map(|b| Arc::clone(&b.events))
            .collect()
    }

    /// Deliver a state change through the live callbacks of `id`
    pub fn emit_state(&self, id: &str, state: PlaybackState) {
        for events in self.live_for(id) {
            events.on_playback_state_changed(state.clone());
        }
    }

    /// Deliver a metadata change through the live callbacks of `id`
    pub fn emit_metadata(&self, id: &str, metadata: TrackMetadata) {
        for events in self.live_for(id) {
            events.on_metadata_changed(metadata.clone());
        }
    }

    /// Every callback ever handed out for `id`, including unsubscribed ones,
    /// to simulate deliveries that were already in flight
    pub fn all_callbacks_for(&self, id: &str) -> Vec<Arc<dyn SourceEvents>> {
        self.ever
            .lock()
            .unwrap()
            .iter()
            .filter(|b| b.source_id.as_str() == id)
            .map(|b| Arc::clone(&b.events))
            .collect()
    }
}

impl SessionProvider for FakeProvider {
    type Controller = Controller;
    type Subscription = u64;

    fn has_access(&self) -> bool {
        self.access.load(Ordering::SeqCst)
    }

    fn active_sources(&self) -> Result<Vec<Source<Controller>>> {
        if self.fail_enumeration.load(Ordering::SeqCst) {
            return Err(TallyError::provider("enumeration failed"));
        }
        Ok(self.sessions.lock().unwrap().clone())
    }

    fn watch_active_sources(&self, listener: ActiveSourcesListener<Controller>) -> Result<()> {
        *self.listener.lock().unwrap() = Some(Arc::from(listener));
        Ok(())
    }

    fn unwatch_active_sources(&self) {
        self.listener.lock().unwrap().take();
    }

    fn subscribe(
        &self,
        source: &Source<Controller>,
        events: Arc<dyn SourceEvents>,
    ) -> Result<u64> {
        if self.refuse.lock().unwrap().contains(source.id.as_str()) {
            return Err(TallyError::provider("subscription refused"));
        }

        let handle = self.next_handle.fetch_add(1, Ordering::SeqCst);
        self.live.lock().unwrap().insert(
            handle,
            Binding {
                source_id: source.id.clone(),
                events: Arc::clone(&events),
            },
        );
        self.ever.lock().unwrap().push(Binding {
            source_id: source.id.clone(),
            events: Arc::clone(&events),
        });
        self.journal.record(Call::Subscribe(source.id.to_string()));

        let echo = self.echo.lock().unwrap().clone();
        match echo {
            Echo::Never => {}
            Echo::Inline(state) => events.on_playback_state_changed(state),
            Echo::OtherThread(state) => thread::scope(|s| {
                s.spawn(|| events.on_playback_state_changed(state));
            }),
        }
        Ok(handle)
    }

    fn unsubscribe(&self, subscription: u64) {
        let binding = self.live.lock().unwrap().remove(&subscription);
        let Some(binding) = binding else {
            return;
        };
        self.journal
            .record(Call::Unsubscribe(binding.source_id.to_string()));

        if self.drain_on_unsubscribe.load(Ordering::SeqCst) {
            thread::scope(|s| {
                s.spawn(|| binding.events.on_playback_state_changed(paused()));
            });
        }
    }

    fn playback_state(&self, controller: &Controller) -> Option<PlaybackState> {
        controller.state.lock().unwrap().clone()
    }

    fn metadata(&self, controller: &Controller) -> Option<TrackMetadata> {
        controller.metadata.lock().unwrap().clone()
    }
}

pub struct RecordingSink {
    journal: Arc<Journal>,
}

impl RecordingSink {
    pub fn new(journal: Arc<Journal>) -> Self {
        Self { journal }
    }
}

impl PlaybackSink for RecordingSink {
    fn on_source_state_changed(&self, source_id: &SourceId, state: PlaybackState) {
        self.journal
            .record(Call::State(source_id.to_string(), state.status));
    }

    fn on_source_metadata_changed(&self, source_id: &SourceId, metadata: TrackMetadata) {
        self.journal
            .record(Call::Metadata(source_id.to_string(), metadata.title));
    }

    fn on_source_terminated(&self, source_id: &SourceId) {
        self.journal.record(Call::Terminated(source_id.to_string()));
    }
}

/// Asserts that nothing is recorded for `id` after its last termination
/// unless a new subscription was made in between
pub fn assert_nothing_after_termination(calls: &[Call], id: &str) {
    let mut terminated = false;
    for call in calls.iter().filter(|c| c.source() == id) {
        match call {
            Call::Terminated(_) => terminated = true,
            Call::Subscribe(_) => terminated = false,
            Call::State(..) | Call::Metadata(..) => {
                assert!(!terminated, "event for {id} after termination: {calls:?}");
            }
            Call::Unsubscribe(_) => {}
        }
    }
}
