//! Tally - Session Reconciliation
//!
//! Platform-agnostic active media-session tracking for Tally.
//!
//! This crate provides:
//! - Session set diffing by source identity
//! - A persisted per-source tracking gate (new sources default to the global
//!   "track new sources" setting)
//! - A callback registry with at most one live subscription per source
//! - Reconciliation and dispatch of state/metadata events, including replay of
//!   the current state right after subscribing
//! - A listener service that wires it all to a `SessionProvider`
//!
//! # Architecture
//!
//! `tally-sessions` is completely platform-agnostic:
//! - No dependency on any OS media-session API
//! - No dependency on the scrobbling/network layer
//! - No opinion on how preferences are persisted
//!
//! Platform-specific code (session enumeration, callbacks, preference storage)
//! is provided via the traits in `tally-core`.
//!
//! # Ordering
//!
//! For every source, its subscription is removed before `on_source_terminated`
//! is delivered, and no event for that source reaches the sink afterwards.
//!
//! # Example: Channel-fed tracker
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tally_core::{MemoryPreferenceStore, SessionProvider};
//! use tally_sessions::{ChannelSink, ListenerConfig, SessionListener, TrackerEvent};
//!
//! async fn run<P: SessionProvider>(provider: Arc<P>) -> tally_core::Result<()> {
//!     let (sink, mut events) = ChannelSink::new();
//!     let store = Arc::new(MemoryPreferenceStore::new());
//!
//!     let _listener = SessionListener::start(
//!         provider,
//!         store,
//!         Arc::new(sink),
//!         &ListenerConfig::default(),
//!     )?;
//!
//!     while let Some(event) = events.recv().await {
//!         match event {
//!             TrackerEvent::StateChanged { source_id, state } => {
//!                 println!("{source_id}: {}", state.status);
//!             }
//!             TrackerEvent::MetadataChanged { source_id, metadata } => {
//!                 println!("{source_id}: {:?}", metadata.title);
//!             }
//!             TrackerEvent::Terminated { source_id } => {
//!                 println!("{source_id} went away");
//!             }
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod differ;
pub mod dispatcher;
pub mod events;
pub mod gate;
pub mod listener;
pub mod registry;

// Public exports
pub use config::{ListenerConfig, PreferenceSettings};
pub use differ::{diff, SessionDiff};
pub use dispatcher::{ReconcileReport, SessionDispatcher, SourcePhase, WeakDispatcher};
pub use events::{ChannelSink, TrackerEvent};
pub use gate::PreferenceGate;
pub use listener::SessionListener;
pub use registry::{CallbackRegistry, SubscriptionToken};
