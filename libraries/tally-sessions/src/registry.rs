//! Live subscriptions, one per source
//!
//! Entries are removed deterministically on `unregister`; nothing is left to
//! be dropped "eventually". Each subscription carries a generation so a
//! callback built for an earlier subscription of the same source can be told
//! apart from the current one.

use std::collections::HashMap;
use std::sync::Arc;
use tally_core::{Result, SessionProvider, Source, SourceEvents, SourceId, TallyError};
use tracing::debug;

/// Identifies one particular subscription of a source
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionToken {
    /// Source the subscription belongs to
    pub source_id: SourceId,
    /// Monotonic per-registry counter
    pub generation: u64,
}

struct Subscription<H> {
    generation: u64,
    handle: H,
}

/// Owns the provider-level callback bindings
pub struct CallbackRegistry<P: SessionProvider> {
    provider: Arc<P>,
    subscriptions: HashMap<SourceId, Subscription<P::Subscription>>,
    next_generation: u64,
}

impl<P: SessionProvider> CallbackRegistry<P> {
    /// Create an empty registry
    pub fn new(provider: Arc<P>) -> Self {
        Self {
            provider,
            subscriptions: HashMap::new(),
            next_generation: 1,
        }
    }

    /// Install change callbacks for `source`
    ///
    /// `make_events` builds the callback value for this subscription from its
    /// token. Fails with `AlreadyRegistered` (and changes nothing) if the
    /// source already has a live subscription.
    pub fn register<F>(
        &mut self,
        source: &Source<P::Controller>,
        make_events: F,
    ) -> Result<SubscriptionToken>
    where
        F: FnOnce(SubscriptionToken) -> Arc<dyn SourceEvents>,
    {
        if self.subscriptions.contains_key(&source.id) {
            return Err(TallyError::AlreadyRegistered(source.id.clone()));
        }

        let token = SubscriptionToken {
            source_id: source.id.clone(),
            generation: self.next_generation,
        };
        self.next_generation += 1;

        let handle = self
            .provider
            .subscribe(source, make_events(token.clone()))?;

        self.subscriptions.insert(
            source.id.clone(),
            Subscription {
                generation: token.generation,
                handle,
            },
        );
        debug!(
            "Registered callbacks for {} (generation {})",
            token.source_id, token.generation
        );

        Ok(token)
    }

    /// Remove the callbacks of `source_id`
    ///
    /// Returns whether a subscription existed. A no-op for unknown sources.
    pub fn unregister(&mut self, source_id: &SourceId) -> bool {
        let Some(subscription) = self.subscriptions.remove(source_id) else {
            return false;
        };

        self.provider.unsubscribe(subscription.handle);
        debug!(
            "Unregistered callbacks for {} (generation {})",
            source_id, subscription.generation
        );
        true
    }

    /// Remove every subscription, returning the affected sources in order
    pub fn unregister_all(&mut self) -> Vec<SourceId> {
        let mut ids: Vec<SourceId> = self.subscriptions.keys().cloned().collect();
        ids.sort();
        ids.retain(|id| self.unregister(id));
        ids
    }

    /// Whether `token` still names the live subscription of its source
    pub fn is_live(&self, token: &SubscriptionToken) -> bool {
        self.subscriptions
            .get(&token.source_id)
            .is_some_and(|s| s.generation == token.generation)
    }

    /// Whether `source_id` has a live subscription
    pub fn contains(&self, source_id: &SourceId) -> bool {
        self.subscriptions.contains_key(source_id)
    }

    /// Subscribed sources, sorted
    pub fn sources(&self) -> Vec<SourceId> {
        let mut ids: Vec<SourceId> = self.subscriptions.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Number of live subscriptions
    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    /// Whether there are no live subscriptions
    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }
}

impl<P: SessionProvider> Drop for CallbackRegistry<P> {
    fn drop(&mut self) {
        for (_, subscription) in self.subscriptions.drain() {
            self.provider.unsubscribe(subscription.handle);
        }
    }
}
