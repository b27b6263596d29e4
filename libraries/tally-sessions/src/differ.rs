//! Session set difference
//!
//! Computes which sources appeared and which went away between two provider
//! reports. Sources are compared by identifier only; controller handles are
//! not comparable across reports.

use std::collections::{BTreeSet, HashSet};
use tally_core::types::{Source, SourceId};
use tracing::warn;

/// Result of diffing two identifier sets
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionDiff {
    /// In the new set but not the old one
    pub added: BTreeSet<SourceId>,
    /// In the old set but not the new one
    pub removed: BTreeSet<SourceId>,
}

impl SessionDiff {
    /// Whether nothing changed
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Compute `removed = old - new` and `added = new - old`
pub fn diff(old: &HashSet<SourceId>, new: &HashSet<SourceId>) -> SessionDiff {
    SessionDiff {
        added: new.difference(old).cloned().collect(),
        removed: old.difference(new).cloned().collect(),
    }
}

/// Drop malformed entries and collapse duplicates from a provider report
///
/// The first entry for an identifier wins. Report order is preserved so that
/// newly discovered sources are processed in the order the provider listed them.
pub fn dedupe<C>(sources: Vec<Source<C>>) -> Vec<Source<C>> {
    let mut seen = HashSet::with_capacity(sources.len());
    let mut unique = Vec::with_capacity(sources.len());

    for source in sources {
        if source.id.is_blank() {
            warn!("Ignoring session with blank source identifier");
            continue;
        }
        if !seen.insert(source.id.clone()) {
            warn!("Duplicate session reported for {}, keeping the first", source.id);
            continue;
        }
        unique.push(source);
    }

    unique
}
