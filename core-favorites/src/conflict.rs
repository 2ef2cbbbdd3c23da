//! Conflict resolution between local and remote favorites.
//!
//! Pure functions, no I/O and no clock: given the same inputs the result is
//! identical on every call.

use std::collections::HashSet;

use crate::models::{ActionKind, FavoriteWord, PendingAction, WordId};

/// Reconcile a local and a remote favorites snapshot.
///
/// Remote wins on identity conflicts: a word present in both sets keeps the
/// remote copy's fields. Words present only locally were favorited offline
/// and not yet flushed; dropping them would silently lose user intent, so
/// they are preserved.
///
/// Ordering is remote entries first in remote order, then local-only extras
/// in local order.
pub fn resolve(local: &[FavoriteWord], remote: &[FavoriteWord]) -> Vec<FavoriteWord> {
    let remote_ids: HashSet<&WordId> = remote.iter().map(|w| &w.word_id).collect();

    let mut resolved = remote.to_vec();
    resolved.extend(
        local
            .iter()
            .filter(|w| !remote_ids.contains(&w.word_id))
            .cloned(),
    );
    resolved
}

/// Like [`resolve`], additionally cross-referencing the pending queue: a word
/// with a queued removal is excluded from the merged snapshot, so a resync
/// does not resurrect a favorite whose removal is still in flight.
pub fn resolve_with_pending(
    local: &[FavoriteWord],
    remote: &[FavoriteWord],
    pending: &[PendingAction],
) -> Vec<FavoriteWord> {
    let pending_removals: HashSet<&WordId> = pending
        .iter()
        .filter(|a| a.kind == ActionKind::Remove)
        .map(|a| &a.word_id)
        .collect();

    resolve(local, remote)
        .into_iter()
        .filter(|w| !pending_removals.contains(&w.word_id))
        .collect()
}
