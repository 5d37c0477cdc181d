//! Optimistic sync protocol
//!
//! Clients that have fetched a collection mutate it speculatively to
//! stay responsive, then reconcile with the server's authoritative
//! result or roll back on failure.
//!
//! Temporary identifiers live in their own key space
//! ([`ItemKey::Pending`]) so a reconciliation can never mistake a
//! speculative item for a server-confirmed one. All mutations keep the
//! collection newest-first: new items are prepended, never appended.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Temporary identifier for a speculative item, disjoint by type from
/// server-issued ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PendingId(Uuid);

impl PendingId {
    fn fresh() -> Self {
        Self(Uuid::new_v4())
    }
}

/// Key of a collection entry: either awaiting server confirmation or
/// already confirmed under a server id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemKey {
    Pending(PendingId),
    Server(i64),
}

/// One keyed entry in a synced collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entry<T> {
    pub key: ItemKey,
    pub item: T,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SyncError {
    /// The pending entry left the collection before the confirmation
    /// arrived (e.g. a delete raced ahead); the response must not be
    /// applied.
    #[error("pending item no longer present")]
    PendingGone,
    /// The keyed entry to delete is not in the collection.
    #[error("item not present")]
    NotPresent,
}

/// Saved state for an in-flight optimistic delete. Dropping it on
/// server success discards the backup; [`SyncList::rollback`] restores
/// the entry at its exact prior position on failure.
#[derive(Debug)]
pub struct DeleteTicket<T> {
    index: usize,
    entry: Entry<T>,
}

/// A locally held collection kept newest-first, mirroring a server
/// collection through optimistic mutations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncList<T> {
    entries: Vec<Entry<T>>,
}

impl<T> SyncList<T> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Seed from a server fetch. Items are assumed to already be in
    /// newest-first order, as the server returns them.
    pub fn from_confirmed(items: impl IntoIterator<Item = (i64, T)>) -> Self {
        Self {
            entries: items
                .into_iter()
                .map(|(id, item)| Entry {
                    key: ItemKey::Server(id),
                    item,
                })
                .collect(),
        }
    }

    pub fn entries(&self) -> &[Entry<T>] {
        &self.entries
    }

    pub fn items(&self) -> impl Iterator<Item = &T> {
        self.entries.iter().map(|entry| &entry.item)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: ItemKey) -> bool {
        self.entries.iter().any(|entry| entry.key == key)
    }

    /// Remove the entry immediately, before the delete call is issued.
    /// The returned ticket restores it exactly if the server fails.
    pub fn stage_delete(&mut self, key: ItemKey) -> Result<DeleteTicket<T>, SyncError> {
        let index = self
            .entries
            .iter()
            .position(|entry| entry.key == key)
            .ok_or(SyncError::NotPresent)?;
        let entry = self.entries.remove(index);
        Ok(DeleteTicket { index, entry })
    }

    /// Restore the exact prior state after a failed delete.
    pub fn rollback(&mut self, ticket: DeleteTicket<T>) {
        let index = ticket.index.min(self.entries.len());
        self.entries.insert(index, ticket.entry);
    }

    /// Insert a speculative item at the head of the collection under a
    /// fresh pending key, before the create call is issued.
    pub fn stage_create(&mut self, item: T) -> PendingId {
        let pending = PendingId::fresh();
        self.entries.insert(
            0,
            Entry {
                key: ItemKey::Pending(pending),
                item,
            },
        );
        pending
    }

    /// Replace the speculative entry with the server's authoritative
    /// item, matched by pending id only. Refused if the pending entry
    /// is gone: a delete that raced ahead of the confirmation must not
    /// resurrect the item.
    pub fn confirm_create(
        &mut self,
        pending: PendingId,
        server_id: i64,
        item: T,
    ) -> Result<(), SyncError> {
        let entry = self
            .entries
            .iter_mut()
            .find(|entry| entry.key == ItemKey::Pending(pending))
            .ok_or(SyncError::PendingGone)?;
        *entry = Entry {
            key: ItemKey::Server(server_id),
            item,
        };
        Ok(())
    }

    /// Drop the speculative entry after a failed create. The next
    /// confirmed state must not contain it; surfacing the error to the
    /// user is the caller's concern.
    pub fn abandon_create(&mut self, pending: PendingId) -> Option<T> {
        let index = self
            .entries
            .iter()
            .position(|entry| entry.key == ItemKey::Pending(pending))?;
        Some(self.entries.remove(index).item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys<T>(list: &SyncList<T>) -> Vec<ItemKey> {
        list.entries().iter().map(|e| e.key).collect()
    }

    #[test]
    fn failed_delete_rolls_back_to_exact_prior_state() {
        // Local list [A, B]
        let mut list = SyncList::from_confirmed([(1, "A"), (2, "B")]);

        let ticket = list.stage_delete(ItemKey::Server(1)).unwrap();
        assert_eq!(list.items().copied().collect::<Vec<_>>(), vec!["B"]);

        // Server failure: full rollback
        list.rollback(ticket);
        assert_eq!(list.items().copied().collect::<Vec<_>>(), vec!["A", "B"]);
        assert_eq!(
            keys(&list),
            vec![ItemKey::Server(1), ItemKey::Server(2)]
        );
    }

    #[test]
    fn successful_delete_needs_no_further_action() {
        let mut list = SyncList::from_confirmed([(1, "A"), (2, "B")]);
        let ticket = list.stage_delete(ItemKey::Server(2)).unwrap();
        drop(ticket);
        assert_eq!(list.items().copied().collect::<Vec<_>>(), vec!["A"]);
    }

    #[test]
    fn deleting_absent_key_is_refused() {
        let mut list = SyncList::from_confirmed([(1, "A")]);
        assert_eq!(
            list.stage_delete(ItemKey::Server(99)).unwrap_err(),
            SyncError::NotPresent
        );
    }

    #[test]
    fn confirmed_create_replaces_pending_in_place() {
        let mut list: SyncList<&str> = SyncList::new();

        let pending = list.stage_create("draft");
        assert!(list.contains(ItemKey::Pending(pending)));

        list.confirm_create(pending, 42, "authoritative").unwrap();

        assert_eq!(keys(&list), vec![ItemKey::Server(42)]);
        assert_eq!(
            list.items().copied().collect::<Vec<_>>(),
            vec!["authoritative"]
        );
        // No trace of the temporary id remains
        assert!(!list.contains(ItemKey::Pending(pending)));
    }

    #[test]
    fn creates_prepend_newest_first() {
        let mut list = SyncList::from_confirmed([(1, "old")]);
        list.stage_create("new");
        assert_eq!(list.items().copied().collect::<Vec<_>>(), vec!["new", "old"]);
    }

    #[test]
    fn raced_delete_wins_over_late_confirmation() {
        let mut list: SyncList<&str> = SyncList::new();

        let pending = list.stage_create("draft");
        let ticket = list.stage_delete(ItemKey::Pending(pending)).unwrap();
        drop(ticket); // delete succeeded

        // Confirmation arrives after the delete: must not resurrect
        assert_eq!(
            list.confirm_create(pending, 42, "authoritative").unwrap_err(),
            SyncError::PendingGone
        );
        assert!(list.is_empty());
    }

    #[test]
    fn abandoned_create_leaves_no_speculative_entry() {
        let mut list = SyncList::from_confirmed([(1, "A")]);
        let pending = list.stage_create("draft");

        assert_eq!(list.abandon_create(pending), Some("draft"));
        assert_eq!(list.items().copied().collect::<Vec<_>>(), vec!["A"]);
    }

    #[test]
    fn pending_keys_never_collide_with_server_keys() {
        let mut list: SyncList<&str> = SyncList::new();
        let pending = list.stage_create("draft");
        // Same numeric content cannot match across key spaces
        assert_ne!(ItemKey::Pending(pending), ItemKey::Server(0));
        assert!(!list.contains(ItemKey::Server(0)));
    }
}
