//! Thread-safe facade over the ledger and the notifier.
//!
//! Appends take the write lock; every query takes the read lock. The
//! broadcast for an append runs before the write lock is released, so
//! subscribers receive events in id order. The notifier's own registry
//! lock is only ever taken after the ledger lock.

use parking_lot::RwLock;

use crate::config::StoreConfig;
use crate::dag::{
    DescendantsTree, DescendantsTreeMeta, Ledger, ProvenanceTree, ProvenanceTreeMeta, TreeView,
    View,
};
use crate::error::StoreError;
use crate::event::{Event, EventId, NewEvent};
use crate::notify::{Notifier, Subscription};

/// Descendants output whose shape was picked by a [`View`].
pub type DescendantsView = TreeView<DescendantsTree, DescendantsTreeMeta>;
/// Provenance output whose shape was picked by a [`View`].
pub type ProvenanceView = TreeView<ProvenanceTree, ProvenanceTreeMeta>;
/// Batched descendants output whose shape was picked by a [`View`].
pub type DescendantsForestView = TreeView<Vec<DescendantsTree>, Vec<DescendantsTreeMeta>>;
/// Batched provenance output whose shape was picked by a [`View`].
pub type ProvenanceForestView = TreeView<Vec<ProvenanceTree>, Vec<ProvenanceTreeMeta>>;

/// In-memory event DAG shared by any number of callers.
///
/// Every returned value is an owned copy; nothing handed out aliases the
/// store's internal state.
#[derive(Debug)]
pub struct Store {
    ledger: RwLock<Ledger>,
    notifier: Notifier,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(&StoreConfig::default())
    }

    #[must_use]
    pub fn with_config(config: &StoreConfig) -> Self {
        Self {
            ledger: RwLock::new(Ledger::with_capacity(config.initial_capacity)),
            notifier: Notifier::new(config.subscriber_capacity),
        }
    }

    /// Append a new event and notify subscribers.
    ///
    /// # Errors
    ///
    /// - [`StoreError::Validation`] for a blank type.
    /// - [`StoreError::Reference`] for a parent that does not exist.
    ///
    /// A failed emit changes nothing and notifies no one.
    pub fn emit(&self, request: NewEvent) -> Result<Event, StoreError> {
        let mut ledger = self.ledger.write();
        let event = ledger.append(request).inspect_err(|err| {
            tracing::debug!(code = %err.code(), "emit rejected: {err}");
        })?;

        let delivered = self.notifier.broadcast(&event);
        tracing::debug!(
            id = event.id,
            event_type = %event.event_type,
            parents = event.parents.len(),
            delivered,
            "emitted"
        );
        drop(ledger);

        Ok(event)
    }

    /// Fetch an event by id.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] if no such event exists.
    pub fn get(&self, id: EventId) -> Result<Event, StoreError> {
        self.ledger
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::missing(id))
    }

    /// Immediate children of `id`, ascending.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] if `id` is unknown.
    pub fn children(&self, id: EventId) -> Result<Vec<EventId>, StoreError> {
        self.ledger
            .read()
            .children(id)
            .ok_or_else(|| StoreError::missing(id))
    }

    /// Every event with no children, ascending.
    #[must_use]
    pub fn heads(&self) -> Vec<EventId> {
        self.ledger.read().heads()
    }

    /// Root events reachable from `id` through parent edges, ascending.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] if `id` is unknown.
    pub fn ancestors(&self, id: EventId) -> Result<Vec<EventId>, StoreError> {
        self.ledger.read().ancestors(id)
    }

    /// # Errors
    ///
    /// [`StoreError::NotFound`] if `root` is zero or unknown.
    pub fn descendants_tree(&self, root: EventId) -> Result<DescendantsTree, StoreError> {
        self.ledger.read().descendants_tree(root)
    }

    /// # Errors
    ///
    /// [`StoreError::NotFound`] if `root` is zero or unknown.
    pub fn descendants_tree_meta(&self, root: EventId) -> Result<DescendantsTreeMeta, StoreError> {
        self.ledger.read().descendants_tree_meta(root)
    }

    /// # Errors
    ///
    /// [`StoreError::NotFound`] if `root` is zero or unknown.
    pub fn provenance_tree(&self, root: EventId) -> Result<ProvenanceTree, StoreError> {
        self.ledger.read().provenance_tree(root)
    }

    /// # Errors
    ///
    /// [`StoreError::NotFound`] if `root` is zero or unknown.
    pub fn provenance_tree_meta(&self, root: EventId) -> Result<ProvenanceTreeMeta, StoreError> {
        self.ledger.read().provenance_tree_meta(root)
    }

    /// One descendants tree per root, in input order, from a single
    /// consistent snapshot.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] for the first zero or unknown root; no
    /// partial result is returned.
    pub fn descendants_forest(&self, roots: &[EventId]) -> Result<Vec<DescendantsTree>, StoreError> {
        self.ledger.read().descendants_forest(roots)
    }

    /// # Errors
    ///
    /// Same as [`Store::descendants_forest`].
    pub fn descendants_forest_meta(
        &self,
        roots: &[EventId],
    ) -> Result<Vec<DescendantsTreeMeta>, StoreError> {
        self.ledger.read().descendants_forest_meta(roots)
    }

    /// # Errors
    ///
    /// Same as [`Store::descendants_forest`].
    pub fn provenance_forest(&self, roots: &[EventId]) -> Result<Vec<ProvenanceTree>, StoreError> {
        self.ledger.read().provenance_forest(roots)
    }

    /// # Errors
    ///
    /// Same as [`Store::descendants_forest`].
    pub fn provenance_forest_meta(
        &self,
        roots: &[EventId],
    ) -> Result<Vec<ProvenanceTreeMeta>, StoreError> {
        self.ledger.read().provenance_forest_meta(roots)
    }

    /// # Errors
    ///
    /// [`StoreError::NotFound`] if `root` is zero or unknown.
    pub fn descendants(&self, root: EventId, view: View) -> Result<DescendantsView, StoreError> {
        self.ledger.read().descendants(root, view)
    }

    /// # Errors
    ///
    /// [`StoreError::NotFound`] if `root` is zero or unknown.
    pub fn provenance(&self, root: EventId, view: View) -> Result<ProvenanceView, StoreError> {
        self.ledger.read().provenance(root, view)
    }

    /// # Errors
    ///
    /// Same as [`Store::descendants_forest`].
    pub fn descendants_forest_view(
        &self,
        roots: &[EventId],
        view: View,
    ) -> Result<DescendantsForestView, StoreError> {
        self.ledger.read().descendants_forest_view(roots, view)
    }

    /// # Errors
    ///
    /// Same as [`Store::descendants_forest`].
    pub fn provenance_forest_view(
        &self,
        roots: &[EventId],
        view: View,
    ) -> Result<ProvenanceForestView, StoreError> {
        self.ledger.read().provenance_forest_view(roots, view)
    }

    /// Register for events emitted from now on.
    #[must_use]
    pub fn subscribe(&self) -> Subscription {
        self.notifier.subscribe()
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.notifier.subscriber_count()
    }

    /// Number of stored events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ledger.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ledger.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emit_then_get() {
        let store = Store::new();
        let event = store
            .emit(NewEvent::new("genesis").with_message("CelestialTree begins."))
            .unwrap();
        assert_eq!(event.id, 1);
        assert_eq!(store.get(1).unwrap(), event);
        assert_eq!(store.len(), 1);
        assert!(!store.is_empty());
    }

    #[test]
    fn get_unknown_is_not_found() {
        let store = Store::new();
        assert!(store.get(1).unwrap_err().is_not_found());
        assert!(store.children(1).unwrap_err().is_not_found());
    }

    #[test]
    fn failed_emit_notifies_no_one() {
        let store = Store::new();
        let mut sub = store.subscribe();
        assert!(store.emit(NewEvent::new(" ")).is_err());
        assert!(store.emit(NewEvent::new("x").with_parents([3])).is_err());
        assert!(sub.try_recv().is_err());
        assert!(store.is_empty());
    }

    #[test]
    fn subscribers_see_events_in_id_order() {
        let store = Store::with_config(&StoreConfig {
            subscriber_capacity: 16,
            initial_capacity: 16,
        });
        let mut sub = store.subscribe();
        for i in 0..5 {
            store.emit(NewEvent::new(format!("e{i}"))).unwrap();
        }
        let ids: Vec<EventId> = std::iter::from_fn(|| sub.try_recv().ok())
            .map(|e| e.id)
            .collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn returned_values_are_copies() {
        let store = Store::new();
        store.emit(NewEvent::new("a")).unwrap();
        let mut heads = store.heads();
        heads.push(99);
        assert_eq!(store.heads(), vec![1]);
    }
}
