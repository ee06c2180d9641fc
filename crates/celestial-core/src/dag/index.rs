//! Graph indices derived from the ledger.
//!
//! [`GraphIndex`] keeps the forward adjacency (parent → children) and the
//! heads set in step with every append. Both are pure functions of the
//! events stored so far; the ledger updates them inside the same critical
//! section that stores the event, so no reader can see one without the
//! other.

use std::collections::{BTreeSet, HashMap};

use crate::event::EventId;

/// Parent→children adjacency plus the set of events with no children.
#[derive(Debug, Clone, Default)]
pub struct GraphIndex {
    /// Only parents that have at least one child get an entry.
    children: HashMap<EventId, BTreeSet<EventId>>,
    heads: BTreeSet<EventId>,
}

impl GraphIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            children: HashMap::with_capacity(capacity),
            heads: BTreeSet::new(),
        }
    }

    /// Record a freshly appended event.
    ///
    /// The new event becomes a head; each parent gains an edge to it and
    /// stops being a head. Callers must have verified that every parent
    /// exists. Runs in O(P log N) where P is the number of parents.
    pub fn link(&mut self, id: EventId, parents: &[EventId]) {
        self.heads.insert(id);
        for &parent in parents {
            self.children.entry(parent).or_default().insert(id);
            self.heads.remove(&parent);
        }
    }

    /// Immediate children of `id`, ascending. Empty for leaves and for ids
    /// the index has never seen; existence checks belong to the ledger.
    pub fn children_of(&self, id: EventId) -> impl Iterator<Item = EventId> + '_ {
        self.children.get(&id).into_iter().flatten().copied()
    }

    /// Current heads, ascending.
    pub fn heads(&self) -> impl Iterator<Item = EventId> + '_ {
        self.heads.iter().copied()
    }
}
