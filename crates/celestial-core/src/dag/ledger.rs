//! Append-only event storage and the emit protocol.
//!
//! The [`Ledger`] owns every stored [`Event`] keyed by id together with the
//! [`GraphIndex`] derived from them. It is a plain single-threaded value;
//! [`crate::Store`] wraps it in a lock and adds change notification.
//!
//! # Identifier policy
//!
//! Ids are assigned only after an append has passed validation, so a
//! rejected append never consumes an id. Successful appends receive exactly
//! `1, 2, 3, ...` with no gaps.
//!
//! # Timestamps
//!
//! `created_at` is clamped to be at least the previous event's timestamp,
//! which keeps it non-decreasing with id even if the wall clock steps back.

use std::collections::{BTreeSet, HashMap, HashSet};

use chrono::Utc;

use super::index::GraphIndex;
use crate::error::StoreError;
use crate::event::{Event, EventId, NewEvent, normalize_parents};

/// Events keyed by id plus their graph indices.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    events: HashMap<EventId, Event>,
    index: GraphIndex,
    last_id: EventId,
    last_created_at: i64,
}

impl Ledger {
    /// Create an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty ledger with room for `capacity` events.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: HashMap::with_capacity(capacity),
            index: GraphIndex::with_capacity(capacity),
            ..Self::default()
        }
    }

    /// Append an event stamped with the current wall-clock time.
    ///
    /// See [`Ledger::append_at`].
    ///
    /// # Errors
    ///
    /// Same as [`Ledger::append_at`]: [`StoreError::Validation`] for a blank
    /// type, [`StoreError::Reference`] for a missing parent.
    pub fn append(&mut self, request: NewEvent) -> Result<Event, StoreError> {
        let now = Utc::now().timestamp_nanos_opt().unwrap_or(i64::MAX);
        self.append_at(request, now)
    }

    /// Append an event, stamping it with `now` (nanoseconds since epoch)
    /// unless that would move time backwards.
    ///
    /// # Errors
    ///
    /// - [`StoreError::Validation`] if the type is empty or whitespace.
    /// - [`StoreError::Reference`] naming the first parent that does not
    ///   exist.
    ///
    /// Either way the ledger is left untouched.
    pub fn append_at(&mut self, request: NewEvent, now: i64) -> Result<Event, StoreError> {
        if request.event_type.trim().is_empty() {
            return Err(StoreError::Validation("type is required".into()));
        }

        let parents = normalize_parents(&request.parents);
        if let Some(&missing) = parents.iter().find(|&&p| !self.events.contains_key(&p)) {
            return Err(StoreError::Reference(missing));
        }

        let id = self.last_id + 1;
        let created_at = now.max(self.last_created_at);

        let event = Event {
            id,
            created_at,
            event_type: request.event_type,
            parents,
            message: request.message,
            payload: request.payload,
        };

        self.index.link(id, &event.parents);
        self.events.insert(id, event.clone());
        self.last_id = id;
        self.last_created_at = created_at;

        Ok(event)
    }

    /// Number of stored events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns `true` if nothing has been appended.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    #[must_use]
    pub fn get(&self, id: EventId) -> Option<&Event> {
        self.events.get(&id)
    }

    #[must_use]
    pub fn contains(&self, id: EventId) -> bool {
        self.events.contains_key(&id)
    }

    /// The derived parent→children and heads indices.
    #[must_use]
    pub const fn index(&self) -> &GraphIndex {
        &self.index
    }

    /// Immediate children of `id` in ascending order, or `None` if `id` is
    /// not stored. A leaf yields an empty list.
    #[must_use]
    pub fn children(&self, id: EventId) -> Option<Vec<EventId>> {
        self.contains(id)
            .then(|| self.index.children_of(id).collect())
    }

    /// Ids of every event with no children, ascending.
    #[must_use]
    pub fn heads(&self) -> Vec<EventId> {
        self.index.heads().collect()
    }

    /// Root events reachable from `id` by walking parent edges, ascending.
    ///
    /// A root event is its own (only) ancestor root. Shared ancestors are
    /// visited once per call, so diamond-shaped histories cost
    /// O(reachable) rather than O(paths).
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] if `id` is unknown, or if the walk meets a
    /// parent id that does not resolve to a stored event.
    pub fn ancestors(&self, id: EventId) -> Result<Vec<EventId>, StoreError> {
        if !self.contains(id) {
            return Err(StoreError::missing(id));
        }

        let mut visited = HashSet::new();
        let mut roots = BTreeSet::new();
        let mut stack = vec![id];

        while let Some(current) = stack.pop() {
            if !visited.insert(current) {
                continue;
            }

            let event = self.get(current).ok_or_else(|| {
                tracing::warn!(id = current, from = id, "dangling parent during ancestor walk");
                StoreError::missing(current)
            })?;

            if event.is_root() {
                roots.insert(current);
                continue;
            }

            // Reverse so the walk descends into parents in declaration order.
            stack.extend(event.parents.iter().rev().copied());
        }

        Ok(roots.into_iter().collect())
    }
}
