//! Id to position mapping for one filter's collection.
//!
//! Entries are kept in display order inside an [`IndexMap`], so the position of an id is an
//! `O(1)` lookup and finding the slot of a new key is a binary search. Keys are read from
//! the [`OrderKeyProvider`] whenever an id is inserted or repositioned; the stored copy is
//! only used to compare against the others.
//!
//! Inserting and removing shift every later entry, so both cost `O(n)` in the number of
//! loaded dialogs. The slicer keeps `n` to a few screens around the viewport; see
//! `benches/ordered_index.rs` for the cost at twenty thousand entries.

use std::cmp::Ordering;

use indexmap::IndexMap;

use crate::dialog::{DialogId, FilterId, OrderKey, SortDirection};
use crate::store::OrderKeyProvider;

/// Result of [`OrderedIndex::reposition`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reposition {
    /// The id is not in the index
    Absent,
    /// The id kept its position
    Unchanged(usize),
    /// The id moved
    Moved {
        /// Previous position
        from: usize,
        /// New position
        to: usize,
    },
    /// The provider no longer has a key for the id; it was removed from the index
    Dropped(usize),
}

/// Totally ordered set of dialog ids
#[derive(Debug, Clone)]
pub struct OrderedIndex {
    filter: FilterId,
    direction: SortDirection,
    entries: IndexMap<DialogId, OrderKey>,
}

impl OrderedIndex {
    /// Creates an empty index sorting `filter`'s dialogs in `direction`
    pub fn new(filter: FilterId, direction: SortDirection) -> Self {
        Self {
            filter,
            direction,
            entries: IndexMap::new(),
        }
    }

    /// The filter whose order keys are queried
    pub fn filter(&self) -> FilterId {
        self.filter
    }

    /// The display direction
    pub fn direction(&self) -> SortDirection {
        self.direction
    }

    /// Number of ids
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the index holds no id
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns true if `id` is indexed
    pub fn contains(&self, id: DialogId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Current position of `id`
    pub fn position_of(&self, id: DialogId) -> Option<usize> {
        self.entries.get_index_of(&id)
    }

    /// Key captured at the last insert or reposition of `id`
    pub fn key_of(&self, id: DialogId) -> Option<OrderKey> {
        self.entries.get(&id).copied()
    }

    /// Id and key at position 0
    pub fn first(&self) -> Option<(DialogId, OrderKey)> {
        self.entries.first().map(|(id, key)| (*id, *key))
    }

    /// Id and key at the last position
    pub fn last(&self) -> Option<(DialogId, OrderKey)> {
        self.entries.last().map(|(id, key)| (*id, *key))
    }

    /// Id at `position`
    pub fn get(&self, position: usize) -> Option<DialogId> {
        self.entries.get_index(position).map(|(id, _)| *id)
    }

    /// All ids in ascending position order
    pub fn all(&self) -> impl Iterator<Item = DialogId> + '_ {
        self.entries.keys().copied()
    }

    /// Inserts `id` at the position given by its current key.
    ///
    /// Returns the position of `id`. Inserting an id that is already present is a no-op that
    /// returns its current position. Returns `None` if the provider has no key for `id`.
    pub fn insert(&mut self, id: DialogId, keys: &dyn OrderKeyProvider) -> Option<usize> {
        if let Some(position) = self.entries.get_index_of(&id) {
            return Some(position);
        }
        let key = keys.order_key(id, self.filter)?;
        Some(self.insert_key(id, key))
    }

    /// Removes `id`, returning its last position. Absent ids are ignored.
    pub fn remove(&mut self, id: DialogId) -> Option<usize> {
        self.entries.shift_remove_full(&id).map(|(position, _, _)| position)
    }

    /// Moves `id` to the position given by its current key.
    ///
    /// Only the affected id shifts; the rest of the index keeps its relative order.
    pub fn reposition(&mut self, id: DialogId, keys: &dyn OrderKeyProvider) -> Reposition {
        let Some(from) = self.entries.get_index_of(&id) else {
            return Reposition::Absent;
        };
        let Some(key) = keys.order_key(id, self.filter) else {
            self.entries.shift_remove_index(from);
            return Reposition::Dropped(from);
        };
        if self.entries.get_index(from).map(|(_, old)| *old) == Some(key) {
            return Reposition::Unchanged(from);
        }
        self.entries.shift_remove_index(from);
        let to = self.insert_key(id, key);
        if to == from {
            Reposition::Unchanged(to)
        } else {
            Reposition::Moved { from, to }
        }
    }

    /// Removes every id
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn insert_key(&mut self, id: DialogId, key: OrderKey) -> usize {
        let direction = self.direction;
        let slot = self
            .entries
            .partition_point(|other_id, other_key| direction.compare((*other_key, *other_id), (key, id)) == Ordering::Less);
        self.entries.shift_insert(slot, id, key);
        slot
    }
}
