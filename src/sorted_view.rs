//! One filter's sorted collection and its materialized rows.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::sync::mpsc::UnboundedSender;

use crate::dialog::{DialogId, FilterId, OrderKey, SortDirection};
use crate::ordered_index::{OrderedIndex, Reposition};
use crate::row::{RowFactory, RowHandle, RowSurface};
use crate::store::{DialogStore, MembershipTest, OrderKeyProvider};

/// A dialog that currently has a row in the view
#[derive(Clone, Debug)]
pub struct SortedElement {
    id: DialogId,
    handle: RowHandle,
    pending: Arc<AtomicUsize>,
}

impl SortedElement {
    /// The dialog
    pub fn id(&self) -> DialogId {
        self.id
    }

    /// Its row
    pub fn handle(&self) -> RowHandle {
        self.handle
    }

    /// Returns true once the row's asynchronous content has arrived
    pub fn is_ready(&self) -> bool {
        self.pending.load(Ordering::Acquire) == 0
    }
}

/// Result of [`SortedCollectionView::add`]
#[derive(derive_more::Debug)]
pub struct Added {
    /// The element, new or already present
    pub element: SortedElement,
    /// Whether a row was created by this call
    pub created: bool,
    /// Readiness of the new row, `None` when there is nothing to wait for
    #[debug(skip)]
    pub ready: Option<BoxFuture<'static, ()>>,
}

/// Owns one [`OrderedIndex`] and the rows of the ids it holds
///
/// Every id in the index has exactly one row on the surface, placed at the id's index
/// position.
#[derive(derive_more::Debug)]
pub struct SortedCollectionView {
    index: OrderedIndex,
    elements: HashMap<DialogId, SortedElement>,
    #[debug(skip)]
    surface: Box<dyn RowSurface>,
    #[debug(skip)]
    rows: Arc<dyn RowFactory>,
    #[debug(skip)]
    keys: Arc<dyn OrderKeyProvider>,
    #[debug(skip)]
    length_tx: Option<UnboundedSender<FilterId>>,
}

impl SortedCollectionView {
    /// Creates an empty view, asking `rows` for its surface
    pub fn new(
        filter: FilterId,
        direction: SortDirection,
        rows: Arc<dyn RowFactory>,
        keys: Arc<dyn OrderKeyProvider>,
    ) -> Self {
        Self {
            index: OrderedIndex::new(filter, direction),
            elements: HashMap::new(),
            surface: rows.create_surface(filter),
            rows,
            keys,
            length_tx: None,
        }
    }

    /// Reports every change of length on `tx`
    pub fn with_length_notifier(mut self, tx: UnboundedSender<FilterId>) -> Self {
        self.length_tx = Some(tx);
        self
    }

    /// The filter this view shows
    pub fn filter(&self) -> FilterId {
        self.index.filter()
    }

    /// Display direction
    pub fn direction(&self) -> SortDirection {
        self.index.direction()
    }

    /// Adds `id` at its sorted position, creating its row.
    ///
    /// Returns `None` when the key provider does not place `id` in this filter.
    pub fn add(&mut self, id: DialogId, batch: bool) -> Option<Added> {
        if let Some(element) = self.elements.get(&id) {
            return Some(Added {
                element: element.clone(),
                created: false,
                ready: None,
            });
        }

        let position = self.index.insert(id, self.keys.as_ref())?;
        let row = self.rows.create_row(self.filter(), id, batch);
        self.surface.insert_at(row.handle, position);

        let pending = Arc::new(AtomicUsize::new(0));
        let ready = row.ready.map(|fut| {
            pending.fetch_add(1, Ordering::AcqRel);
            let pending = pending.clone();
            async move {
                fut.await;
                pending.fetch_sub(1, Ordering::AcqRel);
            }
            .boxed()
        });

        let element = SortedElement {
            id,
            handle: row.handle,
            pending,
        };
        self.elements.insert(id, element.clone());
        trace!("filter {}: added {} at {}", self.filter(), id, position);
        self.notify_length();

        Some(Added {
            element,
            created: true,
            ready,
        })
    }

    /// Moves `id` to the position of its current key.
    ///
    /// Absent ids are ignored. An id whose key is gone is deleted.
    pub fn update(&mut self, id: DialogId) -> Reposition {
        let outcome = self.index.reposition(id, self.keys.as_ref());
        match outcome {
            Reposition::Moved { to, .. } => {
                if let Some(element) = self.elements.get(&id) {
                    self.surface.insert_at(element.handle, to);
                }
            }
            Reposition::Dropped(_) => {
                if let Some(element) = self.elements.remove(&id) {
                    self.surface.remove(element.handle);
                }
                self.notify_length();
            }
            Reposition::Absent | Reposition::Unchanged(_) => {}
        }
        outcome
    }

    /// Removes `id` and its row. Returns false if it was absent.
    pub fn delete(&mut self, id: DialogId) -> bool {
        let Some(element) = self.elements.remove(&id) else {
            return false;
        };
        self.surface.remove(element.handle);
        self.index.remove(id);
        trace!("filter {}: deleted {}", self.filter(), id);
        self.notify_length();
        true
    }

    /// Returns true if `id` has a row
    pub fn has(&self, id: DialogId) -> bool {
        self.elements.contains_key(&id)
    }

    /// The element of `id`
    pub fn get(&self, id: DialogId) -> Option<&SortedElement> {
        self.elements.get(&id)
    }

    /// Every id, in display order
    pub fn get_all(&self) -> Vec<DialogId> {
        self.index.all().collect()
    }

    /// Every element, in display order
    pub fn iter(&self) -> impl Iterator<Item = &SortedElement> + '_ {
        self.index.all().filter_map(|id| self.elements.get(&id))
    }

    /// Key `id` was last sorted by
    pub fn key_of(&self, id: DialogId) -> Option<OrderKey> {
        self.index.key_of(id)
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Returns true if the view holds nothing
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Element and key at position 0
    pub fn first(&self) -> Option<(&SortedElement, OrderKey)> {
        let (id, key) = self.index.first()?;
        self.elements.get(&id).map(|element| (element, key))
    }

    /// Element and key at the last position
    pub fn last(&self) -> Option<(&SortedElement, OrderKey)> {
        let (id, key) = self.index.last()?;
        self.elements.get(&id).map(|element| (element, key))
    }

    /// Removes every row and resets the index
    pub fn clear(&mut self) {
        if self.index.is_empty() {
            return;
        }
        for id in self.index.all() {
            if let Some(element) = self.elements.get(&id) {
                self.surface.remove(element.handle);
            }
        }
        self.elements.clear();
        self.index.clear();
        debug!("filter {}: cleared", self.filter());
        self.notify_length();
    }

    /// Repositions every element against the provider's current keys
    pub fn resort(&mut self) {
        for id in self.get_all() {
            self.update(id);
        }
    }

    /// Deletes every element for which `keep` is false, returning the deleted ids
    pub fn retain(&mut self, mut keep: impl FnMut(DialogId) -> bool) -> Vec<DialogId> {
        let dropped: Vec<DialogId> = self.index.all().filter(|id| !keep(*id)).collect();
        for id in &dropped {
            self.delete(*id);
        }
        dropped
    }

    /// Drops elements that no longer belong to the filter, then resorts the rest.
    ///
    /// Never adds anything.
    pub fn revalidate(&mut self, store: &dyn DialogStore, membership: &dyn MembershipTest) -> Vec<DialogId> {
        let filter = self.filter();
        let dropped = self.retain(|id| {
            store
                .summary(id)
                .is_some_and(|summary| membership.belongs_to_filter(&summary, filter))
        });
        self.resort();
        dropped
    }

    /// Height of every row in display order, `default` for unmeasured ones
    pub fn heights(&self, default: u32) -> Vec<(DialogId, u32)> {
        self.iter()
            .map(|element| (element.id, self.surface.row_height(element.handle).unwrap_or(default)))
            .collect()
    }

    /// Scrolls the surface
    pub fn restore_scroll(&mut self, scroll_top: u32) {
        self.surface.restore_scroll(scroll_top);
    }

    fn notify_length(&self) {
        if let Some(tx) = &self.length_tx {
            // The receiver is gone once the engine is disposed
            let _ = tx.send(self.filter());
        }
    }
}
