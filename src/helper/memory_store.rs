use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;
use indexmap::IndexMap;

use crate::Edge;
use crate::dialog::{DialogId, DialogSummary, FilterId, OrderKey, SortDirection, UnreadCount};
use crate::store::{DialogStore, MembershipTest, OrderKeyProvider, Page, PageRequest, StoreError};

#[derive(Debug, Default)]
struct StoreInner {
    dialogs: IndexMap<DialogId, DialogSummary>,
    directions: HashMap<FilterId, SortDirection>,
    custom_keys: HashMap<(FilterId, DialogId), OrderKey>,
    unread: HashMap<FilterId, UnreadCount>,
    latency: Option<Duration>,
    failing: bool,
    cached: bool,
    requests: Vec<PageRequest>,
}

impl StoreInner {
    fn belongs(summary: &DialogSummary, filter: FilterId) -> bool {
        match filter {
            FilterId::ALL => !summary.is_in(FilterId::ARCHIVE),
            other => summary.is_in(other),
        }
    }

    fn key(&self, summary: &DialogSummary, filter: FilterId) -> Option<OrderKey> {
        if !Self::belongs(summary, filter) {
            return None;
        }
        Some(
            self.custom_keys
                .get(&(filter, summary.id))
                .copied()
                .unwrap_or(summary.order_key),
        )
    }

    /// Members of `filter` with their keys, in display order
    fn sorted(&self, filter: FilterId) -> (Vec<(OrderKey, DialogSummary)>, SortDirection) {
        let direction = self.directions.get(&filter).copied().unwrap_or_default();
        let mut members: Vec<(OrderKey, DialogSummary)> = self
            .dialogs
            .values()
            .filter_map(|summary| self.key(summary, filter).map(|key| (key, summary.clone())))
            .collect();
        members.sort_by(|a, b| direction.compare((a.0, a.1.id), (b.0, b.1.id)));
        (members, direction)
    }

    fn page(&self, request: &PageRequest) -> Page {
        let (members, direction) = self.sorted(request.filter);
        let (range, is_edge_end) = match (request.edge, request.offset) {
            (Edge::Bottom, offset) => {
                let start = offset.map_or(0, |offset| {
                    members.partition_point(|(key, _)| direction.compare_keys(*key, offset) != Ordering::Greater)
                });
                let end = start.saturating_add(request.count).min(members.len());
                (start..end, end == members.len())
            }
            (Edge::Top, None) => (0..0, true),
            (Edge::Top, Some(offset)) => {
                let end = members.partition_point(|(key, _)| direction.compare_keys(*key, offset) == Ordering::Less);
                let start = end.saturating_sub(request.count);
                (start..end, start == 0)
            }
        };
        Page {
            items: members[range].iter().map(|(_, summary)| summary.clone()).collect(),
            is_edge_end,
            cached: self.cached,
        }
    }
}

/// Dialog store backed by a map
///
/// The All filter holds every dialog not placed in the archive; any other filter holds
/// the dialogs listing it in their `filter_membership`. Cloning shares the contents.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<StoreInner>>,
}

impl MemoryStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding `dialogs`
    pub fn with_dialogs(dialogs: impl IntoIterator<Item = DialogSummary>) -> Self {
        let store = Self::new();
        for summary in dialogs {
            store.upsert(summary);
        }
        store
    }

    fn lock(&self) -> MutexGuard<'_, StoreInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Inserts or replaces a dialog
    pub fn upsert(&self, summary: DialogSummary) {
        self.lock().dialogs.insert(summary.id, summary);
    }

    /// Deletes a dialog
    pub fn remove(&self, id: DialogId) -> Option<DialogSummary> {
        self.lock().dialogs.shift_remove(&id)
    }

    /// Display direction of `filter`
    pub fn set_direction(&self, filter: FilterId, direction: SortDirection) {
        self.lock().directions.insert(filter, direction);
    }

    /// Sorts `id` by `key` inside `filter` instead of its last activity
    pub fn set_custom_key(&self, filter: FilterId, id: DialogId, key: OrderKey) {
        self.lock().custom_keys.insert((filter, id), key);
    }

    /// Unread totals reported for `filter`
    pub fn set_unread(&self, filter: FilterId, count: UnreadCount) {
        self.lock().unread.insert(filter, count);
    }

    /// Delays every answer by `latency`
    pub fn set_latency(&self, latency: Option<Duration>) {
        self.lock().latency = latency;
    }

    /// Makes every query fail
    pub fn set_failing(&self, failing: bool) {
        self.lock().failing = failing;
    }

    /// Reports pages as served from cache
    pub fn set_cached(&self, cached: bool) {
        self.lock().cached = cached;
    }

    /// Page requests received so far
    pub fn requests(&self) -> Vec<PageRequest> {
        self.lock().requests.clone()
    }

    /// Forgets the recorded page requests
    pub fn clear_requests(&self) {
        self.lock().requests.clear();
    }

    /// Ids of `filter` in display order, as the store sees them
    pub fn ids(&self, filter: FilterId) -> Vec<DialogId> {
        self.lock()
            .sorted(filter)
            .0
            .into_iter()
            .map(|(_, summary)| summary.id)
            .collect()
    }

    fn answer<T: Send + 'static>(
        latency: Option<Duration>,
        result: Result<T, StoreError>,
    ) -> BoxFuture<'static, Result<T, StoreError>> {
        async move {
            if let Some(latency) = latency {
                tokio::time::sleep(latency).await;
            }
            result
        }
        .boxed()
    }
}

impl DialogStore for MemoryStore {
    fn get_page(&self, request: PageRequest) -> BoxFuture<'static, Result<Page, StoreError>> {
        let mut inner = self.lock();
        inner.requests.push(request);
        let result = if inner.failing {
            Err(StoreError::Unavailable(String::from("memory store set to fail")))
        } else {
            Ok(inner.page(&request))
        };
        Self::answer(inner.latency, result)
    }

    fn page_cached(&self, _request: &PageRequest) -> bool {
        self.lock().cached
    }

    fn summary(&self, id: DialogId) -> Option<DialogSummary> {
        self.lock().dialogs.get(&id).cloned()
    }

    fn unread_count(&self, filter: FilterId) -> BoxFuture<'static, Result<UnreadCount, StoreError>> {
        let inner = self.lock();
        let result = if inner.failing {
            Err(StoreError::Unavailable(String::from("memory store set to fail")))
        } else {
            Ok(inner.unread.get(&filter).copied().unwrap_or_default())
        };
        Self::answer(inner.latency, result)
    }
}

impl OrderKeyProvider for MemoryStore {
    fn order_key(&self, id: DialogId, filter: FilterId) -> Option<OrderKey> {
        let inner = self.lock();
        let summary = inner.dialogs.get(&id)?;
        inner.key(summary, filter)
    }
}

impl MembershipTest for MemoryStore {
    fn belongs_to_filter(&self, summary: &DialogSummary, filter: FilterId) -> bool {
        StoreInner::belongs(summary, filter)
    }
}
