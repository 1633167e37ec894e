use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::FutureExt;

use crate::dialog::{DialogId, FilterId};
use crate::row::{Row, RowFactory, RowHandle, RowSurface};

#[derive(Debug, Default)]
struct RecordingInner {
    next_handle: u64,
    owners: HashMap<RowHandle, DialogId>,
    surfaces: HashMap<FilterId, Vec<RowHandle>>,
    scrolls: HashMap<FilterId, Vec<u32>>,
    heights: HashMap<DialogId, u32>,
    created: usize,
    ready_delay: Option<Duration>,
}

impl RecordingInner {
    fn ids(&self, filter: FilterId) -> Vec<DialogId> {
        self.surfaces
            .get(&filter)
            .map(|handles| handles.iter().filter_map(|h| self.owners.get(h).copied()).collect())
            .unwrap_or_default()
    }
}

/// Row factory whose surfaces are plain lists of dialog ids
///
/// Clones share the recording, so a test keeps one to inspect what the engine drew.
#[derive(Clone, Debug, Default)]
pub struct RecordingRows {
    inner: Arc<Mutex<RecordingInner>>,
}

impl RecordingRows {
    /// Creates an empty recording
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, RecordingInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Makes every new row ready only after `delay`
    pub fn set_ready_delay(&self, delay: Option<Duration>) {
        self.lock().ready_delay = delay;
    }

    /// Measured height of `id`'s row
    pub fn set_height(&self, id: DialogId, height: u32) {
        self.lock().heights.insert(id, height);
    }

    /// Ids on `filter`'s surface, top to bottom
    pub fn snapshot(&self, filter: FilterId) -> Vec<DialogId> {
        self.lock().ids(filter)
    }

    /// `filter`'s surface, one id per line
    pub fn dump(&self, filter: FilterId) -> String {
        let mut out = String::new();
        for id in self.snapshot(filter) {
            let _ = writeln!(out, "{id}");
        }
        out
    }

    /// Scroll offsets restored on `filter`'s surface
    pub fn scrolls(&self, filter: FilterId) -> Vec<u32> {
        self.lock().scrolls.get(&filter).cloned().unwrap_or_default()
    }

    /// Rows created so far
    pub fn created_count(&self) -> usize {
        self.lock().created
    }

    /// Rows attached to any surface
    pub fn live_rows(&self) -> usize {
        self.lock().surfaces.values().map(Vec::len).sum()
    }
}

impl RowFactory for RecordingRows {
    fn create_row(&self, _filter: FilterId, id: DialogId, _batch: bool) -> Row {
        let mut inner = self.lock();
        inner.next_handle += 1;
        inner.created += 1;
        let handle = RowHandle::new(inner.next_handle);
        inner.owners.insert(handle, id);
        Row {
            handle,
            ready: inner
                .ready_delay
                .map(|delay| tokio::time::sleep(delay).boxed()),
        }
    }

    fn create_surface(&self, filter: FilterId) -> Box<dyn RowSurface> {
        let mut inner = self.lock();
        inner.surfaces.insert(filter, Vec::new());
        inner.scrolls.remove(&filter);
        Box::new(RecordingSurface {
            filter,
            inner: self.inner.clone(),
        })
    }
}

struct RecordingSurface {
    filter: FilterId,
    inner: Arc<Mutex<RecordingInner>>,
}

impl RecordingSurface {
    fn lock(&self) -> MutexGuard<'_, RecordingInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl RowSurface for RecordingSurface {
    fn insert_at(&mut self, handle: RowHandle, index: usize) {
        let mut inner = self.lock();
        let rows = inner.surfaces.entry(self.filter).or_default();
        rows.retain(|h| *h != handle);
        let index = index.min(rows.len());
        rows.insert(index, handle);
    }

    fn remove(&mut self, handle: RowHandle) {
        let mut inner = self.lock();
        if let Some(rows) = inner.surfaces.get_mut(&self.filter) {
            rows.retain(|h| *h != handle);
        }
        inner.owners.remove(&handle);
    }

    fn row_height(&self, handle: RowHandle) -> Option<u32> {
        let inner = self.lock();
        let id = inner.owners.get(&handle)?;
        inner.heights.get(id).copied()
    }

    fn restore_scroll(&mut self, scroll_top: u32) {
        self.lock().scrolls.entry(self.filter).or_default().push(scroll_top);
    }
}
