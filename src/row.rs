//! Rendering contracts.
//!
//! A row is whatever the host draws for one dialog. The engine only decides whether a
//! row exists and where it sits; it never looks inside it.

use futures::future::BoxFuture;

use crate::dialog::{DialogId, FilterId};

/// Opaque reference to a materialized row, allocated by the [`RowFactory`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RowHandle(u64);

impl RowHandle {
    /// Wraps a host-side node reference
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The host-side node reference
    pub fn raw(self) -> u64 {
        self.0
    }
}

/// A freshly created row
#[derive(derive_more::Debug)]
pub struct Row {
    /// The node to position
    pub handle: RowHandle,
    /// Completes when the row's asynchronous content (avatar, last message, media) is in
    #[debug(skip)]
    pub ready: Option<BoxFuture<'static, ()>>,
}

impl Row {
    /// A row with no pending content
    pub fn ready(handle: RowHandle) -> Self {
        Self { handle, ready: None }
    }
}

/// Creates rows and the lists they live in
pub trait RowFactory: Send + Sync {
    /// Creates the row of `id` in `filter`'s list.
    ///
    /// `batch` is set when the caller awaits the returned readiness future before
    /// declaring its page rendered; otherwise the future is driven in the background.
    fn create_row(&self, filter: FilterId, id: DialogId, batch: bool) -> Row;

    /// Creates the list that holds the rows of `filter`
    fn create_surface(&self, filter: FilterId) -> Box<dyn RowSurface>;
}

/// An ordered list of rows (a DOM list, a native list view, a terminal pane...)
pub trait RowSurface: Send {
    /// Places `handle` at `index`, moving it if it is already attached.
    ///
    /// `index` is the final position of the row once placed.
    fn insert_at(&mut self, handle: RowHandle, index: usize);

    /// Detaches `handle`
    fn remove(&mut self, handle: RowHandle);

    /// Measured height of a row, `None` to use the configured estimate
    fn row_height(&self, _handle: RowHandle) -> Option<u32> {
        None
    }

    /// Scrolls the list to `scroll_top`, after rows above the viewport were removed
    fn restore_scroll(&mut self, _scroll_top: u32) {}
}
