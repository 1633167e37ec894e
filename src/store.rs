//! Contracts of the storage collaborators.
//!
//! The engine never talks to the network or to a database. It pages dialogs in through
//! [`DialogStore`], asks [`OrderKeyProvider`] where a dialog sorts in a filter and asks
//! [`MembershipTest`] whether it belongs there at all.

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Edge;
use crate::dialog::{DialogId, DialogSummary, FilterId, OrderKey, UnreadCount};

/// One page query
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// Filter to page through
    pub filter: FilterId,
    /// Boundary key. `None` pages from the absolute edge.
    ///
    /// With `Some(key)` the store returns items strictly beyond `key`, towards `edge`.
    pub offset: Option<OrderKey>,
    /// Maximum number of items
    pub count: usize,
    /// Which end of the window is being extended
    pub edge: Edge,
}

/// Answer to a [`PageRequest`]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Page {
    /// Items in display order, nearest to the offset first for the bottom edge
    pub items: Vec<DialogSummary>,
    /// Nothing remains beyond this page on the requested edge
    pub is_edge_end: bool,
    /// The page came from a local cache rather than a network round-trip
    pub cached: bool,
}

/// Failure reported by a storage collaborator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The backing store could not answer
    #[error("store unavailable: {0}")]
    Unavailable(String),
    /// The store does not know the filter
    #[error("filter {0} is unknown to the store")]
    UnknownFilter(FilterId),
}

/// Paged access to dialogs
pub trait DialogStore: Send + Sync {
    /// Fetches one page of a filter
    fn get_page(&self, request: PageRequest) -> BoxFuture<'static, Result<Page, StoreError>>;

    /// Whether a page for `request` would come from a local cache.
    ///
    /// Stores that cannot tell keep the default, and empty lists show a loading placeholder.
    fn page_cached(&self, _request: &PageRequest) -> bool {
        false
    }

    /// Latest snapshot of a dialog, `None` if the dialog no longer exists
    fn summary(&self, id: DialogId) -> Option<DialogSummary>;

    /// Unread totals of a folder
    fn unread_count(&self, filter: FilterId) -> BoxFuture<'static, Result<UnreadCount, StoreError>>;
}

/// Where a dialog sorts within a filter
pub trait OrderKeyProvider: Send + Sync {
    /// Current order key, `None` when the dialog does not belong to the filter
    fn order_key(&self, id: DialogId, filter: FilterId) -> Option<OrderKey>;
}

/// Filter membership predicate
pub trait MembershipTest: Send + Sync {
    /// Whether `summary` belongs to `filter`
    fn belongs_to_filter(&self, summary: &DialogSummary, filter: FilterId) -> bool;
}
