//! Per-filter paging state.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::Edge;
use crate::dialog::{OrderKey, SortDirection};
use crate::sorted_view::SortedCollectionView;

/// One boolean per edge
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeFlags {
    /// Flag of the top edge (position 0)
    pub top: bool,
    /// Flag of the bottom edge
    pub bottom: bool,
}

impl EdgeFlags {
    /// The flag of `edge`
    pub fn get(&self, edge: Edge) -> bool {
        match edge {
            Edge::Top => self.top,
            Edge::Bottom => self.bottom,
        }
    }

    /// Sets the flag of `edge`
    pub fn set(&mut self, edge: Edge, value: bool) {
        match edge {
            Edge::Top => self.top = value,
            Edge::Bottom => self.bottom = value,
        }
    }
}

/// Boundary keys of the loaded window
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeOffsets {
    /// Key of the first element
    pub top: Option<OrderKey>,
    /// Key of the last element
    pub bottom: Option<OrderKey>,
}

impl EdgeOffsets {
    /// The offset of `edge`
    pub fn get(&self, edge: Edge) -> Option<OrderKey> {
        match edge {
            Edge::Top => self.top,
            Edge::Bottom => self.bottom,
        }
    }
}

/// Whether a page fetch is running
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoadState {
    /// Nothing in flight
    #[default]
    Idle,
    /// A page is being fetched for this edge
    Loading(Edge),
}

/// Paging state of one filter
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowState {
    /// Sticky "nothing more on this edge" flags, cleared by eviction
    pub loaded_all: EdgeFlags,
    /// Boundary keys
    pub offset: EdgeOffsets,
    /// In-flight load
    pub load: LoadState,
}

impl WindowState {
    /// State of a freshly activated filter: the newest end is reached, the rest must be paged in.
    pub fn reset_for_activation(&mut self) {
        self.loaded_all = EdgeFlags {
            top: true,
            bottom: false,
        };
        self.offset = EdgeOffsets::default();
        self.load = LoadState::Idle;
    }

    /// Offset a page request towards `edge` starts from. Ignored once the edge is fully loaded.
    pub fn effective_offset(&self, edge: Edge) -> Option<OrderKey> {
        if self.loaded_all.get(edge) {
            None
        } else {
            self.offset.get(edge)
        }
    }

    /// Whether an out-of-band item with `key` falls inside the loaded window.
    ///
    /// An edge that is fully loaded or has no offset is open. Otherwise the key must not
    /// lie beyond that edge's offset. An empty window therefore accepts everything.
    pub fn fits(&self, key: OrderKey, direction: SortDirection) -> bool {
        let within = |edge: Edge, beyond: Ordering| -> bool {
            match self.effective_offset(edge) {
                Some(offset) => direction.compare_keys(key, offset) != beyond,
                None => true,
            }
        };
        within(Edge::Top, Ordering::Less) && within(Edge::Bottom, Ordering::Greater)
    }

    /// Recomputes the offsets from the view's boundary elements
    pub fn sync_offsets(&mut self, view: &SortedCollectionView) {
        self.offset = EdgeOffsets {
            top: view.first().map(|(_, key)| key),
            bottom: view.last().map(|(_, key)| key),
        };
    }

    /// Returns true while a page is being fetched
    pub fn is_loading(&self) -> bool {
        matches!(self.load, LoadState::Loading(_))
    }

    /// Marks a fetch towards `edge` as started. Returns false if one is already running.
    pub fn begin_load(&mut self, edge: Edge) -> bool {
        if self.is_loading() {
            return false;
        }
        self.load = LoadState::Loading(edge);
        true
    }

    /// Marks the running fetch as finished
    pub fn finish_load(&mut self) {
        self.load = LoadState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(top: Option<u64>, bottom: Option<u64>) -> WindowState {
        WindowState {
            offset: EdgeOffsets {
                top: top.map(OrderKey),
                bottom: bottom.map(OrderKey),
            },
            ..Default::default()
        }
    }

    #[test]
    fn activation_reset() {
        let mut state = window(Some(9), Some(3));
        state.load = LoadState::Loading(Edge::Bottom);
        state.reset_for_activation();
        assert!(state.loaded_all.top);
        assert!(!state.loaded_all.bottom);
        assert_eq!(state.offset, EdgeOffsets::default());
        assert!(!state.is_loading());
    }

    #[test]
    fn loaded_edges_ignore_their_offset() {
        let mut state = window(Some(9), Some(3));
        assert_eq!(state.effective_offset(Edge::Top), Some(OrderKey(9)));
        state.loaded_all.top = true;
        assert_eq!(state.effective_offset(Edge::Top), None);
        assert_eq!(state.effective_offset(Edge::Bottom), Some(OrderKey(3)));
    }

    #[test]
    fn fits_newest_first() {
        let mut state = window(Some(9), Some(3));
        let dir = SortDirection::NewestFirst;
        assert!(state.fits(OrderKey(9), dir));
        assert!(state.fits(OrderKey(5), dir));
        assert!(state.fits(OrderKey(3), dir));
        assert!(!state.fits(OrderKey(10), dir));
        assert!(!state.fits(OrderKey(2), dir));

        state.loaded_all.top = true;
        assert!(state.fits(OrderKey(100), dir));
        assert!(!state.fits(OrderKey(2), dir));
    }

    #[test]
    fn fits_oldest_first() {
        let state = window(Some(3), Some(9));
        let dir = SortDirection::OldestFirst;
        assert!(state.fits(OrderKey(5), dir));
        assert!(!state.fits(OrderKey(10), dir));
        assert!(!state.fits(OrderKey(1), dir));
    }

    #[test]
    fn empty_window_fits_everything() {
        let mut state = WindowState::default();
        state.reset_for_activation();
        assert!(state.fits(OrderKey(1), SortDirection::NewestFirst));
        assert!(state.fits(OrderKey(u64::MAX), SortDirection::OldestFirst));

        // bounded below only: older keys wait for a page
        state.offset.bottom = Some(OrderKey(40));
        assert!(state.fits(OrderKey(500), SortDirection::NewestFirst));
        assert!(!state.fits(OrderKey(39), SortDirection::NewestFirst));
    }

    #[test]
    fn one_load_at_a_time() {
        let mut state = WindowState::default();
        assert!(state.begin_load(Edge::Bottom));
        assert!(!state.begin_load(Edge::Top));
        state.finish_load();
        assert!(state.begin_load(Edge::Top));
    }
}
