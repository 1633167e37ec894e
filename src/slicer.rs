//! Eviction of rows far outside the viewport.
//!
//! Slicing only touches the view: the store keeps every dialog, and an edge that lost rows
//! is marked as not fully loaded so scrolling back pages them in again.

use serde::{Deserialize, Serialize};

use crate::Edge;
use crate::chat_list::ChatList;
use crate::dialog::DialogId;

/// Visible part of the list, in pixels from the top of the first row
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    /// Scroll offset
    pub scroll_top: u32,
    /// Visible height
    pub height: u32,
}

impl Viewport {
    /// Creates a viewport
    pub fn new(scroll_top: u32, height: u32) -> Self {
        Self { scroll_top, height }
    }
}

/// Rows to evict
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SlicePlan {
    /// Rows above the retained band, in display order
    pub trim_top: Vec<DialogId>,
    /// Rows below the retained band, in display order
    pub trim_bottom: Vec<DialogId>,
    /// Total height of `trim_top`
    pub removed_height_above: u32,
}

/// Plans a slice of `rows` (ids with heights, in display order).
///
/// Keeps every row intersecting `viewport` plus `margin` rows on each side. Returns `None`
/// when nothing is on screen or nothing would be removed.
pub fn plan_slice(rows: &[(DialogId, u32)], viewport: Viewport, margin: usize) -> Option<SlicePlan> {
    let bottom = viewport.scroll_top.saturating_add(viewport.height);
    let mut first = None;
    let mut last = None;
    let mut y: u32 = 0;
    for (i, (_, height)) in rows.iter().enumerate() {
        let end = y.saturating_add(*height);
        if first.is_none() && end > viewport.scroll_top {
            first = Some(i);
        }
        if y < bottom {
            last = Some(i);
        } else {
            break;
        }
        y = end;
    }
    let (first, last) = (first?, last?);
    if first > last {
        return None;
    }

    let keep_from = first.saturating_sub(margin);
    let keep_to = last.saturating_add(margin).saturating_add(1).min(rows.len());
    if keep_from == 0 && keep_to == rows.len() {
        return None;
    }

    let trim_top: Vec<DialogId> = rows[..keep_from].iter().map(|(id, _)| *id).collect();
    let removed_height_above = rows[..keep_from].iter().map(|(_, h)| *h).sum();
    let trim_bottom = rows[keep_to..].iter().map(|(id, _)| *id).collect();
    Some(SlicePlan {
        trim_top,
        trim_bottom,
        removed_height_above,
    })
}

/// What [`ChatList::slice`] removed
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SliceOutcome {
    /// Rows evicted above the viewport
    pub removed_top: Vec<DialogId>,
    /// Rows evicted below the viewport
    pub removed_bottom: Vec<DialogId>,
    /// Scroll offset restored on the surface
    pub scroll_top: u32,
}

impl ChatList {
    /// Evicts the active filter's rows that lie beyond the retain margin around `viewport`.
    ///
    /// Skipped while the collection is empty or a page is loading. The surface is scrolled
    /// back by the height removed above so the anchored row stays put.
    pub fn slice(&self, viewport: Viewport) -> Option<SliceOutcome> {
        let options = &self.shared.options;
        let mut state = self.lock();
        let session = state.registry.active_session_mut()?;
        if session.view.is_empty() || session.window.is_loading() {
            return None;
        }

        let heights = session.view.heights(options.row_height);
        let plan = plan_slice(&heights, viewport, options.retain_margin)?;
        for id in plan.trim_top.iter().chain(&plan.trim_bottom) {
            session.view.delete(*id);
        }
        if !plan.trim_top.is_empty() {
            session.window.loaded_all.set(Edge::Top, false);
        }
        if !plan.trim_bottom.is_empty() {
            session.window.loaded_all.set(Edge::Bottom, false);
        }
        session.window.sync_offsets(&session.view);

        let scroll_top = viewport.scroll_top.saturating_sub(plan.removed_height_above);
        session.view.restore_scroll(scroll_top);
        debug!(
            "filter {}: sliced {} above, {} below, scroll {} -> {}",
            session.spec.id,
            plan.trim_top.len(),
            plan.trim_bottom.len(),
            viewport.scroll_top,
            scroll_top
        );

        Some(SliceOutcome {
            removed_top: plan.trim_top,
            removed_bottom: plan.trim_bottom,
            scroll_top,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(n: i64) -> Vec<(DialogId, u32)> {
        (0..n).map(|i| (DialogId(i), 10)).collect()
    }

    #[test]
    fn keeps_the_margin_around_the_viewport() {
        // rows 10..=14 are on screen
        let plan = plan_slice(&rows(40), Viewport::new(100, 50), 3).unwrap();
        assert_eq!(plan.trim_top, (0..7).map(DialogId).collect::<Vec<_>>());
        assert_eq!(plan.trim_bottom, (18..40).map(DialogId).collect::<Vec<_>>());
        assert_eq!(plan.removed_height_above, 70);
    }

    #[test]
    fn partially_visible_rows_count_as_visible() {
        let plan = plan_slice(&rows(40), Viewport::new(105, 10), 0).unwrap();
        assert_eq!(plan.trim_top.len(), 10);
        assert_eq!(plan.trim_bottom.first(), Some(&DialogId(12)));
    }

    #[test]
    fn nothing_to_trim() {
        assert_eq!(plan_slice(&rows(10), Viewport::new(0, 100), 2), None);
        assert_eq!(plan_slice(&rows(10), Viewport::new(20, 30), 5), None);
    }

    #[test]
    fn viewport_past_the_content() {
        assert_eq!(plan_slice(&rows(5), Viewport::new(500, 100), 1), None);
        assert_eq!(plan_slice(&[], Viewport::new(0, 100), 1), None);
    }

    #[test]
    fn uneven_heights() {
        let rows = vec![(DialogId(1), 100), (DialogId(2), 5), (DialogId(3), 5), (DialogId(4), 100)];
        let plan = plan_slice(&rows, Viewport::new(104, 1), 0).unwrap();
        assert_eq!(plan.trim_top, vec![DialogId(1)]);
        assert_eq!(plan.trim_bottom, vec![DialogId(3), DialogId(4)]);
        assert_eq!(plan.removed_height_above, 100);
    }
}
