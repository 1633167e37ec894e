//! Identifiers and snapshots shared by every part of the list engine.
//!
//! None of these types own dialog data: the storage collaborator does. The engine
//! only reads [`DialogSummary`] snapshots and the order keys derived from them.

use std::cmp::Ordering;
use std::fmt::{self, Display};
use std::num::ParseIntError;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Identifier of a dialog (a peer). Unique within one collection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DialogId(pub i64);

impl Display for DialogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a filter (folder)
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterId(pub u32);

impl FilterId {
    /// Every non-archived dialog. Used as the fallback filter.
    pub const ALL: FilterId = FilterId(0);
    /// Archived dialogs, shown outside of the tab strip
    pub const ARCHIVE: FilterId = FilterId(1);

    /// Returns true for user-defined folders
    pub fn is_custom(self) -> bool {
        self.0 > Self::ARCHIVE.0
    }
}

impl Display for FilterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for FilterId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u32>().map(FilterId)
    }
}

/// The value a filter's collection is sorted by.
///
/// Larger means newer (last-activity ordering) or pinned higher (custom folder ordering).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderKey(pub u64);

impl Display for OrderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Display direction of a filter's collection
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    /// Position 0 holds the largest key
    #[default]
    NewestFirst,
    /// Position 0 holds the smallest key
    OldestFirst,
}

impl SortDirection {
    /// Orders two keys by display position: `Less` means `a` is shown before `b`.
    pub fn compare_keys(self, a: OrderKey, b: OrderKey) -> Ordering {
        match self {
            SortDirection::NewestFirst => b.cmp(&a),
            SortDirection::OldestFirst => a.cmp(&b),
        }
    }

    /// Orders two entries by display position, breaking key ties by ascending id.
    pub fn compare(self, a: (OrderKey, DialogId), b: (OrderKey, DialogId)) -> Ordering {
        self.compare_keys(a.0, b.0).then_with(|| a.1.cmp(&b.1))
    }
}

/// Snapshot of a conversation summary, as handed out by the store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogSummary {
    /// The dialog
    pub id: DialogId,
    /// Global last-activity order key
    pub order_key: OrderKey,
    /// Folders this dialog was explicitly placed in
    pub filter_membership: Vec<FilterId>,
    /// Unread message count
    pub unread_count: u32,
    /// Unread mentions
    pub pinned_mentions: u32,
    /// Whether notifications are muted
    pub muted: bool,
    /// Whether a draft is saved for this dialog
    pub draft_present: bool,
    /// Unix timestamp of the last message
    pub last_activity: u64,
}

impl DialogSummary {
    /// Creates a summary with no unread state and no folder membership
    pub fn new(id: DialogId, order_key: OrderKey) -> Self {
        Self {
            id,
            order_key,
            filter_membership: Vec::new(),
            unread_count: 0,
            pinned_mentions: 0,
            muted: false,
            draft_present: false,
            last_activity: order_key.0,
        }
    }

    /// Returns true if the dialog was placed in `filter`
    pub fn is_in(&self, filter: FilterId) -> bool {
        self.filter_membership.contains(&filter)
    }
}

/// Unread totals of one folder, as reported by the store
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnreadCount {
    /// Unread dialogs, muted ones included
    pub unread: u32,
    /// Unread dialogs that are not muted
    pub unread_unmuted: u32,
}

/// What a filter tab shows next to its title
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UnreadBadge {
    /// Number to display, `None` hides the badge text
    pub count: Option<u32>,
    /// Gray badge: nothing unmuted is unread
    pub muted: bool,
}

impl UnreadBadge {
    /// Builds the badge for `filter`.
    ///
    /// The All filter counts unmuted dialogs only; folders count everything.
    pub fn for_filter(filter: FilterId, count: UnreadCount) -> Self {
        let shown = if filter == FilterId::ALL {
            count.unread_unmuted
        } else {
            count.unread
        };
        Self {
            count: (shown > 0).then_some(shown),
            muted: count.unread_unmuted == 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newest_first_puts_larger_keys_first() {
        let dir = SortDirection::NewestFirst;
        assert_eq!(dir.compare_keys(OrderKey(5), OrderKey(3)), Ordering::Less);
        assert_eq!(dir.compare_keys(OrderKey(3), OrderKey(5)), Ordering::Greater);
    }

    #[test]
    fn ties_break_by_ascending_id_in_both_directions() {
        for dir in [SortDirection::NewestFirst, SortDirection::OldestFirst] {
            assert_eq!(
                dir.compare((OrderKey(7), DialogId(1)), (OrderKey(7), DialogId(2))),
                Ordering::Less
            );
        }
    }

    #[test]
    fn all_filter_badge_counts_unmuted() {
        let badge = UnreadBadge::for_filter(
            FilterId::ALL,
            UnreadCount {
                unread: 4,
                unread_unmuted: 1,
            },
        );
        assert_eq!(badge.count, Some(1));
        assert!(!badge.muted);
    }

    #[test]
    fn folder_badge_counts_everything_and_grays_out() {
        let badge = UnreadBadge::for_filter(
            FilterId(3),
            UnreadCount {
                unread: 4,
                unread_unmuted: 0,
            },
        );
        assert_eq!(badge.count, Some(4));
        assert!(badge.muted);
        assert_eq!(UnreadBadge::for_filter(FilterId(3), UnreadCount::default()).count, None);
    }

    #[test]
    fn filter_id_parses() {
        assert_eq!("3".parse::<FilterId>(), Ok(FilterId(3)));
        assert!("x".parse::<FilterId>().is_err());
        assert!(FilterId(2).is_custom());
        assert!(!FilterId::ARCHIVE.is_custom());
    }
}
