//! chatlist is a windowed list engine for chat applications.
//!
//! It keeps a live, sorted and filterable list of conversation summaries ("dialogs") while
//! only ever materializing the rows around the viewport. Dialogs are paged in from a
//! [`DialogStore`](store::DialogStore) at either edge of the window, evicted again once they
//! scroll far away, and kept in order as store events move them around.
//!
//! # Examples
//!
//! ```no_run
//! use std::sync::Arc;
//! use chatlist::prelude::*;
//! use chatlist::helper::{MemoryStore, RecordingRows};
//!
//! # async fn run() -> Result<(), LoadError> {
//! let store = Arc::new(MemoryStore::with_dialogs((1..=50).map(|i| DialogSummary::new(DialogId(i), OrderKey(i as u64)))));
//! let rows = RecordingRows::new();
//! let options = ChatListOptionsBuilder::default().page_size(Some(20)).build().unwrap();
//!
//! let list = ChatList::new(options, Collaborators::from_store(store, Arc::new(rows.clone())));
//! let bus = EventBus::new();
//! list.start(&bus);
//!
//! list.set_active_filter(FilterId::ALL).await?;
//! list.load_more(Edge::Bottom).await?;
//! assert_eq!(list.visible_ids(FilterId::ALL).len(), 40);
//!
//! bus.publish(Event::ItemUpserted(DialogId(7)));
//! list.dispose();
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

#[macro_use]
extern crate log;

use serde::{Deserialize, Serialize};

pub mod chat_list;
pub mod debounce;
pub mod derived;
pub mod dialog;
pub mod event;
pub mod helper;
pub mod loader;
pub mod options;
pub mod ordered_index;
pub mod prelude;
pub mod registry;
pub mod row;
pub mod slicer;
pub mod sorted_view;
pub mod staleness;
pub mod store;
pub mod window;

pub use crate::chat_list::{Activation, ChatList, Collaborators};
pub use crate::options::ChatListOptions;

/// End of the window
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Edge {
    /// Position 0
    Top,
    /// The last position
    Bottom,
}
