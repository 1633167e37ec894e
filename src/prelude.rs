//! Convenience re-exports of commonly used types.
//!
//! `use chatlist::prelude::*;` brings in the engine, its options, the identifiers and the
//! collaborator traits.

pub use crate::chat_list::{Activation, ChatList, Collaborators};
pub use crate::derived::{DerivedState, Placeholder};
pub use crate::dialog::{DialogId, DialogSummary, FilterId, OrderKey, SortDirection, UnreadBadge, UnreadCount};
pub use crate::event::{Event, EventBus, ScriptError, Subscription};
pub use crate::loader::{LoadError, LoadOutcome};
pub use crate::options::{ChatListOptions, ChatListOptionsBuilder};
pub use crate::registry::{FilterChange, FilterSpec, RegistryError};
pub use crate::row::{Row, RowFactory, RowHandle, RowSurface};
pub use crate::slicer::{SliceOutcome, Viewport};
pub use crate::store::{DialogStore, MembershipTest, OrderKeyProvider, Page, PageRequest, StoreError};
pub use crate::window::{EdgeFlags, EdgeOffsets, WindowState};
pub use crate::Edge;
pub use std::sync::Arc;
