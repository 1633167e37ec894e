//! UI state derived from the active session after its length settles.

use serde::{Deserialize, Serialize};

use crate::dialog::FilterId;
use crate::registry::FilterSession;

/// Empty-list placeholder to show
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Placeholder {
    /// The user has no dialog at all
    EmptyDialogs,
    /// The folder matches nothing
    EmptyFolder,
}

/// What the host renders around the list
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedState {
    /// Filter this state describes
    pub filter: FilterId,
    /// Number of rows in the view
    pub visible_count: usize,
    /// Placeholder replacing the empty list
    pub placeholder: Option<Placeholder>,
    /// Whether to suggest contacts under a short list
    pub suggest_contacts: bool,
    /// Whether the first page is still being fetched
    pub loading: bool,
}

impl DerivedState {
    /// Derives the state of `session`.
    ///
    /// The placeholder needs the bottom edge to be exhausted; the archive never gets one.
    pub fn compute(session: &FilterSession, contacts_threshold: usize) -> Self {
        let filter = session.spec().id;
        let visible_count = session.view().len();
        let exhausted = session.window().loaded_all.bottom && visible_count == 0;
        let placeholder = match filter {
            FilterId::ARCHIVE => None,
            _ if !exhausted => None,
            FilterId::ALL => Some(Placeholder::EmptyDialogs),
            _ => Some(Placeholder::EmptyFolder),
        };

        Self {
            filter,
            visible_count,
            placeholder,
            suggest_contacts: filter == FilterId::ALL && visible_count < contacts_threshold,
            loading: session.is_loading(),
        }
    }
}
