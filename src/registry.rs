//! Filter sessions and the active filter.

use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;

use crate::dialog::{FilterId, SortDirection, UnreadBadge};
use crate::row::RowFactory;
use crate::sorted_view::SortedCollectionView;
use crate::staleness::StalenessGuard;
use crate::store::OrderKeyProvider;
use crate::window::WindowState;

/// Description of a filter (folder)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSpec {
    /// The filter
    pub id: FilterId,
    /// Tab title
    pub title: String,
    /// Tab order, lower first
    #[serde(default)]
    pub position: u32,
    /// Display direction of its dialogs
    #[serde(default)]
    pub direction: SortDirection,
}

impl FilterSpec {
    /// A newest-first filter at position 0
    pub fn new(id: FilterId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            position: 0,
            direction: SortDirection::default(),
        }
    }

    /// Sets the tab position
    pub fn with_position(mut self, position: u32) -> Self {
        self.position = position;
        self
    }

    /// Sets the display direction
    pub fn with_direction(mut self, direction: SortDirection) -> Self {
        self.direction = direction;
        self
    }
}

/// Registry failures
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryError {
    /// No session exists for the filter
    #[error("unknown filter {0}")]
    UnknownFilter(FilterId),
    /// The fallback filter cannot be removed
    #[error("filter {0} is the default filter and cannot be removed")]
    DefaultFilterRemoval(FilterId),
}

/// State kept for one filter
#[derive(Debug)]
pub struct FilterSession {
    pub(crate) spec: FilterSpec,
    pub(crate) view: SortedCollectionView,
    pub(crate) window: WindowState,
    pub(crate) guard: StalenessGuard,
    pub(crate) badge: UnreadBadge,
    pub(crate) badge_guard: StalenessGuard,
    pub(crate) loading: bool,
}

impl FilterSession {
    fn new(
        spec: FilterSpec,
        rows: Arc<dyn RowFactory>,
        keys: Arc<dyn OrderKeyProvider>,
        length_tx: Option<UnboundedSender<FilterId>>,
    ) -> Self {
        let mut view = SortedCollectionView::new(spec.id, spec.direction, rows, keys);
        if let Some(tx) = length_tx {
            view = view.with_length_notifier(tx);
        }
        Self {
            spec,
            view,
            window: WindowState::default(),
            guard: StalenessGuard::new(),
            badge: UnreadBadge::default(),
            badge_guard: StalenessGuard::new(),
            loading: false,
        }
    }

    /// Description of the filter
    pub fn spec(&self) -> &FilterSpec {
        &self.spec
    }

    /// The sorted collection
    pub fn view(&self) -> &SortedCollectionView {
        &self.view
    }

    /// Paging state
    pub fn window(&self) -> &WindowState {
        &self.window
    }

    /// Unread badge of the tab
    pub fn badge(&self) -> UnreadBadge {
        self.badge
    }

    /// Whether the first page of an empty session is being fetched
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Drops every row and cancels outstanding passes; the session keeps its spec and badge
    pub(crate) fn clear(&mut self) {
        self.guard.invalidate();
        self.view.clear();
        self.window = WindowState::default();
        self.loading = false;
    }

    fn enter(&mut self) {
        self.guard.invalidate();
        self.window.reset_for_activation();
        self.window.sync_offsets(&self.view);
        self.loading = false;
    }
}

/// Outcome of [`FilterSessionRegistry::activate`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Switch {
    /// The filter was already active
    Unchanged,
    /// The active filter changed
    Switched {
        /// Previously active filter
        from: Option<FilterId>,
        /// The new session is empty and needs a bottom-ward load
        needs_load: bool,
    },
}

/// Outcome of [`FilterSessionRegistry::add_filter`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterChange {
    /// A session was created
    Created,
    /// Title or position of a known filter changed
    Updated,
    /// The direction changed and the collection was rebuilt empty
    Rebuilt {
        /// The filter is active and needs a bottom-ward load
        needs_load: bool,
    },
}

/// Owns one session per filter, in tab order
#[derive(derive_more::Debug)]
pub struct FilterSessionRegistry {
    sessions: IndexMap<FilterId, FilterSession>,
    active: Option<FilterId>,
    default: FilterId,
    previous: Option<FilterId>,
    #[debug(skip)]
    rows: Arc<dyn RowFactory>,
    #[debug(skip)]
    keys: Arc<dyn OrderKeyProvider>,
    #[debug(skip)]
    length_tx: Option<UnboundedSender<FilterId>>,
}

impl FilterSessionRegistry {
    /// Creates a registry holding the session of the fallback filter
    pub fn new(
        default: FilterSpec,
        rows: Arc<dyn RowFactory>,
        keys: Arc<dyn OrderKeyProvider>,
        length_tx: Option<UnboundedSender<FilterId>>,
    ) -> Self {
        let mut registry = Self {
            sessions: IndexMap::new(),
            active: None,
            default: default.id,
            previous: None,
            rows,
            keys,
            length_tx,
        };
        registry.add_filter(default);
        registry
    }

    /// The fallback filter
    pub fn default_filter(&self) -> FilterId {
        self.default
    }

    /// The active filter
    pub fn active(&self) -> Option<FilterId> {
        self.active
    }

    /// Returns true if a session exists for `filter`
    pub fn contains(&self, filter: FilterId) -> bool {
        self.sessions.contains_key(&filter)
    }

    /// Session of `filter`
    pub fn session(&self, filter: FilterId) -> Option<&FilterSession> {
        self.sessions.get(&filter)
    }

    /// Mutable session of `filter`
    pub fn session_mut(&mut self, filter: FilterId) -> Option<&mut FilterSession> {
        self.sessions.get_mut(&filter)
    }

    /// Session of the active filter
    pub fn active_session(&self) -> Option<&FilterSession> {
        self.active.and_then(|id| self.sessions.get(&id))
    }

    /// Mutable session of the active filter
    pub fn active_session_mut(&mut self) -> Option<&mut FilterSession> {
        let id = self.active?;
        self.sessions.get_mut(&id)
    }

    /// Every session, in tab order
    pub fn sessions(&self) -> impl Iterator<Item = &FilterSession> + '_ {
        self.sessions.values()
    }

    /// Every session, in tab order
    pub fn sessions_mut(&mut self) -> impl Iterator<Item = &mut FilterSession> + '_ {
        self.sessions.values_mut()
    }

    /// Filters shown in the tab strip, in order. The archive is never a tab.
    pub fn tabs(&self) -> Vec<&FilterSpec> {
        self.sessions
            .values()
            .map(|session| &session.spec)
            .filter(|spec| spec.id != FilterId::ARCHIVE)
            .collect()
    }

    /// The tab strip is shown only when there is a choice to make
    pub fn tabs_visible(&self) -> bool {
        self.tabs().len() > 1
    }

    /// Adds a session for `spec`, or updates the known filter's title and position.
    ///
    /// A direction change rebuilds the collection; an active filter is re-entered and
    /// reported as needing a load.
    pub fn add_filter(&mut self, spec: FilterSpec) -> FilterChange {
        let change = match self.sessions.get_mut(&spec.id) {
            Some(session) => {
                let mut change = FilterChange::Updated;
                if session.spec.direction != spec.direction {
                    debug!("filter {}: direction changed, rebuilding", spec.id);
                    session.clear();
                    let mut view =
                        SortedCollectionView::new(spec.id, spec.direction, self.rows.clone(), self.keys.clone());
                    if let Some(tx) = self.length_tx.clone() {
                        view = view.with_length_notifier(tx);
                    }
                    session.view = view;
                    let active = self.active == Some(spec.id);
                    if active {
                        session.enter();
                    }
                    change = FilterChange::Rebuilt { needs_load: active };
                }
                session.spec = spec;
                change
            }
            None => {
                debug!("filter {}: new session", spec.id);
                let session = FilterSession::new(spec, self.rows.clone(), self.keys.clone(), self.length_tx.clone());
                self.sessions.insert(session.spec.id, session);
                FilterChange::Created
            }
        };
        self.sort_tabs();
        change
    }

    /// Destroys the session of `filter`.
    ///
    /// When it was active the default filter is activated and its switch returned.
    pub fn remove_filter(&mut self, filter: FilterId) -> Result<Option<Switch>, RegistryError> {
        if filter == self.default {
            return Err(RegistryError::DefaultFilterRemoval(filter));
        }
        let Some(mut session) = self.sessions.shift_remove(&filter) else {
            return Err(RegistryError::UnknownFilter(filter));
        };
        session.clear();
        session.badge_guard.invalidate();
        debug!("filter {}: removed", filter);

        if self.previous == Some(filter) {
            self.previous = None;
        }
        if self.active == Some(filter) {
            self.active = None;
            return self.activate(self.default).map(Some);
        }
        Ok(None)
    }

    /// Rearranges tab order: listed filters first, in the given order, then the rest
    pub fn reorder(&mut self, order: &[FilterId]) {
        let listed = order.len() as u32;
        let mut rest = 0;
        for session in self.sessions.values_mut() {
            match order.iter().position(|id| *id == session.spec.id) {
                Some(i) => session.spec.position = i as u32,
                None => {
                    session.spec.position = listed + rest;
                    rest += 1;
                }
            }
        }
        self.sort_tabs();
    }

    /// Makes `filter` the active one.
    ///
    /// The outgoing session loses its rows and outstanding passes. The incoming one starts
    /// with its top edge loaded and its bottom edge to page in. Activating the archive
    /// remembers the filter it was entered from.
    pub fn activate(&mut self, filter: FilterId) -> Result<Switch, RegistryError> {
        if !self.sessions.contains_key(&filter) {
            return Err(RegistryError::UnknownFilter(filter));
        }
        if self.active == Some(filter) {
            return Ok(Switch::Unchanged);
        }

        let from = self.active;
        if let Some(id) = from
            && let Some(session) = self.sessions.get_mut(&id)
        {
            session.clear();
        }
        self.previous = if filter == FilterId::ARCHIVE { from } else { None };

        let Some(session) = self.sessions.get_mut(&filter) else {
            return Err(RegistryError::UnknownFilter(filter));
        };
        session.enter();
        let needs_load = session.view.is_empty();
        self.active = Some(filter);
        debug!("active filter {:?} -> {}", from, filter);

        Ok(Switch::Switched { from, needs_load })
    }

    /// Filter the archive was entered from
    pub fn previous(&self) -> Option<FilterId> {
        self.previous
    }

    /// Leaves the archive for the filter it was entered from, or the default filter
    pub fn restore_previous(&mut self) -> Result<Switch, RegistryError> {
        let target = self
            .previous
            .take()
            .filter(|id| self.sessions.contains_key(id))
            .unwrap_or(self.default);
        self.activate(target)
    }

    /// Clears every session. The active filter stays selected but is reset.
    pub fn clear_all(&mut self) {
        for session in self.sessions.values_mut() {
            session.clear();
        }
        if let Some(session) = self.active_session_mut() {
            session.enter();
        }
    }

    /// Cancels every outstanding pass
    pub fn invalidate_all(&self) {
        for session in self.sessions.values() {
            session.guard.invalidate();
            session.badge_guard.invalidate();
        }
    }

    fn sort_tabs(&mut self) {
        self.sessions
            .sort_by(|_, a, _, b| a.spec.position.cmp(&b.spec.position));
    }
}
