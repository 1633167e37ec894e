//! The engine: sessions, background tasks and event handling.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::select;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::Edge;
use crate::debounce::{Coalesce, next_batch};
use crate::derived::DerivedState;
use crate::dialog::{DialogId, FilterId, UnreadBadge};
use crate::event::{Event, EventBus};
use crate::loader::{LoadError, LoadOutcome};
use crate::options::ChatListOptions;
use crate::registry::{FilterChange, FilterSessionRegistry, FilterSpec, RegistryError, Switch};
use crate::row::RowFactory;
use crate::slicer::Viewport;
use crate::store::{DialogStore, MembershipTest, OrderKeyProvider};
use crate::window::WindowState;

/// Work left over after an event was applied
pub type FollowUp = BoxFuture<'static, ()>;

/// The collaborators a [`ChatList`] talks to
#[derive(Clone, derive_more::Debug)]
pub struct Collaborators {
    /// Paged dialog access
    #[debug(skip)]
    pub store: Arc<dyn DialogStore>,
    /// Sort keys per filter
    #[debug(skip)]
    pub keys: Arc<dyn OrderKeyProvider>,
    /// Filter membership
    #[debug(skip)]
    pub membership: Arc<dyn MembershipTest>,
    /// Row creation
    #[debug(skip)]
    pub rows: Arc<dyn RowFactory>,
}

impl Collaborators {
    /// Uses one object as store, key provider and membership test
    pub fn from_store<S>(store: Arc<S>, rows: Arc<dyn RowFactory>) -> Self
    where
        S: DialogStore + OrderKeyProvider + MembershipTest + 'static,
    {
        Self {
            store: store.clone(),
            keys: store.clone(),
            membership: store,
            rows,
        }
    }
}

/// Result of [`ChatList::set_active_filter`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Activation {
    /// The filter now active
    pub filter: FilterId,
    /// The first page came from a cache (or nothing had to be fetched)
    pub cached: bool,
    /// Every row of the first page has its content
    pub render_complete: bool,
    /// The initial load, if one was issued
    pub outcome: Option<LoadOutcome>,
}

pub(crate) struct EngineState {
    pub(crate) registry: FilterSessionRegistry,
    pub(crate) loaded_once: bool,
}

pub(crate) struct Shared {
    pub(crate) options: ChatListOptions,
    pub(crate) deps: Collaborators,
    state: Mutex<EngineState>,
    length_tx: UnboundedSender<FilterId>,
    length_rx: Mutex<Option<UnboundedReceiver<FilterId>>>,
    slice_tx: UnboundedSender<Viewport>,
    slice_rx: Mutex<Option<UnboundedReceiver<Viewport>>>,
    derived_tx: watch::Sender<Option<DerivedState>>,
    cancel: CancellationToken,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Drop for Shared {
    fn drop(&mut self) {
        self.cancel.cancel();
        for task in self.tasks.get_mut().unwrap_or_else(PoisonError::into_inner).drain(..) {
            task.abort();
        }
    }
}

/// Windowed, sorted, filterable dialog list
///
/// Cloning is cheap: clones drive the same engine.
#[derive(Clone)]
pub struct ChatList {
    pub(crate) shared: Arc<Shared>,
}

impl std::fmt::Debug for ChatList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatList")
            .field("options", &self.shared.options)
            .field("active", &self.active_filter())
            .finish()
    }
}

fn default_title(filter: FilterId) -> String {
    match filter {
        FilterId::ALL => String::from("All"),
        FilterId::ARCHIVE => String::from("Archive"),
        other => format!("Folder {other}"),
    }
}

impl ChatList {
    /// Creates the engine with a session for the default filter. Nothing is active yet.
    pub fn new(options: ChatListOptions, deps: Collaborators) -> Self {
        let (length_tx, length_rx) = unbounded_channel();
        let (slice_tx, slice_rx) = unbounded_channel();
        let (derived_tx, _) = watch::channel(None);
        let default = options.default_filter;
        let registry = FilterSessionRegistry::new(
            FilterSpec::new(default, default_title(default)),
            deps.rows.clone(),
            deps.keys.clone(),
            Some(length_tx.clone()),
        );

        Self {
            shared: Arc::new(Shared {
                options,
                deps,
                state: Mutex::new(EngineState {
                    registry,
                    loaded_once: false,
                }),
                length_tx,
                length_rx: Mutex::new(Some(length_rx)),
                slice_tx,
                slice_rx: Mutex::new(Some(slice_rx)),
                derived_tx,
                cancel: CancellationToken::new(),
                tasks: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Options the engine runs with
    pub fn options(&self) -> &ChatListOptions {
        &self.shared.options
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, EngineState> {
        self.shared.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Spawns the background tasks: event handling from `bus`, debounced derived state
    /// and throttled slicing.
    ///
    /// Must be called within a tokio runtime. Calling it again has no effect.
    pub fn start(&self, bus: &EventBus) {
        let length_rx = self.shared.length_rx.lock().unwrap_or_else(PoisonError::into_inner).take();
        let slice_rx = self.shared.slice_rx.lock().unwrap_or_else(PoisonError::into_inner).take();
        let (Some(mut length_rx), Some(mut slice_rx)) = (length_rx, slice_rx) else {
            warn!("chat list already started");
            return;
        };
        let options = &self.shared.options;
        let weak = Arc::downgrade(&self.shared);
        let mut tasks = Vec::with_capacity(3);

        let mut subscription = bus.subscribe();
        let cancel = self.shared.cancel.clone();
        let engine = weak.clone();
        tasks.push(tokio::spawn(async move {
            loop {
                select! {
                    _ = cancel.cancelled() => break,
                    event = subscription.recv() => {
                        let (Some(event), Some(list)) = (event, upgrade(&engine)) else {
                            break;
                        };
                        if let Some(follow_up) = list.apply_event(event) {
                            tokio::spawn(follow_up);
                        }
                    }
                }
            }
            debug!("event loop stopped");
        }));

        let cancel = self.shared.cancel.clone();
        let engine = weak.clone();
        let debounce = options.length_debounce();
        tasks.push(tokio::spawn(async move {
            loop {
                select! {
                    _ = cancel.cancelled() => break,
                    batch = next_batch(&mut length_rx, debounce, Coalesce::Window) => {
                        let (Some(filters), Some(list)) = (batch, upgrade(&engine)) else {
                            break;
                        };
                        if filters.iter().any(|filter| Some(*filter) == list.active_filter()) {
                            list.recompute_derived();
                        }
                    }
                }
            }
        }));

        let cancel = self.shared.cancel.clone();
        let engine = weak;
        let throttle = options.slice_throttle();
        tasks.push(tokio::spawn(async move {
            loop {
                select! {
                    _ = cancel.cancelled() => break,
                    batch = next_batch(&mut slice_rx, throttle, Coalesce::Quiet) => {
                        let (Some(viewports), Some(list)) = (batch, upgrade(&engine)) else {
                            break;
                        };
                        if let Some(viewport) = viewports.last() {
                            list.slice(*viewport);
                        }
                    }
                }
            }
        }));

        self.shared
            .tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(tasks);
        debug!("chat list started");
    }

    /// Stops the background tasks, releases the event subscription and cancels every
    /// outstanding pass. Pending fetches complete but their results are dropped.
    pub fn dispose(&self) {
        self.shared.cancel.cancel();
        for task in self
            .shared
            .tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
        {
            task.abort();
        }
        self.lock().registry.invalidate_all();
        debug!("chat list disposed");
    }

    /// Returns true once [`ChatList::dispose`] was called
    pub fn is_disposed(&self) -> bool {
        self.shared.cancel.is_cancelled()
    }

    /// Makes `filter` active and, when its collection is empty, loads its first page.
    ///
    /// Resolves once the page is merged and its rows are ready. A later switch makes it
    /// fail with [`LoadError::Stale`].
    pub async fn set_active_filter(&self, filter: FilterId) -> Result<Activation, LoadError> {
        let switch = self
            .lock()
            .registry
            .activate(filter)
            .map_err(|_| LoadError::UnknownFilter(filter))?;
        self.after_switch(filter, switch).await
    }

    /// Leaves the archive for the filter it was entered from
    pub async fn restore_previous_filter(&self) -> Result<Activation, LoadError> {
        let (filter, switch) = {
            let mut state = self.lock();
            let switch = state
                .registry
                .restore_previous()
                .map_err(|_| LoadError::UnknownFilter(state.registry.default_filter()))?;
            (state.registry.active().unwrap_or(state.registry.default_filter()), switch)
        };
        self.after_switch(filter, switch).await
    }

    async fn after_switch(&self, filter: FilterId, switch: Switch) -> Result<Activation, LoadError> {
        if let Switch::Switched { .. } = switch {
            self.notify_length(filter);
        }
        match switch {
            Switch::Switched { needs_load: true, .. } => {
                let outcome = self.load_more(Edge::Bottom).await?;
                let cached = match outcome {
                    LoadOutcome::Loaded { cached, .. } => cached,
                    _ => true,
                };
                Ok(Activation {
                    filter,
                    cached,
                    render_complete: true,
                    outcome: Some(outcome),
                })
            }
            Switch::Switched { needs_load: false, .. } | Switch::Unchanged => Ok(Activation {
                filter,
                cached: true,
                render_complete: true,
                outcome: None,
            }),
        }
    }

    /// The user reached `edge`: loads more in the background.
    ///
    /// Returns `None` outside a tokio runtime.
    pub fn notify_scroll(&self, edge: Edge) -> Option<JoinHandle<Result<LoadOutcome, LoadError>>> {
        let handle = tokio::runtime::Handle::try_current().ok()?;
        let list = self.clone();
        Some(handle.spawn(async move {
            let result = list.load_more(edge).await;
            if let Err(err) = &result {
                log_load_error(err);
            }
            result
        }))
    }

    /// The viewport moved: slices once scrolling has been idle for the throttle delay
    pub fn notify_scrolled(&self, viewport: Viewport) {
        // Nothing listens before start or after dispose
        let _ = self.shared.slice_tx.send(viewport);
    }

    /// The active filter
    pub fn active_filter(&self) -> Option<FilterId> {
        self.lock().registry.active()
    }

    /// Dialog ids of `filter` in display order; empty for inactive or unknown filters
    pub fn visible_ids(&self, filter: FilterId) -> Vec<DialogId> {
        self.lock()
            .registry
            .session(filter)
            .map(|session| session.view().get_all())
            .unwrap_or_default()
    }

    /// Paging state of `filter`
    pub fn window_state(&self, filter: FilterId) -> Option<WindowState> {
        self.lock().registry.session(filter).map(|session| *session.window())
    }

    /// Whether `filter` shows its loading placeholder
    pub fn is_loading(&self, filter: FilterId) -> bool {
        self.lock()
            .registry
            .session(filter)
            .is_some_and(|session| session.is_loading())
    }

    /// Unread badge of `filter`
    pub fn unread_badge(&self, filter: FilterId) -> Option<UnreadBadge> {
        self.lock().registry.session(filter).map(|session| session.badge())
    }

    /// Tab strip content, in order
    pub fn tabs(&self) -> Vec<FilterSpec> {
        self.lock().registry.tabs().into_iter().cloned().collect()
    }

    /// Whether the tab strip is shown
    pub fn tabs_visible(&self) -> bool {
        self.lock().registry.tabs_visible()
    }

    /// Derived state of the active filter, updated after each debounce window
    pub fn derived(&self) -> watch::Receiver<Option<DerivedState>> {
        self.shared.derived_tx.subscribe()
    }

    /// Recomputes and publishes the derived state now.
    ///
    /// Nothing is published before the first successful load.
    pub fn recompute_derived(&self) -> Option<DerivedState> {
        let derived = {
            let state = self.lock();
            if !state.loaded_once {
                return None;
            }
            DerivedState::compute(state.registry.active_session()?, self.shared.options.contacts_threshold)
        };
        trace!("derived state {:?}", derived);
        self.shared.derived_tx.send_if_modified(|current| {
            if current.as_ref() == Some(&derived) {
                false
            } else {
                *current = Some(derived.clone());
                true
            }
        });
        Some(derived)
    }

    pub(crate) fn notify_length(&self, filter: FilterId) {
        let _ = self.shared.length_tx.send(filter);
    }

    /// Adds a filter, or updates a known one.
    ///
    /// When the active filter changes direction, its rebuilt collection is loaded again.
    pub async fn add_filter(&self, spec: FilterSpec) -> FilterChange {
        let (change, follow_up) = self.add_filter_now(spec);
        if let Some(follow_up) = follow_up {
            follow_up.await;
        }
        change
    }

    fn add_filter_now(&self, spec: FilterSpec) -> (FilterChange, Option<FollowUp>) {
        let mut state = self.lock();
        let active = state.registry.active() == Some(spec.id);
        let change = state.registry.add_filter(spec);
        if active && let Some(session) = state.registry.active_session_mut() {
            session.view.resort();
            session.window.sync_offsets(&session.view);
        }
        drop(state);
        let follow_up = match change {
            FilterChange::Rebuilt { needs_load: true } => Some(self.load_follow_up()),
            _ => None,
        };
        (change, follow_up)
    }

    /// Removes a filter; when it was active, the default filter takes over and loads
    pub async fn remove_filter(&self, filter: FilterId) -> Result<(), RegistryError> {
        if let Some(follow_up) = self.remove_filter_now(filter)? {
            follow_up.await;
        }
        Ok(())
    }

    fn remove_filter_now(&self, filter: FilterId) -> Result<Option<FollowUp>, RegistryError> {
        let switch = self.lock().registry.remove_filter(filter)?;
        Ok(match switch {
            Some(Switch::Switched { needs_load: true, .. }) => Some(self.load_follow_up()),
            _ => None,
        })
    }

    /// Rearranges the tab order and resorts the active collection
    pub fn reorder_filters(&self, order: &[FilterId]) {
        let mut state = self.lock();
        state.registry.reorder(order);
        if let Some(session) = state.registry.active_session_mut() {
            session.view.resort();
            session.window.sync_offsets(&session.view);
        }
    }

    /// Applies `event` and awaits the work it triggered
    pub async fn handle_event(&self, event: Event) {
        if let Some(follow_up) = self.apply_event(event) {
            follow_up.await;
        }
    }

    /// Applies the synchronous part of `event`.
    ///
    /// Returns the asynchronous remainder (a page load, an unread fetch), if any.
    pub fn apply_event(&self, event: Event) -> Option<FollowUp> {
        trace!("event {:?}", event);
        match event {
            Event::ItemUpserted(id) => {
                self.upsert_item(id);
                None
            }
            Event::ItemRemoved(id) => {
                self.remove_item(id);
                None
            }
            Event::FilterAdded(spec) => self.add_filter_now(spec).1,
            Event::FilterUpdated(spec) => self.update_filter(spec),
            Event::FilterRemoved(filter) => match self.remove_filter_now(filter) {
                Ok(follow_up) => follow_up,
                Err(err) => {
                    warn!("cannot remove filter: {err}");
                    None
                }
            },
            Event::FiltersReordered(order) => {
                self.reorder_filters(&order);
                None
            }
            Event::UnreadChanged(filter) => self.refresh_badge(filter),
            Event::StateCleared => self.reset(),
        }
    }

    /// Places, moves or removes `id` in the active collection after its summary changed.
    ///
    /// A dialog that no longer belongs to the filter is removed. One that belongs is added
    /// only when its key falls inside the loaded window.
    fn upsert_item(&self, id: DialogId) {
        let deps = &self.shared.deps;
        let mut state = self.lock();
        let Some(session) = state.registry.active_session_mut() else {
            return;
        };
        let filter = session.spec.id;
        let key = deps
            .store
            .summary(id)
            .filter(|summary| deps.membership.belongs_to_filter(summary, filter))
            .and_then(|_| deps.keys.order_key(id, filter));

        match key {
            Some(key) if session.window.fits(key, session.spec.direction) => {
                if session.view.has(id) {
                    session.view.update(id);
                } else if let Some(added) = session.view.add(id, false) {
                    spawn_ready(added.ready);
                }
            }
            Some(_) => {
                if session.view.delete(id) {
                    trace!("filter {}: {} left the window", filter, id);
                }
            }
            None => {
                if session.view.delete(id) {
                    debug!("filter {}: {} no longer belongs", filter, id);
                }
            }
        }
        session.window.sync_offsets(&session.view);
    }

    fn remove_item(&self, id: DialogId) {
        let mut state = self.lock();
        for session in state.registry.sessions_mut() {
            if session.view.delete(id) {
                session.window.sync_offsets(&session.view);
            }
        }
    }

    fn update_filter(&self, spec: FilterSpec) -> Option<FollowUp> {
        let deps = &self.shared.deps;
        let mut state = self.lock();
        let filter = spec.id;
        let change = state.registry.add_filter(spec);
        if let FilterChange::Rebuilt { needs_load: true } = change {
            drop(state);
            return Some(self.load_follow_up());
        }
        if state.registry.active() != Some(filter) {
            return None;
        }
        if let Some(session) = state.registry.active_session_mut() {
            let dropped = session.view.revalidate(deps.store.as_ref(), deps.membership.as_ref());
            if !dropped.is_empty() {
                debug!("filter {}: revalidation dropped {:?}", filter, dropped);
            }
            session.window.sync_offsets(&session.view);
        }
        None
    }

    fn refresh_badge(&self, filter: FilterId) -> Option<FollowUp> {
        let token = self.lock().registry.session(filter)?.badge_guard.supersede();
        let list = self.clone();
        let fetch = self.shared.deps.store.unread_count(filter);
        Some(
            async move {
                let count = match token.resume(fetch).await {
                    Ok(Ok(count)) => count,
                    Ok(Err(err)) => {
                        warn!("filter {}: unread count failed: {}", filter, err);
                        return;
                    }
                    Err(stale) => {
                        trace!("filter {}: dropping unread count, {}", filter, stale);
                        return;
                    }
                };
                let mut state = list.lock();
                if token.is_current()
                    && let Some(session) = state.registry.session_mut(filter)
                {
                    session.badge = UnreadBadge::for_filter(filter, count);
                }
            }
            .boxed(),
        )
    }

    fn reset(&self) -> Option<FollowUp> {
        let active = {
            let mut state = self.lock();
            state.loaded_once = false;
            state.registry.clear_all();
            state.registry.active()
        };
        self.shared.derived_tx.send_replace(None);
        info!("state cleared, reloading {:?}", active);
        active.map(|_| self.load_follow_up())
    }

    fn load_follow_up(&self) -> FollowUp {
        let list = self.clone();
        async move {
            if let Err(err) = list.load_more(Edge::Bottom).await {
                log_load_error(&err);
            }
        }
        .boxed()
    }
}

fn upgrade(shared: &Weak<Shared>) -> Option<ChatList> {
    shared.upgrade().map(|shared| ChatList { shared })
}

fn spawn_ready(ready: Option<BoxFuture<'static, ()>>) {
    let Some(ready) = ready else {
        return;
    };
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            handle.spawn(ready);
        }
        Err(_) => trace!("no runtime, row readiness is not tracked"),
    }
}

fn log_load_error(err: &LoadError) {
    match err {
        LoadError::Stale(stale) => debug!("load discarded: {stale}"),
        other => warn!("load failed: {other}"),
    }
}
