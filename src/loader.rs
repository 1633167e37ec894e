//! Bidirectional paging of the active filter.

use futures::future::join_all;
use thiserror::Error;

use crate::Edge;
use crate::chat_list::ChatList;
use crate::dialog::FilterId;
use crate::staleness::{PassToken, Stale};
use crate::store::{PageRequest, StoreError};

/// Why a load did not apply
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    /// The filter was switched, cleared or removed while the page was in flight
    #[error(transparent)]
    Stale(#[from] Stale),
    /// No session exists for the filter
    #[error("unknown filter {0}")]
    UnknownFilter(FilterId),
    /// The store rejected the query
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// What [`ChatList::load_more`] did
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadOutcome {
    /// A page was merged
    Loaded {
        /// The page came from a cache
        cached: bool,
        /// Rows created by the merge
        added: usize,
        /// Nothing remains beyond the page on that edge
        reached_end: bool,
    },
    /// The edge is fully loaded
    AlreadyComplete,
    /// Another load of the same filter is running
    InFlight,
    /// No filter is active
    NoActiveFilter,
}

impl ChatList {
    /// Extends the active filter's window towards `edge` by one page.
    ///
    /// At most one load runs per filter; a second call while one is in flight returns
    /// [`LoadOutcome::InFlight`]. The page's rows are awaited before returning. A store
    /// failure leaves the edge open so the next scroll retries.
    ///
    /// Start, failure and merge each notify the length channel, so the derived state
    /// follows the loading flag.
    pub async fn load_more(&self, edge: Edge) -> Result<LoadOutcome, LoadError> {
        let (request, token) = {
            let mut state = self.lock();
            let loaded_once = state.loaded_once;
            let Some(session) = state.registry.active_session_mut() else {
                return Ok(LoadOutcome::NoActiveFilter);
            };
            if session.window.is_loading() {
                trace!("filter {}: load already in flight", session.spec.id);
                return Ok(LoadOutcome::InFlight);
            }
            if session.window.loaded_all.get(edge) {
                return Ok(LoadOutcome::AlreadyComplete);
            }

            let request = PageRequest {
                filter: session.spec.id,
                offset: session.window.effective_offset(edge),
                count: self.shared.options.page_size(),
                edge,
            };
            session.window.begin_load(edge);
            // After the first load, a cached answer is quick enough to skip the placeholder
            session.loading =
                session.view.is_empty() && (!loaded_once || !self.shared.deps.store.page_cached(&request));
            (request, session.guard.begin())
        };
        let filter = request.filter;
        self.notify_length(filter);
        debug!(
            "filter {}: loading {} from {:?} towards {:?}",
            filter, request.count, request.offset, edge
        );

        let page = match self.shared.deps.store.get_page(request).await {
            Ok(page) => page,
            Err(err) => {
                warn!("filter {}: page load failed: {}", filter, err);
                self.finish_load(filter, &token);
                self.notify_length(filter);
                return Err(err.into());
            }
        };

        let (ready, added) = {
            let mut state = self.lock();
            if let Err(stale) = token.check() {
                debug!("filter {}: discarding page, {}", filter, stale);
                return Err(stale.into());
            }
            let Some(session) = state.registry.session_mut(filter) else {
                return Err(LoadError::UnknownFilter(filter));
            };

            let mut ready = Vec::new();
            let mut added = 0;
            for item in &page.items {
                match session.view.add(item.id, true) {
                    Some(result) => {
                        if result.created {
                            added += 1;
                        }
                        ready.extend(result.ready);
                    }
                    None => trace!("filter {}: {} has no key, skipped", filter, item.id),
                }
            }
            if page.is_edge_end {
                session.window.loaded_all.set(edge, true);
            }
            session.window.sync_offsets(&session.view);
            state.loaded_once = true;
            (ready, added)
        };

        join_all(ready).await;
        token.check()?;
        self.finish_load(filter, &token);
        self.notify_length(filter);
        debug!(
            "filter {}: merged {} of {} (end: {}, cached: {})",
            filter,
            added,
            page.items.len(),
            page.is_edge_end,
            page.cached
        );

        Ok(LoadOutcome::Loaded {
            cached: page.cached,
            added,
            reached_end: page.is_edge_end,
        })
    }

    fn finish_load(&self, filter: FilterId, token: &PassToken) {
        let mut state = self.lock();
        if !token.is_current() {
            return;
        }
        if let Some(session) = state.registry.session_mut(filter) {
            session.window.finish_load();
            session.loading = false;
        }
    }
}
