//! Inbound events and the bus that carries them.

use std::fs;
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};

use crate::dialog::{DialogId, FilterId};
use crate::registry::FilterSpec;

/// Something changed in the store
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    /// A dialog was created or its summary changed (new message, read, draft, membership)
    ItemUpserted(DialogId),
    /// A dialog was deleted or left
    ItemRemoved(DialogId),
    /// A folder was created
    FilterAdded(FilterSpec),
    /// A folder's definition changed
    FilterUpdated(FilterSpec),
    /// A folder was deleted
    FilterRemoved(FilterId),
    /// The folder tab order changed
    FiltersReordered(Vec<FilterId>),
    /// A folder's unread totals changed
    UnreadChanged(FilterId),
    /// The store was wiped and is being refilled
    StateCleared,
}

/// Failure to read an event script
#[derive(Error, Debug)]
pub enum ScriptError {
    /// The file could not be read
    #[error("cannot read event script: {0}")]
    Io(#[from] io::Error),
    /// The file is not a RON list of events
    #[error("invalid event script: {0}")]
    Parse(#[from] ron::error::SpannedError),
}

/// Reads a RON list of events, e.g. `[ItemUpserted(3), UnreadChanged(2), StateCleared]`
pub fn read_script(path: &Path) -> Result<Vec<Event>, ScriptError> {
    let text = fs::read_to_string(path)?;
    let events: Vec<Event> = ron::from_str(&text)?;
    debug!("read {} events from {}", events.len(), path.display());
    Ok(events)
}

type Subscribers = Mutex<IndexMap<u64, UnboundedSender<Event>>>;

/// Fan-out of [`Event`]s to any number of subscribers
#[derive(Clone, Debug, Default)]
pub struct EventBus {
    subscribers: Arc<Subscribers>,
    next_id: Arc<AtomicU64>,
}

impl EventBus {
    /// Creates a bus with no subscriber
    pub fn new() -> Self {
        Self::default()
    }

    /// Delivers `event` to every live subscriber, returning how many received it
    pub fn publish(&self, event: Event) -> usize {
        let mut subscribers = self.subscribers.lock().unwrap_or_else(PoisonError::into_inner);
        subscribers.retain(|_, tx| tx.send(event.clone()).is_ok());
        trace!("published {:?} to {} subscribers", event, subscribers.len());
        subscribers.len()
    }

    /// Registers a new subscriber
    pub fn subscribe(&self) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = unbounded_channel();
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, tx);
        Subscription {
            id,
            rx,
            subscribers: Arc::downgrade(&self.subscribers),
        }
    }

    /// Number of live subscribers
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// Receiving end of an [`EventBus`] registration.
///
/// Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    rx: UnboundedReceiver<Event>,
    subscribers: Weak<Subscribers>,
}

impl Subscription {
    /// Next event, `None` once unsubscribed or when the bus is gone
    pub async fn recv(&mut self) -> Option<Event> {
        self.rx.recv().await
    }

    /// Next event if one is queued
    pub fn try_recv(&mut self) -> Option<Event> {
        self.rx.try_recv().ok()
    }

    /// Stops receiving. Events already queued can still be read.
    pub fn unsubscribe(&mut self) {
        if let Some(subscribers) = self.subscribers.upgrade() {
            subscribers.lock().unwrap_or_else(PoisonError::into_inner).shift_remove(&self.id);
        }
        self.rx.close();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}
