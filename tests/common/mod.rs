use chatlist::helper::{MemoryStore, RecordingRows};
use chatlist::prelude::*;

/// A chat list over an in-memory store, with a recording of what it drew.
pub struct Harness {
    pub list: ChatList,
    pub store: MemoryStore,
    pub rows: RecordingRows,
    pub bus: EventBus,
}

impl Harness {
    /// `dialogs` summaries with keys equal to their ids, paged `page_size` at a time
    pub fn new(dialogs: impl IntoIterator<Item = DialogSummary>, page_size: usize) -> Self {
        let options = ChatListOptionsBuilder::default()
            .page_size(Some(page_size))
            .row_height(10)
            .build()
            .unwrap();
        Self::with_options(dialogs, options)
    }

    pub fn with_options(dialogs: impl IntoIterator<Item = DialogSummary>, options: ChatListOptions) -> Self {
        let store = MemoryStore::with_dialogs(dialogs);
        let rows = RecordingRows::new();
        let list = ChatList::new(
            options,
            Collaborators::from_store(Arc::new(store.clone()), Arc::new(rows.clone())),
        );
        Self {
            list,
            store,
            rows,
            bus: EventBus::new(),
        }
    }

    /// Pages the active filter in until its bottom edge is reached
    pub async fn load_to_bottom(&self) {
        while let LoadOutcome::Loaded { .. } = self.list.load_more(Edge::Bottom).await.unwrap() {}
    }

    /// Keys of the visible dialogs, as the store reports them
    pub fn visible_keys(&self, filter: FilterId) -> Vec<OrderKey> {
        self.list
            .visible_ids(filter)
            .into_iter()
            .map(|id| self.store.order_key(id, filter).unwrap())
            .collect()
    }

    /// Waits until the store has received `count` page requests
    pub async fn wait_for_requests(&self, count: usize) {
        while self.store.requests().len() < count {
            tokio::task::yield_now().await;
        }
    }
}

pub fn dialog(id: i64, key: u64) -> DialogSummary {
    DialogSummary::new(DialogId(id), OrderKey(key))
}

pub fn in_folder(id: i64, key: u64, folder: FilterId) -> DialogSummary {
    let mut summary = dialog(id, key);
    summary.filter_membership.push(folder);
    summary
}

/// Dialogs `1..=n`, each keyed by its id
pub fn dialogs(n: i64) -> Vec<DialogSummary> {
    (1..=n).map(|i| dialog(i, i as u64)).collect()
}

pub fn ids(raw: &[i64]) -> Vec<DialogId> {
    raw.iter().copied().map(DialogId).collect()
}

/// Asserts the visible ids of a filter, both in the engine and on its surface
macro_rules! assert_visible {
    ($harness:expr, $filter:expr, [$($id:expr),* $(,)?]) => {{
        let expected: Vec<chatlist::dialog::DialogId> = vec![$(chatlist::dialog::DialogId($id)),*];
        assert_eq!($harness.list.visible_ids($filter), expected, "engine view");
        assert_eq!($harness.rows.snapshot($filter), expected, "surface");
    }};
}
