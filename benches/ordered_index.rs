use std::collections::HashMap;
use std::hint::black_box;
use std::sync::RwLock;

use criterion::{BatchSize, Criterion, criterion_group, criterion_main};

use chatlist::helper::{MemoryStore, RecordingRows};
use chatlist::ordered_index::OrderedIndex;
use chatlist::prelude::*;

const DIALOGS: i64 = 20_000;

struct Keys(RwLock<HashMap<DialogId, OrderKey>>);

impl OrderKeyProvider for Keys {
    fn order_key(&self, id: DialogId, _filter: FilterId) -> Option<OrderKey> {
        self.0.read().ok()?.get(&id).copied()
    }
}

/// Linear congruential keys, so runs are comparable
fn keys(n: i64) -> Keys {
    let mut state: u64 = 0x853c_49e6_748f_ea9b;
    let map = (0..n)
        .map(|i| {
            state = state.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1_442_695_040_888_963_407);
            (DialogId(i), OrderKey(state >> 24))
        })
        .collect();
    Keys(RwLock::new(map))
}

fn filled(keys: &Keys) -> OrderedIndex {
    let mut index = OrderedIndex::new(FilterId::ALL, SortDirection::NewestFirst);
    for i in 0..DIALOGS {
        index.insert(DialogId(i), keys);
    }
    index
}

fn criterion_benchmark(c: &mut Criterion) {
    let provider = keys(DIALOGS);

    c.bench_function("insert 20k", |b| b.iter(|| black_box(filled(&provider))));

    c.bench_function("reposition to top", |b| {
        let mut index = filled(&provider);
        let mut bump = u64::MAX / 2;
        b.iter(|| {
            bump += 1;
            let id = DialogId((bump % DIALOGS as u64) as i64);
            if let Ok(mut map) = provider.0.write() {
                map.insert(id, OrderKey(bump));
            }
            black_box(index.reposition(id, &provider))
        })
    });

    c.bench_function("remove from middle", |b| {
        b.iter_batched(
            || filled(&provider),
            |mut index| {
                for i in (0..DIALOGS).step_by(100) {
                    index.remove(DialogId(i));
                }
                index
            },
            BatchSize::LargeInput,
        )
    });

    let runtime = tokio::runtime::Runtime::new().unwrap();
    let store = MemoryStore::with_dialogs((0..DIALOGS).map(|i| DialogSummary::new(DialogId(i), OrderKey(i as u64))));
    c.bench_function("page through 20k", |b| {
        b.to_async(&runtime).iter(|| async {
            let options = ChatListOptionsBuilder::default().page_size(Some(500)).build().unwrap();
            let list = ChatList::new(
                options,
                Collaborators::from_store(Arc::new(store.clone()), Arc::new(RecordingRows::new())),
            );
            list.set_active_filter(FilterId::ALL).await.unwrap();
            while let Ok(LoadOutcome::Loaded { .. }) = list.load_more(Edge::Bottom).await {}
            black_box(list.visible_ids(FilterId::ALL).len())
        })
    });
}

criterion_group!(
    name = benches;
    config = Criterion::default().sample_size(10);
    targets = criterion_benchmark
);
criterion_main!(benches);
