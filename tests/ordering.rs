#[allow(dead_code)]
#[macro_use]
mod common;

use std::cmp::Ordering;

use chatlist::prelude::*;
use chatlist::sorted_view::SortedCollectionView;
use common::*;

fn sorted(keys: &[OrderKey], ids: &[DialogId], direction: SortDirection) -> bool {
    keys.iter()
        .zip(ids)
        .collect::<Vec<_>>()
        .windows(2)
        .all(|w| direction.compare((*w[0].0, *w[0].1), (*w[1].0, *w[1].1)) == Ordering::Less)
}

#[test]
fn view_stays_sorted_under_churn() {
    for direction in [SortDirection::NewestFirst, SortDirection::OldestFirst] {
        let h = Harness::new(dialogs(0), 10);
        let mut view = SortedCollectionView::new(
            FilterId::ALL,
            direction,
            Arc::new(h.rows.clone()),
            Arc::new(h.store.clone()),
        );

        let mut seed: u32 = 7;
        for _ in 0..3_000 {
            seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            let id = DialogId(i64::from((seed >> 16) % 48));
            let key = OrderKey(u64::from((seed >> 8) % 40));
            match seed % 4 {
                0 => {
                    h.store.upsert(DialogSummary::new(id, key));
                    view.add(id, false);
                }
                1 => {
                    h.store.upsert(DialogSummary::new(id, key));
                    view.update(id);
                }
                2 => {
                    view.delete(id);
                }
                _ => {
                    h.store.remove(id);
                    view.update(id);
                }
            }

            let all = view.get_all();
            let keys: Vec<OrderKey> = all.iter().map(|id| view.key_of(*id).unwrap()).collect();
            assert!(sorted(&keys, &all, direction), "{direction:?}: {all:?}");
            assert_eq!(h.rows.snapshot(FilterId::ALL), all);
        }
    }
}

#[test]
fn repeated_calls_are_idempotent() {
    let h = Harness::new(dialogs(3), 10);
    let mut view = SortedCollectionView::new(
        FilterId::ALL,
        SortDirection::NewestFirst,
        Arc::new(h.rows.clone()),
        Arc::new(h.store.clone()),
    );
    view.add(DialogId(2), false);
    view.add(DialogId(2), false);
    view.update(DialogId(2));
    view.update(DialogId(2));
    assert_eq!(view.get_all(), ids(&[2]));
    assert_eq!(h.rows.created_count(), 1);

    assert!(!view.delete(DialogId(3)));
    assert!(view.delete(DialogId(2)));
    assert!(!view.delete(DialogId(2)));
    assert!(view.is_empty());
}

#[tokio::test(start_paused = true)]
async fn first_page_newest_first() {
    // a(order 5), b(order 3), c(order 1)
    let h = Harness::new([dialog(1, 5), dialog(2, 3), dialog(3, 1)], 3);
    let activation = h.list.set_active_filter(FilterId::ALL).await.unwrap();
    assert_eq!(
        activation.outcome,
        Some(LoadOutcome::Loaded {
            cached: false,
            added: 3,
            reached_end: true
        })
    );
    assert_visible!(h, FilterId::ALL, [1, 2, 3]);
}

#[tokio::test(start_paused = true)]
async fn first_page_oldest_first() {
    let folder = FilterId(2);
    let h = Harness::new(
        [in_folder(1, 5, folder), in_folder(2, 3, folder), in_folder(3, 1, folder)],
        3,
    );
    h.store.set_direction(folder, SortDirection::OldestFirst);
    h.list
        .add_filter(FilterSpec::new(folder, "Oldest").with_direction(SortDirection::OldestFirst))
        .await;

    h.list.set_active_filter(folder).await.unwrap();
    assert_visible!(h, folder, [3, 2, 1]);

    let window = h.list.window_state(folder).unwrap();
    assert_eq!(window.offset.top, Some(OrderKey(1)));
    assert_eq!(window.offset.bottom, Some(OrderKey(5)));
}

#[tokio::test(start_paused = true)]
async fn new_messages_move_dialogs_up() {
    let h = Harness::new(dialogs(5), 10);
    h.list.set_active_filter(FilterId::ALL).await.unwrap();
    assert_visible!(h, FilterId::ALL, [5, 4, 3, 2, 1]);

    h.store.upsert(dialog(2, 50));
    h.list.handle_event(Event::ItemUpserted(DialogId(2))).await;
    assert_visible!(h, FilterId::ALL, [2, 5, 4, 3, 1]);

    // equal keys fall back to the id
    h.store.upsert(dialog(4, 50));
    h.list.handle_event(Event::ItemUpserted(DialogId(4))).await;
    assert_visible!(h, FilterId::ALL, [2, 4, 5, 3, 1]);

    h.list.handle_event(Event::ItemRemoved(DialogId(5))).await;
    h.list.handle_event(Event::ItemRemoved(DialogId(5))).await;
    assert_visible!(h, FilterId::ALL, [2, 4, 3, 1]);

    insta::assert_snapshot!(h.rows.dump(FilterId::ALL), @r"
    2
    4
    3
    1
    ");
}

#[tokio::test(start_paused = true)]
async fn reorder_resorts_the_active_folder() {
    let folder = FilterId(3);
    let h = Harness::new([in_folder(1, 1, folder), in_folder(2, 2, folder), in_folder(3, 3, folder)], 10);
    h.list.add_filter(FilterSpec::new(folder, "Pinned").with_position(1)).await;
    h.list.set_active_filter(folder).await.unwrap();
    assert_visible!(h, folder, [3, 2, 1]);

    h.store.set_custom_key(folder, DialogId(1), OrderKey(10));
    h.list
        .handle_event(Event::FiltersReordered(vec![folder, FilterId::ALL]))
        .await;
    assert_visible!(h, folder, [1, 3, 2]);
    let tabs: Vec<FilterId> = h.list.tabs().iter().map(|spec| spec.id).collect();
    assert_eq!(tabs, vec![folder, FilterId::ALL]);
}
