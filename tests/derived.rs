#[allow(dead_code)]
#[macro_use]
mod common;

use std::time::Duration;

use chatlist::prelude::*;
use common::*;

fn sleep_ms(ms: u64) -> tokio::time::Sleep {
    tokio::time::sleep(Duration::from_millis(ms))
}

fn state(filter: FilterId, visible_count: usize, placeholder: Option<Placeholder>) -> DerivedState {
    DerivedState {
        filter,
        visible_count,
        placeholder,
        suggest_contacts: filter == FilterId::ALL && visible_count < 10,
        loading: false,
    }
}

#[tokio::test(start_paused = true)]
async fn published_after_the_first_load() {
    let h = Harness::new(dialogs(3), 10);
    h.list.start(&h.bus);
    let derived = h.list.derived();

    sleep_ms(500).await;
    assert_eq!(*derived.borrow(), None);
    assert_eq!(h.list.recompute_derived(), None);

    h.list.set_active_filter(FilterId::ALL).await.unwrap();
    assert_eq!(*derived.borrow(), None);
    sleep_ms(150).await;
    assert_eq!(*derived.borrow(), Some(state(FilterId::ALL, 3, None)));
    h.list.dispose();
}

#[tokio::test(start_paused = true)]
async fn length_changes_are_coalesced() {
    let h = Harness::new(dialogs(3), 10);
    h.list.start(&h.bus);
    let mut derived = h.list.derived();
    h.list.set_active_filter(FilterId::ALL).await.unwrap();
    sleep_ms(150).await;
    derived.mark_unchanged();

    for id in 4..=6 {
        h.store.upsert(dialog(id, id as u64 * 10));
        h.list.handle_event(Event::ItemUpserted(DialogId(id))).await;
        sleep_ms(20).await;
    }
    assert_eq!(derived.borrow().as_ref().map(|d| d.visible_count), Some(3));
    assert!(!derived.has_changed().unwrap());

    sleep_ms(100).await;
    assert!(derived.has_changed().unwrap());
    assert_eq!(*derived.borrow_and_update(), Some(state(FilterId::ALL, 6, None)));
    h.list.dispose();
}

#[tokio::test(start_paused = true)]
async fn placeholders_need_an_exhausted_list() {
    let work = FilterId(2);
    let h = Harness::new(dialogs(0), 10);
    h.list.add_filter(FilterSpec::new(work, "Work")).await;
    h.list.add_filter(FilterSpec::new(FilterId::ARCHIVE, "Archive")).await;
    h.list.start(&h.bus);
    let derived = h.list.derived();

    h.list.set_active_filter(FilterId::ALL).await.unwrap();
    sleep_ms(150).await;
    assert_eq!(
        *derived.borrow(),
        Some(state(FilterId::ALL, 0, Some(Placeholder::EmptyDialogs)))
    );

    h.list.set_active_filter(work).await.unwrap();
    sleep_ms(150).await;
    assert_eq!(*derived.borrow(), Some(state(work, 0, Some(Placeholder::EmptyFolder))));

    h.list.set_active_filter(FilterId::ARCHIVE).await.unwrap();
    sleep_ms(150).await;
    assert_eq!(*derived.borrow(), Some(state(FilterId::ARCHIVE, 0, None)));
    h.list.dispose();
}

#[tokio::test(start_paused = true)]
async fn loading_shows_until_the_first_page() {
    let work = FilterId(2);
    let h = Harness::new(dialogs(3), 10);
    h.list.add_filter(FilterSpec::new(work, "Work")).await;
    h.list.set_active_filter(FilterId::ALL).await.unwrap();

    h.store.set_latency(Some(Duration::from_millis(50)));
    let list = h.list.clone();
    let activation = tokio::spawn(async move { list.set_active_filter(work).await });
    h.wait_for_requests(2).await;

    let during = h.list.recompute_derived().unwrap();
    assert_eq!(during.filter, work);
    assert!(during.loading);
    assert_eq!(during.placeholder, None);

    activation.await.unwrap().unwrap();
    let after = h.list.recompute_derived().unwrap();
    assert!(!after.loading);
    assert_eq!(after.placeholder, Some(Placeholder::EmptyFolder));
}

#[tokio::test(start_paused = true)]
async fn loading_is_published_during_a_switch() {
    let work = FilterId(2);
    let h = Harness::new(dialogs(3), 10);
    h.list.add_filter(FilterSpec::new(work, "Work")).await;
    h.list.start(&h.bus);
    let derived = h.list.derived();
    h.list.set_active_filter(FilterId::ALL).await.unwrap();
    sleep_ms(150).await;

    h.store.set_latency(Some(Duration::from_secs(5)));
    let list = h.list.clone();
    let activation = tokio::spawn(async move { list.set_active_filter(work).await });
    sleep_ms(1_000).await;
    assert_eq!(
        *derived.borrow(),
        Some(DerivedState {
            loading: true,
            ..state(work, 0, None)
        })
    );

    activation.await.unwrap().unwrap();
    sleep_ms(150).await;
    assert_eq!(*derived.borrow(), Some(state(work, 0, Some(Placeholder::EmptyFolder))));
    h.list.dispose();
}

#[tokio::test(start_paused = true)]
async fn a_failed_load_clears_the_published_loading_flag() {
    let work = FilterId(2);
    let h = Harness::new(dialogs(3), 10);
    h.list.add_filter(FilterSpec::new(work, "Work")).await;
    h.list.start(&h.bus);
    let derived = h.list.derived();
    h.list.set_active_filter(FilterId::ALL).await.unwrap();

    h.store.set_failing(true);
    assert!(h.list.set_active_filter(work).await.is_err());
    sleep_ms(150).await;
    assert_eq!(*derived.borrow(), Some(state(work, 0, None)));
    h.list.dispose();
}

#[tokio::test(start_paused = true)]
async fn cached_pages_skip_the_loading_flag() {
    let work = FilterId(2);
    let h = Harness::new(dialogs(3), 10);
    h.list.add_filter(FilterSpec::new(work, "Work")).await;
    h.list.set_active_filter(FilterId::ALL).await.unwrap();

    h.store.set_cached(true);
    h.store.set_latency(Some(Duration::from_millis(50)));
    let list = h.list.clone();
    let activation = tokio::spawn(async move { list.set_active_filter(work).await });
    h.wait_for_requests(2).await;
    assert!(!h.list.is_loading(work));
    assert!(!h.list.recompute_derived().unwrap().loading);
    activation.await.unwrap().unwrap();
}

#[tokio::test(start_paused = true)]
async fn the_first_load_shows_loading_even_when_cached() {
    let h = Harness::new(dialogs(3), 10);
    h.store.set_cached(true);
    h.store.set_latency(Some(Duration::from_millis(50)));
    let list = h.list.clone();
    let activation = tokio::spawn(async move { list.set_active_filter(FilterId::ALL).await });
    h.wait_for_requests(1).await;
    assert!(h.list.is_loading(FilterId::ALL));

    activation.await.unwrap().unwrap();
    assert!(!h.list.is_loading(FilterId::ALL));
}

#[tokio::test(start_paused = true)]
async fn cleared_state_withdraws_the_derived_state() {
    let h = Harness::new(dialogs(3), 10);
    h.list.start(&h.bus);
    let derived = h.list.derived();
    h.list.set_active_filter(FilterId::ALL).await.unwrap();
    sleep_ms(150).await;
    assert!(derived.borrow().is_some());

    let follow_up = h.list.apply_event(Event::StateCleared).unwrap();
    assert_eq!(*derived.borrow(), None);
    follow_up.await;
    sleep_ms(150).await;
    assert_eq!(*derived.borrow(), Some(state(FilterId::ALL, 3, None)));
    h.list.dispose();
}

#[tokio::test(start_paused = true)]
async fn dispose_releases_the_subscription() {
    let h = Harness::new(dialogs(3), 10);
    h.list.start(&h.bus);
    h.list.start(&h.bus);
    assert_eq!(h.bus.subscriber_count(), 1);

    h.list.dispose();
    while h.bus.subscriber_count() > 0 {
        tokio::task::yield_now().await;
    }
    assert_eq!(h.bus.publish(Event::StateCleared), 0);
    assert!(h.list.is_disposed());
}
