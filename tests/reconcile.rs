mod common;

use std::path::PathBuf;
use std::sync::Arc;

use flatwatch::types::PathCasing;
use flatwatch::watch::{FileWatcher, NonRecursiveWatcher};

use crate::common::builders::{WatchRequestBuilder, correlated, request};
use crate::common::fake_primitive::{FakePrimitiveFactory, JournalEntry};
use crate::common::{drain, fake_coordinator, init_tracing};

fn started(path: &str) -> JournalEntry {
    JournalEntry::Started(PathBuf::from(path))
}

fn disposed(path: &str) -> JournalEntry {
    JournalEntry::Disposed(PathBuf::from(path))
}

#[tokio::test]
async fn correlated_requests_share_one_watcher_until_one_leaves() {
    init_tracing();
    let (factory, watcher, mut rx) = fake_coordinator(PathCasing::Sensitive);

    watcher
        .reconcile(vec![correlated("/a", 1), correlated("/a", 2)])
        .await
        .unwrap();

    assert_eq!(factory.start_count(), 1);
    assert_eq!(watcher.watcher_count(), 1);
    let handle = factory.live_for("/a").unwrap();
    assert_eq!(handle.request().additional_requests.len(), 1);

    factory.clear_journal();
    watcher.reconcile(vec![correlated("/a", 1)]).await.unwrap();

    assert!(factory.journal().is_empty());
    assert_eq!(watcher.watcher_count(), 1);
    assert_eq!(handle.dispose_count(), 0);
    assert!(watcher.active_requests()[0].additional_requests.is_empty());
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test]
async fn reconcile_is_idempotent_for_the_same_set() {
    let (factory, watcher, _rx) = fake_coordinator(PathCasing::Sensitive);
    let requests = vec![
        request("/a"),
        WatchRequestBuilder::new("/b").exclude("*.tmp").build(),
        correlated("/c", 3),
        correlated("/c", 4),
    ];

    watcher.reconcile(requests.clone()).await.unwrap();
    assert_eq!(factory.start_count(), 3);
    factory.clear_journal();

    let mut reversed = requests;
    reversed.reverse();
    watcher.reconcile(reversed).await.unwrap();

    assert!(factory.journal().is_empty());
    assert_eq!(watcher.watcher_count(), 3);
}

#[tokio::test]
async fn changing_path_stops_old_watcher_before_starting_new_one() {
    let (factory, watcher, _rx) = fake_coordinator(PathCasing::Sensitive);

    watcher.reconcile(vec![request("/a")]).await.unwrap();
    factory.clear_journal();

    watcher.reconcile(vec![request("/b")]).await.unwrap();

    assert_eq!(factory.journal(), vec![disposed("/a"), started("/b")]);
    assert_eq!(watcher.watcher_count(), 1);
    assert_eq!(factory.live().len(), 1);
    assert!(factory.live_for("/b").is_some());
}

#[tokio::test]
async fn changing_filters_replaces_the_watcher() {
    let (factory, watcher, _rx) = fake_coordinator(PathCasing::Sensitive);

    watcher.reconcile(vec![request("/a")]).await.unwrap();
    factory.clear_journal();

    watcher
        .reconcile(vec![WatchRequestBuilder::new("/a").exclude("*.log").build()])
        .await
        .unwrap();

    assert_eq!(factory.journal(), vec![disposed("/a"), started("/a")]);
}

#[tokio::test]
async fn disjoint_filters_start_separate_watchers() {
    let (factory, watcher, _rx) = fake_coordinator(PathCasing::Sensitive);

    watcher
        .reconcile(vec![
            WatchRequestBuilder::new("/a").exclude("*.tmp").build(),
            WatchRequestBuilder::new("/a").exclude("*.log").build(),
        ])
        .await
        .unwrap();

    assert_eq!(factory.start_count(), 2);
    assert_eq!(watcher.watcher_count(), 2);
}

#[tokio::test]
async fn case_insensitive_paths_share_one_watcher() {
    let (factory, watcher, _rx) = fake_coordinator(PathCasing::Insensitive);

    watcher
        .reconcile(vec![correlated("/Foo", 1), correlated("/foo", 2)])
        .await
        .unwrap();
    assert_eq!(factory.start_count(), 1);

    factory.clear_journal();
    watcher.reconcile(vec![request("/FOO")]).await.unwrap();
    assert!(factory.journal().is_empty());
    assert_eq!(watcher.watcher_count(), 1);
}

#[tokio::test]
async fn spellings_of_the_same_path_share_one_watcher() {
    let (factory, watcher, _rx) = fake_coordinator(PathCasing::Sensitive);

    watcher
        .reconcile(vec![
            correlated("/a", 1),
            correlated("/a/", 2),
            correlated("/a/./b", 3),
            correlated("/a/b", 4),
        ])
        .await
        .unwrap();

    assert_eq!(factory.start_count(), 2);
    assert_eq!(watcher.watcher_count(), 2);
    let handle = factory.live_for("/a").unwrap();
    assert_eq!(handle.request().additional_requests.len(), 1);

    factory.clear_journal();
    watcher.reconcile(vec![request("/a/"), request("/a/b/")]).await.unwrap();
    assert!(factory.journal().is_empty());
    assert_eq!(watcher.watcher_count(), 2);
}

#[tokio::test]
async fn case_sensitive_paths_get_separate_watchers() {
    let (factory, watcher, _rx) = fake_coordinator(PathCasing::Sensitive);

    watcher
        .reconcile(vec![request("/Foo"), request("/foo")])
        .await
        .unwrap();

    assert_eq!(factory.start_count(), 2);
}

#[tokio::test]
async fn empty_request_list_stops_everything() {
    let (factory, watcher, _rx) = fake_coordinator(PathCasing::Sensitive);

    watcher
        .reconcile(vec![request("/a"), request("/b")])
        .await
        .unwrap();
    watcher.reconcile(Vec::new()).await.unwrap();

    assert_eq!(watcher.watcher_count(), 0);
    assert!(factory.started().iter().all(|h| h.dispose_count() == 1));
}

#[tokio::test]
async fn stop_disposes_every_watcher_exactly_once() {
    let (factory, watcher, _rx) = fake_coordinator(PathCasing::Sensitive);

    watcher
        .reconcile(vec![
            request("/a"),
            correlated("/b", 1),
            WatchRequestBuilder::new("/c").include("*.rs").build(),
        ])
        .await
        .unwrap();
    assert_eq!(watcher.watcher_count(), 3);

    watcher.stop().await.unwrap();
    assert_eq!(watcher.watcher_count(), 0);
    assert!(factory.started().iter().all(|h| h.dispose_count() == 1));

    // A second stop has nothing left to do.
    watcher.stop().await.unwrap();
    assert!(factory.started().iter().all(|h| h.dispose_count() == 1));
}

#[tokio::test]
async fn works_through_the_file_watcher_trait() {
    let factory = FakePrimitiveFactory::new();
    let (watcher, _rx) = NonRecursiveWatcher::new(factory.clone(), PathCasing::Sensitive);
    let watcher: Box<dyn FileWatcher> = Box::new(watcher);

    watcher.watch(vec![request("/a")]).await.unwrap();
    watcher.set_verbose_logging(true).await;
    watcher.stop().await.unwrap();

    assert_eq!(factory.start_count(), 1);
    assert_eq!(factory.started()[0].dispose_count(), 1);
    assert!(factory.started()[0].verbose());
}

#[tokio::test]
async fn overlapping_reconciles_are_serialized() {
    let factory = FakePrimitiveFactory::new();
    let (watcher, _rx) = NonRecursiveWatcher::new(factory.clone(), PathCasing::Sensitive);
    let watcher = Arc::new(watcher);

    let tasks: Vec<_> = (0..8)
        .map(|i| {
            let watcher = Arc::clone(&watcher);
            tokio::spawn(async move {
                watcher
                    .reconcile(vec![correlated("/a", i), request("/b")])
                    .await
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    assert_eq!(watcher.watcher_count(), 2);
    assert_eq!(factory.start_count(), 2);
    assert_eq!(factory.live().len(), 2);
}
