use flatwatch::types::{PathCasing, WatchRequest};
use flatwatch::watch::merge_requests;
use flatwatch_test_utils::builders::{WatchRequestBuilder, correlated, request};

fn merge(requests: Vec<WatchRequest>) -> Vec<flatwatch::types::MergedWatchRequest> {
    merge_requests(requests, PathCasing::Sensitive)
}

#[test]
fn same_path_and_filters_with_different_correlation_ids_merge() {
    let merged = merge(vec![correlated("/a", 1), correlated("/a", 2)]);

    assert_eq!(merged.len(), 1);
    assert_eq!(merged[0].request, correlated("/a", 1));
    assert_eq!(merged[0].additional_requests, vec![correlated("/a", 2)]);
}

#[test]
fn identical_correlation_ids_collapse() {
    let merged = merge(vec![correlated("/a", 1), correlated("/a", 1)]);
    assert_eq!(merged.len(), 1);
    assert!(merged[0].additional_requests.is_empty());

    let merged = merge(vec![request("/a"), request("/a")]);
    assert_eq!(merged.len(), 1);
    assert!(merged[0].additional_requests.is_empty());
}

#[test]
fn each_correlation_id_appears_once_per_group() {
    let merged = merge(vec![
        correlated("/a", 1),
        correlated("/a", 2),
        correlated("/a", 2),
        correlated("/a", 1),
        request("/a"),
    ]);

    assert_eq!(merged.len(), 1);
    let ids: Vec<_> = merged[0].subscribers().map(|r| r.correlation_id).collect();
    assert_eq!(ids, vec![Some(1), Some(2), None]);
}

#[test]
fn different_excludes_stay_separate() {
    let merged = merge(vec![
        WatchRequestBuilder::new("/a").exclude("*.tmp").build(),
        request("/a"),
    ]);
    assert_eq!(merged.len(), 2);
    assert!(merged.iter().all(|m| m.additional_requests.is_empty()));
}

#[test]
fn different_includes_stay_separate() {
    let merged = merge(vec![
        WatchRequestBuilder::new("/a").include("*.rs").build(),
        WatchRequestBuilder::new("/a").include("*.toml").build(),
    ]);
    assert_eq!(merged.len(), 2);
}

#[test]
fn pattern_order_and_duplicates_do_not_matter() {
    let merged = merge(vec![
        WatchRequestBuilder::new("/a")
            .exclude("*.tmp")
            .exclude("*.log")
            .correlation_id(1)
            .build(),
        WatchRequestBuilder::new("/a")
            .exclude("*.log")
            .exclude("*.tmp")
            .exclude("*.log")
            .correlation_id(2)
            .build(),
    ]);
    assert_eq!(merged.len(), 1);
    assert_eq!(merged[0].additional_requests.len(), 1);
}

#[test]
fn case_insensitive_paths_merge() {
    let merged = merge_requests(
        vec![correlated("/Foo", 1), correlated("/foo", 2)],
        PathCasing::Insensitive,
    );

    assert_eq!(merged.len(), 1);
    assert_eq!(merged[0].request.path, std::path::PathBuf::from("/Foo"));
    assert_eq!(merged[0].additional_requests, vec![correlated("/foo", 2)]);
}

#[test]
fn case_sensitive_paths_do_not_merge() {
    let merged = merge(vec![correlated("/Foo", 1), correlated("/foo", 2)]);
    assert_eq!(merged.len(), 2);
}

#[test]
fn output_is_deterministic_and_grouped_by_path() {
    let input = vec![
        request("/b"),
        correlated("/a", 1),
        WatchRequestBuilder::new("/b").exclude("x").build(),
        correlated("/a", 2),
    ];

    let first = merge(input.clone());
    let second = merge(input);
    assert_eq!(first, second);

    let paths: Vec<_> = first
        .iter()
        .map(|m| m.request.path.to_string_lossy().into_owned())
        .collect();
    assert_eq!(paths, vec!["/a", "/b", "/b"]);
    assert_eq!(first[1].request, request("/b"));
}

#[test]
fn request_display_names_filters_and_correlation() {
    let plain = request("/a");
    assert_eq!(
        plain.to_string(),
        "/a (excludes: <none>, includes: <all>, correlationId: <none>)"
    );

    let filtered = WatchRequestBuilder::new("/a")
        .exclude("*.tmp")
        .include("*.rs")
        .correlation_id(4)
        .build();
    assert_eq!(
        filtered.to_string(),
        "/a (excludes: *.tmp, includes: [\"*.rs\"], correlationId: 4)"
    );
}
