// src/watch/merge.rs

//! Collapse equivalent watch requests into merged requests.

use std::collections::BTreeMap;

use crate::types::{MergedWatchRequest, PathCasing, WatchRequest};
use crate::watch::path_utils::path_key;
use crate::watch::patterns::filters_equal;

/// Merge requests that share a path and identical include/exclude sets.
///
/// 1. Requests are grouped by path key (lower-cased on case-insensitive
///    platforms).
/// 2. Inside a group, each request is folded into the first earlier merged
///    request with equal filters, or starts a new merged request.
/// 3. Requests repeating a correlation id already present in the receiving
///    group are dropped instead of being added as additional requests.
///
/// Filter equality is exact set equality and therefore transitive, so one
/// pass over each group is enough. Groups come out ordered by path key and,
/// within a group, in input order.
pub fn merge_requests(
    requests: impl IntoIterator<Item = WatchRequest>,
    casing: PathCasing,
) -> Vec<MergedWatchRequest> {
    let mut by_path: BTreeMap<String, Vec<WatchRequest>> = BTreeMap::new();
    for request in requests {
        by_path
            .entry(path_key(&request.path, casing))
            .or_default()
            .push(request);
    }

    let mut merged = Vec::new();
    for requests_for_path in by_path.into_values() {
        let mut merged_for_path: Vec<MergedWatchRequest> = Vec::new();

        for request in requests_for_path {
            match merged_for_path
                .iter_mut()
                .find(|m| filters_equal(&m.request, &request))
            {
                Some(host) => host.absorb(request),
                None => merged_for_path.push(MergedWatchRequest::new(request)),
            }
        }

        merged.extend(merged_for_path);
    }

    merged
}
