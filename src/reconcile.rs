// (c) Copyright 2025 Helsing GmbH. All rights reserved.
//! Incremental dirty-state reconciliation.
//!
//! [`reconcile`] computes how one committed values change affects the [`DirtyMap`]. It never
//! recomputes the map from scratch: only the paths surfaced by [`visited_paths`] are evaluated,
//! deepest first, so that every container is aggregated after all of its touched children.
//!
//! For each visited path the reconciler compares the current value against its *baseline*,
//! which is normally the initial value at the same path:
//!
//! 1. equal values are clean, which covers fields that were edited and later restored;
//! 2. a baseline that is absent or a scalar makes the path dirty when the values differ;
//! 3. a container baseline is dirty when any tracked descendant is dirty. Entries of the
//!    baseline that vanished from the current value are marked dirty first, together with
//!    every path below them, since there is nothing left to visit there.
//!
//! # Sequence identity
//!
//! When an [`ArrayIdentity`] declares a key field for a sequence, the baseline of an element is
//! the initial element with the same key value as the *current* element at that index. This
//! applies at every depth, so fields below a moved element compare against the same element in
//! the initial document. Elements without a key value fall back to positional comparison, and a
//! key value with no initial counterpart has no baseline at all.

use crate::{
    ArrayIdentity, EditRecord, FieldPath, Segment,
    path_set::{entries, visited_paths},
    state::DirtyMap,
};
use serde_json::Value;
use std::ops::Bound;
use tracing::trace;

/// Computes the dirty map delta for one committed values change.
///
/// `records` describe the change that produced `after`; `prior` is the dirty map before the
/// change. The returned entries are meant to be merged over `prior`, replacing existing entries.
///
/// ```
/// use formstate::{ArrayIdentity, DirtyMap, draft::produce, reconcile::reconcile};
/// use serde_json::json;
///
/// let initial = json!({ "a": { "x": "1", "y": "1" } });
/// let (after, records) = produce(&initial, |draft| draft.set("a.x", "2")).unwrap();
/// let delta = reconcile(&records, &after, &initial, &DirtyMap::new(), &ArrayIdentity::none());
/// assert_eq!(delta.get(&"a.x".parse().unwrap()), Some(&true));
/// assert_eq!(delta.get(&"a".parse().unwrap()), Some(&true));
/// assert_eq!(delta.get(&"a.y".parse().unwrap()), None);
/// ```
pub fn reconcile(
    records: &[EditRecord],
    after: &Value,
    initial: &Value,
    prior: &DirtyMap,
    identity: &ArrayIdentity,
) -> DirtyMap {
    let mut next = DirtyMap::new();

    for path in visited_paths(records) {
        let current = path.lookup(after);
        let baseline = resolve_baseline(&path, initial, after, identity);

        if current == baseline {
            trace!(%path, "matches baseline");
            next.insert(path, false);
            continue;
        }

        let Some(baseline) = baseline.filter(|b| b.is_object() || b.is_array()) else {
            trace!(%path, "differs from scalar baseline");
            next.insert(path, true);
            continue;
        };

        if entry_count(Some(baseline)) != entry_count(current) {
            let vanished: Vec<EditRecord> = entries(baseline)
                .filter(|(segment, _)| current.and_then(|c| segment.lookup(c)).is_none())
                .map(|(segment, value)| (path.child(segment), value))
                .filter(|(child, _)| prior.get(child) != Some(&true))
                .map(|(child, value)| EditRecord::add(child, value.clone()))
                .collect();
            for vanished_path in visited_paths(&vanished) {
                trace!(path = %vanished_path, "vanished from container");
                next.insert(vanished_path, true);
            }
        }

        if next.get(&path) == Some(&true) {
            continue;
        }

        let (tracked, dirty) = descendant_flags(&path, prior, &next);
        trace!(%path, tracked, dirty, "aggregated container");
        next.insert(path, dirty || !tracked);
    }

    next
}

/// Resolves the value `path` is compared against, following sequence identities.
fn resolve_baseline<'i>(
    path: &FieldPath,
    initial: &'i Value,
    after: &Value,
    identity: &ArrayIdentity,
) -> Option<&'i Value> {
    let mut baseline = Some(initial);
    let mut current = Some(after);
    let mut pattern = String::new();

    for segment in path.segments() {
        let current_child = current.and_then(|c| segment.lookup(c));
        baseline = match (segment, baseline?) {
            (Segment::Index(index), Value::Array(items)) => {
                let keyed = identity
                    .key_for(&pattern)
                    .and_then(|key| Some((key, current_child?.get(key)?)));
                match keyed {
                    Some((key, id)) => items.iter().find(|item| item.get(key) == Some(id)),
                    None => items.get(*index),
                }
            }
            (segment, container) => segment.lookup(container),
        };
        if let Segment::Key(key) = segment {
            if !pattern.is_empty() {
                pattern.push('.');
            }
            pattern.push_str(key);
        }
        current = current_child;
    }

    baseline
}

/// Absent values and scalars count as empty containers.
fn entry_count(value: Option<&Value>) -> usize {
    match value {
        Some(Value::Object(map)) => map.len(),
        Some(Value::Array(items)) => items.len(),
        _ => 0,
    }
}

/// Whether any strict descendant of `path` is tracked, and whether any of them is dirty.
///
/// Entries computed during this reconciliation take precedence over the prior ones.
fn descendant_flags(path: &FieldPath, prior: &DirtyMap, next: &DirtyMap) -> (bool, bool) {
    let below = |map: &DirtyMap| {
        map.range::<FieldPath, _>((Bound::Excluded(path), Bound::Unbounded))
            .take_while(|(candidate, _)| candidate.starts_with(path))
            .map(|(candidate, dirty)| (candidate.clone(), *dirty))
            .collect::<Vec<_>>()
    };

    let mut tracked = false;
    let mut dirty = false;
    for (candidate, flag) in below(prior) {
        if !next.contains_key(&candidate) {
            tracked = true;
            dirty |= flag;
        }
    }
    for (_, flag) in below(next) {
        tracked = true;
        dirty |= flag;
    }
    (tracked, dirty)
}
