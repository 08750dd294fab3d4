// (c) Copyright 2025 Helsing GmbH. All rights reserved.
//! Expansion of edit records into the set of paths whose dirtiness must be re-evaluated.
//!
//! Dirty comparison works path by path, so a single record that replaces a whole subtree has to
//! surface every path inside that subtree, and every ancestor of the record's own path, as
//! touched. The helpers here produce those sets and the synthetic per-leaf records used when a
//! branch appears or disappears as a whole.
//!
//! Empty containers count as leaves throughout: there is nothing below them to expand into.

use crate::{EditRecord, FieldPath, Segment};
use ahash::AHashSet;
use serde_json::Value;
use std::cmp::Reverse;

/// Direct children of a container, keyed by the segment that reaches them.
///
/// Mapping keys go through [`Segment::parse`] so they match the paths parsed from dotted
/// strings. Scalars have no entries.
pub(crate) fn entries(value: &Value) -> impl Iterator<Item = (Segment, &Value)> {
    let (map, items) = match value {
        Value::Object(map) => (Some(map), None),
        Value::Array(items) => (None, Some(items)),
        _ => (None, None),
    };
    map.into_iter()
        .flatten()
        .map(|(k, v)| (Segment::parse(k), v))
        .chain(
            items
                .into_iter()
                .flat_map(|items| items.iter().enumerate())
                .map(|(i, v)| (Segment::Index(i), v)),
        )
}

/// True for mappings and sequences with at least one member.
pub(crate) fn is_nonempty_container(value: &Value) -> bool {
    match value {
        Value::Object(map) => !map.is_empty(),
        Value::Array(items) => !items.is_empty(),
        _ => false,
    }
}

/// Every non-empty prefix of `path`, ending with `path` itself.
pub fn prefix_paths(path: &FieldPath) -> impl Iterator<Item = FieldPath> + '_ {
    path.prefixes()
}

/// One path per branch and leaf strictly inside `value`, prefixed by `base`.
pub fn subtree_paths(value: &Value, base: &FieldPath) -> Vec<FieldPath> {
    fn walk(value: &Value, base: &FieldPath, out: &mut Vec<FieldPath>) {
        for (segment, child) in entries(value) {
            let path = base.child(segment);
            walk(child, &path, out);
            out.push(path);
        }
    }

    let mut out = Vec::new();
    walk(value, base, &mut out);
    out
}

/// Decomposes a newly introduced subtree into one `add` record per terminal field.
pub fn deep_added(value: &Value, base: &FieldPath) -> Vec<EditRecord> {
    if !is_nonempty_container(value) {
        return vec![EditRecord::add(base.clone(), value.clone())];
    }
    entries(value)
        .flat_map(|(segment, child)| deep_added(child, &base.child(segment)))
        .collect()
}

/// Decomposes a cleared subtree into one `replace` record per previously existing terminal.
///
/// `reset` is the value written when `value` itself is a terminal; terminals found further down
/// are always reset to absent.
pub fn deep_removed(value: &Value, base: &FieldPath, reset: Option<Value>) -> Vec<EditRecord> {
    if !is_nonempty_container(value) {
        return vec![EditRecord::replace(base.clone(), reset)];
    }
    entries(value)
        .flat_map(|(segment, child)| deep_removed(child, &base.child(segment), None))
        .collect()
}

/// The de-duplicated set of paths touched by `records`, deepest first.
///
/// Ties at the same depth are broken in reverse lexical order of the dotted form. Processing in
/// this order finalizes every child before its parent aggregates over it.
pub fn visited_paths(records: &[EditRecord]) -> Vec<FieldPath> {
    let mut seen = AHashSet::new();
    let mut paths = Vec::new();
    for record in records {
        let subtree = record
            .value
            .iter()
            .flat_map(|value| subtree_paths(value, &record.path));
        for path in prefix_paths(&record.path).chain(subtree) {
            if seen.insert(path.clone()) {
                paths.push(path);
            }
        }
    }
    paths.sort_by_cached_key(|path| (Reverse(path.len()), Reverse(path.to_string())));
    paths
}

#[cfg(test)]
mod tests {
    use super::*;
    use insta::assert_snapshot;
    use serde_json::json;

    fn path(dotted: &str) -> FieldPath {
        dotted.parse().unwrap()
    }

    fn dotted(paths: &[FieldPath]) -> String {
        paths
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn visited_paths_include_prefixes_and_subtree() {
        let records = [EditRecord::add(path("a"), json!({ "b": { "c": 5 }, "d": [] }))];
        assert_snapshot!(dotted(&visited_paths(&records)), @r"
        a.b.c
        a.d
        a.b
        a
        ");
    }

    #[test]
    fn visited_paths_are_deduplicated_across_records() {
        let records = [
            EditRecord::replace(path("a.x"), Some(json!(2))),
            EditRecord::replace(path("a.y"), Some(json!(3))),
            EditRecord::replace(path("b"), None),
        ];
        assert_snapshot!(dotted(&visited_paths(&records)), @r"
        a.y
        a.x
        b
        a
        ");
    }

    #[test]
    fn empty_values_do_not_expand() {
        let records = [EditRecord::replace(path("a.list"), Some(json!([])))];
        assert_eq!(visited_paths(&records), vec![path("a.list"), path("a")]);
    }

    #[test]
    fn subtree_paths_cover_branches_and_leaves() {
        let paths = subtree_paths(&json!({ "x": [1, { "y": true }] }), &path("r"));
        let mut dotted: Vec<_> = paths.iter().map(ToString::to_string).collect();
        dotted.sort();
        assert_eq!(dotted, ["r.x", "r.x.0", "r.x.1", "r.x.1.y"]);
    }

    #[test]
    fn deep_added_emits_one_record_per_terminal() {
        let records = deep_added(&json!({ "x": { "y": 1 }, "z": [], "w": [2] }), &path("n"));
        assert_eq!(
            records,
            vec![
                EditRecord::add(path("n.w.0"), json!(2)),
                EditRecord::add(path("n.x.y"), json!(1)),
                EditRecord::add(path("n.z"), json!([])),
            ]
        );
    }

    #[test]
    fn deep_added_scalar_is_a_single_record() {
        assert_eq!(
            deep_added(&json!("v"), &path("k")),
            vec![EditRecord::add(path("k"), json!("v"))]
        );
    }

    #[test]
    fn deep_removed_resets_every_previous_terminal() {
        let records = deep_removed(&json!({ "b": 5, "c": ["x"] }), &path("a"), Some(json!(0)));
        assert_eq!(
            records,
            vec![
                EditRecord::replace(path("a.b"), None),
                EditRecord::replace(path("a.c.0"), None),
            ]
        );
    }

    #[test]
    fn deep_removed_scalar_uses_the_reset_value() {
        assert_eq!(
            deep_removed(&json!(5), &path("a"), Some(json!(""))),
            vec![EditRecord::replace(path("a"), Some(json!("")))]
        );
    }
}
