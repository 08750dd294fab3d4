// (c) Copyright 2025 Helsing GmbH. All rights reserved.
//! Scratch copies of the values document and the structural diff between two snapshots.
//!
//! A values mutation works like a transaction: the published document is cloned into a
//! [`Draft`], the caller edits the draft, and [`produce`] diffs the result against the base to
//! obtain the [`EditRecord`]s describing the change. If the mutator fails, the draft is simply
//! dropped and nothing is committed.
//!
//! # Performance Tradeoff
//!
//! The draft is a full clone of the published document. Forms are small, and the clone buys a
//! simple mutation API with automatic rollback. Untouched subtrees are skipped cheaply by the
//! diff since equal values produce no records.

use crate::{
    EditRecord, FieldPath, Segment, ToFieldPath,
    error::PathError,
    path::{check_key, check_keys},
    path_set::{deep_removed, is_nonempty_container},
};
use serde_json::{Map, Value};
use std::mem;

/// A mutable scratch copy of the values document.
///
/// Writes create missing intermediate containers on the way: a mapping for a key segment, a
/// sequence for an index segment. A write may append to a sequence, but an index more than one
/// past its end is an [`PathError::IndexOutOfRange`].
///
/// # Example
///
/// ```
/// use formstate::draft::produce;
/// use serde_json::json;
///
/// let base = json!({ "a": { "x": "1" } });
/// let (next, records) = produce(&base, |draft| {
///     draft.set("a.x", "2")?;
///     draft.set("b.0", true)
/// })
/// .unwrap();
/// assert_eq!(next, json!({ "a": { "x": "2" }, "b": [true] }));
/// assert_eq!(records.len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct Draft {
    values: Value,
}

impl Draft {
    pub(crate) fn new(values: Value) -> Self {
        Self { values }
    }

    pub(crate) fn into_values(self) -> Value {
        self.values
    }

    /// The whole document as edited so far.
    pub fn values(&self) -> &Value {
        &self.values
    }

    /// Reads the value at `path`; `None` if absent or if `path` does not parse.
    pub fn get(&self, path: impl ToFieldPath) -> Option<&Value> {
        path.to_field_path().ok()?.lookup(&self.values)
    }

    /// Mutable access to an existing value at `path`.
    pub fn get_mut(&mut self, path: impl ToFieldPath) -> Option<&mut Value> {
        path.to_field_path().ok()?.lookup_mut(&mut self.values)
    }

    /// Writes `value` at `path`, creating intermediates as needed.
    pub fn set(&mut self, path: impl ToFieldPath, value: impl Into<Value>) -> Result<(), PathError> {
        let path = path.to_field_path()?;
        *slot_mut(&mut self.values, &path)? = value.into();
        Ok(())
    }

    /// Removes the value at `path` and returns it.
    ///
    /// Removing a sequence element shifts the following elements down. Removing the root leaves
    /// an empty mapping behind.
    pub fn remove(&mut self, path: impl ToFieldPath) -> Result<Option<Value>, PathError> {
        let path = path.to_field_path()?;
        let Some((last, init)) = path.segments().split_last() else {
            return Ok(Some(mem::replace(&mut self.values, Value::Object(Map::new()))));
        };
        let parent = init
            .iter()
            .try_fold(&mut self.values, |current, segment| segment.lookup_mut(current));
        Ok(match (parent, last) {
            (Some(Value::Object(map)), Segment::Key(key)) => map.remove(key),
            (Some(Value::Object(map)), Segment::Index(i)) => map.remove(&i.to_string()),
            (Some(Value::Array(items)), Segment::Index(i)) if *i < items.len() => {
                Some(items.remove(*i))
            }
            _ => None,
        })
    }

    /// Appends `value` to the sequence at `path`. A missing or non-sequence value at `path` is
    /// replaced by a one-element sequence.
    pub fn push(&mut self, path: impl ToFieldPath, value: impl Into<Value>) -> Result<(), PathError> {
        let path = path.to_field_path()?;
        match slot_mut(&mut self.values, &path)? {
            Value::Array(items) => items.push(value.into()),
            other => *other = Value::Array(vec![value.into()]),
        }
        Ok(())
    }

    /// Replaces the whole document.
    pub fn replace(&mut self, values: Value) {
        self.values = values;
    }
}

fn object_mut(value: &mut Value) -> &mut Map<String, Value> {
    if !value.is_object() {
        *value = Value::Object(Map::new());
    }
    match value {
        Value::Object(map) => map,
        _ => unreachable!("value was just reset to an object"),
    }
}

/// Steps into `container`, creating the child if it is missing.
///
/// Sequences only grow by appending: an index may be at most one past the end.
fn child_slot<'v>(
    container: &'v mut Value,
    segment: &Segment,
    path: &FieldPath,
) -> Result<&'v mut Value, PathError> {
    let out_of_range = |index: usize, len: usize| PathError::IndexOutOfRange {
        path: path.to_string(),
        index,
        len,
    };
    let index = match segment {
        Segment::Key(key) => {
            return Ok(object_mut(container)
                .entry(key.clone())
                .or_insert(Value::Null));
        }
        Segment::Index(index) => *index,
    };
    match container {
        Value::Object(map) => Ok(map.entry(index.to_string()).or_insert(Value::Null)),
        Value::Array(items) => {
            let len = items.len();
            if index == len {
                items.push(Value::Null);
            }
            items.get_mut(index).ok_or_else(|| out_of_range(index, len))
        }
        other if index == 0 => {
            *other = Value::Array(vec![Value::Null]);
            match other {
                Value::Array(items) => Ok(&mut items[0]),
                _ => unreachable!("value was just replaced by an array"),
            }
        }
        _ => Err(out_of_range(index, 0)),
    }
}

fn slot_mut<'v>(root: &'v mut Value, path: &FieldPath) -> Result<&'v mut Value, PathError> {
    path.segments()
        .iter()
        .try_fold(root, |current, segment| child_slot(current, segment, path))
}

/// Computes the minimal ordered list of edit records turning `before` into `after`.
///
/// - Equal subtrees produce nothing.
/// - Mappings and sequences recurse per key and per index.
/// - New keys and indices produce an `add` record carrying the whole new value.
/// - Removed keys and indices produce one removal per terminal that used to be there.
/// - A change of kind produces a `replace` with the new value, followed by removals for the
///   terminals of the old container.
pub fn diff(before: &Value, after: &Value) -> Vec<EditRecord> {
    let mut records = Vec::new();
    diff_into(before, after, &FieldPath::root(), &mut records);
    records
}

fn diff_into(before: &Value, after: &Value, path: &FieldPath, out: &mut Vec<EditRecord>) {
    if before == after {
        return;
    }
    match (before, after) {
        (Value::Object(old), Value::Object(new)) => {
            for (key, new_value) in new {
                let child = path.child(Segment::parse(key));
                match old.get(key) {
                    Some(old_value) => diff_into(old_value, new_value, &child, out),
                    None => out.push(EditRecord::add(child, new_value.clone())),
                }
            }
            for (key, old_value) in old.iter().filter(|(key, _)| !new.contains_key(*key)) {
                out.extend(deep_removed(old_value, &path.child(Segment::parse(key)), None));
            }
        }
        (Value::Array(old), Value::Array(new)) => {
            for (i, new_value) in new.iter().enumerate() {
                match old.get(i) {
                    Some(old_value) => diff_into(old_value, new_value, &path.child(i), out),
                    None => out.push(EditRecord::add(path.child(i), new_value.clone())),
                }
            }
            for (i, old_value) in old.iter().enumerate().skip(new.len()) {
                out.extend(deep_removed(old_value, &path.child(i), None));
            }
        }
        _ => {
            out.push(EditRecord::replace(path.clone(), Some(after.clone())));
            if is_nonempty_container(before) {
                out.extend(deep_removed(before, path, None));
            }
        }
    }
}

/// Runs `mutator` against a draft of `base` and returns the next document with its edit records.
///
/// An error from `mutator` discards the draft, and so does a change that introduces a mapping
/// key no dotted path can address.
pub fn produce<F>(base: &Value, mutator: F) -> Result<(Value, Vec<EditRecord>), PathError>
where
    F: FnOnce(&mut Draft) -> Result<(), PathError>,
{
    let mut draft = Draft::new(base.clone());
    mutator(&mut draft)?;
    let next = draft.into_values();
    let records = diff(base, &next);
    for record in &records {
        for key in record.path.segments().iter().filter_map(Segment::as_key) {
            check_key(key)?;
        }
        if let Some(value) = &record.value {
            check_keys(value)?;
        }
    }
    Ok((next, records))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn path(dotted: &str) -> FieldPath {
        dotted.parse().unwrap()
    }

    #[test]
    fn set_creates_missing_intermediates() {
        let mut draft = Draft::new(json!({}));
        draft.set("a.b.c", 5).unwrap();
        draft.set("list.0", "x").unwrap();
        draft.set("list.1.k", "y").unwrap();
        assert_eq!(
            draft.values(),
            &json!({ "a": { "b": { "c": 5 } }, "list": ["x", { "k": "y" }] })
        );
    }

    #[test]
    fn set_does_not_write_past_the_end() {
        let mut draft = Draft::new(json!({ "l": [], "s": 1 }));
        assert_eq!(
            draft.set("l.18446744073709551615", 1),
            Err(PathError::IndexOutOfRange {
                path: "l.18446744073709551615".into(),
                index: usize::MAX,
                len: 0,
            })
        );
        assert!(matches!(
            draft.set("l.1000000000000", 1),
            Err(PathError::IndexOutOfRange { len: 0, .. })
        ));
        assert!(matches!(
            draft.push("fresh.3", 1),
            Err(PathError::IndexOutOfRange { index: 3, .. })
        ));
        assert!(draft.set("s.2", 1).is_err());
        assert_eq!(draft.values(), &json!({ "l": [], "s": 1, "fresh": null }));
    }

    #[test]
    fn set_through_a_scalar_overwrites_it() {
        let mut draft = Draft::new(json!({ "a": 1 }));
        draft.set("a.b", true).unwrap();
        draft.set("n.0", 1).unwrap();
        draft.set("n.0.k", 2).unwrap();
        assert_eq!(draft.values(), &json!({ "a": { "b": true }, "n": [{ "k": 2 }] }));
    }

    #[test]
    fn set_rejects_bad_paths() {
        let mut draft = Draft::new(json!({}));
        assert!(draft.set("a..b", 1).is_err());
        assert_eq!(draft.values(), &json!({}));
    }

    #[test]
    fn remove_object_key_and_array_element() {
        let mut draft = Draft::new(json!({ "a": { "x": 1, "y": 2 }, "l": [1, 2, 3] }));
        assert_eq!(draft.remove("a.x").unwrap(), Some(json!(1)));
        assert_eq!(draft.remove("l.0").unwrap(), Some(json!(1)));
        assert_eq!(draft.remove("l.9").unwrap(), None);
        assert_eq!(draft.remove("missing.deep").unwrap(), None);
        assert_eq!(draft.values(), &json!({ "a": { "y": 2 }, "l": [2, 3] }));
    }

    #[test]
    fn push_appends_or_creates() {
        let mut draft = Draft::new(json!({ "l": [1] }));
        draft.push("l", 2).unwrap();
        draft.push("fresh", "a").unwrap();
        assert_eq!(draft.values(), &json!({ "l": [1, 2], "fresh": ["a"] }));
    }

    #[test]
    fn diff_of_equal_documents_is_empty() {
        let doc = json!({ "a": [1, { "b": 2 }] });
        assert!(diff(&doc, &doc.clone()).is_empty());
    }

    #[test]
    fn diff_scalar_change_is_a_replace() {
        let records = diff(&json!({ "a": { "x": "1" } }), &json!({ "a": { "x": "2" } }));
        assert_eq!(records, vec![EditRecord::replace(path("a.x"), Some(json!("2")))]);
    }

    #[test]
    fn diff_new_key_is_an_add_with_the_whole_value() {
        let records = diff(&json!({}), &json!({ "a": { "b": { "c": 5 } } }));
        assert_eq!(
            records,
            vec![EditRecord::add(path("a"), json!({ "b": { "c": 5 } }))]
        );
    }

    #[test]
    fn diff_removed_key_clears_each_old_terminal() {
        let records = diff(&json!({ "a": { "b": 5, "c": [1] } }), &json!({}));
        assert_eq!(
            records,
            vec![
                EditRecord::replace(path("a.b"), None),
                EditRecord::replace(path("a.c.0"), None),
            ]
        );
    }

    #[test]
    fn diff_kind_change_replaces_and_clears() {
        let records = diff(&json!({ "a": { "b": 5 } }), &json!({ "a": null }));
        assert_eq!(
            records,
            vec![
                EditRecord::replace(path("a"), Some(json!(null))),
                EditRecord::replace(path("a.b"), None),
            ]
        );
    }

    #[test]
    fn diff_arrays_grow_and_shrink_by_index() {
        let grown = diff(&json!({ "l": [1] }), &json!({ "l": [1, 2] }));
        assert_eq!(grown, vec![EditRecord::add(path("l.1"), json!(2))]);

        let shrunk = diff(&json!({ "l": [1, { "k": 2 }] }), &json!({ "l": [1] }));
        assert_eq!(shrunk, vec![EditRecord::replace(path("l.1.k"), None)]);
    }

    #[test]
    fn produce_without_changes_yields_no_records() {
        let base = json!({ "a": 1 });
        let (next, records) = produce(&base, |draft| draft.set("a", 1)).unwrap();
        assert_eq!(next, base);
        assert!(records.is_empty());
    }

    #[test]
    fn produce_rejects_unaddressable_keys() {
        let base = json!({ "a": {} });
        let err = produce(&base, |draft| draft.set("a", json!({ "x.y": 1 }))).unwrap_err();
        assert_eq!(err, PathError::UnaddressableKey { key: "x.y".into() });

        let err = produce(&base, |draft| draft.set(FieldPath::root().child(""), 1)).unwrap_err();
        assert!(matches!(err, PathError::UnaddressableKey { .. }));
    }

    #[test]
    fn produce_propagates_mutator_errors() {
        let base = json!({ "a": 1 });
        let err = produce(&base, |draft| {
            draft.set("a", 2)?;
            draft.set("b..c", 3)
        })
        .unwrap_err();
        assert!(matches!(err, PathError::EmptySegment { position: 1, .. }));
    }
}
