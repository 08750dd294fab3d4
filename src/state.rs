// (c) Copyright 2025 Helsing GmbH. All rights reserved.
//! The published form snapshot.

use crate::FieldPath;
use serde::Serialize;
use serde_json::Value;
use std::{collections::BTreeMap, rc::Rc};

/// Dirty flag per evaluated path.
///
/// A path missing from the map has never been evaluated and reads as clean. Since paths sort
/// by segment, the strict descendants of a path form one contiguous range right after it.
pub type DirtyMap = BTreeMap<FieldPath, bool>;

/// An immutable snapshot of a form.
///
/// A new snapshot is built for every committed transition and handed to subscribers. The
/// documents and the dirty map sit behind [`Rc`], so snapshots that only differ in their flags
/// share them, and subscribers can detect unchanged slices by pointer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormState {
    pub values: Rc<Value>,
    pub initial_values: Rc<Value>,
    pub is_valid: bool,
    pub is_validating: bool,
    pub is_submitting: bool,
    pub dirty_fields: Rc<DirtyMap>,
}

impl FormState {
    pub(crate) fn new(initial_values: Rc<Value>, is_valid: bool, is_validating: bool) -> Self {
        Self {
            values: Rc::clone(&initial_values),
            initial_values,
            is_valid,
            is_validating,
            is_submitting: false,
            dirty_fields: Rc::default(),
        }
    }

    /// True if `path` was evaluated and found dirty. The root path asks whether anything is.
    pub fn is_field_dirty(&self, path: &FieldPath) -> bool {
        if path.is_root() {
            return self.is_dirty();
        }
        self.dirty_fields.get(path).copied().unwrap_or(false)
    }

    /// True if any evaluated path is dirty.
    pub fn is_dirty(&self) -> bool {
        self.dirty_fields.values().any(|dirty| *dirty)
    }

    /// Reads the current value at `path`.
    pub fn value(&self, path: &FieldPath) -> Option<&Value> {
        path.lookup(&self.values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn untracked_paths_read_clean() {
        let state = FormState::new(Rc::new(json!({ "a": 1 })), true, false);
        assert!(!state.is_field_dirty(&"a".parse().unwrap()));
        assert!(!state.is_field_dirty(&FieldPath::root()));
        assert_eq!(state.value(&"a".parse().unwrap()), Some(&json!(1)));
    }

    #[test]
    fn root_reports_any_dirty_entry() {
        let mut state = FormState::new(Rc::new(json!({})), true, false);
        state.dirty_fields = Rc::new(DirtyMap::from([
            ("a".parse().unwrap(), false),
            ("b.c".parse().unwrap(), true),
        ]));
        assert!(state.is_field_dirty(&FieldPath::root()));
        assert!(!state.is_field_dirty(&"a".parse().unwrap()));
    }

    #[test]
    fn serializes_in_camel_case() {
        let state = FormState::new(Rc::new(json!({ "a": 1 })), true, true);
        assert_eq!(
            serde_json::to_value(&state).unwrap(),
            json!({
                "values": { "a": 1 },
                "initialValues": { "a": 1 },
                "isValid": true,
                "isValidating": true,
                "isSubmitting": false,
                "dirtyFields": {}
            })
        );
    }
}
